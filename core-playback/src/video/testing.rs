//! Synthetic Theora streams and a pass-through frame decoder.

use super::theora::tests::{comment_packet, ident_packet, setup_packet};
use bridge_traits::error::Result as BridgeResult;
use bridge_traits::{
    BridgeError, ChromaSampling, CodecSetup, FrameDecoder, PlanarFrame, Plane, VideoCodecProvider,
};
use ogg::{PacketWriteEndInfo, PacketWriter};

/// Leading packet byte that makes [`RawFrameDecoder`] fail.
pub const CORRUPT: u8 = 0xFF;

/// Ogg file with a 16x16 4:2:0 Theora stream at `fps` frames per second.
/// Each data packet is one byte: the luma of its frame.
pub fn theora_file(lumas: &[u8], fps: u32) -> Vec<u8> {
    let mut out = Vec::new();
    {
        let mut writer = PacketWriter::new(&mut out);
        let serial = 0x7e0a;
        writer
            .write_packet(ident_packet(16, 16, (fps, 1), 0), serial, PacketWriteEndInfo::EndPage, 0)
            .unwrap();
        writer
            .write_packet(comment_packet("raw", &[]), serial, PacketWriteEndInfo::NormalPacket, 0)
            .unwrap();
        writer
            .write_packet(setup_packet(), serial, PacketWriteEndInfo::EndPage, 0)
            .unwrap();
        for (i, &luma) in lumas.iter().enumerate() {
            let end = if i + 1 == lumas.len() {
                PacketWriteEndInfo::EndStream
            } else {
                PacketWriteEndInfo::EndPage
            };
            writer
                .write_packet(vec![luma], serial, end, (i + 1) as u64)
                .unwrap();
        }
    }
    out
}

/// Fills the luma plane with the packet's first byte; chroma stays neutral.
pub struct RawFrameDecoder {
    width: usize,
    height: usize,
    y: Vec<u8>,
    c: Vec<u8>,
    decoded: bool,
}

impl FrameDecoder for RawFrameDecoder {
    fn decode_packet(&mut self, packet: &[u8]) -> BridgeResult<()> {
        match packet.first() {
            None => Ok(()),
            Some(&CORRUPT) => Err(BridgeError::OperationFailed("corrupt packet".into())),
            Some(&luma) => {
                self.y.fill(luma);
                self.decoded = true;
                Ok(())
            }
        }
    }

    fn frame(&self) -> Option<PlanarFrame<'_>> {
        if !self.decoded {
            return None;
        }
        let (cw, ch) = (self.width / 2, self.height / 2);
        Some(PlanarFrame {
            y: Plane { data: &self.y, stride: self.width, width: self.width, height: self.height },
            cb: Plane { data: &self.c, stride: cw, width: cw, height: ch },
            cr: Plane { data: &self.c, stride: cw, width: cw, height: ch },
            chroma: ChromaSampling::Yuv420,
        })
    }

    fn reset(&mut self) {
        self.decoded = false;
    }
}

pub struct RawProvider;

impl VideoCodecProvider for RawProvider {
    fn codec_name(&self) -> &str {
        "raw"
    }

    fn create(&self, setup: &CodecSetup) -> BridgeResult<Box<dyn FrameDecoder>> {
        let (width, height) = (setup.frame_width as usize, setup.frame_height as usize);
        Ok(Box::new(RawFrameDecoder {
            width,
            height,
            y: vec![0; width * height],
            c: vec![128; width * height / 4],
            decoded: false,
        }))
    }
}
