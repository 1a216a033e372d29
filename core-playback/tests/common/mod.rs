//! Shared fixtures for the integration tests.

#![allow(dead_code)]

use bridge_desktop::SoftwareMixer;
use bridge_traits::error::Result as BridgeResult;
use bridge_traits::{
    BridgeError, ChromaSampling, Clock, CodecSetup, FrameDecoder, MemoryBundle, PcmFormat,
    PlanarFrame, Plane, VideoCodecProvider,
};
use chrono::{DateTime, Utc};
use core_runtime::config::EngineConfig;
use hound::{SampleFormat, WavSpec, WavWriter};
use ogg::{PacketWriteEndInfo, PacketWriter};
use parking_lot::Mutex;
use std::io::Cursor;
use std::sync::Arc;
use std::time::Duration;

/// Sample rate of every fixture; one frame is one millisecond.
pub const RATE: u32 = 1000;

/// Mono 16-bit WAV holding `frames` samples of `level`.
pub fn wav(frames: usize, level: f32) -> Vec<u8> {
    let spec = WavSpec {
        channels: 1,
        sample_rate: RATE,
        bits_per_sample: 16,
        sample_format: SampleFormat::Int,
    };
    let mut cursor = Cursor::new(Vec::new());
    {
        let mut writer = WavWriter::new(&mut cursor, spec).unwrap();
        let sample = (level * i16::MAX as f32) as i16;
        for _ in 0..frames {
            writer.write_sample(sample).unwrap();
        }
        writer.finalize().unwrap();
    }
    cursor.into_inner()
}

/// Monotonic clock that only moves when told to.
#[derive(Default)]
pub struct ManualClock(Mutex<Duration>);

impl ManualClock {
    pub fn advance(&self, by: Duration) {
        *self.0.lock() += by;
    }
}

impl Clock for ManualClock {
    fn now(&self) -> DateTime<Utc> {
        Utc::now()
    }

    fn monotonic(&self) -> Duration {
        *self.0.lock()
    }
}

// ============================================================================
// Video fixtures
// ============================================================================

/// Luma that makes [`RawFrameDecoder`] report a decode failure.
pub const CORRUPT: u8 = 0xFF;

fn ident_header(width: u32, height: u32, fps: u32) -> Vec<u8> {
    let mut p = vec![0x80];
    p.extend_from_slice(b"theora");
    p.extend_from_slice(&[3, 2, 1]);
    p.extend_from_slice(&((width / 16) as u16).to_be_bytes());
    p.extend_from_slice(&((height / 16) as u16).to_be_bytes());
    p.extend_from_slice(&width.to_be_bytes()[1..]);
    p.extend_from_slice(&height.to_be_bytes()[1..]);
    p.extend_from_slice(&[0, 0]);
    p.extend_from_slice(&fps.to_be_bytes());
    p.extend_from_slice(&1u32.to_be_bytes());
    p.extend_from_slice(&[0, 0, 1, 0, 0, 1]);
    p.push(0);
    p.extend_from_slice(&[0, 0, 0]);
    // quality 32, granule shift 6, 4:2:0
    p.extend_from_slice(&((32u16 << 10) | (6 << 5)).to_be_bytes());
    p
}

fn comment_header(vendor: &str) -> Vec<u8> {
    let mut p = vec![0x81];
    p.extend_from_slice(b"theora");
    p.extend_from_slice(&(vendor.len() as u32).to_le_bytes());
    p.extend_from_slice(vendor.as_bytes());
    p.extend_from_slice(&0u32.to_le_bytes());
    p
}

fn setup_header() -> Vec<u8> {
    let mut p = vec![0x82];
    p.extend_from_slice(b"theora");
    p
}

/// 32x32 Theora stream in Ogg. Each frame's packet is its luma byte.
pub fn theora_clip(lumas: &[u8], fps: u32) -> Vec<u8> {
    let serial = 0x5eed;
    let mut out = Vec::new();
    {
        let mut writer = PacketWriter::new(&mut out);
        writer
            .write_packet(ident_header(32, 32, fps), serial, PacketWriteEndInfo::EndPage, 0)
            .unwrap();
        writer
            .write_packet(comment_header("fixture"), serial, PacketWriteEndInfo::NormalPacket, 0)
            .unwrap();
        writer
            .write_packet(setup_header(), serial, PacketWriteEndInfo::EndPage, 0)
            .unwrap();
        for (i, &luma) in lumas.iter().enumerate() {
            let end = if i + 1 == lumas.len() {
                PacketWriteEndInfo::EndStream
            } else {
                PacketWriteEndInfo::EndPage
            };
            writer.write_packet(vec![luma], serial, end, i as u64 + 1).unwrap();
        }
    }
    out
}

/// Frame decoder whose pictures are flat: luma from the packet, neutral
/// chroma.
pub struct RawFrameDecoder {
    size: usize,
    luma: Vec<u8>,
    chroma: Vec<u8>,
    ready: bool,
}

impl FrameDecoder for RawFrameDecoder {
    fn decode_packet(&mut self, packet: &[u8]) -> BridgeResult<()> {
        match packet.first() {
            None => Ok(()),
            Some(&CORRUPT) => Err(BridgeError::OperationFailed("corrupt packet".into())),
            Some(&value) => {
                self.luma.fill(value);
                self.ready = true;
                Ok(())
            }
        }
    }

    fn frame(&self) -> Option<PlanarFrame<'_>> {
        if !self.ready {
            return None;
        }
        let half = self.size / 2;
        let chroma = Plane {
            data: &self.chroma,
            stride: half,
            width: half,
            height: half,
        };
        Some(PlanarFrame {
            y: Plane {
                data: &self.luma,
                stride: self.size,
                width: self.size,
                height: self.size,
            },
            cb: chroma,
            cr: chroma,
            chroma: ChromaSampling::Yuv420,
        })
    }

    fn reset(&mut self) {
        self.ready = false;
    }
}

pub struct RawProvider;

impl VideoCodecProvider for RawProvider {
    fn codec_name(&self) -> &str {
        "raw"
    }

    fn create(&self, setup: &CodecSetup) -> BridgeResult<Box<dyn FrameDecoder>> {
        let size = setup.frame_width as usize;
        Ok(Box::new(RawFrameDecoder {
            size,
            luma: vec![0; size * size],
            chroma: vec![128; size * size / 4],
            ready: false,
        }))
    }
}

// ============================================================================
// Engine wiring
// ============================================================================

pub struct Harness {
    pub mixer: Arc<SoftwareMixer>,
    pub clock: Arc<ManualClock>,
    pub config: EngineConfig,
}

impl Harness {
    /// Stereo mixer at [`RATE`], a manual clock, and the raw video codec.
    pub fn new(bundle: MemoryBundle) -> Self {
        let mixer = Arc::new(SoftwareMixer::new(PcmFormat::new(2, RATE)));
        let clock = Arc::new(ManualClock::default());
        let config = EngineConfig::builder()
            .bundle(Arc::new(bundle))
            .audio_output(mixer.clone())
            .clock(clock.clone())
            .video_codec(Arc::new(RawProvider))
            .build()
            .unwrap();
        Self {
            mixer,
            clock,
            config,
        }
    }

    /// Render `frames` device frames.
    pub fn render(&self, frames: usize) -> Vec<f32> {
        self.mixer.render_frames(frames)
    }
}
