//! Theora frame decoding through libavcodec (`ffmpeg-next`).
//!
//! The engine demuxes Ogg and parses the headers itself; this provider only
//! turns data packets into planar Y'CbCr. Decoded planes are copied into the
//! coded frame geometry announced by the identification header, so a frame
//! libavcodec already cropped to the visible picture still lines up with
//! the picture offsets the engine applies.

use bridge_traits::{
    error::{BridgeError, Result},
    video::{ChromaSampling, CodecSetup, FrameDecoder, PlanarFrame, Plane, VideoCodecProvider},
};
use bytes::Bytes;
use ffmpeg_next as ffmpeg;
use ffmpeg::format::Pixel;
use tracing::debug;

/// [`VideoCodecProvider`] backed by the system FFmpeg libraries.
#[derive(Debug)]
pub struct FfmpegTheoraProvider {
    _private: (),
}

impl FfmpegTheoraProvider {
    /// Initialize libavcodec and check that it carries a Theora decoder.
    pub fn new() -> Result<Self> {
        ffmpeg::init().map_err(|e| {
            BridgeError::NotAvailable(format!("Failed to initialize FFmpeg: {}", e))
        })?;

        if ffmpeg::decoder::find(ffmpeg::codec::Id::THEORA).is_none() {
            return Err(BridgeError::NotAvailable(
                "FFmpeg build has no Theora decoder".to_string(),
            ));
        }

        debug!("FFmpeg Theora decoder available");
        Ok(Self { _private: () })
    }
}

impl VideoCodecProvider for FfmpegTheoraProvider {
    fn codec_name(&self) -> &str {
        "theora"
    }

    fn create(&self, setup: &CodecSetup) -> Result<Box<dyn FrameDecoder>> {
        let codec = ffmpeg::decoder::find(ffmpeg::codec::Id::THEORA)
            .ok_or_else(|| BridgeError::NotAvailable("Theora decoder not found".to_string()))?;

        let mut context = ffmpeg::codec::context::Context::new_with_codec(codec);
        attach_extradata(&mut context, &xiph_extradata(&setup.headers)?)?;

        let decoder = context
            .decoder()
            .video()
            .map_err(|e| BridgeError::OperationFailed(format!("Failed to open Theora decoder: {}", e)))?;

        debug!(
            frame_width = setup.frame_width,
            frame_height = setup.frame_height,
            chroma = ?setup.chroma,
            "Opened FFmpeg Theora decoder"
        );

        Ok(Box::new(FfmpegTheoraDecoder {
            decoder,
            decoded: ffmpeg::frame::Video::empty(),
            planes: CodedPlanes::new(setup),
            has_frame: false,
        }))
    }
}

/// Header packets as 16-bit big-endian length-prefixed blocks, the
/// extradata layout libavcodec splits Xiph headers from.
fn xiph_extradata(headers: &[Bytes]) -> Result<Vec<u8>> {
    if headers.len() != 3 {
        return Err(BridgeError::OperationFailed(format!(
            "Expected 3 Theora headers, got {}",
            headers.len()
        )));
    }

    let mut out = Vec::with_capacity(headers.iter().map(|h| h.len() + 2).sum());
    for header in headers {
        let len = u16::try_from(header.len()).map_err(|_| {
            BridgeError::OperationFailed(format!("Theora header too large: {} bytes", header.len()))
        })?;
        out.extend_from_slice(&len.to_be_bytes());
        out.extend_from_slice(header);
    }
    Ok(out)
}

fn attach_extradata(context: &mut ffmpeg::codec::context::Context, data: &[u8]) -> Result<()> {
    let padded = data.len() + ffmpeg::ffi::AV_INPUT_BUFFER_PADDING_SIZE as usize;
    let size = i32::try_from(data.len())
        .map_err(|_| BridgeError::OperationFailed("Extradata too large".to_string()))?;

    // SAFETY: the buffer comes from av_mallocz with the padding libavcodec
    // reads past the end, and ownership passes to the codec context, which
    // frees it in avcodec_free_context.
    unsafe {
        let buffer = ffmpeg::ffi::av_mallocz(padded) as *mut u8;
        if buffer.is_null() {
            return Err(BridgeError::OperationFailed("Extradata allocation failed".to_string()));
        }
        std::ptr::copy_nonoverlapping(data.as_ptr(), buffer, data.len());

        let raw = context.as_mut_ptr();
        (*raw).extradata = buffer;
        (*raw).extradata_size = size;
    }
    Ok(())
}

/// Owned planes in coded frame geometry.
#[derive(Debug)]
struct CodedPlanes {
    chroma: ChromaSampling,
    sizes: [(usize, usize); 3],
    data: [Vec<u8>; 3],
}

impl CodedPlanes {
    fn new(setup: &CodecSetup) -> Self {
        let luma = (setup.frame_width as usize, setup.frame_height as usize);
        let chroma = setup.chroma.chroma_size(luma.0, luma.1);
        let sizes = [luma, chroma, chroma];
        Self {
            chroma: setup.chroma,
            sizes,
            data: sizes.map(|(w, h)| vec![0u8; w * h]),
        }
    }

    /// Copy a source plane into plane `index`, anchored top-left.
    /// Anything beyond the coded size is dropped.
    fn fill(&mut self, index: usize, src: &[u8], src_stride: usize, src_width: usize, src_height: usize) {
        let (width, height) = self.sizes[index];
        let copy_w = src_width.min(width);
        let dst = &mut self.data[index];

        for row in 0..src_height.min(height) {
            let start = row * src_stride;
            let Some(line) = src.get(start..start + copy_w) else {
                break;
            };
            dst[row * width..row * width + copy_w].copy_from_slice(line);
        }
    }

    fn plane(&self, index: usize) -> Plane<'_> {
        let (width, height) = self.sizes[index];
        Plane {
            data: &self.data[index],
            stride: width,
            width,
            height,
        }
    }

    fn frame(&self) -> PlanarFrame<'_> {
        PlanarFrame {
            y: self.plane(0),
            cb: self.plane(1),
            cr: self.plane(2),
            chroma: self.chroma,
        }
    }
}

fn sampling_of(pixel: Pixel) -> Option<ChromaSampling> {
    match pixel {
        Pixel::YUV420P | Pixel::YUVJ420P => Some(ChromaSampling::Yuv420),
        Pixel::YUV422P | Pixel::YUVJ422P => Some(ChromaSampling::Yuv422),
        Pixel::YUV444P | Pixel::YUVJ444P => Some(ChromaSampling::Yuv444),
        _ => None,
    }
}

struct FfmpegTheoraDecoder {
    decoder: ffmpeg::decoder::Video,
    decoded: ffmpeg::frame::Video,
    planes: CodedPlanes,
    has_frame: bool,
}

impl FfmpegTheoraDecoder {
    fn store_decoded(&mut self) -> Result<()> {
        let sampling = sampling_of(self.decoded.format()).ok_or_else(|| {
            BridgeError::OperationFailed(format!(
                "Unexpected decoder pixel format {:?}",
                self.decoded.format()
            ))
        })?;
        if sampling != self.planes.chroma {
            return Err(BridgeError::OperationFailed(format!(
                "Decoder produced {:?}, stream declares {:?}",
                sampling, self.planes.chroma
            )));
        }

        for index in 0..3 {
            self.planes.fill(
                index,
                self.decoded.data(index),
                self.decoded.stride(index),
                self.decoded.plane_width(index) as usize,
                self.decoded.plane_height(index) as usize,
            );
        }
        self.has_frame = true;
        Ok(())
    }
}

impl FrameDecoder for FfmpegTheoraDecoder {
    fn decode_packet(&mut self, packet: &[u8]) -> Result<()> {
        // An empty packet is a Theora duplicate frame; libavcodec would read
        // it as a drain request.
        if packet.is_empty() {
            return Ok(());
        }

        let packet = ffmpeg::Packet::copy(packet);
        self.decoder
            .send_packet(&packet)
            .map_err(|e| BridgeError::OperationFailed(format!("Theora packet rejected: {}", e)))?;

        while self.decoder.receive_frame(&mut self.decoded).is_ok() {
            self.store_decoded()?;
        }
        Ok(())
    }

    fn frame(&self) -> Option<PlanarFrame<'_>> {
        self.has_frame.then(|| self.planes.frame())
    }

    fn reset(&mut self) {
        self.decoder.flush();
        self.has_frame = false;
    }
}
