//! Video codec bridge.
//!
//! The engine owns the container (Ogg), header parsing, pacing, color
//! conversion, and double buffering. Reconstructing pixels from a Theora
//! data packet is delegated to a host-supplied decode library through
//! [`FrameDecoder`], which hands back planar Y'CbCr.

use crate::error::Result;
use bytes::Bytes;

/// Chroma subsampling of a planar frame.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ChromaSampling {
    /// Chroma halved horizontally and vertically.
    Yuv420,
    /// Chroma halved horizontally.
    Yuv422,
    /// Full-resolution chroma.
    Yuv444,
}

impl ChromaSampling {
    /// Right shifts applied to luma coordinates to reach chroma coordinates,
    /// as `(x_shift, y_shift)`.
    pub fn shifts(&self) -> (u32, u32) {
        match self {
            ChromaSampling::Yuv420 => (1, 1),
            ChromaSampling::Yuv422 => (1, 0),
            ChromaSampling::Yuv444 => (0, 0),
        }
    }

    /// Chroma plane dimensions for a luma plane of `width` x `height`.
    pub fn chroma_size(&self, width: usize, height: usize) -> (usize, usize) {
        let (sx, sy) = self.shifts();
        (
            (width + (1 << sx) - 1) >> sx,
            (height + (1 << sy) - 1) >> sy,
        )
    }
}

/// Everything a frame decoder needs to initialize.
#[derive(Debug, Clone)]
pub struct CodecSetup {
    /// Identification, comment, and setup header packets, in stream order.
    pub headers: Vec<Bytes>,
    /// Coded frame size (multiple of 16).
    pub frame_width: u32,
    pub frame_height: u32,
    pub chroma: ChromaSampling,
}

/// One plane of a decoded frame. Row `r` starts at `data[r * stride]`.
#[derive(Debug, Clone, Copy)]
pub struct Plane<'a> {
    pub data: &'a [u8],
    pub stride: usize,
    pub width: usize,
    pub height: usize,
}

impl<'a> Plane<'a> {
    /// Row `row`, trimmed to the plane width.
    pub fn row(&self, row: usize) -> &'a [u8] {
        let start = row * self.stride;
        &self.data[start..start + self.width]
    }
}

/// Planar Y'CbCr frame borrowed from the decoder.
#[derive(Debug, Clone, Copy)]
pub struct PlanarFrame<'a> {
    pub y: Plane<'a>,
    pub cb: Plane<'a>,
    pub cr: Plane<'a>,
    pub chroma: ChromaSampling,
}

/// Per-stream decode context.
pub trait FrameDecoder: Send {
    /// Feed one data packet. A zero-length packet repeats the previous frame
    /// and leaves [`frame`](FrameDecoder::frame) unchanged.
    fn decode_packet(&mut self, packet: &[u8]) -> Result<()>;

    /// Most recently reconstructed frame, if any packet decoded yet.
    fn frame(&self) -> Option<PlanarFrame<'_>>;

    /// Forget reference frames, e.g. after the stream is rewound.
    fn reset(&mut self) {}
}

/// Factory for frame decoders.
pub trait VideoCodecProvider: Send + Sync {
    /// Codec the provider decodes, e.g. `"theora"`.
    fn codec_name(&self) -> &str;

    fn create(&self, setup: &CodecSetup) -> Result<Box<dyn FrameDecoder>>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_chroma_size_rounds_up() {
        assert_eq!(ChromaSampling::Yuv420.chroma_size(5, 3), (3, 2));
        assert_eq!(ChromaSampling::Yuv422.chroma_size(5, 3), (3, 3));
        assert_eq!(ChromaSampling::Yuv444.chroma_size(5, 3), (5, 3));
    }

    #[test]
    fn test_plane_row_respects_stride() {
        let data = [1u8, 2, 0, 0, 3, 4, 0, 0];
        let plane = Plane {
            data: &data,
            stride: 4,
            width: 2,
            height: 2,
        };

        assert_eq!(plane.row(0), &[1, 2]);
        assert_eq!(plane.row(1), &[3, 4]);
    }
}
