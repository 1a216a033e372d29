//! Y'CbCr to RGB conversion.
//!
//! BT.601 coefficients in 16.16 fixed point, precomputed per sample value.
//! Limited-range input is expanded to the full 0..=255 output range.

use crate::config::{ColorRange, PixelFormat};
use crate::error::{PlaybackError, Result};
use crate::traits::VideoInfo;
use bridge_traits::PlanarFrame;

const ONE: f64 = 65536.0;
const ROUND: i32 = 1 << 15;

/// Converts decoded planes into an interleaved, cropped RGB picture.
#[derive(Clone)]
pub struct YuvConverter {
    format: PixelFormat,
    range: ColorRange,
    y: [i32; 256],
    r_cr: [i32; 256],
    g_cb: [i32; 256],
    g_cr: [i32; 256],
    b_cb: [i32; 256],
}

impl std::fmt::Debug for YuvConverter {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("YuvConverter")
            .field("format", &self.format)
            .field("range", &self.range)
            .finish()
    }
}

impl YuvConverter {
    pub fn new(format: PixelFormat, range: ColorRange) -> Self {
        let (y_offset, y_scale, c_scale) = match range {
            ColorRange::Limited => (16.0, 255.0 / 219.0, 255.0 / 224.0),
            ColorRange::Full => (0.0, 1.0, 1.0),
        };

        let mut conv = Self {
            format,
            range,
            y: [0; 256],
            r_cr: [0; 256],
            g_cb: [0; 256],
            g_cr: [0; 256],
            b_cb: [0; 256],
        };

        for i in 0..256 {
            let y = (i as f64 - y_offset) * y_scale;
            let c = (i as f64 - 128.0) * c_scale;
            conv.y[i] = (y * ONE).round() as i32;
            conv.r_cr[i] = (1.402 * c * ONE).round() as i32;
            conv.g_cb[i] = (-0.344136 * c * ONE).round() as i32;
            conv.g_cr[i] = (-0.714136 * c * ONE).round() as i32;
            conv.b_cb[i] = (1.772 * c * ONE).round() as i32;
        }

        conv
    }

    pub fn pixel_format(&self) -> PixelFormat {
        self.format
    }

    pub fn color_range(&self) -> ColorRange {
        self.range
    }

    /// Bytes per output row for a picture `width` pixels wide.
    pub fn stride(&self, width: u32) -> usize {
        width as usize * self.format.bytes_per_pixel()
    }

    #[inline]
    fn pixel(&self, y: u8, cb: u8, cr: u8) -> [u8; 3] {
        let luma = self.y[y as usize];
        let clamp = |v: i32| ((v + ROUND) >> 16).clamp(0, 255) as u8;
        [
            clamp(luma + self.r_cr[cr as usize]),
            clamp(luma + self.g_cb[cb as usize] + self.g_cr[cr as usize]),
            clamp(luma + self.b_cb[cb as usize]),
        ]
    }

    /// Convert the visible picture of `frame` into `out`.
    ///
    /// `out` is resized to exactly `stride * picture_height` bytes.
    pub fn convert(&self, frame: &PlanarFrame<'_>, info: &VideoInfo, out: &mut Vec<u8>) -> Result<()> {
        let (sx, sy) = frame.chroma.shifts();
        let (x0, y0) = (info.picture_x as usize, info.picture_y as usize);
        let (w, h) = (info.picture_width as usize, info.picture_height as usize);

        if w == 0 || h == 0 {
            return Err(PlaybackError::Decoding("Empty picture".into()));
        }
        if x0 + w > frame.y.width || y0 + h > frame.y.height {
            return Err(PlaybackError::Decoding(format!(
                "Picture {}x{}+{}+{} outside decoded plane {}x{}",
                w, h, x0, y0, frame.y.width, frame.y.height
            )));
        }
        let chroma_w = ((x0 + w - 1) >> sx) + 1;
        let chroma_h = ((y0 + h - 1) >> sy) + 1;
        for plane in [&frame.cb, &frame.cr] {
            if plane.width < chroma_w || plane.height < chroma_h {
                return Err(PlaybackError::Decoding("Chroma plane smaller than picture".into()));
            }
        }
        for plane in [&frame.y, &frame.cb, &frame.cr] {
            let needed = plane.height.saturating_sub(1) * plane.stride + plane.width;
            if plane.stride < plane.width || plane.data.len() < needed {
                return Err(PlaybackError::Decoding("Plane data shorter than its geometry".into()));
            }
        }

        let bpp = self.format.bytes_per_pixel();
        let stride = w * bpp;
        out.clear();
        out.resize(stride * h, 0);

        for (row, dst) in out.chunks_exact_mut(stride).enumerate() {
            let ly = y0 + row;
            let cy = ly >> sy;
            let y_row = frame.y.row(ly);
            let cb_row = frame.cb.row(cy);
            let cr_row = frame.cr.row(cy);

            for (col, px) in dst.chunks_exact_mut(bpp).enumerate() {
                let lx = x0 + col;
                let cx = lx >> sx;
                let [r, g, b] = self.pixel(y_row[lx], cb_row[cx], cr_row[cx]);
                match self.format {
                    PixelFormat::Rgb24 => px.copy_from_slice(&[r, g, b]),
                    PixelFormat::Rgba32 => px.copy_from_slice(&[r, g, b, 0xFF]),
                    PixelFormat::Bgra32 => px.copy_from_slice(&[b, g, r, 0xFF]),
                }
            }
        }

        Ok(())
    }
}
