//! # Sample Format Converter
//!
//! Normalizes Symphonia's decoded buffers (any sample type, planar) into
//! interleaved `f32` in `[-1, 1]`.

use symphonia::core::audio::{AudioBufferRef, SampleBuffer};

/// Reusable planar-to-interleaved converter.
///
/// Keeps one `SampleBuffer` alive across packets and only reallocates when a
/// packet is larger than anything seen before or the channel layout changes.
#[derive(Default)]
pub struct SampleConverter {
    buffer: Option<SampleBuffer<f32>>,
    channels: usize,
}

impl SampleConverter {
    pub fn new() -> Self {
        Self::default()
    }

    /// Interleave `decoded`, returning a view valid until the next call.
    pub fn interleave(&mut self, decoded: AudioBufferRef<'_>) -> &[f32] {
        let spec = *decoded.spec();
        let channels = spec.channels.count();
        let needed = decoded.capacity() * channels;

        let reuse = matches!(&self.buffer, Some(buf) if buf.capacity() >= needed)
            && self.channels == channels;
        if !reuse {
            self.buffer = Some(SampleBuffer::new(decoded.capacity() as u64, spec));
            self.channels = channels;
        }

        match self.buffer.as_mut() {
            Some(buf) => {
                buf.copy_interleaved_ref(decoded);
                buf.samples()
            }
            None => &[],
        }
    }

    /// Clamp samples into `[-1, 1]`, returning how many were out of range.
    pub fn clamp(samples: &mut [f32]) -> usize {
        let mut clipped = 0;
        for sample in samples.iter_mut() {
            if !(-1.0..=1.0).contains(sample) {
                *sample = sample.clamp(-1.0, 1.0);
                clipped += 1;
            }
        }
        clipped
    }
}
