//! # Core Playback Traits
//!
//! Decode-context abstractions used by the engines. These differ from the
//! bridge-traits definitions, which describe host capabilities; the traits
//! here describe what an engine needs from a decoder it owns.
//!
//! Both decoders are pulled synchronously from the engine's `update()`, one
//! bounded unit of work per call (a buffer's worth of audio, one video frame).
//!
//! ```rust,no_run
//! use core_playback::{AudioDecoder, PlaybackError};
//!
//! fn drain(decoder: &mut dyn AudioDecoder) -> Result<u64, PlaybackError> {
//!     let mut frames = 0;
//!     while let Some(chunk) = decoder.decode_frames(4096)? {
//!         frames += chunk.frames as u64;
//!     }
//!     decoder.rewind()?;
//!     Ok(frames)
//! }
//! ```

use crate::error::Result;
use crate::resource::ResourceSource;
use bridge_traits::{ChromaSampling, PcmFormat, PlanarFrame};
use serde::{Deserialize, Serialize};
use std::time::Duration;

// ============================================================================
// Audio Format Types
// ============================================================================

/// Audio codecs the engine can be asked to play.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AudioCodec {
    /// Ogg Vorbis
    Vorbis,
    /// Uncompressed PCM in a WAV container
    Pcm,
    /// Recognized by the container probe but not decodable here
    Other(String),
}

/// Format of the decoded PCM a decoder produces.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AudioFormat {
    pub codec: AudioCodec,
    /// Sample rate in Hz
    pub sample_rate: u32,
    /// Number of interleaved channels
    pub channels: u16,
    /// Bits per sample in the source, when the container says
    pub bits_per_sample: Option<u16>,
    /// Stream length in frames, when the container says
    pub total_frames: Option<u64>,
}

impl AudioFormat {
    pub fn new(codec: AudioCodec, sample_rate: u32, channels: u16) -> Self {
        Self {
            codec,
            sample_rate,
            channels,
            bits_per_sample: None,
            total_frames: None,
        }
    }

    pub fn with_total_frames(mut self, total_frames: Option<u64>) -> Self {
        self.total_frames = total_frames;
        self
    }

    /// Layout handed to the output device.
    pub fn pcm_format(&self) -> PcmFormat {
        PcmFormat::new(self.channels, self.sample_rate)
    }

    pub fn duration(&self) -> Option<Duration> {
        self.total_frames
            .map(|frames| self.pcm_format().frames_to_duration(frames))
    }
}

// ============================================================================
// Decoded Audio Data
// ============================================================================

/// A run of decoded frames.
///
/// Samples are interleaved (`L0 R0 L1 R1 ...`) and normalized to `[-1, 1]`.
#[derive(Debug, Clone)]
pub struct AudioFrameChunk {
    pub samples: Vec<f32>,
    /// Frames in `samples`; one frame is one sample per channel.
    pub frames: usize,
    /// Stream frame index of the first frame.
    pub start_frame: u64,
}

impl AudioFrameChunk {
    pub fn new(samples: Vec<f32>, frames: usize, start_frame: u64) -> Self {
        Self {
            samples,
            frames,
            start_frame,
        }
    }

    pub fn is_empty(&self) -> bool {
        self.frames == 0 || self.samples.is_empty()
    }

    pub fn duration(&self, sample_rate: u32) -> Duration {
        PcmFormat::new(1, sample_rate).frames_to_duration(self.frames as u64)
    }
}

// ============================================================================
// Audio Decode Context
// ============================================================================

/// Compressed-audio decode context over a resource.
///
/// - `decode_frames` returns `Ok(None)` at the end of the stream and never
///   drops frames: whatever a packet yields beyond `max_frames` is returned
///   by the next call.
/// - `seek` positions the next decoded frame at or just before `position`.
pub trait AudioDecoder: Send {
    fn format(&self) -> &AudioFormat;

    /// Decode up to `max_frames` frames from the current position.
    fn decode_frames(&mut self, max_frames: usize) -> Result<Option<AudioFrameChunk>>;

    fn seek(&mut self, position: Duration) -> Result<()>;

    /// Stream frame index of the next frame `decode_frames` will return.
    fn position_frame(&self) -> u64;

    fn rewind(&mut self) -> Result<()> {
        self.seek(Duration::ZERO)
    }

    fn position(&self) -> Duration {
        self.format()
            .pcm_format()
            .frames_to_duration(self.position_frame())
    }
}

/// Creates decode contexts for an audio engine.
pub trait AudioDecoderFactory: Send + Sync {
    /// Probe `source` and build a decoder for it.
    ///
    /// Fails with `StreamFormat` or `UnsupportedCodec` when the stream
    /// cannot be played.
    fn open(&self, source: ResourceSource) -> Result<Box<dyn AudioDecoder>>;
}

// ============================================================================
// Video
// ============================================================================

/// Stream properties from a video identification header.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VideoInfo {
    /// Coded frame size, a multiple of 16 in each direction.
    pub frame_width: u32,
    pub frame_height: u32,
    /// Visible picture inside the coded frame.
    pub picture_width: u32,
    pub picture_height: u32,
    /// Picture offset from the frame's top-left corner.
    pub picture_x: u32,
    pub picture_y: u32,
    pub fps_numerator: u32,
    pub fps_denominator: u32,
    pub aspect_numerator: u32,
    pub aspect_denominator: u32,
    pub chroma: ChromaSampling,
    pub keyframe_granule_shift: u8,
}

impl VideoInfo {
    /// Declared duration of one frame; zero for a zero frame rate.
    pub fn frame_duration(&self) -> Duration {
        if self.fps_numerator == 0 {
            return Duration::ZERO;
        }
        Duration::from_nanos(
            self.fps_denominator as u64 * 1_000_000_000 / self.fps_numerator as u64,
        )
    }

    pub fn frame_rate(&self) -> f64 {
        if self.fps_denominator == 0 {
            return 0.0;
        }
        self.fps_numerator as f64 / self.fps_denominator as f64
    }

    /// Presentation time of frame `index`.
    pub fn frame_time(&self, index: u64) -> Duration {
        if self.fps_numerator == 0 {
            return Duration::ZERO;
        }
        let nanos =
            index as u128 * self.fps_denominator as u128 * 1_000_000_000 / self.fps_numerator as u128;
        Duration::from_nanos(u64::try_from(nanos).unwrap_or(u64::MAX))
    }
}

/// Video decode context: demux, headers, and frame reconstruction.
pub trait VideoDecoder: Send {
    fn info(&self) -> &VideoInfo;

    /// Decode the next frame.
    ///
    /// Returns the index of the frame now available through
    /// [`frame`](Self::frame), or `None` at the end of the stream.
    fn next_frame(&mut self) -> Result<Option<u64>>;

    /// Planes of the last decoded frame.
    fn frame(&self) -> Option<PlanarFrame<'_>>;

    /// Return to the first frame.
    fn rewind(&mut self) -> Result<()>;
}

// ============================================================================
// Tests
// ============================================================================
