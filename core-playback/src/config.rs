//! # Engine Settings
//!
//! Tunables for the audio and video engines, loadable from JSON.

use serde::{Deserialize, Serialize};

use crate::error::{PlaybackError, Result};

/// Audio engine tunables.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AudioSettings {
    /// Number of hardware buffers in each instance's pool.
    ///
    /// Bounds both memory and latency: at most `buffer_count * buffer_frames`
    /// frames are queued ahead of the play head.
    ///
    /// Default: 4.
    #[serde(default = "default_buffer_count")]
    pub buffer_count: usize,

    /// Frames decoded into each buffer per fill.
    ///
    /// Default: 4096 frames (~93ms at 44.1kHz).
    #[serde(default = "default_buffer_frames")]
    pub buffer_frames: usize,

    /// Highest variant number probed for varying resources (`name1` .. `nameN`).
    ///
    /// Default: 9.
    #[serde(default = "default_max_variants")]
    pub max_variants: usize,

    /// Edge length of a cube face texture, used to normalize spot origins.
    ///
    /// Default: 2048.
    #[serde(default = "default_face_size")]
    pub face_size: f32,

    /// Consecutive decode failures tolerated before a stream is treated as ended.
    ///
    /// Default: 10.
    #[serde(default = "default_max_consecutive_errors")]
    pub max_consecutive_errors: usize,
}

impl Default for AudioSettings {
    fn default() -> Self {
        Self {
            buffer_count: default_buffer_count(),
            buffer_frames: default_buffer_frames(),
            max_variants: default_max_variants(),
            face_size: default_face_size(),
            max_consecutive_errors: default_max_consecutive_errors(),
        }
    }
}

impl AudioSettings {
    /// Short buffers for effects that must start promptly.
    pub fn low_latency() -> Self {
        Self {
            buffer_count: 3,
            buffer_frames: 1024,
            ..Default::default()
        }
    }

    /// Deep buffers for long ambient loops that tolerate latency.
    pub fn ambient() -> Self {
        Self {
            buffer_count: 6,
            buffer_frames: 8192,
            ..Default::default()
        }
    }

    pub fn validate(&self) -> Result<()> {
        if self.buffer_count < 2 {
            return Err(PlaybackError::Internal(
                "buffer_count must be at least 2".to_string(),
            ));
        }

        if self.buffer_frames == 0 {
            return Err(PlaybackError::Internal("buffer_frames must be > 0".to_string()));
        }

        if self.face_size <= 0.0 {
            return Err(PlaybackError::Internal("face_size must be > 0".to_string()));
        }

        if self.max_consecutive_errors == 0 {
            return Err(PlaybackError::Internal(
                "max_consecutive_errors must be > 0".to_string(),
            ));
        }

        Ok(())
    }

    /// Parse and validate settings from JSON. Missing fields take defaults.
    pub fn from_json(json: &str) -> Result<Self> {
        let settings: Self = serde_json::from_str(json)
            .map_err(|e| PlaybackError::Internal(format!("Invalid audio settings: {}", e)))?;
        settings.validate()?;
        Ok(settings)
    }
}

/// Interleaved output pixel layout for converted video frames.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum PixelFormat {
    Rgb24,
    Rgba32,
    Bgra32,
}

impl PixelFormat {
    pub fn bytes_per_pixel(&self) -> usize {
        match self {
            PixelFormat::Rgb24 => 3,
            PixelFormat::Rgba32 | PixelFormat::Bgra32 => 4,
        }
    }
}

/// Coded range of Y'CbCr samples.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ColorRange {
    /// Y in 16..=235, chroma in 16..=240.
    Limited,
    /// All of 0..=255.
    Full,
}

/// Video engine tunables.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VideoSettings {
    /// Default: `Rgb24`.
    #[serde(default = "default_pixel_format")]
    pub pixel_format: PixelFormat,

    /// Range the stream's samples are coded in.
    ///
    /// Default: `Limited`, as Theora streams are.
    #[serde(default = "default_color_range")]
    pub color_range: ColorRange,

    /// Frames a synced video may fall behind wall time before its timeline
    /// is pulled forward instead of decoding to catch up.
    ///
    /// Default: 4.
    #[serde(default = "default_max_lag_frames")]
    pub max_lag_frames: u32,

    /// Frames decoded per `update()` while catching up to a followed source.
    ///
    /// Default: 4.
    #[serde(default = "default_max_catchup_frames")]
    pub max_catchup_frames: u32,
}

impl Default for VideoSettings {
    fn default() -> Self {
        Self {
            pixel_format: default_pixel_format(),
            color_range: default_color_range(),
            max_lag_frames: default_max_lag_frames(),
            max_catchup_frames: default_max_catchup_frames(),
        }
    }
}

impl VideoSettings {
    pub fn validate(&self) -> Result<()> {
        if self.max_catchup_frames == 0 {
            return Err(PlaybackError::Internal(
                "max_catchup_frames must be > 0".to_string(),
            ));
        }
        Ok(())
    }

    /// Parse and validate settings from JSON. Missing fields take defaults.
    pub fn from_json(json: &str) -> Result<Self> {
        let settings: Self = serde_json::from_str(json)
            .map_err(|e| PlaybackError::Internal(format!("Invalid video settings: {}", e)))?;
        settings.validate()?;
        Ok(settings)
    }
}

// ============================================================================
// Default Functions (for serde)
// ============================================================================

fn default_buffer_count() -> usize {
    4
}

fn default_buffer_frames() -> usize {
    4096 // ~93ms at 44.1kHz
}

fn default_max_variants() -> usize {
    9
}

fn default_face_size() -> f32 {
    2048.0
}

fn default_max_consecutive_errors() -> usize {
    10
}

fn default_pixel_format() -> PixelFormat {
    PixelFormat::Rgb24
}

fn default_color_range() -> ColorRange {
    ColorRange::Limited
}

fn default_max_lag_frames() -> u32 {
    4
}

fn default_max_catchup_frames() -> u32 {
    4
}
