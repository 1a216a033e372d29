//! # Engine Configuration Module
//!
//! Holds the host capabilities every media engine instance is built from.
//!
//! ## Overview
//!
//! The configuration system uses a builder pattern to construct an
//! `EngineConfig` holding the injected bridges. It enforces fail-fast
//! validation so a host learns about a missing capability when it builds
//! the configuration, not when the first sound should play.
//!
//! ## Required Capabilities
//!
//! - `ResourceBundle` - Where media assets are read from
//! - `AudioOutput` - Hardware voices for audio playback
//!
//! ## Optional Capabilities
//!
//! - `Clock` - Pacing time source (default: `SystemClock`)
//! - `VideoCodecProvider` - Frame decoding; without it video fails to load
//!
//! When the `desktop-shims` feature is enabled, a `DirectoryBundle` over
//! [`resource_root`](EngineConfigBuilder::resource_root) and a
//! `CpalAudioOutput` on the default device are injected when not provided.
//! The `video-ffmpeg` feature adds `FfmpegTheoraProvider` as the default
//! video codec.
//!
//! ## Usage
//!
//! ```ignore
//! use core_runtime::config::EngineConfig;
//! use std::sync::Arc;
//!
//! let config = EngineConfig::builder()
//!     .bundle(Arc::new(MyBundle::new()))
//!     .audio_output(Arc::new(MyOutput::new()))
//!     .video_codec(Arc::new(MyTheora::new()))
//!     .build()?;
//! ```

use crate::error::{Error, Result};
use bridge_traits::{AudioOutput, Clock, ResourceBundle, SystemClock, VideoCodecProvider};
use std::path::PathBuf;
use std::sync::Arc;

/// Host capabilities shared by all engine instances.
///
/// Cheap to clone; every field is an `Arc`.
#[derive(Clone)]
pub struct EngineConfig {
    /// Source of media resources
    pub bundle: Arc<dyn ResourceBundle>,

    /// Hardware audio output
    pub audio_output: Arc<dyn AudioOutput>,

    /// Time source for frame pacing
    pub clock: Arc<dyn Clock>,

    /// Video frame decoder factory (optional)
    pub video_codec: Option<Arc<dyn VideoCodecProvider>>,

    /// Directory the default bundle was created over, if any
    pub resource_root: Option<PathBuf>,
}

impl std::fmt::Debug for EngineConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EngineConfig")
            .field("bundle", &"ResourceBundle { ... }")
            .field("audio_output", &"AudioOutput { ... }")
            .field("clock", &"Clock { ... }")
            .field(
                "video_codec",
                &self.video_codec.as_ref().map(|codec| codec.codec_name().to_string()),
            )
            .field("resource_root", &self.resource_root)
            .finish()
    }
}

impl EngineConfig {
    /// Creates a new builder for constructing an `EngineConfig`.
    pub fn builder() -> EngineConfigBuilder {
        EngineConfigBuilder::default()
    }

    /// Whether video resources can be decoded.
    pub fn supports_video(&self) -> bool {
        self.video_codec.is_some()
    }
}

#[cfg(not(feature = "desktop-shims"))]
fn bundle_missing_error() -> Error {
    Error::CapabilityMissing {
        capability: "ResourceBundle".to_string(),
        message: "ResourceBundle implementation is required to read media assets. \
                 Desktop: enable the 'desktop-shims' feature and set resource_root() to use DirectoryBundle. \
                 Embedded: inject a bundle over the packaged asset archive."
            .to_string(),
    }
}

#[cfg(not(feature = "desktop-shims"))]
fn audio_output_missing_error() -> Error {
    Error::CapabilityMissing {
        capability: "AudioOutput".to_string(),
        message: "AudioOutput implementation is required for audio playback. \
                 Desktop: enable the 'desktop-shims' feature to use the default CpalAudioOutput. \
                 Tests: inject bridge_desktop::SoftwareMixer."
            .to_string(),
    }
}

#[cfg(feature = "desktop-shims")]
fn provide_default_bundle(resource_root: Option<&PathBuf>) -> Result<Arc<dyn ResourceBundle>> {
    use bridge_desktop::DirectoryBundle;

    let root = resource_root.ok_or_else(|| {
        Error::Config(
            "Resource root is required when no bundle is injected. Use .resource_root() to set it."
                .to_string(),
        )
    })?;

    let bundle: Arc<dyn ResourceBundle> = Arc::new(DirectoryBundle::new(root.clone())?);
    Ok(bundle)
}

#[cfg(not(feature = "desktop-shims"))]
fn provide_default_bundle(_resource_root: Option<&PathBuf>) -> Result<Arc<dyn ResourceBundle>> {
    Err(bundle_missing_error())
}

#[cfg(feature = "desktop-shims")]
fn provide_default_audio_output(device: Option<&str>) -> Result<Arc<dyn AudioOutput>> {
    use bridge_desktop::CpalAudioOutput;

    let output: Arc<dyn AudioOutput> = Arc::new(CpalAudioOutput::new(device)?);
    Ok(output)
}

#[cfg(not(feature = "desktop-shims"))]
fn provide_default_audio_output(_device: Option<&str>) -> Result<Arc<dyn AudioOutput>> {
    Err(audio_output_missing_error())
}

#[cfg(feature = "video-ffmpeg")]
fn provide_default_video_codec() -> Result<Option<Arc<dyn VideoCodecProvider>>> {
    use bridge_desktop::FfmpegTheoraProvider;

    let codec: Arc<dyn VideoCodecProvider> = Arc::new(FfmpegTheoraProvider::new()?);
    Ok(Some(codec))
}

#[cfg(not(feature = "video-ffmpeg"))]
fn provide_default_video_codec() -> Result<Option<Arc<dyn VideoCodecProvider>>> {
    Ok(None)
}

/// Builder for constructing [`EngineConfig`] instances.
#[derive(Default)]
pub struct EngineConfigBuilder {
    resource_root: Option<PathBuf>,
    output_device: Option<String>,
    bundle: Option<Arc<dyn ResourceBundle>>,
    audio_output: Option<Arc<dyn AudioOutput>>,
    clock: Option<Arc<dyn Clock>>,
    video_codec: Option<Arc<dyn VideoCodecProvider>>,
}

impl EngineConfigBuilder {
    /// Directory the default desktop bundle serves resources from.
    ///
    /// Ignored when a bundle is injected with [`bundle`](Self::bundle).
    pub fn resource_root<P: Into<PathBuf>>(mut self, path: P) -> Self {
        self.resource_root = Some(path.into());
        self
    }

    /// Name of the output device the default desktop output opens.
    pub fn output_device(mut self, name: impl Into<String>) -> Self {
        self.output_device = Some(name.into());
        self
    }

    /// Sets the resource bundle (required unless `desktop-shims` provides one).
    pub fn bundle(mut self, bundle: Arc<dyn ResourceBundle>) -> Self {
        self.bundle = Some(bundle);
        self
    }

    /// Sets the audio output (required unless `desktop-shims` provides one).
    pub fn audio_output(mut self, output: Arc<dyn AudioOutput>) -> Self {
        self.audio_output = Some(output);
        self
    }

    /// Sets the pacing clock. Defaults to [`SystemClock`].
    pub fn clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = Some(clock);
        self
    }

    /// Sets the video frame decoder factory.
    pub fn video_codec(mut self, codec: Arc<dyn VideoCodecProvider>) -> Self {
        self.video_codec = Some(codec);
        self
    }

    /// Builds the final `EngineConfig` instance.
    ///
    /// # Returns
    ///
    /// Returns an error if:
    /// - A required capability is missing and no desktop default applies
    /// - The desktop default bundle cannot be opened (missing root)
    /// - The desktop audio device cannot be opened
    /// - The default FFmpeg video codec cannot be initialized
    pub fn build(self) -> Result<EngineConfig> {
        let bundle = match self.bundle {
            Some(bundle) => bundle,
            None => provide_default_bundle(self.resource_root.as_ref())?,
        };

        let audio_output = match self.audio_output {
            Some(output) => output,
            None => provide_default_audio_output(self.output_device.as_deref())?,
        };

        let video_codec = match self.video_codec {
            Some(codec) => Some(codec),
            None => provide_default_video_codec()?,
        };

        let clock = self
            .clock
            .unwrap_or_else(|| Arc::new(SystemClock::new()) as Arc<dyn Clock>);

        Ok(EngineConfig {
            bundle,
            audio_output,
            clock,
            video_codec,
            resource_root: self.resource_root,
        })
    }
}
