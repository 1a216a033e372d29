//! # Desktop Bridge Implementations
//!
//! Default implementations of bridge traits for desktop platforms
//! (macOS, Windows, Linux).
//!
//! ## Overview
//!
//! - `ResourceBundle` backed by a directory tree ([`DirectoryBundle`])
//! - `AudioOutput` as an in-memory voice mixer ([`SoftwareMixer`])
//! - `AudioOutput` on the system sound card via `cpal` ([`CpalAudioOutput`])
//! - `VideoCodecProvider` for Theora via libavcodec ([`FfmpegTheoraProvider`])
//!
//! ## Feature Flags
//!
//! - `device-output`: Enable the `cpal` sound card output (default)
//! - `theora-ffmpeg`: Theora frame decoding, requires an FFmpeg installation
//!
//! ## Usage
//!
//! ```ignore
//! use bridge_desktop::{CpalAudioOutput, DirectoryBundle};
//! use std::sync::Arc;
//!
//! let bundle = Arc::new(DirectoryBundle::new("assets")?);
//! let output = Arc::new(CpalAudioOutput::new(None)?);
//! // Hand both to `EngineConfig::builder()`.
//! ```

mod bundle;
mod mixer;

#[cfg(feature = "device-output")]
mod output;

#[cfg(feature = "theora-ffmpeg")]
mod theora;

pub use bundle::DirectoryBundle;
pub use mixer::SoftwareMixer;

#[cfg(feature = "device-output")]
pub use output::CpalAudioOutput;

#[cfg(feature = "theora-ffmpeg")]
pub use theora::FfmpegTheoraProvider;
