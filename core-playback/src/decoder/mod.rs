//! # Audio Decoder Module
//!
//! Compressed-audio decode contexts built on the Symphonia library.
//!
//! ## Supported Formats
//!
//! | Format | Container | Feature Flag |
//! |--------|-----------|--------------|
//! | Vorbis | Ogg | `decoder-vorbis` |
//! | PCM | WAV | `decoder-pcm` |
//!
//! ## Architecture
//!
//! ```text
//! Resource → ResourceSource → MediaSourceStream → FormatReader → Decoder → AudioFrameChunk
//! ```
//!
//! The decoder never touches the filesystem: Symphonia reads the resource
//! through [`ResourceSource`](crate::resource::ResourceSource), which is the
//! `MediaSource` handed to the probe.

mod format_detector;
mod sample_converter;
mod symphonia;

pub use self::symphonia::{SymphoniaDecoder, SymphoniaFactory};
pub use format_detector::FormatDetector;
pub use sample_converter::SampleConverter;

#[cfg(not(any(feature = "decoder-vorbis", feature = "decoder-pcm")))]
compile_error!(
    "Audio decoder feature is not enabled. Enable one of: 'decoder-vorbis', 'decoder-pcm'"
);
