//! # Streaming Media Core
//!
//! Decodes and plays compressed audio and video incrementally, driven by a
//! host frame loop calling `update()` on each live media object.
//!
//! ## Overview
//!
//! This crate handles:
//! - Reading resources from a host bundle through a seekable byte source
//! - Vorbis and PCM audio streamed through a fixed pool of hardware buffers
//! - Ogg/Theora video converted to RGB behind a double buffer
//! - Cursor matching between sounds, and video paced to a clock or a sound
//!
//! ## Example
//!
//! ```rust,no_run
//! use core_playback::{Audio, MediaObject, Video};
//! # fn run(config: &core_runtime::config::EngineConfig) {
//! let mut music = Audio::new(config);
//! music.set_resource("music/theme.ogg");
//! music.set_loopable(true);
//! music.load();
//! music.play();
//!
//! let mut ambience = Audio::new(config);
//! ambience.set_resource("music/theme_strings.ogg");
//! ambience.match_with(&music);
//! ambience.load();
//! ambience.play();
//!
//! let mut objects: Vec<Box<dyn MediaObject>> = vec![Box::new(music), Box::new(ambience)];
//! loop {
//!     for object in objects.iter_mut() {
//!         object.update();
//!     }
//! #   break;
//! }
//! # let _ = Video::new(config);
//! # }
//! ```

pub mod audio;
pub mod config;
pub mod decoder;
mod diagnostics;
pub mod error;
pub mod resource;
pub mod state;
pub mod sync;
pub mod traits;
pub mod variants;
pub mod video;

pub use audio::{Audio, Face, Point};
pub use config::{AudioSettings, ColorRange, PixelFormat, VideoSettings};
pub use decoder::{FormatDetector, SymphoniaDecoder, SymphoniaFactory};
pub use error::{PlaybackError, Result};
pub use resource::{Resource, ResourceSource};
pub use state::{AtomicMediaState, MediaObject, MediaState};
pub use sync::{CursorCell, CursorHandle, SyncSource, WallClock};
pub use traits::{
    AudioCodec, AudioDecoder, AudioDecoderFactory, AudioFormat, AudioFrameChunk, VideoDecoder,
    VideoInfo,
};
pub use video::{Frame, FrameReader, TheoraDecoder, Video, YuvConverter};
