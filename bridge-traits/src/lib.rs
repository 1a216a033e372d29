//! # Host Bridge Traits
//!
//! Capability traits the media engine needs from its host.
//!
//! ## Overview
//!
//! The engine decodes and paces media but never touches the filesystem,
//! the sound card, or a video codec library directly. Each of those is a
//! capability the host injects through one of these traits, so the engine can
//! run against a desktop sound card, a console SDK, or a test fake without
//! change.
//!
//! ## Traits
//!
//! ### Media I/O
//! - [`ResourceBundle`](resource::ResourceBundle) - Named, random-access media assets
//! - [`AudioOutput`](audio::AudioOutput) - Queued-buffer hardware voices
//! - [`VideoCodecProvider`](video::VideoCodecProvider) - Per-stream frame decoders
//!
//! ### Utilities
//! - [`Clock`](time::Clock) - Time source for deterministic pacing
//! - [`LoggerSink`](time::LoggerSink) - Forward structured logs to host logging
//!
//! ## Platform Requirements
//!
//! | Platform | Implementation Crate | Status |
//! |----------|---------------------|--------|
//! | Desktop  | `bridge-desktop`    | ✅ Available |
//! | Consoles | TBD                 | 📋 Planned |
//!
//! ## Fail-Fast Strategy
//!
//! Missing capabilities are reported when the engine configuration is built,
//! not when the first sound is played:
//!
//! ```ignore
//! use core_runtime::config::EngineConfig;
//!
//! let config = EngineConfig::builder()
//!     .bundle(Arc::new(MemoryBundle::new()))
//!     .build()?; // Err(CapabilityMissing { capability: "AudioOutput", .. })
//! ```
//!
//! ## Error Handling
//!
//! All bridge traits use [`BridgeError`](error::BridgeError). Output devices
//! report failures as [`BridgeError::Device`] with the failing operation
//! and a device code from [`audio::codes`], which the engine logs verbatim.
//!
//! ## Thread Safety
//!
//! Bridges are shared between engine instances behind `Arc`, and output
//! devices are touched from the audio callback thread, so every trait
//! requires `Send + Sync` (frame decoders, owned by one engine, only `Send`).

pub mod audio;
pub mod error;
pub mod resource;
pub mod time;
pub mod video;

pub use error::BridgeError;

// Re-export commonly used types
pub use audio::{AudioOutput, BufferId, PcmFormat, Vec3, VoiceId, VoiceState};
pub use resource::{MemoryBundle, ResourceBundle};
pub use time::{Clock, ConsoleLogger, LogEntry, LogLevel, LoggerSink, SystemClock};
pub use video::{ChromaSampling, CodecSetup, FrameDecoder, PlanarFrame, Plane, VideoCodecProvider};
