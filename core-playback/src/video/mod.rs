//! # Video Engine
//!
//! Plays Ogg/Theora streams into RGB frames for a presentation layer.
//!
//! ## Pipeline
//!
//! ```text
//! ResourceSource → OggDemuxer → TheoraDecoder ─(FrameDecoder)→ planes
//!                                                               │
//!            FrameReader ◀── promote ◀── YuvConverter ◀─────────┘
//! ```
//!
//! Packet demuxing and header parsing live here. Reconstructing pictures
//! from packets is the job of the host's
//! [`FrameDecoder`](bridge_traits::FrameDecoder).
//!
//! ## Pacing
//!
//! Unsynced videos advance one frame per `update()`. Synced videos show a
//! frame once its presentation time is reached on the wall clock timeline,
//! or on an attached [`SyncSource`](crate::sync::SyncSource) such as an
//! audio cursor.

mod convert;
mod decoder;
mod demux;
mod engine;
mod frame;
pub mod theora;

#[cfg(test)]
mod testing;

pub use convert::YuvConverter;
pub use decoder::TheoraDecoder;
pub use demux::{OggDemuxer, VideoPacket};
pub use engine::Video;
pub use frame::{Frame, FrameReader, FrameSlot};
