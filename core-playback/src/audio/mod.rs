//! # Audio Engine
//!
//! Streams a compressed sound through a fixed pool of hardware buffers.
//!
//! ## Buffer Lifecycle
//!
//! ```text
//!            decode + buffer_data + queue
//!   Free ─────────────────────────────────▶ Queued
//!    ▲                                        │
//!    └──────── unqueue (voice processed) ◀────┘
//! ```
//!
//! `play()` from stopped fills and queues every free buffer before starting
//! the voice. Each `update()` reclaims processed buffers and refills them.
//! At the end of a stream, a loopable sound rewinds inside the buffer being
//! filled; otherwise the last buffer goes out short and the sound stops once
//! it has drained.

mod engine;
mod pool;
mod spatial;

pub use engine::Audio;
pub use pool::{BufferPool, Slot, SlotState};
pub use spatial::{face_direction, Face, Point};
