//! Hardware audio output bridge.
//!
//! The engine streams decoded PCM into an output device through a small set
//! of voice/buffer primitives shaped after queued-buffer audio APIs: a voice
//! owns an ordered queue of buffers, consumes them front to back, and reports
//! how many it has finished so the caller can unqueue, refill, and requeue
//! them.
//!
//! Host applications provide the concrete device. `bridge-desktop` ships a
//! software mixer on top of `cpal`.

use crate::error::Result;
use std::time::Duration;

/// Device error codes reported through [`BridgeError::Device`](crate::BridgeError::Device).
pub mod codes {
    /// Handle does not name a live voice or buffer.
    pub const INVALID_NAME: i32 = 0xA001;
    /// Argument out of range (e.g. zero channels).
    pub const INVALID_VALUE: i32 = 0xA003;
    /// Operation not valid in the current state (e.g. unqueueing a pending buffer).
    pub const INVALID_OPERATION: i32 = 0xA004;
    /// Device could not allocate the requested object.
    pub const OUT_OF_MEMORY: i32 = 0xA005;
}

/// Handle to a hardware voice.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct VoiceId(pub u32);

/// Handle to a hardware PCM buffer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct BufferId(pub u32);

/// Layout of PCM submitted to a buffer. Samples are interleaved `f32`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PcmFormat {
    pub channels: u16,
    pub sample_rate: u32,
}

impl PcmFormat {
    pub fn new(channels: u16, sample_rate: u32) -> Self {
        Self {
            channels,
            sample_rate,
        }
    }

    /// Duration of `frames` frames at this sample rate.
    pub fn frames_to_duration(&self, frames: u64) -> Duration {
        if self.sample_rate == 0 {
            return Duration::ZERO;
        }
        let rate = self.sample_rate as u64;
        let nanos = (frames % rate) as u128 * 1_000_000_000 / rate as u128;
        Duration::new(frames / rate, nanos as u32)
    }

    /// Frame index nearest to `position`.
    pub fn duration_to_frames(&self, position: Duration) -> u64 {
        let scaled = position.as_nanos() * self.sample_rate as u128 + 500_000_000;
        u64::try_from(scaled / 1_000_000_000).unwrap_or(u64::MAX)
    }
}

/// State a voice reports.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum VoiceState {
    Initial,
    Playing,
    Paused,
    Stopped,
}

/// Listener-relative position in a right-handed space: +x right, +y up, -z forward.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct Vec3 {
    pub x: f32,
    pub y: f32,
    pub z: f32,
}

impl Vec3 {
    pub const ZERO: Vec3 = Vec3 {
        x: 0.0,
        y: 0.0,
        z: 0.0,
    };

    pub fn new(x: f32, y: f32, z: f32) -> Self {
        Self { x, y, z }
    }

    pub fn length(&self) -> f32 {
        (self.x * self.x + self.y * self.y + self.z * self.z).sqrt()
    }
}

/// Queued-buffer audio output device.
///
/// # Semantics
///
/// - `queue_buffers` appends to the voice's queue in order.
/// - A buffer is *processed* once the voice has played all of it. Processed
///   buffers stay at the front of the queue until unqueued.
/// - `unqueue_buffers` removes processed buffers from the front and fails
///   with `INVALID_OPERATION` if asked for more than are processed.
/// - `stop_voice` marks every queued buffer processed.
/// - A playing voice that runs out of pending buffers stops by itself.
/// - `play_voice` on a stopped voice restarts from the first queued buffer;
///   on a paused voice it resumes.
///
/// Failures carry [`BridgeError::Device`](crate::BridgeError::Device) with
/// the failing operation and one of the [`codes`].
pub trait AudioOutput: Send + Sync {
    fn create_voice(&self) -> Result<VoiceId>;

    fn destroy_voice(&self, voice: VoiceId) -> Result<()>;

    fn create_buffers(&self, count: usize) -> Result<Vec<BufferId>>;

    fn destroy_buffers(&self, buffers: &[BufferId]) -> Result<()>;

    /// Replace the contents of a buffer. `samples` is interleaved.
    fn buffer_data(&self, buffer: BufferId, format: PcmFormat, samples: &[f32]) -> Result<()>;

    fn queue_buffers(&self, voice: VoiceId, buffers: &[BufferId]) -> Result<()>;

    fn unqueue_buffers(&self, voice: VoiceId, count: usize) -> Result<Vec<BufferId>>;

    fn buffers_processed(&self, voice: VoiceId) -> Result<usize>;

    fn buffers_queued(&self, voice: VoiceId) -> Result<usize>;

    fn play_voice(&self, voice: VoiceId) -> Result<()>;

    fn pause_voice(&self, voice: VoiceId) -> Result<()>;

    fn stop_voice(&self, voice: VoiceId) -> Result<()>;

    fn voice_state(&self, voice: VoiceId) -> Result<VoiceState>;

    /// Frames played since the start of the first buffer still in the queue.
    ///
    /// Devices that cannot report it return 0, which makes cursors coarse
    /// (buffer granularity) but still correct.
    fn sample_offset(&self, _voice: VoiceId) -> Result<u64> {
        Ok(0)
    }

    /// Listener-relative source position. Attenuation and panning are the
    /// device's business.
    fn set_position(&self, voice: VoiceId, position: Vec3) -> Result<()>;
}
