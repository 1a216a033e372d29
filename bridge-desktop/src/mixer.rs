//! Software voice mixer.
//!
//! Implements the queued-buffer [`AudioOutput`] contract entirely in memory.
//! [`render`](SoftwareMixer::render) pulls interleaved device-format samples
//! out of every playing voice; `CpalAudioOutput` calls it from the device
//! callback, tests call it directly to advance playback by an exact number
//! of frames.

use bridge_traits::{
    audio::{codes, AudioOutput, BufferId, PcmFormat, Vec3, VoiceId, VoiceState},
    error::{BridgeError, Result},
};
use parking_lot::Mutex;
use std::collections::{HashMap, VecDeque};
use std::f32::consts::FRAC_PI_4;
use tracing::trace;

#[derive(Default)]
struct PcmBuffer {
    format: Option<PcmFormat>,
    samples: Vec<f32>,
}

impl PcmBuffer {
    fn frames(&self) -> usize {
        match self.format {
            Some(format) if format.channels > 0 => self.samples.len() / format.channels as usize,
            _ => 0,
        }
    }
}

struct Voice {
    queue: VecDeque<BufferId>,
    /// Leading entries of `queue` that have been fully played.
    processed: usize,
    /// Fractional read position, in source frames, within `queue[processed]`.
    cursor: f64,
    state: VoiceState,
    position: Vec3,
}

impl Voice {
    fn new() -> Self {
        Self {
            queue: VecDeque::new(),
            processed: 0,
            cursor: 0.0,
            state: VoiceState::Initial,
            position: Vec3::ZERO,
        }
    }

    /// Skip past exhausted buffers. Returns the buffer to read from, or
    /// stops the voice when nothing is pending.
    fn settle<'a>(&mut self, buffers: &'a HashMap<BufferId, PcmBuffer>) -> Option<&'a PcmBuffer> {
        loop {
            let Some(id) = self.queue.get(self.processed) else {
                self.state = VoiceState::Stopped;
                self.cursor = 0.0;
                return None;
            };
            let buffer = buffers.get(id)?;
            let frames = buffer.frames() as f64;
            if self.cursor < frames {
                return Some(buffer);
            }
            self.cursor -= frames;
            self.processed += 1;
        }
    }
}

#[derive(Default)]
struct MixerState {
    voices: HashMap<VoiceId, Voice>,
    buffers: HashMap<BufferId, PcmBuffer>,
    next_voice: u32,
    next_buffer: u32,
}

impl MixerState {
    fn voice_mut(&mut self, voice: VoiceId, operation: &str) -> Result<&mut Voice> {
        self.voices
            .get_mut(&voice)
            .ok_or_else(|| BridgeError::device(operation, codes::INVALID_NAME))
    }

    fn is_queued(&self, buffer: BufferId) -> bool {
        self.voices.values().any(|v| v.queue.contains(&buffer))
    }
}

/// In-memory implementation of [`AudioOutput`].
pub struct SoftwareMixer {
    device: PcmFormat,
    buffer_limit: Option<usize>,
    state: Mutex<MixerState>,
}

impl SoftwareMixer {
    /// Mixer producing samples in `device` format.
    pub fn new(device: PcmFormat) -> Self {
        Self {
            device,
            buffer_limit: None,
            state: Mutex::new(MixerState::default()),
        }
    }

    /// Cap the number of live buffers; allocations beyond it fail with
    /// `OUT_OF_MEMORY`.
    pub fn with_buffer_limit(mut self, limit: usize) -> Self {
        self.buffer_limit = Some(limit);
        self
    }

    pub fn device_format(&self) -> PcmFormat {
        self.device
    }

    pub fn voice_count(&self) -> usize {
        self.state.lock().voices.len()
    }

    pub fn buffer_count(&self) -> usize {
        self.state.lock().buffers.len()
    }

    /// Position last forwarded for `voice`.
    pub fn voice_position(&self, voice: VoiceId) -> Option<Vec3> {
        self.state.lock().voices.get(&voice).map(|v| v.position)
    }

    /// Mix every playing voice into `out`, which is interleaved in device
    /// format. `out` is overwritten.
    pub fn render(&self, out: &mut [f32]) {
        out.fill(0.0);

        let channels = self.device.channels.max(1) as usize;
        let mut state = self.state.lock();
        let MixerState {
            voices, buffers, ..
        } = &mut *state;

        for voice in voices.values_mut() {
            if voice.state != VoiceState::Playing {
                continue;
            }

            let (left_gain, right_gain) = pan_gains(voice.position);

            for frame in out.chunks_mut(channels) {
                let Some(buffer) = voice.settle(buffers) else {
                    break;
                };
                let Some(format) = buffer.format else {
                    break;
                };

                let src_channels = format.channels as usize;
                let base = voice.cursor as usize * src_channels;
                let (left, right) = if src_channels == 1 {
                    let sample = buffer.samples[base];
                    (sample * left_gain, sample * right_gain)
                } else {
                    (buffer.samples[base], buffer.samples[base + 1])
                };

                if channels == 1 {
                    frame[0] += (left + right) * 0.5;
                } else {
                    frame[0] += left;
                    frame[1] += right;
                }

                voice.cursor += format.sample_rate as f64 / self.device.sample_rate as f64;
            }

            // Mark a buffer that just ran out as processed right away.
            if voice.state == VoiceState::Playing {
                voice.settle(buffers);
            }
        }

        for sample in out.iter_mut() {
            *sample = sample.clamp(-1.0, 1.0);
        }
    }

    /// Render `frames` device frames into a fresh vector.
    pub fn render_frames(&self, frames: usize) -> Vec<f32> {
        let mut out = vec![0.0; frames * self.device.channels.max(1) as usize];
        self.render(&mut out);
        out
    }
}

/// Constant-power stereo gains from the horizontal direction of `position`.
fn pan_gains(position: Vec3) -> (f32, f32) {
    let length = position.length();
    let pan = if length > f32::EPSILON {
        (position.x / length).clamp(-1.0, 1.0)
    } else {
        0.0
    };
    let angle = (pan + 1.0) * FRAC_PI_4;
    (angle.cos(), angle.sin())
}

impl AudioOutput for SoftwareMixer {
    fn create_voice(&self) -> Result<VoiceId> {
        let mut state = self.state.lock();
        state.next_voice += 1;
        let id = VoiceId(state.next_voice);
        state.voices.insert(id, Voice::new());
        trace!(voice = id.0, "Created voice");
        Ok(id)
    }

    fn destroy_voice(&self, voice: VoiceId) -> Result<()> {
        self.state
            .lock()
            .voices
            .remove(&voice)
            .map(|_| ())
            .ok_or_else(|| BridgeError::device("destroy_voice", codes::INVALID_NAME))
    }

    fn create_buffers(&self, count: usize) -> Result<Vec<BufferId>> {
        let mut state = self.state.lock();
        if let Some(limit) = self.buffer_limit {
            if state.buffers.len() + count > limit {
                return Err(BridgeError::device("create_buffers", codes::OUT_OF_MEMORY));
            }
        }

        let mut ids = Vec::with_capacity(count);
        for _ in 0..count {
            state.next_buffer += 1;
            let id = BufferId(state.next_buffer);
            state.buffers.insert(id, PcmBuffer::default());
            ids.push(id);
        }
        Ok(ids)
    }

    fn destroy_buffers(&self, buffers: &[BufferId]) -> Result<()> {
        let mut state = self.state.lock();
        if buffers.iter().any(|id| state.is_queued(*id)) {
            return Err(BridgeError::device("destroy_buffers", codes::INVALID_OPERATION));
        }
        if buffers.iter().any(|id| !state.buffers.contains_key(id)) {
            return Err(BridgeError::device("destroy_buffers", codes::INVALID_NAME));
        }
        for id in buffers {
            state.buffers.remove(id);
        }
        Ok(())
    }

    fn buffer_data(&self, buffer: BufferId, format: PcmFormat, samples: &[f32]) -> Result<()> {
        if format.channels == 0 || format.channels > 2 || format.sample_rate == 0 {
            return Err(BridgeError::device("buffer_data", codes::INVALID_VALUE));
        }

        let mut state = self.state.lock();
        if state.is_queued(buffer) {
            return Err(BridgeError::device("buffer_data", codes::INVALID_OPERATION));
        }
        let slot = state
            .buffers
            .get_mut(&buffer)
            .ok_or_else(|| BridgeError::device("buffer_data", codes::INVALID_NAME))?;

        slot.format = Some(format);
        slot.samples.clear();
        slot.samples.extend_from_slice(samples);
        Ok(())
    }

    fn queue_buffers(&self, voice: VoiceId, buffers: &[BufferId]) -> Result<()> {
        let mut state = self.state.lock();
        if buffers.iter().any(|id| !state.buffers.contains_key(id)) {
            return Err(BridgeError::device("queue_buffers", codes::INVALID_NAME));
        }
        let voice = state.voice_mut(voice, "queue_buffers")?;
        voice.queue.extend(buffers.iter().copied());
        Ok(())
    }

    fn unqueue_buffers(&self, voice: VoiceId, count: usize) -> Result<Vec<BufferId>> {
        let mut state = self.state.lock();
        let voice = state.voice_mut(voice, "unqueue_buffers")?;
        if count > voice.processed {
            return Err(BridgeError::device("unqueue_buffers", codes::INVALID_VALUE));
        }
        voice.processed -= count;
        Ok(voice.queue.drain(..count).collect())
    }

    fn buffers_processed(&self, voice: VoiceId) -> Result<usize> {
        let mut state = self.state.lock();
        Ok(state.voice_mut(voice, "buffers_processed")?.processed)
    }

    fn buffers_queued(&self, voice: VoiceId) -> Result<usize> {
        let mut state = self.state.lock();
        Ok(state.voice_mut(voice, "buffers_queued")?.queue.len())
    }

    fn play_voice(&self, voice: VoiceId) -> Result<()> {
        let mut state = self.state.lock();
        let voice = state.voice_mut(voice, "play_voice")?;
        match voice.state {
            VoiceState::Playing => {}
            VoiceState::Paused => voice.state = VoiceState::Playing,
            VoiceState::Initial | VoiceState::Stopped => {
                voice.processed = 0;
                voice.cursor = 0.0;
                voice.state = if voice.queue.is_empty() {
                    VoiceState::Stopped
                } else {
                    VoiceState::Playing
                };
            }
        }
        Ok(())
    }

    fn pause_voice(&self, voice: VoiceId) -> Result<()> {
        let mut state = self.state.lock();
        let voice = state.voice_mut(voice, "pause_voice")?;
        if voice.state == VoiceState::Playing {
            voice.state = VoiceState::Paused;
        }
        Ok(())
    }

    fn stop_voice(&self, voice: VoiceId) -> Result<()> {
        let mut state = self.state.lock();
        let voice = state.voice_mut(voice, "stop_voice")?;
        voice.state = VoiceState::Stopped;
        voice.processed = voice.queue.len();
        voice.cursor = 0.0;
        Ok(())
    }

    fn voice_state(&self, voice: VoiceId) -> Result<VoiceState> {
        let mut state = self.state.lock();
        Ok(state.voice_mut(voice, "voice_state")?.state)
    }

    fn sample_offset(&self, voice: VoiceId) -> Result<u64> {
        let mut state = self.state.lock();
        let MixerState {
            voices, buffers, ..
        } = &mut *state;
        let voice = voices
            .get(&voice)
            .ok_or_else(|| BridgeError::device("sample_offset", codes::INVALID_NAME))?;

        if !matches!(voice.state, VoiceState::Playing | VoiceState::Paused) {
            return Ok(0);
        }

        let played: usize = voice
            .queue
            .iter()
            .take(voice.processed)
            .filter_map(|id| buffers.get(id))
            .map(PcmBuffer::frames)
            .sum();
        Ok(played as u64 + voice.cursor as u64)
    }

    fn set_position(&self, voice: VoiceId, position: Vec3) -> Result<()> {
        let mut state = self.state.lock();
        state.voice_mut(voice, "set_position")?.position = position;
        Ok(())
    }
}
