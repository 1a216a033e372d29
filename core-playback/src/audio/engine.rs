//! Streaming audio engine.
//!
//! An [`Audio`] decodes its resource a buffer at a time into a small pool of
//! hardware buffers queued on one voice. `update()` is the only place decode
//! happens during playback: it takes back the buffers the voice finished,
//! refills them, and queues them again.

use crate::audio::pool::BufferPool;
use crate::audio::spatial::{face_direction, Face, Point};
use crate::config::AudioSettings;
use crate::decoder::SymphoniaFactory;
use crate::diagnostics::Diagnostics;
use crate::error::{PlaybackError, Result};
use crate::resource::{Resource, ResourceSource};
use crate::state::{AtomicMediaState, MediaObject, MediaState};
use crate::sync::{CursorCell, CursorHandle, SyncSource};
use crate::traits::{AudioDecoder, AudioDecoderFactory};
use crate::variants::choose_variant;
use bridge_traits::{AudioOutput, PcmFormat, ResourceBundle, Vec3, VoiceId, VoiceState};
use core_runtime::config::EngineConfig;
use rand::rngs::StdRng;
use rand::SeedableRng;
use std::fmt;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, info, info_span, trace, warn, Span};
use uuid::Uuid;

/// Decode context plus the hardware it feeds. Exists from a successful
/// `load()` until `unload()`.
struct Stream {
    decoder: Box<dyn AudioDecoder>,
    voice: VoiceId,
    pool: BufferPool,
    /// No more audio will come out of the decoder until it is rewound.
    exhausted: bool,
    /// Frames decoded since the last rewind; a loop needs at least one.
    frames_since_rewind: u64,
}

impl Stream {
    fn format(&self) -> PcmFormat {
        self.decoder.format().pcm_format()
    }

    /// Decode into free buffers and queue them until the pool is full or the
    /// stream runs out. Returns how many buffers were queued.
    fn refill(
        &mut self,
        output: &dyn AudioOutput,
        diag: &Diagnostics,
        buffer_frames: usize,
        loopable: bool,
    ) -> usize {
        let mut queued = 0;

        while !self.exhausted {
            let Some(index) = self.pool.next_free() else {
                break;
            };
            let Some((samples, frames, segments)) = self.decode_buffer(diag, buffer_frames, loopable)
            else {
                break;
            };

            let buffer = self.pool.slot(index).buffer;
            if diag
                .verify("buffer_data", output.buffer_data(buffer, self.format(), &samples))
                .is_none()
            {
                break;
            }
            if diag
                .verify("queue_buffers", output.queue_buffers(self.voice, &[buffer]))
                .is_none()
            {
                break;
            }

            trace!(buffer = buffer.0, frames, "Queued buffer");
            self.pool.mark_queued(index, frames, segments);
            queued += 1;
        }

        queued
    }

    /// Decode up to one buffer's worth of frames.
    ///
    /// At the end of the stream a loopable stream rewinds and keeps filling
    /// the same buffer; otherwise the buffer is returned short. Returns
    /// `None` when nothing could be decoded.
    #[allow(clippy::type_complexity)]
    fn decode_buffer(
        &mut self,
        diag: &Diagnostics,
        buffer_frames: usize,
        loopable: bool,
    ) -> Option<(Vec<f32>, usize, Vec<(usize, u64)>)> {
        let channels = self.decoder.format().channels.max(1) as usize;
        let mut samples = Vec::with_capacity(buffer_frames * channels);
        let mut segments: Vec<(usize, u64)> = Vec::new();
        let mut frames = 0;

        while frames < buffer_frames {
            match self.decoder.decode_frames(buffer_frames - frames) {
                Ok(Some(chunk)) if !chunk.is_empty() => {
                    let contiguous = segments.last().is_some_and(|&(offset, start)| {
                        start + (frames - offset) as u64 == chunk.start_frame
                    });
                    if !contiguous {
                        segments.push((frames, chunk.start_frame));
                    }
                    samples.extend_from_slice(&chunk.samples);
                    frames += chunk.frames;
                    self.frames_since_rewind += chunk.frames as u64;
                    continue;
                }
                Ok(_) => debug!("End of stream"),
                Err(err) => {
                    warn!(error = %err, "Decode failed, treating as end of stream");
                    diag.record(&err);
                }
            }

            if loopable && self.frames_since_rewind > 0 {
                match self.decoder.rewind() {
                    Ok(()) => {
                        debug!("Looping to start of stream");
                        self.frames_since_rewind = 0;
                        continue;
                    }
                    Err(err) => {
                        warn!(error = %err, "Rewind for loop failed");
                        diag.record(&err);
                    }
                }
            }

            self.exhausted = true;
            break;
        }

        (frames > 0).then_some((samples, frames, segments))
    }

    /// Take back every buffer the voice has finished playing.
    fn reclaim(&mut self, output: &dyn AudioOutput, diag: &Diagnostics) {
        let processed = diag
            .verify("buffers_processed", output.buffers_processed(self.voice))
            .unwrap_or(0);
        if processed == 0 {
            return;
        }

        if let Some(buffers) =
            diag.verify("unqueue_buffers", output.unqueue_buffers(self.voice, processed))
        {
            for buffer in buffers {
                self.pool.release(buffer);
            }
        }
    }

    /// Stop the voice and drop everything queued on it.
    fn flush(&mut self, output: &dyn AudioOutput, diag: &Diagnostics) {
        diag.verify("stop_voice", output.stop_voice(self.voice));
        if let Some(queued) = diag.verify("buffers_queued", output.buffers_queued(self.voice)) {
            if queued > 0 {
                diag.verify("unqueue_buffers", output.unqueue_buffers(self.voice, queued));
            }
        }
        self.pool.flush();
    }

    fn rewind(&mut self, diag: &Diagnostics) {
        if let Err(err) = self.decoder.rewind() {
            warn!(error = %err, "Rewind failed");
            diag.record(&err);
        }
        self.frames_since_rewind = 0;
        self.exhausted = false;
    }

    /// Move the decode position to `target`.
    ///
    /// A loopable stream wraps targets past its end; a non-loopable one is
    /// left exhausted.
    fn seek(&mut self, target: Duration, loopable: bool, diag: &Diagnostics) {
        let target = match self.decoder.format().duration() {
            Some(duration) if loopable && !duration.is_zero() && target >= duration => {
                let wrapped = target.as_nanos() % duration.as_nanos();
                Duration::from_nanos(u64::try_from(wrapped).unwrap_or(0))
            }
            _ => target,
        };

        self.exhausted = false;
        match self.decoder.seek(target) {
            Ok(()) => {
                self.frames_since_rewind = self.decoder.position_frame();
            }
            Err(PlaybackError::SeekOutOfBounds(_)) => {
                debug!(?target, "Seek target past end of stream");
                self.exhausted = true;
            }
            Err(err) => {
                warn!(error = %err, ?target, "Seek failed, rewinding");
                diag.record(&err);
                self.rewind(diag);
            }
        }
    }

    /// Stream frame under the play head.
    fn cursor_frame(&self, output: &dyn AudioOutput, diag: &Diagnostics) -> u64 {
        let offset = diag
            .verify("sample_offset", output.sample_offset(self.voice))
            .unwrap_or(0);
        self.pool.stream_frame_at(offset)
    }

    /// Give every hardware object back to the output.
    fn release(mut self, output: &dyn AudioOutput, diag: &Diagnostics) {
        self.flush(output, diag);
        diag.verify("destroy_buffers", output.destroy_buffers(&self.pool.buffers()));
        diag.verify("destroy_voice", output.destroy_voice(self.voice));
    }
}

/// A streamed sound.
///
/// ```rust,no_run
/// use core_playback::{Audio, MediaObject};
/// # fn frame_loop(config: &core_runtime::config::EngineConfig) {
/// let mut music = Audio::new(config);
/// music.set_resource("music/theme.ogg");
/// music.set_loopable(true);
/// music.load();
/// music.play();
///
/// loop {
///     music.update();
///     // render the rest of the frame
/// #   break;
/// }
/// # }
/// ```
pub struct Audio {
    id: Uuid,
    span: Span,
    bundle: Arc<dyn ResourceBundle>,
    output: Arc<dyn AudioOutput>,
    factory: Arc<dyn AudioDecoderFactory>,
    settings: AudioSettings,
    resource: Option<String>,
    autoplay: bool,
    loopable: bool,
    varying: bool,
    rng: StdRng,
    state: AtomicMediaState,
    cursor: Arc<CursorCell>,
    matched: Option<CursorHandle>,
    position: Option<Vec3>,
    stream: Option<Stream>,
    diag: Diagnostics,
}

impl Audio {
    pub fn new(config: &EngineConfig) -> Self {
        Self::with_settings(config, AudioSettings::default())
    }

    /// Build with explicit tunables. Invalid settings are logged and
    /// replaced by the defaults.
    pub fn with_settings(config: &EngineConfig, settings: AudioSettings) -> Self {
        let id = Uuid::new_v4();
        let span = info_span!("audio", %id);

        let settings = match settings.validate() {
            Ok(()) => settings,
            Err(err) => {
                span.in_scope(|| warn!(error = %err, "Invalid audio settings, using defaults"));
                AudioSettings::default()
            }
        };

        Self {
            id,
            span,
            bundle: config.bundle.clone(),
            output: config.audio_output.clone(),
            factory: Arc::new(SymphoniaFactory::new(settings.max_consecutive_errors)),
            settings,
            resource: None,
            autoplay: false,
            loopable: false,
            varying: false,
            rng: StdRng::from_entropy(),
            state: AtomicMediaState::default(),
            cursor: CursorCell::new(),
            matched: None,
            position: None,
            stream: None,
            diag: Diagnostics::default(),
        }
    }

    /// Replace the decoder used by subsequent loads.
    pub fn set_decoder_factory(&mut self, factory: Arc<dyn AudioDecoderFactory>) {
        self.factory = factory;
    }

    pub fn id(&self) -> Uuid {
        self.id
    }

    pub fn settings(&self) -> &AudioSettings {
        &self.settings
    }

    pub fn is_varying(&self) -> bool {
        self.varying
    }

    /// Pick among numbered variants on the next `set_resource`.
    pub fn set_varying(&mut self, varying: bool) {
        self.varying = varying;
    }

    /// Reseed the generator behind variant picks, making the sequence of
    /// chosen variants repeatable.
    pub fn seed_variants(&mut self, seed: u64) {
        self.rng = StdRng::seed_from_u64(seed);
    }

    /// Channel layout and rate of the loaded stream.
    pub fn format(&self) -> Option<PcmFormat> {
        self.stream.as_ref().map(Stream::format)
    }

    /// Length of the loaded stream, when the container declares it.
    pub fn duration(&self) -> Option<Duration> {
        self.stream
            .as_ref()
            .and_then(|stream| stream.decoder.format().duration())
    }

    /// Playback position within the stream. Zero unless playing or paused.
    pub fn cursor(&self) -> Duration {
        match (self.state(), &self.stream) {
            (MediaState::Playing | MediaState::Paused, Some(stream)) => stream
                .format()
                .frames_to_duration(stream.cursor_frame(self.output.as_ref(), &self.diag)),
            _ => Duration::ZERO,
        }
    }

    pub fn cursor_secs(&self) -> f64 {
        self.cursor().as_secs_f64()
    }

    /// Weak view of this instance's cursor for others to follow.
    pub fn cursor_handle(&self) -> CursorHandle {
        self.cursor.handle()
    }

    /// Keep this instance's cursor aligned with `other`'s.
    pub fn match_with(&mut self, other: &Audio) {
        let _entered = self.span.enter();
        let handle = other.cursor_handle();
        if handle.same_source(&self.cursor.handle()) {
            warn!("Ignoring match with itself");
            return;
        }
        debug!(partner = %other.id, "Matched");
        self.matched = Some(handle);
    }

    pub fn unmatch(&mut self) {
        self.matched = None;
    }

    /// Whether a live partner is being followed.
    pub fn is_matched(&self) -> bool {
        self.matched.as_ref().is_some_and(CursorHandle::is_alive)
    }

    /// Place the sound on a cube face. Applied now if loaded, else on load.
    pub fn set_position(&mut self, face: Face, origin: Point) {
        let direction = face_direction(face, origin, self.settings.face_size);
        self.position = Some(direction);

        if let Some(stream) = &self.stream {
            self.diag
                .verify("set_position", self.output.set_position(stream.voice, direction));
        }
    }

    /// Display text of the most recent failure, if any.
    pub fn last_error(&self) -> Option<String> {
        self.diag.last_error()
    }

    fn set_state(&self, next: MediaState) {
        let current = self.state.load();
        debug_assert!(current.can_transition(next), "{current} -> {next}");
        if current != next {
            debug!(from = %current, to = %next, "State change");
        }
        self.state.store(next);
    }

    fn publish_cursor(&self) {
        self.cursor.publish(self.cursor());
        self.cursor.set_playing(self.state() == MediaState::Playing);
    }

    /// Partner cursor, dropping the match if the partner is gone.
    fn partner_position(&mut self) -> Option<Duration> {
        let handle = self.matched.as_ref()?;
        match handle.position() {
            Some(position) => Some(position),
            None => {
                debug!("Matched partner gone, clearing match");
                self.matched = None;
                None
            }
        }
    }

    fn open_stream(&self, name: &str) -> Result<Stream> {
        let resource = Resource::open(self.bundle.as_ref(), name)?;
        let decoder = self.factory.open(ResourceSource::new(resource))?;

        let voice = self.output.create_voice()?;
        let buffers = match self.output.create_buffers(self.settings.buffer_count) {
            Ok(buffers) => buffers,
            Err(err) => {
                self.diag
                    .verify("destroy_voice", self.output.destroy_voice(voice));
                return Err(err.into());
            }
        };

        if let Some(position) = self.position {
            self.diag
                .verify("set_position", self.output.set_position(voice, position));
        }

        Ok(Stream {
            decoder,
            voice,
            pool: BufferPool::new(buffers),
            exhausted: false,
            frames_since_rewind: 0,
        })
    }
}

impl MediaObject for Audio {
    fn set_resource(&mut self, name: &str) {
        let _entered = self.span.enter();
        let chosen = if self.varying {
            choose_variant(
                self.bundle.as_ref(),
                name,
                self.settings.max_variants,
                &mut self.rng,
            )
        } else {
            name.to_string()
        };
        debug!(resource = %chosen, "Resource set");
        self.resource = Some(chosen);
    }

    fn load(&mut self) {
        let span = self.span.clone();
        let _entered = span.enter();

        if self.stream.is_some() {
            debug!("Already loaded");
            return;
        }

        let Some(name) = self.resource.clone() else {
            let err = PlaybackError::ResourceUnavailable {
                name: String::new(),
                reason: "no resource set".to_string(),
            };
            warn!(error = %err, "Load failed");
            self.diag.record(&err);
            return;
        };

        match self.open_stream(&name) {
            Ok(stream) => {
                let format = stream.format();
                info!(
                    resource = %name,
                    channels = format.channels,
                    sample_rate = format.sample_rate,
                    "Loaded"
                );
                self.stream = Some(stream);
                self.set_state(MediaState::Stopped);
                self.publish_cursor();

                if self.autoplay {
                    self.play();
                }
            }
            Err(err) => {
                warn!(resource = %name, error = %err, "Load failed");
                self.diag.record(&err);
            }
        }
    }

    fn play(&mut self) {
        let span = self.span.clone();
        let _entered = span.enter();

        match self.state() {
            MediaState::Initial => {
                debug!("Play ignored, not loaded");
                self.diag.record(&PlaybackError::NotLoaded);
                return;
            }
            MediaState::Playing => return,
            MediaState::Paused => {
                if let Some(stream) = &self.stream {
                    self.diag
                        .verify("play_voice", self.output.play_voice(stream.voice));
                }
                self.set_state(MediaState::Playing);
            }
            MediaState::Stopped => {
                let target = self.partner_position();
                let Some(stream) = self.stream.as_mut() else {
                    return;
                };

                if let Some(target) = target {
                    debug!(?target, "Starting at matched cursor");
                    stream.seek(target, self.loopable, &self.diag);
                }

                stream.refill(
                    self.output.as_ref(),
                    &self.diag,
                    self.settings.buffer_frames,
                    self.loopable,
                );
                if stream.pool.queued_count() == 0 {
                    debug!("Nothing to play");
                    stream.rewind(&self.diag);
                    return;
                }

                self.diag
                    .verify("play_voice", self.output.play_voice(stream.voice));
                self.set_state(MediaState::Playing);
            }
        }

        self.publish_cursor();
    }

    fn pause(&mut self) {
        let _entered = self.span.enter();

        if self.state() != MediaState::Playing {
            return;
        }
        if let Some(stream) = &self.stream {
            self.diag
                .verify("pause_voice", self.output.pause_voice(stream.voice));
        }
        self.set_state(MediaState::Paused);
        self.publish_cursor();
    }

    fn stop(&mut self) {
        let span = self.span.clone();
        let _entered = span.enter();

        if !matches!(self.state(), MediaState::Playing | MediaState::Paused) {
            return;
        }
        if let Some(stream) = self.stream.as_mut() {
            stream.flush(self.output.as_ref(), &self.diag);
            stream.rewind(&self.diag);
        }
        self.set_state(MediaState::Stopped);
        self.publish_cursor();
    }

    fn unload(&mut self) {
        let span = self.span.clone();
        let _entered = span.enter();

        let Some(stream) = self.stream.take() else {
            return;
        };

        stream.release(self.output.as_ref(), &self.diag);
        self.cursor.retire();
        self.matched = None;
        self.set_state(MediaState::Initial);
        info!("Unloaded");
    }

    fn update(&mut self) {
        if self.state() != MediaState::Playing {
            return;
        }

        let span = self.span.clone();
        let _entered = span.enter();

        // A stopped or paused partner holds still; chasing it would restart
        // this voice every update.
        let partner = self
            .partner_position()
            .filter(|_| self.matched.as_ref().is_some_and(CursorHandle::is_playing));
        let buffer_frames = self.settings.buffer_frames;
        let loopable = self.loopable;
        let output = self.output.as_ref();
        let diag = &self.diag;
        let Some(stream) = self.stream.as_mut() else {
            return;
        };

        if let Some(target) = partner {
            let format = stream.format();
            let own = format.frames_to_duration(stream.cursor_frame(output, diag));
            let tolerance = format.frames_to_duration(buffer_frames as u64);
            let drift = if own > target { own - target } else { target - own };
            if drift > tolerance {
                debug!(?own, ?target, "Resynchronizing to matched cursor");
                stream.flush(output, diag);
                stream.seek(target, loopable, diag);
                stream.refill(output, diag, buffer_frames, loopable);
                diag.verify("play_voice", output.play_voice(stream.voice));
            }
        }

        stream.reclaim(output, diag);
        stream.refill(output, diag, buffer_frames, loopable);

        let mut finished = false;
        let voice_state = diag.verify("voice_state", output.voice_state(stream.voice));
        if matches!(voice_state, Some(VoiceState::Stopped | VoiceState::Initial)) {
            let queued = stream.pool.queued_count();
            if queued > 0 {
                warn!(queued, "Voice ran dry, restarting");
                diag.verify("play_voice", output.play_voice(stream.voice));
            } else if stream.exhausted {
                debug!("Playback finished");
                stream.rewind(diag);
                finished = true;
            }
        }

        if finished {
            self.set_state(MediaState::Stopped);
        }
        self.publish_cursor();
    }

    fn state(&self) -> MediaState {
        self.state.load()
    }

    fn resource(&self) -> Option<&str> {
        self.resource.as_deref()
    }

    fn does_autoplay(&self) -> bool {
        self.autoplay
    }

    fn is_loopable(&self) -> bool {
        self.loopable
    }

    fn set_autoplay(&mut self, autoplay: bool) {
        self.autoplay = autoplay;
    }

    fn set_loopable(&mut self, loopable: bool) {
        self.loopable = loopable;
    }
}

impl Drop for Audio {
    fn drop(&mut self) {
        self.unload();
    }
}

impl fmt::Debug for Audio {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Audio")
            .field("id", &self.id)
            .field("resource", &self.resource)
            .field("state", &self.state.load())
            .field("autoplay", &self.autoplay)
            .field("loopable", &self.loopable)
            .field("varying", &self.varying)
            .field("matched", &self.matched.is_some())
            .finish()
    }
}
