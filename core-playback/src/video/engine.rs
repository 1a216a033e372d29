//! Streaming video engine.
//!
//! A [`Video`] decodes one frame per step, converts it to RGB in spare
//! storage and then promotes it, so readers never see a half-written frame.

use super::convert::YuvConverter;
use super::decoder::TheoraDecoder;
use super::frame::{Frame, FrameReader, FrameSlot};
use crate::config::VideoSettings;
use crate::diagnostics::Diagnostics;
use crate::error::{PlaybackError, Result};
use crate::resource::{Resource, ResourceSource};
use crate::state::{AtomicMediaState, MediaObject, MediaState};
use crate::sync::{SyncSource, WallClock};
use crate::traits::{VideoDecoder, VideoInfo};
use bridge_traits::{ResourceBundle, VideoCodecProvider};
use core_runtime::config::EngineConfig;
use std::fmt;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, info, info_span, trace, warn, Span};
use uuid::Uuid;

/// Consecutive failed frames before the stream is treated as ended.
const MAX_CONSECUTIVE_ERRORS: usize = 10;

/// Outcome of decoding one frame.
enum Step {
    Frame(u64),
    End,
    Failed,
}

/// Open decode context. Exists from a successful `load()` until `unload()`.
struct Session {
    decoder: Box<dyn VideoDecoder>,
    /// Index the next decoded frame is expected to carry.
    next_index: u64,
    consecutive_errors: usize,
}

impl Session {
    fn info(&self) -> &VideoInfo {
        self.decoder.info()
    }

    fn step(&mut self, diag: &Diagnostics) -> Step {
        match self.decoder.next_frame() {
            Ok(Some(index)) => {
                self.next_index = index + 1;
                self.consecutive_errors = 0;
                Step::Frame(index)
            }
            Ok(None) => Step::End,
            Err(err) => {
                diag.record(&err);
                self.consecutive_errors += 1;
                self.next_index += 1;
                if matches!(err, PlaybackError::Io(_))
                    || self.consecutive_errors >= MAX_CONSECUTIVE_ERRORS
                {
                    warn!(error = %err, "Giving up on stream");
                    Step::End
                } else {
                    warn!(error = %err, "Frame skipped");
                    Step::Failed
                }
            }
        }
    }

    fn rewind(&mut self, diag: &Diagnostics) -> bool {
        self.next_index = 0;
        self.consecutive_errors = 0;
        match self.decoder.rewind() {
            Ok(()) => true,
            Err(err) => {
                warn!(error = %err, "Rewind failed");
                diag.record(&err);
                false
            }
        }
    }
}

/// Where a synced video takes its presentation time from.
enum Pace {
    Wall(Duration),
    Followed(Duration),
}

/// A streamed Ogg/Theora video.
///
/// Frame reconstruction needs a [`VideoCodecProvider`] in the
/// [`EngineConfig`]; without one `load()` fails.
///
/// ```rust,no_run
/// use core_playback::{MediaObject, Video};
/// # fn frame_loop(config: &core_runtime::config::EngineConfig) {
/// let mut intro = Video::with_flags(config, true, false, true);
/// intro.set_resource("video/intro.ogv");
/// intro.load();
///
/// let frames = intro.frame_reader();
/// while intro.is_playing() {
///     intro.update();
///     if let Some(frame) = frames.current_frame() {
///         // upload frame.data to a texture
/// #       let _ = frame;
///     }
/// }
/// # }
/// ```
pub struct Video {
    id: Uuid,
    span: Span,
    bundle: Arc<dyn ResourceBundle>,
    codec: Option<Arc<dyn VideoCodecProvider>>,
    settings: VideoSettings,
    converter: YuvConverter,
    resource: Option<String>,
    autoplay: bool,
    loopable: bool,
    synced: bool,
    state: AtomicMediaState,
    slot: Arc<FrameSlot>,
    timeline: WallClock,
    sync_source: Option<Arc<dyn SyncSource>>,
    /// Timestamp of the last promoted frame.
    position: Duration,
    session: Option<Session>,
    diag: Diagnostics,
}

impl Video {
    pub fn new(config: &EngineConfig) -> Self {
        Self::with_settings(config, VideoSettings::default())
    }

    /// Build with explicit tunables. Invalid settings are logged and
    /// replaced by the defaults.
    pub fn with_settings(config: &EngineConfig, settings: VideoSettings) -> Self {
        let id = Uuid::new_v4();
        let span = info_span!("video", %id);

        let settings = match settings.validate() {
            Ok(()) => settings,
            Err(err) => {
                span.in_scope(|| warn!(error = %err, "Invalid video settings, using defaults"));
                VideoSettings::default()
            }
        };

        Self {
            id,
            span,
            bundle: config.bundle.clone(),
            codec: config.video_codec.clone(),
            converter: YuvConverter::new(settings.pixel_format, settings.color_range),
            settings,
            resource: None,
            autoplay: false,
            loopable: false,
            synced: false,
            state: AtomicMediaState::default(),
            slot: FrameSlot::new(),
            timeline: WallClock::new(config.clock.clone()),
            sync_source: None,
            position: Duration::ZERO,
            session: None,
            diag: Diagnostics::default(),
        }
    }

    pub fn with_flags(config: &EngineConfig, autoplay: bool, loopable: bool, synced: bool) -> Self {
        let mut video = Self::new(config);
        video.autoplay = autoplay;
        video.loopable = loopable;
        video.synced = synced;
        video
    }

    pub fn id(&self) -> Uuid {
        self.id
    }

    pub fn settings(&self) -> &VideoSettings {
        &self.settings
    }

    pub fn is_synced(&self) -> bool {
        self.synced
    }

    /// Pace presentation to elapsed time instead of one frame per update.
    pub fn set_synced(&mut self, synced: bool) {
        self.synced = synced;
    }

    /// Follow `source` instead of the wall clock while synced.
    pub fn set_sync_source(&mut self, source: Arc<dyn SyncSource>) {
        self.sync_source = Some(source);
    }

    pub fn clear_sync_source(&mut self) {
        self.sync_source = None;
    }

    /// Stream geometry and timing, once loaded.
    pub fn info(&self) -> Option<&VideoInfo> {
        self.session.as_ref().map(Session::info)
    }

    pub fn has_new_frame(&self) -> bool {
        self.slot.has_new_frame()
    }

    /// Latest promoted frame. Clears the new-frame flag.
    pub fn current_frame(&self) -> Option<Arc<Frame>> {
        self.slot.current()
    }

    pub fn frame_reader(&self) -> FrameReader {
        FrameReader::new(self.slot.clone())
    }

    /// Presentation time of the last promoted frame.
    pub fn position(&self) -> Duration {
        self.position
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

    fn open_session(&self, name: &str) -> Result<Session> {
        let provider = self
            .codec
            .as_ref()
            .ok_or_else(|| {
                PlaybackError::UnsupportedCodec(
                    "no video codec provider configured (desktop: enable video-ffmpeg)".into(),
                )
            })?;

        let resource = Resource::open(self.bundle.as_ref(), name)?;
        let decoder = TheoraDecoder::open(ResourceSource::new(resource), provider.as_ref())?;

        Ok(Session {
            decoder: Box::new(decoder),
            next_index: 0,
            consecutive_errors: 0,
        })
    }

    /// Convert the decoder's current planes and promote them.
    fn present(&mut self, index: u64) {
        let Some(session) = self.session.as_ref() else {
            return;
        };
        let Some(planes) = session.decoder.frame() else {
            trace!(index, "No picture yet");
            return;
        };

        let info = session.info();
        let mut data = self.slot.take_spare();
        match self.converter.convert(&planes, info, &mut data) {
            Ok(()) => {
                let timestamp = info.frame_time(index);
                let frame = Frame {
                    width: info.picture_width,
                    height: info.picture_height,
                    pixel_format: self.converter.pixel_format(),
                    stride: self.converter.stride(info.picture_width),
                    data,
                    index,
                    timestamp,
                    generation: 0,
                };
                let generation = self.slot.promote(frame);
                self.position = timestamp;
                trace!(index, generation, "Promoted frame");
            }
            Err(err) => {
                warn!(index, error = %err, "Conversion failed");
                self.diag.record(&err);
                self.slot.return_spare(data);
            }
        }
    }

    /// Handle end of stream. Returns whether playback continues.
    fn finish(&mut self) -> bool {
        let loopable = self.loopable;
        let Some(session) = self.session.as_mut() else {
            return false;
        };

        let rewound = session.rewind(&self.diag);
        self.timeline.reset();

        if loopable && rewound {
            debug!("Looping");
            self.timeline.start();
            true
        } else {
            debug!("Playback finished");
            self.set_state(MediaState::Stopped);
            false
        }
    }

    fn pace(&mut self) -> Pace {
        if let Some(source) = &self.sync_source {
            match source.position() {
                Some(position) => return Pace::Followed(position),
                None => {
                    debug!("Sync source gone, following wall clock");
                    self.sync_source = None;
                    self.timeline.set(self.position);
                }
            }
        }
        Pace::Wall(self.timeline.elapsed())
    }

    fn advance_unsynced(&mut self) {
        let Some(session) = self.session.as_mut() else {
            return;
        };
        match session.step(&self.diag) {
            Step::Frame(index) => self.present(index),
            Step::Failed => {}
            Step::End => {
                if self.finish() {
                    // Show the first frame now rather than stalling a tick
                    if let Some(Step::Frame(index)) = self.session.as_mut().map(|s| s.step(&self.diag)) {
                        self.present(index);
                    }
                }
            }
        }
    }

    fn advance_synced(&mut self) {
        let pace = self.pace();
        let max_lag = self.settings.max_lag_frames;
        let max_catchup = self.settings.max_catchup_frames;
        let position = self.position;
        let Some(session) = self.session.as_mut() else {
            return;
        };
        let frame_duration = session.info().frame_duration();

        match pace {
            Pace::Wall(now) => {
                let due = session.info().frame_time(session.next_index);
                if now < due {
                    return;
                }
                if now - due > frame_duration * max_lag {
                    debug!(?now, ?due, "Lagging, pulling timeline back");
                    self.timeline.set(due);
                }
                match session.step(&self.diag) {
                    Step::Frame(index) => self.present(index),
                    Step::Failed => {}
                    Step::End => {
                        self.finish();
                    }
                }
            }
            Pace::Followed(now) => {
                if session.next_index > 0 && now + frame_duration < position {
                    debug!(?now, ?position, "Sync source moved back, rewinding");
                    session.rewind(&self.diag);
                }

                let mut latest = None;
                let mut ended = false;
                for _ in 0..max_catchup {
                    if session.info().frame_time(session.next_index) > now {
                        break;
                    }
                    match session.step(&self.diag) {
                        Step::Frame(index) => latest = Some(index),
                        Step::Failed => {}
                        Step::End => {
                            ended = true;
                            break;
                        }
                    }
                }

                if let Some(index) = latest {
                    self.present(index);
                }
                if ended {
                    self.finish();
                }
            }
        }
    }
}

impl MediaObject for Video {
    fn set_resource(&mut self, name: &str) {
        let _entered = self.span.enter();
        debug!(resource = %name, "Resource set");
        self.resource = Some(name.to_string());
    }

    fn load(&mut self) {
        let span = self.span.clone();
        let _entered = span.enter();

        if self.session.is_some() {
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

        match self.open_session(&name) {
            Ok(session) => {
                let info = session.info();
                info!(
                    resource = %name,
                    width = info.picture_width,
                    height = info.picture_height,
                    fps = info.frame_rate(),
                    "Loaded"
                );
                self.session = Some(session);
                self.position = Duration::ZERO;
                self.timeline.reset();
                self.set_state(MediaState::Stopped);

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
        let _entered = self.span.enter();

        match self.state() {
            MediaState::Initial => {
                debug!("Play ignored, not loaded");
                self.diag.record(&PlaybackError::NotLoaded);
            }
            MediaState::Playing => {}
            MediaState::Paused | MediaState::Stopped => {
                self.timeline.start();
                self.set_state(MediaState::Playing);
            }
        }
    }

    fn pause(&mut self) {
        let _entered = self.span.enter();

        if self.state() != MediaState::Playing {
            return;
        }
        self.timeline.pause();
        self.set_state(MediaState::Paused);
    }

    fn stop(&mut self) {
        let span = self.span.clone();
        let _entered = span.enter();

        if !matches!(self.state(), MediaState::Playing | MediaState::Paused) {
            return;
        }
        if let Some(session) = self.session.as_mut() {
            session.rewind(&self.diag);
        }
        self.timeline.reset();
        self.set_state(MediaState::Stopped);
    }

    fn unload(&mut self) {
        let span = self.span.clone();
        let _entered = span.enter();

        if self.session.take().is_none() {
            return;
        }

        self.slot.clear();
        self.timeline.reset();
        self.position = Duration::ZERO;
        self.set_state(MediaState::Initial);
        info!("Unloaded");
    }

    fn update(&mut self) {
        if self.state() != MediaState::Playing {
            return;
        }

        let span = self.span.clone();
        let _entered = span.enter();

        if self.synced {
            self.advance_synced();
        } else {
            self.advance_unsynced();
        }
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

impl Drop for Video {
    fn drop(&mut self) {
        self.unload();
    }
}

impl fmt::Debug for Video {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Video")
            .field("id", &self.id)
            .field("resource", &self.resource)
            .field("state", &self.state.load())
            .field("autoplay", &self.autoplay)
            .field("loopable", &self.loopable)
            .field("synced", &self.synced)
            .field("position", &self.position)
            .finish()
    }
}
