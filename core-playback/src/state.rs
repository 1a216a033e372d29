//! Shared four-state lifecycle for media objects.

use std::fmt;
use std::sync::atomic::{AtomicU8, Ordering};

/// Lifecycle state shared by audio and video objects.
///
/// ```text
/// Initial --load(ok)--> Stopped      Initial --load(fail)--> Initial
/// Stopped/Paused --play--> Playing   Playing --pause--> Paused
/// Playing/Paused --stop--> Stopped   any --unload--> Initial
/// Playing --update(end, loop)--> Playing
/// Playing --update(end, no loop)--> Stopped
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
#[repr(u8)]
pub enum MediaState {
    #[default]
    Initial = 0,
    Playing = 1,
    Paused = 2,
    Stopped = 3,
}

impl MediaState {
    /// Whether the lifecycle allows moving from `self` to `next`.
    ///
    /// Self-transitions are allowed for `Playing` (every update) and for
    /// `Stopped` and `Initial` (no-op stop/unload).
    pub fn can_transition(self, next: MediaState) -> bool {
        use MediaState::*;
        matches!(
            (self, next),
            (_, Initial)
                | (Initial, Stopped)
                | (Stopped, Playing)
                | (Paused, Playing)
                | (Playing, Playing)
                | (Playing, Paused)
                | (Playing, Stopped)
                | (Paused, Stopped)
                | (Stopped, Stopped)
        )
    }

    /// Everything except `Initial` has a decode context.
    pub fn is_loaded(self) -> bool {
        self != MediaState::Initial
    }

    fn from_u8(value: u8) -> Self {
        match value {
            1 => MediaState::Playing,
            2 => MediaState::Paused,
            3 => MediaState::Stopped,
            _ => MediaState::Initial,
        }
    }
}

impl fmt::Display for MediaState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            MediaState::Initial => "initial",
            MediaState::Playing => "playing",
            MediaState::Paused => "paused",
            MediaState::Stopped => "stopped",
        };
        f.write_str(name)
    }
}

/// Lock-free state cell for snapshot reads from other threads.
#[derive(Debug, Default)]
pub struct AtomicMediaState(AtomicU8);

impl AtomicMediaState {
    pub fn new(state: MediaState) -> Self {
        Self(AtomicU8::new(state as u8))
    }

    pub fn load(&self) -> MediaState {
        MediaState::from_u8(self.0.load(Ordering::Acquire))
    }

    pub fn store(&self, state: MediaState) {
        self.0.store(state as u8, Ordering::Release);
    }
}

/// Operations a frame driver and scripting layer use on any media object.
///
/// None of these return errors. Failures are logged and show up in
/// [`state`](Self::state) and [`is_loaded`](Self::is_loaded).
pub trait MediaObject: Send {
    /// Record the resource to load. Does not touch the bundle.
    fn set_resource(&mut self, name: &str);

    /// Open and probe the resource, allocating decode and output state.
    fn load(&mut self);

    fn play(&mut self);

    fn pause(&mut self);

    fn stop(&mut self);

    /// Release everything and return to [`MediaState::Initial`].
    fn unload(&mut self);

    /// Advance decode and presentation by one tick.
    fn update(&mut self);

    fn state(&self) -> MediaState;

    /// Name of the resource that `load` will open, if any.
    fn resource(&self) -> Option<&str>;

    fn does_autoplay(&self) -> bool;

    fn is_loopable(&self) -> bool;

    fn set_autoplay(&mut self, autoplay: bool);

    fn set_loopable(&mut self, loopable: bool);

    fn has_resource(&self) -> bool {
        self.resource().is_some()
    }

    fn is_loaded(&self) -> bool {
        self.state().is_loaded()
    }

    fn is_playing(&self) -> bool {
        self.state() == MediaState::Playing
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use MediaState::*;

    #[test]
    fn test_lifecycle_transitions() {
        assert!(Initial.can_transition(Stopped));
        assert!(Stopped.can_transition(Playing));
        assert!(Playing.can_transition(Paused));
        assert!(Paused.can_transition(Playing));
        assert!(Paused.can_transition(Stopped));
        assert!(Playing.can_transition(Playing));

        assert!(!Initial.can_transition(Playing));
        assert!(!Initial.can_transition(Paused));
        assert!(!Stopped.can_transition(Paused));
    }

    #[test]
    fn test_unload_allowed_from_everywhere() {
        for state in [Initial, Playing, Paused, Stopped] {
            assert!(state.can_transition(Initial));
        }
    }

    #[test]
    fn test_atomic_state_roundtrip() {
        let cell = AtomicMediaState::default();
        assert_eq!(cell.load(), Initial);

        cell.store(Paused);
        assert_eq!(cell.load(), Paused);
        assert!(cell.load().is_loaded());
    }

    #[test]
    fn test_display() {
        assert_eq!(Playing.to_string(), "playing");
        assert_eq!(Initial.to_string(), "initial");
    }
}
