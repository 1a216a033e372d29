//! Cross-object synchronization.
//!
//! An audio instance publishes its cursor into a [`CursorCell`] after every
//! state change and update. Other objects hold a [`CursorHandle`], which is
//! weak: dropping the audio frees the cell, and unloading it bumps the cell's
//! generation, so a stale handle reads `None` instead of a dangling value.
//! The cell also records whether its owner is playing: a stopped or paused
//! partner still has a position, but it is not moving and must not be
//! chased.

use bridge_traits::Clock;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::{Arc, Weak};
use std::time::Duration;

/// Anything that can report a playback position for others to follow.
pub trait SyncSource: Send + Sync {
    /// Current position, or `None` if the source is gone.
    fn position(&self) -> Option<Duration>;
}

/// Published cursor snapshot owned by an audio instance.
#[derive(Debug, Default)]
pub struct CursorCell {
    nanos: AtomicU64,
    playing: AtomicBool,
    generation: AtomicU64,
}

impl CursorCell {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn publish(&self, position: Duration) {
        let nanos = u64::try_from(position.as_nanos()).unwrap_or(u64::MAX);
        self.nanos.store(nanos, Ordering::Release);
    }

    pub fn get(&self) -> Duration {
        Duration::from_nanos(self.nanos.load(Ordering::Acquire))
    }

    pub fn set_playing(&self, playing: bool) {
        self.playing.store(playing, Ordering::Release);
    }

    pub fn is_playing(&self) -> bool {
        self.playing.load(Ordering::Acquire)
    }

    /// Invalidate every handle handed out so far.
    pub fn retire(&self) {
        self.nanos.store(0, Ordering::Release);
        self.playing.store(false, Ordering::Release);
        self.generation.fetch_add(1, Ordering::AcqRel);
    }

    pub fn generation(&self) -> u64 {
        self.generation.load(Ordering::Acquire)
    }

    /// Handle valid until the next [`retire`](Self::retire).
    pub fn handle(self: &Arc<Self>) -> CursorHandle {
        CursorHandle {
            cell: Arc::downgrade(self),
            generation: self.generation(),
        }
    }
}

/// Non-owning view of another instance's cursor.
#[derive(Debug, Clone)]
pub struct CursorHandle {
    cell: Weak<CursorCell>,
    generation: u64,
}

impl CursorHandle {
    /// A handle that never resolves.
    pub fn dangling() -> Self {
        Self {
            cell: Weak::new(),
            generation: 0,
        }
    }

    pub fn is_alive(&self) -> bool {
        self.position().is_some()
    }

    /// Whether the owner is alive and its cursor is advancing.
    pub fn is_playing(&self) -> bool {
        self.live_cell().is_some_and(|cell| cell.is_playing())
    }

    fn live_cell(&self) -> Option<Arc<CursorCell>> {
        let cell = self.cell.upgrade()?;
        (cell.generation() == self.generation).then_some(cell)
    }

    /// Whether both handles view the same cursor cell.
    pub fn same_source(&self, other: &CursorHandle) -> bool {
        Weak::ptr_eq(&self.cell, &other.cell)
    }
}

impl SyncSource for CursorHandle {
    fn position(&self) -> Option<Duration> {
        self.live_cell().map(|cell| cell.get())
    }
}

/// Pause-aware timeline over an injected [`Clock`].
pub struct WallClock {
    clock: Arc<dyn Clock>,
    base: Duration,
    running_since: Option<Duration>,
}

impl WallClock {
    /// A stopped timeline at zero.
    pub fn new(clock: Arc<dyn Clock>) -> Self {
        Self {
            clock,
            base: Duration::ZERO,
            running_since: None,
        }
    }

    pub fn is_running(&self) -> bool {
        self.running_since.is_some()
    }

    /// Start or resume counting. No-op while running.
    pub fn start(&mut self) {
        if self.running_since.is_none() {
            self.running_since = Some(self.clock.monotonic());
        }
    }

    /// Freeze the timeline at its current value.
    pub fn pause(&mut self) {
        self.base = self.elapsed();
        self.running_since = None;
    }

    /// Stop and return to zero.
    pub fn reset(&mut self) {
        self.base = Duration::ZERO;
        self.running_since = None;
    }

    /// Jump the timeline to `position` without changing whether it runs.
    pub fn set(&mut self, position: Duration) {
        self.base = position;
        if self.running_since.is_some() {
            self.running_since = Some(self.clock.monotonic());
        }
    }

    pub fn elapsed(&self) -> Duration {
        match self.running_since {
            Some(since) => self.base + self.clock.monotonic().saturating_sub(since),
            None => self.base,
        }
    }
}

impl std::fmt::Debug for WallClock {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("WallClock")
            .field("base", &self.base)
            .field("running_since", &self.running_since)
            .finish()
    }
}
