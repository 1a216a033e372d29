//! Presented frames and the double buffer behind them.
//!
//! The engine converts into a spare buffer and then promotes it. Readers
//! only ever see promoted frames, each behind its own `Arc`, so a frame in
//! hand never changes underneath them.

use crate::config::PixelFormat;
use parking_lot::Mutex;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;

/// A fully converted picture.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Frame {
    pub width: u32,
    pub height: u32,
    pub pixel_format: PixelFormat,
    /// Bytes per row.
    pub stride: usize,
    pub data: Vec<u8>,
    /// Index of the frame in the stream.
    pub index: u64,
    /// Presentation time from the start of the stream.
    pub timestamp: Duration,
    /// Promotion counter; strictly increases per slot.
    pub generation: u64,
}

impl Frame {
    pub fn row(&self, row: u32) -> &[u8] {
        let start = row as usize * self.stride;
        &self.data[start..start + self.stride]
    }
}

/// Current frame plus the storage recycled for the next conversion.
#[derive(Debug, Default)]
pub struct FrameSlot {
    current: Mutex<Option<Arc<Frame>>>,
    spare: Mutex<Option<Vec<u8>>>,
    has_new: AtomicBool,
    generation: AtomicU64,
}

impl FrameSlot {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    /// Buffer to convert the next frame into.
    pub fn take_spare(&self) -> Vec<u8> {
        self.spare.lock().take().unwrap_or_default()
    }

    /// Hand a buffer back unused, e.g. after a failed conversion.
    pub fn return_spare(&self, buffer: Vec<u8>) {
        *self.spare.lock() = Some(buffer);
    }

    /// Publish `frame` as current, stamping its generation.
    ///
    /// The previous frame's storage becomes the spare once no reader
    /// holds it.
    pub fn promote(&self, mut frame: Frame) -> u64 {
        let generation = self.generation.fetch_add(1, Ordering::AcqRel) + 1;
        frame.generation = generation;

        let previous = self.current.lock().replace(Arc::new(frame));
        self.has_new.store(true, Ordering::Release);

        if let Some(old) = previous.and_then(|old| Arc::try_unwrap(old).ok()) {
            *self.spare.lock() = Some(old.data);
        }
        generation
    }

    /// Drop the current frame and the spare.
    pub fn clear(&self) {
        self.current.lock().take();
        self.spare.lock().take();
        self.has_new.store(false, Ordering::Release);
    }

    pub fn has_new_frame(&self) -> bool {
        self.has_new.load(Ordering::Acquire)
    }

    /// Current frame, clearing the new-frame flag.
    pub fn current(&self) -> Option<Arc<Frame>> {
        let current = self.current.lock();
        self.has_new.store(false, Ordering::Release);
        current.clone()
    }

    /// Current frame, leaving the new-frame flag alone.
    pub fn peek(&self) -> Option<Arc<Frame>> {
        self.current.lock().clone()
    }

    pub fn generation(&self) -> u64 {
        self.generation.load(Ordering::Acquire)
    }
}

/// Read side of a video's frame slot, usable from a render thread.
#[derive(Debug, Clone)]
pub struct FrameReader {
    slot: Arc<FrameSlot>,
}

impl FrameReader {
    pub(crate) fn new(slot: Arc<FrameSlot>) -> Self {
        Self { slot }
    }

    pub fn has_new_frame(&self) -> bool {
        self.slot.has_new_frame()
    }

    pub fn current_frame(&self) -> Option<Arc<Frame>> {
        self.slot.current()
    }

    pub fn peek_frame(&self) -> Option<Arc<Frame>> {
        self.slot.peek()
    }

    pub fn generation(&self) -> u64 {
        self.slot.generation()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::thread;

    fn frame(index: u64, fill: u8) -> Frame {
        Frame {
            width: 2,
            height: 2,
            pixel_format: PixelFormat::Rgb24,
            stride: 6,
            data: vec![fill; 12],
            index,
            timestamp: Duration::from_millis(index * 40),
            generation: 0,
        }
    }

    #[test]
    fn test_promote_sets_flag_and_generation() {
        let slot = FrameSlot::new();
        assert!(!slot.has_new_frame());
        assert!(slot.current().is_none());

        assert_eq!(slot.promote(frame(0, 1)), 1);
        assert!(slot.has_new_frame());

        let current = slot.current().unwrap();
        assert_eq!(current.generation, 1);
        assert!(!slot.has_new_frame());
        assert_eq!(current.row(1), &[1; 6]);
    }

    #[test]
    fn test_peek_keeps_flag() {
        let slot = FrameSlot::new();
        slot.promote(frame(0, 1));
        assert!(slot.peek().is_some());
        assert!(slot.has_new_frame());
    }

    #[test]
    fn test_unshared_storage_is_recycled() {
        let slot = FrameSlot::new();
        slot.promote(frame(0, 1));
        slot.promote(frame(1, 2));

        assert_eq!(slot.take_spare(), vec![1; 12]);
        assert!(slot.take_spare().is_empty());
    }

    #[test]
    fn test_held_frame_is_not_recycled() {
        let slot = FrameSlot::new();
        slot.promote(frame(0, 1));
        let held = slot.current().unwrap();
        slot.promote(frame(1, 2));

        assert!(slot.take_spare().is_empty());
        assert_eq!(held.data, vec![1; 12]);
        assert_eq!(slot.peek().unwrap().index, 1);
    }

    #[test]
    fn test_clear() {
        let slot = FrameSlot::new();
        slot.promote(frame(0, 1));
        slot.clear();
        assert!(slot.peek().is_none());
        assert!(!slot.has_new_frame());
    }

    #[test]
    fn test_reader_sees_whole_frames() {
        let slot = FrameSlot::new();
        let reader = FrameReader::new(slot.clone());

        let writer = thread::spawn({
            let slot = slot.clone();
            move || {
                for i in 0..500u64 {
                    let mut data = slot.take_spare();
                    data.clear();
                    data.resize(12, i as u8);
                    slot.promote(Frame {
                        data,
                        ..frame(i, 0)
                    });
                }
            }
        });

        let mut last_generation = 0;
        for _ in 0..500 {
            if let Some(f) = reader.current_frame() {
                assert!(f.data.iter().all(|&b| b == f.index as u8));
                assert!(f.generation >= last_generation);
                last_generation = f.generation;
            }
        }
        writer.join().unwrap();
        assert_eq!(reader.generation(), 500);
    }
}
