//! Fixed pool of hardware buffers.
//!
//! Every slot is tagged free or queued. Queued slots are kept in the order
//! they were queued to the voice, which is also the order the voice plays
//! them, so the front of the queue locates the play head in the stream.

use bridge_traits::BufferId;
use std::collections::VecDeque;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SlotState {
    Free,
    Queued,
}

/// One hardware buffer and what it currently holds.
#[derive(Debug, Clone)]
pub struct Slot {
    pub buffer: BufferId,
    pub state: SlotState,
    /// Frames of audio written to the buffer.
    pub frames: usize,
    /// Contiguous runs as `(offset in buffer, stream frame)`, in offset
    /// order. More than one run means the stream was rewound mid-buffer.
    pub segments: Vec<(usize, u64)>,
}

impl Slot {
    fn new(buffer: BufferId) -> Self {
        Self {
            buffer,
            state: SlotState::Free,
            frames: 0,
            segments: Vec::new(),
        }
    }

    /// Stream frame played at `offset` frames into this buffer.
    pub fn stream_frame(&self, offset: usize) -> u64 {
        self.segments
            .iter()
            .rev()
            .find(|(start, _)| *start <= offset)
            .map_or(0, |(start, frame)| frame + (offset - start) as u64)
    }

    pub fn start_frame(&self) -> u64 {
        self.segments.first().map_or(0, |(_, frame)| *frame)
    }

    /// Whether the stream wraps back to its start inside this buffer.
    pub fn wraps(&self) -> bool {
        self.segments.len() > 1
    }
}

/// Ring of hardware buffer handles with free/queued tagging.
#[derive(Debug)]
pub struct BufferPool {
    slots: Vec<Slot>,
    /// Indices of queued slots, front is played first.
    queue: VecDeque<usize>,
}

impl BufferPool {
    pub fn new(buffers: Vec<BufferId>) -> Self {
        let queue = VecDeque::with_capacity(buffers.len());
        Self {
            slots: buffers.into_iter().map(Slot::new).collect(),
            queue,
        }
    }

    pub fn buffers(&self) -> Vec<BufferId> {
        self.slots.iter().map(|slot| slot.buffer).collect()
    }

    pub fn slot(&self, index: usize) -> &Slot {
        &self.slots[index]
    }

    pub fn queued_count(&self) -> usize {
        self.queue.len()
    }

    /// A free slot, preferring the lowest index.
    pub fn next_free(&self) -> Option<usize> {
        self.slots
            .iter()
            .position(|slot| slot.state == SlotState::Free)
    }

    /// Tag `index` as queued at the back, holding `frames` frames.
    pub fn mark_queued(&mut self, index: usize, frames: usize, segments: Vec<(usize, u64)>) {
        let slot = &mut self.slots[index];
        slot.state = SlotState::Queued;
        slot.frames = frames;
        slot.segments = segments;
        self.queue.push_back(index);
    }

    /// Tag the queued slot holding `buffer` as free again.
    ///
    /// Returns `false` if no queued slot holds it.
    pub fn release(&mut self, buffer: BufferId) -> bool {
        let Some(pos) = self
            .queue
            .iter()
            .position(|&index| self.slots[index].buffer == buffer)
        else {
            return false;
        };

        if let Some(index) = self.queue.remove(pos) {
            let slot = &mut self.slots[index];
            slot.state = SlotState::Free;
            slot.frames = 0;
            slot.segments.clear();
        }
        true
    }

    /// Free every slot.
    pub fn flush(&mut self) {
        for slot in &mut self.slots {
            slot.state = SlotState::Free;
            slot.frames = 0;
            slot.segments.clear();
        }
        self.queue.clear();
    }

    pub fn front(&self) -> Option<&Slot> {
        self.queue.front().map(|&index| &self.slots[index])
    }

    /// Stream frame at `offset` frames past the start of the queue front.
    ///
    /// An offset past everything queued maps to the end of the last buffer.
    pub fn stream_frame_at(&self, offset: u64) -> u64 {
        let mut remaining = offset;
        let mut last = None;

        for slot in self.queue.iter().map(|&index| &self.slots[index]) {
            if remaining < slot.frames as u64 {
                return slot.stream_frame(remaining as usize);
            }
            remaining -= slot.frames as u64;
            last = Some(slot);
        }

        last.map_or(0, |slot| slot.stream_frame(slot.frames))
    }
}
