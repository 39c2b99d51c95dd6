use std::collections::VecDeque;

use crate::frame_source::types::SharedFrame;

/// Fixed-capacity ring of the most recent frames, oldest first.
#[derive(Debug)]
pub struct FrameHistory {
    frames: VecDeque<SharedFrame>,
    capacity: usize,
}

impl FrameHistory {
    pub fn new(capacity: usize) -> Self {
        Self {
            frames: VecDeque::with_capacity(capacity),
            capacity,
        }
    }

    pub fn push(&mut self, frame: SharedFrame) {
        if self.capacity == 0 {
            return;
        }
        if self.frames.len() == self.capacity {
            self.frames.pop_front();
        }
        self.frames.push_back(frame);
    }

    pub fn len(&self) -> usize {
        self.frames.len()
    }

    pub fn is_empty(&self) -> bool {
        self.frames.is_empty()
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Copies out the frame handles; the frames themselves are shared.
    pub fn snapshot(&self) -> Vec<SharedFrame> {
        self.frames.iter().cloned().collect()
    }

    pub fn clear(&mut self) {
        self.frames.clear();
    }
}
