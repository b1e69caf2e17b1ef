use std::{
    collections::{HashSet, VecDeque},
    sync::Mutex,
};

use crate::types::FrameId;

struct LruState {
    // Front is the most recently unpinned frame, back the eviction
    // candidate. `members` mirrors the queue for O(1) presence checks.
    queue: VecDeque<FrameId>,
    members: HashSet<FrameId>,
}

/// Picks eviction victims in least-recently-unpinned order.
///
/// The replacer only tracks ordering; it never touches page data. The
/// pool reports pin transitions: a frame enters on its last unpin and
/// leaves when re-pinned or handed out as a victim.
pub struct LruReplacer {
    state: Mutex<LruState>,
}

impl LruReplacer {
    pub fn new(capacity: usize) -> Self {
        Self {
            state: Mutex::new(LruState {
                queue: VecDeque::with_capacity(capacity),
                members: HashSet::with_capacity(capacity),
            }),
        }
    }

    /// Removes and returns the least recently unpinned frame, or None
    /// when nothing is evictable.
    pub fn victim(&self) -> Option<FrameId> {
        let mut state = self.state.lock().unwrap();
        let frame_id = state.queue.pop_back()?;
        state.members.remove(&frame_id);
        Some(frame_id)
    }

    /// Withdraws a frame from eviction candidacy. No-op if absent.
    pub fn pin(&self, frame_id: FrameId) {
        let mut state = self.state.lock().unwrap();
        if state.members.remove(&frame_id) {
            state.queue.retain(|&f| f != frame_id);
        }
    }

    /// Registers a frame as evictable. No-op if already present, so a
    /// frame's position is fixed by its first unpin since last use.
    pub fn unpin(&self, frame_id: FrameId) {
        let mut state = self.state.lock().unwrap();
        if state.members.insert(frame_id) {
            state.queue.push_front(frame_id);
        }
    }

    pub fn len(&self) -> usize {
        self.state.lock().unwrap().queue.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}
