use std::collections::HashMap;

use super::model::ThreadState;

/// Per-thread reconstruction store
///
/// Maps a log thread id to its open lifecycle. A thread with no entry is
/// idle. Owned by the processing loop alone, so no locking.
#[derive(Debug, Default)]
pub struct ThreadStore {
    /// Single Map: thread id → open lifecycle
    active: HashMap<String, ThreadState>,
}

impl ThreadStore {
    pub fn new() -> Self {
        Self {
            active: HashMap::new(),
        }
    }

    /// Open a lifecycle for `state.thread`, returning whatever it replaced.
    pub fn begin(&mut self, state: ThreadState) -> Option<ThreadState> {
        self.active.insert(state.thread.clone(), state)
    }

    pub fn get_mut(&mut self, thread: &str) -> Option<&mut ThreadState> {
        self.active.get_mut(thread)
    }

    pub fn is_active(&self, thread: &str) -> bool {
        self.active.contains_key(thread)
    }

    /// Close a thread's lifecycle, leaving it idle.
    pub fn take(&mut self, thread: &str) -> Option<ThreadState> {
        self.active.remove(thread)
    }

    /// Remove every open lifecycle, ordered by thread id.
    pub fn drain_sorted(&mut self) -> Vec<ThreadState> {
        let mut states: Vec<ThreadState> = self.active.drain().map(|(_, s)| s).collect();
        states.sort_by(|a, b| a.thread.cmp(&b.thread));
        states
    }

    pub fn len(&self) -> usize {
        self.active.len()
    }

    pub fn is_empty(&self) -> bool {
        self.active.is_empty()
    }
}
