//! Bounded memory of recently seen event ids

use std::collections::VecDeque;

/// Remembers the last `capacity` ids; the oldest is forgotten first.
#[derive(Debug, Clone)]
pub struct RecentIds {
    ids: VecDeque<String>,
    capacity: usize,
}

impl RecentIds {
    pub fn new(capacity: usize) -> Self {
        Self {
            ids: VecDeque::new(),
            capacity: capacity.max(1),
        }
    }

    pub fn contains(&self, id: &str) -> bool {
        self.ids.iter().any(|seen| seen == id)
    }

    /// Remember `id`. Returns false if it was already remembered.
    pub fn insert(&mut self, id: &str) -> bool {
        if self.contains(id) {
            return false;
        }
        if self.ids.len() == self.capacity {
            self.ids.pop_front();
        }
        self.ids.push_back(id.to_string());
        true
    }
}
