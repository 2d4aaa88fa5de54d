//! FIFO Tracker Module
//!
//! Orders keys strictly by creation time. Accesses are ignored.

use super::index::RankIndex;

#[derive(Debug, Default)]
pub struct FifoTracker {
    /// (created_at, insertion sequence)
    order: RankIndex<(u64, u64)>,
    seq: u64,
}

impl FifoTracker {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, key: &str, created_at: u64) {
        self.seq += 1;
        self.order.insert(key, (created_at, self.seq));
    }

    pub fn remove(&mut self, key: &str) {
        self.order.remove(key);
    }

    /// Keys from oldest to newest.
    pub fn iter(&self) -> impl Iterator<Item = &str> + '_ {
        self.order.iter()
    }

    pub fn len(&self) -> usize {
        self.order.len()
    }

    pub fn clear(&mut self) {
        self.order.clear();
    }
}
