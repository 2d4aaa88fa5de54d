//! LFU Tracker Module
//!
//! Least Frequently Used ordering. Ties on frequency fall back to
//! insertion order.

use super::index::RankIndex;

/// (access count, insertion sequence)
type LfuRank = (u64, u64);

#[derive(Debug, Default)]
pub struct LfuTracker {
    order: RankIndex<LfuRank>,
    seq: u64,
}

impl LfuTracker {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers a newly stored key with a zero count.
    pub fn insert(&mut self, key: &str) {
        self.seq += 1;
        self.order.insert(key, (0, self.seq));
    }

    /// Bumps the access count of a tracked key.
    pub fn touch(&mut self, key: &str) {
        if let Some((count, seq)) = self.order.rank(key) {
            self.order.insert(key, (count + 1, seq));
        }
    }

    #[cfg(test)]
    pub fn frequency(&self, key: &str) -> Option<u64> {
        self.order.rank(key).map(|(count, _)| count)
    }

    pub fn remove(&mut self, key: &str) {
        self.order.remove(key);
    }

    /// Keys from least to most frequently used.
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
