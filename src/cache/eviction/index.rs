//! Rank Index
//!
//! Ordered key index shared by the eviction trackers. Each key carries a
//! unique rank; iteration yields keys from the lowest rank (first victim)
//! to the highest.

use std::collections::{BTreeMap, HashMap};

#[derive(Debug)]
pub struct RankIndex<R> {
    ranks: HashMap<String, R>,
    order: BTreeMap<R, String>,
}

impl<R: Ord + Copy> Default for RankIndex<R> {
    fn default() -> Self {
        Self {
            ranks: HashMap::new(),
            order: BTreeMap::new(),
        }
    }
}

impl<R: Ord + Copy> RankIndex<R> {
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the rank of `key`, replacing any previous rank.
    pub fn insert(&mut self, key: &str, rank: R) {
        if let Some(old) = self.ranks.insert(key.to_string(), rank) {
            self.order.remove(&old);
        }
        self.order.insert(rank, key.to_string());
    }

    pub fn rank(&self, key: &str) -> Option<R> {
        self.ranks.get(key).copied()
    }

    pub fn remove(&mut self, key: &str) -> Option<R> {
        let rank = self.ranks.remove(key)?;
        self.order.remove(&rank);
        Some(rank)
    }

    /// Keys from lowest to highest rank.
    pub fn iter(&self) -> impl Iterator<Item = &str> + '_ {
        self.order.values().map(String::as_str)
    }

    #[cfg(test)]
    pub fn first(&self) -> Option<&str> {
        self.order.values().next().map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.ranks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.ranks.is_empty()
    }

    pub fn clear(&mut self) {
        self.ranks.clear();
        self.order.clear();
    }
}
