//! Eviction Module
//!
//! The closed set of eviction strategies. A strategy is picked once when
//! the store is built and only ranks keys; the store decides how many
//! victims to take.

mod fifo;
mod index;
mod lfu;
mod lru;

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

pub use fifo::FifoTracker;
pub use index::RankIndex;
pub use lfu::LfuTracker;
pub use lru::LruTracker;

// == Eviction Strategy ==
/// Configuration-level strategy selector.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EvictionStrategy {
    #[default]
    Lru,
    Lfu,
    Fifo,
}

impl FromStr for EvictionStrategy {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "lru" => Ok(Self::Lru),
            "lfu" => Ok(Self::Lfu),
            "fifo" => Ok(Self::Fifo),
            other => Err(format!("unknown eviction strategy '{}'", other)),
        }
    }
}

impl fmt::Display for EvictionStrategy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Lru => "lru",
            Self::Lfu => "lfu",
            Self::Fifo => "fifo",
        };
        f.write_str(name)
    }
}

// == Eviction Outcome ==
/// Result of one eviction run.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct EvictionOutcome {
    pub items_removed: usize,
    pub memory_freed: usize,
}

// == Eviction Policy ==
/// Runtime tracker for the selected strategy.
#[derive(Debug)]
pub enum EvictionPolicy {
    Lru(LruTracker),
    Lfu(LfuTracker),
    Fifo(FifoTracker),
}

impl EvictionPolicy {
    pub fn new(strategy: EvictionStrategy) -> Self {
        match strategy {
            EvictionStrategy::Lru => Self::Lru(LruTracker::new()),
            EvictionStrategy::Lfu => Self::Lfu(LfuTracker::new()),
            EvictionStrategy::Fifo => Self::Fifo(FifoTracker::new()),
        }
    }

    pub fn strategy(&self) -> EvictionStrategy {
        match self {
            Self::Lru(_) => EvictionStrategy::Lru,
            Self::Lfu(_) => EvictionStrategy::Lfu,
            Self::Fifo(_) => EvictionStrategy::Fifo,
        }
    }

    /// Called whenever a key is (re)stored.
    pub fn record_insert(&mut self, key: &str, created_at: u64) {
        match self {
            Self::Lru(t) => t.touch(key),
            Self::Lfu(t) => t.insert(key),
            Self::Fifo(t) => t.insert(key, created_at),
        }
    }

    /// Called on every cache hit.
    pub fn record_access(&mut self, key: &str) {
        match self {
            Self::Lru(t) => t.touch(key),
            Self::Lfu(t) => t.touch(key),
            Self::Fifo(_) => {}
        }
    }

    pub fn remove(&mut self, key: &str) {
        match self {
            Self::Lru(t) => t.remove(key),
            Self::Lfu(t) => t.remove(key),
            Self::Fifo(t) => t.remove(key),
        }
    }

    /// Keys in eviction order, first victim first.
    pub fn candidates(&self) -> Box<dyn Iterator<Item = &str> + '_> {
        match self {
            Self::Lru(t) => Box::new(t.iter()),
            Self::Lfu(t) => Box::new(t.iter()),
            Self::Fifo(t) => Box::new(t.iter()),
        }
    }

    pub fn len(&self) -> usize {
        match self {
            Self::Lru(t) => t.len(),
            Self::Lfu(t) => t.len(),
            Self::Fifo(t) => t.len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn clear(&mut self) {
        match self {
            Self::Lru(t) => t.clear(),
            Self::Lfu(t) => t.clear(),
            Self::Fifo(t) => t.clear(),
        }
    }
}
