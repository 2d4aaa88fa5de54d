//! Warm-up Queue
//!
//! FIFO of precomputed values waiting to be written into the cache by the
//! warming worker.

use std::collections::VecDeque;

use parking_lot::Mutex;

use crate::cache::SetOptions;

/// A value to be stored ahead of demand.
#[derive(Debug, Clone)]
pub struct WarmItem {
    pub key: String,
    pub value: Vec<u8>,
    pub options: SetOptions,
}

impl WarmItem {
    pub fn new(key: impl Into<String>, value: impl Into<Vec<u8>>, options: SetOptions) -> Self {
        Self {
            key: key.into(),
            value: value.into(),
            options,
        }
    }
}

#[derive(Debug, Default)]
pub struct WarmQueue {
    items: Mutex<VecDeque<WarmItem>>,
}

impl WarmQueue {
    pub fn new() -> Self {
        Self::default()
    }

    /// Appends items; returns how many were enqueued.
    pub fn push_all(&self, items: impl IntoIterator<Item = WarmItem>) -> usize {
        let mut queue = self.items.lock();
        let before = queue.len();
        queue.extend(items);
        queue.len() - before
    }

    /// Takes up to `max` items from the front.
    pub fn pop_batch(&self, max: usize) -> Vec<WarmItem> {
        let mut queue = self.items.lock();
        let n = max.min(queue.len());
        queue.drain(..n).collect()
    }

    pub fn len(&self) -> usize {
        self.items.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.lock().is_empty()
    }

    pub fn clear(&self) {
        self.items.lock().clear();
    }
}
