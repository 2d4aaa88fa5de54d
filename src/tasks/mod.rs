//! Background Tasks Module
//!
//! Periodic loops that run alongside the cache.
//!
//! # Tasks
//! - Expiry sweep: removes expired entries
//! - Warming: drains the warm-up queue into the cache
//! - Invalidator: applies registered invalidation rules

mod warming;
mod worker;

pub use warming::{WarmItem, WarmQueue};
pub use worker::Worker;
