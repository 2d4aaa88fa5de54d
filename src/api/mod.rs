//! API Module
//!
//! HTTP handlers and routing for the cache server REST API.
//!
//! # Endpoints
//! - `PUT /set` - Store a JSON value with optional TTL, priority and tags
//! - `GET /get/:key` - Retrieve a value by key
//! - `DELETE /del/:key` - Delete a key
//! - `GET /has/:key` - Existence check
//! - `POST /mget`, `POST /mset` - Batch read and write
//! - `POST /tags/get`, `POST /tags/delete` - Tag lookups and invalidation
//! - `POST /invalidate` - Delete keys matching a pattern
//! - `POST /warm` - Queue values for background warming
//! - `POST /optimize` - Purge expired entries and shrink if nearly full
//! - `DELETE /clear` - Empty the cache
//! - `GET /stats` - Cache statistics
//! - `GET /health` - Health check endpoint

pub mod handlers;
pub mod routes;

pub use handlers::*;
pub use routes::create_router;
