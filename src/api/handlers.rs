//! API Handlers
//!
//! HTTP request handlers for each cache server endpoint. Values travel as
//! JSON and are stored through the engine's JSON helpers.

use std::collections::HashMap;

use axum::{
    extract::{Path, State},
    Json,
};
use serde_json::Value;

use crate::cache::OptimizeReport;
use crate::engine::Cache;
use crate::error::{CacheError, Result};
use crate::models::requests::validate_key;
use crate::models::{
    CountResponse, DeleteResponse, GetResponse, HasResponse, HealthResponse, InvalidateRequest,
    KeysRequest, MsetRequest, SetRequest, SetResponse, StatsResponse, TagsRequest,
    ValuesResponse, WarmRequest,
};
use crate::tasks::WarmItem;

/// Application state shared across all handlers.
///
/// `Cache` is a cheap handle; cloning it shares the same engine.
#[derive(Clone)]
pub struct AppState {
    pub cache: Cache,
}

impl AppState {
    pub fn new(cache: Cache) -> Self {
        Self { cache }
    }
}

/// Decodes stored JSON, dropping entries that are not valid JSON.
fn decode_values(raw: HashMap<String, Vec<u8>>) -> HashMap<String, Value> {
    raw.into_iter()
        .filter_map(|(key, bytes)| Some((key, serde_json::from_slice(&bytes).ok()?)))
        .collect()
}

/// Handler for PUT /set
pub async fn set_handler(
    State(state): State<AppState>,
    Json(req): Json<SetRequest>,
) -> Result<Json<SetResponse>> {
    if let Some(error_msg) = req.validate() {
        return Err(CacheError::InvalidRequest(error_msg));
    }

    let options = req.options.to_set_options();
    state
        .cache
        .set_json(req.key.clone(), &req.value, options)
        .await?;

    Ok(Json(SetResponse::new(req.key)))
}

/// Handler for GET /get/:key
pub async fn get_handler(
    State(state): State<AppState>,
    Path(key): Path<String>,
) -> Result<Json<GetResponse>> {
    let value: Value = state.cache.get_json(&key).await?;
    Ok(Json(GetResponse::new(key, value)))
}

/// Handler for DELETE /del/:key
pub async fn delete_handler(
    State(state): State<AppState>,
    Path(key): Path<String>,
) -> Json<DeleteResponse> {
    let deleted = state.cache.delete(&key).await;
    Json(DeleteResponse::new(key, deleted))
}

/// Handler for GET /has/:key
pub async fn has_handler(
    State(state): State<AppState>,
    Path(key): Path<String>,
) -> Json<HasResponse> {
    let exists = state.cache.has(&key).await;
    Json(HasResponse { key, exists })
}

/// Handler for POST /mget
pub async fn mget_handler(
    State(state): State<AppState>,
    Json(req): Json<KeysRequest>,
) -> Json<ValuesResponse> {
    let raw = state.cache.mget(&req.keys[..]).await;
    Json(ValuesResponse::new(decode_values(raw)))
}

/// Handler for POST /mset
///
/// Invalid keys are skipped like any other failed item.
pub async fn mset_handler(
    State(state): State<AppState>,
    Json(req): Json<MsetRequest>,
) -> Result<Json<CountResponse>> {
    let items = req
        .items
        .into_iter()
        .map(|kv| Ok((kv.key, serde_json::to_vec(&kv.value)?)))
        .collect::<Result<Vec<_>>>()?;

    let stored = state
        .cache
        .mset(items, &req.options.to_set_options())
        .await;
    Ok(Json(CountResponse::new(stored)))
}

/// Handler for POST /tags/get
pub async fn tags_get_handler(
    State(state): State<AppState>,
    Json(req): Json<TagsRequest>,
) -> Result<Json<ValuesResponse>> {
    if let Some(error_msg) = req.validate() {
        return Err(CacheError::InvalidRequest(error_msg));
    }
    let raw = state.cache.get_by_tags(&req.tags[..]).await;
    Ok(Json(ValuesResponse::new(decode_values(raw))))
}

/// Handler for POST /tags/delete
pub async fn tags_delete_handler(
    State(state): State<AppState>,
    Json(req): Json<TagsRequest>,
) -> Result<Json<CountResponse>> {
    if let Some(error_msg) = req.validate() {
        return Err(CacheError::InvalidRequest(error_msg));
    }
    let deleted = state.cache.delete_by_tags(&req.tags[..]).await;
    Ok(Json(CountResponse::new(deleted)))
}

/// Handler for POST /invalidate
pub async fn invalidate_handler(
    State(state): State<AppState>,
    Json(req): Json<InvalidateRequest>,
) -> Result<Json<CountResponse>> {
    let removed = state.cache.invalidate_by_pattern(&req.pattern).await?;
    Ok(Json(CountResponse::new(removed)))
}

/// Handler for POST /warm
///
/// Items are only queued; the warming worker writes them later.
pub async fn warm_handler(
    State(state): State<AppState>,
    Json(req): Json<WarmRequest>,
) -> Result<Json<CountResponse>> {
    let mut items = Vec::with_capacity(req.items.len());
    for entry in req.items {
        if let Some(error_msg) = validate_key(&entry.key) {
            return Err(CacheError::InvalidRequest(error_msg));
        }
        let value = serde_json::to_vec(&entry.value)?;
        items.push(WarmItem::new(entry.key, value, entry.options.to_set_options()));
    }

    let queued = state.cache.warm_up(items);
    Ok(Json(CountResponse::new(queued)))
}

/// Handler for POST /optimize
pub async fn optimize_handler(State(state): State<AppState>) -> Json<OptimizeReport> {
    Json(state.cache.optimize().await)
}

/// Handler for DELETE /clear
pub async fn clear_handler(State(state): State<AppState>) -> Json<CountResponse> {
    Json(CountResponse::new(state.cache.clear().await))
}

/// Handler for GET /stats
pub async fn stats_handler(State(state): State<AppState>) -> Json<StatsResponse> {
    let config = state.cache.config();
    Json(StatsResponse {
        stats: state.cache.stats().await,
        strategy: config.strategy,
        max_size: config.max_size,
    })
}

/// Handler for GET /health
pub async fn health_handler() -> Json<HealthResponse> {
    Json(HealthResponse::healthy())
}
