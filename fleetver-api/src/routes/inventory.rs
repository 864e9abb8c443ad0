//! Inventory Endpoints
//!
//! - GET  /inventory/all-envs
//! - GET  /inventory/:env
//! - POST /inventory/cache/refresh/:env
//! - POST /inventory/cache/clear
//! - GET  /inventory/cache/stats

use axum::{
    extract::{Path, State},
    routing::{get, post},
    Json, Router,
};
use fleetver_inventory::{
    CacheStatsResponse, ClearResponse, EnvironmentListResponse, InventoryResponse,
    InventoryService,
};
use std::sync::Arc;

use crate::error::ApiResult;
use crate::state::AppState;

/// GET /inventory/all-envs - Configured environment names
pub async fn list_environments(
    State(service): State<Arc<InventoryService>>,
) -> Json<EnvironmentListResponse> {
    Json(service.list_environments())
}

/// GET /inventory/:env - Deployments of one environment
pub async fn get_inventory(
    State(service): State<Arc<InventoryService>>,
    Path(env): Path<String>,
) -> ApiResult<Json<InventoryResponse>> {
    Ok(Json(service.get_inventory(&env).await?))
}

/// POST /inventory/cache/refresh/:env - Drop and re-enumerate one environment
pub async fn refresh_inventory(
    State(service): State<Arc<InventoryService>>,
    Path(env): Path<String>,
) -> ApiResult<Json<InventoryResponse>> {
    Ok(Json(service.refresh_inventory(&env).await?))
}

/// POST /inventory/cache/clear - Drop every environment's cache and clients
pub async fn clear_cache(State(service): State<Arc<InventoryService>>) -> Json<ClearResponse> {
    Json(service.clear_all())
}

/// GET /inventory/cache/stats - Per-environment cache counters
pub async fn cache_stats(State(service): State<Arc<InventoryService>>) -> Json<CacheStatsResponse> {
    Json(service.cache_stats())
}

pub fn create_router() -> Router<AppState> {
    Router::new()
        .route("/all-envs", get(list_environments))
        .route("/cache/stats", get(cache_stats))
        .route("/cache/clear", post(clear_cache))
        .route("/cache/refresh/:env", post(refresh_inventory))
        .route("/:env", get(get_inventory))
}
