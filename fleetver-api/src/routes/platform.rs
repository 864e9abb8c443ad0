//! Platform Matrix Endpoints
//!
//! - GET  /plt/plt-info
//! - POST /plt/cache/refresh

use axum::{
    extract::State,
    routing::{get, post},
    Json, Router,
};
use fleetver_inventory::{InventoryService, PlatformMatrixResponse};
use std::sync::Arc;

use crate::error::ApiResult;
use crate::state::AppState;

/// GET /plt/plt-info - Microservice versions per environment type
pub async fn platform_info(
    State(service): State<Arc<InventoryService>>,
) -> ApiResult<Json<PlatformMatrixResponse>> {
    Ok(Json(service.get_platform_matrix().await?))
}

/// POST /plt/cache/refresh - Rebuild the matrix from fresh snapshots
pub async fn refresh_platform(
    State(service): State<Arc<InventoryService>>,
) -> ApiResult<Json<PlatformMatrixResponse>> {
    Ok(Json(service.refresh_platform_matrix().await?))
}

pub fn create_router() -> Router<AppState> {
    Router::new()
        .route("/plt-info", get(platform_info))
        .route("/cache/refresh", post(refresh_platform))
}
