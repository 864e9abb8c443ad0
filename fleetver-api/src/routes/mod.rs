//! REST API Routes Module
//!
//! - `/inventory` flat per-environment inventory and cache housekeeping
//! - `/plt` platform microservice matrix
//! - `/health` liveness checks
//!
//! Every route is traced with `TraceLayer` and wrapped in a CORS layer.

pub mod health;
pub mod inventory;
pub mod platform;

use std::time::Duration;

use axum::{
    http::{header, HeaderValue, Method},
    Router,
};
use tower::ServiceBuilder;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;

use crate::config::ApiConfig;
use crate::state::AppState;

pub use health::create_router as health_router;
pub use inventory::create_router as inventory_router;
pub use platform::create_router as platform_router;

// ============================================================================
// ROUTER
// ============================================================================

/// Build the complete router.
///
/// # Middleware Order (outer to inner)
/// 1. Trace - request spans and latency
/// 2. CORS - handles preflight requests
pub fn create_api_router(state: AppState, api_config: &ApiConfig) -> Router {
    Router::new()
        .nest("/inventory", inventory::create_router())
        .nest("/plt", platform::create_router())
        .nest("/health", health::create_router())
        .layer(
            ServiceBuilder::new()
                .layer(TraceLayer::new_for_http())
                .layer(build_cors_layer(api_config)),
        )
        .with_state(state)
}

fn build_cors_layer(config: &ApiConfig) -> CorsLayer {
    let cors = CorsLayer::new()
        .allow_methods([Method::GET, Method::POST, Method::OPTIONS])
        .allow_headers([header::AUTHORIZATION, header::CONTENT_TYPE, header::ACCEPT])
        .max_age(Duration::from_secs(config.cors_max_age_secs));

    if !config.is_production() {
        tracing::info!("CORS: Development mode - allowing all origins");
        cors.allow_origin(Any).allow_headers(Any)
    } else {
        tracing::info!(
            "CORS: Production mode - allowing origins: {:?}",
            config.cors_origins
        );
        let origins: Vec<HeaderValue> = config
            .cors_origins
            .iter()
            .filter_map(|o| o.parse().ok())
            .collect();

        if config.cors_allow_credentials {
            cors.allow_origin(origins).allow_credentials(true)
        } else {
            cors.allow_origin(origins)
        }
    }
}
