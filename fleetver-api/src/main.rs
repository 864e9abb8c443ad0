//! fleetver API Server Entry Point
//!
//! Loads the fleet configuration, wires the Kubernetes client factory into
//! the inventory service and starts the Axum HTTP server.

use std::sync::Arc;

use axum::Router;
use fleetver_api::telemetry::{init_tracing, TelemetryConfig};
use fleetver_api::{
    create_api_router, ApiError, ApiResult, AppConfig, AppState, FileCredentialProvider,
    KubeClientFactory,
};
use fleetver_core::SystemClock;
use fleetver_inventory::InventoryService;

#[tokio::main]
async fn main() -> ApiResult<()> {
    init_tracing(&TelemetryConfig::from_env())?;

    let config = AppConfig::load()?;
    tracing::info!(
        environments = ?config.fleet.environment_names(),
        max_entries = config.fleet.max_entries_per_environment,
        label_selector = %config.fleet.label_selector,
        "Loaded fleet configuration"
    );
    if !config.kube.verify_tls {
        tracing::warn!("TLS verification of cluster endpoints is disabled");
    }

    let credentials = Arc::new(FileCredentialProvider::new(
        config.kube.credentials_path.clone(),
    ));
    let factory = Arc::new(KubeClientFactory::new(credentials, config.kube.clone()));
    let inventory = Arc::new(InventoryService::new(
        config.fleet,
        factory,
        Arc::new(SystemClock),
    ));

    let app: Router = create_api_router(AppState::new(inventory), &config.api);

    let addr = config.api.bind_addr()?;
    tracing::info!(%addr, "Starting fleetver API server");

    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .map_err(|e| ApiError::internal_error(format!("Failed to bind {}: {}", addr, e)))?;

    let server = axum::serve(listener, app);
    tokio::select! {
        result = server => {
            result.map_err(|e| ApiError::internal_error(format!("Server error: {}", e)))?;
        }
        _ = tokio::signal::ctrl_c() => {
            tracing::info!("Shutdown signal received");
        }
    }

    Ok(())
}
