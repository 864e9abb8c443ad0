//! fleetver API - HTTP Layer
//!
//! Axum routes over the inventory service, plus the concrete collaborators
//! the server runs with: a file-backed credential provider and a
//! Kubernetes REST client.

pub mod config;
pub mod credentials;
pub mod error;
pub mod kube;
pub mod macros;
pub mod routes;
pub mod state;
pub mod telemetry;

// Re-export commonly used types
pub use config::{ApiConfig, AppConfig, ConfigLoadError, KubeConfig};
pub use credentials::FileCredentialProvider;
pub use error::{ApiError, ApiResult, ErrorCode};
pub use kube::{KubeClientFactory, KubeRestClient};
pub use routes::create_api_router;
pub use state::AppState;
