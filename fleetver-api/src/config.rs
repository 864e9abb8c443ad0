//! API Configuration Module
//!
//! The fleet layout (environments, clusters, TTLs, label selector) comes
//! from a TOML file named by `--config` or `FLEETVER_CONFIG`. Server and
//! Kubernetes client settings are read from environment variables with
//! defaults suitable for development.

use fleetver_core::{FleetConfig, FleetError, LabelSelector};
use std::net::SocketAddr;
use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::error::{ApiError, ApiResult};

const CONFIG_ENV: &str = "FLEETVER_CONFIG";

#[derive(Debug, thiserror::Error)]
pub enum ConfigLoadError {
    #[error("Missing configuration file path (use --config or FLEETVER_CONFIG)")]
    MissingConfigPath,
    #[error("Failed to read config file {path}: {source}")]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },
    #[error("Failed to parse config TOML: {0}")]
    Parse(#[from] toml::de::Error),
    #[error("Invalid config value for {field}: {reason}")]
    InvalidValue { field: &'static str, reason: String },
    #[error(transparent)]
    Fleet(#[from] FleetError),
}

impl From<ConfigLoadError> for ApiError {
    fn from(err: ConfigLoadError) -> Self {
        ApiError::invalid_configuration(err.to_string())
    }
}

// ============================================================================
// APPLICATION CONFIGURATION
// ============================================================================

/// Everything the server binary needs to start.
#[derive(Debug, Clone)]
pub struct AppConfig {
    pub fleet: FleetConfig,
    pub api: ApiConfig,
    pub kube: KubeConfig,
}

impl AppConfig {
    /// Load the fleet file, apply environment overrides and validate.
    pub fn load() -> Result<Self, ConfigLoadError> {
        let path = config_path_from_args()
            .or_else(config_path_from_env)
            .ok_or(ConfigLoadError::MissingConfigPath)?;

        let mut fleet = fleet_from_path(&path)?;
        apply_overrides(&mut fleet, |key| std::env::var(key).ok())?;
        fleet.validate()?;

        Ok(Self {
            fleet,
            api: ApiConfig::from_env(),
            kube: KubeConfig::from_env(),
        })
    }
}

/// Parse a fleet configuration file.
pub fn fleet_from_path(path: &Path) -> Result<FleetConfig, ConfigLoadError> {
    let contents = std::fs::read_to_string(path).map_err(|source| ConfigLoadError::Io {
        path: path.to_path_buf(),
        source,
    })?;
    Ok(toml::from_str(&contents)?)
}

/// Apply `FLEETVER_CACHE_MAX_SIZE` and `FLEETVER_MICROSERVICE_LABEL`.
pub fn apply_overrides<F>(fleet: &mut FleetConfig, lookup: F) -> Result<(), ConfigLoadError>
where
    F: Fn(&str) -> Option<String>,
{
    if let Some(raw) = lookup("FLEETVER_CACHE_MAX_SIZE") {
        fleet.max_entries_per_environment =
            raw.trim()
                .parse()
                .map_err(|_| ConfigLoadError::InvalidValue {
                    field: "FLEETVER_CACHE_MAX_SIZE",
                    reason: format!("'{raw}' is not a positive integer"),
                })?;
    }

    if let Some(raw) = lookup("FLEETVER_MICROSERVICE_LABEL") {
        fleet.label_selector = raw
            .parse::<LabelSelector>()
            .map_err(|e| ConfigLoadError::Fleet(e.into()))?;
    }

    Ok(())
}

fn config_path_from_env() -> Option<PathBuf> {
    std::env::var(CONFIG_ENV).ok().map(PathBuf::from)
}

fn config_path_from_args() -> Option<PathBuf> {
    let mut args = std::env::args().skip(1);
    while let Some(arg) = args.next() {
        if arg == "--config" {
            return args.next().map(PathBuf::from);
        }
    }
    None
}

// ============================================================================
// SERVER CONFIGURATION
// ============================================================================

/// Bind address and CORS settings.
#[derive(Debug, Clone)]
pub struct ApiConfig {
    /// Allowed CORS origins (comma-separated in env var).
    /// Empty means allow all origins (dev mode).
    pub cors_origins: Vec<String>,

    /// Whether to allow credentials in CORS requests.
    pub cors_allow_credentials: bool,

    /// Max age for CORS preflight cache in seconds.
    pub cors_max_age_secs: u64,

    pub bind_host: String,
    pub port: u16,
}

impl Default for ApiConfig {
    fn default() -> Self {
        Self {
            cors_origins: Vec::new(),
            cors_allow_credentials: false,
            cors_max_age_secs: 86400,
            bind_host: "0.0.0.0".to_string(),
            port: 8000,
        }
    }
}

impl ApiConfig {
    /// Create ApiConfig from environment variables.
    ///
    /// Environment variables:
    /// - `FLEETVER_CORS_ORIGINS`: Comma-separated allowed origins (empty = allow all)
    /// - `FLEETVER_CORS_ALLOW_CREDENTIALS`: "true" or "false" (default: false)
    /// - `FLEETVER_CORS_MAX_AGE_SECS`: Preflight cache duration (default: 86400)
    /// - `FLEETVER_API_BIND`: Bind host (default: 0.0.0.0)
    /// - `PORT` or `FLEETVER_API_PORT`: Bind port (default: 8000)
    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    pub fn from_lookup<F>(lookup: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        let defaults = Self::default();

        let cors_origins = lookup("FLEETVER_CORS_ORIGINS")
            .map(|s| {
                s.split(',')
                    .map(|o| o.trim().to_string())
                    .filter(|o| !o.is_empty())
                    .collect()
            })
            .unwrap_or_default();

        let cors_allow_credentials = lookup("FLEETVER_CORS_ALLOW_CREDENTIALS")
            .map(|s| s.to_lowercase() == "true")
            .unwrap_or(defaults.cors_allow_credentials);

        let cors_max_age_secs = lookup("FLEETVER_CORS_MAX_AGE_SECS")
            .and_then(|s| s.parse().ok())
            .unwrap_or(defaults.cors_max_age_secs);

        let bind_host = lookup("FLEETVER_API_BIND").unwrap_or(defaults.bind_host);

        let port = lookup("PORT")
            .or_else(|| lookup("FLEETVER_API_PORT"))
            .and_then(|s| s.parse().ok())
            .unwrap_or(defaults.port);

        Self {
            cors_origins,
            cors_allow_credentials,
            cors_max_age_secs,
            bind_host,
            port,
        }
    }

    /// Check if running in production mode (strict CORS).
    pub fn is_production(&self) -> bool {
        !self.cors_origins.is_empty()
    }

    pub fn bind_addr(&self) -> ApiResult<SocketAddr> {
        let addr = format!("{}:{}", self.bind_host, self.port);
        addr.parse::<SocketAddr>().map_err(|e| {
            ApiError::invalid_input(format!("Invalid bind address {}: {}", addr, e))
        })
    }
}

// ============================================================================
// KUBERNETES CLIENT CONFIGURATION
// ============================================================================

/// Settings shared by every cluster client.
#[derive(Debug, Clone)]
pub struct KubeConfig {
    /// Deadline for each Kubernetes API request.
    pub request_timeout: Duration,

    /// Verify cluster TLS certificates.
    pub verify_tls: bool,

    /// JSON file mapping cluster id to endpoint and bearer token.
    pub credentials_path: PathBuf,
}

impl Default for KubeConfig {
    fn default() -> Self {
        Self {
            request_timeout: Duration::from_secs(30),
            verify_tls: true,
            credentials_path: PathBuf::from("cluster-credentials.json"),
        }
    }
}

impl KubeConfig {
    /// Create KubeConfig from environment variables.
    ///
    /// Environment variables:
    /// - `FLEETVER_KUBE_TIMEOUT_SECS`: Per-request deadline (default: 30)
    /// - `FLEETVER_KUBE_VERIFY_TLS`: "false" disables certificate checks (default: true)
    /// - `FLEETVER_CREDENTIALS_PATH`: Credentials file (default: cluster-credentials.json)
    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    pub fn from_lookup<F>(lookup: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        let defaults = Self::default();

        let request_timeout = lookup("FLEETVER_KUBE_TIMEOUT_SECS")
            .and_then(|s| s.parse::<u64>().ok())
            .filter(|secs| *secs > 0)
            .map(Duration::from_secs)
            .unwrap_or(defaults.request_timeout);

        let verify_tls = lookup("FLEETVER_KUBE_VERIFY_TLS")
            .map(|s| s.to_lowercase() != "false")
            .unwrap_or(defaults.verify_tls);

        let credentials_path = lookup("FLEETVER_CREDENTIALS_PATH")
            .map(PathBuf::from)
            .unwrap_or(defaults.credentials_path);

        Self {
            request_timeout,
            verify_tls,
            credentials_path,
        }
    }
}
