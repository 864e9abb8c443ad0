//! Error types for fleetver operations

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Machine-readable error category carried by every [`FleetError`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorKind {
    ConfigurationError,
    ClusterUnavailable,
    EnumerationFailure,
    NotFound,
    SerializationError,
}

impl ErrorKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            ErrorKind::ConfigurationError => "configuration_error",
            ErrorKind::ClusterUnavailable => "cluster_unavailable",
            ErrorKind::EnumerationFailure => "enumeration_failure",
            ErrorKind::NotFound => "not_found",
            ErrorKind::SerializationError => "serialization_error",
        }
    }
}

impl std::fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Configuration errors.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum ConfigError {
    #[error("Environment '{env}' not supported")]
    UnknownEnvironment { env: String },

    #[error("Missing required configuration field: {field}")]
    MissingRequired { field: String },

    #[error("Invalid value for {field}: {value} - {reason}")]
    InvalidValue {
        field: String,
        value: String,
        reason: String,
    },
}

/// Per-cluster errors. Both variants are absorbed by aggregation.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum ClusterError {
    #[error("Cluster '{cluster}' unavailable: {reason}")]
    Unavailable { cluster: String, reason: String },

    #[error("Enumeration of cluster '{cluster}' failed: {reason}")]
    EnumerationFailed { cluster: String, reason: String },
}

impl ClusterError {
    /// The cluster the error belongs to.
    pub fn cluster(&self) -> &str {
        match self {
            ClusterError::Unavailable { cluster, .. }
            | ClusterError::EnumerationFailed { cluster, .. } => cluster,
        }
    }
}

/// Lookup errors from auth-adjacent collaborators.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum LookupError {
    #[error("{resource} '{id}' not found")]
    NotFound { resource: String, id: String },
}

/// Master error type for all fleetver errors.
#[derive(Debug, Clone, Error)]
pub enum FleetError {
    #[error("Config error: {0}")]
    Config(#[from] ConfigError),

    #[error("Cluster error: {0}")]
    Cluster(#[from] ClusterError),

    #[error("Lookup error: {0}")]
    Lookup(#[from] LookupError),

    #[error("Serialization error: {reason}")]
    Serialization { reason: String },
}

impl FleetError {
    /// Machine-readable kind of this error.
    pub fn kind(&self) -> ErrorKind {
        match self {
            FleetError::Config(_) => ErrorKind::ConfigurationError,
            FleetError::Cluster(ClusterError::Unavailable { .. }) => ErrorKind::ClusterUnavailable,
            FleetError::Cluster(ClusterError::EnumerationFailed { .. }) => {
                ErrorKind::EnumerationFailure
            }
            FleetError::Lookup(_) => ErrorKind::NotFound,
            FleetError::Serialization { .. } => ErrorKind::SerializationError,
        }
    }

    /// Shorthand for an unknown environment.
    pub fn unknown_environment(env: impl Into<String>) -> Self {
        FleetError::Config(ConfigError::UnknownEnvironment { env: env.into() })
    }

    pub fn cluster_unavailable(cluster: impl Into<String>, reason: impl ToString) -> Self {
        FleetError::Cluster(ClusterError::Unavailable {
            cluster: cluster.into(),
            reason: reason.to_string(),
        })
    }

    pub fn enumeration_failed(cluster: impl Into<String>, reason: impl ToString) -> Self {
        FleetError::Cluster(ClusterError::EnumerationFailed {
            cluster: cluster.into(),
            reason: reason.to_string(),
        })
    }

    /// True for errors the aggregator absorbs instead of surfacing.
    pub fn is_recoverable(&self) -> bool {
        matches!(self, FleetError::Cluster(_))
    }
}

impl From<serde_json::Error> for FleetError {
    fn from(err: serde_json::Error) -> Self {
        FleetError::Serialization {
            reason: err.to_string(),
        }
    }
}

/// Result type alias for fleetver operations.
pub type FleetResult<T> = Result<T, FleetError>;

// =============================================================================
// TESTS
// =============================================================================
