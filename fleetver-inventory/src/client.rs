//! Collaborator seams: cluster clients, their factory and credentials.

use async_trait::async_trait;
use fleetver_core::{DeploymentObject, FleetError, FleetResult};
use serde::{Deserialize, Serialize};
use std::sync::Arc;

/// A connected, authenticated client for one cluster.
#[async_trait]
pub trait ClusterClient: Send + Sync {
    /// List every deployment in every namespace of the cluster.
    ///
    /// An empty list means the cluster has no deployments; failures are
    /// reported as errors.
    async fn list_deployments(&self) -> FleetResult<Vec<DeploymentObject>>;
}

/// Builds clients for clusters on demand.
#[async_trait]
pub trait ClusterClientFactory: Send + Sync {
    /// Connect to `cluster`. An error marks the cluster as unavailable.
    async fn initialize(&self, cluster: &str) -> FleetResult<Arc<dyn ClusterClient>>;
}

/// Looks up the endpoint and token of a cluster.
#[async_trait]
pub trait CredentialProvider: Send + Sync {
    async fn credentials(&self, cluster: &str) -> FleetResult<ClusterCredentials>;
}

/// API endpoint and bearer token of one cluster.
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ClusterCredentials {
    #[serde(rename = "cluster_api_endpoint", default)]
    pub endpoint: String,
    #[serde(rename = "bearer_token", default)]
    pub token: String,
}

impl std::fmt::Debug for ClusterCredentials {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ClusterCredentials")
            .field("endpoint", &self.endpoint)
            .field("token", &"<redacted>")
            .finish()
    }
}

impl ClusterCredentials {
    pub fn new(endpoint: impl Into<String>, token: impl Into<String>) -> Self {
        Self {
            endpoint: endpoint.into(),
            token: token.into(),
        }
    }

    /// Reject incomplete credentials and non-TLS endpoints.
    pub fn validate(&self, cluster: &str) -> FleetResult<()> {
        if self.endpoint.is_empty() || self.token.is_empty() {
            return Err(FleetError::cluster_unavailable(
                cluster,
                "credentials missing endpoint or token",
            ));
        }
        if !self.endpoint.starts_with("https://") {
            return Err(FleetError::cluster_unavailable(
                cluster,
                format!("endpoint '{}' is not https", self.endpoint),
            ));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use fleetver_core::ErrorKind;

    #[test]
    fn test_validate_accepts_https() {
        let creds = ClusterCredentials::new("https://10.0.0.1:6443", "token");
        assert!(creds.validate("eks-dev-1").is_ok());
    }

    #[test]
    fn test_validate_rejects_plain_http() {
        let creds = ClusterCredentials::new("http://10.0.0.1:6443", "token");
        let err = creds.validate("eks-dev-1").unwrap_err();
        assert_eq!(err.kind(), ErrorKind::ClusterUnavailable);
    }

    #[test]
    fn test_validate_rejects_missing_token() {
        let creds = ClusterCredentials::new("https://10.0.0.1:6443", "");
        assert!(creds.validate("eks-dev-1").is_err());
    }

    #[test]
    fn test_debug_redacts_token() {
        let creds = ClusterCredentials::new("https://k8s", "s3cr3t");
        let debug = format!("{:?}", creds);
        assert!(!debug.contains("s3cr3t"));
    }

    #[test]
    fn test_deserialize_secret_shape() {
        let creds: ClusterCredentials = serde_json::from_str(
            r#"{"cluster_api_endpoint": "https://k8s.example", "bearer_token": "abc"}"#,
        )
        .unwrap();
        assert_eq!(creds.endpoint, "https://k8s.example");
        assert_eq!(creds.token, "abc");
    }
}
