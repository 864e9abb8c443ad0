//! Cluster credentials backed by a JSON file.
//!
//! ```json
//! {
//!   "eks-dev-1": {
//!     "cluster_api_endpoint": "https://10.0.0.1:6443",
//!     "bearer_token": "..."
//!   }
//! }
//! ```

use async_trait::async_trait;
use fleetver_core::{FleetError, FleetResult};
use fleetver_inventory::{ClusterCredentials, CredentialProvider};
use std::collections::HashMap;
use std::path::{Path, PathBuf};

/// Reads the credentials file on every lookup so rotated tokens are picked
/// up when clients are re-initialised.
#[derive(Debug, Clone)]
pub struct FileCredentialProvider {
    path: PathBuf,
}

impl FileCredentialProvider {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

/// Parse the credentials map.
pub fn parse_credentials(contents: &str) -> FleetResult<HashMap<String, ClusterCredentials>> {
    Ok(serde_json::from_str(contents)?)
}

#[async_trait]
impl CredentialProvider for FileCredentialProvider {
    async fn credentials(&self, cluster: &str) -> FleetResult<ClusterCredentials> {
        let contents = tokio::fs::read_to_string(&self.path).await.map_err(|e| {
            FleetError::cluster_unavailable(
                cluster,
                format!("cannot read {}: {}", self.path.display(), e),
            )
        })?;

        let mut all = parse_credentials(&contents)
            .map_err(|e| FleetError::cluster_unavailable(cluster, e))?;

        let credentials = all
            .remove(cluster)
            .ok_or_else(|| FleetError::cluster_unavailable(cluster, "credentials not found"))?;
        credentials.validate(cluster)?;
        Ok(credentials)
    }
}
