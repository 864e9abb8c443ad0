//! Kubernetes REST client.
//!
//! Lists namespaces through the core v1 API, then the deployments of each
//! namespace through apps/v1. Only the fields the inventory reads are
//! deserialised. A client is only handed out after an authenticated
//! `GET /version` succeeds.

use async_trait::async_trait;
use fleetver_core::{ClusterError, ContainerSpec, DeploymentObject, FleetError, FleetResult};
use fleetver_inventory::{ClusterClient, ClusterClientFactory, CredentialProvider};
use serde::de::DeserializeOwned;
use serde::Deserialize;
use std::collections::BTreeMap;
use std::sync::Arc;
use tracing::{debug, info};

use crate::config::KubeConfig;

// ============================================================================
// WIRE TYPES
// ============================================================================

#[derive(Debug, Deserialize)]
struct List<T> {
    #[serde(default = "Vec::new")]
    items: Vec<T>,
}

#[derive(Debug, Default, Deserialize)]
struct ObjectMeta {
    #[serde(default)]
    name: String,
    #[serde(default)]
    namespace: Option<String>,
    #[serde(default)]
    labels: Option<BTreeMap<String, String>>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
struct VersionInfo {
    #[serde(default)]
    git_version: String,
}

#[derive(Debug, Deserialize)]
struct Namespace {
    #[serde(default)]
    metadata: ObjectMeta,
}

#[derive(Debug, Deserialize)]
struct Deployment {
    #[serde(default)]
    metadata: ObjectMeta,
    #[serde(default)]
    spec: Option<DeploymentSpec>,
}

#[derive(Debug, Deserialize)]
struct DeploymentSpec {
    #[serde(default)]
    template: Option<PodTemplate>,
}

#[derive(Debug, Deserialize)]
struct PodTemplate {
    #[serde(default)]
    spec: Option<PodSpec>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
struct PodSpec {
    #[serde(default)]
    containers: Vec<Container>,
    #[serde(default)]
    init_containers: Vec<Container>,
}

#[derive(Debug, Deserialize)]
struct Container {
    name: String,
    #[serde(default)]
    image: Option<String>,
}

impl From<Container> for ContainerSpec {
    fn from(container: Container) -> Self {
        ContainerSpec::new(container.name, container.image.unwrap_or_default())
    }
}

impl Deployment {
    fn into_object(self, namespace: &str) -> DeploymentObject {
        let pod = self
            .spec
            .and_then(|spec| spec.template)
            .and_then(|template| template.spec)
            .unwrap_or_default();

        DeploymentObject {
            name: self.metadata.name,
            namespace: self
                .metadata
                .namespace
                .unwrap_or_else(|| namespace.to_string()),
            labels: self.metadata.labels.unwrap_or_default(),
            containers: pod.containers.into_iter().map(Into::into).collect(),
            init_containers: pod.init_containers.into_iter().map(Into::into).collect(),
        }
    }
}

// ============================================================================
// CLIENT
// ============================================================================

/// Authenticated client for one cluster's API server.
#[derive(Debug, Clone)]
pub struct KubeRestClient {
    cluster: String,
    endpoint: String,
    token: String,
    http: reqwest::Client,
}

impl KubeRestClient {
    pub fn new(
        cluster: impl Into<String>,
        endpoint: &str,
        token: impl Into<String>,
        http: reqwest::Client,
    ) -> Self {
        Self {
            cluster: cluster.into(),
            endpoint: endpoint.trim_end_matches('/').to_string(),
            token: token.into(),
            http,
        }
    }

    pub fn cluster(&self) -> &str {
        &self.cluster
    }

    async fn get_json<T: DeserializeOwned>(&self, path: &str) -> FleetResult<T> {
        let url = format!("{}{}", self.endpoint, path);
        let response = self
            .http
            .get(&url)
            .bearer_auth(&self.token)
            .send()
            .await
            .map_err(|e| FleetError::enumeration_failed(&self.cluster, e))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(FleetError::enumeration_failed(
                &self.cluster,
                format!("GET {} returned HTTP {}: {}", path, status.as_u16(), body.trim()),
            ));
        }

        response
            .json::<T>()
            .await
            .map_err(|e| FleetError::enumeration_failed(&self.cluster, e))
    }

    /// Authenticated `GET /version`.
    ///
    /// An unreachable server or a rejected token makes the cluster
    /// unavailable rather than failing an enumeration.
    pub async fn server_version(&self) -> FleetResult<String> {
        let info: VersionInfo = self.get_json("/version").await.map_err(|e| match e {
            FleetError::Cluster(ClusterError::EnumerationFailed { cluster, reason }) => {
                FleetError::cluster_unavailable(cluster, reason)
            }
            other => other,
        })?;
        Ok(info.git_version)
    }
}

#[async_trait]
impl ClusterClient for KubeRestClient {
    async fn list_deployments(&self) -> FleetResult<Vec<DeploymentObject>> {
        let namespaces: List<Namespace> = self.get_json("/api/v1/namespaces").await?;

        let mut deployments = Vec::new();
        for namespace in namespaces.items {
            let name = namespace.metadata.name;
            let path = format!("/apis/apps/v1/namespaces/{}/deployments", name);
            let listed: List<Deployment> = self.get_json(&path).await?;
            deployments.extend(listed.items.into_iter().map(|d| d.into_object(&name)));
        }

        debug!(
            cluster = %self.cluster,
            deployments = deployments.len(),
            "Listed deployments"
        );
        Ok(deployments)
    }
}

// ============================================================================
// FACTORY
// ============================================================================

/// Builds [`KubeRestClient`]s from looked-up credentials.
pub struct KubeClientFactory {
    credentials: Arc<dyn CredentialProvider>,
    config: KubeConfig,
}

impl KubeClientFactory {
    pub fn new(credentials: Arc<dyn CredentialProvider>, config: KubeConfig) -> Self {
        Self {
            credentials,
            config,
        }
    }

    fn http_client(&self, cluster: &str) -> FleetResult<reqwest::Client> {
        reqwest::Client::builder()
            .timeout(self.config.request_timeout)
            .danger_accept_invalid_certs(!self.config.verify_tls)
            .build()
            .map_err(|e| FleetError::cluster_unavailable(cluster, e))
    }
}

impl std::fmt::Debug for KubeClientFactory {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("KubeClientFactory")
            .field("config", &self.config)
            .finish_non_exhaustive()
    }
}

#[async_trait]
impl ClusterClientFactory for KubeClientFactory {
    async fn initialize(&self, cluster: &str) -> FleetResult<Arc<dyn ClusterClient>> {
        let credentials = self.credentials.credentials(cluster).await?;
        credentials.validate(cluster)?;

        let http = self.http_client(cluster)?;
        let client = KubeRestClient::new(cluster, &credentials.endpoint, credentials.token, http);
        let version = client.server_version().await?;

        info!(
            cluster = %cluster,
            endpoint = %credentials.endpoint,
            version = %version,
            "Initialized cluster client"
        );
        Ok(Arc::new(client))
    }
}
