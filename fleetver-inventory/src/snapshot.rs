//! Cache-miss computation: enumerate one cluster into a snapshot.

use crate::registry::ClientRegistry;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use fleetver_core::image::{dedupe, extract_container, process_containers};
use fleetver_core::{
    Clock, ClusterSnapshot, DeploymentObject, DeploymentRecord, FleetError, FleetResult,
};
use fleetver_storage::BucketFetcher;
use std::sync::Arc;
use tracing::debug;

/// Parse one raw deployment into its inventory record.
pub fn to_record(cluster: &str, deployment: DeploymentObject) -> DeploymentRecord {
    let listed: Vec<_> = deployment.containers.iter().map(extract_container).collect();
    DeploymentRecord {
        main_containers: dedupe(listed.clone()),
        init_containers: process_containers(&deployment.init_containers),
        listed_containers: listed,
        name: deployment.name,
        namespace: deployment.namespace,
        cluster: cluster.to_string(),
        labels: deployment.labels,
    }
}

/// Enumerates clusters through the registry's clients.
pub struct SnapshotFetcher {
    registry: Arc<ClientRegistry>,
    clock: Arc<dyn Clock>,
}

impl SnapshotFetcher {
    pub fn new(registry: Arc<ClientRegistry>, clock: Arc<dyn Clock>) -> Self {
        Self { registry, clock }
    }
}

#[async_trait]
impl BucketFetcher<ClusterSnapshot> for SnapshotFetcher {
    async fn fetch(
        &self,
        cluster: &str,
        env: &str,
        bucket: DateTime<Utc>,
    ) -> FleetResult<ClusterSnapshot> {
        let client = self.registry.client(env, cluster).ok_or_else(|| {
            FleetError::cluster_unavailable(cluster, format!("no client initialized in '{env}'"))
        })?;

        let fetched_at = self.clock.now();
        let deployments = client.list_deployments().await.map_err(|e| match e {
            FleetError::Cluster(_) => e,
            other => FleetError::enumeration_failed(cluster, other),
        })?;

        debug!(
            env = %env,
            cluster = %cluster,
            bucket = %bucket,
            deployments = deployments.len(),
            "Enumerated cluster"
        );

        Ok(ClusterSnapshot {
            cluster: cluster.to_string(),
            deployments: deployments
                .into_iter()
                .map(|deployment| to_record(cluster, deployment))
                .collect(),
            fetched_at,
        })
    }
}
