//! Merging per-cluster snapshots into caller-facing shapes.

use fleetver_core::image::joined_versions;
use fleetver_core::{
    ClusterSnapshot, DeploymentRecord, EnvironmentType, FleetResult, LabelSelector,
    MicroserviceDeployment, MicroserviceVersionRow, Timestamp,
};
use fleetver_storage::CacheRead;
use std::collections::{BTreeMap, HashMap};
use tracing::warn;

/// Flat deployment list of one environment.
#[derive(Debug, Clone, Default)]
pub struct FlatInventory {
    pub deployments: Vec<DeploymentRecord>,
    /// Fetch time of the first cluster that succeeded.
    pub fetched_at: Option<Timestamp>,
    pub succeeded: usize,
    pub failed: usize,
}

/// Concatenate successful cluster snapshots in order; failed clusters are
/// logged and skipped.
pub fn merge_inventory<I>(env: &str, results: I) -> FlatInventory
where
    I: IntoIterator<Item = (String, FleetResult<CacheRead<ClusterSnapshot>>)>,
{
    let mut inventory = FlatInventory::default();
    for (cluster, result) in results {
        match result {
            Ok(read) => {
                let snapshot = read.value();
                inventory.fetched_at.get_or_insert(snapshot.fetched_at);
                inventory
                    .deployments
                    .extend(snapshot.deployments.iter().cloned());
                inventory.succeeded += 1;
            }
            Err(e) => {
                warn!(env = %env, cluster = %cluster, error = %e, "Skipping cluster");
                inventory.failed += 1;
            }
        }
    }
    inventory
}

/// Label-selected deployments of a snapshot with their matrix versions.
pub fn microservice_deployments(
    snapshot: &ClusterSnapshot,
    selector: &LabelSelector,
    special_deployments: &[String],
) -> Vec<MicroserviceDeployment> {
    snapshot
        .deployments
        .iter()
        .filter(|record| selector.matches(&record.labels))
        .map(|record| MicroserviceDeployment {
            deployment_name: record.name.clone(),
            version: joined_versions(&record.listed_containers, special_deployments),
        })
        .collect()
}

/// Collects microservice deployments per environment-type column.
#[derive(Debug, Default)]
pub struct MatrixBuilder {
    columns: BTreeMap<EnvironmentType, Vec<MicroserviceDeployment>>,
}

impl MatrixBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add the deployments observed in one cluster of type `env_type`.
    pub fn observe(&mut self, env_type: EnvironmentType, deployments: Vec<MicroserviceDeployment>) {
        self.columns.entry(env_type).or_default().extend(deployments);
    }

    /// Pivot into one row per microservice.
    ///
    /// Columns are visited in `dev, lit, shared, stg, prod` order and rows
    /// keep the order their microservice was first seen in. A later
    /// observation for the same (microservice, column) overwrites an
    /// earlier one.
    pub fn build(self) -> Vec<MicroserviceVersionRow> {
        let mut rows: Vec<MicroserviceVersionRow> = Vec::new();
        let mut index: HashMap<String, usize> = HashMap::new();

        for env_type in EnvironmentType::ALL {
            let Some(deployments) = self.columns.get(&env_type) else {
                continue;
            };
            for deployment in deployments {
                let position = *index
                    .entry(deployment.deployment_name.clone())
                    .or_insert_with(|| {
                        rows.push(MicroserviceVersionRow::new(&deployment.deployment_name));
                        rows.len() - 1
                    });
                rows[position].set(env_type, deployment.version.clone());
            }
        }
        rows
    }
}
