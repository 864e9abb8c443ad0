//! Entity types observed in cluster snapshots.

use crate::Timestamp;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

// ============================================================================
// RAW CLUSTER OBJECTS
// ============================================================================

/// A container as listed by the cluster API, before any parsing.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ContainerSpec {
    pub name: String,
    pub image: String,
}

impl ContainerSpec {
    pub fn new(name: impl Into<String>, image: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            image: image.into(),
        }
    }
}

/// A deployment object as returned by a cluster enumerator.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct DeploymentObject {
    pub name: String,
    pub namespace: String,
    #[serde(default)]
    pub labels: BTreeMap<String, String>,
    #[serde(default)]
    pub containers: Vec<ContainerSpec>,
    #[serde(default)]
    pub init_containers: Vec<ContainerSpec>,
}

// ============================================================================
// DERIVED RECORDS
// ============================================================================

/// Parsed tag/version of one container image reference.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ContainerDescriptor {
    pub image: String,
    pub image_tag: String,
    pub version: String,
    /// Name of the container that referenced the image, when known.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub container: Option<String>,
}

impl ContainerDescriptor {
    /// Composite identity used for deduplication.
    pub fn dedupe_key(&self) -> String {
        format!("{}:{}", self.image, self.version)
    }
}

/// One deployment observed in one cluster snapshot.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DeploymentRecord {
    #[serde(rename = "deployment-name")]
    pub name: String,
    pub namespace: String,
    pub cluster: String,
    #[serde(rename = "main-containers")]
    pub main_containers: Vec<ContainerDescriptor>,
    #[serde(rename = "init-containers")]
    pub init_containers: Vec<ContainerDescriptor>,
    /// Every main container as listed, duplicates included. The matrix
    /// joins versions over these; not part of the inventory payload.
    #[serde(default, skip_serializing)]
    pub listed_containers: Vec<ContainerDescriptor>,
    /// Kept for selector matching; not part of the inventory payload.
    #[serde(default, skip_serializing)]
    pub labels: BTreeMap<String, String>,
}

impl DeploymentRecord {
    /// True when the deployment carries `key=value` among its labels.
    pub fn has_label(&self, key: &str, value: &str) -> bool {
        self.labels.get(key).is_some_and(|v| v == value)
    }
}

/// Everything enumerated from one cluster at one point in time.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ClusterSnapshot {
    pub cluster: String,
    pub deployments: Vec<DeploymentRecord>,
    pub fetched_at: Timestamp,
}

// ============================================================================
// MICROSERVICE MATRIX
// ============================================================================

/// Placeholder for a matrix column with no observed version.
pub const VERSION_PLACEHOLDER: &str = "-";

/// Environment-type column of the microservice matrix.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EnvironmentType {
    Dev,
    Lit,
    Shared,
    Stg,
    Prod,
}

impl EnvironmentType {
    /// Classification order; the first designator found in a cluster id wins.
    pub const ALL: [EnvironmentType; 5] = [
        EnvironmentType::Dev,
        EnvironmentType::Lit,
        EnvironmentType::Shared,
        EnvironmentType::Stg,
        EnvironmentType::Prod,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            EnvironmentType::Dev => "dev",
            EnvironmentType::Lit => "lit",
            EnvironmentType::Shared => "shared",
            EnvironmentType::Stg => "stg",
            EnvironmentType::Prod => "prod",
        }
    }

    /// Classify a cluster id by substring; unmatched clusters yield `None`.
    pub fn classify(cluster: &str) -> Option<Self> {
        Self::ALL
            .into_iter()
            .find(|env_type| cluster.contains(env_type.as_str()))
    }
}

impl std::fmt::Display for EnvironmentType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Label-selected deployment with its comma-joined container versions.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MicroserviceDeployment {
    pub deployment_name: String,
    pub version: String,
}

/// One row of the microservice matrix.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MicroserviceVersionRow {
    pub microsvc: String,
    pub dev: String,
    pub lit: String,
    pub shared: String,
    pub stg: String,
    pub prod: String,
}

impl MicroserviceVersionRow {
    /// A row with every column set to the placeholder.
    pub fn new(microsvc: impl Into<String>) -> Self {
        Self {
            microsvc: microsvc.into(),
            dev: VERSION_PLACEHOLDER.to_string(),
            lit: VERSION_PLACEHOLDER.to_string(),
            shared: VERSION_PLACEHOLDER.to_string(),
            stg: VERSION_PLACEHOLDER.to_string(),
            prod: VERSION_PLACEHOLDER.to_string(),
        }
    }

    fn column_mut(&mut self, env_type: EnvironmentType) -> &mut String {
        match env_type {
            EnvironmentType::Dev => &mut self.dev,
            EnvironmentType::Lit => &mut self.lit,
            EnvironmentType::Shared => &mut self.shared,
            EnvironmentType::Stg => &mut self.stg,
            EnvironmentType::Prod => &mut self.prod,
        }
    }

    /// Read one column.
    pub fn get(&self, env_type: EnvironmentType) -> &str {
        match env_type {
            EnvironmentType::Dev => &self.dev,
            EnvironmentType::Lit => &self.lit,
            EnvironmentType::Shared => &self.shared,
            EnvironmentType::Stg => &self.stg,
            EnvironmentType::Prod => &self.prod,
        }
    }

    /// Overwrite one column.
    pub fn set(&mut self, env_type: EnvironmentType, version: impl Into<String>) {
        *self.column_mut(env_type) = version.into();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_classify_first_match_wins() {
        assert_eq!(EnvironmentType::classify("eks-dev-01"), Some(EnvironmentType::Dev));
        assert_eq!(EnvironmentType::classify("lit-cluster"), Some(EnvironmentType::Lit));
        assert_eq!(EnvironmentType::classify("shared-svc"), Some(EnvironmentType::Shared));
        assert_eq!(EnvironmentType::classify("aks-stg"), Some(EnvironmentType::Stg));
        assert_eq!(EnvironmentType::classify("gke-prod-eu"), Some(EnvironmentType::Prod));
        // "dev" precedes "prod" in classification order
        assert_eq!(EnvironmentType::classify("prod-devtools"), Some(EnvironmentType::Dev));
        assert_eq!(EnvironmentType::classify("sandbox"), None);
    }

    #[test]
    fn test_row_defaults_to_placeholder() {
        let mut row = MicroserviceVersionRow::new("billing");
        row.set(EnvironmentType::Dev, "1.4.0");

        assert_eq!(row.get(EnvironmentType::Dev), "1.4.0");
        for env_type in [
            EnvironmentType::Lit,
            EnvironmentType::Shared,
            EnvironmentType::Stg,
            EnvironmentType::Prod,
        ] {
            assert_eq!(row.get(env_type), VERSION_PLACEHOLDER);
        }
    }

    #[test]
    fn test_deployment_record_serialization_shape() {
        let record = DeploymentRecord {
            name: "api".to_string(),
            namespace: "default".to_string(),
            cluster: "eks-dev".to_string(),
            main_containers: vec![],
            init_containers: vec![],
            listed_containers: vec![],
            labels: BTreeMap::from([("app".to_string(), "api".to_string())]),
        };

        let json = serde_json::to_string(&record).unwrap();
        assert!(json.contains("\"deployment-name\":\"api\""));
        assert!(json.contains("\"main-containers\":[]"));
        assert!(!json.contains("labels"));
        assert!(!json.contains("listed"));
        assert!(record.has_label("app", "api"));
        assert!(!record.has_label("app", "web"));
    }

    #[test]
    fn test_row_serializes_all_columns() {
        let row = MicroserviceVersionRow::new("orders");
        let json = serde_json::to_value(&row).unwrap();
        for key in ["microsvc", "dev", "lit", "shared", "stg", "prod"] {
            assert!(json.get(key).is_some(), "missing column {key}");
        }
    }
}
