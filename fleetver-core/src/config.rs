//! Configuration types

use crate::*;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::str::FromStr;
use std::time::Duration;

/// TTL used when an environment does not set one.
pub const DEFAULT_TTL_SECS: u64 = 300;

/// Default per-environment cache capacity.
pub const DEFAULT_MAX_ENTRIES: usize = 256;

/// Deployments whose build ids must not be truncated at the first hyphen.
pub const DEFAULT_SPECIAL_DEPLOYMENTS: [&str; 4] =
    ["notary", "customer-node", "customer2-node", "forworder-node"];

/// Designator that marks an environment as part of the platform matrix.
pub const DEFAULT_PLATFORM_DESIGNATOR: &str = "platform";

fn default_ttl_secs() -> u64 {
    DEFAULT_TTL_SECS
}

fn default_max_entries() -> usize {
    DEFAULT_MAX_ENTRIES
}

fn default_special_deployments() -> Vec<String> {
    DEFAULT_SPECIAL_DEPLOYMENTS
        .iter()
        .map(|s| s.to_string())
        .collect()
}

fn default_platform_designator() -> String {
    DEFAULT_PLATFORM_DESIGNATOR.to_string()
}

// ============================================================================
// LABEL SELECTOR
// ============================================================================

/// Single `key=value` label selector.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct LabelSelector {
    pub key: String,
    pub value: String,
}

impl LabelSelector {
    pub fn matches(&self, labels: &BTreeMap<String, String>) -> bool {
        labels.get(&self.key).is_some_and(|v| *v == self.value)
    }
}

impl FromStr for LabelSelector {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let invalid = |reason: &str| ConfigError::InvalidValue {
            field: "label_selector".to_string(),
            value: s.to_string(),
            reason: reason.to_string(),
        };

        let (key, value) = s
            .split_once('=')
            .ok_or_else(|| invalid("expected key=value"))?;
        let (key, value) = (key.trim(), value.trim());
        if key.is_empty() {
            return Err(invalid("key must not be empty"));
        }
        if value.contains('=') {
            return Err(invalid("expected exactly one '='"));
        }

        Ok(Self {
            key: key.to_string(),
            value: value.to_string(),
        })
    }
}

impl TryFrom<String> for LabelSelector {
    type Error = ConfigError;

    fn try_from(s: String) -> Result<Self, Self::Error> {
        s.parse()
    }
}

impl From<LabelSelector> for String {
    fn from(selector: LabelSelector) -> Self {
        selector.to_string()
    }
}

impl std::fmt::Display for LabelSelector {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}={}", self.key, self.value)
    }
}

// ============================================================================
// ENVIRONMENTS
// ============================================================================

/// One logical environment and its clusters.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct EnvironmentConfig {
    #[serde(default = "default_ttl_secs")]
    pub ttl_secs: u64,
    #[serde(default)]
    pub clusters: Vec<String>,
}

impl EnvironmentConfig {
    pub fn new(ttl_secs: u64, clusters: Vec<String>) -> Self {
        Self { ttl_secs, clusters }
    }

    pub fn ttl(&self) -> Duration {
        Duration::from_secs(self.ttl_secs)
    }
}

/// Master configuration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct FleetConfig {
    /// Environments keyed by lower-case name.
    pub environments: BTreeMap<String, EnvironmentConfig>,
    #[serde(default = "default_max_entries")]
    pub max_entries_per_environment: usize,
    pub label_selector: LabelSelector,
    #[serde(default = "default_special_deployments")]
    pub special_deployments: Vec<String>,
    #[serde(default = "default_platform_designator")]
    pub platform_designator: String,
}

impl FleetConfig {
    /// Build a configuration with defaults for everything but the environments.
    pub fn new(
        environments: BTreeMap<String, EnvironmentConfig>,
        label_selector: LabelSelector,
    ) -> Self {
        Self {
            environments,
            max_entries_per_environment: DEFAULT_MAX_ENTRIES,
            label_selector,
            special_deployments: default_special_deployments(),
            platform_designator: default_platform_designator(),
        }
    }

    /// Look up an environment by (case-insensitive) name.
    pub fn environment(&self, env: &str) -> FleetResult<&EnvironmentConfig> {
        self.environments
            .get(&env.to_lowercase())
            .ok_or_else(|| FleetError::unknown_environment(env.to_lowercase()))
    }

    /// Configured TTL for an environment, default when unknown.
    pub fn ttl(&self, env: &str) -> Duration {
        self.environment(env)
            .map(EnvironmentConfig::ttl)
            .unwrap_or(Duration::from_secs(DEFAULT_TTL_SECS))
    }

    /// Ordered cluster ids of an environment.
    pub fn clusters_for(&self, env: &str) -> FleetResult<&[String]> {
        Ok(&self.environment(env)?.clusters)
    }

    /// Environment names, sorted.
    pub fn environment_names(&self) -> Vec<String> {
        self.environments.keys().cloned().collect()
    }

    /// Environments that take part in the platform matrix.
    pub fn platform_environments(&self) -> Vec<String> {
        let designator = self.platform_designator.to_lowercase();
        self.environments
            .keys()
            .filter(|name| name.to_lowercase().contains(&designator))
            .cloned()
            .collect()
    }

    /// Validate the configuration.
    ///
    /// Validates:
    /// - at least one environment, all names lower-case
    /// - every TTL is positive
    /// - no empty cluster ids
    /// - max_entries_per_environment > 0
    pub fn validate(&self) -> FleetResult<()> {
        if self.environments.is_empty() {
            return Err(FleetError::Config(ConfigError::MissingRequired {
                field: "environments".to_string(),
            }));
        }

        for (name, env) in &self.environments {
            if *name != name.to_lowercase() {
                return Err(FleetError::Config(ConfigError::InvalidValue {
                    field: "environments".to_string(),
                    value: name.clone(),
                    reason: "environment names must be lower-case".to_string(),
                }));
            }

            if env.ttl_secs == 0 {
                return Err(FleetError::Config(ConfigError::InvalidValue {
                    field: format!("environments.{name}.ttl_secs"),
                    value: env.ttl_secs.to_string(),
                    reason: "ttl_secs must be positive".to_string(),
                }));
            }

            if env.clusters.iter().any(|c| c.trim().is_empty()) {
                return Err(FleetError::Config(ConfigError::InvalidValue {
                    field: format!("environments.{name}.clusters"),
                    value: format!("{:?}", env.clusters),
                    reason: "cluster ids must not be empty".to_string(),
                }));
            }
        }

        if self.max_entries_per_environment == 0 {
            return Err(FleetError::Config(ConfigError::InvalidValue {
                field: "max_entries_per_environment".to_string(),
                value: "0".to_string(),
                reason: "max_entries_per_environment must be greater than 0".to_string(),
            }));
        }

        Ok(())
    }
}

// =============================================================================
// TESTS
// =============================================================================
