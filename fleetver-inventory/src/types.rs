//! Response shapes of the exposed operations.

use fleetver_core::{DeploymentRecord, MicroserviceVersionRow};
use fleetver_storage::CacheStats;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ResponseStatus {
    Success,
    Warning,
}

/// Deployments of one environment.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct InventoryResponse {
    pub status: ResponseStatus,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
    pub data: Vec<DeploymentRecord>,
    pub date_time: String,
}

/// Configured environment names.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EnvironmentListResponse {
    pub status: ResponseStatus,
    pub data: Vec<String>,
    pub date_time: String,
}

/// Acknowledgement of a cache clear.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ClearResponse {
    pub status: ResponseStatus,
    pub message: String,
    pub time: String,
    pub date: String,
}

/// The microservice-by-environment-type version matrix.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PlatformMatrixResponse {
    pub status: ResponseStatus,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
    pub data: Vec<MicroserviceVersionRow>,
    pub date_time: String,
}

/// Cache counters of one environment.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct EnvironmentCacheStats {
    pub hits: u64,
    pub misses: u64,
    pub computes: u64,
    pub failures: u64,
    pub evictions: u64,
    pub stale_flushes: u64,
    pub entry_count: u64,
    pub hit_rate: f64,
}

impl From<CacheStats> for EnvironmentCacheStats {
    fn from(stats: CacheStats) -> Self {
        Self {
            hits: stats.hits,
            misses: stats.misses,
            computes: stats.computes,
            failures: stats.failures,
            evictions: stats.evictions,
            stale_flushes: stats.stale_flushes,
            entry_count: stats.entry_count,
            hit_rate: stats.hit_rate(),
        }
    }
}

/// Cache counters of every configured environment.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CacheStatsResponse {
    pub status: ResponseStatus,
    pub data: BTreeMap<String, EnvironmentCacheStats>,
    pub date_time: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_serializes_lowercase() {
        assert_eq!(
            serde_json::to_string(&ResponseStatus::Warning).unwrap(),
            "\"warning\""
        );
    }

    #[test]
    fn test_inventory_response_omits_empty_message() {
        let response = InventoryResponse {
            status: ResponseStatus::Success,
            message: None,
            data: Vec::new(),
            date_time: "01-01-2024 09:00 AM UTC".to_string(),
        };
        let json = serde_json::to_value(&response).unwrap();
        assert!(json.get("message").is_none());
        assert_eq!(json["status"], "success");
    }

    #[test]
    fn test_stats_carry_hit_rate() {
        let stats = EnvironmentCacheStats::from(CacheStats {
            hits: 3,
            misses: 1,
            ..Default::default()
        });
        assert!((stats.hit_rate - 0.75).abs() < f64::EPSILON);
    }
}
