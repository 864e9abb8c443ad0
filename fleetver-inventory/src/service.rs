//! Inventory Service
//!
//! The operations behind the HTTP surface: flat per-environment inventory,
//! the platform microservice matrix, and cache housekeeping. One shared
//! snapshot cache serves both shapes.

use crate::aggregate::{merge_inventory, microservice_deployments, FlatInventory, MatrixBuilder};
use crate::client::ClusterClientFactory;
use crate::registry::{ClientRegistry, RegisteredCluster};
use crate::snapshot::SnapshotFetcher;
use crate::types::{
    CacheStatsResponse, ClearResponse, EnvironmentCacheStats, EnvironmentListResponse,
    InventoryResponse, PlatformMatrixResponse, ResponseStatus,
};
use fleetver_core::clock::{format_date, format_time};
use fleetver_core::{
    format_display_time, Clock, ClusterSnapshot, EnvironmentType, FleetConfig, FleetResult,
    MicroserviceVersionRow,
};
use fleetver_storage::{BoundedTtlCache, CacheConfig};
use futures_util::future::join_all;
use std::sync::Arc;
use tracing::{debug, info, warn};

/// Cache of per-cluster snapshots shared by every operation.
pub type SnapshotCache = BoundedTtlCache<ClusterSnapshot>;

pub struct InventoryService {
    config: Arc<FleetConfig>,
    registry: Arc<ClientRegistry>,
    cache: Arc<SnapshotCache>,
    fetcher: SnapshotFetcher,
    clock: Arc<dyn Clock>,
}

impl InventoryService {
    /// Build a service whose cache follows `config`'s TTLs and entry cap.
    pub fn new(
        config: FleetConfig,
        factory: Arc<dyn ClusterClientFactory>,
        clock: Arc<dyn Clock>,
    ) -> Self {
        let cache_config = CacheConfig::from(&config);
        Self::with_cache_config(config, factory, clock, cache_config)
    }

    pub fn with_cache_config(
        config: FleetConfig,
        factory: Arc<dyn ClusterClientFactory>,
        clock: Arc<dyn Clock>,
        cache_config: CacheConfig,
    ) -> Self {
        let registry = Arc::new(ClientRegistry::new(factory));
        let cache = Arc::new(BoundedTtlCache::new(cache_config, Arc::clone(&clock)));
        let fetcher = SnapshotFetcher::new(Arc::clone(&registry), Arc::clone(&clock));
        Self {
            config: Arc::new(config),
            registry,
            cache,
            fetcher,
            clock,
        }
    }

    pub fn config(&self) -> &FleetConfig {
        &self.config
    }

    pub fn cache(&self) -> &SnapshotCache {
        &self.cache
    }

    pub fn registry(&self) -> &ClientRegistry {
        &self.registry
    }

    fn now_display(&self) -> String {
        format_display_time(self.clock.now())
    }

    /// Fan out over `clients` through the cache, in order.
    async fn collect(&self, env: &str, clients: &[RegisteredCluster]) -> FlatInventory {
        let lookups = clients.iter().map(|registered| async move {
            let read = self
                .cache
                .get_or_compute(&registered.cluster, env, &self.fetcher)
                .await;
            (registered.cluster.clone(), read)
        });
        merge_inventory(env, join_all(lookups).await)
    }

    // ========================================================================
    // FLAT INVENTORY
    // ========================================================================

    /// Deployments of every available cluster of `env`.
    ///
    /// Unknown environments are an error. Clusters that fail are skipped;
    /// when no cluster can be initialised at all the status is `warning`.
    pub async fn get_inventory(&self, env: &str) -> FleetResult<InventoryResponse> {
        let env = env.to_lowercase();
        let clusters = self.config.clusters_for(&env)?;

        let clients = self.registry.ensure(&env, clusters).await;
        if clients.is_empty() {
            warn!(env = %env, "No cluster of the environment could be initialized");
            return Ok(InventoryResponse {
                status: ResponseStatus::Warning,
                message: Some(format!("No clusters found for environment: {env}")),
                data: Vec::new(),
                date_time: self.now_display(),
            });
        }

        let inventory = self.collect(&env, &clients).await;
        debug!(
            env = %env,
            succeeded = inventory.succeeded,
            failed = inventory.failed,
            deployments = inventory.deployments.len(),
            "Collected inventory"
        );

        Ok(InventoryResponse {
            status: ResponseStatus::Success,
            message: None,
            data: inventory.deployments,
            date_time: format_display_time(inventory.fetched_at.unwrap_or_else(|| self.clock.now())),
        })
    }

    /// Drop the cache and clients of `env`, then enumerate it again.
    pub async fn refresh_inventory(&self, env: &str) -> FleetResult<InventoryResponse> {
        let env = env.to_lowercase();
        let clusters = self.config.clusters_for(&env)?;
        let date_time = self.now_display();

        let removed = self.cache.clear(&env);
        self.registry.reset(&env);
        info!(env = %env, removed, "Refreshing environment");

        let clients = self.registry.ensure(&env, clusters).await;
        let inventory = self.collect(&env, &clients).await;

        if inventory.deployments.is_empty() {
            return Ok(InventoryResponse {
                status: ResponseStatus::Warning,
                message: Some(format!(
                    "No data found after refreshing cache for {env} environment"
                )),
                data: Vec::new(),
                date_time,
            });
        }

        Ok(InventoryResponse {
            status: ResponseStatus::Success,
            message: Some(format!("Cache refreshed for {env} environment")),
            data: inventory.deployments,
            date_time,
        })
    }

    /// Drop every environment's cache state and clients.
    pub fn clear_all(&self) -> ClearResponse {
        let removed = self.cache.clear_all();
        self.registry.clear_all();
        info!(removed, "Cleared all caches");

        let now = self.clock.now();
        ClearResponse {
            status: ResponseStatus::Success,
            message: "Cache cleared successfully".to_string(),
            time: format_time(now),
            date: format_date(now),
        }
    }

    // ========================================================================
    // PLATFORM MATRIX
    // ========================================================================

    /// Build the matrix over every platform environment.
    ///
    /// Returns the rows and the display time of the first platform
    /// environment that had one.
    async fn build_matrix(&self) -> FleetResult<(Vec<MicroserviceVersionRow>, Option<String>)> {
        let mut builder = MatrixBuilder::new();
        let mut display_time = None;

        for env in self.config.platform_environments() {
            let clusters = self.config.clusters_for(&env)?;
            let clients = self.registry.ensure(&env, clusters).await;

            for cluster in clusters {
                let Some(env_type) = EnvironmentType::classify(cluster) else {
                    debug!(env = %env, cluster = %cluster, "Cluster matches no environment type");
                    continue;
                };
                if !clients.iter().any(|registered| &registered.cluster == cluster) {
                    debug!(env = %env, cluster = %cluster, "Cluster unavailable, leaving column");
                    continue;
                }

                match self.cache.get_or_compute(cluster, &env, &self.fetcher).await {
                    Ok(read) => builder.observe(
                        env_type,
                        microservice_deployments(
                            read.value(),
                            &self.config.label_selector,
                            &self.config.special_deployments,
                        ),
                    ),
                    Err(e) => {
                        warn!(env = %env, cluster = %cluster, error = %e, "Skipping cluster");
                    }
                }

                if display_time.is_none() {
                    display_time = self.cache.display_time(&env);
                }
            }
        }

        Ok((builder.build(), display_time))
    }

    /// The microservice-by-environment-type version matrix.
    pub async fn get_platform_matrix(&self) -> FleetResult<PlatformMatrixResponse> {
        let (rows, display_time) = self.build_matrix().await?;
        Ok(PlatformMatrixResponse {
            status: ResponseStatus::Success,
            message: None,
            data: rows,
            date_time: display_time.unwrap_or_else(|| self.now_display()),
        })
    }

    /// Drop the platform environments' cache and clients, rebuild the
    /// matrix and stamp a fresh display time.
    pub async fn refresh_platform_matrix(&self) -> FleetResult<PlatformMatrixResponse> {
        let date_time = self.now_display();
        let platform = self.config.platform_environments();
        for env in &platform {
            self.cache.clear(env);
            self.registry.reset(env);
        }
        info!(environments = platform.len(), "Refreshing platform matrix");

        let (rows, _) = self.build_matrix().await?;
        for env in &platform {
            self.cache.set_display_time(env, date_time.clone());
        }

        Ok(PlatformMatrixResponse {
            status: ResponseStatus::Success,
            message: Some("Cache cleared and data refreshed successfully".to_string()),
            data: rows,
            date_time,
        })
    }

    // ========================================================================
    // HOUSEKEEPING
    // ========================================================================

    /// Configured environment names, sorted.
    pub fn list_environments(&self) -> EnvironmentListResponse {
        EnvironmentListResponse {
            status: ResponseStatus::Success,
            data: self.config.environment_names(),
            date_time: self.now_display(),
        }
    }

    /// Cache counters of every configured environment.
    pub fn cache_stats(&self) -> CacheStatsResponse {
        CacheStatsResponse {
            status: ResponseStatus::Success,
            data: self
                .config
                .environment_names()
                .into_iter()
                .map(|env| {
                    let stats = EnvironmentCacheStats::from(self.cache.stats(&env));
                    (env, stats)
                })
                .collect(),
            date_time: self.now_display(),
        }
    }
}

impl std::fmt::Debug for InventoryService {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("InventoryService")
            .field("environments", &self.config.environment_names())
            .field("registry", &self.registry)
            .finish_non_exhaustive()
    }
}
