//! Process-wide registry of initialised cluster clients.
//!
//! Clients are created lazily, per environment, the first time that
//! environment is requested. Clusters whose initialisation fails are left
//! out; they are retried the next time the environment has no clients at
//! all or is reset.

use crate::client::{ClusterClient, ClusterClientFactory};
use dashmap::DashMap;
use std::sync::Arc;
use tracing::{debug, warn};

/// One initialised cluster of an environment.
#[derive(Clone)]
pub struct RegisteredCluster {
    pub cluster: String,
    pub client: Arc<dyn ClusterClient>,
}

impl std::fmt::Debug for RegisteredCluster {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RegisteredCluster")
            .field("cluster", &self.cluster)
            .finish_non_exhaustive()
    }
}

/// Initialised clients of every environment, in configuration order.
pub struct ClientRegistry {
    factory: Arc<dyn ClusterClientFactory>,
    environments: DashMap<String, Arc<Vec<RegisteredCluster>>>,
}

impl ClientRegistry {
    pub fn new(factory: Arc<dyn ClusterClientFactory>) -> Self {
        Self {
            factory,
            environments: DashMap::new(),
        }
    }

    /// Clients of `env`, initialising them from `clusters` when the
    /// environment has none yet.
    ///
    /// Returns an empty list when no cluster could be initialised.
    pub async fn ensure(&self, env: &str, clusters: &[String]) -> Arc<Vec<RegisteredCluster>> {
        if let Some(existing) = self.get(env) {
            return existing;
        }

        let mut registered = Vec::with_capacity(clusters.len());
        for cluster in clusters {
            match self.factory.initialize(cluster).await {
                Ok(client) => {
                    debug!(env = %env, cluster = %cluster, "Initialized cluster client");
                    registered.push(RegisteredCluster {
                        cluster: cluster.clone(),
                        client,
                    });
                }
                Err(e) => {
                    warn!(env = %env, cluster = %cluster, error = %e, "Cluster unavailable, skipping");
                }
            }
        }

        let registered = Arc::new(registered);
        if !registered.is_empty() {
            // A concurrent initialisation may have won; keep whichever landed first.
            let entry = self
                .environments
                .entry(env.to_string())
                .or_insert_with(|| Arc::clone(&registered));
            return Arc::clone(entry.value());
        }
        registered
    }

    /// Already initialised clients of `env`, if any.
    pub fn get(&self, env: &str) -> Option<Arc<Vec<RegisteredCluster>>> {
        self.environments
            .get(env)
            .map(|entry| Arc::clone(entry.value()))
            .filter(|clients| !clients.is_empty())
    }

    /// Client for one cluster of `env`.
    pub fn client(&self, env: &str, cluster: &str) -> Option<Arc<dyn ClusterClient>> {
        self.get(env)?
            .iter()
            .find(|registered| registered.cluster == cluster)
            .map(|registered| Arc::clone(&registered.client))
    }

    /// Drop the clients of `env`; the next `ensure` re-initialises them.
    pub fn reset(&self, env: &str) {
        if self.environments.remove(env).is_some() {
            debug!(env = %env, "Dropped cluster clients");
        }
    }

    /// Drop every environment's clients.
    pub fn clear_all(&self) {
        self.environments.clear();
        debug!("Dropped all cluster clients");
    }

    /// Number of initialised clusters in `env`.
    pub fn len(&self, env: &str) -> usize {
        self.get(env).map_or(0, |clients| clients.len())
    }
}

impl std::fmt::Debug for ClientRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ClientRegistry")
            .field("environments", &self.environments.len())
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use fleetver_core::{DeploymentObject, FleetError, FleetResult};
    use std::sync::atomic::{AtomicUsize, Ordering};

    struct Empty;

    #[async_trait]
    impl ClusterClient for Empty {
        async fn list_deployments(&self) -> FleetResult<Vec<DeploymentObject>> {
            Ok(Vec::new())
        }
    }

    /// Fails for clusters whose name contains "down".
    #[derive(Default)]
    struct Factory {
        calls: AtomicUsize,
    }

    #[async_trait]
    impl ClusterClientFactory for Factory {
        async fn initialize(&self, cluster: &str) -> FleetResult<Arc<dyn ClusterClient>> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            if cluster.contains("down") {
                return Err(FleetError::cluster_unavailable(cluster, "no credentials"));
            }
            Ok(Arc::new(Empty))
        }
    }

    fn clusters(names: &[&str]) -> Vec<String> {
        names.iter().map(|s| s.to_string()).collect()
    }

    #[tokio::test]
    async fn test_ensure_skips_unavailable_and_keeps_order() {
        let registry = ClientRegistry::new(Arc::new(Factory::default()));
        let clients = registry
            .ensure("dev", &clusters(&["dev-b", "dev-down", "dev-a"]))
            .await;

        let names: Vec<_> = clients.iter().map(|c| c.cluster.as_str()).collect();
        assert_eq!(names, vec!["dev-b", "dev-a"]);
        assert!(registry.client("dev", "dev-a").is_some());
        assert!(registry.client("dev", "dev-down").is_none());
    }

    #[tokio::test]
    async fn test_ensure_is_lazy_and_cached() {
        let factory = Arc::new(Factory::default());
        let registry = ClientRegistry::new(factory.clone());
        let names = clusters(&["dev-1", "dev-2"]);

        registry.ensure("dev", &names).await;
        registry.ensure("dev", &names).await;
        assert_eq!(factory.calls.load(Ordering::SeqCst), 2);

        registry.reset("dev");
        registry.ensure("dev", &names).await;
        assert_eq!(factory.calls.load(Ordering::SeqCst), 4);
    }

    #[tokio::test]
    async fn test_all_unavailable_is_retried() {
        let factory = Arc::new(Factory::default());
        let registry = ClientRegistry::new(factory.clone());
        let names = clusters(&["down-1"]);

        assert!(registry.ensure("prod", &names).await.is_empty());
        assert!(registry.ensure("prod", &names).await.is_empty());
        assert_eq!(factory.calls.load(Ordering::SeqCst), 2);
        assert_eq!(registry.len("prod"), 0);
    }

    #[tokio::test]
    async fn test_clear_all() {
        let registry = ClientRegistry::new(Arc::new(Factory::default()));
        registry.ensure("dev", &clusters(&["dev-1"])).await;
        registry.ensure("stg", &clusters(&["stg-1"])).await;

        registry.clear_all();
        assert_eq!(registry.len("dev"), 0);
        assert_eq!(registry.len("stg"), 0);
    }
}
