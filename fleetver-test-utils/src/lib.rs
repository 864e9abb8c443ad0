//! fleetver Test Utilities
//!
//! Centralized test infrastructure for the fleetver workspace:
//! - Mock cluster clients and client factory
//! - Proptest generators for raw cluster objects
//! - Test fixtures for common scenarios
//! - Custom assertions for fleetver-specific errors

// Re-export core types for convenience
pub use fleetver_core::{
    Clock, ClusterError, ConfigError, ContainerSpec, DeploymentObject, EnvironmentConfig,
    ErrorKind, FleetConfig, FleetError, FleetResult, LabelSelector, ManualClock, Timestamp,
};
pub use fleetver_inventory::{ClusterClient, ClusterClientFactory};

use async_trait::async_trait;
use std::collections::{BTreeMap, HashMap, HashSet};
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

// ============================================================================
// MOCK CLUSTER CLIENTS
// ============================================================================

/// In-memory cluster that returns a fixed deployment list.
#[derive(Debug)]
pub struct MockClusterClient {
    cluster: String,
    deployments: Mutex<Vec<DeploymentObject>>,
    failing: AtomicBool,
    delay: Option<Duration>,
    calls: AtomicUsize,
}

impl MockClusterClient {
    pub fn new(cluster: impl Into<String>, deployments: Vec<DeploymentObject>) -> Self {
        Self {
            cluster: cluster.into(),
            deployments: Mutex::new(deployments),
            failing: AtomicBool::new(false),
            delay: None,
            calls: AtomicUsize::new(0),
        }
    }

    /// A cluster whose enumeration always fails.
    pub fn failing(cluster: impl Into<String>) -> Self {
        let client = Self::new(cluster, Vec::new());
        client.set_failing(true);
        client
    }

    /// Sleep before answering, to widen race windows.
    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = Some(delay);
        self
    }

    pub fn set_failing(&self, failing: bool) {
        self.failing.store(failing, Ordering::SeqCst);
    }

    pub fn set_deployments(&self, deployments: Vec<DeploymentObject>) {
        *self.deployments.lock().unwrap_or_else(|e| e.into_inner()) = deployments;
    }

    /// Number of `list_deployments` calls so far.
    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl ClusterClient for MockClusterClient {
    async fn list_deployments(&self) -> FleetResult<Vec<DeploymentObject>> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if let Some(delay) = self.delay {
            tokio::time::sleep(delay).await;
        }
        if self.failing.load(Ordering::SeqCst) {
            return Err(FleetError::enumeration_failed(
                self.cluster.clone(),
                "connection refused",
            ));
        }
        Ok(self
            .deployments
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .clone())
    }
}

/// Factory handing out registered [`MockClusterClient`]s.
///
/// Clusters that were never registered, or were marked unavailable, fail
/// initialisation.
#[derive(Debug, Default)]
pub struct MockClusterClientFactory {
    clients: Mutex<HashMap<String, Arc<MockClusterClient>>>,
    unavailable: Mutex<HashSet<String>>,
    init_calls: AtomicUsize,
}

impl MockClusterClientFactory {
    pub fn new() -> Self {
        Self::default()
    }

    /// Builder-style registration.
    pub fn with_cluster(self, client: MockClusterClient) -> Self {
        self.register(Arc::new(client));
        self
    }

    pub fn register(&self, client: Arc<MockClusterClient>) {
        self.clients
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .insert(client.cluster.clone(), client);
    }

    /// The registered client of `cluster`.
    pub fn client(&self, cluster: &str) -> Option<Arc<MockClusterClient>> {
        self.clients
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .get(cluster)
            .cloned()
    }

    pub fn set_unavailable(&self, cluster: &str, unavailable: bool) {
        let mut set = self.unavailable.lock().unwrap_or_else(|e| e.into_inner());
        if unavailable {
            set.insert(cluster.to_string());
        } else {
            set.remove(cluster);
        }
    }

    /// Number of `initialize` calls so far.
    pub fn init_calls(&self) -> usize {
        self.init_calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl ClusterClientFactory for MockClusterClientFactory {
    async fn initialize(&self, cluster: &str) -> FleetResult<Arc<dyn ClusterClient>> {
        self.init_calls.fetch_add(1, Ordering::SeqCst);
        if self
            .unavailable
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .contains(cluster)
        {
            return Err(FleetError::cluster_unavailable(cluster, "marked unavailable"));
        }
        match self.client(cluster) {
            Some(client) => Ok(client),
            None => Err(FleetError::cluster_unavailable(cluster, "credentials not found")),
        }
    }
}

// ============================================================================
// PROPTEST GENERATORS
// ============================================================================

pub mod generators {
    //! Proptest strategies for raw cluster objects.

    use super::*;
    use proptest::prelude::*;

    /// Image references with and without registry, port, tag and digest.
    pub fn arb_image() -> impl Strategy<Value = String> {
        (
            proptest::option::of("[a-z]{2,8}\\.(io|com)(:[0-9]{2,4})?"),
            "[a-z][a-z0-9]{0,6}(/[a-z][a-z0-9-]{0,8})?",
            proptest::option::of("v?[0-9]{1,2}\\.[0-9]{1,2}(\\.[0-9]{1,3})?(-[a-z0-9]{1,6})?"),
            proptest::option::of("[0-9a-f]{8}"),
        )
            .prop_map(|(registry, repo, tag, digest)| {
                let mut image = match registry {
                    Some(registry) => format!("{registry}/{repo}"),
                    None => repo,
                };
                if let Some(tag) = tag {
                    image.push(':');
                    image.push_str(&tag);
                }
                if let Some(digest) = digest {
                    image.push_str("@sha256:");
                    image.push_str(&digest);
                }
                image
            })
    }

    pub fn arb_container_spec() -> impl Strategy<Value = ContainerSpec> {
        ("[a-z][a-z0-9-]{0,10}", arb_image()).prop_map(|(name, image)| ContainerSpec::new(name, image))
    }

    pub fn arb_labels() -> impl Strategy<Value = BTreeMap<String, String>> {
        proptest::collection::btree_map("[a-z]{1,6}", "[a-z0-9]{1,6}", 0..4)
    }

    pub fn arb_deployment_object() -> impl Strategy<Value = DeploymentObject> {
        (
            "[a-z][a-z0-9-]{0,12}",
            "[a-z]{3,10}",
            arb_labels(),
            proptest::collection::vec(arb_container_spec(), 1..4),
            proptest::collection::vec(arb_container_spec(), 0..2),
        )
            .prop_map(|(name, namespace, labels, containers, init_containers)| DeploymentObject {
                name,
                namespace,
                labels,
                containers,
                init_containers,
            })
    }

    /// Cluster ids that may or may not carry an environment-type designator.
    pub fn arb_cluster_name() -> impl Strategy<Value = String> {
        (
            prop_oneof![Just("eks"), Just("aks"), Just("gke")],
            prop_oneof![
                Just("dev"),
                Just("lit"),
                Just("shared"),
                Just("stg"),
                Just("prod"),
                Just("sandbox"),
            ],
            0u8..10,
        )
            .prop_map(|(provider, designator, n)| format!("{provider}-{designator}-{n}"))
    }

    /// TTLs between one second and one hour.
    pub fn arb_ttl() -> impl Strategy<Value = Duration> {
        (1u64..3600).prop_map(Duration::from_secs)
    }
}

// ============================================================================
// TEST FIXTURES
// ============================================================================

pub mod fixtures {
    //! Pre-built test fixtures for common testing scenarios.

    use super::*;

    /// Label selector used by every fixture configuration.
    pub const MICROSERVICE_LABEL: &str = "tier=microservice";

    /// A deployment with one container per `(name, image)` pair.
    pub fn deployment(name: &str, namespace: &str, containers: &[(&str, &str)]) -> DeploymentObject {
        DeploymentObject {
            name: name.to_string(),
            namespace: namespace.to_string(),
            labels: BTreeMap::new(),
            containers: containers
                .iter()
                .map(|(container, image)| ContainerSpec::new(*container, *image))
                .collect(),
            init_containers: Vec::new(),
        }
    }

    /// A deployment carrying the microservice label, one container named
    /// after the deployment.
    pub fn microservice(name: &str, image: &str) -> DeploymentObject {
        let mut deployment = deployment(name, "services", &[(name, image)]);
        let (key, value) = MICROSERVICE_LABEL.split_once('=').unwrap_or(("tier", "microservice"));
        deployment.labels.insert(key.to_string(), value.to_string());
        deployment
    }

    /// Configuration with the given environments, each at `ttl_secs`.
    pub fn fleet_config(environments: &[(&str, &[&str])], ttl_secs: u64) -> FleetConfig {
        let environments = environments
            .iter()
            .map(|(env, clusters)| {
                (
                    env.to_string(),
                    EnvironmentConfig::new(
                        ttl_secs,
                        clusters.iter().map(|c| c.to_string()).collect(),
                    ),
                )
            })
            .collect();
        let selector = LabelSelector {
            key: "tier".to_string(),
            value: "microservice".to_string(),
        };
        FleetConfig::new(environments, selector)
    }

    /// A manual clock at a fixed instant.
    pub fn manual_clock() -> Arc<ManualClock> {
        Arc::new(ManualClock::epoch())
    }
}

// ============================================================================
// CUSTOM ASSERTIONS
// ============================================================================

pub mod assertions {
    //! Custom assertion functions for fleetver-specific validation.

    use super::*;

    /// Assert that a FleetResult is Ok.
    #[track_caller]
    pub fn assert_ok<T: std::fmt::Debug>(result: &FleetResult<T>) {
        assert!(result.is_ok(), "Expected Ok, got Err: {:?}", result);
    }

    /// Assert that a FleetResult failed with the given kind.
    #[track_caller]
    pub fn assert_kind<T: std::fmt::Debug>(result: &FleetResult<T>, kind: ErrorKind) {
        match result {
            Err(e) => assert_eq!(e.kind(), kind, "Wrong error kind: {e}"),
            Ok(v) => panic!("Expected {kind} error, got Ok: {v:?}"),
        }
    }

    /// Assert that a FleetResult is an unknown-environment error for `env`.
    #[track_caller]
    pub fn assert_unknown_environment<T: std::fmt::Debug>(result: &FleetResult<T>, env: &str) {
        match result {
            Err(FleetError::Config(ConfigError::UnknownEnvironment { env: got })) => {
                assert_eq!(got, env, "Wrong environment in error");
            }
            other => panic!("Expected UnknownEnvironment({env}), got: {:?}", other),
        }
    }

    /// Assert that a FleetResult is a cluster error for `cluster`.
    #[track_caller]
    pub fn assert_cluster_error<T: std::fmt::Debug>(result: &FleetResult<T>, cluster: &str) {
        match result {
            Err(FleetError::Cluster(e)) => assert_eq!(e.cluster(), cluster),
            other => panic!("Expected cluster error for {cluster}, got: {:?}", other),
        }
    }
}

// ============================================================================
// TESTS
// ============================================================================
