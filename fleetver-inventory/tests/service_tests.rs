//! Integration tests for the inventory service over mock clusters.

use fleetver_core::{Clock, EnvironmentType, ErrorKind, VERSION_PLACEHOLDER};
use fleetver_inventory::{InventoryService, ResponseStatus};
use fleetver_test_utils::assertions::{assert_kind, assert_unknown_environment};
use fleetver_test_utils::fixtures::{deployment, fleet_config, manual_clock, microservice};
use fleetver_test_utils::{ManualClock, MockClusterClient, MockClusterClientFactory};
use std::sync::Arc;
use std::time::Duration;

const TTL_SECS: u64 = 60;

fn three_cluster_dev() -> (InventoryService, Arc<MockClusterClientFactory>, Arc<ManualClock>) {
    let factory = Arc::new(
        MockClusterClientFactory::new()
            .with_cluster(MockClusterClient::new(
                "eks-dev-1",
                vec![deployment("api", "default", &[("api", "registry/api:v1.2.3-beta")])],
            ))
            .with_cluster(MockClusterClient::failing("eks-dev-2"))
            .with_cluster(MockClusterClient::new(
                "eks-dev-3",
                vec![deployment("web", "frontend", &[("web", "registry/web:2.0")])],
            )),
    );
    let clock = manual_clock();
    let config = fleet_config(
        &[("dev", &["eks-dev-1", "eks-dev-2", "eks-dev-3"]), ("prod", &["eks-prod-1"])],
        TTL_SECS,
    );
    let service = InventoryService::new(config, factory.clone(), clock.clone());
    (service, factory, clock)
}

fn names(response: &fleetver_inventory::InventoryResponse) -> Vec<&str> {
    response.data.iter().map(|d| d.name.as_str()).collect()
}

// ============================================================================
// FLAT INVENTORY
// ============================================================================

#[tokio::test]
async fn test_partial_failure_still_succeeds() {
    let (service, _factory, _clock) = three_cluster_dev();

    let response = service.get_inventory("dev").await.unwrap();
    assert_eq!(response.status, ResponseStatus::Success);
    assert_eq!(names(&response), vec!["api", "web"]);
    assert_eq!(response.data[0].main_containers[0].image_tag, "1.2.3-beta");
    assert_eq!(response.data[0].main_containers[0].version, "1.2.3");
    assert!(!response.date_time.is_empty());
}

#[tokio::test]
async fn test_environment_names_are_case_insensitive() {
    let (service, _factory, _clock) = three_cluster_dev();
    let response = service.get_inventory("DEV").await.unwrap();
    assert_eq!(response.data.len(), 2);
}

#[tokio::test]
async fn test_unknown_environment_is_an_error() {
    let (service, _factory, _clock) = three_cluster_dev();

    let result = service.get_inventory("QA").await;
    assert_unknown_environment(&result, "qa");
    assert_kind(&service.refresh_inventory("qa").await, ErrorKind::ConfigurationError);
}

#[tokio::test]
async fn test_no_initialized_cluster_is_a_warning() {
    let (service, _factory, _clock) = three_cluster_dev();

    // eks-prod-1 was never registered with the factory
    let response = service.get_inventory("prod").await.unwrap();
    assert_eq!(response.status, ResponseStatus::Warning);
    assert!(response.data.is_empty());
    assert_eq!(
        response.message.as_deref(),
        Some("No clusters found for environment: prod")
    );
}

#[tokio::test]
async fn test_cluster_registered_later_is_picked_up() {
    let (service, factory, _clock) = three_cluster_dev();

    let response = service.get_inventory("prod").await.unwrap();
    assert_eq!(response.status, ResponseStatus::Warning);

    factory.register(Arc::new(MockClusterClient::new(
        "eks-prod-1",
        vec![deployment("api", "default", &[("api", "registry/api:2.0")])],
    )));

    let response = service.get_inventory("prod").await.unwrap();
    assert_eq!(response.status, ResponseStatus::Success);
    assert_eq!(names(&response), vec!["api"]);
    assert_eq!(service.registry().len("prod"), 1);
}

#[tokio::test]
async fn test_same_window_enumerates_once() {
    let (service, factory, clock) = three_cluster_dev();
    let client = factory.client("eks-dev-1").unwrap();

    service.get_inventory("dev").await.unwrap();
    clock.advance(Duration::from_secs(TTL_SECS / 2));
    service.get_inventory("dev").await.unwrap();
    assert_eq!(client.calls(), 1);

    clock.advance(Duration::from_secs(TTL_SECS));
    service.get_inventory("dev").await.unwrap();
    assert_eq!(client.calls(), 2);
}

#[tokio::test]
async fn test_failed_cluster_is_not_retried_within_window() {
    let (service, factory, _clock) = three_cluster_dev();
    let down = factory.client("eks-dev-2").unwrap();

    for _ in 0..5 {
        let response = service.get_inventory("dev").await.unwrap();
        assert_eq!(names(&response), vec!["api", "web"]);
    }
    assert_eq!(down.calls(), 1);
    assert_eq!(service.cache().entry_count("dev"), 3);
}

#[tokio::test]
async fn test_failed_cluster_is_retried_after_rollover() {
    let (service, factory, clock) = three_cluster_dev();
    let flaky = factory.client("eks-dev-2").unwrap();

    service.get_inventory("dev").await.unwrap();
    flaky.set_failing(false);
    flaky.set_deployments(vec![deployment("jobs", "batch", &[("jobs", "registry/jobs:3.1")])]);

    // still inside the window: the failure is served from cache
    let response = service.get_inventory("dev").await.unwrap();
    assert_eq!(names(&response), vec!["api", "web"]);
    assert_eq!(flaky.calls(), 1);

    clock.advance(Duration::from_secs(TTL_SECS));
    let response = service.get_inventory("dev").await.unwrap();
    assert_eq!(names(&response), vec!["api", "jobs", "web"]);
    assert_eq!(flaky.calls(), 2);
}

#[tokio::test]
async fn test_failed_cluster_is_retried_after_refresh() {
    let (service, factory, _clock) = three_cluster_dev();
    let flaky = factory.client("eks-dev-2").unwrap();

    service.get_inventory("dev").await.unwrap();
    flaky.set_failing(false);
    flaky.set_deployments(vec![deployment("jobs", "batch", &[("jobs", "registry/jobs:3.1")])]);

    let response = service.refresh_inventory("dev").await.unwrap();
    assert_eq!(names(&response), vec!["api", "jobs", "web"]);
    assert_eq!(flaky.calls(), 2);
}

#[tokio::test]
async fn test_provenance_comes_from_first_successful_cluster() {
    let (service, _factory, clock) = three_cluster_dev();
    let fetched = clock.now();

    let first = service.get_inventory("dev").await.unwrap();
    clock.advance(Duration::from_secs(10));
    let second = service.get_inventory("dev").await.unwrap();

    // served from cache, so the fetch time does not move
    assert_eq!(first.date_time, second.date_time);
    assert_eq!(first.date_time, fleetver_core::format_display_time(fetched));
}

#[tokio::test]
async fn test_refresh_reenumerates_and_reinitializes() {
    let (service, factory, _clock) = three_cluster_dev();
    let client = factory.client("eks-dev-1").unwrap();

    service.get_inventory("dev").await.unwrap();
    let init_before = factory.init_calls();

    let response = service.refresh_inventory("dev").await.unwrap();
    assert_eq!(response.status, ResponseStatus::Success);
    assert_eq!(
        response.message.as_deref(),
        Some("Cache refreshed for dev environment")
    );
    assert_eq!(client.calls(), 2);
    assert_eq!(factory.init_calls(), init_before + 3);
}

#[tokio::test]
async fn test_refresh_without_data_is_a_warning() {
    let (service, factory, _clock) = three_cluster_dev();
    factory.client("eks-dev-1").unwrap().set_deployments(Vec::new());
    factory.client("eks-dev-3").unwrap().set_failing(true);

    let response = service.refresh_inventory("dev").await.unwrap();
    assert_eq!(response.status, ResponseStatus::Warning);
    assert!(response.data.is_empty());
}

#[tokio::test]
async fn test_clear_all_drops_cache_and_clients() {
    let (service, factory, _clock) = three_cluster_dev();
    let client = factory.client("eks-dev-1").unwrap();

    service.get_inventory("dev").await.unwrap();
    let response = service.clear_all();
    assert_eq!(response.status, ResponseStatus::Success);
    assert_eq!(service.registry().len("dev"), 0);
    assert_eq!(service.cache().entry_count("dev"), 0);

    service.get_inventory("dev").await.unwrap();
    assert_eq!(client.calls(), 2);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_concurrent_requests_enumerate_once() {
    let factory = Arc::new(MockClusterClientFactory::new().with_cluster(
        MockClusterClient::new(
            "eks-dev-1",
            vec![deployment("api", "default", &[("api", "registry/api:1.0")])],
        )
        .with_delay(Duration::from_millis(25)),
    ));
    let service = Arc::new(InventoryService::new(
        fleet_config(&[("dev", &["eks-dev-1"])], TTL_SECS),
        factory.clone(),
        manual_clock(),
    ));

    // initialise clients first so every task races on the cache, not the registry
    service.registry().ensure("dev", &["eks-dev-1".to_string()]).await;

    let mut tasks = Vec::new();
    for _ in 0..12 {
        let service = Arc::clone(&service);
        tasks.push(tokio::spawn(async move { service.get_inventory("dev").await }));
    }
    for task in tasks {
        let response = task.await.unwrap().unwrap();
        assert_eq!(response.data.len(), 1);
    }

    assert_eq!(factory.client("eks-dev-1").unwrap().calls(), 1);
}

// ============================================================================
// PLATFORM MATRIX
// ============================================================================

fn platform() -> (InventoryService, Arc<MockClusterClientFactory>, Arc<ManualClock>) {
    let factory = Arc::new(
        MockClusterClientFactory::new()
            .with_cluster(MockClusterClient::new(
                "plt-dev-1",
                vec![
                    microservice("orders", "registry/orders:v3.2.1-abc"),
                    microservice("notary", "registry/notary:v2023.11-rc1"),
                    deployment("redis", "infra", &[("redis", "redis:7.2")]),
                ],
            ))
            .with_cluster(MockClusterClient::new(
                "plt-prod-1",
                vec![microservice("orders", "registry/orders:3.1.0")],
            ))
            .with_cluster(MockClusterClient::new(
                "plt-sandbox",
                vec![microservice("experiments", "registry/experiments:0.1")],
            ))
            .with_cluster(MockClusterClient::new(
                "eks-dev-1",
                vec![microservice("legacy", "registry/legacy:9.9")],
            )),
    );
    let clock = manual_clock();
    let config = fleet_config(
        &[
            ("platform-core", &["plt-dev-1", "plt-prod-1", "plt-sandbox"]),
            ("dev", &["eks-dev-1"]),
        ],
        TTL_SECS,
    );
    let service = InventoryService::new(config, factory.clone(), clock.clone());
    (service, factory, clock)
}

#[tokio::test]
async fn test_matrix_rows_and_placeholders() {
    let (service, _factory, _clock) = platform();

    let response = service.get_platform_matrix().await.unwrap();
    assert_eq!(response.status, ResponseStatus::Success);

    let rows: Vec<_> = response.data.iter().map(|r| r.microsvc.as_str()).collect();
    // only label-selected deployments of platform environments, classified clusters only
    assert_eq!(rows, vec!["orders", "notary"]);

    let orders = &response.data[0];
    assert_eq!(orders.dev, "3.2.1");
    assert_eq!(orders.prod, "3.1.0");
    assert_eq!(orders.get(EnvironmentType::Lit), VERSION_PLACEHOLDER);

    let notary = &response.data[1];
    assert_eq!(notary.dev, "2023.11-rc1");
    assert_eq!(notary.stg, VERSION_PLACEHOLDER);
    assert_eq!(notary.prod, VERSION_PLACEHOLDER);
}

#[tokio::test]
async fn test_matrix_shares_cache_with_inventory() {
    let (service, factory, _clock) = platform();
    let dev = factory.client("plt-dev-1").unwrap();

    service.get_inventory("platform-core").await.unwrap();
    service.get_platform_matrix().await.unwrap();
    assert_eq!(dev.calls(), 1);
}

#[tokio::test]
async fn test_matrix_display_time_is_stable_within_window() {
    let (service, _factory, clock) = platform();

    let first = service.get_platform_matrix().await.unwrap();
    clock.advance(Duration::from_secs(5));
    let second = service.get_platform_matrix().await.unwrap();
    assert_eq!(first.date_time, second.date_time);
}

#[tokio::test]
async fn test_refresh_platform_matrix_recomputes() {
    let (service, factory, clock) = platform();
    let dev = factory.client("plt-dev-1").unwrap();

    service.get_platform_matrix().await.unwrap();
    dev.set_deployments(vec![microservice("orders", "registry/orders:4.0.0")]);
    clock.advance(Duration::from_secs(5));

    let response = service.refresh_platform_matrix().await.unwrap();
    assert_eq!(
        response.message.as_deref(),
        Some("Cache cleared and data refreshed successfully")
    );
    assert_eq!(response.data[0].dev, "4.0.0");
    assert_eq!(dev.calls(), 2);
    assert_eq!(
        service.cache().display_time("platform-core"),
        Some(response.date_time.clone())
    );
}

#[tokio::test]
async fn test_unavailable_platform_cluster_leaves_placeholder() {
    let (service, factory, _clock) = platform();
    factory.set_unavailable("plt-prod-1", true);

    let response = service.get_platform_matrix().await.unwrap();
    let orders = &response.data[0];
    assert_eq!(orders.dev, "3.2.1");
    assert_eq!(orders.prod, VERSION_PLACEHOLDER);
}

// ============================================================================
// HOUSEKEEPING
// ============================================================================

#[tokio::test]
async fn test_list_environments_sorted() {
    let (service, _factory, _clock) = platform();
    let response = service.list_environments();
    assert_eq!(response.data, vec!["dev", "platform-core"]);
}

#[tokio::test]
async fn test_cache_stats_per_environment() {
    let (service, _factory, _clock) = three_cluster_dev();

    service.get_inventory("dev").await.unwrap();
    service.get_inventory("dev").await.unwrap();

    let stats = service.cache_stats();
    let dev = stats.data["dev"];
    assert_eq!(dev.computes, 2);
    // the failed cluster is served from cache on the second request
    assert_eq!(dev.failures, 1);
    assert_eq!(dev.hits, 3);
    assert_eq!(stats.data["prod"].entry_count, 0);
}
