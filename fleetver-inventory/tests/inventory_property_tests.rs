//! Property-Based Tests for Inventory Parsing and Caching
//!
//! Properties:
//! - cluster classification picks the first designator in column order
//! - a record's main containers are its listed containers, deduplicated
//! - any TTL enumerates a cluster once per window

use fleetver_core::image::{dedupe, extract_container};
use fleetver_core::{EnvironmentType, ManualClock};
use fleetver_inventory::{to_record, InventoryService};
use fleetver_test_utils::assertions::assert_ok;
use fleetver_test_utils::fixtures::{fleet_config, manual_clock, microservice};
use fleetver_test_utils::generators::{arb_cluster_name, arb_deployment_object, arb_ttl};
use fleetver_test_utils::{MockClusterClient, MockClusterClientFactory};
use proptest::prelude::*;
use std::collections::HashSet;
use std::sync::Arc;

fn runtime() -> tokio::runtime::Runtime {
    tokio::runtime::Builder::new_current_thread()
        .build()
        .expect("runtime")
}

proptest! {
    #[test]
    fn prop_classify_takes_first_designator(cluster in arb_cluster_name()) {
        let expected = EnvironmentType::ALL
            .into_iter()
            .find(|env_type| cluster.contains(env_type.as_str()));
        prop_assert_eq!(EnvironmentType::classify(&cluster), expected);

        if cluster.contains("-sandbox-") {
            prop_assert_eq!(EnvironmentType::classify(&cluster), None);
        }
    }

    #[test]
    fn prop_record_dedupes_listed_containers(deployment in arb_deployment_object()) {
        let containers = deployment.containers.clone();
        let init_containers = deployment.init_containers.clone();
        let record = to_record("eks-dev-1", deployment);

        prop_assert_eq!(record.listed_containers.len(), containers.len());
        prop_assert_eq!(&record.main_containers, &dedupe(record.listed_containers.clone()));
        prop_assert!(record.init_containers.len() <= init_containers.len());

        let keys: HashSet<_> = record.main_containers.iter().map(|d| d.dedupe_key()).collect();
        prop_assert_eq!(keys.len(), record.main_containers.len());

        for (listed, spec) in record.listed_containers.iter().zip(&containers) {
            prop_assert_eq!(listed, &extract_container(spec));
        }
    }

    #[test]
    fn prop_any_ttl_enumerates_once_per_window(ttl in arb_ttl()) {
        let factory = Arc::new(MockClusterClientFactory::new().with_cluster(
            MockClusterClient::new("eks-dev-1", vec![microservice("orders", "r/orders:1.0")]),
        ));
        let clock: Arc<ManualClock> = manual_clock();
        let service = InventoryService::new(
            fleet_config(&[("dev", &["eks-dev-1"])], ttl.as_secs()),
            factory.clone(),
            clock.clone(),
        );
        let rt = runtime();

        assert_ok(&rt.block_on(service.get_inventory("dev")));
        clock.advance(ttl - std::time::Duration::from_millis(1));
        assert_ok(&rt.block_on(service.get_inventory("dev")));
        prop_assert_eq!(factory.client("eks-dev-1").map(|c| c.calls()), Some(1));

        clock.advance(std::time::Duration::from_millis(1));
        assert_ok(&rt.block_on(service.get_inventory("dev")));
        prop_assert_eq!(factory.client("eks-dev-1").map(|c| c.calls()), Some(2));
    }
}
