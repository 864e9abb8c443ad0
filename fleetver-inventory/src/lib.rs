//! fleetver Inventory - Cluster Aggregation
//!
//! Fans environment requests out over their clusters through the shared
//! snapshot cache and merges the results into a flat deployment inventory or
//! the platform microservice matrix. Per-cluster failures degrade the result
//! instead of failing the request.

pub mod aggregate;
pub mod client;
pub mod registry;
pub mod service;
pub mod snapshot;
pub mod types;

pub use aggregate::{merge_inventory, microservice_deployments, FlatInventory, MatrixBuilder};
pub use client::{ClusterClient, ClusterClientFactory, ClusterCredentials, CredentialProvider};
pub use registry::{ClientRegistry, RegisteredCluster};
pub use service::{InventoryService, SnapshotCache};
pub use snapshot::{to_record, SnapshotFetcher};
pub use types::{
    CacheStatsResponse, ClearResponse, EnvironmentCacheStats, EnvironmentListResponse,
    InventoryResponse, PlatformMatrixResponse, ResponseStatus,
};
