//! Shared application state for Axum routers.

use std::sync::Arc;
use std::time::Instant;

use fleetver_inventory::InventoryService;

/// Application-wide state shared across all routes.
#[derive(Clone)]
pub struct AppState {
    /// Inventory operations and the snapshot cache behind them.
    pub inventory: Arc<InventoryService>,
    pub start_time: Instant,
}

impl AppState {
    pub fn new(inventory: Arc<InventoryService>) -> Self {
        Self {
            inventory,
            start_time: Instant::now(),
        }
    }
}

crate::impl_from_ref!(Arc<InventoryService>, inventory);
crate::impl_from_ref!(Instant, start_time);
