//! Application state shared across handlers

use paygate_core::TransactionService;
use paygate_store::Stores;

/// Shared application state
pub struct AppState {
    /// Entity stores, used directly by the administrative handlers
    pub stores: Stores,
    /// Transaction orchestrator, used by the payment handlers
    pub service: TransactionService,
}

impl AppState {
    pub fn new(stores: Stores, service: TransactionService) -> Self {
        Self { stores, service }
    }
}
