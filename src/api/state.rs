//! Shared application state for the HTTP handlers

use std::sync::Arc;

use crate::auth::{AccessGate, TokenIssuer};
use crate::record_store::RecordStore;
use crate::validation::ItemCatalog;

/// State shared by every request
pub struct AppState {
    /// The record store
    pub store: Arc<RecordStore>,

    /// Credential check for `/auth/token`
    pub gate: Arc<dyn AccessGate>,

    /// Signs and validates bearer tokens
    pub tokens: TokenIssuer,

    /// Items accepted by the entry form
    pub catalog: ItemCatalog,
}

impl AppState {
    pub fn new(
        store: Arc<RecordStore>,
        gate: Arc<dyn AccessGate>,
        tokens: TokenIssuer,
        catalog: ItemCatalog,
    ) -> Self {
        Self {
            store,
            gate,
            tokens,
            catalog,
        }
    }

    /// Id of the newest record, used by clients to detect changes
    pub fn last_id(&self) -> Option<u64> {
        self.store.last_id().map(|id| id.value())
    }
}
