//! Read-through cache for per-party inventory listings.
//!
//! Keys are normalized wallet addresses. Entries live until a mutating
//! inventory operation evicts them; a miss falls through to the database,
//! which stays authoritative. Single-process only — there is no coherence
//! across instances.

use std::collections::HashMap;

use tokio::sync::Mutex;

use crate::models::InventoryItemRecord;

#[derive(Default)]
pub struct InventoryCache {
    entries: Mutex<HashMap<String, Vec<InventoryItemRecord>>>,
}

impl InventoryCache {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn get(&self, address: &str) -> Option<Vec<InventoryItemRecord>> {
        self.entries.lock().await.get(address).cloned()
    }

    pub async fn put(&self, address: String, items: Vec<InventoryItemRecord>) {
        self.entries.lock().await.insert(address, items);
    }

    /// Evict the listing for one address. Must be called by every create,
    /// update, or delete touching that address.
    pub async fn invalidate(&self, address: &str) {
        self.entries.lock().await.remove(address);
    }
}
