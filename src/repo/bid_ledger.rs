//! Embedded per-request bid collection
//!
//! Bids live inside the service request document as an array with at most
//! one entry per provider. The ledger only appends or replaces by provider;
//! bids are never deleted. Every write is version-guarded — the engine owns
//! the read/retry loop around it.

use std::sync::Arc;

use serde_json::json;
use uuid::Uuid;

use crate::domain::bids::Bid;
use crate::store::{DocumentStore, JsonMap, StoreError};

use super::requests::REQUESTS_COLLECTION;

#[derive(Clone)]
pub struct BidLedger {
    store: Arc<dyn DocumentStore>,
}

impl BidLedger {
    pub fn new(store: Arc<dyn DocumentStore>) -> Self {
        Self { store }
    }

    /// Replace any existing bid from the same provider, append the new one,
    /// and write the full array back under the request's version token.
    pub async fn upsert_bid(
        &self,
        request_id: Uuid,
        version: i64,
        mut bids: Vec<Bid>,
        bid: Bid,
    ) -> Result<(), StoreError> {
        bids.retain(|existing| existing.provider_id != bid.provider_id);
        bids.push(bid);

        let mut patch = JsonMap::new();
        patch.insert("bids".to_string(), json!(bids));
        self.store
            .update_checked(REQUESTS_COLLECTION, request_id, version, patch)
            .await
    }
}
