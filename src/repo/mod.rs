//! Typed repositories over the document store
//!
//! Leaf wrappers: serde to and from domain entities, pre-write
//! sanitization, collection names. State-machine rules live one layer up,
//! in the engine.

pub mod bid_ledger;
pub mod bookings;
pub mod catalog;
pub mod requests;

pub use bid_ledger::BidLedger;
pub use bookings::BookingRepository;
pub use catalog::CatalogRepository;
pub use requests::RequestRepository;

use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::Value;

use crate::store::{sanitize, Document, JsonMap, StoreError};

/// Serialize an entity into a sanitized document body, dropping the `id`
/// field so the store can assign its own.
pub(crate) fn new_body<T: Serialize>(entity: &T) -> Result<JsonMap, StoreError> {
    let mut body = to_map(entity)?;
    body.remove("id");
    sanitize(&mut body);
    Ok(body)
}

pub(crate) fn to_map<T: Serialize>(entity: &T) -> Result<JsonMap, StoreError> {
    match serde_json::to_value(entity)? {
        Value::Object(map) => Ok(map),
        other => Err(StoreError::Serialization(format!(
            "entity did not serialize to an object: {other}"
        ))),
    }
}

pub(crate) fn from_doc<T: DeserializeOwned>(doc: Document) -> Result<T, StoreError> {
    Ok(serde_json::from_value(Value::Object(doc.body))?)
}
