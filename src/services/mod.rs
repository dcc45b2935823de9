//! Service layer modules for external integrations.
//!
//! Contains the Redis cache, the distance/ETA client, display-name lookups,
//! and the live location feed.

pub mod cache;
pub mod lookup;
pub mod maps_client;
pub mod tracking;

pub use cache::RedisCache;
pub use lookup::StoreLookup;
pub use maps_client::MapsClient;
pub use tracking::{InMemoryRealtimeChannel, LocationTrackingService};
