//! Live provider location feed
//!
//! A provider overwrites its single live-location record on every position
//! fix; clients hold long-lived subscriptions over that shared record.
//! Each subscription fires once immediately with the current value and then
//! on every change, until its handle is cancelled. Cancellation is
//! synchronous, idempotent, and never affects other subscribers.

use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use chrono::Utc;
use parking_lot::Mutex;
use serde_json::Value;
use uuid::Uuid;

use crate::domain::location::{EtaEstimate, GeoPoint, ProviderLocation};
use crate::engine::{EngineError, EngineResult};
use crate::services::maps_client::{DistanceEstimator, EstimatorError};

/// Callback invoked with the latest value under a key, `None` when no value
/// has been published yet.
pub type ChannelHandler = Box<dyn Fn(Option<Value>) + Send + Sync>;

/// Keyed last-write-wins value feed.
pub trait RealtimeChannel: Send + Sync {
    /// Overwrite the value under `key` and notify every subscriber.
    fn publish(&self, key: &str, value: Value);

    /// The latest published value, if any.
    fn current(&self, key: &str) -> Option<Value>;

    /// Register `handler` for changes under `key`. Fires once immediately
    /// with the current value.
    fn subscribe(&self, key: &str, handler: ChannelHandler) -> SubscriptionHandle;
}

/// Cancellation handle for a channel subscription.
///
/// Dropping the handle does not cancel; cancellation is an explicit,
/// idempotent call.
pub struct SubscriptionHandle {
    cancel: Mutex<Option<Box<dyn FnOnce() + Send>>>,
}

impl SubscriptionHandle {
    fn new(cancel: impl FnOnce() + Send + 'static) -> Self {
        Self {
            cancel: Mutex::new(Some(Box::new(cancel))),
        }
    }

    /// Stop further handler invocations. Calling this twice is a no-op.
    pub fn cancel(&self) {
        if let Some(cancel) = self.cancel.lock().take() {
            cancel();
        }
    }

    pub fn is_cancelled(&self) -> bool {
        self.cancel.lock().is_none()
    }
}

#[derive(Default)]
struct Topic {
    current: Option<Value>,
    subscribers: HashMap<u64, Arc<ChannelHandler>>,
}

#[derive(Default)]
struct ChannelInner {
    topics: Mutex<HashMap<String, Topic>>,
    next_subscriber_id: AtomicU64,
}

/// In-process channel implementation backing tests and single-node
/// deployments.
#[derive(Clone, Default)]
pub struct InMemoryRealtimeChannel {
    inner: Arc<ChannelInner>,
}

impl InMemoryRealtimeChannel {
    pub fn new() -> Self {
        Self::default()
    }
}

impl RealtimeChannel for InMemoryRealtimeChannel {
    fn publish(&self, key: &str, value: Value) {
        // Snapshot the subscriber list under the lock, invoke outside it so
        // a slow handler cannot block publishers.
        let handlers: Vec<Arc<ChannelHandler>> = {
            let mut topics = self.inner.topics.lock();
            let topic = topics.entry(key.to_string()).or_default();
            topic.current = Some(value.clone());
            topic.subscribers.values().cloned().collect()
        };

        for handler in handlers {
            (*handler)(Some(value.clone()));
        }
    }

    fn current(&self, key: &str) -> Option<Value> {
        self.inner
            .topics
            .lock()
            .get(key)
            .and_then(|topic| topic.current.clone())
    }

    fn subscribe(&self, key: &str, handler: ChannelHandler) -> SubscriptionHandle {
        let id = self.inner.next_subscriber_id.fetch_add(1, Ordering::Relaxed);
        let handler = Arc::new(handler);

        let current = {
            let mut topics = self.inner.topics.lock();
            let topic = topics.entry(key.to_string()).or_default();
            topic.subscribers.insert(id, handler.clone());
            topic.current.clone()
        };

        // Immediate fire with whatever is currently published.
        (*handler)(current);

        let inner = Arc::clone(&self.inner);
        let key = key.to_string();
        SubscriptionHandle::new(move || {
            if let Some(topic) = inner.topics.lock().get_mut(&key) {
                topic.subscribers.remove(&id);
            }
        })
    }
}

/// Live position feed keyed by provider id, plus reactive ETA derivation.
pub struct LocationTrackingService {
    channel: Arc<dyn RealtimeChannel>,
    estimator: Arc<dyn DistanceEstimator>,
}

const PROVIDER_LOCATIONS_PREFIX: &str = "provider_locations";

fn topic_for(provider_id: Uuid) -> String {
    format!("{}/{}", PROVIDER_LOCATIONS_PREFIX, provider_id)
}

impl LocationTrackingService {
    pub fn new(channel: Arc<dyn RealtimeChannel>, estimator: Arc<dyn DistanceEstimator>) -> Self {
        Self { channel, estimator }
    }

    /// Overwrite a provider's live location with a server-stamped fix.
    pub fn publish_location(
        &self,
        provider_id: Uuid,
        coords: GeoPoint,
    ) -> EngineResult<ProviderLocation> {
        if !coords.latitude.is_finite() || !coords.longitude.is_finite() {
            return Err(EngineError::Validation(
                "coordinates must be finite numbers".to_string(),
            ));
        }

        let location = ProviderLocation {
            latitude: coords.latitude,
            longitude: coords.longitude,
            last_updated: Utc::now(),
        };
        let value = serde_json::to_value(&location)
            .map_err(|e| EngineError::Validation(format!("unencodable location: {e}")))?;

        self.channel.publish(&topic_for(provider_id), value);
        tracing::debug!(
            provider_id = %provider_id,
            latitude = coords.latitude,
            longitude = coords.longitude,
            "Provider location published"
        );
        Ok(location)
    }

    /// Watch a provider's live location. The callback fires once
    /// immediately with the current position (or `None`) and then on every
    /// change until the returned handle is cancelled.
    pub fn subscribe(
        &self,
        provider_id: Uuid,
        on_update: impl Fn(Option<ProviderLocation>) + Send + Sync + 'static,
    ) -> SubscriptionHandle {
        self.channel.subscribe(
            &topic_for(provider_id),
            Box::new(move |raw| {
                // A malformed record degrades to "no location".
                let location = raw.and_then(|value| serde_json::from_value(value).ok());
                on_update(location);
            }),
        )
    }

    pub fn current_location(&self, provider_id: Uuid) -> Option<ProviderLocation> {
        self.channel
            .current(&topic_for(provider_id))
            .and_then(|value| serde_json::from_value(value).ok())
    }

    /// Travel estimate between two points.
    pub async fn eta(
        &self,
        origin: GeoPoint,
        destination: GeoPoint,
    ) -> Result<EtaEstimate, EstimatorError> {
        self.estimator.eta(origin, destination).await
    }

    /// Travel estimate from a provider's live position to a destination;
    /// `None` when the provider has not published a position yet.
    pub async fn eta_for_provider(
        &self,
        provider_id: Uuid,
        destination: GeoPoint,
    ) -> Result<Option<EtaEstimate>, EstimatorError> {
        match self.current_location(provider_id) {
            Some(location) => {
                let eta = self.estimator.eta(location.coords(), destination).await?;
                Ok(Some(eta))
            }
            None => Ok(None),
        }
    }
}
