use std::sync::Arc;

use anyhow::Result;

use servilink_backend::engine::{BookingLifecycleManager, NegotiationEngine};
use servilink_backend::repo::CatalogRepository;
use servilink_backend::services::{
    InMemoryRealtimeChannel, LocationTrackingService, MapsClient, RedisCache, StoreLookup,
};
use servilink_backend::store::{DocumentStore, PgDocumentStore};
use servilink_backend::{app, config, db, logging};

#[tokio::main]
async fn main() -> Result<()> {
    // Load environment variables
    dotenvy::dotenv().ok();

    // Load configuration
    let settings = config::Settings::from_env()?;

    // Initialize logging
    logging::init_logging(&settings.env);

    tracing::info!(
        env = ?settings.env,
        server_addr = %settings.server_addr,
        "Starting ServiLink backend"
    );

    // Create database pool and the document store on top of it
    let pool = db::create_pool(&settings).await?;
    let pg_store = PgDocumentStore::new(pool.clone());
    pg_store.ensure_schema().await?;
    let store: Arc<dyn DocumentStore> = Arc::new(pg_store);

    // Create Redis cache
    let cache = RedisCache::new(&settings.redis_url, settings.redis_cache_ttl_seconds).await?;

    // Maps client for ETA lookups
    let maps_client = MapsClient::new(
        &settings.maps_base_url,
        &settings.maps_api_key,
        settings.maps_timeout_seconds,
    )?;

    // Enrichment lookups (store-backed, Redis in front)
    let lookup = Arc::new(StoreLookup::new(store.clone(), Some(cache.clone())));

    // Engines
    let negotiation = NegotiationEngine::new(store.clone());
    let lifecycle = BookingLifecycleManager::new(store.clone(), lookup.clone(), lookup.clone());
    let tracking = LocationTrackingService::new(
        Arc::new(InMemoryRealtimeChannel::new()),
        Arc::new(maps_client),
    );
    let catalog = CatalogRepository::new(store.clone());

    // Create application state
    let state = app::AppState::new(
        pool,
        settings.clone(),
        negotiation,
        lifecycle,
        tracking,
        catalog,
        cache,
    );

    // Build application
    let app = app::create_app(state);

    // Start server
    let listener = tokio::net::TcpListener::bind(&settings.server_addr).await?;
    tracing::info!("Listening on {}", settings.server_addr);
    axum::serve(listener, app).await?;

    Ok(())
}
