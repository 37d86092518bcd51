mod models;
mod service;
mod config;
mod dtos;
mod error;
mod db;
mod utils;
mod middleware;
mod handler;
mod routes;

use std::{sync::Arc, time::Duration};

use axum::http::{header::{ACCEPT, AUTHORIZATION, CONTENT_TYPE}, HeaderValue, Method};
use config::{Config, StorageBackend};
use db::{memory::MemoryStore, DBClient, JobStore};
use dotenv::dotenv;
use routes::create_router;
use sqlx::postgres::PgPoolOptions;
use tower_http::cors::{AllowOrigin, CorsLayer};
use tracing_subscriber::filter::LevelFilter;

use service::{
    geocoding_service::{Geocoder, NominatimGeocoder},
    lifecycle_service::LifecycleService,
    location_service::LocationService,
    notification_service::{LogGateway, NotificationGateway, NotificationService, WebhookGateway},
    proximity_service::ProximityService,
    rating_service::RatingService,
};

#[derive(Debug, Clone)]
pub struct AppState {
    pub env: Config,
    pub geocoder: Arc<dyn Geocoder>,
    // Services
    pub lifecycle_service: Arc<LifecycleService>,
    pub proximity_service: Arc<ProximityService>,
    pub location_service: Arc<LocationService>,
    pub rating_service: Arc<RatingService>,
}

impl AppState {
    pub fn new(
        store: Arc<dyn JobStore>,
        config: Config,
        geocoder: Arc<dyn Geocoder>,
        gateway: Arc<dyn NotificationGateway>,
    ) -> Self {
        let notification_service = NotificationService::new(
            gateway,
            Duration::from_secs(config.notify_timeout_secs),
        );

        let rating_service = Arc::new(RatingService::new(
            store.clone(),
            config.app_url.clone(),
            Duration::from_secs(config.profile_cache_ttl_secs),
        ));

        let lifecycle_service = Arc::new(LifecycleService::new(
            store.clone(),
            rating_service.clone(),
            notification_service,
            chrono::Duration::hours(config.job_ttl_hours),
        ));

        let proximity_service = Arc::new(ProximityService::new(
            store.clone(),
            rating_service.clone(),
            config.max_search_radius_m,
        ));

        let location_service = Arc::new(LocationService::new(store));

        Self {
            env: config,
            geocoder,
            lifecycle_service,
            proximity_service,
            location_service,
            rating_service,
        }
    }
}

async fn connect_store(config: &Config) -> Arc<dyn JobStore> {
    if config.storage_backend == StorageBackend::Memory {
        tracing::warn!("Using in-memory storage; data will not survive a restart");
        return Arc::new(MemoryStore::new());
    }

    let database_url = config.database_url.clone().unwrap_or_default();
    let pool = match PgPoolOptions::new()
        .max_connections(10)
        .connect(&database_url)
        .await
    {
        Ok(pool) => {
            tracing::info!("✅ Connection to the database is successful!");
            pool
        }
        Err(err) => {
            tracing::error!("🔥 Failed to connect to the database: {:?}", err);
            std::process::exit(1);
        }
    };

    if let Err(err) = sqlx::migrate!("./migrations").run(&pool).await {
        tracing::error!("🔥 Failed to run database migrations: {:?}", err);
        std::process::exit(1);
    }

    Arc::new(DBClient::new(pool))
}

#[tokio::main]
async fn main() {
    tracing_subscriber::fmt()
        .with_max_level(LevelFilter::DEBUG)
        .init();

    dotenv().ok();

    let config = Config::init();

    let store = connect_store(&config).await;

    let geocoder: Arc<dyn Geocoder> = Arc::new(NominatimGeocoder::new(
        config.geocoder_url.clone(),
        Duration::from_secs(config.geocode_timeout_secs),
    ));

    let gateway: Arc<dyn NotificationGateway> = match &config.notify_webhook_url {
        Some(url) => Arc::new(WebhookGateway::new(
            url.clone(),
            Duration::from_secs(config.notify_timeout_secs),
        )),
        None => {
            tracing::info!("NOTIFY_WEBHOOK_URL not set; notices will only be logged");
            Arc::new(LogGateway)
        }
    };

    let allowed_origins: Vec<HeaderValue> = config
        .allowed_origins
        .iter()
        .filter_map(|origin| match origin.parse::<HeaderValue>() {
            Ok(value) => Some(value),
            Err(_) => {
                tracing::warn!("Ignoring invalid CORS origin {:?}", origin);
                None
            }
        })
        .collect();

    let cors = CorsLayer::new()
        .allow_origin(AllowOrigin::list(allowed_origins))
        .allow_headers([AUTHORIZATION, ACCEPT, CONTENT_TYPE])
        .allow_credentials(true)
        .allow_methods([Method::GET, Method::POST, Method::PUT, Method::DELETE]);

    let app_state = Arc::new(AppState::new(store, config.clone(), geocoder, gateway));

    let app = create_router(app_state.clone()).layer(cors);

    // Start background jobs
    let app_state_clone = app_state.clone();
    tokio::spawn(async move {
        service::background_jobs::start_expiry_sweep(app_state_clone).await;
    });

    let listener = match tokio::net::TcpListener::bind(format!("0.0.0.0:{}", &config.port)).await {
        Ok(listener) => listener,
        Err(err) => {
            tracing::error!("🔥 Failed to bind port {}: {}", config.port, err);
            std::process::exit(1);
        }
    };

    tracing::info!("🚀 Server is running on http://localhost:{}", config.port);

    if let Err(err) = axum::serve(listener, app).await {
        tracing::error!("Server error: {}", err);
    }
}
