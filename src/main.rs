// src/main.rs
// DOCUMENTATION: Application entry point
// PURPOSE: Initialize config, trip store, caches and background tasks, then start HTTP server

mod config;
mod db;
mod errors;
mod handlers;
mod models;
mod services;

use actix_web::{middleware::Logger, web, App, HttpServer};
use config::Config;
use db::{MemoryTripStore, PgTripStore, TripStore};
use dotenv::dotenv;
use models::Coordinates;
use services::{
    spawn_backfill_writer, start_cleanup_task, ApiUsageMonitor, BackfillWriter, EssentialsService,
    GooglePlacesClient, NotesService, PhotoResolver, PlacesLookupClient, TripService, TripSessions,
};
use std::io;
use std::sync::Arc;
use std::time::Duration;

#[actix_web::main]
async fn main() -> io::Result<()> {
    // 1. Load environment variables
    dotenv().ok();

    // 2. Load configuration
    let config = Config::from_env();

    // 3. Initialize logging
    if std::env::var("RUST_LOG").is_err() {
        let log_level = if !config.log_level.is_empty() {
            &config.log_level
        } else {
            "info,actix_web=info,sqlx=warn"
        };
        std::env::set_var("RUST_LOG", log_level);
    }
    env_logger::init();

    if let Err(e) = config.validate() {
        log::error!("Configuration error: {}", e);
        std::process::exit(1);
    }

    log::info!("Starting trip-locations service...");
    log::info!("Environment: {}", config.environment);
    log::info!(
        "Server Address: {}:{}",
        config.server_address,
        config.server_port
    );

    // 4. Trip store: Postgres when configured, process memory otherwise
    let store: Arc<dyn TripStore> = if config.uses_database() {
        match config::init_db_pool(&config).await {
            Ok(pool) => Arc::new(PgTripStore::new(pool)),
            Err(e) => {
                log::error!("Failed to connect to database: {}", e);
                std::process::exit(1);
            }
        }
    } else {
        Arc::new(MemoryTripStore::new())
    };

    // 5. Places lookups, shared caches and request counters
    let ttl = Duration::from_secs(config.places_cache_ttl_secs);
    let usage = Arc::new(ApiUsageMonitor::new());
    let places_client = Arc::new(GooglePlacesClient::new(
        config.google_places_api_key.clone(),
        Duration::from_secs(config.places_timeout_secs),
    ));
    let lookup = Arc::new(
        PlacesLookupClient::new(places_client, usage, ttl)
            .with_rate_limit(config.places_requests_per_second),
    );
    let photos = Arc::new(PhotoResolver::new(lookup.clone(), ttl));
    let essentials = Arc::new(EssentialsService::new(lookup.clone()));
    log::info!(
        "Initialized Places caches (TTL: {}s, {} req/s)",
        config.places_cache_ttl_secs,
        config.places_requests_per_second
    );

    // 6. Trip sessions and the single coordinate backfill writer
    let sessions = Arc::new(TripSessions::new(ttl));
    let writer = Arc::new(BackfillWriter::new(store.clone(), sessions.clone()));
    let (backfill, _writer_task) = spawn_backfill_writer(writer);

    let default_center = Coordinates::new(config.default_center_lat, config.default_center_lng)
        .unwrap_or_else(|| {
            log::warn!("DEFAULT_CENTER_LAT/LNG out of range, using 0,0");
            Coordinates { lat: 0.0, lng: 0.0 }
        });

    let trips = Arc::new(TripService::new(
        store.clone(),
        sessions.clone(),
        photos.clone(),
        essentials.clone(),
        backfill,
        default_center,
    ));
    let notes = Arc::new(NotesService::new(store, sessions.clone()));

    // Background cleanup tasks
    let interval = config.cache_cleanup_interval_secs;
    start_cleanup_task(lookup.clone(), interval);
    start_cleanup_task(photos.clone(), interval);
    start_cleanup_task(sessions.clone(), interval);
    log::info!("Started cache cleanup tasks (interval: {}s)", interval);

    // 7. Start HTTP server
    let server_addr = format!("{}:{}", config.server_address, config.server_port);
    let config = web::Data::new(config);
    let trips = web::Data::from(trips);
    let notes = web::Data::from(notes);
    let lookup = web::Data::from(lookup);
    let photos = web::Data::from(photos);
    let essentials = web::Data::from(essentials);
    let sessions = web::Data::from(sessions);

    HttpServer::new(move || {
        App::new()
            // Application state
            .app_data(config.clone())
            .app_data(trips.clone())
            .app_data(notes.clone())
            .app_data(lookup.clone())
            .app_data(photos.clone())
            .app_data(essentials.clone())
            .app_data(sessions.clone())
            // Middleware
            .wrap(Logger::default())
            .wrap(actix_web::middleware::Compress::default())
            // Routes
            .configure(handlers::health_config)
            .configure(handlers::trips_config)
            .configure(handlers::photos_config)
            .configure(handlers::admin_config)
    })
    .bind(&server_addr)?
    .run()
    .await
}
