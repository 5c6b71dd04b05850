// src/handlers/admin.rs
// DOCUMENTATION: Admin handlers for cache and quota operations
// PURPOSE: Cache statistics, cache clearing and outbound API usage, behind X-Admin-Token

use crate::config::Config;
use crate::errors::TripError;
use crate::services::{PhotoResolver, PlacesLookupClient, TripSessions};
use actix_web::{web, HttpRequest, HttpResponse, Responder};
use serde_json::json;

/// Verify admin token from request headers
/// DOCUMENTATION: An empty configured token disables the admin routes
fn verify_admin_token(req: &HttpRequest, config: &Config) -> Result<(), TripError> {
    let token = req
        .headers()
        .get("X-Admin-Token")
        .and_then(|h| h.to_str().ok())
        .ok_or_else(|| {
            log::warn!("Admin request without token");
            TripError::Unauthorized
        })?;

    if config.admin_token.is_empty() || token != config.admin_token {
        log::warn!("Admin request with invalid token");
        return Err(TripError::Forbidden);
    }

    Ok(())
}

/// GET /admin/cache/stats
pub async fn cache_stats(
    config: web::Data<Config>,
    lookup: web::Data<PlacesLookupClient>,
    photos: web::Data<PhotoResolver>,
    sessions: web::Data<TripSessions>,
    req: HttpRequest,
) -> Result<impl Responder, TripError> {
    verify_admin_token(&req, &config)?;

    let mut caches = lookup.cache_stats().await;
    caches.push(photos.stats().await);

    Ok(HttpResponse::Ok().json(json!({
        "caches": caches,
        "sessions": sessions.len().await,
    })))
}

/// GET /admin/usage
/// DOCUMENTATION: Counts real outbound requests since process start; cache hits
/// are never counted
pub async fn api_usage(
    config: web::Data<Config>,
    lookup: web::Data<PlacesLookupClient>,
    req: HttpRequest,
) -> Result<impl Responder, TripError> {
    verify_admin_token(&req, &config)?;

    let usage = lookup.usage().snapshot();
    Ok(HttpResponse::Ok().json(json!({
        "usage": usage,
        "total": usage.total(),
    })))
}

/// POST /admin/cache/clear
pub async fn clear_caches(
    config: web::Data<Config>,
    lookup: web::Data<PlacesLookupClient>,
    photos: web::Data<PhotoResolver>,
    req: HttpRequest,
) -> Result<impl Responder, TripError> {
    verify_admin_token(&req, &config)?;

    lookup.clear().await;
    photos.clear().await;
    log::info!("Admin cleared lookup and photo caches");

    Ok(HttpResponse::Ok().json(json!({ "cleared": true })))
}

/// Configuration for admin routes
pub fn config(cfg: &mut web::ServiceConfig) {
    cfg.service(
        web::scope("/admin")
            .route("/cache/stats", web::get().to(cache_stats))
            .route("/cache/clear", web::post().to(clear_caches))
            .route("/usage", web::get().to(api_usage)),
    );
}
