// src/handlers/photos.rs
// DOCUMENTATION: Photo and nearby-essentials handlers
// PURPOSE: Lookups that are not tied to a stored trip

use crate::errors::TripError;
use crate::models::Coordinates;
use crate::services::{EssentialKind, EssentialsService, PhotoResolution, PhotoResolver, PLACEHOLDER_IMAGE};
use actix_web::{web, HttpResponse, Responder};
use serde::Deserialize;
use serde_json::{json, Value};

#[derive(Debug, Deserialize)]
pub struct PhotoQuery {
    pub query: String,
}

#[derive(Debug, Deserialize)]
pub struct EssentialsQuery {
    pub lat: f64,
    pub lng: f64,
    pub kind: String,
}

/// Photo response body
/// DOCUMENTATION: A missing photo is reported as `photoUrl: null` next to the
/// placeholder path, never as an error status.
pub fn photo_body(query: &str, resolution: PhotoResolution) -> Value {
    json!({
        "query": query,
        "photoUrl": resolution.photo_url,
        "location": resolution.location,
        "placeholder": PLACEHOLDER_IMAGE,
    })
}

/// GET /photos?query=
pub async fn get_photo(
    photos: web::Data<PhotoResolver>,
    query: web::Query<PhotoQuery>,
) -> impl Responder {
    let resolution = photos.resolve(&query.query).await;
    HttpResponse::Ok().json(photo_body(&query.query, resolution))
}

/// GET /essentials?lat=&lng=&kind=
pub async fn get_essentials(
    essentials: web::Data<EssentialsService>,
    query: web::Query<EssentialsQuery>,
) -> Result<impl Responder, TripError> {
    let center = Coordinates::new(query.lat, query.lng)
        .ok_or_else(|| TripError::InvalidInput("Invalid lat/lng".to_string()))?;
    let kind: EssentialKind = query.kind.parse()?;

    let markers = essentials.nearby(center, kind).await;
    Ok(HttpResponse::Ok().json(json!({
        "kind": kind,
        "center": center,
        "markers": markers,
    })))
}

/// Configuration for photo and essentials routes
pub fn config(cfg: &mut web::ServiceConfig) {
    cfg.route("/photos", web::get().to(get_photo))
        .route("/essentials", web::get().to(get_essentials));
}
