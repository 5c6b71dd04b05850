// src/handlers/trips.rs
// DOCUMENTATION: HTTP handlers for trips and their map layers
// PURPOSE: Parse requests, call TripService, return responses

use crate::errors::TripError;
use crate::models::{Coordinates, CreateTripRequest, ViewportBounds};
use crate::services::{ClusterQuery, EssentialKind, MarkerFilter, TripService};
use actix_web::{web, HttpResponse, Responder};
use serde::Deserialize;
use std::collections::HashSet;

#[derive(Debug, Deserialize)]
pub struct OwnerQuery {
    pub owner: String,
}

#[derive(Debug, Deserialize)]
pub struct MarkersQuery {
    /// Marker id to compute a fly-to target for
    pub focus: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct EntityPhotoQuery {
    pub name: String,
}

/// Query string of the cluster endpoints
/// DOCUMENTATION: Bounds are all-or-nothing; without them the whole world is
/// clustered. `days` and `essentials` are comma separated lists.
#[derive(Debug, Default, Deserialize)]
pub struct ClusterParams {
    pub west: Option<f64>,
    pub south: Option<f64>,
    pub east: Option<f64>,
    pub north: Option<f64>,
    #[serde(default)]
    pub zoom: f64,
    pub hotels: Option<bool>,
    pub places: Option<bool>,
    pub food: Option<bool>,
    pub day: Option<u32>,
    pub days: Option<String>,
    pub essentials: Option<String>,
    pub lat: Option<f64>,
    pub lng: Option<f64>,
}

impl ClusterParams {
    fn bounds(&self) -> Result<ViewportBounds, TripError> {
        match (self.west, self.south, self.east, self.north) {
            (None, None, None, None) => Ok(ViewportBounds::WORLD),
            (Some(west), Some(south), Some(east), Some(north)) => {
                let lng_ok = |v: f64| (-180.0..=180.0).contains(&v);
                let lat_ok = |v: f64| (-90.0..=90.0).contains(&v);
                if !(lng_ok(west) && lng_ok(east) && lat_ok(south) && lat_ok(north)) || south > north {
                    return Err(TripError::InvalidInput("Bounds out of range".to_string()));
                }
                Ok(ViewportBounds {
                    west,
                    south,
                    east,
                    north,
                })
            }
            _ => Err(TripError::InvalidInput(
                "west, south, east and north must be given together".to_string(),
            )),
        }
    }

    fn visible_days(&self) -> Result<Option<HashSet<u32>>, TripError> {
        let Some(days) = self.days.as_deref() else {
            return Ok(None);
        };
        days.split(',')
            .map(str::trim)
            .filter(|d| !d.is_empty())
            .map(|d| {
                d.parse::<u32>()
                    .map_err(|_| TripError::InvalidInput(format!("Invalid day '{}'", d)))
            })
            .collect::<Result<HashSet<_>, _>>()
            .map(Some)
    }

    fn essential_kinds(&self) -> Result<Vec<EssentialKind>, TripError> {
        let mut kinds = Vec::new();
        for raw in self.essentials.as_deref().unwrap_or("").split(',') {
            if raw.trim().is_empty() {
                continue;
            }
            let kind: EssentialKind = raw.parse()?;
            if !kinds.contains(&kind) {
                kinds.push(kind);
            }
        }
        Ok(kinds)
    }

    pub fn into_query(self) -> Result<ClusterQuery, TripError> {
        let essentials_center = match (self.lat, self.lng) {
            (Some(lat), Some(lng)) => Some(
                Coordinates::new(lat, lng)
                    .ok_or_else(|| TripError::InvalidInput("Invalid lat/lng".to_string()))?,
            ),
            (None, None) => None,
            _ => {
                return Err(TripError::InvalidInput(
                    "lat and lng must be given together".to_string(),
                ))
            }
        };

        Ok(ClusterQuery {
            bounds: self.bounds()?,
            zoom: self.zoom,
            filter: MarkerFilter {
                show_hotels: self.hotels.unwrap_or(true),
                show_places: self.places.unwrap_or(true),
                show_food: self.food.unwrap_or(true),
                day: self.day,
                visible_days: self.visible_days()?,
            },
            essentials: self.essential_kinds()?,
            essentials_center,
        })
    }
}

/// POST /trips
pub async fn create_trip(
    trips: web::Data<TripService>,
    req: web::Json<CreateTripRequest>,
) -> Result<impl Responder, TripError> {
    let trip = trips.create_trip(req.into_inner()).await?;
    Ok(HttpResponse::Created().json(trip))
}

/// GET /trips?owner=
pub async fn list_trips(
    trips: web::Data<TripService>,
    query: web::Query<OwnerQuery>,
) -> Result<impl Responder, TripError> {
    let owned = trips.trips_by_owner(&query.owner).await?;
    Ok(HttpResponse::Ok().json(owned))
}

/// GET /trips/{id}
pub async fn get_trip(
    trips: web::Data<TripService>,
    path: web::Path<String>,
) -> Result<impl Responder, TripError> {
    let trip = trips.get_trip(&path.into_inner()).await?;
    Ok(HttpResponse::Ok().json(trip))
}

/// GET /trips/{id}/markers
pub async fn get_markers(
    trips: web::Data<TripService>,
    path: web::Path<String>,
    query: web::Query<MarkersQuery>,
) -> Result<impl Responder, TripError> {
    let markers = trips
        .markers(&path.into_inner(), query.focus.as_deref())
        .await?;
    Ok(HttpResponse::Ok().json(markers))
}

/// GET /trips/{id}/clusters
/// DOCUMENTATION: Responds with a GeoJSON FeatureCollection
pub async fn get_clusters(
    trips: web::Data<TripService>,
    path: web::Path<String>,
    params: web::Query<ClusterParams>,
) -> Result<impl Responder, TripError> {
    let query = params.into_inner().into_query()?;
    let collection = trips.clusters(&path.into_inner(), &query).await?;
    Ok(HttpResponse::Ok().json(collection))
}

/// GET /trips/{id}/clusters/{cluster_id}/expansion
pub async fn get_cluster_expansion(
    trips: web::Data<TripService>,
    path: web::Path<(String, u64)>,
    params: web::Query<ClusterParams>,
) -> Result<impl Responder, TripError> {
    let (id, cluster_id) = path.into_inner();
    let query = params.into_inner().into_query()?;
    let expansion = trips.cluster_expansion(&id, &query, cluster_id).await?;
    Ok(HttpResponse::Ok().json(expansion))
}

/// GET /trips/{id}/photo?name=
pub async fn get_entity_photo(
    trips: web::Data<TripService>,
    path: web::Path<String>,
    query: web::Query<EntityPhotoQuery>,
) -> Result<impl Responder, TripError> {
    let resolution = trips.entity_photo(&path.into_inner(), &query.name).await?;
    Ok(HttpResponse::Ok().json(super::photos::photo_body(&query.name, resolution)))
}

/// POST /trips/{id}/enrich
pub async fn enrich_trip(
    trips: web::Data<TripService>,
    path: web::Path<String>,
) -> Result<impl Responder, TripError> {
    let report = trips.enrich(&path.into_inner()).await?;
    Ok(HttpResponse::Ok().json(report))
}

/// GET /trips/{id}/budget
pub async fn get_budget(
    trips: web::Data<TripService>,
    path: web::Path<String>,
) -> Result<impl Responder, TripError> {
    let summary = trips.budget(&path.into_inner()).await?;
    Ok(HttpResponse::Ok().json(summary))
}

/// Configuration for trip routes
pub fn config(cfg: &mut web::ServiceConfig) {
    cfg.service(
        web::scope("/trips")
            .route("", web::post().to(create_trip))
            .route("", web::get().to(list_trips))
            .route("/{id}", web::get().to(get_trip))
            .route("/{id}/markers", web::get().to(get_markers))
            .route("/{id}/clusters", web::get().to(get_clusters))
            .route(
                "/{id}/clusters/{cluster_id}/expansion",
                web::get().to(get_cluster_expansion),
            )
            .route("/{id}/photo", web::get().to(get_entity_photo))
            .route("/{id}/enrich", web::post().to(enrich_trip))
            .route("/{id}/budget", web::get().to(get_budget))
            .configure(super::notes::config),
    );
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_cluster_whole_world() {
        let query = ClusterParams::default().into_query().unwrap();
        assert_eq!(query.bounds, ViewportBounds::WORLD);
        assert!(query.filter.show_hotels && query.filter.show_food);
        assert!(query.essentials.is_empty());
    }

    #[test]
    fn test_filters_and_essentials() {
        let params = ClusterParams {
            west: Some(170.0),
            south: Some(-10.0),
            east: Some(-170.0),
            north: Some(10.0),
            zoom: 4.0,
            food: Some(false),
            days: Some("1, 3".to_string()),
            essentials: Some("atm,Hospital,atm".to_string()),
            ..Default::default()
        };
        let query = params.into_query().unwrap();
        assert_eq!(query.bounds.west, 170.0);
        assert!(!query.filter.show_food);
        assert_eq!(query.filter.visible_days, Some(HashSet::from([1, 3])));
        assert_eq!(
            query.essentials,
            vec![EssentialKind::Atm, EssentialKind::Hospital]
        );
    }

    #[test]
    fn test_rejects_partial_or_bad_input() {
        let partial = ClusterParams {
            west: Some(1.0),
            ..Default::default()
        };
        assert!(partial.into_query().is_err());

        let bad_day = ClusterParams {
            days: Some("one".to_string()),
            ..Default::default()
        };
        assert!(bad_day.into_query().is_err());

        let lone_lat = ClusterParams {
            lat: Some(1.0),
            ..Default::default()
        };
        assert!(lone_lat.into_query().is_err());
    }
}
