// src/services/trip_service.rs
// DOCUMENTATION: Trip orchestration
// PURPOSE: Ties stored trips to markers, clustering, photos and coordinate backfill

use crate::db::trip_repository::encode_trip;
use crate::db::TripStore;
use crate::errors::TripError;
use crate::models::{
    day_color, Coordinates, CreateTripRequest, Marker, Trip, TripData, Viewport, ViewportBounds,
};
use crate::services::backfill::{BackfillHandle, BackfillOutcome, CoordinatesDiscovered};
use crate::services::budget::{BudgetService, BudgetSummary};
use crate::services::clustering::{to_feature_collection, ClusterExpansion, ClusterIndex};
use crate::services::coordinates::Locatable;
use crate::services::essentials::{EssentialKind, EssentialsService};
use crate::services::marker_builder::{MarkerBuilder, MarkerFilter};
use crate::services::photo_resolver::{PhotoResolution, PhotoResolver};
use crate::services::sessions::TripSessions;
use chrono::Utc;
use geojson::FeatureCollection;
use serde::Serialize;
use serde_json::Value;
use std::collections::BTreeSet;
use std::sync::Arc;
use validator::Validate;

/// Markers of one trip plus the camera targets a map needs to show them
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TripMarkers {
    pub trip_id: String,
    pub markers: Vec<Marker>,
    pub view: Viewport,
    pub bounds: Option<ViewportBounds>,
    pub days: Vec<DayView>,
    /// Present when a marker id was asked to be focused and exists
    pub focus: Option<Viewport>,
}

#[derive(Debug, Clone, Serialize)]
pub struct DayView {
    pub day: u32,
    pub color: &'static str,
    pub view: Option<Viewport>,
}

/// What to cluster and where to look
#[derive(Debug, Clone)]
pub struct ClusterQuery {
    pub bounds: ViewportBounds,
    pub zoom: f64,
    pub filter: MarkerFilter,
    pub essentials: Vec<EssentialKind>,
    /// Where to search for essentials; defaults to the center of the trip's markers
    pub essentials_center: Option<Coordinates>,
}

impl Default for ClusterQuery {
    fn default() -> Self {
        Self {
            bounds: ViewportBounds::WORLD,
            zoom: 0.0,
            filter: MarkerFilter::default(),
            essentials: Vec::new(),
            essentials_center: None,
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct EnrichmentReport {
    pub trip_id: String,
    /// Distinct entity names that had no coordinates
    pub candidates: usize,
    /// Names for which a lookup found a location
    pub resolved: usize,
    /// Names whose coordinates were persisted by this sweep
    pub written: usize,
}

/// Names of hotels and itinerary places that cannot be placed on the map yet
pub fn entities_missing_coordinates(data: &TripData) -> Vec<String> {
    let hotels = data
        .hotels
        .iter()
        .filter(|h| !h.has_coordinates())
        .filter_map(|h| h.hotel_name.as_deref());
    let places = data
        .itinerary
        .iter()
        .flat_map(|day| day.plan.iter())
        .filter(|p| !p.has_coordinates())
        .filter_map(|p| p.place_name.as_deref());

    let mut seen = BTreeSet::new();
    hotels
        .chain(places)
        .map(str::trim)
        .filter(|name| !name.is_empty() && seen.insert(name.to_string()))
        .map(str::to_string)
        .collect()
}

pub struct TripService {
    store: Arc<dyn TripStore>,
    sessions: Arc<TripSessions>,
    photos: Arc<PhotoResolver>,
    essentials: Arc<EssentialsService>,
    backfill: BackfillHandle,
    default_center: Coordinates,
}

impl TripService {
    pub fn new(
        store: Arc<dyn TripStore>,
        sessions: Arc<TripSessions>,
        photos: Arc<PhotoResolver>,
        essentials: Arc<EssentialsService>,
        backfill: BackfillHandle,
        default_center: Coordinates,
    ) -> Self {
        Self {
            store,
            sessions,
            photos,
            essentials,
            backfill,
            default_center,
        }
    }

    /// Store a freshly generated trip
    /// DOCUMENTATION: The id is the creation time in milliseconds. The itinerary
    /// text must parse as a JSON object; it is stored exactly as parsed.
    pub async fn create_trip(&self, req: CreateTripRequest) -> Result<Trip, TripError> {
        req.validate()
            .map_err(|e| TripError::ValidationError(e.to_string()))?;

        let raw: Value = serde_json::from_str(req.trip_data.trim())
            .map_err(|e| TripError::InvalidInput(format!("Trip data is not valid JSON: {}", e)))?;
        if !raw.is_object() {
            return Err(TripError::InvalidInput(
                "Trip data must be a JSON object".to_string(),
            ));
        }
        let trip_data: TripData = serde_json::from_value(raw.clone())
            .map_err(|e| TripError::InvalidInput(format!("Trip data is malformed: {}", e)))?;

        let trip = Trip {
            id: Utc::now().timestamp_millis().to_string(),
            user_selection: req.user_selection,
            trip_data,
            user_email: req.user_email,
            ..Default::default()
        };

        let mut document = encode_trip(&trip)?;
        if let Value::Object(fields) = &mut document {
            fields.insert("tripData".to_string(), raw);
        }
        self.store
            .insert_document(&trip.id, trip.user_email.as_deref(), document)
            .await?;
        self.sessions.insert(trip.clone()).await;

        log::info!(
            "Created trip {} for {}",
            trip.id,
            trip.destination_label().unwrap_or("unknown destination")
        );
        Ok(trip)
    }

    /// Session view of a trip, including coordinates backfilled but not yet persisted
    pub async fn get_trip(&self, id: &str) -> Result<Trip, TripError> {
        self.sessions
            .load(self.store.as_ref(), id)
            .await?
            .ok_or_else(|| TripError::NotFound(format!("Trip {} not found", id)))
    }

    pub async fn trips_by_owner(&self, owner: &str) -> Result<Vec<Trip>, TripError> {
        let owner = owner.trim();
        if owner.is_empty() {
            return Err(TripError::InvalidInput("owner is required".to_string()));
        }
        self.store.query_trips_by_owner(owner).await
    }

    pub async fn markers(&self, id: &str, focus: Option<&str>) -> Result<TripMarkers, TripError> {
        let trip = self.get_trip(id).await?;
        let markers = MarkerBuilder::build_markers(&trip, self.default_center);

        let days = MarkerBuilder::days(&markers)
            .into_iter()
            .map(|day| DayView {
                day,
                color: day_color(day),
                view: MarkerBuilder::focus_day(&markers, day),
            })
            .collect();

        Ok(TripMarkers {
            trip_id: trip.id,
            view: MarkerBuilder::initial_view(&markers),
            bounds: MarkerBuilder::bounds(&markers),
            focus: focus.and_then(|marker_id| MarkerBuilder::focus_marker(&markers, marker_id)),
            days,
            markers,
        })
    }

    async fn cluster_index(&self, id: &str, query: &ClusterQuery) -> Result<ClusterIndex, TripError> {
        if !query.zoom.is_finite() || query.zoom < 0.0 {
            return Err(TripError::InvalidInput(format!("Invalid zoom {}", query.zoom)));
        }

        let trip = self.get_trip(id).await?;
        let all = MarkerBuilder::build_markers(&trip, self.default_center);
        let mut markers = query.filter.apply(&all);

        if !query.essentials.is_empty() {
            let center = query
                .essentials_center
                .or_else(|| MarkerBuilder::center(&all))
                .unwrap_or(self.default_center);
            for kind in &query.essentials {
                markers.extend(self.essentials.nearby(center, *kind).await);
            }
        }

        Ok(ClusterIndex::new(markers))
    }

    /// Clusters and single markers visible in the query's bounds, as GeoJSON
    pub async fn clusters(&self, id: &str, query: &ClusterQuery) -> Result<FeatureCollection, TripError> {
        let index = self.cluster_index(id, query).await?;
        let items = index.get_clusters(&query.bounds, query.zoom);
        log::debug!(
            "Trip {} at zoom {}: {} markers -> {} map items",
            id,
            query.zoom,
            index.markers().len(),
            items.len()
        );
        Ok(to_feature_collection(&items))
    }

    /// Zoom at which a cluster splits, plus where to ease the camera
    /// DOCUMENTATION: The index is rebuilt from the same filters the cluster was
    /// produced with, so the id stays meaningful across requests.
    pub async fn cluster_expansion(
        &self,
        id: &str,
        query: &ClusterQuery,
        cluster_id: u64,
    ) -> Result<ClusterExpansion, TripError> {
        self.cluster_index(id, query)
            .await?
            .expansion(cluster_id)
            .ok_or_else(|| TripError::NotFound(format!("Cluster {} not found", cluster_id)))
    }

    /// Photo for a named trip entity
    /// DOCUMENTATION: When the lookup also finds a location for an entity that has
    /// none, the discovery is queued for the backfill writer. Photo failures
    /// degrade to an empty resolution.
    pub async fn entity_photo(&self, id: &str, name: &str) -> Result<PhotoResolution, TripError> {
        let trip = self.get_trip(id).await?;
        let resolution = self.photos.resolve(name).await;

        if let Some(coordinates) = resolution.location {
            let name = name.trim();
            if entities_missing_coordinates(&trip.trip_data)
                .iter()
                .any(|missing| missing == name)
            {
                self.backfill.notify(CoordinatesDiscovered {
                    trip_id: trip.id,
                    entity_name: name.to_string(),
                    coordinates,
                });
            }
        }

        Ok(resolution)
    }

    /// Resolve every unmapped hotel and itinerary place and persist what is found
    pub async fn enrich(&self, id: &str) -> Result<EnrichmentReport, TripError> {
        let trip = self.get_trip(id).await?;
        let names = entities_missing_coordinates(&trip.trip_data);

        let mut report = EnrichmentReport {
            trip_id: trip.id.clone(),
            candidates: names.len(),
            ..Default::default()
        };

        for name in names {
            let Some(coordinates) = self.photos.resolve(&name).await.location else {
                log::debug!("No location found for '{}' in trip {}", name, trip.id);
                continue;
            };
            report.resolved += 1;

            let outcome = self
                .backfill
                .submit(CoordinatesDiscovered {
                    trip_id: trip.id.clone(),
                    entity_name: name,
                    coordinates,
                })
                .await;
            if matches!(outcome, BackfillOutcome::Written { .. }) {
                report.written += 1;
            }
        }

        log::info!(
            "Enriched trip {}: {} candidates, {} resolved, {} written",
            report.trip_id,
            report.candidates,
            report.resolved,
            report.written
        );
        Ok(report)
    }

    pub async fn budget(&self, id: &str) -> Result<BudgetSummary, TripError> {
        let trip = self.get_trip(id).await?;
        Ok(BudgetService::summarize(&trip))
    }
}
