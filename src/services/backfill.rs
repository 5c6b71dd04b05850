// src/services/backfill.rs
// DOCUMENTATION: Coordinate Backfill Writer
// PURPOSE: Persist coordinates that photo lookups discover for trip entities which
// lacked them, at most once per entity per process

use crate::db::TripStore;
use crate::models::{Coordinates, TripData};
use crate::services::coordinates::Locatable;
use crate::services::sessions::TripSessions;
use serde_json::{Map, Value};
use std::collections::HashSet;
use std::sync::{Arc, Mutex};
use tokio::sync::{mpsc, oneshot};
use tokio::task::JoinHandle;

/// Queue depth for discoveries waiting to be written
const BACKFILL_QUEUE: usize = 256;

/// A photo lookup found a location for a named trip entity
#[derive(Debug, Clone, PartialEq)]
pub struct CoordinatesDiscovered {
    pub trip_id: String,
    pub entity_name: String,
    pub coordinates: Coordinates,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BackfillOutcome {
    /// One write covering this many hotels and itinerary places
    Written { hotels: usize, places: usize },
    /// This entity was already handled during this process's lifetime
    AlreadyUpdated,
    /// No entity by that name is missing coordinates
    NoMatch,
    TripNotFound,
    /// Load or write failed; logged, never surfaced
    Failed,
}

fn same_name(stored: Option<&str>, name: &str) -> bool {
    stored.is_some_and(|stored| stored.trim() == name)
}

/// Set coordinates on every hotel and itinerary place named `name` that has none
/// DOCUMENTATION: Returns (hotels, places) updated. Names match exactly once
/// surrounding whitespace is ignored. Only the matched entries change; malformed
/// siblings are left as stored.
pub fn apply_coordinates(data: &mut TripData, name: &str, coordinates: Coordinates) -> (usize, usize) {
    let name = name.trim();
    let pair = Value::String(coordinates.to_pair_string());

    let mut hotels = 0;
    for hotel in data.hotels.iter_mut() {
        if same_name(hotel.hotel_name.as_deref(), name) && !hotel.has_coordinates() {
            hotel.geo_coordinates = Some(pair.clone());
            hotels += 1;
        }
    }

    let mut places = 0;
    for place in data.itinerary.iter_mut().flat_map(|day| day.plan.iter_mut()) {
        if same_name(place.place_name.as_deref(), name) && !place.has_coordinates() {
            place.geo_coordinates = Some(pair.clone());
            places += 1;
        }
    }

    (hotels, places)
}

pub struct BackfillWriter {
    store: Arc<dyn TripStore>,
    sessions: Arc<TripSessions>,
    /// (trip id, entity name) pairs already handled
    updated: Mutex<HashSet<(String, String)>>,
}

impl BackfillWriter {
    pub fn new(store: Arc<dyn TripStore>, sessions: Arc<TripSessions>) -> Self {
        Self {
            store,
            sessions,
            updated: Mutex::new(HashSet::new()),
        }
    }

    /// Claim an entity; false when it was claimed before
    fn claim(&self, trip_id: &str, entity_name: &str) -> bool {
        match self.updated.lock() {
            Ok(mut updated) => updated.insert((trip_id.to_string(), entity_name.to_string())),
            Err(poisoned) => poisoned
                .into_inner()
                .insert((trip_id.to_string(), entity_name.to_string())),
        }
    }

    pub fn is_updated(&self, trip_id: &str, entity_name: &str) -> bool {
        let key = (trip_id.to_string(), entity_name.trim().to_string());
        match self.updated.lock() {
            Ok(updated) => updated.contains(&key),
            Err(poisoned) => poisoned.into_inner().contains(&key),
        }
    }

    /// Handle one discovery
    /// DOCUMENTATION: The entity is marked handled before anything else, so a
    /// failed or no-op attempt is not retried this session. The in-memory trip is
    /// updated first and kept even if the write fails.
    pub async fn on_coordinates_discovered(&self, event: CoordinatesDiscovered) -> BackfillOutcome {
        let CoordinatesDiscovered {
            trip_id,
            entity_name,
            coordinates,
        } = event;
        let entity_name = entity_name.trim().to_string();

        if !self.claim(&trip_id, &entity_name) {
            log::debug!("Backfill for '{}' in trip {} already done", entity_name, trip_id);
            return BackfillOutcome::AlreadyUpdated;
        }

        match self.sessions.load(self.store.as_ref(), &trip_id).await {
            Ok(Some(_)) => {}
            Ok(None) => {
                log::warn!("Backfill skipped: trip {} not found", trip_id);
                return BackfillOutcome::TripNotFound;
            }
            Err(e) => {
                log::error!("Backfill could not load trip {}: {}", trip_id, e);
                return BackfillOutcome::Failed;
            }
        }

        let applied = self
            .sessions
            .modify(&trip_id, |trip| {
                let counts = apply_coordinates(&mut trip.trip_data, &entity_name, coordinates);
                (counts, serde_json::to_value(&trip.trip_data))
            })
            .await;

        let ((hotels, places), trip_data) = match applied {
            Some(applied) => applied,
            None => return BackfillOutcome::TripNotFound,
        };
        if hotels + places == 0 {
            return BackfillOutcome::NoMatch;
        }

        let trip_data = match trip_data {
            Ok(value) => value,
            Err(e) => {
                log::error!("Backfill could not encode trip {}: {}", trip_id, e);
                return BackfillOutcome::Failed;
            }
        };

        let mut fields = Map::new();
        fields.insert("tripData".to_string(), trip_data);

        match self.store.update_trip_fields(&trip_id, fields).await {
            Ok(()) => {
                log::info!(
                    "Backfilled coordinates for '{}' in trip {} ({} hotels, {} places)",
                    entity_name,
                    trip_id,
                    hotels,
                    places
                );
                BackfillOutcome::Written { hotels, places }
            }
            Err(e) => {
                log::error!(
                    "Failed to persist coordinates for '{}' in trip {}: {}",
                    entity_name,
                    trip_id,
                    e
                );
                BackfillOutcome::Failed
            }
        }
    }
}

struct BackfillRequest {
    event: CoordinatesDiscovered,
    reply: Option<oneshot::Sender<BackfillOutcome>>,
}

/// Sender side of the backfill queue
/// DOCUMENTATION: Discoveries are written one at a time by a single task, so
/// read-modify-write cycles on the same trip never interleave, and a request that
/// goes away does not cancel a pending write.
#[derive(Clone)]
pub struct BackfillHandle {
    tx: mpsc::Sender<BackfillRequest>,
}

impl BackfillHandle {
    /// Fire and forget; drops the discovery when the queue is full
    pub fn notify(&self, event: CoordinatesDiscovered) {
        let request = BackfillRequest { event, reply: None };
        if let Err(e) = self.tx.try_send(request) {
            log::warn!("Dropping coordinate discovery: {}", e);
        }
    }

    /// Queue a discovery and wait for the writer's outcome
    pub async fn submit(&self, event: CoordinatesDiscovered) -> BackfillOutcome {
        let (reply, outcome) = oneshot::channel();
        let request = BackfillRequest {
            event,
            reply: Some(reply),
        };
        if self.tx.send(request).await.is_err() {
            log::error!("Backfill writer is not running");
            return BackfillOutcome::Failed;
        }
        outcome.await.unwrap_or(BackfillOutcome::Failed)
    }
}

/// Start the writer task; it stops once every handle is dropped
pub fn spawn_backfill_writer(writer: Arc<BackfillWriter>) -> (BackfillHandle, JoinHandle<()>) {
    let (tx, mut rx) = mpsc::channel::<BackfillRequest>(BACKFILL_QUEUE);

    let task = tokio::spawn(async move {
        while let Some(BackfillRequest { event, reply }) = rx.recv().await {
            let outcome = writer.on_coordinates_discovered(event).await;
            if let Some(reply) = reply {
                let _ = reply.send(outcome);
            }
        }
        log::info!("Backfill writer stopped");
    });

    (BackfillHandle { tx }, task)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::MemoryTripStore;
    use crate::models::Trip;
    use serde_json::json;
    use std::time::Duration;

    async fn setup() -> (Arc<MemoryTripStore>, Arc<TripSessions>, BackfillWriter) {
        let store = Arc::new(MemoryTripStore::new());
        let mut trip: Trip = serde_json::from_value(json!({
            "userSelection": { "location": { "label": "New York" }, "noOfDays": 3 },
            "tripData": {
                "hotels": [
                    { "hotelName": "Harbor Hotel" },
                    { "hotelName": "Mapped Hotel", "geoCoordinates": "40.5,-73.5" }
                ],
                "itinerary": [{ "day": "Day 1", "plan": [
                    { "placeName": "Pier", "geoCoordinates": "40.0,-73.0" },
                    { "placeName": "Museum" }
                ]}]
            }
        }))
        .unwrap();
        trip.id = "trip-1".to_string();
        store.create_trip(&trip).await.unwrap();

        let sessions = Arc::new(TripSessions::new(Duration::from_secs(3600)));
        let writer = BackfillWriter::new(store.clone(), sessions.clone());
        (store, sessions, writer)
    }

    fn event(name: &str, lat: f64, lng: f64) -> CoordinatesDiscovered {
        CoordinatesDiscovered {
            trip_id: "trip-1".to_string(),
            entity_name: name.to_string(),
            coordinates: Coordinates::new(lat, lng).unwrap(),
        }
    }

    #[tokio::test]
    async fn test_second_discovery_writes_nothing() {
        let (store, _, writer) = setup().await;

        let first = writer.on_coordinates_discovered(event("Harbor Hotel", 40.1, -73.1)).await;
        let second = writer.on_coordinates_discovered(event("Harbor Hotel", 40.2, -73.2)).await;

        assert_eq!(first, BackfillOutcome::Written { hotels: 1, places: 0 });
        assert_eq!(second, BackfillOutcome::AlreadyUpdated);
        assert_eq!(store.write_count(), 1);

        let doc = store.document("trip-1").await.unwrap();
        assert_eq!(doc["tripData"]["hotels"][0]["geoCoordinates"], "40.1,-73.1");
        assert_eq!(doc["tripData"]["hotels"][1]["geoCoordinates"], "40.5,-73.5");
    }

    #[tokio::test]
    async fn test_itinerary_place_backfilled() {
        let (store, sessions, writer) = setup().await;

        let outcome = writer.on_coordinates_discovered(event("Museum", 40.3, -73.3)).await;
        assert_eq!(outcome, BackfillOutcome::Written { hotels: 0, places: 1 });

        let doc = store.document("trip-1").await.unwrap();
        assert_eq!(doc["tripData"]["itinerary"][0]["plan"][1]["geoCoordinates"], "40.3,-73.3");
        let session = sessions.get("trip-1").await.unwrap();
        let day = session.trip_data.itinerary.get(0).unwrap();
        assert!(day.plan.get(1).unwrap().has_coordinates());
    }

    #[tokio::test]
    async fn test_entity_with_coordinates_is_left_alone() {
        let (store, _, writer) = setup().await;

        let outcome = writer.on_coordinates_discovered(event("Mapped Hotel", 1.0, 1.0)).await;
        assert_eq!(outcome, BackfillOutcome::NoMatch);
        assert_eq!(store.write_count(), 0);
    }

    #[tokio::test]
    async fn test_unknown_name_claims_without_writing() {
        let (store, _, writer) = setup().await;

        assert_eq!(
            writer.on_coordinates_discovered(event("Nowhere", 1.0, 1.0)).await,
            BackfillOutcome::NoMatch
        );
        assert!(writer.is_updated("trip-1", "Nowhere"));
        assert_eq!(
            writer.on_coordinates_discovered(event("Nowhere", 1.0, 1.0)).await,
            BackfillOutcome::AlreadyUpdated
        );
        assert_eq!(store.write_count(), 0);
    }

    #[tokio::test]
    async fn test_write_failure_keeps_optimistic_state() {
        let (store, sessions, writer) = setup().await;
        store.set_fail_writes(true);

        let outcome = writer.on_coordinates_discovered(event("Harbor Hotel", 40.1, -73.1)).await;
        assert_eq!(outcome, BackfillOutcome::Failed);

        let session = sessions.get("trip-1").await.unwrap();
        assert!(session.trip_data.hotels.get(0).unwrap().has_coordinates());
        let doc = store.document("trip-1").await.unwrap();
        assert!(doc["tripData"]["hotels"][0].get("geoCoordinates").is_none());
    }

    #[tokio::test]
    async fn test_malformed_siblings_survive_backfill() {
        let store = Arc::new(MemoryTripStore::new());
        let mut trip: Trip = serde_json::from_value(json!({
            "tripData": {
                "hotels": [
                    { "hotelName": "Harbor Hotel" },
                    { "hotelName": "Fancy", "description": { "short": "nice" }, "geoCoordinates": "40.2,-73.2" },
                    "not an object"
                ],
                "foodPlaces": [{ "name": "Deli", "cuisine": ["Jewish", "American"] }]
            }
        }))
        .unwrap();
        trip.id = "trip-2".to_string();
        store.create_trip(&trip).await.unwrap();
        let sessions = Arc::new(TripSessions::new(Duration::from_secs(3600)));
        let writer = BackfillWriter::new(store.clone(), sessions);

        let mut found = event("Harbor Hotel", 40.1, -73.1);
        found.trip_id = "trip-2".to_string();
        let outcome = writer.on_coordinates_discovered(found).await;
        assert_eq!(outcome, BackfillOutcome::Written { hotels: 1, places: 0 });

        let doc = store.document("trip-2").await.unwrap();
        let hotels = doc["tripData"]["hotels"].as_array().unwrap();
        assert_eq!(hotels.len(), 3);
        assert_eq!(hotels[0]["geoCoordinates"], "40.1,-73.1");
        assert_eq!(hotels[1]["description"], json!({ "short": "nice" }));
        assert_eq!(hotels[1]["geoCoordinates"], "40.2,-73.2");
        assert_eq!(hotels[2], "not an object");
        assert_eq!(
            doc["tripData"]["foodPlaces"][0]["cuisine"],
            json!(["Jewish", "American"])
        );
    }

    #[tokio::test]
    async fn test_padded_names_match() {
        let store = Arc::new(MemoryTripStore::new());
        let mut trip: Trip = serde_json::from_value(json!({
            "tripData": { "hotels": [{ "hotelName": "Harbor Hotel " }] }
        }))
        .unwrap();
        trip.id = "trip-1".to_string();
        store.create_trip(&trip).await.unwrap();
        let sessions = Arc::new(TripSessions::new(Duration::from_secs(3600)));
        let writer = BackfillWriter::new(store.clone(), sessions);

        let outcome = writer.on_coordinates_discovered(event("Harbor Hotel", 40.1, -73.1)).await;
        assert_eq!(outcome, BackfillOutcome::Written { hotels: 1, places: 0 });
        assert!(writer.is_updated("trip-1", " Harbor Hotel"));

        let doc = store.document("trip-1").await.unwrap();
        assert_eq!(doc["tripData"]["hotels"][0]["hotelName"], "Harbor Hotel ");
        assert_eq!(doc["tripData"]["hotels"][0]["geoCoordinates"], "40.1,-73.1");
    }

    #[tokio::test]
    async fn test_missing_trip() {
        let (_, _, writer) = setup().await;
        let mut missing = event("Harbor Hotel", 1.0, 1.0);
        missing.trip_id = "other".to_string();
        assert_eq!(
            writer.on_coordinates_discovered(missing).await,
            BackfillOutcome::TripNotFound
        );
    }

    #[tokio::test]
    async fn test_queue_writes_once_through_task() {
        let (store, _, writer) = setup().await;
        let (handle, task) = spawn_backfill_writer(Arc::new(writer));

        handle.notify(event("Harbor Hotel", 40.1, -73.1));
        handle.notify(event("Harbor Hotel", 40.1, -73.1));
        drop(handle);
        task.await.unwrap();

        assert_eq!(store.write_count(), 1);
    }

    #[tokio::test]
    async fn test_submit_reports_outcome() {
        let (store, _, writer) = setup().await;
        let (handle, _task) = spawn_backfill_writer(Arc::new(writer));

        let first = handle.submit(event("Museum", 40.3, -73.3)).await;
        let second = handle.submit(event("Museum", 40.3, -73.3)).await;

        assert_eq!(first, BackfillOutcome::Written { hotels: 0, places: 1 });
        assert_eq!(second, BackfillOutcome::AlreadyUpdated);
        assert_eq!(store.write_count(), 1);
    }
}
