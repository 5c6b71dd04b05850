// src/db/memory_store.rs
// DOCUMENTATION: In-process trip store
// PURPOSE: Used when no DATABASE_URL is configured, and as the store in tests

use super::trip_repository::{decode_trip, TripStore};
use crate::errors::TripError;
use crate::models::Trip;
use async_trait::async_trait;
use serde_json::{Map, Value};
use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use tokio::sync::RwLock;

/// Documents kept as raw JSON so partial updates merge exactly like the database
#[derive(Default)]
pub struct MemoryTripStore {
    documents: RwLock<HashMap<String, Value>>,
    writes: AtomicUsize,
    fail_writes: AtomicBool,
}

impl MemoryTripStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of `update_trip_fields` calls that reached the store
    pub fn write_count(&self) -> usize {
        self.writes.load(Ordering::SeqCst)
    }
}

#[cfg(test)]
impl MemoryTripStore {
    pub async fn len(&self) -> usize {
        self.documents.read().await.len()
    }

    /// Raw stored document
    pub async fn document(&self, id: &str) -> Option<Value> {
        self.documents.read().await.get(id).cloned()
    }

    pub fn set_fail_writes(&self, fail: bool) {
        self.fail_writes.store(fail, Ordering::SeqCst);
    }
}

#[async_trait]
impl TripStore for MemoryTripStore {
    async fn get_trip(&self, id: &str) -> Result<Option<Trip>, TripError> {
        let documents = self.documents.read().await;
        documents
            .get(id)
            .cloned()
            .map(|doc| decode_trip(id, doc))
            .transpose()
    }

    async fn update_trip_fields(
        &self,
        id: &str,
        fields: Map<String, Value>,
    ) -> Result<(), TripError> {
        self.writes.fetch_add(1, Ordering::SeqCst);
        if self.fail_writes.load(Ordering::SeqCst) {
            return Err(TripError::DatabaseError("write rejected".to_string()));
        }

        let mut documents = self.documents.write().await;
        let Some(Value::Object(document)) = documents.get_mut(id) else {
            return Err(TripError::NotFound(format!("Trip {} not found", id)));
        };
        document.extend(fields);
        Ok(())
    }

    async fn query_trips_by_owner(&self, owner: &str) -> Result<Vec<Trip>, TripError> {
        let documents = self.documents.read().await;
        let mut trips: Vec<Trip> = documents
            .iter()
            .filter(|(_, doc)| doc.get("userEmail").and_then(Value::as_str) == Some(owner))
            .filter_map(|(id, doc)| decode_trip(id, doc.clone()).ok())
            .collect();
        // ids are creation timestamps; newest first like the database query
        trips.sort_by(|a, b| b.id.cmp(&a.id));
        Ok(trips)
    }

    async fn insert_document(
        &self,
        id: &str,
        _owner: Option<&str>,
        document: Value,
    ) -> Result<(), TripError> {
        let mut documents = self.documents.write().await;
        if documents.contains_key(id) {
            return Err(TripError::InvalidInput(format!("Trip {} already exists", id)));
        }
        documents.insert(id.to_string(), document);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn trip(id: &str, owner: &str) -> Trip {
        let mut trip: Trip = serde_json::from_value(json!({
            "userSelection": { "location": { "label": "Oslo" } },
            "tripData": { "hotels": [{ "hotelName": "Fjord Inn" }] },
            "userEmail": owner
        }))
        .unwrap();
        trip.id = id.to_string();
        trip
    }

    #[tokio::test]
    async fn test_shallow_merge_replaces_top_level_keys() {
        let store = MemoryTripStore::new();
        store.create_trip(&trip("1", "a@example.com")).await.unwrap();

        let mut patch = Map::new();
        patch.insert("tripData".to_string(), json!({ "hotels": [] }));
        store.update_trip_fields("1", patch).await.unwrap();

        let loaded = store.get_trip("1").await.unwrap().unwrap();
        assert!(loaded.trip_data.hotels.is_empty());
        assert_eq!(loaded.destination_label(), Some("Oslo"));
        assert_eq!(store.write_count(), 1);
    }

    #[tokio::test]
    async fn test_update_missing_trip() {
        let store = MemoryTripStore::new();
        let err = store.update_trip_fields("nope", Map::new()).await.unwrap_err();
        assert!(matches!(err, TripError::NotFound(_)));
    }

    #[tokio::test]
    async fn test_query_by_owner_newest_first() {
        let store = MemoryTripStore::new();
        store.create_trip(&trip("100", "a@example.com")).await.unwrap();
        store.create_trip(&trip("200", "a@example.com")).await.unwrap();
        store.create_trip(&trip("300", "b@example.com")).await.unwrap();

        let trips = store.query_trips_by_owner("a@example.com").await.unwrap();
        let ids: Vec<&str> = trips.iter().map(|t| t.id.as_str()).collect();
        assert_eq!(ids, vec!["200", "100"]);
    }

    #[tokio::test]
    async fn test_duplicate_create_rejected() {
        let store = MemoryTripStore::new();
        store.create_trip(&trip("1", "a@example.com")).await.unwrap();
        assert!(store.create_trip(&trip("1", "a@example.com")).await.is_err());
        assert_eq!(store.len().await, 1);
    }
}
