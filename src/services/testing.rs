// src/services/testing.rs
// DOCUMENTATION: Test doubles shared by service test suites

use crate::errors::TripError;
use crate::models::Coordinates;
use crate::services::google_places_client::{
    GoogleGeometry, GoogleLocation, LatLng, LocalizedText, NearbyPlace, PlacePhoto, PlaceRecord,
    PlaceSearch, TextSearchResponse,
};
use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Mutex;

/// In-memory Places backend; unknown queries return zero places
#[derive(Default)]
pub struct FakePlaceSearch {
    places: Mutex<HashMap<String, PlaceRecord>>,
    nearby: Mutex<Vec<NearbyPlace>>,
    fail: AtomicBool,
    unconfigured: AtomicBool,
    text_calls: AtomicUsize,
    nearby_calls: AtomicUsize,
}

impl FakePlaceSearch {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_place(self, name: &str, lat: f64, lng: f64, photos: &[&str]) -> Self {
        let record = PlaceRecord {
            id: Some(format!("id-{}", name)),
            display_name: Some(LocalizedText {
                text: name.to_string(),
                language_code: None,
            }),
            location: Some(LatLng {
                latitude: lat,
                longitude: lng,
            }),
            photos: photos
                .iter()
                .map(|p| PlacePhoto {
                    name: p.to_string(),
                    width_px: None,
                    height_px: None,
                })
                .collect(),
            ..Default::default()
        };
        self.places
            .lock()
            .unwrap()
            .insert(name.to_string(), record);
        self
    }

    pub fn with_nearby(self, name: &str, lat: f64, lng: f64) -> Self {
        self.nearby.lock().unwrap().push(NearbyPlace {
            place_id: Some(format!("nearby-{}", name)),
            name: name.to_string(),
            vicinity: Some("Around the corner".to_string()),
            geometry: GoogleGeometry {
                location: GoogleLocation { lat, lng },
            },
            rating: Some(4.2),
            user_ratings_total: Some(10),
            price_level: None,
            opening_hours: None,
            photos: None,
        });
        self
    }

    pub fn failing(self) -> Self {
        self.fail.store(true, Ordering::SeqCst);
        self
    }

    /// Behaves like a client without an API key
    pub fn unconfigured(self) -> Self {
        self.unconfigured.store(true, Ordering::SeqCst);
        self
    }

    pub fn text_calls(&self) -> usize {
        self.text_calls.load(Ordering::SeqCst)
    }

    pub fn nearby_calls(&self) -> usize {
        self.nearby_calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl PlaceSearch for FakePlaceSearch {
    async fn search_text(&self, text_query: &str) -> Result<TextSearchResponse, TripError> {
        self.text_calls.fetch_add(1, Ordering::SeqCst);
        if self.fail.load(Ordering::SeqCst) {
            return Err(TripError::ExternalApiError("network down".to_string()));
        }
        let places = self
            .places
            .lock()
            .unwrap()
            .get(text_query)
            .cloned()
            .into_iter()
            .collect();
        Ok(TextSearchResponse { places })
    }

    async fn nearby_search(
        &self,
        _center: Coordinates,
        _radius_m: u32,
        _place_type: &str,
    ) -> Result<Vec<NearbyPlace>, TripError> {
        self.nearby_calls.fetch_add(1, Ordering::SeqCst);
        if self.fail.load(Ordering::SeqCst) {
            return Err(TripError::ExternalApiError("network down".to_string()));
        }
        Ok(self.nearby.lock().unwrap().clone())
    }

    fn photo_media_url(&self, photo_name: &str) -> String {
        format!("https://photos.test/{}", photo_name)
    }

    fn is_configured(&self) -> bool {
        !self.unconfigured.load(Ordering::SeqCst)
    }
}
