// src/services/google_places_client.rs
// DOCUMENTATION: Google Places API client
// PURPOSE: Text search (photos + location for a place name), nearby search, photo URLs

use crate::errors::TripError;
use crate::models::Coordinates;
use async_trait::async_trait;
use reqwest::{Client, StatusCode};
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Fields requested from the text search endpoint
const TEXT_SEARCH_FIELD_MASK: &str = "places.photos,places.displayName,places.id,places.location,places.formattedAddress,places.internationalPhoneNumber,places.rating";

/// External place search capability
/// DOCUMENTATION: Seam between the lookup pipeline and the network, so the cache
/// and resolver logic can run against a fake in tests.
#[async_trait]
pub trait PlaceSearch: Send + Sync {
    /// Free-text search; an empty `places` list is a valid response
    async fn search_text(&self, text_query: &str) -> Result<TextSearchResponse, TripError>;

    /// Places of one type around a point
    async fn nearby_search(
        &self,
        center: Coordinates,
        radius_m: u32,
        place_type: &str,
    ) -> Result<Vec<NearbyPlace>, TripError>;

    /// Pure template substitution; the reference is not validated
    fn photo_media_url(&self, photo_name: &str) -> String;

    /// False when requests would fail before reaching the network
    fn is_configured(&self) -> bool {
        true
    }
}

/// Response from Places Text Search (New)
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct TextSearchResponse {
    #[serde(default)]
    pub places: Vec<PlaceRecord>,
}

impl TextSearchResponse {
    pub fn first_place(&self) -> Option<&PlaceRecord> {
        self.places.first()
    }
}

/// A single text search hit
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PlaceRecord {
    pub id: Option<String>,
    pub display_name: Option<LocalizedText>,
    pub formatted_address: Option<String>,
    pub location: Option<LatLng>,
    #[serde(default)]
    pub photos: Vec<PlacePhoto>,
    pub rating: Option<f32>,
    pub international_phone_number: Option<String>,
}

impl PlaceRecord {
    pub fn coordinates(&self) -> Option<Coordinates> {
        self.location
            .as_ref()
            .and_then(|l| Coordinates::new(l.latitude, l.longitude))
    }

    pub fn name(&self) -> Option<&str> {
        self.display_name.as_ref().map(|n| n.text.as_str())
    }
}

#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct LocalizedText {
    pub text: String,
    pub language_code: Option<String>,
}

#[derive(Debug, Clone, Copy, Deserialize, Serialize)]
pub struct LatLng {
    pub latitude: f64,
    pub longitude: f64,
}

/// Photo reference from the new Places API ("places/{id}/photos/{ref}")
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PlacePhoto {
    pub name: String,
    pub width_px: Option<i32>,
    pub height_px: Option<i32>,
}

/// Response from the legacy Nearby Search
#[derive(Debug, Deserialize, Serialize)]
pub struct NearbySearchResponse {
    #[serde(default)]
    pub results: Vec<NearbyPlace>,
    pub status: String,
    pub error_message: Option<String>,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct NearbyPlace {
    pub place_id: Option<String>,
    pub name: String,
    pub vicinity: Option<String>,
    pub geometry: GoogleGeometry,
    pub rating: Option<f32>,
    pub user_ratings_total: Option<i32>,
    pub price_level: Option<i32>,
    pub opening_hours: Option<GoogleOpeningHours>,
    pub photos: Option<Vec<GooglePhoto>>,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct GoogleGeometry {
    pub location: GoogleLocation,
}

#[derive(Debug, Clone, Copy, Deserialize, Serialize)]
pub struct GoogleLocation {
    pub lat: f64,
    pub lng: f64,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct GoogleOpeningHours {
    pub open_now: Option<bool>,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct GooglePhoto {
    pub photo_reference: String,
}

/// Google Places API client
/// DOCUMENTATION: Holds the HTTP client and API key; no caching here
pub struct GooglePlacesClient {
    client: Client,
    api_key: String,
    /// Places API (New)
    base_url: String,
    /// Legacy endpoints (nearby search)
    legacy_base_url: String,
}

impl GooglePlacesClient {
    pub fn new(api_key: String, timeout: Duration) -> Self {
        let client = Client::builder().timeout(timeout).build().unwrap_or_else(|e| {
            log::warn!("Falling back to default HTTP client: {}", e);
            Client::new()
        });

        Self {
            client,
            api_key,
            base_url: "https://places.googleapis.com/v1".to_string(),
            legacy_base_url: "https://maps.googleapis.com/maps/api/place".to_string(),
        }
    }

    pub fn has_api_key(&self) -> bool {
        !self.api_key.is_empty()
    }

    fn map_status_error(status: StatusCode, body: String) -> TripError {
        if status == StatusCode::TOO_MANY_REQUESTS {
            log::error!("Google Places API quota exceeded");
            return TripError::RateLimitExceeded;
        }
        log::error!("Google Places API error {}: {}", status, body);
        TripError::ExternalApiError(format!("API error {}: {}", status, body))
    }
}

#[async_trait]
impl PlaceSearch for GooglePlacesClient {
    async fn search_text(&self, text_query: &str) -> Result<TextSearchResponse, TripError> {
        if !self.has_api_key() {
            return Err(TripError::ExternalApiError(
                "Google Places API key not configured".to_string(),
            ));
        }

        let url = format!("{}/places:searchText", self.base_url);
        log::debug!("Google Places text search: {}", text_query);

        let response = self
            .client
            .post(&url)
            .header("X-Goog-Api-Key", &self.api_key)
            .header("X-Goog-FieldMask", TEXT_SEARCH_FIELD_MASK)
            .json(&serde_json::json!({ "textQuery": text_query }))
            .send()
            .await
            .map_err(|e| {
                log::error!("Google Places text search failed: {}", e);
                TripError::ExternalApiError(format!("Request failed: {}", e))
            })?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            return Err(Self::map_status_error(status, body));
        }

        let parsed: TextSearchResponse = response.json().await.map_err(|e| {
            log::error!("Failed to parse Google Places response: {}", e);
            TripError::ExternalApiError(format!("Parse error: {}", e))
        })?;

        log::info!(
            "Google Places text search for '{}' returned {} places",
            text_query,
            parsed.places.len()
        );
        Ok(parsed)
    }

    async fn nearby_search(
        &self,
        center: Coordinates,
        radius_m: u32,
        place_type: &str,
    ) -> Result<Vec<NearbyPlace>, TripError> {
        if !self.has_api_key() {
            return Err(TripError::ExternalApiError(
                "Google Places API key not configured".to_string(),
            ));
        }

        let url = format!("{}/nearbysearch/json", self.legacy_base_url);
        let params = [
            ("location", format!("{},{}", center.lat, center.lng)),
            ("radius", radius_m.to_string()),
            ("type", place_type.to_string()),
            ("key", self.api_key.clone()),
        ];

        log::debug!(
            "Google Places nearby search: lat={}, lng={}, radius={}, type={}",
            center.lat,
            center.lng,
            radius_m,
            place_type
        );

        let response = self
            .client
            .get(&url)
            .query(&params)
            .send()
            .await
            .map_err(|e| {
                log::error!("Google Places nearby search failed: {}", e);
                TripError::ExternalApiError(format!("Request failed: {}", e))
            })?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            return Err(Self::map_status_error(status, body));
        }

        let api_response: NearbySearchResponse = response.json().await.map_err(|e| {
            log::error!("Failed to parse Google Places response: {}", e);
            TripError::ExternalApiError(format!("Parse error: {}", e))
        })?;

        match api_response.status.as_str() {
            "OK" | "ZERO_RESULTS" => Ok(api_response.results),
            "OVER_QUERY_LIMIT" => {
                log::error!("Google Places API quota exceeded");
                Err(TripError::RateLimitExceeded)
            }
            other => {
                let msg = api_response
                    .error_message
                    .unwrap_or_else(|| format!("Unknown status: {}", other));
                log::error!("Google Places API unexpected status: {}", msg);
                Err(TripError::ExternalApiError(msg))
            }
        }
    }

    fn is_configured(&self) -> bool {
        self.has_api_key()
    }

    fn photo_media_url(&self, photo_name: &str) -> String {
        format!(
            "{}/{}/media?maxHeightPx=1000&maxWidthPx=1000&key={}",
            self.base_url, photo_name, self.api_key
        )
    }
}
