// src/services/usage.rs
// DOCUMENTATION: Outbound API request counting
// PURPOSE: Quota observability; bumped once per real network call, never on cache hits

use serde::Serialize;
use std::sync::atomic::{AtomicU64, Ordering};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ApiCall {
    /// Text search (place details + photo references)
    PlaceDetails,
    /// Photo reference to media URL derivation
    PlacePhotos,
    /// Nearby search for essentials
    NearbySearch,
}

impl ApiCall {
    pub fn as_str(self) -> &'static str {
        match self {
            ApiCall::PlaceDetails => "placeDetails",
            ApiCall::PlacePhotos => "placePhotos",
            ApiCall::NearbySearch => "nearbySearch",
        }
    }
}

/// Process-wide request counters
#[derive(Debug, Default)]
pub struct ApiUsageMonitor {
    place_details: AtomicU64,
    place_photos: AtomicU64,
    nearby_search: AtomicU64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct UsageSnapshot {
    pub place_details: u64,
    pub place_photos: u64,
    pub nearby_search: u64,
}

impl UsageSnapshot {
    pub fn total(&self) -> u64 {
        self.place_details + self.place_photos + self.nearby_search
    }
}

impl ApiUsageMonitor {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn track_request(&self, call: ApiCall) {
        let counter = match call {
            ApiCall::PlaceDetails => &self.place_details,
            ApiCall::PlacePhotos => &self.place_photos,
            ApiCall::NearbySearch => &self.nearby_search,
        };
        let count = counter.fetch_add(1, Ordering::Relaxed) + 1;
        log::debug!("API request tracked: {} (total {})", call.as_str(), count);
    }

    pub fn count(&self, call: ApiCall) -> u64 {
        match call {
            ApiCall::PlaceDetails => self.place_details.load(Ordering::Relaxed),
            ApiCall::PlacePhotos => self.place_photos.load(Ordering::Relaxed),
            ApiCall::NearbySearch => self.nearby_search.load(Ordering::Relaxed),
        }
    }

    pub fn snapshot(&self) -> UsageSnapshot {
        UsageSnapshot {
            place_details: self.count(ApiCall::PlaceDetails),
            place_photos: self.count(ApiCall::PlacePhotos),
            nearby_search: self.count(ApiCall::NearbySearch),
        }
    }
}
