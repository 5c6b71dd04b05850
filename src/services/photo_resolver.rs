// src/services/photo_resolver.rs
// DOCUMENTATION: Photo Resolution Cache
// PURPOSE: Place name -> photo URL, plus the location found by the same lookup

use crate::models::Coordinates;
use crate::services::cache::{CacheStats, Sweepable, TtlCache};
use crate::services::google_places_client::TextSearchResponse;
use crate::services::places_lookup::PlacesLookupClient;
use async_trait::async_trait;
use serde::Serialize;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::RwLock;

/// Image shown wherever a photo could not be resolved
pub const PLACEHOLDER_IMAGE: &str = "/placeholder.jpg";

/// Outcome of resolving one place name
/// DOCUMENTATION: Carries the location from the same response the photo came from,
/// so coordinate backfill never has to guess which lookup finished last.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PhotoResolution {
    pub photo_url: Option<String>,
    pub location: Option<Coordinates>,
}

pub struct PhotoResolver {
    lookup: Arc<PlacesLookupClient>,
    photos: TtlCache<String>,
    last_response: RwLock<Option<Arc<TextSearchResponse>>>,
}

impl PhotoResolver {
    pub fn new(lookup: Arc<PlacesLookupClient>, ttl: Duration) -> Self {
        Self {
            lookup,
            photos: TtlCache::new("photo-urls", ttl),
            last_response: RwLock::new(None),
        }
    }

    /// Resolve a photo URL and location for a place name
    /// DOCUMENTATION: Never fails. Lookup errors and empty results read as "no photo";
    /// only positive results are cached so a later attempt can still succeed.
    pub async fn resolve(&self, place_name: &str) -> PhotoResolution {
        let place_name = place_name.trim();
        if place_name.is_empty() {
            return PhotoResolution::default();
        }

        if let Some(photo_url) = self.photos.get(place_name).await {
            let location = self
                .lookup
                .cached(place_name)
                .await
                .and_then(|response| response.first_place().and_then(|p| p.coordinates()));
            return PhotoResolution {
                photo_url: Some(photo_url),
                location,
            };
        }

        let response = match self.lookup.lookup(place_name).await {
            Ok(response) => response,
            Err(e) => {
                log::warn!("Photo lookup failed for '{}': {}", place_name, e);
                return PhotoResolution::default();
            }
        };
        *self.last_response.write().await = Some(response.clone());

        let Some(place) = response.first_place() else {
            log::debug!("No places found for '{}'", place_name);
            return PhotoResolution::default();
        };

        let location = place.coordinates();
        let photo_url = match place.photos.first() {
            Some(photo) => {
                let url = self.lookup.photo_url(&photo.name).await;
                self.photos.set(place_name.to_string(), url.clone()).await;
                Some(url)
            }
            None => {
                log::debug!("Place '{}' has no photos", place_name);
                None
            }
        };

        PhotoResolution {
            photo_url,
            location,
        }
    }

    /// Photo URL only
    pub async fn resolve_photo(&self, place_name: &str) -> Option<String> {
        self.resolve(place_name).await.photo_url
    }

    /// Most recent raw lookup response, whichever request produced it
    pub async fn last_response(&self) -> Option<Arc<TextSearchResponse>> {
        self.last_response.read().await.clone()
    }

    pub async fn stats(&self) -> CacheStats {
        self.photos.stats().await
    }

    pub async fn clear(&self) {
        self.photos.clear().await;
        *self.last_response.write().await = None;
    }
}

#[async_trait]
impl Sweepable for PhotoResolver {
    async fn sweep(&self) {
        self.photos.cleanup().await;
    }
}
