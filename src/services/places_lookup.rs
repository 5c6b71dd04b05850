// src/services/places_lookup.rs
// DOCUMENTATION: Cached front for the Places API
// PURPOSE: One network call per query per freshness window, counted for quota tracking

use crate::errors::TripError;
use crate::models::Coordinates;
use crate::services::cache::{CacheStats, Sweepable, TtlCache};
use crate::services::google_places_client::{NearbyPlace, PlaceSearch, TextSearchResponse};
use crate::services::usage::{ApiCall, ApiUsageMonitor};
use async_trait::async_trait;
use governor::{DefaultDirectRateLimiter, Quota, RateLimiter};
use std::num::NonZeroU32;
use std::sync::Arc;
use std::time::Duration;

/// Places Lookup Client
/// DOCUMENTATION: Constructed once at startup and shared. Caches full text-search
/// responses keyed by the exact query string; failures are returned to the caller
/// and never cached or retried.
pub struct PlacesLookupClient {
    search: Arc<dyn PlaceSearch>,
    responses: TtlCache<Arc<TextSearchResponse>>,
    photo_urls: TtlCache<String>,
    nearby: TtlCache<Arc<Vec<NearbyPlace>>>,
    usage: Arc<ApiUsageMonitor>,
    limiter: Option<DefaultDirectRateLimiter>,
}

impl PlacesLookupClient {
    pub fn new(search: Arc<dyn PlaceSearch>, usage: Arc<ApiUsageMonitor>, ttl: Duration) -> Self {
        Self {
            search,
            responses: TtlCache::new("place-details", ttl),
            photo_urls: TtlCache::new("place-photos", ttl),
            nearby: TtlCache::new("nearby-search", ttl),
            usage,
            limiter: None,
        }
    }

    /// Pace outbound calls; queued callers wait instead of failing
    pub fn with_rate_limit(mut self, requests_per_second: u32) -> Self {
        let per_second = NonZeroU32::new(requests_per_second).unwrap_or(NonZeroU32::MIN);
        self.limiter = Some(RateLimiter::direct(Quota::per_second(per_second)));
        self
    }

    /// Pace and count a call that is about to go out
    async fn before_network_call(&self, call: ApiCall) -> Result<(), TripError> {
        if !self.search.is_configured() {
            return Err(TripError::ExternalApiError(
                "Google Places API key not configured".to_string(),
            ));
        }
        if let Some(limiter) = &self.limiter {
            limiter.until_ready().await;
        }
        self.usage.track_request(call);
        Ok(())
    }

    /// Fresh cached response for a query, without touching the network
    pub async fn cached(&self, text_query: &str) -> Option<Arc<TextSearchResponse>> {
        self.responses.get(text_query).await
    }

    /// Text search through the cache
    pub async fn lookup(&self, text_query: &str) -> Result<Arc<TextSearchResponse>, TripError> {
        if let Some(hit) = self.responses.get(text_query).await {
            return Ok(hit);
        }

        self.before_network_call(ApiCall::PlaceDetails).await?;
        let response = Arc::new(self.search.search_text(text_query).await?);
        self.responses
            .set(text_query.to_string(), response.clone())
            .await;
        Ok(response)
    }

    /// Media URL for a photo reference, memoized per reference
    pub async fn photo_url(&self, photo_name: &str) -> String {
        if let Some(url) = self.photo_urls.get(photo_name).await {
            return url;
        }

        self.usage.track_request(ApiCall::PlacePhotos);
        let url = self.search.photo_media_url(photo_name);
        self.photo_urls.set(photo_name.to_string(), url.clone()).await;
        url
    }

    /// Nearby search through the cache, keyed by the rounded center
    pub async fn nearby(
        &self,
        center: Coordinates,
        radius_m: u32,
        place_type: &str,
    ) -> Result<Arc<Vec<NearbyPlace>>, TripError> {
        let key = TtlCache::<()>::point_key(place_type, center.lat, center.lng, radius_m);
        if let Some(hit) = self.nearby.get(&key).await {
            return Ok(hit);
        }

        self.before_network_call(ApiCall::NearbySearch).await?;
        let results = Arc::new(self.search.nearby_search(center, radius_m, place_type).await?);
        self.nearby.set(key, results.clone()).await;
        Ok(results)
    }

    pub fn usage(&self) -> &ApiUsageMonitor {
        &self.usage
    }

    pub async fn cache_stats(&self) -> Vec<CacheStats> {
        vec![
            self.responses.stats().await,
            self.photo_urls.stats().await,
            self.nearby.stats().await,
        ]
    }

    pub async fn clear(&self) {
        self.responses.clear().await;
        self.photo_urls.clear().await;
        self.nearby.clear().await;
    }
}

#[async_trait]
impl Sweepable for PlacesLookupClient {
    async fn sweep(&self) {
        self.responses.cleanup().await;
        self.photo_urls.cleanup().await;
        self.nearby.cleanup().await;
    }
}
