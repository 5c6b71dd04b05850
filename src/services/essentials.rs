// src/services/essentials.rs
// DOCUMENTATION: Nearby essentials around a point
// PURPOSE: Hospitals, ATMs, currency exchange and restaurants as day-0 markers

use crate::errors::TripError;
use crate::models::{Coordinates, Marker, MarkerCategory, MarkerDetails};
use crate::services::places_lookup::PlacesLookupClient;
use serde::{Deserialize, Serialize};
use std::str::FromStr;
use std::sync::Arc;

pub const ESSENTIALS_RADIUS_M: u32 = 5000;
pub const ESSENTIALS_LIMIT: usize = 5;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EssentialKind {
    Hospital,
    Atm,
    Exchange,
    Restaurant,
}

impl EssentialKind {
    pub const ALL: [EssentialKind; 4] = [
        EssentialKind::Hospital,
        EssentialKind::Atm,
        EssentialKind::Exchange,
        EssentialKind::Restaurant,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            EssentialKind::Hospital => "hospital",
            EssentialKind::Atm => "atm",
            EssentialKind::Exchange => "exchange",
            EssentialKind::Restaurant => "restaurant",
        }
    }

    /// Place type understood by the nearby search endpoint
    pub fn google_type(self) -> &'static str {
        match self {
            EssentialKind::Exchange => "currency_exchange",
            other => other.as_str(),
        }
    }

    pub fn category(self) -> MarkerCategory {
        match self {
            EssentialKind::Hospital => MarkerCategory::Hospital,
            EssentialKind::Atm => MarkerCategory::Atm,
            EssentialKind::Exchange => MarkerCategory::Exchange,
            EssentialKind::Restaurant => MarkerCategory::Restaurant,
        }
    }
}

impl FromStr for EssentialKind {
    type Err = TripError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        EssentialKind::ALL
            .into_iter()
            .find(|k| k.as_str().eq_ignore_ascii_case(s.trim()))
            .ok_or_else(|| {
                TripError::InvalidInput(format!(
                    "Unknown essentials kind '{}'; expected hospital, atm, exchange or restaurant",
                    s
                ))
            })
    }
}

pub struct EssentialsService {
    lookup: Arc<PlacesLookupClient>,
}

impl EssentialsService {
    pub fn new(lookup: Arc<PlacesLookupClient>) -> Self {
        Self { lookup }
    }

    /// Up to five places of one kind within 5 km of `center`
    /// DOCUMENTATION: Lookup failures are logged and yield an empty list.
    pub async fn nearby(&self, center: Coordinates, kind: EssentialKind) -> Vec<Marker> {
        let places = match self
            .lookup
            .nearby(center, ESSENTIALS_RADIUS_M, kind.google_type())
            .await
        {
            Ok(places) => places,
            Err(e) => {
                log::warn!(
                    "Nearby {} search failed at {},{}: {}",
                    kind.as_str(),
                    center.lat,
                    center.lng,
                    e
                );
                return Vec::new();
            }
        };

        places
            .iter()
            .filter_map(|place| {
                let location = &place.geometry.location;
                let coords = Coordinates::new(location.lat, location.lng)?;
                Some((place, coords))
            })
            .take(ESSENTIALS_LIMIT)
            .enumerate()
            .map(|(index, (place, coords))| Marker {
                id: format!(
                    "{}-{}",
                    kind.as_str(),
                    place.place_id.clone().unwrap_or_else(|| index.to_string())
                ),
                latitude: coords.lat,
                longitude: coords.lng,
                name: place.name.clone(),
                category: kind.category(),
                day: 0,
                synthetic: false,
                details: MarkerDetails {
                    address: place.vicinity.clone(),
                    details: place.vicinity.clone(),
                    rating: place.rating.map(|r| r.to_string()),
                    ..Default::default()
                },
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::services::testing::FakePlaceSearch;
    use crate::services::usage::ApiUsageMonitor;
    use std::time::Duration;

    fn service(fake: FakePlaceSearch) -> EssentialsService {
        let lookup = PlacesLookupClient::new(
            Arc::new(fake),
            Arc::new(ApiUsageMonitor::new()),
            Duration::from_secs(60),
        );
        EssentialsService::new(Arc::new(lookup))
    }

    #[tokio::test]
    async fn test_limits_to_five_day_zero_markers() {
        let mut fake = FakePlaceSearch::new();
        for i in 0..7 {
            fake = fake.with_nearby(&format!("Clinic {}", i), 40.0 + i as f64 * 0.001, -3.7);
        }
        let essentials = service(fake);
        let center = Coordinates::new(40.0, -3.7).unwrap();

        let markers = essentials.nearby(center, EssentialKind::Hospital).await;
        assert_eq!(markers.len(), 5);
        assert!(markers.iter().all(|m| m.day == 0 && m.category == MarkerCategory::Hospital));
        assert_eq!(markers[0].id, "hospital-nearby-Clinic 0");
    }

    #[tokio::test]
    async fn test_failure_is_empty() {
        let essentials = service(FakePlaceSearch::new().failing());
        let center = Coordinates::new(40.0, -3.7).unwrap();
        assert!(essentials.nearby(center, EssentialKind::Atm).await.is_empty());
    }

    #[test]
    fn test_kind_parsing() {
        assert_eq!("ATM".parse::<EssentialKind>().unwrap(), EssentialKind::Atm);
        assert_eq!(EssentialKind::Exchange.google_type(), "currency_exchange");
        assert!("bakery".parse::<EssentialKind>().is_err());
    }
}
