// src/services/marker_builder.rs
// DOCUMENTATION: Geospatial aggregation of trip entities into map markers
// PURPOSE: Flatten hotels, itinerary places and food into positioned markers, and
// compute the camera targets the map needs

use crate::models::{
    value_text, Coordinates, Marker, MarkerCategory, MarkerDetails, Trip, Viewport,
    ViewportBounds, MAX_TRIP_DAYS,
};
use crate::services::coordinates::Locatable;
use std::collections::{BTreeSet, HashSet};

/// Zoom used when the trip has at least one marker
pub const TRIP_ZOOM: f64 = 10.0;
/// Zoom used when there is nothing to show
pub const WORLD_ZOOM: f64 = 2.0;
/// Zoom when focusing one itinerary day
pub const DAY_FOCUS_ZOOM: f64 = 13.0;
/// Zoom when focusing one marker
pub const MARKER_FOCUS_ZOOM: f64 = 15.0;

/// Days synthesized when the trip does not say how long it is
const DEFAULT_SAMPLE_DAYS: u32 = 3;
const SAMPLE_PLACES_PER_DAY: u32 = 3;
const SAMPLE_FOOD_PER_DAY: u32 = 2;

/// Category and day filters applied before clustering
/// DOCUMENTATION: Essentials (day 0) are never filtered by day; they are shown
/// whenever they are requested.
#[derive(Debug, Clone)]
pub struct MarkerFilter {
    pub show_hotels: bool,
    pub show_places: bool,
    pub show_food: bool,
    /// Single active day; other days hidden
    pub day: Option<u32>,
    /// Days toggled on; `None` means all
    pub visible_days: Option<HashSet<u32>>,
}

impl Default for MarkerFilter {
    fn default() -> Self {
        Self {
            show_hotels: true,
            show_places: true,
            show_food: true,
            day: None,
            visible_days: None,
        }
    }
}

impl MarkerFilter {
    pub fn allows(&self, marker: &Marker) -> bool {
        let category_on = match marker.category {
            MarkerCategory::Hotel => self.show_hotels,
            MarkerCategory::Place => self.show_places,
            MarkerCategory::Food => self.show_food,
            _ => return true,
        };
        if !category_on {
            return false;
        }
        if self.day.is_some_and(|day| day != marker.day) {
            return false;
        }
        self.visible_days
            .as_ref()
            .map_or(true, |days| days.contains(&marker.day))
    }

    pub fn apply(&self, markers: &[Marker]) -> Vec<Marker> {
        markers.iter().filter(|m| self.allows(m)).cloned().collect()
    }
}

/// Geospatial aggregator
pub struct MarkerBuilder;

impl MarkerBuilder {
    /// Build the marker set for a trip
    /// DOCUMENTATION: Entities without extractable coordinates are skipped. When no
    /// entity is mappable and the trip names a destination, a deterministic sample
    /// layout around the destination (or `default_center`) is returned instead,
    /// every marker flagged `synthetic`.
    pub fn build_markers(trip: &Trip, default_center: Coordinates) -> Vec<Marker> {
        let mut markers = Vec::new();
        let data = &trip.trip_data;

        for (index, hotel) in data.hotels.indexed() {
            let Some(coords) = hotel.coordinates() else {
                continue;
            };
            markers.push(Self::marker(
                format!("hotel-{}", index),
                coords,
                hotel.hotel_name.clone().unwrap_or_default(),
                MarkerCategory::Hotel,
                index as u32 + 1,
                MarkerDetails {
                    address: hotel.hotel_address.clone(),
                    details: hotel.description.as_ref().and_then(value_text),
                    price: hotel.price.as_ref().and_then(value_text),
                    rating: hotel.rating.as_ref().and_then(value_text),
                    image: hotel.image.clone(),
                    ..Default::default()
                },
            ));
        }

        for (day_index, day_plan) in data.itinerary.indexed() {
            let day = day_index as u32 + 1;
            for (place_index, place) in day_plan.plan.indexed() {
                let Some(coords) = place.coordinates() else {
                    continue;
                };
                markers.push(Self::marker(
                    format!("place-{}-{}", day, place_index),
                    coords,
                    place.place_name.clone().unwrap_or_default(),
                    MarkerCategory::Place,
                    day,
                    MarkerDetails {
                        details: place.place_details.as_ref().and_then(value_text),
                        time: place.time.as_ref().and_then(value_text),
                        ticket_pricing: place.ticket_pricing.as_ref().and_then(value_text),
                        image: place.image.clone(),
                        ..Default::default()
                    },
                ));
            }
        }

        for (index, food) in data.food_places.indexed() {
            let day = food.day_number();
            let Some(coords) = food.coordinates() else {
                continue;
            };
            markers.push(Self::marker(
                format!("food-{}-{}", day, index),
                coords,
                food.display_name().unwrap_or_default().to_string(),
                MarkerCategory::Food,
                day,
                MarkerDetails {
                    details: food
                        .description
                        .as_ref()
                        .and_then(value_text)
                        .or_else(|| food.details.as_ref().and_then(value_text)),
                    time: food.time.as_ref().and_then(value_text),
                    price: food
                        .price_range
                        .as_ref()
                        .or(food.price.as_ref())
                        .and_then(value_text),
                    cuisine: food.cuisine.as_ref().and_then(value_text),
                    image: food.image.clone(),
                    ..Default::default()
                },
            ));
        }

        if markers.is_empty() && trip.destination_label().is_some() {
            let center = trip
                .user_selection
                .location
                .as_ref()
                .and_then(|location| location.coordinates())
                .unwrap_or(default_center);
            let days = trip
                .user_selection
                .no_of_days
                .filter(|days| *days > 0)
                .unwrap_or(DEFAULT_SAMPLE_DAYS)
                .min(MAX_TRIP_DAYS);

            log::debug!(
                "Trip {} has no mappable entities; synthesizing {} sample days",
                trip.id,
                days
            );
            return Self::sample_markers(center, days);
        }

        markers
    }

    fn marker(
        id: String,
        coords: Coordinates,
        name: String,
        category: MarkerCategory,
        day: u32,
        details: MarkerDetails,
    ) -> Marker {
        Marker {
            id,
            latitude: coords.lat,
            longitude: coords.lng,
            name,
            category,
            day,
            synthetic: false,
            details,
        }
    }

    /// Deterministic spiral offset from `center` for the nth sample of a day
    pub fn spiral_point(center: Coordinates, day: u32, index: u32) -> Coordinates {
        let angle = index as f64 * 0.5 + day as f64 * 0.8;
        let radius = 0.01 + 0.005 * index as f64 + 0.01 * day as f64;
        let lat = (center.lat + radius * angle.cos()).clamp(-90.0, 90.0);
        let lng = center.lng + radius * angle.sin();
        // wrap rather than clamp so points near the antimeridian stay on the spiral
        let lng = if (-180.0..=180.0).contains(&lng) {
            lng
        } else {
            (lng + 180.0).rem_euclid(360.0) - 180.0
        };
        Coordinates { lat, lng }
    }

    /// One hotel, three places and two restaurants per day; callers bound `days`
    fn sample_markers(center: Coordinates, days: u32) -> Vec<Marker> {
        let per_day = (1 + SAMPLE_PLACES_PER_DAY + SAMPLE_FOOD_PER_DAY) as usize;
        let mut markers = Vec::with_capacity(per_day * days as usize);

        for day in 1..=days {
            markers.push(Self::sample(
                format!("sample-hotel-{}", day),
                Self::spiral_point(center, day, 0),
                format!("Hotel for Day {}", day),
                MarkerCategory::Hotel,
                day,
                MarkerDetails {
                    address: Some(format!("Sample Address {}", day)),
                    price: Some("$150".to_string()),
                    rating: Some("4.5".to_string()),
                    ..Default::default()
                },
            ));

            for i in 1..=SAMPLE_PLACES_PER_DAY {
                markers.push(Self::sample(
                    format!("sample-place-{}-{}", day, i),
                    Self::spiral_point(center, day, i),
                    format!("Sample Place {} on Day {}", i, day),
                    MarkerCategory::Place,
                    day,
                    MarkerDetails {
                        details: Some("This is a sample place for demonstration".to_string()),
                        time: Some(format!("{}:00", 10 + i)),
                        ticket_pricing: Some(if i % 2 == 0 { "Free" } else { "$20" }.to_string()),
                        ..Default::default()
                    },
                ));
            }

            for i in 1..=SAMPLE_FOOD_PER_DAY {
                let even = i % 2 == 0;
                markers.push(Self::sample(
                    format!("sample-food-{}-{}", day, i),
                    Self::spiral_point(center, day, i + SAMPLE_PLACES_PER_DAY),
                    format!("Restaurant {} on Day {}", i, day),
                    MarkerCategory::Food,
                    day,
                    MarkerDetails {
                        details: Some("Delicious food for your trip".to_string()),
                        time: Some(format!("{}:00", 12 + i)),
                        price: Some(if even { "$$ · Moderate" } else { "$$$ · Expensive" }.to_string()),
                        cuisine: Some(if even { "Italian" } else { "Local Cuisine" }.to_string()),
                        ..Default::default()
                    },
                ));
            }
        }

        markers
    }

    fn sample(
        id: String,
        coords: Coordinates,
        name: String,
        category: MarkerCategory,
        day: u32,
        details: MarkerDetails,
    ) -> Marker {
        Marker {
            synthetic: true,
            ..Self::marker(id, coords, name, category, day, details)
        }
    }

    /// Arithmetic mean of marker positions
    pub fn center(markers: &[Marker]) -> Option<Coordinates> {
        if markers.is_empty() {
            return None;
        }
        let n = markers.len() as f64;
        let lat = markers.iter().map(|m| m.latitude).sum::<f64>() / n;
        let lng = markers.iter().map(|m| m.longitude).sum::<f64>() / n;
        Coordinates::new(lat, lng)
    }

    /// Initial camera: mean center at trip zoom, else the whole world
    pub fn initial_view(markers: &[Marker]) -> Viewport {
        match Self::center(markers) {
            Some(center) => Viewport {
                center,
                zoom: TRIP_ZOOM,
            },
            None => Viewport {
                center: Coordinates { lat: 0.0, lng: 0.0 },
                zoom: WORLD_ZOOM,
            },
        }
    }

    /// Smallest box containing every marker
    pub fn bounds(markers: &[Marker]) -> Option<ViewportBounds> {
        let first = markers.first()?;
        let mut bounds = ViewportBounds {
            west: first.longitude,
            south: first.latitude,
            east: first.longitude,
            north: first.latitude,
        };
        for marker in &markers[1..] {
            bounds.west = bounds.west.min(marker.longitude);
            bounds.east = bounds.east.max(marker.longitude);
            bounds.south = bounds.south.min(marker.latitude);
            bounds.north = bounds.north.max(marker.latitude);
        }
        Some(bounds)
    }

    /// Fly-to target for one day's markers
    pub fn focus_day(markers: &[Marker], day: u32) -> Option<Viewport> {
        let day_markers: Vec<Marker> = markers.iter().filter(|m| m.day == day).cloned().collect();
        Self::center(&day_markers).map(|center| Viewport {
            center,
            zoom: DAY_FOCUS_ZOOM,
        })
    }

    /// Fly-to target for a single marker
    pub fn focus_marker(markers: &[Marker], marker_id: &str) -> Option<Viewport> {
        markers
            .iter()
            .find(|m| m.id == marker_id)
            .map(|m| Viewport {
                center: m.coordinates(),
                zoom: MARKER_FOCUS_ZOOM,
            })
    }

    /// Distinct itinerary days present, ascending
    pub fn days(markers: &[Marker]) -> Vec<u32> {
        markers
            .iter()
            .map(|m| m.day)
            .filter(|day| *day > 0)
            .collect::<BTreeSet<_>>()
            .into_iter()
            .collect()
    }
}
