// src/models/marker.rs
// DOCUMENTATION: Map-facing data structures
// PURPOSE: Coordinates, markers, categories and viewport state derived from trips

use serde::{Deserialize, Serialize};

/// A validated geographic position
/// DOCUMENTATION: Both components are always finite and within WGS84 ranges;
/// construct through `Coordinates::new` to keep that true.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Coordinates {
    pub lat: f64,
    pub lng: f64,
}

impl Coordinates {
    pub fn new(lat: f64, lng: f64) -> Option<Self> {
        let valid = lat.is_finite()
            && lng.is_finite()
            && (-90.0..=90.0).contains(&lat)
            && (-180.0..=180.0).contains(&lng);
        valid.then_some(Self { lat, lng })
    }

    /// "lat,lng", the layout trip documents use for `geoCoordinates`
    pub fn to_pair_string(&self) -> String {
        format!("{},{}", self.lat, self.lng)
    }
}

impl From<Coordinates> for geo_types::Point<f64> {
    fn from(c: Coordinates) -> Self {
        geo_types::Point::new(c.lng, c.lat)
    }
}

/// Marker categories
/// DOCUMENTATION: Trip entities (hotel, place, food) plus nearby-essential kinds
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MarkerCategory {
    Hotel,
    Place,
    Food,
    Hospital,
    Atm,
    Exchange,
    Restaurant,
}

/// Static style entry shared by marker and legend rendering
#[derive(Debug, Clone, Copy, Serialize)]
pub struct CategoryStyle {
    pub category: MarkerCategory,
    pub label: &'static str,
    pub color: &'static str,
    pub glyph: &'static str,
}

impl MarkerCategory {
    pub const ALL: [MarkerCategory; 7] = [
        MarkerCategory::Hotel,
        MarkerCategory::Place,
        MarkerCategory::Food,
        MarkerCategory::Hospital,
        MarkerCategory::Atm,
        MarkerCategory::Exchange,
        MarkerCategory::Restaurant,
    ];

    pub fn style(self) -> CategoryStyle {
        let (label, color, glyph) = match self {
            MarkerCategory::Hotel => ("Hotels", "#2196F3", "home"),
            MarkerCategory::Place => ("Attractions", "#4CAF50", "location-marker"),
            MarkerCategory::Food => ("Food", "#FF5252", "restaurant"),
            MarkerCategory::Hospital => ("Hospitals", "#673AB7", "local-hospital"),
            MarkerCategory::Atm => ("ATMs", "#FFC107", "local-atm"),
            MarkerCategory::Exchange => ("Currency Exchange", "#009688", "currency-exchange"),
            MarkerCategory::Restaurant => ("Places to Eat", "#FF9800", "local-dining"),
        };
        CategoryStyle {
            category: self,
            label,
            color,
            glyph,
        }
    }

    /// Draw order on the map; hotels sit on top
    pub fn z_index(self) -> u8 {
        match self {
            MarkerCategory::Hotel => 3,
            MarkerCategory::Food => 2,
            _ => 1,
        }
    }
}

/// Per-day palette, cycled for trips longer than the table
pub const DAY_COLORS: [&str; 15] = [
    "#FF5252", "#FF9800", "#FFEB3B", "#4CAF50", "#2196F3", "#673AB7", "#F06292", "#009688",
    "#795548", "#607D8B", "#E91E63", "#00BCD4", "#FFC107", "#8BC34A", "#3F51B5",
];

/// Color for a 1-based day; day 0 (essentials) reuses the first entry
pub fn day_color(day: u32) -> &'static str {
    let index = day.saturating_sub(1) as usize % DAY_COLORS.len();
    DAY_COLORS[index]
}

/// Optional display fields carried alongside a marker
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MarkerDetails {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub address: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub details: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub price: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub rating: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub time: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub ticket_pricing: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub cuisine: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub image: Option<String>,
}

/// A positioned, categorized point derived from trip data
/// DOCUMENTATION: Never persisted; recomputed from the trip on every request
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Marker {
    pub id: String,
    pub latitude: f64,
    pub longitude: f64,
    pub name: String,
    pub category: MarkerCategory,
    /// 1-based itinerary day, 0 for nearby essentials
    pub day: u32,
    /// Fabricated placement used only when the trip has no real coordinates
    #[serde(default)]
    pub synthetic: bool,
    #[serde(flatten)]
    pub details: MarkerDetails,
}

impl Marker {
    pub fn coordinates(&self) -> Coordinates {
        Coordinates {
            lat: self.latitude,
            lng: self.longitude,
        }
    }
}

/// Map bounds as [west, south, east, north] in degrees
/// DOCUMENTATION: west > east means the box crosses the antimeridian
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ViewportBounds {
    pub west: f64,
    pub south: f64,
    pub east: f64,
    pub north: f64,
}

impl ViewportBounds {
    pub const WORLD: ViewportBounds = ViewportBounds {
        west: -180.0,
        south: -90.0,
        east: 180.0,
        north: 90.0,
    };

    pub fn contains(&self, c: Coordinates) -> bool {
        let lat_ok = c.lat >= self.south && c.lat <= self.north;
        let lng_ok = if self.west <= self.east {
            c.lng >= self.west && c.lng <= self.east
        } else {
            c.lng >= self.west || c.lng <= self.east
        };
        lat_ok && lng_ok
    }
}

/// Camera target for the map SDK (initial view, fly-to, ease-to)
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Viewport {
    pub center: Coordinates,
    pub zoom: f64,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_coordinates_reject_out_of_range() {
        assert!(Coordinates::new(12.34, 56.78).is_some());
        assert!(Coordinates::new(f64::NAN, 1.0).is_none());
        assert!(Coordinates::new(91.0, 1.0).is_none());
        assert!(Coordinates::new(1.0, f64::INFINITY).is_none());
    }

    #[test]
    fn test_day_color_cycles() {
        assert_eq!(day_color(1), "#FF5252");
        assert_eq!(day_color(16), "#FF5252");
        assert_eq!(day_color(0), "#FF5252");
        assert_eq!(day_color(5), "#2196F3");
    }

    #[test]
    fn test_category_table_is_consistent() {
        for category in MarkerCategory::ALL {
            let style = category.style();
            assert_eq!(style.category, category);
            assert!(style.color.starts_with('#'));
        }
        assert_eq!(MarkerCategory::Hotel.style().color, "#2196F3");
    }

    #[test]
    fn test_bounds_across_antimeridian() {
        let bounds = ViewportBounds {
            west: 170.0,
            south: -10.0,
            east: -170.0,
            north: 10.0,
        };
        assert!(bounds.contains(Coordinates::new(0.0, 175.0).unwrap()));
        assert!(bounds.contains(Coordinates::new(0.0, -175.0).unwrap()));
        assert!(!bounds.contains(Coordinates::new(0.0, 0.0).unwrap()));
    }

    #[test]
    fn test_marker_serializes_flat() {
        let marker = Marker {
            id: "hotel-0".to_string(),
            latitude: 1.0,
            longitude: 2.0,
            name: "Hotel".to_string(),
            category: MarkerCategory::Hotel,
            day: 1,
            synthetic: false,
            details: MarkerDetails {
                price: Some("$100".to_string()),
                ..Default::default()
            },
        };
        let json = serde_json::to_value(&marker).unwrap();
        assert_eq!(json["category"], "hotel");
        assert_eq!(json["price"], "$100");
        assert!(json.get("address").is_none());
    }
}
