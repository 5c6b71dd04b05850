// src/services/coordinates.rs
// DOCUMENTATION: Coordinate extraction from loosely shaped trip entities
// PURPOSE: Turn whatever the model wrote into a validated {lat, lng} or nothing

use crate::models::{Coordinates, Destination, FoodPlace, Hotel, PlanItem};
use serde::Deserialize;
use serde_json::{Map, Value};

/// Keys that may hold a nested coordinate value, tried in order
const NESTED_KEYS: [&str; 6] = [
    "geoCoordinates",
    "geo_coordinates",
    "coordinates",
    "location",
    "geoLocation",
    "geometry",
];

/// A number the model may have written as a string
#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum LooseNumber {
    Number(f64),
    Text(String),
}

impl LooseNumber {
    fn value(&self) -> Option<f64> {
        let parsed = match self {
            LooseNumber::Number(n) => *n,
            LooseNumber::Text(s) => s.trim().parse::<f64>().ok()?,
        };
        parsed.is_finite().then_some(parsed)
    }
}

/// Non-object shapes a coordinate value is known to come in
#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum RawCoordinates {
    /// "12.34,56.78"
    Pair(String),
    /// [12.34, 56.78] as [lat, lng]
    Array([LooseNumber; 2]),
}

impl RawCoordinates {
    fn resolve(&self) -> Option<Coordinates> {
        match self {
            RawCoordinates::Pair(text) => parse_pair(text),
            RawCoordinates::Array([lat, lng]) => Coordinates::new(lat.value()?, lng.value()?),
        }
    }
}

/// Parse "lat,lng"; any unparseable half makes the whole value absent
pub fn parse_pair(text: &str) -> Option<Coordinates> {
    let mut parts = text.split(',');
    let lat = parts.next()?.trim().parse::<f64>().ok()?;
    let lng = parts.next()?.trim().parse::<f64>().ok()?;
    if parts.next().is_some() {
        return None;
    }
    Coordinates::new(lat, lng)
}

/// Extract coordinates from a single JSON value of unknown shape
pub fn from_value(value: &Value) -> Option<Coordinates> {
    match value {
        Value::Object(map) => from_fields(map),
        other => RawCoordinates::deserialize(other).ok()?.resolve(),
    }
}

/// Extract coordinates from an entity's fields
/// DOCUMENTATION: Nested keys first, then lat/lng-style keys on the entity itself.
/// Never fails; malformed data means "not mappable".
pub fn from_fields(fields: &Map<String, Value>) -> Option<Coordinates> {
    for key in NESTED_KEYS {
        if let Some(found) = fields.get(key).and_then(from_value) {
            return Some(found);
        }
    }

    let latitude = fields.get("latitude").or_else(|| fields.get("lat"))?;
    let longitude = fields
        .get("longitude")
        .or_else(|| fields.get("lng"))
        .or_else(|| fields.get("lon"))?;
    let lat = LooseNumber::deserialize(latitude).ok()?.value()?;
    let lng = LooseNumber::deserialize(longitude).ok()?.value()?;
    Coordinates::new(lat, lng)
}

/// Trip entities that can be placed on the map
pub trait Locatable {
    /// The dedicated `geoCoordinates` field, if the entity has one
    fn geo_field(&self) -> Option<&Value> {
        None
    }

    /// Remaining untyped fields
    fn fields(&self) -> &Map<String, Value>;

    fn coordinates(&self) -> Option<Coordinates> {
        self.geo_field()
            .and_then(from_value)
            .or_else(|| from_fields(self.fields()))
    }

    fn has_coordinates(&self) -> bool {
        self.coordinates().is_some()
    }
}

impl Locatable for Hotel {
    fn geo_field(&self) -> Option<&Value> {
        self.geo_coordinates.as_ref()
    }

    fn fields(&self) -> &Map<String, Value> {
        &self.extra
    }
}

impl Locatable for PlanItem {
    fn geo_field(&self) -> Option<&Value> {
        self.geo_coordinates.as_ref()
    }

    fn fields(&self) -> &Map<String, Value> {
        &self.extra
    }
}

impl Locatable for FoodPlace {
    fn geo_field(&self) -> Option<&Value> {
        self.geo_coordinates.as_ref()
    }

    fn fields(&self) -> &Map<String, Value> {
        &self.extra
    }
}

impl Locatable for Destination {
    fn fields(&self) -> &Map<String, Value> {
        &self.extra
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn hotel(value: Value) -> Hotel {
        serde_json::from_value(value).unwrap()
    }

    #[test]
    fn test_pair_string() {
        let h = hotel(json!({ "geoCoordinates": "12.34,56.78" }));
        assert_eq!(
            h.coordinates(),
            Some(Coordinates { lat: 12.34, lng: 56.78 })
        );
    }

    #[test]
    fn test_pair_string_with_garbage_is_absent() {
        let h = hotel(json!({ "geoCoordinates": "not-a-number,56.78" }));
        assert_eq!(h.coordinates(), None);

        // partially parseable halves are rejected too
        assert_eq!(parse_pair("12.34abc,56.78"), None);
        assert_eq!(parse_pair("12.34"), None);
        assert_eq!(parse_pair("1,2,3"), None);
        assert_eq!(parse_pair(" 12.5 , -3.25 "), Coordinates::new(12.5, -3.25));
    }

    #[test]
    fn test_object_shapes() {
        let h = hotel(json!({ "geoCoordinates": { "latitude": 40.0, "longitude": -73.0 } }));
        assert_eq!(h.coordinates(), Coordinates::new(40.0, -73.0));

        let h = hotel(json!({ "geoCoordinates": { "lat": "40.5", "lng": "-73.5" } }));
        assert_eq!(h.coordinates(), Coordinates::new(40.5, -73.5));

        let h = hotel(json!({ "geoCoordinates": [48.85, 2.35] }));
        assert_eq!(h.coordinates(), Coordinates::new(48.85, 2.35));
    }

    #[test]
    fn test_top_level_keys() {
        let h = hotel(json!({ "hotelName": "A", "latitude": "35.6", "longitude": 139.7 }));
        assert_eq!(h.coordinates(), Coordinates::new(35.6, 139.7));

        let h = hotel(json!({ "lat": 1.5, "lon": 2.5 }));
        assert_eq!(h.coordinates(), Coordinates::new(1.5, 2.5));
    }

    #[test]
    fn test_geometry_location() {
        let h = hotel(json!({ "geometry": { "location": { "lat": 10.0, "lng": 20.0 } } }));
        assert_eq!(h.coordinates(), Coordinates::new(10.0, 20.0));
        assert_eq!(
            from_value(&json!({ "location": { "latitude": 10.0, "longitude": 20.0 } })),
            Coordinates::new(10.0, 20.0)
        );
    }

    #[test]
    fn test_falls_through_malformed_geo_field() {
        let h = hotel(json!({ "geoCoordinates": "unknown", "lat": 3.0, "lng": 4.0 }));
        assert_eq!(h.coordinates(), Coordinates::new(3.0, 4.0));
    }

    #[test]
    fn test_missing_and_nonsense() {
        assert_eq!(hotel(json!({})).coordinates(), None);
        assert_eq!(hotel(json!({ "geoCoordinates": null })).coordinates(), None);
        assert_eq!(hotel(json!({ "geoCoordinates": true })).coordinates(), None);
        assert_eq!(hotel(json!({ "lat": "NaN", "lng": 1.0 })).coordinates(), None);
        assert_eq!(hotel(json!({ "geoCoordinates": "95.0,10.0" })).coordinates(), None);
    }
}
