// src/models/trip.rs
// DOCUMENTATION: Trip document as persisted in the document store
// PURPOSE: Typed view over AI-generated itinerary JSON that never loses unknown fields

use serde::de::DeserializeOwned;
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use serde_json::{Map, Value};
use validator::Validate;

use super::TravelNote;

/// A generated trip
/// DOCUMENTATION: Created once at generation time, later mutated in place by
/// coordinate backfill and by user-authored notes. Field names follow the stored
/// camelCase document layout.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Trip {
    /// Opaque document id
    #[serde(default)]
    pub id: String,

    /// What the user asked for
    #[serde(default)]
    pub user_selection: UserSelection,

    /// What the model produced
    #[serde(default)]
    pub trip_data: TripData,

    /// Owner (used by queryTripsByOwner)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub user_email: Option<String>,

    /// User-authored notes and checklist items
    #[serde(default, skip_serializing_if = "Vec::is_empty", deserialize_with = "lenient_vec")]
    pub travel_notes: Vec<TravelNote>,

    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

/// Longest trip the planner generates
pub const MAX_TRIP_DAYS: u32 = 30;

/// The trip request form
#[derive(Debug, Clone, Default, Serialize, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct UserSelection {
    /// Destination picked from the autocomplete widget
    #[serde(default, skip_serializing_if = "Option::is_none", deserialize_with = "lenient_option")]
    pub location: Option<Destination>,

    /// Number of days; stored as either a number or a numeric string
    #[serde(default, skip_serializing_if = "Option::is_none", deserialize_with = "lenient_u32")]
    #[validate(range(min = 1, max = 30))]
    pub no_of_days: Option<u32>,

    /// Budget tier label ("Budget Friendly", "Moderate", "Luxury")
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub budget: Option<String>,

    /// Traveler group label
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub traveler: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none", deserialize_with = "lenient_option")]
    pub preferences: Option<TravelPreferences>,

    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

/// Destination as returned by the place autocomplete widget
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Destination {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub label: Option<String>,

    /// Everything else (autocomplete value, optional lat/lng, ...)
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

/// Preference tags grouped the way the form collects them
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TravelPreferences {
    #[serde(default, skip_serializing_if = "Vec::is_empty", deserialize_with = "lenient_vec")]
    pub location_types: Vec<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty", deserialize_with = "lenient_vec")]
    pub learning: Vec<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty", deserialize_with = "lenient_vec")]
    pub activities: Vec<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty", deserialize_with = "lenient_vec")]
    pub relaxation: Vec<String>,

    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl TravelPreferences {
    /// All tags in form order
    pub fn tags(&self) -> Vec<&str> {
        self.location_types
            .iter()
            .chain(&self.learning)
            .chain(&self.activities)
            .chain(&self.relaxation)
            .map(String::as_str)
            .collect()
    }
}

/// Model output
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TripData {
    #[serde(default, skip_serializing_if = "Entries::is_absent")]
    pub hotels: Entries<Hotel>,

    #[serde(default, skip_serializing_if = "Entries::is_absent")]
    pub itinerary: Entries<ItineraryDay>,

    #[serde(default, skip_serializing_if = "Entries::is_absent")]
    pub food_places: Entries<FoodPlace>,

    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Hotel {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub hotel_name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub hotel_address: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub price: Option<Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub rating: Option<Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub image: Option<String>,
    /// "lat,lng" string in most documents; any shape the model chose otherwise
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub geo_coordinates: Option<Value>,

    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ItineraryDay {
    /// Usually "Day 1", sometimes a bare number
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub day: Option<Value>,

    #[serde(default, skip_serializing_if = "Entries::is_absent")]
    pub plan: Entries<PlanItem>,

    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

/// A place to visit within one itinerary day
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PlanItem {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub place_name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub place_details: Option<Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ticket_pricing: Option<Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub transport_cost: Option<Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub time: Option<Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub image: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub geo_coordinates: Option<Value>,

    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FoodPlace {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub restaurant_name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub details: Option<Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub day: Option<Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub time: Option<Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub price_range: Option<Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub price: Option<Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cuisine: Option<Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub image: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub geo_coordinates: Option<Value>,

    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl FoodPlace {
    pub fn display_name(&self) -> Option<&str> {
        self.restaurant_name.as_deref().or(self.name.as_deref())
    }

    /// Itinerary day this food entry belongs to; day 1 when absent or unreadable
    pub fn day_number(&self) -> u32 {
        self.day
            .as_ref()
            .and_then(value_as_u32)
            .filter(|day| *day > 0)
            .unwrap_or(1)
    }
}

impl Trip {
    /// Destination label, if the user picked one
    pub fn destination_label(&self) -> Option<&str> {
        self.user_selection
            .location
            .as_ref()
            .and_then(|location| location.label.as_deref())
            .filter(|label| !label.trim().is_empty())
    }
}

/// Request DTO for storing a freshly generated trip
/// DOCUMENTATION: `trip_data` is the raw model text; it must parse as JSON
#[derive(Debug, Clone, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct CreateTripRequest {
    #[validate]
    pub user_selection: UserSelection,

    #[validate(length(min = 2))]
    pub trip_data: String,

    #[validate(email)]
    pub user_email: Option<String>,
}

/// One element of a model-generated list
#[derive(Debug, Clone, PartialEq)]
pub enum Entry<T> {
    Parsed(T),
    /// Element of an unexpected shape, kept verbatim
    Raw(Value),
}

impl<T: DeserializeOwned> Entry<T> {
    fn from_value(value: Value) -> Self {
        match serde_json::from_value(value.clone()) {
            Ok(parsed) => Entry::Parsed(parsed),
            Err(e) => {
                log::debug!("Keeping malformed trip entry as-is: {}", e);
                Entry::Raw(value)
            }
        }
    }
}

impl<T: Serialize> Serialize for Entry<T> {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        match self {
            Entry::Parsed(item) => item.serialize(serializer),
            Entry::Raw(value) => value.serialize(serializer),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
enum Shape {
    Absent,
    Array,
    /// Not an array at all; written back unchanged
    Other(Value),
}

/// A model-generated list that re-encodes to exactly what was stored
/// DOCUMENTATION: Elements that do not match `T` stay in place as raw JSON, so
/// positions (and the marker ids derived from them) never shift and a write-back
/// loses nothing. Readers only see the parsed elements.
#[derive(Debug, Clone, PartialEq)]
pub struct Entries<T> {
    entries: Vec<Entry<T>>,
    shape: Shape,
}

impl<T> Default for Entries<T> {
    fn default() -> Self {
        Self {
            entries: Vec::new(),
            shape: Shape::Absent,
        }
    }
}

impl<T> Entries<T> {
    /// Parsed elements in stored order
    pub fn iter(&self) -> impl Iterator<Item = &T> {
        self.indexed().map(|(_, item)| item)
    }

    pub fn iter_mut(&mut self) -> impl Iterator<Item = &mut T> {
        self.entries.iter_mut().filter_map(|entry| match entry {
            Entry::Parsed(item) => Some(item),
            Entry::Raw(_) => None,
        })
    }

    /// Parsed elements with their position in the stored list
    pub fn indexed(&self) -> impl Iterator<Item = (usize, &T)> {
        self.entries
            .iter()
            .enumerate()
            .filter_map(|(index, entry)| match entry {
                Entry::Parsed(item) => Some((index, item)),
                Entry::Raw(_) => None,
            })
    }

    /// Parsed element at a stored position
    pub fn get(&self, index: usize) -> Option<&T> {
        match self.entries.get(index)? {
            Entry::Parsed(item) => Some(item),
            Entry::Raw(_) => None,
        }
    }

    /// Stored elements, malformed ones included
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    fn is_absent(&self) -> bool {
        self.shape == Shape::Absent && self.entries.is_empty()
    }
}

impl<T> FromIterator<T> for Entries<T> {
    fn from_iter<I: IntoIterator<Item = T>>(iter: I) -> Self {
        Self {
            entries: iter.into_iter().map(Entry::Parsed).collect(),
            shape: Shape::Array,
        }
    }
}

impl<'de, T: DeserializeOwned> Deserialize<'de> for Entries<T> {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let entries = match Value::deserialize(deserializer)? {
            Value::Array(items) => Self {
                entries: items.into_iter().map(Entry::from_value).collect(),
                shape: Shape::Array,
            },
            other => {
                log::debug!("Expected an array, found {}", other);
                Self {
                    entries: Vec::new(),
                    shape: Shape::Other(other),
                }
            }
        };
        Ok(entries)
    }
}

impl<T: Serialize> Serialize for Entries<T> {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        match &self.shape {
            Shape::Other(value) if self.entries.is_empty() => value.serialize(serializer),
            _ => serializer.collect_seq(&self.entries),
        }
    }
}

/// Render a loosely typed display field ("$150", 150, "4.5", ...) as text
pub fn value_text(value: &Value) -> Option<String> {
    match value {
        Value::String(s) if !s.trim().is_empty() => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        Value::Bool(b) => Some(b.to_string()),
        _ => None,
    }
}

/// Accept 3, 3.0 and "3" alike
pub fn value_as_u32(value: &Value) -> Option<u32> {
    match value {
        Value::Number(n) => n
            .as_u64()
            .or_else(|| n.as_f64().filter(|f| f.fract() == 0.0 && *f >= 0.0).map(|f| f as u64))
            .and_then(|n| u32::try_from(n).ok()),
        Value::String(s) => s.trim().parse().ok(),
        _ => None,
    }
}

fn lenient_u32<'de, D>(deserializer: D) -> Result<Option<u32>, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Option::<Value>::deserialize(deserializer)?;
    Ok(value.as_ref().and_then(value_as_u32))
}

/// Model output is not schema-guaranteed: a non-array becomes empty and
/// elements of the wrong shape are dropped
fn lenient_vec<'de, D, T>(deserializer: D) -> Result<Vec<T>, D::Error>
where
    D: Deserializer<'de>,
    T: DeserializeOwned,
{
    let value = Option::<Value>::deserialize(deserializer)?;
    let items = match value {
        Some(Value::Array(items)) => items,
        Some(Value::Null) | None => return Ok(Vec::new()),
        Some(other) => {
            log::debug!("Expected an array, found {}", other);
            return Ok(Vec::new());
        }
    };

    Ok(items
        .into_iter()
        .filter_map(|item| match serde_json::from_value(item) {
            Ok(parsed) => Some(parsed),
            Err(e) => {
                log::debug!("Skipping malformed trip entry: {}", e);
                None
            }
        })
        .collect())
}

fn lenient_option<'de, D, T>(deserializer: D) -> Result<Option<T>, D::Error>
where
    D: Deserializer<'de>,
    T: DeserializeOwned,
{
    let value = Option::<Value>::deserialize(deserializer)?;
    Ok(value.and_then(|v| serde_json::from_value(v).ok()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_parses_model_output_with_loose_types() {
        let trip: Trip = serde_json::from_value(json!({
            "id": "1700000000000",
            "userSelection": {
                "location": { "label": "Lisbon, Portugal", "value": { "place_id": "abc" } },
                "noOfDays": "3",
                "budget": "Moderate",
                "traveler": "A Couple",
                "preferences": { "activities": ["Hiking"], "learning": ["Museums"] }
            },
            "tripData": {
                "hotels": [
                    { "hotelName": "Hotel A", "price": 120, "rating": "4.5" },
                    "not an object"
                ],
                "itinerary": [
                    { "day": "Day 1", "plan": [{ "placeName": "Belem Tower", "geoCoordinates": "38.69,-9.21" }] }
                ],
                "foodPlaces": { "unexpected": true },
                "bestTimeToVisit": "Spring"
            },
            "userEmail": "ana@example.com"
        }))
        .unwrap();

        assert_eq!(trip.user_selection.no_of_days, Some(3));
        assert_eq!(trip.destination_label(), Some("Lisbon, Portugal"));
        assert_eq!(trip.trip_data.hotels.len(), 2);
        assert_eq!(trip.trip_data.hotels.iter().count(), 1);
        assert_eq!(trip.trip_data.itinerary.get(0).unwrap().plan.len(), 1);
        assert!(trip.trip_data.food_places.is_empty());
        assert_eq!(trip.trip_data.extra["bestTimeToVisit"], json!("Spring"));
        assert_eq!(
            trip.user_selection.preferences.unwrap().tags(),
            vec!["Museums", "Hiking"]
        );
    }

    #[test]
    fn test_round_trip_keeps_unknown_fields() {
        let original = json!({
            "hotelName": "Hotel A",
            "hotelAddress": "Main St 1",
            "amenities": ["pool"]
        });
        let hotel: Hotel = serde_json::from_value(original.clone()).unwrap();
        assert_eq!(serde_json::to_value(&hotel).unwrap(), original);
    }

    #[test]
    fn test_malformed_entries_survive_re_encoding() {
        let original = json!({
            "hotels": [
                { "hotelName": "Harbor Hotel" },
                { "hotelName": "Fancy", "description": { "short": "nice" }, "geoCoordinates": "40.2,-73.2" },
                "not an object",
                { "hotelName": 42 }
            ],
            "itinerary": [{ "day": "Day 1", "plan": "see you there" }],
            "foodPlaces": { "unexpected": true }
        });
        let data: TripData = serde_json::from_value(original.clone()).unwrap();

        let positions: Vec<usize> = data.hotels.indexed().map(|(i, _)| i).collect();
        assert_eq!(positions, vec![0, 1]);
        assert!(data.hotels.get(2).is_none());
        assert_eq!(serde_json::to_value(&data).unwrap(), original);
    }

    #[test]
    fn test_absent_lists_stay_absent() {
        let data: TripData = serde_json::from_value(json!({ "hotels": [] })).unwrap();
        assert_eq!(serde_json::to_value(&data).unwrap(), json!({ "hotels": [] }));
    }

    #[test]
    fn test_day_count_is_bounded() {
        let selection: UserSelection = serde_json::from_value(json!({ "noOfDays": "4294967295" })).unwrap();
        assert_eq!(selection.no_of_days, Some(u32::MAX));
        assert!(selection.validate().is_err());

        let selection: UserSelection = serde_json::from_value(json!({ "noOfDays": 0 })).unwrap();
        assert!(selection.validate().is_err());

        let selection: UserSelection = serde_json::from_value(json!({ "noOfDays": "5" })).unwrap();
        assert!(selection.validate().is_ok());

        let request = CreateTripRequest {
            user_selection: UserSelection {
                no_of_days: Some(MAX_TRIP_DAYS + 1),
                ..Default::default()
            },
            trip_data: "{}".to_string(),
            user_email: None,
        };
        assert!(request.validate().is_err());
    }

    #[test]
    fn test_food_day_defaults_to_one() {
        let food: FoodPlace = serde_json::from_value(json!({ "name": "Cafe" })).unwrap();
        assert_eq!(food.day_number(), 1);

        let food: FoodPlace = serde_json::from_value(json!({ "name": "Cafe", "day": "2" })).unwrap();
        assert_eq!(food.day_number(), 2);

        let food: FoodPlace = serde_json::from_value(json!({ "name": "Cafe", "day": 0 })).unwrap();
        assert_eq!(food.day_number(), 1);
    }

    #[test]
    fn test_value_text() {
        assert_eq!(value_text(&json!("$150")), Some("$150".to_string()));
        assert_eq!(value_text(&json!(4.5)), Some("4.5".to_string()));
        assert_eq!(value_text(&json!("  ")), None);
        assert_eq!(value_text(&json!(null)), None);
    }
}
