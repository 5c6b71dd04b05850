// src/services/budget.rs
// DOCUMENTATION: Trip cost breakdown
// PURPOSE: Hotels / Food / Tickets / Transport totals from loosely formatted prices

use crate::models::Trip;
use regex::Regex;
use serde::Serialize;
use serde_json::Value;
use std::sync::OnceLock;

/// First integer in a price label, optionally after a dollar sign
const PRICE_PATTERN: &str = r"\$?\s*(\d+)";

fn price_regex() -> Option<&'static Regex> {
    static PRICE: OnceLock<Option<Regex>> = OnceLock::new();
    PRICE
        .get_or_init(|| match Regex::new(PRICE_PATTERN) {
            Ok(re) => Some(re),
            Err(e) => {
                log::error!("Invalid price pattern: {}", e);
                None
            }
        })
        .as_ref()
}

/// Amount in whole currency units from "$150", "150 USD", "Free", 150, ...
pub fn extract_price(value: &Value) -> Option<u64> {
    match value {
        Value::Number(n) => n
            .as_u64()
            .or_else(|| n.as_f64().filter(|f| f.is_finite() && *f >= 0.0).map(|f| f.round() as u64)),
        Value::String(text) => price_regex()?
            .captures(text)?
            .get(1)?
            .as_str()
            .parse()
            .ok(),
        _ => None,
    }
}

/// Budget tier as chosen on the trip form
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum BudgetTier {
    Budget,
    Moderate,
    Luxury,
}

impl BudgetTier {
    /// Missing tier reads as Moderate; unrecognized labels as the cheapest tier
    pub fn from_label(label: Option<&str>) -> Self {
        match label.map(str::trim) {
            None => BudgetTier::Moderate,
            Some(l) if l.eq_ignore_ascii_case("moderate") => BudgetTier::Moderate,
            Some(l) if l.eq_ignore_ascii_case("luxury") => BudgetTier::Luxury,
            Some(_) => BudgetTier::Budget,
        }
    }

    pub fn food_per_day(self) -> u64 {
        match self {
            BudgetTier::Budget => 30,
            BudgetTier::Moderate => 60,
            BudgetTier::Luxury => 120,
        }
    }

    pub fn transport_per_day(self) -> u64 {
        match self {
            BudgetTier::Budget => 15,
            BudgetTier::Moderate => 30,
            BudgetTier::Luxury => 60,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct BudgetLine {
    pub name: &'static str,
    pub value: u64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct BudgetSummary {
    pub categories: Vec<BudgetLine>,
    pub total: u64,
    pub days: u32,
    pub tier: BudgetTier,
    /// Transport came from the per-day estimate, not the itinerary
    pub transport_estimated: bool,
}

pub struct BudgetService;

impl BudgetService {
    /// Summarize a trip's costs
    /// DOCUMENTATION: Hotels and tickets sum the first number of each price label.
    /// Food is always estimated per day from the tier; transport is estimated the
    /// same way only when no itinerary entry states a transport cost.
    pub fn summarize(trip: &Trip) -> BudgetSummary {
        let data = &trip.trip_data;

        let hotels: u64 = data
            .hotels
            .iter()
            .filter_map(|h| h.price.as_ref().and_then(extract_price))
            .sum();

        let places = || data.itinerary.iter().flat_map(|day| day.plan.iter());
        let tickets: u64 = places()
            .filter_map(|p| p.ticket_pricing.as_ref().and_then(extract_price))
            .sum();
        let stated_transport: u64 = places()
            .filter_map(|p| p.transport_cost.as_ref().and_then(extract_price))
            .sum();

        let days = trip.user_selection.no_of_days.filter(|d| *d > 0).unwrap_or(1);
        let tier = BudgetTier::from_label(trip.user_selection.budget.as_deref());

        let food = days as u64 * tier.food_per_day();
        let transport_estimated = stated_transport == 0;
        let transport = if transport_estimated {
            days as u64 * tier.transport_per_day()
        } else {
            stated_transport
        };

        let categories = vec![
            BudgetLine { name: "Hotels", value: hotels },
            BudgetLine { name: "Food", value: food },
            BudgetLine { name: "Tickets", value: tickets },
            BudgetLine { name: "Transport", value: transport },
        ];
        let total = categories.iter().map(|c| c.value).sum();

        BudgetSummary {
            categories,
            total,
            days,
            tier,
            transport_estimated,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_extract_price() {
        assert_eq!(extract_price(&json!("$150 per night")), Some(150));
        assert_eq!(extract_price(&json!("Around $ 45")), Some(45));
        assert_eq!(extract_price(&json!("EUR 20-30")), Some(20));
        assert_eq!(extract_price(&json!("Free")), None);
        assert_eq!(extract_price(&json!(75)), Some(75));
        assert_eq!(extract_price(&json!(null)), None);
    }

    #[test]
    fn test_tiers() {
        assert_eq!(BudgetTier::from_label(None), BudgetTier::Moderate);
        assert_eq!(BudgetTier::from_label(Some("Luxury")), BudgetTier::Luxury);
        assert_eq!(BudgetTier::from_label(Some("Cheap")), BudgetTier::Budget);
    }

    #[test]
    fn test_summary_with_estimated_transport() {
        let trip: Trip = serde_json::from_value(json!({
            "userSelection": { "noOfDays": 2, "budget": "Luxury" },
            "tripData": {
                "hotels": [{ "price": "$200" }, { "price": "Ask" }],
                "itinerary": [{ "plan": [{ "ticketPricing": "$25" }, { "ticketPricing": "Free" }] }]
            }
        }))
        .unwrap();

        let summary = BudgetService::summarize(&trip);
        let values: Vec<u64> = summary.categories.iter().map(|c| c.value).collect();
        assert_eq!(values, vec![200, 240, 25, 120]);
        assert_eq!(summary.total, 585);
        assert!(summary.transport_estimated);
    }

    #[test]
    fn test_stated_transport_wins() {
        let trip: Trip = serde_json::from_value(json!({
            "tripData": {
                "itinerary": [{ "plan": [{ "transportCost": "$12 by metro" }] }]
            }
        }))
        .unwrap();

        let summary = BudgetService::summarize(&trip);
        assert_eq!(summary.days, 1);
        assert_eq!(summary.categories[1].value, 60);
        assert_eq!(summary.categories[3].value, 12);
        assert!(!summary.transport_estimated);
    }
}
