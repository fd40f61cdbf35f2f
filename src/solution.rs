//! Decoded optimization results.
//!
//! Result rows keep the field names exactly as the service sent them; no
//! name resolution back to model entities happens here.

use serde_json::{Map, Value};

/// One result row: field name to value, in the order the service sent them.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Record(Map<String, Value>);

impl Record {
    pub fn new(fields: Map<String, Value>) -> Self {
        Self(fields)
    }

    pub fn get(&self, field: &str) -> Option<&Value> {
        self.0.get(field)
    }

    pub fn str_field(&self, field: &str) -> Option<&str> {
        self.get(field).and_then(Value::as_str)
    }

    pub fn number_field(&self, field: &str) -> Option<f64> {
        self.get(field).and_then(Value::as_f64)
    }

    /// Field names in the order they were received.
    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.0.keys().map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Render a field for display: strings without quotes, missing fields as `?`.
    pub fn display_field(&self, field: &str) -> String {
        match self.get(field) {
            Some(Value::String(text)) => text.clone(),
            Some(value) => value.to_string(),
            None => "?".to_string(),
        }
    }

    pub fn into_inner(self) -> Map<String, Value> {
        self.0
    }
}

/// Result of one optimization run.
#[derive(Debug, Clone, PartialEq)]
pub struct Solution {
    /// The `Result` row, carrying `totalCost`.
    pub result: Record,
    /// Trucks per (spoke, hub, truck type).
    pub nb_trucks_on_route: Vec<Record>,
    /// Volume per (origin, hub, destination, truck type) going into hubs.
    pub in_volume_through_hub: Vec<Record>,
    /// Volume per (origin, hub, destination, truck type) leaving hubs.
    pub out_volume_through_hub: Vec<Record>,
    pub inbound_aggregated: Vec<Record>,
    pub outbound_aggregated: Vec<Record>,
}

impl Solution {
    pub fn total_cost(&self) -> Option<f64> {
        self.result.number_field("totalCost")
    }

    /// Sum of `nbTruck` over every route assignment.
    pub fn total_trucks(&self) -> f64 {
        self.nb_trucks_on_route
            .iter()
            .filter_map(|row| row.number_field("nbTruck"))
            .sum()
    }
}
