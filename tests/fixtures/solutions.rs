//! Solution documents shaped like the optimization service's output.

use serde_json::{Value, json};

pub const PROBLEM_ID_KEY: &str = "oaas.client.problem.id";

/// A small but complete solution for the sample network.
pub fn sample_solution() -> Value {
    json!({
        "Result": {"totalCost": 18436.5},
        "NbTrucksOnRouteRes": [
            {"spoke": "A", "hub": "H", "truckType": "BigTruck", "nbTruck": 3},
            {"spoke": "D", "hub": "G", "truckType": "SmallTruck", "nbTruck": 1}
        ],
        "InVolumeThroughHubOnTruckRes": [
            {"origin": "A", "hub": "H", "destination": "B", "truckType": "BigTruck", "quantity": 300},
            {"origin": "D", "hub": "G", "destination": "E", "truckType": "SmallTruck", "quantity": 283}
        ],
        "OutVolumeThroughHubOnTruckRes": [
            {"origin": "A", "hub": "H", "destination": "B", "truckType": "BigTruck", "quantity": 300}
        ],
        "InBoundAggregated": [
            {"spoke": "A", "hub": "H", "truckType": "BigTruck", "quantity": 1345}
        ],
        "OutBoundAggregated": [
            {"spoke": "B", "hub": "H", "truckType": "BigTruck", "quantity": 1087}
        ]
    })
}

pub fn sample_solution_bytes() -> Vec<u8> {
    serde_json::to_vec(&sample_solution()).unwrap_or_default()
}

/// The sample solution with one result collection removed.
pub fn solution_without(key: &str) -> Value {
    let mut value = sample_solution();
    if let Some(fields) = value.as_object_mut() {
        fields.remove(key);
    }
    value
}
