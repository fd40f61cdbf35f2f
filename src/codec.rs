//! JSON codec between the domain model and the optimization service.
//!
//! Problems go out with every association flattened to the names of the
//! entities it references. Responses come back as generic JSON and are only
//! treated as a [`Solution`] when they carry the `Result` key.

use std::collections::HashMap;
use std::sync::Arc;

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use thiserror::Error;

use crate::model::{Hub, LoadTime, ModelError, Parameters, Problem, Route, Shipment, Spoke, TruckType};
use crate::solution::{Record, Solution};

/// Key whose presence marks a response structure as a solution.
pub const SOLUTION_SIGNATURE: &str = "Result";

const NB_TRUCKS_ON_ROUTE: &str = "NbTrucksOnRouteRes";
const IN_VOLUME_THROUGH_HUB: &str = "InVolumeThroughHubOnTruckRes";
const OUT_VOLUME_THROUGH_HUB: &str = "OutVolumeThroughHubOnTruckRes";
const INBOUND_AGGREGATED: &str = "InBoundAggregated";
const OUTBOUND_AGGREGATED: &str = "OutBoundAggregated";

#[derive(Debug, Error)]
pub enum CodecError {
    #[error("failed to encode problem")]
    Encode(#[source] serde_json::Error),
    #[error("response is not valid JSON")]
    InvalidJson(#[source] serde_json::Error),
    #[error("malformed solution: `{key}` {reason}")]
    MalformedSolution { key: &'static str, reason: &'static str },
    #[error("response does not contain a solution")]
    NotASolution,
    #[error("invalid problem payload")]
    InvalidPayload(#[source] serde_json::Error),
    #[error("problem payload references unknown entities")]
    Model(#[from] ModelError),
}

// ============================================================================
// Wire schema
// ============================================================================

#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
struct ProblemPayload {
    parameters: ParametersRecord,
    hubs: Vec<HubRecord>,
    spokes: Vec<SpokeRecord>,
    truck_types: Vec<TruckTypeRecord>,
    load_times: Vec<LoadTimeRecord>,
    routes: Vec<RouteRecord>,
    shipments: Vec<ShipmentRecord>,
}

#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ParametersRecord {
    max_trucks: u32,
    max_volume: u32,
}

#[derive(Debug, Serialize, Deserialize)]
struct HubRecord {
    name: String,
}

#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
struct SpokeRecord {
    name: String,
    min_dep_time: u32,
    max_arr_time: u32,
}

#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
struct TruckTypeRecord {
    truck_type: String,
    capacity: u32,
    cost_per_mile: f64,
    miles_per_hour: f64,
}

#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
struct LoadTimeRecord {
    hub: String,
    truck_type: String,
    load_time: f64,
}

#[derive(Debug, Serialize, Deserialize)]
struct RouteRecord {
    spoke: String,
    hub: String,
    distance: f64,
}

#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ShipmentRecord {
    origin: String,
    destination: String,
    total_volume: u32,
}

impl From<&Problem> for ProblemPayload {
    fn from(problem: &Problem) -> Self {
        Self {
            parameters: ParametersRecord {
                max_trucks: problem.parameters.max_trucks,
                max_volume: problem.parameters.max_volume,
            },
            hubs: problem
                .hubs
                .iter()
                .map(|hub| HubRecord { name: hub.name.clone() })
                .collect(),
            spokes: problem
                .spokes
                .iter()
                .map(|spoke| SpokeRecord {
                    name: spoke.name.clone(),
                    min_dep_time: spoke.min_dep_time,
                    max_arr_time: spoke.max_arr_time,
                })
                .collect(),
            truck_types: problem
                .truck_types
                .iter()
                .map(|truck| TruckTypeRecord {
                    truck_type: truck.id.clone(),
                    capacity: truck.capacity,
                    cost_per_mile: truck.cost_per_mile,
                    miles_per_hour: truck.miles_per_hour,
                })
                .collect(),
            load_times: problem
                .load_times
                .iter()
                .map(|load| LoadTimeRecord {
                    hub: load.hub.name.clone(),
                    truck_type: load.truck_type.id.clone(),
                    load_time: load.load_time,
                })
                .collect(),
            routes: problem
                .routes
                .iter()
                .map(|route| RouteRecord {
                    spoke: route.spoke.name.clone(),
                    hub: route.hub.name.clone(),
                    distance: route.distance,
                })
                .collect(),
            shipments: problem
                .shipments
                .iter()
                .map(|shipment| ShipmentRecord {
                    origin: shipment.origin.name.clone(),
                    destination: shipment.destination.name.clone(),
                    total_volume: shipment.total_volume,
                })
                .collect(),
        }
    }
}

// ============================================================================
// Encoding
// ============================================================================

/// Encode a problem into the service's input structure.
pub fn encode(problem: &Problem) -> Result<Value, CodecError> {
    serde_json::to_value(ProblemPayload::from(problem)).map_err(CodecError::Encode)
}

/// Encode a problem as UTF-8 JSON bytes, ready to attach to a job.
pub fn encode_to_vec(problem: &Problem) -> Result<Vec<u8>, CodecError> {
    serde_json::to_vec(&ProblemPayload::from(problem)).map_err(CodecError::Encode)
}

/// Rebuild a problem from its encoded form, resolving every name back to the
/// entity declared in the same payload.
///
/// The problem id is not part of the payload and comes back as `None`.
pub fn decode_problem(value: Value) -> Result<Problem, CodecError> {
    let payload: ProblemPayload = serde_json::from_value(value).map_err(CodecError::InvalidPayload)?;

    let hubs: Vec<Arc<Hub>> = payload.hubs.into_iter().map(|hub| Arc::new(Hub::new(hub.name))).collect();
    let spokes: Vec<Arc<Spoke>> = payload
        .spokes
        .into_iter()
        .map(|spoke| Arc::new(Spoke::new(spoke.name, spoke.min_dep_time, spoke.max_arr_time)))
        .collect();
    let truck_types: Vec<Arc<TruckType>> = payload
        .truck_types
        .into_iter()
        .map(|truck| {
            Arc::new(TruckType::new(
                truck.truck_type,
                truck.capacity,
                truck.cost_per_mile,
                truck.miles_per_hour,
            ))
        })
        .collect();

    let hub_by_name = by_name(&hubs, |hub| &hub.name);
    let spoke_by_name = by_name(&spokes, |spoke| &spoke.name);
    let truck_by_id = by_name(&truck_types, |truck| &truck.id);

    let load_times = payload
        .load_times
        .iter()
        .map(|load| {
            Ok(LoadTime::new(
                resolve(&hub_by_name, "hub", &load.hub)?,
                resolve(&truck_by_id, "truck type", &load.truck_type)?,
                load.load_time,
            ))
        })
        .collect::<Result<Vec<_>, ModelError>>()?;
    let routes = payload
        .routes
        .iter()
        .map(|route| {
            Ok(Route::new(
                resolve(&spoke_by_name, "spoke", &route.spoke)?,
                resolve(&hub_by_name, "hub", &route.hub)?,
                route.distance,
            ))
        })
        .collect::<Result<Vec<_>, ModelError>>()?;
    let shipments = payload
        .shipments
        .iter()
        .map(|shipment| {
            Ok(Shipment::new(
                resolve(&spoke_by_name, "spoke", &shipment.origin)?,
                resolve(&spoke_by_name, "spoke", &shipment.destination)?,
                shipment.total_volume,
            ))
        })
        .collect::<Result<Vec<_>, ModelError>>()?;

    Ok(Problem {
        problem_id: None,
        parameters: Parameters {
            max_trucks: payload.parameters.max_trucks,
            max_volume: payload.parameters.max_volume,
        },
        hubs,
        spokes,
        truck_types,
        load_times,
        routes,
        shipments,
    })
}

fn by_name<T>(items: &[Arc<T>], name: impl Fn(&T) -> &String) -> HashMap<String, Arc<T>> {
    let mut map = HashMap::with_capacity(items.len());
    for item in items {
        // first declaration wins, like a linear lookup would
        map.entry(name(item).clone()).or_insert_with(|| Arc::clone(item));
    }
    map
}

fn resolve<'a, T>(
    index: &'a HashMap<String, Arc<T>>,
    kind: &'static str,
    name: &str,
) -> Result<&'a Arc<T>, ModelError> {
    index.get(name).ok_or_else(|| ModelError::UnknownReference {
        kind,
        name: name.to_string(),
    })
}

// ============================================================================
// Decoding
// ============================================================================

/// Outcome of decoding a generic response structure.
#[derive(Debug, Clone, PartialEq)]
pub enum Decoded {
    Solution(Box<Solution>),
    /// Anything without the `Result` key, returned untouched.
    Other(Value),
}

/// Returns true when a solution can be decoded from `value`.
pub fn is_solution(value: &Value) -> bool {
    value
        .as_object()
        .is_some_and(|fields| fields.contains_key(SOLUTION_SIGNATURE))
}

/// Decode a parsed response structure.
///
/// Structures without a `Result` key pass through as [`Decoded::Other`] and
/// never fail. Once `Result` is present, every result collection must be a
/// sequence of mappings or the response is rejected as malformed.
///
/// Only the top level is checked; [`decode_nested`] also finds solutions
/// inside larger structures.
pub fn decode(value: Value) -> Result<Decoded, CodecError> {
    let mut fields = match value {
        Value::Object(fields) if fields.contains_key(SOLUTION_SIGNATURE) => fields,
        other => return Ok(Decoded::Other(other)),
    };

    let result = match fields.remove(SOLUTION_SIGNATURE) {
        Some(Value::Object(row)) => Record::new(row),
        _ => {
            return Err(CodecError::MalformedSolution {
                key: SOLUTION_SIGNATURE,
                reason: "is not a mapping",
            });
        }
    };

    Ok(Decoded::Solution(Box::new(Solution {
        result,
        nb_trucks_on_route: take_rows(&mut fields, NB_TRUCKS_ON_ROUTE)?,
        in_volume_through_hub: take_rows(&mut fields, IN_VOLUME_THROUGH_HUB)?,
        out_volume_through_hub: take_rows(&mut fields, OUT_VOLUME_THROUGH_HUB)?,
        inbound_aggregated: take_rows(&mut fields, INBOUND_AGGREGATED)?,
        outbound_aggregated: take_rows(&mut fields, OUTBOUND_AGGREGATED)?,
    })))
}

/// Parse JSON bytes and decode them.
pub fn decode_slice(bytes: &[u8]) -> Result<Decoded, CodecError> {
    let value: Value = serde_json::from_slice(bytes).map_err(CodecError::InvalidJson)?;
    decode(value)
}

/// Parse JSON bytes that must hold a solution.
pub fn decode_solution(bytes: &[u8]) -> Result<Solution, CodecError> {
    match decode_slice(bytes)? {
        Decoded::Solution(solution) => Ok(*solution),
        Decoded::Other(_) => Err(CodecError::NotASolution),
    }
}

/// Decode every solution found anywhere inside `value`, in document order.
///
/// A mapping carrying `Result` is decoded as a whole and not searched
/// further. Other mappings and sequences are searched recursively.
pub fn decode_nested(value: Value) -> Result<Vec<Solution>, CodecError> {
    let mut found = Vec::new();
    collect_solutions(value, &mut found)?;
    Ok(found)
}

fn collect_solutions(value: Value, found: &mut Vec<Solution>) -> Result<(), CodecError> {
    match decode(value)? {
        Decoded::Solution(solution) => found.push(*solution),
        Decoded::Other(Value::Object(fields)) => {
            for (_, child) in fields {
                collect_solutions(child, found)?;
            }
        }
        Decoded::Other(Value::Array(items)) => {
            for item in items {
                collect_solutions(item, found)?;
            }
        }
        Decoded::Other(_) => {}
    }
    Ok(())
}

fn take_rows(fields: &mut Map<String, Value>, key: &'static str) -> Result<Vec<Record>, CodecError> {
    let Some(value) = fields.remove(key) else {
        return Err(CodecError::MalformedSolution {
            key,
            reason: "is missing",
        });
    };
    let Value::Array(items) = value else {
        return Err(CodecError::MalformedSolution {
            key,
            reason: "is not a sequence",
        });
    };

    items
        .into_iter()
        .map(|item| match item {
            Value::Object(row) => Ok(Record::new(row)),
            _ => Err(CodecError::MalformedSolution {
                key,
                reason: "contains an entry that is not a mapping",
            }),
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn solution_json() -> Value {
        json!({
            "Result": {"totalCost": 1234.5},
            "NbTrucksOnRouteRes": [{"spoke": "A", "hub": "G", "truckType": "BigTruck", "nbTruck": 2}],
            "InVolumeThroughHubOnTruckRes": [],
            "OutVolumeThroughHubOnTruckRes": [],
            "InBoundAggregated": [],
            "OutBoundAggregated": []
        })
    }

    #[test]
    fn test_is_solution() {
        assert!(is_solution(&solution_json()));
        assert!(!is_solution(&json!({"totalCost": 3})));
        assert!(!is_solution(&json!([1, 2, 3])));
    }

    #[test]
    fn test_decode_minimal_solution() {
        let Decoded::Solution(solution) = decode(solution_json()).unwrap() else {
            panic!("expected a solution");
        };
        assert_eq!(solution.total_cost(), Some(1234.5));
        assert_eq!(solution.nb_trucks_on_route.len(), 1);
        assert_eq!(solution.nb_trucks_on_route[0].str_field("truckType"), Some("BigTruck"));
    }

    #[test]
    fn test_result_not_a_mapping() {
        let mut value = solution_json();
        value["Result"] = json!(12);
        assert!(matches!(
            decode(value),
            Err(CodecError::MalformedSolution { key: "Result", .. })
        ));
    }

    #[test]
    fn test_collection_not_a_sequence() {
        let mut value = solution_json();
        value["InBoundAggregated"] = json!({"spoke": "A"});
        assert!(matches!(
            decode(value),
            Err(CodecError::MalformedSolution {
                key: "InBoundAggregated",
                reason: "is not a sequence"
            })
        ));
    }

    #[test]
    fn test_collection_entry_not_a_mapping() {
        let mut value = solution_json();
        value["NbTrucksOnRouteRes"] = json!([1]);
        assert!(matches!(
            decode(value),
            Err(CodecError::MalformedSolution {
                key: "NbTrucksOnRouteRes",
                ..
            })
        ));
    }

    #[test]
    fn test_decode_solution_rejects_other() {
        assert!(matches!(
            decode_solution(br#"{"status": "ok"}"#),
            Err(CodecError::NotASolution)
        ));
    }

    #[test]
    fn test_decode_slice_invalid_json() {
        assert!(matches!(decode_slice(b"{nope"), Err(CodecError::InvalidJson(_))));
    }

    #[test]
    fn test_decode_problem_unknown_spoke() {
        let payload = json!({
            "Parameters": {"maxTrucks": 1, "maxVolume": 1},
            "Hubs": [{"name": "G"}],
            "Spokes": [],
            "TruckTypes": [],
            "LoadTimes": [],
            "Routes": [{"spoke": "A", "hub": "G", "distance": 1.0}],
            "Shipments": []
        });
        assert!(matches!(
            decode_problem(payload),
            Err(CodecError::Model(ModelError::UnknownReference { kind: "spoke", .. }))
        ));
    }
}
