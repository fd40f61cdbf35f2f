//! Domain model for the multi-hub trucking problem.
//!
//! A [`Problem`] owns the logistics network (hubs, spokes, truck types, load
//! times, routes) and the demand (shipments). Associations hold shared
//! references to the entities they connect; the codec replaces those with
//! names when the problem goes over the wire.

use std::collections::HashSet;
use std::sync::Arc;

use thiserror::Error;

/// Anything that can be referenced by name inside a problem.
pub trait Location {
    fn name(&self) -> &str;
}

/// Global limits of an optimization run.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Parameters {
    pub max_trucks: u32,
    pub max_volume: u32,
}

impl Default for Parameters {
    fn default() -> Self {
        Self {
            max_trucks: 100,
            max_volume: 5000,
        }
    }
}

/// Central transfer node.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Hub {
    pub name: String,
}

impl Hub {
    pub fn new(name: impl Into<String>) -> Self {
        Self { name: name.into() }
    }
}

impl Location for Hub {
    fn name(&self) -> &str {
        &self.name
    }
}

/// Origin/destination node with its departure and arrival bounds.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Spoke {
    pub name: String,
    /// Earliest departure time (minutes from midnight).
    pub min_dep_time: u32,
    /// Latest arrival time (minutes from midnight).
    pub max_arr_time: u32,
}

impl Spoke {
    pub fn new(name: impl Into<String>, min_dep_time: u32, max_arr_time: u32) -> Self {
        Self {
            name: name.into(),
            min_dep_time,
            max_arr_time,
        }
    }
}

impl Location for Spoke {
    fn name(&self) -> &str {
        &self.name
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct TruckType {
    pub id: String,
    /// Volume a single truck can carry.
    pub capacity: u32,
    pub cost_per_mile: f64,
    pub miles_per_hour: f64,
}

impl TruckType {
    pub fn new(id: impl Into<String>, capacity: u32, cost_per_mile: f64, miles_per_hour: f64) -> Self {
        Self {
            id: id.into(),
            capacity,
            cost_per_mile,
            miles_per_hour,
        }
    }
}

/// Time needed to load a truck type at a hub.
#[derive(Debug, Clone, PartialEq)]
pub struct LoadTime {
    pub hub: Arc<Hub>,
    pub truck_type: Arc<TruckType>,
    pub load_time: f64,
}

impl LoadTime {
    pub fn new(hub: &Arc<Hub>, truck_type: &Arc<TruckType>, load_time: f64) -> Self {
        Self {
            hub: Arc::clone(hub),
            truck_type: Arc::clone(truck_type),
            load_time,
        }
    }
}

/// Fixed spoke-hub link.
#[derive(Debug, Clone, PartialEq)]
pub struct Route {
    pub spoke: Arc<Spoke>,
    pub hub: Arc<Hub>,
    pub distance: f64,
}

impl Route {
    pub fn new(spoke: &Arc<Spoke>, hub: &Arc<Hub>, distance: f64) -> Self {
        Self {
            spoke: Arc::clone(spoke),
            hub: Arc::clone(hub),
            distance,
        }
    }
}

/// Demand for volume between two spokes.
#[derive(Debug, Clone, PartialEq)]
pub struct Shipment {
    pub origin: Arc<Spoke>,
    pub destination: Arc<Spoke>,
    pub total_volume: u32,
}

impl Shipment {
    pub fn new(origin: &Arc<Spoke>, destination: &Arc<Spoke>, total_volume: u32) -> Self {
        Self {
            origin: Arc::clone(origin),
            destination: Arc::clone(destination),
            total_volume,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ModelError {
    #[error("duplicate {kind} name `{name}`")]
    DuplicateName { kind: &'static str, name: String },
    #[error("unknown {kind} `{name}`")]
    UnknownReference { kind: &'static str, name: String },
    #[error("more than one load time for hub `{hub}` and truck type `{truck_type}`")]
    DuplicateLoadTime { hub: String, truck_type: String },
    #[error("more than one route between spoke `{spoke}` and hub `{hub}`")]
    DuplicateRoute { spoke: String, hub: String },
    #[error("shipment origin and destination are both `{spoke}`")]
    SameOriginDestination { spoke: String },
    #[error("truck type `{id}` is invalid: {reason}")]
    InvalidTruckType { id: String, reason: &'static str },
    #[error("spoke `{spoke}` is shipped from or to but has no route to any hub")]
    UnroutedSpoke { spoke: String },
}

/// Full input payload for one optimization run.
///
/// Built once by the caller (usually through [`crate::factory`]), then only
/// read while it is encoded and submitted.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Problem {
    /// Correlation id, assigned by the caller before submission.
    pub problem_id: Option<String>,
    pub parameters: Parameters,
    pub hubs: Vec<Arc<Hub>>,
    pub spokes: Vec<Arc<Spoke>>,
    pub truck_types: Vec<Arc<TruckType>>,
    pub load_times: Vec<LoadTime>,
    pub routes: Vec<Route>,
    pub shipments: Vec<Shipment>,
}

impl Problem {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_id(mut self, problem_id: impl Into<String>) -> Self {
        self.problem_id = Some(problem_id.into());
        self
    }

    pub fn hub(&self, name: &str) -> Option<&Arc<Hub>> {
        self.hubs.iter().find(|hub| hub.name == name)
    }

    pub fn spoke(&self, name: &str) -> Option<&Arc<Spoke>> {
        self.spokes.iter().find(|spoke| spoke.name == name)
    }

    pub fn truck_type(&self, id: &str) -> Option<&Arc<TruckType>> {
        self.truck_types.iter().find(|truck| truck.id == id)
    }

    /// Check every structural invariant of the problem.
    ///
    /// References are checked by name against the problem's own collections,
    /// so an association pointing at an entity that was never added fails.
    pub fn validate(&self) -> Result<(), ModelError> {
        unique_names("hub", self.hubs.iter().map(|hub| hub.name.as_str()))?;
        unique_names("spoke", self.spokes.iter().map(|spoke| spoke.name.as_str()))?;
        unique_names("truck type", self.truck_types.iter().map(|truck| truck.id.as_str()))?;

        for truck in &self.truck_types {
            if truck.capacity == 0 {
                return Err(ModelError::InvalidTruckType {
                    id: truck.id.clone(),
                    reason: "capacity must be positive",
                });
            }
            if truck.miles_per_hour.is_nan() || truck.miles_per_hour <= 0.0 {
                return Err(ModelError::InvalidTruckType {
                    id: truck.id.clone(),
                    reason: "speed must be positive",
                });
            }
        }

        let mut load_pairs = HashSet::new();
        for load in &self.load_times {
            self.require_hub(&load.hub.name)?;
            self.require_truck_type(&load.truck_type.id)?;
            if !load_pairs.insert((load.hub.name.as_str(), load.truck_type.id.as_str())) {
                return Err(ModelError::DuplicateLoadTime {
                    hub: load.hub.name.clone(),
                    truck_type: load.truck_type.id.clone(),
                });
            }
        }

        let mut route_pairs = HashSet::new();
        for route in &self.routes {
            self.require_spoke(&route.spoke.name)?;
            self.require_hub(&route.hub.name)?;
            if !route_pairs.insert((route.spoke.name.as_str(), route.hub.name.as_str())) {
                return Err(ModelError::DuplicateRoute {
                    spoke: route.spoke.name.clone(),
                    hub: route.hub.name.clone(),
                });
            }
        }

        let routed: HashSet<&str> = self.routes.iter().map(|route| route.spoke.name.as_str()).collect();
        for shipment in &self.shipments {
            self.require_spoke(&shipment.origin.name)?;
            self.require_spoke(&shipment.destination.name)?;
            if shipment.origin.name == shipment.destination.name {
                return Err(ModelError::SameOriginDestination {
                    spoke: shipment.origin.name.clone(),
                });
            }
            for end in [&shipment.origin, &shipment.destination] {
                if !routed.contains(end.name.as_str()) {
                    return Err(ModelError::UnroutedSpoke {
                        spoke: end.name.clone(),
                    });
                }
            }
        }

        Ok(())
    }

    fn require_hub(&self, name: &str) -> Result<(), ModelError> {
        self.hub(name).map(|_| ()).ok_or_else(|| ModelError::UnknownReference {
            kind: "hub",
            name: name.to_string(),
        })
    }

    fn require_spoke(&self, name: &str) -> Result<(), ModelError> {
        self.spoke(name).map(|_| ()).ok_or_else(|| ModelError::UnknownReference {
            kind: "spoke",
            name: name.to_string(),
        })
    }

    fn require_truck_type(&self, id: &str) -> Result<(), ModelError> {
        self.truck_type(id).map(|_| ()).ok_or_else(|| ModelError::UnknownReference {
            kind: "truck type",
            name: id.to_string(),
        })
    }
}

fn unique_names<'a>(kind: &'static str, names: impl Iterator<Item = &'a str>) -> Result<(), ModelError> {
    let mut seen = HashSet::new();
    for name in names {
        if !seen.insert(name) {
            return Err(ModelError::DuplicateName {
                kind,
                name: name.to_string(),
            });
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn tiny_problem() -> Problem {
        let hub = Arc::new(Hub::new("G"));
        let a = Arc::new(Spoke::new("A", 360, 1080));
        let b = Arc::new(Spoke::new("B", 400, 1150));
        let truck = Arc::new(TruckType::new("SmallTruck", 400, 10.0, 55.0));

        let mut problem = Problem::new();
        problem.hubs.push(Arc::clone(&hub));
        problem.spokes.extend([Arc::clone(&a), Arc::clone(&b)]);
        problem.truck_types.push(Arc::clone(&truck));
        problem.load_times.push(LoadTime::new(&hub, &truck, 30.0));
        problem.routes.push(Route::new(&a, &hub, 200.0));
        problem.routes.push(Route::new(&b, &hub, 120.0));
        problem.shipments.push(Shipment::new(&a, &b, 300));
        problem
    }

    #[test]
    fn test_default_parameters() {
        let params = Parameters::default();
        assert_eq!(params.max_trucks, 100);
        assert_eq!(params.max_volume, 5000);
    }

    #[test]
    fn test_valid_problem() {
        assert_eq!(tiny_problem().validate(), Ok(()));
    }

    #[test]
    fn test_location_names() {
        let hub = Hub::new("G");
        let spoke = Spoke::new("A", 0, 10);
        assert_eq!(Location::name(&hub), "G");
        assert_eq!(Location::name(&spoke), "A");
    }

    #[test]
    fn test_duplicate_spoke_rejected() {
        let mut problem = tiny_problem();
        problem.spokes.push(Arc::new(Spoke::new("A", 1, 2)));
        assert_eq!(
            problem.validate(),
            Err(ModelError::DuplicateName {
                kind: "spoke",
                name: "A".to_string()
            })
        );
    }

    #[test]
    fn test_duplicate_route_rejected() {
        let mut problem = tiny_problem();
        let route = problem.routes[0].clone();
        problem.routes.push(route);
        assert!(matches!(problem.validate(), Err(ModelError::DuplicateRoute { .. })));
    }

    #[test]
    fn test_duplicate_load_time_rejected() {
        let mut problem = tiny_problem();
        let load = problem.load_times[0].clone();
        problem.load_times.push(load);
        assert!(matches!(problem.validate(), Err(ModelError::DuplicateLoadTime { .. })));
    }

    #[test]
    fn test_shipment_to_self_rejected() {
        let mut problem = tiny_problem();
        let a = Arc::clone(&problem.spokes[0]);
        problem.shipments.push(Shipment::new(&a, &a, 10));
        assert_eq!(
            problem.validate(),
            Err(ModelError::SameOriginDestination {
                spoke: "A".to_string()
            })
        );
    }

    #[test]
    fn test_unrouted_spoke_rejected() {
        let mut problem = tiny_problem();
        let c = Arc::new(Spoke::new("C", 380, 1200));
        let a = Arc::clone(&problem.spokes[0]);
        problem.spokes.push(Arc::clone(&c));
        problem.shipments.push(Shipment::new(&a, &c, 10));
        assert_eq!(
            problem.validate(),
            Err(ModelError::UnroutedSpoke {
                spoke: "C".to_string()
            })
        );
    }

    #[test]
    fn test_dangling_reference_rejected() {
        let mut problem = tiny_problem();
        let stranger = Arc::new(Hub::new("Z"));
        let a = Arc::clone(&problem.spokes[0]);
        problem.routes.push(Route::new(&a, &stranger, 10.0));
        assert_eq!(
            problem.validate(),
            Err(ModelError::UnknownReference {
                kind: "hub",
                name: "Z".to_string()
            })
        );
    }

    #[test]
    fn test_zero_capacity_rejected() {
        let mut problem = tiny_problem();
        problem.truck_types.push(Arc::new(TruckType::new("Empty", 0, 1.0, 10.0)));
        assert!(matches!(
            problem.validate(),
            Err(ModelError::InvalidTruckType { reason: "capacity must be positive", .. })
        ));
    }

    #[test]
    fn test_with_id() {
        let problem = Problem::new().with_id("Problem #3");
        assert_eq!(problem.problem_id.as_deref(), Some("Problem #3"));
    }
}
