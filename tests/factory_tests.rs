//! Problem factory tests
//!
//! Fixed master data, the literal sample demand and randomized demand.

use proptest::prelude::*;
use rstest::rstest;

use trucking_jobs::factory::{
    MIN_SHIPMENT_QTY, build_master_data, build_randomized_problem, build_sample_problem,
};
use trucking_jobs::model::Problem;

fn shipment_rows(problem: &Problem) -> Vec<(String, String, u32)> {
    problem
        .shipments
        .iter()
        .map(|s| (s.origin.name.clone(), s.destination.name.clone(), s.total_volume))
        .collect()
}

// ============================================================================
// Master data and sample problem
// ============================================================================

#[test]
fn master_data_counts() {
    let (problem, index) = build_master_data();

    assert_eq!(problem.spokes.len(), 6);
    assert_eq!(problem.hubs.len(), 2);
    assert_eq!(problem.truck_types.len(), 2);
    assert_eq!(problem.load_times.len(), 4);
    assert_eq!(problem.routes.len(), 10);
    assert!(problem.shipments.is_empty());
    assert_eq!(index.len(), 6);
    assert_eq!(problem.validate(), Ok(()));
}

#[test]
fn master_data_preserves_insertion_order() {
    let (problem, _) = build_master_data();
    let names: Vec<&str> = problem.spokes.iter().map(|s| s.name.as_str()).collect();
    assert_eq!(names, ["A", "B", "C", "D", "E", "F"]);
    let hubs: Vec<&str> = problem.hubs.iter().map(|h| h.name.as_str()).collect();
    assert_eq!(hubs, ["G", "H"]);
}

#[rstest]
#[case("A", 360, 1080)]
#[case("C", 380, 1200)]
#[case("E", 420, 800)]
fn master_data_spoke_windows(#[case] name: &str, #[case] min_dep: u32, #[case] max_arr: u32) {
    let (_, index) = build_master_data();
    let spoke = &index[name];
    assert_eq!(spoke.min_dep_time, min_dep);
    assert_eq!(spoke.max_arr_time, max_arr);
}

#[rstest]
#[case("SmallTruck", 400, 10.0, 55.0)]
#[case("BigTruck", 700, 15.0, 45.0)]
fn master_data_truck_types(#[case] id: &str, #[case] capacity: u32, #[case] cost: f64, #[case] speed: f64) {
    let (problem, _) = build_master_data();
    let truck = problem.truck_type(id).expect("truck type present");
    assert_eq!(truck.capacity, capacity);
    assert_eq!(truck.cost_per_mile, cost);
    assert_eq!(truck.miles_per_hour, speed);
}

#[test]
fn master_data_spoke_c_only_reaches_h() {
    let (problem, _) = build_master_data();
    let hubs: Vec<&str> = problem
        .routes
        .iter()
        .filter(|route| route.spoke.name == "C")
        .map(|route| route.hub.name.as_str())
        .collect();
    assert_eq!(hubs, ["H"]);
}

#[test]
fn sample_problem_has_thirty_literal_shipments() {
    let problem = build_sample_problem();

    assert_eq!(problem.shipments.len(), 30);
    assert_eq!(problem.spokes.len(), 6);
    assert_eq!(problem.routes.len(), 10);
    assert_eq!(problem.validate(), Ok(()));

    let total: u32 = problem.shipments.iter().map(|s| s.total_volume).sum();
    assert_eq!(total, 5738);
}

#[test]
fn sample_problem_shares_master_entities() {
    let problem = build_sample_problem();
    for shipment in &problem.shipments {
        let origin = problem.spoke(&shipment.origin.name).expect("origin declared");
        assert!(std::sync::Arc::ptr_eq(origin, &shipment.origin));
    }
}

// ============================================================================
// Randomized problem
// ============================================================================

#[test]
fn randomized_problem_covers_every_ordered_pair() {
    let problem = build_randomized_problem(1, 300.0, 100.0).unwrap();
    assert_eq!(problem.shipments.len(), 30);

    let pairs: Vec<(String, String)> = problem
        .shipments
        .iter()
        .map(|s| (s.origin.name.clone(), s.destination.name.clone()))
        .collect();
    assert_eq!(pairs[0], ("A".to_string(), "B".to_string()));
    assert_eq!(pairs[4], ("A".to_string(), "F".to_string()));
    assert_eq!(pairs[5], ("B".to_string(), "A".to_string()));
    assert_eq!(pairs[29], ("F".to_string(), "E".to_string()));
    assert_eq!(problem.validate(), Ok(()));
}

#[test]
fn randomized_problem_depends_on_seed() {
    let first = build_randomized_problem(1, 300.0, 100.0).unwrap();
    let second = build_randomized_problem(2, 300.0, 100.0).unwrap();
    assert_ne!(shipment_rows(&first), shipment_rows(&second));
}

#[test]
fn randomized_problem_low_mean_clamps_everything() {
    let problem = build_randomized_problem(7, -500.0, 10.0).unwrap();
    assert!(problem.shipments.iter().all(|s| s.total_volume == MIN_SHIPMENT_QTY));
}

#[rstest]
#[case(f64::INFINITY, 10.0)]
#[case(300.0, -0.5)]
#[case(300.0, f64::NAN)]
fn randomized_problem_rejects_bad_distribution(#[case] mean: f64, #[case] std_dev: f64) {
    assert!(build_randomized_problem(1, mean, std_dev).is_err());
}

proptest! {
    #[test]
    fn randomized_problem_is_deterministic(seed in any::<u64>(), mean in 0.0f64..2000.0, std_dev in 0.0f64..500.0) {
        let first = build_randomized_problem(seed, mean, std_dev).unwrap();
        let second = build_randomized_problem(seed, mean, std_dev).unwrap();
        prop_assert_eq!(shipment_rows(&first), shipment_rows(&second));
    }

    #[test]
    fn randomized_quantities_respect_minimum(seed in any::<u64>(), mean in -1000.0f64..1000.0, std_dev in 0.0f64..800.0) {
        let problem = build_randomized_problem(seed, mean, std_dev).unwrap();
        prop_assert!(problem.shipments.iter().all(|s| s.total_volume >= MIN_SHIPMENT_QTY));
    }
}
