//! Problem construction: a fixed master-data network plus either a literal
//! or a randomized set of shipments.

use std::collections::HashMap;
use std::sync::Arc;

use rand::SeedableRng;
use rand_chacha::ChaCha8Rng;
use rand_distr::{Distribution, StandardNormal};
use thiserror::Error;

use crate::model::{Hub, LoadTime, Problem, Route, Shipment, Spoke, TruckType};

/// Smallest quantity a randomized shipment may carry.
pub const MIN_SHIPMENT_QTY: u32 = 50;

/// Lookup from spoke name to the spoke stored in the problem.
pub type SpokeIndex = HashMap<String, Arc<Spoke>>;

#[derive(Debug, Clone, PartialEq, Error)]
pub enum FactoryError {
    #[error("invalid shipment distribution (mean {mean}, standard deviation {std_dev})")]
    InvalidDistribution { mean: f64, std_dev: f64 },
}

/// Build the fixed logistics network: 6 spokes, 2 hubs, 2 truck types,
/// 4 load times and 10 routes, without any shipment.
pub fn build_master_data() -> (Problem, SpokeIndex) {
    let mut problem = Problem::new();

    let spokes = [
        Spoke::new("A", 360, 1080),
        Spoke::new("B", 400, 1150),
        Spoke::new("C", 380, 1200),
        Spoke::new("D", 340, 900),
        Spoke::new("E", 420, 800),
        Spoke::new("F", 370, 1070),
    ]
    .map(Arc::new);
    let [a, b, c, d, e, f] = spokes.clone();
    let index = spokes
        .iter()
        .map(|spoke| (spoke.name.clone(), Arc::clone(spoke)))
        .collect();
    problem.spokes.extend(spokes);

    let g = Arc::new(Hub::new("G"));
    let h = Arc::new(Hub::new("H"));
    problem.hubs.extend([Arc::clone(&g), Arc::clone(&h)]);

    let small = Arc::new(TruckType::new("SmallTruck", 400, 10.0, 55.0));
    let big = Arc::new(TruckType::new("BigTruck", 700, 15.0, 45.0));
    problem.truck_types.extend([Arc::clone(&small), Arc::clone(&big)]);

    problem.load_times.extend([
        LoadTime::new(&g, &small, 30.0),
        LoadTime::new(&g, &big, 55.0),
        LoadTime::new(&h, &small, 35.0),
        LoadTime::new(&h, &big, 50.0),
    ]);

    problem.routes.extend([
        Route::new(&a, &g, 200.0),
        Route::new(&a, &h, 50.0),
        Route::new(&b, &g, 120.0),
        Route::new(&b, &h, 100.0),
        Route::new(&c, &h, 110.0),
        Route::new(&d, &g, 70.0),
        Route::new(&d, &h, 100.0),
        Route::new(&e, &g, 120.0),
        Route::new(&e, &h, 100.0),
        Route::new(&f, &h, 105.0),
    ]);

    (problem, index)
}

/// Master data plus the literal 30-shipment sample demand.
pub fn build_sample_problem() -> Problem {
    const SAMPLE_SHIPMENTS: [(&str, &str, u32); 30] = [
        ("A", "B", 300),
        ("A", "C", 250),
        ("A", "D", 350),
        ("A", "E", 145),
        ("A", "F", 300),
        ("B", "A", 185),
        ("B", "C", 200),
        ("B", "D", 221),
        ("B", "E", 263),
        ("B", "F", 197),
        ("C", "A", 143),
        ("C", "B", 178),
        ("C", "D", 258),
        ("C", "E", 221),
        ("C", "F", 106),
        ("D", "A", 75),
        ("D", "B", 135),
        ("D", "C", 245),
        ("D", "E", 283),
        ("D", "F", 155),
        ("E", "A", 123),
        ("E", "B", 234),
        ("E", "C", 143),
        ("E", "D", 78),
        ("E", "F", 107),
        ("F", "A", 201),
        ("F", "B", 157),
        ("F", "C", 169),
        ("F", "D", 212),
        ("F", "E", 104),
    ];

    let (mut problem, index) = build_master_data();
    problem.shipments.extend(
        SAMPLE_SHIPMENTS
            .iter()
            .filter_map(|(origin, destination, volume)| {
                Some(Shipment::new(index.get(*origin)?, index.get(*destination)?, *volume))
            }),
    );
    problem
}

/// Master data plus one shipment per ordered pair of distinct spokes, with
/// quantities drawn from a normal distribution.
///
/// Each quantity is `floor(z * std_dev + mean_qty)` for a standard normal
/// draw `z`, clamped to at least [`MIN_SHIPMENT_QTY`]. The generator is owned
/// by the call and seeded from `seed`, so the same arguments always give the
/// same shipments in the same order.
pub fn build_randomized_problem(seed: u64, mean_qty: f64, std_dev: f64) -> Result<Problem, FactoryError> {
    if !mean_qty.is_finite() || !std_dev.is_finite() || std_dev < 0.0 {
        return Err(FactoryError::InvalidDistribution {
            mean: mean_qty,
            std_dev,
        });
    }

    let mut rng = ChaCha8Rng::seed_from_u64(seed);
    let (mut problem, _) = build_master_data();

    let mut shipments = Vec::with_capacity(problem.spokes.len() * problem.spokes.len());
    for origin in &problem.spokes {
        for destination in &problem.spokes {
            if origin.name == destination.name {
                continue;
            }
            let z: f64 = StandardNormal.sample(&mut rng);
            shipments.push(Shipment::new(origin, destination, clamp_quantity(z * std_dev + mean_qty)));
        }
    }
    problem.shipments = shipments;

    Ok(problem)
}

fn clamp_quantity(raw: f64) -> u32 {
    let floored = raw.floor();
    if floored < f64::from(MIN_SHIPMENT_QTY) {
        MIN_SHIPMENT_QTY
    } else {
        // saturates above u32::MAX
        floored as u32
    }
}
