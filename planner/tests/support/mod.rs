//! Scenario builders shared by the integration tests.

#![allow(dead_code)]

use mrcov_planner::extsolvers::microlp::MicroLpSolver;
use mrcov_planner::milp::{CoverageObjective, ExactOptimizer};
use mrcov_structs::{
    aoi::{AreaOfInterest, Boundary, Depot, Target},
    config::ExactConfig,
    problem::{Drone, Scenario},
    solution::Solution,
    DepotId, DroneId, Point, TargetId,
};

pub const TOLERANCE: f64 = 1e-9;

pub fn targets(points: &[(f64, f64)]) -> Vec<Target> {
    points
        .iter()
        .enumerate()
        .map(|(i, p)| Target {
            id: TargetId(i as u32),
            loc: Point::from(*p),
        })
        .collect()
}

pub fn depots(points: &[(f64, f64)]) -> Vec<Depot> {
    points
        .iter()
        .enumerate()
        .map(|(i, p)| Depot {
            id: DepotId(i as u32),
            loc: Point::from(*p),
        })
        .collect()
}

pub fn area(
    size: f64,
    target_points: &[(f64, f64)],
    depot_points: &[(f64, f64)],
) -> AreaOfInterest {
    AreaOfInterest::new(
        Boundary::rect(size, size),
        targets(target_points),
        depots(depot_points),
        0.0,
    )
    .expect("valid area of interest")
}

pub fn drone(id: u32, budget: f64, depot: u32) -> Drone {
    Drone::new(DroneId(id), budget, DepotId(depot))
}

pub fn scenario(aoi: AreaOfInterest, drones: Vec<Drone>, rounds: u32) -> Scenario {
    Scenario::new(aoi, drones, rounds).expect("valid scenario")
}

pub fn exact(objective: CoverageObjective) -> ExactOptimizer<MicroLpSolver> {
    ExactOptimizer::new(objective, ExactConfig::default())
}

/// Structural checks every solution must pass.
pub fn assert_valid_solution(scenario: &Scenario, solution: &Solution) {
    assert_eq!(solution.rounds(), scenario.rounds());
    assert_eq!(solution.num_drones(), scenario.drones().len());
    for (d, slots) in solution.slots().iter().enumerate() {
        assert_eq!(slots.len(), scenario.rounds() as usize);
        let drone = &scenario.drones()[d];
        for t in slots.iter().flatten() {
            assert_eq!(t.depot(), drone.depot);
            assert!(t.cost() <= drone.budget + TOLERANCE);
        }
    }
    for r in 1..solution.rounds() {
        let before = solution.coverage_after(r - 1).expect("round in range");
        let after = solution.coverage_after(r).expect("round in range");
        assert!(before.is_subset(after), "coverage shrank in round {r}");
    }
}
