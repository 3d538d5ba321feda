//! End-to-end runs from geometry to solution on hand-checked scenarios.

mod support;

use mrcov_planner::{
    build_optimizer, generate_pools,
    greedy::{GreedyShortlist, GreedyWithPruning},
    milp::CoverageObjective,
    plan, Optimizer, OptimizerKind,
};
use mrcov_structs::{
    config::{ExactConfig, GenerationStrategy, PlannerConfig},
    report::SolveStatus,
    trajectory::TargetSet,
};

use support::*;

/// One drone at the origin with a budget of exactly the round trip to (2,0).
/// The target at (3,0) is out of reach; the other three are reachable within
/// three rounds.
fn scenario_a() -> mrcov_structs::problem::Scenario {
    let aoi = area(
        5.0,
        &[(1.0, 0.0), (2.0, 0.0), (3.0, 0.0), (0.0, 1.0)],
        &[(0.0, 0.0)],
    );
    scenario(aoi, vec![drone(0, 4.0, 0)], 3)
}

/// Two drones, each with a cluster of three targets next to its depot.
fn scenario_b() -> mrcov_structs::problem::Scenario {
    let aoi = area(
        10.0,
        &[
            (1.0, 0.0),
            (0.0, 1.0),
            (1.0, 1.0),
            (9.0, 10.0),
            (10.0, 9.0),
            (9.0, 9.0),
        ],
        &[(0.0, 0.0), (10.0, 10.0)],
    );
    scenario(aoi, vec![drone(0, 10.0, 0), drone(1, 10.0, 1)], 2)
}

#[test]
fn scenario_a_covers_exactly_the_reachable_targets() {
    let _ = env_logger::try_init();
    let sc = scenario_a();
    let reachable = TargetSet::from_indices([0, 1, 3]);

    for strategy in [GenerationStrategy::Insertion, GenerationStrategy::TspSlices] {
        let mut config = PlannerConfig::default();
        config.generator.strategy = strategy;
        let pools = generate_pools(&sc, &config.generator).unwrap();
        assert_eq!(pools[0].reachable(), reachable, "{strategy:?}");

        for kind in [
            OptimizerKind::GreedyWithPruning,
            OptimizerKind::GreedyShortlist,
            OptimizerKind::AreaCoverage,
            OptimizerKind::CumulativeCoverage,
            OptimizerKind::GlobalGreedyTotal,
            OptimizerKind::GlobalGreedyRoundWeighted,
        ] {
            let sol = build_optimizer(kind, &config).optimize(&sc, &pools).unwrap();
            assert_valid_solution(&sc, &sol);
            assert_eq!(sol.covered(), reachable, "{strategy:?} {kind:?}");
        }
    }
}

#[test]
fn scenario_a_greedy_rounds() {
    let sc = scenario_a();
    let (_, sol) = plan(&sc, OptimizerKind::GreedyWithPruning, &PlannerConfig::default()).unwrap();
    // Round one takes two targets, round two the last reachable one.
    assert_eq!(sol.coverage_timeline(), vec![2, 3, 3]);
    assert!(sol.is_idle(0, 2));
    assert!(sol.newly_covered(1).len() == 1);
}

#[test]
fn scenario_a_time_to_cover() {
    let sc = scenario_a();

    // All four targets can never be covered.
    let (_, sol) = plan(&sc, OptimizerKind::TimeToCover, &PlannerConfig::default()).unwrap();
    assert_eq!(sol.status(), SolveStatus::Infeasible);
    assert_eq!(sol.covered_count(), 0);

    let config = PlannerConfig {
        exact: ExactConfig {
            coverage_fraction: 0.75,
            ..Default::default()
        },
        ..Default::default()
    };
    let (_, sol) = plan(&sc, OptimizerKind::TimeToCover, &config).unwrap();
    assert_eq!(sol.status(), SolveStatus::Optimal);
    assert_eq!(sol.objective(), 2.0);
    assert_eq!(sol.time_to_cover(3), Some(2));
}

#[test]
fn scenario_b_full_coverage_in_round_one() {
    let _ = env_logger::try_init();
    let sc = scenario_b();
    let pools = generate_pools(&sc, &PlannerConfig::default().generator).unwrap();

    let gap = GreedyWithPruning::default().optimize(&sc, &pools).unwrap();
    assert_valid_solution(&sc, &gap);
    assert_eq!(gap.coverage_timeline(), vec![6, 6]);

    let tc = exact(CoverageObjective::TimeToCover)
        .optimize(&sc, &pools)
        .unwrap();
    assert_eq!(tc.status(), SolveStatus::Optimal);
    assert_eq!(tc.objective(), 1.0);
    assert_eq!(tc.time_to_cover(6), Some(1));

    let ac = exact(CoverageObjective::AreaCoverage)
        .optimize(&sc, &pools)
        .unwrap();
    let opt = GreedyShortlist::default().optimize(&sc, &pools).unwrap();
    assert_valid_solution(&sc, &opt);
    assert_eq!(opt.objective(), ac.objective());
    assert_eq!(opt.covered_count(), 6);
}

#[test]
fn scenario_c_zero_budget_is_a_valid_degenerate_run() {
    let aoi = area(5.0, &[(1.0, 0.0), (0.0, 2.0)], &[(0.0, 0.0)]);
    let sc = scenario(aoi, vec![drone(0, 0.0, 0)], 3);
    let config = PlannerConfig::default();

    let pools = generate_pools(&sc, &config.generator).unwrap();
    assert_eq!(pools.len(), 1);
    assert!(pools[0].is_empty());

    for kind in OptimizerKind::ALL {
        let sol = build_optimizer(kind, &config).optimize(&sc, &pools).unwrap();
        assert_valid_solution(&sc, &sol);
        assert_eq!(sol.executed().count(), 0, "{kind:?}");
        assert_eq!(sol.coverage_timeline(), vec![0, 0, 0]);
        assert!(sol.covered().is_empty());
        match kind {
            OptimizerKind::TimeToCover => assert!(sol.status().is_infeasible()),
            OptimizerKind::AreaCoverage | OptimizerKind::CumulativeCoverage => {
                assert!(sol.status().is_optimal());
                assert_eq!(sol.objective(), 0.0);
            }
            _ => assert_eq!(sol.status(), SolveStatus::Heuristic),
        }
    }
}

#[test]
fn scenario_from_json() {
    let json = r#"{
        "aoi": {
            "boundary": {"min": {"x": 0.0, "y": 0.0}, "max": {"x": 5.0, "y": 5.0}},
            "targets": [
                {"id": 7, "loc": {"x": 1.0, "y": 0.0}},
                {"id": 9, "loc": {"x": 0.0, "y": 1.0}}
            ],
            "depots": [{"id": 0, "loc": {"x": 0.0, "y": 0.0}}],
            "hovering_time": 0.0
        },
        "drones": [{"id": 1, "budget": 4.0, "depot": 0}],
        "rounds": 2
    }"#;
    let sc: mrcov_structs::problem::Scenario = serde_json::from_str(json).unwrap();
    let (pools, sol) = plan(&sc, OptimizerKind::GreedyWithPruning, &PlannerConfig::default()).unwrap();
    assert!(!pools[0].is_empty());
    assert_eq!(sol.covered_count(), 2);

    let bad = json.replace(r#""rounds": 2"#, r#""rounds": 0"#);
    assert!(serde_json::from_str::<mrcov_structs::problem::Scenario>(&bad).is_err());
}
