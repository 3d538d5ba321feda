use log::info;
use mrcov_structs::{
    config::{GeneratorConfig, PlannerConfig},
    problem::Scenario,
    solution::Solution,
    trajectory::TrajectoryPool,
};
use rayon::prelude::*;

use crate::{
    error::PlanError,
    greedy::{GainWeighting, GlobalGreedy, GreedyShortlist, GreedyWithPruning},
    milp::{CoverageObjective, ExactOptimizer},
};

pub mod error;
pub mod extsolvers;
pub mod greedy;
pub mod milp;
pub mod prune;
pub mod trajgen;
pub mod tsp;

#[cfg(feature = "highs")]
pub type DefaultSolver = extsolvers::highs::HighsSolver;
#[cfg(all(feature = "gurobi", not(feature = "highs")))]
pub type DefaultSolver = extsolvers::gurobi::GurobiSolver;
#[cfg(not(any(feature = "highs", feature = "gurobi")))]
pub type DefaultSolver = extsolvers::microlp::MicroLpSolver;

/// Turns per-drone trajectory pools into a multi-round assignment.
///
/// `pools` holds one pool per drone, in fleet order. Entries a drone cannot
/// fly are ignored and the pools are pruned before use. Greedy picks with
/// equal gain and cost go to the trajectory listed first in its pool.
pub trait Optimizer: Send + Sync {
    fn name(&self) -> &'static str;
    fn optimize(&self, scenario: &Scenario, pools: &[TrajectoryPool])
        -> Result<Solution, PlanError>;
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum OptimizerKind {
    TimeToCover,
    AreaCoverage,
    CumulativeCoverage,
    GreedyWithPruning,
    GreedyShortlist,
    GlobalGreedyTotal,
    GlobalGreedyRoundWeighted,
}

impl OptimizerKind {
    pub const ALL: [OptimizerKind; 7] = [
        OptimizerKind::TimeToCover,
        OptimizerKind::AreaCoverage,
        OptimizerKind::CumulativeCoverage,
        OptimizerKind::GreedyWithPruning,
        OptimizerKind::GreedyShortlist,
        OptimizerKind::GlobalGreedyTotal,
        OptimizerKind::GlobalGreedyRoundWeighted,
    ];

    pub fn is_exact(&self) -> bool {
        matches!(
            self,
            OptimizerKind::TimeToCover
                | OptimizerKind::AreaCoverage
                | OptimizerKind::CumulativeCoverage
        )
    }
}

pub fn build_optimizer(kind: OptimizerKind, config: &PlannerConfig) -> Box<dyn Optimizer> {
    let exact = |objective| -> Box<dyn Optimizer> {
        Box::new(ExactOptimizer::<DefaultSolver>::new(
            objective,
            config.exact.clone(),
        ))
    };
    match kind {
        OptimizerKind::TimeToCover => exact(CoverageObjective::TimeToCover),
        OptimizerKind::AreaCoverage => exact(CoverageObjective::AreaCoverage),
        OptimizerKind::CumulativeCoverage => exact(CoverageObjective::CumulativeCoverage),
        OptimizerKind::GreedyWithPruning => {
            Box::new(GreedyWithPruning::new(config.greedy.clone()))
        }
        OptimizerKind::GreedyShortlist => Box::new(GreedyShortlist::new(config.greedy.clone())),
        OptimizerKind::GlobalGreedyTotal => Box::new(GlobalGreedy::new(GainWeighting::Total)),
        OptimizerKind::GlobalGreedyRoundWeighted => {
            Box::new(GlobalGreedy::new(GainWeighting::RoundWeighted))
        }
    }
}

pub fn generate_pools(
    scenario: &Scenario,
    config: &GeneratorConfig,
) -> Result<Vec<TrajectoryPool>, PlanError> {
    #[cfg(feature = "prof")]
    let _p = hprof::enter("generate pools");

    let pools = trajgen::generate_fleet(scenario.aoi(), scenario.drones(), config)?;
    info!(
        "generated {} trajectories for {} drones",
        pools.iter().map(|p| p.len()).sum::<usize>(),
        pools.len()
    );
    Ok(pools)
}

pub fn plan(
    scenario: &Scenario,
    kind: OptimizerKind,
    config: &PlannerConfig,
) -> Result<(Vec<TrajectoryPool>, Solution), PlanError> {
    let pools = generate_pools(scenario, &config.generator)?;
    let solution = build_optimizer(kind, config).optimize(scenario, &pools)?;
    Ok((pools, solution))
}

/// Runs independent optimizers over the same read-only inputs in parallel.
/// Results come back in the order of `optimizers`.
pub fn run_parallel(
    scenario: &Scenario,
    pools: &[TrajectoryPool],
    optimizers: &[Box<dyn Optimizer>],
) -> Vec<Result<Solution, PlanError>> {
    optimizers
        .par_iter()
        .map(|opt| opt.optimize(scenario, pools))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use mrcov_structs::{
        aoi::{AreaOfInterest, Boundary, Depot, Target},
        problem::Drone,
        report::SolveStatus,
        DepotId, DroneId, Point, TargetId,
    };

    fn scenario() -> Scenario {
        let targets = [(1.0, 1.0), (2.0, 1.0), (1.0, 2.0), (6.0, 6.0)]
            .iter()
            .enumerate()
            .map(|(i, p)| Target {
                id: TargetId(100 + i as u32),
                loc: Point::from(*p),
            })
            .collect();
        let depots = vec![Depot {
            id: DepotId(0),
            loc: Point::new(0.0, 0.0),
        }];
        let aoi = AreaOfInterest::new(Boundary::rect(10.0, 10.0), targets, depots, 0.0).unwrap();
        Scenario::new(
            aoi,
            vec![
                Drone::new(DroneId(0), 7.0, DepotId(0)),
                Drone::new(DroneId(1), 20.0, DepotId(0)),
            ],
            2,
        )
        .unwrap()
    }

    #[test]
    fn every_kind_builds_and_runs() {
        let _ = env_logger::try_init();
        let sc = scenario();
        let config = PlannerConfig::default();
        for kind in OptimizerKind::ALL {
            let (pools, sol) = plan(&sc, kind, &config).unwrap();
            assert_eq!(pools.len(), 2);
            assert_eq!(sol.covered_count(), 4, "{kind:?}");
            assert_eq!(sol.status().is_optimal(), kind.is_exact(), "{kind:?}");
            for (d, r, t) in sol.executed() {
                assert!(t.cost() <= sc.drones()[d].budget + 1e-9);
                assert!(r < sc.rounds());
            }
        }
    }

    #[test]
    fn parallel_runs_match_sequential_ones() {
        let sc = scenario();
        let config = PlannerConfig::default();
        let pools = generate_pools(&sc, &config.generator).unwrap();
        let optimizers: Vec<Box<dyn Optimizer>> = OptimizerKind::ALL
            .iter()
            .map(|k| build_optimizer(*k, &config))
            .collect();
        let results = run_parallel(&sc, &pools, &optimizers);
        assert_eq!(results.len(), optimizers.len());
        for (opt, result) in optimizers.iter().zip(results) {
            let parallel = result.unwrap();
            let sequential = opt.optimize(&sc, &pools).unwrap();
            assert_eq!(parallel.stats().optimizer, opt.name());
            if parallel.status() == SolveStatus::Heuristic {
                assert_eq!(parallel.slots(), sequential.slots());
            }
            assert_eq!(parallel.objective(), sequential.objective());
        }
    }

    #[test]
    fn invalid_exact_config_is_rejected() {
        let sc = scenario();
        let mut config = PlannerConfig::default();
        config.exact.coverage_fraction = 1.5;
        let err = plan(&sc, OptimizerKind::TimeToCover, &config).unwrap_err();
        assert!(matches!(err, PlanError::Input(_)));
    }
}
