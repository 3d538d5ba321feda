use std::{cmp::Reverse, time::Instant};

use log::{debug, info, trace};
use mrcov_structs::{
    config::{DroneOrder, GreedyConfig},
    problem::{Drone, Scenario},
    report::{RunStats, SolveStatus},
    solution::{Solution, SolutionBuilder},
    trajectory::{TargetSet, Trajectory, TrajectoryPool},
};
use ordered_float::OrderedFloat;

use crate::{error::PlanError, prune::feasible_pools, Optimizer};

type Candidates<'a> = Vec<(usize, &'a Trajectory)>;

/// Best candidate by marginal gain over `covered`. Only picks with a positive
/// gain count.
fn best_choice(candidates: &[(usize, &Trajectory)], covered: &TargetSet) -> Option<(usize, usize)> {
    candidates
        .iter()
        .map(|(idx, t)| (t.covered().count_not_in(covered), *idx, *t))
        .filter(|(gain, _, _)| *gain > 0)
        .max_by_key(|(gain, idx, t)| (*gain, Reverse(OrderedFloat(t.cost())), Reverse(*idx)))
        .map(|(gain, idx, _)| (idx, gain))
}

fn best_gain(candidates: &[(usize, &Trajectory)], covered: &TargetSet) -> usize {
    best_choice(candidates, covered)
        .map(|(_, gain)| gain)
        .unwrap_or(0)
}

fn drone_order(
    order: DroneOrder,
    drones: &[Drone],
    candidates: &[Candidates],
    covered: &TargetSet,
) -> Vec<usize> {
    let mut positions: Vec<usize> = (0..drones.len()).collect();
    match order {
        DroneOrder::Fixed => {}
        DroneOrder::Budget => {
            positions.sort_by_key(|d| Reverse(OrderedFloat(drones[*d].budget)));
        }
        DroneOrder::MarginalPotential => {
            let potential: Vec<usize> = candidates.iter().map(|c| best_gain(c, covered)).collect();
            positions.sort_by_key(|d| Reverse(potential[*d]));
        }
    }
    positions
}

fn heuristic_stats(name: &str, covered: usize, start: Instant) -> RunStats {
    RunStats {
        optimizer: name.to_string(),
        objective: covered as f64,
        solve_time: start.elapsed(),
        status: SolveStatus::Heuristic,
    }
}

fn sequential_greedy(
    name: &str,
    scenario: &Scenario,
    candidates: &[Candidates],
    order: DroneOrder,
    start: Instant,
) -> Result<Solution, PlanError> {
    let drones = scenario.drones();
    let mut builder = SolutionBuilder::new(drones, scenario.rounds());
    let mut covered = TargetSet::new();

    for round in 0..scenario.rounds() {
        let mut picked = 0;
        for d in drone_order(order, drones, candidates, &covered) {
            let Some((idx, gain)) = best_choice(&candidates[d], &covered) else {
                trace!("{name}: {} idle in round {round}", drones[d].id);
                continue;
            };
            let trajectory = candidates[d]
                .iter()
                .find(|(i, _)| *i == idx)
                .map(|(_, t)| (*t).clone());
            if let Some(trajectory) = trajectory {
                covered.union_with(trajectory.covered());
                builder.assign(d, round, trajectory)?;
                trace!("{name}: {} takes #{idx} (+{gain}) in round {round}", drones[d].id);
                picked += 1;
            }
        }
        debug!(
            "{name}: round {round} assigns {picked} trajectories, {} targets covered",
            covered.len()
        );
    }

    let solution = builder.build(heuristic_stats(name, covered.len(), start));
    info!(
        "{name}: {} targets covered in {:.3}s",
        solution.covered_count(),
        solution.stats().solve_time.as_secs_f64()
    );
    Ok(solution)
}

/// AC-GaP: sequential greedy over each drone's complete pruned pool.
#[derive(Clone, Debug, Default)]
pub struct GreedyWithPruning {
    config: GreedyConfig,
}

impl GreedyWithPruning {
    pub fn new(config: GreedyConfig) -> Self {
        Self { config }
    }
}

impl Optimizer for GreedyWithPruning {
    fn name(&self) -> &'static str {
        "AC-GaP"
    }

    fn optimize(&self, scenario: &Scenario, pools: &[TrajectoryPool]) -> Result<Solution, PlanError> {
        #[cfg(feature = "prof")]
        let _p = hprof::enter("greedy with pruning");

        let start = Instant::now();
        let pools = feasible_pools(scenario.aoi().num_targets(), scenario.drones(), pools)?;
        let candidates: Vec<Candidates> = pools
            .iter()
            .map(|p| p.iter().enumerate().collect())
            .collect();
        sequential_greedy(
            self.name(),
            scenario,
            &candidates,
            self.config.drone_order,
            start,
        )
    }
}

/// AC-OpT: the same sequential greedy restricted, per drone, to a shortlist of
/// the trajectories with the largest static coverage.
#[derive(Clone, Debug, Default)]
pub struct GreedyShortlist {
    config: GreedyConfig,
}

impl GreedyShortlist {
    pub fn new(config: GreedyConfig) -> Self {
        Self { config }
    }

    /// Highest static coverage first, then cheapest, then lowest index.
    fn shortlist<'a>(&self, pool: &'a TrajectoryPool, len: usize) -> Candidates<'a> {
        let mut ranked: Candidates = pool.iter().enumerate().collect();
        ranked.sort_by_key(|(idx, t)| (Reverse(t.len()), OrderedFloat(t.cost()), *idx));
        ranked.truncate(len);
        ranked
    }
}

impl Optimizer for GreedyShortlist {
    fn name(&self) -> &'static str {
        "AC-OpT"
    }

    fn optimize(&self, scenario: &Scenario, pools: &[TrajectoryPool]) -> Result<Solution, PlanError> {
        #[cfg(feature = "prof")]
        let _p = hprof::enter("greedy shortlist");

        let start = Instant::now();
        let pools = feasible_pools(scenario.aoi().num_targets(), scenario.drones(), pools)?;
        let len = self
            .config
            .shortlist_len
            .unwrap_or(scenario.rounds() as usize)
            .max(1);
        let candidates: Vec<Candidates> = pools.iter().map(|p| self.shortlist(p, len)).collect();
        sequential_greedy(
            self.name(),
            scenario,
            &candidates,
            self.config.drone_order,
            start,
        )
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum GainWeighting {
    Total,
    /// Marginal gain times the rounds the drone has left, favouring early
    /// coverage.
    RoundWeighted,
}

/// Repeatedly assigns the best (drone, trajectory) pair over the whole fleet
/// to that drone's next free round.
#[derive(Clone, Debug)]
pub struct GlobalGreedy {
    weighting: GainWeighting,
}

impl GlobalGreedy {
    pub fn new(weighting: GainWeighting) -> Self {
        Self { weighting }
    }
}

impl Optimizer for GlobalGreedy {
    fn name(&self) -> &'static str {
        match self.weighting {
            GainWeighting::Total => "TC-GaP",
            GainWeighting::RoundWeighted => "AC-GaP-RW",
        }
    }

    fn optimize(&self, scenario: &Scenario, pools: &[TrajectoryPool]) -> Result<Solution, PlanError> {
        #[cfg(feature = "prof")]
        let _p = hprof::enter("global greedy");

        let start = Instant::now();
        let name = self.name();
        let pools = feasible_pools(scenario.aoi().num_targets(), scenario.drones(), pools)?;
        let rounds = scenario.rounds();
        let mut builder = SolutionBuilder::new(scenario.drones(), rounds);
        let mut covered = TargetSet::new();
        let mut reachable = TargetSet::new();
        for p in pools.iter() {
            reachable.union_with(&p.reachable());
        }

        while covered.len() < reachable.len() {
            // (weighted gain, cost, drone, trajectory)
            let mut best: Option<(usize, OrderedFloat<f64>, usize, usize)> = None;
            for (d, pool) in pools.iter().enumerate() {
                let Some(round) = builder.next_free_round(d) else {
                    continue;
                };
                let weight = match self.weighting {
                    GainWeighting::Total => 1,
                    GainWeighting::RoundWeighted => (rounds - round) as usize,
                };
                for (t, traj) in pool.iter().enumerate() {
                    let gain = traj.covered().count_not_in(&covered) * weight;
                    if gain == 0 {
                        continue;
                    }
                    let key = (gain, OrderedFloat(traj.cost()), d, t);
                    let better = match best {
                        None => true,
                        Some((bg, bc, bd, bt)) => {
                            (gain, Reverse(key.1), Reverse(d), Reverse(t))
                                > (bg, Reverse(bc), Reverse(bd), Reverse(bt))
                        }
                    };
                    if better {
                        best = Some(key);
                    }
                }
            }

            let Some((gain, _, d, t)) = best else {
                break;
            };
            let trajectory = pools[d].trajectories[t].clone();
            covered.union_with(trajectory.covered());
            let round = builder.append(d, trajectory)?;
            trace!(
                "{name}: {} takes #{t} (weighted gain {gain}) in round {round}",
                scenario.drones()[d].id
            );
        }

        let solution = builder.build(heuristic_stats(name, covered.len(), start));
        info!(
            "{name}: {} of {} reachable targets covered in {:.3}s",
            solution.covered_count(),
            reachable.len(),
            solution.stats().solve_time.as_secs_f64()
        );
        Ok(solution)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use mrcov_structs::{
        aoi::{AreaOfInterest, Boundary, Depot, Target},
        error::InputError,
        DepotId, DroneId, Point, TargetId,
    };

    fn scenario(n_targets: u32, drones: Vec<Drone>, rounds: u32) -> Scenario {
        let targets = (0..n_targets)
            .map(|i| Target {
                id: TargetId(i),
                loc: Point::new(1.0 + i as f64, 1.0),
            })
            .collect();
        let depots = vec![Depot {
            id: DepotId(0),
            loc: Point::new(0.0, 0.0),
        }];
        let aoi = AreaOfInterest::new(Boundary::rect(20.0, 20.0), targets, depots, 0.0).unwrap();
        Scenario::new(aoi, drones, rounds).unwrap()
    }

    fn t(seq: &[u32], cost: f64) -> Trajectory {
        Trajectory::from_parts(DepotId(0), seq, cost)
    }

    fn two_drones() -> Vec<Drone> {
        vec![
            Drone::new(DroneId(0), 10.0, DepotId(0)),
            Drone::new(DroneId(1), 20.0, DepotId(0)),
        ]
    }

    #[test]
    fn drones_in_a_round_see_each_other() {
        let _ = env_logger::try_init();
        let sc = scenario(4, two_drones(), 1);
        let pools = vec![
            TrajectoryPool::new(DroneId(0), vec![t(&[0, 1], 4.0), t(&[2], 1.0)]),
            TrajectoryPool::new(DroneId(1), vec![t(&[0, 1], 4.0), t(&[2, 3], 5.0)]),
        ];
        let sol = GreedyWithPruning::default().optimize(&sc, &pools).unwrap();
        assert_eq!(sol.assignment(0, 0).unwrap().sequence(), &[0, 1]);
        assert_eq!(sol.assignment(1, 0).unwrap().sequence(), &[2, 3]);
        assert_eq!(sol.covered_count(), 4);
        assert_eq!(sol.status(), SolveStatus::Heuristic);
        assert_eq!(sol.objective(), 4.0);
    }

    #[test]
    fn ties_go_to_cheaper_then_lower_index() {
        let sc = scenario(4, vec![Drone::new(DroneId(0), 10.0, DepotId(0))], 1);
        let pools = vec![TrajectoryPool::new(
            DroneId(0),
            vec![t(&[0, 1], 5.0), t(&[2, 3], 4.0), t(&[1, 2], 4.0)],
        )];
        let sol = GreedyWithPruning::default().optimize(&sc, &pools).unwrap();
        // Equal gain and cost: the earlier entry of the pool wins.
        assert_eq!(sol.assignment(0, 0).unwrap().sequence(), &[2, 3]);

        let swapped = vec![TrajectoryPool::new(
            DroneId(0),
            vec![t(&[1, 2], 4.0), t(&[0, 1], 5.0), t(&[2, 3], 4.0)],
        )];
        let sol = GreedyWithPruning::default().optimize(&sc, &swapped).unwrap();
        assert_eq!(sol.assignment(0, 0).unwrap().sequence(), &[1, 2]);
    }

    #[test]
    fn unknown_target_index_is_rejected() {
        let sc = scenario(2, vec![Drone::new(DroneId(0), 10.0, DepotId(0))], 2);
        let pools = vec![TrajectoryPool::new(DroneId(0), vec![t(&[0, 5], 3.0)])];
        let optimizers: Vec<Box<dyn Optimizer>> = vec![
            Box::new(GreedyWithPruning::default()),
            Box::new(GreedyShortlist::default()),
            Box::new(GlobalGreedy::new(GainWeighting::RoundWeighted)),
        ];
        for opt in optimizers {
            let err = opt.optimize(&sc, &pools).unwrap_err();
            assert_eq!(
                err,
                PlanError::Input(InputError::UnknownTarget {
                    drone: DroneId(0),
                    index: 5
                }),
                "{}",
                opt.name()
            );
        }
    }

    #[test]
    fn budget_order_lets_the_big_drone_pick_first() {
        let sc = scenario(4, two_drones(), 1);
        let pools = vec![
            TrajectoryPool::new(DroneId(0), vec![t(&[0, 1], 4.0)]),
            TrajectoryPool::new(DroneId(1), vec![t(&[0, 1], 4.0), t(&[2], 1.0)]),
        ];
        let fixed = GreedyWithPruning::default().optimize(&sc, &pools).unwrap();
        assert_eq!(fixed.covered_count(), 3);

        let config = GreedyConfig {
            drone_order: DroneOrder::Budget,
            ..Default::default()
        };
        let by_budget = GreedyWithPruning::new(config).optimize(&sc, &pools).unwrap();
        assert_eq!(by_budget.assignment(1, 0).unwrap().sequence(), &[0, 1]);
        assert!(by_budget.is_idle(0, 0));
        assert_eq!(by_budget.covered_count(), 2);
    }

    #[test]
    fn marginal_potential_order() {
        let sc = scenario(5, two_drones(), 1);
        let pools = vec![
            TrajectoryPool::new(DroneId(0), vec![t(&[0], 1.0)]),
            TrajectoryPool::new(DroneId(1), vec![t(&[0, 1, 2], 4.0)]),
        ];
        let config = GreedyConfig {
            drone_order: DroneOrder::MarginalPotential,
            ..Default::default()
        };
        let sol = GreedyWithPruning::new(config).optimize(&sc, &pools).unwrap();
        assert!(sol.assignment(1, 0).is_some());
        assert!(sol.is_idle(0, 0));
    }

    #[test]
    fn no_gain_means_idle() {
        let sc = scenario(2, vec![Drone::new(DroneId(0), 10.0, DepotId(0))], 3);
        let pools = vec![TrajectoryPool::new(DroneId(0), vec![t(&[0, 1], 4.0)])];
        let sol = GreedyWithPruning::default().optimize(&sc, &pools).unwrap();
        assert!(sol.assignment(0, 0).is_some());
        assert!(sol.is_idle(0, 1) && sol.is_idle(0, 2));
        assert_eq!(sol.coverage_timeline(), vec![2, 2, 2]);
    }

    #[test]
    fn shortlist_limits_the_search() {
        let sc = scenario(6, vec![Drone::new(DroneId(0), 10.0, DepotId(0))], 2);
        let pools = vec![TrajectoryPool::new(
            DroneId(0),
            vec![t(&[0, 1, 2], 6.0), t(&[0, 1, 3], 6.5), t(&[4, 5], 3.0)],
        )];
        let full = GreedyWithPruning::default().optimize(&sc, &pools).unwrap();
        assert_eq!(full.covered_count(), 5);

        // Two rounds give a shortlist of the two three-target tours.
        let short = GreedyShortlist::default().optimize(&sc, &pools).unwrap();
        assert_eq!(short.covered_count(), 4);

        let config = GreedyConfig {
            shortlist_len: Some(3),
            ..Default::default()
        };
        let wide = GreedyShortlist::new(config).optimize(&sc, &pools).unwrap();
        assert_eq!(wide.covered_count(), 5);
    }

    #[test]
    fn global_greedy_fills_next_free_round() {
        let sc = scenario(5, two_drones(), 2);
        let pools = vec![
            TrajectoryPool::new(DroneId(0), vec![t(&[0, 1, 2], 6.0), t(&[3], 1.0)]),
            TrajectoryPool::new(DroneId(1), vec![t(&[0, 1, 2], 6.0), t(&[4], 1.0)]),
        ];
        for weighting in [GainWeighting::Total, GainWeighting::RoundWeighted] {
            let sol = GlobalGreedy::new(weighting).optimize(&sc, &pools).unwrap();
            assert_eq!(sol.covered_count(), 5);
            assert_eq!(sol.assignment(0, 0).unwrap().sequence(), &[0, 1, 2]);
            assert_eq!(sol.coverage_timeline()[0], 4);
        }
    }

    #[test]
    fn round_weighting_prefers_early_slots() {
        let drones = vec![Drone::new(DroneId(0), 10.0, DepotId(0))];
        let sc = scenario(5, drones, 2);
        let pools = vec![TrajectoryPool::new(
            DroneId(0),
            vec![t(&[0, 1], 2.0), t(&[2, 3, 4], 3.0)],
        )];
        let sol = GlobalGreedy::new(GainWeighting::RoundWeighted)
            .optimize(&sc, &pools)
            .unwrap();
        assert_eq!(sol.assignment(0, 0).unwrap().sequence(), &[2, 3, 4]);
        assert_eq!(sol.coverage_timeline(), vec![3, 5]);
    }

    #[test]
    fn empty_pools_idle_everywhere() {
        let sc = scenario(3, two_drones(), 2);
        let pools = vec![
            TrajectoryPool::new(DroneId(0), Vec::new()),
            TrajectoryPool::new(DroneId(1), Vec::new()),
        ];
        let optimizers: Vec<Box<dyn Optimizer>> = vec![
            Box::new(GreedyWithPruning::default()),
            Box::new(GreedyShortlist::default()),
            Box::new(GlobalGreedy::new(GainWeighting::Total)),
        ];
        for opt in optimizers {
            let sol = opt.optimize(&sc, &pools).unwrap();
            assert_eq!(sol.executed().count(), 0, "{}", opt.name());
            assert_eq!(sol.coverage_timeline(), vec![0, 0]);
        }
    }
}
