use std::{marker::PhantomData, time::Instant};

use log::{debug, info};
use mrcov_structs::{
    config::ExactConfig,
    problem::Scenario,
    report::{RunStats, SolveStatus},
    solution::{Solution, SolutionBuilder},
    trajectory::{TargetSet, TrajectoryPool},
};

use crate::{
    error::PlanError,
    extsolvers::{LPSolver, MilpStatus},
    prune::feasible_pools,
    Optimizer,
};

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum CoverageObjective {
    /// TC-OPT: fewest rounds until the coverage quota is reached.
    TimeToCover,
    /// AC-OPT: most targets covered within the horizon.
    AreaCoverage,
    /// Largest sum over rounds of the cumulative coverage.
    CumulativeCoverage,
}

impl CoverageObjective {
    pub fn name(&self) -> &'static str {
        match self {
            CoverageObjective::TimeToCover => "TC-OPT",
            CoverageObjective::AreaCoverage => "AC-OPT",
            CoverageObjective::CumulativeCoverage => "CC-OPT",
        }
    }
}

#[derive(Debug)]
enum VarInfo {
    Assign { drone: usize, traj: usize, round: u32 },
    Covered,
    QuotaReached,
}

pub struct ExactOptimizer<LP> {
    objective: CoverageObjective,
    config: ExactConfig,
    solver: PhantomData<fn() -> LP>,
}

impl<LP: LPSolver> ExactOptimizer<LP> {
    pub fn new(objective: CoverageObjective, config: ExactConfig) -> Self {
        Self {
            objective,
            config,
            solver: PhantomData,
        }
    }

    pub fn objective(&self) -> CoverageObjective {
        self.objective
    }

    fn stats(&self, objective: f64, start: Instant, status: SolveStatus) -> RunStats {
        RunStats {
            optimizer: self.objective.name().to_string(),
            objective,
            solve_time: start.elapsed(),
            status,
        }
    }

    fn solve(&self, scenario: &Scenario, pools: &[TrajectoryPool]) -> Result<Solution, PlanError> {
        let start = Instant::now();
        self.config.validate()?;
        let pools = feasible_pools(scenario.aoi().num_targets(), scenario.drones(), pools)?;
        let rounds = scenario.rounds();
        let quota = self.config.coverage_quota(scenario.aoi().num_targets());

        let mut reachable = TargetSet::new();
        for p in pools.iter() {
            reachable.union_with(&p.reachable());
        }

        if self.objective == CoverageObjective::TimeToCover {
            if quota == 0 {
                let solution = SolutionBuilder::new(scenario.drones(), rounds)
                    .build(self.stats(0.0, start, SolveStatus::Optimal));
                return Ok(solution);
            }
            if reachable.len() < quota {
                info!(
                    "{}: only {} of the {} required targets are reachable",
                    self.objective.name(),
                    reachable.len(),
                    quota
                );
                let solution = SolutionBuilder::new(scenario.drones(), rounds)
                    .build(self.stats(f64::INFINITY, start, SolveStatus::Infeasible));
                return Ok(solution);
            }
        }

        #[cfg(feature = "prof")]
        let _p = hprof::enter("build exact model");

        let mut lp = LP::new()?;
        let inf = lp.inf();
        let mut var_info: Vec<VarInfo> = Vec::new();

        // Assignment variables, and per target and round the assignment
        // variables of trajectories visiting it in that round.
        let n_targets = scenario.aoi().num_targets();
        let mut visits: Vec<Vec<Vec<LP::Var>>> = vec![vec![Vec::new(); rounds as usize]; n_targets];
        for (d, pool) in pools.iter().enumerate() {
            for r in 0..rounds {
                let mut round_vars = Vec::with_capacity(pool.len());
                for (t, traj) in pool.iter().enumerate() {
                    let var = lp.add_var(0.0)?;
                    lp.set_binary(var)?;
                    var_info.push(VarInfo::Assign {
                        drone: d,
                        traj: t,
                        round: r,
                    });
                    for i in traj.covered().iter() {
                        visits[i as usize][r as usize].push(var);
                    }
                    round_vars.push(var);
                }
                if !round_vars.is_empty() {
                    let ones = vec![1.0; round_vars.len()];
                    lp.add_constraint(-inf, 1.0, &round_vars, &ones)?;
                }
            }
        }

        // Coverage variables. `covered[r]` holds the variables of the targets
        // covered by the end of round `r`, when that is tracked per round.
        let per_round = self.objective != CoverageObjective::AreaCoverage;
        let tracked_rounds: Vec<u32> = if per_round {
            (0..rounds).collect()
        } else {
            vec![rounds - 1]
        };
        let cover_cost = match self.objective {
            CoverageObjective::TimeToCover => 0.0,
            CoverageObjective::AreaCoverage | CoverageObjective::CumulativeCoverage => -1.0,
        };
        let mut covered: Vec<Vec<LP::Var>> = vec![Vec::new(); rounds as usize];
        for i in reachable.iter() {
            for r in tracked_rounds.iter() {
                let y = lp.add_var(cover_cost)?;
                lp.set_binary(y)?;
                var_info.push(VarInfo::Covered);

                // y <= sum of visiting assignments in rounds 0..=r
                let mut idxs = vec![y];
                let mut coeffs = vec![1.0];
                for earlier in visits[i as usize][..=*r as usize].iter() {
                    idxs.extend(earlier.iter().copied());
                    coeffs.extend(earlier.iter().map(|_| -1.0));
                }
                lp.add_constraint(-inf, 0.0, &idxs, &coeffs)?;
                covered[*r as usize].push(y);
            }
        }

        if self.objective == CoverageObjective::TimeToCover {
            // u[r] = 1 once the quota is met by the end of round r; the last
            // round must meet it. Minimising the number of rounds with u = 0
            // minimises the time to cover.
            let mut reached = Vec::with_capacity(rounds as usize);
            for r in 0..rounds as usize {
                let u = lp.add_var(-1.0)?;
                lp.set_binary(u)?;
                var_info.push(VarInfo::QuotaReached);

                let mut idxs = covered[r].clone();
                let mut coeffs = vec![1.0; idxs.len()];
                idxs.push(u);
                coeffs.push(-(quota as f64));
                lp.add_constraint(0.0, inf, &idxs, &coeffs)?;

                if let Some(prev) = reached.last() {
                    lp.add_constraint(-inf, 0.0, &[*prev, u], &[1.0, -1.0])?;
                }
                reached.push(u);
            }
            if let Some(last) = reached.last() {
                lp.set_bounds(*last, 1.0, 1.0)?;
            }
        }

        if let Some(secs) = self.config.time_limit_secs {
            lp.set_time_limit(secs)?;
        }
        if let Some(gap) = self.config.mip_gap {
            lp.set_mip_gap(gap)?;
        }

        debug!(
            "{}: {} variables, {} reachable targets, quota {}",
            self.objective.name(),
            lp.num_vars(),
            reachable.len(),
            quota
        );

        #[cfg(feature = "prof")]
        drop(_p);

        let result = match lp.optimize()? {
            MilpStatus::Solved(result) => result,
            MilpStatus::Infeasible => {
                info!("{}: model is infeasible", self.objective.name());
                let solution = SolutionBuilder::new(scenario.drones(), rounds)
                    .build(self.stats(f64::INFINITY, start, SolveStatus::Infeasible));
                return Ok(solution);
            }
        };

        let mut builder = SolutionBuilder::new(scenario.drones(), rounds);
        for (info, value) in var_info.iter().zip(result.values.iter()) {
            if let VarInfo::Assign { drone, traj, round } = info {
                if *value > 0.5 {
                    builder.assign(*drone, *round, pools[*drone].trajectories[*traj].clone())?;
                }
            }
        }

        let status = if result.proven_optimal {
            SolveStatus::Optimal
        } else {
            SolveStatus::Feasible { gap: result.gap() }
        };

        // Objective values are read off the assignment.
        let provisional = builder.clone().build(self.stats(0.0, start, status));
        let objective = match self.objective {
            CoverageObjective::TimeToCover => provisional
                .time_to_cover(quota)
                .map(f64::from)
                .unwrap_or(f64::INFINITY),
            CoverageObjective::AreaCoverage => provisional.covered_count() as f64,
            CoverageObjective::CumulativeCoverage => provisional.cumulative_score() as f64,
        };
        let solution = builder.build(self.stats(objective, start, status));

        info!(
            "{}: objective {} ({:?}) in {:.3}s",
            self.objective.name(),
            objective,
            status,
            solution.stats().solve_time.as_secs_f64()
        );
        Ok(solution)
    }
}

impl<LP: LPSolver> Optimizer for ExactOptimizer<LP> {
    fn name(&self) -> &'static str {
        self.objective.name()
    }

    fn optimize(&self, scenario: &Scenario, pools: &[TrajectoryPool]) -> Result<Solution, PlanError> {
        #[cfg(feature = "prof")]
        let _p = hprof::enter("exact optimizer");
        self.solve(scenario, pools)
    }
}
