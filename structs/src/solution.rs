use serde::{Deserialize, Serialize};

use crate::{
    error::AssignmentError,
    problem::Drone,
    report::{RunStats, SolveStatus},
    trajectory::{TargetSet, Trajectory},
    DroneId,
};

/// Per-round, per-drone assignment of trajectories together with the derived
/// cumulative coverage. Rounds are indexed from zero.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Solution {
    rounds: u32,
    drones: Vec<DroneId>,
    slots: Vec<Vec<Option<Trajectory>>>,
    coverage: Vec<TargetSet>,
    stats: RunStats,
}

impl Solution {
    pub fn rounds(&self) -> u32 {
        self.rounds
    }

    pub fn drones(&self) -> &[DroneId] {
        &self.drones
    }

    pub fn num_drones(&self) -> usize {
        self.drones.len()
    }

    /// `slots()[d][r]` is the trajectory flown by the drone at fleet position
    /// `d` in round `r`, or `None` when it stays idle.
    pub fn slots(&self) -> &[Vec<Option<Trajectory>>] {
        &self.slots
    }

    pub fn assignment(&self, drone: usize, round: u32) -> Option<&Trajectory> {
        self.slots
            .get(drone)
            .and_then(|s| s.get(round as usize))
            .and_then(|t| t.as_ref())
    }

    pub fn is_idle(&self, drone: usize, round: u32) -> bool {
        self.assignment(drone, round).is_none()
    }

    pub fn executed(&self) -> impl Iterator<Item = (usize, u32, &Trajectory)> {
        self.slots.iter().enumerate().flat_map(|(d, rounds)| {
            rounds
                .iter()
                .enumerate()
                .filter_map(move |(r, t)| t.as_ref().map(|t| (d, r as u32, t)))
        })
    }

    /// Targets covered in rounds `0..=round`.
    pub fn coverage_after(&self, round: u32) -> Option<&TargetSet> {
        self.coverage.get(round as usize)
    }

    pub fn covered(&self) -> TargetSet {
        self.coverage.last().cloned().unwrap_or_default()
    }

    pub fn covered_count(&self) -> usize {
        self.coverage.last().map(|c| c.len()).unwrap_or(0)
    }

    pub fn coverage_timeline(&self) -> Vec<usize> {
        self.coverage.iter().map(|c| c.len()).collect()
    }

    pub fn newly_covered(&self, round: u32) -> TargetSet {
        let r = round as usize;
        match (self.coverage.get(r), r.checked_sub(1)) {
            (Some(now), Some(prev)) => now.difference(&self.coverage[prev]),
            (Some(now), None) => now.clone(),
            (None, _) => TargetSet::new(),
        }
    }

    /// Sum over rounds of the cumulative coverage; rewards covering early.
    pub fn cumulative_score(&self) -> usize {
        self.coverage_timeline().iter().sum()
    }

    /// First round (counted from one) after which at least `quota` targets
    /// are covered.
    pub fn time_to_cover(&self, quota: usize) -> Option<u32> {
        if quota == 0 {
            return Some(0);
        }
        self.coverage
            .iter()
            .position(|c| c.len() >= quota)
            .map(|r| r as u32 + 1)
    }

    pub fn stats(&self) -> &RunStats {
        &self.stats
    }

    pub fn status(&self) -> SolveStatus {
        self.stats.status
    }

    pub fn objective(&self) -> f64 {
        self.stats.objective
    }
}

/// Owned, mutable assignment under construction. Enforces one trajectory per
/// drone and round and the drone's budget and depot.
#[derive(Clone, Debug)]
pub struct SolutionBuilder {
    rounds: u32,
    drones: Vec<Drone>,
    slots: Vec<Vec<Option<Trajectory>>>,
}

impl SolutionBuilder {
    pub fn new(drones: &[Drone], rounds: u32) -> Self {
        Self {
            rounds,
            drones: drones.to_vec(),
            slots: vec![vec![None; rounds as usize]; drones.len()],
        }
    }

    pub fn rounds(&self) -> u32 {
        self.rounds
    }

    pub fn is_free(&self, drone: usize, round: u32) -> bool {
        self.slots
            .get(drone)
            .and_then(|s| s.get(round as usize))
            .is_some_and(|t| t.is_none())
    }

    pub fn next_free_round(&self, drone: usize) -> Option<u32> {
        self.slots
            .get(drone)?
            .iter()
            .position(|t| t.is_none())
            .map(|r| r as u32)
    }

    pub fn assign(
        &mut self,
        drone: usize,
        round: u32,
        trajectory: Trajectory,
    ) -> Result<&mut Self, AssignmentError> {
        let d = self
            .drones
            .get(drone)
            .ok_or(AssignmentError::UnknownDrone(drone))?;
        if round >= self.rounds {
            return Err(AssignmentError::RoundOutOfRange {
                round,
                rounds: self.rounds,
            });
        }
        if trajectory.depot() != d.depot {
            return Err(AssignmentError::ForeignDepot {
                drone: d.id,
                expected: d.depot,
                found: trajectory.depot(),
            });
        }
        if !trajectory.is_feasible_for(d) {
            return Err(AssignmentError::OverBudget {
                drone: d.id,
                cost: trajectory.cost(),
                budget: d.budget,
            });
        }
        let slot = &mut self.slots[drone][round as usize];
        if slot.is_some() {
            return Err(AssignmentError::SlotTaken { drone: d.id, round });
        }
        *slot = Some(trajectory);
        Ok(self)
    }

    /// Assigns the trajectory to the drone's first idle round and returns it.
    pub fn append(&mut self, drone: usize, trajectory: Trajectory) -> Result<u32, AssignmentError> {
        let round = self
            .next_free_round(drone)
            .ok_or(AssignmentError::RoundOutOfRange {
                round: self.rounds,
                rounds: self.rounds,
            })?;
        self.assign(drone, round, trajectory)?;
        Ok(round)
    }

    pub fn covered(&self) -> TargetSet {
        let mut set = TargetSet::new();
        for t in self.slots.iter().flatten().flatten() {
            set.union_with(t.covered());
        }
        set
    }

    pub fn build(self, stats: RunStats) -> Solution {
        let mut coverage = Vec::with_capacity(self.rounds as usize);
        let mut covered = TargetSet::new();
        for r in 0..self.rounds as usize {
            for t in self.slots.iter().filter_map(|s| s[r].as_ref()) {
                covered.union_with(t.covered());
            }
            coverage.push(covered.clone());
        }

        Solution {
            rounds: self.rounds,
            drones: self.drones.iter().map(|d| d.id).collect(),
            slots: self.slots,
            coverage,
            stats,
        }
    }
}
