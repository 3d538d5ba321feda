use serde::{Deserialize, Serialize};
use tinyvec::TinyVec;

use crate::{aoi::AreaOfInterest, problem::Drone, DepotId, DroneId, Point, EPSILON};

#[derive(Clone, Default, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize, Debug)]
pub struct TargetSet {
    words: Vec<u64>,
}

impl TargetSet {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_indices(idxs: impl IntoIterator<Item = u32>) -> Self {
        let mut set = Self::new();
        for i in idxs {
            set.insert(i);
        }
        set
    }

    pub fn insert(&mut self, idx: u32) -> bool {
        let (w, b) = (idx as usize / 64, idx % 64);
        if self.words.len() <= w {
            self.words.resize(w + 1, 0);
        }
        let was_set = self.words[w] & (1u64 << b) != 0;
        self.words[w] |= 1u64 << b;
        !was_set
    }

    pub fn contains(&self, idx: u32) -> bool {
        let (w, b) = (idx as usize / 64, idx % 64);
        self.words.get(w).is_some_and(|word| word & (1u64 << b) != 0)
    }

    pub fn len(&self) -> usize {
        self.words.iter().map(|w| w.count_ones() as usize).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.words.iter().all(|w| *w == 0)
    }

    pub fn is_subset(&self, other: &TargetSet) -> bool {
        self.words.iter().enumerate().all(|(i, w)| {
            let o = other.words.get(i).copied().unwrap_or(0);
            w & !o == 0
        })
    }

    pub fn union_with(&mut self, other: &TargetSet) {
        if self.words.len() < other.words.len() {
            self.words.resize(other.words.len(), 0);
        }
        for (w, o) in self.words.iter_mut().zip(other.words.iter()) {
            *w |= *o;
        }
    }

    /// Number of elements of `self` missing from `other`.
    pub fn count_not_in(&self, other: &TargetSet) -> usize {
        self.words
            .iter()
            .enumerate()
            .map(|(i, w)| {
                let o = other.words.get(i).copied().unwrap_or(0);
                (w & !o).count_ones() as usize
            })
            .sum()
    }

    pub fn difference(&self, other: &TargetSet) -> TargetSet {
        let mut words = self
            .words
            .iter()
            .enumerate()
            .map(|(i, w)| w & !other.words.get(i).copied().unwrap_or(0))
            .collect::<Vec<_>>();
        while words.last() == Some(&0) {
            words.pop();
        }
        TargetSet { words }
    }

    pub fn iter(&self) -> impl Iterator<Item = u32> + '_ {
        self.words.iter().enumerate().flat_map(|(i, w)| {
            (0..64u32)
                .filter(move |b| w & (1u64 << b) != 0)
                .map(move |b| i as u32 * 64 + b)
        })
    }
}

pub type Sequence = TinyVec<[u32; 8]>;

pub fn tour_length(aoi: &AreaOfInterest, depot: Point, sequence: &[u32]) -> f64 {
    let mut prev = depot;
    let mut len = 0.0;
    for loc in sequence.iter().filter_map(|i| aoi.target_loc(*i)) {
        len += prev.dist(&loc);
        prev = loc;
    }
    len + prev.dist(&depot)
}

/// A closed tour from a depot over an ordered list of targets.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Trajectory {
    depot: DepotId,
    sequence: Sequence,
    cost: f64,
    covered: TargetSet,
}

impl Trajectory {
    /// Builds the trajectory and prices it with the drone's speed and the
    /// area's hovering time. Returns `None` for an unknown depot or target.
    pub fn new(aoi: &AreaOfInterest, depot: DepotId, sequence: &[u32], speed: f64) -> Option<Self> {
        let depot_loc = aoi.depot(depot)?.loc;
        if sequence.iter().any(|i| aoi.target(*i).is_none()) {
            return None;
        }
        let length = tour_length(aoi, depot_loc, sequence);
        let cost = length / speed + aoi.hovering_time() * sequence.len() as f64;
        Some(Self::from_parts(depot, sequence, cost))
    }

    pub fn from_parts(depot: DepotId, sequence: &[u32], cost: f64) -> Self {
        Self {
            depot,
            sequence: sequence.iter().copied().collect(),
            cost,
            covered: TargetSet::from_indices(sequence.iter().copied()),
        }
    }

    pub fn depot(&self) -> DepotId {
        self.depot
    }

    pub fn sequence(&self) -> &[u32] {
        &self.sequence
    }

    pub fn cost(&self) -> f64 {
        self.cost
    }

    pub fn covered(&self) -> &TargetSet {
        &self.covered
    }

    pub fn len(&self) -> usize {
        self.sequence.len()
    }

    pub fn is_empty(&self) -> bool {
        self.sequence.is_empty()
    }

    pub fn is_feasible_for(&self, drone: &Drone) -> bool {
        self.depot == drone.depot && self.cost <= drone.budget + EPSILON
    }

    /// `other` covers at least our targets at no higher cost.
    pub fn is_dominated_by(&self, other: &Trajectory) -> bool {
        other.cost <= self.cost + EPSILON && self.covered.is_subset(&other.covered)
    }

    pub fn length(&self, aoi: &AreaOfInterest) -> f64 {
        aoi.depot(self.depot)
            .map(|d| tour_length(aoi, d.loc, &self.sequence))
            .unwrap_or(0.0)
    }

    /// Elapsed time at which each target of the sequence has been inspected.
    pub fn inspection_times(&self, aoi: &AreaOfInterest, speed: f64) -> Vec<f64> {
        let Some(depot) = aoi.depot(self.depot) else {
            return Vec::new();
        };
        let mut prev = depot.loc;
        let mut t = 0.0;
        let mut times = Vec::with_capacity(self.sequence.len());
        for loc in self.sequence.iter().filter_map(|i| aoi.target_loc(*i)) {
            t += prev.dist(&loc) / speed + aoi.hovering_time();
            times.push(t);
            prev = loc;
        }
        times
    }
}

/// The candidate trajectories of one drone. The position of a trajectory in
/// the pool is its identifier.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct TrajectoryPool {
    pub drone: DroneId,
    pub trajectories: Vec<Trajectory>,
}

impl TrajectoryPool {
    pub fn new(drone: DroneId, trajectories: Vec<Trajectory>) -> Self {
        Self {
            drone,
            trajectories,
        }
    }

    pub fn len(&self) -> usize {
        self.trajectories.len()
    }

    pub fn is_empty(&self) -> bool {
        self.trajectories.is_empty()
    }

    pub fn get(&self, idx: usize) -> Option<&Trajectory> {
        self.trajectories.get(idx)
    }

    pub fn iter(&self) -> impl Iterator<Item = &Trajectory> {
        self.trajectories.iter()
    }

    pub fn reachable(&self) -> TargetSet {
        let mut set = TargetSet::new();
        for t in self.trajectories.iter() {
            set.union_with(&t.covered);
        }
        set
    }
}
