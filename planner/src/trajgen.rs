use std::collections::BTreeMap;

use log::{debug, info, warn};
use mrcov_structs::{
    aoi::AreaOfInterest,
    config::{GenerationStrategy, GeneratorConfig},
    error::InputError,
    problem::Drone,
    trajectory::{tour_length, Sequence, TargetSet, Trajectory, TrajectoryPool},
    Point, EPSILON,
};
use ordered_float::OrderedFloat;
use rayon::prelude::*;

use crate::{
    prune::{prune_dominated, truncate_pool},
    tsp,
};

#[derive(Clone, Debug)]
struct PartialTour {
    sequence: Sequence,
    length: f64,
}

pub struct TrajectoryGenerator<'a> {
    aoi: &'a AreaOfInterest,
    config: GeneratorConfig,
}

impl<'a> TrajectoryGenerator<'a> {
    pub fn new(aoi: &'a AreaOfInterest, config: GeneratorConfig) -> Self {
        Self { aoi, config }
    }

    pub fn config(&self) -> &GeneratorConfig {
        &self.config
    }

    /// Feasible, non-dominated trajectories of the drone. A budget too small
    /// for any round trip gives an empty pool.
    pub fn generate(&self, drone: &Drone) -> Result<TrajectoryPool, InputError> {
        #[cfg(feature = "prof")]
        let _p = hprof::enter("generate trajectories");

        if !(drone.budget.is_finite() && drone.budget >= 0.0) {
            return Err(InputError::InvalidBudget {
                drone: drone.id,
                budget: drone.budget,
            });
        }
        if !(drone.speed.is_finite() && drone.speed > 0.0) {
            return Err(InputError::InvalidSpeed {
                drone: drone.id,
                speed: drone.speed,
            });
        }
        let depot = self
            .aoi
            .depot(drone.depot)
            .ok_or(InputError::UnknownDepot {
                drone: drone.id,
                depot: drone.depot,
            })?;

        let reachable = self.reachable_targets(depot.loc, drone);
        if reachable.is_empty() {
            info!("{}: budget {} reaches no target", drone.id, drone.budget);
            return Ok(TrajectoryPool::new(drone.id, Vec::new()));
        }

        let tours = match self.config.strategy {
            GenerationStrategy::Insertion => self.insertion_tours(depot.loc, drone, &reachable),
            GenerationStrategy::TspSlices => self.tsp_slice_tours(depot.loc, drone, &reachable),
        };
        let candidates = tours.len();

        let trajectories = tours
            .into_iter()
            .map(|t| Trajectory::from_parts(drone.depot, &t.sequence, self.cost(&t, drone)))
            .collect::<Vec<_>>();
        let mut trajectories = prune_dominated(trajectories);
        if let Some(max) = self.config.max_pool_size {
            if trajectories.len() > max {
                warn!(
                    "{}: truncating pool from {} to {} trajectories",
                    drone.id,
                    trajectories.len(),
                    max
                );
                trajectories = truncate_pool(trajectories, max);
            }
        }

        info!(
            "{}: {} reachable targets, {} candidate tours, {} kept",
            drone.id,
            reachable.len(),
            candidates,
            trajectories.len()
        );
        Ok(TrajectoryPool::new(drone.id, trajectories))
    }

    fn cost(&self, tour: &PartialTour, drone: &Drone) -> f64 {
        drone.travel_time(tour.length) + self.aoi.hovering_time() * tour.sequence.len() as f64
    }

    fn within_budget(&self, tour: &PartialTour, drone: &Drone) -> bool {
        self.cost(tour, drone) <= drone.budget + EPSILON
    }

    fn max_len(&self) -> usize {
        self.config.max_targets_per_tour.unwrap_or(usize::MAX)
    }

    /// Targets whose single round trip fits in the budget, in index order.
    fn reachable_targets(&self, depot: Point, drone: &Drone) -> Vec<u32> {
        if self.max_len() == 0 {
            return Vec::new();
        }
        (0..self.aoi.num_targets() as u32)
            .filter(|i| {
                let tour = self.single(depot, *i);
                self.within_budget(&tour, drone)
            })
            .collect()
    }

    fn single(&self, depot: Point, target: u32) -> PartialTour {
        let mut sequence = Sequence::default();
        sequence.push(target);
        let length = tour_length(self.aoi, depot, &sequence);
        PartialTour { sequence, length }
    }

    fn loc(&self, depot: Point, idx: Option<&u32>) -> Point {
        idx.and_then(|i| self.aoi.target_loc(*i)).unwrap_or(depot)
    }

    /// Inserts `target` where it lengthens the tour the least. Ties go to the
    /// earliest position.
    fn cheapest_insertion(&self, depot: Point, tour: &PartialTour, target: u32) -> PartialTour {
        let t = self.loc(depot, Some(&target));
        let seq = &tour.sequence;
        let mut best_pos = 0;
        let mut best_delta = f64::INFINITY;
        for pos in 0..=seq.len() {
            let prev = self.loc(depot, pos.checked_sub(1).and_then(|p| seq.get(p)));
            let next = self.loc(depot, seq.get(pos));
            let delta = prev.dist(&t) + t.dist(&next) - prev.dist(&next);
            if delta < best_delta - EPSILON {
                best_pos = pos;
                best_delta = delta;
            }
        }
        let mut sequence = seq.clone();
        sequence.insert(best_pos, target);
        PartialTour {
            sequence,
            length: tour.length + best_delta,
        }
    }

    /// Keeps the `beam_width` cheapest tours of a level.
    fn cap_level(
        &self,
        level: BTreeMap<TargetSet, PartialTour>,
        drone: &Drone,
        size: usize,
    ) -> BTreeMap<TargetSet, PartialTour> {
        let Some(width) = self.config.beam_width else {
            return level;
        };
        if level.len() <= width {
            return level;
        }
        let total = level.len();
        let mut ranked: Vec<(TargetSet, PartialTour)> = level.into_iter().collect();
        ranked.sort_by(|(_, a), (_, b)| {
            (OrderedFloat(a.length), a.sequence.as_slice())
                .cmp(&(OrderedFloat(b.length), b.sequence.as_slice()))
        });
        ranked.truncate(width);
        debug!("{}: beam keeps {width} of {total} tours with {size} targets", drone.id);
        ranked.into_iter().collect()
    }

    fn insertion_tours(&self, depot: Point, drone: &Drone, reachable: &[u32]) -> Vec<PartialTour> {
        let mut level: BTreeMap<TargetSet, PartialTour> = reachable
            .iter()
            .map(|i| (TargetSet::from_indices([*i]), self.single(depot, *i)))
            .collect();
        let mut all = Vec::new();
        let mut size = 1;
        let mut repaired = 0usize;

        while !level.is_empty() {
            debug!("{}: {} tours with {} targets", drone.id, level.len(), size);
            if size >= self.max_len() {
                all.extend(level.into_values());
                break;
            }

            let mut next: BTreeMap<TargetSet, PartialTour> = BTreeMap::new();
            for (set, tour) in level.iter() {
                for target in reachable.iter().filter(|t| !set.contains(**t)) {
                    let mut extended = self.cheapest_insertion(depot, tour, *target);
                    if !self.within_budget(&extended, drone) {
                        if !tsp::two_opt(self.aoi, depot, &mut extended.sequence) {
                            continue;
                        }
                        extended.length = tour_length(self.aoi, depot, &extended.sequence);
                        if !self.within_budget(&extended, drone) {
                            continue;
                        }
                        repaired += 1;
                    }

                    let mut key = set.clone();
                    key.insert(*target);
                    let better = match next.get(&key) {
                        Some(existing) => {
                            extended.length < existing.length - EPSILON
                                || (extended.length <= existing.length + EPSILON
                                    && extended.sequence.as_slice() < existing.sequence.as_slice())
                        }
                        None => true,
                    };
                    if better {
                        next.insert(key, extended);
                    }
                }
            }

            all.extend(level.into_values());
            size += 1;
            level = self.cap_level(next, drone, size);
        }

        if repaired > 0 {
            debug!("{}: 2-opt rescued {} over-budget extensions", drone.id, repaired);
        }
        all
    }

    fn tsp_slice_tours(&self, depot: Point, drone: &Drone, reachable: &[u32]) -> Vec<PartialTour> {
        let order = tsp::tsp_order(self.aoi, depot, reachable);
        let mut tours = Vec::new();
        for i in 0..order.len() {
            for j in i..order.len().min(i.saturating_add(self.max_len())) {
                let sequence: Sequence = order[i..=j].iter().copied().collect();
                let length = tour_length(self.aoi, depot, &sequence);
                let tour = PartialTour { sequence, length };
                if !self.within_budget(&tour, drone) {
                    // Longer slices of the same tour cannot get cheaper.
                    break;
                }
                tours.push(tour);
            }
        }
        tours
    }
}

/// Generates the pools of the whole fleet in parallel, in fleet order.
pub fn generate_fleet(
    aoi: &AreaOfInterest,
    drones: &[Drone],
    config: &GeneratorConfig,
) -> Result<Vec<TrajectoryPool>, InputError> {
    let generator = TrajectoryGenerator::new(aoi, config.clone());
    drones.par_iter().map(|d| generator.generate(d)).collect()
}
