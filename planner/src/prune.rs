use std::cmp::Reverse;

use log::{trace, warn};
use mrcov_structs::{
    error::InputError,
    problem::Drone,
    trajectory::{Trajectory, TrajectoryPool},
};
use ordered_float::OrderedFloat;

fn sort_key(t: &Trajectory) -> (OrderedFloat<f64>, Reverse<usize>, &[u32]) {
    (OrderedFloat(t.cost()), Reverse(t.len()), t.sequence())
}

/// Positions of the trajectories no other one dominates. Among trajectories
/// dominating each other (same targets, same cost) the one with the smallest
/// sequence in lexicographic order survives.
fn pareto_positions(trajectories: &[Trajectory]) -> Vec<usize> {
    let mut order: Vec<usize> = (0..trajectories.len()).collect();
    order.sort_by(|a, b| sort_key(&trajectories[*a]).cmp(&sort_key(&trajectories[*b])));

    let mut front: Vec<usize> = Vec::with_capacity(order.len());
    for i in order {
        let new = &trajectories[i];
        if front.iter().any(|k| new.is_dominated_by(&trajectories[*k])) {
            continue;
        }
        front.retain(|k| !trajectories[*k].is_dominated_by(new));
        front.push(i);
    }
    front
}

fn keep_positions(trajectories: Vec<Trajectory>, positions: &[usize]) -> Vec<Trajectory> {
    let mut keep = vec![false; trajectories.len()];
    for i in positions {
        keep[*i] = true;
    }
    trajectories
        .into_iter()
        .zip(keep)
        .filter_map(|(t, k)| k.then_some(t))
        .collect()
}

/// Removes every dominated trajectory. The front is ordered by ascending
/// cost.
pub fn prune_dominated(trajectories: Vec<Trajectory>) -> Vec<Trajectory> {
    #[cfg(feature = "prof")]
    let _p = hprof::enter("prune dominated");

    let before = trajectories.len();
    let positions = pareto_positions(&trajectories);
    let mut front = keep_positions(trajectories, &positions);
    front.sort_by(|a, b| sort_key(a).cmp(&sort_key(b)));
    trace!("pruning kept {} of {} trajectories", front.len(), before);
    front
}

/// Keeps at most `max` trajectories, preferring the ones covering the most
/// targets and then the cheapest. The result is ordered by ascending cost.
pub fn truncate_pool(mut trajectories: Vec<Trajectory>, max: usize) -> Vec<Trajectory> {
    if trajectories.len() <= max {
        return trajectories;
    }
    trajectories.sort_by(|a, b| {
        (Reverse(a.len()), OrderedFloat(a.cost()), a.sequence()).cmp(&(
            Reverse(b.len()),
            OrderedFloat(b.cost()),
            b.sequence(),
        ))
    });
    trajectories.truncate(max);
    trajectories.sort_by(|a, b| sort_key(a).cmp(&sort_key(b)));
    trajectories
}

/// The part of a pool the drone can actually fly, pruned. Trajectories from
/// another depot or over the drone's budget are dropped with a warning.
/// Survivors keep their order in `pool`, so pool positions still rank ties.
pub fn feasible_pool(pool: &TrajectoryPool, drone: &Drone) -> TrajectoryPool {
    let feasible: Vec<Trajectory> = pool
        .iter()
        .filter(|t| t.is_feasible_for(drone))
        .cloned()
        .collect();
    if feasible.len() < pool.len() {
        warn!(
            "{}: ignoring {} trajectories over budget or from another depot",
            drone.id,
            pool.len() - feasible.len()
        );
    }
    let positions = pareto_positions(&feasible);
    TrajectoryPool::new(drone.id, keep_positions(feasible, &positions))
}

/// Checks that `pools` holds one pool per drone in fleet order, visiting only
/// targets below `num_targets`, and returns their feasible, pruned parts.
pub fn feasible_pools(
    num_targets: usize,
    drones: &[Drone],
    pools: &[TrajectoryPool],
) -> Result<Vec<TrajectoryPool>, InputError> {
    if drones.len() != pools.len() {
        return Err(InputError::PoolCountMismatch {
            drones: drones.len(),
            pools: pools.len(),
        });
    }
    drones
        .iter()
        .zip(pools.iter())
        .enumerate()
        .map(|(index, (drone, pool))| {
            if pool.drone != drone.id {
                return Err(InputError::PoolDroneMismatch {
                    index,
                    expected: drone.id,
                    found: pool.drone,
                });
            }
            let unknown = pool
                .iter()
                .flat_map(|t| t.covered().iter())
                .find(|i| *i as usize >= num_targets);
            if let Some(target) = unknown {
                return Err(InputError::UnknownTarget {
                    drone: drone.id,
                    index: target,
                });
            }
            Ok(feasible_pool(pool, drone))
        })
        .collect()
}
