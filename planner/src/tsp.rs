use mrcov_structs::{aoi::AreaOfInterest, Point};

const IMPROVEMENT_EPS: f64 = 1e-10;

fn loc(aoi: &AreaOfInterest, depot: Point, idx: Option<u32>) -> Point {
    idx.and_then(|i| aoi.target_loc(i)).unwrap_or(depot)
}

/// Visits `targets` starting from the depot, always moving to the closest
/// unvisited target. Ties go to the lower target index.
pub fn nearest_neighbour(aoi: &AreaOfInterest, depot: Point, targets: &[u32]) -> Vec<u32> {
    let mut remaining = targets.to_vec();
    remaining.sort_unstable();
    remaining.dedup();

    let mut order = Vec::with_capacity(remaining.len());
    let mut current = depot;
    while !remaining.is_empty() {
        let mut best = 0;
        let mut best_dist = f64::INFINITY;
        for (i, t) in remaining.iter().enumerate() {
            let d = current.dist(&loc(aoi, depot, Some(*t)));
            if d < best_dist - IMPROVEMENT_EPS {
                best = i;
                best_dist = d;
            }
        }
        let next = remaining.remove(best);
        current = loc(aoi, depot, Some(next));
        order.push(next);
    }
    order
}

fn two_opt_delta(aoi: &AreaOfInterest, depot: Point, route: &[u32], i: usize, j: usize) -> f64 {
    let prev_i = loc(aoi, depot, i.checked_sub(1).map(|p| route[p]));
    let next_j = loc(aoi, depot, route.get(j + 1).copied());
    let first = loc(aoi, depot, Some(route[i]));
    let last = loc(aoi, depot, Some(route[j]));

    let old_cost = prev_i.dist(&first) + last.dist(&next_j);
    let new_cost = prev_i.dist(&last) + first.dist(&next_j);
    new_cost - old_cost
}

/// First-improvement 2-opt until no segment reversal shortens the closed
/// tour. Returns whether the route changed.
pub fn two_opt(aoi: &AreaOfInterest, depot: Point, route: &mut [u32]) -> bool {
    let n = route.len();
    if n < 2 {
        return false;
    }
    let mut changed = false;
    let mut improved = true;
    while improved {
        improved = false;
        for i in 0..n - 1 {
            for j in i + 1..n {
                if two_opt_delta(aoi, depot, route, i, j) < -IMPROVEMENT_EPS {
                    route[i..=j].reverse();
                    improved = true;
                    changed = true;
                }
            }
        }
    }
    changed
}

pub fn tsp_order(aoi: &AreaOfInterest, depot: Point, targets: &[u32]) -> Vec<u32> {
    let mut order = nearest_neighbour(aoi, depot, targets);
    two_opt(aoi, depot, &mut order);
    order
}
