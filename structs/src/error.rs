use thiserror::Error;

use crate::{DepotId, DroneId, TargetId};

/// Rejected scenario input. Raised at the boundary before any generation or
/// optimization starts.
#[derive(Debug, Error, Clone, PartialEq)]
pub enum InputError {
    #[error("target id {0} is used more than once")]
    DuplicateTarget(TargetId),
    #[error("depot id {0} is used more than once")]
    DuplicateDepot(DepotId),
    #[error("{0} and {1} share the same coordinates")]
    DuplicateDepotLocation(DepotId, DepotId),
    #[error("targets {0} and {1} share the same coordinates")]
    DuplicateTargetLocation(TargetId, TargetId),
    #[error("{depot} coincides with {target}")]
    DepotOnTarget { depot: DepotId, target: TargetId },
    #[error("{0} lies outside the area of interest")]
    TargetOutOfBounds(TargetId),
    #[error("{0} lies outside the area of interest")]
    DepotOutOfBounds(DepotId),
    #[error("non-finite coordinate in the area of interest")]
    NonFiniteCoordinate,
    #[error("area of interest boundary is empty or inverted")]
    InvalidBoundary,
    #[error("hovering time must be finite and non-negative, got {0}")]
    InvalidHoveringTime(f64),
    #[error("{drone} has invalid budget {budget}; budgets must be finite and non-negative")]
    InvalidBudget { drone: DroneId, budget: f64 },
    #[error("{drone} has invalid speed {speed}; speeds must be finite and positive")]
    InvalidSpeed { drone: DroneId, speed: f64 },
    #[error("{drone} refers to unknown {depot}")]
    UnknownDepot { drone: DroneId, depot: DepotId },
    #[error("drone id {0} is used more than once")]
    DuplicateDrone(DroneId),
    #[error("the number of rounds must be at least one")]
    NoRounds,
    #[error("coverage fraction must lie in (0, 1], got {0}")]
    InvalidCoverageFraction(f64),
    #[error("time limit must be finite and positive, got {0}")]
    InvalidTimeLimit(f64),
    #[error("MIP gap must be finite and non-negative, got {0}")]
    InvalidMipGap(f64),
    #[error("expected one trajectory pool per drone ({drones}), got {pools}")]
    PoolCountMismatch { drones: usize, pools: usize },
    #[error("a trajectory of {drone} visits target index {index}, which is not in the area")]
    UnknownTarget { drone: DroneId, index: u32 },
    #[error("pool at position {index} belongs to {found}, expected {expected}")]
    PoolDroneMismatch {
        index: usize,
        expected: DroneId,
        found: DroneId,
    },
}

/// Misuse of [`crate::solution::SolutionBuilder`].
#[derive(Debug, Error, Clone, PartialEq)]
pub enum AssignmentError {
    #[error("no drone at fleet position {0}")]
    UnknownDrone(usize),
    #[error("round {round} is outside the horizon of {rounds} rounds")]
    RoundOutOfRange { round: u32, rounds: u32 },
    #[error("{drone} already flies a trajectory in round {round}")]
    SlotTaken { drone: DroneId, round: u32 },
    #[error("trajectory cost {cost} exceeds the budget {budget} of {drone}")]
    OverBudget { drone: DroneId, cost: f64, budget: f64 },
    #[error("trajectory starts at {found} but {drone} is based at {expected}")]
    ForeignDepot {
        drone: DroneId,
        expected: DepotId,
        found: DepotId,
    },
}
