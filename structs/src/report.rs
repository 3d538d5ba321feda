use std::time::Duration;

use serde::{Deserialize, Serialize};

/// How a solution was obtained.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub enum SolveStatus {
    Optimal,
    /// Best assignment found before a time or gap limit stopped the solver.
    /// `gap` is the relative distance to the best bound.
    Feasible { gap: f64 },
    Infeasible,
    Heuristic,
}

impl SolveStatus {
    pub fn is_optimal(&self) -> bool {
        matches!(self, SolveStatus::Optimal)
    }

    pub fn is_infeasible(&self) -> bool {
        matches!(self, SolveStatus::Infeasible)
    }

    pub fn gap(&self) -> Option<f64> {
        match self {
            SolveStatus::Optimal => Some(0.0),
            SolveStatus::Feasible { gap } => Some(*gap),
            SolveStatus::Infeasible | SolveStatus::Heuristic => None,
        }
    }
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct RunStats {
    pub optimizer: String,
    pub objective: f64,
    pub solve_time: Duration,
    pub status: SolveStatus,
}
