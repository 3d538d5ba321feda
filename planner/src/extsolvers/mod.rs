use thiserror::Error;

#[cfg(feature = "gurobi")]
pub mod gurobi;
#[cfg(feature = "highs")]
pub mod highs;
pub mod microlp;

#[derive(Debug, Error, Clone, PartialEq)]
pub enum SolverError {
    #[error("solver backend failed: {0}")]
    Backend(String),
    #[error("variable {0} does not belong to this model")]
    UnknownVariable(usize),
}

#[derive(Debug, Clone, PartialEq)]
pub struct MilpResult {
    pub objective: f64,
    /// Best proven lower bound on the objective.
    pub bound: f64,
    /// Variable values in the order the variables were added.
    pub values: Vec<f64>,
    pub proven_optimal: bool,
}

/// Relative gap up to which a solve counts as proven optimal. Matches the
/// default relative MIP gap of HiGHS and Gurobi.
pub const OPTIMALITY_TOLERANCE: f64 = 1e-4;

fn relative_gap(objective: f64, bound: f64) -> f64 {
    if !bound.is_finite() {
        return f64::INFINITY;
    }
    (objective - bound).abs() / objective.abs().max(1e-9)
}

impl MilpResult {
    /// Incumbent and bound as reported by the backend. Optimality is claimed
    /// only when the bound closes the gap, whatever made the solver stop.
    pub fn from_bound(objective: f64, bound: f64, values: Vec<f64>) -> Self {
        Self {
            objective,
            bound,
            values,
            proven_optimal: relative_gap(objective, bound) <= OPTIMALITY_TOLERANCE,
        }
    }

    /// Relative gap between the incumbent and the bound.
    pub fn gap(&self) -> f64 {
        if self.proven_optimal {
            return 0.0;
        }
        relative_gap(self.objective, self.bound)
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum MilpStatus {
    Solved(MilpResult),
    Infeasible,
}

pub trait LPSolver: Sized {
    type Var: Copy;
    fn new() -> Result<Self, SolverError>;
    fn add_var(&mut self, cost: f64) -> Result<Self::Var, SolverError>;
    fn set_binary(&mut self, var: Self::Var) -> Result<(), SolverError>;
    fn set_bounds(&mut self, var: Self::Var, lower: f64, upper: f64) -> Result<(), SolverError>;
    fn add_constraint(
        &mut self,
        lb: f64,
        ub: f64,
        vars: &[Self::Var],
        coeffs: &[f64],
    ) -> Result<(), SolverError>;
    fn set_time_limit(&mut self, seconds: f64) -> Result<(), SolverError>;
    fn set_mip_gap(&mut self, gap: f64) -> Result<(), SolverError>;
    fn optimize(&mut self) -> Result<MilpStatus, SolverError>;
    fn inf(&self) -> f64;
    fn num_vars(&self) -> usize;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn closed_bound_is_optimal() {
        let r = MilpResult::from_bound(-5.0, -5.0002, vec![1.0]);
        assert!(r.proven_optimal);
        assert_eq!(r.gap(), 0.0);
    }

    #[test]
    fn open_bound_keeps_its_gap() {
        // Stopped at a 10% gap limit: incumbent -9, bound -10.
        let r = MilpResult::from_bound(-9.0, -10.0, vec![1.0, 0.0]);
        assert!(!r.proven_optimal);
        assert!((r.gap() - 1.0 / 9.0).abs() < 1e-12);

        let r = MilpResult::from_bound(-3.0, f64::NEG_INFINITY, Vec::new());
        assert!(!r.proven_optimal);
        assert_eq!(r.gap(), f64::INFINITY);
    }
}
