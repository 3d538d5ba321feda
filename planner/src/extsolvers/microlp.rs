use good_lp::{
    constraint, default_solver, variable, Expression, ProblemVariables, ResolutionError, Solution,
    SolverModel, Variable,
};
use log::{debug, warn};

use super::{LPSolver, MilpResult, MilpStatus, SolverError};

#[derive(Debug, Clone)]
struct Column {
    cost: f64,
    lower: f64,
    upper: f64,
    integer: bool,
}

#[derive(Debug, Clone)]
struct Row {
    lb: f64,
    ub: f64,
    vars: Vec<usize>,
    coeffs: Vec<f64>,
}

#[derive(Debug, Default)]
pub struct MicroLpSolver {
    columns: Vec<Column>,
    rows: Vec<Row>,
}

impl MicroLpSolver {
    fn column_mut(&mut self, var: usize) -> Result<&mut Column, SolverError> {
        self.columns
            .get_mut(var)
            .ok_or(SolverError::UnknownVariable(var))
    }

    fn solve_empty(&self) -> MilpStatus {
        // Without columns every row reads 0.
        if self.rows.iter().all(|r| r.lb <= 0.0 && 0.0 <= r.ub) {
            MilpStatus::Solved(MilpResult {
                objective: 0.0,
                bound: 0.0,
                values: Vec::new(),
                proven_optimal: true,
            })
        } else {
            MilpStatus::Infeasible
        }
    }
}

impl LPSolver for MicroLpSolver {
    type Var = usize;

    fn new() -> Result<Self, SolverError> {
        Ok(Self::default())
    }

    fn add_var(&mut self, cost: f64) -> Result<usize, SolverError> {
        self.columns.push(Column {
            cost,
            lower: 0.0,
            upper: f64::INFINITY,
            integer: false,
        });
        Ok(self.columns.len() - 1)
    }

    fn set_binary(&mut self, var: usize) -> Result<(), SolverError> {
        let col = self.column_mut(var)?;
        col.integer = true;
        col.lower = 0.0;
        col.upper = 1.0;
        Ok(())
    }

    fn set_bounds(&mut self, var: usize, lower: f64, upper: f64) -> Result<(), SolverError> {
        let col = self.column_mut(var)?;
        col.lower = lower;
        col.upper = upper;
        Ok(())
    }

    fn add_constraint(
        &mut self,
        lb: f64,
        ub: f64,
        vars: &[usize],
        coeffs: &[f64],
    ) -> Result<(), SolverError> {
        if let Some(v) = vars.iter().find(|v| **v >= self.columns.len()) {
            return Err(SolverError::UnknownVariable(*v));
        }
        if vars.len() != coeffs.len() {
            return Err(SolverError::Backend(format!(
                "{} variables but {} coefficients",
                vars.len(),
                coeffs.len()
            )));
        }
        self.rows.push(Row {
            lb,
            ub,
            vars: vars.to_vec(),
            coeffs: coeffs.to_vec(),
        });
        Ok(())
    }

    fn set_time_limit(&mut self, seconds: f64) -> Result<(), SolverError> {
        warn!("microlp backend ignores the time limit of {seconds}s and solves to optimality");
        Ok(())
    }

    fn set_mip_gap(&mut self, gap: f64) -> Result<(), SolverError> {
        warn!("microlp backend ignores the MIP gap of {gap} and solves to optimality");
        Ok(())
    }

    fn optimize(&mut self) -> Result<MilpStatus, SolverError> {
        if self.columns.is_empty() {
            return Ok(self.solve_empty());
        }
        debug!(
            "microlp: {} columns, {} rows",
            self.columns.len(),
            self.rows.len()
        );

        let mut problem = ProblemVariables::new();
        let vars: Vec<Variable> = self
            .columns
            .iter()
            .map(|c| {
                let mut def = variable();
                if c.integer {
                    def = def.integer();
                }
                if c.lower.is_finite() {
                    def = def.min(c.lower);
                }
                if c.upper.is_finite() {
                    def = def.max(c.upper);
                }
                problem.add(def)
            })
            .collect();

        let mut objective = Expression::from(0.0);
        for (c, v) in self.columns.iter().zip(vars.iter()) {
            if c.cost != 0.0 {
                objective += c.cost * *v;
            }
        }

        let mut model = problem.minimise(objective).using(default_solver);
        for row in self.rows.iter() {
            let mut expr = Expression::from(0.0);
            for (v, c) in row.vars.iter().zip(row.coeffs.iter()) {
                expr += *c * vars[*v];
            }
            if row.lb == row.ub {
                model.add_constraint(constraint!(expr == row.lb));
                continue;
            }
            if row.lb.is_finite() {
                model.add_constraint(constraint!(expr.clone() >= row.lb));
            }
            if row.ub.is_finite() {
                model.add_constraint(constraint!(expr <= row.ub));
            }
        }

        match model.solve() {
            Ok(solution) => {
                let values: Vec<f64> = vars.iter().map(|v| solution.value(*v)).collect();
                let objective = self
                    .columns
                    .iter()
                    .zip(values.iter())
                    .map(|(c, x)| c.cost * x)
                    .sum::<f64>();
                Ok(MilpStatus::Solved(MilpResult {
                    objective,
                    bound: objective,
                    values,
                    proven_optimal: true,
                }))
            }
            Err(ResolutionError::Infeasible) => Ok(MilpStatus::Infeasible),
            Err(e) => Err(SolverError::Backend(e.to_string())),
        }
    }

    fn inf(&self) -> f64 {
        f64::INFINITY
    }

    fn num_vars(&self) -> usize {
        self.columns.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn knapsack() {
        // max 5a + 4b + 3c  s.t. 2a + 3b + c <= 4, binary
        let mut lp = MicroLpSolver::new().unwrap();
        let a = lp.add_var(-5.0).unwrap();
        let b = lp.add_var(-4.0).unwrap();
        let c = lp.add_var(-3.0).unwrap();
        for v in [a, b, c] {
            lp.set_binary(v).unwrap();
        }
        lp.add_constraint(-lp.inf(), 4.0, &[a, b, c], &[2.0, 3.0, 1.0])
            .unwrap();
        let MilpStatus::Solved(result) = lp.optimize().unwrap() else {
            panic!("knapsack must be feasible");
        };
        assert!((result.objective + 8.0).abs() < 1e-6);
        assert!(result.values[a] > 0.5 && result.values[b] < 0.5 && result.values[c] > 0.5);
        assert_eq!(result.gap(), 0.0);
    }

    #[test]
    fn infeasible_model() {
        let mut lp = MicroLpSolver::new().unwrap();
        let a = lp.add_var(1.0).unwrap();
        lp.set_binary(a).unwrap();
        lp.add_constraint(2.0, lp.inf(), &[a], &[1.0]).unwrap();
        assert_eq!(lp.optimize().unwrap(), MilpStatus::Infeasible);
    }

    #[test]
    fn empty_model() {
        let mut lp = MicroLpSolver::new().unwrap();
        assert!(matches!(lp.optimize().unwrap(), MilpStatus::Solved(_)));
        lp.add_constraint(1.0, lp.inf(), &[], &[]).unwrap();
        assert_eq!(lp.optimize().unwrap(), MilpStatus::Infeasible);
    }

    #[test]
    fn unknown_variable() {
        let mut lp = MicroLpSolver::new().unwrap();
        assert_eq!(
            lp.add_constraint(0.0, 1.0, &[3], &[1.0]),
            Err(SolverError::UnknownVariable(3))
        );
        assert_eq!(lp.set_binary(0), Err(SolverError::UnknownVariable(0)));
    }
}
