use std::cell::RefCell;

use grb::{expr::LinExpr, prelude::*};
use log::debug;

use super::{LPSolver, MilpResult, MilpStatus, SolverError};

thread_local! {
static GLOBAL_GUROBI_ENV: RefCell<Option<grb::Env>> = const { RefCell::new(None) };
}

impl From<grb::Error> for SolverError {
    fn from(e: grb::Error) -> Self {
        SolverError::Backend(format!("gurobi: {e}"))
    }
}

pub struct GurobiSolver {
    grb: grb::Model,
    added_vars: Vec<grb::Var>,
}

impl GurobiSolver {
    fn model_from_env() -> Result<grb::Model, SolverError> {
        GLOBAL_GUROBI_ENV.with_borrow_mut(|e| {
            if e.is_none() {
                *e = Some(grb::Env::new("")?);
            }
            let env = e
                .as_ref()
                .ok_or_else(|| SolverError::Backend("gurobi environment missing".to_string()))?;
            Ok(grb::Model::with_env("", env)?)
        })
    }

    fn result(&self) -> Result<MilpResult, SolverError> {
        let objective = self.grb.get_attr(attr::ObjVal)?;
        let bound = self.grb.get_attr(attr::ObjBound)?;
        let values = self
            .grb
            .get_obj_attr_batch(attr::X, self.added_vars.iter().cloned())?;
        Ok(MilpResult::from_bound(objective, bound, values))
    }
}

impl LPSolver for GurobiSolver {
    type Var = grb::Var;

    fn new() -> Result<Self, SolverError> {
        let mut grb = Self::model_from_env()?;
        grb.set_param(param::OutputFlag, 0)?;
        Ok(Self {
            grb,
            added_vars: Vec::new(),
        })
    }

    fn add_var(&mut self, cost: f64) -> Result<Self::Var, SolverError> {
        let model = &mut self.grb;
        let var = add_ctsvar!(model, obj: cost, bounds: 0.0..)?;
        self.added_vars.push(var);
        Ok(var)
    }

    fn set_binary(&mut self, var: Self::Var) -> Result<(), SolverError> {
        self.grb.set_obj_attr(attr::VType, &var, VarType::Binary)?;
        Ok(())
    }

    fn set_bounds(&mut self, var: Self::Var, lower: f64, upper: f64) -> Result<(), SolverError> {
        self.grb.update()?;
        self.grb.set_obj_attr(attr::LB, &var, lower)?;
        self.grb.set_obj_attr(attr::UB, &var, upper)?;
        Ok(())
    }

    fn add_constraint(
        &mut self,
        lb: f64,
        ub: f64,
        vars: &[Self::Var],
        coeffs: &[f64],
    ) -> Result<(), SolverError> {
        let mut expr = LinExpr::new();
        for (v, c) in vars.iter().zip(coeffs.iter()) {
            expr.add_term(*c, *v);
        }
        if lb == ub {
            self.grb.add_constr("", c!(expr == lb))?;
            return Ok(());
        }
        if lb > -self.inf() {
            self.grb.add_constr("", c!(expr.clone() >= lb))?;
        }
        if ub < self.inf() {
            self.grb.add_constr("", c!(expr <= ub))?;
        }
        Ok(())
    }

    fn set_time_limit(&mut self, seconds: f64) -> Result<(), SolverError> {
        self.grb.set_param(param::TimeLimit, seconds)?;
        Ok(())
    }

    fn set_mip_gap(&mut self, gap: f64) -> Result<(), SolverError> {
        self.grb.set_param(param::MIPGap, gap)?;
        Ok(())
    }

    fn optimize(&mut self) -> Result<MilpStatus, SolverError> {
        #[cfg(feature = "prof")]
        let _p = hprof::enter("gurobi optimize");

        self.grb.optimize()?;
        let status = self.grb.status()?;
        debug!("gurobi status {:?}", status);
        match status {
            // Optimal within MIPGap; ObjBound tells whether it is proven.
            Status::Optimal => Ok(MilpStatus::Solved(self.result()?)),
            Status::Infeasible => Ok(MilpStatus::Infeasible),
            Status::CutOff
            | Status::IterationLimit
            | Status::NodeLimit
            | Status::TimeLimit
            | Status::SolutionLimit
                if self.grb.get_attr(attr::SolCount)? > 0 =>
            {
                Ok(MilpStatus::Solved(self.result()?))
            }
            other => Err(SolverError::Backend(format!(
                "gurobi stopped without a solution: {other:?}"
            ))),
        }
    }

    fn inf(&self) -> f64 {
        f64::INFINITY
    }

    fn num_vars(&self) -> usize {
        self.added_vars.len()
    }
}
