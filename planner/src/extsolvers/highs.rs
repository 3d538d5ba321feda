use std::convert::TryFrom;
use std::ffi::{c_void, CStr};
use std::fmt::{Debug, Formatter};
use std::os::raw::c_int;

use highs_sys::*;
use log::debug;

use super::{LPSolver, MilpResult, MilpStatus, SolverError};

pub struct HighsSolver {
    ptr: *mut c_void,
}

// The HiGHS instance is owned exclusively by this handle.
unsafe impl Send for HighsSolver {}

impl Drop for HighsSolver {
    fn drop(&mut self) {
        unsafe {
            Highs_destroy(self.ptr);
        }
    }
}

fn check(retval: HighsInt, what: &str) -> Result<(), SolverError> {
    match HighsStatus::try_from(retval) {
        Ok(HighsStatus::OK) | Ok(HighsStatus::Warning) => Ok(()),
        _ => Err(SolverError::Backend(format!("HiGHS call {what} failed"))),
    }
}

impl HighsSolver {
    fn set_bool_option(&mut self, name: &CStr, value: bool) -> Result<(), SolverError> {
        let retval =
            unsafe { Highs_setBoolOptionValue(self.ptr, name.as_ptr(), HighsInt::from(value)) };
        check(retval, "setBoolOptionValue")
    }

    fn set_double_option(&mut self, name: &CStr, value: f64) -> Result<(), SolverError> {
        let retval = unsafe { Highs_setDoubleOptionValue(self.ptr, name.as_ptr(), value) };
        check(retval, "setDoubleOptionValue")
    }

    fn double_info(&self, name: &CStr) -> f64 {
        let mut value = 0.0f64;
        unsafe { Highs_getDoubleInfoValue(self.ptr, name.as_ptr(), &mut value) };
        value
    }

    fn model_status(&self) -> Result<HighsModelStatus, InvalidStatus> {
        let retval = unsafe { Highs_getModelStatus(self.ptr) };
        HighsModelStatus::try_from(retval)
    }

    fn primal_feasible(&self) -> bool {
        // 2 == kHighsSolutionStatusFeasible
        let mut status: HighsInt = 0;
        unsafe {
            Highs_getIntInfoValue(self.ptr, c"primal_solution_status".as_ptr(), &mut status)
        };
        status == 2
    }

    fn result(&self) -> MilpResult {
        let objective = self.double_info(c"objective_function_value");
        let bound = self.double_info(c"mip_dual_bound");
        let result = MilpResult::from_bound(objective, bound, self.solution());
        debug!("HiGHS objective {objective}, dual bound {bound}, gap {}", result.gap());
        result
    }

    fn solution(&self) -> Vec<f64> {
        let num_cols = self.num_vars();
        let mut values = vec![0.0; num_cols];
        if num_cols > 0 {
            let null = std::ptr::null_mut();
            unsafe { Highs_getSolution(self.ptr, values.as_mut_ptr(), null, null, null) };
        }
        values
    }
}

impl LPSolver for HighsSolver {
    type Var = i32;

    fn new() -> Result<Self, SolverError> {
        let ptr = unsafe { Highs_create() };
        if ptr.is_null() {
            return Err(SolverError::Backend("Highs_create returned null".to_string()));
        }
        let mut solver = Self { ptr };
        solver.set_bool_option(c"output_flag", false)?;
        Ok(solver)
    }

    fn add_var(&mut self, cost: f64) -> Result<i32, SolverError> {
        let new_col_idx = unsafe { Highs_getNumCol(self.ptr) };
        let inf = self.inf();
        let retval = unsafe {
            Highs_addCol(
                self.ptr,
                cost,
                0.0,
                inf,
                0,
                std::ptr::null(),
                std::ptr::null(),
            )
        };
        check(retval, "addCol")?;
        Ok(new_col_idx)
    }

    fn set_binary(&mut self, col_idx: i32) -> Result<(), SolverError> {
        check(
            unsafe { Highs_changeColBounds(self.ptr, col_idx, 0.0, 1.0) },
            "changeColBounds",
        )?;
        check(
            unsafe { Highs_changeColIntegrality(self.ptr, col_idx, kHighsVarTypeInteger) },
            "changeColIntegrality",
        )
    }

    fn set_bounds(&mut self, col_idx: i32, lower: f64, upper: f64) -> Result<(), SolverError> {
        check(
            unsafe { Highs_changeColBounds(self.ptr, col_idx, lower, upper) },
            "changeColBounds",
        )
    }

    fn add_constraint(
        &mut self,
        lb: f64,
        ub: f64,
        idxs: &[i32],
        coeffs: &[f64],
    ) -> Result<(), SolverError> {
        if idxs.len() != coeffs.len() {
            return Err(SolverError::Backend(format!(
                "{} variables but {} coefficients",
                idxs.len(),
                coeffs.len()
            )));
        }
        let retval = unsafe {
            Highs_addRow(
                self.ptr,
                lb,
                ub,
                idxs.len() as HighsInt,
                idxs.as_ptr(),
                coeffs.as_ptr(),
            )
        };
        check(retval, "addRow")
    }

    fn set_time_limit(&mut self, seconds: f64) -> Result<(), SolverError> {
        self.set_double_option(c"time_limit", seconds)
    }

    fn set_mip_gap(&mut self, gap: f64) -> Result<(), SolverError> {
        self.set_double_option(c"mip_rel_gap", gap)
    }

    fn optimize(&mut self) -> Result<MilpStatus, SolverError> {
        #[cfg(feature = "prof")]
        let _p = hprof::enter("highs optimize");

        unsafe { Highs_run(self.ptr) };
        let status = self
            .model_status()
            .map_err(|e| SolverError::Backend(format!("{e:?}")))?;
        debug!("HiGHS model status {:?}", status);

        match status {
            HighsModelStatus::ModelEmpty => Ok(MilpStatus::Solved(MilpResult::from_bound(
                0.0,
                0.0,
                self.solution(),
            ))),
            HighsModelStatus::Infeasible => Ok(MilpStatus::Infeasible),
            // An optimal status only means `mip_rel_gap` was met; the dual
            // bound decides whether optimality is proven.
            HighsModelStatus::Optimal => Ok(MilpStatus::Solved(self.result())),
            HighsModelStatus::ReachedTimeLimit
            | HighsModelStatus::ReachedIterationLimit
            | HighsModelStatus::ObjectiveBound
            | HighsModelStatus::ObjectiveTarget
                if self.primal_feasible() =>
            {
                Ok(MilpStatus::Solved(self.result()))
            }
            other => Err(SolverError::Backend(format!(
                "HiGHS stopped without a solution: {other:?}"
            ))),
        }
    }

    fn inf(&self) -> f64 {
        unsafe { Highs_getInfinity(self.ptr) }
    }

    fn num_vars(&self) -> usize {
        unsafe { Highs_getNumCol(self.ptr) as usize }
    }
}

/// The kinds of results of an optimization
#[derive(Clone, Copy, Debug, PartialOrd, PartialEq, Ord, Eq)]
pub enum HighsModelStatus {
    NotSet,
    LoadError,
    ModelError,
    PresolveError,
    SolveError,
    PostsolveError,
    ModelEmpty,
    Infeasible,
    UnboundedOrInfeasible,
    Unbounded,
    Optimal,
    ObjectiveBound,
    ObjectiveTarget,
    ReachedTimeLimit,
    ReachedIterationLimit,
    Unknown,
}

/// An unexpected status code came back from HiGHS.
#[derive(PartialEq, Clone, Copy)]
pub struct InvalidStatus(pub c_int);

impl Debug for InvalidStatus {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "{} is not a valid HiGHS model status", self.0)
    }
}

impl TryFrom<c_int> for HighsModelStatus {
    type Error = InvalidStatus;

    fn try_from(value: c_int) -> Result<Self, Self::Error> {
        match value {
            MODEL_STATUS_NOTSET => Ok(Self::NotSet),
            MODEL_STATUS_LOAD_ERROR => Ok(Self::LoadError),
            MODEL_STATUS_MODEL_ERROR => Ok(Self::ModelError),
            MODEL_STATUS_PRESOLVE_ERROR => Ok(Self::PresolveError),
            MODEL_STATUS_SOLVE_ERROR => Ok(Self::SolveError),
            MODEL_STATUS_POSTSOLVE_ERROR => Ok(Self::PostsolveError),
            MODEL_STATUS_MODEL_EMPTY => Ok(Self::ModelEmpty),
            MODEL_STATUS_INFEASIBLE => Ok(Self::Infeasible),
            MODEL_STATUS_UNBOUNDED => Ok(Self::Unbounded),
            MODEL_STATUS_UNBOUNDED_OR_INFEASIBLE => Ok(Self::UnboundedOrInfeasible),
            MODEL_STATUS_OPTIMAL => Ok(Self::Optimal),
            MODEL_STATUS_OBJECTIVE_BOUND => Ok(Self::ObjectiveBound),
            MODEL_STATUS_OBJECTIVE_TARGET => Ok(Self::ObjectiveTarget),
            MODEL_STATUS_REACHED_TIME_LIMIT => Ok(Self::ReachedTimeLimit),
            MODEL_STATUS_REACHED_ITERATION_LIMIT => Ok(Self::ReachedIterationLimit),
            MODEL_STATUS_UNKNOWN => Ok(Self::Unknown),
            n => Err(InvalidStatus(n)),
        }
    }
}

/// The status of a highs operation
#[derive(Clone, Copy, Debug, PartialOrd, PartialEq, Ord, Eq)]
pub enum HighsStatus {
    OK,
    Warning,
    Error,
}

impl TryFrom<c_int> for HighsStatus {
    type Error = InvalidStatus;

    fn try_from(value: c_int) -> Result<Self, InvalidStatus> {
        match value {
            STATUS_OK => Ok(Self::OK),
            STATUS_WARNING => Ok(Self::Warning),
            STATUS_ERROR => Ok(Self::Error),
            n => Err(InvalidStatus(n)),
        }
    }
}
