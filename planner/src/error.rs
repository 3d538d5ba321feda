use mrcov_structs::error::{AssignmentError, InputError};
use thiserror::Error;

use crate::extsolvers::SolverError;

#[derive(Debug, Error, Clone, PartialEq)]
pub enum PlanError {
    #[error("invalid input: {0}")]
    Input(#[from] InputError),
    #[error("inconsistent assignment: {0}")]
    Assignment(#[from] AssignmentError),
    #[error(transparent)]
    Solver(#[from] SolverError),
}
