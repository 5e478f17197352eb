//! Error types which callers need to tell apart, and the process exit codes they map to.
//!
//! Most errors are propagated as [`anyhow::Error`]s. The types here are either returned as the
//! root error or attached as context, so they can be recovered with `downcast_ref`.
use crate::optimisation::constraints::ConstraintFamily;
use crate::scenario::ScalarParameters;
use itertools::Itertools;
use std::fmt;
use std::path::PathBuf;
use std::process::ExitCode;
use thiserror::Error;

/// The input data for a model could not be loaded
#[derive(Debug, Error)]
#[error("Failed to load model from {}", .path.display())]
pub struct DataLoadError {
    /// Path to the model folder
    pub path: PathBuf,
}

/// A coefficient required by an eligible index pair is missing
#[derive(Debug, Error, PartialEq)]
#[error("Missing {coefficient} for {index}")]
pub struct ModelBuildError {
    /// The kind of coefficient (e.g. "daily rate")
    pub coefficient: &'static str,
    /// The index the coefficient was needed for
    pub index: String,
}

impl ModelBuildError {
    /// Create a new [`ModelBuildError`]
    pub fn new(coefficient: &'static str, index: String) -> Self {
        Self { coefficient, index }
    }
}

/// Why the solver did not return an optimal solution
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FailureKind {
    /// No point satisfies every constraint
    Infeasible,
    /// The objective can be increased without limit
    Unbounded,
    /// The per-solve time limit was reached
    Timeout,
}

impl fmt::Display for FailureKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Self::Infeasible => "infeasible",
            Self::Unbounded => "unbounded",
            Self::Timeout => "timed out",
        };
        write!(f, "{s}")
    }
}

/// A solve which finished without an optimal solution.
///
/// Always carries the parameter values in effect when the solve was attempted.
#[derive(Debug, Error)]
#[error("Model {kind} with parameters ({parameters}){}", describe_families(.constraints))]
pub struct SolveFailure {
    /// What went wrong
    pub kind: FailureKind,
    /// The scalar parameters in effect
    pub parameters: ScalarParameters,
    /// The constraint families implicated in an infeasibility
    pub constraints: Vec<ConstraintFamily>,
}

fn describe_families(families: &[ConstraintFamily]) -> String {
    if families.is_empty() {
        String::new()
    } else {
        format!("; offending constraints: {}", families.iter().join(", "))
    }
}

/// The exit status of the program
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum ExitStatus {
    /// The program completed successfully
    Success = 0,
    /// An error not covered by the other codes occurred
    Failure = 1,
    /// The model is infeasible (or unbounded)
    Infeasible = 2,
    /// The input data could not be loaded or is missing required coefficients
    DataLoadError = 3,
    /// The solver ran out of time
    SolverTimeout = 4,
}

impl ExitStatus {
    /// Classify an error returned by the program
    pub fn from_error(err: &anyhow::Error) -> Self {
        if let Some(failure) = err.downcast_ref::<SolveFailure>() {
            return match failure.kind {
                FailureKind::Infeasible | FailureKind::Unbounded => Self::Infeasible,
                FailureKind::Timeout => Self::SolverTimeout,
            };
        }

        if err.downcast_ref::<DataLoadError>().is_some()
            || err.downcast_ref::<ModelBuildError>().is_some()
        {
            return Self::DataLoadError;
        }

        Self::Failure
    }
}

impl From<ExitStatus> for ExitCode {
    fn from(status: ExitStatus) -> Self {
        ExitCode::from(status as u8)
    }
}
