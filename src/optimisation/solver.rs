//! The interface to the external solver engine.
use super::constraints::ConstraintMap;
use anyhow::{Result, anyhow};
use highs::{HighsModelStatus, RowProblem as Problem, Sense};
use log::debug;

/// A fully assembled problem, ready to be passed to a [`Driver`]
pub struct LinearProgram<'a> {
    /// The objective coefficient of each column (maximised)
    pub objective: Vec<f64>,
    /// The constraints, in row order
    pub constraints: &'a ConstraintMap,
    /// Whether columns must take integer values
    pub integer: bool,
}

/// The outcome of a solve
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SolveStatus {
    /// An optimal solution was found
    Optimal,
    /// The constraints cannot all be satisfied
    Infeasible,
    /// The objective is unbounded
    Unbounded,
    /// The time limit was reached before an optimal solution was found
    Timeout,
}

/// What the driver returns from a solve
#[derive(Debug, Clone, PartialEq)]
pub struct DriverSolution {
    /// Status of the solve
    pub status: SolveStatus,
    /// The value of each column (empty unless optimal)
    pub primals: Vec<f64>,
    /// The dual value of each row, only for continuous problems which solved to optimality
    pub duals: Option<Vec<f64>>,
}

impl DriverSolution {
    /// A solution with no values, for a solve which did not reach optimality
    pub fn failed(status: SolveStatus) -> Self {
        Self {
            status,
            primals: Vec::new(),
            duals: None,
        }
    }
}

/// Something which can solve a [`LinearProgram`]
pub trait Driver {
    /// Maximise the objective subject to the constraints.
    ///
    /// Solver outcomes are reported through [`DriverSolution::status`]; an error is only returned
    /// if the solver failed in some other way.
    fn solve(&self, problem: &LinearProgram) -> Result<DriverSolution>;
}

/// A [`Driver`] which uses the HiGHS solver
#[derive(Debug, Clone, PartialEq)]
pub struct HighsDriver {
    /// Maximum time allowed for a solve, in seconds
    pub time_limit: f64,
    /// Whether to let HiGHS write its log to the console
    pub log_output: bool,
}

impl HighsDriver {
    /// Create a new driver with the given time limit.
    ///
    /// HiGHS output is only shown if debug logging is enabled.
    pub fn new(time_limit: f64) -> Self {
        Self {
            time_limit,
            log_output: log::log_enabled!(log::Level::Debug),
        }
    }
}

impl Driver for HighsDriver {
    fn solve(&self, problem: &LinearProgram) -> Result<DriverSolution> {
        let mut highs_problem = Problem::default();
        let columns: Vec<_> = problem
            .objective
            .iter()
            .map(|&coeff| {
                if problem.integer {
                    highs_problem.add_integer_column(coeff, 0.0..)
                } else {
                    highs_problem.add_column(coeff, 0.0..)
                }
            })
            .collect();

        for (_, constraint) in problem.constraints.iter() {
            highs_problem.add_row(
                constraint.min..=constraint.max,
                constraint
                    .terms
                    .iter()
                    .map(|(column, coeff)| (columns[*column], *coeff)),
            );
        }

        let mut model = highs_problem.optimise(Sense::Maximise);
        model.set_option("time_limit", self.time_limit);
        model.set_option("log_to_console", self.log_output);
        model.set_option("output_flag", self.log_output);

        let solved = model.solve();
        let status = solved.status();
        debug!("HiGHS finished with status {status:?}");
        match status {
            HighsModelStatus::Optimal => {
                let solution = solved.get_solution();
                let duals = (!problem.integer).then(|| solution.dual_rows().to_vec());
                Ok(DriverSolution {
                    status: SolveStatus::Optimal,
                    primals: solution.columns().to_vec(),
                    duals,
                })
            }
            // The objective is bounded whenever every constraint is present, so an ambiguous
            // status means infeasible
            HighsModelStatus::Infeasible | HighsModelStatus::UnboundedOrInfeasible => {
                Ok(DriverSolution::failed(SolveStatus::Infeasible))
            }
            HighsModelStatus::Unbounded => Ok(DriverSolution::failed(SolveStatus::Unbounded)),
            HighsModelStatus::ReachedTimeLimit => {
                Ok(DriverSolution::failed(SolveStatus::Timeout))
            }
            status => Err(anyhow!("Could not solve: {status:?}")),
        }
    }
}
