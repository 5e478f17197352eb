//! Sensitivity experiments: sweeping one scalar parameter and re-solving at each value.
//!
//! Each experiment starts from the documented parameter values (plus any fixed overrides), so no
//! experiment inherits values from another. Within an experiment, each sweep point derives a new
//! problem from the previous one, rebuilding only the constraint families which depend on the
//! swept parameter.
use crate::error::{FailureKind, SolveFailure};
use crate::input::{input_err_msg, read_toml};
use crate::model::Model;
use crate::optimisation::objective::ObjectiveBreakdown;
use crate::optimisation::solver::Driver;
use crate::optimisation::{Allocation, AllocationProblem, BenchUsage, DemandFulfilment};
use crate::scenario::{ScalarParameters, SweepParameter};
use anyhow::{Context, Result, bail, ensure};
use indexmap::IndexMap;
use itertools::Itertools;
use log::{info, warn};
use serde::Deserialize;
use std::collections::HashSet;
use std::fmt;
use std::path::Path;

const EXPERIMENTS_FILE_NAME: &str = "experiments.toml";

/// Tolerance used when deciding whether the end of a range has been reached
const RANGE_TOLERANCE: f64 = 1e-9;

fn default_step() -> f64 {
    0.125
}

/// A sweep of one parameter over a range of values
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct Experiment {
    /// Name of the experiment, used for output file names
    pub name: String,
    /// The parameter to sweep
    pub parameter: SweepParameter,
    /// The first value
    pub start: f64,
    /// The last value (inclusive)
    pub end: f64,
    /// The increment between values
    #[serde(default = "default_step")]
    pub step: f64,
    /// Other parameters to hold at fixed values for the whole experiment
    #[serde(default)]
    pub fixed: IndexMap<SweepParameter, f64>,
    /// Whether to record the dual value of every constraint at each point
    #[serde(default)]
    pub record_duals: bool,
    /// Whether to solve the continuous relaxation
    #[serde(default)]
    pub relax_integrality: bool,
}

impl Experiment {
    /// Iterate over the values of the swept parameter in ascending order
    pub fn iter_values(&self) -> impl Iterator<Item = f64> + '_ {
        let count = ((self.end - self.start) / self.step + RANGE_TOLERANCE).floor() as usize + 1;
        (0..count).map(|i| self.start + i as f64 * self.step)
    }

    /// Whether the continuous relaxation is solved. Dual values are only meaningful for it.
    pub fn is_relaxed(&self) -> bool {
        self.relax_integrality || self.record_duals
    }

    fn validate(&self) -> Result<()> {
        ensure!(
            !self.name.is_empty()
                && self
                    .name
                    .chars()
                    .all(|c| c.is_ascii_alphanumeric() || c == '_' || c == '-'),
            "Experiment names may only contain letters, numbers, hyphens and underscores"
        );
        ensure!(
            self.step.is_finite() && self.step > 0.0,
            "step must be greater than zero"
        );
        ensure!(
            self.start.is_finite() && self.end.is_finite() && self.start <= self.end,
            "start must not be greater than end"
        );
        self.parameter.check_value(self.start)?;
        self.parameter.check_value(self.end)?;
        for (parameter, value) in &self.fixed {
            ensure!(
                *parameter != self.parameter,
                "{parameter} cannot be both swept and fixed"
            );
            parameter.check_value(*value)?;
        }

        Ok(())
    }
}

/// The experiments run when the model does not define its own
pub fn default_experiments() -> Vec<Experiment> {
    let sweep = |name: &str, parameter, start, end| Experiment {
        name: name.into(),
        parameter,
        start,
        end,
        step: default_step(),
        fixed: IndexMap::new(),
        record_duals: false,
        relax_integrality: false,
    };

    vec![
        sweep(
            "demand_variability",
            SweepParameter::DemandVariability,
            -0.55,
            0.5,
        ),
        sweep(
            "outsourcing_cost",
            SweepParameter::OutsourcingCost,
            1.0,
            2.5,
        ),
        sweep(
            "client_satisfaction_penalty",
            SweepParameter::ClientSatisfactionPenalty,
            0.0,
            2.0,
        ),
        Experiment {
            record_duals: true,
            relax_integrality: true,
            ..sweep("dual_values", SweepParameter::DemandVariability, 0.5, 0.5)
        },
    ]
}

#[derive(Debug, Deserialize)]
struct ExperimentsFile {
    experiments: Vec<Experiment>,
}

/// Read the experiments for a model.
///
/// If the model directory has no `experiments.toml` file, the default experiments are used.
pub fn read_experiments(model_dir: &Path) -> Result<Vec<Experiment>> {
    let file_path = model_dir.join(EXPERIMENTS_FILE_NAME);
    if !file_path.is_file() {
        return Ok(default_experiments());
    }

    let file: ExperimentsFile = read_toml(&file_path)?;
    check_experiments(&file.experiments).with_context(|| input_err_msg(&file_path))?;

    Ok(file.experiments)
}

fn check_experiments(experiments: &[Experiment]) -> Result<()> {
    ensure!(!experiments.is_empty(), "No experiments defined");
    let mut names = HashSet::new();
    for experiment in experiments {
        experiment
            .validate()
            .with_context(|| format!("Invalid experiment {}", experiment.name))?;
        ensure!(
            names.insert(experiment.name.as_str()),
            "Duplicate experiment name {}",
            experiment.name
        );
    }

    Ok(())
}

/// Keep only the named experiments, in the order given. An empty list keeps every experiment.
pub fn select_experiments(experiments: Vec<Experiment>, names: &[String]) -> Result<Vec<Experiment>> {
    if names.is_empty() {
        return Ok(experiments);
    }

    let mut by_name: IndexMap<_, _> = experiments
        .into_iter()
        .map(|experiment| (experiment.name.clone(), experiment))
        .collect();
    names
        .iter()
        .map(|name| match by_name.shift_remove(name) {
            Some(experiment) => Ok(experiment),
            None => bail!(
                "Unknown experiment {name}. Available experiments: {}",
                by_name.keys().join(", ")
            ),
        })
        .collect()
}

/// The outcome of the solve at one sweep point
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PointStatus {
    /// Solved to optimality
    Optimal,
    /// The solve failed
    Failed(FailureKind),
}

impl fmt::Display for PointStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Optimal => write!(f, "optimal"),
            Self::Failed(kind) => write!(f, "{kind}"),
        }
    }
}

/// The dual value of one constraint
#[derive(Debug, Clone, PartialEq)]
pub struct DualValue {
    /// The name of the constraint
    pub constraint: String,
    /// The dual value
    pub value: f64,
}

/// Everything recorded at one sweep point
#[derive(Debug, Clone, PartialEq)]
pub struct SweepPoint {
    /// The value of the swept parameter
    pub value: f64,
    /// Whether the solve succeeded
    pub status: PointStatus,
    /// The objective terms (if solved)
    pub objective: Option<ObjectiveBreakdown>,
    /// How demand was met (if solved), in project then seniority order
    pub demand: Vec<DemandFulfilment>,
    /// Non-zero assignments and outsourcing (if solved), in project then role seniority order
    pub allocations: Vec<Allocation>,
    /// Bench headcount of every pool (if solved)
    pub bench: Vec<BenchUsage>,
    /// Constraint dual values (if requested and solved)
    pub duals: Vec<DualValue>,
    /// Details of a failure
    pub message: Option<String>,
}

/// The results of a whole experiment, in sweep order
#[derive(Debug, Clone, PartialEq)]
pub struct ExperimentResults {
    /// The experiment which was run
    pub experiment: Experiment,
    /// One entry per sweep point
    pub points: Vec<SweepPoint>,
}

impl ExperimentResults {
    /// The number of sweep points which failed to solve
    pub fn num_failed(&self) -> usize {
        self.points
            .iter()
            .filter(|point| point.status != PointStatus::Optimal)
            .count()
    }
}

/// Run a sensitivity experiment.
///
/// A solver failure at one sweep point is recorded and the sweep continues. Any other error
/// (e.g. a missing coefficient) aborts the experiment.
///
/// # Arguments
///
/// * `model` - The model
/// * `experiment` - The experiment to run
/// * `driver` - The solver driver
pub fn run_experiment(
    model: &Model,
    experiment: &Experiment,
    driver: &dyn Driver,
) -> Result<ExperimentResults> {
    info!(
        "Running experiment {}: {} from {} to {} in steps of {}",
        experiment.name, experiment.parameter, experiment.start, experiment.end, experiment.step
    );

    let baseline = ScalarParameters::from_model(model).with_overrides(&experiment.fixed);
    let mut problem = AllocationProblem::build(model, baseline)?;
    if experiment.is_relaxed() {
        if experiment.record_duals && problem.is_integer() && !experiment.relax_integrality {
            warn!(
                "Dual values requested for experiment {} with integer headcounts. \
                Solving the continuous relaxation instead.",
                experiment.name
            );
        }
        problem = problem.relaxed();
    }

    let mut points = Vec::new();
    for value in experiment.iter_values() {
        let parameters = problem
            .parameters()
            .with_value(experiment.parameter, value);
        problem = problem.with_parameters(parameters)?;
        points.push(solve_point(&problem, value, experiment.record_duals, driver)?);
    }

    let results = ExperimentResults {
        experiment: experiment.clone(),
        points,
    };
    info!(
        "Experiment {} finished: {} points, {} failed",
        experiment.name,
        results.points.len(),
        results.num_failed()
    );

    Ok(results)
}

fn solve_point(
    problem: &AllocationProblem,
    value: f64,
    record_duals: bool,
    driver: &dyn Driver,
) -> Result<SweepPoint> {
    match problem.solve(driver) {
        Ok(solution) => {
            let duals = if record_duals {
                solution
                    .iter_duals()
                    .into_iter()
                    .flatten()
                    .map(|(id, value)| DualValue {
                        constraint: id.to_string(),
                        value,
                    })
                    .collect()
            } else {
                Vec::new()
            };

            Ok(SweepPoint {
                value,
                status: PointStatus::Optimal,
                objective: Some(solution.objective()),
                demand: solution.iter_demand_fulfilment().collect(),
                allocations: solution.allocations()?,
                bench: solution.iter_bench().collect(),
                duals,
                message: None,
            })
        }
        Err(err) => {
            let Some(failure) = err.downcast_ref::<SolveFailure>() else {
                return Err(err);
            };
            warn!("{failure}; continuing with next value");

            Ok(SweepPoint {
                value,
                status: PointStatus::Failed(failure.kind),
                objective: None,
                demand: Vec::new(),
                allocations: Vec::new(),
                bench: Vec::new(),
                duals: Vec::new(),
                message: Some(failure.to_string()),
            })
        }
    }
}
