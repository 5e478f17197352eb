//! Defines the `ModelParameters` struct, which represents the contents of `model.toml`.
use crate::eligibility::EligibilityMode;
use crate::input::{input_err_msg, read_toml};
use crate::units::{Days, Dimensionless, Money};
use anyhow::{Context, Result, ensure};
use serde::Deserialize;
use std::path::Path;

const MODEL_PARAMETERS_FILE_NAME: &str = "model.toml";

macro_rules! define_unit_param_default {
    ($name:ident, $type: ty, $value: expr) => {
        fn $name() -> $type {
            <$type>::new($value)
        }
    };
}

macro_rules! define_param_default {
    ($name:ident, $type: ty, $value: expr) => {
        fn $name() -> $type {
            $value
        }
    };
}

define_unit_param_default!(default_remote_work_satisfaction_penalty, Dimensionless, 0.8);
define_param_default!(default_solver_time_limit, f64, 60.0);
define_param_default!(default_true, bool, true);

/// Represents the contents of the entire model file.
#[derive(Debug, Deserialize, PartialEq, Clone)]
pub struct ModelParameters {
    /// The number of billable working days in the planning period
    pub working_days: Days,
    /// The maximum total amount which may be spent on travel
    pub total_travel_budget: Money,
    /// The fraction by which all demand is scaled (e.g. -0.1 for a 10% drop)
    #[serde(default)]
    pub demand_variability: Dimensionless,
    /// The multiplier applied to revenue from consultants working from home.
    ///
    /// Only used with the `remote_allowed` eligibility mode.
    #[serde(default = "default_remote_work_satisfaction_penalty")]
    pub remote_work_satisfaction_penalty: Dimensionless,
    /// Options controlling which variant of the model is built
    #[serde(default)]
    pub options: ModelOptions,
}

/// Options selecting the variant of the allocation model to build and solve
#[derive(Debug, Deserialize, PartialEq, Clone)]
pub struct ModelOptions {
    /// How consultants' location preferences gate eligibility
    #[serde(default)]
    pub eligibility_mode: EligibilityMode,
    /// Whether demand may be covered by outsourced headcount
    #[serde(default = "default_true")]
    pub outsourcing_enabled: bool,
    /// Whether unfilled demand is penalised in the objective
    #[serde(default = "default_true")]
    pub unfilled_penalty_enabled: bool,
    /// Whether headcounts must be whole numbers
    #[serde(default = "default_true")]
    pub integer_headcount: bool,
    /// The maximum time allowed for each solve, in seconds
    #[serde(default = "default_solver_time_limit")]
    pub solver_time_limit: f64,
}

impl Default for ModelOptions {
    fn default() -> Self {
        Self {
            eligibility_mode: EligibilityMode::default(),
            outsourcing_enabled: default_true(),
            unfilled_penalty_enabled: default_true(),
            integer_headcount: default_true(),
            solver_time_limit: default_solver_time_limit(),
        }
    }
}

/// Check that the `working_days` parameter is valid
fn check_working_days(value: Days) -> Result<()> {
    ensure!(
        value.is_finite() && value > Days(0.0),
        "working_days must be a finite number greater than zero"
    );

    Ok(())
}

/// Check that the `total_travel_budget` parameter is valid
fn check_total_travel_budget(value: Money) -> Result<()> {
    ensure!(
        value.is_finite() && value >= Money(0.0),
        "total_travel_budget must be a finite number greater than or equal to zero"
    );

    Ok(())
}

/// Check that a demand variability factor is valid
pub fn check_demand_variability(value: Dimensionless) -> Result<()> {
    ensure!(
        value.value().is_finite() && value >= Dimensionless(-1.0),
        "demand_variability must be a finite number no less than -1"
    );

    Ok(())
}

/// Check that the `remote_work_satisfaction_penalty` parameter is valid
fn check_remote_work_satisfaction_penalty(value: Dimensionless) -> Result<()> {
    ensure!(
        (0.0..=1.0).contains(&value.value()),
        "remote_work_satisfaction_penalty must be between 0 and 1"
    );

    Ok(())
}

/// Check that the `solver_time_limit` option is valid
fn check_solver_time_limit(value: f64) -> Result<()> {
    ensure!(
        value.is_finite() && value > 0.0,
        "solver_time_limit must be a finite number of seconds greater than zero"
    );

    Ok(())
}

impl ModelParameters {
    /// Read a model file from the specified directory.
    ///
    /// # Arguments
    ///
    /// * `model_dir` - Folder containing model configuration files
    ///
    /// # Returns
    ///
    /// The model file contents as a [`ModelParameters`] struct or an error if the file is invalid
    pub fn from_path<P: AsRef<Path>>(model_dir: P) -> Result<ModelParameters> {
        let file_path = model_dir.as_ref().join(MODEL_PARAMETERS_FILE_NAME);
        let model_params: ModelParameters = read_toml(&file_path)?;

        model_params
            .validate()
            .with_context(|| input_err_msg(file_path))?;

        Ok(model_params)
    }

    /// Validate parameters after reading in file
    fn validate(&self) -> Result<()> {
        check_working_days(self.working_days)?;
        check_total_travel_budget(self.total_travel_budget)?;
        check_demand_variability(self.demand_variability)?;
        check_remote_work_satisfaction_penalty(self.remote_work_satisfaction_penalty)?;
        check_solver_time_limit(self.options.solver_time_limit)?;

        Ok(())
    }
}
