//! Optimal allocation of consultants to client projects.
//!
//! A model describes consultant pools at home locations, project demand by seniority level and
//! the rates, salaries and travel costs which link them. The crate builds an integer (or
//! continuous) linear program from a model, solves it with HiGHS and can re-solve it over sweeps
//! of scalar parameters.
#![warn(missing_docs)]
use std::path::PathBuf;

pub mod cli;
pub mod eligibility;
pub mod error;
pub mod id;
pub mod input;
pub mod location;
pub mod log;
pub mod model;
pub mod optimisation;
pub mod output;
pub mod project;
pub mod scenario;
pub mod seniority;
pub mod sensitivity;
pub mod settings;
pub mod units;

#[cfg(test)]
mod fixture;

/// Get the config dir for the program
pub fn get_config_dir() -> PathBuf {
    let Some(mut config_dir) = dirs::config_dir() else {
        // Fall back to the current directory if the platform has no config dir
        return PathBuf::from(".");
    };
    config_dir.push("staffplan");
    config_dir
}
