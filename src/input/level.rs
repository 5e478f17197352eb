//! Code for reading the seniority levels CSV file.
use super::*;
use crate::model::{LevelMap, LevelParameters};
use crate::seniority::SeniorityLevel;
use crate::units::{Dimensionless, MoneyPerDayPerHead};
use log::warn;
use serde::Deserialize;
use strum::IntoEnumIterator;

const LEVELS_FILE_NAME: &str = "levels.csv";

#[derive(Debug, PartialEq, Deserialize)]
struct LevelRaw {
    level: SeniorityLevel,
    daily_salary: MoneyPerDayPerHead,
    #[serde(deserialize_with = "deserialise_proportion")]
    bench_limit_fraction: Dimensionless,
    outsourcing_cost: Dimensionless,
    client_satisfaction_penalty: Dimensionless,
}

impl LevelRaw {
    fn validate(&self) -> Result<()> {
        check_non_negative(self.daily_salary.value(), "daily_salary")?;
        check_non_negative(self.outsourcing_cost.value(), "outsourcing_cost")?;
        check_non_negative(
            self.client_satisfaction_penalty.value(),
            "client_satisfaction_penalty",
        )?;

        Ok(())
    }
}

/// Read the parameters for each seniority level.
///
/// # Arguments
///
/// * `model_dir` - Folder containing model configuration files
///
/// # Returns
///
/// The parameters for every level, in seniority order.
pub fn read_levels(model_dir: &Path) -> Result<LevelMap> {
    let file_path = model_dir.join(LEVELS_FILE_NAME);
    let iter = read_csv(&file_path)?;
    read_levels_from_iter(iter).with_context(|| input_err_msg(&file_path))
}

fn read_levels_from_iter<I>(iter: I) -> Result<LevelMap>
where
    I: Iterator<Item = LevelRaw>,
{
    let mut levels = LevelMap::new();
    for raw in iter {
        raw.validate()
            .with_context(|| format!("Invalid parameters for {}", raw.level))?;

        let mut bench_limit_fraction = raw.bench_limit_fraction;
        if raw.level.is_junior() && bench_limit_fraction != Dimensionless(1.0) {
            warn!(
                "bench_limit_fraction for {} is always 1 (got {bench_limit_fraction})",
                raw.level
            );
            bench_limit_fraction = Dimensionless(1.0);
        }

        let params = LevelParameters {
            daily_salary: raw.daily_salary,
            bench_limit_fraction,
            outsourcing_cost: raw.outsourcing_cost,
            client_satisfaction_penalty: raw.client_satisfaction_penalty,
        };
        ensure!(
            levels.insert(raw.level, params).is_none(),
            "Duplicate entry for {}",
            raw.level
        );
    }

    for level in SeniorityLevel::iter() {
        ensure!(levels.contains_key(&level), "Missing entry for {level}");
    }
    levels.sort_keys();

    Ok(levels)
}
