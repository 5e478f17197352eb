//! Common routines for handling input data.
use crate::error::DataLoadError;
use crate::model::{Model, ModelParameters};
use anyhow::{Context, Result, bail, ensure};
use serde::de::{Deserialize, DeserializeOwned, Deserializer};
use std::fs;
use std::path::Path;

pub mod level;
use level::read_levels;
pub mod location;
use location::read_locations;
pub mod pool;
use pool::read_pools;
pub mod preference;
use preference::read_preferences;
pub mod project;
use project::{read_daily_rates, read_demand, read_projects};
pub mod travel_cost;
use travel_cost::read_travel_costs;

/// Read a series of type `T`s from a CSV file.
///
/// Will raise an error if the file is empty.
///
/// # Arguments
///
/// * `file_path` - Path to the CSV file
pub fn read_csv<'a, T: DeserializeOwned + 'a>(
    file_path: &'a Path,
) -> Result<impl Iterator<Item = T> + 'a> {
    let vec = read_csv_internal(file_path)?;
    if vec.is_empty() {
        bail!("CSV file {} cannot be empty", file_path.display());
    }

    Ok(vec.into_iter())
}

/// Read a series of type `T`s from a CSV file.
///
/// If the file does not exist, an empty iterator is returned.
///
/// # Arguments
///
/// * `file_path` - Path to the CSV file
pub fn read_csv_optional<'a, T: DeserializeOwned + 'a>(
    file_path: &'a Path,
) -> Result<impl Iterator<Item = T> + 'a> {
    if !file_path.exists() {
        return Ok(Vec::new().into_iter());
    }

    Ok(read_csv_internal(file_path)?.into_iter())
}

fn read_csv_internal<T: DeserializeOwned>(file_path: &Path) -> Result<Vec<T>> {
    let vec = csv::ReaderBuilder::new()
        .trim(csv::Trim::All)
        .from_path(file_path)
        .with_context(|| input_err_msg(file_path))?
        .into_deserialize()
        .collect::<Result<Vec<T>, _>>()
        .with_context(|| input_err_msg(file_path))?;

    Ok(vec)
}

/// Parse a TOML file at the specified path.
///
/// # Arguments
///
/// * `file_path` - Path to the TOML file
///
/// # Returns
///
/// * The deserialised TOML data or an error if the file could not be read or parsed.
pub fn read_toml<T: DeserializeOwned>(file_path: &Path) -> Result<T> {
    let toml_str = fs::read_to_string(file_path).with_context(|| input_err_msg(file_path))?;
    let toml_data = toml::from_str(&toml_str).with_context(|| input_err_msg(file_path))?;
    Ok(toml_data)
}

/// Read an f64, checking that it is between 0 and 1
pub fn deserialise_proportion<'de, D, T>(deserialiser: D) -> Result<T, D::Error>
where
    D: Deserializer<'de>,
    T: From<f64>,
{
    let value: f64 = Deserialize::deserialize(deserialiser)?;
    if !(0.0..=1.0).contains(&value) {
        Err(serde::de::Error::custom("Value must be between 0 and 1"))?;
    }

    Ok(value.into())
}

/// Read a flag given as 0 or 1
pub fn deserialise_flag<'de, D>(deserialiser: D) -> Result<bool, D::Error>
where
    D: Deserializer<'de>,
{
    let value: u8 = Deserialize::deserialize(deserialiser)?;
    match value {
        0 => Ok(false),
        1 => Ok(true),
        _ => Err(serde::de::Error::custom("Value must be 0 or 1")),
    }
}

/// Check that a cost or price is a finite number no less than zero
pub fn check_non_negative(value: f64, name: &str) -> Result<()> {
    ensure!(
        value.is_finite() && value >= 0.0,
        "{name} must be a finite number no less than zero, got {value}"
    );

    Ok(())
}

/// Format an error message to include the file path. To be used with `anyhow::Context`.
pub fn input_err_msg<P: AsRef<Path>>(file_path: P) -> String {
    format!("Error reading {}", file_path.as_ref().display())
}

/// Read a model from the specified directory.
///
/// # Arguments
///
/// * `model_dir` - Folder containing model configuration files
///
/// # Returns
///
/// The loaded [`Model`]. Any error carries a [`DataLoadError`] as context.
pub fn load_model<P: AsRef<Path>>(model_dir: P) -> Result<Model> {
    let model_dir = model_dir.as_ref();
    read_model(model_dir).with_context(|| DataLoadError {
        path: model_dir.to_path_buf(),
    })
}

fn read_model(model_dir: &Path) -> Result<Model> {
    let parameters = ModelParameters::from_path(model_dir)?;
    let locations = read_locations(model_dir)?;
    let levels = read_levels(model_dir)?;
    let projects = read_projects(model_dir, &locations.project)?;
    let pools = read_pools(model_dir, &locations.home)?;
    let demand = read_demand(model_dir, &projects)?;
    let daily_rates = read_daily_rates(model_dir, &projects)?;
    let travel_costs = read_travel_costs(model_dir, &locations)?;
    let preferences = read_preferences(
        model_dir,
        &locations.project,
        parameters.options.eligibility_mode.uses_preferences(),
    )?;

    Ok(Model {
        model_path: model_dir.to_path_buf(),
        parameters,
        locations,
        levels,
        projects,
        pools,
        demand,
        daily_rates,
        travel_costs,
        preferences,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::units::Dimensionless;
    use serde::Deserialize;
    use std::fs::File;
    use std::io::Write;
    use std::path::PathBuf;
    use tempfile::tempdir;

    #[derive(Debug, PartialEq, Deserialize)]
    struct Record {
        id: String,
        value: u32,
    }

    /// Create an example CSV file in dir_path
    fn create_csv_file(dir_path: &Path, contents: &str) -> PathBuf {
        let file_path = dir_path.join("test.csv");
        let mut file = File::create(&file_path).unwrap();
        writeln!(file, "{contents}").unwrap();
        file_path
    }

    /// Test a normal read
    #[test]
    fn test_read_csv() {
        let dir = tempdir().unwrap();
        let file_path = create_csv_file(dir.path(), "id,value\nhello,1\nworld, 2\n");
        let records: Vec<Record> = read_csv(&file_path).unwrap().collect();
        assert_eq!(
            records,
            &[
                Record {
                    id: "hello".to_string(),
                    value: 1,
                },
                Record {
                    id: "world".to_string(),
                    value: 2,
                }
            ]
        );

        // File with no data (only column headers)
        let file_path = create_csv_file(dir.path(), "id,value\n");
        assert!(read_csv::<Record>(&file_path).is_err());
        assert!(
            read_csv_optional::<Record>(&file_path)
                .unwrap()
                .next()
                .is_none()
        );

        // Missing file
        let dir = tempdir().unwrap();
        assert!(
            read_csv_optional::<Record>(&dir.path().join("a.csv"))
                .unwrap()
                .next()
                .is_none()
        );
    }

    #[test]
    fn test_read_toml() {
        let dir = tempdir().unwrap();
        let file_path = dir.path().join("test.toml");
        {
            let mut file = File::create(&file_path).unwrap();
            writeln!(file, "id = \"hello\"\nvalue = 1").unwrap();
        }

        assert_eq!(
            read_toml::<Record>(&file_path).unwrap(),
            Record {
                id: "hello".to_string(),
                value: 1,
            }
        );

        {
            let mut file = File::create(&file_path).unwrap();
            writeln!(file, "bad toml syntax").unwrap();
        }

        assert!(read_toml::<Record>(&file_path).is_err());
    }

    #[derive(Debug, Deserialize)]
    struct Proportion {
        #[serde(deserialize_with = "deserialise_proportion")]
        value: Dimensionless,
    }

    #[test]
    fn test_deserialise_proportion() {
        let read = |value: f64| toml::from_str::<Proportion>(&format!("value = {value}"));
        assert_eq!(read(0.5).unwrap().value, Dimensionless(0.5));
        assert_eq!(read(1.0).unwrap().value, Dimensionless(1.0));
        assert!(read(-0.1).is_err());
        assert!(read(1.5).is_err());
    }

    #[derive(Debug, Deserialize)]
    struct Flag {
        #[serde(deserialize_with = "deserialise_flag")]
        value: bool,
    }

    #[test]
    fn test_deserialise_flag() {
        let read = |value: &str| toml::from_str::<Flag>(&format!("value = {value}"));
        assert!(read("1").unwrap().value);
        assert!(!read("0").unwrap().value);
        assert!(read("2").is_err());
    }

    #[test]
    fn test_load_model_missing_dir() {
        let err = load_model("/does/not/exist").unwrap_err();
        assert!(err.downcast_ref::<DataLoadError>().is_some());
    }
}
