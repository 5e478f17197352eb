//! Code for reading projects and the demand and daily rates for their roles.
use super::*;
use crate::id::IDCollection;
use crate::location::LocationID;
use crate::model::{DailyRateMap, DemandMap};
use crate::project::{Project, ProjectID, ProjectMap};
use crate::seniority::SeniorityLevel;
use crate::units::MoneyPerDayPerHead;
use indexmap::IndexSet;
use serde::Deserialize;

const PROJECTS_FILE_NAME: &str = "projects.csv";
const DEMAND_FILE_NAME: &str = "demand.csv";
const DAILY_RATES_FILE_NAME: &str = "daily_rates.csv";

#[derive(Debug, PartialEq, Deserialize)]
struct ProjectRaw {
    id: u32,
    location_id: String,
}

#[derive(Debug, PartialEq, Deserialize)]
struct DemandRaw {
    project_id: u32,
    level: SeniorityLevel,
    demand: u32,
}

#[derive(Debug, PartialEq, Deserialize)]
struct DailyRateRaw {
    project_id: u32,
    level: SeniorityLevel,
    daily_rate: MoneyPerDayPerHead,
}

/// Read the projects CSV file.
///
/// # Arguments
///
/// * `model_dir` - Folder containing model configuration files
/// * `project_location_ids` - All valid project locations
///
/// # Returns
///
/// The projects, in ascending ID order. IDs must run from 1 to the number of projects.
pub fn read_projects(
    model_dir: &Path,
    project_location_ids: &IndexSet<LocationID>,
) -> Result<ProjectMap> {
    let file_path = model_dir.join(PROJECTS_FILE_NAME);
    let iter = read_csv(&file_path)?;
    read_projects_from_iter(iter, project_location_ids)
        .with_context(|| input_err_msg(&file_path))
}

fn read_projects_from_iter<I>(
    iter: I,
    project_location_ids: &IndexSet<LocationID>,
) -> Result<ProjectMap>
where
    I: Iterator<Item = ProjectRaw>,
{
    let mut projects = ProjectMap::new();
    for raw in iter {
        let id = ProjectID(raw.id);
        let location_id = project_location_ids
            .get_id_by_str(&raw.location_id)
            .with_context(|| format!("Invalid location for project {id}"))?;
        ensure!(
            projects
                .insert(id, Project { id, location_id })
                .is_none(),
            "Duplicate project ID {id}"
        );
    }

    projects.sort_keys();
    for (expected, id) in (1..).zip(projects.keys()) {
        ensure!(
            *id == ProjectID(expected),
            "Project IDs must run from 1 to the number of projects (missing {expected})"
        );
    }

    Ok(projects)
}

fn get_project_id(projects: &ProjectMap, id: u32) -> Result<ProjectID> {
    let id = ProjectID(id);
    ensure!(projects.contains_key(&id), "Unknown project ID {id}");
    Ok(id)
}

/// Read the demand CSV file.
///
/// Demand not given for a project and level is zero.
pub fn read_demand(model_dir: &Path, projects: &ProjectMap) -> Result<DemandMap> {
    let file_path = model_dir.join(DEMAND_FILE_NAME);
    let iter = read_csv(&file_path)?;
    read_demand_from_iter(iter, projects).with_context(|| input_err_msg(&file_path))
}

fn read_demand_from_iter<I>(iter: I, projects: &ProjectMap) -> Result<DemandMap>
where
    I: Iterator<Item = DemandRaw>,
{
    let mut map = DemandMap::new();
    for raw in iter {
        let project_id = get_project_id(projects, raw.project_id)?;
        ensure!(
            map.insert((project_id, raw.level), raw.demand).is_none(),
            "Duplicate demand entry for project {project_id}, {}",
            raw.level
        );
    }

    Ok(map)
}

/// Read the daily rates CSV file.
///
/// Rates may be omitted for roles which are never staffed. A missing rate which the model needs
/// is reported when the problem is built.
pub fn read_daily_rates(model_dir: &Path, projects: &ProjectMap) -> Result<DailyRateMap> {
    let file_path = model_dir.join(DAILY_RATES_FILE_NAME);
    let iter = read_csv(&file_path)?;
    read_daily_rates_from_iter(iter, projects).with_context(|| input_err_msg(&file_path))
}

fn read_daily_rates_from_iter<I>(iter: I, projects: &ProjectMap) -> Result<DailyRateMap>
where
    I: Iterator<Item = DailyRateRaw>,
{
    let mut map = DailyRateMap::new();
    for raw in iter {
        let project_id = get_project_id(projects, raw.project_id)?;
        check_non_negative(raw.daily_rate.value(), "daily_rate")?;
        ensure!(
            map.insert((project_id, raw.level), raw.daily_rate).is_none(),
            "Duplicate daily rate for project {project_id}, {}",
            raw.level
        );
    }

    Ok(map)
}
