//! The parameter store: everything loaded for a model run.
use crate::error::ModelBuildError;
use crate::location::{LocationID, Locations};
use crate::project::{ProjectID, ProjectMap};
use crate::seniority::SeniorityLevel;
use crate::units::{Dimensionless, MoneyPerDayPerHead, MoneyPerHead};
use anyhow::Result;
use indexmap::IndexMap;
use std::collections::HashMap;
use std::path::PathBuf;

pub mod parameters;
pub use parameters::{ModelOptions, ModelParameters};

/// Parameters which vary by seniority level
#[derive(Debug, Clone, PartialEq)]
pub struct LevelParameters {
    /// The salary paid per consultant per working day
    pub daily_salary: MoneyPerDayPerHead,
    /// The maximum fraction of a pool which may be benched
    pub bench_limit_fraction: Dimensionless,
    /// The cost of outsourcing a head, as a multiple of the daily salary
    pub outsourcing_cost: Dimensionless,
    /// The penalty for unfilled demand, as a multiple of the mean daily rate
    pub client_satisfaction_penalty: Dimensionless,
}

/// Per-level parameters, in seniority order
pub type LevelMap = IndexMap<SeniorityLevel, LevelParameters>;

/// Headcount available at each home location and level
pub type PoolMap = HashMap<(LocationID, SeniorityLevel), u32>;

/// Headcount required for each project and role level
pub type DemandMap = HashMap<(ProjectID, SeniorityLevel), u32>;

/// The daily rate charged to the client for each project and role level
pub type DailyRateMap = HashMap<(ProjectID, SeniorityLevel), MoneyPerDayPerHead>;

/// The cost per head of travelling from a home location to a project location
pub type TravelCostMap = HashMap<(LocationID, LocationID), MoneyPerHead>;

/// Whether consultants of a level are willing to work at a location
pub type PreferenceMap = HashMap<(SeniorityLevel, LocationID), bool>;

/// Model definition
#[derive(Debug)]
pub struct Model {
    /// Path to the model folder
    pub model_path: PathBuf,
    /// Parameters from the model TOML file
    pub parameters: ModelParameters,
    /// Home and project locations
    pub locations: Locations,
    /// Parameters for each seniority level
    pub levels: LevelMap,
    /// Client projects, in ascending ID order
    pub projects: ProjectMap,
    /// Consultant pools
    pub pools: PoolMap,
    /// Unadjusted project demand
    pub demand: DemandMap,
    /// Daily rates charged to clients
    pub daily_rates: DailyRateMap,
    /// Travel costs between home and project locations
    pub travel_costs: TravelCostMap,
    /// Location preferences of each level
    pub preferences: PreferenceMap,
}

impl Model {
    /// Iterate over the seniority levels in the model, most senior first
    pub fn iter_levels(&self) -> impl Iterator<Item = SeniorityLevel> + '_ {
        self.levels.keys().copied()
    }

    /// Get the parameters for a seniority level
    pub fn level(&self, level: SeniorityLevel) -> &LevelParameters {
        // NB: Every level is checked for when the model is loaded
        &self.levels[&level]
    }

    /// The headcount of the pool at a home location and level (zero if not specified)
    pub fn pool(&self, home: &LocationID, level: SeniorityLevel) -> u32 {
        self.pools
            .get(&(home.clone(), level))
            .copied()
            .unwrap_or_default()
    }

    /// The unadjusted demand for a project and role level (zero if not specified)
    pub fn demand(&self, project_id: ProjectID, level: SeniorityLevel) -> u32 {
        self.demand
            .get(&(project_id, level))
            .copied()
            .unwrap_or_default()
    }

    /// Iterate over every (project, level) cell with non-zero demand.
    ///
    /// Cells are ordered by ascending project ID, then by seniority.
    pub fn iter_demand_cells(&self) -> impl Iterator<Item = (ProjectID, SeniorityLevel)> + '_ {
        self.projects.keys().flat_map(move |&project_id| {
            self.iter_levels()
                .filter(move |&level| self.demand(project_id, level) > 0)
                .map(move |level| (project_id, level))
        })
    }

    /// The daily rate charged for a project and role level
    pub fn daily_rate(
        &self,
        project_id: ProjectID,
        level: SeniorityLevel,
    ) -> Result<MoneyPerDayPerHead, ModelBuildError> {
        self.daily_rates
            .get(&(project_id, level))
            .copied()
            .ok_or_else(|| ModelBuildError::new("daily rate", format!("project {project_id}, {level}")))
    }

    /// The mean daily rate for a level across all projects which specify one
    pub fn mean_daily_rate(
        &self,
        level: SeniorityLevel,
    ) -> Result<MoneyPerDayPerHead, ModelBuildError> {
        let rates: Vec<_> = self
            .projects
            .keys()
            .filter_map(|&project_id| self.daily_rates.get(&(project_id, level)))
            .collect();
        if rates.is_empty() {
            return Err(ModelBuildError::new(
                "daily rate",
                format!("any project at level {level}"),
            ));
        }

        let total: f64 = rates.iter().map(|rate| rate.value()).sum();
        Ok(MoneyPerDayPerHead(total / rates.len() as f64))
    }

    /// The travel cost per head for consultants from `home` working at `project_location`.
    ///
    /// Travel within a location is free.
    pub fn travel_cost(
        &self,
        home: &LocationID,
        project_location: &LocationID,
    ) -> Result<MoneyPerHead, ModelBuildError> {
        if home == project_location {
            return Ok(MoneyPerHead(0.0));
        }

        self.travel_costs
            .get(&(home.clone(), project_location.clone()))
            .copied()
            .ok_or_else(|| {
                ModelBuildError::new("travel cost", format!("{home} -> {project_location}"))
            })
    }

    /// Whether consultants of `level` are willing to work at `location`.
    ///
    /// Pairs missing from the preference matrix are treated as unwilling.
    pub fn is_willing(&self, level: SeniorityLevel, location: &LocationID) -> bool {
        self.preferences
            .get(&(level, location.clone()))
            .copied()
            .unwrap_or(false)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fixture::{assert_error, model};
    use float_cmp::assert_approx_eq;
    use rstest::rstest;

    #[rstest]
    fn test_pool_and_demand_default_to_zero(model: Model) {
        assert_eq!(
            model.pool(&"London".into(), SeniorityLevel::SeniorConsultingManager),
            0
        );
        assert_eq!(model.demand(ProjectID(2), SeniorityLevel::JuniorConsultant), 0);
        assert_eq!(model.pool(&"London".into(), SeniorityLevel::Consultant), 4);
    }

    #[rstest]
    fn test_iter_demand_cells_order(model: Model) {
        let cells: Vec<_> = model.iter_demand_cells().collect();
        assert_eq!(
            cells,
            [
                (ProjectID(1), SeniorityLevel::SeniorConsultant),
                (ProjectID(1), SeniorityLevel::Consultant),
                (ProjectID(2), SeniorityLevel::Consultant),
            ]
        );
    }

    #[rstest]
    fn test_travel_cost(model: Model) {
        let london = LocationID::new("London");
        let paris = LocationID::new("Paris");
        assert_eq!(model.travel_cost(&london, &london).unwrap(), MoneyPerHead(0.0));
        assert_eq!(model.travel_cost(&london, &paris).unwrap(), MoneyPerHead(1000.0));
        assert_eq!(model.travel_cost(&paris, &london).unwrap(), MoneyPerHead(800.0));
        assert_error!(
            model
                .travel_cost(&paris, &"Berlin".into())
                .map_err(anyhow::Error::from),
            "Missing travel cost for Paris -> Berlin"
        );
    }

    #[rstest]
    fn test_mean_daily_rate(model: Model) {
        assert_approx_eq!(
            f64,
            model.mean_daily_rate(SeniorityLevel::Consultant).unwrap().value(),
            450.0
        );
        assert!(
            model
                .mean_daily_rate(SeniorityLevel::SeniorConsultingManager)
                .is_err()
        );
    }

    #[rstest]
    fn test_is_willing(model: Model) {
        assert!(model.is_willing(SeniorityLevel::Consultant, &"Paris".into()));
        assert!(!model.is_willing(SeniorityLevel::JuniorConsultant, &"Paris".into()));
    }
}
