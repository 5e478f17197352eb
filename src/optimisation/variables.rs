//! The decision variables of the allocation problem.
//!
//! Index domains are fixed when the schema is built and never change during a sweep: only the
//! coefficients and bounds which reference them are rebuilt.
use crate::eligibility::{WorkArrangement, check_eligibility};
use crate::error::ModelBuildError;
use crate::location::LocationID;
use crate::model::Model;
use crate::project::ProjectID;
use crate::seniority::SeniorityLevel;
use crate::units::{MoneyPerDayPerHead, MoneyPerHead};
use indexmap::IndexMap;

/// The index of a column in the problem
pub type Column = usize;

/// Identifies a consultant assignment: who fills which role on which project
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct AssignmentKey {
    /// The consultants' home location
    pub home: LocationID,
    /// The consultants' actual seniority
    pub actual: SeniorityLevel,
    /// The project
    pub project: ProjectID,
    /// The seniority of the role being filled
    pub role: SeniorityLevel,
}

/// An eligible assignment variable along with the coefficients fixed by its index
#[derive(Debug, Clone, PartialEq)]
pub struct AssignmentVar {
    /// Column in the problem
    pub column: Column,
    /// Whether the work is done on site or remotely
    pub arrangement: WorkArrangement,
    /// Where the project is delivered
    pub project_location: LocationID,
    /// The daily rate charged for the role
    pub daily_rate: MoneyPerDayPerHead,
    /// The travel cost per assigned head (zero for remote work and local assignments)
    pub travel_cost: MoneyPerHead,
}

/// All the decision variables of the problem.
///
/// Columns are numbered in the order assignments, bench, unfilled, outsource.
#[derive(Debug, Default)]
pub struct VariableSchema {
    /// Eligible assignments, ordered by home, actual level, project then role level
    pub assignment_vars: IndexMap<AssignmentKey, AssignmentVar>,
    /// Bench headcount for every home location and level
    pub bench_vars: IndexMap<(LocationID, SeniorityLevel), Column>,
    /// Unfilled demand for each demand cell (only if unfilled demand is penalised)
    pub unfilled_vars: IndexMap<(ProjectID, SeniorityLevel), Column>,
    /// Outsourced headcount for each demand cell (only if outsourcing is enabled)
    pub outsource_vars: IndexMap<(ProjectID, SeniorityLevel), Column>,
    num_columns: usize,
}

impl VariableSchema {
    /// Define the variables for a model.
    ///
    /// Assignments are only created for eligible cells where both the pool and the unadjusted
    /// demand are non-zero.
    ///
    /// # Returns
    ///
    /// The variable schema or a [`ModelBuildError`] if a coefficient needed by an eligible
    /// assignment is missing.
    pub fn new(model: &Model) -> Result<Self, ModelBuildError> {
        let mut schema = Self::default();
        let mode = model.parameters.options.eligibility_mode;

        for home in &model.locations.home {
            for actual in model.iter_levels() {
                if model.pool(home, actual) == 0 {
                    continue;
                }

                for (project, role) in model.iter_demand_cells() {
                    let project_location = &model.projects[&project].location_id;
                    let willing = model.is_willing(actual, project_location);
                    let Some(arrangement) = check_eligibility(mode, actual, role, willing) else {
                        continue;
                    };

                    let travel_cost = if arrangement.incurs_travel() {
                        model.travel_cost(home, project_location)?
                    } else {
                        MoneyPerHead(0.0)
                    };
                    let var = AssignmentVar {
                        column: schema.next_column(),
                        arrangement,
                        project_location: project_location.clone(),
                        daily_rate: model.daily_rate(project, role)?,
                        travel_cost,
                    };
                    let key = AssignmentKey {
                        home: home.clone(),
                        actual,
                        project,
                        role,
                    };
                    schema.assignment_vars.insert(key, var);
                }
            }
        }

        for home in &model.locations.home {
            for level in model.iter_levels() {
                let column = schema.next_column();
                schema.bench_vars.insert((home.clone(), level), column);
            }
        }

        let options = &model.parameters.options;
        if options.unfilled_penalty_enabled {
            for cell in model.iter_demand_cells() {
                let column = schema.next_column();
                schema.unfilled_vars.insert(cell, column);
            }
        }
        if options.outsourcing_enabled {
            for cell in model.iter_demand_cells() {
                let column = schema.next_column();
                schema.outsource_vars.insert(cell, column);
            }
        }

        Ok(schema)
    }

    fn next_column(&mut self) -> Column {
        let column = self.num_columns;
        self.num_columns += 1;
        column
    }

    /// The total number of columns in the problem
    pub fn num_columns(&self) -> usize {
        self.num_columns
    }

    /// Iterate over the assignments drawing on the pool at `home` with level `actual`
    pub fn iter_assignments_from_pool<'a>(
        &'a self,
        home: &'a LocationID,
        actual: SeniorityLevel,
    ) -> impl Iterator<Item = (&'a AssignmentKey, &'a AssignmentVar)> {
        self.assignment_vars
            .iter()
            .filter(move |(key, _)| key.home == *home && key.actual == actual)
    }

    /// Iterate over the assignments filling role `role` on `project`
    pub fn iter_assignments_to_cell(
        &self,
        project: ProjectID,
        role: SeniorityLevel,
    ) -> impl Iterator<Item = (&AssignmentKey, &AssignmentVar)> {
        self.assignment_vars
            .iter()
            .filter(move |(key, _)| key.project == project && key.role == role)
    }
}
