//! Code for building and solving the allocation problem.
//!
//! The problem is assembled from a [`VariableSchema`], a [`ConstraintMap`] and an [`Objective`].
//! The schema is fixed for the whole run; the constraints and objective are derived from an
//! immutable [`ScalarParameters`] snapshot and rebuilt when a new snapshot is applied.
use crate::error::{FailureKind, SolveFailure};
use crate::location::LocationID;
use crate::model::Model;
use crate::project::ProjectID;
use crate::scenario::ScalarParameters;
use crate::seniority::SeniorityLevel;
use crate::units::{Headcount, Money, MoneyPerDayPerHead};
use anyhow::{Context, Result};
use itertools::Itertools;
use log::{debug, info};
use serde::{Deserialize, Serialize};
use std::rc::Rc;

pub mod constraints;
use constraints::{ConstraintFamily, ConstraintID, ConstraintMap};
pub mod objective;
use objective::{Objective, ObjectiveBreakdown};
pub mod solver;
use solver::{Driver, LinearProgram, SolveStatus};
pub mod variables;
use variables::{AssignmentKey, AssignmentVar, VariableSchema};

/// Headcounts smaller than this are treated as zero when listing allocations
pub const ZERO_TOLERANCE: f64 = 1e-9;

/// The allocation problem for one set of parameter values
#[derive(Debug, Clone)]
pub struct AllocationProblem<'a> {
    model: &'a Model,
    schema: Rc<VariableSchema>,
    parameters: ScalarParameters,
    constraints: ConstraintMap,
    objective: Objective,
    integer: bool,
}

impl<'a> AllocationProblem<'a> {
    /// Build the problem for a model with the given parameter values.
    ///
    /// # Returns
    ///
    /// The problem, or an error wrapping a [`crate::error::ModelBuildError`] if a required
    /// coefficient is missing.
    pub fn build(model: &'a Model, parameters: ScalarParameters) -> Result<Self> {
        let schema = VariableSchema::new(model).context("Failed to define variables")?;
        let constraints = ConstraintMap::build(model, &schema, &parameters);
        let objective = Objective::assemble(model, &schema, &parameters)
            .context("Failed to assemble objective")?;
        debug!(
            "Built problem with {} variables ({} assignments) and {} constraints",
            schema.num_columns(),
            schema.assignment_vars.len(),
            constraints.len()
        );

        Ok(Self {
            model,
            schema: Rc::new(schema),
            parameters,
            constraints,
            objective,
            integer: model.parameters.options.integer_headcount,
        })
    }

    /// Derive the problem for a new parameter snapshot.
    ///
    /// The variable schema is shared. Constraint families which depend on a changed parameter are
    /// regenerated and the objective is reassembled.
    pub fn with_parameters(&self, parameters: ScalarParameters) -> Result<Self> {
        let families = parameters
            .iter_changed(&self.parameters)
            .flat_map(|parameter| parameter.invalidated_families().iter().copied())
            .unique()
            .collect_vec();
        if !families.is_empty() {
            debug!("Regenerating constraints: {}", families.iter().join(", "));
        }

        let mut constraints = self.constraints.clone();
        constraints.regenerate(self.model, &self.schema, &parameters, &families);
        let objective = Objective::assemble(self.model, &self.schema, &parameters)
            .context("Failed to assemble objective")?;

        Ok(Self {
            model: self.model,
            schema: Rc::clone(&self.schema),
            parameters,
            constraints,
            objective,
            integer: self.integer,
        })
    }

    /// The same problem with integrality dropped, so that dual values are meaningful
    pub fn relaxed(self) -> Self {
        Self {
            integer: false,
            ..self
        }
    }

    /// The model the problem was built from
    pub fn model(&self) -> &'a Model {
        self.model
    }

    /// The variables of the problem
    pub fn schema(&self) -> &VariableSchema {
        &self.schema
    }

    /// The parameter values the problem was built with
    pub fn parameters(&self) -> &ScalarParameters {
        &self.parameters
    }

    /// The constraints of the problem
    pub fn constraints(&self) -> &ConstraintMap {
        &self.constraints
    }

    /// The objective of the problem
    pub fn objective(&self) -> &Objective {
        &self.objective
    }

    /// Whether headcounts must be whole numbers
    pub fn is_integer(&self) -> bool {
        self.integer
    }

    fn linear_program<'b>(&self, constraints: &'b ConstraintMap) -> LinearProgram<'b> {
        LinearProgram {
            objective: self.objective.column_coefficients(),
            constraints,
            integer: self.integer,
        }
    }

    /// Solve the problem.
    ///
    /// # Returns
    ///
    /// The solution, or an error wrapping a [`SolveFailure`] if the solver did not reach
    /// optimality. For infeasible problems, the failure names the constraint families implicated.
    pub fn solve(&self, driver: &dyn Driver) -> Result<Solution<'_>> {
        let result = driver.solve(&self.linear_program(&self.constraints))?;
        let kind = match result.status {
            SolveStatus::Optimal => {
                let solution = Solution {
                    problem: self,
                    primals: result.primals,
                    duals: result.duals,
                };
                info!(
                    "Solved with parameters ({}): total profit {}",
                    self.parameters,
                    solution.objective().total_profit()
                );
                return Ok(solution);
            }
            SolveStatus::Infeasible => FailureKind::Infeasible,
            SolveStatus::Unbounded => FailureKind::Unbounded,
            SolveStatus::Timeout => FailureKind::Timeout,
        };

        let constraints = if kind == FailureKind::Infeasible {
            self.diagnose_infeasibility(driver)?
        } else {
            Vec::new()
        };

        Err(SolveFailure {
            kind,
            parameters: self.parameters.clone(),
            constraints,
        }
        .into())
    }

    /// Find the constraint families whose removal makes the problem feasible.
    ///
    /// If no single family is responsible, every family present is returned.
    fn diagnose_infeasibility(&self, driver: &dyn Driver) -> Result<Vec<ConstraintFamily>> {
        let mut offending = Vec::new();
        for family in self.constraints.families() {
            if !family.is_optional() {
                continue;
            }

            let reduced = self.constraints.without_family(family);
            let result = driver.solve(&self.linear_program(&reduced))?;
            if matches!(result.status, SolveStatus::Optimal | SolveStatus::Unbounded) {
                debug!("Problem becomes feasible without {family} constraints");
                offending.push(family);
            }
        }

        if offending.is_empty() {
            offending = self.constraints.families();
        }

        Ok(offending)
    }
}

/// How the demand for one project role was met
#[derive(Debug, Clone, PartialEq)]
pub struct DemandFulfilment {
    /// The project
    pub project: ProjectID,
    /// The role level
    pub level: SeniorityLevel,
    /// Demand before adjustment
    pub demand: u32,
    /// Demand after scaling by the variability factor
    pub adjusted_demand: u32,
    /// Headcount assigned from the firm's pools
    pub assigned: f64,
    /// Headcount outsourced
    pub outsourced: f64,
    /// Demand left unfilled
    pub unfilled: f64,
}

/// The benched headcount for one pool
#[derive(Debug, Clone, PartialEq)]
pub struct BenchUsage {
    /// The pool's home location
    pub home: LocationID,
    /// The pool's level
    pub level: SeniorityLevel,
    /// The pool's headcount
    pub pool: u32,
    /// Headcount benched
    pub bench: f64,
    /// The most which may be benched
    pub limit: f64,
}

/// Whether headcount on a project comes from the firm's pools or is outsourced
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum AllocationKind {
    /// Consultants from one of the firm's pools
    Assignment,
    /// Outsourced headcount
    Outsource,
}

/// Headcount placed in one project role
#[derive(Debug, Clone, PartialEq)]
pub struct Allocation {
    /// Where the headcount comes from
    pub kind: AllocationKind,
    /// The project
    pub project: ProjectID,
    /// The seniority of the people doing the work
    pub consultant_level: SeniorityLevel,
    /// The pool's home location (`None` for outsourced headcount)
    pub home: Option<LocationID>,
    /// The seniority of the role being filled
    pub role_level: SeniorityLevel,
    /// Where the work is done
    pub location: LocationID,
    /// The headcount
    pub quantity: f64,
    /// The daily rate charged for the role
    pub daily_rate: MoneyPerDayPerHead,
    /// The daily salary of the people doing the work
    pub daily_salary: MoneyPerDayPerHead,
    /// Total travel cost for this headcount
    pub travel_cost: Money,
    /// Whether the work is done from home
    pub work_from_home: bool,
}

/// The optimal solution to an [`AllocationProblem`]
pub struct Solution<'a> {
    problem: &'a AllocationProblem<'a>,
    primals: Vec<f64>,
    duals: Option<Vec<f64>>,
}

impl<'a> Solution<'a> {
    /// The problem which was solved
    pub fn problem(&self) -> &'a AllocationProblem<'a> {
        self.problem
    }

    /// The parameter values in effect for this solution
    pub fn parameters(&self) -> &ScalarParameters {
        &self.problem.parameters
    }

    /// The value of every column
    pub fn primals(&self) -> &[f64] {
        &self.primals
    }

    /// The value of each objective term, recomputed from the solved variables
    pub fn objective(&self) -> ObjectiveBreakdown {
        self.problem.objective.evaluate(&self.primals)
    }

    /// Iterate over every assignment with its solved headcount
    pub fn iter_assignments(
        &self,
    ) -> impl Iterator<Item = (&'a AssignmentKey, &'a AssignmentVar, f64)> + '_ {
        self.problem
            .schema
            .assignment_vars
            .iter()
            .map(move |(key, var)| (key, var, self.primals[var.column]))
    }

    /// Iterate over outsourced headcount for each demand cell (empty if outsourcing is disabled)
    pub fn iter_outsourced(
        &self,
    ) -> impl Iterator<Item = (ProjectID, SeniorityLevel, f64)> + '_ {
        self.problem
            .schema
            .outsource_vars
            .iter()
            .map(move |(&(project, level), column)| (project, level, self.primals[*column]))
    }

    /// Every non-zero assignment and outsourced headcount, ordered by project then role seniority
    pub fn allocations(&self) -> Result<Vec<Allocation>> {
        let model = self.problem.model;
        let mut allocations = Vec::new();
        for (key, var, quantity) in self.iter_assignments() {
            if quantity.abs() < ZERO_TOLERANCE {
                continue;
            }

            let work_from_home = var.arrangement.is_remote();
            let location = if work_from_home {
                key.home.clone()
            } else {
                var.project_location.clone()
            };
            allocations.push(Allocation {
                kind: AllocationKind::Assignment,
                project: key.project,
                consultant_level: key.actual,
                home: Some(key.home.clone()),
                role_level: key.role,
                location,
                quantity,
                daily_rate: var.daily_rate,
                daily_salary: model.level(key.actual).daily_salary,
                travel_cost: var.travel_cost * Headcount(quantity),
                work_from_home,
            });
        }

        for (project, level, quantity) in self.iter_outsourced() {
            if quantity.abs() < ZERO_TOLERANCE {
                continue;
            }

            allocations.push(Allocation {
                kind: AllocationKind::Outsource,
                project,
                consultant_level: level,
                home: None,
                role_level: level,
                location: model.projects[&project].location_id.clone(),
                quantity,
                daily_rate: model.daily_rate(project, level)?,
                daily_salary: model.level(level).daily_salary,
                travel_cost: Money(0.0),
                work_from_home: false,
            });
        }

        // Stable, so pools keep their home then seniority order within a role
        allocations.sort_by_key(|allocation| (allocation.project, allocation.role_level));

        Ok(allocations)
    }

    /// The total headcount assigned to a project role
    pub fn assigned(&self, project: ProjectID, level: SeniorityLevel) -> f64 {
        self.problem
            .schema
            .iter_assignments_to_cell(project, level)
            .map(|(_, var)| self.primals[var.column])
            .sum()
    }

    /// The headcount outsourced to a project role
    pub fn outsourced(&self, project: ProjectID, level: SeniorityLevel) -> f64 {
        self.problem
            .schema
            .outsource_vars
            .get(&(project, level))
            .map_or(0.0, |column| self.primals[*column])
    }

    /// The demand for a project role left unfilled.
    ///
    /// When unfilled demand is not modelled explicitly, it is derived from the other variables.
    pub fn unfilled(&self, project: ProjectID, level: SeniorityLevel) -> f64 {
        if let Some(column) = self.problem.schema.unfilled_vars.get(&(project, level)) {
            return self.primals[*column];
        }

        let model = self.problem.model;
        let demand = self.problem.parameters.adjusted_demand(model.demand(project, level));
        f64::from(demand) - self.assigned(project, level) - self.outsourced(project, level)
    }

    /// Iterate over how demand was met for every demand cell.
    ///
    /// Cells are ordered by ascending project ID, then by seniority.
    pub fn iter_demand_fulfilment(&self) -> impl Iterator<Item = DemandFulfilment> + '_ {
        let model = self.problem.model;
        model.iter_demand_cells().map(move |(project, level)| {
            let demand = model.demand(project, level);
            DemandFulfilment {
                project,
                level,
                demand,
                adjusted_demand: self.problem.parameters.adjusted_demand(demand),
                assigned: self.assigned(project, level),
                outsourced: self.outsourced(project, level),
                unfilled: self.unfilled(project, level),
            }
        })
    }

    /// Iterate over the bench headcount of every pool
    pub fn iter_bench(&self) -> impl Iterator<Item = BenchUsage> + '_ {
        let model = self.problem.model;
        self.problem
            .schema
            .bench_vars
            .iter()
            .map(move |((home, level), column)| {
                let pool = model.pool(home, *level);
                let fraction = self.problem.parameters.bench_limit_fraction(*level);
                BenchUsage {
                    home: home.clone(),
                    level: *level,
                    pool,
                    bench: self.primals[*column],
                    limit: fraction.value() * f64::from(pool),
                }
            })
    }

    /// Iterate over the dual value of every constraint.
    ///
    /// Returns `None` if the problem was solved with integer headcounts, as dual values are not
    /// well defined in that case.
    pub fn iter_duals(&self) -> Option<impl Iterator<Item = (&ConstraintID, f64)>> {
        let duals = self.duals.as_ref()?;
        Some(self.problem.constraints.keys().zip(duals.iter().copied()))
    }
}
