//! Code for generating the constraints of the allocation problem.
//!
//! Constraints are stored as values in a [`ConstraintMap`] keyed by [`ConstraintID`]. When a
//! parameter changes, every constraint in the families which depend on it is rebuilt from scratch
//! and its entry in the map replaced.
use super::variables::{Column, VariableSchema};
use crate::location::LocationID;
use crate::model::Model;
use crate::project::ProjectID;
use crate::scenario::ScalarParameters;
use crate::seniority::SeniorityLevel;
use indexmap::IndexMap;
use itertools::Itertools;
use std::fmt;
use strum::{Display, EnumIter};

/// A family of constraints, generated together
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Display, EnumIter)]
#[strum(serialize_all = "snake_case")]
pub enum ConstraintFamily {
    /// Every consultant in a pool is either assigned or benched
    SupplyBalance,
    /// At most a fraction of each pool may be benched
    BenchLimit,
    /// Assignments and outsourcing may not exceed adjusted demand
    DemandCap,
    /// Defines unfilled demand
    UnfilledDefinition,
    /// Total travel spend may not exceed the budget
    TravelBudget,
}

impl ConstraintFamily {
    /// Whether the family can be dropped when looking for the cause of an infeasibility
    pub fn is_optional(self) -> bool {
        self != Self::SupplyBalance
    }
}

/// Identifies a single constraint
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum ConstraintID {
    /// Supply balance for a pool
    SupplyBalance(LocationID, SeniorityLevel),
    /// Bench limit for a pool
    BenchLimit(LocationID, SeniorityLevel),
    /// Demand cap for a project role
    DemandCap(ProjectID, SeniorityLevel),
    /// Unfilled demand definition for a project role
    UnfilledDefinition(ProjectID, SeniorityLevel),
    /// The global travel budget
    TravelBudget,
}

impl ConstraintID {
    /// The family this constraint belongs to
    pub fn family(&self) -> ConstraintFamily {
        match self {
            Self::SupplyBalance(..) => ConstraintFamily::SupplyBalance,
            Self::BenchLimit(..) => ConstraintFamily::BenchLimit,
            Self::DemandCap(..) => ConstraintFamily::DemandCap,
            Self::UnfilledDefinition(..) => ConstraintFamily::UnfilledDefinition,
            Self::TravelBudget => ConstraintFamily::TravelBudget,
        }
    }
}

impl fmt::Display for ConstraintID {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let family = self.family();
        match self {
            Self::SupplyBalance(home, level) | Self::BenchLimit(home, level) => {
                write!(f, "{family}[{home}, {level}]")
            }
            Self::DemandCap(project, level) | Self::UnfilledDefinition(project, level) => {
                write!(f, "{family}[project {project}, {level}]")
            }
            Self::TravelBudget => write!(f, "{family}"),
        }
    }
}

/// A linear constraint of the form `min <= a1*x1 + a2*x2 + ... <= max`
#[derive(Debug, Clone, PartialEq)]
pub struct Constraint {
    /// The non-zero coefficients and the columns they apply to
    pub terms: Vec<(Column, f64)>,
    /// The lower bound
    pub min: f64,
    /// The upper bound
    pub max: f64,
}

impl Constraint {
    fn equal_to(terms: Vec<(Column, f64)>, rhs: f64) -> Self {
        Self {
            terms,
            min: rhs,
            max: rhs,
        }
    }

    fn at_most(terms: Vec<(Column, f64)>, rhs: f64) -> Self {
        Self {
            terms,
            min: f64::NEG_INFINITY,
            max: rhs,
        }
    }

    /// Evaluate the left-hand side for the given column values
    pub fn evaluate(&self, values: &[f64]) -> f64 {
        self.terms
            .iter()
            .map(|(column, coeff)| coeff * values[*column])
            .sum()
    }
}

/// The constraints of the problem, in the order they are passed to the solver
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ConstraintMap(IndexMap<ConstraintID, Constraint>);

impl ConstraintMap {
    /// Generate every constraint family for the given parameters
    pub fn build(model: &Model, schema: &VariableSchema, parameters: &ScalarParameters) -> Self {
        let mut map = Self::default();
        map.extend(supply_balance_constraints(model, schema));
        map.extend(bench_limit_constraints(model, schema, parameters));
        map.extend(demand_cap_constraints(model, schema, parameters));
        if !schema.unfilled_vars.is_empty() {
            map.extend(unfilled_definition_constraints(model, schema, parameters));
        }
        map.extend(travel_budget_constraint(schema, parameters));

        map
    }

    fn extend<I>(&mut self, constraints: I)
    where
        I: IntoIterator<Item = (ConstraintID, Constraint)>,
    {
        for (id, constraint) in constraints {
            let existing = self.0.insert(id, constraint).is_some();
            assert!(!existing, "Duplicate constraint generated");
        }
    }

    /// Rebuild the given families for new parameter values.
    ///
    /// The index domains never change, so each rebuilt constraint replaces an existing entry and
    /// the row order is preserved.
    pub fn regenerate(
        &mut self,
        model: &Model,
        schema: &VariableSchema,
        parameters: &ScalarParameters,
        families: &[ConstraintFamily],
    ) {
        for family in families.iter().unique() {
            let rebuilt: Vec<_> = match family {
                ConstraintFamily::SupplyBalance => {
                    supply_balance_constraints(model, schema).collect()
                }
                ConstraintFamily::BenchLimit => {
                    bench_limit_constraints(model, schema, parameters).collect()
                }
                ConstraintFamily::DemandCap => {
                    demand_cap_constraints(model, schema, parameters).collect()
                }
                ConstraintFamily::UnfilledDefinition => {
                    if schema.unfilled_vars.is_empty() {
                        continue;
                    }
                    unfilled_definition_constraints(model, schema, parameters).collect()
                }
                ConstraintFamily::TravelBudget => {
                    travel_budget_constraint(schema, parameters).collect()
                }
            };

            for (id, constraint) in rebuilt {
                let replaced = self.0.insert(id, constraint).is_some();
                assert!(replaced, "Regenerated constraint was not in the original set");
            }
        }
    }

    /// A copy of this map with every constraint of `family` removed
    pub fn without_family(&self, family: ConstraintFamily) -> Self {
        Self(
            self.0
                .iter()
                .filter(|(id, _)| id.family() != family)
                .map(|(id, constraint)| (id.clone(), constraint.clone()))
                .collect(),
        )
    }

    /// The families with at least one constraint in the map, in generation order
    pub fn families(&self) -> Vec<ConstraintFamily> {
        self.0.keys().map(ConstraintID::family).dedup().collect()
    }

    /// Get a constraint by its ID
    pub fn get(&self, id: &ConstraintID) -> Option<&Constraint> {
        self.0.get(id)
    }

    /// Iterate over the constraints in row order
    pub fn iter(&self) -> impl Iterator<Item = (&ConstraintID, &Constraint)> {
        self.0.iter()
    }

    /// Iterate over the IDs of the constraints in row order
    pub fn keys(&self) -> impl Iterator<Item = &ConstraintID> {
        self.0.keys()
    }

    /// The number of constraints
    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// Whether there are no constraints
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

/// Assignments plus bench must equal the pool, for every home location and level
fn supply_balance_constraints<'a>(
    model: &'a Model,
    schema: &'a VariableSchema,
) -> impl Iterator<Item = (ConstraintID, Constraint)> + 'a {
    schema.bench_vars.iter().map(move |((home, level), bench)| {
        let mut terms = schema
            .iter_assignments_from_pool(home, *level)
            .map(|(_, var)| (var.column, 1.0))
            .collect_vec();
        terms.push((*bench, 1.0));
        let pool = f64::from(model.pool(home, *level));

        (
            ConstraintID::SupplyBalance(home.clone(), *level),
            Constraint::equal_to(terms, pool),
        )
    })
}

/// Bench may not exceed a fraction of the pool. The Junior level may bench its full pool.
fn bench_limit_constraints<'a>(
    model: &'a Model,
    schema: &'a VariableSchema,
    parameters: &'a ScalarParameters,
) -> impl Iterator<Item = (ConstraintID, Constraint)> + 'a {
    schema.bench_vars.iter().map(move |((home, level), bench)| {
        let pool = f64::from(model.pool(home, *level));
        let limit = parameters.bench_limit_fraction(*level).value() * pool;

        (
            ConstraintID::BenchLimit(home.clone(), *level),
            Constraint::at_most(vec![(*bench, 1.0)], limit),
        )
    })
}

/// Assignments (and outsourcing) may not exceed the adjusted demand for each demand cell
fn demand_cap_constraints<'a>(
    model: &'a Model,
    schema: &'a VariableSchema,
    parameters: &'a ScalarParameters,
) -> impl Iterator<Item = (ConstraintID, Constraint)> + 'a {
    model.iter_demand_cells().map(move |(project, level)| {
        let mut terms = schema
            .iter_assignments_to_cell(project, level)
            .map(|(_, var)| (var.column, 1.0))
            .collect_vec();
        if let Some(outsource) = schema.outsource_vars.get(&(project, level)) {
            terms.push((*outsource, 1.0));
        }
        let demand = parameters.adjusted_demand(model.demand(project, level));

        (
            ConstraintID::DemandCap(project, level),
            Constraint::at_most(terms, f64::from(demand)),
        )
    })
}

/// Unfilled demand is whatever adjusted demand is covered by neither assignments nor outsourcing
fn unfilled_definition_constraints<'a>(
    model: &'a Model,
    schema: &'a VariableSchema,
    parameters: &'a ScalarParameters,
) -> impl Iterator<Item = (ConstraintID, Constraint)> + 'a {
    schema.unfilled_vars.iter().map(move |((project, level), unfilled)| {
        let mut terms = schema
            .iter_assignments_to_cell(*project, *level)
            .map(|(_, var)| (var.column, 1.0))
            .collect_vec();
        if let Some(outsource) = schema.outsource_vars.get(&(*project, *level)) {
            terms.push((*outsource, 1.0));
        }
        terms.push((*unfilled, 1.0));
        let demand = parameters.adjusted_demand(model.demand(*project, *level));

        (
            ConstraintID::UnfilledDefinition(*project, *level),
            Constraint::equal_to(terms, f64::from(demand)),
        )
    })
}

/// Total travel spend may not exceed the budget
fn travel_budget_constraint(
    schema: &VariableSchema,
    parameters: &ScalarParameters,
) -> impl Iterator<Item = (ConstraintID, Constraint)> {
    let terms = schema
        .assignment_vars
        .values()
        .filter(|var| var.travel_cost.value() != 0.0)
        .map(|var| (var.column, var.travel_cost.value()))
        .collect_vec();

    std::iter::once((
        ConstraintID::TravelBudget,
        Constraint::at_most(terms, parameters.total_travel_budget.value()),
    ))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fixture::{model, scalar_parameters};
    use crate::scenario::SweepParameter;
    use float_cmp::assert_approx_eq;
    use rstest::rstest;

    #[rstest]
    fn test_build_families(model: Model) {
        let schema = VariableSchema::new(&model).unwrap();
        let constraints = ConstraintMap::build(&model, &schema, &scalar_parameters(&model));
        assert_eq!(
            constraints.families(),
            [
                ConstraintFamily::SupplyBalance,
                ConstraintFamily::BenchLimit,
                ConstraintFamily::DemandCap,
                ConstraintFamily::UnfilledDefinition,
                ConstraintFamily::TravelBudget,
            ]
        );

        // One supply balance and bench limit per pool, one cap and definition per demand cell
        assert_eq!(constraints.len(), 10 + 10 + 3 + 3 + 1);
    }

    #[rstest]
    fn test_supply_balance(model: Model) {
        let schema = VariableSchema::new(&model).unwrap();
        let constraints = ConstraintMap::build(&model, &schema, &scalar_parameters(&model));
        let id = ConstraintID::SupplyBalance("London".into(), SeniorityLevel::SeniorConsultant);
        let constraint = constraints.get(&id).unwrap();
        assert_approx_eq!(f64, constraint.min, 2.0);
        assert_approx_eq!(f64, constraint.max, 2.0);

        // Three assignments plus bench
        assert_eq!(constraint.terms.len(), 4);
    }

    #[rstest]
    fn test_bench_limit_junior(mut model: Model) {
        model
            .pools
            .insert(("London".into(), SeniorityLevel::JuniorConsultant), 2);
        let schema = VariableSchema::new(&model).unwrap();
        let parameters =
            scalar_parameters(&model).with_value(SweepParameter::BenchLimitFraction, 0.0);
        let constraints = ConstraintMap::build(&model, &schema, &parameters);

        let id = ConstraintID::BenchLimit("London".into(), SeniorityLevel::Consultant);
        assert_approx_eq!(f64, constraints.get(&id).unwrap().max, 0.0);
        let id = ConstraintID::BenchLimit("London".into(), SeniorityLevel::JuniorConsultant);
        assert_approx_eq!(f64, constraints.get(&id).unwrap().max, 2.0);
    }

    #[rstest]
    fn test_regenerate_matches_fresh_build(model: Model) {
        let schema = VariableSchema::new(&model).unwrap();
        let original = scalar_parameters(&model);
        let mut constraints = ConstraintMap::build(&model, &schema, &original);

        let updated = original
            .with_value(SweepParameter::DemandVariability, 0.5)
            .with_value(SweepParameter::TotalTravelBudget, 10.0);
        let families = updated
            .iter_changed(&original)
            .flat_map(|parameter| parameter.invalidated_families().iter().copied())
            .collect_vec();
        constraints.regenerate(&model, &schema, &updated, &families);

        assert_eq!(constraints, ConstraintMap::build(&model, &schema, &updated));
        let cap = constraints
            .get(&ConstraintID::DemandCap(ProjectID(1), SeniorityLevel::Consultant))
            .unwrap();
        assert_approx_eq!(f64, cap.max, 5.0); // 3 * 1.5 = 4.5, rounded up
    }

    #[rstest]
    fn test_stale_constraints_differ(model: Model) {
        let schema = VariableSchema::new(&model).unwrap();
        let original = scalar_parameters(&model);
        let constraints = ConstraintMap::build(&model, &schema, &original);
        let updated = original.with_value(SweepParameter::DemandVariability, -1.0);
        assert_ne!(constraints, ConstraintMap::build(&model, &schema, &updated));
    }

    #[rstest]
    fn test_without_family(model: Model) {
        let schema = VariableSchema::new(&model).unwrap();
        let constraints = ConstraintMap::build(&model, &schema, &scalar_parameters(&model));
        let reduced = constraints.without_family(ConstraintFamily::TravelBudget);
        assert_eq!(reduced.len(), constraints.len() - 1);
        assert!(!reduced.families().contains(&ConstraintFamily::TravelBudget));
    }

    #[test]
    fn test_constraint_id_display() {
        assert_eq!(
            ConstraintID::DemandCap(ProjectID(3), SeniorityLevel::Consultant).to_string(),
            "demand_cap[project 3, consultant]"
        );
        assert_eq!(ConstraintID::TravelBudget.to_string(), "travel_budget");
    }
}
