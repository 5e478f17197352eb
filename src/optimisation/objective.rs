//! Assembly of the profit objective from its component terms.
use super::variables::{Column, VariableSchema};
use crate::eligibility::WorkArrangement;
use crate::error::ModelBuildError;
use crate::model::Model;
use crate::scenario::ScalarParameters;
use crate::units::{Headcount, Money};
use indexmap::IndexMap;
use strum::{Display, EnumIter, IntoEnumIterator};

/// A term of the objective
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Display, EnumIter)]
pub enum ObjectiveTerm {
    /// Revenue from on-site assignments and outsourced headcount
    OnSiteRevenue,
    /// Revenue from work-from-home assignments, after the satisfaction penalty
    RemoteRevenue,
    /// Salaries for every consultant in every pool
    SalaryCost,
    /// Travel for cross-location assignments
    TravelCost,
    /// Penalty for unfilled demand
    UnfilledPenalty,
    /// Cost of outsourced headcount
    OutsourceCost,
}

impl ObjectiveTerm {
    /// Whether this term is subtracted from profit
    pub fn is_cost(self) -> bool {
        !matches!(self, Self::OnSiteRevenue | Self::RemoteRevenue)
    }
}

/// A linear expression: a constant plus a coefficient for each of some columns
#[derive(Debug, Clone, Default, PartialEq)]
pub struct TermExpression {
    /// The part of the term which does not depend on any decision
    pub constant: f64,
    /// The coefficient of each column contributing to the term
    pub coefficients: Vec<(Column, f64)>,
}

impl TermExpression {
    /// Evaluate the expression for the given column values
    pub fn evaluate(&self, values: &[f64]) -> Money {
        let variable: f64 = self
            .coefficients
            .iter()
            .map(|(column, coeff)| coeff * values[*column])
            .sum();
        Money(self.constant + variable)
    }
}

/// The value of each term of the objective for one solution
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct ObjectiveBreakdown {
    /// Revenue from on-site assignments and outsourcing
    pub on_site_revenue: Money,
    /// Revenue from remote assignments
    pub remote_revenue: Money,
    /// Total salary cost
    pub salary_cost: Money,
    /// Total travel cost
    pub travel_cost: Money,
    /// Total penalty for unfilled demand
    pub unfilled_penalty: Money,
    /// Total outsourcing cost
    pub outsource_cost: Money,
}

impl ObjectiveBreakdown {
    /// Total revenue
    pub fn revenue(&self) -> Money {
        self.on_site_revenue + self.remote_revenue
    }

    /// Revenue less every cost
    pub fn total_profit(&self) -> Money {
        self.revenue()
            - self.salary_cost
            - self.travel_cost
            - self.unfilled_penalty
            - self.outsource_cost
    }

    /// Get the value of a single term
    pub fn get(&self, term: ObjectiveTerm) -> Money {
        match term {
            ObjectiveTerm::OnSiteRevenue => self.on_site_revenue,
            ObjectiveTerm::RemoteRevenue => self.remote_revenue,
            ObjectiveTerm::SalaryCost => self.salary_cost,
            ObjectiveTerm::TravelCost => self.travel_cost,
            ObjectiveTerm::UnfilledPenalty => self.unfilled_penalty,
            ObjectiveTerm::OutsourceCost => self.outsource_cost,
        }
    }
}

/// The assembled objective: total profit, to be maximised
#[derive(Debug, Clone, PartialEq)]
pub struct Objective {
    terms: IndexMap<ObjectiveTerm, TermExpression>,
    num_columns: usize,
}

impl Objective {
    /// Assemble every term of the objective for the given parameters.
    ///
    /// # Returns
    ///
    /// The objective or a [`ModelBuildError`] if a daily rate needed for outsourcing or the
    /// unfilled demand penalty is missing.
    pub fn assemble(
        model: &Model,
        schema: &VariableSchema,
        parameters: &ScalarParameters,
    ) -> Result<Self, ModelBuildError> {
        let working_days = model.parameters.working_days;
        let remote_penalty = model.parameters.remote_work_satisfaction_penalty;
        let mut terms: IndexMap<_, _> = ObjectiveTerm::iter()
            .map(|term| (term, TermExpression::default()))
            .collect();

        for var in schema.assignment_vars.values() {
            let revenue = var.daily_rate
                * working_days
                * var.arrangement.revenue_multiplier(remote_penalty);
            let term = match var.arrangement {
                WorkArrangement::OnSite => ObjectiveTerm::OnSiteRevenue,
                WorkArrangement::Remote => ObjectiveTerm::RemoteRevenue,
            };
            terms[&term]
                .coefficients
                .push((var.column, revenue.value()));

            if var.travel_cost.value() != 0.0 {
                terms[&ObjectiveTerm::TravelCost]
                    .coefficients
                    .push((var.column, var.travel_cost.value()));
            }
        }

        // Salaries are paid whether or not consultants are assigned
        let salary_cost: Money = schema
            .bench_vars
            .keys()
            .map(|(home, level)| {
                let pool = Headcount(f64::from(model.pool(home, *level)));
                model.level(*level).daily_salary * working_days * pool
            })
            .sum();
        terms[&ObjectiveTerm::SalaryCost].constant = salary_cost.value();

        for (&(_, level), &column) in &schema.unfilled_vars {
            let penalty = model.mean_daily_rate(level)?
                * working_days
                * parameters.client_satisfaction_penalty(level);
            terms[&ObjectiveTerm::UnfilledPenalty]
                .coefficients
                .push((column, penalty.value()));
        }

        for (&(project, level), &column) in &schema.outsource_vars {
            let revenue = model.daily_rate(project, level)? * working_days;
            terms[&ObjectiveTerm::OnSiteRevenue]
                .coefficients
                .push((column, revenue.value()));

            let cost = model.level(level).daily_salary
                * working_days
                * parameters.outsourcing_cost(level);
            terms[&ObjectiveTerm::OutsourceCost]
                .coefficients
                .push((column, cost.value()));
        }

        Ok(Self {
            terms,
            num_columns: schema.num_columns(),
        })
    }

    /// Get the expression for one term
    pub fn term(&self, term: ObjectiveTerm) -> &TermExpression {
        &self.terms[&term]
    }

    /// The net coefficient of every column in the profit objective
    pub fn column_coefficients(&self) -> Vec<f64> {
        let mut coefficients = vec![0.0; self.num_columns];
        for (term, expression) in &self.terms {
            let sign = if term.is_cost() { -1.0 } else { 1.0 };
            for (column, coeff) in &expression.coefficients {
                coefficients[*column] += sign * coeff;
            }
        }

        coefficients
    }

    /// The part of the profit which does not depend on any decision
    pub fn offset(&self) -> f64 {
        self.terms
            .iter()
            .map(|(term, expression)| {
                if term.is_cost() {
                    -expression.constant
                } else {
                    expression.constant
                }
            })
            .sum()
    }

    /// Evaluate every term for the given column values
    pub fn evaluate(&self, values: &[f64]) -> ObjectiveBreakdown {
        let value = |term: ObjectiveTerm| self.terms[&term].evaluate(values);
        ObjectiveBreakdown {
            on_site_revenue: value(ObjectiveTerm::OnSiteRevenue),
            remote_revenue: value(ObjectiveTerm::RemoteRevenue),
            salary_cost: value(ObjectiveTerm::SalaryCost),
            travel_cost: value(ObjectiveTerm::TravelCost),
            unfilled_penalty: value(ObjectiveTerm::UnfilledPenalty),
            outsource_cost: value(ObjectiveTerm::OutsourceCost),
        }
    }
}
