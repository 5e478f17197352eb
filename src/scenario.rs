//! Immutable snapshots of the scalar parameters which sensitivity experiments vary.
//!
//! A [`ScalarParameters`] value is built from the parameter store once and then replaced, never
//! mutated, for each point of a sweep. This keeps one sweep point's values from leaking into the
//! next.
use crate::model::{LevelParameters, Model};
use crate::model::parameters::check_demand_variability;
use crate::optimisation::constraints::ConstraintFamily;
use crate::seniority::SeniorityLevel;
use crate::units::{Dimensionless, Money};
use anyhow::{Result, ensure};
use indexmap::IndexMap;
use itertools::Itertools;
use serde::Deserialize;
use std::fmt;
use strum::{Display, EnumIter};

/// A scalar parameter which can be swept by a sensitivity experiment.
///
/// Per-level parameters are swept uniformly, i.e. every level takes the swept value.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Deserialize, Display, EnumIter,
)]
#[serde(rename_all = "snake_case")]
pub enum SweepParameter {
    /// The fraction by which demand is scaled
    DemandVariability,
    /// The cost of outsourcing as a multiple of daily salary
    OutsourcingCost,
    /// The penalty for unfilled demand as a multiple of the mean daily rate
    ClientSatisfactionPenalty,
    /// The total travel budget
    TotalTravelBudget,
    /// The fraction of each pool which may be benched (Junior pools excepted)
    BenchLimitFraction,
}

impl SweepParameter {
    /// The constraint families whose coefficients or bounds depend on this parameter.
    ///
    /// These must be rebuilt whenever the parameter changes. Parameters which only appear in the
    /// objective return an empty slice.
    pub fn invalidated_families(self) -> &'static [ConstraintFamily] {
        match self {
            Self::DemandVariability => &[
                ConstraintFamily::DemandCap,
                ConstraintFamily::UnfilledDefinition,
            ],
            Self::TotalTravelBudget => &[ConstraintFamily::TravelBudget],
            Self::BenchLimitFraction => &[ConstraintFamily::BenchLimit],
            Self::OutsourcingCost | Self::ClientSatisfactionPenalty => &[],
        }
    }

    /// Check that a value is valid for this parameter
    pub fn check_value(self, value: f64) -> Result<()> {
        match self {
            Self::DemandVariability => check_demand_variability(Dimensionless(value))?,
            Self::BenchLimitFraction => ensure!(
                (0.0..=1.0).contains(&value),
                "{self} must be between 0 and 1, got {value}"
            ),
            Self::OutsourcingCost | Self::ClientSatisfactionPenalty | Self::TotalTravelBudget => {
                ensure!(
                    value.is_finite() && value >= 0.0,
                    "{self} must be a finite number no less than zero, got {value}"
                );
            }
        }

        Ok(())
    }
}

/// The values of every sweepable parameter for one solve
#[derive(Debug, Clone, PartialEq)]
pub struct ScalarParameters {
    /// The fraction by which demand is scaled
    pub demand_variability: Dimensionless,
    /// The total travel budget
    pub total_travel_budget: Money,
    /// Outsourcing cost multiplier for each level
    pub outsourcing_cost: IndexMap<SeniorityLevel, Dimensionless>,
    /// Client satisfaction penalty for each level
    pub client_satisfaction_penalty: IndexMap<SeniorityLevel, Dimensionless>,
    /// Bench limit fraction for each level
    pub bench_limit_fraction: IndexMap<SeniorityLevel, Dimensionless>,
}

impl ScalarParameters {
    /// Take a snapshot of the documented values in the parameter store
    pub fn from_model(model: &Model) -> Self {
        Self {
            demand_variability: model.parameters.demand_variability,
            total_travel_budget: model.parameters.total_travel_budget,
            outsourcing_cost: collect_per_level(model, |p| p.outsourcing_cost),
            client_satisfaction_penalty: collect_per_level(model, |p| {
                p.client_satisfaction_penalty
            }),
            bench_limit_fraction: collect_per_level(model, |p| p.bench_limit_fraction),
        }
    }

    /// Create a new snapshot with one parameter set to `value`
    pub fn with_value(&self, parameter: SweepParameter, value: f64) -> Self {
        let mut params = self.clone();
        let set_all = |map: &mut IndexMap<SeniorityLevel, Dimensionless>| {
            for v in map.values_mut() {
                *v = Dimensionless(value);
            }
        };

        match parameter {
            SweepParameter::DemandVariability => params.demand_variability = Dimensionless(value),
            SweepParameter::TotalTravelBudget => params.total_travel_budget = Money(value),
            SweepParameter::OutsourcingCost => set_all(&mut params.outsourcing_cost),
            SweepParameter::ClientSatisfactionPenalty => {
                set_all(&mut params.client_satisfaction_penalty);
            }
            SweepParameter::BenchLimitFraction => set_all(&mut params.bench_limit_fraction),
        }

        params
    }

    /// Create a new snapshot with several parameters overridden
    pub fn with_overrides<'a, I>(&self, overrides: I) -> Self
    where
        I: IntoIterator<Item = (&'a SweepParameter, &'a f64)>,
    {
        overrides
            .into_iter()
            .fold(self.clone(), |params, (parameter, value)| {
                params.with_value(*parameter, *value)
            })
    }

    /// Iterate over the parameters whose values differ between `self` and `other`
    pub fn iter_changed<'a>(
        &'a self,
        other: &'a ScalarParameters,
    ) -> impl Iterator<Item = SweepParameter> + 'a {
        use strum::IntoEnumIterator;
        SweepParameter::iter().filter(move |parameter| match parameter {
            SweepParameter::DemandVariability => {
                self.demand_variability != other.demand_variability
            }
            SweepParameter::TotalTravelBudget => {
                self.total_travel_budget != other.total_travel_budget
            }
            SweepParameter::OutsourcingCost => self.outsourcing_cost != other.outsourcing_cost,
            SweepParameter::ClientSatisfactionPenalty => {
                self.client_satisfaction_penalty != other.client_satisfaction_penalty
            }
            SweepParameter::BenchLimitFraction => {
                self.bench_limit_fraction != other.bench_limit_fraction
            }
        })
    }

    /// Scale a demand by the variability factor, rounding to the nearest whole head.
    ///
    /// Demand never becomes negative.
    pub fn adjusted_demand(&self, demand: u32) -> u32 {
        let adjusted = (f64::from(demand) * (1.0 + self.demand_variability.value())).round();
        adjusted.max(0.0) as u32
    }

    /// The fraction of a pool which may be benched.
    ///
    /// The most junior level may always be benched in full.
    pub fn bench_limit_fraction(&self, level: SeniorityLevel) -> Dimensionless {
        if level.is_junior() {
            return Dimensionless(1.0);
        }

        self.bench_limit_fraction[&level]
    }

    /// The outsourcing cost multiplier for a level
    pub fn outsourcing_cost(&self, level: SeniorityLevel) -> Dimensionless {
        self.outsourcing_cost[&level]
    }

    /// The client satisfaction penalty for a level
    pub fn client_satisfaction_penalty(&self, level: SeniorityLevel) -> Dimensionless {
        self.client_satisfaction_penalty[&level]
    }
}

fn collect_per_level<F>(model: &Model, f: F) -> IndexMap<SeniorityLevel, Dimensionless>
where
    F: Fn(&LevelParameters) -> Dimensionless,
{
    model
        .levels
        .iter()
        .map(|(level, params)| (*level, f(params)))
        .collect()
}

fn format_per_level(map: &IndexMap<SeniorityLevel, Dimensionless>) -> String {
    let values = map.values().collect_vec();
    if values.iter().all_equal() {
        // Common case: the parameter has been swept uniformly
        return values.first().map(ToString::to_string).unwrap_or_default();
    }

    format!(
        "[{}]",
        map.iter()
            .map(|(level, value)| format!("{level}: {value}"))
            .join(", ")
    )
}

impl fmt::Display for ScalarParameters {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "demand_variability={}, total_travel_budget={}, outsourcing_cost={}, \
            client_satisfaction_penalty={}, bench_limit_fraction={}",
            self.demand_variability,
            self.total_travel_budget,
            format_per_level(&self.outsourcing_cost),
            format_per_level(&self.client_satisfaction_penalty),
            format_per_level(&self.bench_limit_fraction)
        )
    }
}
