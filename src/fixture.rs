//! Fixtures for tests
use crate::eligibility::EligibilityMode;
use crate::location::{LocationID, Locations};
use crate::model::{LevelMap, LevelParameters, Model, ModelOptions, ModelParameters};
use crate::optimisation::solver::HighsDriver;
use crate::project::{Project, ProjectID, ProjectMap};
use crate::scenario::ScalarParameters;
use crate::seniority::SeniorityLevel;
use crate::units::{Days, Dimensionless, Money, MoneyPerDayPerHead, MoneyPerHead};
use indexmap::{IndexSet, indexmap};
use map_macro::hash_map;
use rstest::fixture;
use std::collections::HashMap;
use std::path::PathBuf;
use strum::IntoEnumIterator;

/// Assert that an error with the given message occurs
macro_rules! assert_error {
    ($result:expr, $msg:expr) => {
        assert_eq!(
            $result.unwrap_err().chain().next().unwrap().to_string(),
            $msg
        );
    };
}
pub(crate) use assert_error;

/// A solver driver with console output disabled
pub const HIGHS: HighsDriver = HighsDriver {
    time_limit: 60.0,
    log_output: false,
};

fn location_set(ids: &[&str]) -> IndexSet<LocationID> {
    ids.iter().map(|id| LocationID::new(id)).collect()
}

/// Parameters for every level. Junior consultants may always be benched.
fn levels(bench_limit_fraction: f64) -> LevelMap {
    let salary = |level: SeniorityLevel| match level {
        SeniorityLevel::SeniorConsultingManager => 700.0,
        SeniorityLevel::ConsultingManager => 550.0,
        SeniorityLevel::SeniorConsultant => 400.0,
        SeniorityLevel::Consultant => 300.0,
        SeniorityLevel::JuniorConsultant => 200.0,
    };

    SeniorityLevel::iter()
        .map(|level| {
            let fraction = if level.is_junior() {
                1.0
            } else {
                bench_limit_fraction
            };
            let parameters = LevelParameters {
                daily_salary: MoneyPerDayPerHead(salary(level)),
                bench_limit_fraction: Dimensionless(fraction),
                outsourcing_cost: Dimensionless(1.5),
                client_satisfaction_penalty: Dimensionless(0.5),
            };
            (level, parameters)
        })
        .collect()
}

fn model_parameters(total_travel_budget: f64) -> ModelParameters {
    ModelParameters {
        working_days: Days(220.0),
        total_travel_budget: Money(total_travel_budget),
        demand_variability: Dimensionless(0.0),
        remote_work_satisfaction_penalty: Dimensionless(0.8),
        options: ModelOptions {
            eligibility_mode: EligibilityMode::Unrestricted,
            ..ModelOptions::default()
        },
    }
}

/// Two locations, two projects and three pools
#[fixture]
pub fn model() -> Model {
    use SeniorityLevel::{Consultant, SeniorConsultant};

    let projects: ProjectMap = indexmap! {
        ProjectID(1) => Project { id: ProjectID(1), location_id: "London".into() },
        ProjectID(2) => Project { id: ProjectID(2), location_id: "Paris".into() },
    };

    Model {
        model_path: PathBuf::from("model"),
        parameters: model_parameters(5000.0),
        locations: Locations {
            home: location_set(&["London", "Paris"]),
            project: location_set(&["London", "Paris"]),
        },
        levels: levels(0.5),
        projects,
        pools: hash_map! {
            ("London".into(), Consultant) => 4,
            ("London".into(), SeniorConsultant) => 2,
            ("Paris".into(), Consultant) => 3,
        },
        demand: hash_map! {
            (ProjectID(1), SeniorConsultant) => 2,
            (ProjectID(1), Consultant) => 3,
            (ProjectID(2), Consultant) => 2,
        },
        daily_rates: hash_map! {
            (ProjectID(1), SeniorConsultant) => MoneyPerDayPerHead(600.0),
            (ProjectID(1), Consultant) => MoneyPerDayPerHead(400.0),
            (ProjectID(2), Consultant) => MoneyPerDayPerHead(500.0),
        },
        travel_costs: hash_map! {
            ("London".into(), "Paris".into()) => MoneyPerHead(1000.0),
            ("Paris".into(), "London".into()) => MoneyPerHead(800.0),
        },
        preferences: hash_map! {
            (Consultant, "Paris".into()) => true,
            (Consultant, "London".into()) => true,
            (SeniorConsultant, "London".into()) => true,
            (SeniorConsultant, "Paris".into()) => false,
        },
    }
}

/// The scalar parameters documented in a model
pub fn scalar_parameters(model: &Model) -> ScalarParameters {
    ScalarParameters::from_model(model)
}

/// A model with one location, one project and a single pool of consultants.
///
/// # Arguments
///
/// * `pool` - Headcount of the consultant pool
/// * `demand` - Demand for consultants on the project
/// * `bench_limit_fraction` - Bench limit fraction for non-junior levels
pub fn single_location_model(pool: u32, demand: u32, bench_limit_fraction: f64) -> Model {
    let level = SeniorityLevel::Consultant;
    let london = LocationID::new("London");

    Model {
        model_path: PathBuf::from("model"),
        parameters: model_parameters(0.0),
        locations: Locations {
            home: location_set(&["London"]),
            project: location_set(&["London"]),
        },
        levels: levels(bench_limit_fraction),
        projects: indexmap! {
            ProjectID(1) => Project { id: ProjectID(1), location_id: london.clone() },
        },
        pools: hash_map! { (london.clone(), level) => pool },
        demand: hash_map! { (ProjectID(1), level) => demand },
        daily_rates: hash_map! { (ProjectID(1), level) => MoneyPerDayPerHead(400.0) },
        travel_costs: HashMap::new(),
        preferences: hash_map! { (level, london) => true },
    }
}

/// A single pool of 10 consultants, half of whom are needed on the only project
pub fn scenario_a_model() -> Model {
    single_location_model(10, 5, 1.0)
}
