//! The module responsible for writing output data to disk.
use crate::location::LocationID;
use crate::optimisation::{Allocation, AllocationKind, BenchUsage, Solution, ZERO_TOLERANCE};
use crate::optimisation::objective::{ObjectiveBreakdown, ObjectiveTerm};
use crate::project::ProjectID;
use crate::sensitivity::ExperimentResults;
use crate::seniority::SeniorityLevel;
use anyhow::{Context, Result, ensure};
use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use std::fs;
use std::fs::File;
use std::path::{Path, PathBuf};
use strum::IntoEnumIterator;

pub mod metadata;

/// The root folder in which model-specific output folders will be created
const OUTPUT_DIRECTORY_ROOT: &str = "staffplan_results";

/// The output file name for the objective summary
const SUMMARY_FILE_NAME: &str = "summary.csv";

/// The output file name for allocations
const ALLOCATIONS_FILE_NAME: &str = "allocations.csv";

/// The output file name for demand fulfilment
const DEMAND_FILE_NAME: &str = "demand.csv";

/// The output file name for travel between locations
const TRAVEL_FILE_NAME: &str = "travel.csv";

/// The output file name for bench usage
const BENCH_FILE_NAME: &str = "bench.csv";

/// The output file name for constraint duals
const DUALS_FILE_NAME: &str = "debug_duals.csv";

/// Get the default output directory for the model in the specified directory path
pub fn get_output_dir(model_dir: &Path) -> Result<PathBuf> {
    // Get the model name from the dir path. This ends up being convoluted because we need to check
    // for all possible errors. Ugh.
    let model_dir = model_dir
        .canonicalize() // canonicalise in case the user has specified "."
        .context("Could not resolve path to model")?;

    let model_name = model_dir
        .file_name()
        .context("Model cannot be in root folder")?
        .to_str()
        .context("Invalid chars in model dir name")?;

    // Construct path
    Ok([OUTPUT_DIRECTORY_ROOT, model_name].iter().collect())
}

/// Create a new output directory.
///
/// An existing directory is only reused if it is empty or `allow_overwrite` is set, in which case
/// its contents are deleted.
///
/// # Returns
///
/// True if an existing folder's contents were deleted.
pub fn create_output_directory(output_dir: &Path, allow_overwrite: bool) -> Result<bool> {
    if output_dir.is_dir() {
        if output_dir.read_dir()?.next().is_none() {
            // already exists and is empty
            return Ok(false);
        }

        ensure!(
            allow_overwrite,
            "Output folder {} already exists and is not empty. Use --overwrite to replace it.",
            output_dir.display()
        );
        fs::remove_dir_all(output_dir)?;
        fs::create_dir_all(output_dir)?;
        return Ok(true);
    }

    // Try to create the directory, with parents
    fs::create_dir_all(output_dir)?;

    Ok(false)
}

/// Represents a row in the summary CSV file
#[derive(Serialize, Deserialize, Debug, PartialEq)]
struct SummaryRow {
    term: String,
    value: f64,
}

/// Represents a row in the allocations CSV file
#[derive(Serialize, Deserialize, Debug, PartialEq)]
struct AllocationRow {
    #[serde(rename = "Type")]
    kind: AllocationKind,
    #[serde(rename = "Project")]
    project_id: ProjectID,
    #[serde(rename = "Consultant Role")]
    consultant_level: SeniorityLevel,
    #[serde(rename = "Home Location")]
    home_location_id: Option<LocationID>,
    #[serde(rename = "Assigned Role")]
    role_level: SeniorityLevel,
    #[serde(rename = "Allocation Location")]
    allocation_location_id: LocationID,
    #[serde(rename = "Quantity")]
    quantity: f64,
    #[serde(rename = "Daily Rate")]
    daily_rate: f64,
    #[serde(rename = "Daily Salary")]
    daily_salary: f64,
    #[serde(rename = "Travel Cost")]
    travel_cost: f64,
    #[serde(rename = "WFH")]
    work_from_home: bool,
}

impl From<&Allocation> for AllocationRow {
    fn from(allocation: &Allocation) -> Self {
        Self {
            kind: allocation.kind,
            project_id: allocation.project,
            consultant_level: allocation.consultant_level,
            home_location_id: allocation.home.clone(),
            role_level: allocation.role_level,
            allocation_location_id: allocation.location.clone(),
            quantity: allocation.quantity,
            daily_rate: allocation.daily_rate.value(),
            daily_salary: allocation.daily_salary.value(),
            travel_cost: allocation.travel_cost.value(),
            work_from_home: allocation.work_from_home,
        }
    }
}

/// Represents a row in the demand CSV file
#[derive(Serialize, Deserialize, Debug, PartialEq)]
struct DemandRow {
    project_id: ProjectID,
    level: SeniorityLevel,
    demand: u32,
    adjusted_demand: u32,
    assigned: f64,
    outsourced: f64,
    unfilled: f64,
}

/// Represents a row in the travel CSV file
#[derive(Serialize, Deserialize, Debug, PartialEq)]
struct TravelRow {
    home_location_id: LocationID,
    project_location_id: LocationID,
    headcount: f64,
    cost: f64,
}

/// Represents a row in the bench CSV file
#[derive(Serialize, Deserialize, Debug, PartialEq)]
struct BenchRow {
    home_location_id: LocationID,
    level: SeniorityLevel,
    pool: u32,
    bench: f64,
    limit: f64,
}

impl From<&BenchUsage> for BenchRow {
    fn from(usage: &BenchUsage) -> Self {
        Self {
            home_location_id: usage.home.clone(),
            level: usage.level,
            pool: usage.pool,
            bench: usage.bench,
            limit: usage.limit,
        }
    }
}

/// Represents a row in the duals CSV file
#[derive(Serialize, Deserialize, Debug, PartialEq)]
struct DualRow {
    constraint: String,
    value: f64,
}

/// An object for writing the results of a single run to file
pub struct DataWriter {
    summary_writer: csv::Writer<File>,
    allocations_writer: csv::Writer<File>,
    demand_writer: csv::Writer<File>,
    travel_writer: csv::Writer<File>,
    bench_writer: csv::Writer<File>,
    duals_writer: Option<csv::Writer<File>>,
}

impl DataWriter {
    /// Open CSV files to write output data to
    ///
    /// # Arguments
    ///
    /// * `output_path` - Folder where files will be saved
    /// * `save_debug_info` - Whether to include constraint duals
    pub fn create(output_path: &Path, save_debug_info: bool) -> Result<Self> {
        let new_writer = |file_name| {
            let file_path = output_path.join(file_name);
            csv::Writer::from_path(file_path)
        };

        let duals_writer = if save_debug_info {
            Some(new_writer(DUALS_FILE_NAME)?)
        } else {
            None
        };

        Ok(Self {
            summary_writer: new_writer(SUMMARY_FILE_NAME)?,
            allocations_writer: new_writer(ALLOCATIONS_FILE_NAME)?,
            demand_writer: new_writer(DEMAND_FILE_NAME)?,
            travel_writer: new_writer(TRAVEL_FILE_NAME)?,
            bench_writer: new_writer(BENCH_FILE_NAME)?,
            duals_writer,
        })
    }

    /// Write every output file for a solution
    pub fn write_solution(&mut self, solution: &Solution) -> Result<()> {
        self.write_summary(solution)?;
        self.write_allocations(solution)?;
        self.write_demand(solution)?;
        self.write_travel(solution)?;
        self.write_bench(solution)?;
        self.write_duals(solution)?;

        Ok(())
    }

    /// Write the value of each objective term
    fn write_summary(&mut self, solution: &Solution) -> Result<()> {
        let objective = solution.objective();
        let mut write = |term: String, value: f64| {
            self.summary_writer.serialize(SummaryRow { term, value })
        };

        write("Revenue".into(), objective.revenue().value())?;
        for term in ObjectiveTerm::iter() {
            write(term.to_string(), objective.get(term).value())?;
        }
        write("TotalProfit".into(), objective.total_profit().value())?;

        Ok(())
    }

    /// Write non-zero assignments and outsourcing
    fn write_allocations(&mut self, solution: &Solution) -> Result<()> {
        for allocation in solution.allocations()? {
            self.allocations_writer
                .serialize(AllocationRow::from(&allocation))?;
        }

        Ok(())
    }

    /// Write how demand was met for each project role
    fn write_demand(&mut self, solution: &Solution) -> Result<()> {
        for cell in solution.iter_demand_fulfilment() {
            let row = DemandRow {
                project_id: cell.project,
                level: cell.level,
                demand: cell.demand,
                adjusted_demand: cell.adjusted_demand,
                assigned: cell.assigned,
                outsourced: cell.outsourced,
                unfilled: cell.unfilled,
            };
            self.demand_writer.serialize(row)?;
        }

        Ok(())
    }

    /// Write the headcount travelling between each pair of locations, and what it costs
    fn write_travel(&mut self, solution: &Solution) -> Result<()> {
        let mut totals: IndexMap<(LocationID, LocationID), (f64, f64)> = IndexMap::new();
        for (key, var, quantity) in solution.iter_assignments() {
            if quantity.abs() < ZERO_TOLERANCE
                || !var.arrangement.incurs_travel()
                || key.home == var.project_location
            {
                continue;
            }

            let entry = totals
                .entry((key.home.clone(), var.project_location.clone()))
                .or_default();
            entry.0 += quantity;
            entry.1 += var.travel_cost.value() * quantity;
        }

        for ((home_location_id, project_location_id), (headcount, cost)) in totals {
            self.travel_writer.serialize(TravelRow {
                home_location_id,
                project_location_id,
                headcount,
                cost,
            })?;
        }

        Ok(())
    }

    /// Write the bench headcount of each pool
    fn write_bench(&mut self, solution: &Solution) -> Result<()> {
        for usage in solution.iter_bench() {
            self.bench_writer.serialize(BenchRow::from(&usage))?;
        }

        Ok(())
    }

    /// Write constraint duals, if requested and available
    fn write_duals(&mut self, solution: &Solution) -> Result<()> {
        let Some(writer) = &mut self.duals_writer else {
            return Ok(());
        };
        let Some(duals) = solution.iter_duals() else {
            return Ok(());
        };

        for (id, value) in duals {
            writer.serialize(DualRow {
                constraint: id.to_string(),
                value,
            })?;
        }

        Ok(())
    }

    /// Flush the underlying streams
    pub fn flush(&mut self) -> Result<()> {
        self.summary_writer.flush()?;
        self.allocations_writer.flush()?;
        self.demand_writer.flush()?;
        self.travel_writer.flush()?;
        self.bench_writer.flush()?;
        if let Some(wtr) = &mut self.duals_writer {
            wtr.flush()?;
        }

        Ok(())
    }
}

/// Represents a row in an experiment's main CSV file
#[derive(Serialize, Deserialize, Debug, PartialEq)]
struct SweepRow {
    parameter: String,
    value: f64,
    status: String,
    revenue: Option<f64>,
    salary_cost: Option<f64>,
    travel_cost: Option<f64>,
    unfilled_penalty: Option<f64>,
    outsource_cost: Option<f64>,
    total_profit: Option<f64>,
    message: Option<String>,
}

/// Represents a row in an experiment's duals CSV file
#[derive(Serialize, Deserialize, Debug, PartialEq)]
struct SweepDualRow {
    value: f64,
    constraint: String,
    dual: f64,
}

fn sweep_file_path(output_path: &Path, name: &str, suffix: &str) -> PathBuf {
    output_path.join(format!("sweep_{name}{suffix}.csv"))
}

/// Open a per-point CSV file for an experiment.
///
/// The first column is named after the swept parameter, so the header is written by hand.
fn sweep_point_writer(
    output_path: &Path,
    results: &ExperimentResults,
    suffix: &str,
    columns: &[&str],
) -> Result<csv::Writer<File>> {
    let experiment = &results.experiment;
    let mut writer = csv::WriterBuilder::new()
        .has_headers(false)
        .from_path(sweep_file_path(output_path, &experiment.name, suffix))?;
    let parameter = experiment.parameter.to_string();
    writer.write_record(std::iter::once(parameter.as_str()).chain(columns.iter().copied()))?;

    Ok(writer)
}

/// Write the results of an experiment to CSV files.
///
/// Rows are written in sweep order, then in project and seniority order.
///
/// # Arguments
///
/// * `output_path` - Folder where files will be saved
/// * `results` - The results of the experiment
pub fn write_experiment_results(output_path: &Path, results: &ExperimentResults) -> Result<()> {
    let experiment = &results.experiment;

    let mut writer = csv::Writer::from_path(sweep_file_path(output_path, &experiment.name, ""))?;
    for point in &results.points {
        let objective = point.objective.as_ref();
        let term = |f: fn(&ObjectiveBreakdown) -> f64| objective.map(f);
        writer.serialize(SweepRow {
            parameter: experiment.parameter.to_string(),
            value: point.value,
            status: point.status.to_string(),
            revenue: term(|o| o.revenue().value()),
            salary_cost: term(|o| o.salary_cost.value()),
            travel_cost: term(|o| o.travel_cost.value()),
            unfilled_penalty: term(|o| o.unfilled_penalty.value()),
            outsource_cost: term(|o| o.outsource_cost.value()),
            total_profit: term(|o| o.total_profit().value()),
            message: point.message.clone(),
        })?;
    }
    writer.flush()?;

    let mut writer = sweep_point_writer(
        output_path,
        results,
        "_demand",
        &[
            "Project",
            "Profit",
            "Level",
            "Demand",
            "Assigned",
            "Outsourced",
            "Unfilled",
        ],
    )?;
    for point in &results.points {
        let Some(objective) = &point.objective else {
            continue;
        };
        for cell in &point.demand {
            writer.serialize((
                point.value,
                cell.project,
                objective.total_profit().value(),
                cell.level,
                cell.adjusted_demand,
                cell.assigned,
                cell.outsourced,
                cell.unfilled,
            ))?;
        }
    }
    writer.flush()?;

    let mut writer = sweep_point_writer(
        output_path,
        results,
        "_allocations",
        &[
            "Type",
            "Project",
            "Consultant Role",
            "Home Location",
            "Assigned Role",
            "Allocation Location",
            "Quantity",
            "Daily Rate",
            "Daily Salary",
            "Travel Cost",
            "WFH",
        ],
    )?;
    for point in &results.points {
        for allocation in &point.allocations {
            writer.serialize((
                point.value,
                allocation.kind,
                allocation.project,
                allocation.consultant_level,
                &allocation.home,
                allocation.role_level,
                &allocation.location,
                allocation.quantity,
                allocation.daily_rate.value(),
                allocation.daily_salary.value(),
                allocation.travel_cost.value(),
                allocation.work_from_home,
            ))?;
        }
    }
    writer.flush()?;

    let mut writer = sweep_point_writer(
        output_path,
        results,
        "_bench",
        &["Home Location", "Level", "Pool", "Bench", "Limit"],
    )?;
    for point in &results.points {
        for usage in &point.bench {
            writer.serialize((
                point.value,
                &usage.home,
                usage.level,
                usage.pool,
                usage.bench,
                usage.limit,
            ))?;
        }
    }
    writer.flush()?;

    if experiment.record_duals {
        let mut writer =
            csv::Writer::from_path(sweep_file_path(output_path, &experiment.name, "_duals"))?;
        for point in &results.points {
            for dual in &point.duals {
                writer.serialize(SweepDualRow {
                    value: point.value,
                    constraint: dual.constraint.clone(),
                    dual: dual.value,
                })?;
            }
        }
        writer.flush()?;
    }

    if results.num_failed() > 0 {
        log::warn!(
            "{} of {} points in experiment {} failed to solve",
            results.num_failed(),
            results.points.len(),
            experiment.name
        );
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fixture::{HIGHS, model, scalar_parameters};
    use crate::model::Model;
    use crate::optimisation::AllocationProblem;
    use crate::scenario::SweepParameter;
    use crate::sensitivity::{Experiment, PointStatus, run_experiment};
    use float_cmp::assert_approx_eq;
    use itertools::Itertools;
    use rstest::rstest;
    use tempfile::tempdir;

    fn read_rows<T: serde::de::DeserializeOwned>(file_path: &Path) -> Vec<T> {
        csv::Reader::from_path(file_path)
            .unwrap()
            .into_deserialize()
            .try_collect()
            .unwrap()
    }

    #[test]
    fn test_create_output_directory() {
        let dir = tempdir().unwrap();
        let output_dir = dir.path().join("results");

        // New folder
        assert!(!create_output_directory(&output_dir, false).unwrap());
        assert!(output_dir.is_dir());

        // Existing empty folder
        assert!(!create_output_directory(&output_dir, false).unwrap());

        // Existing non-empty folder
        fs::write(output_dir.join("file.txt"), "contents").unwrap();
        assert!(create_output_directory(&output_dir, false).is_err());
        assert!(create_output_directory(&output_dir, true).unwrap());
        assert!(!output_dir.join("file.txt").exists());
    }

    #[rstest]
    fn test_write_solution(model: Model) {
        let problem = AllocationProblem::build(&model, scalar_parameters(&model))
            .unwrap()
            .relaxed();
        let solution = problem.solve(&HIGHS).unwrap();
        let dir = tempdir().unwrap();
        {
            let mut writer = DataWriter::create(dir.path(), true).unwrap();
            writer.write_solution(&solution).unwrap();
            writer.flush().unwrap();
        }

        // Summary
        let summary: Vec<SummaryRow> = read_rows(&dir.path().join(SUMMARY_FILE_NAME));
        assert_eq!(summary.len(), 8);
        let total = summary.last().unwrap();
        assert_eq!(total.term, "TotalProfit");
        assert_approx_eq!(
            f64,
            total.value,
            solution.objective().total_profit().value()
        );

        // Allocations account for all assigned headcount
        let allocations: Vec<AllocationRow> =
            read_rows(&dir.path().join(ALLOCATIONS_FILE_NAME));
        let assigned: f64 = allocations
            .iter()
            .filter(|row| row.kind == AllocationKind::Assignment)
            .map(|row| row.quantity)
            .sum();
        let expected: f64 = solution.iter_assignments().map(|(_, _, value)| value).sum();
        assert_approx_eq!(f64, assigned, expected, epsilon = 1e-6);

        // One row per demand cell and per pool
        let demand: Vec<DemandRow> = read_rows(&dir.path().join(DEMAND_FILE_NAME));
        assert_eq!(demand.len(), 3);
        let bench: Vec<BenchRow> = read_rows(&dir.path().join(BENCH_FILE_NAME));
        assert_eq!(bench.len(), 10);

        // Travel costs add up to the objective term
        let travel: Vec<TravelRow> = read_rows(&dir.path().join(TRAVEL_FILE_NAME));
        assert!(travel.iter().all(|row| row.home_location_id != row.project_location_id));
        let cost: f64 = travel.iter().map(|row| row.cost).sum();
        assert_approx_eq!(
            f64,
            cost,
            solution.objective().travel_cost.value(),
            epsilon = 1e-6
        );

        // Duals for every constraint of the relaxed problem
        let duals: Vec<DualRow> = read_rows(&dir.path().join(DUALS_FILE_NAME));
        assert_eq!(duals.len(), problem.constraints().len());
    }

    #[test]
    fn test_allocations_header() {
        let dir = tempdir().unwrap();
        let file_path = dir.path().join(ALLOCATIONS_FILE_NAME);
        {
            let mut writer = csv::Writer::from_path(&file_path).unwrap();
            writer
                .serialize(AllocationRow {
                    kind: AllocationKind::Outsource,
                    project_id: ProjectID(1),
                    consultant_level: SeniorityLevel::Consultant,
                    home_location_id: None,
                    role_level: SeniorityLevel::Consultant,
                    allocation_location_id: "London".into(),
                    quantity: 2.0,
                    daily_rate: 400.0,
                    daily_salary: 300.0,
                    travel_cost: 0.0,
                    work_from_home: false,
                })
                .unwrap();
            writer.flush().unwrap();
        }

        let contents = fs::read_to_string(&file_path).unwrap();
        assert_eq!(
            contents.lines().collect_vec(),
            [
                "Type,Project,Consultant Role,Home Location,Assigned Role,Allocation Location,\
                Quantity,Daily Rate,Daily Salary,Travel Cost,WFH",
                "Outsource,1,consultant,,consultant,London,2.0,400.0,300.0,0.0,false"
            ]
        );
    }

    #[rstest]
    fn test_write_experiment_results(model: Model) {
        let experiment = Experiment {
            name: "variability".into(),
            parameter: SweepParameter::DemandVariability,
            start: 0.0,
            end: 0.5,
            step: 0.25,
            fixed: IndexMap::new(),
            record_duals: true,
            relax_integrality: true,
        };
        let results = run_experiment(&model, &experiment, &HIGHS).unwrap();
        let dir = tempdir().unwrap();
        write_experiment_results(dir.path(), &results).unwrap();

        let rows: Vec<SweepRow> = read_rows(&dir.path().join("sweep_variability.csv"));
        assert_equal_values(&rows, &[0.0, 0.25, 0.5]);
        assert!(rows.iter().all(|row| row.status == "optimal"));
        assert!(
            results
                .points
                .iter()
                .all(|point| point.status == PointStatus::Optimal)
        );

        let contents =
            fs::read_to_string(dir.path().join("sweep_variability_demand.csv")).unwrap();
        let mut lines = contents.lines();
        assert_eq!(
            lines.next().unwrap(),
            "DemandVariability,Project,Profit,Level,Demand,Assigned,Outsourced,Unfilled"
        );
        assert_eq!(lines.count(), 3 * 3);

        // Allocations are ordered by value, then project, then role seniority
        let file_path = dir.path().join("sweep_variability_allocations.csv");
        let mut reader = csv::Reader::from_path(file_path).unwrap();
        assert_eq!(
            reader.headers().unwrap().iter().collect_vec(),
            [
                "DemandVariability",
                "Type",
                "Project",
                "Consultant Role",
                "Home Location",
                "Assigned Role",
                "Allocation Location",
                "Quantity",
                "Daily Rate",
                "Daily Salary",
                "Travel Cost",
                "WFH"
            ]
        );
        let keys = reader
            .records()
            .map(|record| {
                let record = record.unwrap();
                let role = SeniorityLevel::iter()
                    .find(|level| level.to_string() == record[5])
                    .unwrap();
                let value: f64 = record[0].parse().unwrap();
                let project: u32 = record[2].parse().unwrap();
                (value, project, role)
            })
            .collect_vec();
        let expected: usize = results.points.iter().map(|point| point.allocations.len()).sum();
        assert_eq!(keys.len(), expected);
        assert!(keys.iter().tuple_windows().all(|(a, b)| a <= b));

        let contents =
            fs::read_to_string(dir.path().join("sweep_variability_bench.csv")).unwrap();
        let mut lines = contents.lines();
        assert_eq!(
            lines.next().unwrap(),
            "DemandVariability,Home Location,Level,Pool,Bench,Limit"
        );
        assert_eq!(lines.count(), 3 * 10);

        let duals: Vec<SweepDualRow> = read_rows(&dir.path().join("sweep_variability_duals.csv"));
        assert_eq!(duals.len(), 3 * results.points[0].duals.len());
    }

    fn assert_equal_values(rows: &[SweepRow], expected: &[f64]) {
        assert_eq!(rows.len(), expected.len());
        for (row, value) in rows.iter().zip(expected) {
            assert_approx_eq!(f64, row.value, *value);
        }
    }
}
