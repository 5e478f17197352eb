//! The command line interface for the planner.
use crate::input::load_model;
use crate::log;
use crate::model::Model;
use crate::optimisation::AllocationProblem;
use crate::optimisation::solver::HighsDriver;
use crate::output::metadata::{RunDescription, write_metadata};
use crate::output::{DataWriter, create_output_directory, get_output_dir, write_experiment_results};
use crate::scenario::ScalarParameters;
use crate::sensitivity::{read_experiments, run_experiment, select_experiments};
use crate::settings::Settings;
use ::log::{info, warn};
use anyhow::{Context, Result};
use clap::{Args, CommandFactory, Parser, Subcommand};
use std::path::{Path, PathBuf};

pub mod example;
use example::ExampleSubcommands;
pub mod settings;
use settings::SettingsSubcommands;

/// Plan the allocation of consultants to client projects.
#[derive(Parser)]
#[command(version, about)]
struct Cli {
    /// The available commands.
    #[command(subcommand)]
    command: Option<Commands>,
    /// Flag to provide the CLI docs as markdown
    #[arg(long, hide = true)]
    markdown_help: bool,
}

/// Options for where and how results are written
#[derive(Args, Default)]
pub struct OutputOpts {
    /// Directory for output files
    #[arg(short, long)]
    pub output_dir: Option<PathBuf>,
    /// Whether to overwrite the output directory if it already exists
    #[arg(long)]
    pub overwrite: bool,
}

/// Options for the run command
#[derive(Args, Default)]
pub struct RunOpts {
    /// Output options
    #[command(flatten)]
    pub output: OutputOpts,
    /// Whether to write constraint dual values (continuous models only)
    #[arg(long)]
    pub debug_model: bool,
}

/// Options for the sweep command
#[derive(Args, Default)]
pub struct SweepOpts {
    /// Output options
    #[command(flatten)]
    pub output: OutputOpts,
    /// Name of an experiment to run (may be repeated). All experiments are run if omitted.
    #[arg(short, long = "experiment")]
    pub experiments: Vec<String>,
}

/// The available commands.
#[derive(Subcommand)]
enum Commands {
    /// Solve a model once with its documented parameter values.
    Run {
        /// Path to the model directory.
        model_dir: PathBuf,
        /// Other run options
        #[command(flatten)]
        opts: RunOpts,
    },
    /// Run sensitivity experiments on a model.
    Sweep {
        /// Path to the model directory.
        model_dir: PathBuf,
        /// Other sweep options
        #[command(flatten)]
        opts: SweepOpts,
    },
    /// Manage example models.
    Example {
        /// The available subcommands for managing example models.
        #[command(subcommand)]
        subcommand: ExampleSubcommands,
    },
    /// Validate a model.
    Validate {
        /// The path to the model directory.
        model_dir: PathBuf,
    },
    /// Manage settings file.
    Settings {
        /// The subcommands for managing the settings file.
        #[command(subcommand)]
        subcommand: SettingsSubcommands,
    },
}

impl Commands {
    /// Execute the supplied CLI command
    fn execute(self) -> Result<()> {
        match self {
            Self::Run { model_dir, opts } => handle_run_command(&model_dir, &opts, None),
            Self::Sweep { model_dir, opts } => handle_sweep_command(&model_dir, &opts, None),
            Self::Example { subcommand } => subcommand.execute(),
            Self::Validate { model_dir } => handle_validate_command(&model_dir, None),
            Self::Settings { subcommand } => subcommand.execute(),
        }
    }
}

/// Parse CLI arguments and execute the requested command
pub fn run_cli() -> Result<()> {
    let cli = Cli::parse();

    // Invoked as: `$ staffplan --markdown-help`
    if cli.markdown_help {
        clap_markdown::print_help_markdown::<Cli>();
        return Ok(());
    }

    let Some(command) = cli.command else {
        let help_str = Cli::command().render_long_help().to_string();
        println!("{help_str}");
        return Ok(());
    };

    command.execute()
}

/// Load program settings, if not provided
fn load_settings(settings: Option<Settings>) -> Result<Settings> {
    match settings {
        Some(settings) => Ok(settings),
        None => Settings::load().context("Failed to load settings."),
    }
}

/// Initialise the program logger, unless this has already been done
fn init_logger(settings: &Settings, log_file_path: Option<&Path>) -> Result<()> {
    if log::is_logger_initialised() {
        return Ok(());
    }

    log::init(Some(&settings.log_level), log_file_path).context("Failed to initialise logging.")
}

/// Create the output folder and start logging to it.
///
/// Returns the path to the output folder.
fn prepare_output(
    model_path: &Path,
    opts: &OutputOpts,
    settings: &Settings,
) -> Result<PathBuf> {
    let output_path = match &opts.output_dir {
        Some(path) => path.clone(),
        None => get_output_dir(model_path)?,
    };

    // This setting can be overridden by command-line argument
    let allow_overwrite = opts.overwrite || settings.overwrite;
    let overwrite = create_output_directory(&output_path, allow_overwrite).with_context(|| {
        format!(
            "Failed to create output directory: {}",
            output_path.display()
        )
    })?;

    init_logger(settings, Some(&output_path))?;
    info!("Output folder: {}", output_path.display());

    // NB: We have to wait until the logger is initialised to display this warning
    if overwrite {
        warn!("Output folder was overwritten");
    }

    Ok(output_path)
}

/// Load the model, logging its size
fn load_and_report(model_path: &Path) -> Result<Model> {
    let model = load_model(model_path)?;
    info!(
        "Loaded model from {}: {} projects, {} home locations",
        model_path.display(),
        model.projects.len(),
        model.locations.home.len()
    );

    Ok(model)
}

/// Handle the `run` command.
pub fn handle_run_command(
    model_path: &Path,
    opts: &RunOpts,
    settings: Option<Settings>,
) -> Result<()> {
    let mut settings = load_settings(settings)?;
    if opts.debug_model {
        settings.debug_model = true;
    }

    let output_path = prepare_output(model_path, &opts.output, &settings)?;
    let model = load_and_report(model_path)?;

    let parameters = ScalarParameters::from_model(&model);
    let problem = AllocationProblem::build(&model, parameters)?;
    if settings.debug_model && problem.is_integer() {
        warn!("Dual values are only available for continuous models and will not be written");
    }

    let driver = HighsDriver::new(model.parameters.options.solver_time_limit);
    let solution = problem.solve(&driver)?;
    let objective = solution.objective();
    info!(
        "Revenue: {}, salary cost: {}, travel cost: {}, total profit: {}",
        objective.revenue(),
        objective.salary_cost,
        objective.travel_cost,
        objective.total_profit()
    );

    let save_duals = settings.debug_model && !problem.is_integer();
    let mut writer = DataWriter::create(&output_path, save_duals)?;
    writer.write_solution(&solution)?;
    writer.flush()?;

    write_metadata(
        &output_path,
        RunDescription {
            command: "run",
            model_path,
            parameters: problem.parameters().to_string(),
            experiments: Vec::new(),
        },
    )
    .context("Failed to save metadata.")?;
    info!("Run complete!");

    Ok(())
}

/// Handle the `sweep` command.
pub fn handle_sweep_command(
    model_path: &Path,
    opts: &SweepOpts,
    settings: Option<Settings>,
) -> Result<()> {
    let settings = load_settings(settings)?;
    let output_path = prepare_output(model_path, &opts.output, &settings)?;
    let model = load_and_report(model_path)?;

    let experiments = select_experiments(read_experiments(model_path)?, &opts.experiments)?;
    let driver = HighsDriver::new(model.parameters.options.solver_time_limit);
    for experiment in &experiments {
        let results = run_experiment(&model, experiment, &driver)?;
        write_experiment_results(&output_path, &results).with_context(|| {
            format!("Failed to write results of experiment {}", experiment.name)
        })?;
    }

    write_metadata(
        &output_path,
        RunDescription {
            command: "sweep",
            model_path,
            parameters: ScalarParameters::from_model(&model).to_string(),
            experiments: experiments.iter().map(|exp| exp.name.clone()).collect(),
        },
    )
    .context("Failed to save metadata.")?;
    info!("Sweep complete!");

    Ok(())
}

/// Handle the `validate` command.
pub fn handle_validate_command(model_path: &Path, settings: Option<Settings>) -> Result<()> {
    let settings = load_settings(settings)?;

    // We won't save log files when running the validate command
    init_logger(&settings, None)?;

    // Building the problem checks that every coefficient it needs is present
    let model = load_and_report(model_path)?;
    AllocationProblem::build(&model, ScalarParameters::from_model(&model))?;
    read_experiments(model_path)?;
    info!("Model validation successful!");

    Ok(())
}
