//! Integration tests for the `sweep` command.
use staffplan::cli::{OutputOpts, SweepOpts, handle_sweep_command};
use staffplan::settings::Settings;
use std::fs;
use std::path::PathBuf;
use tempfile::tempdir;

/// Run named experiments from the remote demo model
#[test]
fn test_handle_sweep_command() {
    unsafe { std::env::set_var("STAFFPLAN_LOG_LEVEL", "off") };

    let tempdir = tempdir().unwrap();
    let opts = SweepOpts {
        output: OutputOpts {
            output_dir: Some(tempdir.path().to_path_buf()),
            overwrite: false,
        },
        experiments: vec!["travel_budget".into()],
    };
    handle_sweep_command(
        &PathBuf::from("demos/remote"),
        &opts,
        Some(Settings::default()),
    )
    .unwrap();

    let output_dir = tempdir.path();
    let sweep = fs::read_to_string(output_dir.join("sweep_travel_budget.csv")).unwrap();
    assert_eq!(sweep.lines().count(), 1 + 5);
    assert!(output_dir.join("sweep_travel_budget_demand.csv").is_file());
    assert!(output_dir.join("sweep_travel_budget_bench.csv").is_file());
    let allocations =
        fs::read_to_string(output_dir.join("sweep_travel_budget_allocations.csv")).unwrap();
    assert!(allocations.starts_with("TotalTravelBudget,Type,Project,Consultant Role,"));
    assert!(allocations.lines().count() > 1);
    assert!(output_dir.join("sweep_travel_budget_duals.csv").is_file());
    assert!(!output_dir.join("sweep_demand_growth.csv").exists());

    let metadata = fs::read_to_string(output_dir.join("metadata.toml")).unwrap();
    assert!(metadata.contains("command = \"sweep\""));
}

/// Unknown experiment names are rejected
#[test]
fn test_handle_sweep_command_unknown_experiment() {
    unsafe { std::env::set_var("STAFFPLAN_LOG_LEVEL", "off") };

    let tempdir = tempdir().unwrap();
    let opts = SweepOpts {
        output: OutputOpts {
            output_dir: Some(tempdir.path().join("results")),
            overwrite: false,
        },
        experiments: vec!["no_such_experiment".into()],
    };
    assert!(
        handle_sweep_command(
            &PathBuf::from("demos/simple"),
            &opts,
            Some(Settings::default())
        )
        .is_err()
    );
}
