//! Integration tests for the `validate` command.
use staffplan::cli::handle_validate_command;
use staffplan::error::ExitStatus;
use staffplan::settings::Settings;
use std::fs;
use std::path::{Path, PathBuf};
use tempfile::tempdir;

/// Get the path to a demo model.
fn get_model_dir(name: &str) -> PathBuf {
    PathBuf::from("demos").join(name)
}

/// Copy a demo model into a temporary folder so it can be modified
fn copy_model(name: &str, dest: &Path) {
    for entry in fs::read_dir(get_model_dir(name)).unwrap() {
        let path = entry.unwrap().path();
        fs::copy(&path, dest.join(path.file_name().unwrap())).unwrap();
    }
}

/// An integration test for the `validate` command.
#[test]
fn test_handle_validate_command() {
    unsafe { std::env::set_var("STAFFPLAN_LOG_LEVEL", "off") };
    handle_validate_command(&get_model_dir("simple"), Some(Settings::default())).unwrap();
    handle_validate_command(&get_model_dir("remote"), Some(Settings::default())).unwrap();
}

/// A malformed input file is reported as a data-loading error
#[test]
fn test_validate_bad_input() {
    unsafe { std::env::set_var("STAFFPLAN_LOG_LEVEL", "off") };

    let dir = tempdir().unwrap();
    copy_model("simple", dir.path());
    fs::write(
        dir.path().join("pools.csv"),
        "home_location_id,level,headcount\nBerlin,consultant,3\n",
    )
    .unwrap();

    let err = handle_validate_command(dir.path(), Some(Settings::default())).unwrap_err();
    assert_eq!(ExitStatus::from_error(&err), ExitStatus::DataLoadError);
}

/// A missing coefficient is only detected when the problem is built
#[test]
fn test_validate_missing_daily_rate() {
    unsafe { std::env::set_var("STAFFPLAN_LOG_LEVEL", "off") };

    let dir = tempdir().unwrap();
    copy_model("simple", dir.path());
    fs::write(
        dir.path().join("daily_rates.csv"),
        "project_id,level,daily_rate\n1,consultant,650\n",
    )
    .unwrap();

    let err = handle_validate_command(dir.path(), Some(Settings::default())).unwrap_err();
    assert_eq!(ExitStatus::from_error(&err), ExitStatus::DataLoadError);
}
