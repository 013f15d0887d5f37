//! Integration tests for the `example run` command.
use blobs::cli::RunOpts;
use blobs::cli::example::handle_example_run_command;
use blobs::settings::Settings;
use tempfile::tempdir;

/// An integration test for the `example run` command.
#[test]
fn test_handle_example_run_command() {
    unsafe { std::env::set_var("BLOBS_LOG_LEVEL", "off") };

    let tempdir = tempdir().unwrap();
    let opts = RunOpts {
        output_dir: Some(tempdir.path().join("grid")),
        ..RunOpts::default()
    };
    handle_example_run_command("grid", &opts, Some(Settings::default())).unwrap();
    assert!(tempdir.path().join("grid/area_regions.csv").is_file());
}
