//! CLI integration tests
//!
//! These tests verify the CLI commands work correctly by running the binary.

#![cfg(feature = "cli")]

use std::fs;
use std::path::PathBuf;
use std::process::{Command, Output};

fn ccv_bin() -> PathBuf {
    PathBuf::from(env!("CARGO_BIN_EXE_ccv"))
}

fn fixtures_dir() -> PathBuf {
    let mut path = PathBuf::from(env!("CARGO_MANIFEST_DIR"));
    path.push("tests");
    path.push("fixtures");
    path
}

fn ccv(args: &[&str]) -> Output {
    Command::new(ccv_bin())
        .arg("--schema-dir")
        .arg(fixtures_dir())
        .args(args)
        .output()
        .expect("Failed to execute command")
}

// ============================================================================
// Inspect Command Tests
// ============================================================================

#[test]
fn test_cli_inspect_summary() {
    let output = ccv(&["inspect"]);
    let stdout = String::from_utf8_lossy(&output.stdout);

    assert!(output.status.success(), "inspect should succeed");
    assert!(stdout.contains("Top-level Sections"));
    assert!(stdout.contains("Activities"));
}

#[test]
fn test_cli_inspect_field_json() {
    let output = ccv(&["inspect", "--section", "Courses Taught", "--field", "Course Level", "--json"]);
    assert!(output.status.success(), "{}", String::from_utf8_lossy(&output.stderr));

    let value: serde_json::Value = serde_json::from_slice(&output.stdout).expect("valid JSON");
    assert_eq!(value["id"], "f_c_level");
    assert_eq!(value["table"], "Course Level");
}

#[test]
fn test_cli_inspect_reference_table() {
    let output = ccv(&["inspect", "--table", "Organization"]);
    let stdout = String::from_utf8_lossy(&output.stdout);

    assert!(output.status.success());
    assert!(stdout.contains("Levels: Country > Subdivision > Organization Type"));
    assert!(stdout.contains("Dalhousie University"));
}

#[test]
fn test_cli_inspect_ambiguous_section() {
    let output = ccv(&["inspect", "--section", "Affiliation"]);
    let stderr = String::from_utf8_lossy(&output.stderr);

    assert!(!output.status.success());
    assert!(stderr.contains("ambiguous"));
}

// ============================================================================
// Template Command Tests
// ============================================================================

#[test]
fn test_cli_template() {
    let output = ccv(&["template", "Courses Taught"]);
    let stdout = String::from_utf8_lossy(&output.stdout);

    assert!(output.status.success());
    assert!(stdout.starts_with("_section: Courses Taught\n_category: Teaching Activities\n"));
    assert!(stdout.contains("Course Title:"));
    assert!(stdout.contains("# [Options] Graduate, Undergraduate"));
}

// ============================================================================
// Build and Import Command Tests
// ============================================================================

#[test]
fn test_cli_build_and_import() {
    let dir = tempfile::tempdir().unwrap();
    let records = dir.path().join("courses.yaml");
    let xml = dir.path().join("cv.xml");
    fs::write(
        &records,
        "Course Title: Compilers\nCourse Level: Graduate\nStart Date: 2020/01\n",
    )
    .unwrap();

    let output = ccv(&[
        "build",
        records.to_str().unwrap(),
        "--output",
        xml.to_str().unwrap(),
    ]);
    assert!(output.status.success(), "{}", String::from_utf8_lossy(&output.stderr));

    let document = fs::read_to_string(&xml).unwrap();
    assert!(document.contains("generic-cv:generic-cv"));
    assert!(document.contains(r#"<lov id="00000000000000000000000100000401">Graduate</lov>"#));

    let output = ccv(&["import", xml.to_str().unwrap()]);
    let stdout = String::from_utf8_lossy(&output.stdout);
    assert!(output.status.success(), "{}", String::from_utf8_lossy(&output.stderr));
    assert!(stdout.contains("Courses Taught:"));
    assert!(stdout.contains("- Course Title: Compilers"));
}

#[test]
fn test_cli_build_json_to_stdout() {
    let dir = tempfile::tempdir().unwrap();
    let records = dir.path().join("degree.toml");
    fs::write(&records, "_section = \"Degrees\"\n\"Degree Type\" = \"Doctorate\"\n").unwrap();

    let output = ccv(&["build", records.to_str().unwrap(), "--format", "json"]);
    assert!(output.status.success(), "{}", String::from_utf8_lossy(&output.stderr));

    let value: serde_json::Value = serde_json::from_slice(&output.stdout).expect("valid JSON");
    assert_eq!(value["Education"]["Degrees"][0]["Degree Type"], "Doctorate");
}

#[test]
fn test_cli_missing_schema() {
    let dir = tempfile::tempdir().unwrap();
    let output = Command::new(ccv_bin())
        .args(["--schema-dir", dir.path().to_str().unwrap(), "inspect"])
        .output()
        .expect("Failed to execute command");

    assert!(!output.status.success());
    assert!(String::from_utf8_lossy(&output.stderr).contains("Error"));
}
