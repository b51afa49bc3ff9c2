//! Integration tests driving the copycull binary

use std::fs;
use std::path::Path;
use std::process::Command;

use tempfile::tempdir;

const SOURCE: &str = r#"# copycull workbook

[sheet "Accounting"]
A1: "Team Code"
B1: "Price Per Item"
C1: "Qty"
A2: 7
B2: 12
C2: 2
A3: 3
B3: 15
C3: 1
A4: 7
B4: 4
C4: 5
A5: 7
B5: 30
C5: 1

[sheet "Notes"]
A1: "untouched"
"#;

fn run_copycull(args: &[&str], dir: &Path) -> (String, String, i32) {
    // Tests must not pick up a user's copycull.toml.
    let defaults = dir.join("empty-defaults.toml");
    fs::write(&defaults, "").expect("Failed to write defaults file");
    let output = Command::new(env!("CARGO_BIN_EXE_copycull"))
        .current_dir(dir)
        .arg("--config")
        .arg(&defaults)
        .args(args)
        .env_remove("COPYCULL_LOG")
        .output()
        .expect("Failed to execute copycull");

    let stdout = String::from_utf8_lossy(&output.stdout).to_string();
    let stderr = String::from_utf8_lossy(&output.stderr).to_string();
    let exit_code = output.status.code().unwrap_or(-1);

    (stdout, stderr, exit_code)
}

#[test]
fn test_cull_keeps_matching_rows_and_writes_formulas() {
    let dir = tempdir().unwrap();
    fs::write(dir.path().join("purchases.gwb"), SOURCE).unwrap();

    let (stdout, stderr, code) = run_copycull(
        &[
            "cull",
            "purchases.gwb",
            "--sheet",
            "Accounting",
            "--output",
            "team07.gwb",
            "--where",
            "Team Code=value == 7",
            "--where",
            "Price Per Item=value >= 10",
            "--mode",
            "keep",
            "--formula",
            "D==B{row}*C{row}",
            "--number-format",
            "D=#,##0.00",
            "--rename",
            "07",
        ],
        dir.path(),
    );
    assert_eq!(code, 0, "stderr: {}", stderr);
    assert!(stdout.contains("2 rows removed"));
    assert!(stdout.contains("2 cells written"));

    let copy = fs::read_to_string(dir.path().join("team07.gwb")).unwrap();
    assert!(copy.contains("[sheet \"07\"]"));
    assert!(copy.contains("B2: 12"));
    assert!(copy.contains("B3: 30"));
    assert!(!copy.contains("B4:"));
    assert!(copy.contains("D3 format \"#,##0.00\": =B3*C3"));
    assert!(copy.contains("A1: \"untouched\""));

    assert_eq!(
        fs::read_to_string(dir.path().join("purchases.gwb")).unwrap(),
        SOURCE
    );
}

#[test]
fn test_run_job_file() {
    let dir = tempdir().unwrap();
    fs::write(dir.path().join("purchases.gwb"), SOURCE).unwrap();
    fs::write(
        dir.path().join("jobs.toml"),
        r#"
source = "purchases.gwb"
output_dir = "reports"

[[job]]
output = "cheap.gwb"
sheet = "Accounting"
combinator = "or"
[job.conditions]
"Price Per Item" = "value >= 15"
"Team Code" = "value == 3"
"#,
    )
    .unwrap();

    let (stdout, stderr, code) = run_copycull(&["run", "jobs.toml"], dir.path());
    assert_eq!(code, 0, "stderr: {}", stderr);
    assert!(stdout.contains("2 rows removed"));

    let copy = fs::read_to_string(dir.path().join("reports").join("cheap.gwb")).unwrap();
    assert!(copy.contains("B2: 12"));
    assert!(copy.contains("B3: 4"));
    assert!(!copy.contains("B4:"));
}

#[test]
fn test_unknown_column_fails_without_writing_changes() {
    let dir = tempdir().unwrap();
    fs::write(dir.path().join("purchases.gwb"), SOURCE).unwrap();

    let (_, stderr, code) = run_copycull(
        &[
            "cull",
            "purchases.gwb",
            "--sheet",
            "Accounting",
            "--output",
            "out.gwb",
            "--where",
            "Colour=value == \"red\"",
        ],
        dir.path(),
    );
    assert_ne!(code, 0);
    assert!(stderr.contains("Colour"), "stderr: {}", stderr);
}

#[test]
fn test_missing_config_file_is_reported() {
    let dir = tempdir().unwrap();
    fs::write(dir.path().join("purchases.gwb"), SOURCE).unwrap();

    let output = Command::new(env!("CARGO_BIN_EXE_copycull"))
        .current_dir(dir.path())
        .args(["--config", "missing.toml", "inspect", "purchases.gwb"])
        .env_remove("COPYCULL_LOG")
        .output()
        .expect("Failed to execute copycull");
    let stderr = String::from_utf8_lossy(&output.stderr);
    assert!(!output.status.success());
    assert!(stderr.contains("missing.toml"), "stderr: {}", stderr);
}

#[test]
fn test_inspect_lists_headers() {
    let dir = tempdir().unwrap();
    fs::write(dir.path().join("purchases.gwb"), SOURCE).unwrap();

    let (stdout, _, code) = run_copycull(
        &["inspect", "purchases.gwb", "--sheet", "Accounting"],
        dir.path(),
    );
    assert_eq!(code, 0);
    assert!(stdout.contains("Accounting: 4 data rows"));
    assert!(stdout.contains("  B: Price Per Item"));
    assert!(!stdout.contains("Notes"));
}

#[test]
fn test_import_then_export_csv() {
    let dir = tempdir().unwrap();
    fs::write(dir.path().join("in.csv"), "Name,Code\nAda,007\nBob,42\n").unwrap();

    let (_, stderr, code) = run_copycull(
        &["import-csv", "in.csv", "--output", "book.gwb", "--sheet", "People"],
        dir.path(),
    );
    assert_eq!(code, 0, "stderr: {}", stderr);
    let book = fs::read_to_string(dir.path().join("book.gwb")).unwrap();
    assert!(book.contains("[sheet \"People\"]"));
    assert!(book.contains("B2: \"007\""));
    assert!(book.contains("B3: 42"));

    let (_, stderr, code) = run_copycull(
        &["export-csv", "book.gwb", "--sheet", "People", "--output", "out.csv"],
        dir.path(),
    );
    assert_eq!(code, 0, "stderr: {}", stderr);
    assert_eq!(
        fs::read_to_string(dir.path().join("out.csv")).unwrap(),
        "Name,Code\nAda,007\nBob,42\n"
    );
}
