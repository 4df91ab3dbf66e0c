use serde_json::Value;
use std::fs;
use std::path::Path;
use std::process::{Command, Output};
use tempfile::TempDir;

fn run_dynadiag(args: &[&str]) -> Output {
    Command::new(env!("CARGO_BIN_EXE_dynadiag"))
        .args(args)
        .env_remove("RUST_LOG")
        .output()
        .expect("dynadiag binary should launch")
}

fn write_file(path: &Path, contents: &str) {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent).expect("parent directory should be created");
    }
    fs::write(path, contents).expect("file should be written");
}

fn stage_result_dir(root: &Path) {
    write_file(&root.join("d3hsp"), PRIMARY_LOG);
    write_file(&root.join("mes0000"), RANK_ZERO_LOG);
}

#[test]
fn analyze_prints_summary_and_writes_json_report() {
    let temp = TempDir::new().expect("tempdir should be created");
    let result_dir = temp.path().join("run");
    stage_result_dir(&result_dir);
    let json_path = temp.path().join("out/report.json");

    let output = run_dynadiag(&[
        "analyze",
        result_dir.to_str().expect("path should be UTF-8"),
        "--json",
        json_path.to_str().expect("path should be UTF-8"),
    ]);

    assert_eq!(output.status.code(), Some(0));
    let stdout = String::from_utf8_lossy(&output.stdout);
    assert!(stdout.contains("Termination: NORMAL"));
    assert!(stdout.contains("Solver: mpp s R13.1.1"));
    assert!(stdout.contains("JSON report:"));

    let report: Value = serde_json::from_str(
        &fs::read_to_string(&json_path).expect("JSON report should exist"),
    )
    .expect("JSON report should parse");
    assert_eq!(report["termination"]["status"], "NORMAL");
    assert_eq!(report["rank_count"], 1);
    assert_eq!(report["initial_penetrations"]["3"], 5);
    assert!(report["findings"].as_array().is_some_and(|findings| !findings.is_empty()));
}

#[test]
fn fail_on_critical_sets_exit_status() {
    let temp = TempDir::new().expect("tempdir should be created");
    write_file(&temp.path().join("mes0000"), RANK_ZERO_LOG);
    let dir = temp.path().to_str().expect("path should be UTF-8");

    let lenient = run_dynadiag(&["analyze", dir]);
    assert_eq!(lenient.status.code(), Some(0));

    let strict = run_dynadiag(&["analyze", dir, "--fail-on-critical"]);
    assert_eq!(strict.status.code(), Some(1));
    let stdout = String::from_utf8_lossy(&strict.stdout);
    assert!(stdout.contains("[CRITICAL] termination: Run did not finish (output incomplete)"));
}

#[test]
fn missing_directory_exits_with_input_validation_code() {
    let temp = TempDir::new().expect("tempdir should be created");
    let missing = temp.path().join("absent");

    let output = run_dynadiag(&["analyze", missing.to_str().expect("path should be UTF-8")]);

    assert_eq!(output.status.code(), Some(2));
    let stderr = String::from_utf8_lossy(&output.stderr);
    assert!(stderr.contains("ERROR: [INPUT.RESULT_DIR]"));
    assert!(stderr.contains("FATAL EXIT CODE: 2"));
}

#[test]
fn thresholds_file_overrides_defaults() {
    let temp = TempDir::new().expect("tempdir should be created");
    let result_dir = temp.path().join("run");
    stage_result_dir(&result_dir);
    let thresholds = temp.path().join("thresholds.json");
    write_file(&thresholds, r#"{ "diagnostics": { "completionFraction": 0.5 } }"#);

    let output = run_dynadiag(&[
        "analyze",
        result_dir.to_str().expect("path should be UTF-8"),
        "--thresholds",
        thresholds.to_str().expect("path should be UTF-8"),
    ]);

    assert_eq!(output.status.code(), Some(0));
    let stdout = String::from_utf8_lossy(&output.stdout);
    assert!(!stdout.contains("Target end time not reached"));
}

#[test]
fn malformed_thresholds_file_is_rejected() {
    let temp = TempDir::new().expect("tempdir should be created");
    let thresholds = temp.path().join("thresholds.json");
    write_file(&thresholds, "{ not json");

    let output = run_dynadiag(&[
        "analyze",
        temp.path().to_str().expect("path should be UTF-8"),
        "--thresholds",
        thresholds.to_str().expect("path should be UTF-8"),
    ]);

    assert_eq!(output.status.code(), Some(2));
    let stderr = String::from_utf8_lossy(&output.stderr);
    assert!(stderr.contains("[INPUT.THRESHOLDS]"));
}

#[test]
fn unwritable_json_path_exits_with_io_code() {
    let temp = TempDir::new().expect("tempdir should be created");
    let result_dir = temp.path().join("run");
    stage_result_dir(&result_dir);
    let blocker = temp.path().join("blocker");
    write_file(&blocker, "not a directory\n");
    let json_path = blocker.join("report.json");

    let output = run_dynadiag(&[
        "analyze",
        result_dir.to_str().expect("path should be UTF-8"),
        "--json",
        json_path.to_str().expect("path should be UTF-8"),
    ]);

    assert_eq!(output.status.code(), Some(3));
    let stderr = String::from_utf8_lossy(&output.stderr);
    assert!(stderr.contains("[IO.JSON_REPORT_DIR]"));
    assert!(stderr.contains("FATAL EXIT CODE: 3"));
}

const PRIMARY_LOG: &str = "\
     |  Version : mpp s R13.1.1                         |
 MPP execution with       2 procs

     c o n t r o l   i n f o r m a t i o n
    number of nodal+scalar points......................       1200
    termination time...................................  1.0000E-02

 dt of cycle        1 is controlled by shell       12 of part        1
 time...........................  0.00000E+00
 kinetic energy.................  1.00000E+02
 total energy...................  1.00000E+02

 dt of cycle      900 is controlled by shell       12 of part        1
 time...........................  6.00000E-03
 kinetic energy.................  9.90000E+01
 total energy...................  1.00000E+02

     N o r m a l    t e r m i n a t i o n

 Problem time       =    6.0000E-03
 Problem cycle      =       900
 Elapsed time        40 seconds for        900 cycles using  2 MPP procs
";

const RANK_ZERO_LOG: &str = "\
 expanding memory to   22000000 d   40000000
      5 initial penetrations were found for interface        3
";
