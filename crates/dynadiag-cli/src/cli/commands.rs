use super::CliError;
use anyhow::Context;
use clap::ArgAction;
use dynadiag_core::config::{AnalysisConfig, load_analysis_config};
use dynadiag_core::domain::DiagError;
use dynadiag_core::report::{Report, render_human_summary};
use dynadiag_core::run_analysis;
use std::fs;
use std::path::{Path, PathBuf};
use tracing::{debug, info};
use tracing_subscriber::EnvFilter;

#[derive(clap::Args)]
pub(super) struct AnalyzeArgs {
    /// Result directory written by the solver
    #[arg(value_name = "DIR")]
    dir: PathBuf,

    /// JSON file overriding the default analysis thresholds
    #[arg(long, value_name = "FILE")]
    thresholds: Option<PathBuf>,

    /// Write the full report as JSON to this path
    #[arg(long, value_name = "FILE")]
    json: Option<PathBuf>,

    /// Exit with status 1 when any CRITICAL finding is reported
    #[arg(long)]
    fail_on_critical: bool,

    /// Increase log verbosity (-v info, -vv debug)
    #[arg(short, long, action = ArgAction::Count)]
    verbose: u8,
}

pub(super) fn run_analyze_command(args: AnalyzeArgs) -> Result<i32, CliError> {
    init_logging(args.verbose);

    let config = match args.thresholds.as_deref() {
        Some(path) => load_analysis_config(path).map_err(|error| {
            CliError::Analysis(DiagError::input_validation(
                "INPUT.THRESHOLDS",
                error.to_string(),
            ))
        })?,
        None => AnalysisConfig::default(),
    };

    let report = run_analysis(&args.dir, &config).map_err(CliError::Analysis)?;
    println!("{}", render_human_summary(&report));

    if let Some(path) = args.json.as_deref() {
        write_json_report(path, &report)?;
        println!("JSON report: {}", path.display());
    }

    if args.fail_on_critical && report.has_critical() {
        Ok(1)
    } else {
        Ok(0)
    }
}

fn write_json_report(path: &Path, report: &Report) -> Result<(), CliError> {
    if let Some(parent) = path.parent().filter(|parent| !parent.as_os_str().is_empty()) {
        fs::create_dir_all(parent).map_err(|source| {
            CliError::Analysis(DiagError::io_system(
                "IO.JSON_REPORT_DIR",
                format!("failed to create '{}': {}", parent.display(), source),
            ))
        })?;
    }
    let json = serde_json::to_string_pretty(report).context("failed to serialize report")?;
    fs::write(path, json).map_err(|source| {
        CliError::Analysis(DiagError::io_system(
            "IO.JSON_REPORT_WRITE",
            format!("failed to write '{}': {}", path.display(), source),
        ))
    })?;
    info!(path = %path.display(), "JSON report written");
    Ok(())
}

/// `RUST_LOG` wins when set and no `-v` was given.
fn init_logging(verbose: u8) {
    let level = match verbose {
        0 => "warn",
        1 => "info",
        _ => "debug",
    };
    let filter = if verbose == 0 {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level))
    } else {
        EnvFilter::new(level)
    };
    if let Err(error) = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .try_init()
    {
        debug!(%error, "keeping the already installed subscriber");
    }
}
