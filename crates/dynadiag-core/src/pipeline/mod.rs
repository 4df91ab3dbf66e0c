//! Orchestrates one analysis run over a result directory.

use crate::analysis::{
    analyze_contacts, analyze_energy, analyze_performance, analyze_timesteps, analyze_warnings,
    project_scaling,
};
use crate::config::AnalysisConfig;
use crate::diagnostics::{AnalyzerFindings, DiagnosticInputs, run_diagnostics};
use crate::domain::{DiagError, DiagResult};
use crate::merge::{backfill_processors, merge_ranks};
use crate::parser::{
    RankMessages, ScanOutcome, parse_cont_profile, parse_glstat, parse_load_profile,
    parse_primary_log, parse_rank_messages, parse_status, rank_from_file_name,
};
use crate::report::Report;
use globset::{Glob, GlobMatcher};
use std::fs;
use std::path::{Path, PathBuf};
use tracing::{debug, info, warn};

const PRIMARY_LOG: &str = "d3hsp";
const ENERGY_LOG: &str = "glstat";
const STATUS_FILE: &str = "status.out";
const LOAD_PROFILE: &str = "load_profile.csv";
const CONTACT_PROFILE: &str = "cont_profile.csv";
const RANK_LOG_PATTERN: &str = "mes[0-9][0-9][0-9][0-9]";
/// Time histories only the presentation layers read; listed, never parsed.
const UNPARSED_OUTPUTS: [&str; 3] = ["nodout", "bndout", "matsum"];

/// Non-empty result files recognised in a directory.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DiscoveredInputs {
    pub primary_log: Option<PathBuf>,
    pub energy_log: Option<PathBuf>,
    pub status: Option<PathBuf>,
    pub load_profile: Option<PathBuf>,
    pub contact_profile: Option<PathBuf>,
    /// Per-rank message logs ordered by rank.
    pub rank_logs: Vec<PathBuf>,
    /// File names of everything above plus the unparsed outputs, sorted.
    pub file_names: Vec<String>,
}

fn rank_log_matcher() -> DiagResult<GlobMatcher> {
    Glob::new(RANK_LOG_PATTERN)
        .map(|glob| glob.compile_matcher())
        .map_err(|error| {
            DiagError::internal(
                "INTERNAL.RANK_LOG_GLOB",
                format!("invalid rank log pattern '{RANK_LOG_PATTERN}': {error}"),
            )
        })
}

fn is_non_empty_file(path: &Path) -> bool {
    fs::metadata(path).is_ok_and(|metadata| metadata.is_file() && metadata.len() > 0)
}

pub fn discover_inputs(result_dir: &Path) -> DiagResult<DiscoveredInputs> {
    let entries = fs::read_dir(result_dir).map_err(|error| {
        DiagError::io_system(
            "IO.RESULT_DIR_LIST",
            format!("failed to list '{}': {}", result_dir.display(), error),
        )
    })?;
    let rank_logs = rank_log_matcher()?;

    let mut discovered = DiscoveredInputs::default();
    let mut ranked_logs: Vec<(usize, PathBuf)> = Vec::new();
    for entry in entries.flatten() {
        let path = entry.path();
        let Some(name) = path.file_name().and_then(|name| name.to_str()).map(str::to_string)
        else {
            continue;
        };
        if !is_non_empty_file(&path) {
            continue;
        }

        let slot = match name.as_str() {
            PRIMARY_LOG => Some(&mut discovered.primary_log),
            ENERGY_LOG => Some(&mut discovered.energy_log),
            STATUS_FILE => Some(&mut discovered.status),
            LOAD_PROFILE => Some(&mut discovered.load_profile),
            CONTACT_PROFILE => Some(&mut discovered.contact_profile),
            _ => None,
        };
        if let Some(slot) = slot {
            *slot = Some(path);
        } else if rank_logs.is_match(&name)
            && let Some(rank) = rank_from_file_name(&name)
        {
            ranked_logs.push((rank, path));
        } else if !UNPARSED_OUTPUTS.contains(&name.as_str()) {
            continue;
        }
        discovered.file_names.push(name);
    }

    ranked_logs.sort();
    discovered.rank_logs = ranked_logs.into_iter().map(|(_, path)| path).collect();
    discovered.file_names.sort();
    Ok(discovered)
}

/// Runs an auxiliary parser. Failures and interrupted reads are logged and
/// recorded in `issues`; whatever was parsed before an interruption is kept.
fn read_auxiliary<T>(
    path: Option<&Path>,
    issues: &mut Vec<String>,
    parse: impl FnOnce(&Path) -> DiagResult<Option<ScanOutcome<T>>>,
) -> Option<T> {
    let path = path?;
    match parse(path) {
        Ok(Some(outcome)) => {
            if let Some(error) = outcome.interrupted.as_ref() {
                warn!(
                    file = %path.display(),
                    lines = outcome.lines,
                    %error,
                    "auxiliary read interrupted"
                );
                issues.push(format!(
                    "{}: read interrupted after {} lines: {}",
                    path.display(),
                    outcome.lines,
                    error
                ));
            }
            Some(outcome.output)
        }
        Ok(None) => None,
        Err(error) => {
            warn!(file = %path.display(), %error, "auxiliary file skipped");
            issues.push(format!("{}: {}", path.display(), error.message()));
            None
        }
    }
}

/// Analyzes the result directory `result_dir`.
///
/// A missing primary log yields a degraded report built from defaults; a
/// primary log that exists but cannot be read is an error. Auxiliary files
/// never fail the run.
pub fn run_analysis(result_dir: &Path, config: &AnalysisConfig) -> DiagResult<Report> {
    if !result_dir.is_dir() {
        return Err(DiagError::input_validation(
            "INPUT.RESULT_DIR",
            format!("result directory '{}' does not exist", result_dir.display()),
        ));
    }

    let inputs = discover_inputs(result_dir)?;
    info!(
        dir = %result_dir.display(),
        files = inputs.file_names.len(),
        ranks = inputs.rank_logs.len(),
        "discovered result files"
    );

    let records = match inputs.primary_log.as_deref() {
        Some(path) => parse_primary_log(path)?.unwrap_or_default(),
        None => {
            warn!(dir = %result_dir.display(), "primary log not found; report will be degraded");
            Default::default()
        }
    };

    let mut input_issues = Vec::new();
    let glstat = read_auxiliary(inputs.energy_log.as_deref(), &mut input_issues, parse_glstat);
    let status = read_auxiliary(inputs.status.as_deref(), &mut input_issues, parse_status);
    let load_profile = read_auxiliary(
        inputs.load_profile.as_deref(),
        &mut input_issues,
        parse_load_profile,
    )
    .unwrap_or_default();
    let contact_profile = read_auxiliary(
        inputs.contact_profile.as_deref(),
        &mut input_issues,
        parse_cont_profile,
    )
    .unwrap_or_default();
    let ranks: Vec<RankMessages> = inputs
        .rank_logs
        .iter()
        .map(|path| {
            read_auxiliary(Some(path.as_path()), &mut input_issues, parse_rank_messages)
                .unwrap_or_else(|| RankMessages {
                    rank: path
                        .file_name()
                        .and_then(|name| name.to_str())
                        .and_then(rank_from_file_name)
                        .unwrap_or(0),
                    ..RankMessages::default()
                })
        })
        .collect();
    info!(issues = input_issues.len(), "auxiliary inputs read");

    let energy_snapshots = match glstat {
        Some(snapshots) if !snapshots.is_empty() => {
            debug!(snapshots = snapshots.len(), "energy sequence taken from energy log");
            snapshots
        }
        _ => records.energy_snapshots.clone(),
    };

    let (energy, energy_findings) = analyze_energy(&energy_snapshots, &config.energy);
    let (timestep, timestep_findings) = analyze_timesteps(
        &records.smallest_timesteps,
        &energy_snapshots,
        records.options,
        &config.timestep,
    );
    let (warnings, warning_findings) =
        analyze_warnings(&records.warning_tallies, &records.error_tallies);
    let (contact, contact_findings) = analyze_contacts(
        &records.contact_timing,
        &records.contact_types,
        &records.contact_definitions,
        records.termination.elapsed_seconds,
        &config.contact,
    );
    let (performance, performance_findings) = analyze_performance(
        &records.performance,
        &records.mpp_timing,
        &load_profile.percent,
        &config.performance,
    );

    let merged = merge_ranks(&ranks);
    let mut smallest_timesteps = records.smallest_timesteps.clone();
    let attributed = backfill_processors(&mut smallest_timesteps, &merged);
    debug!(attributed, "smallest timesteps attributed to ranks");

    let current_cores = records.header.num_procs.max(1);
    let scaling_projections = project_scaling(
        &records.performance,
        current_cores,
        records.termination.elapsed_seconds,
        config.scaling_targets.as_slice(),
    );

    let min_dt = energy.min_dt.unwrap_or_else(|| {
        smallest_timesteps
            .iter()
            .map(|entry| entry.timestep)
            .filter(|&dt| dt > 0.0)
            .reduce(f64::min)
            .unwrap_or(0.0)
    });
    let diagnostic_inputs = DiagnosticInputs {
        termination: &records.termination,
        contact_dt_limit: merged.contact_dt_limit,
        surface_timesteps: &merged.surface_timesteps,
        min_dt,
        parts: &records.parts,
        mass_properties: &records.mass_properties,
        decomp_metrics: &records.decomp_metrics,
        warnings: &warnings.entries,
        snapshots: &energy_snapshots,
        performance: &records.performance,
        smallest_timesteps: &smallest_timesteps,
    };
    let findings = run_diagnostics(
        &diagnostic_inputs,
        AnalyzerFindings {
            energy: energy_findings,
            timestep: timestep_findings,
            warnings: warning_findings,
            contact: contact_findings,
            performance: performance_findings,
        },
        &config.diagnostics,
    );
    info!(findings = findings.len(), "analysis complete");

    Ok(Report {
        result_dir: result_dir.display().to_string(),
        files_found: inputs.file_names,
        input_issues,
        header: records.header,
        model_size: records.model_size,
        termination: records.termination,
        options: records.options,
        keyword_counts: records.keyword_counts,
        parts: records.parts,
        contact_definitions: records.contact_definitions,
        contact_types: records.contact_types,
        energy_snapshots,
        energy,
        smallest_timesteps,
        timestep,
        warnings,
        contact_timing: records.contact_timing,
        contact,
        performance_timing: records.performance,
        mpp_timing: records.mpp_timing,
        performance,
        scaling_projections,
        decomp_metrics: records.decomp_metrics,
        mass_properties: records.mass_properties,
        rank_count: merged.rank_count,
        initial_penetrations: merged.initial_penetrations,
        interface_warning_counts: merged.interface_warning_counts,
        surface_timesteps: merged.surface_timesteps,
        contact_dt_limit: merged.contact_dt_limit,
        memory_per_rank: merged.memory_per_rank,
        status,
        load_profile,
        contact_profile,
        findings,
    })
}
