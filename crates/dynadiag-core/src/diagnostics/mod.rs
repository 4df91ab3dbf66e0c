//! Diagnostics aggregator: merges analyzer findings with the cross-cutting
//! checks and ranks the result.

mod checks;

use crate::config::DiagnosticsThresholds;
use crate::domain::{
    DecompMetrics, EnergySnapshot, Finding, InterfaceSurfaceTimestep, MassProperty,
    PartDefinition, PerformanceTiming, TerminationInfo, TimestepEntry, WarningEntry,
};
use tracing::debug;

/// Records the cross-cutting checks read.
#[derive(Debug, Clone, Copy)]
pub struct DiagnosticInputs<'a> {
    pub termination: &'a TerminationInfo,
    pub contact_dt_limit: Option<f64>,
    pub surface_timesteps: &'a [InterfaceSurfaceTimestep],
    /// Smallest positive timestep of the run, 0.0 when unknown.
    pub min_dt: f64,
    pub parts: &'a [PartDefinition],
    pub mass_properties: &'a [MassProperty],
    pub decomp_metrics: &'a DecompMetrics,
    pub warnings: &'a [WarningEntry],
    pub snapshots: &'a [EnergySnapshot],
    pub performance: &'a [PerformanceTiming],
    pub smallest_timesteps: &'a [TimestepEntry],
}

/// Findings of the per-domain analyzers, in reporting order.
#[derive(Debug, Clone, Default)]
pub struct AnalyzerFindings {
    pub energy: Vec<Finding>,
    pub timestep: Vec<Finding>,
    pub warnings: Vec<Finding>,
    pub contact: Vec<Finding>,
    pub performance: Vec<Finding>,
}

/// Builds the final finding list.
///
/// The termination finding comes first, then the analyzer findings, then the
/// cross-cutting checks. The list is finally sorted by severity rank; the sort
/// is stable, so equal severities keep that order.
pub fn run_diagnostics(
    inputs: &DiagnosticInputs<'_>,
    analyzers: AnalyzerFindings,
    thresholds: &DiagnosticsThresholds,
) -> Vec<Finding> {
    let mut findings: Vec<Finding> = Vec::new();
    findings.extend(checks::termination(inputs.termination, thresholds));
    findings.extend(analyzers.energy);
    findings.extend(analyzers.timestep);
    findings.extend(analyzers.warnings);
    findings.extend(analyzers.contact);
    findings.extend(analyzers.performance);

    findings.extend(checks::contact_timestep(inputs));
    findings.extend(checks::mass_properties(inputs, thresholds));
    findings.extend(checks::decomposition(inputs.decomp_metrics, thresholds));
    findings.extend(checks::timestep_collapse(
        inputs.min_dt,
        inputs.warnings,
        thresholds,
    ));
    findings.extend(checks::energy_instability(inputs, thresholds));
    findings.extend(checks::warning_patterns(
        inputs.warnings,
        inputs.termination,
        thresholds,
    ));
    findings.extend(checks::performance_bottlenecks(inputs, thresholds));
    findings.extend(checks::problematic_parts(inputs, thresholds));

    findings.sort_by_key(|finding| finding.severity.rank());
    debug!(findings = findings.len(), "diagnostics aggregated");
    findings
}
