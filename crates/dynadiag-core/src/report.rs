use crate::analysis::{
    ContactAnalysis, EnergyAnalysis, PerformanceAnalysis, TimestepAnalysis, WarningAnalysis,
};
use crate::domain::{
    ComputationOptions, ContactDefinition, ContactTiming, DecompMetrics, EnergySnapshot, Finding,
    InterfaceSurfaceTimestep, MassProperty, ModelSize, MppProcessorTiming, PartDefinition,
    PerformanceTiming, ScalingProjection, Severity, SimulationHeader, StatusInfo,
    TerminationInfo, TimestepEntry,
};
use crate::parser::{ContProfileTables, LoadProfileTables};
use serde::Serialize;
use std::collections::BTreeMap;

/// Everything one analysis run learned about a result directory.
#[derive(Debug, Clone, PartialEq, Default, Serialize)]
pub struct Report {
    pub result_dir: String,
    /// Names of the recognised, non-empty input files.
    pub files_found: Vec<String>,
    /// Auxiliary inputs that could not be read completely.
    pub input_issues: Vec<String>,

    pub header: SimulationHeader,
    pub model_size: ModelSize,
    pub termination: TerminationInfo,
    pub options: ComputationOptions,
    pub keyword_counts: BTreeMap<String, u64>,
    pub parts: Vec<PartDefinition>,
    pub contact_definitions: Vec<ContactDefinition>,
    pub contact_types: BTreeMap<u32, u32>,

    pub energy_snapshots: Vec<EnergySnapshot>,
    pub energy: EnergyAnalysis,
    pub smallest_timesteps: Vec<TimestepEntry>,
    pub timestep: TimestepAnalysis,
    pub warnings: WarningAnalysis,
    pub contact_timing: Vec<ContactTiming>,
    pub contact: ContactAnalysis,
    pub performance_timing: Vec<PerformanceTiming>,
    pub mpp_timing: Vec<MppProcessorTiming>,
    pub performance: PerformanceAnalysis,
    pub scaling_projections: Vec<ScalingProjection>,
    pub decomp_metrics: DecompMetrics,
    pub mass_properties: Vec<MassProperty>,

    pub rank_count: usize,
    pub initial_penetrations: BTreeMap<u32, u64>,
    /// Per-interface warning totals reported by rank 0.
    pub interface_warning_counts: BTreeMap<u32, u64>,
    pub surface_timesteps: Vec<InterfaceSurfaceTimestep>,
    pub contact_dt_limit: Option<f64>,
    pub memory_per_rank: Vec<u64>,

    pub status: Option<StatusInfo>,
    pub load_profile: LoadProfileTables,
    pub contact_profile: ContProfileTables,

    /// Sorted CRITICAL first; equal severities keep their discovery order.
    pub findings: Vec<Finding>,
}

impl Report {
    pub fn count(&self, severity: Severity) -> usize {
        self.findings
            .iter()
            .filter(|finding| finding.severity == severity)
            .count()
    }

    pub fn has_critical(&self) -> bool {
        self.count(Severity::Critical) > 0
    }
}

pub fn render_human_summary(report: &Report) -> String {
    let mut lines = Vec::new();
    lines.push(format!("Result directory: {}", report.result_dir));
    if !report.header.version.is_empty() {
        lines.push(format!(
            "Solver: {} rev {} on {} processor(s)",
            report.header.version,
            report.header.revision,
            report.header.num_procs.max(1)
        ));
    }
    lines.push(format!(
        "Termination: {} at t={:.4E} (target {:.4E}, {} cycles)",
        report.termination.status.as_str(),
        report.termination.actual_time,
        report.termination.target_time,
        report.termination.total_cycles
    ));
    lines.push(format!(
        "Model: {} nodes, {} elements, {} parts, {} contacts",
        report.model_size.num_nodes,
        report.model_size.total_elements(),
        report.model_size.num_parts,
        report.model_size.num_contacts
    ));
    if report.termination.elapsed_seconds > 0.0 {
        lines.push(format!(
            "Elapsed: {:.1}s clock, {:.1}s CPU",
            report.termination.elapsed_seconds, report.termination.total_cpu_seconds
        ));
    }
    lines.push(format!(
        "Findings: {} total ({} critical, {} warning, {} info)",
        report.findings.len(),
        report.count(Severity::Critical),
        report.count(Severity::Warning),
        report.count(Severity::Info)
    ));

    for finding in &report.findings {
        lines.push(format!(
            "[{}] {}: {}",
            finding.severity, finding.category, finding.title
        ));
    }

    for issue in &report.input_issues {
        lines.push(format!("input issue: {issue}"));
    }

    lines.join("\n")
}

#[cfg(test)]
mod tests {
    use super::{Report, render_human_summary};
    use crate::domain::{Finding, FindingCategory, Severity};

    #[test]
    fn summary_lists_counts_and_findings_in_order() {
        let report = Report {
            result_dir: "run-01".to_string(),
            findings: vec![
                Finding::critical(FindingCategory::Termination, "Run did not finish", "", ""),
                Finding::info(FindingCategory::Performance, "MPP load balance: good", "", ""),
            ],
            input_issues: vec!["glstat: read interrupted".to_string()],
            ..Report::default()
        };

        let summary = render_human_summary(&report);
        assert!(report.has_critical());
        assert_eq!(report.count(Severity::Warning), 0);
        assert!(summary.contains("Findings: 2 total (1 critical, 0 warning, 1 info)"));
        let critical = summary
            .find("[CRITICAL] termination: Run did not finish")
            .expect("critical finding should be listed");
        let info = summary
            .find("[INFO] performance: MPP load balance: good")
            .expect("info finding should be listed");
        assert!(critical < info);
        assert!(summary.ends_with("input issue: glstat: read interrupted"));
    }
}
