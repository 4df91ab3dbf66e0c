//! Warning and error classification against the code catalogue.

use crate::domain::{Finding, FindingCategory, Severity, WarningEntry, WarningKind};
use crate::knowledge::lookup_code;
use crate::parser::CodeTally;
use serde::Serialize;
use std::collections::BTreeMap;

const LISTED_INTERFACES: usize = 10;
const ROLLUP_CODES: usize = 5;

#[derive(Debug, Clone, PartialEq, Default, Serialize)]
pub struct WarningAnalysis {
    /// Errors by ascending code, then warnings by descending count.
    pub entries: Vec<WarningEntry>,
    pub total_warnings: u64,
    pub total_errors: u64,
}

impl WarningAnalysis {
    pub fn warnings(&self) -> impl Iterator<Item = &WarningEntry> {
        self.entries
            .iter()
            .filter(|entry| entry.kind == WarningKind::Warning)
    }

    pub fn warning_count(&self, code: u32) -> u64 {
        self.warnings()
            .find(|entry| entry.code == code)
            .map_or(0, |entry| entry.count)
    }
}

/// Renders a count with comma thousands separators.
pub(crate) fn grouped(count: u64) -> String {
    let digits = count.to_string();
    let mut out = String::with_capacity(digits.len() + digits.len() / 3);
    for (index, digit) in digits.chars().enumerate() {
        if index > 0 && (digits.len() - index) % 3 == 0 {
            out.push(',');
        }
        out.push(digit);
    }
    out
}

fn build_entry(code: u32, kind: WarningKind, tally: &CodeTally) -> WarningEntry {
    let info = lookup_code(code);
    let message = if tally.message.trim().is_empty() {
        info.description.to_string()
    } else {
        tally.message.trim().to_string()
    };
    WarningEntry {
        code,
        kind,
        count: tally.count,
        severity: match kind {
            WarningKind::Error => Severity::Critical,
            WarningKind::Warning => info.severity,
        },
        message,
        recommendation: info.recommendation.into_owned(),
        affected_interfaces: tally.interfaces.iter().copied().collect(),
        sample_details: tally.samples.clone(),
    }
}

fn interface_list(interfaces: &[u32]) -> String {
    let listed: Vec<String> = interfaces
        .iter()
        .take(LISTED_INTERFACES)
        .map(u32::to_string)
        .collect();
    let more = if interfaces.len() > LISTED_INTERFACES {
        ", ..."
    } else {
        ""
    };
    format!(" Affected interfaces: {}{more}", listed.join(", "))
}

pub fn analyze_warnings(
    warning_tallies: &BTreeMap<u32, CodeTally>,
    error_tallies: &BTreeMap<u32, CodeTally>,
) -> (WarningAnalysis, Vec<Finding>) {
    let mut findings = Vec::new();
    let mut entries = Vec::with_capacity(warning_tallies.len() + error_tallies.len());

    for (&code, tally) in error_tallies {
        let info = lookup_code(code);
        findings.push(Finding::critical(
            FindingCategory::Error,
            format!("Error {code}: {}", info.title),
            format!("{} occurrence(s). {}", tally.count, info.description),
            info.recommendation,
        ));
        entries.push(build_entry(code, WarningKind::Error, tally));
    }

    let mut warnings: Vec<WarningEntry> = warning_tallies
        .iter()
        .map(|(&code, tally)| build_entry(code, WarningKind::Warning, tally))
        .collect();
    warnings.sort_by(|left, right| {
        right
            .count
            .cmp(&left.count)
            .then(left.code.cmp(&right.code))
    });

    let mut rolled_up: Vec<&WarningEntry> = Vec::new();
    for entry in &warnings {
        if entry.severity != Severity::Critical {
            rolled_up.push(entry);
            continue;
        }
        let info = lookup_code(entry.code);
        let interfaces = if entry.affected_interfaces.is_empty() {
            String::new()
        } else {
            interface_list(&entry.affected_interfaces)
        };
        findings.push(Finding::critical(
            FindingCategory::Warning,
            format!(
                "Warning {}: {} ({}x)",
                entry.code,
                info.title,
                grouped(entry.count)
            ),
            format!("{}{interfaces}", info.description),
            info.recommendation,
        ));
    }

    if !rolled_up.is_empty() {
        let total: u64 = rolled_up.iter().map(|entry| entry.count).sum();
        let summary: Vec<String> = rolled_up
            .iter()
            .take(ROLLUP_CODES)
            .map(|entry| format!("{}({}x)", entry.code, grouped(entry.count)))
            .collect();
        let severity = if rolled_up
            .iter()
            .any(|entry| entry.severity == Severity::Warning)
        {
            Severity::Warning
        } else {
            Severity::Info
        };
        findings.push(Finding::new(
            severity,
            FindingCategory::Warning,
            format!(
                "{} warnings detected ({} codes)",
                grouped(total),
                rolled_up.len()
            ),
            format!("Warning codes: {}", summary.join(", ")),
            "Review the individual codes below. Tied-contact warnings usually clear once the \
             meshes on both sides of the interface are made compatible.",
        ));
    }

    let analysis = WarningAnalysis {
        total_warnings: warnings.iter().map(|entry| entry.count).sum(),
        total_errors: error_tallies.values().map(|tally| tally.count).sum(),
        entries: entries.into_iter().chain(warnings).collect(),
    };
    (analysis, findings)
}
