pub mod errors;
mod records;

pub use errors::{DiagError, DiagErrorCategory, DiagResult, ParserResult};
pub use records::{
    ComputationOptions, ContProfileEntry, ContactDefinition, ContactTiming, DecompMetrics,
    EnergySnapshot, InterfaceSurfaceTimestep, LoadProfileEntry, MassProperty, ModelSize,
    MppProcessorTiming, PartDefinition, PerformanceTiming, ScalingProjection, SimulationHeader,
    StatusInfo, TerminationInfo, TerminationStatus, TimestepEntry, WarningEntry, WarningKind,
};

use serde::Serialize;
use std::fmt::{Display, Formatter};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Severity {
    Critical,
    Warning,
    Info,
}

impl Severity {
    /// Ordering key for the final finding list; lower ranks sort first.
    pub const fn rank(self) -> u8 {
        match self {
            Self::Critical => 0,
            Self::Warning => 1,
            Self::Info => 2,
        }
    }

    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Critical => "CRITICAL",
            Self::Warning => "WARNING",
            Self::Info => "INFO",
        }
    }
}

impl Display for Severity {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.write_str((*self).as_str())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum FindingCategory {
    Termination,
    Energy,
    Timestep,
    Error,
    Warning,
    WarningPattern,
    Contact,
    Performance,
    Decomposition,
    MassProperties,
    PartAnalysis,
}

impl FindingCategory {
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Termination => "termination",
            Self::Energy => "energy",
            Self::Timestep => "timestep",
            Self::Error => "error",
            Self::Warning => "warning",
            Self::WarningPattern => "warning_pattern",
            Self::Contact => "contact",
            Self::Performance => "performance",
            Self::Decomposition => "decomposition",
            Self::MassProperties => "mass_properties",
            Self::PartAnalysis => "part_analysis",
        }
    }
}

impl Display for FindingCategory {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.write_str((*self).as_str())
    }
}

/// One diagnostic statement about the run. Findings are only ever collected,
/// concatenated and sorted; nothing edits them after construction.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Finding {
    pub severity: Severity,
    pub category: FindingCategory,
    pub title: String,
    pub description: String,
    pub recommendation: String,
}

impl Finding {
    pub fn new(
        severity: Severity,
        category: FindingCategory,
        title: impl Into<String>,
        description: impl Into<String>,
        recommendation: impl Into<String>,
    ) -> Self {
        Self {
            severity,
            category,
            title: title.into(),
            description: description.into(),
            recommendation: recommendation.into(),
        }
    }

    pub fn critical(
        category: FindingCategory,
        title: impl Into<String>,
        description: impl Into<String>,
        recommendation: impl Into<String>,
    ) -> Self {
        Self::new(Severity::Critical, category, title, description, recommendation)
    }

    pub fn warning(
        category: FindingCategory,
        title: impl Into<String>,
        description: impl Into<String>,
        recommendation: impl Into<String>,
    ) -> Self {
        Self::new(Severity::Warning, category, title, description, recommendation)
    }

    pub fn info(
        category: FindingCategory,
        title: impl Into<String>,
        description: impl Into<String>,
        recommendation: impl Into<String>,
    ) -> Self {
        Self::new(Severity::Info, category, title, description, recommendation)
    }
}

#[cfg(test)]
mod tests {
    use super::{Finding, FindingCategory, Severity};

    #[test]
    fn severity_ranks_follow_reporting_order() {
        assert!(Severity::Critical.rank() < Severity::Warning.rank());
        assert!(Severity::Warning.rank() < Severity::Info.rank());
        assert_eq!(Severity::Info.rank(), 2);
    }

    #[test]
    fn finding_serializes_with_upper_case_severity_and_snake_case_category() {
        let finding = Finding::warning(
            FindingCategory::WarningPattern,
            "Negative volume accumulated",
            "description",
            "",
        );
        let value = serde_json::to_value(&finding).expect("finding should serialize");
        assert_eq!(value["severity"], "WARNING");
        assert_eq!(value["category"], "warning_pattern");
    }
}
