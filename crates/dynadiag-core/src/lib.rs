//! Post-run diagnostics for the ASCII outputs of an explicit finite-element solver.
//!
//! [`run_analysis`] reads a result directory (primary log, energy log, per-rank message
//! logs, status and profile files) and returns a [`Report`] with parsed records,
//! per-domain analyses and a severity-sorted list of findings.

pub mod analysis;
pub mod config;
pub mod diagnostics;
pub mod domain;
pub mod knowledge;
pub mod merge;
pub mod parser;
pub mod pipeline;
pub mod report;

pub use config::{AnalysisConfig, AnalysisConfigError, load_analysis_config};
pub use domain::{DiagError, DiagErrorCategory, DiagResult, Finding, FindingCategory, Severity};
pub use pipeline::{DiscoveredInputs, discover_inputs, run_analysis};
pub use report::{Report, render_human_summary};
