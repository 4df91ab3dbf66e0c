//! Per-domain analyzers.
//!
//! Each analyzer is a pure function over parsed records and the configured
//! cutoffs. It returns its derived metrics together with the findings they
//! triggered; nothing here reads files or keeps state between calls.

pub mod contact;
pub mod energy;
pub mod performance;
pub mod timestep;
pub mod warnings;

pub use contact::{ContactAnalysis, analyze_contacts, contact_type_name};
pub use energy::{EnergyAnalysis, analyze_energy};
pub use performance::{PerformanceAnalysis, analyze_performance, project_scaling};
pub use timestep::{TimestepAnalysis, analyze_timesteps};
pub use warnings::{WarningAnalysis, analyze_warnings};

/// Formats a fraction as a percentage with `decimals` digits.
pub(crate) fn percent(fraction: f64, decimals: usize) -> String {
    format!("{:.*}%", decimals, fraction * 100.0)
}
