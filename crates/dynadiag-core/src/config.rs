//! Published diagnostic cutoffs, optionally overridden from a JSON file.
//!
//! Every field carries a default, so a thresholds file only needs to name the
//! values it changes.

use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

#[derive(Debug, Clone, PartialEq, Default, Deserialize, Serialize)]
#[serde(rename_all = "camelCase", default)]
pub struct AnalysisConfig {
    pub energy: EnergyThresholds,
    pub timestep: TimestepThresholds,
    pub contact: ContactThresholds,
    pub performance: PerformanceThresholds,
    pub diagnostics: DiagnosticsThresholds,
    pub scaling_targets: ScalingTargets,
}

#[derive(Debug, Clone, Copy, PartialEq, Deserialize, Serialize)]
#[serde(rename_all = "camelCase", default)]
pub struct EnergyThresholds {
    pub hourglass_critical: f64,
    pub hourglass_warning: f64,
    pub sliding_warning: f64,
    pub ratio_deviation_critical: f64,
    pub ratio_deviation_warning: f64,
    pub growth_critical: f64,
}

impl Default for EnergyThresholds {
    fn default() -> Self {
        Self {
            hourglass_critical: 0.50,
            hourglass_warning: 0.10,
            sliding_warning: 0.05,
            ratio_deviation_critical: 0.10,
            ratio_deviation_warning: 0.05,
            growth_critical: 0.05,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Deserialize, Serialize)]
#[serde(rename_all = "camelCase", default)]
pub struct TimestepThresholds {
    pub dt_ratio_critical: f64,
    pub dt_ratio_warning: f64,
    pub dominant_part_ratio: f64,
}

impl Default for TimestepThresholds {
    fn default() -> Self {
        Self {
            dt_ratio_critical: 0.10,
            dt_ratio_warning: 0.50,
            dominant_part_ratio: 0.80,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Deserialize, Serialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ContactThresholds {
    pub contact_ratio_warning: f64,
    pub contact_ratio_info: f64,
    pub dominant_interface_ratio: f64,
}

impl Default for ContactThresholds {
    fn default() -> Self {
        Self {
            contact_ratio_warning: 0.40,
            contact_ratio_info: 0.20,
            dominant_interface_ratio: 0.50,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Deserialize, Serialize)]
#[serde(rename_all = "camelCase", default)]
pub struct PerformanceThresholds {
    /// Clock share (percent) above which a single component is reported.
    pub component_percent_info: f64,
    pub sharing_percent_warning: f64,
    /// Spread of per-processor CPU ratios, as a fraction.
    pub load_imbalance_warning: f64,
    pub contact_profile_spread_percent: f64,
}

impl Default for PerformanceThresholds {
    fn default() -> Self {
        Self {
            component_percent_info: 25.0,
            sharing_percent_warning: 25.0,
            load_imbalance_warning: 0.15,
            contact_profile_spread_percent: 10.0,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Deserialize, Serialize)]
#[serde(rename_all = "camelCase", default)]
pub struct DiagnosticsThresholds {
    pub completion_fraction: f64,
    pub decomposition_warning: f64,
    pub decomposition_critical: f64,
    pub collapse_dt: f64,
    pub collapse_negative_volume_count: u64,
    pub energy_ratio_warning: f64,
    pub energy_ratio_critical: f64,
    pub warning_cycle_fraction: f64,
    pub negative_volume_total: u64,
    pub untied_node_total: u64,
    pub distant_node_total: u64,
    pub force_gather_warning_percent: f64,
    pub force_gather_critical_percent: f64,
    pub mass_scaling_warning_percent: f64,
    pub contact_algorithm_warning_percent: f64,
    pub contact_algorithm_critical_percent: f64,
    pub problematic_part_share: f64,
    pub rigid_inertia_ratio: f64,
}

impl Default for DiagnosticsThresholds {
    fn default() -> Self {
        Self {
            completion_fraction: 0.99,
            decomposition_warning: 0.30,
            decomposition_critical: 0.50,
            collapse_dt: 1.0e-11,
            collapse_negative_volume_count: 50,
            energy_ratio_warning: 3.0,
            energy_ratio_critical: 4.0,
            warning_cycle_fraction: 0.5,
            negative_volume_total: 100,
            untied_node_total: 1000,
            distant_node_total: 100,
            force_gather_warning_percent: 5.0,
            force_gather_critical_percent: 10.0,
            mass_scaling_warning_percent: 5.0,
            contact_algorithm_warning_percent: 40.0,
            contact_algorithm_critical_percent: 50.0,
            problematic_part_share: 0.50,
            rigid_inertia_ratio: 1000.0,
        }
    }
}

/// Core counts the scaling projection estimates for, besides the current one.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
#[serde(transparent)]
pub struct ScalingTargets(pub Vec<usize>);

impl Default for ScalingTargets {
    fn default() -> Self {
        Self(vec![32, 64, 128, 256])
    }
}

impl ScalingTargets {
    pub fn as_slice(&self) -> &[usize] {
        &self.0
    }
}

#[derive(Debug, thiserror::Error)]
pub enum AnalysisConfigError {
    #[error("failed to read analysis thresholds '{}': {source}", path.display())]
    Read {
        path: PathBuf,
        source: std::io::Error,
    },
    #[error("failed to parse analysis thresholds '{}': {source}", path.display())]
    Parse {
        path: PathBuf,
        source: serde_json::Error,
    },
}

pub fn load_analysis_config(
    config_path: impl AsRef<Path>,
) -> Result<AnalysisConfig, AnalysisConfigError> {
    let config_path = config_path.as_ref();
    let source = fs::read_to_string(config_path).map_err(|source| AnalysisConfigError::Read {
        path: config_path.to_path_buf(),
        source,
    })?;
    serde_json::from_str(&source).map_err(|source| AnalysisConfigError::Parse {
        path: config_path.to_path_buf(),
        source,
    })
}

#[cfg(test)]
mod tests {
    use super::{AnalysisConfig, AnalysisConfigError, load_analysis_config};
    use std::fs;
    use tempfile::TempDir;

    #[test]
    fn partial_thresholds_file_keeps_remaining_defaults() {
        let temp = TempDir::new().expect("tempdir should be created");
        let path = temp.path().join("thresholds.json");
        fs::write(
            &path,
            r#"{"energy":{"hourglassCritical":0.4},"scalingTargets":[16,48]}"#,
        )
        .expect("thresholds should be written");

        let config = load_analysis_config(&path).expect("config should load");
        let defaults = AnalysisConfig::default();

        assert_eq!(config.energy.hourglass_critical, 0.4);
        assert_eq!(config.energy.hourglass_warning, defaults.energy.hourglass_warning);
        assert_eq!(config.scaling_targets.as_slice(), &[16, 48]);
        assert_eq!(config.diagnostics, defaults.diagnostics);
    }

    #[test]
    fn missing_thresholds_file_reports_read_error() {
        let temp = TempDir::new().expect("tempdir should be created");
        let error = load_analysis_config(temp.path().join("absent.json"))
            .expect_err("missing file should fail");
        assert!(matches!(error, AnalysisConfigError::Read { .. }));
        assert!(error.to_string().contains("absent.json"));
    }

    #[test]
    fn malformed_thresholds_file_reports_parse_error() {
        let temp = TempDir::new().expect("tempdir should be created");
        let path = temp.path().join("thresholds.json");
        fs::write(&path, "{ energy: ").expect("thresholds should be written");

        let error = load_analysis_config(&path).expect_err("malformed file should fail");
        assert!(matches!(error, AnalysisConfigError::Parse { .. }));
    }

    #[test]
    fn default_scaling_targets_are_powers_of_two() {
        let config = AnalysisConfig::default();
        assert_eq!(config.scaling_targets.as_slice(), &[32, 64, 128, 256]);
    }
}
