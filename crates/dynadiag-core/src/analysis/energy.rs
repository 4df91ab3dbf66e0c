use super::percent;
use crate::config::EnergyThresholds;
use crate::domain::{EnergySnapshot, Finding, FindingCategory};
use serde::Serialize;

/// Energy balance metrics over a snapshot sequence.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct EnergyAnalysis {
    pub snapshot_count: usize,
    pub initial_total_energy: f64,
    pub final_total_energy: f64,
    /// Largest hourglass/internal ratio over snapshots with positive internal
    /// energy, and the time it was first reached.
    pub max_hourglass_ratio: f64,
    pub max_hourglass_time: f64,
    pub max_sliding_ratio: f64,
    pub energy_ratio_range: (f64, f64),
    /// Relative change of total energy between the first and last snapshot.
    pub total_energy_growth: Option<f64>,
    /// Smallest positive snapshot timestep.
    pub min_dt: Option<f64>,
}

impl Default for EnergyAnalysis {
    fn default() -> Self {
        Self {
            snapshot_count: 0,
            initial_total_energy: 0.0,
            final_total_energy: 0.0,
            max_hourglass_ratio: 0.0,
            max_hourglass_time: 0.0,
            max_sliding_ratio: 0.0,
            energy_ratio_range: (1.0, 1.0),
            total_energy_growth: None,
            min_dt: None,
        }
    }
}

impl EnergyAnalysis {
    fn measure(snapshots: &[EnergySnapshot]) -> Self {
        let (Some(first), Some(last)) = (snapshots.first(), snapshots.last()) else {
            return Self::default();
        };

        let mut analysis = Self {
            snapshot_count: snapshots.len(),
            initial_total_energy: first.total,
            final_total_energy: last.total,
            energy_ratio_range: (first.energy_ratio, first.energy_ratio),
            ..Self::default()
        };

        for snapshot in snapshots {
            if snapshot.internal > 0.0 {
                let ratio = snapshot.hourglass / snapshot.internal;
                if ratio > analysis.max_hourglass_ratio {
                    analysis.max_hourglass_ratio = ratio;
                    analysis.max_hourglass_time = snapshot.time;
                }
            }
            if snapshot.total > 0.0 {
                let ratio = snapshot.sliding_interface.abs() / snapshot.total.abs();
                analysis.max_sliding_ratio = analysis.max_sliding_ratio.max(ratio);
            }

            let (low, high) = &mut analysis.energy_ratio_range;
            *low = low.min(snapshot.energy_ratio);
            *high = high.max(snapshot.energy_ratio);

            if snapshot.timestep > 0.0 {
                analysis.min_dt = Some(
                    analysis
                        .min_dt
                        .map_or(snapshot.timestep, |current| current.min(snapshot.timestep)),
                );
            }
        }

        if snapshots.len() > 2 && first.total > 0.0 {
            analysis.total_energy_growth = Some((last.total - first.total) / first.total);
        }
        analysis
    }

    fn ratio_deviation(&self) -> f64 {
        let (low, high) = self.energy_ratio_range;
        (low - 1.0).abs().max((high - 1.0).abs())
    }
}

pub fn analyze_energy(
    snapshots: &[EnergySnapshot],
    thresholds: &EnergyThresholds,
) -> (EnergyAnalysis, Vec<Finding>) {
    let analysis = EnergyAnalysis::measure(snapshots);
    let mut findings = Vec::new();
    if analysis.snapshot_count == 0 {
        return (analysis, findings);
    }

    let hourglass = analysis.max_hourglass_ratio;
    let at = format!(
        "Max hourglass/internal energy ratio {} at t = {:.4E}.",
        percent(hourglass, 1),
        analysis.max_hourglass_time
    );
    if hourglass > thresholds.hourglass_critical {
        findings.push(Finding::critical(
            FindingCategory::Energy,
            "Hourglass energy critically high",
            format!("{at} Zero-energy deformation modes dominate the response."),
            "Stiffen hourglass control (IHQ/QH in *CONTROL_HOURGLASS) or move to fully \
             integrated element formulations; look for elements loaded at a single node.",
        ));
    } else if hourglass > thresholds.hourglass_warning {
        findings.push(Finding::warning(
            FindingCategory::Energy,
            format!(
                "Hourglass energy exceeds {} of internal energy",
                percent(thresholds.hourglass_warning, 0)
            ),
            at,
            "Review the hourglass control type and coefficient for the affected parts; \
             fully integrated elements do not hourglass.",
        ));
    }

    if analysis.max_sliding_ratio > thresholds.sliding_warning {
        findings.push(Finding::warning(
            FindingCategory::Energy,
            "High sliding interface energy",
            format!(
                "Max sliding interface/total energy ratio {}. Contact may be unstable or \
                 penetrating.",
                percent(analysis.max_sliding_ratio, 1)
            ),
            "Check contact penetration; raise the penalty scale (SLSFAC) or switch to the \
             soft constraint formulation (SOFT=1).",
        ));
    }

    let (low, high) = analysis.energy_ratio_range;
    let deviation = analysis.ratio_deviation();
    if deviation > thresholds.ratio_deviation_critical {
        findings.push(Finding::critical(
            FindingCategory::Energy,
            "Energy balance severely violated",
            format!(
                "Energy ratio range [{low:.6}, {high:.6}] departs from 1.0 by more than {}.",
                percent(thresholds.ratio_deviation_critical, 0)
            ),
            "Look for growing contact energy, mass scaling effects or misdefined loads; \
             request per-component energy output to locate the source.",
        ));
    } else if deviation > thresholds.ratio_deviation_warning {
        findings.push(Finding::warning(
            FindingCategory::Energy,
            "Energy balance deviation detected",
            format!("Energy ratio range [{low:.6}, {high:.6}]."),
            "Track the individual energy components; small drifts are common in \
             contact-dominated runs.",
        ));
    }

    if let Some(growth) = analysis.total_energy_growth
        && growth > thresholds.growth_critical
    {
        findings.push(Finding::critical(
            FindingCategory::Energy,
            "Total energy is increasing (divergence)",
            format!(
                "Total energy grew from {:.4E} to {:.4E} ({} increase).",
                analysis.initial_total_energy,
                analysis.final_total_energy,
                percent(growth, 1)
            ),
            "Lower the timestep scale factor (TSSFAC), remove initial contact penetrations \
             and verify material data and boundary conditions.",
        ));
    }

    (analysis, findings)
}
