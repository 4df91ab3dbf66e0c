use super::percent;
use crate::config::TimestepThresholds;
use crate::domain::{ComputationOptions, EnergySnapshot, Finding, FindingCategory, TimestepEntry};
use serde::Serialize;
use std::collections::BTreeMap;

#[derive(Debug, Clone, PartialEq, Default, Serialize)]
pub struct TimestepAnalysis {
    /// Part id to the number of smallest-timestep entries it owns.
    pub smallest_part_counts: BTreeMap<u32, u64>,
    /// Part id to the number of energy blocks whose step it controlled; falls
    /// back to `smallest_part_counts` when no block names a part.
    pub controlling_parts: BTreeMap<u32, u64>,
    pub initial_dt: f64,
    pub final_dt: f64,
    /// Smallest positive snapshot timestep, 0.0 when none is known.
    pub min_dt: f64,
    pub options: ComputationOptions,
}

impl TimestepAnalysis {
    /// Part owning the most smallest-timestep entries. Ties keep the lower id.
    pub fn dominant_part(&self) -> Option<(u32, u64)> {
        self.smallest_part_counts
            .iter()
            .fold(None, |best: Option<(u32, u64)>, (&part, &count)| match best {
                Some((_, best_count)) if count <= best_count => best,
                _ => Some((part, count)),
            })
    }

    pub fn smallest_entry_count(&self) -> u64 {
        self.smallest_part_counts.values().sum()
    }
}

fn count_parts(parts: impl Iterator<Item = u32>) -> BTreeMap<u32, u64> {
    let mut counts = BTreeMap::new();
    for part in parts {
        *counts.entry(part).or_default() += 1;
    }
    counts
}

pub fn analyze_timesteps(
    smallest: &[TimestepEntry],
    snapshots: &[EnergySnapshot],
    options: ComputationOptions,
    thresholds: &TimestepThresholds,
) -> (TimestepAnalysis, Vec<Finding>) {
    let smallest_part_counts = count_parts(smallest.iter().map(|entry| entry.part_number));
    let controlling = count_parts(
        snapshots
            .iter()
            .map(|snapshot| snapshot.controlling_part)
            .filter(|&part| part > 0),
    );
    let controlling_parts = if controlling.is_empty() {
        smallest_part_counts.clone()
    } else {
        controlling
    };

    let analysis = TimestepAnalysis {
        smallest_part_counts,
        controlling_parts,
        initial_dt: snapshots.first().map_or(0.0, |snapshot| snapshot.timestep),
        final_dt: snapshots.last().map_or(0.0, |snapshot| snapshot.timestep),
        min_dt: snapshots
            .iter()
            .map(|snapshot| snapshot.timestep)
            .filter(|&dt| dt > 0.0)
            .reduce(f64::min)
            .unwrap_or(0.0),
        options,
    };

    let mut findings = Vec::new();
    if analysis.initial_dt > 0.0 && analysis.min_dt > 0.0 {
        let ratio = analysis.min_dt / analysis.initial_dt;
        let drop = format!(
            "Timestep fell to {} of its initial value ({:.4E} to {:.4E}).",
            percent(ratio, 1),
            analysis.initial_dt,
            analysis.min_dt
        );
        if ratio < thresholds.dt_ratio_critical {
            findings.push(Finding::critical(
                FindingCategory::Timestep,
                "Severe timestep drop detected",
                format!("{drop} Elements are severely distorted."),
                "Inspect the controlling elements for excessive deformation; add erosion \
                 criteria (*MAT_ADD_EROSION) or improve the mesh in that region.",
            ));
        } else if ratio < thresholds.dt_ratio_warning {
            findings.push(Finding::warning(
                FindingCategory::Timestep,
                "Significant timestep drop detected",
                drop,
                "Watch the controlling part for instability and check element quality \
                 around the smallest-timestep elements.",
            ));
        }
    }

    if let Some((part, count)) = analysis.dominant_part() {
        let total = analysis.smallest_entry_count();
        let share = count as f64 / total as f64;
        if share > thresholds.dominant_part_ratio {
            let smallest_dt = smallest
                .iter()
                .map(|entry| entry.timestep)
                .reduce(f64::min)
                .unwrap_or(0.0);
            findings.push(Finding::info(
                FindingCategory::Timestep,
                format!("Part {part} dominates timestep control"),
                format!(
                    "Part {part} owns {count}/{total} of the smallest timesteps ({}). \
                     Smallest dt: {smallest_dt:.4E}.",
                    percent(share, 0)
                ),
                format!(
                    "Review mesh quality in part {part}; coarsening its smallest elements or \
                     mass scaling (DT2MS in *CONTROL_TIMESTEP) would raise the step."
                ),
            ));
        }
    }

    if options.dt2ms != 0.0 {
        findings.push(Finding::info(
            FindingCategory::Timestep,
            "Mass scaling is active",
            format!(
                "DT2MS = {:.4E}. Mass is added to hold the target timestep.",
                options.dt2ms
            ),
            "Confirm the added mass stays small (below about 5% of the model mass) using the \
             mass increase reported in the energy log.",
        ));
    }

    (analysis, findings)
}

#[cfg(test)]
mod tests {
    use super::analyze_timesteps;
    use crate::config::TimestepThresholds;
    use crate::domain::{ComputationOptions, EnergySnapshot, Severity, TimestepEntry};

    fn entries(owner: u32, owned: usize, total: usize) -> Vec<TimestepEntry> {
        (0..total)
            .map(|index| TimestepEntry {
                element_type: "shell".to_string(),
                element_number: index as u64 + 1,
                part_number: if index < owned { owner } else { 100 + index as u32 },
                timestep: 1.0e-7 + index as f64 * 1.0e-10,
                processor_id: None,
            })
            .collect()
    }

    #[test]
    fn part_owning_more_than_eighty_percent_dominates() {
        let (analysis, findings) = analyze_timesteps(
            &entries(7, 85, 100),
            &[],
            ComputationOptions::default(),
            &TimestepThresholds::default(),
        );

        assert_eq!(analysis.dominant_part(), Some((7, 85)));
        assert_eq!(findings.len(), 1);
        assert_eq!(findings[0].severity, Severity::Info);
        assert_eq!(findings[0].title, "Part 7 dominates timestep control");
        assert!(findings[0].description.contains("85/100"));
    }

    #[test]
    fn seventy_nine_percent_is_not_domination() {
        let (_, findings) = analyze_timesteps(
            &entries(7, 79, 100),
            &[],
            ComputationOptions::default(),
            &TimestepThresholds::default(),
        );
        assert!(findings.is_empty());
    }

    #[test]
    fn timestep_drop_and_mass_scaling_are_reported() {
        let snapshots: Vec<EnergySnapshot> = [1.0e-6, 5.0e-7, 5.0e-8]
            .into_iter()
            .map(|timestep| EnergySnapshot {
                timestep,
                controlling_part: 3,
                ..EnergySnapshot::default()
            })
            .collect();
        let options = ComputationOptions {
            dt2ms: -1.0e-6,
            ..ComputationOptions::default()
        };
        let (analysis, findings) =
            analyze_timesteps(&[], &snapshots, options, &TimestepThresholds::default());

        assert_eq!(analysis.min_dt, 5.0e-8);
        assert_eq!(analysis.controlling_parts.get(&3), Some(&3));
        assert_eq!(findings.len(), 2);
        assert_eq!(findings[0].severity, Severity::Critical);
        assert_eq!(findings[1].title, "Mass scaling is active");
    }

    #[test]
    fn controlling_parts_fall_back_to_smallest_table() {
        let (analysis, _) = analyze_timesteps(
            &entries(4, 2, 2),
            &[EnergySnapshot::default()],
            ComputationOptions::default(),
            &TimestepThresholds::default(),
        );
        assert_eq!(analysis.controlling_parts.get(&4), Some(&2));
    }
}
