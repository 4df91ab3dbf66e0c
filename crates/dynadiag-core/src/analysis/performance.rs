//! Timing breakdown, MPP balance and core-count scaling estimates.

use super::percent;
use crate::config::PerformanceThresholds;
use crate::domain::{
    Finding, FindingCategory, LoadProfileEntry, MppProcessorTiming, PerformanceTiming,
    ScalingProjection,
};
use serde::Serialize;

const COMMUNICATION_MARKERS: [&str; 3] = ["sharing", "shr", "share"];
const PARALLEL_MARKERS: [&str; 3] = ["element", "contact", "rigid"];
const SERIAL_MARKERS: [&str; 9] = [
    "keyword",
    "initialization",
    "decomposition",
    "init solver",
    "binary database",
    "ascii database",
    "sense switch",
    "group force",
    "time step size",
];

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum CostClass {
    Parallel,
    Communication,
    Serial,
    Unclassified,
}

fn classify(component: &str) -> CostClass {
    let name = component.to_ascii_lowercase();
    let has_any = |markers: &[&str]| markers.iter().any(|marker| name.contains(marker));
    if has_any(COMMUNICATION_MARKERS.as_slice()) {
        CostClass::Communication
    } else if has_any(PARALLEL_MARKERS.as_slice()) {
        CostClass::Parallel
    } else if has_any(SERIAL_MARKERS.as_slice()) {
        CostClass::Serial
    } else {
        CostClass::Unclassified
    }
}

fn is_sharing_component(component: &str) -> bool {
    let name = component.to_ascii_lowercase();
    name.contains("sharing") || name.contains("shr")
}

#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize)]
pub struct PerformanceAnalysis {
    /// Summed clock percentage of the MPI sharing components.
    pub sharing_percent: f64,
    /// `max - min` of the per-processor CPU ratios.
    pub mpp_imbalance: Option<f64>,
    /// Lowest and highest contact percentage across processors.
    pub contact_profile_range: Option<(f64, f64)>,
}

/// First processor with the lowest and the highest CPU ratio.
fn ratio_extremes(
    timings: &[MppProcessorTiming],
) -> Option<(&MppProcessorTiming, &MppProcessorTiming)> {
    let first = timings.first()?;
    let mut fastest = first;
    let mut slowest = first;
    for timing in &timings[1..] {
        if timing.cpu_ratio < fastest.cpu_ratio {
            fastest = timing;
        }
        if timing.cpu_ratio > slowest.cpu_ratio {
            slowest = timing;
        }
    }
    Some((fastest, slowest))
}

pub fn analyze_performance(
    timings: &[PerformanceTiming],
    mpp_timings: &[MppProcessorTiming],
    load_profile_percent: &[LoadProfileEntry],
    thresholds: &PerformanceThresholds,
) -> (PerformanceAnalysis, Vec<Finding>) {
    let mut analysis = PerformanceAnalysis::default();
    let mut findings = Vec::new();

    for timing in timings
        .iter()
        .filter(|timing| timing.clock_percent > thresholds.component_percent_info)
    {
        findings.push(Finding::info(
            FindingCategory::Performance,
            format!(
                "{} is the primary cost ({:.1}%)",
                timing.component, timing.clock_percent
            ),
            format!(
                "{}: {:.1}s ({:.1}% of clock time). CPU: {:.1}s ({:.1}%).",
                timing.component,
                timing.clock_seconds,
                timing.clock_percent,
                timing.cpu_seconds,
                timing.cpu_percent
            ),
            "",
        ));
    }

    analysis.sharing_percent = timings
        .iter()
        .filter(|timing| is_sharing_component(&timing.component))
        .map(|timing| timing.clock_percent)
        .sum();
    if analysis.sharing_percent > thresholds.sharing_percent_warning {
        findings.push(Finding::warning(
            FindingCategory::Performance,
            format!("High MPI sharing overhead ({:.1}%)", analysis.sharing_percent),
            format!(
                "Sharing components take {:.1}% of clock time; processes spend too long \
                 exchanging data.",
                analysis.sharing_percent
            ),
            "Run on fewer MPI processes or improve the decomposition; sharing overhead grows \
             when the model is split across too many ranks.",
        ));
    }

    if let Some((fastest, slowest)) = ratio_extremes(mpp_timings) {
        let imbalance = slowest.cpu_ratio - fastest.cpu_ratio;
        analysis.mpp_imbalance = Some(imbalance);
        let range = format!(
            "CPU ratio range [{:.4}, {:.4}]",
            fastest.cpu_ratio, slowest.cpu_ratio
        );
        if imbalance > thresholds.load_imbalance_warning {
            findings.push(Finding::warning(
                FindingCategory::Performance,
                format!("MPP load imbalance: {}", percent(imbalance, 1)),
                format!(
                    "{range}. Slowest: proc #{} ({}), fastest: proc #{} ({}).",
                    slowest.processor_id,
                    slowest.hostname,
                    fastest.processor_id,
                    fastest.hostname
                ),
                "Revisit the domain decomposition, for example \
                 *CONTROL_MPP_DECOMPOSITION with RCBLOG.",
            ));
        } else {
            findings.push(Finding::info(
                FindingCategory::Performance,
                format!("MPP load balance: good (imbalance {})", percent(imbalance, 1)),
                format!("{range} across {} processors.", mpp_timings.len()),
                "",
            ));
        }
    }

    let contact_range = load_profile_percent
        .iter()
        .map(|entry| entry.contact)
        .fold(None, |range: Option<(f64, f64)>, value| {
            Some(range.map_or((value, value), |(low, high)| {
                (low.min(value), high.max(value))
            }))
        });
    analysis.contact_profile_range = contact_range;
    if let Some((low, high)) = contact_range
        && high - low > thresholds.contact_profile_spread_percent
    {
        findings.push(Finding::info(
            FindingCategory::Performance,
            "Contact load varies across processors",
            format!("Contact cost ranges from {low:.1}% to {high:.1}% across processors."),
            "Use groupable contact options or adjust the decomposition to spread contact work.",
        ));
    }

    (analysis, findings)
}

/// Estimates elapsed time at `current_cores` and at every target above it.
///
/// Parallel time divides by the core ratio, communication time grows with its
/// square root and serial time stays fixed. Components matching no marker
/// are split evenly between parallel and serial.
pub fn project_scaling(
    timings: &[PerformanceTiming],
    current_cores: usize,
    elapsed_seconds: f64,
    targets: &[usize],
) -> Vec<ScalingProjection> {
    if timings.is_empty() || current_cores < 1 || elapsed_seconds <= 0.0 {
        return Vec::new();
    }

    let (mut parallel, mut communication, mut serial) = (0.0_f64, 0.0_f64, 0.0_f64);
    for timing in timings {
        let seconds = timing.clock_seconds;
        match classify(&timing.component) {
            CostClass::Parallel => parallel += seconds,
            CostClass::Communication => communication += seconds,
            CostClass::Serial => serial += seconds,
            CostClass::Unclassified => {
                parallel += seconds * 0.5;
                serial += seconds * 0.5;
            }
        }
    }

    std::iter::once(current_cores)
        .chain(targets.iter().copied().filter(|&cores| cores > current_cores))
        .map(|target_cores| {
            let ratio = target_cores as f64 / current_cores as f64;
            let scaled_communication = communication * ratio.sqrt();
            let estimated = parallel / ratio + scaled_communication + serial;
            let (speedup, sharing) = if estimated > 0.0 {
                (
                    elapsed_seconds / estimated,
                    scaled_communication / estimated * 100.0,
                )
            } else {
                (0.0, 0.0)
            };
            ScalingProjection {
                target_cores,
                est_elapsed_seconds: estimated,
                est_speedup: speedup,
                est_efficiency: speedup / ratio * 100.0,
                est_sharing_pct: sharing,
            }
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::{CostClass, analyze_performance, classify, project_scaling};
    use crate::config::PerformanceThresholds;
    use crate::domain::{LoadProfileEntry, MppProcessorTiming, PerformanceTiming, Severity};

    fn component(name: &str, clock_seconds: f64, clock_percent: f64) -> PerformanceTiming {
        PerformanceTiming {
            component: name.to_string(),
            clock_seconds,
            clock_percent,
            ..PerformanceTiming::default()
        }
    }

    fn processor(processor_id: usize, cpu_ratio: f64) -> MppProcessorTiming {
        MppProcessorTiming {
            processor_id,
            hostname: format!("node{processor_id}"),
            cpu_ratio,
            cpu_seconds: 0.0,
        }
    }

    #[test]
    fn communication_markers_win_over_parallel_ones() {
        assert_eq!(classify("Element sharing"), CostClass::Communication);
        assert_eq!(classify("Contact algorithm"), CostClass::Parallel);
        assert_eq!(classify("Keyword Processing"), CostClass::Serial);
        assert_eq!(classify("Misc"), CostClass::Unclassified);
    }

    #[test]
    fn scaling_projection_starts_at_current_cores() {
        let timings = vec![
            component("Element processing", 80.0, 80.0),
            component("Force sharing", 10.0, 10.0),
            component("Keyword Processing", 10.0, 10.0),
        ];
        let projections = project_scaling(&timings, 32, 100.0, &[32, 64, 128, 256]);

        let cores: Vec<usize> = projections
            .iter()
            .map(|projection| projection.target_cores)
            .collect();
        assert_eq!(cores, vec![32, 64, 128, 256]);
        assert!((projections[0].est_elapsed_seconds - 100.0).abs() < 1.0e-9);
        assert!((projections[0].est_speedup - 1.0).abs() < 1.0e-9);

        let doubled = &projections[1];
        let expected = 40.0 + 10.0 * 2.0_f64.sqrt() + 10.0;
        assert!((doubled.est_elapsed_seconds - expected).abs() < 1.0e-9);
        assert!((doubled.est_efficiency - 100.0 / expected / 2.0 * 100.0).abs() < 1.0e-9);
    }

    #[test]
    fn scaling_projection_needs_timing_and_elapsed_time() {
        let timings = vec![component("Element processing", 1.0, 1.0)];
        assert!(project_scaling(&[], 4, 10.0, &[32]).is_empty());
        assert!(project_scaling(&timings, 0, 10.0, &[32]).is_empty());
        assert!(project_scaling(&timings, 4, 0.0, &[32]).is_empty());
    }

    #[test]
    fn imbalance_names_slowest_and_fastest_processors() {
        let mpp = vec![processor(0, 0.80), processor(1, 1.00), processor(2, 0.95)];
        let (analysis, findings) =
            analyze_performance(&[], &mpp, &[], &PerformanceThresholds::default());

        let imbalance = analysis.mpp_imbalance.expect("imbalance should be computed");
        assert!((imbalance - 0.20).abs() < 1.0e-12);
        assert_eq!(findings.len(), 1);
        assert_eq!(findings[0].severity, Severity::Warning);
        assert!(findings[0].description.contains("Slowest: proc #1 (node1)"));
        assert!(findings[0].description.contains("fastest: proc #0 (node0)"));
    }

    #[test]
    fn sharing_and_primary_cost_components_are_reported() {
        let timings = vec![
            component("Element processing", 50.0, 50.0),
            component("Force Shr", 15.0, 15.0),
            component("Element sharing", 14.0, 14.0),
        ];
        let profile = vec![
            LoadProfileEntry {
                contact: 5.0,
                ..LoadProfileEntry::default()
            },
            LoadProfileEntry {
                processor_id: 1,
                contact: 20.0,
                ..LoadProfileEntry::default()
            },
        ];
        let (analysis, findings) =
            analyze_performance(&timings, &[], &profile, &PerformanceThresholds::default());

        assert!((analysis.sharing_percent - 29.0).abs() < 1.0e-12);
        assert_eq!(analysis.contact_profile_range, Some((5.0, 20.0)));
        let titles: Vec<&str> = findings.iter().map(|finding| finding.title.as_str()).collect();
        assert_eq!(
            titles,
            vec![
                "Element processing is the primary cost (50.0%)",
                "High MPI sharing overhead (29.0%)",
                "Contact load varies across processors",
            ]
        );
    }
}
