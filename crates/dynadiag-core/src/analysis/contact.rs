use super::percent;
use crate::config::ContactThresholds;
use crate::domain::{ContactDefinition, ContactTiming, Finding, FindingCategory};
use serde::Serialize;
use std::borrow::Cow;
use std::collections::BTreeMap;

const CONTACT_TYPE_NAMES: [(u32, &str); 15] = [
    (1, "Sliding Only"),
    (2, "Tied"),
    (3, "Surface to Surface"),
    (4, "Single Surface"),
    (5, "Nodes to Surface"),
    (6, "Nodes Tied to Surface"),
    (7, "Shell Edge Tied to Shell"),
    (8, "Spotweld Nodes to Surface"),
    (9, "Tie-Break"),
    (10, "One-Way Surface to Surface"),
    (13, "Automatic Single Surface"),
    (14, "Eroding Surface to Surface"),
    (15, "Eroding Single Surface"),
    (25, "Automatic Surface to Surface (Offset)"),
    (26, "Automatic Single Surface (Offset)"),
];

pub fn contact_type_name(type_number: u32) -> Cow<'static, str> {
    CONTACT_TYPE_NAMES
        .iter()
        .find(|(number, _)| *number == type_number)
        .map_or_else(
            || Cow::Owned(format!("Type {type_number}")),
            |(_, name)| Cow::Borrowed(*name),
        )
}

#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize)]
pub struct ContactAnalysis {
    pub interface_count: usize,
    pub total_contact_seconds: f64,
    pub total_contact_percent: f64,
    /// Contact share of the run's clock time, as a fraction.
    pub contact_ratio: f64,
    /// Costliest interface and its share of all contact time.
    pub top_interface: Option<(u32, f64)>,
}

impl ContactAnalysis {
    fn measure(timings: &[ContactTiming], total_clock_seconds: f64) -> Self {
        let total_contact_seconds: f64 = timings.iter().map(|timing| timing.clock_seconds).sum();
        let total_contact_percent: f64 = timings.iter().map(|timing| timing.clock_percent).sum();
        let contact_ratio = if total_clock_seconds > 0.0 {
            total_contact_seconds / total_clock_seconds
        } else if total_contact_percent > 0.0 {
            total_contact_percent / 100.0
        } else {
            0.0
        };

        let mut top: Option<&ContactTiming> = None;
        for timing in timings {
            if top.is_none_or(|best| timing.clock_seconds > best.clock_seconds) {
                top = Some(timing);
            }
        }
        let top_interface = top
            .filter(|_| total_contact_seconds > 0.0)
            .map(|timing| (timing.interface_id, timing.clock_seconds / total_contact_seconds));

        Self {
            interface_count: timings.len(),
            total_contact_seconds,
            total_contact_percent,
            contact_ratio,
            top_interface,
        }
    }
}

/// Type number of an interface, from the contact headers or else the summary table.
fn interface_type(
    interface: u32,
    contact_types: &BTreeMap<u32, u32>,
    definitions: &[ContactDefinition],
) -> u32 {
    contact_types.get(&interface).copied().unwrap_or_else(|| {
        definitions
            .iter()
            .find(|definition| definition.contact_id == interface)
            .map_or(0, |definition| definition.type_number)
    })
}

pub fn analyze_contacts(
    timings: &[ContactTiming],
    contact_types: &BTreeMap<u32, u32>,
    definitions: &[ContactDefinition],
    total_clock_seconds: f64,
    thresholds: &ContactThresholds,
) -> (ContactAnalysis, Vec<Finding>) {
    let analysis = ContactAnalysis::measure(timings, total_clock_seconds);
    let mut findings = Vec::new();
    if timings.is_empty() {
        return (analysis, findings);
    }

    let ratio = analysis.contact_ratio;
    if ratio > thresholds.contact_ratio_warning {
        findings.push(Finding::warning(
            FindingCategory::Contact,
            format!("Contact dominates computation time ({})", percent(ratio, 0)),
            format!(
                "Contact takes {:.1}s ({} of total clock time), above the {} threshold.",
                analysis.total_contact_seconds,
                percent(ratio, 1),
                percent(thresholds.contact_ratio_warning, 0)
            ),
            "Use MPP groupable contacts where possible, search less often (NSBCS in \
             *CONTROL_CONTACT) and drop or merge interfaces that are not needed.",
        ));
    } else if ratio > thresholds.contact_ratio_info {
        findings.push(Finding::info(
            FindingCategory::Contact,
            format!("Contact uses {} of total time", percent(ratio, 0)),
            format!(
                "Contact takes {:.1}s ({} of total clock time), typical of contact-heavy models.",
                analysis.total_contact_seconds,
                percent(ratio, 1)
            ),
            "Check the per-interface timings; the costliest interfaces may benefit from \
             bucket sort or segment-based options.",
        ));
    }

    if let Some((interface, share)) = analysis.top_interface
        && share > thresholds.dominant_interface_ratio
    {
        let type_name = contact_type_name(interface_type(interface, contact_types, definitions));
        let seconds = timings
            .iter()
            .find(|timing| timing.interface_id == interface)
            .map_or(0.0, |timing| timing.clock_seconds);
        findings.push(Finding::info(
            FindingCategory::Contact,
            format!("Interface {interface} dominates contact cost"),
            format!(
                "Interface {interface} ({type_name}) takes {seconds:.2}s ({} of contact time) \
                 out of {} timed interfaces.",
                percent(share, 0),
                analysis.interface_count
            ),
            format!(
                "Optimise interface {interface}: try bucket sort options or reduce its \
                 segment count."
            ),
        ));
    }

    (analysis, findings)
}
