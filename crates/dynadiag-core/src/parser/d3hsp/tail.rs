//! TAIL: timing tables, per-processor CPU shares and the closing summary.
//! Volume is low here, so every line is offered to every pattern.

use super::RecordSink;
use super::blocks::scan_decomposition_line;
use super::phase::{CPU_TIMING_BANNER, TIMING_BANNER, TOTALS_BANNER, termination_banner};
use crate::domain::{ContactTiming, MppProcessorTiming, PerformanceTiming, TerminationInfo};
use crate::parser::{capture_f64, capture_number, capture_str, static_regex};
use regex::{Captures, Regex};
use std::sync::LazyLock;

static TIMING_ENTRY: LazyLock<Regex> = LazyLock::new(|| {
    static_regex(
        r"^\s{1,2}(\S.*?)\s*\.{2,}\s*([\d.Ee+\-]+)\s+([\d.]+)\s+([\d.Ee+\-]+)\s+([\d.]+)",
    )
});
static INTERFACE_TIMING: LazyLock<Regex> = LazyLock::new(|| {
    static_regex(
        r"^\s+Interf\.\s+ID\s+(\d+)\s+([\d.Ee+\-]+)\s+([\d.]+)\s+([\d.Ee+\-]+)\s+([\d.]+)",
    )
});
static PROCESSOR_SHARE: LazyLock<Regex> =
    LazyLock::new(|| static_regex(r"^#\s+(\d+)\s+(\S+)\s+([\d.]+)\s+([\d.Ee+\-]+)"));

type SummarySetter = fn(&mut TerminationInfo, &Captures<'_>);

/// `(gate, pattern, setter)`; the gate is checked before the pattern runs.
static SUMMARY_FIELDS: LazyLock<Vec<(&'static str, Regex, SummarySetter)>> =
    LazyLock::new(|| {
        let table: [(&'static str, &'static str, SummarySetter); 8] = [
            ("Problem time", r"Problem time\s+=\s+([\d.Ee+\-]+)", |info, captures| {
                info.actual_time = capture_f64(captures, 1).unwrap_or(info.actual_time);
            }),
            ("Problem cycle", r"Problem cycle\s+=\s+(\d+)", |info, captures| {
                info.total_cycles = capture_number(captures, 1).unwrap_or(info.total_cycles);
            }),
            ("Total CPU time", r"Total CPU time\s+=\s+(\d+)\s+seconds", |info, captures| {
                info.total_cpu_seconds =
                    capture_f64(captures, 1).unwrap_or(info.total_cpu_seconds);
            }),
            (
                "CPU time per zone cycle",
                r"CPU time per zone cycle\s*=\s+([\d.]+)\s+nanoseconds",
                |info, captures| {
                    info.cpu_per_zone_cycle_ns =
                        capture_f64(captures, 1).unwrap_or(info.cpu_per_zone_cycle_ns);
                },
            ),
            (
                "Clock time per zone cycle",
                r"Clock time per zone cycle\s*=\s+([\d.]+)\s+nanoseconds",
                |info, captures| {
                    info.clock_per_zone_cycle_ns =
                        capture_f64(captures, 1).unwrap_or(info.clock_per_zone_cycle_ns);
                },
            ),
            (
                "Start time",
                r"Start time\s+(\d{2}/\d{2}/\d{4}\s+\d{2}:\d{2}:\d{2})",
                |info, captures| info.start_datetime = capture_str(captures, 1).to_string(),
            ),
            (
                "End time",
                r"End time\s+(\d{2}/\d{2}/\d{4}\s+\d{2}:\d{2}:\d{2})",
                |info, captures| info.end_datetime = capture_str(captures, 1).to_string(),
            ),
            ("Elapsed time", r"Elapsed time\s+(\d+)\s+seconds", |info, captures| {
                info.elapsed_seconds = capture_f64(captures, 1).unwrap_or(info.elapsed_seconds);
            }),
        ];
        table
            .into_iter()
            .map(|(gate, pattern, setter)| (gate, static_regex(pattern), setter))
            .collect()
    });

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
enum TailSection {
    #[default]
    Summary,
    Timing,
    CpuTiming,
}

#[derive(Debug, Default)]
pub(super) struct TailState {
    section: TailSection,
}

impl TailState {
    /// State for a tail entered on `line`, which may itself open a table.
    pub(super) fn entered_on(line: &str) -> Self {
        let section = if line.contains(CPU_TIMING_BANNER) {
            TailSection::CpuTiming
        } else if line.contains(TIMING_BANNER) {
            TailSection::Timing
        } else {
            TailSection::Summary
        };
        Self { section }
    }

    pub(super) fn scan_line(&mut self, line: &str, sink: &mut RecordSink) {
        match self.section {
            TailSection::Timing => {
                if line.contains(TOTALS_BANNER) && !line.contains("C P U") {
                    self.section = TailSection::Summary;
                } else if let Some(timing) = parse_interface_timing(line) {
                    sink.records.contact_timing.push(timing);
                } else if let Some(timing) = parse_timing_entry(line) {
                    sink.records.performance.push(timing);
                }
                return;
            }
            TailSection::CpuTiming => {
                if line.contains(TOTALS_BANNER) {
                    self.section = TailSection::Summary;
                } else if let Some(share) = parse_processor_share(line.trim()) {
                    sink.records.mpp_timing.push(share);
                }
                return;
            }
            TailSection::Summary => {}
        }

        if line.contains(CPU_TIMING_BANNER) {
            self.section = TailSection::CpuTiming;
            return;
        }
        if line.contains(TIMING_BANNER) {
            self.section = TailSection::Timing;
            return;
        }
        if let Some(banner) = termination_banner(line) {
            sink.record_termination(banner);
            return;
        }
        if sink.scan_mass_line(line)
            || scan_decomposition_line(line, &mut sink.records.decomp_metrics)
        {
            return;
        }
        scan_summary_line(line, &mut sink.records.termination);
    }
}

fn parse_timing_entry(line: &str) -> Option<PerformanceTiming> {
    let captures = TIMING_ENTRY.captures(line)?;
    Some(PerformanceTiming {
        component: capture_str(&captures, 1).trim().to_string(),
        cpu_seconds: capture_f64(&captures, 2)?,
        cpu_percent: capture_f64(&captures, 3)?,
        clock_seconds: capture_f64(&captures, 4)?,
        clock_percent: capture_f64(&captures, 5)?,
    })
}

fn parse_interface_timing(line: &str) -> Option<ContactTiming> {
    if !line.contains("Interf.") {
        return None;
    }
    let captures = INTERFACE_TIMING.captures(line)?;
    Some(ContactTiming {
        interface_id: capture_number(&captures, 1)?,
        cpu_seconds: capture_f64(&captures, 2)?,
        cpu_percent: capture_f64(&captures, 3)?,
        clock_seconds: capture_f64(&captures, 4)?,
        clock_percent: capture_f64(&captures, 5)?,
    })
}

fn parse_processor_share(trimmed: &str) -> Option<MppProcessorTiming> {
    let captures = PROCESSOR_SHARE.captures(trimmed)?;
    Some(MppProcessorTiming {
        processor_id: capture_number(&captures, 1)?,
        hostname: capture_str(&captures, 2).to_string(),
        cpu_ratio: capture_f64(&captures, 3)?,
        cpu_seconds: capture_f64(&captures, 4)?,
    })
}

fn scan_summary_line(line: &str, info: &mut TerminationInfo) {
    for (gate, pattern, setter) in SUMMARY_FIELDS.iter() {
        if !line.contains(gate) {
            continue;
        }
        if let Some(captures) = pattern.captures(line) {
            setter(info, &captures);
        }
        return;
    }
}
