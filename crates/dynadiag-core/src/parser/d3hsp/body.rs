//! BODY dispatch: warnings and errors, energy blocks, the smallest-timestep
//! table, decomposition metrics and mass properties.
//!
//! Every line passes cheap substring gates before any pattern is evaluated.

use super::RecordSink;
use super::blocks::scan_decomposition_line;
use super::phase::{TIMING_BANNER, termination_banner};
use super::tail::TailState;
use crate::domain::{TerminationStatus, WarningKind};
use crate::parser::energy_fields::{EnergyBlock, parse_cycle_control};
use crate::parser::smallest::{SMALLEST_TIMESTEPS_BANNER, SmallestTimestepTable, TableLine};
use crate::parser::{capture_number, static_regex};
use regex::Regex;
use std::sync::LazyLock;

/// Lines inspected after a warning or error line.
const CONTEXT_WINDOW: u8 = 5;
/// Occurrences of a code whose context text is kept.
const MESSAGE_SAMPLE_OCCURRENCES: u64 = 3;

static WARNING_LINE: LazyLock<Regex> =
    LazyLock::new(|| static_regex(r"^\s*\*\*\*\s+Warning\s+(\d+)"));
static ERROR_LINE: LazyLock<Regex> = LazyLock::new(|| static_regex(r"^\s*\*\*\*\s+Error\s+(\d+)"));
static TIED_INTERFACE: LazyLock<Regex> =
    LazyLock::new(|| static_regex(r"tied interface #\s*=\s*(\d+)"));

pub(super) enum BodyStep {
    Stay,
    Tail(TailState),
}

#[derive(Debug, Clone, Copy)]
struct CodeContext {
    kind: WarningKind,
    code: u32,
    remaining: u8,
}

#[derive(Debug, Default)]
pub(super) struct BodyState {
    energy: Option<EnergyBlock>,
    context: Option<CodeContext>,
    smallest: Option<SmallestTimestepTable>,
}

impl BodyState {
    pub(super) fn scan_line(&mut self, line: &str, sink: &mut RecordSink) -> BodyStep {
        if line.contains(TIMING_BANNER) {
            return BodyStep::Tail(TailState::entered_on(line));
        }
        if let Some(banner) = termination_banner(line) {
            sink.record_termination(banner);
            return BodyStep::Tail(TailState::default());
        }

        if line.contains("***") {
            self.scan_marker_line(line, sink);
            return BodyStep::Stay;
        }
        self.capture_context(line, sink);

        if let Some(block) = self.energy.as_mut() {
            // The first blank line ends the block; an empty block is dropped.
            if line.trim().is_empty() {
                self.flush_energy(sink);
                return BodyStep::Stay;
            }
            if !line.contains("dt of cycle") && block.absorb(line) {
                return BodyStep::Stay;
            }
        }

        if line.contains("dt of cycle")
            && let Some(control) = parse_cycle_control(line)
        {
            self.flush_energy(sink);
            self.smallest = None;
            self.energy = Some(EnergyBlock::open(control));
            return BodyStep::Stay;
        }

        if let Some(table) = self.smallest.as_mut() {
            match table.feed(line) {
                TableLine::Row(entry) => {
                    sink.records.smallest_timesteps.push(entry);
                    return BodyStep::Stay;
                }
                TableLine::Skipped => return BodyStep::Stay,
                TableLine::Closed => self.smallest = None,
            }
        }
        if line.contains(SMALLEST_TIMESTEPS_BANNER) {
            self.smallest = Some(SmallestTimestepTable::open(None));
            return BodyStep::Stay;
        }

        if !scan_decomposition_line(line, &mut sink.records.decomp_metrics) {
            sink.scan_mass_line(line);
        }
        BodyStep::Stay
    }

    /// Emits the open energy block, if any.
    pub(super) fn close(mut self, sink: &mut RecordSink) {
        self.flush_energy(sink);
    }

    fn flush_energy(&mut self, sink: &mut RecordSink) {
        if let Some(snapshot) = self.energy.take().and_then(EnergyBlock::close) {
            sink.records.energy_snapshots.push(snapshot);
        }
    }

    fn scan_marker_line(&mut self, line: &str, sink: &mut RecordSink) {
        let marker = if line.contains("Warning") {
            WARNING_LINE
                .captures(line)
                .and_then(|captures| capture_number::<u32>(&captures, 1))
                .map(|code| (WarningKind::Warning, code))
        } else if line.contains("Error") {
            ERROR_LINE
                .captures(line)
                .and_then(|captures| capture_number::<u32>(&captures, 1))
                .map(|code| (WarningKind::Error, code))
        } else {
            None
        };

        match marker {
            Some((kind, code)) => {
                sink.tallies_mut(kind).entry(code).or_default().count += 1;
                if kind == WarningKind::Error {
                    sink.last_error_code = Some(code);
                }
                self.context = Some(CodeContext {
                    kind,
                    code,
                    remaining: CONTEXT_WINDOW,
                });
            }
            None if line.contains("termination time reached") => {
                sink.records.termination.status = TerminationStatus::Normal;
            }
            None => {}
        }
    }

    /// Feeds a line into the open warning or error context without consuming it.
    fn capture_context(&mut self, line: &str, sink: &mut RecordSink) {
        let Some(context) = self.context.as_mut() else {
            return;
        };
        context.remaining -= 1;
        let CodeContext {
            kind,
            code,
            remaining,
        } = *context;
        if remaining == 0 {
            self.context = None;
        }

        let Some(tally) = sink.tallies_mut(kind).get_mut(&code) else {
            return;
        };
        let text = line.trim();
        if !text.is_empty() && tally.count <= MESSAGE_SAMPLE_OCCURRENCES {
            if !tally.message.is_empty() {
                tally.message.push(' ');
            }
            tally.message.push_str(text);
            tally.samples.push(text.to_string());
        }
        if line.contains("tied interface")
            && let Some(interface) = TIED_INTERFACE
                .captures(line)
                .and_then(|captures| capture_number::<u32>(&captures, 1))
        {
            tally.interfaces.insert(interface);
        }
    }
}
