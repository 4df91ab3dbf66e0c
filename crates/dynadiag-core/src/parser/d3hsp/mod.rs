//! Primary log (`d3hsp`) scanner.
//!
//! One forward pass through the phases
//! `Header → KeywordCounts → ControlInfo → PartDefs → Contacts → Body → Tail`.
//! The current phase is a tagged [`ScanState`]; each variant owns only the
//! buffers it needs, so leaving a phase drops them. Transitions are
//! irrevocable and only move forward.

mod blocks;
mod body;
mod header;
mod phase;
mod tail;

use self::blocks::{
    is_separator_rule, mass_header_part, parse_contact_summary_row, parse_part_block,
    scan_mass_field,
};
use self::body::{BodyState, BodyStep};
use self::header::{scan_control_line, scan_header_line, scan_keyword_count_line};
use self::phase::{Jump, Phase, TerminationBanner, forward_jump};
use self::tail::TailState;
use super::{LineScanner, capture_number, scan_path, static_regex};
use crate::domain::{
    ComputationOptions, ContactDefinition, ContactTiming, DecompMetrics, DiagError, DiagResult,
    EnergySnapshot, MassProperty, ModelSize, MppProcessorTiming, PartDefinition,
    PerformanceTiming, SimulationHeader, TerminationInfo, TerminationStatus, TimestepEntry,
    WarningKind,
};
use regex::Regex;
use serde::Serialize;
use std::collections::{BTreeMap, BTreeSet};
use std::mem;
use std::path::Path;
use std::sync::LazyLock;
use tracing::debug;

static CONTACT_INTERFACE: LazyLock<Regex> =
    LazyLock::new(|| static_regex(r"Contact Interface\s+(\d+)"));
static CONTACT_TYPE: LazyLock<Regex> = LazyLock::new(|| static_regex(r"contact type\.+\s+(\d+)"));

/// Occurrences of one warning or error code in the primary log.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct CodeTally {
    pub count: u64,
    /// Context text captured after the first few occurrences.
    pub message: String,
    /// The same context, one trimmed line per entry.
    pub samples: Vec<String>,
    /// Interfaces named in the captured context.
    pub interfaces: BTreeSet<u32>,
}

/// Everything extracted from the primary log.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct PrimaryLogRecords {
    pub header: SimulationHeader,
    pub model_size: ModelSize,
    pub termination: TerminationInfo,
    pub options: ComputationOptions,
    pub keyword_counts: BTreeMap<String, u64>,
    pub parts: Vec<PartDefinition>,
    pub contact_ids: Vec<u32>,
    pub contact_types: BTreeMap<u32, u32>,
    pub contact_definitions: Vec<ContactDefinition>,
    pub warning_tallies: BTreeMap<u32, CodeTally>,
    pub error_tallies: BTreeMap<u32, CodeTally>,
    pub energy_snapshots: Vec<EnergySnapshot>,
    pub smallest_timesteps: Vec<TimestepEntry>,
    pub performance: Vec<PerformanceTiming>,
    pub contact_timing: Vec<ContactTiming>,
    pub mpp_timing: Vec<MppProcessorTiming>,
    pub decomp_metrics: DecompMetrics,
    pub mass_properties: Vec<MassProperty>,
}

/// Records under construction plus the cross-phase pieces of scanner state.
#[derive(Debug, Default)]
pub(super) struct RecordSink {
    pub(super) records: PrimaryLogRecords,
    open_mass: Option<MassProperty>,
    pub(super) last_error_code: Option<u32>,
}

impl RecordSink {
    pub(super) fn tallies_mut(&mut self, kind: WarningKind) -> &mut BTreeMap<u32, CodeTally> {
        match kind {
            WarningKind::Warning => &mut self.records.warning_tallies,
            WarningKind::Error => &mut self.records.error_tallies,
        }
    }

    pub(super) fn record_termination(&mut self, banner: TerminationBanner) {
        self.records.termination.status = match banner {
            TerminationBanner::Normal => TerminationStatus::Normal,
            TerminationBanner::Error => TerminationStatus::Error,
        };
    }

    /// Handles a mass-property header or field line. Returns `true` when the
    /// line belonged to a mass-property block.
    pub(super) fn scan_mass_line(&mut self, line: &str) -> bool {
        if line.contains("m a s s") && line.contains("p r o p e r t i e s") {
            if let Some(part_id) = mass_header_part(line) {
                self.flush_mass();
                self.open_mass = Some(MassProperty {
                    part_id,
                    ..MassProperty::default()
                });
            }
            return true;
        }
        match self.open_mass.as_mut() {
            Some(mass) => scan_mass_field(line, mass),
            None => false,
        }
    }

    fn flush_mass(&mut self) {
        if let Some(mass) = self.open_mass.take() {
            self.records.mass_properties.push(mass);
        }
    }

    fn into_records(mut self) -> PrimaryLogRecords {
        self.flush_mass();
        let mut records = self.records;
        if records.termination.status == TerminationStatus::Error
            && let Some(code) = self.last_error_code
        {
            records.termination.error_code = Some(code);
            records.termination.error_message = records
                .error_tallies
                .get(&code)
                .map(|tally| tally.message.trim().to_string())
                .filter(|message| !message.is_empty());
        }
        records
    }
}

#[derive(Debug)]
enum ScanState {
    Header,
    KeywordCounts,
    ControlInfo,
    PartDefs { block: Vec<String> },
    Contacts { summary_rows: Option<usize> },
    Body(BodyState),
    Tail(TailState),
}

impl ScanState {
    fn entering(phase: Phase) -> Self {
        match phase {
            Phase::Header => Self::Header,
            Phase::KeywordCounts => Self::KeywordCounts,
            Phase::ControlInfo => Self::ControlInfo,
            Phase::PartDefs => Self::PartDefs { block: Vec::new() },
            Phase::Contacts => Self::Contacts { summary_rows: None },
            Phase::Body => Self::Body(BodyState::default()),
            Phase::Tail => Self::Tail(TailState::default()),
        }
    }

    fn phase(&self) -> Phase {
        match self {
            Self::Header => Phase::Header,
            Self::KeywordCounts => Phase::KeywordCounts,
            Self::ControlInfo => Phase::ControlInfo,
            Self::PartDefs { .. } => Phase::PartDefs,
            Self::Contacts { .. } => Phase::Contacts,
            Self::Body(_) => Phase::Body,
            Self::Tail(_) => Phase::Tail,
        }
    }
}

#[derive(Debug)]
pub struct PrimaryLogScanner {
    sink: RecordSink,
    state: ScanState,
}

impl Default for PrimaryLogScanner {
    fn default() -> Self {
        Self::new()
    }
}

impl PrimaryLogScanner {
    pub fn new() -> Self {
        Self {
            sink: RecordSink::default(),
            state: ScanState::Header,
        }
    }

    fn transition(&mut self, next: ScanState) {
        let from = self.state.phase();
        let to = next.phase();
        match mem::replace(&mut self.state, next) {
            ScanState::PartDefs { block } => flush_part_block(&block, &mut self.sink.records),
            ScanState::Body(body) => body.close(&mut self.sink),
            _ => {}
        }
        debug!(?from, ?to, "primary log phase change");
    }

    fn scan_early_line(&mut self, line: &str) {
        if let Some(jump) = forward_jump(self.state.phase(), line) {
            match jump {
                Jump::Section(phase) => self.transition(ScanState::entering(phase)),
                Jump::Body => {
                    self.transition(ScanState::entering(Phase::Body));
                    self.scan_line(line);
                }
                Jump::Timing => self.transition(ScanState::Tail(TailState::entered_on(line))),
                Jump::Terminated(banner) => {
                    self.sink.record_termination(banner);
                    self.transition(ScanState::entering(Phase::Tail));
                }
            }
            return;
        }

        let records = &mut self.sink.records;
        match &mut self.state {
            ScanState::Header => scan_header_line(line, records),
            ScanState::KeywordCounts => scan_keyword_count_line(line, records),
            ScanState::ControlInfo => scan_control_line(line, records),
            ScanState::PartDefs { block } => {
                if is_separator_rule(line) {
                    flush_part_block(block, records);
                    block.clear();
                } else {
                    block.push(line.to_string());
                }
            }
            ScanState::Contacts { summary_rows } => scan_contact_line(line, summary_rows, records),
            ScanState::Body(_) | ScanState::Tail(_) => {}
        }
    }
}

impl LineScanner for PrimaryLogScanner {
    type Output = PrimaryLogRecords;

    fn scan_line(&mut self, line: &str) {
        match &mut self.state {
            ScanState::Body(body) => {
                if let BodyStep::Tail(tail) = body.scan_line(line, &mut self.sink) {
                    self.transition(ScanState::Tail(tail));
                }
            }
            ScanState::Tail(tail) => tail.scan_line(line, &mut self.sink),
            _ => self.scan_early_line(line),
        }
    }

    fn finish(mut self) -> Self::Output {
        if self.state.phase() != Phase::Tail {
            self.transition(ScanState::entering(Phase::Tail));
        }
        self.sink.into_records()
    }
}

fn flush_part_block(block: &[String], records: &mut PrimaryLogRecords) {
    if let Some(part) = parse_part_block(block) {
        records.parts.push(part);
    }
}

fn scan_contact_line(
    line: &str,
    summary_rows: &mut Option<usize>,
    records: &mut PrimaryLogRecords,
) {
    if line.contains("Contact summary") {
        *summary_rows = Some(0);
        return;
    }
    if let Some(rows) = summary_rows.as_mut() {
        if line.contains("Order #") {
            return;
        }
        if let Some(definition) = parse_contact_summary_row(line) {
            records.contact_definitions.push(definition);
            *rows += 1;
            return;
        }
        if *rows > 0 && is_separator_rule(line) {
            *summary_rows = None;
            return;
        }
    }

    if line.contains("Contact Interface") {
        if let Some(id) = CONTACT_INTERFACE
            .captures(line)
            .and_then(|captures| capture_number::<u32>(&captures, 1))
        {
            records.contact_ids.push(id);
        }
    } else if line.contains("contact type")
        && let Some(&current) = records.contact_ids.last()
        && let Some(type_code) = CONTACT_TYPE
            .captures(line)
            .and_then(|captures| capture_number::<u32>(&captures, 1))
    {
        records.contact_types.insert(current, type_code);
    }
}

/// Parses the primary log at `path`.
///
/// Returns `Ok(None)` when the file does not exist. A file that cannot be
/// opened, or fails mid-read, is an `IoSystemError`.
pub fn parse_primary_log(path: &Path) -> DiagResult<Option<PrimaryLogRecords>> {
    let Some(outcome) = scan_path(path, PrimaryLogScanner::new(), "IO.D3HSP_OPEN")? else {
        return Ok(None);
    };
    if let Some(error) = outcome.interrupted {
        return Err(DiagError::io_system(
            "IO.D3HSP_READ",
            format!(
                "failed to read '{}' after {} lines: {}",
                path.display(),
                outcome.lines,
                error
            ),
        ));
    }

    let records = outcome.output;
    debug!(
        parts = records.parts.len(),
        contacts = records.contact_definitions.len(),
        snapshots = records.energy_snapshots.len(),
        warning_codes = records.warning_tallies.len(),
        error_codes = records.error_tallies.len(),
        status = records.termination.status.as_str(),
        "primary log parsed"
    );
    Ok(Some(records))
}
