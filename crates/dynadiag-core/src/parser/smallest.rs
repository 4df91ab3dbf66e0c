//! The "100 smallest timesteps" table, shared by the primary log and the
//! per-rank message logs.

use super::{capture_f64, capture_number, capture_str, static_regex};
use crate::domain::TimestepEntry;
use regex::Regex;
use std::sync::LazyLock;

pub(crate) const SMALLEST_TIMESTEPS_BANNER: &str = "100 smallest timesteps";

/// Non-row lines tolerated between the banner and the first row.
const HEADER_LINE_BUDGET: u8 = 4;

static TABLE_ROW: LazyLock<Regex> = LazyLock::new(|| {
    static_regex(r"^(solid|shell|beam|tshell)\s+(\d+)\s+(\d+)\s+([\d.Ee+\-]+)")
});

#[derive(Debug, Clone, PartialEq)]
pub(crate) enum TableLine {
    Row(TimestepEntry),
    /// Blank or header line inside the table.
    Skipped,
    /// The line is not part of the table and must be dispatched again.
    Closed,
}

#[derive(Debug, Clone)]
pub(crate) struct SmallestTimestepTable {
    rows: usize,
    header_budget: u8,
    processor_id: Option<usize>,
}

impl SmallestTimestepTable {
    pub(crate) fn open(processor_id: Option<usize>) -> Self {
        Self {
            rows: 0,
            header_budget: HEADER_LINE_BUDGET,
            processor_id,
        }
    }

    pub(crate) fn feed(&mut self, line: &str) -> TableLine {
        let trimmed = line.trim();
        if trimmed.is_empty() {
            return TableLine::Skipped;
        }
        if let Some(entry) = self.parse_row(trimmed) {
            self.rows += 1;
            return TableLine::Row(entry);
        }
        if self.rows == 0 && self.header_budget > 0 {
            self.header_budget -= 1;
            return TableLine::Skipped;
        }
        TableLine::Closed
    }

    fn parse_row(&self, trimmed: &str) -> Option<TimestepEntry> {
        let captures = TABLE_ROW.captures(trimmed)?;
        Some(TimestepEntry {
            element_type: capture_str(&captures, 1).to_string(),
            element_number: capture_number(&captures, 2)?,
            part_number: capture_number(&captures, 3)?,
            timestep: capture_f64(&captures, 4)?,
            processor_id: self.processor_id,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::{SmallestTimestepTable, TableLine};

    #[test]
    fn header_lines_are_skipped_until_first_row() {
        let mut table = SmallestTimestepTable::open(None);
        assert_eq!(table.feed("  element     number     part    timestep"), TableLine::Skipped);
        assert_eq!(table.feed(""), TableLine::Skipped);

        let TableLine::Row(entry) = table.feed("   shell        1201        7   2.1000E-07") else {
            panic!("expected a table row");
        };
        assert_eq!(entry.element_type, "shell");
        assert_eq!(entry.element_number, 1201);
        assert_eq!(entry.part_number, 7);
        assert_eq!(entry.timestep, 2.1e-7);
        assert_eq!(entry.processor_id, None);

        assert_eq!(table.feed(""), TableLine::Skipped);
        assert_eq!(table.feed(" dt of cycle  1"), TableLine::Closed);
    }

    #[test]
    fn rank_tables_attribute_rows_to_their_processor() {
        let mut table = SmallestTimestepTable::open(Some(3));
        let TableLine::Row(entry) = table.feed("solid 88 2 1.0E-06") else {
            panic!("expected a table row");
        };
        assert_eq!(entry.processor_id, Some(3));
    }

    #[test]
    fn table_without_rows_gives_up_after_header_budget() {
        let mut table = SmallestTimestepTable::open(None);
        for _ in 0..4 {
            assert_eq!(table.feed("header text"), TableLine::Skipped);
        }
        assert_eq!(table.feed("header text"), TableLine::Closed);
    }
}
