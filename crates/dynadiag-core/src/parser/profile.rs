//! Per-processor cost tables (`load_profile.csv`, `cont_profile.csv`).
//!
//! Both files hold an absolute table ("Clock (seconds)") followed by a
//! percentage table. Rows carry no processor column; the id is the row index
//! within its table.

use super::{LineScanner, ScanOutcome, parse_numeric_token, scan_path};
use crate::domain::{ContProfileEntry, DiagResult, LoadProfileEntry};
use serde::Serialize;
use std::collections::BTreeMap;
use std::path::Path;

const ABSOLUTE_MARKER: &str = "\"Clock (seconds)\"";
const LOAD_PERCENT_MARKER: &str = "\"Clock and percentage(%)\"";
const CONTACT_PERCENT_MARKER: &str = "\"Clock percentage(%)\"";
const LOAD_PROFILE_COLUMNS: usize = 15;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
enum Table {
    #[default]
    None,
    Absolute,
    Percent,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct LoadProfileTables {
    pub absolute: Vec<LoadProfileEntry>,
    pub percent: Vec<LoadProfileEntry>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct ContProfileTables {
    pub absolute: Vec<ContProfileEntry>,
    pub percent: Vec<ContProfileEntry>,
}

fn csv_value(token: &str) -> f64 {
    parse_numeric_token(token).unwrap_or(0.0)
}

#[derive(Debug, Default)]
pub struct LoadProfileScanner {
    tables: LoadProfileTables,
    table: Table,
    next_processor: usize,
}

impl LoadProfileScanner {
    fn enter(&mut self, table: Table) {
        self.table = table;
        self.next_processor = 0;
    }

    fn row(&self, values: &[&str]) -> LoadProfileEntry {
        let column = |index: usize| csv_value(values[index]);
        LoadProfileEntry {
            processor_id: self.next_processor,
            solids: column(0),
            shells: column(1),
            tshells: column(2),
            beams: column(3),
            sph: column(4),
            e_other: column(5),
            force_shr: column(6),
            tstep_shr: column(7),
            swtch_shr: column(8),
            matrl_shr: column(9),
            elmnt_shr: column(10),
            time_step: column(11),
            contact: column(12),
            rigid_bdy: column(13),
            others: column(14),
        }
    }
}

impl LineScanner for LoadProfileScanner {
    type Output = LoadProfileTables;

    fn scan_line(&mut self, line: &str) {
        let trimmed = line.trim();
        if trimmed.is_empty() {
            if self.table == Table::Absolute && !self.tables.absolute.is_empty() {
                self.enter(Table::None);
            }
            return;
        }
        if trimmed.contains(ABSOLUTE_MARKER) {
            self.enter(Table::Absolute);
            return;
        }
        if trimmed.contains(LOAD_PERCENT_MARKER) {
            self.enter(Table::Percent);
            return;
        }
        if trimmed.starts_with('"') || trimmed.starts_with("Solids") {
            return;
        }

        let values: Vec<&str> = trimmed.split(',').collect();
        if values.len() < LOAD_PROFILE_COLUMNS {
            return;
        }
        let entry = self.row(&values);
        match self.table {
            Table::Absolute => self.tables.absolute.push(entry),
            Table::Percent => self.tables.percent.push(entry),
            Table::None => return,
        }
        self.next_processor += 1;
    }

    fn finish(self) -> Self::Output {
        self.tables
    }
}

#[derive(Debug, Default)]
pub struct ContProfileScanner {
    tables: ContProfileTables,
    table: Table,
    next_processor: usize,
    interface_ids: Vec<u32>,
}

impl ContProfileScanner {
    fn enter(&mut self, table: Table) {
        self.table = table;
        self.next_processor = 0;
    }
}

impl LineScanner for ContProfileScanner {
    type Output = ContProfileTables;

    fn scan_line(&mut self, line: &str) {
        let trimmed = line.trim();
        if trimmed.is_empty() {
            if self.table == Table::Absolute && !self.tables.absolute.is_empty() {
                self.enter(Table::None);
                self.interface_ids.clear();
            }
            return;
        }
        if trimmed.contains(ABSOLUTE_MARKER) {
            self.enter(Table::Absolute);
            return;
        }
        if trimmed.contains(CONTACT_PERCENT_MARKER) {
            self.enter(Table::Percent);
            return;
        }
        if trimmed.starts_with('"') || self.table == Table::None {
            return;
        }

        // The first data line of a table names the interfaces of its columns.
        if self.interface_ids.is_empty() {
            let ids: Option<Vec<u32>> = trimmed
                .split(',')
                .map(str::trim)
                .filter(|token| !token.is_empty())
                .map(|token| token.parse().ok())
                .collect();
            if let Some(ids) = ids {
                self.interface_ids = ids;
            }
            return;
        }

        let values: Vec<&str> = trimmed.split(',').collect();
        let interface_timings: BTreeMap<u32, f64> = self
            .interface_ids
            .iter()
            .zip(values)
            .map(|(&interface, token)| (interface, csv_value(token)))
            .collect();
        let entry = ContProfileEntry {
            processor_id: self.next_processor,
            interface_timings,
        };
        match self.table {
            Table::Absolute => self.tables.absolute.push(entry),
            Table::Percent => self.tables.percent.push(entry),
            Table::None => return,
        }
        self.next_processor += 1;
    }

    fn finish(self) -> Self::Output {
        self.tables
    }
}

/// Parses `load_profile.csv`; `Ok(None)` when the file is absent.
pub fn parse_load_profile(path: &Path) -> DiagResult<Option<ScanOutcome<LoadProfileTables>>> {
    scan_path(path, LoadProfileScanner::default(), "IO.LOAD_PROFILE_OPEN")
}

/// Parses `cont_profile.csv`; `Ok(None)` when the file is absent.
pub fn parse_cont_profile(path: &Path) -> DiagResult<Option<ScanOutcome<ContProfileTables>>> {
    scan_path(path, ContProfileScanner::default(), "IO.CONT_PROFILE_OPEN")
}

#[cfg(test)]
mod tests {
    use super::{ContProfileScanner, LoadProfileScanner};
    use crate::parser::scan_reader;
    use std::io::Cursor;

    #[test]
    fn load_profile_splits_absolute_and_percent_tables() {
        let tables = scan_reader(LoadProfileScanner::default(), Cursor::new(LOAD_FIXTURE)).output;

        assert_eq!(tables.absolute.len(), 2);
        assert_eq!(tables.percent.len(), 2);
        assert_eq!(tables.absolute[1].processor_id, 1);
        assert_eq!(tables.absolute[1].contact, 12.5);
        assert_eq!(tables.percent[0].processor_id, 0);
        assert_eq!(tables.percent[0].shells, 60.0);
    }

    #[test]
    fn short_rows_are_skipped() {
        let tables = scan_reader(
            LoadProfileScanner::default(),
            Cursor::new("\"Clock (seconds)\"\n1.0,2.0,3.0\n"),
        )
        .output;
        assert!(tables.absolute.is_empty());
    }

    #[test]
    fn contact_profile_keys_columns_by_interface_id() {
        let tables = scan_reader(ContProfileScanner::default(), Cursor::new(CONT_FIXTURE)).output;

        assert_eq!(tables.absolute.len(), 2);
        assert_eq!(tables.absolute[0].interface_timings.get(&3), Some(&4.0));
        assert_eq!(tables.absolute[1].interface_timings.get(&12), Some(&0.5));
        assert_eq!(tables.percent.len(), 1);
        assert_eq!(tables.percent[0].interface_timings.get(&3), Some(&80.0));
    }

    const LOAD_FIXTURE: &str = "\
\"Clock (seconds)\"
Solids,Shells,Tshells,Beams,SPH,E_other,Force_shr,Tstep_shr,Swtch_shr,Matrl_shr,Elmnt_shr,Time_step,Contact,Rigid_bdy,Others
0.0,30.0,0.0,0.5,0.0,0.1,2.0,0.3,0.1,0.0,0.0,0.2,10.0,0.4,1.0
0.0,28.0,0.0,0.5,0.0,0.1,2.5,0.3,0.1,0.0,0.0,0.2,12.5,0.4,1.0

\"Clock and percentage(%)\"
Solids,Shells,Tshells,Beams,SPH,E_other,Force_shr,Tstep_shr,Swtch_shr,Matrl_shr,Elmnt_shr,Time_step,Contact,Rigid_bdy,Others
0.0,60.0,0.0,1.0,0.0,0.2,4.0,0.6,0.2,0.0,0.0,0.4,20.0,0.8,2.0
0.0,56.0,0.0,1.0,0.0,0.2,5.0,0.6,0.2,0.0,0.0,0.4,25.0,0.8,2.0
";

    const CONT_FIXTURE: &str = "\
\"Clock (seconds)\"
0003,0012
4.0,1.0
3.5,0.5

\"Clock percentage(%)\"
0003,0012
80.0,20.0
";
}
