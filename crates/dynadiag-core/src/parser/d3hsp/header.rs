//! HEADER, KEYWORD_COUNTS and CONTROL_INFO extraction.

use super::PrimaryLogRecords;
use crate::domain::{ComputationOptions, ModelSize, SimulationHeader, TerminationInfo};
use crate::parser::{capture_f64, capture_number, capture_str, static_regex};
use regex::{Captures, Regex};
use std::sync::LazyLock;

type HeaderSetter = fn(&mut SimulationHeader, &Captures<'_>);

static HEADER_FIELDS: LazyLock<Vec<(Regex, HeaderSetter)>> = LazyLock::new(|| {
    let table: [(&'static str, HeaderSetter); 9] = [
        (r"^\s+Date:\s+(\S+)\s+Time:\s+(\S+)", |header, captures| {
            header.date = capture_str(captures, 1).to_string();
            header.time = capture_str(captures, 2).to_string();
        }),
        (r"^\s*\|\s+Version\s*:\s*(.+?)\s*\|", |header, captures| {
            header.version = capture_str(captures, 1).to_string();
        }),
        (r"^\s*\|\s+Revision\s*:\s*(.+?)\s*\|", |header, captures| {
            header.revision = capture_str(captures, 1).to_string();
        }),
        (r"^\s*\|\s+Platform\s+:\s*(.+?)\s*\|", |header, captures| {
            header.platform = capture_str(captures, 1).to_string();
        }),
        (r"^\s*\|\s+OS Level\s+:\s*(.+?)\s*\|", |header, captures| {
            header.os_level = capture_str(captures, 1).to_string();
        }),
        (r"^\s*\|\s+Compiler\s+:\s*(.+?)\s*\|", |header, captures| {
            header.compiler = capture_str(captures, 1).to_string();
        }),
        (r"^\s*\|\s+Hostname\s+:\s*(.+?)\s*\|", |header, captures| {
            header.hostname = capture_str(captures, 1).to_string();
        }),
        (r"^\s*\|\s+Precision\s+:\s*(.+?)\s*\|", |header, captures| {
            header.precision = capture_str(captures, 1).to_string();
        }),
        (r"^\s*\|\s+Licensed to:\s*(.+?)\s*\|", |header, captures| {
            header.licensee = capture_str(captures, 1).to_string();
        }),
    ];
    table
        .into_iter()
        .map(|(pattern, setter)| (static_regex(pattern), setter))
        .collect()
});

static INPUT_FILE: LazyLock<Regex> = LazyLock::new(|| static_regex(r"Input file:\s*(\S+)"));
static COMMAND_LINE_INPUT: LazyLock<Regex> =
    LazyLock::new(|| static_regex(r"Command line options:\s*i=(\S+)"));
static MPP_PROCS: LazyLock<Regex> = LazyLock::new(|| {
    static_regex(r"(?:MPP|Parallel)\s+execution with\s+(\d+)\s+(?:MPP\s+)?procs?")
});
static KEYWORD_COUNT: LazyLock<Regex> = LazyLock::new(|| {
    static_regex(r"total # of \*([A-Za-z_0-9/,.+\-()\s]+?)\.{2,}\s+(\d+)")
});

type SizeSetter = fn(&mut ModelSize, u64);

static MODEL_SIZE_FIELDS: LazyLock<Vec<(Regex, SizeSetter)>> = LazyLock::new(|| {
    let table: [(&'static str, SizeSetter); 9] = [
        (r"number of materials or property sets\.+\s+(\d+)", |size, value| {
            size.num_materials = value
        }),
        (r"number of nodal\+scalar points\.+\s+(\d+)", |size, value| {
            size.num_nodes = value
        }),
        (r"number of solid elements\.+\s+(\d+)", |size, value| {
            size.num_solid_elements = value
        }),
        (r"number of shell elements\.+\s+(\d+)", |size, value| {
            size.num_shell_elements = value
        }),
        (r"number of beam elements\.+\s+(\d+)", |size, value| {
            size.num_beam_elements = value
        }),
        (r"number of thick shell elements\.+\s+(\d+)", |size, value| {
            size.num_thick_shell_elements = value
        }),
        (r"number of SPH particles\.+\s+(\d+)", |size, value| {
            size.num_sph_particles = value
        }),
        (r"number of number of contact definitions\.+\s+(\d+)", |size, value| {
            size.num_contacts = value
        }),
        (r"number of spc nodes\.+\s+(\d+)", |size, value| {
            size.num_spc_nodes = value
        }),
    ];
    table
        .into_iter()
        .map(|(pattern, setter)| (static_regex(pattern), setter))
        .collect()
});

static TERMINATION_TIME: LazyLock<Regex> =
    LazyLock::new(|| static_regex(r"termination time\.+\s+([\d.Ee+\-]+)"));
static TIME_STEP_SCALE_FACTOR: LazyLock<Regex> =
    LazyLock::new(|| static_regex(r"time step scale factor\.+\s+([\d.Ee+\-]+)"));
static MASS_SCALED_TIME_STEP: LazyLock<Regex> = LazyLock::new(|| {
    static_regex(r"time step size for mass scaled solution.*?\.+\s+([\d.Ee+\-]+)")
});
static MINIMUM_TIME_STEP_FACTOR: LazyLock<Regex> = LazyLock::new(|| {
    static_regex(r"reduction factor for minimum time step.*?\.+\s+([\d.Ee+\-]+)")
});

pub(super) fn scan_header_line(line: &str, records: &mut PrimaryLogRecords) {
    let header = &mut records.header;
    for (pattern, setter) in HEADER_FIELDS.iter() {
        if let Some(captures) = pattern.captures(line) {
            setter(header, &captures);
            return;
        }
    }

    if let Some(captures) = INPUT_FILE.captures(line) {
        header.input_file = capture_str(&captures, 1).to_string();
        return;
    }
    if header.input_file.is_empty()
        && let Some(captures) = COMMAND_LINE_INPUT.captures(line)
    {
        header.input_file = capture_str(&captures, 1).to_string();
        return;
    }
    scan_process_count(line, header);
}

pub(super) fn scan_keyword_count_line(line: &str, records: &mut PrimaryLogRecords) {
    if let Some(captures) = KEYWORD_COUNT.captures(line) {
        let keyword = capture_str(&captures, 1).trim();
        let Some(count) = capture_number::<u64>(&captures, 2) else {
            return;
        };
        if keyword.contains("PART_option card") {
            records.model_size.num_parts = count;
        }
        if count > 0 {
            records.keyword_counts.insert(keyword.to_string(), count);
        }
        return;
    }
    scan_process_count(line, &mut records.header);
}

pub(super) fn scan_control_line(line: &str, records: &mut PrimaryLogRecords) {
    scan_model_size(line, &mut records.model_size);
    scan_computation_options(line, &mut records.options, &mut records.termination);
    scan_process_count(line, &mut records.header);
}

fn scan_process_count(line: &str, header: &mut SimulationHeader) {
    if !line.contains("execution with") {
        return;
    }
    if let Some(procs) = MPP_PROCS
        .captures(line)
        .and_then(|captures| capture_number::<usize>(&captures, 1))
    {
        header.num_procs = procs;
    }
}

fn scan_model_size(line: &str, size: &mut ModelSize) {
    if !line.contains("number of") {
        return;
    }
    for (pattern, setter) in MODEL_SIZE_FIELDS.iter() {
        if let Some(value) = pattern
            .captures(line)
            .and_then(|captures| capture_number::<u64>(&captures, 1))
        {
            setter(size, value);
            return;
        }
    }
}

fn scan_computation_options(
    line: &str,
    options: &mut ComputationOptions,
    termination: &mut TerminationInfo,
) {
    let first_float = |pattern: &Regex| {
        pattern
            .captures(line)
            .and_then(|captures| capture_f64(&captures, 1))
    };

    if let Some(value) = first_float(&TERMINATION_TIME) {
        termination.target_time = value;
    }
    if let Some(value) = first_float(&TIME_STEP_SCALE_FACTOR) {
        options.dt_scale_factor = value;
    }
    if let Some(value) = first_float(&MASS_SCALED_TIME_STEP) {
        options.dt2ms = value;
    }
    if let Some(value) = first_float(&MINIMUM_TIME_STEP_FACTOR) {
        options.tsmin = value;
    }
}

#[cfg(test)]
mod tests {
    use super::{scan_control_line, scan_header_line, scan_keyword_count_line};
    use crate::parser::d3hsp::PrimaryLogRecords;

    #[test]
    fn header_table_fills_banner_fields() {
        let mut records = PrimaryLogRecords::default();
        for line in HEADER_FIXTURE.lines() {
            scan_header_line(line, &mut records);
        }

        let header = &records.header;
        assert_eq!(header.version, "mpp s R13.1.1");
        assert_eq!(header.revision, "R13.1-205-geb5348f751");
        assert_eq!(header.platform, "LINUX CENTOS 7.9 AVX2");
        assert_eq!(header.precision, "Single precision (I4R4)");
        assert_eq!(header.licensee, "Example Labs");
        assert_eq!(header.date, "01/15/2025");
        assert_eq!(header.time, "09:41:07");
        assert_eq!(header.input_file, "drop_test.k");
        assert_eq!(header.num_procs, 16);
    }

    #[test]
    fn keyword_counts_skip_zero_entries_and_record_part_count() {
        let mut records = PrimaryLogRecords::default();
        scan_keyword_count_line(
            "     total # of *PART_option card................     42",
            &mut records,
        );
        scan_keyword_count_line(
            "     total # of *CONTACT_AUTOMATIC_SINGLE_SURFACE.....      0",
            &mut records,
        );
        assert_eq!(records.model_size.num_parts, 42);
        assert_eq!(records.keyword_counts.get("PART_option card"), Some(&42));
        assert_eq!(records.keyword_counts.len(), 1);
    }

    #[test]
    fn control_lines_fill_model_size_and_options() {
        let mut records = PrimaryLogRecords::default();
        for line in CONTROL_FIXTURE.lines() {
            scan_control_line(line, &mut records);
        }
        assert_eq!(records.model_size.num_nodes, 120_000);
        assert_eq!(records.model_size.num_shell_elements, 98_000);
        assert_eq!(records.model_size.num_contacts, 12);
        assert_eq!(records.termination.target_time, 5.0e-3);
        assert_eq!(records.options.dt_scale_factor, 0.9);
        assert_eq!(records.options.dt2ms, -1.0e-6);
        assert_eq!(records.options.tsmin, 0.0);
    }

    const HEADER_FIXTURE: &str = "\
 Date: 01/15/2025      Time: 09:41:07
     |  Version : mpp s R13.1.1                         |
     |  Revision: R13.1-205-geb5348f751                  |
     |  Platform  : LINUX CENTOS 7.9 AVX2                |
     |  Precision : Single precision (I4R4)              |
     |  Licensed to: Example Labs                        |
 Command line options: i=drop_test.k memory=200m
 MPP execution with       16 procs
";

    const CONTROL_FIXTURE: &str = "\
    number of nodal+scalar points......................     120000
    number of shell elements...........................      98000
    number of number of contact definitions............         12
    termination time...................................  5.0000E-03
    time step scale factor.............................  9.0000E-01
    time step size for mass scaled solution (dt2ms)....  -1.0000E-06
    reduction factor for minimum time step (tsmin).....  0.0000E+00
";
}
