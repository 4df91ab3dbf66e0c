//! Per-rank message logs (`mesNNNN`).

use super::smallest::{SMALLEST_TIMESTEPS_BANNER, SmallestTimestepTable, TableLine};
use super::{
    LineScanner, ScanOutcome, capture_f64, capture_number, capture_str, scan_path, static_regex,
};
use crate::domain::{DiagResult, InterfaceSurfaceTimestep, TimestepEntry};
use regex::Regex;
use std::collections::BTreeMap;
use std::path::Path;
use std::sync::LazyLock;

static WARNING_LINE: LazyLock<Regex> =
    LazyLock::new(|| static_regex(r"^\s*\*\*\*\s+Warning\s+(\d+)"));
static ERROR_LINE: LazyLock<Regex> = LazyLock::new(|| static_regex(r"^\s*\*\*\*\s+Error\s+(\d+)"));
static INITIAL_PENETRATIONS: LazyLock<Regex> = LazyLock::new(|| {
    static_regex(r"(\d+)\s+initial penetrations? (?:were|was) found for interface\s+(\d+)")
});
static INTERFACE_WARNING_SUMMARY: LazyLock<Regex> =
    LazyLock::new(|| static_regex(r"Summary of warning messages for interface # =\s+(\d+)"));
static INTERFACE_WARNING_COUNT: LazyLock<Regex> =
    LazyLock::new(|| static_regex(r"number of warning messages\s+=\s+(\d+)"));
static MEMORY_RESIZE: LazyLock<Regex> = LazyLock::new(|| {
    static_regex(r"(?:expanding|allocating|contracting)\s+memory to\s+(\d+)\s+d\s+(\d+)")
});
static SURFACE_TIMESTEP: LazyLock<Regex> = LazyLock::new(|| {
    static_regex(r"^\s*(\d+)\s+(surfa|surfb)\s+([oa]?\s*\d+)\s+([\d.Ee+\-]+)\s+(\d+)\s+(\d+)")
});
static CONTACT_DT_LIMIT: LazyLock<Regex> = LazyLock::new(|| {
    static_regex(r"(?i)contact\s+stability\s+time\s+step\s+limit\D*?([\d.]+(?:[Ee][+\-]?\d+)?)")
});

/// Summary of one rank's message log.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RankMessages {
    pub rank: usize,
    pub warning_counts: BTreeMap<u32, u64>,
    pub error_counts: BTreeMap<u32, u64>,
    /// Interface id to the last reported initial penetration count.
    pub initial_penetrations: BTreeMap<u32, u64>,
    pub interface_warning_counts: BTreeMap<u32, u64>,
    pub normal_termination: bool,
    pub error_termination: bool,
    /// Largest `d` value of any memory resize line.
    pub max_memory_d: u64,
    pub surface_timesteps: Vec<InterfaceSurfaceTimestep>,
    pub contact_dt_limit: Option<f64>,
    pub smallest_timesteps: Vec<TimestepEntry>,
}

/// Rank encoded in a `mesNNNN` file name.
pub fn rank_from_file_name(name: &str) -> Option<usize> {
    let digits = name.strip_prefix("mes")?;
    if digits.is_empty() || !digits.bytes().all(|byte| byte.is_ascii_digit()) {
        return None;
    }
    digits.parse().ok()
}

#[derive(Debug)]
pub struct RankMessagesScanner {
    messages: RankMessages,
    pending_interface: Option<u32>,
    smallest: Option<SmallestTimestepTable>,
}

impl RankMessagesScanner {
    pub fn new(rank: usize) -> Self {
        Self {
            messages: RankMessages {
                rank,
                ..RankMessages::default()
            },
            pending_interface: None,
            smallest: None,
        }
    }

    fn scan_code_line(&mut self, line: &str) -> bool {
        if let Some(code) = WARNING_LINE
            .captures(line)
            .and_then(|captures| capture_number::<u32>(&captures, 1))
        {
            *self.messages.warning_counts.entry(code).or_default() += 1;
            return true;
        }
        if let Some(code) = ERROR_LINE
            .captures(line)
            .and_then(|captures| capture_number::<u32>(&captures, 1))
        {
            *self.messages.error_counts.entry(code).or_default() += 1;
            return true;
        }
        false
    }

    fn scan_interface_summary(&mut self, line: &str) -> bool {
        if line.contains("Summary of warning messages")
            && let Some(interface) = INTERFACE_WARNING_SUMMARY
                .captures(line)
                .and_then(|captures| capture_number::<u32>(&captures, 1))
        {
            self.pending_interface = Some(interface);
            return true;
        }

        let Some(interface) = self.pending_interface else {
            return false;
        };
        if let Some(count) = INTERFACE_WARNING_COUNT
            .captures(line)
            .and_then(|captures| capture_number::<u64>(&captures, 1))
        {
            self.messages
                .interface_warning_counts
                .insert(interface, count);
            self.pending_interface = None;
        } else if !line.trim().is_empty() {
            self.pending_interface = None;
        }
        false
    }

    fn scan_contact_timestep_line(&mut self, line: &str) {
        if line.contains("surfa") || line.contains("surfb") {
            if let Some(captures) = SURFACE_TIMESTEP.captures(line)
                && let (Some(interface), Some(dt), Some(node), Some(part)) = (
                    capture_number::<u32>(&captures, 1),
                    capture_f64(&captures, 4),
                    capture_number::<u64>(&captures, 5),
                    capture_number::<u32>(&captures, 6),
                )
            {
                self.messages
                    .surface_timesteps
                    .push(InterfaceSurfaceTimestep::new(
                        interface,
                        capture_str(&captures, 2),
                        capture_str(&captures, 3).trim(),
                        dt,
                        node,
                        part,
                    ));
            }
            return;
        }
        if line.contains("tability")
            && let Some(limit) = CONTACT_DT_LIMIT
                .captures(line)
                .and_then(|captures| capture_f64(&captures, 1))
        {
            self.messages.contact_dt_limit = Some(limit);
        }
    }
}

impl LineScanner for RankMessagesScanner {
    type Output = RankMessages;

    fn scan_line(&mut self, line: &str) {
        if line.contains("***") && self.scan_code_line(line) {
            return;
        }

        if let Some(table) = self.smallest.as_mut() {
            match table.feed(line) {
                TableLine::Row(entry) => {
                    self.messages.smallest_timesteps.push(entry);
                    return;
                }
                TableLine::Skipped => return,
                TableLine::Closed => self.smallest = None,
            }
        }
        if line.contains(SMALLEST_TIMESTEPS_BANNER) {
            self.smallest = Some(SmallestTimestepTable::open(Some(self.messages.rank)));
            return;
        }

        if line.contains("initial penetration")
            && let Some(captures) = INITIAL_PENETRATIONS.captures(line)
            && let (Some(count), Some(interface)) = (
                capture_number::<u64>(&captures, 1),
                capture_number::<u32>(&captures, 2),
            )
        {
            self.messages.initial_penetrations.insert(interface, count);
        }

        if self.scan_interface_summary(line) {
            return;
        }

        if line.contains("t e r m i n a t i o n") {
            if line.contains("N o r m a l") {
                self.messages.normal_termination = true;
            }
            if line.contains("E r r o r") {
                self.messages.error_termination = true;
            }
        }

        if line.contains("memory to")
            && let Some(words) = MEMORY_RESIZE
                .captures(line)
                .and_then(|captures| capture_number::<u64>(&captures, 2))
        {
            self.messages.max_memory_d = self.messages.max_memory_d.max(words);
        }

        self.scan_contact_timestep_line(line);
    }

    fn finish(self) -> Self::Output {
        self.messages
    }
}

/// Parses one rank's message log; the rank is taken from the file name and
/// defaults to 0 when the name carries none.
pub fn parse_rank_messages(path: &Path) -> DiagResult<Option<ScanOutcome<RankMessages>>> {
    let rank = path
        .file_name()
        .and_then(|name| name.to_str())
        .and_then(rank_from_file_name)
        .unwrap_or(0);
    scan_path(path, RankMessagesScanner::new(rank), "IO.MESSAG_OPEN")
}

#[cfg(test)]
mod tests {
    use super::{RankMessagesScanner, parse_rank_messages, rank_from_file_name};
    use crate::parser::scan_reader;
    use std::fs;
    use std::io::Cursor;
    use tempfile::TempDir;

    #[test]
    fn rank_comes_from_four_digit_suffix() {
        assert_eq!(rank_from_file_name("mes0000"), Some(0));
        assert_eq!(rank_from_file_name("mes0012"), Some(12));
        assert_eq!(rank_from_file_name("messag"), None);
        assert_eq!(rank_from_file_name("mes"), None);
    }

    #[test]
    fn rank_log_yields_counts_penetrations_and_memory() {
        let messages =
            scan_reader(RankMessagesScanner::new(0), Cursor::new(RANK_ZERO_FIXTURE)).output;

        assert_eq!(messages.warning_counts.get(&50135), Some(&2));
        assert_eq!(messages.error_counts.get(&10103), Some(&1));
        assert_eq!(messages.initial_penetrations.get(&3), Some(&5));
        assert_eq!(messages.interface_warning_counts.get(&3), Some(&41));
        assert!(messages.normal_termination);
        assert!(!messages.error_termination);
        assert_eq!(messages.max_memory_d, 40_000_000);
    }

    #[test]
    fn rank_log_yields_contact_timesteps_and_local_smallest_table() {
        let messages =
            scan_reader(RankMessagesScanner::new(0), Cursor::new(RANK_ZERO_FIXTURE)).output;

        assert_eq!(messages.surface_timesteps.len(), 2);
        let active = &messages.surface_timesteps[0];
        assert_eq!(active.interface_id, 3);
        assert_eq!(active.surface, "surfa");
        assert_eq!(active.type_code, "a 13");
        assert_eq!(active.surface_timestep, 2.0e-7);
        assert!(active.is_active);
        assert!(!messages.surface_timesteps[1].is_active);
        assert_eq!(messages.contact_dt_limit, Some(3.5e-7));

        assert_eq!(messages.smallest_timesteps.len(), 1);
        assert_eq!(messages.smallest_timesteps[0].processor_id, Some(0));
    }

    #[test]
    fn rank_is_taken_from_the_file_name() {
        let temp = TempDir::new().expect("tempdir should be created");
        let path = temp.path().join("mes0003");
        fs::write(&path, "100 smallest timesteps\n shell 14 2 1.0E-07\n")
            .expect("fixture should be written");

        let outcome = parse_rank_messages(&path)
            .expect("readable file should parse")
            .expect("present file should yield messages");
        assert_eq!(outcome.output.rank, 3);
        assert_eq!(outcome.output.smallest_timesteps[0].processor_id, Some(3));
    }

    const RANK_ZERO_FIXTURE: &str = "\
 expanding memory to   22000000 d   40000000
 contracting memory to   12000000 d   20000000
      5 initial penetrations were found for interface        3
 *** Warning 50135 (SOL+135)
 *** Warning 50135 (SOL+135)
 *** Error 10103 (OTH+103)

 Summary of warning messages for interface # =     3
     number of warning messages =        41

         3   surfa   a 13    2.0000E-07       1044        7
         3   surfb   a 13    1.0000E+16          0        0
 contact stability time step limit =  3.5000E-07

 100 smallest timesteps
   shell          12        1   1.0000E-07

  N o r m a l    t e r m i n a t i o n
";
}
