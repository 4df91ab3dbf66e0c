//! Status snapshot (`status.out`).

use super::{LineScanner, ScanOutcome, capture_number, scan_path, static_regex};
use crate::domain::{DiagResult, StatusInfo};
use regex::Regex;
use std::path::Path;
use std::sync::LazyLock;

type StatusSetter = fn(&mut StatusInfo, u64);

/// Patterns run against the lower-cased line. The averaged variants come
/// first; a line that matches one of them is not offered to the plain one.
static STATUS_FIELDS: LazyLock<Vec<(Regex, StatusSetter)>> = LazyLock::new(|| {
    let table: [(&'static str, StatusSetter); 7] = [
        (
            r"average cpu time per zone cycle\.+\s+(\d+)\s+nanoseconds",
            |info, value| info.avg_cpu_per_zone_ns = value,
        ),
        (
            r"average clock time per zone cycle\.+\s+(\d+)\s+nanoseconds",
            |info, value| info.avg_clock_per_zone_ns = value,
        ),
        (r"cpu time per zone cycle\.+\s+(\d+)\s+nanoseconds", |info, value| {
            info.cpu_per_zone_ns = value
        }),
        (r"estimated total cpu time\s+=\s+(\d+)\s+sec", |info, value| {
            info.est_total_cpu_sec = value
        }),
        (r"estimated cpu time to complete\s+=\s+(\d+)\s+sec", |info, value| {
            info.est_cpu_remain_sec = value
        }),
        (r"estimated total clock time\s+=\s+(\d+)\s+sec", |info, value| {
            info.est_total_clock_sec = value
        }),
        (r"estimated clock time to complete\s+=\s+(\d+)\s+sec", |info, value| {
            info.est_clock_remain_sec = value
        }),
    ];
    table
        .into_iter()
        .map(|(pattern, setter)| (static_regex(pattern), setter))
        .collect()
});

#[derive(Debug, Default)]
pub struct StatusScanner {
    info: StatusInfo,
}

impl LineScanner for StatusScanner {
    type Output = StatusInfo;

    fn scan_line(&mut self, line: &str) {
        if !line.contains("time") {
            return;
        }
        let lowered = line.to_ascii_lowercase();
        for (pattern, setter) in STATUS_FIELDS.iter() {
            if let Some(value) = pattern
                .captures(&lowered)
                .and_then(|captures| capture_number::<u64>(&captures, 1))
            {
                setter(&mut self.info, value);
                return;
            }
        }
    }

    fn finish(self) -> Self::Output {
        self.info
    }
}

/// Parses the status snapshot; `Ok(None)` when the file is absent.
pub fn parse_status(path: &Path) -> DiagResult<Option<ScanOutcome<StatusInfo>>> {
    scan_path(path, StatusScanner::default(), "IO.STATUS_OPEN")
}

#[cfg(test)]
mod tests {
    use super::StatusScanner;
    use crate::parser::scan_reader;
    use std::io::Cursor;

    #[test]
    fn averaged_and_instant_zone_timings_stay_separate() {
        let info = scan_reader(StatusScanner::default(), Cursor::new(STATUS_FIXTURE)).output;

        assert_eq!(info.cpu_per_zone_ns, 812);
        assert_eq!(info.avg_cpu_per_zone_ns, 790);
        assert_eq!(info.avg_clock_per_zone_ns, 805);
        assert_eq!(info.est_total_cpu_sec, 3600);
        assert_eq!(info.est_cpu_remain_sec, 1200);
        assert_eq!(info.est_total_clock_sec, 3700);
        assert_eq!(info.est_clock_remain_sec, 1250);
    }

    const STATUS_FIXTURE: &str = "\
 CPU time per zone cycle..........      812 nanoseconds
 Average CPU time per zone cycle..      790 nanoseconds
 Average clock time per zone cycle.      805 nanoseconds
 Estimated total cpu time          =     3600 sec
 Estimated cpu time to complete    =     1200 sec
 Estimated total clock time        =     3700 sec
 Estimated clock time to complete  =     1250 sec
";
}
