//! Forward-only line scanners for the solver's ASCII output files.
//!
//! Every parser implements [`LineScanner`] and is driven by [`scan_reader`],
//! which decodes lines lossily, reuses one buffer for the whole file and keeps
//! whatever was parsed before a mid-file read failure.

pub mod d3hsp;
mod energy_fields;
pub mod glstat;
pub mod messag;
pub mod profile;
mod smallest;
pub mod status;

pub use d3hsp::{CodeTally, PrimaryLogRecords, PrimaryLogScanner, parse_primary_log};
pub use glstat::{GlstatScanner, parse_glstat};
pub use messag::{RankMessages, RankMessagesScanner, parse_rank_messages, rank_from_file_name};
pub use profile::{
    ContProfileScanner, ContProfileTables, LoadProfileScanner, LoadProfileTables,
    parse_cont_profile, parse_load_profile,
};
pub use status::{StatusScanner, parse_status};

use crate::domain::{DiagError, DiagResult};
use regex::{Captures, Regex};
use std::fs::File;
use std::io::{self, BufRead, BufReader};
use std::path::Path;
use std::str::FromStr;
use tracing::debug;

pub trait LineScanner {
    type Output;

    /// Consumes one line with trailing whitespace and line terminators removed.
    fn scan_line(&mut self, line: &str);

    fn finish(self) -> Self::Output;
}

/// Result of one pass over a file. `interrupted` carries the read error that
/// stopped the pass early; `output` holds everything scanned up to that point.
#[derive(Debug)]
pub struct ScanOutcome<T> {
    pub output: T,
    pub lines: u64,
    pub interrupted: Option<io::Error>,
}

impl<T> ScanOutcome<T> {
    pub fn map<U>(self, transform: impl FnOnce(T) -> U) -> ScanOutcome<U> {
        ScanOutcome {
            output: transform(self.output),
            lines: self.lines,
            interrupted: self.interrupted,
        }
    }
}

/// Byte-based progress reporter; emits one debug event per crossed decile.
struct Progress<'a> {
    label: &'a str,
    total_bytes: u64,
    bytes_read: u64,
    next_decile: u64,
}

impl<'a> Progress<'a> {
    fn new(label: &'a str, total_bytes: u64) -> Self {
        Self {
            label,
            total_bytes,
            bytes_read: 0,
            next_decile: 1,
        }
    }

    fn advance(&mut self, bytes: usize) {
        if self.total_bytes == 0 {
            return;
        }
        self.bytes_read += bytes as u64;
        while self.next_decile < 10 && self.bytes_read * 10 >= self.total_bytes * self.next_decile
        {
            debug!(
                file = self.label,
                percent = self.next_decile * 10,
                "scan progress"
            );
            self.next_decile += 1;
        }
    }
}

pub fn scan_reader<S, R>(mut scanner: S, mut reader: R) -> ScanOutcome<S::Output>
where
    S: LineScanner,
    R: BufRead,
{
    let mut progress = None;
    let (lines, interrupted) = drive(&mut scanner, &mut reader, &mut progress);
    ScanOutcome {
        output: scanner.finish(),
        lines,
        interrupted,
    }
}

fn drive<S, R>(
    scanner: &mut S,
    reader: &mut R,
    progress: &mut Option<Progress<'_>>,
) -> (u64, Option<io::Error>)
where
    S: LineScanner,
    R: BufRead,
{
    let mut buffer = Vec::with_capacity(256);
    let mut lines = 0_u64;
    loop {
        buffer.clear();
        match reader.read_until(b'\n', &mut buffer) {
            Ok(0) => return (lines, None),
            Ok(read) => {
                lines += 1;
                if let Some(progress) = progress.as_mut() {
                    progress.advance(read);
                }
                let text = String::from_utf8_lossy(&buffer);
                scanner.scan_line(text.trim_end());
            }
            Err(error) if error.kind() == io::ErrorKind::Interrupted => continue,
            Err(error) => return (lines, Some(error)),
        }
    }
}

/// Scans `path` if it exists.
///
/// A missing file yields `Ok(None)`. A file that exists but cannot be opened
/// is an `IoSystemError` tagged with `placeholder`.
pub fn scan_path<S: LineScanner>(
    path: &Path,
    scanner: S,
    placeholder: &'static str,
) -> DiagResult<Option<ScanOutcome<S::Output>>> {
    let file = match File::open(path) {
        Ok(file) => file,
        Err(error) if error.kind() == io::ErrorKind::NotFound => return Ok(None),
        Err(error) => {
            return Err(DiagError::io_system(
                placeholder,
                format!("failed to open '{}': {}", path.display(), error),
            ));
        }
    };

    let total_bytes = file.metadata().map(|metadata| metadata.len()).unwrap_or(0);
    let label = path
        .file_name()
        .and_then(|name| name.to_str())
        .unwrap_or("input");
    let mut reader = BufReader::new(file);
    let mut scanner = scanner;
    let mut progress = Some(Progress::new(label, total_bytes));
    let (lines, interrupted) = drive(&mut scanner, &mut reader, &mut progress);
    debug!(file = label, lines, "scan finished");

    Ok(Some(ScanOutcome {
        output: scanner.finish(),
        lines,
        interrupted,
    }))
}

/// Compiles a pattern literal. Every static pattern is forced by the unit tests
/// of the module that owns it, so a malformed literal fails there first.
pub(crate) fn static_regex(pattern: &'static str) -> Regex {
    match Regex::new(pattern) {
        Ok(regex) => regex,
        Err(error) => panic!("invalid built-in pattern {pattern:?}: {error}"),
    }
}

pub(crate) fn capture_str<'h>(captures: &Captures<'h>, index: usize) -> &'h str {
    captures.get(index).map_or("", |matched| matched.as_str())
}

pub(crate) fn capture_number<T: FromStr>(captures: &Captures<'_>, index: usize) -> Option<T> {
    capture_str(captures, index).trim().parse::<T>().ok()
}

pub(crate) fn capture_f64(captures: &Captures<'_>, index: usize) -> Option<f64> {
    parse_numeric_token(capture_str(captures, index))
}

/// Parses a plain or `E`/`D`-exponent decimal token.
pub(crate) fn parse_numeric_token(token: &str) -> Option<f64> {
    let trimmed = token.trim_matches(|character: char| {
        character.is_whitespace() || matches!(character, ',' | ';' | ':' | '=' | '"')
    });
    if trimmed.is_empty() {
        return None;
    }

    if trimmed.contains(['D', 'd']) {
        return trimmed.replace(['D', 'd'], "E").parse::<f64>().ok();
    }
    trimmed.parse::<f64>().ok()
}

#[cfg(test)]
mod tests {
    use super::{LineScanner, parse_numeric_token, scan_path, scan_reader};
    use std::io::{self, BufReader, Cursor, Read};
    use tempfile::TempDir;

    #[derive(Default)]
    struct CollectLines(Vec<String>);

    impl LineScanner for CollectLines {
        type Output = Vec<String>;

        fn scan_line(&mut self, line: &str) {
            self.0.push(line.to_string());
        }

        fn finish(self) -> Self::Output {
            self.0
        }
    }

    #[test]
    fn reader_strips_terminators_and_replaces_invalid_bytes() {
        let bytes = b"first line  \r\nsecond \xff line\nlast".to_vec();
        let outcome = scan_reader(CollectLines::default(), Cursor::new(bytes));

        assert!(outcome.interrupted.is_none());
        assert_eq!(outcome.lines, 3);
        assert_eq!(
            outcome.output,
            vec![
                "first line".to_string(),
                "second \u{fffd} line".to_string(),
                "last".to_string()
            ]
        );
    }

    struct FailingSource {
        served: bool,
    }

    impl Read for FailingSource {
        fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
            if self.served {
                return Err(io::Error::other("device went away"));
            }
            self.served = true;
            let chunk = b"kept\n";
            buf[..chunk.len()].copy_from_slice(chunk);
            Ok(chunk.len())
        }
    }

    #[test]
    fn read_failure_keeps_partial_output() {
        let reader = BufReader::new(FailingSource { served: false });
        let outcome = scan_reader(CollectLines::default(), reader);

        assert_eq!(outcome.output, vec!["kept".to_string()]);
        assert_eq!(outcome.lines, 1);
        assert!(outcome.interrupted.is_some());
    }

    #[test]
    fn missing_file_is_not_an_error() {
        let temp = TempDir::new().expect("tempdir should be created");
        let outcome = scan_path(
            &temp.path().join("d3hsp"),
            CollectLines::default(),
            "IO.TEST_READ",
        )
        .expect("missing file should not fail");
        assert!(outcome.is_none());
    }

    #[test]
    fn numeric_tokens_accept_fortran_exponents() {
        assert_eq!(parse_numeric_token("1.5E-03"), Some(1.5e-3));
        assert_eq!(parse_numeric_token("2.0D+02"), Some(200.0));
        assert_eq!(parse_numeric_token(" 42,"), Some(42.0));
        assert_eq!(parse_numeric_token("...."), None);
        assert_eq!(parse_numeric_token(""), None);
    }
}
