//! Energy log (`glstat`): the per-cycle energy blocks without the rest of the
//! primary log around them.

use super::energy_fields::{EnergyBlock, parse_cycle_control};
use super::{LineScanner, ScanOutcome, scan_path};
use crate::domain::{DiagResult, EnergySnapshot};
use std::path::Path;

#[derive(Debug, Default)]
pub struct GlstatScanner {
    snapshots: Vec<EnergySnapshot>,
    open: Option<EnergyBlock>,
}

impl GlstatScanner {
    fn flush(&mut self) {
        if let Some(snapshot) = self.open.take().and_then(EnergyBlock::close) {
            self.snapshots.push(snapshot);
        }
    }
}

impl LineScanner for GlstatScanner {
    type Output = Vec<EnergySnapshot>;

    fn scan_line(&mut self, line: &str) {
        if line.contains("dt of cycle")
            && let Some(control) = parse_cycle_control(line)
        {
            self.flush();
            self.open = Some(EnergyBlock::open(control));
            return;
        }
        if let Some(block) = self.open.as_mut() {
            block.absorb(line);
        }
    }

    fn finish(mut self) -> Self::Output {
        self.flush();
        self.snapshots
    }
}

/// Parses the energy log; `Ok(None)` when the file is absent.
pub fn parse_glstat(path: &Path) -> DiagResult<Option<ScanOutcome<Vec<EnergySnapshot>>>> {
    scan_path(path, GlstatScanner::default(), "IO.GLSTAT_OPEN")
}

#[cfg(test)]
mod tests {
    use super::GlstatScanner;
    use crate::parser::scan_reader;
    use std::io::Cursor;

    #[test]
    fn cycle_lines_delimit_snapshots() {
        let outcome = scan_reader(GlstatScanner::default(), Cursor::new(GLSTAT_FIXTURE));
        let snapshots = outcome.output;

        assert_eq!(snapshots.len(), 2);
        assert_eq!(snapshots[0].cycle, 1);
        assert_eq!(snapshots[0].kinetic, 250.0);
        assert_eq!(snapshots[0].energy_ratio, 1.0);
        assert_eq!(snapshots[1].cycle, 2000);
        assert_eq!(snapshots[1].energy_ratio, 1.02);
        assert_eq!(snapshots[1].sliding_interface, 4.5);
        assert_eq!(snapshots[1].time_per_zone_ns, 731);
    }

    #[test]
    fn field_lines_before_the_first_block_are_ignored() {
        let outcome = scan_reader(
            GlstatScanner::default(),
            Cursor::new(" kinetic energy.................  1.00000E+00\n"),
        );
        assert!(outcome.output.is_empty());
    }

    const GLSTAT_FIXTURE: &str = "\
 dt of cycle        1 is controlled by shell      301 of part        4
 time...........................  0.00000E+00
 kinetic energy.................  2.50000E+02
 total energy / initial energy..  0.00000E+00

 dt of cycle     2000 is controlled by solid       77 of part        9
 time...........................  2.00000E-03
 sliding interface energy.......  4.50000E+00
 total energy / initial energy..  1.02000E+00
 time per zone cycle.(nanosec)..        731
";
}
