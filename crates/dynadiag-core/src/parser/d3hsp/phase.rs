use super::blocks::{is_decomposition_memory_line, mass_header_part};
use crate::parser::energy_fields::parse_cycle_control;
use crate::parser::smallest::SMALLEST_TIMESTEPS_BANNER;

pub(super) const KEYWORD_COUNTS_BANNER: &str = "L I S T   O F   K E Y W O R D   C O U N T S";
pub(super) const CONTROL_INFO_BANNER: &str = "c o n t r o l   i n f o r m a t i o n";
pub(super) const PART_DEFS_BANNER: &str = "p a r t   d e f i n i t i o n s";
pub(super) const CONTACTS_BANNER: &str = "c o n t a c t   i n t e r f a c e s";
pub(super) const TIMING_BANNER: &str = "T i m i n g   i n f o r m a t i o n";
pub(super) const CPU_TIMING_BANNER: &str = "C P U   T i m i n g";
pub(super) const TOTALS_BANNER: &str = "T o t a l s";

/// Sections of the primary log in file order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub(super) enum Phase {
    Header,
    KeywordCounts,
    ControlInfo,
    PartDefs,
    Contacts,
    Body,
    Tail,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(super) enum TerminationBanner {
    Normal,
    Error,
}

pub(super) fn termination_banner(line: &str) -> Option<TerminationBanner> {
    if !line.contains("t e r m i n a t i o n") {
        return None;
    }
    if line.contains("N o r m a l") {
        Some(TerminationBanner::Normal)
    } else if line.contains("E r r o r") {
        Some(TerminationBanner::Error)
    } else {
        None
    }
}

/// Where a line seen before BODY sends the scanner.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(super) enum Jump {
    /// A section banner; the line itself carries no data.
    Section(Phase),
    /// A BODY record; the line is dispatched again inside BODY.
    Body,
    Timing,
    Terminated(TerminationBanner),
}

/// Detects a forward jump out of a pre-BODY `phase`. Returns `None` when the
/// line belongs to the current phase.
pub(super) fn forward_jump(phase: Phase, line: &str) -> Option<Jump> {
    let section = [
        (KEYWORD_COUNTS_BANNER, Phase::KeywordCounts),
        (CONTROL_INFO_BANNER, Phase::ControlInfo),
        (PART_DEFS_BANNER, Phase::PartDefs),
        (CONTACTS_BANNER, Phase::Contacts),
    ]
    .into_iter()
    .find(|(banner, target)| *target > phase && line.contains(banner));
    if let Some((_, target)) = section {
        return Some(Jump::Section(target));
    }

    if line.contains(TIMING_BANNER) {
        return Some(Jump::Timing);
    }
    if let Some(banner) = termination_banner(line) {
        return Some(Jump::Terminated(banner));
    }
    if opens_body(phase, line) {
        return Some(Jump::Body);
    }
    None
}

fn opens_body(phase: Phase, line: &str) -> bool {
    if phase == Phase::Contacts
        && line.contains("***")
        && (line.contains("Warning") || line.contains("Error"))
    {
        return true;
    }
    (line.contains("dt of cycle") && parse_cycle_control(line).is_some())
        || line.contains(SMALLEST_TIMESTEPS_BANNER)
        || (line.contains("m a s s") && mass_header_part(line).is_some())
        || is_decomposition_memory_line(line)
}

#[cfg(test)]
mod tests {
    use super::{Jump, Phase, TerminationBanner, forward_jump};

    #[test]
    fn banners_only_move_forward() {
        let banner = "          p a r t   d e f i n i t i o n s";
        assert_eq!(
            forward_jump(Phase::Header, banner),
            Some(Jump::Section(Phase::PartDefs))
        );
        assert_eq!(forward_jump(Phase::PartDefs, banner), None);
        assert_eq!(
            forward_jump(Phase::Contacts, " L I S T   O F   K E Y W O R D   C O U N T S"),
            None
        );
    }

    #[test]
    fn warnings_open_body_only_from_contacts() {
        let warning = " *** Warning 50135 (SOL+135)";
        assert_eq!(forward_jump(Phase::PartDefs, warning), None);
        assert_eq!(forward_jump(Phase::Contacts, warning), Some(Jump::Body));
    }

    #[test]
    fn cycle_control_and_termination_skip_ahead_from_any_early_phase() {
        assert_eq!(
            forward_jump(
                Phase::ControlInfo,
                " dt of cycle        1 is controlled by shell        10 of part        2"
            ),
            Some(Jump::Body)
        );
        assert_eq!(
            forward_jump(Phase::Header, "  E r r o r   t e r m i n a t i o n"),
            Some(Jump::Terminated(TerminationBanner::Error))
        );
        assert_eq!(
            forward_jump(Phase::Contacts, " T i m i n g   i n f o r m a t i o n"),
            Some(Jump::Timing)
        );
    }
}
