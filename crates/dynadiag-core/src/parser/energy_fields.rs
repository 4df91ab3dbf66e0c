//! Energy block assembly shared by the primary log and the energy log.
//!
//! A block opens on a cycle-control line and collects `label ..... value`
//! pairs. Labels are resolved through [`ENERGY_LABELS`], an ordered table in
//! which a label never precedes a longer label that contains it.

use super::{capture_f64, capture_number, capture_str, static_regex};
use crate::domain::EnergySnapshot;
use regex::Regex;
use std::sync::LazyLock;

static CYCLE_CONTROL: LazyLock<Regex> = LazyLock::new(|| {
    static_regex(r"dt of cycle\s+(\d+)\s+is controlled by\s+(\w+)\s+(\d+)\s+of part\s+(\d+)")
});
static ENERGY_FIELD_LINE: LazyLock<Regex> =
    LazyLock::new(|| static_regex(r"^\s*([\w\s/().]+?)\.{2,}\s+([\d.Ee+\-]+)\s*$"));

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum EnergyField {
    EnergyRatio,
    EnergyRatioNoEroded,
    ErodedKinetic,
    ErodedInternal,
    ErodedHourglass,
    SpringDamper,
    SlidingInterface,
    SystemDamping,
    TimePerZone,
    Kinetic,
    Internal,
    Hourglass,
    Total,
    ExternalWork,
    VelocityX,
    VelocityY,
    VelocityZ,
    Timestep,
    Time,
}

/// Recognised labels, most specific first. `None` marks labels that are known
/// but not stored, so they cannot fall through to a shorter label.
pub(crate) const ENERGY_LABELS: &[(&str, Option<EnergyField>)] = &[
    ("total energy / initial energy", Some(EnergyField::EnergyRatio)),
    ("energy ratio w/o eroded energy", Some(EnergyField::EnergyRatioNoEroded)),
    ("eroded kinetic energy", Some(EnergyField::ErodedKinetic)),
    ("eroded internal energy", Some(EnergyField::ErodedInternal)),
    ("eroded hourglass energy", Some(EnergyField::ErodedHourglass)),
    ("spring and damper energy", Some(EnergyField::SpringDamper)),
    ("sliding interface energy", Some(EnergyField::SlidingInterface)),
    ("system damping energy", Some(EnergyField::SystemDamping)),
    ("dissipated kinetic energy", None),
    ("dissipated internal energy", None),
    ("time per zone cycle", Some(EnergyField::TimePerZone)),
    ("kinetic energy", Some(EnergyField::Kinetic)),
    ("internal energy", Some(EnergyField::Internal)),
    ("hourglass energy", Some(EnergyField::Hourglass)),
    ("drilling energy", None),
    ("total energy", Some(EnergyField::Total)),
    ("external work", Some(EnergyField::ExternalWork)),
    ("global x velocity", Some(EnergyField::VelocityX)),
    ("global y velocity", Some(EnergyField::VelocityY)),
    ("global z velocity", Some(EnergyField::VelocityZ)),
    ("time step", Some(EnergyField::Timestep)),
    ("time", Some(EnergyField::Time)),
];

/// Resolves a lower-cased label to its field; `None` for ignored or unknown labels.
pub(crate) fn classify_label(label: &str) -> Option<EnergyField> {
    ENERGY_LABELS
        .iter()
        .find(|(needle, _)| label.contains(needle))
        .and_then(|(_, field)| *field)
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct CycleControl {
    pub(crate) cycle: u64,
    pub(crate) element_type: String,
    pub(crate) element: u64,
    pub(crate) part: u32,
}

pub(crate) fn parse_cycle_control(line: &str) -> Option<CycleControl> {
    let captures = CYCLE_CONTROL.captures(line)?;
    Some(CycleControl {
        cycle: capture_number(&captures, 1)?,
        element_type: capture_str(&captures, 2).to_string(),
        element: capture_number(&captures, 3)?,
        part: capture_number(&captures, 4)?,
    })
}

#[derive(Debug, Clone)]
pub(crate) struct EnergyBlock {
    snapshot: EnergySnapshot,
    fields: usize,
}

impl EnergyBlock {
    pub(crate) fn open(control: CycleControl) -> Self {
        Self {
            snapshot: EnergySnapshot {
                cycle: control.cycle,
                controlling_element_type: control.element_type,
                controlling_element: control.element,
                controlling_part: control.part,
                ..EnergySnapshot::default()
            },
            fields: 0,
        }
    }

    pub(crate) fn has_fields(&self) -> bool {
        self.fields > 0
    }

    /// Returns `true` when the line is a `label ..... value` pair.
    pub(crate) fn absorb(&mut self, line: &str) -> bool {
        let Some(captures) = ENERGY_FIELD_LINE.captures(line) else {
            return false;
        };
        let Some(value) = capture_f64(&captures, 2) else {
            return false;
        };
        let label = capture_str(&captures, 1).trim().to_ascii_lowercase();
        self.fields += 1;
        if let Some(field) = classify_label(&label) {
            apply_field(&mut self.snapshot, field, value);
        }
        true
    }

    /// Completed snapshot, or `None` for a block that captured nothing.
    pub(crate) fn close(self) -> Option<EnergySnapshot> {
        self.has_fields().then_some(self.snapshot)
    }
}

fn apply_field(snapshot: &mut EnergySnapshot, field: EnergyField, value: f64) {
    match field {
        // A zero ratio means the solver had no reference energy yet.
        EnergyField::EnergyRatio => {
            if value != 0.0 {
                snapshot.energy_ratio = value;
            }
        }
        EnergyField::EnergyRatioNoEroded => {
            if value != 0.0 {
                snapshot.energy_ratio_no_eroded = value;
            }
        }
        EnergyField::ErodedKinetic => snapshot.eroded_kinetic = value,
        EnergyField::ErodedInternal => snapshot.eroded_internal = value,
        EnergyField::ErodedHourglass => snapshot.eroded_hourglass = value,
        EnergyField::SpringDamper => snapshot.spring_damper = value,
        EnergyField::SlidingInterface => snapshot.sliding_interface = value,
        EnergyField::SystemDamping => snapshot.system_damping = value,
        EnergyField::TimePerZone => {
            snapshot.time_per_zone_ns = if value.is_finite() && value > 0.0 {
                value as u64
            } else {
                0
            }
        }
        EnergyField::Kinetic => snapshot.kinetic = value,
        EnergyField::Internal => snapshot.internal = value,
        EnergyField::Hourglass => snapshot.hourglass = value,
        EnergyField::Total => snapshot.total = value,
        EnergyField::ExternalWork => snapshot.external_work = value,
        EnergyField::VelocityX => snapshot.global_velocity[0] = value,
        EnergyField::VelocityY => snapshot.global_velocity[1] = value,
        EnergyField::VelocityZ => snapshot.global_velocity[2] = value,
        EnergyField::Timestep => snapshot.timestep = value,
        EnergyField::Time => snapshot.time = value,
    }
}

#[cfg(test)]
mod tests {
    use super::{
        ENERGY_LABELS, EnergyBlock, EnergyField, classify_label, parse_cycle_control,
    };

    #[test]
    fn no_label_is_shadowed_by_an_earlier_shorter_label() {
        for (later_index, (later, _)) in ENERGY_LABELS.iter().enumerate() {
            for (earlier, _) in &ENERGY_LABELS[..later_index] {
                assert!(
                    !later.contains(earlier),
                    "'{earlier}' would shadow the more specific '{later}'"
                );
            }
        }
    }

    #[test]
    fn specific_labels_win_over_their_substrings() {
        assert_eq!(
            classify_label("eroded kinetic energy"),
            Some(EnergyField::ErodedKinetic)
        );
        assert_eq!(classify_label("kinetic energy"), Some(EnergyField::Kinetic));
        assert_eq!(
            classify_label("total energy / initial energy"),
            Some(EnergyField::EnergyRatio)
        );
        assert_eq!(
            classify_label("time per zone cycle.(nanosec)"),
            Some(EnergyField::TimePerZone)
        );
        assert_eq!(classify_label("time step"), Some(EnergyField::Timestep));
        assert_eq!(classify_label("dissipated kinetic energy"), None);
        assert_eq!(classify_label("added mass"), None);
    }

    #[test]
    fn cycle_control_line_opens_block_with_controlling_element() {
        let control = parse_cycle_control(
            " dt of cycle      1200 is controlled by shell      5521 of part        7",
        )
        .expect("cycle control should parse");
        assert_eq!(control.cycle, 1200);
        assert_eq!(control.element_type, "shell");
        assert_eq!(control.element, 5521);
        assert_eq!(control.part, 7);
    }

    #[test]
    fn block_collects_fields_and_defaults_missing_ratios() {
        let control = parse_cycle_control(
            " dt of cycle       10 is controlled by solid        12 of part        3",
        )
        .expect("cycle control should parse");
        let mut block = EnergyBlock::open(control);
        assert!(block.absorb(" time...........................  1.00000E-03"));
        assert!(block.absorb(" time step......................  2.50000E-07"));
        assert!(block.absorb(" kinetic energy.................  4.00000E+01"));
        assert!(block.absorb(" eroded kinetic energy..........  1.50000E+00"));
        assert!(block.absorb(" global x velocity..............  -3.0000E+00"));
        assert!(!block.absorb(" not a field line"));

        let snapshot = block.close().expect("block with fields should emit");
        assert_eq!(snapshot.cycle, 10);
        assert_eq!(snapshot.controlling_part, 3);
        assert_eq!(snapshot.time, 1.0e-3);
        assert_eq!(snapshot.timestep, 2.5e-7);
        assert_eq!(snapshot.kinetic, 40.0);
        assert_eq!(snapshot.eroded_kinetic, 1.5);
        assert_eq!(snapshot.global_velocity, [-3.0, 0.0, 0.0]);
        assert_eq!(snapshot.energy_ratio, 1.0);
    }

    #[test]
    fn empty_block_is_discarded() {
        let control = parse_cycle_control(
            " dt of cycle        1 is controlled by beam          1 of part        1",
        )
        .expect("cycle control should parse");
        assert!(EnergyBlock::open(control).close().is_none());
    }
}
