//! Delimited sub-blocks: part definitions, contact summary rows, mass
//! properties and decomposition metrics.

use crate::domain::{ContactDefinition, DecompMetrics, MassProperty, PartDefinition};
use crate::parser::{capture_f64, capture_number, capture_str, static_regex};
use regex::Regex;
use std::sync::LazyLock;

static SEPARATOR_RULE: LazyLock<Regex> = LazyLock::new(|| static_regex(r"^\s*\*{60,}"));

static PART_ID: LazyLock<Regex> = LazyLock::new(|| static_regex(r"part\s+id\s*\.+\s*(\d+)"));
static SECTION_ID: LazyLock<Regex> =
    LazyLock::new(|| static_regex(r"section\s+id\s*\.+\s*(\d+)"));
static MATERIAL_ID: LazyLock<Regex> =
    LazyLock::new(|| static_regex(r"material\s+id\s*\.+\s*(\d+)"));
static MATERIAL_TYPE: LazyLock<Regex> =
    LazyLock::new(|| static_regex(r"material type\s*\.+\s*(\d+)"));
static EOS_TYPE: LazyLock<Regex> =
    LazyLock::new(|| static_regex(r"equation-of-state type\s*\.+\s*(\d+)"));
static HOURGLASS_TYPE: LazyLock<Regex> =
    LazyLock::new(|| static_regex(r"hourglass type\s*\.+\s*(\d+)"));
static DENSITY: LazyLock<Regex> =
    LazyLock::new(|| static_regex(r"density\s*\.+\s*=\s*([\d.Ee+\-]+)"));
static HOURGLASS_COEFFICIENT: LazyLock<Regex> =
    LazyLock::new(|| static_regex(r"hourglass coefficient\s*\.+\s*=\s*([\d.Ee+\-]+)"));
static YOUNGS_MODULUS: LazyLock<Regex> =
    LazyLock::new(|| static_regex(r"^\s+e\s+\.+\s*=\s*([\d.Ee+\-]+)"));
static POISSON_RATIO: LazyLock<Regex> =
    LazyLock::new(|| static_regex(r"vnu\s*\.+\s*=\s*([\d.Ee+\-]+)"));
static SOLID_FORMULATION: LazyLock<Regex> =
    LazyLock::new(|| static_regex(r"solid\s+formulation\s*\.+\s*=\s*(\d+)"));
static SECTION_TITLE_MARKER: LazyLock<Regex> =
    LazyLock::new(|| static_regex(r"section\s+title\s*\.+"));
static MATERIAL_TITLE_MARKER: LazyLock<Regex> =
    LazyLock::new(|| static_regex(r"material title\s*\.+"));

static CONTACT_SUMMARY_ROW: LazyLock<Regex> =
    LazyLock::new(|| static_regex(r"^\s+(\d+)\s+(\d+)\s+([oa]?\s*\d+)\s+(.*?)\s*$"));

static MASS_HEADER: LazyLock<Regex> = LazyLock::new(|| {
    static_regex(r"m a s s\s+p r o p e r t i e s\s+o f\s+p a r t\s*#\s*(\d+)")
});
static MASS_TOTAL: LazyLock<Regex> =
    LazyLock::new(|| static_regex(r"total mass of part\s+=\s+([\d.Ee+\-]+)"));
static MASS_CENTER: LazyLock<Regex> = LazyLock::new(|| {
    static_regex(r"([xyz])-coordinate of mass center\s*=\s*([\d.Ee+\-]+)")
});
static PRINCIPAL_INERTIA: LazyLock<Regex> =
    LazyLock::new(|| static_regex(r"(i11|i22|i33)\s*=\s*([\d.Ee+\-]+)"));

static DECOMP_MIN: LazyLock<Regex> =
    LazyLock::new(|| static_regex(r"Minumum:\s+([\d.Ee+\-]+)"));
static DECOMP_MAX: LazyLock<Regex> =
    LazyLock::new(|| static_regex(r"Maximum:\s+([\d.Ee+\-]+)"));
static DECOMP_STD_DEV: LazyLock<Regex> =
    LazyLock::new(|| static_regex(r"Standard Deviation:\s+([\d.Ee+\-]+)"));
static DECOMP_MEMORY: LazyLock<Regex> =
    LazyLock::new(|| static_regex(r"Memory required for decomposition\s+:\s+(\d+)"));
static DYNAMIC_MEMORY: LazyLock<Regex> =
    LazyLock::new(|| static_regex(r"Additional dynamic memory required\s+:\s+(\d+)"));

const MATERIAL_TYPE_NAMES: &[(u32, &str)] = &[
    (1, "Elastic"),
    (2, "Orthotropic"),
    (3, "Elastic-Plastic (von Mises)"),
    (5, "Soil/Crushable Foam"),
    (6, "Viscoelastic"),
    (7, "Blatz-Ko Rubber"),
    (9, "Null"),
    (20, "Rigid"),
    (24, "Piecewise Linear Plasticity"),
    (57, "Low Density Urethane Foam"),
    (76, "Linear Viscoelastic"),
    (77, "General Hyperelastic/Ogden"),
    (98, "Simplified Johnson Cook"),
];

pub(super) fn is_separator_rule(line: &str) -> bool {
    line.contains("****") && SEPARATOR_RULE.is_match(line)
}

fn material_type_name(material_type: u32) -> String {
    MATERIAL_TYPE_NAMES
        .iter()
        .find(|(code, _)| *code == material_type)
        .map_or_else(|| format!("Type {material_type}"), |(_, name)| name.to_string())
}

fn first_u32(pattern: &Regex, line: &str) -> Option<u32> {
    pattern
        .captures(line)
        .and_then(|captures| capture_number(&captures, 1))
}

fn first_f64(pattern: &Regex, line: &str) -> Option<f64> {
    pattern
        .captures(line)
        .and_then(|captures| capture_f64(&captures, 1))
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum PendingTitle {
    None,
    Section,
    Material,
}

/// Parses one buffered part block. Returns `None` when no part id was found.
pub(super) fn parse_part_block(lines: &[String]) -> Option<PartDefinition> {
    let mut part = PartDefinition::default();
    let mut pending = PendingTitle::None;

    for (index, line) in lines.iter().enumerate() {
        match pending {
            PendingTitle::Section => {
                part.section_title = line.trim().to_string();
                pending = PendingTitle::None;
                continue;
            }
            PendingTitle::Material => {
                part.material_title = line.trim().to_string();
                pending = PendingTitle::None;
                continue;
            }
            PendingTitle::None => {}
        }

        if let Some(part_id) = first_u32(&PART_ID, line) {
            part.part_id = part_id;
            part.name = part_name_before(lines, index).unwrap_or_default();
        } else if let Some(section_id) = first_u32(&SECTION_ID, line) {
            part.section_id = section_id;
        } else if let Some(material_id) = first_u32(&MATERIAL_ID, line) {
            part.material_id = material_id;
        } else if SECTION_TITLE_MARKER.is_match(line) {
            pending = PendingTitle::Section;
        } else if MATERIAL_TITLE_MARKER.is_match(line) {
            pending = PendingTitle::Material;
        } else if let Some(material_type) = first_u32(&MATERIAL_TYPE, line) {
            part.material_type = material_type;
            part.material_type_name = material_type_name(material_type);
        } else if let Some(eos_type) = first_u32(&EOS_TYPE, line) {
            part.eos_type = eos_type;
        } else if let Some(hourglass_type) = first_u32(&HOURGLASS_TYPE, line) {
            part.hourglass_type = hourglass_type;
        } else if let Some(density) = first_f64(&DENSITY, line) {
            part.density = density;
        } else if let Some(coefficient) = first_f64(&HOURGLASS_COEFFICIENT, line) {
            part.hourglass_coefficient = coefficient;
        } else if let Some(modulus) = first_f64(&YOUNGS_MODULUS, line) {
            part.youngs_modulus = modulus;
        } else if let Some(poisson) = first_f64(&POISSON_RATIO, line) {
            part.poisson_ratio = poisson;
        } else if let Some(formulation) = first_u32(&SOLID_FORMULATION, line) {
            part.solid_formulation = formulation;
        }
    }

    (part.part_id != 0).then_some(part)
}

/// The part title sits within the three lines above the id line.
fn part_name_before(lines: &[String], id_index: usize) -> Option<String> {
    lines[id_index.saturating_sub(3)..id_index]
        .iter()
        .map(|line| line.trim())
        .find(|candidate| {
            !candidate.is_empty()
                && !candidate.starts_with('*')
                && !candidate.to_ascii_lowercase().contains("part")
        })
        .map(str::to_string)
}

pub(super) fn parse_contact_summary_row(line: &str) -> Option<ContactDefinition> {
    let captures = CONTACT_SUMMARY_ROW.captures(line)?;
    let type_code = capture_str(&captures, 3).trim().to_string();
    let mut tokens = type_code.split_whitespace();
    let (type_prefix, type_number) = match (tokens.next(), tokens.next()) {
        (Some(prefix), Some(number)) => (prefix.to_string(), number.parse().unwrap_or(0)),
        (Some(single), None) => {
            let digits_at = single
                .find(|character: char| character.is_ascii_digit())
                .unwrap_or(0);
            let (prefix, number) = single.split_at(digits_at);
            (prefix.to_string(), number.parse().unwrap_or(0))
        }
        _ => (String::new(), 0),
    };

    Some(ContactDefinition {
        order: capture_number(&captures, 1)?,
        contact_id: capture_number(&captures, 2)?,
        type_code,
        type_number,
        type_prefix,
        title: capture_str(&captures, 4).trim().to_string(),
    })
}

pub(super) fn mass_header_part(line: &str) -> Option<u32> {
    first_u32(&MASS_HEADER, line)
}

/// Applies a mass-property field line to the open record. Returns `true` when
/// the line carried one of the gated keywords.
pub(super) fn scan_mass_field(line: &str, mass: &mut MassProperty) -> bool {
    if line.contains("mass center") {
        if let Some(captures) = MASS_CENTER.captures(line)
            && let Some(value) = capture_f64(&captures, 2)
        {
            match capture_str(&captures, 1) {
                "x" => mass.cx = value,
                "y" => mass.cy = value,
                _ => mass.cz = value,
            }
        }
        return true;
    }
    if line.contains("total mass") {
        if let Some(value) = first_f64(&MASS_TOTAL, line) {
            mass.total_mass = value;
        }
        return true;
    }
    if line.contains("i11") || line.contains("i22") || line.contains("i33") {
        for captures in PRINCIPAL_INERTIA.captures_iter(line) {
            let Some(value) = capture_f64(&captures, 2) else {
                continue;
            };
            match capture_str(&captures, 1) {
                "i11" => mass.i11 = value,
                "i22" => mass.i22 = value,
                _ => mass.i33 = value,
            }
        }
        return true;
    }
    false
}

pub(super) fn is_decomposition_memory_line(line: &str) -> bool {
    line.contains("Memory required for decomposition") && DECOMP_MEMORY.is_match(line)
}

/// Applies a decomposition metric line. Returns `true` when a gate matched.
pub(super) fn scan_decomposition_line(line: &str, metrics: &mut DecompMetrics) -> bool {
    if line.contains("Minumum:") {
        if let Some(value) = first_f64(&DECOMP_MIN, line) {
            metrics.min_cost = value;
        }
    } else if line.contains("Maximum:") {
        if let Some(value) = first_f64(&DECOMP_MAX, line) {
            metrics.max_cost = value;
        }
    } else if line.contains("Standard Deviation:") {
        if let Some(value) = first_f64(&DECOMP_STD_DEV, line) {
            metrics.std_deviation = value;
        }
    } else if line.contains("Memory required for decomposition") {
        if let Some(value) = DECOMP_MEMORY
            .captures(line)
            .and_then(|captures| capture_number(&captures, 1))
        {
            metrics.decomp_memory = value;
        }
    } else if line.contains("Additional dynamic memory") {
        if let Some(value) = DYNAMIC_MEMORY
            .captures(line)
            .and_then(|captures| capture_number(&captures, 1))
        {
            metrics.dynamic_memory = value;
        }
    } else {
        return false;
    }
    true
}

#[cfg(test)]
mod tests {
    use super::{
        is_separator_rule, mass_header_part, material_type_name, parse_contact_summary_row,
        parse_part_block, scan_decomposition_line, scan_mass_field,
    };
    use crate::domain::{DecompMetrics, MassProperty};

    #[test]
    fn part_block_collects_scattered_fields() {
        let lines: Vec<String> = PART_BLOCK_FIXTURE.lines().map(str::to_string).collect();
        let part = parse_part_block(&lines).expect("part block should parse");

        assert_eq!(part.part_id, 7);
        assert_eq!(part.name, "Bracket Upper");
        assert_eq!(part.section_id, 3);
        assert_eq!(part.material_id, 12);
        assert_eq!(part.material_type, 24);
        assert_eq!(part.material_type_name, "Piecewise Linear Plasticity");
        assert_eq!(part.hourglass_type, 4);
        assert_eq!(part.density, 7.85e-9);
        assert_eq!(part.youngs_modulus, 2.1e5);
        assert_eq!(part.poisson_ratio, 0.3);
        assert_eq!(part.section_title, "shell 1.2mm");
        assert_eq!(part.material_title, "steel DP600");
    }

    #[test]
    fn block_without_part_id_is_dropped() {
        let lines = vec!["  density .......... =  7.8E-09".to_string()];
        assert!(parse_part_block(&lines).is_none());
    }

    #[test]
    fn contact_summary_splits_compound_type_codes() {
        let prefixed = parse_contact_summary_row(
            "       1       101  a 13  door_to_frame",
        )
        .expect("prefixed row should parse");
        assert_eq!(prefixed.order, 1);
        assert_eq!(prefixed.contact_id, 101);
        assert_eq!(prefixed.type_code, "a 13");
        assert_eq!(prefixed.type_prefix, "a");
        assert_eq!(prefixed.type_number, 13);
        assert_eq!(prefixed.title, "door_to_frame");

        let plain = parse_contact_summary_row("       2       102     2  tied welds")
            .expect("plain row should parse");
        assert_eq!(plain.type_prefix, "");
        assert_eq!(plain.type_number, 2);
        assert_eq!(plain.title, "tied welds");

        let glued = parse_contact_summary_row("       3       103  o6  glued")
            .expect("glued row should parse");
        assert_eq!(glued.type_prefix, "o");
        assert_eq!(glued.type_number, 6);
    }

    #[test]
    fn mass_fields_update_open_record() {
        assert_eq!(
            mass_header_part(" m a s s   p r o p e r t i e s   o f   p a r t   #     17"),
            Some(17)
        );
        let mut mass = MassProperty {
            part_id: 17,
            ..MassProperty::default()
        };
        assert!(scan_mass_field("   total mass of part  =   1.2500E-03", &mut mass));
        assert!(scan_mass_field(" y-coordinate of mass center =  -4.0000E+01", &mut mass));
        assert!(scan_mass_field(
            "   i11 =  1.0E+02   i22 =  2.0E+02   i33 =  3.0E+02",
            &mut mass
        ));
        assert!(!scan_mass_field(" unrelated line", &mut mass));
        assert_eq!(mass.total_mass, 1.25e-3);
        assert_eq!(mass.cy, -40.0);
        assert_eq!([mass.i11, mass.i22, mass.i33], [100.0, 200.0, 300.0]);
    }

    #[test]
    fn decomposition_lines_fill_metrics() {
        let mut metrics = DecompMetrics::default();
        for line in [
            " Minumum:  4.0000E-01",
            " Maximum:  8.5000E-01",
            " Standard Deviation:  1.2000E-01",
            " Memory required for decomposition     :    1524000",
            " Additional dynamic memory required    :     880000",
        ] {
            assert!(scan_decomposition_line(line, &mut metrics));
        }
        assert!(!scan_decomposition_line(" cycle 100", &mut metrics));
        assert_eq!(metrics.min_cost, 0.4);
        assert_eq!(metrics.max_cost, 0.85);
        assert_eq!(metrics.std_deviation, 0.12);
        assert_eq!(metrics.decomp_memory, 1_524_000);
        assert_eq!(metrics.dynamic_memory, 880_000);
    }

    #[test]
    fn separator_and_material_name_helpers() {
        assert!(is_separator_rule(&format!(" {}", "*".repeat(72))));
        assert!(!is_separator_rule(" *** Warning 10"));
        assert_eq!(material_type_name(20), "Rigid");
        assert_eq!(material_type_name(181), "Type 181");
    }

    const PART_BLOCK_FIXTURE: &str = "\

 Bracket Upper

   part id .......................         7
   section id ....................         3
   material id ...................        12
   section title .................
 shell 1.2mm
   material title ................
 steel DP600
   material type .................        24
   hourglass type ................         4
   density ..................... =  7.8500E-09
   e ........................... =  2.1000E+05
   vnu ......................... =  3.0000E-01
";
}
