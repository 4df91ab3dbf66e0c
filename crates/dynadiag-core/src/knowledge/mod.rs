//! Read-only catalogue of solver warning and error codes.
//!
//! The table is built once on first use and never written afterwards. Codes
//! missing from the catalogue get a severity derived from their numeric range.

use crate::domain::Severity;
use std::borrow::Cow;
use std::collections::HashMap;
use std::sync::LazyLock;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CodeInfo {
    pub code: u32,
    pub severity: Severity,
    pub title: Cow<'static, str>,
    pub description: Cow<'static, str>,
    pub recommendation: Cow<'static, str>,
}

impl CodeInfo {
    pub fn is_catalogued(&self) -> bool {
        matches!(self.title, Cow::Borrowed(_))
    }
}

struct CatalogueEntry {
    code: u32,
    severity: Severity,
    title: &'static str,
    description: &'static str,
    recommendation: &'static str,
}

const fn entry(
    code: u32,
    severity: Severity,
    title: &'static str,
    description: &'static str,
    recommendation: &'static str,
) -> CatalogueEntry {
    CatalogueEntry {
        code,
        severity,
        title,
        description,
        recommendation,
    }
}

const CATALOGUE: &[CatalogueEntry] = &[
    // Tied and segment-based contact.
    entry(
        50135,
        Severity::Warning,
        "Tracked node not constrained (tied interface)",
        "A slave node in a tied contact interface could not be found on any master segment. \
         The node stays unconstrained and may separate from the interface.",
        "Check mesh compatibility between tied parts and keep slave nodes within projection \
         distance of master segments. Consider SBOPT=3 and DEPTH=5 on *CONTACT, or refine the \
         mesh near the interface.",
    ),
    entry(
        50136,
        Severity::Warning,
        "Tracked node too far from segment",
        "A slave node in a tied contact is farther from the nearest master segment than the \
         search tolerance allows.",
        "Increase the tied contact search distance (SFACT) or improve alignment between master \
         and slave surfaces. Check for geometric gaps between tied parts.",
    ),
    entry(
        50120,
        Severity::Warning,
        "Contact segment normals inconsistent",
        "Contact segment normals are inconsistent or reversed.",
        "Check segment normal orientation and SSTYP/MSTYP settings. Verify segment \
         connectivity.",
    ),
    // Penetration and empty interfaces.
    entry(
        20248,
        Severity::Warning,
        "Initial penetration in contact",
        "Nodes start out penetrating contact surfaces, which injects artificial energy at the \
         start of the run.",
        "Remove initial penetrations from the mesh or control them with PENOPT and IGNORE on \
         *CONTROL_CONTACT. Check mesh alignment at contact surfaces.",
    ),
    entry(
        20200,
        Severity::Warning,
        "Contact interface has no segments",
        "A contact interface has no segments defined.",
        "Verify the contact definition and the part or set ids its segment sets reference.",
    ),
    // Negative volume.
    entry(
        30010,
        Severity::Critical,
        "Negative volume (error termination)",
        "An element developed negative volume and the run terminated. The element is \
         distorted beyond physical limits.",
        "Add erosion criteria (*MAT_ADD_EROSION) or ERODE=1 with a suitable TSMIN in \
         *CONTROL_TIMESTEP. Improve mesh quality in the failing region and check loads and \
         boundary conditions for excessive deformation.",
    ),
    entry(
        40003,
        Severity::Critical,
        "Negative volume in element",
        "An element developed negative volume during the computation, a sign of severe mesh \
         distortion.",
        "Check element quality near the reported element. Add erosion criteria or reduce the \
         timestep scale factor.",
    ),
    entry(
        40004,
        Severity::Critical,
        "Negative volume in shell element",
        "A shell element developed negative area or volume.",
        "Check for excessive shell deformation, add element erosion or reduce the shell TSMIN. \
         Verify that shell thickness is reasonable.",
    ),
    // Numerical divergence.
    entry(
        30200,
        Severity::Critical,
        "NaN velocity detected",
        "A NaN velocity was detected. The integration has diverged.",
        "Look for zero-volume elements, excessive mass scaling or unstable contacts. Reduce \
         TSSFAC and verify material properties.",
    ),
    entry(
        30100,
        Severity::Critical,
        "NaN in stress calculation",
        "A NaN appeared in the stress update.",
        "Make sure density, modulus and yield stress are non-zero and physically reasonable. \
         Reduce TSSFAC if needed.",
    ),
    // Memory.
    entry(
        10103,
        Severity::Critical,
        "Out of memory",
        "The solver ran out of allocated memory.",
        "Raise memory= and memory2= on the command line, check for excessive contact segment \
         generation, or spread the model over more ranks.",
    ),
    entry(
        10100,
        Severity::Critical,
        "Insufficient memory for decomposition",
        "Not enough memory was available for the domain decomposition.",
        "Increase the memory allocation, for example memory=200m memory2=200m.",
    ),
    // Element quality, timestep, material.
    entry(
        40100,
        Severity::Warning,
        "Degenerate element detected",
        "An element has a very poor aspect ratio or is degenerate.",
        "Remesh elements with poor aspect ratios. *CONTROL_CHECK can verify mesh quality \
         before the run.",
    ),
    entry(
        30001,
        Severity::Warning,
        "Element timestep below minimum",
        "An element timestep fell below the TSMIN threshold. The element may be eroded or the \
         run terminated.",
        "Review TSMIN and ERODE in *CONTROL_TIMESTEP. If erosion is active, check how many \
         elements are being removed.",
    ),
    entry(
        41200,
        Severity::Warning,
        "Material failure criterion met",
        "A material failure criterion has been activated.",
        "Check the failure strain or stress values of the material definition against the \
         loading.",
    ),
    entry(
        60100,
        Severity::Warning,
        "Rigid body mass too small",
        "A rigid body has a very small mass, which can destabilise the run.",
        "Check the rigid material density and geometry.",
    ),
    entry(
        70100,
        Severity::Warning,
        "Adaptive remeshing issue",
        "An issue was encountered during adaptive remeshing.",
        "Check the adaptive remeshing parameters, quality criteria and refinement levels.",
    ),
    entry(
        80100,
        Severity::Warning,
        "SPH particle issue",
        "An issue occurred in the SPH particle computation.",
        "Check SPH parameters and particle distribution.",
    ),
    entry(
        90001,
        Severity::Critical,
        "License error",
        "The solver license could not be acquired or has expired.",
        "Check the license server environment variable and license file.",
    ),
];

static CATALOGUE_INDEX: LazyLock<HashMap<u32, &'static CatalogueEntry>> =
    LazyLock::new(|| CATALOGUE.iter().map(|entry| (entry.code, entry)).collect());

/// Severity assigned to codes absent from the catalogue.
pub fn range_severity(code: u32) -> Severity {
    match code {
        0..20_000 => Severity::Critical,
        20_000..60_000 => Severity::Warning,
        _ => Severity::Info,
    }
}

pub fn lookup_code(code: u32) -> CodeInfo {
    match CATALOGUE_INDEX.get(&code) {
        Some(entry) => CodeInfo {
            code,
            severity: entry.severity,
            title: Cow::Borrowed(entry.title),
            description: Cow::Borrowed(entry.description),
            recommendation: Cow::Borrowed(entry.recommendation),
        },
        None => CodeInfo {
            code,
            severity: range_severity(code),
            title: Cow::Owned(format!("Code {code}")),
            description: Cow::Owned(format!(
                "Warning/error code {code} is not in the built-in catalogue."
            )),
            recommendation: Cow::Owned(format!(
                "Consult the solver manual or vendor support for code {code}."
            )),
        },
    }
}

pub fn catalogued_codes() -> impl Iterator<Item = u32> {
    CATALOGUE.iter().map(|entry| entry.code)
}
