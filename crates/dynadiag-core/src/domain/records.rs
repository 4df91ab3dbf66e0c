use super::Severity;
use serde::Serialize;
use std::collections::BTreeMap;

/// Surface timesteps at or above this value mark an interface side that never
/// constrains the step.
pub(crate) const INACTIVE_SURFACE_TIMESTEP: f64 = 1.0e16;

#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize)]
pub struct SimulationHeader {
    pub version: String,
    pub revision: String,
    pub date: String,
    pub time: String,
    pub platform: String,
    pub os_level: String,
    pub compiler: String,
    pub hostname: String,
    pub precision: String,
    pub input_file: String,
    pub licensee: String,
    pub num_procs: usize,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
pub struct ModelSize {
    pub num_materials: u64,
    pub num_nodes: u64,
    pub num_solid_elements: u64,
    pub num_shell_elements: u64,
    pub num_beam_elements: u64,
    pub num_thick_shell_elements: u64,
    pub num_sph_particles: u64,
    pub num_contacts: u64,
    pub num_spc_nodes: u64,
    pub num_parts: u64,
}

impl ModelSize {
    pub fn total_elements(&self) -> u64 {
        self.num_solid_elements
            + self.num_shell_elements
            + self.num_beam_elements
            + self.num_thick_shell_elements
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum TerminationStatus {
    Normal,
    Error,
    #[default]
    Incomplete,
}

impl TerminationStatus {
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Normal => "NORMAL",
            Self::Error => "ERROR",
            Self::Incomplete => "INCOMPLETE",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Default, Serialize)]
pub struct TerminationInfo {
    pub status: TerminationStatus,
    pub target_time: f64,
    pub actual_time: f64,
    pub total_cycles: u64,
    pub total_cpu_seconds: f64,
    pub elapsed_seconds: f64,
    pub cpu_per_zone_cycle_ns: f64,
    pub clock_per_zone_cycle_ns: f64,
    pub start_datetime: String,
    pub end_datetime: String,
    pub error_code: Option<u32>,
    pub error_message: Option<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize)]
pub struct ComputationOptions {
    pub dt_scale_factor: f64,
    pub dt2ms: f64,
    pub tsmin: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct EnergySnapshot {
    pub cycle: u64,
    pub time: f64,
    pub timestep: f64,
    pub kinetic: f64,
    pub internal: f64,
    pub spring_damper: f64,
    pub hourglass: f64,
    pub system_damping: f64,
    pub sliding_interface: f64,
    pub external_work: f64,
    pub eroded_kinetic: f64,
    pub eroded_internal: f64,
    pub eroded_hourglass: f64,
    pub total: f64,
    pub energy_ratio: f64,
    pub energy_ratio_no_eroded: f64,
    pub global_velocity: [f64; 3],
    pub controlling_element_type: String,
    pub controlling_element: u64,
    pub controlling_part: u32,
    pub time_per_zone_ns: u64,
}

impl Default for EnergySnapshot {
    fn default() -> Self {
        Self {
            cycle: 0,
            time: 0.0,
            timestep: 0.0,
            kinetic: 0.0,
            internal: 0.0,
            spring_damper: 0.0,
            hourglass: 0.0,
            system_damping: 0.0,
            sliding_interface: 0.0,
            external_work: 0.0,
            eroded_kinetic: 0.0,
            eroded_internal: 0.0,
            eroded_hourglass: 0.0,
            total: 0.0,
            energy_ratio: 1.0,
            energy_ratio_no_eroded: 1.0,
            global_velocity: [0.0; 3],
            controlling_element_type: String::new(),
            controlling_element: 0,
            controlling_part: 0,
            time_per_zone_ns: 0,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum WarningKind {
    #[default]
    Warning,
    Error,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct WarningEntry {
    pub code: u32,
    pub kind: WarningKind,
    pub count: u64,
    pub severity: Severity,
    pub message: String,
    pub recommendation: String,
    pub affected_interfaces: Vec<u32>,
    pub sample_details: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Default, Serialize)]
pub struct TimestepEntry {
    pub element_type: String,
    pub element_number: u64,
    pub part_number: u32,
    pub timestep: f64,
    /// Rank of the message log that reported this element; `None` until the
    /// multi-rank merge attributes it.
    pub processor_id: Option<usize>,
}

#[derive(Debug, Clone, PartialEq, Default, Serialize)]
pub struct PartDefinition {
    pub part_id: u32,
    pub name: String,
    pub section_id: u32,
    pub material_id: u32,
    pub material_type: u32,
    pub material_type_name: String,
    pub eos_type: u32,
    pub hourglass_type: u32,
    pub density: f64,
    pub youngs_modulus: f64,
    pub poisson_ratio: f64,
    pub hourglass_coefficient: f64,
    pub solid_formulation: u32,
    pub section_title: String,
    pub material_title: String,
}

impl PartDefinition {
    pub fn is_rigid(&self) -> bool {
        self.material_type == 20
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize)]
pub struct ContactDefinition {
    pub order: u32,
    pub contact_id: u32,
    pub type_code: String,
    pub type_number: u32,
    pub type_prefix: String,
    pub title: String,
}

#[derive(Debug, Clone, PartialEq, Default, Serialize)]
pub struct PerformanceTiming {
    pub component: String,
    pub cpu_seconds: f64,
    pub cpu_percent: f64,
    pub clock_seconds: f64,
    pub clock_percent: f64,
}

#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize)]
pub struct ContactTiming {
    pub interface_id: u32,
    pub cpu_seconds: f64,
    pub cpu_percent: f64,
    pub clock_seconds: f64,
    pub clock_percent: f64,
}

#[derive(Debug, Clone, PartialEq, Default, Serialize)]
pub struct MppProcessorTiming {
    pub processor_id: usize,
    pub hostname: String,
    pub cpu_ratio: f64,
    pub cpu_seconds: f64,
}

#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize)]
pub struct DecompMetrics {
    pub min_cost: f64,
    pub max_cost: f64,
    pub std_deviation: f64,
    pub decomp_memory: u64,
    pub dynamic_memory: u64,
}

impl DecompMetrics {
    /// `(max - min) / max`, or `None` when no positive maximum was reported.
    pub fn imbalance(&self) -> Option<f64> {
        (self.max_cost > 0.0).then(|| (self.max_cost - self.min_cost) / self.max_cost)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize)]
pub struct MassProperty {
    pub part_id: u32,
    pub total_mass: f64,
    pub cx: f64,
    pub cy: f64,
    pub cz: f64,
    pub i11: f64,
    pub i22: f64,
    pub i33: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct InterfaceSurfaceTimestep {
    pub interface_id: u32,
    pub surface: String,
    pub type_code: String,
    pub surface_timestep: f64,
    pub controlling_node_id: u64,
    pub part_id: u32,
    pub is_active: bool,
}

impl InterfaceSurfaceTimestep {
    pub fn new(
        interface_id: u32,
        surface: impl Into<String>,
        type_code: impl Into<String>,
        surface_timestep: f64,
        controlling_node_id: u64,
        part_id: u32,
    ) -> Self {
        Self {
            interface_id,
            surface: surface.into(),
            type_code: type_code.into(),
            surface_timestep,
            controlling_node_id,
            part_id,
            is_active: surface_timestep < INACTIVE_SURFACE_TIMESTEP,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
pub struct StatusInfo {
    pub cpu_per_zone_ns: u64,
    pub avg_cpu_per_zone_ns: u64,
    pub avg_clock_per_zone_ns: u64,
    pub est_total_cpu_sec: u64,
    pub est_cpu_remain_sec: u64,
    pub est_total_clock_sec: u64,
    pub est_clock_remain_sec: u64,
}

#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize)]
pub struct LoadProfileEntry {
    pub processor_id: usize,
    pub solids: f64,
    pub shells: f64,
    pub tshells: f64,
    pub beams: f64,
    pub sph: f64,
    pub e_other: f64,
    pub force_shr: f64,
    pub tstep_shr: f64,
    pub swtch_shr: f64,
    pub matrl_shr: f64,
    pub elmnt_shr: f64,
    pub time_step: f64,
    pub contact: f64,
    pub rigid_bdy: f64,
    pub others: f64,
}

#[derive(Debug, Clone, PartialEq, Default, Serialize)]
pub struct ContProfileEntry {
    pub processor_id: usize,
    pub interface_timings: BTreeMap<u32, f64>,
}

#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize)]
pub struct ScalingProjection {
    pub target_cores: usize,
    pub est_elapsed_seconds: f64,
    pub est_speedup: f64,
    pub est_efficiency: f64,
    pub est_sharing_pct: f64,
}

#[cfg(test)]
mod tests {
    use super::{DecompMetrics, EnergySnapshot, InterfaceSurfaceTimestep, ModelSize};

    #[test]
    fn energy_snapshot_ratios_default_to_unity() {
        let snapshot = EnergySnapshot::default();
        assert_eq!(snapshot.energy_ratio, 1.0);
        assert_eq!(snapshot.energy_ratio_no_eroded, 1.0);
        assert_eq!(snapshot.total, 0.0);
    }

    #[test]
    fn surface_timestep_marks_sentinel_values_inactive() {
        let active = InterfaceSurfaceTimestep::new(4, "surfa", "13", 2.5e-7, 1001, 3);
        let inactive = InterfaceSurfaceTimestep::new(4, "surfb", "13", 1.0e16, 0, 0);
        assert!(active.is_active);
        assert!(!inactive.is_active);
    }

    #[test]
    fn decomposition_imbalance_requires_positive_maximum() {
        let metrics = DecompMetrics {
            min_cost: 0.40,
            max_cost: 0.85,
            ..DecompMetrics::default()
        };
        let imbalance = metrics.imbalance().expect("imbalance should be defined");
        assert!((imbalance - 0.529_411_764_7).abs() < 1.0e-9);
        assert!(DecompMetrics::default().imbalance().is_none());
    }

    #[test]
    fn model_size_sums_element_families() {
        let size = ModelSize {
            num_solid_elements: 10,
            num_shell_elements: 5,
            num_beam_elements: 2,
            num_thick_shell_elements: 1,
            ..ModelSize::default()
        };
        assert_eq!(size.total_elements(), 18);
    }
}
