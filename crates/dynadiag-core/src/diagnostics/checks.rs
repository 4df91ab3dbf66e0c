//! Cross-cutting checks run by the aggregator after the per-domain analyzers.

use super::DiagnosticInputs;
use crate::analysis::percent;
use crate::analysis::warnings::grouped;
use crate::config::DiagnosticsThresholds;
use crate::domain::{
    DecompMetrics, Finding, FindingCategory, Severity, TerminationInfo, TerminationStatus,
    WarningEntry,
};
use std::collections::BTreeMap;

const NEGATIVE_VOLUME: u32 = 40509;
const TIED_CONTACT_CODES: [u32; 2] = [40538, 40540];
const UNTIED_NODE: u32 = 50135;
const DISTANT_NODE: u32 = 50136;

const FORCE_GATHER: &str = "Force gather";
const MASS_SCALING: &str = "Mass Scaling";
const CONTACT_ALGORITHM: &str = "Contact algorithm";

fn warning_total(warnings: &[WarningEntry], code: u32) -> u64 {
    warnings
        .iter()
        .filter(|entry| entry.code == code)
        .map(|entry| entry.count)
        .sum()
}

fn listed_interfaces(interfaces: &[u32], limit: usize) -> String {
    let listed: Vec<String> = interfaces.iter().take(limit).map(u32::to_string).collect();
    match interfaces.len().checked_sub(limit) {
        Some(hidden) if hidden > 0 => format!("{} (+{hidden} more)", listed.join(", ")),
        _ => listed.join(", "),
    }
}

pub(super) fn termination(
    info: &TerminationInfo,
    thresholds: &DiagnosticsThresholds,
) -> Option<Finding> {
    let times = format!(
        "Reached t = {:.4E} of target {:.4E}.",
        info.actual_time, info.target_time
    );
    match info.status {
        TerminationStatus::Error => {
            let mut detail = String::new();
            if let Some(code) = info.error_code {
                detail.push_str(&format!(" Error code: {code}."));
            }
            if let Some(message) = info.error_message.as_deref() {
                detail.push(' ');
                detail.push_str(message);
            }
            Some(Finding::critical(
                FindingCategory::Termination,
                "Run terminated with an error",
                format!(
                    "The solver stopped on an unrecoverable condition such as a negative \
                     volume or a non-finite velocity.{detail} {times}"
                ),
                "Locate the failing element or node from the error lines in the primary and \
                 rank logs, then review mesh, boundary conditions and contact in that area; \
                 erosion (*MAT_ADD_EROSION) removes failed elements automatically.",
            ))
        }
        TerminationStatus::Incomplete => Some(Finding::critical(
            FindingCategory::Termination,
            "Run did not finish (output incomplete)",
            format!(
                "No termination banner was found; the job was probably killed or ran out of \
                 wall time. {times}"
            ),
            "Check the scheduler and system logs for memory or wall-time kills, inspect the \
             end of the rank 0 message log and restart from the last restart dump if needed.",
        )),
        TerminationStatus::Normal => {
            if info.actual_time <= 0.0 || info.target_time <= 0.0 {
                return None;
            }
            let completion = info.actual_time / info.target_time;
            (completion < thresholds.completion_fraction).then(|| {
                Finding::warning(
                    FindingCategory::Termination,
                    "Target end time not reached",
                    format!(
                        "{times} ({} complete). The run ended before ENDTIM of \
                         *CONTROL_TERMINATION.",
                        percent(completion, 1)
                    ),
                    "Check for a sense switch, a TSMIN stop or another termination criterion \
                     that ended the run early.",
                )
            })
        }
    }
}

pub(super) fn contact_timestep(inputs: &DiagnosticInputs<'_>) -> Option<Finding> {
    let limit = inputs.contact_dt_limit.filter(|&limit| limit > 0.0)?;
    let mut active = inputs
        .surface_timesteps
        .iter()
        .filter(|surface| surface.is_active);
    let first = active.next()?;
    let mut count = 1;
    let mut bottleneck = first;
    for surface in active {
        count += 1;
        if surface.surface_timestep < bottleneck.surface_timestep {
            bottleneck = surface;
        }
    }

    Some(Finding::warning(
        FindingCategory::Contact,
        format!("Contact stability dt limit: {limit:.3E}"),
        format!(
            "The solver recommends dt <= {limit:.3E}. Smallest surface dt is {:.3E} \
             (interface {}, {}, part {}) among {count} active surfaces. Penalty stiffness \
             grows with bulk modulus and segment area, and a stiff interface can drive the \
             global timestep below the element limit.",
            bottleneck.surface_timestep,
            bottleneck.interface_id,
            bottleneck.surface,
            bottleneck.part_id
        ),
        "Lower the penalty scale factor (SLSFAC), use the soft constraint formulation \
         (SOFT=1 or 2), check the contact thickness (SHLTHK) and avoid very small contact \
         segments.",
    ))
}

/// Principal inertia spread of rigid parts. Deformable parts are skipped: their
/// inertia reflects geometry, not numerical health.
pub(super) fn mass_properties(
    inputs: &DiagnosticInputs<'_>,
    thresholds: &DiagnosticsThresholds,
) -> Vec<Finding> {
    let rigid: BTreeMap<u32, &str> = inputs
        .parts
        .iter()
        .filter(|part| part.is_rigid())
        .map(|part| (part.part_id, part.name.as_str()))
        .collect();

    inputs
        .mass_properties
        .iter()
        .filter_map(|mass| {
            let name = rigid.get(&mass.part_id)?;
            let inertias = [mass.i11, mass.i22, mass.i33];
            let smallest = inertias.into_iter().filter(|value| *value > 0.0).reduce(f64::min)?;
            let largest = inertias.into_iter().reduce(f64::max)?;
            let ratio = largest / smallest;
            (ratio > thresholds.rigid_inertia_ratio).then(|| {
                Finding::info(
                    FindingCategory::MassProperties,
                    format!("Rigid part {} has an extreme inertia ratio", mass.part_id),
                    format!(
                        "Part {} ({name}) principal inertia ratio is {ratio:.0} \
                         (I11 = {:.3E}, I22 = {:.3E}, I33 = {:.3E}).",
                        mass.part_id, mass.i11, mass.i22, mass.i33
                    ),
                    "Very slender rigid bodies can rotate unstably; check the rigid body \
                     geometry and any inertia overrides (*PART_INERTIA).",
                )
            })
        })
        .collect()
}

pub(super) fn decomposition(
    metrics: &DecompMetrics,
    thresholds: &DiagnosticsThresholds,
) -> Option<Finding> {
    if metrics.min_cost <= 0.0 {
        return None;
    }
    let imbalance = metrics.imbalance()?;
    let costs = format!(
        "Processor cost spread is {} (min = {:.6}, max = {:.6}).",
        percent(imbalance, 1),
        metrics.min_cost,
        metrics.max_cost
    );
    if imbalance > thresholds.decomposition_critical {
        Some(Finding::critical(
            FindingCategory::Decomposition,
            format!("Severe MPP load imbalance ({})", percent(imbalance, 1)),
            format!(
                "{costs} Every cycle ends in a synchronisation, so the fastest ranks spend \
                 more than half of the run waiting for the slowest."
            ),
            "Switch the decomposition method (*CONTROL_MPP_DECOMPOSITION_METHOD, RCB to \
             METIS or GREEDY), use fewer processors, or look for parts of extreme size \
             contrast.",
        ))
    } else if imbalance > thresholds.decomposition_warning {
        Some(Finding::warning(
            FindingCategory::Decomposition,
            format!("MPP load imbalance ({})", percent(imbalance, 1)),
            format!(
                "{costs} Parallel efficiency is limited to about {}.",
                percent(1.0 - imbalance, 0)
            ),
            format!(
                "Try a graph-based decomposition (METIS) and check that the processor count \
                 suits the model size. Cost standard deviation: {:.6}.",
                metrics.std_deviation
            ),
        ))
    } else {
        None
    }
}

pub(super) fn timestep_collapse(
    min_dt: f64,
    warnings: &[WarningEntry],
    thresholds: &DiagnosticsThresholds,
) -> Option<Finding> {
    if !(min_dt > 0.0 && min_dt < thresholds.collapse_dt) {
        return None;
    }
    let negative_volumes = warning_total(warnings, NEGATIVE_VOLUME);
    let severity = if negative_volumes > thresholds.collapse_negative_volume_count {
        Severity::Critical
    } else {
        Severity::Warning
    };
    let inversion = if negative_volumes > 0 {
        format!(
            " Negative volume warning {NEGATIVE_VOLUME} occurred {} times, so elements are \
             inverting.",
            grouped(negative_volumes)
        )
    } else {
        String::new()
    };
    Some(Finding::new(
        severity,
        FindingCategory::Timestep,
        format!("Timestep collapse detected (dt = {min_dt:.3E})"),
        format!(
            "The stable timestep fell to {min_dt:.3E}. It scales with element length over \
             sound speed, so crushed elements drive it toward zero and the end time becomes \
             unreachable.{inversion}"
        ),
        "Add erosion (*MAT_ADD_EROSION) or ERODE=1 with TSMIN in *CONTROL_TIMESTEP, \
         remesh the distorted region and check for loads that overdrive it.",
    ))
}

pub(super) fn energy_instability(
    inputs: &DiagnosticInputs<'_>,
    thresholds: &DiagnosticsThresholds,
) -> Vec<Finding> {
    let Some(last) = inputs.snapshots.last() else {
        return Vec::new();
    };
    let mut findings = Vec::new();
    let ratio = last.energy_ratio;
    if ratio > thresholds.energy_ratio_critical {
        findings.push(Finding::critical(
            FindingCategory::Energy,
            format!("Energy ratio runaway (ratio = {ratio:.2})"),
            format!(
                "The total/initial energy ratio reached {ratio:.2}. Energy is being created; \
                 values this high usually precede non-finite results or a singular \
                 constraint system."
            ),
            "Review *CONSTRAINED definitions for over-constrained nodes, remove initial \
             contact penetrations, lower SLSFAC and look for shooting nodes.",
        ));
    } else if ratio > thresholds.energy_ratio_warning {
        findings.push(Finding::warning(
            FindingCategory::Energy,
            format!("Energy ratio rising (ratio = {ratio:.2})"),
            format!("The total/initial energy ratio reached {ratio:.2}."),
            "Review contact definitions and boundary conditions, then compare hourglass and \
             sliding energy against internal energy.",
        ));
    }

    if last.internal < 0.0 {
        findings.push(Finding::critical(
            FindingCategory::Energy,
            format!("Negative internal energy (IE = {:.3E})", last.internal),
            "Internal energy ended below zero, which no physical material response produces.",
            "Check material softening curves, constraints and contact penetration, and \
             boundary conditions that may extract energy.",
        ));
    }
    findings
}

pub(super) fn warning_patterns(
    warnings: &[WarningEntry],
    info: &TerminationInfo,
    thresholds: &DiagnosticsThresholds,
) -> Vec<Finding> {
    let mut findings = Vec::new();
    if info.total_cycles == 0 {
        return findings;
    }

    for entry in warnings.iter().filter(|entry| entry.count > 0) {
        let per_cycle = entry.count as f64 / info.total_cycles as f64;
        if per_cycle <= thresholds.warning_cycle_fraction {
            continue;
        }
        if entry.code == NEGATIVE_VOLUME {
            findings.push(Finding::critical(
                FindingCategory::WarningPattern,
                format!(
                    "Warning {} in {} of cycles",
                    entry.code,
                    percent(per_cycle, 0)
                ),
                format!(
                    "Negative volume reported {} times over {} cycles; elements invert \
                     almost every cycle.",
                    grouped(entry.count),
                    grouped(info.total_cycles)
                ),
                "Remesh the distorted region, enable erosion (*MAT_ADD_EROSION, ERODE=1) \
                 and rework the model if the warning repeats every cycle.",
            ));
        } else if TIED_CONTACT_CODES.contains(&entry.code) {
            let interfaces = if entry.affected_interfaces.is_empty() {
                String::new()
            } else {
                format!(
                    " Interfaces: {}.",
                    listed_interfaces(&entry.affected_interfaces, 5)
                )
            };
            findings.push(Finding::warning(
                FindingCategory::WarningPattern,
                format!(
                    "Warning {}: tied contact definition problem ({} of cycles)",
                    entry.code,
                    percent(per_cycle, 0)
                ),
                format!(
                    "A tied interface reports {} warnings over {} cycles.{interfaces}",
                    grouped(entry.count),
                    grouped(info.total_cycles)
                ),
                "Check the tied surfaces for gaps and mesh mismatch; adjust the search \
                 distance or re-project the slave nodes.",
            ));
        }
    }

    let negative_volumes = warning_total(warnings, NEGATIVE_VOLUME);
    if negative_volumes > thresholds.negative_volume_total {
        findings.push(Finding::warning(
            FindingCategory::WarningPattern,
            format!("Negative volume accumulated {} times", grouped(negative_volumes)),
            format!(
                "Warning {NEGATIVE_VOLUME} occurred {} times in total.",
                grouped(negative_volumes)
            ),
            "Improve mesh quality (Jacobian above 0.3, aspect ratio below 5) and delete \
             failing elements with *MAT_ADD_EROSION or ERODE=1.",
        ));
    }

    if let Some(entry) = warnings.iter().find(|entry| entry.code == UNTIED_NODE)
        && entry.count > thresholds.untied_node_total
    {
        findings.push(Finding::warning(
            FindingCategory::WarningPattern,
            format!(
                "Tied contact nodes not tied (Warning {UNTIED_NODE}: {}x)",
                grouped(entry.count)
            ),
            format!(
                "Slave nodes found no master segment {} times; interfaces {} have a mesh \
                 mismatch and may debond.",
                grouped(entry.count),
                listed_interfaces(&entry.affected_interfaces, 10)
            ),
            "Keep the master mesh at least as fine as the slave mesh, try SBOPT=3 and \
             DEPTH=5, refine near the interface, or merge the nodes directly.",
        ));
    }

    if let Some(entry) = warnings.iter().find(|entry| entry.code == DISTANT_NODE)
        && entry.count > thresholds.distant_node_total
    {
        findings.push(Finding::warning(
            FindingCategory::WarningPattern,
            format!(
                "Tied contact nodes too far from segments (Warning {DISTANT_NODE}: {}x)",
                grouped(entry.count)
            ),
            format!(
                "Slave nodes lie beyond the tie search distance {} times on interfaces {}.",
                grouped(entry.count),
                listed_interfaces(&entry.affected_interfaces, 10)
            ),
            "Increase SFACT, close geometric gaps between the parts and make the interface \
             surfaces coincide when meshing.",
        ));
    }

    findings
}

pub(super) fn performance_bottlenecks(
    inputs: &DiagnosticInputs<'_>,
    thresholds: &DiagnosticsThresholds,
) -> Vec<Finding> {
    let component = |name: &str| {
        inputs
            .performance
            .iter()
            .find(|timing| timing.component == name)
    };
    let mut findings = Vec::new();

    if let Some(gather) = component(FORCE_GATHER) {
        let share = gather.cpu_percent;
        let description = format!(
            "Force gather takes {share:.1}% of CPU time ({:.2}s); rigid bodies spread over \
             several ranks need communication every cycle.",
            gather.cpu_seconds
        );
        if share > thresholds.force_gather_critical_percent {
            findings.push(Finding::critical(
                FindingCategory::Performance,
                format!("Force gather time excessive ({share:.1}%)"),
                description,
                "Turn unneeded rigid bodies deformable, merge small ones with \
                 *CONSTRAINED_RIGID_BODIES, write RCFORC less often or use fewer ranks.",
            ));
        } else if share > thresholds.force_gather_warning_percent {
            findings.push(Finding::warning(
                FindingCategory::Performance,
                format!("Force gather time elevated ({share:.1}%)"),
                description,
                "Review the number of rigid bodies and the MPI process count.",
            ));
        }
    }

    if let Some(scaling) = component(MASS_SCALING)
        && scaling.cpu_percent > thresholds.mass_scaling_warning_percent
    {
        findings.push(Finding::warning(
            FindingCategory::Performance,
            format!("Mass scaling time excessive ({:.1}%)", scaling.cpu_percent),
            format!(
                "Mass scaling takes {:.1}% of CPU time; many elements sit below the DT2MS \
                 target step.",
                scaling.cpu_percent
            ),
            "Revisit DT2MS, remove or merge tiny elements and keep added mass under about 5% \
             of the model mass.",
        ));
    }

    if let Some(contact) = component(CONTACT_ALGORITHM) {
        let share = contact.cpu_percent;
        if share > thresholds.contact_algorithm_critical_percent {
            findings.push(Finding::critical(
                FindingCategory::Performance,
                format!("Contact computation time excessive ({share:.1}%)"),
                format!(
                    "Contact search, penetration checks and penalty forces take {share:.1}% \
                     of CPU time ({:.2}s).",
                    contact.cpu_seconds
                ),
                "Remove interfaces between parts that never touch, split single-surface \
                 contacts into surface-to-surface pairs, tune BSORT and check SHLTHK.",
            ));
        } else if share > thresholds.contact_algorithm_warning_percent {
            findings.push(Finding::warning(
                FindingCategory::Performance,
                format!("Contact computation time high ({share:.1}%)"),
                format!("Contact takes {share:.1}% of CPU time."),
                "Narrow contact definitions to the parts that interact and tune the bucket \
                 sort frequency (BSORT).",
            ));
        }
    }

    findings
}

pub(super) fn problematic_parts(
    inputs: &DiagnosticInputs<'_>,
    thresholds: &DiagnosticsThresholds,
) -> Vec<Finding> {
    let entries = inputs.smallest_timesteps;
    if entries.is_empty() {
        return Vec::new();
    }

    let mut per_part: BTreeMap<u32, (u64, f64)> = BTreeMap::new();
    for entry in entries {
        let (count, min_dt) = per_part
            .entry(entry.part_number)
            .or_insert((0, f64::INFINITY));
        *count += 1;
        *min_dt = min_dt.min(entry.timestep);
    }

    let mut ranked: Vec<(u32, u64, f64)> = per_part
        .into_iter()
        .map(|(part, (count, min_dt))| (part, count, min_dt))
        .collect();
    ranked.sort_by(|left, right| right.1.cmp(&left.1));

    let total = entries.len() as f64;
    ranked
        .into_iter()
        .filter(|&(_, count, _)| count as f64 / total > thresholds.problematic_part_share)
        .map(|(part, count, min_dt)| {
            let share = count as f64 / total;
            let name = inputs
                .parts
                .iter()
                .find(|definition| definition.part_id == part)
                .map(|definition| definition.name.clone())
                .filter(|name| !name.is_empty())
                .unwrap_or_else(|| format!("Part {part}"));
            Finding::warning(
                FindingCategory::PartAnalysis,
                format!("Part {part} ({name}) controls the timestep ({})", percent(share, 0)),
                format!(
                    "{count} of the {} smallest timesteps belong to this part; minimum dt = \
                     {min_dt:.3E}. The global step follows its smallest elements.",
                    entries.len()
                ),
                format!(
                    "Find and remesh the smallest elements of part {part}, check for \
                     over-refined regions and stiff material data, or apply DT2MS mass \
                     scaling."
                ),
            )
        })
        .collect()
}
