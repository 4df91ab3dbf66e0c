//! Multi-rank merge of the per-process message logs.

use crate::domain::{InterfaceSurfaceTimestep, TimestepEntry};
use crate::parser::RankMessages;
use std::collections::BTreeMap;
use tracing::debug;

/// Element identity used to attribute smallest-timestep entries to a rank.
pub type ElementKey = (String, u64);

#[derive(Debug, Clone, Default, PartialEq)]
pub struct MergedRankData {
    /// Interface id to initial penetrations summed over every rank.
    pub initial_penetrations: BTreeMap<u32, u64>,
    pub interface_warning_counts: BTreeMap<u32, u64>,
    pub surface_timesteps: Vec<InterfaceSurfaceTimestep>,
    pub contact_dt_limit: Option<f64>,
    /// Peak memory (`d` words) per rank, in rank order.
    pub memory_per_rank: Vec<u64>,
    pub element_processor: BTreeMap<ElementKey, usize>,
    pub rank_count: usize,
}

/// Merges rank summaries ordered by rank. Only rank 0 reports contact
/// timesteps, so those fields are taken from it verbatim.
pub fn merge_ranks(ranks: &[RankMessages]) -> MergedRankData {
    let mut merged = MergedRankData {
        rank_count: ranks.len(),
        ..MergedRankData::default()
    };

    if let Some(rank_zero) = ranks.iter().find(|messages| messages.rank == 0) {
        merged.surface_timesteps = rank_zero.surface_timesteps.clone();
        merged.contact_dt_limit = rank_zero.contact_dt_limit;
        merged.interface_warning_counts = rank_zero.interface_warning_counts.clone();
    }

    for rank in ranks {
        for (&interface, &count) in &rank.initial_penetrations {
            *merged.initial_penetrations.entry(interface).or_default() += count;
        }
        merged.memory_per_rank.push(rank.max_memory_d);
        for entry in &rank.smallest_timesteps {
            merged
                .element_processor
                .entry((entry.element_type.clone(), entry.element_number))
                .or_insert(rank.rank);
        }
    }

    debug!(
        ranks = merged.rank_count,
        penetrating_interfaces = merged.initial_penetrations.len(),
        attributed_elements = merged.element_processor.len(),
        "merged rank message logs"
    );
    merged
}

/// Fills `processor_id` on entries the merge can attribute. Entries that
/// already carry a processor, or whose element no rank reported, are left
/// alone. Returns how many entries were filled.
pub fn backfill_processors(entries: &mut [TimestepEntry], merged: &MergedRankData) -> usize {
    let mut filled = 0;
    for entry in entries.iter_mut().filter(|entry| entry.processor_id.is_none()) {
        let key = (entry.element_type.clone(), entry.element_number);
        if let Some(&processor) = merged.element_processor.get(&key) {
            entry.processor_id = Some(processor);
            filled += 1;
        }
    }
    filled
}
