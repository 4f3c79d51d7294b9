use std::collections::{BTreeMap, BTreeSet};

use crate::model::{
    MatchCandidate, OccurrenceName, ReconSummary, ResolvedMatch, ResolvedRecord, StageStats,
};
use crate::resolve::ResolverOutput;

/// Union resolved rows with rows no stage ever matched, in source order.
///
/// Rows whose name was dropped as ambiguous are left out entirely; every
/// other occurrence id appears exactly once.
pub fn merge(
    occurrences: &[OccurrenceName],
    chosen: &mut BTreeMap<String, MatchCandidate>,
    dropped_ids: &BTreeSet<String>,
) -> Vec<ResolvedRecord> {
    occurrences
        .iter()
        .filter(|occ| !dropped_ids.contains(&occ.id))
        .map(|occ| ResolvedRecord {
            occurrence: occ.clone(),
            matched: chosen.remove(&occ.id).map(ResolvedMatch::from),
        })
        .collect()
}

/// Tally the counters handed to the reporting side.
pub fn compute_summary(
    records: &[ResolvedRecord],
    resolver: &ResolverOutput,
    stages: Vec<StageStats>,
    orphan_accepted_links: usize,
    accepted_links_withheld: usize,
) -> ReconSummary {
    let resolved = records.iter().filter(|r| r.is_resolved()).count();
    let dropped = resolver.dropped_ids.len();

    ReconSummary {
        total_occurrences: records.len() + dropped,
        resolved,
        unmatched: records.len() - resolved,
        dropped_ambiguous_rows: dropped,
        ambiguous_names: resolver.ambiguous_names,
        dropped_ambiguous_names: resolver.dropped_names,
        orphan_accepted_links,
        accepted_links_withheld,
        tie_breaks: resolver.tie_breaks.clone(),
        stages,
    }
}
