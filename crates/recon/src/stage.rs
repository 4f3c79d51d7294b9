use std::collections::{BTreeMap, BTreeSet, HashMap, HashSet};

use rayon::prelude::*;
use tracing::{debug, info, warn};

use crate::chase::{chase_accepted, AcceptedLookup, ChaseOutcome};
use crate::config::{RunOptions, StageConfig};
use crate::index::{JoinKey, ReferenceIndex};
use crate::model::{ChecklistEntry, MatchCandidate, OccurrenceName, StageStats};

/// Everything the stage sequence produced.
#[derive(Debug, Default)]
pub struct StageOutput {
    pub candidates: Vec<MatchCandidate>,
    pub stats: Vec<StageStats>,
    /// Checklist ids whose accepted link points nowhere.
    pub orphan_links: BTreeSet<String>,
}

/// Comparison names reported under more than one distinct family.
/// Empty family values do not count as a family.
pub fn find_homonyms(occurrences: &[OccurrenceName]) -> HashSet<&str> {
    let mut families: HashMap<&str, HashSet<&str>> = HashMap::new();
    for occ in occurrences {
        let entry = families.entry(occ.comparison_name.as_str()).or_default();
        if !occ.family.is_empty() {
            entry.insert(occ.family.as_str());
        }
    }
    families
        .into_iter()
        .filter(|(_, fams)| fams.len() > 1)
        .map(|(name, _)| name)
        .collect()
}

/// Run the configured stages in order, each against what the earlier ones
/// left unmatched.
pub fn run_stages(
    stages: &[StageConfig],
    occurrences: &[OccurrenceName],
    checklist: &[ChecklistEntry],
    options: &RunOptions,
) -> StageOutput {
    let homonyms = if stages.iter().any(|s| s.exclude_homonyms) {
        find_homonyms(occurrences)
    } else {
        HashSet::new()
    };
    debug!(homonyms = homonyms.len(), "homonym names detected");

    let lookup = AcceptedLookup::new(checklist);
    let mut matched_ids: HashSet<String> = HashSet::new();
    let mut output = StageOutput::default();

    for (index, stage) in stages.iter().enumerate() {
        let pass = run_stage(
            index,
            stage,
            occurrences,
            checklist,
            &matched_ids,
            &homonyms,
            &lookup,
            options,
        );

        info!(
            stage = index,
            eligible = pass.stats.eligible,
            homonyms_excluded = pass.stats.homonyms_excluded,
            matched = pass.stats.matched_ids,
            multiple = pass.stats.multiple_match_ids,
            "stage complete"
        );

        // matched_ids is read-only while a stage probes; extend it only here.
        matched_ids.extend(pass.candidates.iter().map(|c| c.original_id.clone()));
        output.candidates.extend(pass.candidates);
        output.orphan_links.extend(pass.orphans);
        output.stats.push(pass.stats);
    }

    if !output.orphan_links.is_empty() {
        warn!(
            count = output.orphan_links.len(),
            "accepted links reference ids missing from the checklist"
        );
    }

    output
}

struct StagePass {
    candidates: Vec<MatchCandidate>,
    stats: StageStats,
    orphans: BTreeSet<String>,
}

#[allow(clippy::too_many_arguments)]
fn run_stage(
    index: usize,
    stage: &StageConfig,
    occurrences: &[OccurrenceName],
    checklist: &[ChecklistEntry],
    matched_ids: &HashSet<String>,
    homonyms: &HashSet<&str>,
    lookup: &AcceptedLookup<'_>,
    options: &RunOptions,
) -> StagePass {
    let unmatched: Vec<&OccurrenceName> = occurrences
        .iter()
        .filter(|o| !matched_ids.contains(&o.id))
        .collect();

    let (eligible, held_back): (Vec<&OccurrenceName>, Vec<&OccurrenceName>) = if stage.exclude_homonyms {
        unmatched
            .into_iter()
            .partition(|o| !homonyms.contains(o.comparison_name.as_str()))
    } else {
        (unmatched, Vec::new())
    };

    let ref_index = ReferenceIndex::build_sharded(
        checklist,
        &stage.join_columns,
        stage.checklist_name,
        options.shards,
    );
    debug!(stage = index, keys = ref_index.len(), shards = ref_index.shard_count(), "reference index built");

    let probe = |occ: &&OccurrenceName| -> Vec<(MatchCandidate, Option<String>)> {
        let key = JoinKey::occurrence(occ, &stage.join_columns, stage.source_name);
        if key.name().trim().is_empty() {
            return Vec::new();
        }
        ref_index
            .probe(&key)
            .into_iter()
            .map(|entry| candidate(occ, key.name(), entry, index, lookup))
            .collect()
    };

    let hits: Vec<Vec<(MatchCandidate, Option<String>)>> = if options.shards > 1 {
        eligible.par_iter().map(probe).collect()
    } else {
        eligible.iter().map(probe).collect()
    };

    let mut per_id: BTreeMap<&str, usize> = BTreeMap::new();
    for (occ, found) in eligible.iter().zip(&hits) {
        if !found.is_empty() {
            *per_id.entry(occ.id.as_str()).or_insert(0) += found.len();
        }
    }

    let stats = StageStats {
        index,
        eligible: eligible.len(),
        homonyms_excluded: held_back.len(),
        matched_ids: per_id.len(),
        multiple_match_ids: per_id.values().filter(|&&n| n > 1).count(),
        candidates: hits.iter().map(Vec::len).sum(),
    };

    let mut candidates = Vec::with_capacity(stats.candidates);
    let mut orphans = BTreeSet::new();
    for (c, orphan) in hits.into_iter().flatten() {
        if let Some(id) = orphan {
            orphans.insert(id);
        }
        candidates.push(c);
    }

    StagePass {
        candidates,
        stats,
        orphans,
    }
}

/// Build one candidate, attaching the accepted concept at join time.
/// `source_name` is the joined text, equal on both sides of the key.
/// The second value is the matched entry's id when its link is dangling.
fn candidate(
    occ: &OccurrenceName,
    source_name: &str,
    entry: &ChecklistEntry,
    stage: usize,
    lookup: &AcceptedLookup<'_>,
) -> (MatchCandidate, Option<String>) {
    let outcome = chase_accepted(entry, lookup);
    let orphan = matches!(outcome, ChaseOutcome::Orphan(_)).then(|| entry.plant_name_id.clone());
    let c = MatchCandidate {
        original_id: occ.id.clone(),
        source_name: source_name.to_string(),
        match_name: source_name.to_string(),
        match_id: entry.plant_name_id.clone(),
        match_rank: entry.taxon_rank.clone(),
        match_authors: entry.taxon_authors.clone(),
        match_status: entry.taxon_status.clone(),
        accepted: outcome.into_accepted(),
        match_stage: stage,
    };
    (c, orphan)
}
