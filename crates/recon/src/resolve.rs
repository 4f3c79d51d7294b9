use std::collections::{BTreeMap, BTreeSet};

use serde::Serialize;
use tracing::debug;

use crate::model::{MatchCandidate, TaxonStatus};

/// Which step of the chain settled a name.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum TieBreak {
    /// Only one distinct checklist entry matched.
    Unique,
    RankMarker,
    Accepted,
    Orthographic,
    HomotypicSynonym,
}

impl TieBreak {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Unique => "unique",
            Self::RankMarker => "rank_marker",
            Self::Accepted => "accepted",
            Self::Orthographic => "orthographic",
            Self::HomotypicSynonym => "homotypic_synonym",
        }
    }
}

impl std::fmt::Display for TieBreak {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Outcome for one source name.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Resolution {
    Chosen {
        candidate: MatchCandidate,
        rule: TieBreak,
    },
    Ambiguous,
    None,
}

/// Infraspecific rank marker found as a space-delimited token of the name.
/// `ssp.` is reported as `subsp.`.
pub fn rank_marker(source_name: &str) -> Option<&'static str> {
    source_name.split(' ').find_map(|token| match token {
        "var." => Some("var."),
        "subsp." | "ssp." => Some("subsp."),
        "f." => Some("f."),
        _ => None,
    })
}

impl TieBreak {
    /// Whether `candidate` survives this rule.
    fn keeps(self, candidate: &MatchCandidate, marker: Option<&str>) -> bool {
        match self {
            Self::Unique => true,
            Self::RankMarker => {
                marker.is_some_and(|m| candidate.match_name.contains(&format!(" {m} ")))
            }
            Self::Accepted => candidate.match_status == TaxonStatus::Accepted,
            Self::Orthographic => candidate.match_status == TaxonStatus::Orthographic,
            Self::HomotypicSynonym => candidate.match_status == TaxonStatus::HomotypicSynonym,
        }
    }
}

/// Tie-break chain, in order. Each rule filters the full set of distinct
/// candidates; the first one that leaves exactly one wins.
const CHAIN: [TieBreak; 4] = [
    TieBreak::RankMarker,
    TieBreak::Accepted,
    TieBreak::Orthographic,
    TieBreak::HomotypicSynonym,
];

/// Collapse one name's candidates (possibly from many occurrence rows and
/// stages) to at most one choice.
pub fn resolve_group(source_name: &str, candidates: &[&MatchCandidate]) -> Resolution {
    // One representative per checklist entry: earliest stage, then lowest
    // occurrence id, so the choice does not depend on input order.
    let mut distinct: BTreeMap<&str, &MatchCandidate> = BTreeMap::new();
    for &c in candidates {
        distinct
            .entry(c.match_id.as_str())
            .and_modify(|cur| {
                if (c.match_stage, &c.original_id) < (cur.match_stage, &cur.original_id) {
                    *cur = c;
                }
            })
            .or_insert(c);
    }

    if distinct.is_empty() {
        return Resolution::None;
    }
    if distinct.len() == 1 {
        if let Some(c) = distinct.values().next() {
            return Resolution::Chosen {
                candidate: (*c).clone(),
                rule: TieBreak::Unique,
            };
        }
    }

    let marker = rank_marker(source_name);
    for rule in CHAIN {
        let mut kept = distinct.values().filter(|c| rule.keeps(c, marker));
        if let (Some(only), None) = (kept.next(), kept.next()) {
            return Resolution::Chosen {
                candidate: (*only).clone(),
                rule,
            };
        }
    }

    Resolution::Ambiguous
}

/// Per-name resolution outcome plus the occurrence rows it applies to.
#[derive(Debug, Clone)]
pub struct NameGroup {
    pub source_name: String,
    pub original_ids: BTreeSet<String>,
    pub distinct_matches: usize,
    pub resolution: Resolution,
}

#[derive(Debug, Default)]
pub struct ResolverOutput {
    /// Chosen entry per occurrence id. `original_id` and `match_stage` are
    /// always the row's own.
    pub chosen: BTreeMap<String, MatchCandidate>,
    /// Rows whose name stayed ambiguous.
    pub dropped_ids: BTreeSet<String>,
    /// Names with more than one distinct matched entry.
    pub ambiguous_names: usize,
    pub dropped_names: usize,
    pub tie_breaks: BTreeMap<String, usize>,
}

/// Group all stages' candidates by the source name text and resolve each
/// group. Rows sharing a name always resolve identically.
pub fn resolve(candidates: &[MatchCandidate]) -> ResolverOutput {
    let mut groups: BTreeMap<&str, Vec<&MatchCandidate>> = BTreeMap::new();
    for c in candidates {
        groups.entry(c.source_name.as_str()).or_default().push(c);
    }

    let mut out = ResolverOutput::default();
    for (source_name, members) in groups {
        let group = resolve_name(source_name, &members);
        if group.distinct_matches > 1 {
            out.ambiguous_names += 1;
        }
        match group.resolution {
            Resolution::Chosen { candidate, rule } => {
                *out.tie_breaks.entry(rule.to_string()).or_insert(0) += 1;
                for id in group.original_ids {
                    let chosen = match own_candidate(&members, &id, &candidate.match_id) {
                        Some(own) => own.clone(),
                        None => MatchCandidate {
                            original_id: id.clone(),
                            match_stage: row_stage(&members, &id).unwrap_or(candidate.match_stage),
                            ..candidate.clone()
                        },
                    };
                    out.chosen.insert(id, chosen);
                }
            }
            Resolution::Ambiguous => {
                debug!(name = source_name, matches = group.distinct_matches, "ambiguous name dropped");
                out.dropped_names += 1;
                out.dropped_ids.extend(group.original_ids);
            }
            Resolution::None => {}
        }
    }
    out
}

/// The row's own candidate for the chosen entry, so its stage is the one
/// that actually matched it.
fn own_candidate<'a>(
    members: &[&'a MatchCandidate],
    original_id: &str,
    match_id: &str,
) -> Option<&'a MatchCandidate> {
    members
        .iter()
        .copied()
        .filter(|c| c.original_id == original_id && c.match_id == match_id)
        .min_by_key(|c| c.match_stage)
}

/// Stage that matched the row.
fn row_stage(members: &[&MatchCandidate], original_id: &str) -> Option<usize> {
    members
        .iter()
        .filter(|c| c.original_id == original_id)
        .map(|c| c.match_stage)
        .min()
}

fn resolve_name(source_name: &str, members: &[&MatchCandidate]) -> NameGroup {
    let original_ids: BTreeSet<String> = members.iter().map(|c| c.original_id.clone()).collect();
    let distinct_matches = members
        .iter()
        .map(|c| c.match_id.as_str())
        .collect::<BTreeSet<_>>()
        .len();
    NameGroup {
        source_name: source_name.to_string(),
        original_ids,
        distinct_matches,
        resolution: resolve_group(source_name, members),
    }
}
