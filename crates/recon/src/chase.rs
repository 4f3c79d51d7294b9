//! One-hop synonym -> accepted chasing.
//!
//! The accepted link is followed exactly once. A synonym whose accepted
//! entry is itself a synonym reports that entry as-is; chains are not
//! walked further.

use std::collections::HashMap;

use crate::model::{AcceptedName, ChecklistEntry, MatchCandidate};

/// `plant_name_id` -> entry, for resolving accepted back-references.
pub struct AcceptedLookup<'a> {
    by_id: HashMap<&'a str, &'a ChecklistEntry>,
}

impl<'a> AcceptedLookup<'a> {
    pub fn new(checklist: &'a [ChecklistEntry]) -> Self {
        let by_id = checklist
            .iter()
            .map(|e| (e.plant_name_id.as_str(), e))
            .collect();
        Self { by_id }
    }

    pub fn get(&self, plant_name_id: &str) -> Option<&'a ChecklistEntry> {
        self.by_id.get(plant_name_id).copied()
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ChaseOutcome {
    /// The matched entry is itself accepted.
    SelfAccepted(AcceptedName),
    /// Followed the entry's accepted link.
    Linked(AcceptedName),
    /// The link names an id the checklist does not contain.
    Orphan(String),
    /// Not accepted and no link recorded.
    NoLink,
}

impl ChaseOutcome {
    pub fn into_accepted(self) -> Option<AcceptedName> {
        match self {
            Self::SelfAccepted(a) | Self::Linked(a) => Some(a),
            Self::Orphan(_) | Self::NoLink => None,
        }
    }
}

/// Resolve the accepted concept for a matched entry at join time.
pub fn chase_accepted(entry: &ChecklistEntry, lookup: &AcceptedLookup<'_>) -> ChaseOutcome {
    if entry.taxon_status == crate::model::TaxonStatus::Accepted {
        return ChaseOutcome::SelfAccepted(AcceptedName::of(entry));
    }
    match entry.accepted_plant_name_id.as_deref() {
        Some(id) => match lookup.get(id) {
            Some(accepted) => ChaseOutcome::Linked(AcceptedName::of(accepted)),
            None => ChaseOutcome::Orphan(id.to_string()),
        },
        None => ChaseOutcome::NoLink,
    }
}

/// Withhold the accepted fields of a chosen candidate whose status is not
/// on the allow-list (heterotypic synonyms, unclassified statuses).
/// Returns true when something was withheld.
pub fn finalize_accepted(candidate: &mut MatchCandidate) -> bool {
    if candidate.match_status.links_to_accepted() {
        return false;
    }
    candidate.accepted.take().is_some()
}
