use std::collections::BTreeMap;

use serde::{Serialize, Serializer};

use crate::config::{ChecklistNameField, JoinColumn, SourceNameField};
use crate::normalize::comparison_name;

// ---------------------------------------------------------------------------
// Input
// ---------------------------------------------------------------------------

/// One taxon name as reported by the occurrence source.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OccurrenceName {
    pub id: String,
    pub scientific_name: String,
    pub generic_name: String,
    pub specific_epithet: String,
    pub family: String,
    pub genus: String,
    pub comparison_name: String,
}

impl OccurrenceName {
    pub fn new(
        id: impl Into<String>,
        scientific_name: impl Into<String>,
        generic_name: impl Into<String>,
        specific_epithet: impl Into<String>,
        family: impl Into<String>,
        genus: impl Into<String>,
    ) -> Self {
        let generic_name = generic_name.into();
        let specific_epithet = specific_epithet.into();
        let comparison_name = comparison_name(&generic_name, &specific_epithet);
        Self {
            id: id.into(),
            scientific_name: scientific_name.into(),
            generic_name,
            specific_epithet,
            family: family.into(),
            genus: genus.into(),
            comparison_name,
        }
    }

    pub fn name(&self, field: SourceNameField) -> &str {
        match field {
            SourceNameField::ScientificName => &self.scientific_name,
            SourceNameField::ComparisonName => &self.comparison_name,
        }
    }

    pub fn column(&self, column: JoinColumn) -> &str {
        match column {
            JoinColumn::Family => &self.family,
            JoinColumn::Genus => &self.genus,
        }
    }
}

/// Checklist status. WCVP plain "Synonym" rows that were not promoted to
/// homotypic at ingest are heterotypic.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum TaxonStatus {
    Accepted,
    HomotypicSynonym,
    HeterotypicSynonym,
    Orthographic,
    Other(String),
}

impl TaxonStatus {
    pub fn parse(value: &str) -> Self {
        match value.trim() {
            "Accepted" => Self::Accepted,
            "Homotypic Synonym" | "Homotypic_Synonym" => Self::HomotypicSynonym,
            "Heterotypic Synonym" | "Heterotypic_Synonym" | "Synonym" => Self::HeterotypicSynonym,
            "Orthographic" => Self::Orthographic,
            other => Self::Other(other.to_string()),
        }
    }

    pub fn as_str(&self) -> &str {
        match self {
            Self::Accepted => "Accepted",
            Self::HomotypicSynonym => "Homotypic Synonym",
            Self::HeterotypicSynonym => "Heterotypic Synonym",
            Self::Orthographic => "Orthographic",
            Self::Other(s) => s,
        }
    }

    /// Statuses whose accepted link is trusted enough to report.
    pub fn links_to_accepted(&self) -> bool {
        matches!(self, Self::Accepted | Self::HomotypicSynonym | Self::Orthographic)
    }
}

impl std::fmt::Display for TaxonStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl Serialize for TaxonStatus {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(self.as_str())
    }
}

/// One name in the reference checklist.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChecklistEntry {
    pub plant_name_id: String,
    pub taxon_name: String,
    pub taxon_authors: String,
    pub taxon_rank: String,
    pub taxon_status: TaxonStatus,
    pub accepted_plant_name_id: Option<String>,
    pub family: String,
    pub genus: String,
}

impl ChecklistEntry {
    /// `taxon_name + " " + taxon_authors`; autonyms without authors keep the
    /// bare name.
    pub fn name_with_authors(&self) -> String {
        if self.taxon_authors.is_empty() {
            self.taxon_name.clone()
        } else {
            format!("{} {}", self.taxon_name, self.taxon_authors)
        }
    }

    pub fn name_without_authors(&self) -> &str {
        &self.taxon_name
    }

    pub fn name(&self, field: ChecklistNameField) -> String {
        match field {
            ChecklistNameField::NameWithAuthors => self.name_with_authors(),
            ChecklistNameField::NameWithoutAuthors => self.taxon_name.clone(),
        }
    }

    pub fn column(&self, column: JoinColumn) -> &str {
        match column {
            JoinColumn::Family => &self.family,
            JoinColumn::Genus => &self.genus,
        }
    }
}

/// Pre-loaded records for one engine run.
#[derive(Debug, Clone, Default)]
pub struct ReconInput {
    pub occurrences: Vec<OccurrenceName>,
    pub checklist: Vec<ChecklistEntry>,
}

// ---------------------------------------------------------------------------
// Matching
// ---------------------------------------------------------------------------

/// Accepted concept reached by the one-hop chase.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct AcceptedName {
    pub id: String,
    pub name: String,
    pub authors: String,
    pub rank: String,
}

impl AcceptedName {
    pub fn of(entry: &ChecklistEntry) -> Self {
        Self {
            id: entry.plant_name_id.clone(),
            name: entry.taxon_name.clone(),
            authors: entry.taxon_authors.clone(),
            rank: entry.taxon_rank.clone(),
        }
    }
}

/// One occurrence joined to one checklist entry at one stage.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MatchCandidate {
    pub original_id: String,
    /// Occurrence-side text the stage probed with; the resolver groups on it.
    pub source_name: String,
    /// Text the join matched on: the entry's name with or without authors,
    /// per the stage.
    pub match_name: String,
    pub match_id: String,
    pub match_rank: String,
    pub match_authors: String,
    pub match_status: TaxonStatus,
    pub accepted: Option<AcceptedName>,
    pub match_stage: usize,
}

// ---------------------------------------------------------------------------
// Output
// ---------------------------------------------------------------------------

/// Match fields of a resolved record.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolvedMatch {
    pub match_name: String,
    pub match_id: String,
    pub match_rank: String,
    pub match_authors: String,
    pub match_status: TaxonStatus,
    pub accepted: Option<AcceptedName>,
    pub match_stage: usize,
}

impl From<MatchCandidate> for ResolvedMatch {
    fn from(c: MatchCandidate) -> Self {
        Self {
            match_name: c.match_name,
            match_id: c.match_id,
            match_rank: c.match_rank,
            match_authors: c.match_authors,
            match_status: c.match_status,
            accepted: c.accepted,
            match_stage: c.match_stage,
        }
    }
}

/// Final output row: the occurrence plus its chosen match, or no match at
/// all when it passed through unmatched.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolvedRecord {
    pub occurrence: OccurrenceName,
    pub matched: Option<ResolvedMatch>,
}

impl ResolvedRecord {
    pub fn is_resolved(&self) -> bool {
        self.matched.is_some()
    }

    pub fn accepted_id(&self) -> Option<&str> {
        self.matched
            .as_ref()
            .and_then(|m| m.accepted.as_ref())
            .map(|a| a.id.as_str())
    }

    /// Flatten into a delimited-output row; absent fields become empty cells.
    pub fn to_row(&self) -> ResolvedRow<'_> {
        let occ = &self.occurrence;
        let m = self.matched.as_ref();
        let acc = m.and_then(|m| m.accepted.as_ref());
        ResolvedRow {
            original_id: &occ.id,
            scientific_name: &occ.scientific_name,
            generic_name: &occ.generic_name,
            specific_epithet: &occ.specific_epithet,
            family: &occ.family,
            genus: &occ.genus,
            comparison_name: &occ.comparison_name,
            match_name: m.map(|m| m.match_name.as_str()),
            match_id: m.map(|m| m.match_id.as_str()),
            match_rank: m.map(|m| m.match_rank.as_str()),
            match_authors: m.map(|m| m.match_authors.as_str()),
            match_status: m.map(|m| m.match_status.as_str()),
            accepted_id: acc.map(|a| a.id.as_str()),
            accepted_name: acc.map(|a| a.name.as_str()),
            accepted_authors: acc.map(|a| a.authors.as_str()),
            accepted_rank: acc.map(|a| a.rank.as_str()),
            match_stage: m.map(|m| m.match_stage),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ResolvedRow<'a> {
    pub original_id: &'a str,
    pub scientific_name: &'a str,
    pub generic_name: &'a str,
    pub specific_epithet: &'a str,
    pub family: &'a str,
    pub genus: &'a str,
    pub comparison_name: &'a str,
    pub match_name: Option<&'a str>,
    pub match_id: Option<&'a str>,
    pub match_rank: Option<&'a str>,
    pub match_authors: Option<&'a str>,
    pub match_status: Option<&'a str>,
    pub accepted_id: Option<&'a str>,
    pub accepted_name: Option<&'a str>,
    pub accepted_authors: Option<&'a str>,
    pub accepted_rank: Option<&'a str>,
    pub match_stage: Option<usize>,
}

// ---------------------------------------------------------------------------
// Summary + Output
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct StageStats {
    pub index: usize,
    pub eligible: usize,
    pub homonyms_excluded: usize,
    pub matched_ids: usize,
    pub multiple_match_ids: usize,
    pub candidates: usize,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ReconSummary {
    pub total_occurrences: usize,
    pub resolved: usize,
    pub unmatched: usize,
    pub dropped_ambiguous_rows: usize,
    pub ambiguous_names: usize,
    pub dropped_ambiguous_names: usize,
    pub orphan_accepted_links: usize,
    pub accepted_links_withheld: usize,
    pub tie_breaks: BTreeMap<String, usize>,
    pub stages: Vec<StageStats>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ReconMeta {
    pub config_name: String,
    pub engine_version: String,
    pub stage_count: usize,
}

#[derive(Debug, Clone)]
pub struct ReconResult {
    pub meta: ReconMeta,
    pub summary: ReconSummary,
    pub records: Vec<ResolvedRecord>,
}

#[derive(Serialize)]
struct SummaryDocument<'a> {
    meta: &'a ReconMeta,
    summary: &'a ReconSummary,
}

impl ReconResult {
    /// `{ meta, summary }` as pretty JSON.
    pub fn summary_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string_pretty(&SummaryDocument {
            meta: &self.meta,
            summary: &self.summary,
        })
    }
}
