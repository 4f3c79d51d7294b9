use std::collections::HashSet;
use std::path::PathBuf;

use serde::{Deserialize, Serialize};

use crate::error::ReconError;

// ---------------------------------------------------------------------------
// Top-level config
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Deserialize)]
pub struct ReconConfig {
    pub name: String,
    /// Treat dropped ambiguous names as a failing run (CLI exit code).
    #[serde(default)]
    pub fail_on_ambiguous: bool,
    pub occurrences: OccurrenceSource,
    pub checklist: ChecklistSource,
    #[serde(default = "StageConfig::default_sequence")]
    pub stages: Vec<StageConfig>,
    #[serde(default)]
    pub run: RunOptions,
    #[serde(default)]
    pub output: OutputConfig,
}

// ---------------------------------------------------------------------------
// Stages
// ---------------------------------------------------------------------------

/// Which occurrence-side text a stage probes with.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Deserialize, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum SourceNameField {
    /// Full reported name including authors.
    ScientificName,
    /// Diacritic-folded "genericName specificEpithet".
    ComparisonName,
}

impl SourceNameField {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::ScientificName => "scientific_name",
            Self::ComparisonName => "comparison_name",
        }
    }
}

/// Which checklist-side text a stage joins against.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Deserialize, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ChecklistNameField {
    NameWithAuthors,
    NameWithoutAuthors,
}

impl ChecklistNameField {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::NameWithAuthors => "name_with_authors",
            Self::NameWithoutAuthors => "name_without_authors",
        }
    }
}

/// Additional equality columns present on both record sets.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Deserialize, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum JoinColumn {
    Family,
    Genus,
}

impl std::fmt::Display for JoinColumn {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Family => write!(f, "family"),
            Self::Genus => write!(f, "genus"),
        }
    }
}

/// One exact-match pass. Stages run in the order given; a later stage only
/// sees occurrences that no earlier stage matched.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
pub struct StageConfig {
    pub source_name: SourceNameField,
    pub checklist_name: ChecklistNameField,
    #[serde(default)]
    pub join_columns: Vec<JoinColumn>,
    #[serde(default)]
    pub exclude_homonyms: bool,
}

impl StageConfig {
    pub fn new(
        source_name: SourceNameField,
        checklist_name: ChecklistNameField,
        join_columns: &[JoinColumn],
        exclude_homonyms: bool,
    ) -> Self {
        Self {
            source_name,
            checklist_name,
            join_columns: join_columns.to_vec(),
            exclude_homonyms,
        }
    }

    /// Strict to loose: family+genus with authors, family+genus without
    /// authors, then bare name without authors with homonyms held back.
    pub fn default_sequence() -> Vec<StageConfig> {
        use ChecklistNameField::*;
        use JoinColumn::*;
        use SourceNameField::*;
        vec![
            StageConfig::new(ScientificName, NameWithAuthors, &[Family, Genus], false),
            StageConfig::new(ComparisonName, NameWithoutAuthors, &[Family, Genus], false),
            StageConfig::new(ComparisonName, NameWithoutAuthors, &[], true),
        ]
    }
}

// ---------------------------------------------------------------------------
// Sources
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Deserialize)]
pub struct OccurrenceSource {
    pub file: PathBuf,
    #[serde(default = "default_occurrence_delimiter")]
    pub delimiter: String,
    #[serde(default)]
    pub limit: Option<usize>,
    #[serde(default)]
    pub remove_hybrids: bool,
    #[serde(default)]
    pub columns: OccurrenceColumns,
    #[serde(default)]
    pub filters: Vec<RowFilter>,
}

impl Default for OccurrenceSource {
    fn default() -> Self {
        Self {
            file: PathBuf::new(),
            delimiter: default_occurrence_delimiter(),
            limit: None,
            remove_hybrids: false,
            columns: OccurrenceColumns::default(),
            filters: Vec::new(),
        }
    }
}

/// Header names in the occurrence file. Defaults follow GBIF exports.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct OccurrenceColumns {
    pub id: String,
    pub scientific_name: String,
    pub generic_name: String,
    pub specific_epithet: String,
    pub family: String,
    pub genus: String,
}

impl Default for OccurrenceColumns {
    fn default() -> Self {
        Self {
            id: "taxonID".into(),
            scientific_name: "scientificName".into(),
            generic_name: "genericName".into(),
            specific_epithet: "specificEpithet".into(),
            family: "family".into(),
            genus: "genus".into(),
        }
    }
}

/// Keep only rows whose `column` holds one of `values`.
#[derive(Debug, Clone, Deserialize)]
pub struct RowFilter {
    pub column: String,
    pub values: Vec<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ChecklistSource {
    pub file: PathBuf,
    #[serde(default = "default_checklist_delimiter")]
    pub delimiter: String,
    #[serde(default)]
    pub limit: Option<usize>,
    #[serde(default)]
    pub columns: ChecklistColumns,
}

impl Default for ChecklistSource {
    fn default() -> Self {
        Self {
            file: PathBuf::new(),
            delimiter: default_checklist_delimiter(),
            limit: None,
            columns: ChecklistColumns::default(),
        }
    }
}

/// Header names in the checklist file. Defaults follow WCVP exports.
/// `homotypic_synonym` is read only when present; other columns are ignored.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ChecklistColumns {
    pub plant_name_id: String,
    pub taxon_name: String,
    pub taxon_authors: String,
    pub taxon_rank: String,
    pub taxon_status: String,
    pub accepted_plant_name_id: String,
    pub family: String,
    pub genus: String,
    pub homotypic_synonym: String,
}

impl Default for ChecklistColumns {
    fn default() -> Self {
        Self {
            plant_name_id: "plant_name_id".into(),
            taxon_name: "taxon_name".into(),
            taxon_authors: "taxon_authors".into(),
            taxon_rank: "taxon_rank".into(),
            taxon_status: "taxon_status".into(),
            accepted_plant_name_id: "accepted_plant_name_id".into(),
            family: "family".into(),
            genus: "genus".into(),
            homotypic_synonym: "homotypic_synonym".into(),
        }
    }
}

fn default_occurrence_delimiter() -> String {
    "\t".into()
}

fn default_checklist_delimiter() -> String {
    "|".into()
}

// ---------------------------------------------------------------------------
// Run + Output
// ---------------------------------------------------------------------------

/// Execution knobs passed to the engine entry point.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct RunOptions {
    /// Hash partitions used for index build and probing. 1 = sequential.
    #[serde(default = "default_shards")]
    pub shards: usize,
    /// Size of a dedicated rayon pool; `None` uses the global pool.
    #[serde(default)]
    pub threads: Option<usize>,
}

impl Default for RunOptions {
    fn default() -> Self {
        Self {
            shards: default_shards(),
            threads: None,
        }
    }
}

fn default_shards() -> usize {
    1
}

#[derive(Debug, Clone, Deserialize)]
pub struct OutputConfig {
    #[serde(default)]
    pub file: Option<PathBuf>,
    #[serde(default = "default_occurrence_delimiter")]
    pub delimiter: String,
    #[serde(default)]
    pub summary_json: Option<PathBuf>,
    #[serde(default)]
    pub report_md: Option<PathBuf>,
}

impl Default for OutputConfig {
    fn default() -> Self {
        Self {
            file: None,
            delimiter: default_occurrence_delimiter(),
            summary_json: None,
            report_md: None,
        }
    }
}

// ---------------------------------------------------------------------------
// Parse + Validate
// ---------------------------------------------------------------------------

/// Convert a configured delimiter string into the single byte `csv` wants.
pub fn delimiter_byte(delimiter: &str) -> Result<u8, ReconError> {
    match delimiter.as_bytes() {
        [b] if b.is_ascii() => Ok(*b),
        _ => Err(ReconError::ConfigValidation(format!(
            "delimiter must be a single ASCII character, got {delimiter:?}"
        ))),
    }
}

impl ReconConfig {
    /// Programmatic config with default sources, default stages and
    /// sequential execution.
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            fail_on_ambiguous: false,
            occurrences: OccurrenceSource::default(),
            checklist: ChecklistSource::default(),
            stages: StageConfig::default_sequence(),
            run: RunOptions::default(),
            output: OutputConfig::default(),
        }
    }

    pub fn with_stages(mut self, stages: Vec<StageConfig>) -> Self {
        self.stages = stages;
        self
    }

    pub fn with_run(mut self, run: RunOptions) -> Self {
        self.run = run;
        self
    }

    pub fn from_toml(input: &str) -> Result<Self, ReconError> {
        let config: ReconConfig =
            toml::from_str(input).map_err(|e| ReconError::ConfigParse(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), ReconError> {
        if self.stages.is_empty() {
            return Err(ReconError::ConfigValidation(
                "at least one stage is required".into(),
            ));
        }

        for (i, stage) in self.stages.iter().enumerate() {
            let mut seen = HashSet::new();
            for col in &stage.join_columns {
                if !seen.insert(col) {
                    return Err(ReconError::ConfigValidation(format!(
                        "stage {i}: join column '{col}' listed twice"
                    )));
                }
            }
        }

        if self.run.shards == 0 {
            return Err(ReconError::ConfigValidation("run.shards must be >= 1".into()));
        }
        if self.run.threads == Some(0) {
            return Err(ReconError::ConfigValidation("run.threads must be >= 1".into()));
        }

        delimiter_byte(&self.occurrences.delimiter)?;
        delimiter_byte(&self.checklist.delimiter)?;
        delimiter_byte(&self.output.delimiter)?;

        if self.occurrences.limit == Some(0) || self.checklist.limit == Some(0) {
            return Err(ReconError::ConfigValidation("limit must be > 0".into()));
        }

        Ok(())
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    const MINIMAL: &str = r#"
name = "GBIF to WCVP"

[occurrences]
file = "gbif.tsv"

[checklist]
file = "wcvp.txt"
"#;

    #[test]
    fn parse_minimal_uses_defaults() {
        let config = ReconConfig::from_toml(MINIMAL).unwrap();
        assert_eq!(config.name, "GBIF to WCVP");
        assert!(!config.fail_on_ambiguous);
        assert_eq!(config.occurrences.delimiter, "\t");
        assert_eq!(config.checklist.delimiter, "|");
        assert_eq!(config.occurrences.columns.id, "taxonID");
        assert_eq!(config.checklist.columns.homotypic_synonym, "homotypic_synonym");
        assert_eq!(config.stages, StageConfig::default_sequence());
        assert_eq!(config.run, RunOptions::default());
        assert!(config.output.file.is_none());
    }

    #[test]
    fn default_sequence_is_strict_to_loose() {
        let stages = StageConfig::default_sequence();
        assert_eq!(stages.len(), 3);
        assert_eq!(stages[0].join_columns, vec![JoinColumn::Family, JoinColumn::Genus]);
        assert_eq!(stages[0].checklist_name, ChecklistNameField::NameWithAuthors);
        assert!(stages[2].join_columns.is_empty());
        assert!(stages[2].exclude_homonyms);
    }

    #[test]
    fn parse_explicit_stages_and_sources() {
        let input = r#"
name = "Custom"
fail_on_ambiguous = true

[occurrences]
file = "occ.csv"
delimiter = ","
limit = 100
remove_hybrids = true
[occurrences.columns]
id = "gbif_id"
[[occurrences.filters]]
column = "phylum"
values = ["Tracheophyta"]

[checklist]
file = "names.csv"
delimiter = ","

[[stages]]
source_name = "scientific_name"
checklist_name = "name_with_authors"
join_columns = ["genus"]

[[stages]]
source_name = "comparison_name"
checklist_name = "name_without_authors"
exclude_homonyms = true

[run]
shards = 4
threads = 2

[output]
file = "out.tsv"
summary_json = "summary.json"
"#;
        let config = ReconConfig::from_toml(input).unwrap();
        assert!(config.fail_on_ambiguous);
        assert_eq!(config.occurrences.limit, Some(100));
        assert!(config.occurrences.remove_hybrids);
        assert_eq!(config.occurrences.columns.id, "gbif_id");
        // Unlisted column names keep their defaults.
        assert_eq!(config.occurrences.columns.family, "family");
        assert_eq!(config.occurrences.filters[0].values, vec!["Tracheophyta"]);
        assert_eq!(config.stages.len(), 2);
        assert_eq!(config.stages[0].join_columns, vec![JoinColumn::Genus]);
        assert!(!config.stages[0].exclude_homonyms);
        assert!(config.stages[1].exclude_homonyms);
        assert_eq!(config.run.shards, 4);
        assert_eq!(config.run.threads, Some(2));
        assert_eq!(config.output.file, Some(PathBuf::from("out.tsv")));
    }

    #[test]
    fn reject_empty_stage_list() {
        let input = format!("stages = []\n{MINIMAL}");
        let err = ReconConfig::from_toml(&input).unwrap_err();
        assert!(err.to_string().contains("at least one stage"));
    }

    #[test]
    fn reject_unknown_join_column() {
        let input = format!(
            r#"{MINIMAL}
[[stages]]
source_name = "comparison_name"
checklist_name = "name_without_authors"
join_columns = ["order"]
"#
        );
        let err = ReconConfig::from_toml(&input).unwrap_err();
        assert!(matches!(err, ReconError::ConfigParse(_)));
    }

    #[test]
    fn reject_duplicate_join_column() {
        let input = format!(
            r#"{MINIMAL}
[[stages]]
source_name = "comparison_name"
checklist_name = "name_without_authors"
join_columns = ["family", "family"]
"#
        );
        let err = ReconConfig::from_toml(&input).unwrap_err();
        assert!(err.to_string().contains("listed twice"));
    }

    #[test]
    fn reject_zero_shards() {
        let input = format!("{MINIMAL}\n[run]\nshards = 0\n");
        let err = ReconConfig::from_toml(&input).unwrap_err();
        assert!(err.to_string().contains("run.shards"));
    }

    #[test]
    fn reject_multi_char_delimiter() {
        let input = r#"
name = "Bad"
[occurrences]
file = "a"
delimiter = "||"
[checklist]
file = "b"
"#;
        let err = ReconConfig::from_toml(input).unwrap_err();
        assert!(err.to_string().contains("single ASCII character"));
    }

    #[test]
    fn delimiter_bytes() {
        assert_eq!(delimiter_byte("\t").unwrap(), b'\t');
        assert_eq!(delimiter_byte("|").unwrap(), b'|');
        assert!(delimiter_byte("").is_err());
        assert!(delimiter_byte("×").is_err());
    }
}
