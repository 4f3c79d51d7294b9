//! Output writers for `taxalink run`: resolved table, summary JSON and the
//! markdown report.

use std::fmt::Write as _;
use std::io::Write;
use std::path::Path;

use taxalink_recon::config::{delimiter_byte, StageConfig};
use taxalink_recon::model::{ReconResult, ResolvedRecord};

use crate::exit_codes::{EXIT_ERROR, EXIT_RUNTIME};
use crate::CliError;

/// Write one delimited row per record, header first. Absent match fields
/// become empty cells.
pub fn write_resolved_table<W: Write>(
    writer: W,
    records: &[ResolvedRecord],
    delimiter: u8,
) -> Result<(), csv::Error> {
    let mut wtr = csv::WriterBuilder::new()
        .delimiter(delimiter)
        .has_headers(true)
        .from_writer(writer);
    for record in records {
        wtr.serialize(record.to_row())?;
    }
    wtr.flush()?;
    Ok(())
}

/// Share of occurrence rows that ended with an accepted name.
fn accepted_share(result: &ReconResult) -> (usize, usize, f64) {
    let with_accepted = result
        .records
        .iter()
        .filter(|r| r.accepted_id().is_some())
        .count();
    let total = result.summary.total_occurrences;
    let pct = if total == 0 {
        0.0
    } else {
        with_accepted as f64 * 100.0 / total as f64
    };
    (with_accepted, total, pct)
}

/// Headline sentence used in the report and the stderr summary.
pub fn headline(result: &ReconResult) -> String {
    let (n, total, pct) = accepted_share(result);
    format!("{pct:.2}% of occurrence names resolved to an accepted name ({n} of {total})")
}

fn describe_stage(stage: &StageConfig) -> (String, String) {
    let names = format!(
        "{} = {}",
        stage.source_name.as_str(),
        stage.checklist_name.as_str()
    );
    let join = if stage.join_columns.is_empty() {
        "none".to_string()
    } else {
        stage
            .join_columns
            .iter()
            .map(|c| c.to_string())
            .collect::<Vec<_>>()
            .join(", ")
    };
    (names, join)
}

/// Markdown report: headline, per-stage table, resolver counters.
pub fn render_report(result: &ReconResult, stages: &[StageConfig]) -> String {
    let s = &result.summary;
    let mut out = String::new();

    let _ = writeln!(out, "# {}", result.meta.config_name);
    let _ = writeln!(out);
    let _ = writeln!(out, "{}", headline(result));
    let _ = writeln!(out);
    let _ = writeln!(
        out,
        "| Stage | Names | Join | Eligible | Homonyms held back | Matched ids | Multiple matches |"
    );
    let _ = writeln!(out, "|---|---|---|---|---|---|---|");
    for stats in &s.stages {
        let (names, join) = stages
            .get(stats.index)
            .map(describe_stage)
            .unwrap_or_default();
        let _ = writeln!(
            out,
            "| {} | {} | {} | {} | {} | {} | {} |",
            stats.index,
            names,
            join,
            stats.eligible,
            stats.homonyms_excluded,
            stats.matched_ids,
            stats.multiple_match_ids,
        );
    }

    let _ = writeln!(out);
    let _ = writeln!(out, "- resolved: {}", s.resolved);
    let _ = writeln!(out, "- unmatched: {}", s.unmatched);
    let _ = writeln!(
        out,
        "- dropped as ambiguous: {} rows ({} names)",
        s.dropped_ambiguous_rows, s.dropped_ambiguous_names
    );
    let _ = writeln!(out, "- dangling accepted links: {}", s.orphan_accepted_links);
    let _ = writeln!(out, "- accepted name withheld: {}", s.accepted_links_withheld);
    if !s.tie_breaks.is_empty() {
        let rules = s
            .tie_breaks
            .iter()
            .map(|(rule, n)| format!("{rule} {n}"))
            .collect::<Vec<_>>()
            .join(", ");
        let _ = writeln!(out, "- decided by: {rules}");
    }
    out
}

// ── File outputs ────────────────────────────────────────────────────

pub fn write_table_file(path: &Path, records: &[ResolvedRecord], delimiter: &str) -> Result<(), CliError> {
    let delimiter = delimiter_byte(delimiter).map_err(|e| CliError::config(e.to_string()))?;
    let file = std::fs::File::create(path)
        .map_err(|e| CliError::new(EXIT_RUNTIME, format!("cannot write {}: {e}", path.display())))?;
    write_resolved_table(std::io::BufWriter::new(file), records, delimiter)
        .map_err(|e| CliError::new(EXIT_RUNTIME, format!("cannot write {}: {e}", path.display())))
}

pub fn summary_json(result: &ReconResult) -> Result<String, CliError> {
    result
        .summary_json()
        .map_err(|e| CliError::new(EXIT_ERROR, format!("JSON serialization error: {e}")))
}

pub fn write_text_file(path: &Path, contents: &str) -> Result<(), CliError> {
    std::fs::write(path, contents)
        .map_err(|e| CliError::new(EXIT_RUNTIME, format!("cannot write {}: {e}", path.display())))
}
