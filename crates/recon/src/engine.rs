use std::collections::HashSet;

use tracing::info;

use crate::chase::finalize_accepted;
use crate::config::ReconConfig;
use crate::error::ReconError;
use crate::merge::{compute_summary, merge};
use crate::model::{ReconInput, ReconMeta, ReconResult};
use crate::resolve::resolve;
use crate::stage::run_stages;

/// Run the configured stages over pre-loaded records. Returns one record per
/// surviving occurrence id plus the summary counters.
pub fn run(config: &ReconConfig, input: &ReconInput) -> Result<ReconResult, ReconError> {
    config.validate()?;
    validate_input(input)?;

    match config.run.threads {
        Some(threads) => {
            let pool = rayon::ThreadPoolBuilder::new()
                .num_threads(threads)
                .build()
                .map_err(|e| ReconError::ThreadPool(e.to_string()))?;
            Ok(pool.install(|| execute(config, input)))
        }
        None => Ok(execute(config, input)),
    }
}

fn execute(config: &ReconConfig, input: &ReconInput) -> ReconResult {
    info!(
        occurrences = input.occurrences.len(),
        checklist = input.checklist.len(),
        stages = config.stages.len(),
        "matching names"
    );

    let staged = run_stages(&config.stages, &input.occurrences, &input.checklist, &config.run);

    let mut resolver = resolve(&staged.candidates);
    let withheld = resolver
        .chosen
        .values_mut()
        .map(finalize_accepted)
        .filter(|&w| w)
        .count();

    let mut chosen = std::mem::take(&mut resolver.chosen);
    let records = merge(&input.occurrences, &mut chosen, &resolver.dropped_ids);
    let summary = compute_summary(
        &records,
        &resolver,
        staged.stats,
        staged.orphan_links.len(),
        withheld,
    );

    info!(
        resolved = summary.resolved,
        unmatched = summary.unmatched,
        dropped = summary.dropped_ambiguous_rows,
        "names resolved"
    );

    ReconResult {
        meta: ReconMeta {
            config_name: config.name.clone(),
            engine_version: env!("CARGO_PKG_VERSION").to_string(),
            stage_count: config.stages.len(),
        },
        summary,
        records,
    }
}

/// Reject record sets the engine cannot partition: empty keys or repeated
/// ids on either side.
pub fn validate_input(input: &ReconInput) -> Result<(), ReconError> {
    let mut seen = HashSet::new();
    for (row, occ) in input.occurrences.iter().enumerate() {
        if occ.id.trim().is_empty() {
            return Err(ReconError::malformed("occurrences", format!("row {row}"), "empty id"));
        }
        if !seen.insert(occ.id.as_str()) {
            return Err(ReconError::malformed("occurrences", occ.id.as_str(), "duplicate id"));
        }
    }

    let mut seen = HashSet::new();
    for (row, entry) in input.checklist.iter().enumerate() {
        if entry.plant_name_id.trim().is_empty() {
            return Err(ReconError::malformed(
                "checklist",
                format!("row {row}"),
                "empty plant_name_id",
            ));
        }
        if !seen.insert(entry.plant_name_id.as_str()) {
            return Err(ReconError::malformed(
                "checklist",
                entry.plant_name_id.as_str(),
                "duplicate plant_name_id",
            ));
        }
    }

    Ok(())
}
