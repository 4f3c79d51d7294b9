//! Delimited-text loaders for the two record sets.

use std::fs::File;
use std::io::{BufReader, Read};
use std::path::Path;

use tracing::info;

use crate::config::{delimiter_byte, ChecklistSource, OccurrenceSource, ReconConfig};
use crate::error::ReconError;
use crate::model::{ChecklistEntry, OccurrenceName, ReconInput, TaxonStatus};

const HYBRID_SIGN: char = '\u{00D7}';

fn reader_for<R: Read>(reader: R, delimiter: &str) -> Result<csv::Reader<R>, ReconError> {
    Ok(csv::ReaderBuilder::new()
        .has_headers(true)
        .delimiter(delimiter_byte(delimiter)?)
        .from_reader(reader))
}

fn headers<R: Read>(reader: &mut csv::Reader<R>, dataset: &str) -> Result<Vec<String>, ReconError> {
    Ok(reader
        .headers()
        .map_err(|e| csv_err(dataset, e))?
        .iter()
        .map(|h| h.to_string())
        .collect())
}

fn csv_err(dataset: &str, e: csv::Error) -> ReconError {
    ReconError::Csv {
        dataset: dataset.into(),
        message: e.to_string(),
    }
}

fn non_empty(value: &str) -> Option<String> {
    let value = value.trim();
    (!value.is_empty()).then(|| value.to_string())
}

/// Load occurrence names, applying row filters, hybrid removal and limit.
pub fn load_occurrences<R: Read>(
    reader: R,
    source: &OccurrenceSource,
) -> Result<Vec<OccurrenceName>, ReconError> {
    const DATASET: &str = "occurrences";
    let mut reader = reader_for(reader, &source.delimiter)?;
    let headers = headers(&mut reader, DATASET)?;

    let idx = |name: &str| -> Result<usize, ReconError> {
        headers
            .iter()
            .position(|h| h == name)
            .ok_or_else(|| ReconError::MissingColumn {
                dataset: DATASET.into(),
                column: name.into(),
            })
    };

    let col = &source.columns;
    let id_idx = idx(&col.id)?;
    let scientific_idx = idx(&col.scientific_name)?;
    let generic_idx = idx(&col.generic_name)?;
    let epithet_idx = idx(&col.specific_epithet)?;
    let family_idx = idx(&col.family)?;
    let genus_idx = idx(&col.genus)?;

    let filters = source
        .filters
        .iter()
        .map(|f| Ok((idx(&f.column)?, &f.values)))
        .collect::<Result<Vec<_>, ReconError>>()?;

    let mut rows = Vec::new();
    let mut read = 0usize;

    for record in reader.records() {
        if source.limit.is_some_and(|limit| read >= limit) {
            break;
        }
        let record = record.map_err(|e| csv_err(DATASET, e))?;
        read += 1;

        let field = |i: usize| record.get(i).unwrap_or("");

        if !filters
            .iter()
            .all(|(fi, values)| values.iter().any(|v| v == field(*fi)))
        {
            continue;
        }

        let scientific_name = field(scientific_idx);
        if source.remove_hybrids && scientific_name.contains(HYBRID_SIGN) {
            continue;
        }

        rows.push(OccurrenceName::new(
            field(id_idx).trim(),
            scientific_name,
            field(generic_idx),
            field(epithet_idx),
            field(family_idx),
            field(genus_idx),
        ));
    }

    info!(read, kept = rows.len(), "read occurrence rows");
    Ok(rows)
}

/// Load checklist entries. A non-empty homotypic-synonym marker promotes the
/// row's status to `HomotypicSynonym`.
pub fn load_checklist<R: Read>(
    reader: R,
    source: &ChecklistSource,
) -> Result<Vec<ChecklistEntry>, ReconError> {
    const DATASET: &str = "checklist";
    let mut reader = reader_for(reader, &source.delimiter)?;
    let headers = headers(&mut reader, DATASET)?;

    let find = |name: &str| headers.iter().position(|h| h == name);
    let idx = |name: &str| -> Result<usize, ReconError> {
        find(name).ok_or_else(|| ReconError::MissingColumn {
            dataset: DATASET.into(),
            column: name.into(),
        })
    };

    let col = &source.columns;
    let id_idx = idx(&col.plant_name_id)?;
    let name_idx = idx(&col.taxon_name)?;
    let authors_idx = idx(&col.taxon_authors)?;
    let rank_idx = idx(&col.taxon_rank)?;
    let status_idx = idx(&col.taxon_status)?;
    let accepted_idx = idx(&col.accepted_plant_name_id)?;
    let family_idx = idx(&col.family)?;
    let genus_idx = idx(&col.genus)?;
    let homotypic_idx = find(&col.homotypic_synonym);

    let mut entries = Vec::new();

    for record in reader.records() {
        if source.limit.is_some_and(|limit| entries.len() >= limit) {
            break;
        }
        let record = record.map_err(|e| csv_err(DATASET, e))?;
        let field = |i: usize| record.get(i).unwrap_or("");

        let homotypic = homotypic_idx.is_some_and(|i| !field(i).trim().is_empty());
        let taxon_status = if homotypic {
            TaxonStatus::HomotypicSynonym
        } else {
            TaxonStatus::parse(field(status_idx))
        };

        entries.push(ChecklistEntry {
            plant_name_id: field(id_idx).trim().to_string(),
            taxon_name: field(name_idx).to_string(),
            taxon_authors: field(authors_idx).to_string(),
            taxon_rank: field(rank_idx).to_string(),
            taxon_status,
            accepted_plant_name_id: non_empty(field(accepted_idx)),
            family: field(family_idx).to_string(),
            genus: field(genus_idx).to_string(),
        });
    }

    info!(entries = entries.len(), "read checklist rows");
    Ok(entries)
}

fn open(base_dir: &Path, file: &Path) -> Result<BufReader<File>, ReconError> {
    let path = base_dir.join(file);
    File::open(&path)
        .map(BufReader::new)
        .map_err(|e| ReconError::Io(format!("cannot read {}: {e}", path.display())))
}

/// Load both record sets named by `config`, resolving paths against
/// `base_dir` (normally the config file's directory).
pub fn load_input(config: &ReconConfig, base_dir: &Path) -> Result<ReconInput, ReconError> {
    let occurrences = load_occurrences(open(base_dir, &config.occurrences.file)?, &config.occurrences)?;
    let checklist = load_checklist(open(base_dir, &config.checklist.file)?, &config.checklist)?;
    Ok(ReconInput {
        occurrences,
        checklist,
    })
}
