//! `taxalink run` and `taxalink validate`: config-driven name resolution.

use std::path::{Path, PathBuf};

use taxalink_recon::ingest::load_input;
use taxalink_recon::model::ReconResult;
use taxalink_recon::ReconConfig;
use tracing::info;

use crate::exit_codes::{exit_code_for, EXIT_AMBIGUOUS, EXIT_RUNTIME};
use crate::export;
use crate::CliError;

/// Options for `taxalink run`, gathered from the command line.
#[derive(Debug, Default)]
pub struct RunArgs {
    pub config: PathBuf,
    pub json: bool,
    pub output: Option<PathBuf>,
    pub summary: Option<PathBuf>,
    pub report: Option<PathBuf>,
    pub limit: Option<usize>,
    pub shards: Option<usize>,
    pub threads: Option<usize>,
}

fn read_config(path: &Path) -> Result<ReconConfig, CliError> {
    let config_str = std::fs::read_to_string(path).map_err(|e| {
        CliError::new(EXIT_RUNTIME, format!("cannot read config {}: {e}", path.display()))
    })?;
    ReconConfig::from_toml(&config_str).map_err(CliError::engine)
}

/// Directory the config's relative paths are resolved against.
fn base_dir(config_path: &Path) -> &Path {
    config_path
        .parent()
        .filter(|p| !p.as_os_str().is_empty())
        .unwrap_or_else(|| Path::new("."))
}

/// Resolve an output path from the config against the config directory;
/// paths given on the command line are taken as-is.
fn config_relative(base: &Path, path: &Path) -> PathBuf {
    if path.is_absolute() {
        path.to_path_buf()
    } else {
        base.join(path)
    }
}

pub fn cmd_run(args: RunArgs) -> Result<(), CliError> {
    let mut config = read_config(&args.config)?;

    if let Some(limit) = args.limit {
        config.occurrences.limit = Some(limit);
    }
    if let Some(shards) = args.shards {
        config.run.shards = shards;
    }
    if args.threads.is_some() {
        config.run.threads = args.threads;
    }
    config.validate().map_err(CliError::engine)?;

    let base = base_dir(&args.config);
    let input = load_input(&config, base).map_err(CliError::engine)?;
    let result = taxalink_recon::run(&config, &input).map_err(CliError::engine)?;

    write_outputs(&config, base, &args, &result)?;
    print_summary(&result);

    if config.fail_on_ambiguous && result.summary.dropped_ambiguous_names > 0 {
        return Err(CliError::new(
            EXIT_AMBIGUOUS,
            format!(
                "{} ambiguous name(s) dropped (fail_on_ambiguous)",
                result.summary.dropped_ambiguous_names
            ),
        )
        .with_hint("run with --verbose to list the dropped names"));
    }

    Ok(())
}

fn write_outputs(
    config: &ReconConfig,
    base: &Path,
    args: &RunArgs,
    result: &ReconResult,
) -> Result<(), CliError> {
    let table = args
        .output
        .clone()
        .or_else(|| config.output.file.as_deref().map(|p| config_relative(base, p)));
    if let Some(path) = table {
        export::write_table_file(&path, &result.records, &config.output.delimiter)?;
        info!(path = %path.display(), rows = result.records.len(), "wrote resolved table");
    }

    let summary_path = args
        .summary
        .clone()
        .or_else(|| config.output.summary_json.as_deref().map(|p| config_relative(base, p)));
    if summary_path.is_some() || args.json {
        let json_str = export::summary_json(result)?;
        if let Some(path) = summary_path {
            export::write_text_file(&path, &json_str)?;
            info!(path = %path.display(), "wrote summary");
        }
        if args.json {
            println!("{json_str}");
        }
    }

    let report_path = args
        .report
        .clone()
        .or_else(|| config.output.report_md.as_deref().map(|p| config_relative(base, p)));
    if let Some(path) = report_path {
        export::write_text_file(&path, &export::render_report(result, &config.stages))?;
        info!(path = %path.display(), "wrote report");
    }

    Ok(())
}

/// Human summary to stderr.
fn print_summary(result: &ReconResult) {
    let s = &result.summary;
    eprintln!(
        "{}: {} occurrence rows, {} resolved, {} unmatched, {} dropped as ambiguous",
        result.meta.config_name,
        s.total_occurrences,
        s.resolved,
        s.unmatched,
        s.dropped_ambiguous_rows,
    );
    eprintln!("{}", export::headline(result));
}

pub fn cmd_validate(config_path: PathBuf) -> Result<(), CliError> {
    let config = read_config(&config_path)?;
    eprintln!(
        "valid: '{}' with {} stage(s), occurrences {}, checklist {}",
        config.name,
        config.stages.len(),
        config.occurrences.file.display(),
        config.checklist.file.display(),
    );
    Ok(())
}

impl CliError {
    /// Engine failure with its registry exit code.
    pub fn engine(err: taxalink_recon::ReconError) -> Self {
        Self::new(exit_code_for(&err), err.to_string())
    }
}
