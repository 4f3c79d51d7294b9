// taxalink CLI - resolve occurrence taxon names against a reference checklist

mod exit_codes;
mod export;
mod logging;
mod recon;

use std::path::PathBuf;
use std::process::ExitCode;

use clap::{Parser, Subcommand};

use exit_codes::{EXIT_INVALID_CONFIG, EXIT_SUCCESS};

#[derive(Parser)]
#[command(name = "taxalink")]
#[command(about = "Staged exact-match resolution of occurrence taxon names against a checklist")]
#[command(long_version = long_version())]
#[command(version)]
struct Cli {
    /// Debug-level logging (overridden by RUST_LOG)
    #[arg(long, short = 'v', global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run the configured match stages and write the outputs
    #[command(after_help = "\
Examples:
  taxalink run gbif-wcvp.recon.toml
  taxalink run gbif-wcvp.recon.toml --json
  taxalink run gbif-wcvp.recon.toml --output resolved.tsv --report summary.md
  taxalink run gbif-wcvp.recon.toml --limit 5000 --shards 8 --threads 4

Exit codes:
  0  success
  3  invalid config
  4  file could not be read or written
  5  malformed input records
  6  ambiguous names dropped while fail_on_ambiguous = true")]
    Run {
        /// Path to the .recon.toml config file
        config: PathBuf,

        /// Print the summary JSON to stdout
        #[arg(long)]
        json: bool,

        /// Write the resolved table here (overrides [output].file)
        #[arg(long, short = 'o')]
        output: Option<PathBuf>,

        /// Write the summary JSON here (overrides [output].summary_json)
        #[arg(long)]
        summary: Option<PathBuf>,

        /// Write the markdown report here (overrides [output].report_md)
        #[arg(long)]
        report: Option<PathBuf>,

        /// Read at most N occurrence rows (overrides [occurrences].limit)
        #[arg(long)]
        limit: Option<usize>,

        /// Index shards (overrides [run].shards)
        #[arg(long)]
        shards: Option<usize>,

        /// Worker threads (overrides [run].threads)
        #[arg(long, env = "TAXALINK_THREADS")]
        threads: Option<usize>,
    },

    /// Parse and validate a config without running
    #[command(after_help = "\
Examples:
  taxalink validate gbif-wcvp.recon.toml")]
    Validate {
        /// Path to the .recon.toml config file
        config: PathBuf,
    },

    /// Print the comparison name built from a generic name and epithet
    #[command(after_help = "\
Examples:
  taxalink normalize Hieracium schmidtiï
  # Hieracium schmidtii")]
    Normalize {
        /// Generic name (genus part)
        generic: String,

        /// Specific epithet
        epithet: String,
    },
}

fn main() -> ExitCode {
    let cli = Cli::parse();
    logging::init(cli.verbose);

    let result = match cli.command {
        Commands::Run {
            config,
            json,
            output,
            summary,
            report,
            limit,
            shards,
            threads,
        } => recon::cmd_run(recon::RunArgs {
            config,
            json,
            output,
            summary,
            report,
            limit,
            shards,
            threads,
        }),
        Commands::Validate { config } => recon::cmd_validate(config),
        Commands::Normalize { generic, epithet } => cmd_normalize(&generic, &epithet),
    };

    match result {
        Ok(()) => ExitCode::from(EXIT_SUCCESS),
        Err(CliError { code, message, hint }) => {
            if !message.is_empty() {
                eprintln!("error: {}", message);
            }
            if let Some(hint) = hint {
                eprintln!("hint:  {}", hint);
            }
            ExitCode::from(code)
        }
    }
}

fn cmd_normalize(generic: &str, epithet: &str) -> Result<(), CliError> {
    println!("{}", taxalink_recon::normalize::comparison_name(generic, epithet));
    Ok(())
}

fn long_version() -> &'static str {
    if cfg!(debug_assertions) {
        concat!(
            env!("CARGO_PKG_VERSION"),
            "\nengine:  taxalink-recon ", env!("CARGO_PKG_VERSION"),
            "\nbuild:   debug",
        )
    } else {
        concat!(
            env!("CARGO_PKG_VERSION"),
            "\nengine:  taxalink-recon ", env!("CARGO_PKG_VERSION"),
            "\nbuild:   release",
        )
    }
}

#[derive(Debug)]
pub struct CliError {
    pub code: u8,
    pub message: String,
    pub hint: Option<String>,
}

impl CliError {
    pub fn new(code: u8, msg: impl Into<String>) -> Self {
        Self { code, message: msg.into(), hint: None }
    }

    pub fn config(msg: impl Into<String>) -> Self {
        Self::new(EXIT_INVALID_CONFIG, msg)
    }

    /// Add a hint to an existing error.
    pub fn with_hint(mut self, hint: impl Into<String>) -> Self {
        self.hint = Some(hint.into());
        self
    }
}
