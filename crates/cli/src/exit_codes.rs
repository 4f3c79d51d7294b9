//! CLI Exit Code Registry
//!
//! This is the single source of truth for all CLI exit codes.
//! Exit codes are part of the shell contract; scripts rely on them.
//!
//! # Exit Code Ranges
//!
//! | Code | Domain    | Description                                       |
//! |------|-----------|---------------------------------------------------|
//! | 0    | Universal | Success                                           |
//! | 1    | Universal | General error (unspecified)                       |
//! | 2    | Universal | CLI usage error (bad args)                        |
//! | 3    | run       | Invalid run configuration                         |
//! | 4    | run       | Runtime / IO failure (unreadable or unwritable)   |
//! | 5    | run       | Malformed input records                           |
//! | 6    | run       | Ambiguous names dropped with `fail_on_ambiguous`  |
//!
//! # Adding New Exit Codes
//!
//! 1. Add the constant in the appropriate range
//! 2. Document what triggers it
//! 3. Update the table above
//! 4. Wire it into `exit_code_for` or the relevant command

use taxalink_recon::ReconError;

// =============================================================================
// Universal (0-2)
// =============================================================================

/// Success - command completed without errors.
pub const EXIT_SUCCESS: u8 = 0;

/// General error - unspecified failure.
/// Avoid using this; prefer a specific error code.
pub const EXIT_ERROR: u8 = 1;

/// Usage error - bad arguments, missing required options.
pub const EXIT_USAGE: u8 = 2;

// =============================================================================
// Run (3-9)
// =============================================================================

/// Config could not be parsed or failed validation.
pub const EXIT_INVALID_CONFIG: u8 = 3;

/// Input or output file could not be read or written, or the worker pool
/// could not start.
pub const EXIT_RUNTIME: u8 = 4;

/// Input records are unusable: missing column, empty or duplicate id,
/// unparseable delimited row.
pub const EXIT_MALFORMED_INPUT: u8 = 5;

/// The run completed but at least one name stayed ambiguous and the config
/// sets `fail_on_ambiguous`. Outputs are still written.
pub const EXIT_AMBIGUOUS: u8 = 6;

// =============================================================================
// Engine Error Types
// =============================================================================

/// Map an engine error to its exit code.
pub fn exit_code_for(err: &ReconError) -> u8 {
    match err {
        ReconError::ConfigParse(_) | ReconError::ConfigValidation(_) => EXIT_INVALID_CONFIG,
        ReconError::MissingColumn { .. }
        | ReconError::MalformedInput { .. }
        | ReconError::Csv { .. } => EXIT_MALFORMED_INPUT,
        ReconError::Io(_) | ReconError::ThreadPool(_) => EXIT_RUNTIME,
        ReconError::Json(_) => EXIT_ERROR,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn codes_are_distinct() {
        let codes = [
            EXIT_SUCCESS,
            EXIT_ERROR,
            EXIT_USAGE,
            EXIT_INVALID_CONFIG,
            EXIT_RUNTIME,
            EXIT_MALFORMED_INPUT,
            EXIT_AMBIGUOUS,
        ];
        let unique: std::collections::BTreeSet<_> = codes.iter().collect();
        assert_eq!(unique.len(), codes.len());
    }

    #[test]
    fn engine_errors_map_to_run_range() {
        assert_eq!(
            exit_code_for(&ReconError::ConfigValidation("no stages".into())),
            EXIT_INVALID_CONFIG
        );
        assert_eq!(
            exit_code_for(&ReconError::MissingColumn {
                dataset: "occurrences".into(),
                column: "taxonID".into(),
            }),
            EXIT_MALFORMED_INPUT
        );
        assert_eq!(exit_code_for(&ReconError::Io("gone".into())), EXIT_RUNTIME);
    }
}
