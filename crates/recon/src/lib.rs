//! `taxalink-recon`: staged reconciliation of occurrence taxon names
//! against a reference checklist.
//!
//! Pure engine crate: receives pre-loaded records, returns one resolved
//! record per occurrence id plus statistics. The `ingest` module reads the
//! delimited source files; everything else works on in-memory records.

pub mod chase;
pub mod config;
pub mod engine;
pub mod error;
pub mod index;
pub mod ingest;
pub mod merge;
pub mod model;
pub mod normalize;
pub mod resolve;
pub mod stage;

pub use config::{ReconConfig, RunOptions, StageConfig};
pub use engine::run;
pub use error::ReconError;
pub use model::{
    ChecklistEntry, OccurrenceName, ReconInput, ReconResult, ResolvedRecord, TaxonStatus,
};
