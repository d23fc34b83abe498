//
// lib.rs
// Dicom-Deid-rs
//
// Exposes the crate's modules and re-exports the main entry points for both binary and library consumers.
//
// Thales Matheus Mendonça Santos - November 2025

// Public surface of the library: the engine modules, the report types and the CLI glue.
pub mod anonymize;
pub mod batch;
pub mod cli;
pub mod config;
pub mod error;
pub mod extract;
pub mod logging;
pub mod models;
pub mod output_path;
pub mod pseudonym;
pub mod tag_access;

pub use anonymize::{Anonymizer, CLEAR_TAGS};
pub use cli::{run as run_cli, Cli, Commands};
pub use config::{AnonymizerConfig, BatchOptions, CancellationToken};
pub use error::{DeidError, Result};
pub use models::{BatchOutcome, BatchReport};
pub use output_path::OutputPathPlanner;
