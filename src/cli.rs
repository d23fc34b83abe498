//
// cli.rs
// Dicom-Deid-rs
//
// Defines the CLI surface with Clap and dispatches user-selected commands to the corresponding modules.
//
// Thales Matheus Mendonça Santos - November 2025

use std::path::PathBuf;

use anyhow::{bail, Context};
use chrono::NaiveDate;
use clap::{ArgAction, Parser, Subcommand};

use crate::anonymize::Anonymizer;
use crate::config::{AnonymizerConfig, BatchOptions, CancellationToken};
use crate::models::BatchOutcome;
use crate::{batch, extract, logging};

/// Command-line interface glue code: defines the available verbs and dispatches to modules.
#[derive(Parser)]
#[command(name = "dicom-deid")]
#[command(about = "Deterministic DICOM pseudonymization", long_about = None)]
pub struct Cli {
    /// Increase log verbosity (-v info, -vv debug, -vvv trace)
    #[arg(short, long, global = true, action = ArgAction::Count)]
    pub verbose: u8,

    /// Station name written into outputs (defaults to the host name)
    #[arg(long, global = true, env = "DEID_STATION_NAME")]
    pub station_name: Option<String>,

    /// Date (YYYY-MM-DD) used for non-numeric serial numbers instead of today
    #[arg(long, global = true)]
    pub fallback_date: Option<NaiveDate>,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Anonymize a single DICOM file
    Anonymize {
        input: PathBuf,
        /// Destination directory; omitted means `<name>_anonymized.<ext>` beside the input
        #[arg(short, long)]
        output: Option<PathBuf>,
    },
    /// Anonymize every eligible file under a directory
    Batch {
        #[arg(short, long)]
        directory: PathBuf,
        /// Destination root; defaults to `<directory>/anonymized`
        #[arg(short, long)]
        output: Option<PathBuf>,
        /// Worker threads (defaults to available parallelism)
        #[arg(long)]
        threads: Option<usize>,
        /// Print the report as JSON
        #[arg(long)]
        json: bool,
    },
    /// Report identity and classification tags of eligible files
    Tags {
        #[arg(required = true)]
        files: Vec<PathBuf>,
        #[arg(long)]
        json: bool,
    },
}

impl Cli {
    fn anonymizer_config(&self) -> AnonymizerConfig {
        let config = match &self.station_name {
            Some(name) => AnonymizerConfig::new(name.as_str()),
            None => AnonymizerConfig::from_host(),
        };
        match self.fallback_date {
            Some(date) => config.with_fallback_date(date),
            None => config,
        }
    }
}

pub fn run() -> anyhow::Result<()> {
    // Parse the raw CLI arguments once and dispatch to a subcommand handler.
    let cli = Cli::parse();
    logging::init(cli.verbose)?;
    let anonymizer = Anonymizer::new(cli.anonymizer_config());

    match cli.command {
        Commands::Anonymize { input, output } => {
            let written = anonymizer
                .anonymize_file(&input, output.as_deref())
                .with_context(|| format!("Failed to anonymize {}", input.display()))?;
            println!("Anonymized file saved to {}", written.display());
        }
        Commands::Batch {
            directory,
            output,
            threads,
            json,
        } => {
            let options = BatchOptions {
                destination: output,
                threads,
            };
            let report = batch::process_directory(
                &directory,
                &anonymizer,
                &options,
                &CancellationToken::new(),
            )
            .with_context(|| format!("Failed to process {}", directory.display()))?;

            if json {
                println!("{}", serde_json::to_string_pretty(&report)?);
            } else {
                println!("{} files anonymized.", report.processed);
                println!("{} files skipped.", report.skipped.len());
                for failure in &report.failures {
                    println!("<{}> was not anonymized: {}", failure.path.display(), failure.reason);
                }
            }

            if let BatchOutcome::Failed { failure_count, .. } = report.outcome() {
                bail!("{} of {} files failed", failure_count, report.processed + failure_count);
            }
        }
        Commands::Tags { files, json } => {
            let records = extract::extract_tags(&files);
            if json {
                println!("{}", serde_json::to_string_pretty(&records)?);
            } else {
                extract::print_records(&records);
            }
        }
    }

    Ok(())
}
