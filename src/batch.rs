use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use rayon::prelude::*;
use rayon::ThreadPoolBuilder;
use tracing::{debug, info, warn};
use walkdir::WalkDir;

use crate::anonymize::{open_eligible, Anonymizer};
use crate::config::{BatchOptions, CancellationToken};
use crate::error::{DeidError, Result};
use crate::models::{BatchReport, FileFailure};
use crate::output_path::ensure_dir;

/// Paths containing this marker are outputs of an earlier run.
pub const ANONYMIZED_MARKER: &str = "anonymized";
/// Output folder used under the source when no destination is given.
pub const DEFAULT_OUTPUT_DIR: &str = "anonymized";

/// Result of walking a source directory.
#[derive(Debug, Clone, Default)]
pub struct Discovery {
    pub eligible: Vec<PathBuf>,
    pub skipped: Vec<PathBuf>,
    pub removed_stale: Vec<PathBuf>,
}

enum FileResult {
    Written(PathBuf),
    Skipped(PathBuf),
    Failed(FileFailure),
    Cancelled,
}

fn is_stale_output(source: &Path, path: &Path) -> bool {
    let relative = path.strip_prefix(source).unwrap_or(path);
    relative.to_string_lossy().contains(ANONYMIZED_MARKER)
}

/// Walk `source`, delete stale outputs and sort the rest into eligible and skipped files.
pub fn discover(source: &Path) -> Result<Discovery> {
    discover_excluding(source, None)
}

fn discover_excluding(source: &Path, exclude: Option<&Path>) -> Result<Discovery> {
    let (candidates, removed_stale) = collect_candidates(source, exclude)?;
    let mut discovery = Discovery {
        removed_stale,
        ..Discovery::default()
    };

    // Eligibility needs a decode per file, so it runs in parallel.
    let checked: Vec<(PathBuf, bool)> = candidates
        .into_par_iter()
        .map(|path| {
            let eligible = match open_eligible(&path) {
                Ok(_) => true,
                Err(e) => {
                    debug!(path = ?path, reason = %e, "skipping file");
                    false
                }
            };
            (path, eligible)
        })
        .collect();

    for (path, eligible) in checked {
        if eligible {
            discovery.eligible.push(path);
        } else {
            discovery.skipped.push(path);
        }
    }
    discovery.eligible.sort();
    discovery.skipped.sort();

    Ok(discovery)
}

/// Walk `source`, removing stale outputs. Returns the remaining files and the removed ones, both sorted.
fn collect_candidates(
    source: &Path,
    exclude: Option<&Path>,
) -> Result<(Vec<PathBuf>, Vec<PathBuf>)> {
    if !source.is_dir() {
        return Err(DeidError::filesystem(
            source,
            io::Error::new(io::ErrorKind::NotFound, "source is not a directory"),
        ));
    }

    let mut candidates = Vec::new();
    let mut removed_stale = Vec::new();

    for entry in WalkDir::new(source)
        .into_iter()
        .filter_map(|e| e.ok())
        .filter(|e| e.file_type().is_file())
    {
        let path = entry.path();
        let stale = is_stale_output(source, path);
        if !stale && exclude.map_or(false, |dir| path.starts_with(dir)) {
            debug!(path = ?path, "inside destination; not a source file");
            continue;
        }
        if stale {
            match fs::remove_file(path) {
                Ok(()) => debug!(path = ?path, "removed stale output"),
                Err(e) => warn!(path = ?path, error = %e, "could not remove stale output"),
            }
            removed_stale.push(path.to_path_buf());
            continue;
        }
        candidates.push(path.to_path_buf());
    }
    candidates.sort();
    removed_stale.sort();

    Ok((candidates, removed_stale))
}

/// Anonymize every eligible file under `source` into the destination tree.
///
/// Single-file failures are collected in the report; only problems with the
/// source or destination roots abort the run.
pub fn process_directory(
    source: &Path,
    anonymizer: &Anonymizer,
    options: &BatchOptions,
    cancel: &CancellationToken,
) -> Result<BatchReport> {
    let destination = options
        .destination
        .clone()
        .unwrap_or_else(|| source.join(DEFAULT_OUTPUT_DIR));

    info!(source = ?source, destination = ?destination, "processing directory");

    // Eligibility is decided by the same decode that feeds the anonymizer,
    // so each file is read once per run.
    let (candidates, removed_stale) = collect_candidates(source, Some(&destination))?;
    info!(
        candidates = candidates.len(),
        stale = removed_stale.len(),
        "discovery finished"
    );

    ensure_dir(&destination)?;

    let pool = ThreadPoolBuilder::new()
        .num_threads(options.threads.unwrap_or(0))
        .build()
        .map_err(|e| DeidError::InvalidArgument(format!("cannot build worker pool: {}", e)))?;

    let results: Vec<FileResult> = pool.install(|| {
        candidates
            .par_iter()
            .map(|path| {
                if cancel.is_cancelled() {
                    return FileResult::Cancelled;
                }
                let written = open_eligible(path)
                    .and_then(|obj| anonymizer.anonymize_decoded(path, &obj, Some(&destination)));
                match written {
                    Ok(output) => FileResult::Written(output),
                    Err(e) if e.is_unsupported() => {
                        debug!(path = ?path, reason = %e, "skipping file");
                        FileResult::Skipped(path.clone())
                    }
                    Err(e) => {
                        warn!(path = ?path, error = %e, "file was not anonymized");
                        FileResult::Failed(FileFailure {
                            path: path.clone(),
                            reason: e.to_string(),
                        })
                    }
                }
            })
            .collect()
    });

    let mut report = BatchReport {
        source: source.to_path_buf(),
        destination,
        removed_stale,
        ..BatchReport::default()
    };
    for result in results {
        match result {
            FileResult::Written(output) => {
                report.processed += 1;
                report.outputs.push(output);
            }
            FileResult::Skipped(path) => report.skipped.push(path),
            FileResult::Failed(failure) => report.failures.push(failure),
            FileResult::Cancelled => report.cancelled = true,
        }
    }

    info!(
        processed = report.processed,
        failed = report.failures.len(),
        cancelled = report.cancelled,
        "{} files anonymized",
        report.processed
    );
    Ok(report)
}
