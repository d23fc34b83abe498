//
// models.rs
// Dicom-Deid-rs
//
// Defines serializable data structures for batch reports, per-file failures and extracted tag records.
//
// Thales Matheus Mendonça Santos - November 2025

use std::collections::BTreeMap;
use std::path::PathBuf;

use serde::Serialize;

/// One file that could not be anonymized, with the reason.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FileFailure {
    pub path: PathBuf,
    pub reason: String,
}

/// Everything a batch run did, file by file.
#[derive(Debug, Clone, Default, Serialize)]
pub struct BatchReport {
    pub source: PathBuf,
    pub destination: PathBuf,
    pub processed: usize,
    pub outputs: Vec<PathBuf>,
    pub skipped: Vec<PathBuf>,
    pub removed_stale: Vec<PathBuf>,
    pub failures: Vec<FileFailure>,
    pub cancelled: bool,
}

/// Terminal state of a batch run.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub enum BatchOutcome {
    Completed {
        processed: usize,
    },
    Failed {
        processed: usize,
        failure_count: usize,
        failed_paths: Vec<PathBuf>,
        cancelled: bool,
    },
}

impl BatchReport {
    pub fn outcome(&self) -> BatchOutcome {
        if self.failures.is_empty() && !self.cancelled {
            BatchOutcome::Completed {
                processed: self.processed,
            }
        } else {
            BatchOutcome::Failed {
                processed: self.processed,
                failure_count: self.failures.len(),
                failed_paths: self.failures.iter().map(|f| f.path.clone()).collect(),
                cancelled: self.cancelled,
            }
        }
    }

    pub fn is_completed(&self) -> bool {
        matches!(self.outcome(), BatchOutcome::Completed { .. })
    }
}

/// Identity and classification fields of one file, keyed by dictionary keyword.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TagRecord {
    pub file: PathBuf,
    pub tags: BTreeMap<String, String>,
}
