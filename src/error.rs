//
// error.rs
// Dicom-Deid-rs
//
// Error taxonomy shared by the tag accessor, the anonymizer, the path planner and the batch runner.
//
// Thales Matheus Mendonça Santos - November 2025

use std::path::{Path, PathBuf};

use thiserror::Error;

#[derive(Error, Debug)]
pub enum DeidError {
    /// Malformed call parameters; never silently corrected.
    #[error("Invalid argument: {0}")]
    InvalidArgument(String),

    /// A tag value could not be turned into the identifier it should produce.
    #[error("Invalid value for {tag}: {reason}")]
    InvalidValue { tag: String, reason: String },

    /// The file decodes as something this engine does not handle.
    #[error("Unsupported input {path:?}: {reason}")]
    UnsupportedInput { path: PathBuf, reason: String },

    #[error("Filesystem error at {path:?}: {source}")]
    Filesystem {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("DICOM codec error for {path:?}: {reason}")]
    Codec { path: PathBuf, reason: String },
}

impl DeidError {
    pub(crate) fn filesystem(path: impl AsRef<Path>, source: std::io::Error) -> Self {
        DeidError::Filesystem {
            path: path.as_ref().to_path_buf(),
            source,
        }
    }

    pub(crate) fn unsupported(path: impl AsRef<Path>, reason: impl Into<String>) -> Self {
        DeidError::UnsupportedInput {
            path: path.as_ref().to_path_buf(),
            reason: reason.into(),
        }
    }

    pub(crate) fn codec(path: impl AsRef<Path>, reason: impl ToString) -> Self {
        DeidError::Codec {
            path: path.as_ref().to_path_buf(),
            reason: reason.to_string(),
        }
    }

    /// Unsupported input is a skip at the directory level, not a failure.
    pub fn is_unsupported(&self) -> bool {
        matches!(self, DeidError::UnsupportedInput { .. })
    }
}

pub type Result<T, E = DeidError> = std::result::Result<T, E>;
