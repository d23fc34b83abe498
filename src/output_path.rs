//
// output_path.rs
// Dicom-Deid-rs
//
// Builds the PID/Accession/Series/Modality_ImageType_Instance layout for anonymized outputs and creates its folders.
//
// Thales Matheus Mendonça Santos - November 2025

use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use serde::Serialize;
use tracing::warn;

use crate::anonymize::{
    image_type_components, ACCESSION_NUMBER, IMAGE_TYPE, INSTANCE_NUMBER, MODALITY, PATIENT_ID,
    SERIES_INSTANCE_UID, SUFFIX_LEN,
};
use crate::error::{DeidError, Result};
use crate::pseudonym::tail;
use crate::tag_access::{get_one, Dataset};

pub const DEFAULT_EXTENSION: &str = "dcm";
const UNKNOWN: &str = "UNK";

/// Path pieces read from an anonymized dataset, already made filesystem-safe.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct OutputComponents {
    pub patient_id: String,
    pub accession: String,
    pub series: String,
    pub modality: String,
    pub image_type: String,
    pub instance_number: u32,
}

impl OutputComponents {
    pub fn from_dataset(dataset: &Dataset) -> Self {
        let image_type_value = get_one(dataset, IMAGE_TYPE);
        let image_type = image_type_components(&image_type_value)
            .get(2)
            .copied()
            .unwrap_or(UNKNOWN)
            .to_string();

        let instance_raw = get_one(dataset, INSTANCE_NUMBER);
        let instance_number = match instance_raw.trim().parse::<u32>() {
            Ok(n) => n,
            Err(_) => {
                warn!(value = %instance_raw, "InstanceNumber is not a non-negative integer; using 0");
                0
            }
        };

        OutputComponents {
            patient_id: sanitize_component(&get_one(dataset, PATIENT_ID)),
            accession: sanitize_component(tail(&get_one(dataset, ACCESSION_NUMBER), SUFFIX_LEN)),
            series: sanitize_component(tail(&get_one(dataset, SERIES_INSTANCE_UID), SUFFIX_LEN)),
            modality: sanitize_component(&get_one(dataset, MODALITY)),
            image_type: sanitize_component(&image_type),
            instance_number,
        }
    }

    pub fn file_name(&self, extension: &str) -> String {
        let extension = sanitize_filename(extension);
        let extension = if extension.is_empty() {
            DEFAULT_EXTENSION.to_string()
        } else {
            extension
        };
        format!(
            "{}_{}_{:05}.{}",
            self.modality, self.image_type, self.instance_number, extension
        )
    }
}

/// Derives where an anonymized dataset is written under a destination root.
#[derive(Debug, Clone)]
pub struct OutputPathPlanner {
    root: PathBuf,
}

impl OutputPathPlanner {
    pub fn new(root: impl AsRef<Path>) -> Self {
        Self {
            root: root.as_ref().to_path_buf(),
        }
    }

    /// `root/PID/Accession/Series/Modality_ImageType_Instance.ext`
    pub fn plan(&self, dataset: &Dataset, extension: &str) -> PathBuf {
        let parts = OutputComponents::from_dataset(dataset);
        self.root
            .join(&parts.patient_id)
            .join(&parts.accession)
            .join(&parts.series)
            .join(parts.file_name(extension))
    }
}

/// Create `path` and its parents; a directory created concurrently by someone else counts as success.
pub fn ensure_dir(path: &Path) -> Result<()> {
    match fs::create_dir_all(path) {
        Ok(()) => Ok(()),
        Err(e) if e.kind() == io::ErrorKind::AlreadyExists && path.is_dir() => Ok(()),
        Err(e) => Err(DeidError::filesystem(path, e)),
    }
}

fn sanitize_component(input: &str) -> String {
    let cleaned = sanitize_filename(input);
    if cleaned.is_empty() {
        UNKNOWN.to_string()
    } else {
        cleaned
    }
}

fn sanitize_filename(input: &str) -> String {
    // Keep only ASCII word characters and a few safe separators to avoid filesystem surprises.
    input
        .chars()
        .filter(|c| c.is_ascii_alphanumeric() || *c == '-' || *c == '_')
        .collect()
}
