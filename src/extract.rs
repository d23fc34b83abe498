use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use dicom::core::dictionary::DataDictionary;
use dicom::core::Tag;
use dicom::dictionary_std::StandardDataDictionary;
use rayon::prelude::*;
use tracing::debug;

use crate::anonymize::{
    open_eligible, ACCESSION_NUMBER, ACQUISITION_DATE, CONTENT_DATE, IMAGE_TYPE,
    INSTANCE_CREATION_DATE, INSTANCE_NUMBER, MODALITY, PATIENT_BIRTH_DATE, PATIENT_ID,
    PATIENT_NAME, SERIES_DATE, SERIES_INSTANCE_UID, STATION_NAME, STUDY_DATE, STUDY_ID,
};
use crate::models::TagRecord;
use crate::tag_access::{Dataset, ElementAccess};

/// Fields reported for each file; the ones anonymization rewrites plus the naming inputs.
pub const REPORTED_TAGS: [Tag; 15] = [
    IMAGE_TYPE,
    INSTANCE_CREATION_DATE,
    STUDY_DATE,
    SERIES_DATE,
    ACQUISITION_DATE,
    CONTENT_DATE,
    ACCESSION_NUMBER,
    MODALITY,
    STATION_NAME,
    PATIENT_NAME,
    PATIENT_ID,
    PATIENT_BIRTH_DATE,
    SERIES_INSTANCE_UID,
    STUDY_ID,
    INSTANCE_NUMBER,
];

fn tag_name(tag: Tag) -> String {
    StandardDataDictionary
        .by_tag(tag)
        .map(|e| e.alias.to_string())
        .unwrap_or_else(|| tag.to_string())
}

/// Raw values of [`REPORTED_TAGS`] present in `dataset`.
pub fn extract_record(file: &Path, dataset: &Dataset) -> TagRecord {
    let tags = REPORTED_TAGS
        .iter()
        .filter_map(|&tag| dataset.element_str(tag).map(|value| (tag_name(tag), value)))
        .collect::<BTreeMap<_, _>>();

    TagRecord {
        file: file.to_path_buf(),
        tags,
    }
}

/// One record per eligible file, in input order; other files are left out.
pub fn extract_tags(paths: &[PathBuf]) -> Vec<TagRecord> {
    paths
        .par_iter()
        .filter_map(|path| match open_eligible(path) {
            Ok(obj) => Some(extract_record(path, &obj)),
            Err(e) => {
                debug!(path = ?path, reason = %e, "not included in tag report");
                None
            }
        })
        .collect()
}

pub fn print_records(records: &[TagRecord]) {
    for record in records {
        println!("{}", "=".repeat(80));
        println!("{}", record.file.display());
        println!("{}", "=".repeat(80));
        for (name, value) in &record.tags {
            println!("  {:<24} {}", name, value);
        }
    }
    println!("\n{} files reported.", records.len());
}
