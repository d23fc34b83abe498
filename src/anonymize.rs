use std::io;
use std::path::{Path, PathBuf};

use dicom::core::Tag;
use dicom::object::{open_file, DefaultDicomObject};
use tempfile::NamedTempFile;
use tracing::{debug, info};

use crate::config::AnonymizerConfig;
use crate::error::{DeidError, Result};
use crate::output_path::{ensure_dir, OutputPathPlanner, DEFAULT_EXTENSION};
use crate::pseudonym::{new_pid_with_fallback, tail, truncate_date};
use crate::tag_access::{self, get_one, Dataset, TagKey, TagUpdate};

pub const IMAGE_TYPE: Tag = Tag(0x0008, 0x0008);
pub const INSTANCE_CREATION_DATE: Tag = Tag(0x0008, 0x0012);
pub const STUDY_DATE: Tag = Tag(0x0008, 0x0020);
pub const SERIES_DATE: Tag = Tag(0x0008, 0x0021);
pub const ACQUISITION_DATE: Tag = Tag(0x0008, 0x0022);
pub const CONTENT_DATE: Tag = Tag(0x0008, 0x0023);
pub const STUDY_TIME: Tag = Tag(0x0008, 0x0030);
pub const ACCESSION_NUMBER: Tag = Tag(0x0008, 0x0050);
pub const MODALITY: Tag = Tag(0x0008, 0x0060);
pub const STATION_NAME: Tag = Tag(0x0008, 0x1010);
pub const PATIENT_NAME: Tag = Tag(0x0010, 0x0010);
pub const PATIENT_ID: Tag = Tag(0x0010, 0x0020);
pub const PATIENT_BIRTH_DATE: Tag = Tag(0x0010, 0x0030);
pub const DEVICE_SERIAL_NUMBER: Tag = Tag(0x0018, 0x1000);
pub const STUDY_INSTANCE_UID: Tag = Tag(0x0020, 0x000D);
pub const SERIES_INSTANCE_UID: Tag = Tag(0x0020, 0x000E);
pub const STUDY_ID: Tag = Tag(0x0020, 0x0010);
pub const INSTANCE_NUMBER: Tag = Tag(0x0020, 0x0013);

/// Administrative and provenance fields emptied in every output.
pub const CLEAR_TAGS: [Tag; 27] = [
    Tag(0x0008, 0x0080), // InstitutionName
    Tag(0x0008, 0x0081), // InstitutionAddress
    Tag(0x0008, 0x0090), // ReferringPhysicianName
    Tag(0x0008, 0x0092), // ReferringPhysicianAddress
    Tag(0x0008, 0x0094), // ReferringPhysicianTelephoneNumbers
    Tag(0x0008, 0x1040), // InstitutionalDepartmentName
    Tag(0x0008, 0x1048), // PhysiciansOfRecord
    Tag(0x0008, 0x1050), // PerformingPhysicianName
    Tag(0x0008, 0x1060), // NameOfPhysiciansReadingStudy
    Tag(0x0008, 0x1070), // OperatorsName
    Tag(0x0008, 0x1080), // AdmittingDiagnosesDescription
    Tag(0x0010, 0x1000), // OtherPatientIDs
    Tag(0x0010, 0x1001), // OtherPatientNames
    Tag(0x0010, 0x1090), // MedicalRecordLocator
    Tag(0x0010, 0x2160), // EthnicGroup
    Tag(0x0010, 0x2180), // Occupation
    Tag(0x0010, 0x21B0), // AdditionalPatientHistory
    Tag(0x0010, 0x4000), // PatientComments
    Tag(0x0032, 0x1032), // RequestingPhysician
    Tag(0x0032, 0x1033), // RequestingService
    Tag(0x0032, 0x1060), // RequestedProcedureDescription
    Tag(0x0040, 0x0006), // ScheduledPerformingPhysicianName
    Tag(0x0040, 0x0241), // PerformedStationAETitle
    Tag(0x0040, 0x0275), // RequestAttributesSequence
    Tag(0x0040, 0x1001), // RequestedProcedureID
    Tag(0x0040, 0x2004), // IssueDateOfImagingServiceRequest
    Tag(0x0040, 0xA730), // ContentSequence
];

/// Identifier suffixes used for AccessionNumber, StudyID and the output folders.
pub const SUFFIX_LEN: usize = 16;

const ANONYMIZED_SUFFIX: &str = "_anonymized";

/// Backslash-separated ImageType values.
pub fn image_type_components(value: &str) -> Vec<&str> {
    if value.is_empty() {
        return Vec::new();
    }
    value.split('\\').map(str::trim).collect()
}

/// Files are handled only when ImageType carries at least three values.
pub fn is_eligible(dataset: &Dataset) -> bool {
    image_type_components(&get_one(dataset, IMAGE_TYPE)).len() >= 3
}

/// Decode `path` and check eligibility; both failures surface as unsupported input.
pub fn open_eligible(path: &Path) -> Result<DefaultDicomObject> {
    if !path.is_file() {
        return Err(DeidError::filesystem(
            path,
            io::Error::new(io::ErrorKind::NotFound, "not a regular file"),
        ));
    }
    let obj = open_file(path).map_err(|e| DeidError::unsupported(path, e.to_string()))?;
    if !is_eligible(&obj) {
        return Err(DeidError::unsupported(
            path,
            "ImageType missing or with fewer than 3 values",
        ));
    }
    Ok(obj)
}

/// Applies the de-identification rules to decoded datasets.
#[derive(Debug, Clone)]
pub struct Anonymizer {
    config: AnonymizerConfig,
}

impl Anonymizer {
    pub fn new(config: AnonymizerConfig) -> Self {
        Self { config }
    }

    /// Return a de-identified copy of `source`; the source object is left as it was.
    pub fn anonymize(&self, source: &DefaultDicomObject) -> Result<DefaultDicomObject> {
        let mut obj = source.clone();
        self.anonymize_in_place(&mut obj)?;
        Ok(obj)
    }

    fn anonymize_in_place(&self, dataset: &mut Dataset) -> Result<()> {
        // 1. Source values (UIDs come back compacted).
        let serial_number = get_one(dataset, DEVICE_SERIAL_NUMBER);
        let study_date = get_one(dataset, STUDY_DATE);
        let study_time = get_one(dataset, STUDY_TIME);
        let study_uid = get_one(dataset, STUDY_INSTANCE_UID);
        let birth_date = get_one(dataset, PATIENT_BIRTH_DATE);

        // 2-5. Derived replacements.
        let pid = new_pid_with_fallback(
            &serial_number,
            &study_date,
            &study_time,
            self.config.fallback_date(),
        )?;
        let new_study_date = truncate_date(&study_date);
        let new_birth_date = truncate_date(&birth_date);
        let study_suffix = tail(&study_uid, SUFFIX_LEN).to_string();

        // 6. Overwrite what is present.
        let updates = [
            TagUpdate::new(STATION_NAME, self.config.station_name.as_str()),
            TagUpdate::new(INSTANCE_CREATION_DATE, new_study_date.as_str()),
            TagUpdate::new(STUDY_DATE, new_study_date.as_str()),
            TagUpdate::new(SERIES_DATE, new_study_date.as_str()),
            TagUpdate::new(ACQUISITION_DATE, new_study_date.as_str()),
            TagUpdate::new(CONTENT_DATE, new_study_date.as_str()),
            TagUpdate::new(ACCESSION_NUMBER, study_suffix.as_str()),
            TagUpdate::new(PATIENT_NAME, pid.as_str()),
            TagUpdate::new(PATIENT_ID, pid.as_str()),
            TagUpdate::new(PATIENT_BIRTH_DATE, new_birth_date),
            TagUpdate::new(STUDY_ID, study_suffix),
        ];
        let written = tag_access::set_values(dataset, &updates)?;

        // 7. Empty the administrative fields.
        let clear_keys: Vec<TagKey> = CLEAR_TAGS.iter().copied().map(TagKey::from).collect();
        let cleared = tag_access::clear(dataset, &clear_keys)?;

        debug!(written, cleared, "dataset anonymized");
        Ok(())
    }

    /// Anonymize one file and write the result.
    ///
    /// With no destination the output sits next to the source as
    /// `<stem>_anonymized.<ext>`; with a directory it goes under the
    /// hierarchical layout built by [`OutputPathPlanner`].
    pub fn anonymize_file(&self, source: &Path, destination: Option<&Path>) -> Result<PathBuf> {
        if let Some(dest) = destination {
            if dest.exists() && !dest.is_dir() {
                return Err(DeidError::filesystem(
                    dest,
                    io::Error::new(io::ErrorKind::InvalidInput, "destination is not a directory"),
                ));
            }
        }

        let obj = open_eligible(source)?;
        self.anonymize_decoded(source, &obj, destination)
    }

    /// Same as [`Anonymizer::anonymize_file`] for a file the caller has
    /// already opened with [`open_eligible`]; `source` only names the output.
    pub fn anonymize_decoded(
        &self,
        source: &Path,
        obj: &DefaultDicomObject,
        destination: Option<&Path>,
    ) -> Result<PathBuf> {
        let anonymized = self.anonymize(obj)?;

        let output = match destination {
            None => sibling_output_path(source),
            Some(dest) => {
                let extension = source
                    .extension()
                    .and_then(|e| e.to_str())
                    .unwrap_or(DEFAULT_EXTENSION);
                let planned = OutputPathPlanner::new(dest).plan(&anonymized, extension);
                if let Some(parent) = planned.parent() {
                    ensure_dir(parent)?;
                }
                planned
            }
        };

        write_atomically(&anonymized, &output)?;
        info!(source = ?source, output = ?output, "file anonymized");
        Ok(output)
    }
}

/// `<dir>/<stem>_anonymized.<ext>` next to the source.
pub fn sibling_output_path(source: &Path) -> PathBuf {
    let stem = source
        .file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_else(|| "dicom".to_string());
    let file_name = match source.extension() {
        Some(ext) => format!("{}{}.{}", stem, ANONYMIZED_SUFFIX, ext.to_string_lossy()),
        None => format!("{}{}", stem, ANONYMIZED_SUFFIX),
    };
    source.with_file_name(file_name)
}

/// Encode into a temp file beside `target`, then rename over it.
fn write_atomically(obj: &DefaultDicomObject, target: &Path) -> Result<()> {
    let parent = target
        .parent()
        .filter(|p| !p.as_os_str().is_empty())
        .unwrap_or_else(|| Path::new("."));

    let mut staging = NamedTempFile::new_in(parent).map_err(|e| DeidError::filesystem(parent, e))?;
    obj.write_all(staging.as_file_mut())
        .map_err(|e| DeidError::codec(target, e))?;
    staging
        .persist(target)
        .map_err(|e| DeidError::filesystem(target, e.error))?;
    Ok(())
}
