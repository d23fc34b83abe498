//
// tag_access.rs
// Dicom-Deid-rs
//
// Reads, overwrites and clears tag values in a decoded dataset, formatting each value according to its VR.
//
// Thales Matheus Mendonça Santos - November 2025

use std::collections::BTreeMap;
use std::fmt;

use dicom::core::dictionary::{DataDictionary, TagRange};
use dicom::core::{DataElement, PrimitiveValue, Tag, VR};
use dicom::dictionary_std::StandardDataDictionary;
use dicom::object::InMemDicomObject;
use tracing::{debug, warn};

use crate::error::{DeidError, Result};
use crate::pseudonym::compact_uid;

/// Decoded dataset the accessor works on. File objects deref into it.
pub type Dataset = InMemDicomObject<StandardDataDictionary>;

/// A tag named either by address or by its standard dictionary keyword.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TagKey {
    Tag(Tag),
    Keyword(String),
}

impl TagKey {
    /// Resolve to a tag address; `(gggg,eeee)`, `gggg,eeee` and `ggggeeee` forms are accepted besides keywords.
    pub fn resolve(&self) -> Result<Tag> {
        match self {
            TagKey::Tag(tag) => Ok(*tag),
            TagKey::Keyword(name) => {
                if let Ok(tag) = name.parse::<Tag>() {
                    return Ok(tag);
                }
                match StandardDataDictionary.by_name(name).map(|entry| entry.tag) {
                    Some(TagRange::Single(tag)) => Ok(tag),
                    Some(_) => Err(DeidError::InvalidArgument(format!(
                        "keyword {} names a tag range, not a single tag",
                        name
                    ))),
                    None => Err(DeidError::InvalidArgument(format!(
                        "unknown tag keyword {}",
                        name
                    ))),
                }
            }
        }
    }
}

impl From<Tag> for TagKey {
    fn from(tag: Tag) -> Self {
        TagKey::Tag(tag)
    }
}

impl From<&str> for TagKey {
    fn from(name: &str) -> Self {
        TagKey::Keyword(name.to_string())
    }
}

impl fmt::Display for TagKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TagKey::Tag(tag) => write!(f, "({:04X},{:04X})", tag.group(), tag.element()),
            TagKey::Keyword(name) => f.write_str(name),
        }
    }
}

/// How a value is rendered when read, chosen from the element's VR.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum ValueFormat {
    Raw,
    /// UI values are read back as their compacted digest.
    CompactedUid,
}

impl ValueFormat {
    pub fn for_vr(vr: VR) -> Self {
        match vr {
            VR::UI => ValueFormat::CompactedUid,
            _ => ValueFormat::Raw,
        }
    }

    pub fn render(self, raw: &str) -> String {
        match self {
            ValueFormat::Raw => raw.to_string(),
            ValueFormat::CompactedUid => compact_uid(raw).into_string(),
        }
    }
}

/// One write request: the target tag and the value it should hold.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TagUpdate {
    pub tag: TagKey,
    pub value: String,
}

impl TagUpdate {
    pub fn new(tag: impl Into<TagKey>, value: impl Into<String>) -> Self {
        Self {
            tag: tag.into(),
            value: value.into(),
        }
    }
}

/// Small helper trait to pull raw values and VRs out of a dataset.
pub trait ElementAccess {
    fn element_str(&self, tag: Tag) -> Option<String>;
    fn element_vr(&self, tag: Tag) -> Option<VR>;
    fn has_element(&self, tag: Tag) -> bool;
}

impl ElementAccess for Dataset {
    fn element_str(&self, tag: Tag) -> Option<String> {
        let element = self.element(tag).ok()?;
        match element.to_str() {
            Ok(value) => Some(
                value
                    .trim_end_matches(|c: char| c == ' ' || c == '\0')
                    .to_string(),
            ),
            Err(_) => {
                debug!(%tag, "value has no textual form");
                Some(String::new())
            }
        }
    }

    fn element_vr(&self, tag: Tag) -> Option<VR> {
        self.element(tag).ok().map(|e| e.header().vr)
    }

    fn has_element(&self, tag: Tag) -> bool {
        self.element(tag).is_ok()
    }
}

/// Read one tag as text, `""` when absent, UI values compacted.
pub fn get_one(dataset: &Dataset, tag: Tag) -> String {
    match (dataset.element_vr(tag), dataset.element_str(tag)) {
        (Some(vr), Some(raw)) => ValueFormat::for_vr(vr).render(&raw),
        _ => String::new(),
    }
}

/// Read every requested tag; absent tags map to `""`.
pub fn get(dataset: &Dataset, tags: &[TagKey]) -> Result<BTreeMap<Tag, String>> {
    let mut values = BTreeMap::new();
    for key in tags {
        let tag = key.resolve()?;
        values.insert(tag, get_one(dataset, tag));
    }
    Ok(values)
}

/// Pair `tags` with `values` one to one and overwrite the tags that exist.
///
/// Returns how many elements were written.
pub fn set(dataset: &mut Dataset, tags: &[TagKey], values: &[String]) -> Result<usize> {
    if tags.len() != values.len() {
        return Err(DeidError::InvalidArgument(format!(
            "{} tags but {} values",
            tags.len(),
            values.len()
        )));
    }
    let updates: Vec<TagUpdate> = tags
        .iter()
        .zip(values)
        .map(|(tag, value)| TagUpdate::new(tag.clone(), value.clone()))
        .collect();
    set_values(dataset, &updates)
}

/// Apply each update to an existing element, keeping its VR. Missing tags are skipped.
pub fn set_values(dataset: &mut Dataset, updates: &[TagUpdate]) -> Result<usize> {
    // Resolve everything first so a bad keyword leaves the dataset untouched.
    let resolved = updates
        .iter()
        .map(|update| {
            update
                .tag
                .resolve()
                .map(|tag| (tag, update.value.as_str()))
        })
        .collect::<Result<Vec<_>>>()?;

    let mut written = 0;
    for (tag, value) in resolved {
        match dataset.element_vr(tag) {
            Some(VR::SQ) => {
                warn!(%tag, "refusing to write a text value into a sequence");
            }
            Some(vr) => {
                dataset.put(DataElement::new(tag, vr, PrimitiveValue::from(value)));
                written += 1;
            }
            None => {
                warn!(%tag, "tag not present; value not set");
            }
        }
    }
    Ok(written)
}

/// Empty every present tag while keeping the tag and its VR. Returns how many were cleared.
pub fn clear(dataset: &mut Dataset, tags: &[TagKey]) -> Result<usize> {
    let resolved = tags
        .iter()
        .map(TagKey::resolve)
        .collect::<Result<Vec<_>>>()?;

    let mut cleared = 0;
    for tag in resolved {
        match dataset.element_vr(tag) {
            Some(vr) => {
                dataset.put(DataElement::empty(tag, vr));
                cleared += 1;
            }
            None => debug!(%tag, "tag not present; nothing to clear"),
        }
    }
    Ok(cleared)
}
