//! Raw container tags, grouped by the metadata area they were read from.
//!
//! The container reader fills a [`RawTags`]; everything downstream reads it
//! through the [`TagSource`] trait so absence is always an explicit `None`.

use serde_json::{Map, Value};
use std::collections::BTreeMap;
use std::fmt;

/// Metadata area a tag was found in.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum TagGroup {
    /// TIFF/EXIF IFD entries.
    Exif,
    /// PNG `tEXt` / `zTXt` / `iTXt` chunks, keyed by keyword.
    Png,
    /// IPTC-IIM application records.
    Iptc,
    /// XMP properties, keyed by local name.
    Xmp,
    /// Container-level facts (image dimensions).
    File,
}

impl TagGroup {
    pub fn as_str(&self) -> &'static str {
        match self {
            TagGroup::Exif => "exif",
            TagGroup::Png => "png",
            TagGroup::Iptc => "iptc",
            TagGroup::Xmp => "xmp",
            TagGroup::File => "file",
        }
    }
}

impl fmt::Display for TagGroup {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One tag: a human-readable description, plus the raw number for numeric tags.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Tag {
    pub description: String,
    pub value: Option<u64>,
}

impl Tag {
    pub fn text(description: impl Into<String>) -> Self {
        Self {
            description: description.into(),
            value: None,
        }
    }

    pub fn number(value: u64) -> Self {
        Self {
            description: value.to_string(),
            value: Some(value),
        }
    }
}

/// Read access to raw tags.
///
/// Name lookups inside a group are case-insensitive: vendors disagree on the
/// casing of chunk names (`parameters` vs `Parameters`).
pub trait TagSource {
    fn get_tag(&self, group: TagGroup, name: &str) -> Option<&Tag>;

    /// The tag's description, if present and not blank.
    fn get_text(&self, group: TagGroup, name: &str) -> Option<&str> {
        self.get_tag(group, name)
            .map(|tag| tag.description.as_str())
            .filter(|text| !text.trim().is_empty())
    }

    fn get_number(&self, group: TagGroup, name: &str) -> Option<u64> {
        self.get_tag(group, name)?.value
    }
}

/// All tags read from one image. Insertion order within a group is kept.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RawTags {
    groups: BTreeMap<TagGroup, Vec<(String, Tag)>>,
}

impl RawTags {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a tag. The first tag stored under an exact name wins; later
    /// duplicates are dropped.
    pub fn insert(&mut self, group: TagGroup, name: impl Into<String>, tag: Tag) {
        let name = name.into();
        let tags = self.groups.entry(group).or_default();
        if tags.iter().any(|(existing, _)| *existing == name) {
            log::debug!("Ignoring duplicate {group} tag {name:?}");
            return;
        }
        tags.push((name, tag));
    }

    /// Builder form of [`insert`](Self::insert).
    pub fn with(mut self, group: TagGroup, name: impl Into<String>, tag: Tag) -> Self {
        self.insert(group, name, tag);
        self
    }

    /// Builder shorthand for a text tag.
    pub fn with_text(self, group: TagGroup, name: impl Into<String>, text: impl Into<String>) -> Self {
        self.with(group, name, Tag::text(text))
    }

    pub fn iter(&self) -> impl Iterator<Item = (TagGroup, &str, &Tag)> {
        self.groups
            .iter()
            .flat_map(|(group, tags)| tags.iter().map(move |(name, tag)| (*group, name.as_str(), tag)))
    }

    pub fn len(&self) -> usize {
        self.groups.values().map(Vec::len).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Nested `{ group: { name: { description, value? } } }` view, used by the CLI.
    pub fn to_json(&self) -> Value {
        let mut root = Map::new();
        for (group, tags) in &self.groups {
            let mut entries = Map::new();
            for (name, tag) in tags {
                let mut entry = Map::new();
                entry.insert("description".into(), Value::String(tag.description.clone()));
                if let Some(value) = tag.value {
                    entry.insert("value".into(), Value::from(value));
                }
                entries.insert(name.clone(), Value::Object(entry));
            }
            root.insert(group.as_str().into(), Value::Object(entries));
        }
        Value::Object(root)
    }
}

impl TagSource for RawTags {
    fn get_tag(&self, group: TagGroup, name: &str) -> Option<&Tag> {
        let tags = self.groups.get(&group)?;
        tags.iter()
            .find(|(key, _)| key == name)
            .or_else(|| tags.iter().find(|(key, _)| key.eq_ignore_ascii_case(name)))
            .map(|(_, tag)| tag)
    }
}
