//! Turning raw tags into a [`ParsedMetadata`] record.
//!
//! Two independent branches:
//!
//! - **standard** fields (camera, date, dimensions, software, artist), each
//!   read from exactly one tag;
//! - **AI** fields, merged from several text sources in a fixed priority order
//!   (see [`extract_ai_metadata`]). The first source to supply a field owns it.

use regex::Regex;
use serde::Serialize;
use std::sync::LazyLock;

use crate::ai::json::{apply_generation_json, parse_generation_json};
use crate::ai::{AiField, AiFields, normalize_software, parse_text_metadata};
use crate::tags::{TagGroup, TagSource};

/// Cheap test for "this text block holds generation parameters".
static GENERATION_HINT: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)prompt|Steps:|Negative prompt:").expect("valid generation hint pattern")
});

static DIMENSIONS: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)^\s*(\d+)\s*x\s*(\d+)\s*$").expect("valid dimensions pattern")
});

/// Text sources consulted for JPEG/WebP-style images, in priority order.
/// Only the first one is kept as `userComment` when it holds no parameters.
const EMBEDDED_TEXT_SOURCES: &[(TagGroup, &str)] = &[
    (TagGroup::Exif, "UserComment"),
    (TagGroup::Exif, "ImageDescription"),
    (TagGroup::Iptc, "Caption"),
    (TagGroup::Xmp, "Parameters"),
];

/// Metadata recovered from one image.
///
/// `ai` is `None` when no generation data was found at all, which callers
/// can render differently from a partially filled record.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ParsedMetadata {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub camera: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub camera_model: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub date_taken: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub width: Option<u64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub height: Option<u64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub software: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub artist: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub ai: Option<AiFields>,
}

impl ParsedMetadata {
    pub fn has_ai(&self) -> bool {
        self.ai.is_some()
    }
}

/// Build the full record: standard fields, AI fields, then the size backfill.
///
/// `width`/`height` are taken from the parsed `size` only when the container
/// supplied neither.
pub fn parse_metadata(tags: &impl TagSource) -> ParsedMetadata {
    let mut metadata = extract_standard(tags);
    metadata.ai = extract_ai_metadata(tags);

    if metadata.width.is_none() && metadata.height.is_none() {
        let size = metadata
            .ai
            .as_ref()
            .and_then(|ai| ai.get_str(AiField::Size))
            .and_then(parse_dimensions);
        if let Some((width, height)) = size {
            metadata.width = Some(width);
            metadata.height = Some(height);
        }
    }

    metadata
}

/// Standard EXIF/container fields. Each has exactly one source.
pub fn extract_standard(tags: &impl TagSource) -> ParsedMetadata {
    let text = |group, name| tags.get_text(group, name).map(str::to_string);

    ParsedMetadata {
        camera: text(TagGroup::Exif, "Make"),
        camera_model: text(TagGroup::Exif, "Model"),
        date_taken: text(TagGroup::Exif, "DateTime").or_else(|| text(TagGroup::Exif, "DateTimeOriginal")),
        width: tags.get_number(TagGroup::File, "Image Width"),
        height: tags.get_number(TagGroup::File, "Image Height"),
        software: tags
            .get_text(TagGroup::Exif, "Software")
            .map(|s| normalize_software(s).to_string()),
        artist: text(TagGroup::Exif, "Artist"),
        ai: None,
    }
}

/// Recover AI generation fields from every known source.
///
/// Priority, highest first:
///
/// 1. PNG `Comment` as JSON (NovelAI keys, then SD-style keys)
/// 2. PNG `Comment` as free text, when it is not a JSON object
/// 3. PNG `parameters` (SD WebUI)
/// 4. PNG `Description`, only while no prompt has been found
/// 5. EXIF `UserComment`, EXIF `ImageDescription`, IPTC `Caption`,
///    XMP `Parameters`, only while no prompt has been found
///
/// Raw PNG `Description`, `Comment` and (normalized) `Software` are always
/// copied as display fallbacks. Returns `None` when nothing was recovered.
pub fn extract_ai_metadata(tags: &impl TagSource) -> Option<AiFields> {
    let mut ai = AiFields::new();

    copy_png_fallbacks(tags, &mut ai);

    if let Some(comment) = tags.get_text(TagGroup::Png, "Comment") {
        match parse_generation_json(comment) {
            Some(root) => apply_generation_json(&root, &mut ai),
            None => parse_text_metadata(comment, &mut ai),
        }
    }

    if let Some(parameters) = tags.get_text(TagGroup::Png, "parameters") {
        parse_text_metadata(parameters, &mut ai);
    }

    if !ai.has_prompt() {
        if let Some(description) = tags.get_text(TagGroup::Png, "Description") {
            parse_text_metadata(description, &mut ai);
        }
    }

    if !ai.has_prompt() {
        read_embedded_text(tags, &mut ai);
    }

    if ai.is_empty() { None } else { Some(ai) }
}

fn copy_png_fallbacks(tags: &impl TagSource, ai: &mut AiFields) {
    if let Some(description) = tags.get_text(TagGroup::Png, "Description") {
        ai.merge_if_absent(AiField::Description, description);
    }
    if let Some(comment) = tags.get_text(TagGroup::Png, "Comment") {
        ai.merge_if_absent(AiField::Comment, comment);
    }
    if let Some(software) = tags.get_text(TagGroup::Png, "Software") {
        ai.merge_if_absent(AiField::Software, normalize_software(software));
    }
}

/// EXIF/IPTC/XMP text sources. Stops at the first source that yields a
/// prompt; a non-generation `UserComment` is kept verbatim.
fn read_embedded_text(tags: &impl TagSource, ai: &mut AiFields) {
    for (index, (group, name)) in EMBEDDED_TEXT_SOURCES.iter().enumerate() {
        let Some(text) = tags.get_text(*group, name) else {
            continue;
        };

        if GENERATION_HINT.is_match(text) {
            parse_text_metadata(text, ai);
            if ai.has_prompt() {
                log::debug!("Generation parameters found in {group}.{name}");
                break;
            }
        } else if index == 0 {
            ai.merge_if_absent(AiField::UserComment, text.trim());
        }
    }
}

/// `"512x768"` → `(512, 768)`.
pub fn parse_dimensions(size: &str) -> Option<(u64, u64)> {
    let caps = DIMENSIONS.captures(size)?;
    let width = caps.get(1)?.as_str().parse().ok()?;
    let height = caps.get(2)?.as_str().parse().ok()?;
    Some((width, height))
}
