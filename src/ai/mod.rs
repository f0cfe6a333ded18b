//! AI generation fields and the fill-only-if-absent accumulator they are
//! collected into.
//!
//! - [`AiField`] — the recognised field names
//! - [`AiValue`] — a recovered value (text, number, or list of strings)
//! - [`AiFields`] — the accumulator; sources are merged into it in priority
//!   order and a field, once set, is never overwritten
//!
//! Submodules hold the individual interpreters:
//!
//! - [`text`] — free-form `Key: value` blocks (SD WebUI `parameters`, NovelAI text)
//! - [`json`] — JSON blobs (NovelAI and SD-style `Comment` chunks)
//! - [`software`] — canonical names for generator signatures

pub mod json;
pub mod software;
pub mod text;

use serde::Serialize;
use std::collections::BTreeMap;
use std::fmt;

pub use software::normalize_software;
pub use text::parse_text_metadata;

/// A generation parameter recognised in image metadata.
///
/// Serializes to the camelCase name used in JSON output (`negativePrompt`,
/// `cfgScale`, ...).
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
#[serde(rename_all = "camelCase")]
pub enum AiField {
    Prompt,
    NegativePrompt,
    Steps,
    Sampler,
    CfgScale,
    Seed,
    Model,
    ModelHash,
    Vae,
    VaeHash,
    ClipSkip,
    Scheduler,
    HiresUpscaler,
    HiresSteps,
    HiresUpscale,
    DenoisingStrength,
    Ensd,
    Size,
    Loras,
    LoraHashes,
    TiHashes,
    Software,
    Description,
    Comment,
    UserComment,
}

impl AiField {
    pub const ALL: [AiField; 25] = [
        AiField::Prompt,
        AiField::NegativePrompt,
        AiField::Steps,
        AiField::Sampler,
        AiField::CfgScale,
        AiField::Seed,
        AiField::Model,
        AiField::ModelHash,
        AiField::Vae,
        AiField::VaeHash,
        AiField::ClipSkip,
        AiField::Scheduler,
        AiField::HiresUpscaler,
        AiField::HiresSteps,
        AiField::HiresUpscale,
        AiField::DenoisingStrength,
        AiField::Ensd,
        AiField::Size,
        AiField::Loras,
        AiField::LoraHashes,
        AiField::TiHashes,
        AiField::Software,
        AiField::Description,
        AiField::Comment,
        AiField::UserComment,
    ];

    /// Key used in JSON output.
    pub fn name(&self) -> &'static str {
        match self {
            AiField::Prompt => "prompt",
            AiField::NegativePrompt => "negativePrompt",
            AiField::Steps => "steps",
            AiField::Sampler => "sampler",
            AiField::CfgScale => "cfgScale",
            AiField::Seed => "seed",
            AiField::Model => "model",
            AiField::ModelHash => "modelHash",
            AiField::Vae => "vae",
            AiField::VaeHash => "vaeHash",
            AiField::ClipSkip => "clipSkip",
            AiField::Scheduler => "scheduler",
            AiField::HiresUpscaler => "hiresUpscaler",
            AiField::HiresSteps => "hiresSteps",
            AiField::HiresUpscale => "hiresUpscale",
            AiField::DenoisingStrength => "denoisingStrength",
            AiField::Ensd => "ensd",
            AiField::Size => "size",
            AiField::Loras => "loras",
            AiField::LoraHashes => "loraHashes",
            AiField::TiHashes => "tiHashes",
            AiField::Software => "software",
            AiField::Description => "description",
            AiField::Comment => "comment",
            AiField::UserComment => "userComment",
        }
    }

    /// Human-readable label, as SD WebUI prints it where it has one.
    pub fn label(&self) -> &'static str {
        match self {
            AiField::Prompt => "Prompt",
            AiField::NegativePrompt => "Negative prompt",
            AiField::Steps => "Steps",
            AiField::Sampler => "Sampler",
            AiField::CfgScale => "CFG scale",
            AiField::Seed => "Seed",
            AiField::Model => "Model",
            AiField::ModelHash => "Model hash",
            AiField::Vae => "VAE",
            AiField::VaeHash => "VAE hash",
            AiField::ClipSkip => "Clip skip",
            AiField::Scheduler => "Scheduler",
            AiField::HiresUpscaler => "Hires upscaler",
            AiField::HiresSteps => "Hires steps",
            AiField::HiresUpscale => "Hires upscale",
            AiField::DenoisingStrength => "Denoising strength",
            AiField::Ensd => "ENSD",
            AiField::Size => "Size",
            AiField::Loras => "Lora",
            AiField::LoraHashes => "Lora hashes",
            AiField::TiHashes => "TI hashes",
            AiField::Software => "Software",
            AiField::Description => "Description",
            AiField::Comment => "Comment",
            AiField::UserComment => "User comment",
        }
    }
}

impl fmt::Display for AiField {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// A recovered field value.
///
/// Text blocks always yield [`AiValue::Text`]; JSON sources keep numbers as
/// numbers. `loras` becomes a [`AiValue::List`] when more than one is found.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum AiValue {
    Text(String),
    Number(serde_json::Number),
    List(Vec<String>),
}

impl AiValue {
    pub fn as_str(&self) -> Option<&str> {
        match self {
            AiValue::Text(s) => Some(s),
            _ => None,
        }
    }

    pub fn as_list(&self) -> Option<&[String]> {
        match self {
            AiValue::List(items) => Some(items),
            _ => None,
        }
    }

    /// Blank text and empty lists carry no information and are never stored.
    fn is_blank(&self) -> bool {
        match self {
            AiValue::Text(s) => s.trim().is_empty(),
            AiValue::Number(_) => false,
            AiValue::List(items) => items.is_empty(),
        }
    }
}

impl fmt::Display for AiValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AiValue::Text(s) => f.write_str(s),
            AiValue::Number(n) => write!(f, "{n}"),
            AiValue::List(items) => f.write_str(&items.join(", ")),
        }
    }
}

impl From<&str> for AiValue {
    fn from(s: &str) -> Self {
        AiValue::Text(s.to_string())
    }
}

impl From<String> for AiValue {
    fn from(s: String) -> Self {
        AiValue::Text(s)
    }
}

impl From<u64> for AiValue {
    fn from(n: u64) -> Self {
        AiValue::Number(n.into())
    }
}

impl From<Vec<String>> for AiValue {
    fn from(items: Vec<String>) -> Self {
        AiValue::List(items)
    }
}

/// Generation fields recovered from one image.
///
/// Sources are merged in priority order through [`merge_if_absent`]; the
/// first source to supply a field owns it.
///
/// ```rust
/// use sd_meta::ai::{AiField, AiFields};
///
/// let mut fields = AiFields::new();
/// assert!(fields.merge_if_absent(AiField::Seed, "42"));
/// assert!(!fields.merge_if_absent(AiField::Seed, "7"));
/// assert_eq!(fields.get_str(AiField::Seed), Some("42"));
/// ```
///
/// [`merge_if_absent`]: AiFields::merge_if_absent
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(transparent)]
pub struct AiFields {
    fields: BTreeMap<AiField, AiValue>,
}

impl AiFields {
    pub fn new() -> Self {
        Self::default()
    }

    /// Store `value` under `field` unless the field is already set.
    ///
    /// Blank values are ignored. Returns `true` if the value was stored.
    pub fn merge_if_absent(&mut self, field: AiField, value: impl Into<AiValue>) -> bool {
        let value = value.into();
        if value.is_blank() || self.fields.contains_key(&field) {
            return false;
        }
        self.fields.insert(field, value);
        true
    }

    pub fn get(&self, field: AiField) -> Option<&AiValue> {
        self.fields.get(&field)
    }

    pub fn get_str(&self, field: AiField) -> Option<&str> {
        self.get(field).and_then(AiValue::as_str)
    }

    pub fn contains(&self, field: AiField) -> bool {
        self.fields.contains_key(&field)
    }

    pub fn has_prompt(&self) -> bool {
        self.contains(AiField::Prompt)
    }

    pub fn iter(&self) -> impl Iterator<Item = (AiField, &AiValue)> {
        self.fields.iter().map(|(field, value)| (*field, value))
    }

    pub fn len(&self) -> usize {
        self.fields.len()
    }

    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }
}
