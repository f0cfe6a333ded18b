//! Free-form generation text (`Key: value` blocks).
//!
//! This is the format SD WebUI writes into its `parameters` chunk:
//!
//! ```text
//! portrait of a cat
//! Negative prompt: blurry, lowres
//! Steps: 30, Sampler: Euler a, CFG scale: 7, Seed: 99, Size: 512x768, Model: foo
//! ```
//!
//! The prompt and negative prompt are positional; every other parameter is
//! found through [`RULES`], a table of `(field, pattern, post-process)`
//! entries. Adding a field is a table change.

use regex::Regex;
use std::sync::LazyLock;

use super::{AiField, AiFields, AiValue};

/// Everything before the first `Negative prompt:` or `Steps:`.
static PROMPT: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?is)\A(.*?)(?:Negative prompt:|Steps:)").expect("valid prompt pattern")
});

static NEGATIVE_PROMPT: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?is)Negative prompt:[ \t]*(.*?)(?:Steps:|\z)").expect("valid negative prompt pattern")
});

/// NovelAI's label for the negative prompt in its text exports.
static UNDESIRED_CONTENT: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?is)Undesired content:[ \t]*(.*?)(?:\n\w+:|\z)").expect("valid undesired content pattern")
});

/// Value shapes shared by the rules.
const UNTIL_COMMA: &str = r"[^,\n]+";
const INTEGER: &str = r"-?\d+";
const DECIMAL: &str = r"[\d.]+";
const DIMENSIONS: &str = r"\d+\s*x\s*\d+";
const QUOTED_OR_LINE: &str = r#""[^"]*"|[^\n]+"#;

/// Whether a rule keeps the first match or every match.
#[derive(Debug, Clone, Copy, PartialEq)]
enum Collect {
    First,
    /// One match is stored as text, several as an ordered list.
    All,
}

#[derive(Debug, Clone, Copy, PartialEq)]
enum PostProcess {
    Trim,
    /// Trim, then drop one pair of surrounding double quotes.
    Unquote,
    /// Trim and remove inner whitespace (`512 x 768` → `512x768`).
    Compact,
}

impl PostProcess {
    fn apply(self, raw: &str) -> String {
        let trimmed = raw.trim();
        match self {
            PostProcess::Trim => trimmed.to_string(),
            PostProcess::Unquote => trimmed
                .strip_prefix('"')
                .and_then(|s| s.strip_suffix('"'))
                .unwrap_or(trimmed)
                .trim()
                .to_string(),
            PostProcess::Compact => trimmed.split_whitespace().collect(),
        }
    }
}

/// Words that turn a label into a different parameter: `Hires steps:` is
/// not `Steps:`, `Variation seed:` is not `Seed:`.
const COMPOUND_PREFIXES: &[&str] = &["hires", "variation", "refiner", "adetailer"];

struct FieldRule {
    field: AiField,
    pattern: Regex,
    collect: Collect,
    post: PostProcess,
}

impl FieldRule {
    /// A `Label: value` parameter. The label has to start a word, so `Scale:`
    /// does not fire inside `Hires upscale:`.
    fn param(field: AiField, labels: &str, value: &str, collect: Collect, post: PostProcess) -> Self {
        let pattern = format!(r"(?i)\b(?:{labels}):[ \t]*({value})");
        Self {
            field,
            pattern: Regex::new(&pattern).expect("valid field rule pattern"),
            collect,
            post,
        }
    }

    fn first(field: AiField, labels: &str, value: &str) -> Self {
        Self::param(field, labels, value, Collect::First, PostProcess::Trim)
    }

    /// Raw values in text order, skipping labels embedded in something else.
    fn values<'t>(&self, text: &'t str) -> impl Iterator<Item = &'t str> {
        self.pattern.captures_iter(text).filter_map(move |caps| {
            let label = caps.get(0)?;
            if is_embedded_label(&text[..label.start()]) {
                return None;
            }
            caps.get(1).map(|m| m.as_str())
        })
    }
}

/// Whether the text `before` a label makes it part of a prompt tag
/// (`<lora:name:0.8>`) or of a compound label.
fn is_embedded_label(before: &str) -> bool {
    if before.ends_with('<') {
        return true;
    }
    let trimmed = before.trim_end_matches([' ', '\t']);
    if trimmed.len() == before.len() {
        return false;
    }
    let word = trimmed.rsplit(|c: char| !c.is_alphanumeric()).next().unwrap_or("");
    COMPOUND_PREFIXES.iter().any(|prefix| word.eq_ignore_ascii_case(prefix))
}

static RULES: LazyLock<Vec<FieldRule>> = LazyLock::new(|| {
    use AiField::*;
    vec![
        FieldRule::first(Steps, "Steps", INTEGER),
        FieldRule::first(Sampler, "Sampler|Sampling method", UNTIL_COMMA),
        FieldRule::first(CfgScale, "CFG scale|Scale", DECIMAL),
        FieldRule::first(Seed, "Seed", INTEGER),
        FieldRule::first(Model, "Model", UNTIL_COMMA),
        FieldRule::first(ModelHash, "Model hash", UNTIL_COMMA),
        FieldRule::first(Vae, "VAE", UNTIL_COMMA),
        FieldRule::first(VaeHash, "VAE hash", UNTIL_COMMA),
        FieldRule::first(ClipSkip, "Clip skip", INTEGER),
        FieldRule::first(Scheduler, "Schedule type|Scheduler", UNTIL_COMMA),
        FieldRule::first(HiresUpscaler, "Hires upscaler", UNTIL_COMMA),
        FieldRule::first(HiresSteps, "Hires steps", INTEGER),
        FieldRule::first(HiresUpscale, "Hires upscale", DECIMAL),
        FieldRule::first(DenoisingStrength, "Denoising strength", DECIMAL),
        FieldRule::first(Ensd, "ENSD", INTEGER),
        FieldRule::param(Size, "Size|Hires size", DIMENSIONS, Collect::First, PostProcess::Compact),
        FieldRule::param(Loras, "Lora", UNTIL_COMMA, Collect::All, PostProcess::Trim),
        FieldRule::param(LoraHashes, "Lora hashes", QUOTED_OR_LINE, Collect::First, PostProcess::Unquote),
        FieldRule::param(TiHashes, "TI hashes", QUOTED_OR_LINE, Collect::First, PostProcess::Unquote),
    ]
});

/// Extract generation fields from one text block into `target`.
///
/// Every write is fill-only-if-absent: fields `target` already holds are left
/// alone, so calling this for several sources in priority order never lets a
/// later source override an earlier one. Unmatched patterns leave their field
/// unset; malformed text is never an error.
///
/// ```rust
/// use sd_meta::ai::{AiField, AiFields, parse_text_metadata};
///
/// let mut fields = AiFields::new();
/// parse_text_metadata("a cat\nNegative prompt: blurry\nSteps: 20, Seed: 1", &mut fields);
/// assert_eq!(fields.get_str(AiField::Prompt), Some("a cat"));
/// assert_eq!(fields.get_str(AiField::NegativePrompt), Some("blurry"));
/// assert_eq!(fields.get_str(AiField::Steps), Some("20"));
/// ```
pub fn parse_text_metadata(text: &str, target: &mut AiFields) {
    if !target.contains(AiField::Prompt) {
        if let Some(prompt) = capture(&PROMPT, text) {
            target.merge_if_absent(AiField::Prompt, prompt.trim());
        }
    }

    if !target.contains(AiField::NegativePrompt) {
        let negative = capture(&NEGATIVE_PROMPT, text)
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .or_else(|| capture(&UNDESIRED_CONTENT, text).map(str::trim));
        if let Some(negative) = negative {
            target.merge_if_absent(AiField::NegativePrompt, negative);
        }
    }

    for rule in RULES.iter() {
        if target.contains(rule.field) {
            continue;
        }
        match rule.collect {
            Collect::First => {
                if let Some(raw) = rule.values(text).next() {
                    target.merge_if_absent(rule.field, rule.post.apply(raw));
                }
            }
            Collect::All => {
                let mut values: Vec<String> = rule
                    .values(text)
                    .map(|raw| rule.post.apply(raw))
                    .filter(|v| !v.is_empty())
                    .collect();
                let value = match values.len() {
                    0 => continue,
                    1 => AiValue::Text(values.remove(0)),
                    _ => AiValue::List(values),
                };
                target.merge_if_absent(rule.field, value);
            }
        }
    }
}

fn capture<'t>(pattern: &Regex, text: &'t str) -> Option<&'t str> {
    pattern.captures(text)?.get(1).map(|m| m.as_str())
}
