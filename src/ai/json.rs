//! Structured generation JSON, as NovelAI (and some SD front-ends) store it in
//! a PNG `Comment` chunk.

use serde_json::Value;

use super::{AiField, AiFields, AiValue};

/// NovelAI keys, as JSON pointers. Applied first, so they win over the
/// SD-style keys below for any field both provide.
const NOVELAI_KEYS: &[(&str, AiField)] = &[
    ("/prompt", AiField::Prompt),
    ("/uc", AiField::NegativePrompt),
    ("/steps", AiField::Steps),
    ("/sampler", AiField::Sampler),
    ("/scale", AiField::CfgScale),
    ("/seed", AiField::Seed),
    ("/v4_prompt/caption/base_caption", AiField::Prompt),
    ("/v4_negative_prompt/caption/base_caption", AiField::NegativePrompt),
    ("/noise_schedule", AiField::Scheduler),
];

/// Stable-Diffusion-style keys; only fill what NovelAI left empty.
const SD_KEYS: &[(&str, AiField)] = &[
    ("/negative_prompt", AiField::NegativePrompt),
    ("/cfg_scale", AiField::CfgScale),
    ("/model", AiField::Model),
    ("/steps", AiField::Steps),
    ("/sampler", AiField::Sampler),
    ("/seed", AiField::Seed),
];

/// Parse `text` as a JSON object.
///
/// Anything that is not an object (invalid JSON, or a bare string/number)
/// returns `None` so the caller can fall back to text parsing.
pub fn parse_generation_json(text: &str) -> Option<Value> {
    match serde_json::from_str::<Value>(text.trim()) {
        Ok(value) if value.is_object() => Some(value),
        Ok(_) => {
            log::debug!("Comment is JSON but not an object, treating as text");
            None
        }
        Err(e) => {
            log::debug!("Comment is not JSON ({e}), treating as text");
            None
        }
    }
}

/// Merge the fields of a generation JSON object into `target`
/// (fill-only-if-absent).
///
/// ```rust
/// use sd_meta::ai::{AiField, AiFields};
/// use sd_meta::ai::json::{apply_generation_json, parse_generation_json};
///
/// let root = parse_generation_json(r#"{"prompt":"a cat","uc":"blurry","scale":11}"#).unwrap();
/// let mut fields = AiFields::new();
/// apply_generation_json(&root, &mut fields);
/// assert_eq!(fields.get_str(AiField::NegativePrompt), Some("blurry"));
/// ```
pub fn apply_generation_json(root: &Value, target: &mut AiFields) {
    for (pointer, field) in NOVELAI_KEYS.iter().chain(SD_KEYS) {
        if let Some(value) = root.pointer(pointer).and_then(to_ai_value) {
            target.merge_if_absent(*field, value);
        }
    }

    let width = root.get("width").and_then(Value::as_u64).filter(|w| *w > 0);
    let height = root.get("height").and_then(Value::as_u64).filter(|h| *h > 0);
    if let (Some(width), Some(height)) = (width, height) {
        target.merge_if_absent(AiField::Size, format!("{width}x{height}"));
    }
}

/// Only "truthy" scalars count: empty strings, zero, `false` and `null` are
/// treated as absent.
fn to_ai_value(value: &Value) -> Option<AiValue> {
    match value {
        Value::String(s) if !s.trim().is_empty() => Some(AiValue::Text(s.clone())),
        Value::Number(n) if n.as_f64() != Some(0.0) => Some(AiValue::Number(n.clone())),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn apply(json: &str) -> AiFields {
        let root = parse_generation_json(json).expect("test JSON is an object");
        let mut fields = AiFields::new();
        apply_generation_json(&root, &mut fields);
        fields
    }

    // ── parse_generation_json ────────────────────────────────────────

    #[test]
    fn rejects_non_objects() {
        assert!(parse_generation_json("not json at all").is_none());
        assert!(parse_generation_json("1234").is_none());
        assert!(parse_generation_json(r#""a quoted prompt""#).is_none());
        assert!(parse_generation_json("[1, 2]").is_none());
        assert!(parse_generation_json("").is_none());
    }

    #[test]
    fn accepts_padded_object() {
        assert!(parse_generation_json("  {\"prompt\": \"x\"}\n").is_some());
    }

    // ── NovelAI ──────────────────────────────────────────────────────

    #[test]
    fn novelai_comment() {
        let fields = apply(
            r#"{"prompt":"a cat","uc":"blurry","steps":28,"sampler":"k_euler","scale":11,"seed":42}"#,
        );
        assert_eq!(fields.get_str(AiField::Prompt), Some("a cat"));
        assert_eq!(fields.get_str(AiField::NegativePrompt), Some("blurry"));
        assert_eq!(fields.get(AiField::Steps), Some(&AiValue::from(28u64)));
        assert_eq!(fields.get_str(AiField::Sampler), Some("k_euler"));
        assert_eq!(fields.get(AiField::CfgScale), Some(&AiValue::from(11u64)));
        assert_eq!(fields.get(AiField::Seed), Some(&AiValue::from(42u64)));
        assert_eq!(fields.len(), 6);
    }

    #[test]
    fn novelai_wins_over_sd_keys() {
        let fields = apply(
            r#"{"prompt":"P1","uc":"N1","steps":20,"seed":11,"scale":9,
                "negative_prompt":"N2","cfg_scale":7,"model":"sd-model"}"#,
        );
        assert_eq!(fields.get_str(AiField::Prompt), Some("P1"));
        assert_eq!(fields.get_str(AiField::NegativePrompt), Some("N1"));
        assert_eq!(fields.get(AiField::CfgScale), Some(&AiValue::from(9u64)));
        assert_eq!(fields.get(AiField::Steps), Some(&AiValue::from(20u64)));
        assert_eq!(fields.get(AiField::Seed), Some(&AiValue::from(11u64)));
        // Gaps NovelAI left are filled from SD keys.
        assert_eq!(fields.get_str(AiField::Model), Some("sd-model"));
    }

    #[test]
    fn sd_keys_fill_when_novelai_absent() {
        let fields = apply(r#"{"negative_prompt":"N2","cfg_scale":7,"sampler":"euler"}"#);
        assert_eq!(fields.get_str(AiField::NegativePrompt), Some("N2"));
        assert_eq!(fields.get(AiField::CfgScale), Some(&AiValue::from(7u64)));
        assert_eq!(fields.get_str(AiField::Sampler), Some("euler"));
    }

    #[test]
    fn v4_captions() {
        let fields = apply(
            r#"{"v4_prompt":{"caption":{"base_caption":"v4 positive"}},
                "v4_negative_prompt":{"caption":{"base_caption":"v4 negative"}},
                "noise_schedule":"karras"}"#,
        );
        assert_eq!(fields.get_str(AiField::Prompt), Some("v4 positive"));
        assert_eq!(fields.get_str(AiField::NegativePrompt), Some("v4 negative"));
        assert_eq!(fields.get_str(AiField::Scheduler), Some("karras"));
    }

    #[test]
    fn uc_beats_v4_negative() {
        let fields = apply(r#"{"uc":"classic","v4_negative_prompt":{"caption":{"base_caption":"v4"}}}"#);
        assert_eq!(fields.get_str(AiField::NegativePrompt), Some("classic"));
    }

    #[test]
    fn falsy_values_are_skipped() {
        let fields = apply(r#"{"prompt":"","seed":0,"steps":null,"sampler":false,"model":"m"}"#);
        assert!(fields.get(AiField::Prompt).is_none());
        assert!(fields.get(AiField::Seed).is_none());
        assert!(fields.get(AiField::Steps).is_none());
        assert!(fields.get(AiField::Sampler).is_none());
        assert_eq!(fields.get_str(AiField::Model), Some("m"));
    }

    #[test]
    fn fractional_scale_kept_as_number() {
        let fields = apply(r#"{"scale":5.5}"#);
        assert_eq!(fields.get(AiField::CfgScale).map(|v| v.to_string()).as_deref(), Some("5.5"));
    }

    #[test]
    fn width_height_become_size() {
        let fields = apply(r#"{"prompt":"x","width":832,"height":1216}"#);
        assert_eq!(fields.get_str(AiField::Size), Some("832x1216"));
    }
}
