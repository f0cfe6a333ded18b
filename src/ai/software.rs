//! Canonical display names for generator software signatures.

/// Alias table: any signature containing one of the needles (case-insensitive)
/// maps to the canonical name.
const ALIASES: &[(&[&str], &str)] = &[
    (&["automatic1111", "a1111"], "Stable Diffusion WebUI (A1111)"),
    (&["invokeai"], "InvokeAI"),
];

/// Collapse a software signature into its canonical display name.
///
/// Unknown signatures (and empty strings) pass through unchanged. Canonical
/// names map to themselves, so the function is idempotent.
///
/// ```rust
/// use sd_meta::ai::normalize_software;
///
/// assert_eq!(normalize_software("AUTOMATIC1111"), "Stable Diffusion WebUI (A1111)");
/// assert_eq!(normalize_software("GIMP 2.10"), "GIMP 2.10");
/// ```
pub fn normalize_software(raw: &str) -> &str {
    let lower = raw.to_lowercase();
    ALIASES
        .iter()
        .find(|(needles, _)| needles.iter().any(|needle| lower.contains(needle)))
        .map(|(_, canonical)| *canonical)
        .unwrap_or(raw)
}
