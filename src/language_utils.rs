use anyhow::{Result, anyhow};
use isolang::Language;

/// Language utilities for ISO language code handling
///
/// Container metadata mixes ISO 639-1 codes, ISO 639-2 bibliographic and
/// terminology codes and IETF tags such as `es-419`. These helpers fold them
/// onto the ISO 639-2/B form used as language bucket keys.

// @const: ISO 639-2/B codes that differ from their 639-2/T counterpart
const BIBLIOGRAPHIC_CODES: [(&str, &str); 18] = [
    ("fre", "fra"),
    ("ger", "deu"),
    ("dut", "nld"),
    ("gre", "ell"),
    ("chi", "zho"),
    ("cze", "ces"),
    ("ice", "isl"),
    ("alb", "sqi"),
    ("arm", "hye"),
    ("baq", "eus"),
    ("bur", "mya"),
    ("per", "fas"),
    ("geo", "kat"),
    ("may", "msa"),
    ("mac", "mkd"),
    ("rum", "ron"),
    ("slo", "slk"),
    ("wel", "cym"),
];

/// Normalize a language code to ISO 639-2/T (3-letter) format
pub fn normalize_to_part2t(code: &str) -> Result<String> {
    let normalized_code = code.trim().to_lowercase();

    match normalized_code.len() {
        2 => {
            if let Some(lang) = Language::from_639_1(&normalized_code) {
                return Ok(lang.to_639_3().to_string());
            }
        }
        3 => {
            if let Some((_, terminology)) = BIBLIOGRAPHIC_CODES.iter().find(|(b, _)| *b == normalized_code) {
                return Ok(terminology.to_string());
            }
            if Language::from_639_3(&normalized_code).is_some() {
                return Ok(normalized_code);
            }
        }
        _ => {}
    }

    Err(anyhow!("Cannot normalize invalid language code: {}", code))
}

/// Normalize a language code to ISO 639-2/B, the form Matroska stores
pub fn normalize_to_part2b(code: &str) -> Result<String> {
    let terminology = normalize_to_part2t(code)?;

    let bibliographic = BIBLIOGRAPHIC_CODES
        .iter()
        .find(|(_, t)| *t == terminology)
        .map(|(b, _)| b.to_string())
        .unwrap_or(terminology);

    Ok(bibliographic)
}

/// Primary language subtag of an IETF tag (`es-419` -> `es`)
pub fn primary_subtag(tag: &str) -> &str {
    tag.split(['-', '_']).next().unwrap_or("").trim()
}

/// Get the language name from a code
pub fn get_language_name(code: &str) -> Result<String> {
    let normalized = normalize_to_part2t(code)?;
    let lang = Language::from_639_3(&normalized)
        .ok_or_else(|| anyhow!("Failed to get language from code: {}", normalized))?;

    Ok(lang.to_name().to_string())
}
