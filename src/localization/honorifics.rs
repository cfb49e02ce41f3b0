/*!
 * Honorific transfer from a source subtitle track onto the Spanish track.
 *
 * Source lines carrying `<name><suffix>` (e.g. `Alice-san`) are aligned to
 * the closest Spanish line within a time window, and the bare name on that
 * line receives the suffix. Spanish politeness phrases that would duplicate
 * the honorific are removed first.
 */

use anyhow::{Context, Result};
use log::{debug, info, warn};
use regex::{NoExpand, Regex};
use std::collections::HashSet;
use std::fmt;

use crate::app_config::HonorificConfig;
use crate::subtitle_processor::SubtitleCollection;

/// Characters that make up a name: ASCII letters plus the Latin-1 letters
pub const LETTER_CLASS: &str = "A-Za-zÀ-ÖØ-öø-ÿ";

/// A name with an honorific found on a source line
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HonorificMatch {
    /// Name as written in the source, without the suffix
    pub bare_name: String,
    /// Bare name followed by the configured suffix
    pub name_with_suffix: String,
    pub suffix: String,
}

/// Which track supplied the honorifics
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HonorificSource {
    English,
    Malay,
}

impl fmt::Display for HonorificSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::English => write!(f, "English"),
            Self::Malay => write!(f, "Malay"),
        }
    }
}

/// Counters for one transfer pass
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TransferStats {
    pub lines_scanned: usize,
    pub lines_with_honorifics: usize,
    pub lines_rewritten: usize,
    /// Source lines with honorifics but no target line in the window
    pub misses: usize,
}

/// Precompiled patterns for one suffix
#[derive(Debug, Clone)]
struct SuffixPatterns {
    suffix: String,
    /// `\b<letters>+<suffix>\b`, used to decide whether a track has honorifics
    detect: Regex,
    /// `(<letters>+)<suffix>[!?\\.]*`, captures the bare name
    capture: Regex,
    /// Two or more consecutive copies of the suffix
    repeated: Regex,
}

/// Moves honorifics from a source document onto a target document
#[derive(Debug, Clone)]
pub struct HonorificTransfer {
    patterns: Vec<SuffixPatterns>,
    /// Unique lowercased phrases, longest first
    phrase_patterns: Vec<Regex>,
    window_ms: u64,
    word: Regex,
    spaces: Regex,
}

impl HonorificTransfer {
    pub fn new(config: &HonorificConfig) -> Result<Self> {
        let mut patterns = Vec::new();
        for suffix in config.honorifics.iter().map(|s| s.trim()).filter(|s| !s.is_empty()) {
            let escaped = regex::escape(suffix);
            patterns.push(SuffixPatterns {
                suffix: suffix.to_string(),
                detect: Regex::new(&format!(r"(?i)\b[{}]+{}\b", LETTER_CLASS, escaped))
                    .with_context(|| format!("Invalid honorific '{}'", suffix))?,
                capture: Regex::new(&format!(r"(?i)([{}]+){}[!?\\.]*", LETTER_CLASS, escaped))
                    .with_context(|| format!("Invalid honorific '{}'", suffix))?,
                repeated: Regex::new(&format!("(?:{}){{2,}}", escaped))
                    .with_context(|| format!("Invalid honorific '{}'", suffix))?,
            });
        }

        let mut phrases: Vec<String> = config
            .redundant_phrases
            .iter()
            .map(|p| p.trim().to_lowercase())
            .filter(|p| !p.is_empty())
            .collect::<HashSet<_>>()
            .into_iter()
            .collect();
        phrases.sort_by(|a, b| b.chars().count().cmp(&a.chars().count()).then_with(|| a.cmp(b)));

        let phrase_patterns = phrases
            .iter()
            .map(|p| Regex::new(&format!(r"(?i)\b{}\b\s*", regex::escape(p))))
            .collect::<Result<Vec<_>, _>>()
            .context("Invalid redundant phrase")?;

        Ok(Self {
            patterns,
            phrase_patterns,
            window_ms: config.window_secs.saturating_mul(1000),
            word: Regex::new(&format!(r"\b[{}]+\b", LETTER_CLASS)).context("Invalid word pattern")?,
            spaces: Regex::new(r"\s{2,}").context("Invalid whitespace pattern")?,
        })
    }

    /// Whether any line of the document carries a known honorific
    pub fn has_honorifics(&self, document: &SubtitleCollection) -> bool {
        document
            .entries
            .iter()
            .any(|entry| self.patterns.iter().any(|p| p.detect.is_match(&entry.text)))
    }

    /// Pick the honorific source: English if it has honorifics, else Malay
    pub fn choose_source<'d>(
        &self,
        english: Option<&'d SubtitleCollection>,
        malay: Option<&'d SubtitleCollection>,
    ) -> Option<(HonorificSource, &'d SubtitleCollection)> {
        if let Some(doc) = english {
            if !doc.is_empty() && self.has_honorifics(doc) {
                return Some((HonorificSource::English, doc));
            }
            info!("English subtitles carry no honorifics, checking Malay");
        }

        malay.map(|doc| (HonorificSource::Malay, doc))
    }

    /// Names with honorifics on one source line, one per bare name
    pub fn find_honorifics(&self, text: &str) -> Vec<HonorificMatch> {
        let mut seen = HashSet::new();
        let mut found = Vec::new();

        for pattern in &self.patterns {
            for caps in pattern.capture.captures_iter(text) {
                let Some(bare) = caps.get(1).map(|m| m.as_str()) else {
                    continue;
                };
                if seen.insert(bare.to_lowercase()) {
                    found.push(HonorificMatch {
                        bare_name: bare.to_string(),
                        name_with_suffix: format!("{}{}", bare, pattern.suffix),
                        suffix: pattern.suffix.clone(),
                    });
                }
            }
        }

        found
    }

    /// Index of the target line best aligned with a source line
    pub fn find_target_index(&self, source_start_ms: u64, source_text: &str, target: &SubtitleCollection) -> Option<usize> {
        let words: Vec<&str> = self.word.find_iter(source_text).map(|m| m.as_str()).collect();
        let mut best: Option<usize> = None;
        let mut best_score = 0.0_f64;

        for (index, entry) in target.entries.iter().enumerate() {
            let diff = entry.start_time_ms.abs_diff(source_start_ms);
            if diff > self.window_ms {
                continue;
            }

            let mut score = 1.0 / (diff as f64 + 1.0);
            if words.iter().any(|word| entry.text.contains(word)) {
                score += 1.0;
            }

            if score > best_score {
                best = Some(index);
                best_score = score;
            }
        }

        best
    }

    /// Apply the honorifics of one source line to a target line's text
    pub fn rewrite_line(&self, text: &str, matches: &[HonorificMatch]) -> String {
        let mut rewritten = text.to_string();

        for phrase in &self.phrase_patterns {
            rewritten = phrase.replace_all(&rewritten, "").into_owned();
        }

        for found in matches {
            let name = regex::escape(&found.bare_name);
            let suffix = regex::escape(&found.suffix);

            let already = match Regex::new(&format!(r"(?i)\b{}{}\b", name, suffix)) {
                Ok(re) => re.is_match(&rewritten),
                Err(e) => {
                    warn!("Skipping honorific for '{}': {}", found.bare_name, e);
                    continue;
                }
            };
            if already {
                continue;
            }

            let bare = match Regex::new(&format!(r"(?i)\b{}\b", name)) {
                Ok(re) => re,
                Err(e) => {
                    warn!("Skipping honorific for '{}': {}", found.bare_name, e);
                    continue;
                }
            };

            let target = bare
                .find_iter(&rewritten)
                .find(|m| !followed_by_suffix(&rewritten[m.end()..], &found.suffix))
                .map(|m| m.range());
            if let Some(range) = target {
                rewritten.replace_range(range, &found.name_with_suffix);
            }
        }

        let collapsed = self.spaces.replace_all(&rewritten, " ");
        self.collapse_repeated(collapsed.trim())
    }

    /// Collapse runs of the same suffix (`-san-san` -> `-san`)
    pub fn collapse_repeated(&self, text: &str) -> String {
        let mut result = text.to_string();
        for pattern in &self.patterns {
            while pattern.repeated.is_match(&result) {
                result = pattern.repeated.replace_all(&result, NoExpand(&pattern.suffix)).into_owned();
            }
        }
        result
    }

    /// Transfer honorifics from `source` onto `target` in place
    pub fn transfer(&self, source: &SubtitleCollection, target: &mut SubtitleCollection) -> TransferStats {
        let mut stats = TransferStats::default();

        for entry in &source.entries {
            stats.lines_scanned += 1;

            let matches = self.find_honorifics(&entry.text);
            if matches.is_empty() {
                continue;
            }
            stats.lines_with_honorifics += 1;

            let Some(index) = self.find_target_index(entry.start_time_ms, &entry.text, target) else {
                debug!(
                    "No Spanish line within {} ms of source line at {} ms",
                    self.window_ms, entry.start_time_ms
                );
                stats.misses += 1;
                continue;
            };

            let line = &mut target.entries[index];
            let rewritten = self.rewrite_line(&line.text, &matches);
            if rewritten != line.text {
                debug!("Line {}: '{}' -> '{}'", line.seq_num, line.text, rewritten);
                line.text = rewritten;
                stats.lines_rewritten += 1;
            }
        }

        stats
    }
}

/// Whether `rest` starts with optional non-word characters and then `suffix`
fn followed_by_suffix(rest: &str, suffix: &str) -> bool {
    let suffix = suffix.to_lowercase();
    let mut position = 0;

    loop {
        let tail = &rest[position..];
        if tail.to_lowercase().starts_with(&suffix) {
            return true;
        }
        match tail.chars().next() {
            Some(c) if !(c.is_alphanumeric() || c == '_') => position += c.len_utf8(),
            _ => return false,
        }
    }
}
