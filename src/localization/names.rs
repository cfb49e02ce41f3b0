use log::{debug, info, warn};
use once_cell::sync::Lazy;
use regex::{NoExpand, Regex};
use std::collections::{BTreeMap, BTreeSet};

use crate::providers::Provider;
use crate::subtitle_processor::{SubtitleCollection, LINE_BREAK};

// @const: Two capitalized words, e.g. "Naruto Uzumaki"
static NAME_PAIR_REGEX: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"\b([A-Z][a-zÀ-ÖØ-öø-ÿ]+)\s+([A-Z][a-zÀ-ÖØ-öø-ÿ]+)\b").unwrap()
});

/// Header placed before the candidate list in the oracle request
pub const NAME_LIST_HEADER: &str = "Lista de nombres:\n";

/// Original "First Second" pair to its inverted "Second First" form
pub type NameInversionMap = BTreeMap<String, String>;

/// Result of the name normalization stage
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum NormalizeOutcome {
    /// No oracle configured
    #[default]
    Disabled,
    /// Nothing looked like a name pair; the oracle was not called
    NoCandidates,
    /// The oracle call failed
    OracleFailed(String),
    /// The oracle answered with nothing
    EmptyReply,
    /// The reply confirmed none of the candidates
    NoMappings,
    Applied { mappings: usize, lines_changed: usize },
}

/// Reorders "Name Surname" pairs confirmed by an oracle
#[derive(Debug, Clone)]
pub struct NameNormalizer {
    instructions: String,
}

impl NameNormalizer {
    pub fn new(instructions: impl Into<String>) -> Self {
        Self {
            instructions: instructions.into(),
        }
    }

    /// Distinct capitalized word pairs, never spanning a `\N` break
    pub fn detect_candidates(&self, document: &SubtitleCollection) -> BTreeSet<String> {
        let mut candidates = BTreeSet::new();

        for entry in &document.entries {
            for segment in entry.text.split(LINE_BREAK) {
                for caps in NAME_PAIR_REGEX.captures_iter(segment) {
                    candidates.insert(format!("{} {}", &caps[1], &caps[2]));
                }
            }
        }

        candidates
    }

    /// Newline separated, sorted candidate list
    pub fn build_request(&self, candidates: &BTreeSet<String>) -> String {
        candidates.iter().map(String::as_str).collect::<Vec<_>>().join("\n")
    }

    /// Admit only candidates whose exact word swap appears as a reply line
    pub fn parse_reply(&self, reply: &str, candidates: &BTreeSet<String>) -> NameInversionMap {
        let lines: Vec<Vec<&str>> = reply
            .lines()
            .map(str::trim)
            .filter(|line| !line.is_empty())
            .map(|line| line.split_whitespace().collect())
            .collect();

        let mut map = NameInversionMap::new();
        for candidate in candidates {
            let parts: Vec<&str> = candidate.split_whitespace().collect();
            let [first, second] = parts.as_slice() else {
                continue;
            };

            let confirmed = lines
                .iter()
                .any(|words| words.len() == 2 && words[0] == *second && words[1] == *first);
            if confirmed {
                let inverted = format!("{} {}", second, first);
                info!("Name mapping: '{}' -> '{}'", candidate, inverted);
                map.insert(candidate.clone(), inverted);
            }
        }

        map
    }

    /// Replace whole-word occurrences, longest originals first; returns changed line count
    pub fn apply(&self, document: &mut SubtitleCollection, map: &NameInversionMap) -> usize {
        let mut ordered: Vec<(&String, &String)> = map.iter().collect();
        ordered.sort_by(|a, b| b.0.chars().count().cmp(&a.0.chars().count()).then_with(|| a.0.cmp(b.0)));

        let mut patterns = Vec::with_capacity(ordered.len());
        for (original, inverted) in ordered {
            match Regex::new(&format!(r"\b{}\b", regex::escape(original))) {
                Ok(re) => patterns.push((re, inverted.as_str())),
                Err(e) => warn!("Skipping name mapping '{}': {}", original, e),
            }
        }

        let mut changed = 0;
        for entry in &mut document.entries {
            let mut text = entry.text.clone();
            for (pattern, inverted) in &patterns {
                text = pattern.replace_all(&text, NoExpand(inverted)).into_owned();
            }
            if text != entry.text {
                entry.text = text;
                changed += 1;
            }
        }

        changed
    }

    /// Detect, ask the oracle, and apply; the document is untouched on any failure
    pub async fn normalize(&self, document: &mut SubtitleCollection, oracle: &dyn Provider) -> NormalizeOutcome {
        let candidates = self.detect_candidates(document);
        if candidates.is_empty() {
            info!("No name pairs detected, skipping name normalization");
            return NormalizeOutcome::NoCandidates;
        }

        let preview: Vec<&str> = candidates.iter().take(5).map(String::as_str).collect();
        debug!("Name pairs sent to {} ({} total): {}...", oracle.name(), candidates.len(), preview.join(", "));

        let input = format!("{}{}", NAME_LIST_HEADER, self.build_request(&candidates));
        let reply = match oracle.complete(&self.instructions, &input).await {
            Ok(reply) => reply,
            Err(e) => {
                warn!("Name inversion request to {} failed: {}", oracle.name(), e);
                return NormalizeOutcome::OracleFailed(e.to_string());
            }
        };

        if reply.trim().is_empty() {
            warn!("{} returned an empty reply, names left unchanged", oracle.name());
            return NormalizeOutcome::EmptyReply;
        }

        let map = self.parse_reply(&reply, &candidates);
        if map.is_empty() {
            warn!("{} confirmed no name inversions", oracle.name());
            return NormalizeOutcome::NoMappings;
        }

        let lines_changed = self.apply(document, &map);
        NormalizeOutcome::Applied {
            mappings: map.len(),
            lines_changed,
        }
    }
}
