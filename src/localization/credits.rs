use anyhow::{Context, Result};
use regex::Regex;

use crate::subtitle_processor::SubtitleCollection;

/// Blanks translator and editor credit lines
#[derive(Debug, Clone)]
pub struct CreditScrubber {
    pattern: Option<Regex>,
}

impl CreditScrubber {
    /// Build the scrubber from credit role labels such as `Traducción`
    pub fn new(labels: &[String]) -> Result<Self> {
        let alternatives: Vec<String> = labels
            .iter()
            .map(|label| label.trim())
            .filter(|label| !label.is_empty())
            .map(regex::escape)
            .collect();

        if alternatives.is_empty() {
            return Ok(Self { pattern: None });
        }

        let pattern = Regex::new(&format!("(?i)({}).*", alternatives.join("|")))
            .context("Failed to build credit line pattern")?;

        Ok(Self { pattern: Some(pattern) })
    }

    /// Whether a line of text is a credit line
    pub fn is_credit(&self, text: &str) -> bool {
        self.pattern.as_ref().is_some_and(|p| p.is_match(text))
    }

    /// Blank every credit line in place; returns how many lines were blanked
    pub fn scrub(&self, document: &mut SubtitleCollection) -> usize {
        let mut blanked = 0;

        for entry in &mut document.entries {
            if !entry.text.is_empty() && self.is_credit(&entry.text) {
                entry.text.clear();
                blanked += 1;
            }
        }

        blanked
    }
}
