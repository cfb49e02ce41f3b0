/*!
 * Best subtitle track per language bucket.
 *
 * Tracks are bucketed from their `language` and `language_ietf` tags and
 * scored against the configured priority table.
 */

use log::debug;
use std::collections::BTreeMap;

use crate::app_config::{BucketPriority, LanguageBucket, PriorityTable};
use crate::demux::{Track, TrackKind};
use crate::language_utils;

/// A track together with the score it obtained in its bucket
#[derive(Debug, Clone, PartialEq)]
pub struct ScoredTrack {
    pub track: Track,
    pub score: u32,
}

/// Best track per bucket; a missing bucket means "track unavailable"
#[derive(Debug, Clone, Default, PartialEq)]
pub struct TrackSelection {
    picks: BTreeMap<LanguageBucket, ScoredTrack>,
}

impl TrackSelection {
    pub fn get(&self, bucket: LanguageBucket) -> Option<&ScoredTrack> {
        self.picks.get(&bucket)
    }

    pub fn is_empty(&self) -> bool {
        self.picks.is_empty()
    }

    /// Selected tracks, target bucket first
    pub fn iter(&self) -> impl Iterator<Item = (LanguageBucket, &ScoredTrack)> {
        self.picks.iter().map(|(bucket, pick)| (*bucket, pick))
    }
}

/// Scores subtitle tracks against a priority table
#[derive(Debug, Clone)]
pub struct TrackScorer<'a> {
    table: &'a PriorityTable,
}

impl<'a> TrackScorer<'a> {
    pub fn new(table: &'a PriorityTable) -> Self {
        Self { table }
    }

    /// Decide which bucket a track belongs to, if any
    pub fn assign_bucket(&self, track: &Track) -> Option<LanguageBucket> {
        let language = track.language.trim().to_lowercase();
        let ietf = track.language_ietf.trim().to_lowercase();

        if let Some(entry) = self.table.buckets.iter().find(|b| !ietf.is_empty() && b.bucket.key() == ietf) {
            return Some(entry.bucket);
        }

        let by_substring = self
            .table
            .buckets
            .iter()
            .find(|b| {
                let key = b.bucket.key();
                ietf.contains(key) || language.contains(key)
            })
            .map(|b| b.bucket);
        if by_substring.is_some() {
            return by_substring;
        }

        // Tags like `und` + `es-419` name no bucket directly
        let primary = language_utils::primary_subtag(&ietf);
        let code = language_utils::normalize_to_part2b(primary).ok()?;
        self.table.buckets.iter().find(|b| b.bucket.key() == code).map(|b| b.bucket)
    }

    /// Score a track within its bucket
    pub fn score_track(&self, track: &Track, priority: &BucketPriority) -> u32 {
        let title = track.title.to_lowercase();
        let language = track.language.to_lowercase();

        priority
            .variants
            .iter()
            .find(|variant| variant.matches(&title, &language))
            .map(|variant| variant.score)
            .unwrap_or(priority.default_score)
    }

    /// Pick the highest scoring subtitle track per bucket; ties keep the earlier track
    pub fn select_best(&self, tracks: &[Track]) -> TrackSelection {
        let mut selection = TrackSelection::default();

        for track in tracks.iter().filter(|t| t.kind == TrackKind::Subtitles) {
            let Some(bucket) = self.assign_bucket(track) else {
                debug!("Ignoring track {} (language '{}', IETF '{}')", track.id, track.language, track.language_ietf);
                continue;
            };
            let Some(priority) = self.table.get(bucket) else {
                continue;
            };

            let score = self.score_track(track, priority);
            let best_score = selection.get(bucket).map_or(0, |pick| pick.score);
            if score > best_score {
                selection.picks.insert(
                    bucket,
                    ScoredTrack {
                        track: track.clone(),
                        score,
                    },
                );
            }
        }

        selection
    }
}
