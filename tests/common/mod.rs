/*!
 * Common test utilities for the weebanizer test suite
 */

#![allow(dead_code)]

use anyhow::Result;
use async_trait::async_trait;
use parking_lot::Mutex;
use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};
use tempfile::TempDir;

use weebanizer::demux::{Demuxer, Track};
use weebanizer::errors::ExtractionError;

/// Spanish track with a credit line and a line that receives an honorific
pub const SPANISH_SRT: &str = "1
00:00:01,000 --> 00:00:01,900
Traducción: X

2
00:00:02,000 --> 00:00:03,000
Hola Alice
";

/// English track aligned 50 ms after the Spanish line
pub const ENGLISH_SRT: &str = "1
00:00:02,050 --> 00:00:03,000
Alice-san, wait!
";

/// Malay track with a different honorific
pub const MALAY_SRT: &str = "1
00:00:02,100 --> 00:00:03,000
Alice-chan, tunggu!
";

/// Styled Spanish script
pub const SPANISH_ASS: &str = "[Script Info]
Title: Episodio 1
ScriptType: v4.00+

[V4+ Styles]
Format: Name, Fontname, Fontsize, PrimaryColour, SecondaryColour, OutlineColour, BackColour, Bold, Italic, Underline, StrikeOut, ScaleX, ScaleY, Spacing, Angle, BorderStyle, Outline, Shadow, Alignment, MarginL, MarginR, MarginV, Encoding
Style: Default,Arial,20,&H00FFFFFF,&H000000FF,&H00000000,&H00000000,0,0,0,0,100,100,0,0,1,2,2,2,10,10,10,1

[Events]
Format: Layer, Start, End, Style, Name, MarginL, MarginR, MarginV, Effect, Text
Dialogue: 0,0:00:01.00,0:00:01.90,Default,,0,0,0,,Traducción: X
Dialogue: 0,0:00:02.00,0:00:03.00,Default,,0,0,0,,Hola Alice, ¿cómo estás?
";

/// Install env_logger once for tests that want log output
pub fn init_logger() {
    let _ = env_logger::builder().is_test(true).try_init();
}

/// Creates a temporary directory for test files
pub fn create_temp_dir() -> Result<TempDir> {
    Ok(TempDir::new()?)
}

/// Creates a test file with the given content in the specified directory
pub fn create_test_file(dir: &Path, filename: &str, content: &str) -> Result<PathBuf> {
    let file_path = dir.join(filename);
    if let Some(parent) = file_path.parent() {
        fs::create_dir_all(parent)?;
    }
    fs::write(&file_path, content)?;
    Ok(file_path)
}

/// Demuxer that serves fixed tracks from memory
pub struct FixtureDemuxer {
    tracks: Vec<Track>,
    contents: HashMap<u64, String>,
    fail_identify: bool,
    extracted: Mutex<Vec<u64>>,
}

impl FixtureDemuxer {
    pub fn new() -> Self {
        Self {
            tracks: Vec::new(),
            contents: HashMap::new(),
            fail_identify: false,
            extracted: Mutex::new(Vec::new()),
        }
    }

    /// Add a track whose extraction writes `content`
    pub fn with_track(mut self, track: Track, content: &str) -> Self {
        self.contents.insert(track.id, content.to_string());
        self.tracks.push(track);
        self
    }

    /// Add a track whose extraction fails
    pub fn with_broken_track(mut self, track: Track) -> Self {
        self.tracks.push(track);
        self
    }

    pub fn failing_identify(mut self) -> Self {
        self.fail_identify = true;
        self
    }

    /// Ids passed to `extract`, in call order
    pub fn extracted(&self) -> Vec<u64> {
        self.extracted.lock().clone()
    }

    /// Spanish, English and Malay tracks of a typical release
    pub fn standard() -> Self {
        Self::new()
            .with_track(Track::subtitle(2, "spa", "es-ES", "Spanish"), SPANISH_SRT)
            .with_track(Track::subtitle(3, "eng", "en", "English"), ENGLISH_SRT)
            .with_track(Track::subtitle(4, "may", "ms", "Malay"), MALAY_SRT)
    }
}

#[async_trait]
impl Demuxer for FixtureDemuxer {
    async fn identify(&self, _container: &Path) -> Result<Vec<Track>, ExtractionError> {
        if self.fail_identify {
            return Err(ExtractionError::ToolFailed {
                tool: "mkvmerge".to_string(),
                stderr: "not a Matroska file".to_string(),
            });
        }
        Ok(self.tracks.clone())
    }

    async fn extract(&self, _container: &Path, track_id: u64, output: &Path) -> Result<(), ExtractionError> {
        self.extracted.lock().push(track_id);
        let content = self.contents.get(&track_id).ok_or_else(|| ExtractionError::ToolFailed {
            tool: "mkvextract".to_string(),
            stderr: format!("track {} is broken", track_id),
        })?;
        fs::write(output, content).map_err(|e| ExtractionError::Spawn {
            tool: "mkvextract".to_string(),
            message: e.to_string(),
        })
    }
}
