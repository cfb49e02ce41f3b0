/*!
 * Container demuxing through the MKVToolNix command line tools.
 *
 * `mkvmerge -J` describes the tracks of a Matroska file and `mkvextract`
 * writes a single track to disk. Both are reached through the [`Demuxer`]
 * trait so the pipeline can be driven by fixtures in tests.
 */

use async_trait::async_trait;
use log::{debug, error};
use serde::Deserialize;
use std::path::{Path, PathBuf};
use std::process::Output;
use std::time::Duration;
use tokio::process::Command;

use crate::app_config::ToolsConfig;
use crate::errors::ExtractionError;

/// Kind of a container track
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TrackKind {
    Subtitles,
    Other,
}

/// Track metadata as reported by the container
#[derive(Debug, Clone, PartialEq)]
pub struct Track {
    /// Track id used for extraction
    pub id: u64,
    pub kind: TrackKind,
    pub codec: String,
    /// ISO 639-2 code, possibly `und`
    pub language: String,
    /// IETF tag, may be empty
    pub language_ietf: String,
    /// Track name, may be empty
    pub title: String,
}

impl Track {
    /// Build a subtitle track, mostly for fixtures
    pub fn subtitle(id: u64, language: &str, language_ietf: &str, title: &str) -> Self {
        Track {
            id,
            kind: TrackKind::Subtitles,
            codec: "SubStationAlpha".to_string(),
            language: language.to_string(),
            language_ietf: language_ietf.to_string(),
            title: title.to_string(),
        }
    }

    /// File extension matching the track codec
    pub fn file_extension(&self) -> &'static str {
        let codec = self.codec.to_lowercase();
        if codec.contains("subrip") || codec.contains("srt") {
            "srt"
        } else {
            "ass"
        }
    }
}

/// `mkvmerge -J` output
#[derive(Debug, Deserialize)]
struct IdentifyOutput {
    #[serde(default)]
    tracks: Vec<IdentifyTrack>,
}

#[derive(Debug, Deserialize)]
struct IdentifyTrack {
    id: u64,
    #[serde(rename = "type", default)]
    track_type: String,
    #[serde(default)]
    codec: String,
    #[serde(default)]
    properties: IdentifyProperties,
}

#[derive(Debug, Deserialize, Default)]
struct IdentifyProperties {
    #[serde(default)]
    language: Option<String>,
    #[serde(default)]
    language_ietf: Option<String>,
    #[serde(default)]
    track_name: Option<String>,
}

impl From<IdentifyTrack> for Track {
    fn from(raw: IdentifyTrack) -> Self {
        Track {
            id: raw.id,
            kind: if raw.track_type == "subtitles" {
                TrackKind::Subtitles
            } else {
                TrackKind::Other
            },
            codec: raw.codec,
            language: raw.properties.language.unwrap_or_default(),
            language_ietf: raw.properties.language_ietf.unwrap_or_default(),
            title: raw.properties.track_name.unwrap_or_default(),
        }
    }
}

/// Parse `mkvmerge -J` JSON into tracks
pub fn parse_identify_json(json: &str) -> Result<Vec<Track>, ExtractionError> {
    let output: IdentifyOutput =
        serde_json::from_str(json).map_err(|e| ExtractionError::Metadata(e.to_string()))?;
    Ok(output.tracks.into_iter().map(Track::from).collect())
}

/// Track listing and extraction for a media container
#[async_trait]
pub trait Demuxer: Send + Sync {
    /// List every track of the container
    async fn identify(&self, container: &Path) -> Result<Vec<Track>, ExtractionError>;

    /// Write one track to `output`
    async fn extract(&self, container: &Path, track_id: u64, output: &Path) -> Result<(), ExtractionError>;
}

/// Demuxer backed by mkvmerge and mkvextract
#[derive(Debug, Clone)]
pub struct MkvToolnix {
    mkvmerge: PathBuf,
    mkvextract: PathBuf,
    timeout: Duration,
}

impl MkvToolnix {
    pub fn new(tools: &ToolsConfig) -> Self {
        MkvToolnix {
            mkvmerge: PathBuf::from(&tools.mkvmerge_path),
            mkvextract: PathBuf::from(&tools.mkvextract_path),
            timeout: Duration::from_secs(tools.timeout_secs.max(1)),
        }
    }

    async fn run(&self, program: &Path, args: &[&std::ffi::OsStr]) -> Result<Output, ExtractionError> {
        let tool = tool_name(program);
        let future = Command::new(program).args(args).kill_on_drop(true).output();

        // Add timeout to prevent hanging on problematic files
        tokio::select! {
            result = future => result.map_err(|e| ExtractionError::Spawn {
                tool: tool.clone(),
                message: e.to_string(),
            }),
            _ = tokio::time::sleep(self.timeout) => Err(ExtractionError::Timeout {
                tool,
                secs: self.timeout.as_secs(),
            }),
        }
    }
}

#[async_trait]
impl Demuxer for MkvToolnix {
    async fn identify(&self, container: &Path) -> Result<Vec<Track>, ExtractionError> {
        let output = self
            .run(&self.mkvmerge, &["--identify".as_ref(), "-J".as_ref(), container.as_os_str()])
            .await?;

        // mkvmerge exits with 1 on warnings
        if !matches!(output.status.code(), Some(0) | Some(1)) {
            let message = filter_tool_output(&output);
            error!("mkvmerge failed on {:?}: {}", container, message);
            return Err(ExtractionError::ToolFailed {
                tool: tool_name(&self.mkvmerge),
                stderr: message,
            });
        }

        let stdout = String::from_utf8_lossy(&output.stdout);
        let tracks = parse_identify_json(&stdout)?;
        debug!("mkvmerge reported {} tracks in {:?}", tracks.len(), container);
        Ok(tracks)
    }

    async fn extract(&self, container: &Path, track_id: u64, output_path: &Path) -> Result<(), ExtractionError> {
        let mut target = std::ffi::OsString::from(format!("{}:", track_id));
        target.push(output_path.as_os_str());

        let output = self
            .run(&self.mkvextract, &[container.as_os_str(), "tracks".as_ref(), target.as_os_str()])
            .await?;

        if !matches!(output.status.code(), Some(0) | Some(1)) {
            let message = filter_tool_output(&output);
            error!("Track {} extraction failed: {}", track_id, message);
            return Err(ExtractionError::ToolFailed {
                tool: tool_name(&self.mkvextract),
                stderr: message,
            });
        }

        let size = std::fs::metadata(output_path).map(|m| m.len()).unwrap_or(0);
        if size == 0 {
            return Err(ExtractionError::EmptyOutput(output_path.to_path_buf()));
        }

        debug!("Extracted track {} to {:?} ({} bytes)", track_id, output_path, size);
        Ok(())
    }
}

fn tool_name(program: &Path) -> String {
    program
        .file_stem()
        .map(|s| s.to_string_lossy().to_string())
        .unwrap_or_else(|| program.to_string_lossy().to_string())
}

/// Keep only the meaningful lines of a tool's output, dropping the
/// version banner and progress noise. MKVToolNix prints errors on stdout.
fn filter_tool_output(output: &Output) -> String {
    let noise_prefixes = ["mkvmerge v", "mkvextract v", "Progress:", "Extracting track", "{", "}", "\""];

    let stderr = String::from_utf8_lossy(&output.stderr);
    let stdout = String::from_utf8_lossy(&output.stdout);

    let meaningful: Vec<&str> = stderr
        .lines()
        .chain(stdout.lines())
        .map(str::trim)
        .filter(|line| !line.is_empty() && !noise_prefixes.iter().any(|p| line.starts_with(p)))
        .collect();

    if meaningful.is_empty() {
        format!("exit status {}", output.status)
    } else {
        meaningful.join("\n")
    }
}
