use std::fmt;
use std::fs;
use std::fmt::Write as _;
use regex::Regex;
use once_cell::sync::Lazy;
use std::path::{Path, PathBuf};
use log::{warn, debug};
use crate::errors::SubtitleError;

// @module: Subtitle document parsing and serialization

// @const: SRT timestamp regex
static TIMESTAMP_REGEX: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(\d{1,2}:\d{2}:\d{2}[,.]\d{3})\s*-->\s*(\d{1,2}:\d{2}:\d{2}[,.]\d{3})").unwrap()
});

/// Line break marker used inside subtitle text, whatever the source format
pub const LINE_BREAK: &str = "\\N";

// @const: Event format written for documents without a script header
const DEFAULT_EVENT_FORMAT: [&str; 10] = [
    "Layer", "Start", "End", "Style", "Name", "MarginL", "MarginR", "MarginV", "Effect", "Text",
];

/// Supported subtitle file formats
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SubtitleFormat {
    /// Advanced SubStation Alpha (also covers SSA)
    Ass,
    /// SubRip
    Srt,
}

impl SubtitleFormat {
    /// Detect the format from file content
    pub fn detect(content: &str) -> Self {
        let head = content.trim_start_matches('\u{feff}').trim_start();
        if head.starts_with("[Script Info]") || content.contains("\n[Events]") || content.contains("\nDialogue:") {
            SubtitleFormat::Ass
        } else {
            SubtitleFormat::Srt
        }
    }
}

impl fmt::Display for SubtitleFormat {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            SubtitleFormat::Ass => write!(f, "ASS"),
            SubtitleFormat::Srt => write!(f, "SRT"),
        }
    }
}

/// Raw ASS event: line kind plus every field in `Format:` order
#[derive(Debug, Clone, PartialEq)]
pub struct AssEvent {
    /// `Dialogue` or `Comment`
    pub kind: String,
    pub fields: Vec<String>,
}

/// Everything in an ASS file that is not an event line
#[derive(Debug, Clone, PartialEq)]
pub struct AssScript {
    /// Lines up to and including the `[Events]` Format line
    pub header_lines: Vec<String>,
    /// Lowercased field names from the Format line
    pub format: Vec<String>,
    /// Sections that follow the events, kept verbatim
    pub trailing_lines: Vec<String>,
}

impl AssScript {
    /// Script header used when writing a document that came from SRT
    pub fn default_script() -> Self {
        let mut header = String::new();
        let _ = writeln!(header, "[Script Info]");
        let _ = writeln!(header, "ScriptType: v4.00+");
        let _ = writeln!(header, "PlayResX: 384");
        let _ = writeln!(header, "PlayResY: 288");
        let _ = writeln!(header, "ScaledBorderAndShadow: yes");
        let _ = writeln!(header);
        let _ = writeln!(header, "[V4+ Styles]");
        let _ = writeln!(
            header,
            "Format: Name, Fontname, Fontsize, PrimaryColour, SecondaryColour, OutlineColour, BackColour, \
             Bold, Italic, Underline, StrikeOut, ScaleX, ScaleY, Spacing, Angle, BorderStyle, Outline, \
             Shadow, Alignment, MarginL, MarginR, MarginV, Encoding"
        );
        let _ = writeln!(
            header,
            "Style: Default,Arial,20,&H00FFFFFF,&H000000FF,&H00000000,&H00000000,0,0,0,0,100,100,0,0,1,2,2,2,10,10,10,1"
        );
        let _ = writeln!(header);
        let _ = writeln!(header, "[Events]");
        let _ = write!(header, "Format: {}", DEFAULT_EVENT_FORMAT.join(", "));

        AssScript {
            header_lines: header.lines().map(|l| l.to_string()).collect(),
            format: DEFAULT_EVENT_FORMAT.iter().map(|f| f.to_lowercase()).collect(),
            trailing_lines: Vec::new(),
        }
    }

    fn field_index(&self, name: &str) -> Option<usize> {
        self.format.iter().position(|f| f == name)
    }

    /// Fields for a new Dialogue line in this script's layout
    fn default_event_fields(&self) -> Vec<String> {
        self.format
            .iter()
            .map(|name| match name.as_str() {
                "layer" | "marginl" | "marginr" | "marginv" => "0".to_string(),
                "style" => "Default".to_string(),
                _ => String::new(),
            })
            .collect()
    }
}

// @struct: Single subtitle entry
#[derive(Debug, Clone)]
pub struct SubtitleEntry {
    // @field: Sequence number
    pub seq_num: usize,

    // @field: Start time in ms
    pub start_time_ms: u64,

    // @field: End time in ms
    pub end_time_ms: u64,

    // @field: Subtitle text, line breaks as `\N`
    pub text: String,

    // @field: Original ASS fields, if the entry came from an ASS file
    pub event: Option<AssEvent>,
}

impl SubtitleEntry {
    /// Creates a new subtitle entry
    pub fn new(seq_num: usize, start_time_ms: u64, end_time_ms: u64, text: String) -> Self {
        SubtitleEntry {
            seq_num,
            start_time_ms,
            end_time_ms,
            text,
            event: None,
        }
    }

    /// Parse an SRT timestamp (HH:MM:SS,mmm) to milliseconds
    pub fn parse_timestamp(timestamp: &str) -> Result<u64, SubtitleError> {
        let invalid = || SubtitleError::InvalidTimestamp(timestamp.to_string());
        let parts: Vec<&str> = timestamp.trim().split(&[':', ',', '.'][..]).collect();

        if parts.len() != 4 {
            return Err(invalid());
        }

        let hours: u64 = parts[0].parse().map_err(|_| invalid())?;
        let minutes: u64 = parts[1].parse().map_err(|_| invalid())?;
        let seconds: u64 = parts[2].parse().map_err(|_| invalid())?;
        let millis: u64 = parts[3].parse().map_err(|_| invalid())?;

        if minutes >= 60 || seconds >= 60 || millis >= 1000 {
            return Err(invalid());
        }

        Ok(hours * 3_600_000 + minutes * 60_000 + seconds * 1_000 + millis)
    }

    /// Parse an ASS timestamp (H:MM:SS.cc) to milliseconds
    pub fn parse_ass_timestamp(timestamp: &str) -> Result<u64, SubtitleError> {
        let invalid = || SubtitleError::InvalidTimestamp(timestamp.to_string());
        let mut parts = timestamp.trim().split(':');
        let (Some(h), Some(m), Some(s), None) = (parts.next(), parts.next(), parts.next(), parts.next()) else {
            return Err(invalid());
        };

        let hours: u64 = h.parse().map_err(|_| invalid())?;
        let minutes: u64 = m.parse().map_err(|_| invalid())?;
        let (secs, frac) = s.split_once('.').unwrap_or((s, "0"));
        let seconds: u64 = secs.parse().map_err(|_| invalid())?;

        // Fraction may be given in tenths, centiseconds or milliseconds
        let frac_value: u64 = frac.parse().map_err(|_| invalid())?;
        let millis = match frac.len() {
            1 => frac_value * 100,
            2 => frac_value * 10,
            3 => frac_value,
            _ => return Err(invalid()),
        };

        if minutes >= 60 || seconds >= 60 {
            return Err(invalid());
        }

        Ok(hours * 3_600_000 + minutes * 60_000 + seconds * 1_000 + millis)
    }

    /// Format a timestamp in milliseconds to ASS format (H:MM:SS.cc)
    pub fn format_ass_timestamp(ms: u64) -> String {
        let total_cs = (ms + 5) / 10;
        let hours = total_cs / 360_000;
        let minutes = (total_cs % 360_000) / 6_000;
        let seconds = (total_cs % 6_000) / 100;
        let centis = total_cs % 100;

        format!("{}:{:02}:{:02}.{:02}", hours, minutes, seconds, centis)
    }

    /// Text split on the internal line break marker
    pub fn segments(&self) -> impl Iterator<Item = &str> {
        self.text.split(LINE_BREAK)
    }
}

/// Collection of subtitle entries with metadata
#[derive(Debug, Clone)]
pub struct SubtitleCollection {
    /// Source filename
    pub source_file: PathBuf,

    /// List of subtitle entries, in presentation order
    pub entries: Vec<SubtitleEntry>,

    /// Language key of the document
    pub source_language: String,

    /// Format the document was read from
    pub format: SubtitleFormat,

    /// ASS header and trailer, if read from an ASS file
    pub script: Option<AssScript>,
}

impl SubtitleCollection {
    /// Build a collection from entries, mostly for tests and in-memory use
    pub fn from_entries(entries: Vec<SubtitleEntry>, source_language: &str) -> Self {
        SubtitleCollection {
            source_file: PathBuf::new(),
            entries,
            source_language: source_language.to_string(),
            format: SubtitleFormat::Ass,
            script: None,
        }
    }

    /// Load a subtitle file, detecting its format from the content
    pub fn load<P: AsRef<Path>>(path: P, source_language: &str) -> Result<Self, SubtitleError> {
        let path = path.as_ref();
        let bytes = fs::read(path).map_err(|source| SubtitleError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        let content = String::from_utf8_lossy(&bytes);

        let mut collection = Self::parse_str(&content, source_language)?;
        collection.source_file = path.to_path_buf();
        debug!(
            "Loaded {} {} entries from {:?}",
            collection.entries.len(),
            collection.format,
            path
        );
        Ok(collection)
    }

    /// Parse subtitle content of either supported format
    pub fn parse_str(content: &str, source_language: &str) -> Result<Self, SubtitleError> {
        let content = content.trim_start_matches('\u{feff}');
        match SubtitleFormat::detect(content) {
            SubtitleFormat::Ass => {
                let (script, entries) = Self::parse_ass_string(content)?;
                Ok(SubtitleCollection {
                    source_file: PathBuf::new(),
                    entries,
                    source_language: source_language.to_string(),
                    format: SubtitleFormat::Ass,
                    script: Some(script),
                })
            }
            SubtitleFormat::Srt => {
                let entries = Self::parse_srt_string(content)?;
                Ok(SubtitleCollection {
                    source_file: PathBuf::new(),
                    entries,
                    source_language: source_language.to_string(),
                    format: SubtitleFormat::Srt,
                    script: None,
                })
            }
        }
    }

    /// Whether the document has no entries
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Serialize as an ASS script
    pub fn to_ass_string(&self) -> String {
        let default_script;
        let script = match &self.script {
            Some(script) => script,
            None => {
                default_script = AssScript::default_script();
                &default_script
            }
        };

        let start_idx = script.field_index("start");
        let end_idx = script.field_index("end");
        let text_idx = script.field_index("text");

        let mut output = String::new();
        for line in &script.header_lines {
            output.push_str(line);
            output.push('\n');
        }

        for entry in &self.entries {
            let (kind, mut fields) = match &entry.event {
                Some(event) if event.fields.len() == script.format.len() => {
                    (event.kind.as_str(), event.fields.clone())
                }
                _ => ("Dialogue", script.default_event_fields()),
            };

            if let Some(i) = start_idx {
                fields[i] = SubtitleEntry::format_ass_timestamp(entry.start_time_ms);
            }
            if let Some(i) = end_idx {
                fields[i] = SubtitleEntry::format_ass_timestamp(entry.end_time_ms);
            }
            if let Some(i) = text_idx {
                fields[i] = entry.text.clone();
            }

            output.push_str(kind);
            output.push_str(": ");
            output.push_str(&fields.join(","));
            output.push('\n');
        }

        for line in &script.trailing_lines {
            output.push_str(line);
            output.push('\n');
        }

        output
    }

    /// Parse an ASS script into its header and event entries
    pub fn parse_ass_string(content: &str) -> Result<(AssScript, Vec<SubtitleEntry>), SubtitleError> {
        let mut header_lines = Vec::new();
        let mut trailing_lines = Vec::new();
        let mut format: Vec<String> = Vec::new();
        let mut entries = Vec::new();
        let mut section = String::new();
        let mut events_done = false;

        for (line_no, line) in content.lines().enumerate() {
            let trimmed = line.trim();

            if trimmed.starts_with('[') && trimmed.ends_with(']') {
                if section == "[events]" && !entries.is_empty() {
                    events_done = true;
                }
                section = trimmed.to_lowercase();
            }

            if events_done {
                trailing_lines.push(line.to_string());
                continue;
            }

            if section != "[events]" {
                header_lines.push(line.to_string());
                continue;
            }

            if let Some(fields) = trimmed.strip_prefix("Format:") {
                format = fields.split(',').map(|f| f.trim().to_lowercase()).collect();
                header_lines.push(line.to_string());
                continue;
            }

            let Some((kind, body)) = trimmed.split_once(':') else {
                if entries.is_empty() {
                    header_lines.push(line.to_string());
                }
                continue;
            };

            if kind != "Dialogue" && kind != "Comment" {
                if entries.is_empty() {
                    header_lines.push(line.to_string());
                }
                continue;
            }

            if format.is_empty() {
                return Err(SubtitleError::MissingFormat);
            }

            let fields: Vec<String> = body
                .trim_start()
                .splitn(format.len(), ',')
                .map(|f| f.to_string())
                .collect();
            if fields.len() != format.len() {
                warn!("Skipping malformed event at line {}: {}", line_no + 1, trimmed);
                continue;
            }

            let field = |name: &str| format.iter().position(|f| f == name).map(|i| fields[i].as_str());
            let (Some(start), Some(end)) = (field("start"), field("end")) else {
                return Err(SubtitleError::MissingFormat);
            };

            let start_ms = SubtitleEntry::parse_ass_timestamp(start)?;
            let end_ms = SubtitleEntry::parse_ass_timestamp(end)?;
            let text = field("text").unwrap_or_default().to_string();

            entries.push(SubtitleEntry {
                seq_num: entries.len() + 1,
                start_time_ms: start_ms,
                end_time_ms: end_ms,
                text,
                event: Some(AssEvent {
                    kind: kind.to_string(),
                    fields,
                }),
            });
        }

        if format.is_empty() {
            return Err(SubtitleError::MissingFormat);
        }

        // Blank separator lines before the first event belong to no section
        while header_lines.last().is_some_and(|l| l.trim().is_empty()) {
            header_lines.pop();
        }

        Ok((
            AssScript {
                header_lines,
                format,
                trailing_lines,
            },
            entries,
        ))
    }

    /// Parse SRT format string into subtitle entries
    ///
    /// Cues with empty text or a zero duration are kept so that line
    /// positions match the source file.
    pub fn parse_srt_string(content: &str) -> Result<Vec<SubtitleEntry>, SubtitleError> {
        let mut entries = Vec::new();

        // State variables for parsing
        let mut current_seq_num: Option<usize> = None;
        let mut current_times: Option<(u64, u64)> = None;
        let mut current_text: Vec<String> = Vec::new();

        let mut add_current_entry = |seq_num: usize, (start_ms, end_ms): (u64, u64), lines: &mut Vec<String>| {
            if end_ms < start_ms {
                debug!("Entry {} ends before it starts ({} < {})", seq_num, end_ms, start_ms);
            }
            entries.push(SubtitleEntry::new(seq_num, start_ms, end_ms, lines.join(LINE_BREAK)));
            lines.clear();
        };

        for (line_no, line) in content.lines().enumerate() {
            let trimmed = line.trim();

            // Blank line closes the current entry once its header is complete
            if trimmed.is_empty() {
                if let (Some(seq_num), Some(times)) = (current_seq_num, current_times) {
                    add_current_entry(seq_num, times, &mut current_text);
                    current_seq_num = None;
                    current_times = None;
                }
                continue;
            }

            if current_seq_num.is_none() {
                if let Ok(num) = trimmed.parse::<usize>() {
                    current_seq_num = Some(num);
                    continue;
                }
            }

            if current_seq_num.is_some() && current_times.is_none() {
                if let Some(caps) = TIMESTAMP_REGEX.captures(trimmed) {
                    current_times = Some((SubtitleEntry::parse_timestamp(&caps[1])?, SubtitleEntry::parse_timestamp(&caps[2])?));
                    continue;
                }
            }

            if current_seq_num.is_some() && current_times.is_some() {
                current_text.push(trimmed.to_string());
            } else {
                warn!("Unexpected text at line {} before sequence number or timestamp: {}", line_no + 1, trimmed);
            }
        }

        if let (Some(seq_num), Some(times)) = (current_seq_num, current_times) {
            add_current_entry(seq_num, times, &mut current_text);
        }

        if entries.is_empty() {
            return Err(SubtitleError::NoEntries("SRT content".to_string()));
        }

        let overlap_count = entries
            .windows(2)
            .filter(|pair| pair[0].end_time_ms > pair[1].start_time_ms)
            .count();
        if overlap_count > 0 {
            debug!("Found {} overlapping subtitle entries", overlap_count);
        }

        // Renumber entries to ensure sequential order
        for (i, entry) in entries.iter_mut().enumerate() {
            entry.seq_num = i + 1;
        }

        Ok(entries)
    }
}
