use anyhow::{Result, Context};
use std::fs;
use std::path::{Path, PathBuf};
use walkdir::WalkDir;
use std::fs::OpenOptions;
use std::io::Write;
use chrono::Local;
use log::debug;

// @module: File and directory utilities

/// Extension of the containers the tool processes
pub const CONTAINER_EXTENSION: &str = "mkv";

/// Suffix appended to the stem of a backed up external subtitle
pub const BACKUP_SUFFIX: &str = "_original";

// @const: External subtitle extensions, checked in order
const SIDE_FILE_EXTENSIONS: [&str; 2] = ["ass", "srt"];

/// External Spanish subtitle used as the working copy
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WorkingCopy {
    /// The `<stem>_original.<ext>` file that gets read
    pub path: PathBuf,
    /// True when the backup already existed from an earlier run
    pub reused: bool,
}

// @struct: File operations utility
pub struct FileManager;

impl FileManager {
    // @checks: File existence
    pub fn file_exists<P: AsRef<Path>>(path: P) -> bool {
        path.as_ref().is_file()
    }

    // @checks: Directory existence
    pub fn dir_exists<P: AsRef<Path>>(path: P) -> bool {
        path.as_ref().is_dir()
    }

    // @creates: Directory and parents if needed
    pub fn ensure_dir<P: AsRef<Path>>(path: P) -> Result<()> {
        let path = path.as_ref();
        if !path.exists() {
            fs::create_dir_all(path)?;
        }
        Ok(())
    }

    /// Whether the path names a Matroska container
    pub fn is_container<P: AsRef<Path>>(path: P) -> bool {
        path.as_ref()
            .extension()
            .is_some_and(|ext| ext.to_string_lossy().eq_ignore_ascii_case(CONTAINER_EXTENSION))
    }

    /// Find files with a specific extension in a directory
    pub fn find_files<P: AsRef<Path>>(dir: P, extension: &str) -> Result<Vec<PathBuf>> {
        let mut result = Vec::new();
        let wanted = extension.trim_start_matches('.');

        for entry in WalkDir::new(dir.as_ref()).follow_links(true).sort_by_file_name() {
            let entry = entry.context("Failed to read directory entry")?;
            let path = entry.path();

            if path.is_file() {
                if let Some(ext) = path.extension() {
                    if ext.to_string_lossy().eq_ignore_ascii_case(wanted) {
                        result.push(path.to_path_buf());
                    }
                }
            }
        }

        Ok(result)
    }

    /// Expand the command line inputs into containers; returns (containers, skipped)
    pub fn collect_inputs(inputs: &[PathBuf]) -> Result<(Vec<PathBuf>, Vec<PathBuf>)> {
        let mut containers = Vec::new();
        let mut skipped = Vec::new();

        for input in inputs {
            if Self::dir_exists(input) {
                containers.extend(Self::find_files(input, CONTAINER_EXTENSION)?);
            } else if Self::is_container(input) && Self::file_exists(input) {
                containers.push(input.clone());
            } else {
                skipped.push(input.clone());
            }
        }

        Ok((containers, skipped))
    }

    /// `<dir>/<stem><suffix>.<ext>` next to the container
    pub fn sibling_path(container: &Path, suffix: &str, extension: &str) -> PathBuf {
        let stem = container.file_stem().unwrap_or_default().to_string_lossy();
        let file_name = format!("{}{}.{}", stem, suffix, extension);

        match container.parent() {
            Some(parent) => parent.join(file_name),
            None => PathBuf::from(file_name),
        }
    }

    /// Where the localized subtitle is written: `<stem>.ass`
    pub fn output_path(container: &Path) -> PathBuf {
        Self::sibling_path(container, "", "ass")
    }

    /// Back up an external `<stem>.ass|srt` as `<stem>_original.<ext>`.
    ///
    /// A backup left by an earlier run is reused as is, so running twice never
    /// mistakes the first run's output for the original subtitle.
    pub fn prepare_working_copy(container: &Path) -> std::io::Result<Option<WorkingCopy>> {
        for ext in SIDE_FILE_EXTENSIONS {
            let backup = Self::sibling_path(container, BACKUP_SUFFIX, ext);
            if backup.is_file() {
                debug!("Reusing existing backup {:?}", backup);
                return Ok(Some(WorkingCopy { path: backup, reused: true }));
            }
        }

        for ext in SIDE_FILE_EXTENSIONS {
            let external = Self::sibling_path(container, "", ext);
            if external.is_file() {
                let backup = Self::sibling_path(container, BACKUP_SUFFIX, ext);
                fs::rename(&external, &backup)?;
                debug!("Renamed {:?} to {:?}", external, backup);
                return Ok(Some(WorkingCopy { path: backup, reused: false }));
            }
        }

        Ok(None)
    }

    /// Write through a temporary file in the same directory, then rename
    pub fn write_atomically<P: AsRef<Path>>(path: P, content: &str) -> Result<()> {
        let path = path.as_ref();
        let dir = match path.parent() {
            Some(parent) if !parent.as_os_str().is_empty() => parent.to_path_buf(),
            _ => PathBuf::from("."),
        };
        Self::ensure_dir(&dir)?;

        let mut temp = tempfile::NamedTempFile::new_in(&dir)
            .with_context(|| format!("Failed to create temporary file in {:?}", dir))?;
        temp.write_all(content.as_bytes())
            .with_context(|| format!("Failed to write temporary file for {:?}", path))?;
        temp.persist(path)
            .map_err(|e| e.error)
            .with_context(|| format!("Failed to replace {:?}", path))?;

        Ok(())
    }

    /// Append content to a log file with timestamp
    pub fn append_to_log_file<P: AsRef<Path>>(path: P, content: &str) -> Result<()> {
        // Get current timestamp
        let timestamp = Local::now().format("%Y-%m-%d %H:%M:%S").to_string();

        // Ensure the parent directory exists
        if let Some(parent) = path.as_ref().parent() {
            if !parent.as_os_str().is_empty() {
                Self::ensure_dir(parent)?;
            }
        }

        // Open file in append mode, create if it doesn't exist
        let mut file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&path)
            .with_context(|| format!("Failed to open log file: {:?}", path.as_ref()))?;

        writeln!(file, "[{}] {}", timestamp, content)
            .with_context(|| format!("Failed to write to log file: {:?}", path.as_ref()))?;

        Ok(())
    }
}
