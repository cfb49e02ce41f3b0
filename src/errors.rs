/*!
 * Error types for the weebanizer application.
 *
 * Each layer gets its own error enum, using the thiserror crate for
 * ergonomic error definitions. Only target-document failures and
 * persistence failures abort a job; everything else is recoverable.
 */

use std::path::PathBuf;
use thiserror::Error;

/// Errors that can occur when working with oracle provider APIs
#[derive(Error, Debug)]
pub enum ProviderError {
    /// Error when making an API request fails
    #[error("API request failed: {0}")]
    RequestFailed(String),

    /// Error when parsing an API response fails
    #[error("Failed to parse API response: {0}")]
    ParseError(String),

    /// Error returned by the API itself
    #[error("API responded with error: {status_code} - {message}")]
    ApiError {
        /// HTTP status code
        status_code: u16,
        /// Error message from the API
        message: String,
    },

    /// Error establishing or maintaining a connection
    #[error("Connection error: {0}")]
    ConnectionError(String),

    /// Error with authentication
    #[error("Authentication error: {0}")]
    AuthenticationError(String),
}

/// Errors raised by the demuxing tools
#[derive(Error, Debug)]
pub enum ExtractionError {
    /// The external tool could not be started
    #[error("Failed to run {tool}: {message}")]
    Spawn { tool: String, message: String },

    /// The external tool exited with a failure status
    #[error("{tool} failed: {stderr}")]
    ToolFailed { tool: String, stderr: String },

    /// The external tool did not finish in time
    #[error("{tool} timed out after {secs} seconds")]
    Timeout { tool: String, secs: u64 },

    /// Container metadata could not be decoded
    #[error("Malformed container metadata: {0}")]
    Metadata(String),

    /// The tool ran but produced nothing usable
    #[error("Extracted file is empty: {0:?}")]
    EmptyOutput(PathBuf),
}

/// Errors that can occur while reading or writing subtitle documents
#[derive(Error, Debug)]
pub enum SubtitleError {
    /// A timestamp could not be parsed
    #[error("Invalid timestamp: {0}")]
    InvalidTimestamp(String),

    /// The [Events] section has no usable Format line
    #[error("Missing or invalid event format line")]
    MissingFormat,

    /// The document contains no subtitle lines at all
    #[error("No subtitle entries found in {0}")]
    NoEntries(String),

    /// Reading or writing the file failed
    #[error("I/O error on {path:?}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

/// Fatal conditions for a single document-pair job
#[derive(Error, Debug)]
pub enum PipelineError {
    /// No Spanish document could be obtained
    #[error("No Spanish subtitle available: {0}")]
    MissingTarget(String),

    /// The Spanish document exists but cannot be parsed
    #[error("Failed to load Spanish subtitle: {0}")]
    TargetUnreadable(#[from] SubtitleError),

    /// The container metadata could not be read at all
    #[error("Track selection failed: {0}")]
    Selection(#[from] ExtractionError),

    /// The external side file could not be backed up
    #[error("Failed to back up external subtitle {path:?}: {message}")]
    SideFile { path: PathBuf, message: String },

    /// Writing the final result failed
    #[error("Failed to save result to {path:?}: {message}")]
    Persist { path: PathBuf, message: String },
}
