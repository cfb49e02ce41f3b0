/*!
 * # Weebanizer - anime-style Spanish subtitles
 *
 * A Rust library that localizes the Spanish subtitles of Matroska videos.
 *
 * ## Features
 *
 * - Pick the best Spanish, English and Malay subtitle tracks of a container
 * - Blank translator and editor credit lines
 * - Copy honorifics (`-san`, `-chan`, ...) from the English or Malay track
 *   onto the time-aligned Spanish line
 * - Reorder "Name Surname" pairs to "Surname Name" with an LLM:
 *   - Gemini (default)
 *   - Ollama (local LLM)
 *   - Anthropic API
 * - Keep the ASS styling of the Spanish document, SRT input is converted
 *
 * ## Architecture
 *
 * The library is organized in these main modules:
 * - `app_config`: Configuration management
 * - `subtitle_processor`: ASS and SRT reading and writing
 * - `demux`: Track listing and extraction with MKVToolNix
 * - `localization`: The localization stages and the per-file pipeline:
 *   - `localization::track_scorer`: Best track per language
 *   - `localization::credits`: Credit line removal
 *   - `localization::honorifics`: Honorific transfer
 *   - `localization::names`: Name reordering
 *   - `localization::pipeline`: Job orchestration
 * - `file_utils`: File system operations
 * - `app_controller`: Batch controller
 * - `language_utils`: ISO language code utilities
 * - `providers`: Client implementations for the name oracle
 * - `errors`: Custom error types for the application
 *
 * ## License
 *
 * This project is licensed under the MIT License
 */

// Global lints configuration
// These lints will be allowed but not auto-fixed
#![allow(clippy::uninlined_format_args)]
#![allow(clippy::redundant_closure_for_method_calls)]

// Public modules
pub mod app_config;
pub mod file_utils;
pub mod subtitle_processor;
pub mod demux;
pub mod localization;
pub mod app_controller;
pub mod language_utils;
pub mod providers;
pub mod errors;

// Re-export main types for easier usage
pub use app_config::Config;
pub use subtitle_processor::{SubtitleCollection, SubtitleEntry};
pub use localization::{Job, JobReport, LocalizationPipeline};
pub use language_utils::{normalize_to_part2t, get_language_name};
pub use errors::{ExtractionError, PipelineError, ProviderError, SubtitleError};
