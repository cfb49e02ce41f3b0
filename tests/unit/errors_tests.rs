/*!
 * Tests for error types
 */

use std::path::PathBuf;
use weebanizer::errors::{ExtractionError, PipelineError, ProviderError, SubtitleError};

#[test]
fn test_pipelineError_fromSubtitleError_shouldBeTargetUnreadable() {
    let error: PipelineError = SubtitleError::MissingFormat.into();

    assert!(matches!(error, PipelineError::TargetUnreadable(_)));
    assert_eq!(error.to_string(), "Failed to load Spanish subtitle: Missing or invalid event format line");
}

#[test]
fn test_errorMessages_shouldNameTheFailure() {
    let timeout = ExtractionError::Timeout {
        tool: "mkvextract".to_string(),
        secs: 120,
    };
    assert_eq!(timeout.to_string(), "mkvextract timed out after 120 seconds");

    let persist = PipelineError::Persist {
        path: PathBuf::from("ep.ass"),
        message: "disk full".to_string(),
    };
    assert!(persist.to_string().contains("disk full"));

    let api = ProviderError::ApiError {
        status_code: 429,
        message: "quota".to_string(),
    };
    assert_eq!(api.to_string(), "API responded with error: 429 - quota");
}
