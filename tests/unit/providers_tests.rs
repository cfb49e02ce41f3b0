/*!
 * Tests for oracle provider construction
 */

use weebanizer::app_config::{OracleConfig, OracleProvider};
use weebanizer::providers::mock::MockProvider;
use weebanizer::providers::{build_provider, Provider};

#[test]
fn test_buildProvider_withKey_shouldCreateConfiguredProvider() {
    let gemini = OracleConfig {
        api_key: "key".to_string(),
        ..OracleConfig::default()
    };
    let anthropic = OracleConfig {
        provider: OracleProvider::Anthropic,
        api_key: "key".to_string(),
        ..OracleConfig::default()
    };

    assert_eq!(build_provider(&gemini).unwrap().name(), "Gemini");
    assert_eq!(build_provider(&anthropic).unwrap().name(), "Anthropic");
}

#[test]
fn test_buildProvider_withBlankKey_shouldSkipRemoteProvider() {
    let config = OracleConfig {
        provider: OracleProvider::Anthropic,
        api_key: "   ".to_string(),
        ..OracleConfig::default()
    };

    assert!(build_provider(&config).is_none());
}

#[tokio::test]
async fn test_mockProvider_shouldRecordInstructionsAndInput() {
    let provider = MockProvider::working("López Ana");

    let reply = provider.complete("Invierte", "Lista de nombres:\nAna López").await.unwrap();

    assert_eq!(reply, "López Ana");
    let requests = provider.requests();
    assert_eq!(requests.len(), 1);
    assert_eq!(requests[0].instructions, "Invierte");
    assert!(requests[0].input.ends_with("Ana López"));
}

#[tokio::test]
async fn test_mockProvider_failing_shouldFailConnectionTest() {
    assert!(MockProvider::failing().test_connection().await.is_err());
    assert!(MockProvider::working("x").test_connection().await.is_ok());
}
