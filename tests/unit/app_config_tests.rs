/*!
 * Tests for application configuration functionality
 */

use weebanizer::app_config::{Config, LanguageBucket, LogLevel, OracleProvider, ProcessingMode};

use crate::common;

#[test]
fn test_defaultConfig_shouldHaveExpectedValues() {
    let config = Config::default();

    assert_eq!(config.mode, ProcessingMode::Multi);
    assert_eq!(config.log_level, LogLevel::Info);
    assert_eq!(config.honorifics.window_secs, 5);
    assert_eq!(config.honorifics.honorifics[0], "-san");
    assert!(config.credit_labels.contains(&"Traducción".to_string()));
    assert_eq!(config.oracle.provider, OracleProvider::Gemini);
    assert!(config.oracle.enabled);
    assert!(config.validate().is_ok());
}

#[test]
fn test_validate_withInvalidValues_shouldFail() {
    let mut config = Config::default();
    config.honorifics.window_secs = 0;
    assert!(config.validate().is_err());

    let mut config = Config::default();
    config.honorifics.honorifics = vec![" ".to_string()];
    assert!(config.validate().is_err());

    let mut config = Config::default();
    config.priority_table.buckets.retain(|b| b.bucket != LanguageBucket::Spanish);
    assert!(config.validate().is_err());

    let mut config = Config::default();
    let duplicate = config.priority_table.buckets[0].clone();
    config.priority_table.buckets.push(duplicate);
    assert!(config.validate().is_err());

    let mut config = Config::default();
    config.oracle.name_inversion_prompt.clear();
    assert!(config.validate().is_err());
    config.oracle.enabled = false;
    assert!(config.validate().is_ok());
}

#[test]
fn test_validate_withMissingApiKey_shouldStillPass() {
    let mut config = Config::default();
    config.oracle.api_key.clear();

    assert!(config.validate().is_ok());
    assert!(!config.oracle.is_usable());
}

#[test]
fn test_oracleConfig_shouldFallBackToProviderDefaults() {
    let mut config = Config::default();
    config.oracle.provider = OracleProvider::Ollama;

    assert_eq!(config.oracle.get_endpoint(), "http://localhost:11434");
    assert!(config.oracle.is_usable());

    config.oracle.model = "qwen2.5:7b".to_string();
    assert_eq!(config.oracle.get_model(), "qwen2.5:7b");
}

#[test]
fn test_providerFromStr_shouldIgnoreCase() {
    assert_eq!("Anthropic".parse::<OracleProvider>().unwrap(), OracleProvider::Anthropic);
    assert!("openai".parse::<OracleProvider>().is_err());
}

#[test]
fn test_loadOrCreate_withMissingFile_shouldWriteDefaults() {
    let dir = common::create_temp_dir().unwrap();
    let path = dir.path().join("conf.json");

    let config = Config::load_or_create(&path).unwrap();

    assert!(path.exists());
    let reloaded = Config::from_file(&path).unwrap();
    assert_eq!(reloaded.priority_table, config.priority_table);
    assert_eq!(reloaded.honorifics.honorifics, config.honorifics.honorifics);
}

#[test]
fn test_fromFile_withPartialJson_shouldFillDefaults() {
    let dir = common::create_temp_dir().unwrap();
    let path = common::create_test_file(
        dir.path(),
        "conf.json",
        r#"{ "mode": "extra", "honorifics": { "window_secs": 3 }, "oracle": { "provider": "ollama" } }"#,
    )
    .unwrap();

    let config = Config::from_file(&path).unwrap();

    assert_eq!(config.mode, ProcessingMode::Extra);
    assert_eq!(config.honorifics.window_secs, 3);
    assert_eq!(config.honorifics.honorifics, Config::default().honorifics.honorifics);
    assert_eq!(config.oracle.provider, OracleProvider::Ollama);
    assert_eq!(config.credit_labels, Config::default().credit_labels);
}

#[test]
fn test_fromFile_withInvalidJson_shouldFail() {
    let dir = common::create_temp_dir().unwrap();
    let path = common::create_test_file(dir.path(), "conf.json", "{ not json").unwrap();

    assert!(Config::from_file(&path).is_err());
}

#[test]
fn test_languageBucket_shouldRoundTripKeys() {
    for bucket in LanguageBucket::ALL {
        assert_eq!(LanguageBucket::from_key(bucket.key()), Some(bucket));
    }
    assert_eq!(LanguageBucket::Malay.key(), "may");
}
