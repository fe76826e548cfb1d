/*!
 * Tests for configuration loading, defaults and validation
 */

use podwright::app_config::{Config, SpeechProviderKind};

use crate::common;

#[test]
fn test_defaultConfig_shouldUseGoogleProvider() {
    let config = Config::default();
    assert_eq!(config.synthesis.provider, SpeechProviderKind::Google);
    assert_eq!(config.synthesis.max_chars_per_request, 4800);
    assert_eq!(config.output.bitrate_kbps, 192);
}

#[test]
fn test_config_shouldRoundTripThroughJson() {
    let mut config = Config::default();
    config.synthesis.api_key = "key".to_string();
    config.episode.title = "Morning Brief".to_string();

    let json = serde_json::to_string_pretty(&config).unwrap();
    let parsed: Config = serde_json::from_str(&json).unwrap();
    assert_eq!(parsed.synthesis.api_key, "key");
    assert_eq!(parsed.episode.title, "Morning Brief");
}

#[test]
fn test_partialConfigFile_shouldFillDefaults() {
    let dir = common::create_temp_dir().unwrap();
    let path = common::create_test_file(
        dir.path(),
        "conf.json",
        r#"{"synthesis": {"api_key": "abc"}}"#,
    )
    .unwrap();

    let content = std::fs::read_to_string(&path).unwrap();
    let config: Config = serde_json::from_str(&content).unwrap();
    assert_eq!(config.synthesis.api_key, "abc");
    assert_eq!(config.music.intro_secs, 10.0);
    assert_eq!(config.music.intro_gain_db, -15.0);
    assert!(config.validate().is_ok());
}

#[test]
fn test_validate_shouldRejectNegativeEnvelopeDurations() {
    let mut config = Config::default();
    config.synthesis.api_key = "k".to_string();
    config.music.crossfade_secs = -1.0;
    assert!(config.validate().is_err());
}

#[test]
fn test_providerKind_shouldParseFromString() {
    assert_eq!(
        "google".parse::<SpeechProviderKind>().unwrap(),
        SpeechProviderKind::Google
    );
    assert!("azure".parse::<SpeechProviderKind>().is_err());
}
