//! Full-file TOML parsing tests for the scribe configuration

use scribe_config::{AccessMode, ScribeConfig};
use std::path::PathBuf;

#[test]
fn test_full_config_parses() {
    let toml_str = r#"
        [trigger]
        interval_ms = 1500

        [writer]
        file_name = "heartbeat.txt"
        label = "Heartbeat"
        access_mode = "readwrite"

        [store]
        path = "/tmp/scribe/capability.json"

        [channel]
        endpoint = "/heartbeat_worker"
        outcome_capacity = 8

        [logging]
        level = "debug"
        with_target = true

        [picker]
        file_description = "Allowed video files"
        file_extensions = ["mp4"]
    "#;

    let config = ScribeConfig::from_toml_str(toml_str).expect("Failed to parse full config");
    assert_eq!(config.trigger.interval_ms, 1500);
    assert_eq!(config.writer.file_name, "heartbeat.txt");
    assert_eq!(config.writer.label, "Heartbeat");
    assert_eq!(config.writer.access_mode, AccessMode::ReadWrite);
    assert_eq!(config.store.path, PathBuf::from("/tmp/scribe/capability.json"));
    assert_eq!(config.channel.endpoint, "/heartbeat_worker");
    assert_eq!(config.channel.outcome_capacity, 8);
    assert_eq!(config.logging.level, "debug");
    assert!(config.logging.with_target);
    assert_eq!(config.picker.file_description, "Allowed video files");
    assert_eq!(config.picker.file_extensions, vec!["mp4".to_string()]);
}

#[test]
fn test_empty_file_is_all_defaults() {
    let config = ScribeConfig::from_toml_str("").expect("Empty config should parse");
    assert_eq!(config, ScribeConfig::default());
}

#[test]
fn test_serialized_config_parses_back() {
    let mut config = ScribeConfig::default();
    config.writer.access_mode = AccessMode::Read;
    config.trigger.interval_ms = 250;

    let toml_str = toml::to_string_pretty(&config).expect("Failed to serialize ScribeConfig");
    let parsed = ScribeConfig::from_toml_str(&toml_str).expect("Failed to parse serialized config");
    assert_eq!(parsed, config);
}
