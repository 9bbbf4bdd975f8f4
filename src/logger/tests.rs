//! Tests for the logger module

use std::io::Write;
use std::path::PathBuf;

use tempfile::tempdir;

use super::*;

fn console_only() -> LoggerConfig {
    LoggerConfig {
        console: ConsoleConfig::new(true, false),
        file: FileConfig::default(),
        level: "info".to_string(),
    }
}

#[test]
fn test_default_config() {
    let config = LoggerConfig::default();
    assert!(config.console.enabled);
    assert!(config.console.colored);
    assert!(!config.file.enabled);
    assert_eq!(config.file.format, LogFormat::Json);
    assert_eq!(config.level, "info");
    assert!(config.validate().is_ok());
}

#[test]
fn test_both_outputs_disabled_is_invalid() {
    let mut config = console_only();
    config.console.enabled = false;
    assert!(matches!(config.validate(), Err(LoggerError::Config { .. })));
}

#[test]
fn test_level_parsing() {
    let mut config = console_only();
    for (level, expected) in [
        ("trace", tracing::Level::TRACE),
        ("DEBUG", tracing::Level::DEBUG),
        ("warning", tracing::Level::WARN),
        ("tickwork=trace,error", tracing::Level::ERROR),
    ] {
        config.level = level.to_string();
        assert_eq!(config.parse_level().unwrap(), expected, "level {level}");
    }

    config.level = "loud".to_string();
    assert!(config.parse_level().is_err());
}

#[test]
fn test_log_format_parsing() {
    assert_eq!("json".parse::<LogFormat>().unwrap(), LogFormat::Json);
    assert_eq!("Compact".parse::<LogFormat>().unwrap(), LogFormat::Compact);
    assert_eq!(LogFormat::default(), LogFormat::Full);
    assert!("xml".parse::<LogFormat>().is_err());
}

#[test]
fn test_file_requires_path_when_enabled() {
    assert!(FileConfig::new(true, PathBuf::new(), true, LogFormat::Full).is_err());
    assert!(FileConfig::new(false, PathBuf::new(), true, LogFormat::Full).is_ok());
}

#[test]
fn test_build_filter() {
    assert!(build_filter("info").is_ok());
    assert!(build_filter("tickwork::jobs=debug,warn").is_ok());
    assert!(build_filter("tickwork=loud").is_err());
}

#[test]
fn test_open_log_file_append_and_truncate() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("nested").join("app.log");
    let mut config = FileConfig::new(true, path.clone(), true, LogFormat::Full).unwrap();

    writeln!(open_log_file(&config).unwrap(), "first").unwrap();
    writeln!(open_log_file(&config).unwrap(), "second").unwrap();
    assert_eq!(std::fs::read_to_string(&path).unwrap(), "first\nsecond\n");

    config.append = false;
    writeln!(open_log_file(&config).unwrap(), "third").unwrap();
    assert_eq!(std::fs::read_to_string(&path).unwrap(), "third\n");
}
