//! Integration tests for logging initialization

use bridge_traits::time::{ConsoleLogger, LogLevel};
use core_runtime::logging::{init_logging, redact_if_sensitive, LogFormat, LoggingConfig};
use std::sync::Arc;

#[test]
fn test_logging_initializes_once() {
    let config = LoggingConfig::default()
        .with_format(LogFormat::Compact)
        .with_level(LogLevel::Debug)
        .with_logger_sink(Arc::new(ConsoleLogger::default()));

    init_logging(config).unwrap();
    tracing::info!(album_id = "a1", "logging ready");

    // A global subscriber is already installed for this process.
    let second = init_logging(LoggingConfig::default());
    assert!(second.is_err());
}

#[test]
fn test_invalid_filter_is_config_error() {
    let config = LoggingConfig::default().with_filter("core_sync=[[[");
    let err = init_logging(config).unwrap_err();
    assert!(err.to_string().contains("Configuration error"));
}

#[test]
fn test_oauth_material_is_redacted() {
    for field in ["access_token", "refresh_token", "auth_code", "client_secret"] {
        assert_eq!(redact_if_sensitive(field, "value"), "[REDACTED]");
    }
    assert_eq!(redact_if_sensitive("album_id", "AF1Qip"), "AF1Qip");
}
