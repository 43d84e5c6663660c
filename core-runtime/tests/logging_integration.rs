//! Integration tests for logging system

use bridge_traits::LogLevel;
use core_runtime::logging::{init_logging, redact_uri, LogFormat, LoggingConfig};

#[test]
fn test_logging_initialization_only_once() {
    let config = LoggingConfig::default()
        .with_format(LogFormat::Compact)
        .with_level(LogLevel::Debug);

    // Only this test installs a global subscriber in this binary.
    assert!(init_logging(config.clone()).is_ok());

    let second = init_logging(config);
    assert!(matches!(second, Err(core_runtime::Error::Logging(_))));
}

#[test]
fn test_invalid_filter_is_rejected_before_install() {
    let config = LoggingConfig::default().with_filter("core_session=[[[");
    let result = init_logging(config);
    assert!(matches!(result, Err(core_runtime::Error::Config(_))));
}

#[test]
fn test_redact_uri_strips_signed_query() {
    let signed = "https://storage.example.com/music/catalog.json?X-Amz-Signature=deadbeef";
    let redacted = redact_uri(signed);
    assert_eq!(redacted, "https://storage.example.com/music/catalog.json");
    assert!(!redacted.contains("deadbeef"));
}

#[test]
fn test_redact_uri_keeps_content_uris() {
    assert_eq!(
        redact_uri("content://com.example.mplayer/cdn.example.com:art:cover.jpg"),
        "content://com.example.mplayer/cdn.example.com:art:cover.jpg"
    );
}

#[test]
fn test_format_selection() {
    #[cfg(debug_assertions)]
    assert_eq!(LoggingConfig::default().format, LogFormat::Pretty);

    #[cfg(not(debug_assertions))]
    assert_eq!(LoggingConfig::default().format, LogFormat::Json);
}

#[test]
fn test_config_chaining() {
    let config = LoggingConfig::default()
        .with_format(LogFormat::Compact)
        .with_level(LogLevel::Warn)
        .with_spans(false)
        .with_target(false)
        .with_thread_info(true);

    assert_eq!(config.format, LogFormat::Compact);
    assert_eq!(config.level, LogLevel::Warn);
    assert!(!config.enable_spans);
    assert!(!config.display_target);
    assert!(config.display_thread_info);
}
