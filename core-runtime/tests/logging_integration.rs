//! Integration tests for logging system

use bridge_traits::time::{ConsoleLogger, LogLevel};
use core_runtime::logging::{init_logging, strip_path, LogFormat, LoggingConfig};
use core_runtime::Error;
use std::sync::Arc;

#[test]
fn test_init_logging_only_once() {
    let config = LoggingConfig::default()
        .with_format(LogFormat::Compact)
        .with_level(LogLevel::Debug)
        .with_logger_sink(Arc::new(ConsoleLogger::default()));

    init_logging(config.clone()).expect("first initialization succeeds");
    tracing::info!(resource = %strip_path("rooms/hall/ambient.ogg"), "Logging initialized");

    let second = init_logging(config);
    assert!(matches!(second, Err(Error::Config(_))));
}

#[test]
fn test_invalid_filter_is_rejected() {
    let config = LoggingConfig::default().with_filter("core_playback=loudest");

    let result = init_logging(config);
    assert!(matches!(result, Err(Error::Config(msg)) if msg.contains("Invalid log filter")));
}

#[test]
fn test_path_stripping() {
    assert_eq!(strip_path("/home/user/game/audio/rain.ogg"), "rain.ogg");
    assert_eq!(strip_path("C:\\Game\\video\\intro.ogv"), "intro.ogv");
    assert_eq!(strip_path("footsteps3.ogg"), "footsteps3.ogg");
    assert_eq!(strip_path(""), "");
}

#[test]
fn test_config_chaining() {
    let config = LoggingConfig::default()
        .with_format(LogFormat::Json)
        .with_level(LogLevel::Warn)
        .with_spans(true)
        .with_target(false)
        .with_thread_info(true);

    assert_eq!(config.format, LogFormat::Json);
    assert_eq!(config.level, LogLevel::Warn);
    assert!(config.enable_spans);
    assert!(!config.display_target);
    assert!(config.display_thread_info);
    assert!(config.logger_sink.is_none());
}
