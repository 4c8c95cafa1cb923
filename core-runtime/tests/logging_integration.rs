//! Integration tests for logging bootstrap

use core_runtime::logging::{init_logging, redact_if_sensitive, LogFormat, LogLevel, LoggingConfig};
use core_runtime::Error;

#[test]
fn test_init_once_then_reject() {
    // Only one global subscriber per process; this binary has a single test
    // that installs one.
    let config = LoggingConfig::default()
        .with_format(LogFormat::Compact)
        .with_level(LogLevel::Debug);

    init_logging(config.clone()).expect("first initialization succeeds");
    tracing::info!(domain = "home", "logging initialized");

    match init_logging(config) {
        Err(Error::Config(message)) => assert!(message.contains("Failed to initialize logging")),
        other => panic!("second initialization should fail, got {:?}", other),
    }
}

#[test]
fn test_credentials_never_pass_through() {
    for field in ["access_token", "refresh_token", "Authorization", "client_secret", "code"] {
        assert_eq!(redact_if_sensitive(field, "value"), "[REDACTED]", "{}", field);
    }
    assert_eq!(redact_if_sensitive("session", "home"), "home");
}
