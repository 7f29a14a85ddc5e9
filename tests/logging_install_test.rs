//! Process-wide logging installation
//!
//! Kept in its own test binary: the global subscriber can be set once per
//! process.

use logseq_mcp::logging::{
    install, setup_logging, LogPipeline, LoggingConfig, LoggingError, Severity,
};
use serde_json::Value;
use std::fs;
use std::sync::Arc;
use tempfile::TempDir;

#[test]
fn test_setup_logging_installs_once() {
    let temp = TempDir::new().unwrap();
    let log_file = temp.path().join("logs").join("logseq-mcp.log");
    let config = LoggingConfig {
        level: Some("INFO".to_string()),
        log_file: Some(log_file.clone()),
        mode: Some("privacy".to_string()),
        max_file_size: Some("1MB".to_string()),
        debug: Some(false),
        ..LoggingConfig::default()
    };

    setup_logging(&config).unwrap();
    tracing::info!("Getting page: 'Private Journal Entry'");
    tracing::debug!("below the configured level");

    let contents = fs::read_to_string(&log_file).unwrap();
    let entries: Vec<Value> = contents
        .lines()
        .map(|line| serde_json::from_str(line).unwrap())
        .collect();

    assert_eq!(entries.len(), 2);
    assert_eq!(entries[0]["message"], "Logging initialized");
    assert_eq!(entries[0]["function"], "setup_logging");
    assert_eq!(entries[0]["log_level"], "INFO");
    assert_eq!(entries[0]["log_mode"], "privacy");
    assert_eq!(entries[0]["log_file"], log_file.display().to_string());
    assert_eq!(entries[0]["debug_mode"], false);
    assert_eq!(entries[0]["max_file_size"], 1024 * 1024);
    assert_eq!(entries[1]["message"], "Getting page: 'Priva***Entry'");
    assert!(!contents.contains("Private Journal Entry"));

    let second = install(Arc::new(LogPipeline::stderr_only(Severity::Info)));
    assert!(matches!(second, Err(LoggingError::AlreadyInitialized(_))));
    assert!(matches!(
        setup_logging(&config),
        Err(LoggingError::AlreadyInitialized(_))
    ));
}
