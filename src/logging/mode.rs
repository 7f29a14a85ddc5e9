//! Logging modes and record severities

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// How much of a record survives on its way to a sink
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LoggingMode {
    /// Sanitize messages and attached payloads (default)
    #[default]
    Privacy,
    /// Full fidelity for troubleshooting
    Debug,
    /// Warnings and errors only
    Minimal,
}

impl LoggingMode {
    pub fn as_str(&self) -> &'static str {
        match self {
            LoggingMode::Privacy => "privacy",
            LoggingMode::Debug => "debug",
            LoggingMode::Minimal => "minimal",
        }
    }

    /// Parse a configured mode, falling back to [`LoggingMode::Privacy`]
    pub fn parse_or_default(value: &str) -> Self {
        value.parse().unwrap_or_default()
    }
}

impl fmt::Display for LoggingMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for LoggingMode {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "privacy" => Ok(LoggingMode::Privacy),
            "debug" => Ok(LoggingMode::Debug),
            "minimal" => Ok(LoggingMode::Minimal),
            other => Err(format!("unknown logging mode: {}", other)),
        }
    }
}

/// Record severity, ordered from least to most severe
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Severity {
    Trace,
    Debug,
    Info,
    Warning,
    Error,
}

impl Severity {
    /// Upper-case name written to log output
    pub fn as_str(&self) -> &'static str {
        match self {
            Severity::Trace => "TRACE",
            Severity::Debug => "DEBUG",
            Severity::Info => "INFO",
            Severity::Warning => "WARNING",
            Severity::Error => "ERROR",
        }
    }

    /// Parse a level name, falling back to [`Severity::Info`]
    pub fn parse_or_default(value: &str) -> Self {
        value.parse().unwrap_or(Severity::Info)
    }

    /// Matching `tracing` level
    pub fn as_tracing_level(&self) -> tracing::Level {
        match self {
            Severity::Trace => tracing::Level::TRACE,
            Severity::Debug => tracing::Level::DEBUG,
            Severity::Info => tracing::Level::INFO,
            Severity::Warning => tracing::Level::WARN,
            Severity::Error => tracing::Level::ERROR,
        }
    }
}

impl fmt::Display for Severity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Severity {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_uppercase().as_str() {
            "TRACE" => Ok(Severity::Trace),
            "DEBUG" => Ok(Severity::Debug),
            "INFO" => Ok(Severity::Info),
            "WARN" | "WARNING" => Ok(Severity::Warning),
            "ERROR" | "CRITICAL" => Ok(Severity::Error),
            other => Err(format!("unknown log level: {}", other)),
        }
    }
}

impl From<&tracing::Level> for Severity {
    fn from(level: &tracing::Level) -> Self {
        match *level {
            tracing::Level::TRACE => Severity::Trace,
            tracing::Level::DEBUG => Severity::Debug,
            tracing::Level::INFO => Severity::Info,
            tracing::Level::WARN => Severity::Warning,
            tracing::Level::ERROR => Severity::Error,
        }
    }
}
