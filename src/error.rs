//! Error types for the Logseq MCP server
//!
//! This module provides comprehensive error handling using thiserror for
//! structured error definitions and anyhow for error propagation.

use crate::logging::LoggingError;
use thiserror::Error;

/// Main error type for Logseq MCP operations
#[derive(Error, Debug)]
pub enum LogseqMcpError {
    /// HTTP request to the Logseq API failed (transport or status)
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// Logseq answered, but not with something we can use
    #[error("Logseq API error: {0}")]
    Api(String),

    /// Date string could not be turned into a journal page name
    #[error("Invalid date format: {0}")]
    InvalidDate(String),

    /// Tool arguments failed validation
    #[error("{0}")]
    Validation(String),

    /// Tool name is not in the dispatch table
    #[error("Unknown tool: {0}")]
    UnknownTool(String),

    /// Configuration error
    #[error("Configuration error: {0}")]
    Config(String),

    /// Logging pipeline could not be assembled
    #[error("Logging error: {0}")]
    Logging(#[from] LoggingError),

    /// I/O error
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Serialization error
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// MCP protocol error
    #[error("MCP protocol error: {0}")]
    McpProtocol(String),

    /// Generic error with context
    #[error("{0}")]
    Other(String),
}

/// Result type alias for Logseq MCP operations
pub type Result<T> = std::result::Result<T, LogseqMcpError>;

/// Convert anyhow::Error to LogseqMcpError
impl From<anyhow::Error> for LogseqMcpError {
    fn from(err: anyhow::Error) -> Self {
        LogseqMcpError::Other(err.to_string())
    }
}
