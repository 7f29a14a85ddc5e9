//! Logseq MCP server
//!
//! Exposes a local Logseq graph (through Logseq's HTTP API server) as a set
//! of Model Context Protocol tools, with diagnostic logging that keeps page
//! names, block content and queries out of the log files.
//!
//! # Architecture
//!
//! - **Logging**: privacy-preserving pipeline (sanitizer, filters, sinks, rotation)
//! - **Logseq**: HTTP client and payload models
//! - **MCP**: JSON-RPC 2.0 server over stdio and the tool dispatch table
//! - **Utils**: journal date names and preview truncation
//!
//! # Example
//!
//! ```ignore
//! use logseq_mcp::{setup_logging, LoggingConfig, LogseqClient, LogseqConfig};
//! use logseq_mcp::{McpServer, ToolHandler, ToolInvocationLogger};
//! use std::sync::Arc;
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     let pipeline = setup_logging(&LoggingConfig::default())?;
//!     let client = LogseqClient::new(&LogseqConfig::from_env())?;
//!     let handler = ToolHandler::new(Arc::new(client), ToolInvocationLogger::new(pipeline));
//!     McpServer::new(handler).run().await?;
//!     Ok(())
//! }
//! ```

pub mod config;
pub mod error;
pub mod logging;
pub mod logseq;
pub mod mcp;
pub mod utils;

pub use config::LogseqConfig;
pub use error::{LogseqMcpError, Result};
pub use logging::{
    setup_logging, LogPipeline, LoggingConfig, LoggingMode, Sanitizer, ToolInvocationLogger,
};
pub use logseq::{LogseqApi, LogseqClient};
pub use mcp::{McpServer, ToolHandler};
