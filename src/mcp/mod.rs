//! Model Context Protocol (MCP) server
//!
//! JSON-RPC 2.0 over stdio exposing the Logseq tools.

pub mod protocol;
pub mod server;
pub mod tools;

pub use protocol::{CallToolResult, JsonRpcError, JsonRpcRequest, JsonRpcResponse, ToolContent};
pub use server::McpServer;
pub use tools::{Tool, ToolHandler, ToolName};
