//! MCP tool schemas and dispatch
//!
//! Every tool answers with a JSON object carrying `success`. Upstream and
//! validation failures become `{"success": false, "error": ...}` so the
//! assistant sees them as tool output; each call is logged exactly once
//! through the [`ToolInvocationLogger`].

use crate::error::{LogseqMcpError, Result};
use crate::logging::ToolInvocationLogger;
use crate::logseq::models::{is_journal_page, QueryResult};
use crate::logseq::LogseqApi;
use crate::utils::date::journal_name_candidates;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::{json, Map, Value};
use std::fmt;
use std::str::FromStr;
use std::sync::Arc;
use std::time::Instant;
use tracing::{debug, warn};

/// Default `limit` for `search_pages`
const DEFAULT_SEARCH_LIMIT: usize = 10;

/// Tool schema definition
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Tool {
    pub name: String,

    pub description: String,

    /// JSON Schema for the arguments
    #[serde(rename = "inputSchema")]
    pub input_schema: Value,
}

/// Tools this server exposes
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ToolName {
    CreateBlock,
    UpdateBlock,
    DeleteBlock,
    GetBlock,
    CreatePage,
    GetPage,
    GetAllPages,
    SearchPages,
    ExecuteQuery,
    GetJournalPage,
    GetCurrentGraph,
}

impl ToolName {
    pub const ALL: [ToolName; 11] = [
        ToolName::CreateBlock,
        ToolName::UpdateBlock,
        ToolName::DeleteBlock,
        ToolName::GetBlock,
        ToolName::CreatePage,
        ToolName::GetPage,
        ToolName::GetAllPages,
        ToolName::SearchPages,
        ToolName::ExecuteQuery,
        ToolName::GetJournalPage,
        ToolName::GetCurrentGraph,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            ToolName::CreateBlock => "create_block",
            ToolName::UpdateBlock => "update_block",
            ToolName::DeleteBlock => "delete_block",
            ToolName::GetBlock => "get_block",
            ToolName::CreatePage => "create_page",
            ToolName::GetPage => "get_page",
            ToolName::GetAllPages => "get_all_pages",
            ToolName::SearchPages => "search_pages",
            ToolName::ExecuteQuery => "execute_query",
            ToolName::GetJournalPage => "get_journal_page",
            ToolName::GetCurrentGraph => "get_current_graph",
        }
    }

    pub fn definition(&self) -> Tool {
        let (description, input_schema) = match self {
            ToolName::CreateBlock => (
                "Create a new block in Logseq",
                json!({
                    "type": "object",
                    "properties": {
                        "content": {"type": "string", "description": "The content of the block"},
                        "page": {"type": "string", "description": "The page to create the block in"},
                        "parent_block_id": {"type": "string", "description": "Optional parent block ID for nested blocks"},
                        "properties": {"type": "object", "description": "Optional block properties"}
                    },
                    "required": ["content"]
                }),
            ),
            ToolName::UpdateBlock => (
                "Update an existing block in Logseq",
                json!({
                    "type": "object",
                    "properties": {
                        "block_id": {"type": "string", "description": "The ID of the block to update"},
                        "content": {"type": "string", "description": "The new content for the block"},
                        "properties": {"type": "object", "description": "Optional updated block properties"}
                    },
                    "required": ["block_id"]
                }),
            ),
            ToolName::DeleteBlock => (
                "Delete a block from Logseq",
                json!({
                    "type": "object",
                    "properties": {
                        "block_id": {"type": "string", "description": "The ID of the block to delete"}
                    },
                    "required": ["block_id"]
                }),
            ),
            ToolName::GetBlock => (
                "Get a block from Logseq by ID",
                json!({
                    "type": "object",
                    "properties": {
                        "block_id": {"type": "string", "description": "The ID of the block to retrieve"}
                    },
                    "required": ["block_id"]
                }),
            ),
            ToolName::CreatePage => (
                "Create a new page in Logseq",
                json!({
                    "type": "object",
                    "properties": {
                        "name": {"type": "string", "description": "The name of the page"},
                        "content": {"type": "string", "description": "Optional initial content for the page"},
                        "properties": {"type": "object", "description": "Optional page properties"}
                    },
                    "required": ["name"]
                }),
            ),
            ToolName::GetPage => (
                "Get a page from Logseq by name",
                json!({
                    "type": "object",
                    "properties": {
                        "name": {"type": "string", "description": "The name of the page to retrieve"},
                        "include_children": {"type": "boolean", "description": "Whether to include child blocks", "default": true}
                    },
                    "required": ["name"]
                }),
            ),
            ToolName::GetAllPages => (
                "List all pages in the current graph",
                json!({
                    "type": "object",
                    "properties": {
                        "include_journals": {"type": "boolean", "description": "Whether to include journal pages", "default": true}
                    }
                }),
            ),
            ToolName::SearchPages => (
                "Search for pages in Logseq",
                json!({
                    "type": "object",
                    "properties": {
                        "query": {"type": "string", "description": "The search query"},
                        "limit": {"type": "integer", "description": "Maximum number of results to return", "default": DEFAULT_SEARCH_LIMIT}
                    },
                    "required": ["query"]
                }),
            ),
            ToolName::ExecuteQuery => (
                "Execute a Datalog query in Logseq",
                json!({
                    "type": "object",
                    "properties": {
                        "query": {"type": "string", "description": "The Datalog query to execute"}
                    },
                    "required": ["query"]
                }),
            ),
            ToolName::GetJournalPage => (
                "Get the journal page for a date (e.g. 2024-07-01, 07/01/2024, Jul 1st, 2024)",
                json!({
                    "type": "object",
                    "properties": {
                        "date": {"type": "string", "description": "The date of the journal page"},
                        "include_children": {"type": "boolean", "description": "Whether to include child blocks", "default": true}
                    },
                    "required": ["date"]
                }),
            ),
            ToolName::GetCurrentGraph => (
                "Get information about the current Logseq graph",
                json!({"type": "object", "properties": {}}),
            ),
        };

        Tool {
            name: self.as_str().to_string(),
            description: description.to_string(),
            input_schema,
        }
    }
}

impl fmt::Display for ToolName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ToolName {
    type Err = LogseqMcpError;

    fn from_str(s: &str) -> Result<Self> {
        ToolName::ALL
            .iter()
            .copied()
            .find(|tool| tool.as_str() == s)
            .ok_or_else(|| LogseqMcpError::UnknownTool(s.to_string()))
    }
}

fn default_true() -> bool {
    true
}

#[derive(Deserialize)]
struct CreateBlockParams {
    content: String,
    page: Option<String>,
    parent_block_id: Option<String>,
    properties: Option<Map<String, Value>>,
}

#[derive(Deserialize)]
struct UpdateBlockParams {
    block_id: String,
    content: Option<String>,
    properties: Option<Map<String, Value>>,
}

#[derive(Deserialize)]
struct BlockIdParams {
    block_id: String,
}

#[derive(Deserialize)]
struct CreatePageParams {
    name: String,
    content: Option<String>,
    properties: Option<Map<String, Value>>,
}

#[derive(Deserialize)]
struct GetPageParams {
    name: String,
    #[serde(default = "default_true")]
    include_children: bool,
}

#[derive(Deserialize)]
struct GetAllPagesParams {
    #[serde(default = "default_true")]
    include_journals: bool,
}

#[derive(Deserialize)]
struct SearchParams {
    query: String,
    limit: Option<usize>,
}

#[derive(Deserialize)]
struct QueryParams {
    query: String,
}

#[derive(Deserialize)]
struct JournalParams {
    date: Option<String>,
    #[serde(default = "default_true")]
    include_children: bool,
}

fn parse_params<T: DeserializeOwned>(arguments: &Value) -> Result<T> {
    T::deserialize(arguments)
        .map_err(|e| LogseqMcpError::Validation(format!("Invalid arguments: {}", e)))
}

/// Tool-level failure payload
fn failure(error: &LogseqMcpError) -> Value {
    json!({ "success": false, "error": error.to_string() })
}

/// Dispatches tool calls to the Logseq API and logs each one
pub struct ToolHandler {
    api: Arc<dyn LogseqApi>,
    logger: ToolInvocationLogger,
}

impl ToolHandler {
    pub fn new(api: Arc<dyn LogseqApi>, logger: ToolInvocationLogger) -> Self {
        Self { api, logger }
    }

    pub fn list_tools(&self) -> Vec<Tool> {
        ToolName::ALL.iter().map(ToolName::definition).collect()
    }

    /// Run a tool.
    ///
    /// Only an unknown tool name is an `Err`; every other failure is
    /// reported in the returned payload.
    pub async fn execute(&self, tool_name: &str, arguments: Value) -> Result<Value> {
        let tool = tool_name.parse::<ToolName>().map_err(|e| {
            warn!("Unknown tool: {}", tool_name);
            e
        })?;
        debug!("Executing tool: {}", tool);

        let arguments = Arc::new(match arguments {
            Value::Null => Value::Object(Map::new()),
            other => other,
        });

        let started = Instant::now();
        let outcome = self.dispatch(tool, &arguments).await;
        let duration_ms = started.elapsed().as_secs_f64() * 1000.0;

        match outcome {
            Ok(result) => {
                let result = Arc::new(result);
                self.logger.log(
                    tool.as_str(),
                    arguments,
                    Ok(Arc::clone(&result)),
                    Some(duration_ms),
                );
                Ok(Arc::try_unwrap(result).unwrap_or_else(|shared| (*shared).clone()))
            }
            Err(e) => {
                self.logger
                    .log(tool.as_str(), arguments, Err(&e), Some(duration_ms));
                Ok(failure(&e))
            }
        }
    }

    async fn dispatch(&self, tool: ToolName, arguments: &Value) -> Result<Value> {
        match tool {
            ToolName::CreateBlock => self.create_block(parse_params(arguments)?).await,
            ToolName::UpdateBlock => self.update_block(parse_params(arguments)?).await,
            ToolName::DeleteBlock => self.delete_block(parse_params(arguments)?).await,
            ToolName::GetBlock => self.get_block(parse_params(arguments)?).await,
            ToolName::CreatePage => self.create_page(parse_params(arguments)?).await,
            ToolName::GetPage => self.get_page(parse_params(arguments)?).await,
            ToolName::GetAllPages => self.get_all_pages(parse_params(arguments)?).await,
            ToolName::SearchPages => self.search_pages(parse_params(arguments)?).await,
            ToolName::ExecuteQuery => self.execute_query(parse_params(arguments)?).await,
            ToolName::GetJournalPage => self.get_journal_page(parse_params(arguments)?).await,
            ToolName::GetCurrentGraph => self.get_current_graph().await,
        }
    }

    // === Blocks ===

    async fn create_block(&self, params: CreateBlockParams) -> Result<Value> {
        let block = self
            .api
            .create_block(
                &params.content,
                params.page.as_deref(),
                params.parent_block_id.as_deref(),
                params.properties.as_ref(),
            )
            .await?;
        Ok(json!({ "success": true, "block": block }))
    }

    async fn update_block(&self, params: UpdateBlockParams) -> Result<Value> {
        let block = self
            .api
            .update_block(
                &params.block_id,
                params.content.as_deref(),
                params.properties.as_ref(),
            )
            .await?;
        Ok(json!({ "success": true, "block": block }))
    }

    async fn delete_block(&self, params: BlockIdParams) -> Result<Value> {
        self.api.delete_block(&params.block_id).await?;
        Ok(json!({ "success": true, "deleted": true }))
    }

    async fn get_block(&self, params: BlockIdParams) -> Result<Value> {
        match self.api.get_block(&params.block_id).await? {
            Value::Null => Ok(json!({ "success": false, "error": "Block not found" })),
            block => Ok(json!({ "success": true, "block": block })),
        }
    }

    // === Pages ===

    async fn create_page(&self, params: CreatePageParams) -> Result<Value> {
        let page = self
            .api
            .create_page(
                &params.name,
                params.content.as_deref(),
                params.properties.as_ref(),
            )
            .await?;
        Ok(json!({ "success": true, "page": page }))
    }

    async fn get_page(&self, params: GetPageParams) -> Result<Value> {
        let page = match self.api.get_page(&params.name).await? {
            Some(page) => page,
            None => return Ok(json!({ "success": false, "error": "Page not found" })),
        };

        let mut result = json!({ "success": true, "page": page });
        if params.include_children {
            result["blocks"] = Value::Array(self.api.get_page_blocks(&params.name).await?);
        }
        Ok(result)
    }

    async fn get_all_pages(&self, params: GetAllPagesParams) -> Result<Value> {
        let mut pages = self.api.get_all_pages().await?;
        if !params.include_journals {
            pages.retain(|page| !is_journal_page(page));
        }
        let count = pages.len();
        Ok(json!({ "success": true, "pages": pages, "count": count }))
    }

    async fn search_pages(&self, params: SearchParams) -> Result<Value> {
        let mut results = self.api.search_pages(&params.query).await?;
        results.truncate(params.limit.unwrap_or(DEFAULT_SEARCH_LIMIT));
        let count = results.len();
        Ok(json!({ "success": true, "results": results, "count": count }))
    }

    async fn get_journal_page(&self, params: JournalParams) -> Result<Value> {
        let date = params
            .date
            .filter(|date| !date.trim().is_empty())
            .ok_or_else(|| LogseqMcpError::Validation("Date is required".to_string()))?;

        let candidates = journal_name_candidates(&date)?;
        let primary = candidates[0].clone();

        let mut found = None;
        for name in &candidates {
            if let Some(page) = self.api.get_page(name).await? {
                found = Some((name.clone(), page));
                break;
            }
        }

        let (journal_name, page) = match found {
            Some(found) => found,
            None => {
                return Ok(json!({
                    "success": false,
                    "error": "Journal page not found",
                    "journal_name": primary,
                    "page": null
                }))
            }
        };

        let mut result = json!({ "success": true, "journal_name": journal_name, "page": page });
        if params.include_children {
            let key = page
                .get("uuid")
                .and_then(Value::as_str)
                .unwrap_or(&journal_name)
                .to_string();
            let blocks = match self.api.get_page_blocks(&key).await {
                Ok(blocks) => blocks,
                Err(e) => {
                    warn!("Block retrieval for journal page failed: {}", e);
                    Vec::new()
                }
            };
            result["blocks"] = Value::Array(blocks);
        }
        Ok(result)
    }

    // === Queries ===

    async fn execute_query(&self, params: QueryParams) -> Result<Value> {
        let started = Instant::now();
        let results = self.api.execute_query(&params.query).await?;
        let query = QueryResult {
            query: params.query,
            results,
            execution_time_ms: Some(started.elapsed().as_secs_f64() * 1000.0),
        };
        debug!(
            "Query returned {} rows in {:.1} ms",
            query.count(),
            query.execution_time_ms.unwrap_or_default()
        );
        Ok(json!({ "success": true, "count": query.count(), "results": query.results }))
    }

    async fn get_current_graph(&self) -> Result<Value> {
        let graph = self.api.get_current_graph().await?;
        Ok(json!({ "success": true, "graph": graph }))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_tool_names_round_trip() {
        for tool in ToolName::ALL {
            assert_eq!(tool.as_str().parse::<ToolName>().unwrap(), tool);
        }
        assert!(matches!(
            "fly".parse::<ToolName>(),
            Err(LogseqMcpError::UnknownTool(_))
        ));
    }

    #[test]
    fn test_schemas() {
        let create_page = ToolName::CreatePage.definition();
        assert_eq!(create_page.input_schema["required"], json!(["name"]));

        let update = ToolName::UpdateBlock.definition();
        assert_eq!(update.input_schema["required"], json!(["block_id"]));

        let search = ToolName::SearchPages.definition();
        assert_eq!(search.input_schema["properties"]["limit"]["default"], 10);

        let value = serde_json::to_value(&create_page).unwrap();
        assert!(value.get("inputSchema").is_some());
        assert!(value.get("input_schema").is_none());
    }

    #[test]
    fn test_parse_params_defaults() {
        let params: GetPageParams = parse_params(&json!({"name": "Inbox"})).unwrap();
        assert!(params.include_children);

        let params: JournalParams = parse_params(&json!({})).unwrap();
        assert!(params.date.is_none());

        let err = parse_params::<GetPageParams>(&json!({})).err().unwrap();
        assert!(matches!(err, LogseqMcpError::Validation(_)));
    }
}
