//! HTTP client for the Logseq API server
//!
//! Every call is a POST of `{"method": <action>, "args": <args>}` to
//! `<base>/api`. Most Editor methods take their arguments as an array
//! (`["page-name"]`, `[uuid, content, opts]`); `search` and `DB.q` take a
//! plain string; `getCurrentGraph` and `getAllPages` take none.

use crate::config::LogseqConfig;
use crate::error::{LogseqMcpError, Result};
use crate::logseq::models::{Block, Page};
use crate::utils::string::{preview, truncate_chars};
use async_trait::async_trait;
use reqwest::header::{HeaderMap, HeaderValue, AUTHORIZATION};
use serde::Deserialize;
use serde_json::{json, Map, Value};
use tracing::{debug, error, info, warn};

/// Characters of a request or response shown in a debug preview
const PREVIEW_CHARS: usize = 200;

/// Characters of a response body kept with a debug or error record
const DETAIL_CHARS: usize = 500;

/// Operations the tool layer needs from Logseq
#[async_trait]
pub trait LogseqApi: Send + Sync {
    async fn get_current_graph(&self) -> Result<Value>;

    /// Insert a block into `page`, or under `parent_block_id` when no page is given
    async fn create_block(
        &self,
        content: &str,
        page: Option<&str>,
        parent_block_id: Option<&str>,
        properties: Option<&Map<String, Value>>,
    ) -> Result<Value>;

    async fn update_block(
        &self,
        block_id: &str,
        content: Option<&str>,
        properties: Option<&Map<String, Value>>,
    ) -> Result<Value>;

    async fn delete_block(&self, block_id: &str) -> Result<Value>;

    async fn get_block(&self, block_id: &str) -> Result<Value>;

    /// Create a page, adding `content` as its first block when given
    async fn create_page(
        &self,
        name: &str,
        content: Option<&str>,
        properties: Option<&Map<String, Value>>,
    ) -> Result<Value>;

    /// `None` when the page does not exist
    async fn get_page(&self, name: &str) -> Result<Option<Value>>;

    /// Block tree of a page, by name or uuid
    async fn get_page_blocks(&self, name: &str) -> Result<Vec<Value>>;

    async fn get_all_pages(&self) -> Result<Vec<Value>>;

    async fn search_pages(&self, query: &str) -> Result<Vec<Value>>;

    async fn execute_query(&self, query: &str) -> Result<Vec<Value>>;
}

/// reqwest-backed [`LogseqApi`]
#[derive(Debug, Clone)]
pub struct LogseqClient {
    client: reqwest::Client,
    api_url: String,
}

impl LogseqClient {
    pub fn new(config: &LogseqConfig) -> Result<Self> {
        let mut headers = HeaderMap::new();
        if let Some(token) = &config.token {
            let mut value = HeaderValue::from_str(&format!("Bearer {}", token))
                .map_err(|_| LogseqMcpError::Config("API token is not a valid header value".to_string()))?;
            value.set_sensitive(true);
            headers.insert(AUTHORIZATION, value);
        }

        let client = reqwest::Client::builder()
            .timeout(config.timeout)
            .default_headers(headers)
            .build()?;

        Ok(Self {
            client,
            api_url: config.api_url(),
        })
    }

    pub fn api_url(&self) -> &str {
        &self.api_url
    }

    /// Send one API call and return the decoded response (`null` for an empty body)
    pub async fn request(&self, action: &str, args: Option<Value>) -> Result<Value> {
        let mut body = json!({ "method": action });
        if let Some(args) = args {
            body["args"] = args;
        }

        debug!(
            action = %action,
            request_data = %preview(&body.to_string(), PREVIEW_CHARS),
            "Logseq API request: {}",
            action
        );

        let response = match self.client.post(&self.api_url).json(&body).send().await {
            Ok(response) => response,
            Err(e) => {
                error!(action = %action, error = %e, "Logseq API request failed: {}", action);
                return Err(LogseqMcpError::Http(e));
            }
        };

        let status = response.status();
        let text = match response.text().await {
            Ok(text) => text,
            Err(e) => {
                error!(action = %action, error = %e, "Logseq API request failed: {}", action);
                return Err(LogseqMcpError::Http(e));
            }
        };

        if !status.is_success() {
            error!(
                action = %action,
                status_code = status.as_u16(),
                response_text = %truncate_chars(&text, DETAIL_CHARS),
                "Logseq API HTTP error: {}",
                action
            );
            return Err(LogseqMcpError::Api(format!(
                "{} returned HTTP {}",
                action, status
            )));
        }

        debug!(
            action = %action,
            status_code = status.as_u16(),
            response_data = %truncate_chars(&text, DETAIL_CHARS),
            "Logseq API response: {} ({})",
            action,
            status
        );

        if text.trim().is_empty() {
            return Ok(Value::Null);
        }
        Ok(serde_json::from_str(&text)?)
    }
}

fn json_type(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "bool",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}

/// A list response, or the list stored under `key` in an object response
fn list_or_field(value: Value, key: &str) -> Option<Vec<Value>> {
    match value {
        Value::Array(items) => Some(items),
        Value::Object(mut map) => match map.remove(key) {
            Some(Value::Array(items)) => Some(items),
            _ => Some(Vec::new()),
        },
        Value::Null => Some(Vec::new()),
        _ => None,
    }
}

#[async_trait]
impl LogseqApi for LogseqClient {
    async fn get_current_graph(&self) -> Result<Value> {
        self.request("logseq.Editor.getCurrentGraph", None).await
    }

    async fn create_block(
        &self,
        content: &str,
        page: Option<&str>,
        parent_block_id: Option<&str>,
        properties: Option<&Map<String, Value>>,
    ) -> Result<Value> {
        let target = page
            .filter(|page| !page.is_empty())
            .or_else(|| parent_block_id.filter(|id| !id.is_empty()))
            .ok_or_else(|| {
                LogseqMcpError::Validation("Either page or parent_block_id must be provided".to_string())
            })?;

        let mut args = vec![json!(target), json!(content)];
        if let Some(properties) = properties.filter(|p| !p.is_empty()) {
            args.push(json!({ "properties": properties }));
        }

        self.request("logseq.Editor.insertBlock", Some(Value::Array(args)))
            .await
    }

    async fn update_block(
        &self,
        block_id: &str,
        content: Option<&str>,
        properties: Option<&Map<String, Value>>,
    ) -> Result<Value> {
        let mut args = vec![json!(block_id), json!(content.unwrap_or(""))];
        if let Some(properties) = properties {
            args.push(json!({ "properties": properties }));
        }

        self.request("logseq.Editor.updateBlock", Some(Value::Array(args)))
            .await
    }

    async fn delete_block(&self, block_id: &str) -> Result<Value> {
        self.request("logseq.Editor.removeBlock", Some(json!([block_id])))
            .await
    }

    async fn get_block(&self, block_id: &str) -> Result<Value> {
        self.request("logseq.Editor.getBlock", Some(json!([block_id])))
            .await
    }

    async fn create_page(
        &self,
        name: &str,
        content: Option<&str>,
        properties: Option<&Map<String, Value>>,
    ) -> Result<Value> {
        info!("Creating page: {}", name);

        let args = match properties.filter(|p| !p.is_empty()) {
            Some(properties) => json!([name, properties]),
            None => json!([name]),
        };
        let page = self.request("logseq.Editor.createPage", Some(args)).await?;

        if let Some(content) = content.filter(|c| !c.is_empty()) {
            if !page.is_null() {
                self.create_block(content, Some(name), None, None).await?;
            }
        }

        Ok(page)
    }

    async fn get_page(&self, name: &str) -> Result<Option<Value>> {
        info!("Getting page: '{}'", name);

        match self
            .request("logseq.Editor.getPage", Some(json!([name])))
            .await
        {
            Ok(Value::Null) => {
                info!("Lookup returned null for page: '{}'", name);
                Ok(None)
            }
            Ok(page) => {
                match Page::deserialize(&page) {
                    Ok(typed) => debug!(page_id = ?typed.id, journal = typed.journal, "Page found"),
                    Err(_) => debug!("Page found (unrecognized shape)"),
                }
                Ok(Some(page))
            }
            Err(e) => {
                error!("Failed to get page: '{}': {}", name, e);
                Err(e)
            }
        }
    }

    async fn get_page_blocks(&self, name: &str) -> Result<Vec<Value>> {
        match self
            .request("logseq.Editor.getPageBlocksTree", Some(json!([name])))
            .await
        {
            Ok(Value::Array(blocks)) => {
                let total: usize = blocks
                    .iter()
                    .filter_map(|block| Block::deserialize(block).ok())
                    .map(|block| block.tree_size())
                    .sum();
                debug!("Retrieved {} top-level blocks ({} total)", blocks.len(), total);
                Ok(blocks)
            }
            Ok(other) => {
                warn!("Unexpected result type for page blocks: {}", json_type(&other));
                Ok(Vec::new())
            }
            Err(e) => {
                error!("Failed to get blocks for page: '{}': {}", name, e);
                Ok(Vec::new())
            }
        }
    }

    async fn get_all_pages(&self) -> Result<Vec<Value>> {
        match self.request("logseq.Editor.getAllPages", None).await {
            Ok(Value::Array(pages)) => Ok(pages),
            Ok(other) => {
                warn!("Unexpected result type for all pages: {}", json_type(&other));
                Ok(Vec::new())
            }
            Err(e) => {
                error!("Failed to get all pages: {}", e);
                Ok(Vec::new())
            }
        }
    }

    async fn search_pages(&self, query: &str) -> Result<Vec<Value>> {
        info!("Searching pages with query: {}", query);

        match self
            .request("logseq.Editor.search", Some(json!(query)))
            .await
        {
            Ok(result) => Ok(list_or_field(result, "pages").unwrap_or_default()),
            Err(e) => {
                error!("Search failed: {}", e);
                Ok(Vec::new())
            }
        }
    }

    async fn execute_query(&self, query: &str) -> Result<Vec<Value>> {
        info!("Executing Datalog query: {}", query);

        let result = self.request("logseq.DB.q", Some(json!(query))).await?;
        list_or_field(result, "results").ok_or_else(|| {
            LogseqMcpError::Api("Unexpected result type for query".to_string())
        })
    }
}
