//! Common test utilities and helpers

#![allow(dead_code)]

use async_trait::async_trait;
use logseq_mcp::logging::{
    BufferWriter, JsonFormatter, LogPipeline, LoggingMode, PrivacyFilter, Severity, Sink,
};
use logseq_mcp::{LogseqApi, LogseqMcpError, Result};
use serde_json::{json, Map, Value};
use std::collections::HashMap;
use std::sync::{Arc, Mutex};

/// In-memory stand-in for the Logseq API server
#[derive(Default)]
pub struct FakeLogseq {
    pages: HashMap<String, Value>,
    page_blocks: HashMap<String, Vec<Value>>,
    blocks: HashMap<String, Value>,
    all_pages: Vec<Value>,
    search_results: Vec<Value>,
    query_results: Vec<Value>,
    graph: Value,
    fail_with: Option<String>,
    calls: Mutex<Vec<String>>,
}

impl FakeLogseq {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_page(mut self, name: &str, page: Value) -> Self {
        self.pages.insert(name.to_string(), page);
        self
    }

    /// Blocks returned for a page name or uuid
    pub fn with_page_blocks(mut self, key: &str, blocks: Vec<Value>) -> Self {
        self.page_blocks.insert(key.to_string(), blocks);
        self
    }

    pub fn with_block(mut self, uuid: &str, block: Value) -> Self {
        self.blocks.insert(uuid.to_string(), block);
        self
    }

    pub fn with_all_pages(mut self, pages: Vec<Value>) -> Self {
        self.all_pages = pages;
        self
    }

    pub fn with_search_results(mut self, results: Vec<Value>) -> Self {
        self.search_results = results;
        self
    }

    pub fn with_query_results(mut self, results: Vec<Value>) -> Self {
        self.query_results = results;
        self
    }

    pub fn with_graph(mut self, graph: Value) -> Self {
        self.graph = graph;
        self
    }

    /// Every call fails with `LogseqMcpError::Api(message)`
    pub fn failing(mut self, message: &str) -> Self {
        self.fail_with = Some(message.to_string());
        self
    }

    /// `method(arg)` strings in call order
    pub fn calls(&self) -> Vec<String> {
        self.calls.lock().unwrap().clone()
    }

    fn record(&self, call: String) -> Result<()> {
        self.calls.lock().unwrap().push(call);
        match &self.fail_with {
            Some(message) => Err(LogseqMcpError::Api(message.clone())),
            None => Ok(()),
        }
    }
}

#[async_trait]
impl LogseqApi for FakeLogseq {
    async fn get_current_graph(&self) -> Result<Value> {
        self.record("get_current_graph()".to_string())?;
        Ok(self.graph.clone())
    }

    async fn create_block(
        &self,
        content: &str,
        page: Option<&str>,
        parent_block_id: Option<&str>,
        _properties: Option<&Map<String, Value>>,
    ) -> Result<Value> {
        let target = page.or(parent_block_id).ok_or_else(|| {
            LogseqMcpError::Validation("Either page or parent_block_id must be provided".to_string())
        })?;
        self.record(format!("create_block({})", target))?;
        Ok(json!({ "uuid": "6571a3f2-0000-4000-8000-000000000001", "content": content }))
    }

    async fn update_block(
        &self,
        block_id: &str,
        content: Option<&str>,
        _properties: Option<&Map<String, Value>>,
    ) -> Result<Value> {
        self.record(format!("update_block({})", block_id))?;
        Ok(json!({ "uuid": block_id, "content": content.unwrap_or("") }))
    }

    async fn delete_block(&self, block_id: &str) -> Result<Value> {
        self.record(format!("delete_block({})", block_id))?;
        Ok(Value::Null)
    }

    async fn get_block(&self, block_id: &str) -> Result<Value> {
        self.record(format!("get_block({})", block_id))?;
        Ok(self.blocks.get(block_id).cloned().unwrap_or(Value::Null))
    }

    async fn create_page(
        &self,
        name: &str,
        _content: Option<&str>,
        _properties: Option<&Map<String, Value>>,
    ) -> Result<Value> {
        self.record(format!("create_page({})", name))?;
        Ok(json!({ "uuid": "6571a3f2-0000-4000-8000-000000000002", "originalName": name }))
    }

    async fn get_page(&self, name: &str) -> Result<Option<Value>> {
        self.record(format!("get_page({})", name))?;
        Ok(self.pages.get(name).cloned())
    }

    async fn get_page_blocks(&self, name: &str) -> Result<Vec<Value>> {
        self.record(format!("get_page_blocks({})", name))?;
        Ok(self.page_blocks.get(name).cloned().unwrap_or_default())
    }

    async fn get_all_pages(&self) -> Result<Vec<Value>> {
        self.record("get_all_pages()".to_string())?;
        Ok(self.all_pages.clone())
    }

    async fn search_pages(&self, query: &str) -> Result<Vec<Value>> {
        self.record(format!("search_pages({})", query))?;
        Ok(self.search_results.clone())
    }

    async fn execute_query(&self, query: &str) -> Result<Vec<Value>> {
        self.record(format!("execute_query({})", query))?;
        Ok(self.query_results.clone())
    }
}

/// Pipeline with one JSON sink writing to memory, filtered for `mode`
pub fn buffered_pipeline(mode: LoggingMode) -> (Arc<LogPipeline>, BufferWriter) {
    let buffer = BufferWriter::new();
    let sink = Sink::new("file", Severity::Debug, JsonFormatter, buffer.clone())
        .with_filter(Arc::new(PrivacyFilter::new(mode)));
    let pipeline = LogPipeline::new(Severity::Debug, mode).with_sink(sink);
    (Arc::new(pipeline), buffer)
}

/// Parse each captured line as JSON
pub fn json_lines(buffer: &BufferWriter) -> Vec<Value> {
    buffer
        .lines()
        .iter()
        .map(|line| serde_json::from_str(line).expect("log line is valid JSON"))
        .collect()
}
