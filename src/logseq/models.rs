//! Typed views of Logseq API payloads
//!
//! The tool layer forwards raw JSON; these types are for callers that want
//! a checked shape, and tolerate the extra keys Logseq adds.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// Reference to another entity by database id
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EntityRef {
    pub id: i64,
}

/// A block as returned by `getBlock` and `getPageBlocksTree`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Block {
    pub uuid: String,
    #[serde(default)]
    pub content: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub page: Option<EntityRef>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub parent: Option<EntityRef>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub properties: Option<Map<String, Value>>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub children: Vec<Block>,
}

impl Block {
    /// This block plus all of its descendants
    pub fn tree_size(&self) -> usize {
        1 + self.children.iter().map(Block::tree_size).sum::<usize>()
    }
}

/// A page as returned by `getPage` and `getAllPages`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Page {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<i64>,
    pub uuid: String,
    /// Lower-cased name Logseq uses as the key
    pub name: String,
    /// Name as the user typed it
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub original_name: Option<String>,
    #[serde(rename = "journal?", default)]
    pub journal: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub journal_day: Option<i64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub properties: Option<Map<String, Value>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub created_at: Option<i64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub updated_at: Option<i64>,
}

impl Page {
    pub fn display_name(&self) -> &str {
        self.original_name.as_deref().unwrap_or(&self.name)
    }
}

/// Rows returned by a Datalog query
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct QueryResult {
    pub query: String,
    pub results: Vec<Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub execution_time_ms: Option<f64>,
}

impl QueryResult {
    pub fn count(&self) -> usize {
        self.results.len()
    }
}

/// Whether a raw page payload is a journal page
pub fn is_journal_page(page: &Value) -> bool {
    page.get("journal?").and_then(Value::as_bool).unwrap_or(false)
}
