//! Privacy-preserving value summaries for log output
//!
//! The sanitizer turns page names, block content, block ids, file paths,
//! properties and Datalog queries into summaries that keep their shape
//! (length, rough identity) without disclosing what the user wrote.
//!
//! Every method borrows its input and builds a new value; nothing here
//! mutates the data it is given.
//!
//! ```
//! use logseq_mcp::logging::Sanitizer;
//!
//! let sanitizer = Sanitizer::default();
//! assert_eq!(sanitizer.sanitize_page_name(Some("My Private Journal")), "My P***rnal");
//! assert_eq!(sanitizer.sanitize_content(Some("Secret meeting notes")), "[content_20_chars]");
//! ```

use once_cell::sync::Lazy;
use regex::Regex;
use serde_json::{Map, Value};
use sha2::{Digest, Sha256};
use std::collections::BTreeMap;

/// Returned for `None` or empty inputs
pub const EMPTY_MARKER: &str = "[empty]";

/// Replaces page names that are journal dates
pub const JOURNAL_MARKER: &str = "[journal_page]";

/// Replaces sensitive property values outright
pub const REDACTED_MARKER: &str = "[REDACTED]";

/// Joins the visible prefix and suffix of a partially masked value
pub const MASK: &str = "***";

/// Default minimum length below which names are left alone
pub const DEFAULT_MIN_MASK_LENGTH: usize = 3;

static JOURNAL_NAME: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^\w+\s+\d+\w*,\s+\d{4}$").expect("Valid journal name regex"));

static URL_HOST: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"https?://([^/]+)").expect("Valid URL host regex"));

/// Home directory and graph segments, applied in order
static PATH_PATTERNS: Lazy<Vec<(Regex, &'static str)>> = Lazy::new(|| {
    [
        (r"(?i)/home/[^/]+", "/home/***"),
        (r"(?i)/Users/[^/]+", "/Users/***"),
        (r"(?i)C:\\Users\\[^\\]+", r"C:\Users\***"),
        (r"(?i)\\Users\\[^\\]+", r"\Users\***"),
        (r"(?i)/graphs/[^/]+", "/graphs/***"),
        (r"(?i)\\graphs\\[^\\]+", r"\graphs\***"),
    ]
    .into_iter()
    .map(|(pattern, replacement)| {
        (
            Regex::new(pattern).expect("Valid path pattern regex"),
            replacement,
        )
    })
    .collect()
});

const SENSITIVE_PROPERTY_KEYS: &[&str] = &[
    "password",
    "token",
    "secret",
    "key",
    "api_key",
    "email",
    "phone",
    "ssn",
    "credit_card",
];

const PARTIAL_PROPERTY_KEYS: &[&str] = &["url", "link", "website", "domain"];

/// How a single field is summarized
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SanitizeStrategy {
    PageName,
    Content,
    BlockId,
    Path,
    Properties,
    Query,
}

impl SanitizeStrategy {
    pub fn as_str(&self) -> &'static str {
        match self {
            SanitizeStrategy::PageName => "page_name",
            SanitizeStrategy::Content => "content",
            SanitizeStrategy::BlockId => "block_id",
            SanitizeStrategy::Path => "path",
            SanitizeStrategy::Properties => "properties",
            SanitizeStrategy::Query => "query",
        }
    }
}

/// Field name to strategy table used by [`Sanitizer::sanitize_dict_with`]
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SanitizationRules {
    rules: BTreeMap<String, SanitizeStrategy>,
}

impl SanitizationRules {
    /// An empty rule set: nothing is matched by field name
    pub fn empty() -> Self {
        Self {
            rules: BTreeMap::new(),
        }
    }

    /// Add or replace the strategy for a field name
    pub fn with_rule(mut self, field: impl Into<String>, strategy: SanitizeStrategy) -> Self {
        self.rules.insert(field.into(), strategy);
        self
    }

    /// Strategy for a field name (exact, case-sensitive match)
    pub fn strategy_for(&self, field: &str) -> Option<SanitizeStrategy> {
        self.rules.get(field).copied()
    }

    pub fn len(&self) -> usize {
        self.rules.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rules.is_empty()
    }
}

impl Default for SanitizationRules {
    /// Rules for the fields the Logseq tools accept and return
    fn default() -> Self {
        use SanitizeStrategy::*;

        Self::empty()
            .with_rule("page_name", PageName)
            .with_rule("page", PageName)
            .with_rule("name", PageName)
            .with_rule("content", Content)
            .with_rule("block_content", Content)
            .with_rule("path", Path)
            .with_rule("file_path", Path)
            .with_rule("properties", Properties)
            .with_rule("query", Query)
            .with_rule("block_id", BlockId)
            .with_rule("uuid", BlockId)
    }
}

static DEFAULT_RULES: Lazy<SanitizationRules> = Lazy::new(SanitizationRules::default);

/// Masks or summarizes sensitive values.
///
/// The only state is the minimum length under which page names are
/// considered too short to mask.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Sanitizer {
    min_mask_length: usize,
}

impl Default for Sanitizer {
    fn default() -> Self {
        Self::new(DEFAULT_MIN_MASK_LENGTH)
    }
}

impl Sanitizer {
    pub fn new(min_mask_length: usize) -> Self {
        Self { min_mask_length }
    }

    pub fn min_mask_length(&self) -> usize {
        self.min_mask_length
    }

    /// Partially mask a page name.
    ///
    /// Short names come back unchanged, journal names collapse to
    /// [`JOURNAL_MARKER`], everything else keeps a prefix and suffix
    /// window of `max(1, len / 4)` characters around [`MASK`].
    pub fn sanitize_page_name(&self, name: Option<&str>) -> String {
        let name = match name {
            Some(name) if !name.is_empty() => name,
            _ => return EMPTY_MARKER.to_string(),
        };

        let chars: Vec<char> = name.chars().collect();
        let len = chars.len();

        if len <= self.min_mask_length {
            return name.to_string();
        }

        if JOURNAL_NAME.is_match(name) {
            return JOURNAL_MARKER.to_string();
        }

        if len <= 8 {
            return format!("{}{}{}", chars[0], MASK, chars[len - 1]);
        }

        let visible = (len / 4).max(1);
        let start: String = chars[..visible].iter().collect();
        let end: String = chars[len - visible..].iter().collect();
        format!("{}{}{}", start, MASK, end)
    }

    /// Replace block content with its length
    pub fn sanitize_content(&self, content: Option<&str>) -> String {
        match content {
            Some(content) if !content.is_empty() => {
                format!("[content_{}_chars]", content.chars().count())
            }
            _ => EMPTY_MARKER.to_string(),
        }
    }

    /// Stable short fingerprint of a block id: `block_` plus the first six
    /// hex digits of its SHA-256.
    pub fn sanitize_block_id(&self, block_id: Option<&str>) -> String {
        match block_id {
            Some(block_id) if !block_id.is_empty() => {
                let digest = format!("{:x}", Sha256::digest(block_id.as_bytes()));
                format!("block_{}", &digest[..6])
            }
            _ => EMPTY_MARKER.to_string(),
        }
    }

    /// Mask user names in home directories and graph names in a path
    pub fn sanitize_path(&self, path: Option<&str>) -> String {
        let path = match path {
            Some(path) if !path.is_empty() => path,
            _ => return EMPTY_MARKER.to_string(),
        };

        PATH_PATTERNS
            .iter()
            .fold(path.to_string(), |sanitized, (pattern, replacement)| {
                pattern.replace_all(&sanitized, *replacement).into_owned()
            })
    }

    /// Redact sensitive property values, keeping every key.
    pub fn sanitize_properties(&self, properties: Option<&Map<String, Value>>) -> Map<String, Value> {
        let properties = match properties {
            Some(properties) if !properties.is_empty() => properties,
            _ => return Map::new(),
        };

        properties
            .iter()
            .map(|(key, value)| (key.clone(), sanitize_property(key, value)))
            .collect()
    }

    /// Replace a Datalog query with its length; predicates can name the
    /// very terms a user searched for.
    pub fn sanitize_query(&self, query: Option<&str>) -> String {
        match query {
            Some(query) if !query.is_empty() => {
                format!("[datalog_query_{}_chars]", query.chars().count())
            }
            _ => EMPTY_MARKER.to_string(),
        }
    }

    /// Sanitize a mapping with the default rule set
    pub fn sanitize_dict(&self, data: &Map<String, Value>) -> Map<String, Value> {
        self.sanitize_dict_with(data, &DEFAULT_RULES)
    }

    /// Recursively sanitize a mapping.
    ///
    /// Scalars under a ruled key go through that rule; nested mappings and
    /// lists of mappings are walked with the same rules; lists of scalars
    /// collapse to an item count. A new map is returned.
    pub fn sanitize_dict_with(
        &self,
        data: &Map<String, Value>,
        rules: &SanitizationRules,
    ) -> Map<String, Value> {
        data.iter()
            .map(|(key, value)| {
                let sanitized = match (rules.strategy_for(key), value) {
                    (Some(strategy), value) if !value.is_object() && !value.is_array() => {
                        self.apply(strategy, value)
                    }
                    _ => self.sanitize_value(value, rules),
                };
                (key.clone(), sanitized)
            })
            .collect()
    }

    /// Sanitize a value that is not under a ruled key
    pub fn sanitize_value(&self, value: &Value, rules: &SanitizationRules) -> Value {
        match value {
            Value::Object(map) => Value::Object(self.sanitize_dict_with(map, rules)),
            Value::Array(items) if items.first().map_or(false, Value::is_object) => Value::Array(
                items
                    .iter()
                    .map(|item| self.sanitize_value(item, rules))
                    .collect(),
            ),
            Value::Array(items) if !items.is_empty() => {
                Value::String(format!("[list_with_{}_items]", items.len()))
            }
            Value::Array(_) => Value::String(type_marker(value)),
            Value::Null | Value::Bool(_) | Value::Number(_) | Value::String(_) => value.clone(),
        }
    }

    /// Run one strategy against a scalar value
    pub fn apply(&self, strategy: SanitizeStrategy, value: &Value) -> Value {
        let text = match value {
            Value::Null => None,
            Value::String(s) => Some(s.clone()),
            Value::Bool(_) | Value::Number(_) => Some(value.to_string()),
            Value::Array(_) | Value::Object(_) => return Value::String(type_marker(value)),
        };
        let text = text.as_deref();

        match strategy {
            SanitizeStrategy::PageName => Value::String(self.sanitize_page_name(text)),
            SanitizeStrategy::Content => Value::String(self.sanitize_content(text)),
            SanitizeStrategy::BlockId => Value::String(self.sanitize_block_id(text)),
            SanitizeStrategy::Path => Value::String(self.sanitize_path(text)),
            SanitizeStrategy::Query => Value::String(self.sanitize_query(text)),
            SanitizeStrategy::Properties => match value {
                Value::Null => Value::Object(Map::new()),
                other => Value::String(type_marker(other)),
            },
        }
    }
}

fn sanitize_property(key: &str, value: &Value) -> Value {
    let lower_key = key.to_lowercase();

    if SENSITIVE_PROPERTY_KEYS
        .iter()
        .any(|sensitive| lower_key.contains(sensitive))
    {
        return Value::String(REDACTED_MARKER.to_string());
    }

    if PARTIAL_PROPERTY_KEYS
        .iter()
        .any(|partial| lower_key.contains(partial))
    {
        return match value {
            Value::String(s) if s.chars().count() > 10 => match URL_HOST.captures(s) {
                Some(caps) => Value::String(format!("{}/{}", &caps[1], MASK)),
                None => {
                    let head: String = s.chars().take(10).collect();
                    Value::String(format!("{}{}", head, MASK))
                }
            },
            other => other.clone(),
        };
    }

    match value {
        Value::String(s) if s.chars().count() > 50 => {
            Value::String(format!("[string_{}_chars]", s.chars().count()))
        }
        Value::Array(items) if value.to_string().chars().count() > 100 => {
            Value::String(format!("[list_with_{}_items]", items.len()))
        }
        Value::Object(map) if value.to_string().chars().count() > 100 => {
            Value::String(format!("[dict_with_{}_items]", map.len()))
        }
        other => other.clone(),
    }
}

/// `[<TypeName>]` marker for values no rule knows how to summarize
fn type_marker(value: &Value) -> String {
    let name = match value {
        Value::Null => "null",
        Value::Bool(_) => "bool",
        Value::Number(_) => "number",
        Value::String(_) => "str",
        Value::Array(_) => "list",
        Value::Object(_) => "dict",
    };
    format!("[{}]", name)
}
