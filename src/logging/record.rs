//! Log records as they travel from a call site to the sinks

use super::mode::Severity;
use chrono::{DateTime, Utc};
use serde_json::Value;
use std::collections::BTreeMap;
use std::panic::Location;
use std::path::Path;
use std::sync::Arc;

/// Field holding a tool's argument map
pub const ARGUMENTS_FIELD: &str = "arguments";

/// Field holding a tool's result
pub const RESULT_FIELD: &str = "result";

/// Where a record was emitted
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SourceLocation {
    /// Source file stem (`client` for `src/logseq/client.rs`)
    pub module: String,
    /// Enclosing span name, when the call site runs inside one
    pub function: Option<String>,
    pub line: Option<u32>,
}

impl SourceLocation {
    pub fn new(file: &str, function: Option<String>, line: Option<u32>) -> Self {
        let module = Path::new(file)
            .file_stem()
            .map(|stem| stem.to_string_lossy().into_owned())
            .unwrap_or_else(|| file.to_string());

        Self {
            module,
            function,
            line,
        }
    }

    /// Location of the caller, with the current span as the function name
    #[track_caller]
    pub fn caller() -> Self {
        let location = Location::caller();
        let function = tracing::Span::current()
            .metadata()
            .map(|metadata| metadata.name().to_string());
        Self::new(location.file(), function, Some(location.line()))
    }
}

/// One log event.
///
/// Attached fields are held behind `Arc` so a caller can keep its own
/// handle to a payload while the record flows through filters. A filter
/// that needs to change a field swaps in a new `Arc`; it never writes
/// through the shared one.
#[derive(Debug, Clone)]
pub struct LogRecord {
    pub severity: Severity,
    /// Logger name (the `tracing` target)
    pub logger: String,
    pub message: String,
    pub timestamp: DateTime<Utc>,
    pub location: SourceLocation,
    /// Rendered error chain for failure records
    pub trace: Option<String>,
    fields: BTreeMap<String, Arc<Value>>,
}

impl LogRecord {
    pub fn new(
        severity: Severity,
        logger: impl Into<String>,
        message: impl Into<String>,
        location: SourceLocation,
    ) -> Self {
        Self {
            severity,
            logger: logger.into(),
            message: message.into(),
            timestamp: Utc::now(),
            location,
            trace: None,
            fields: BTreeMap::new(),
        }
    }

    /// Attach an owned value
    pub fn with_field(self, name: impl Into<String>, value: impl Into<Value>) -> Self {
        self.with_shared_field(name, Arc::new(value.into()))
    }

    /// Attach a value the caller keeps a handle to
    pub fn with_shared_field(mut self, name: impl Into<String>, value: Arc<Value>) -> Self {
        self.fields.insert(name.into(), value);
        self
    }

    pub fn with_trace(mut self, trace: impl Into<String>) -> Self {
        self.trace = Some(trace.into());
        self
    }

    pub fn field(&self, name: &str) -> Option<&Value> {
        self.fields.get(name).map(Arc::as_ref)
    }

    pub fn shared_field(&self, name: &str) -> Option<&Arc<Value>> {
        self.fields.get(name)
    }

    /// Replace a field's value; the previous `Arc` is released, not modified
    pub fn replace_field(&mut self, name: &str, value: Value) {
        self.fields.insert(name.to_string(), Arc::new(value));
    }

    pub fn has_field(&self, name: &str) -> bool {
        self.fields.contains_key(name)
    }

    pub fn fields(&self) -> impl Iterator<Item = (&str, &Value)> {
        self.fields
            .iter()
            .map(|(name, value)| (name.as_str(), value.as_ref()))
    }
}

/// Render an error and its `source()` chain, one cause per line
pub fn render_error_chain(error: &(dyn std::error::Error + 'static)) -> String {
    let mut rendered = error.to_string();
    let mut source = error.source();
    while let Some(cause) = source {
        rendered.push_str("\n  caused by: ");
        rendered.push_str(&cause.to_string());
        source = cause.source();
    }
    rendered
}
