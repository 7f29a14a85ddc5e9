//! Rendering filtered records for file and console sinks

use super::record::LogRecord;
use chrono::Local;
use serde::Serialize;
use serde_json::{Map, Value};

/// Attached fields copied into structured output when present and non-null.
/// Raw API payloads (`request_data`, `response_data`, `response_text`) stay
/// out: no filter rewrites them.
pub const RECOGNIZED_FIELDS: &[&str] = &[
    "tool_name",
    "arguments",
    "result",
    "error",
    "duration_ms",
    "log_level",
    "log_file",
    "debug_mode",
    "log_mode",
    "max_file_size",
    "retention_days",
    "action",
    "status_code",
];

/// Written as `function` for events raised outside any span
pub const UNKNOWN_FUNCTION: &str = "<unknown>";

/// Turns a record into one line of output (without the trailing newline)
pub trait Formatter: Send + Sync {
    fn format(&self, record: &LogRecord) -> String;
}

/// Structured log entry for JSON output.
#[derive(Debug, Serialize)]
struct JsonEntry<'a> {
    /// ISO 8601 timestamp, UTC
    timestamp: String,
    level: &'static str,
    logger: &'a str,
    message: &'a str,
    module: &'a str,
    function: &'a str,
    line: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    exception: Option<&'a str>,
    #[serde(flatten)]
    fields: Map<String, Value>,
}

/// One JSON object per line, for the file sink
#[derive(Debug, Clone, Copy, Default)]
pub struct JsonFormatter;

impl Formatter for JsonFormatter {
    fn format(&self, record: &LogRecord) -> String {
        let fields = RECOGNIZED_FIELDS
            .iter()
            .filter_map(|name| match record.field(name) {
                Some(Value::Null) | None => None,
                Some(value) => Some((name.to_string(), value.clone())),
            })
            .collect();

        let entry = JsonEntry {
            timestamp: record
                .timestamp
                .format("%Y-%m-%dT%H:%M:%S%.6fZ")
                .to_string(),
            level: record.severity.as_str(),
            logger: &record.logger,
            message: &record.message,
            module: &record.location.module,
            function: record.location.function.as_deref().unwrap_or(UNKNOWN_FUNCTION),
            line: record.location.line,
            exception: record.trace.as_deref(),
            fields,
        };

        serde_json::to_string(&entry).unwrap_or_else(|e| {
            format!(
                r#"{{"level":"ERROR","message":"unserializable log record: {}"}}"#,
                e.to_string().replace('"', "'")
            )
        })
    }
}

/// `2024-01-15 10:30:00 - logger - LEVEL - message`, for console sinks
#[derive(Debug, Clone, Copy, Default)]
pub struct ConsoleFormatter;

impl Formatter for ConsoleFormatter {
    fn format(&self, record: &LogRecord) -> String {
        let timestamp = record.timestamp.with_timezone(&Local);
        let mut line = format!(
            "{} - {} - {} - {}",
            timestamp.format("%Y-%m-%d %H:%M:%S"),
            record.logger,
            record.severity,
            record.message
        );
        if let Some(trace) = &record.trace {
            line.push('\n');
            line.push_str(trace);
        }
        line
    }
}
