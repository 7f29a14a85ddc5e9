//! Record filters run by each sink before formatting
//!
//! A filter may reject a record (return `false`) or rewrite the sink's
//! copy of it. Payloads attached by callers are never written through;
//! sanitized values are swapped in as fresh allocations.

use super::mode::{LoggingMode, Severity};
use super::record::{LogRecord, ARGUMENTS_FIELD, RESULT_FIELD};
use super::sanitizer::{SanitizationRules, Sanitizer};
use once_cell::sync::Lazy;
use regex::{Captures, Regex};
use serde_json::Value;

/// A step in a sink's filter chain
pub trait RecordFilter: Send + Sync {
    /// Return `false` to drop the record for this sink
    fn filter(&self, record: &mut LogRecord) -> bool;
}

/// Drops records below a minimum severity
#[derive(Debug, Clone, Copy)]
pub struct SeverityFilter {
    min: Severity,
}

impl SeverityFilter {
    pub fn new(min: Severity) -> Self {
        Self { min }
    }
}

impl RecordFilter for SeverityFilter {
    fn filter(&self, record: &mut LogRecord) -> bool {
        record.severity >= self.min
    }
}

/// Which sanitizer method a message pattern's capture goes through
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Capture {
    PageName,
    Query,
}

/// A known log message shape that carries a sensitive value
struct MessagePattern {
    regex: Regex,
    prefix: &'static str,
    capture: Capture,
    quoted: bool,
}

/// Message shapes rewritten in privacy mode, applied in this order.
///
/// Call sites that interpolate page names or queries into message text
/// must use one of these shapes; anything else reaches the sinks verbatim.
static MESSAGE_PATTERNS: Lazy<Vec<MessagePattern>> = Lazy::new(|| {
    [
        (r#"page: ['"]([^'"]+)['"]"#, "page: ", Capture::PageName, true),
        (r#"Getting page: ([^'"]+)"#, "Getting page: ", Capture::PageName, false),
        (r#"Creating page: ([^'"]+)"#, "Creating page: ", Capture::PageName, false),
        (r"Searching pages with query: (.+)", "Searching pages with query: ", Capture::Query, false),
        (r"Executing Datalog query: (.+)", "Executing Datalog query: ", Capture::Query, false),
    ]
    .into_iter()
    .map(|(pattern, prefix, capture, quoted)| MessagePattern {
        regex: Regex::new(pattern).expect("Valid message pattern regex"),
        prefix,
        capture,
        quoted,
    })
    .collect()
});

/// Gates and sanitizes records according to the active [`LoggingMode`]
#[derive(Debug, Clone)]
pub struct PrivacyFilter {
    mode: LoggingMode,
    sanitizer: Sanitizer,
    rules: SanitizationRules,
}

impl PrivacyFilter {
    pub fn new(mode: LoggingMode) -> Self {
        Self::with_sanitizer(mode, Sanitizer::default(), SanitizationRules::default())
    }

    pub fn with_sanitizer(mode: LoggingMode, sanitizer: Sanitizer, rules: SanitizationRules) -> Self {
        Self {
            mode,
            sanitizer,
            rules,
        }
    }

    pub fn mode(&self) -> LoggingMode {
        self.mode
    }

    /// Rewrite the sensitive part of known message shapes
    pub fn sanitize_message(&self, message: &str) -> String {
        MESSAGE_PATTERNS
            .iter()
            .fold(message.to_string(), |message, pattern| {
                pattern
                    .regex
                    .replace_all(&message, |caps: &Captures| {
                        let value = Some(&caps[1]);
                        let masked = match pattern.capture {
                            Capture::PageName => self.sanitizer.sanitize_page_name(value),
                            Capture::Query => self.sanitizer.sanitize_query(value),
                        };
                        if pattern.quoted {
                            format!("{}'{}'", pattern.prefix, masked)
                        } else {
                            format!("{}{}", pattern.prefix, masked)
                        }
                    })
                    .into_owned()
            })
    }

    fn sanitize_arguments(&self, record: &mut LogRecord) {
        let sanitized = match record.field(ARGUMENTS_FIELD) {
            Some(Value::Object(arguments)) if !arguments.is_empty() => {
                Value::Object(self.sanitizer.sanitize_dict_with(arguments, &self.rules))
            }
            Some(Value::Null) | None => return,
            // Unparsed payload text, e.g. recorded through `?` formatting
            Some(Value::String(text)) => Value::String(self.sanitizer.sanitize_content(Some(text))),
            Some(other) => self.sanitizer.sanitize_value(other, &self.rules),
        };
        record.replace_field(ARGUMENTS_FIELD, sanitized);
    }

    fn sanitize_result(&self, record: &mut LogRecord) {
        let mut result = match record.field(RESULT_FIELD) {
            Some(Value::Object(result)) => result.clone(),
            _ => return,
        };

        if let Some(Value::Object(page)) = result.get_mut("page") {
            let masked = match page.get("originalName") {
                Some(Value::String(original_name)) => {
                    Some(self.sanitizer.sanitize_page_name(Some(original_name)))
                }
                _ => None,
            };
            if let Some(masked) = masked {
                page.insert("originalName".to_string(), Value::String(masked));
            }
        }

        for key in ["pages", "results"] {
            let count = match result.get(key) {
                Some(Value::Array(items)) => items.len(),
                _ => continue,
            };
            result.insert(
                key.to_string(),
                Value::String(format!("[list_with_{}_{}]", count, key)),
            );
        }

        record.replace_field(RESULT_FIELD, Value::Object(result));
    }
}

impl RecordFilter for PrivacyFilter {
    fn filter(&self, record: &mut LogRecord) -> bool {
        match self.mode {
            LoggingMode::Minimal => record.severity >= Severity::Warning,
            LoggingMode::Debug => true,
            LoggingMode::Privacy => {
                record.message = self.sanitize_message(&record.message);
                self.sanitize_arguments(record);
                self.sanitize_result(record);
                true
            }
        }
    }
}
