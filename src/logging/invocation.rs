//! One structured record per tool call

use super::mode::Severity;
use super::pipeline::LogPipeline;
use super::record::{render_error_chain, LogRecord, SourceLocation, ARGUMENTS_FIELD, RESULT_FIELD};
use serde_json::Value;
use std::error::Error;
use std::sync::Arc;

/// Outcome of a tool call as seen by the logger
pub type ToolOutcome<'a> = Result<Arc<Value>, &'a (dyn Error + 'static)>;

/// Packages a tool call into a single record routed through the pipeline
#[derive(Debug, Clone)]
pub struct ToolInvocationLogger {
    pipeline: Arc<LogPipeline>,
}

impl ToolInvocationLogger {
    pub fn new(pipeline: Arc<LogPipeline>) -> Self {
        Self { pipeline }
    }

    /// Emit exactly one record for the call.
    ///
    /// `arguments` and a successful result are attached by handle; filters
    /// replace them with sanitized copies and never modify the caller's values.
    #[track_caller]
    pub fn log(
        &self,
        tool_name: &str,
        arguments: Arc<Value>,
        outcome: ToolOutcome<'_>,
        duration_ms: Option<f64>,
    ) {
        let location = SourceLocation::caller();

        let record = match outcome {
            Ok(result) => LogRecord::new(
                Severity::Info,
                module_path!(),
                format!("Tool {} completed successfully", tool_name),
                location,
            )
            .with_shared_field(RESULT_FIELD, result),
            Err(error) => LogRecord::new(
                Severity::Error,
                module_path!(),
                format!("Tool {} failed: {}", tool_name, error),
                location,
            )
            .with_field("error", error.to_string())
            .with_trace(render_error_chain(error)),
        };

        let mut record = record
            .with_field("tool_name", tool_name)
            .with_shared_field(ARGUMENTS_FIELD, arguments);
        if let Some(duration_ms) = duration_ms {
            record = record.with_field("duration_ms", duration_ms);
        }

        self.pipeline.dispatch(record);
    }
}
