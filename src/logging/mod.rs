//! Privacy-preserving structured logging
//!
//! Records flow from `tracing` call sites (or the [`ToolInvocationLogger`])
//! into a [`LogPipeline`]. Each sink runs its own filter chain on its own
//! copy of the record, formats it and writes it under a per-sink lock.
//!
//! In the default [`LoggingMode::Privacy`] mode the [`PrivacyFilter`]
//! rewrites known message shapes and replaces the `arguments` and `result`
//! payloads with sanitized copies. Values the caller attached are never
//! modified.

pub mod filter;
pub mod format;
pub mod invocation;
pub mod mode;
pub mod pipeline;
pub mod record;
pub mod rotation;
pub mod sanitizer;
pub mod sink;

pub use filter::{PrivacyFilter, RecordFilter, SeverityFilter};
pub use format::{ConsoleFormatter, Formatter, JsonFormatter};
pub use invocation::{ToolInvocationLogger, ToolOutcome};
pub use mode::{LoggingMode, Severity};
pub use pipeline::{
    install, setup_logging, LogPipeline, LoggingConfig, LoggingError, PipelineLayer,
    ResolvedLoggingConfig,
};
pub use record::{render_error_chain, LogRecord, SourceLocation};
pub use rotation::{parse_size, RotationPolicy, SizeRotatingWriter};
pub use sanitizer::{SanitizationRules, SanitizeStrategy, Sanitizer};
pub use sink::{BufferWriter, Sink};
