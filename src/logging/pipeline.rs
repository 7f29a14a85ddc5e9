//! Pipeline assembly: configuration resolution, sink topology and the
//! `tracing` layer that feeds events into the sinks

use super::filter::{PrivacyFilter, RecordFilter, SeverityFilter};
use super::format::{ConsoleFormatter, JsonFormatter};
use super::mode::{LoggingMode, Severity};
use super::record::{LogRecord, SourceLocation, ARGUMENTS_FIELD, RESULT_FIELD};
use super::rotation::{parse_size, RotationPolicy, DEFAULT_BACKUP_COUNT, DEFAULT_MAX_FILE_SIZE};
use super::sink::Sink;
use chrono::Local;
use serde_json::Value;
use std::fmt;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use thiserror::Error;
use tracing::field::{Field, Visit};
use tracing::{Event, Subscriber};
use tracing_subscriber::layer::{Context, Layer, SubscriberExt};
use tracing_subscriber::registry::LookupSpan;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::EnvFilter;

pub const ENV_LOG_LEVEL: &str = "LOGSEQ_MCP_LOG_LEVEL";
pub const ENV_LOG_FILE: &str = "LOGSEQ_MCP_LOG_FILE";
pub const ENV_LOG_MODE: &str = "LOGSEQ_MCP_LOG_MODE";
pub const ENV_LOG_MAX_SIZE: &str = "LOGSEQ_MCP_LOG_MAX_SIZE";
pub const ENV_LOG_RETENTION_DAYS: &str = "LOGSEQ_MCP_LOG_RETENTION_DAYS";
pub const ENV_DEBUG: &str = "LOGSEQ_MCP_DEBUG";
pub const ENV_PROJECT_ROOT: &str = "LOGSEQ_MCP_PROJECT_ROOT";

/// Noisy dependencies capped at warnings regardless of the configured level
const DEPENDENCY_DIRECTIVES: &str = "hyper=warn,reqwest=warn,h2=warn,rustls=warn";

/// Logging subsystem errors
#[derive(Error, Debug)]
pub enum LoggingError {
    #[error("Failed to create log directory {}: {source}", .path.display())]
    CreateDirectory {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to open log file: {0}")]
    Io(#[from] std::io::Error),

    #[error("Failed to set up log rotation: {0}")]
    Rotation(String),

    #[error("Logging already initialized: {0}")]
    AlreadyInitialized(String),
}

/// Logging settings supplied by the caller.
///
/// Unset fields fall back to the `LOGSEQ_MCP_*` environment variables and
/// then to built-in defaults.
#[derive(Debug, Clone, Default)]
pub struct LoggingConfig {
    pub level: Option<String>,
    pub log_file: Option<PathBuf>,
    pub mode: Option<String>,
    pub max_file_size: Option<String>,
    pub backup_count: Option<usize>,
    pub retention_days: Option<u32>,
    pub debug: Option<bool>,
    pub project_root: Option<PathBuf>,
}

/// Fully resolved logging settings
#[derive(Debug, Clone, PartialEq)]
pub struct ResolvedLoggingConfig {
    pub level: Severity,
    pub log_file: PathBuf,
    pub mode: LoggingMode,
    pub max_file_size: u64,
    pub backup_count: usize,
    pub retention_days: Option<u32>,
    pub debug: bool,
}

impl ResolvedLoggingConfig {
    pub fn rotation(&self) -> RotationPolicy {
        RotationPolicy::from_settings(self.max_file_size, self.backup_count, self.retention_days)
    }
}

impl LoggingConfig {
    /// Resolve against the process environment
    pub fn resolve(&self) -> ResolvedLoggingConfig {
        self.resolve_with(|key| std::env::var(key).ok())
    }

    /// Resolve against an arbitrary variable lookup
    pub fn resolve_with<F>(&self, env: F) -> ResolvedLoggingConfig
    where
        F: Fn(&str) -> Option<String>,
    {
        let lookup = |explicit: &Option<String>, key: &str| {
            explicit
                .clone()
                .or_else(|| env(key))
                .filter(|value| !value.trim().is_empty())
        };

        let level = lookup(&self.level, ENV_LOG_LEVEL)
            .map(|value| Severity::parse_or_default(&value))
            .unwrap_or(Severity::Info);

        let mode = lookup(&self.mode, ENV_LOG_MODE)
            .map(|value| LoggingMode::parse_or_default(&value))
            .unwrap_or_default();

        let max_file_size = lookup(&self.max_file_size, ENV_LOG_MAX_SIZE)
            .and_then(|value| parse_size(&value))
            .unwrap_or(DEFAULT_MAX_FILE_SIZE);

        let retention_days = self
            .retention_days
            .or_else(|| env(ENV_LOG_RETENTION_DAYS).and_then(|value| value.trim().parse().ok()))
            .filter(|days| *days > 0);

        let debug = self
            .debug
            .or_else(|| env(ENV_DEBUG).map(|value| parse_flag(&value)))
            .unwrap_or(false);

        let log_file = self
            .log_file
            .clone()
            .or_else(|| env(ENV_LOG_FILE).filter(|v| !v.trim().is_empty()).map(PathBuf::from))
            .unwrap_or_else(|| {
                let root = self
                    .project_root
                    .clone()
                    .or_else(|| env(ENV_PROJECT_ROOT).map(PathBuf::from))
                    .unwrap_or_else(default_project_root);
                default_log_file(&root, retention_days.is_some())
            });

        ResolvedLoggingConfig {
            level,
            log_file,
            mode,
            max_file_size,
            backup_count: self.backup_count.unwrap_or(DEFAULT_BACKUP_COUNT),
            retention_days,
            debug,
        }
    }
}

fn parse_flag(value: &str) -> bool {
    matches!(
        value.trim().to_lowercase().as_str(),
        "1" | "true" | "yes" | "on"
    )
}

/// Platform data directory for this application, or the working directory
pub fn default_project_root() -> PathBuf {
    dirs::data_local_dir()
        .map(|dir| dir.join("logseq-mcp"))
        .unwrap_or_else(|| PathBuf::from("."))
}

/// `<root>/logs/logseq-mcp-YYYYMMDD.log`, or the undated prefix for daily rotation
pub fn default_log_file(root: &Path, daily: bool) -> PathBuf {
    let logs = root.join("logs");
    if daily {
        logs.join("logseq-mcp.log")
    } else {
        logs.join(format!("logseq-mcp-{}.log", Local::now().format("%Y%m%d")))
    }
}

/// Root severity gate plus the configured sinks.
///
/// Built once and then only read; pass it around as `Arc<LogPipeline>`.
#[derive(Debug)]
pub struct LogPipeline {
    min_severity: Severity,
    mode: LoggingMode,
    sinks: Vec<Sink>,
}

impl LogPipeline {
    pub fn new(min_severity: Severity, mode: LoggingMode) -> Self {
        Self {
            min_severity,
            mode,
            sinks: Vec::new(),
        }
    }

    pub fn with_sink(mut self, sink: Sink) -> Self {
        self.sinks.push(sink);
        self
    }

    /// File sink, error console and optional debug console
    pub fn from_config(config: &ResolvedLoggingConfig) -> Result<Self, LoggingError> {
        if let Some(parent) = config.log_file.parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent).map_err(|source| LoggingError::CreateDirectory {
                    path: parent.to_path_buf(),
                    source,
                })?;
            }
        }

        let privacy: Arc<dyn RecordFilter> = Arc::new(PrivacyFilter::new(config.mode));
        let writer = config.rotation().open(&config.log_file)?;

        let file = Sink::from_boxed("file", Severity::Debug, Box::new(JsonFormatter), writer)
            .with_filter(Arc::clone(&privacy));

        let stderr = Sink::new("stderr", Severity::Trace, ConsoleFormatter, std::io::stderr())
            .with_filter(Arc::new(SeverityFilter::new(Severity::Error)))
            .with_filter(Arc::clone(&privacy));

        let mut pipeline = Self::new(config.level, config.mode)
            .with_sink(file)
            .with_sink(stderr);

        if config.debug || config.mode == LoggingMode::Debug {
            let mut stdout =
                Sink::new("stdout", Severity::Debug, ConsoleFormatter, std::io::stdout());
            if config.mode != LoggingMode::Debug {
                stdout = stdout.with_filter(privacy);
            }
            pipeline = pipeline.with_sink(stdout);
        }

        Ok(pipeline)
    }

    /// Error console only, for when the configured pipeline cannot be built
    pub fn stderr_only(min_severity: Severity) -> Self {
        let privacy: Arc<dyn RecordFilter> = Arc::new(PrivacyFilter::new(LoggingMode::Privacy));
        Self::new(min_severity, LoggingMode::Privacy).with_sink(
            Sink::new("stderr", Severity::Trace, ConsoleFormatter, std::io::stderr())
                .with_filter(Arc::new(SeverityFilter::new(Severity::Error)))
                .with_filter(privacy),
        )
    }

    pub fn mode(&self) -> LoggingMode {
        self.mode
    }

    pub fn min_severity(&self) -> Severity {
        self.min_severity
    }

    pub fn sinks(&self) -> &[Sink] {
        &self.sinks
    }

    pub fn enabled(&self, severity: Severity) -> bool {
        severity >= self.min_severity
    }

    /// Hand `record` to every sink; each sink gets its own copy
    pub fn dispatch(&self, record: LogRecord) {
        if !self.enabled(record.severity) {
            return;
        }
        if let Some((last, rest)) = self.sinks.split_last() {
            for sink in rest {
                sink.emit(record.clone());
            }
            last.emit(record);
        }
    }

    /// Summarize the resolved configuration through the pipeline itself
    pub fn log_startup(&self, config: &ResolvedLoggingConfig) {
        let record = LogRecord::new(
            Severity::Info,
            module_path!(),
            "Logging initialized",
            SourceLocation::new(file!(), Some("setup_logging".to_string()), Some(line!())),
        )
        .with_field("log_level", config.level.as_str())
        .with_field(
            "log_file",
            config.rotation().active_path(&config.log_file).display().to_string(),
        )
        .with_field("debug_mode", config.debug)
        .with_field("log_mode", config.mode.as_str())
        .with_field("max_file_size", config.max_file_size)
        .with_field(
            "retention_days",
            config.retention_days.map(Value::from).unwrap_or(Value::Null),
        );
        self.dispatch(record);
    }
}

/// Install `pipeline` as the global `tracing` subscriber.
///
/// A second call fails with [`LoggingError::AlreadyInitialized`].
pub fn install(pipeline: Arc<LogPipeline>) -> Result<(), LoggingError> {
    let directive = format!(
        "{},{}",
        pipeline.min_severity().as_tracing_level().to_string().to_lowercase(),
        DEPENDENCY_DIRECTIVES
    );

    tracing_subscriber::registry()
        .with(EnvFilter::new(directive))
        .with(PipelineLayer::new(pipeline))
        .try_init()
        .map_err(|e| LoggingError::AlreadyInitialized(e.to_string()))
}

/// Resolve `config`, build the sinks, install them globally and emit the
/// startup record
pub fn setup_logging(config: &LoggingConfig) -> Result<Arc<LogPipeline>, LoggingError> {
    let resolved = config.resolve();
    let pipeline = Arc::new(LogPipeline::from_config(&resolved)?);
    install(Arc::clone(&pipeline))?;
    pipeline.log_startup(&resolved);
    Ok(pipeline)
}

/// `tracing` layer converting events into [`LogRecord`]s.
///
/// `arguments` and `result` must be recorded with `%` so their JSON text is
/// parsed back into structure. Text that does not parse stays a string: an
/// `arguments` string is masked whole in privacy mode, and a string `result`
/// is passed through like any other non-mapping result.
pub struct PipelineLayer {
    pipeline: Arc<LogPipeline>,
}

impl PipelineLayer {
    pub fn new(pipeline: Arc<LogPipeline>) -> Self {
        Self { pipeline }
    }
}

impl<S> Layer<S> for PipelineLayer
where
    S: Subscriber + for<'a> LookupSpan<'a>,
{
    fn on_event(&self, event: &Event<'_>, ctx: Context<'_, S>) {
        let metadata = event.metadata();
        let severity = Severity::from(metadata.level());
        if !self.pipeline.enabled(severity) {
            return;
        }

        let mut visitor = RecordVisitor::default();
        event.record(&mut visitor);

        let function = ctx.event_span(event).map(|span| span.name().to_string());
        let location = SourceLocation::new(
            metadata.file().unwrap_or_else(|| metadata.target()),
            function,
            metadata.line(),
        );

        let mut record = LogRecord::new(
            severity,
            metadata.target(),
            visitor.message.unwrap_or_default(),
            location,
        );
        for (name, value) in visitor.fields {
            record = record.with_field(name, value);
        }
        self.pipeline.dispatch(record);
    }
}

/// Collects an event's message and fields
#[derive(Default)]
struct RecordVisitor {
    message: Option<String>,
    fields: Vec<(String, Value)>,
}

impl RecordVisitor {
    fn push_text(&mut self, field: &Field, text: String) {
        match field.name() {
            "message" => self.message = Some(text),
            // Payload fields are recorded as JSON text; keep their structure
            name @ (ARGUMENTS_FIELD | RESULT_FIELD) => {
                let value = serde_json::from_str(&text).unwrap_or(Value::String(text));
                self.fields.push((name.to_string(), value));
            }
            name => self.fields.push((name.to_string(), Value::String(text))),
        }
    }
}

impl Visit for RecordVisitor {
    fn record_debug(&mut self, field: &Field, value: &dyn fmt::Debug) {
        self.push_text(field, format!("{:?}", value));
    }

    fn record_str(&mut self, field: &Field, value: &str) {
        self.push_text(field, value.to_string());
    }

    fn record_i64(&mut self, field: &Field, value: i64) {
        self.fields.push((field.name().to_string(), Value::from(value)));
    }

    fn record_u64(&mut self, field: &Field, value: u64) {
        self.fields.push((field.name().to_string(), Value::from(value)));
    }

    fn record_f64(&mut self, field: &Field, value: f64) {
        self.fields.push((field.name().to_string(), Value::from(value)));
    }

    fn record_bool(&mut self, field: &Field, value: bool) {
        self.fields.push((field.name().to_string(), Value::from(value)));
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::logging::sink::BufferWriter;
    use serde_json::json;
    use std::collections::HashMap;
    use tempfile::TempDir;

    fn env_from(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key| map.get(key).cloned()
    }

    #[test]
    fn test_defaults() {
        let config = LoggingConfig {
            project_root: Some(PathBuf::from("/tmp/root")),
            ..Default::default()
        }
        .resolve_with(env_from(&[]));

        assert_eq!(config.level, Severity::Info);
        assert_eq!(config.mode, LoggingMode::Privacy);
        assert_eq!(config.max_file_size, DEFAULT_MAX_FILE_SIZE);
        assert_eq!(config.backup_count, DEFAULT_BACKUP_COUNT);
        assert_eq!(config.retention_days, None);
        assert!(!config.debug);
        assert!(config.log_file.starts_with("/tmp/root/logs"));
        let name = config.log_file.file_name().unwrap().to_string_lossy().into_owned();
        assert!(name.starts_with("logseq-mcp-") && name.ends_with(".log"));
    }

    #[test]
    fn test_explicit_beats_env() {
        let env = env_from(&[
            (ENV_LOG_LEVEL, "ERROR"),
            (ENV_LOG_MODE, "minimal"),
            (ENV_LOG_FILE, "/var/log/env.log"),
        ]);
        let config = LoggingConfig {
            level: Some("DEBUG".to_string()),
            log_file: Some(PathBuf::from("/tmp/explicit.log")),
            ..Default::default()
        }
        .resolve_with(env);

        assert_eq!(config.level, Severity::Debug);
        assert_eq!(config.mode, LoggingMode::Minimal);
        assert_eq!(config.log_file, PathBuf::from("/tmp/explicit.log"));
    }

    #[test]
    fn test_bad_values_fall_back() {
        let env = env_from(&[
            (ENV_LOG_MODE, "verbose"),
            (ENV_LOG_MAX_SIZE, "huge"),
            (ENV_LOG_RETENTION_DAYS, "a week"),
            (ENV_LOG_LEVEL, "LOUD"),
        ]);
        let config = LoggingConfig::default().resolve_with(env);

        assert_eq!(config.mode, LoggingMode::Privacy);
        assert_eq!(config.max_file_size, DEFAULT_MAX_FILE_SIZE);
        assert_eq!(config.retention_days, None);
        assert_eq!(config.level, Severity::Info);
    }

    #[test]
    fn test_retention_switches_to_daily() {
        let env = env_from(&[
            (ENV_LOG_RETENTION_DAYS, "14"),
            (ENV_PROJECT_ROOT, "/srv/notes"),
            (ENV_DEBUG, "TRUE"),
            (ENV_LOG_MAX_SIZE, "5MB"),
        ]);
        let config = LoggingConfig::default().resolve_with(env);

        assert_eq!(config.retention_days, Some(14));
        assert_eq!(config.rotation(), RotationPolicy::Daily { retention_days: 14 });
        assert_eq!(config.log_file, PathBuf::from("/srv/notes/logs/logseq-mcp.log"));
        assert_eq!(config.max_file_size, 5 * 1024 * 1024);
        assert!(config.debug);
    }

    #[test]
    fn test_each_sink_sees_its_own_copy() {
        let sanitized = BufferWriter::new();
        let raw = BufferWriter::new();
        let pipeline = LogPipeline::new(Severity::Debug, LoggingMode::Privacy)
            .with_sink(
                Sink::new("sanitized", Severity::Debug, JsonFormatter, sanitized.clone())
                    .with_filter(Arc::new(PrivacyFilter::new(LoggingMode::Privacy))),
            )
            .with_sink(Sink::new("raw", Severity::Debug, JsonFormatter, raw.clone()));

        let arguments = Arc::new(json!({"page_name": "My Secret Plan"}));
        pipeline.dispatch(
            LogRecord::new(
                Severity::Info,
                "test",
                "Getting page: My Secret Plan",
                SourceLocation::new("pipeline.rs", None, None),
            )
            .with_shared_field(ARGUMENTS_FIELD, Arc::clone(&arguments)),
        );

        let sanitized: Value = serde_json::from_str(&sanitized.lines()[0]).unwrap();
        let raw: Value = serde_json::from_str(&raw.lines()[0]).unwrap();
        assert_eq!(sanitized["message"], "Getting page: My ***lan");
        assert_eq!(sanitized["arguments"]["page_name"], "My ***lan");
        assert_eq!(raw["message"], "Getting page: My Secret Plan");
        assert_eq!(raw["arguments"]["page_name"], "My Secret Plan");
        assert_eq!(arguments["page_name"], "My Secret Plan");
    }

    #[test]
    fn test_root_gate() {
        let buffer = BufferWriter::new();
        let pipeline = LogPipeline::new(Severity::Warning, LoggingMode::Debug)
            .with_sink(Sink::new("all", Severity::Trace, ConsoleFormatter, buffer.clone()));

        for severity in [Severity::Debug, Severity::Info, Severity::Warning, Severity::Error] {
            pipeline.dispatch(LogRecord::new(
                severity,
                "test",
                "m",
                SourceLocation::new("pipeline.rs", None, None),
            ));
        }
        assert_eq!(buffer.lines().len(), 2);
    }

    #[test]
    fn test_from_config_topology() {
        let temp = TempDir::new().unwrap();
        let base = ResolvedLoggingConfig {
            level: Severity::Debug,
            log_file: temp.path().join("nested/dir/app.log"),
            mode: LoggingMode::Privacy,
            max_file_size: DEFAULT_MAX_FILE_SIZE,
            backup_count: DEFAULT_BACKUP_COUNT,
            retention_days: None,
            debug: false,
        };

        let pipeline = LogPipeline::from_config(&base).unwrap();
        let names: Vec<&str> = pipeline.sinks().iter().map(Sink::name).collect();
        assert_eq!(names, vec!["file", "stderr"]);
        assert!(temp.path().join("nested/dir/app.log").exists());

        let debug = ResolvedLoggingConfig {
            mode: LoggingMode::Debug,
            ..base.clone()
        };
        let names: Vec<String> = LogPipeline::from_config(&debug)
            .unwrap()
            .sinks()
            .iter()
            .map(|sink| sink.name().to_string())
            .collect();
        assert_eq!(names, vec!["file", "stderr", "stdout"]);
    }

    #[test]
    fn test_startup_record_in_file() {
        let temp = TempDir::new().unwrap();
        let config = LoggingConfig {
            log_file: Some(temp.path().join("app.log")),
            level: Some("DEBUG".to_string()),
            ..Default::default()
        }
        .resolve_with(env_from(&[]));

        let pipeline = LogPipeline::from_config(&config).unwrap();
        pipeline.log_startup(&config);

        let contents = std::fs::read_to_string(temp.path().join("app.log")).unwrap();
        let entry: Value = serde_json::from_str(contents.lines().next().unwrap()).unwrap();
        assert_eq!(entry["message"], "Logging initialized");
        assert_eq!(entry["log_level"], "DEBUG");
        assert_eq!(entry["log_mode"], "privacy");
        assert_eq!(entry["debug_mode"], false);
        assert_eq!(entry["max_file_size"], DEFAULT_MAX_FILE_SIZE);
        assert!(entry.get("retention_days").is_none());
    }
}
