//! Output sinks: filter chain, formatter and a serialized writer

use super::filter::RecordFilter;
use super::format::Formatter;
use super::mode::Severity;
use super::record::LogRecord;
use std::io::{self, Write};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};

/// One log destination.
///
/// Each sink works on its own copy of a record, so a filter rewriting a
/// field for one sink never affects what another sink sees.
pub struct Sink {
    name: String,
    min_severity: Severity,
    filters: Vec<Arc<dyn RecordFilter>>,
    formatter: Box<dyn Formatter>,
    writer: Mutex<Box<dyn Write + Send>>,
    failed: AtomicBool,
}

impl Sink {
    pub fn new(
        name: impl Into<String>,
        min_severity: Severity,
        formatter: impl Formatter + 'static,
        writer: impl Write + Send + 'static,
    ) -> Self {
        Self::from_boxed(name, min_severity, Box::new(formatter), Box::new(writer))
    }

    pub fn from_boxed(
        name: impl Into<String>,
        min_severity: Severity,
        formatter: Box<dyn Formatter>,
        writer: Box<dyn Write + Send>,
    ) -> Self {
        Self {
            name: name.into(),
            min_severity,
            filters: Vec::new(),
            formatter,
            writer: Mutex::new(writer),
            failed: AtomicBool::new(false),
        }
    }

    /// Append a filter; filters run in the order they were added
    pub fn with_filter(mut self, filter: Arc<dyn RecordFilter>) -> Self {
        self.filters.push(filter);
        self
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn min_severity(&self) -> Severity {
        self.min_severity
    }

    /// Run the filter chain on `record` and write it if it survives.
    ///
    /// Returns whether a line was written. Write failures are dropped.
    pub fn emit(&self, mut record: LogRecord) -> bool {
        if record.severity < self.min_severity {
            return false;
        }
        for filter in &self.filters {
            if !filter.filter(&mut record) {
                return false;
            }
        }

        let mut line = self.formatter.format(&record);
        line.push('\n');

        let mut writer = match self.writer.lock() {
            Ok(writer) => writer,
            Err(poisoned) => poisoned.into_inner(),
        };
        match writer.write_all(line.as_bytes()).and_then(|_| writer.flush()) {
            Ok(()) => true,
            Err(e) => {
                self.report_failure(&e);
                false
            }
        }
    }

    fn report_failure(&self, error: &io::Error) {
        if !self.failed.swap(true, Ordering::Relaxed) {
            eprintln!("logseq-mcp: log sink '{}' failed to write: {}", self.name, error);
        }
    }
}

impl std::fmt::Debug for Sink {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Sink")
            .field("name", &self.name)
            .field("min_severity", &self.min_severity)
            .field("filters", &self.filters.len())
            .finish()
    }
}

/// Shared in-memory writer, for capturing sink output
#[derive(Debug, Clone, Default)]
pub struct BufferWriter {
    buffer: Arc<Mutex<Vec<u8>>>,
}

impl BufferWriter {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn contents(&self) -> String {
        let buffer = match self.buffer.lock() {
            Ok(buffer) => buffer,
            Err(poisoned) => poisoned.into_inner(),
        };
        String::from_utf8_lossy(&buffer).into_owned()
    }

    pub fn lines(&self) -> Vec<String> {
        self.contents().lines().map(str::to_string).collect()
    }
}

impl Write for BufferWriter {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        let mut buffer = match self.buffer.lock() {
            Ok(buffer) => buffer,
            Err(poisoned) => poisoned.into_inner(),
        };
        buffer.extend_from_slice(buf);
        Ok(buf.len())
    }

    fn flush(&mut self) -> io::Result<()> {
        Ok(())
    }
}
