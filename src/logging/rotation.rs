//! Log file rotation
//!
//! Size-based rotation keeps numbered backups next to the active file
//! (`app.log.1` is the newest). Daily rotation is delegated to
//! `tracing-appender`, which writes date-suffixed files and prunes the
//! oldest once the retention count is exceeded.

use super::LoggingError;
use chrono::Utc;
use std::fs::{self, File, OpenOptions};
use std::io::{self, Write};
use std::path::{Path, PathBuf};
use tracing_appender::rolling::{RollingFileAppender, Rotation};

/// Default maximum file size before rotating (10 MiB)
pub const DEFAULT_MAX_FILE_SIZE: u64 = 10 * 1024 * 1024;

/// Default number of numbered backups
pub const DEFAULT_BACKUP_COUNT: usize = 5;

/// How the structured log file is rotated
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RotationPolicy {
    /// Roll over once the file would exceed `max_bytes`
    Size { max_bytes: u64, backup_count: usize },
    /// Roll over at midnight, one file per day
    Daily { retention_days: usize },
}

impl RotationPolicy {
    /// Daily rotation when a non-zero retention is configured, size-based otherwise
    pub fn from_settings(max_bytes: u64, backup_count: usize, retention_days: Option<u32>) -> Self {
        match retention_days {
            Some(days) if days > 0 => RotationPolicy::Daily {
                retention_days: days as usize,
            },
            _ => RotationPolicy::Size {
                max_bytes,
                backup_count,
            },
        }
    }

    /// The file records are currently written to. Daily rotation never
    /// writes `path` itself, only its date-suffixed siblings.
    pub fn active_path(&self, path: &Path) -> PathBuf {
        match self {
            RotationPolicy::Size { .. } => path.to_path_buf(),
            RotationPolicy::Daily { .. } => {
                let mut name = path.as_os_str().to_owned();
                name.push(format!(".{}", Utc::now().format("%Y-%m-%d")));
                PathBuf::from(name)
            }
        }
    }

    /// Open a writer for `path` that applies this policy on every write
    pub fn open(&self, path: &Path) -> Result<Box<dyn Write + Send>, LoggingError> {
        match *self {
            RotationPolicy::Size {
                max_bytes,
                backup_count,
            } => Ok(Box::new(SizeRotatingWriter::open(
                path,
                max_bytes,
                backup_count,
            )?)),
            RotationPolicy::Daily { retention_days } => {
                let directory = path.parent().unwrap_or_else(|| Path::new("."));
                let prefix = path
                    .file_name()
                    .map(|name| name.to_string_lossy().into_owned())
                    .unwrap_or_else(|| "logseq-mcp.log".to_string());

                let appender = RollingFileAppender::builder()
                    .rotation(Rotation::DAILY)
                    .filename_prefix(prefix)
                    .max_log_files(retained_daily_files(retention_days))
                    .build(directory)
                    .map_err(|e| LoggingError::Rotation(e.to_string()))?;
                Ok(Box::new(appender))
            }
        }
    }
}

/// `tracing-appender` counts the active file against its limit, so keep one
/// more than the number of past days retained
fn retained_daily_files(retention_days: usize) -> usize {
    retention_days + 1
}

/// File writer that rolls over before a write would push it past `max_bytes`
pub struct SizeRotatingWriter {
    path: PathBuf,
    file: File,
    size: u64,
    max_bytes: u64,
    backup_count: usize,
}

impl SizeRotatingWriter {
    pub fn open(path: &Path, max_bytes: u64, backup_count: usize) -> io::Result<Self> {
        let file = OpenOptions::new().create(true).append(true).open(path)?;
        let size = file.metadata()?.len();

        Ok(Self {
            path: path.to_path_buf(),
            file,
            size,
            max_bytes,
            backup_count,
        })
    }

    fn backup_path(&self, index: usize) -> PathBuf {
        let mut name = self.path.as_os_str().to_owned();
        name.push(format!(".{}", index));
        PathBuf::from(name)
    }

    fn should_roll_over(&self, incoming: usize) -> bool {
        self.max_bytes > 0
            && self.backup_count > 0
            && self.size > 0
            && self.size + incoming as u64 > self.max_bytes
    }

    fn roll_over(&mut self) -> io::Result<()> {
        self.file.flush()?;

        let oldest = self.backup_path(self.backup_count);
        if oldest.exists() {
            fs::remove_file(&oldest)?;
        }
        for index in (1..self.backup_count).rev() {
            let source = self.backup_path(index);
            if source.exists() {
                fs::rename(&source, self.backup_path(index + 1))?;
            }
        }
        fs::rename(&self.path, self.backup_path(1))?;

        self.file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.path)?;
        self.size = 0;
        Ok(())
    }
}

impl Write for SizeRotatingWriter {
    /// Writes the whole buffer to one file; a record never straddles a rollover
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        if self.should_roll_over(buf.len()) {
            self.roll_over()?;
        }
        self.file.write_all(buf)?;
        self.size += buf.len() as u64;
        Ok(buf.len())
    }

    fn flush(&mut self) -> io::Result<()> {
        self.file.flush()
    }
}

/// Parse a size such as `10MB`, `512kb` or `1048576` (binary multipliers)
pub fn parse_size(value: &str) -> Option<u64> {
    let value = value.trim().to_uppercase();

    let (number, multiplier) = if let Some(number) = value.strip_suffix("GB") {
        (number, 1024 * 1024 * 1024)
    } else if let Some(number) = value.strip_suffix("MB") {
        (number, 1024 * 1024)
    } else if let Some(number) = value.strip_suffix("KB") {
        (number, 1024)
    } else {
        (value.as_str(), 1)
    };

    number
        .trim()
        .parse::<u64>()
        .ok()
        .and_then(|n| n.checked_mul(multiplier))
}
