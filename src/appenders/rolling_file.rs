//! Rolling file appender
//!
//! A triggering strategy decides when the active file rolls over; the
//! fixed-window policy renames `app.log` to `app.log.1`, shifts older files
//! up to `app.log.N` and optionally gzips the freshly rolled file.

use super::file::open_log_file;
use crate::core::{Appender, LifeCycle, LoggerError, LoggingEvent, Result, Status, StatusManager};
use crate::layout::{Layout, PatternLayout};
use chrono::{DateTime, Local, Timelike};
use serde::{Deserialize, Serialize};
use std::fs::{self, File};
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};
use std::time::{Duration, SystemTime};

/// When to roll the active file over
///
/// # Examples
///
/// ```
/// use hierlog::appenders::TriggeringStrategy;
/// use std::time::Duration;
///
/// // Roll when the file exceeds 100 MB
/// let size = TriggeringStrategy::size(100 * 1024 * 1024);
///
/// // Roll on size OR time, whichever comes first
/// let hybrid = TriggeringStrategy::hybrid(50 * 1024 * 1024, Duration::from_secs(24 * 3600));
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum TriggeringStrategy {
    /// Roll when the file reaches `max_bytes`
    Size { max_bytes: u64 },

    /// Roll once `interval` has passed since the last rollover
    Time {
        #[serde(with = "duration_secs")]
        interval: Duration,
    },

    /// Roll on the first write of a new day at or after `hour` (0-23)
    Daily { hour: u8 },

    Hourly,

    /// Size OR time, whichever comes first
    Hybrid {
        max_bytes: u64,
        #[serde(with = "duration_secs")]
        interval: Duration,
    },

    /// Never roll; rotation is left to an external tool
    Never,
}

mod duration_secs {
    use serde::{Deserialize, Deserializer, Serializer};
    use std::time::Duration;

    pub fn serialize<S: Serializer>(duration: &Duration, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_u64(duration.as_secs())
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Duration, D::Error> {
        u64::deserialize(deserializer).map(Duration::from_secs)
    }
}

impl Default for TriggeringStrategy {
    fn default() -> Self {
        TriggeringStrategy::Size {
            max_bytes: 10 * 1024 * 1024, // 10 MB
        }
    }
}

impl TriggeringStrategy {
    #[must_use]
    pub fn size(max_bytes: u64) -> Self {
        TriggeringStrategy::Size { max_bytes }
    }

    #[must_use]
    pub fn time(interval: Duration) -> Self {
        TriggeringStrategy::Time { interval }
    }

    /// Hours above 23 are rejected when the appender starts
    #[must_use]
    pub fn daily(hour: u8) -> Self {
        TriggeringStrategy::Daily { hour }
    }

    #[must_use]
    pub fn hourly() -> Self {
        TriggeringStrategy::Hourly
    }

    #[must_use]
    pub fn hybrid(max_bytes: u64, interval: Duration) -> Self {
        TriggeringStrategy::Hybrid { max_bytes, interval }
    }

    #[must_use]
    pub fn never() -> Self {
        TriggeringStrategy::Never
    }

    fn validate(&self) -> Result<()> {
        match self {
            TriggeringStrategy::Daily { hour } if *hour > 23 => Err(LoggerError::config(
                "RollingFileAppender",
                format!("hour must be between 0 and 23, got {}", hour),
            )),
            TriggeringStrategy::Time { interval } | TriggeringStrategy::Hybrid { interval, .. }
                if interval.is_zero() =>
            {
                Err(LoggerError::config("RollingFileAppender", "interval must be positive"))
            }
            _ => Ok(()),
        }
    }

    fn is_triggered(&self, current_size: u64, last_rollover: SystemTime) -> bool {
        let elapsed = || {
            SystemTime::now()
                .duration_since(last_rollover)
                .unwrap_or(Duration::ZERO)
        };
        match self {
            TriggeringStrategy::Never => false,
            TriggeringStrategy::Size { max_bytes } => current_size >= *max_bytes,
            TriggeringStrategy::Time { interval } => elapsed() >= *interval,
            TriggeringStrategy::Daily { hour } => {
                let now: DateTime<Local> = SystemTime::now().into();
                let last: DateTime<Local> = last_rollover.into();
                now.date_naive() != last.date_naive() && now.hour() >= u32::from(*hour)
            }
            TriggeringStrategy::Hourly => elapsed() >= Duration::from_secs(3600),
            TriggeringStrategy::Hybrid { max_bytes, interval } => {
                current_size >= *max_bytes || elapsed() >= *interval
            }
        }
    }
}

/// Fixed window of rolled files `app.log.1` (newest) to `app.log.N`
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FixedWindowPolicy {
    pub max_index: usize,
    #[serde(default)]
    pub compress: bool,
}

impl Default for FixedWindowPolicy {
    fn default() -> Self {
        Self {
            max_index: 5,
            compress: false,
        }
    }
}

/// Rolling file appender
///
/// # Examples
///
/// ```no_run
/// use hierlog::appenders::{RollingFileAppender, TriggeringStrategy};
/// use std::time::Duration;
///
/// let appender = RollingFileAppender::new("/var/log/app.log")
///     .with_strategy(TriggeringStrategy::daily(0))
///     .with_max_index(7)
///     .with_compression(true);
/// ```
pub struct RollingFileAppender {
    base_path: PathBuf,
    strategy: TriggeringStrategy,
    window: FixedWindowPolicy,
    layout: Box<dyn Layout>,
    writer: Option<BufWriter<File>>,
    current_size: u64,
    last_rollover: SystemTime,
    immediate_flush: bool,
    status: StatusManager,
}

impl RollingFileAppender {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            base_path: path.into(),
            strategy: TriggeringStrategy::default(),
            window: FixedWindowPolicy::default(),
            layout: Box::new(PatternLayout::default()),
            writer: None,
            current_size: 0,
            last_rollover: SystemTime::now(),
            immediate_flush: true,
            status: StatusManager::new(),
        }
    }

    #[must_use]
    pub fn with_strategy(mut self, strategy: TriggeringStrategy) -> Self {
        self.strategy = strategy;
        self
    }

    /// Number of rolled files kept
    #[must_use]
    pub fn with_max_index(mut self, max_index: usize) -> Self {
        self.window.max_index = max_index;
        self
    }

    /// Gzip each file as it is rolled
    #[must_use]
    pub fn with_compression(mut self, compress: bool) -> Self {
        self.window.compress = compress;
        self
    }

    #[must_use]
    pub fn with_window(mut self, window: FixedWindowPolicy) -> Self {
        self.window = window;
        self
    }

    #[must_use]
    pub fn with_immediate_flush(mut self, immediate_flush: bool) -> Self {
        self.immediate_flush = immediate_flush;
        self
    }

    #[must_use]
    pub fn with_layout(mut self, layout: impl Layout + 'static) -> Self {
        self.layout = Box::new(layout);
        self
    }

    #[must_use]
    pub fn with_pattern(self, pattern: &str) -> Self {
        self.with_layout(PatternLayout::new(pattern))
    }

    #[must_use]
    pub fn current_size(&self) -> u64 {
        self.current_size
    }

    #[must_use]
    pub fn path(&self) -> &Path {
        &self.base_path
    }

    #[must_use]
    pub fn strategy(&self) -> &TriggeringStrategy {
        &self.strategy
    }

    #[must_use]
    pub fn last_rollover(&self) -> SystemTime {
        self.last_rollover
    }

    fn origin(&self) -> String {
        format!("RollingFileAppender[{}]", self.base_path.display())
    }

    /// Path of the rolled file at `index`
    pub fn rolled_path(&self, index: usize, compressed: bool) -> PathBuf {
        let filename = self
            .base_path
            .file_name()
            .and_then(|n| n.to_str())
            .unwrap_or("app.log");
        let suffix = if compressed { ".gz" } else { "" };
        self.base_path.with_file_name(format!("{}.{}{}", filename, index, suffix))
    }

    fn open_active(&mut self) -> Result<()> {
        let file = open_log_file(&self.base_path, true)?;
        let metadata = file.metadata().map_err(|e| {
            LoggerError::file_appender(
                self.base_path.display().to_string(),
                format!("Cannot access file metadata: {}", e),
            )
        })?;
        self.current_size = metadata.len();
        self.writer = Some(BufWriter::new(file));
        Ok(())
    }

    /// Roll the active file over and reopen an empty one
    pub fn rollover(&mut self) -> Result<()> {
        if let Some(mut writer) = self.writer.take() {
            writer.flush().map_err(|e| {
                LoggerError::file_rotation(
                    self.base_path.display().to_string(),
                    format!("Failed to flush before rollover: {}", e),
                )
            })?;
        }

        if self.window.max_index == 0 {
            remove_if_exists(&self.base_path)?;
        } else {
            remove_if_exists(&self.rolled_path(self.window.max_index, false))?;
            remove_if_exists(&self.rolled_path(self.window.max_index, true))?;

            for i in (1..self.window.max_index).rev() {
                for compressed in [false, true] {
                    let from = self.rolled_path(i, compressed);
                    if from.exists() {
                        rename(&from, &self.rolled_path(i + 1, compressed))?;
                    }
                }
            }

            if self.base_path.exists() {
                let first = self.rolled_path(1, false);
                rename(&self.base_path, &first)?;
                if self.window.compress {
                    compress_file(&first, &self.rolled_path(1, true))?;
                }
            }
        }

        self.open_active()?;
        self.current_size = 0;
        self.last_rollover = SystemTime::now();
        Ok(())
    }

    /// Roll over if the strategy says so; a failure is reported and the
    /// appender keeps writing to the current file
    fn rollover_if_triggered(&mut self) -> Result<()> {
        if !self.strategy.is_triggered(self.current_size, self.last_rollover) {
            return Ok(());
        }
        let Err(e) = self.rollover() else {
            return Ok(());
        };

        self.status.add(
            Status::warn("Rollover failed. Continuing with current file.", self.origin()).with_cause(&e),
        );
        if self.writer.is_none() {
            self.open_active()?;
        }
        // avoid retrying on every event; the file may outgrow its limit
        self.current_size = 0;
        self.last_rollover = SystemTime::now();
        Ok(())
    }
}

fn remove_if_exists(path: &Path) -> Result<()> {
    match fs::remove_file(path) {
        Ok(()) => Ok(()),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
        Err(e) => Err(LoggerError::file_rotation(
            path.display().to_string(),
            format!("Failed to remove: {}", e),
        )),
    }
}

fn rename(from: &Path, to: &Path) -> Result<()> {
    fs::rename(from, to).map_err(|e| {
        LoggerError::file_rotation(
            from.display().to_string(),
            format!("Failed to rename to '{}': {}", to.display(), e),
        )
    })
}

/// Gzip `path` into `gz_path`, removing the original only on success
fn compress_file(path: &Path, gz_path: &Path) -> Result<()> {
    use flate2::write::GzEncoder;
    use flate2::Compression;
    use std::io::BufReader;

    let temp_path = gz_path.with_extension("gz.tmp");
    let compress = || -> std::io::Result<()> {
        let mut reader = BufReader::with_capacity(64 * 1024, File::open(path)?);
        let output = BufWriter::with_capacity(64 * 1024, File::create(&temp_path)?);
        let mut encoder = GzEncoder::new(output, Compression::default());
        std::io::copy(&mut reader, &mut encoder)?;
        encoder.finish()?.flush()?;
        fs::rename(&temp_path, gz_path)
    };

    if let Err(e) = compress() {
        let _ = fs::remove_file(&temp_path);
        return Err(LoggerError::io_operation(
            "compress log file",
            format!("Failed to compress {}", path.display()),
            e,
        ));
    }
    remove_if_exists(path)
}

impl LifeCycle for RollingFileAppender {
    fn start(&mut self) -> Result<()> {
        self.strategy.validate()?;
        self.layout.start()?;
        self.open_active()?;
        self.last_rollover = fs::metadata(&self.base_path)
            .and_then(|m| m.modified())
            .unwrap_or_else(|_| SystemTime::now());
        Ok(())
    }

    fn stop(&mut self) {
        if let Some(mut writer) = self.writer.take() {
            let _ = writer.flush();
        }
        self.layout.stop();
    }

    fn is_started(&self) -> bool {
        self.writer.is_some()
    }
}

impl Appender for RollingFileAppender {
    fn append(&mut self, event: &LoggingEvent) -> Result<()> {
        self.rollover_if_triggered()?;

        let text = self.layout.do_layout(event)?;
        let writer = self
            .writer
            .as_mut()
            .ok_or_else(|| LoggerError::writer("Writer not initialized"))?;
        writer.write_all(text.as_bytes()).map_err(|e| {
            LoggerError::file_appender(
                self.base_path.display().to_string(),
                format!("Failed to write log entry: {}", e),
            )
        })?;
        if self.immediate_flush {
            writer.flush()?;
        }
        self.current_size += text.len() as u64;
        Ok(())
    }

    fn flush(&mut self) -> Result<()> {
        if let Some(ref mut writer) = self.writer {
            writer.flush().map_err(|e| {
                LoggerError::file_appender(
                    self.base_path.display().to_string(),
                    format!("Failed to flush: {}", e),
                )
            })?;
        }
        Ok(())
    }

    fn kind(&self) -> &'static str {
        "rolling_file"
    }

    fn attach_status(&mut self, status: &StatusManager) {
        self.status = status.clone();
    }
}

impl Drop for RollingFileAppender {
    fn drop(&mut self) {
        if let Some(mut writer) = self.writer.take() {
            let _ = writer.flush();
        }
    }
}
