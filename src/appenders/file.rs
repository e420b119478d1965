//! File appender implementation

use crate::core::{Appender, LifeCycle, LoggerError, LoggingEvent, Result};
use crate::layout::{Layout, PatternLayout};
use std::fs::{self, File, OpenOptions};
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};

/// Writes rendered events to one file
///
/// The file is opened by `start`, appending by default.
///
/// # Example
///
/// ```no_run
/// use hierlog::appenders::FileAppender;
/// use hierlog::LoggerContext;
///
/// let context = LoggerContext::new();
/// let file = FileAppender::new("/var/log/app.log")
///     .with_pattern("%d %-5level %logger - %msg%n")
///     .with_immediate_flush(false);
/// let appender = context.build_appender("FILE", file);
/// context.root_logger().add_appender(appender);
/// ```
pub struct FileAppender {
    path: PathBuf,
    append: bool,
    immediate_flush: bool,
    layout: Box<dyn Layout>,
    writer: Option<BufWriter<File>>,
}

impl FileAppender {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            append: true,
            immediate_flush: true,
            layout: Box::new(PatternLayout::default()),
            writer: None,
        }
    }

    /// Truncate the file on start when false
    #[must_use]
    pub fn with_append(mut self, append: bool) -> Self {
        self.append = append;
        self
    }

    /// Flush after every event when true (default)
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

    pub fn path(&self) -> &Path {
        &self.path
    }
}

pub(crate) fn open_log_file(path: &Path, append: bool) -> Result<File> {
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        fs::create_dir_all(parent).map_err(|e| {
            LoggerError::io_operation(
                "create log directory",
                format!("Failed to create directory '{}'", parent.display()),
                e,
            )
        })?;
    }
    OpenOptions::new()
        .create(true)
        .append(append)
        .write(true)
        .truncate(!append)
        .open(path)
        .map_err(|e| LoggerError::file_appender(path.display().to_string(), format!("Failed to open: {}", e)))
}

impl LifeCycle for FileAppender {
    fn start(&mut self) -> Result<()> {
        self.layout.start()?;
        let file = open_log_file(&self.path, self.append)?;
        self.writer = Some(BufWriter::new(file));
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

impl Appender for FileAppender {
    fn append(&mut self, event: &LoggingEvent) -> Result<()> {
        let text = self.layout.do_layout(event)?;
        let writer = self
            .writer
            .as_mut()
            .ok_or_else(|| LoggerError::writer("File writer not initialized"))?;

        writer.write_all(text.as_bytes()).map_err(|e| {
            LoggerError::file_appender(self.path.display().to_string(), format!("Failed to write: {}", e))
        })?;
        if self.immediate_flush {
            writer.flush()?;
        }
        Ok(())
    }

    fn flush(&mut self) -> Result<()> {
        if let Some(ref mut writer) = self.writer {
            writer.flush()?;
        }
        Ok(())
    }

    fn kind(&self) -> &'static str {
        "file"
    }
}

impl Drop for FileAppender {
    fn drop(&mut self) {
        // Ensure all buffered data is flushed to disk
        let _ = self.flush();
    }
}
