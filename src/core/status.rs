//! Internal diagnostic channel
//!
//! Framework components report their own health here instead of writing to
//! the application's log stream. Records are kept in a bounded list: the
//! first [`MAX_HEADER_COUNT`] records are retained forever, later ones go to
//! a rolling tail of [`TAIL_SIZE`] records.

use chrono::{DateTime, Utc};
use parking_lot::{Mutex, RwLock};
use std::collections::VecDeque;
use std::fmt;
use std::sync::atomic::{AtomicU8, AtomicUsize, Ordering};
use std::sync::Arc;

pub const MAX_HEADER_COUNT: usize = 150;
pub const TAIL_SIZE: usize = 150;

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum StatusLevel {
    Info = 0,
    Warn = 1,
    Error = 2,
}

impl StatusLevel {
    fn from_u8(value: u8) -> Self {
        match value {
            0 => StatusLevel::Info,
            1 => StatusLevel::Warn,
            _ => StatusLevel::Error,
        }
    }

    pub fn to_str(&self) -> &'static str {
        match self {
            StatusLevel::Info => "INFO",
            StatusLevel::Warn => "WARN",
            StatusLevel::Error => "ERROR",
        }
    }
}

impl fmt::Display for StatusLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.to_str())
    }
}

/// One diagnostic record
#[derive(Debug, Clone)]
pub struct Status {
    pub level: StatusLevel,
    pub message: String,
    /// Description of the component that raised the record
    pub origin: String,
    pub cause: Option<String>,
    pub timestamp: DateTime<Utc>,
    children: Vec<Status>,
}

impl Status {
    pub fn new(level: StatusLevel, message: impl Into<String>, origin: impl Into<String>) -> Self {
        Self {
            level,
            message: message.into(),
            origin: origin.into(),
            cause: None,
            timestamp: Utc::now(),
            children: Vec::new(),
        }
    }

    pub fn info(message: impl Into<String>, origin: impl Into<String>) -> Self {
        Self::new(StatusLevel::Info, message, origin)
    }

    pub fn warn(message: impl Into<String>, origin: impl Into<String>) -> Self {
        Self::new(StatusLevel::Warn, message, origin)
    }

    pub fn error(message: impl Into<String>, origin: impl Into<String>) -> Self {
        Self::new(StatusLevel::Error, message, origin)
    }

    /// Attach the error that caused this record, rendered with its source chain
    #[must_use]
    pub fn with_cause(mut self, cause: &dyn std::error::Error) -> Self {
        let mut text = cause.to_string();
        let mut source = cause.source();
        while let Some(inner) = source {
            text.push_str(": ");
            text.push_str(&inner.to_string());
            source = inner.source();
        }
        self.cause = Some(text);
        self
    }

    pub fn add_child(&mut self, child: Status) {
        self.children.push(child);
    }

    pub fn remove_child(&mut self, message: &str) -> bool {
        let before = self.children.len();
        self.children.retain(|c| c.message != message);
        before != self.children.len()
    }

    pub fn has_children(&self) -> bool {
        !self.children.is_empty()
    }

    pub fn children(&self) -> &[Status] {
        &self.children
    }

    /// Highest level found in this record and all of its descendants
    pub fn effective_level(&self) -> StatusLevel {
        self.children
            .iter()
            .map(Status::effective_level)
            .fold(self.level, std::cmp::max)
    }
}

impl fmt::Display for Status {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} in {} - {}", self.level, self.origin, self.message)?;
        if let Some(ref cause) = self.cause {
            write!(f, " ({})", cause)?;
        }
        Ok(())
    }
}

/// Receives every record as it is added
pub trait StatusListener: Send + Sync {
    fn on_status(&self, status: &Status);
}

/// Prints records to stderr
#[derive(Debug, Default, Clone, Copy)]
pub struct ConsoleStatusListener {
    min_level: Option<StatusLevel>,
}

impl ConsoleStatusListener {
    pub fn new() -> Self {
        Self::default()
    }

    /// Only print records at or above `level`
    #[must_use]
    pub fn with_min_level(mut self, level: StatusLevel) -> Self {
        self.min_level = Some(level);
        self
    }
}

impl StatusListener for ConsoleStatusListener {
    fn on_status(&self, status: &Status) {
        if self.min_level.is_some_and(|min| status.level < min) {
            return;
        }
        eprintln!("[LOGGER {}] {}", status.level, status);
    }
}

#[derive(Default)]
struct StatusStore {
    header: Vec<Status>,
    tail: VecDeque<Status>,
}

struct StatusInner {
    store: Mutex<StatusStore>,
    listeners: RwLock<Vec<Arc<dyn StatusListener>>>,
    count: AtomicUsize,
    level: AtomicU8,
}

/// Cheap-clone handle to a context's status list
#[derive(Clone)]
pub struct StatusManager {
    inner: Arc<StatusInner>,
}

impl StatusManager {
    pub fn new() -> Self {
        Self {
            inner: Arc::new(StatusInner {
                store: Mutex::new(StatusStore::default()),
                listeners: RwLock::new(Vec::new()),
                count: AtomicUsize::new(0),
                level: AtomicU8::new(StatusLevel::Info as u8),
            }),
        }
    }

    pub fn add(&self, status: Status) {
        self.inner.count.fetch_add(1, Ordering::Relaxed);
        self.inner
            .level
            .fetch_max(status.effective_level() as u8, Ordering::Relaxed);

        let listeners = self.inner.listeners.read().clone();
        for listener in &listeners {
            listener.on_status(&status);
        }

        let mut store = self.inner.store.lock();
        if store.header.len() < MAX_HEADER_COUNT {
            store.header.push(status);
        } else {
            if store.tail.len() == TAIL_SIZE {
                store.tail.pop_front();
            }
            store.tail.push_back(status);
        }
    }

    pub fn add_info(&self, message: impl Into<String>, origin: impl Into<String>) {
        self.add(Status::info(message, origin));
    }

    pub fn add_warn(&self, message: impl Into<String>, origin: impl Into<String>) {
        self.add(Status::warn(message, origin));
    }

    pub fn add_error(&self, message: impl Into<String>, origin: impl Into<String>) {
        self.add(Status::error(message, origin));
    }

    pub fn add_listener(&self, listener: Arc<dyn StatusListener>) {
        self.inner.listeners.write().push(listener);
    }

    /// Total number of records ever added, including evicted ones
    pub fn count(&self) -> usize {
        self.inner.count.load(Ordering::Relaxed)
    }

    /// Highest level of any record ever added
    pub fn level(&self) -> StatusLevel {
        StatusLevel::from_u8(self.inner.level.load(Ordering::Relaxed))
    }

    /// Retained records in insertion order
    pub fn copy_of_status_list(&self) -> Vec<Status> {
        let store = self.inner.store.lock();
        store
            .header
            .iter()
            .chain(store.tail.iter())
            .cloned()
            .collect()
    }

    /// Whether a retained record's message contains `needle`
    pub fn contains(&self, needle: &str) -> bool {
        let store = self.inner.store.lock();
        store
            .header
            .iter()
            .chain(store.tail.iter())
            .any(|s| s.message.contains(needle))
    }

    pub fn clear(&self) {
        let mut store = self.inner.store.lock();
        store.header.clear();
        store.tail.clear();
        self.inner.count.store(0, Ordering::Relaxed);
        self.inner
            .level
            .store(StatusLevel::Info as u8, Ordering::Relaxed);
    }
}

impl Default for StatusManager {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Debug for StatusManager {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("StatusManager")
            .field("count", &self.count())
            .field("level", &self.level())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_add_child() {
        let mut status = Status::info("testing", "test");
        status.add_child(Status::error("error", "test"));
        assert!(status.has_children());
        assert_eq!(status.children().len(), 1);
    }

    #[test]
    fn test_remove_child() {
        let mut status = Status::info("testing", "test");
        status.add_child(Status::error("error", "test"));
        assert!(status.remove_child("error"));
        assert!(!status.has_children());
        assert!(!status.remove_child("error"));
    }

    #[test]
    fn test_effective_level() {
        let mut status = Status::error("error", "test");
        status.add_child(Status::warn("warning", "test"));
        assert_eq!(status.effective_level(), StatusLevel::Error);

        let mut status = Status::info("info", "test");
        status.add_child(Status::warn("warning", "test"));
        assert_eq!(status.effective_level(), StatusLevel::Warn);

        let mut warn = Status::warn("warning", "test");
        warn.add_child(Status::error("error", "test"));
        let mut status = Status::info("info", "test");
        status.add_child(warn);
        assert_eq!(status.effective_level(), StatusLevel::Error);
    }

    #[test]
    fn test_manager_tracks_highest_level() {
        let sm = StatusManager::new();
        assert_eq!(sm.level(), StatusLevel::Info);
        sm.add_warn("careful", "test");
        sm.add_info("fine", "test");
        assert_eq!(sm.level(), StatusLevel::Warn);
        assert_eq!(sm.count(), 2);
    }

    #[test]
    fn test_manager_is_bounded() {
        let sm = StatusManager::new();
        let total = MAX_HEADER_COUNT + TAIL_SIZE + 50;
        for i in 0..total {
            sm.add_info(format!("msg {}", i), "test");
        }

        let list = sm.copy_of_status_list();
        assert_eq!(list.len(), MAX_HEADER_COUNT + TAIL_SIZE);
        assert_eq!(sm.count(), total);
        assert_eq!(list[0].message, "msg 0");
        assert_eq!(list[MAX_HEADER_COUNT - 1].message, format!("msg {}", MAX_HEADER_COUNT - 1));
        // the first tail records were evicted
        assert_eq!(list[MAX_HEADER_COUNT].message, format!("msg {}", MAX_HEADER_COUNT + 50));
        assert_eq!(list.last().unwrap().message, format!("msg {}", total - 1));
    }

    #[test]
    fn test_listener_receives_records() {
        use std::sync::atomic::AtomicUsize;

        struct Counting(AtomicUsize);
        impl StatusListener for Counting {
            fn on_status(&self, _status: &Status) {
                self.0.fetch_add(1, Ordering::Relaxed);
            }
        }

        let sm = StatusManager::new();
        let listener = Arc::new(Counting(AtomicUsize::new(0)));
        sm.add_listener(listener.clone());
        sm.add_info("one", "test");
        sm.add_error("two", "test");
        assert_eq!(listener.0.load(Ordering::Relaxed), 2);
    }

    #[test]
    fn test_listener_may_report_and_register() {
        use std::sync::atomic::AtomicBool;

        struct Reentrant {
            manager: StatusManager,
            fired: AtomicBool,
        }
        impl StatusListener for Reentrant {
            fn on_status(&self, _status: &Status) {
                if !self.fired.swap(true, Ordering::SeqCst) {
                    self.manager.add_listener(Arc::new(Reentrant {
                        manager: self.manager.clone(),
                        fired: AtomicBool::new(true),
                    }));
                    self.manager.add_warn("nested", "listener");
                }
            }
        }

        let sm = StatusManager::new();
        sm.add_listener(Arc::new(Reentrant {
            manager: sm.clone(),
            fired: AtomicBool::new(false),
        }));
        sm.add_info("outer", "test");

        assert_eq!(sm.count(), 2);
        assert!(sm.contains("nested"));
    }

    #[test]
    fn test_with_cause_renders_chain() {
        let io = std::io::Error::new(std::io::ErrorKind::Other, "disk on fire");
        let err = crate::core::LoggerError::io_operation("writing", "failed", io);
        let status = Status::error("append failed", "file").with_cause(&err);
        let cause = status.cause.unwrap();
        assert!(cause.contains("writing"));
        assert!(cause.contains("disk on fire"));
    }

    #[test]
    fn test_clear() {
        let sm = StatusManager::new();
        sm.add_error("bad", "test");
        sm.clear();
        assert_eq!(sm.count(), 0);
        assert_eq!(sm.level(), StatusLevel::Info);
        assert!(sm.copy_of_status_list().is_empty());
    }
}
