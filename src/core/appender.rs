//! Appender trait for log output destinations

use super::error::Result;
use super::event::LoggingEvent;
use super::filter::{Filter, FilterChain, FilterReply};
use super::lifecycle::LifeCycle;
use super::metrics::AppenderMetrics;
use super::status::{Status, StatusManager};
use parking_lot::{Mutex, RwLock};
use std::cell::RefCell;
use std::fmt;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

/// A sink that renders and delivers events
///
/// Implementations are driven through [`SharedAppender`], which serializes
/// calls, so `append` and `flush` take `&mut self`.
pub trait Appender: LifeCycle + Send {
    fn append(&mut self, event: &LoggingEvent) -> Result<()>;

    fn flush(&mut self) -> Result<()> {
        Ok(())
    }

    /// Short type name used in diagnostics, e.g. `"file"`
    fn kind(&self) -> &'static str;

    /// Called once before the first `start`, for appenders that report their
    /// own diagnostics
    fn attach_status(&mut self, _status: &StatusManager) {}
}

pub type AppenderRef = Arc<SharedAppender>;

// Appenders currently appending on this thread; guards against an appender
// that logs into itself
thread_local! {
    static APPENDING: RefCell<Vec<usize>> = const { RefCell::new(Vec::new()) };
}

/// Thread-safe wrapper around one appender
///
/// Owns the appender's filter chain and enforces the dispatch rules: events
/// offered before a successful start are skipped, filters run before the
/// appender is locked, and an error or panic inside the appender is reported
/// to the status channel and drops the event for this appender only.
pub struct SharedAppender {
    name: String,
    kind: &'static str,
    inner: Mutex<Box<dyn Appender>>,
    filters: RwLock<FilterChain>,
    started: AtomicBool,
    not_started_warned: AtomicBool,
    status: StatusManager,
    metrics: AppenderMetrics,
}

impl SharedAppender {
    pub fn new(name: impl Into<String>, appender: impl Appender + 'static, status: &StatusManager) -> Self {
        Self::from_boxed(name, Box::new(appender), status)
    }

    pub fn from_boxed(name: impl Into<String>, mut appender: Box<dyn Appender>, status: &StatusManager) -> Self {
        appender.attach_status(status);
        Self {
            name: name.into(),
            kind: appender.kind(),
            inner: Mutex::new(appender),
            filters: RwLock::new(FilterChain::new()),
            started: AtomicBool::new(false),
            not_started_warned: AtomicBool::new(false),
            status: status.clone(),
            metrics: AppenderMetrics::new(),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn kind(&self) -> &'static str {
        self.kind
    }

    pub fn metrics(&self) -> &AppenderMetrics {
        &self.metrics
    }

    fn origin(&self) -> String {
        format!("{}[{}]", self.kind, self.name)
    }

    /// Start the wrapped appender, reporting any failure to status
    ///
    /// Returns whether the appender is started afterwards.
    pub fn start(&self) -> bool {
        let result = {
            let mut inner = self.inner.lock();
            std::panic::catch_unwind(std::panic::AssertUnwindSafe(|| inner.start()))
        };
        match result {
            Ok(Ok(())) => {
                self.started.store(true, Ordering::Release);
                self.not_started_warned.store(false, Ordering::Relaxed);
                true
            }
            Ok(Err(e)) => {
                self.started.store(false, Ordering::Release);
                self.status.add(
                    Status::error(format!("Appender [{}] failed to start", self.name), self.origin())
                        .with_cause(&e),
                );
                false
            }
            Err(_) => {
                self.started.store(false, Ordering::Release);
                self.status.add_error(
                    format!("Appender [{}] panicked during start", self.name),
                    self.origin(),
                );
                false
            }
        }
    }

    pub fn stop(&self) {
        self.started.store(false, Ordering::Release);
        let mut inner = self.inner.lock();
        if let Err(e) = inner.flush() {
            self.status.add(
                Status::warn(format!("Flush on stop failed for [{}]", self.name), self.origin()).with_cause(&e),
            );
        }
        inner.stop();
    }

    pub fn is_started(&self) -> bool {
        self.started.load(Ordering::Acquire)
    }

    pub fn add_filter(&self, mut filter: impl Filter + 'static) {
        filter.attach_status(&self.status);
        self.filters.write().push(Box::new(filter));
    }

    pub fn add_boxed_filter(&self, mut filter: Box<dyn Filter>) {
        filter.attach_status(&self.status);
        self.filters.write().push(filter);
    }

    pub fn clear_filters(&self) {
        self.filters.write().clear();
    }

    pub fn filter_reply(&self, event: &LoggingEvent) -> FilterReply {
        self.filters.read().decide(event)
    }

    /// Offer one event to this appender
    pub fn do_append(&self, event: &LoggingEvent) {
        let key = self as *const Self as usize;
        let reentrant = APPENDING.with(|stack| stack.borrow().contains(&key));
        if reentrant {
            return;
        }

        if !self.is_started() {
            self.metrics.record_skipped();
            if !self.not_started_warned.swap(true, Ordering::Relaxed) {
                self.status.add_warn(
                    format!("Attempted to append to non started appender [{}].", self.name),
                    self.origin(),
                );
            }
            return;
        }

        if self.filter_reply(event) == FilterReply::Deny {
            self.metrics.record_denied();
            return;
        }

        APPENDING.with(|stack| stack.borrow_mut().push(key));
        let result = {
            let mut inner = self.inner.lock();
            std::panic::catch_unwind(std::panic::AssertUnwindSafe(|| inner.append(event)))
        };
        APPENDING.with(|stack| {
            stack.borrow_mut().retain(|k| *k != key);
        });

        match result {
            Ok(Ok(())) => {
                self.metrics.record_appended();
            }
            Ok(Err(e)) => {
                self.metrics.record_failed();
                self.status.add(
                    Status::error(format!("Appender [{}] failed to append", self.name), self.origin())
                        .with_cause(&e),
                );
            }
            Err(panic_info) => {
                self.metrics.record_failed();
                let panic_msg = if let Some(s) = panic_info.downcast_ref::<&str>() {
                    s.to_string()
                } else if let Some(s) = panic_info.downcast_ref::<String>() {
                    s.clone()
                } else {
                    "Unknown panic".to_string()
                };
                self.status.add_error(
                    format!("Appender [{}] panicked: {}", self.name, panic_msg),
                    self.origin(),
                );
            }
        }
    }

    pub fn flush(&self) {
        let result = {
            let mut inner = self.inner.lock();
            std::panic::catch_unwind(std::panic::AssertUnwindSafe(|| inner.flush()))
        };
        match result {
            Ok(Ok(())) => {}
            Ok(Err(e)) => self.status.add(
                Status::error(format!("Appender [{}] flush failed", self.name), self.origin()).with_cause(&e),
            ),
            Err(_) => self.status.add_error(
                format!("Appender [{}] panicked during flush", self.name),
                self.origin(),
            ),
        }
    }

    /// Run `f` with exclusive access to the wrapped appender
    pub fn with_appender<R>(&self, f: impl FnOnce(&mut dyn Appender) -> R) -> R {
        let mut inner = self.inner.lock();
        f(inner.as_mut())
    }
}

impl fmt::Debug for SharedAppender {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SharedAppender")
            .field("name", &self.name)
            .field("kind", &self.kind)
            .field("started", &self.is_started())
            .finish()
    }
}
