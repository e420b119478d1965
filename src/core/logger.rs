//! Hierarchical logger implementation
//!
//! Loggers form a prefix tree over dot-separated names. Each node caches its
//! effective level in an atomic so the enabled check on the logging path is a
//! single load; changing a level pushes the new effective level down to every
//! descendant that has no explicit level of its own.

use super::appender::AppenderRef;
use super::context::ContextInner;
use super::event::{CallerData, LoggingEvent, Marker, StructuredData};
use super::log_level::LogLevel;
use super::throwable::ThrowableProxy;
use parking_lot::{Mutex, RwLock};
use std::fmt;
use std::sync::atomic::{AtomicBool, AtomicU8, Ordering};
use std::sync::{Arc, Weak};

pub const ROOT_LOGGER_NAME: &str = "ROOT";

/// One node of the logger tree, owned by its context
pub(crate) struct LoggerNode {
    name: String,
    parent: Option<Weak<LoggerNode>>,
    children: Mutex<Vec<Arc<LoggerNode>>>,
    level: RwLock<Option<LogLevel>>,
    effective_level: AtomicU8,
    appenders: RwLock<Vec<AppenderRef>>,
    additive: AtomicBool,
}

impl LoggerNode {
    pub(crate) fn root() -> Arc<Self> {
        Arc::new(Self {
            name: ROOT_LOGGER_NAME.to_string(),
            parent: None,
            children: Mutex::new(Vec::new()),
            level: RwLock::new(Some(LogLevel::Debug)),
            effective_level: AtomicU8::new(LogLevel::Debug.as_u8()),
            appenders: RwLock::new(Vec::new()),
            additive: AtomicBool::new(true),
        })
    }

    pub(crate) fn name(&self) -> &str {
        &self.name
    }

    fn is_root(&self) -> bool {
        self.parent.is_none()
    }

    fn parent(&self) -> Option<Arc<LoggerNode>> {
        self.parent.as_ref().and_then(Weak::upgrade)
    }

    fn effective_level(&self) -> LogLevel {
        LogLevel::from_u8(self.effective_level.load(Ordering::Acquire))
    }

    /// Child called `full_name`, created if missing; the flag reports creation
    ///
    /// The child list lock serializes creation so two racing callers end up
    /// with the same node.
    pub(crate) fn get_or_create_child(self: &Arc<Self>, full_name: &str) -> (Arc<LoggerNode>, bool) {
        let mut children = self.children.lock();
        if let Some(child) = children.iter().find(|c| c.name == full_name) {
            return (child.clone(), false);
        }
        let child = Arc::new(LoggerNode {
            name: full_name.to_string(),
            parent: Some(Arc::downgrade(self)),
            children: Mutex::new(Vec::new()),
            level: RwLock::new(None),
            effective_level: AtomicU8::new(self.effective_level.load(Ordering::Acquire)),
            appenders: RwLock::new(Vec::new()),
            additive: AtomicBool::new(true),
        });
        children.push(child.clone());
        (child, true)
    }

    /// Set the explicit level and propagate the resulting effective level
    pub(crate) fn set_level(&self, level: Option<LogLevel>) {
        let mut explicit = self.level.write();
        *explicit = level;
        let effective = match level {
            Some(level) => level,
            None => self
                .parent()
                .map(|p| p.effective_level())
                .unwrap_or(LogLevel::Debug),
        };
        self.effective_level.store(effective.as_u8(), Ordering::Release);
        drop(explicit);
        self.propagate(effective);
    }

    /// Drop the explicit level without touching descendants
    pub(crate) fn clear_level_silently(&self) {
        if !self.is_root() {
            *self.level.write() = None;
        }
    }

    fn propagate(&self, effective: LogLevel) {
        let children = self.children.lock();
        for child in children.iter() {
            child.inherit(effective);
        }
    }

    fn inherit(&self, parent_effective: LogLevel) {
        let explicit = self.level.read();
        if explicit.is_some() {
            return;
        }
        self.effective_level
            .store(parent_effective.as_u8(), Ordering::Release);
        drop(explicit);
        self.propagate(parent_effective);
    }

    /// Offer `event` to this node's appenders; returns how many were offered
    fn append_loop(&self, event: &LoggingEvent) -> usize {
        let appenders = self.appenders.read();
        for appender in appenders.iter() {
            appender.do_append(event);
        }
        appenders.len()
    }
}

/// Handle to a named logger
///
/// Handles are cheap to clone; two handles for the same name refer to the
/// same node (see [`Logger::ptr_eq`]).
#[derive(Clone)]
pub struct Logger {
    pub(crate) node: Arc<LoggerNode>,
    ctx: Arc<ContextInner>,
}

impl Logger {
    pub(crate) fn new(node: Arc<LoggerNode>, ctx: Arc<ContextInner>) -> Self {
        Self { node, ctx }
    }

    pub fn name(&self) -> &str {
        &self.node.name
    }

    /// Explicit level, `None` when inherited
    pub fn level(&self) -> Option<LogLevel> {
        *self.node.level.read()
    }

    /// Set or clear the explicit level
    ///
    /// Clearing the root level is refused and reported to status.
    pub fn set_level(&self, level: Option<LogLevel>) {
        if level.is_none() && self.node.is_root() {
            self.ctx
                .status
                .add_error("The level of the root logger cannot be set to NULL", self.name());
            return;
        }
        self.node.set_level(level);
    }

    pub fn effective_level(&self) -> LogLevel {
        self.node.effective_level()
    }

    #[inline]
    pub fn is_enabled_for(&self, level: LogLevel) -> bool {
        level != LogLevel::Off && level >= self.node.effective_level()
    }

    pub fn is_trace_enabled(&self) -> bool {
        self.is_enabled_for(LogLevel::Trace)
    }

    pub fn is_debug_enabled(&self) -> bool {
        self.is_enabled_for(LogLevel::Debug)
    }

    pub fn add_appender(&self, appender: AppenderRef) {
        let mut appenders = self.node.appenders.write();
        if !appenders.iter().any(|a| Arc::ptr_eq(a, &appender)) {
            appenders.push(appender);
        }
    }

    /// Detach the appender called `name`, returning it
    pub fn detach_appender(&self, name: &str) -> Option<AppenderRef> {
        let mut appenders = self.node.appenders.write();
        let pos = appenders.iter().position(|a| a.name() == name)?;
        Some(appenders.remove(pos))
    }

    pub(crate) fn detach_all_appenders(&self) -> Vec<AppenderRef> {
        std::mem::take(&mut *self.node.appenders.write())
    }

    pub fn appenders(&self) -> Vec<AppenderRef> {
        self.node.appenders.read().clone()
    }

    pub fn set_additive(&self, additive: bool) {
        self.node.additive.store(additive, Ordering::Relaxed);
    }

    pub fn is_additive(&self) -> bool {
        self.node.additive.load(Ordering::Relaxed)
    }

    pub fn parent(&self) -> Option<Logger> {
        self.node
            .parent()
            .map(|node| Logger::new(node, self.ctx.clone()))
    }

    pub fn children_names(&self) -> Vec<String> {
        self.node
            .children
            .lock()
            .iter()
            .map(|c| c.name.clone())
            .collect()
    }

    /// Whether both handles refer to the same logger
    pub fn ptr_eq(&self, other: &Logger) -> bool {
        Arc::ptr_eq(&self.node, &other.node)
    }

    pub fn log(&self, level: LogLevel, message: impl Into<String>) {
        if !self.is_enabled_for(level) {
            return;
        }
        let event = LoggingEvent::new(self.name(), level, message, Vec::new(), self.ctx.view());
        self.call_appenders(&event);
    }

    pub fn trace(&self, message: impl Into<String>) {
        self.log(LogLevel::Trace, message);
    }

    pub fn debug(&self, message: impl Into<String>) {
        self.log(LogLevel::Debug, message);
    }

    pub fn info(&self, message: impl Into<String>) {
        self.log(LogLevel::Info, message);
    }

    pub fn warn(&self, message: impl Into<String>) {
        self.log(LogLevel::Warn, message);
    }

    pub fn error(&self, message: impl Into<String>) {
        self.log(LogLevel::Error, message);
    }

    /// Start building an event at `level`
    ///
    /// ```
    /// use hierlog::core::{LoggerContext, LogLevel};
    ///
    /// let ctx = LoggerContext::new();
    /// ctx.logger("app.http")
    ///     .event(LogLevel::Info)
    ///     .message("{} {} -> {}")
    ///     .arg("GET")
    ///     .arg("/health")
    ///     .arg(200)
    ///     .log();
    /// ```
    pub fn event(&self, level: LogLevel) -> EventBuilder<'_> {
        EventBuilder {
            logger: self,
            level,
            message: String::new(),
            args: Vec::new(),
            marker: None,
            throwable: None,
            structured_data: None,
            caller: None,
        }
    }

    /// Dispatch an already built event through this logger's hierarchy
    ///
    /// Walks from this logger towards the root, stopping after the first
    /// non-additive logger.
    pub fn call_appenders(&self, event: &LoggingEvent) {
        let mut offered = 0;
        let mut node = Some(self.node.clone());
        while let Some(current) = node {
            offered += current.append_loop(event);
            if !current.additive.load(Ordering::Relaxed) {
                break;
            }
            node = current.parent();
        }
        if offered == 0 {
            self.ctx.no_appender_warning(self.name());
        }
    }
}

impl PartialEq for Logger {
    fn eq(&self, other: &Self) -> bool {
        self.ptr_eq(other)
    }
}

impl Eq for Logger {}

impl fmt::Debug for Logger {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Logger")
            .field("name", &self.name())
            .field("level", &self.level())
            .field("effective_level", &self.effective_level())
            .field("additive", &self.is_additive())
            .finish()
    }
}

/// Builder for events carrying more than a plain message
///
/// Nothing is captured until [`log`](Self::log) runs, and nothing at all when
/// the level is disabled.
#[must_use = "events are only emitted by calling .log()"]
pub struct EventBuilder<'a> {
    logger: &'a Logger,
    level: LogLevel,
    message: String,
    args: Vec<String>,
    marker: Option<Marker>,
    throwable: Option<ThrowableProxy>,
    structured_data: Option<StructuredData>,
    caller: Option<CallerData>,
}

impl EventBuilder<'_> {
    /// Message with optional `{}` placeholders
    pub fn message(mut self, message: impl Into<String>) -> Self {
        self.message = message.into();
        self
    }

    /// Next placeholder argument
    pub fn arg(mut self, arg: impl fmt::Display) -> Self {
        self.args.push(arg.to_string());
        self
    }

    pub fn marker(mut self, marker: Marker) -> Self {
        self.marker = Some(marker);
        self
    }

    /// Attach an error and its source chain
    pub fn error(mut self, error: &(dyn std::error::Error + 'static)) -> Self {
        self.throwable = Some(ThrowableProxy::from_error(error));
        self
    }

    /// Attach an error with the current backtrace
    pub fn error_with_backtrace(mut self, error: &(dyn std::error::Error + 'static)) -> Self {
        self.throwable = Some(ThrowableProxy::capture(error));
        self
    }

    pub fn throwable(mut self, throwable: ThrowableProxy) -> Self {
        self.throwable = Some(throwable);
        self
    }

    pub fn structured_data(mut self, data: StructuredData) -> Self {
        self.structured_data = Some(data);
        self
    }

    pub fn location(mut self, module_path: &str, file: &str, line: u32) -> Self {
        self.caller = Some(CallerData::new(module_path, file, line));
        self
    }

    pub fn log(self) {
        let logger = self.logger;
        if !logger.is_enabled_for(self.level) {
            return;
        }
        let mut event = LoggingEvent::new(
            logger.name(),
            self.level,
            self.message,
            self.args,
            logger.ctx.view(),
        );
        event.marker = self.marker;
        event.throwable = self.throwable;
        event.structured_data = self.structured_data;
        event.caller = self.caller;
        logger.call_appenders(&event);
    }
}
