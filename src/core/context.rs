//! Logger context: one logging universe
//!
//! A [`LoggerContext`] owns the logger tree, the status channel, the named
//! appender registry and the context properties. Nothing here is global; every
//! component is handed the context (or its status manager) explicitly.

use super::appender::{Appender, AppenderRef, SharedAppender};
use super::error::{LoggerError, Result};
use super::log_level::LogLevel;
use super::logger::{Logger, LoggerNode, ROOT_LOGGER_NAME};
use super::status::StatusManager;
use chrono::{DateTime, Utc};
use dashmap::DashMap;
use parking_lot::RwLock;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

/// Immutable view of a context, copied into every event
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ContextView {
    pub name: Option<String>,
    pub birth_time: DateTime<Utc>,
}

impl Default for ContextView {
    fn default() -> Self {
        Self {
            name: None,
            birth_time: Utc::now(),
        }
    }
}

pub(crate) struct ContextInner {
    name: RwLock<Option<String>>,
    birth_time: DateTime<Utc>,
    pub(crate) status: StatusManager,
    pub(crate) root: Arc<LoggerNode>,
    cache: DashMap<String, Arc<LoggerNode>>,
    properties: RwLock<HashMap<String, String>>,
    appenders: RwLock<HashMap<String, AppenderRef>>,
    no_appender_warned: AtomicBool,
}

impl ContextInner {
    pub(crate) fn view(&self) -> ContextView {
        ContextView {
            name: self.name.read().clone(),
            birth_time: self.birth_time,
        }
    }

    pub(crate) fn no_appender_warning(&self, logger_name: &str) {
        if !self.no_appender_warned.swap(true, Ordering::Relaxed) {
            let context_name = self.name.read().clone().unwrap_or_else(|| "default".to_string());
            self.status.add_warn(
                format!(
                    "No appenders present in context [{}] for logger [{}].",
                    context_name, logger_name
                ),
                "LoggerContext",
            );
        }
    }
}

/// Cheap-clone handle to a logging universe
///
/// # Example
///
/// ```
/// use hierlog::core::{LoggerContext, LogLevel};
///
/// let ctx = LoggerContext::new();
/// let logger = ctx.logger("app.db.pool");
/// ctx.logger("app").set_level(Some(LogLevel::Warn));
///
/// assert_eq!(logger.effective_level(), LogLevel::Warn);
/// assert!(ctx.logger("app.db.pool").ptr_eq(&logger));
/// ```
#[derive(Clone)]
pub struct LoggerContext {
    inner: Arc<ContextInner>,
}

impl LoggerContext {
    pub fn new() -> Self {
        Self {
            inner: Arc::new(ContextInner {
                name: RwLock::new(None),
                birth_time: Utc::now(),
                status: StatusManager::new(),
                root: LoggerNode::root(),
                cache: DashMap::new(),
                properties: RwLock::new(HashMap::new()),
                appenders: RwLock::new(HashMap::new()),
                no_appender_warned: AtomicBool::new(false),
            }),
        }
    }

    /// Context named `name`
    pub fn with_name(name: impl Into<String>) -> Self {
        let ctx = Self::new();
        *ctx.inner.name.write() = Some(name.into());
        ctx
    }

    pub fn name(&self) -> Option<String> {
        self.inner.name.read().clone()
    }

    /// Name the context; only the first call succeeds
    pub fn set_name(&self, name: impl Into<String>) -> Result<()> {
        let mut current = self.inner.name.write();
        if let Some(ref existing) = *current {
            return Err(LoggerError::ContextNameAlreadySet {
                current: existing.clone(),
            });
        }
        *current = Some(name.into());
        Ok(())
    }

    pub fn birth_time(&self) -> DateTime<Utc> {
        self.inner.birth_time
    }

    pub fn view(&self) -> ContextView {
        self.inner.view()
    }

    pub fn status_manager(&self) -> &StatusManager {
        &self.inner.status
    }

    pub fn root_logger(&self) -> Logger {
        Logger::new(self.inner.root.clone(), self.inner.clone())
    }

    /// Fetch or lazily create the logger called `name`
    ///
    /// `""` and `"root"` (any case) name the root logger. Intermediate
    /// loggers are created on the way down, each under its parent's lock.
    pub fn logger(&self, name: &str) -> Logger {
        if name.is_empty() || name.eq_ignore_ascii_case(ROOT_LOGGER_NAME) {
            return self.root_logger();
        }

        if let Some(node) = self.inner.cache.get(name) {
            return Logger::new(node.value().clone(), self.inner.clone());
        }

        let mut node = self.inner.root.clone();
        let mut search_from = 0;
        loop {
            let end = match name[search_from..].find('.') {
                Some(offset) => search_from + offset,
                None => name.len(),
            };
            let child_name = &name[..end];
            let (child, created) = node.get_or_create_child(child_name);
            if created {
                self.inner.cache.insert(child_name.to_string(), child.clone());
            }
            node = child;
            if end == name.len() {
                break;
            }
            search_from = end + 1;
        }

        // a racing creator may have inserted the node before us
        self.inner
            .cache
            .entry(name.to_string())
            .or_insert_with(|| node.clone());
        Logger::new(node, self.inner.clone())
    }

    /// Existing logger called `name`, without creating it
    pub fn exists(&self, name: &str) -> Option<Logger> {
        if name.eq_ignore_ascii_case(ROOT_LOGGER_NAME) {
            return Some(self.root_logger());
        }
        self.inner
            .cache
            .get(name)
            .map(|node| Logger::new(node.value().clone(), self.inner.clone()))
    }

    /// Every logger created so far, root first
    pub fn logger_list(&self) -> Vec<Logger> {
        let mut nodes: Vec<Arc<LoggerNode>> = self
            .inner
            .cache
            .iter()
            .map(|entry| entry.value().clone())
            .collect();
        nodes.sort_by(|a, b| a.name().cmp(b.name()));
        std::iter::once(self.inner.root.clone())
            .chain(nodes)
            .map(|node| Logger::new(node, self.inner.clone()))
            .collect()
    }

    pub fn logger_count(&self) -> usize {
        self.inner.cache.len() + 1
    }

    pub fn put_property(&self, key: impl Into<String>, value: impl Into<String>) {
        self.inner.properties.write().insert(key.into(), value.into());
    }

    pub fn property(&self, key: &str) -> Option<String> {
        self.inner.properties.read().get(key).cloned()
    }

    /// Wrap `appender`, start it and register it under `name`
    ///
    /// A failed start is reported to status; the appender is registered
    /// anyway and skipped at append time.
    pub fn build_appender(&self, name: impl Into<String>, appender: impl Appender + 'static) -> AppenderRef {
        let shared = Arc::new(SharedAppender::new(name, appender, &self.inner.status));
        shared.start();
        self.register_appender(shared.clone());
        shared
    }

    pub fn register_appender(&self, appender: AppenderRef) {
        let previous = self
            .inner
            .appenders
            .write()
            .insert(appender.name().to_string(), appender);
        if let Some(previous) = previous {
            self.inner.status.add_warn(
                format!("Appender named [{}] replaced an earlier registration", previous.name()),
                "LoggerContext",
            );
        }
    }

    pub fn appender(&self, name: &str) -> Option<AppenderRef> {
        self.inner.appenders.read().get(name).cloned()
    }

    /// Stop every appender, detach it, and restore default levels
    pub fn reset(&self) {
        let loggers = self.logger_list();
        for logger in &loggers {
            for appender in logger.detach_all_appenders() {
                appender.stop();
            }
            logger.set_additive(true);
        }
        for appender in self.inner.appenders.write().drain().map(|(_, a)| a) {
            appender.stop();
        }

        // clear children first so the root update below propagates everywhere
        for logger in loggers.iter().skip(1) {
            logger.node.clear_level_silently();
        }
        self.inner.root.set_level(Some(LogLevel::Debug));
        self.inner.properties.write().clear();
        self.inner.no_appender_warned.store(false, Ordering::Relaxed);
    }

    pub fn stop(&self) {
        self.reset();
        self.inner.status.add_info("Logger context stopped", "LoggerContext");
    }
}

impl Default for LoggerContext {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Debug for LoggerContext {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("LoggerContext")
            .field("name", &self.name())
            .field("birth_time", &self.inner.birth_time)
            .field("loggers", &self.logger_count())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::appender::tests::MemoryAppender;

    #[test]
    fn test_set_name_only_once() {
        let ctx = LoggerContext::new();
        assert!(ctx.name().is_none());
        ctx.set_name("main").unwrap();

        let err = ctx.set_name("other").unwrap_err();
        assert!(matches!(err, LoggerError::ContextNameAlreadySet { ref current } if current == "main"));
        assert_eq!(ctx.name().as_deref(), Some("main"));
    }

    #[test]
    fn test_root_aliases() {
        let ctx = LoggerContext::new();
        assert!(ctx.logger("ROOT").ptr_eq(&ctx.root_logger()));
        assert!(ctx.logger("").ptr_eq(&ctx.root_logger()));
        assert_eq!(ctx.root_logger().level(), Some(LogLevel::Debug));
    }

    #[test]
    fn test_intermediate_loggers_are_created() {
        let ctx = LoggerContext::new();
        let leaf = ctx.logger("a.b.c");
        assert_eq!(leaf.name(), "a.b.c");
        assert!(ctx.exists("a").is_some());
        assert!(ctx.exists("a.b").is_some());
        assert_eq!(ctx.logger_count(), 4);
        let parent = leaf.parent().unwrap();
        assert!(parent.ptr_eq(&ctx.logger("a.b")));
    }

    #[test]
    fn test_warm_lookups_during_creation() {
        let ctx = LoggerContext::new();
        let warm = ctx.logger("svc.db.Pool");

        let creator = {
            let ctx = ctx.clone();
            std::thread::spawn(move || {
                for i in 0..200 {
                    ctx.logger(&format!("svc.db.Conn{}", i));
                }
            })
        };
        for _ in 0..1000 {
            assert!(ctx.logger("svc.db.Pool").ptr_eq(&warm));
        }
        creator.join().unwrap();

        // root, svc, svc.db, Pool and 200 connections
        assert_eq!(ctx.logger_count(), 204);
        assert!(ctx.exists("svc.db.Conn199").is_some());
    }

    #[test]
    fn test_properties() {
        let ctx = LoggerContext::new();
        ctx.put_property("env", "prod");
        assert_eq!(ctx.property("env").as_deref(), Some("prod"));
        assert!(ctx.property("missing").is_none());
    }

    #[test]
    fn test_reset_restores_defaults() {
        let ctx = LoggerContext::new();
        let memory = MemoryAppender::default();
        let appender = ctx.build_appender("mem", memory);
        let logger = ctx.logger("x.y");
        logger.set_level(Some(LogLevel::Error));
        logger.set_additive(false);
        logger.add_appender(appender.clone());
        ctx.root_logger().set_level(Some(LogLevel::Warn));

        ctx.reset();

        assert_eq!(logger.level(), None);
        assert_eq!(logger.effective_level(), LogLevel::Debug);
        assert!(logger.is_additive());
        assert!(logger.appenders().is_empty());
        assert!(!appender.is_started());
        assert!(ctx.appender("mem").is_none());
    }

    #[test]
    fn test_no_appender_warning_once() {
        let ctx = LoggerContext::with_name("quiet");
        let logger = ctx.logger("lonely");
        logger.info("one");
        logger.info("two");

        let warnings: Vec<_> = ctx
            .status_manager()
            .copy_of_status_list()
            .into_iter()
            .filter(|s| s.message.starts_with("No appenders present"))
            .collect();
        assert_eq!(warnings.len(), 1);
        assert_eq!(
            warnings[0].message,
            "No appenders present in context [quiet] for logger [lonely]."
        );
    }
}
