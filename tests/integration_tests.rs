//! Integration tests for hierlog
//!
//! These tests verify:
//! - Logger identity and level inheritance
//! - Dispatch through additive and non-additive loggers
//! - Filter chain decisions
//! - Pattern and JSON layouts end to end through file appenders
//! - Failure isolation through the status channel

use hierlog::appenders::{FileAppender, RollingFileAppender, TriggeringStrategy};
use hierlog::core::{
    Filter, FilterChain, FilterReply, LogLevel, LoggerError, LoggingEvent, Marker, Mdc, StackFrame,
    StructuredData, ThresholdFilter, ThrowableProxy,
};
use hierlog::layout::{JsonLayout, Layout, PatternLayout};
use hierlog::{Appender, LifeCycle, LoggerContext, Result};
use parking_lot::Mutex;
use std::fs;
use std::sync::Arc;
use std::thread;
use tempfile::TempDir;

/// Appender keeping `logger:message` for every event it receives
#[derive(Default, Clone)]
struct Collector {
    lines: Arc<Mutex<Vec<String>>>,
    fail: bool,
}

impl LifeCycle for Collector {
    fn start(&mut self) -> Result<()> {
        Ok(())
    }

    fn stop(&mut self) {}

    fn is_started(&self) -> bool {
        true
    }
}

impl Appender for Collector {
    fn append(&mut self, event: &LoggingEvent) -> Result<()> {
        if self.fail {
            return Err(LoggerError::writer("collector is broken"));
        }
        self.lines
            .lock()
            .push(format!("{}:{}", event.logger_name, event.formatted_message));
        Ok(())
    }

    fn kind(&self) -> &'static str {
        "collector"
    }
}

struct Fixed(FilterReply);

impl Filter for Fixed {
    fn decide(&self, _event: &LoggingEvent) -> FilterReply {
        self.0
    }

    fn name(&self) -> &str {
        "fixed"
    }
}

fn event(level: LogLevel, message: &str) -> LoggingEvent {
    LoggingEvent::new("it", level, message, Vec::new(), Default::default())
}

#[test]
fn test_logger_identity_is_stable_across_threads() {
    let context = LoggerContext::new();
    let handles: Vec<_> = (0..8)
        .map(|_| {
            let context = context.clone();
            thread::spawn(move || context.logger("a.b.c"))
        })
        .collect();

    let loggers: Vec<_> = handles.into_iter().map(|h| h.join().unwrap()).collect();
    for logger in &loggers {
        assert!(logger.ptr_eq(&loggers[0]));
    }
    assert!(context.logger("a.b.c").ptr_eq(&loggers[0]));
    // root, a, a.b, a.b.c
    assert_eq!(context.logger_count(), 4);
}

#[test]
fn test_effective_level_follows_nearest_ancestor() {
    let context = LoggerContext::new();
    let leaf = context.logger("com.acme.billing.Invoice");
    assert_eq!(leaf.effective_level(), LogLevel::Debug);

    context.logger("com.acme").set_level(Some(LogLevel::Warn));
    assert_eq!(leaf.effective_level(), LogLevel::Warn);

    context.logger("com.acme.billing").set_level(Some(LogLevel::Trace));
    assert_eq!(leaf.effective_level(), LogLevel::Trace);

    context.logger("com.acme.billing").set_level(None);
    assert_eq!(leaf.effective_level(), LogLevel::Warn);

    // loggers created after the change still inherit it
    assert_eq!(context.logger("com.acme.shipping").effective_level(), LogLevel::Warn);

    context.root_logger().set_level(None);
    assert_eq!(context.root_logger().effective_level(), LogLevel::Debug);
    assert!(context.status_manager().contains("root logger cannot be set to NULL"));
}

#[test]
fn test_disabled_events_reach_no_appender() {
    let context = LoggerContext::new();
    let collector = Collector::default();
    let appender = context.build_appender("COLLECT", collector.clone());
    context.root_logger().add_appender(appender.clone());

    let logger = context.logger("quiet");
    logger.set_level(Some(LogLevel::Error));
    logger.debug("dropped");
    logger.warn("dropped too");
    logger.error("kept");

    assert_eq!(*collector.lines.lock(), vec!["quiet:kept".to_string()]);
    assert_eq!(appender.metrics().appended_count(), 1);
}

#[test]
fn test_additivity_stops_at_non_additive_logger() {
    let context = LoggerContext::new();
    let root_sink = Collector::default();
    let db_sink = Collector::default();
    context
        .root_logger()
        .add_appender(context.build_appender("ROOT", root_sink.clone()));
    let db = context.logger("app.db");
    db.add_appender(context.build_appender("DB", db_sink.clone()));

    context.logger("app.db.pool").info("first");
    db.set_additive(false);
    context.logger("app.db.pool").info("second");
    context.logger("app.http").info("third");

    assert_eq!(
        *db_sink.lines.lock(),
        vec!["app.db.pool:first".to_string(), "app.db.pool:second".to_string()]
    );
    assert_eq!(
        *root_sink.lines.lock(),
        vec!["app.db.pool:first".to_string(), "app.http:third".to_string()]
    );
}

#[test]
fn test_filter_chain_first_decision_wins() {
    let mut chain = FilterChain::new();
    chain.push(Box::new(Fixed(FilterReply::Neutral)));
    chain.push(Box::new(Fixed(FilterReply::Neutral)));
    chain.push(Box::new(Fixed(FilterReply::Deny)));
    assert_eq!(chain.decide(&event(LogLevel::Info, "x")), FilterReply::Deny);

    let mut chain = FilterChain::new();
    chain.push(Box::new(Fixed(FilterReply::Neutral)));
    chain.push(Box::new(Fixed(FilterReply::Accept)));
    chain.push(Box::new(Fixed(FilterReply::Deny)));
    assert_eq!(chain.decide(&event(LogLevel::Info, "x")), FilterReply::Accept);
    assert!(FilterChain::new().accepts(&event(LogLevel::Info, "x")));
}

#[test]
fn test_appender_filters_deny_events() {
    let context = LoggerContext::new();
    let collector = Collector::default();
    let appender = context.build_appender("COLLECT", collector.clone());
    appender.add_filter(ThresholdFilter::new(LogLevel::Warn));
    context.root_logger().add_appender(appender.clone());

    let logger = context.logger("svc");
    logger.info("below threshold");
    logger.warn("at threshold");

    assert_eq!(*collector.lines.lock(), vec!["svc:at threshold".to_string()]);
    assert_eq!(appender.metrics().denied_count(), 1);
}

#[test]
fn test_pattern_layout_round_trip() {
    let mut layout = PatternLayout::new("%-5level %msg%n");
    layout.start().unwrap();
    assert_eq!(layout.do_layout(&event(LogLevel::Info, "hi")).unwrap(), "INFO  hi\n");
}

#[test]
fn test_context_name_is_set_once() {
    let context = LoggerContext::new();
    context.set_name("first").unwrap();
    let err = context.set_name("second").unwrap_err();
    assert!(matches!(err, LoggerError::ContextNameAlreadySet { .. }));
    assert_eq!(context.name().as_deref(), Some("first"));
}

#[test]
fn test_file_appender_renders_pattern() {
    let temp_dir = TempDir::new().expect("Failed to create temp dir");
    let log_file = temp_dir.path().join("pattern.log");

    let context = LoggerContext::with_name("shop");
    let file = FileAppender::new(&log_file).with_pattern("%cn|%-5level|%logger{10}|%X{user}|%marker|%msg%n");
    context.root_logger().add_appender(context.build_appender("FILE", file));

    let _user = Mdc::scoped("user", "alice");
    let logger = context.logger("com.shop.cart.Checkout");
    logger
        .event(LogLevel::Warn)
        .message("{} items, total {}")
        .arg(3)
        .arg("9.99")
        .marker(Marker::new("AUDIT"))
        .log();
    drop(_user);
    logger.info("anonymous");

    let content = fs::read_to_string(&log_file).expect("Failed to read log file");
    let lines: Vec<&str> = content.lines().collect();
    assert_eq!(lines[0], "shop|WARN |c.s.c.Checkout|alice|AUDIT|3 items, total 9.99");
    assert_eq!(lines[1], "shop|INFO |c.s.c.Checkout|||anonymous");
    assert_eq!(Mdc::get("user"), None);
}

#[test]
fn test_exception_is_appended_after_message() {
    let temp_dir = TempDir::new().expect("Failed to create temp dir");
    let log_file = temp_dir.path().join("exception.log");

    let context = LoggerContext::new();
    let file = FileAppender::new(&log_file).with_pattern("%msg%n");
    context.root_logger().add_appender(context.build_appender("FILE", file));

    let cause = ThrowableProxy::new("io::Error", "connection reset")
        .with_frame(StackFrame::new("net", "read", Some("net.rs".into()), Some(7)));
    let error = ThrowableProxy::new("QueryError", "query failed")
        .with_frame(StackFrame::new("db", "query", Some("db.rs".into()), Some(42)))
        .with_cause(cause);
    context.logger("db").event(LogLevel::Error).message("boom").throwable(error).log();

    let content = fs::read_to_string(&log_file).unwrap();
    assert!(content.starts_with("boom\nQueryError: query failed\n\tat db.query(db.rs:42)\n"));
    assert!(content.contains("Caused by: io::Error: connection reset\n\tat net.read(net.rs:7)\n"));
}

#[test]
fn test_json_layout_writes_one_object_per_line() {
    let temp_dir = TempDir::new().expect("Failed to create temp dir");
    let log_file = temp_dir.path().join("events.json");

    let context = LoggerContext::new();
    let file = FileAppender::new(&log_file).with_layout(JsonLayout::new());
    context.root_logger().add_appender(context.build_appender("JSON", file));

    let logger = context.logger("api");
    logger.info("one");
    logger
        .event(LogLevel::Error)
        .message("two")
        .structured_data(StructuredData::new("req").with_param("id", "7"))
        .log();

    let content = fs::read_to_string(&log_file).unwrap();
    let values: Vec<serde_json::Value> = content
        .lines()
        .map(|line| serde_json::from_str(line).unwrap())
        .collect();
    assert_eq!(values.len(), 2);
    assert_eq!(values[0]["message"], "one");
    assert_eq!(values[0]["level"], "INFO");
    assert_eq!(values[1]["logger"], "api");
}

#[test]
fn test_rolling_file_through_context() {
    let temp_dir = TempDir::new().expect("Failed to create temp dir");
    let log_file = temp_dir.path().join("roll.log");

    let context = LoggerContext::new();
    let rolling = RollingFileAppender::new(&log_file)
        .with_strategy(TriggeringStrategy::size(64))
        .with_max_index(3)
        .with_pattern("%msg%n");
    context.root_logger().add_appender(context.build_appender("ROLL", rolling));

    let logger = context.logger("roll");
    for i in 0..50 {
        logger.info(format!("rolling message number {}", i));
    }
    context.stop();

    assert!(temp_dir.path().join("roll.log.1").exists());
    assert!(temp_dir.path().join("roll.log.3").exists());
    assert!(!temp_dir.path().join("roll.log.4").exists());
    let active = fs::read_to_string(&log_file).unwrap();
    assert!(active.ends_with("rolling message number 49\n"));
}

#[test]
fn test_failing_appender_is_isolated() {
    let context = LoggerContext::new();
    let broken = Collector {
        fail: true,
        ..Collector::default()
    };
    let healthy = Collector::default();
    let broken_ref = context.build_appender("BROKEN", broken);
    context.root_logger().add_appender(broken_ref.clone());
    context
        .root_logger()
        .add_appender(context.build_appender("HEALTHY", healthy.clone()));

    context.logger("x").error("still delivered");

    assert_eq!(*healthy.lines.lock(), vec!["x:still delivered".to_string()]);
    assert_eq!(broken_ref.metrics().failed_count(), 1);
    assert!(context.status_manager().contains("Appender [BROKEN] failed to append"));
}

#[test]
fn test_no_appender_warning_and_reset() {
    let context = LoggerContext::new();
    context.logger("lonely").info("nobody listens");
    assert!(context.status_manager().contains("No appenders present in context"));

    let collector = Collector::default();
    context
        .root_logger()
        .add_appender(context.build_appender("COLLECT", collector.clone()));
    context.logger("lonely").set_level(Some(LogLevel::Error));
    context.reset();

    assert!(context.root_logger().appenders().is_empty());
    assert!(context.appender("COLLECT").is_none());
    assert_eq!(context.logger("lonely").level(), None);
    assert_eq!(context.logger("lonely").effective_level(), LogLevel::Debug);
}
