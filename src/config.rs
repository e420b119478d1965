//! Declarative context configuration
//!
//! A [`ContextConfig`] describes the logger tree and appender graph; it is
//! usually read from JSON and then applied to a [`LoggerContext`] with
//! [`ContextConfig::configure`]. Problems found while wiring (an unknown
//! level, an appender that fails to start, a reference to a missing
//! appender) are reported to the context's status channel and skipped.
//!
//! ```
//! use hierlog::config::ContextConfig;
//! use hierlog::LoggerContext;
//!
//! let config = ContextConfig::from_json_str(r#"{
//!     "name": "billing",
//!     "appenders": [
//!         { "name": "CONSOLE", "kind": "console", "target": "stderr", "pattern": "%-5level %logger - %msg%n" }
//!     ],
//!     "loggers": [
//!         { "name": "root", "level": "info", "appender_refs": ["CONSOLE"] },
//!         { "name": "billing.db", "level": "warn" }
//!     ]
//! }"#).unwrap();
//!
//! let context = LoggerContext::new();
//! config.configure(&context);
//! assert_eq!(context.name().as_deref(), Some("billing"));
//! ```

use crate::appenders::syslog::{DEFAULT_PORT, DEFAULT_RECONNECTION_DELAY, RESERVED_ENTERPRISE_NUMBER};
use crate::appenders::{
    ConsoleAppender, ConsoleTarget, FileAppender, FixedWindowPolicy, RollingFileAppender, SyslogAppender,
    Transport, TriggeringStrategy,
};
use crate::core::{
    Appender, AppenderRef, EvaluatorFilter, Filter, FilterReply, LevelFilter, LevelMarkerEvaluator, LogLevel,
    LoggerContext, LoggerError, Result, SharedAppender, Status, ThresholdFilter,
};
use crate::layout::JsonLayout;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

const ORIGIN: &str = "ContextConfig";

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ContextConfig {
    /// Context name; ignored with a status error when the context already has one
    #[serde(default)]
    pub name: Option<String>,

    #[serde(default)]
    pub properties: BTreeMap<String, String>,

    /// Built and started first, in order
    #[serde(default)]
    pub appenders: Vec<AppenderConfig>,

    /// `root` names the root logger
    #[serde(default)]
    pub loggers: Vec<LoggerConfig>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct LoggerConfig {
    pub name: String,

    /// Level name such as `debug` or `WARN`; absent means inherited
    #[serde(default)]
    pub level: Option<String>,

    #[serde(default = "default_true")]
    pub additive: bool,

    #[serde(default)]
    pub appender_refs: Vec<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AppenderConfig {
    pub name: String,

    #[serde(flatten)]
    pub kind: AppenderKind,

    /// Pattern for the layout; for syslog this is the message suffix
    #[serde(default)]
    pub pattern: Option<String>,

    /// Render one JSON object per line instead of a pattern
    #[serde(default)]
    pub json: bool,

    #[serde(default)]
    pub filters: Vec<FilterConfig>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum AppenderKind {
    Console {
        #[serde(default)]
        target: ConsoleTarget,
        #[serde(default = "default_true")]
        colors: bool,
    },
    File {
        path: PathBuf,
        #[serde(default = "default_true")]
        append: bool,
        #[serde(default = "default_true")]
        immediate_flush: bool,
    },
    RollingFile {
        path: PathBuf,
        #[serde(default)]
        strategy: TriggeringStrategy,
        #[serde(default)]
        window: FixedWindowPolicy,
    },
    Syslog(SyslogConfig),
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SyslogConfig {
    #[serde(default = "default_host")]
    pub host: String,
    #[serde(default = "default_port")]
    pub port: u16,
    #[serde(default)]
    pub facility: Option<String>,
    #[serde(default)]
    pub transport: Transport,
    #[serde(default = "default_true")]
    pub rfc5424: bool,
    #[serde(default)]
    pub app_name: Option<String>,
    #[serde(default)]
    pub message_id: Option<String>,
    #[serde(default)]
    pub message_id_key: Option<String>,
    #[serde(default)]
    pub structured_data_id: Option<String>,
    #[serde(default = "default_enterprise_number")]
    pub enterprise_number: i64,
    #[serde(default)]
    pub mdc_included: bool,
    #[serde(default)]
    pub mdc_id: Option<String>,
    /// Milliseconds; 0 disables reconnection
    #[serde(default = "default_reconnection_delay_ms")]
    pub reconnection_delay_ms: u64,
    #[serde(default)]
    pub throwable_excluded: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum FilterConfig {
    /// Deny events below `level`
    Threshold { level: String },

    /// Match events at exactly `level`
    Level {
        level: String,
        #[serde(default = "neutral")]
        on_match: FilterReply,
        #[serde(default = "neutral")]
        on_mismatch: FilterReply,
    },

    /// Match `level >= min_level && marker && logger prefix`, each optional
    Evaluator {
        #[serde(default)]
        min_level: Option<String>,
        #[serde(default)]
        marker: Option<String>,
        #[serde(default)]
        logger_prefix: Option<String>,
        #[serde(default = "neutral")]
        on_match: FilterReply,
        #[serde(default = "neutral")]
        on_mismatch: FilterReply,
    },
}

fn default_true() -> bool {
    true
}

fn default_host() -> String {
    "localhost".to_string()
}

fn default_port() -> u16 {
    DEFAULT_PORT
}

fn default_enterprise_number() -> i64 {
    RESERVED_ENTERPRISE_NUMBER
}

fn default_reconnection_delay_ms() -> u64 {
    DEFAULT_RECONNECTION_DELAY.as_millis() as u64
}

fn neutral() -> FilterReply {
    FilterReply::Neutral
}

fn parse_level(level: &str) -> Result<LogLevel> {
    level
        .parse::<LogLevel>()
        .map_err(|message| LoggerError::config(ORIGIN, message))
}

impl ContextConfig {
    pub fn from_json_str(json: &str) -> Result<Self> {
        Ok(serde_json::from_str(json)?)
    }

    pub fn from_json_file(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let json = std::fs::read_to_string(path).map_err(|e| {
            LoggerError::io_operation("read configuration", path.display().to_string(), e)
        })?;
        Self::from_json_str(&json)
    }

    pub fn to_json_string(&self) -> Result<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    /// Wire this configuration into `context`
    ///
    /// Returns the number of appenders that started.
    pub fn configure(&self, context: &LoggerContext) -> usize {
        let status = context.status_manager();

        if let Some(ref name) = self.name {
            if let Err(e) = context.set_name(name.clone()) {
                status.add(Status::error("Could not set context name", ORIGIN).with_cause(&e));
            }
        }
        for (key, value) in &self.properties {
            context.put_property(key.clone(), value.clone());
        }

        let mut started = 0;
        for appender in &self.appenders {
            match appender.build(context) {
                Ok(shared) => {
                    context.register_appender(shared);
                    started += 1;
                }
                Err(e) => status.add(
                    Status::error(format!("Skipping appender [{}]", appender.name), ORIGIN).with_cause(&e),
                ),
            }
        }

        for logger_config in &self.loggers {
            logger_config.apply(context);
        }
        started
    }
}

impl LoggerConfig {
    fn apply(&self, context: &LoggerContext) {
        let status = context.status_manager();
        let logger = context.logger(&self.name);

        if let Some(ref level) = self.level {
            match parse_level(level) {
                Ok(level) => logger.set_level(Some(level)),
                Err(e) => status.add(
                    Status::error(format!("Ignoring level of logger [{}]", self.name), ORIGIN).with_cause(&e),
                ),
            }
        }
        logger.set_additive(self.additive);

        for reference in &self.appender_refs {
            match context.appender(reference) {
                Some(appender) => logger.add_appender(appender),
                None => status.add_error(
                    format!(
                        "Could not find an appender named [{}] referenced by logger [{}]",
                        reference, self.name
                    ),
                    ORIGIN,
                ),
            }
        }
    }
}

impl AppenderConfig {
    /// Build, attach filters and start; a failed start is an error
    fn build(&self, context: &LoggerContext) -> Result<AppenderRef> {
        let appender = self.build_appender()?;
        let shared = Arc::new(SharedAppender::from_boxed(
            self.name.clone(),
            appender,
            context.status_manager(),
        ));
        for filter in &self.filters {
            shared.add_boxed_filter(filter.build()?);
        }
        if !shared.start() {
            return Err(LoggerError::config(
                format!("appender [{}]", self.name),
                "failed to start",
            ));
        }
        Ok(shared)
    }

    fn build_appender(&self) -> Result<Box<dyn Appender>> {
        let appender: Box<dyn Appender> = match self.kind {
            AppenderKind::Console { target, colors } => {
                let mut console = ConsoleAppender::new().with_target(target).with_colors(colors);
                if self.json {
                    console = console.with_layout(JsonLayout::new());
                } else if let Some(ref pattern) = self.pattern {
                    console = console.with_pattern(pattern);
                }
                Box::new(console)
            }
            AppenderKind::File {
                ref path,
                append,
                immediate_flush,
            } => {
                let mut file = FileAppender::new(path)
                    .with_append(append)
                    .with_immediate_flush(immediate_flush);
                if self.json {
                    file = file.with_layout(JsonLayout::new());
                } else if let Some(ref pattern) = self.pattern {
                    file = file.with_pattern(pattern);
                }
                Box::new(file)
            }
            AppenderKind::RollingFile {
                ref path,
                ref strategy,
                ref window,
            } => {
                let mut rolling = RollingFileAppender::new(path)
                    .with_strategy(strategy.clone())
                    .with_window(window.clone());
                if self.json {
                    rolling = rolling.with_layout(JsonLayout::new());
                } else if let Some(ref pattern) = self.pattern {
                    rolling = rolling.with_pattern(pattern);
                }
                Box::new(rolling)
            }
            AppenderKind::Syslog(ref syslog) => {
                if self.json {
                    return Err(LoggerError::config(
                        format!("appender [{}]", self.name),
                        "syslog appenders render their own header and cannot use a JSON layout",
                    ));
                }
                Box::new(syslog.build(self.pattern.as_deref()))
            }
        };
        Ok(appender)
    }
}

impl SyslogConfig {
    fn build(&self, suffix_pattern: Option<&str>) -> SyslogAppender {
        let mut appender = SyslogAppender::new()
            .with_host(self.host.clone())
            .with_port(self.port)
            .with_transport(self.transport)
            .with_rfc5424(self.rfc5424)
            .with_enterprise_number(self.enterprise_number)
            .with_mdc_included(self.mdc_included)
            .with_reconnection_delay(Duration::from_millis(self.reconnection_delay_ms))
            .with_throwable_excluded(self.throwable_excluded);

        if let Some(ref facility) = self.facility {
            appender = appender.with_facility(facility.clone());
        }
        if let Some(ref app_name) = self.app_name {
            appender = appender.with_app_name(app_name.clone());
        }
        if let Some(ref id) = self.message_id {
            appender = appender.with_message_id(id.clone());
        }
        if let Some(ref key) = self.message_id_key {
            appender = appender.with_message_id_key(key.clone());
        }
        if let Some(ref id) = self.structured_data_id {
            appender = appender.with_structured_data_id(id.clone());
        }
        if let Some(ref id) = self.mdc_id {
            appender = appender.with_mdc_id(id.clone());
        }
        if let Some(pattern) = suffix_pattern {
            appender = appender.with_suffix_pattern(pattern);
        }
        appender
    }
}

impl FilterConfig {
    fn build(&self) -> Result<Box<dyn Filter>> {
        let filter: Box<dyn Filter> = match self {
            FilterConfig::Threshold { level } => Box::new(ThresholdFilter::new(parse_level(level)?)),
            FilterConfig::Level {
                level,
                on_match,
                on_mismatch,
            } => Box::new(
                LevelFilter::new(parse_level(level)?)
                    .with_on_match(*on_match)
                    .with_on_mismatch(*on_mismatch),
            ),
            FilterConfig::Evaluator {
                min_level,
                marker,
                logger_prefix,
                on_match,
                on_mismatch,
            } => {
                let mut evaluator = LevelMarkerEvaluator::new();
                if let Some(level) = min_level {
                    evaluator = evaluator.with_min_level(parse_level(level)?);
                }
                if let Some(marker) = marker {
                    evaluator = evaluator.with_marker(marker.clone());
                }
                if let Some(prefix) = logger_prefix {
                    evaluator = evaluator.with_logger_prefix(prefix.clone());
                }
                Box::new(
                    EvaluatorFilter::new(evaluator)
                        .with_on_match(*on_match)
                        .with_on_mismatch(*on_mismatch),
                )
            }
        };
        Ok(filter)
    }
}
