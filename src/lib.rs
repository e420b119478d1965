//! # hierlog
//!
//! Hierarchical structured logging: named loggers in a dotted tree, level
//! inheritance, filter chains, pattern layouts compiled once into converter
//! chains, and appenders for the console, plain and rolling files, and remote
//! syslog daemons over UDP or a reconnecting TCP stream.
//!
//! ## Features
//!
//! - **Logger hierarchy**: `a.b.c` inherits its level from the nearest
//!   ancestor with one; effective levels are cached and refreshed on change
//! - **Pattern layouts**: `%d{HH:mm:ss.SSS} [%thread] %-5level %logger{36} - %msg%n`
//! - **Syslog**: RFC 3164 and RFC 5424 headers, structured data, background
//!   reconnection that never blocks the logging thread
//! - **Status channel**: the framework's own problems are recorded, never
//!   raised into application code
//!
//! ```
//! use hierlog::prelude::*;
//!
//! let context = LoggerContext::new();
//! let console = ConsoleAppender::new().with_pattern("%-5level %logger - %msg%n");
//! let appender = context.build_appender("CONSOLE", console);
//! context.root_logger().add_appender(appender);
//!
//! let logger = context.logger("app.http");
//! logger.info("listening");
//! hierlog::warn!(logger, "slow request took {} ms", 1250);
//! ```

pub mod appenders;
pub mod config;
pub mod core;
pub mod layout;
pub mod macros;
pub mod pattern;

pub mod prelude {
    pub use crate::appenders::{
        ConsoleAppender, ConsoleTarget, FileAppender, RollingFileAppender, SyslogAppender, Transport,
        TriggeringStrategy,
    };
    pub use crate::config::ContextConfig;
    pub use crate::core::{
        Appender, AppenderRef, Filter, FilterReply, LifeCycle, LogLevel, Logger, LoggerContext, LoggerError,
        LoggingEvent, Marker, Mdc, Result, StatusManager, StructuredData, ThresholdFilter,
    };
    pub use crate::layout::{JsonLayout, Layout, PatternLayout};
}

pub use appenders::{ConsoleAppender, FileAppender, RollingFileAppender, SyslogAppender};
pub use config::ContextConfig;
pub use self::core::{
    Appender, AppenderRef, LifeCycle, LogLevel, Logger, LoggerContext, LoggerError, LoggingEvent, Mdc, Result,
    StatusManager,
};
pub use layout::{JsonLayout, Layout, PatternLayout};
