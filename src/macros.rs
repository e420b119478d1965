//! Logging macros for ergonomic log message formatting.
//!
//! These macros provide a convenient interface for logging with automatic
//! string formatting, similar to `println!` and `format!`. The level is
//! checked before the message is formatted, and the call site is recorded
//! as caller data (`%F`, `%L` and `%module` in patterns).
//!
//! # Examples
//!
//! ```
//! use hierlog::prelude::*;
//! use hierlog::info;
//!
//! let context = LoggerContext::new();
//! let logger = context.logger("server");
//!
//! // Basic logging
//! info!(logger, "Server started");
//!
//! // With format arguments
//! let port = 8080;
//! info!(logger, "Server listening on port {}", port);
//! ```

/// Log a message with automatic formatting.
///
/// # Examples
///
/// ```
/// # use hierlog::prelude::*;
/// # let logger = LoggerContext::new().logger("app");
/// use hierlog::log;
/// log!(logger, LogLevel::Info, "Simple message");
/// log!(logger, LogLevel::Error, "Error code: {}", 500);
/// ```
#[macro_export]
macro_rules! log {
    ($logger:expr, $level:expr, $($arg:tt)+) => {{
        let logger = &$logger;
        let level = $level;
        if logger.is_enabled_for(level) {
            logger
                .event(level)
                .message(format!($($arg)+))
                .location(module_path!(), file!(), line!())
                .log();
        }
    }};
}

/// Log a trace-level message.
///
/// ```
/// # use hierlog::prelude::*;
/// # let logger = LoggerContext::new().logger("app");
/// # logger.set_level(Some(LogLevel::Trace));
/// use hierlog::trace;
/// trace!(logger, "Entering function: calculate()");
/// ```
#[macro_export]
macro_rules! trace {
    ($logger:expr, $($arg:tt)+) => {
        $crate::log!($logger, $crate::core::LogLevel::Trace, $($arg)+)
    };
}

#[macro_export]
macro_rules! debug {
    ($logger:expr, $($arg:tt)+) => {
        $crate::log!($logger, $crate::core::LogLevel::Debug, $($arg)+)
    };
}

#[macro_export]
macro_rules! info {
    ($logger:expr, $($arg:tt)+) => {
        $crate::log!($logger, $crate::core::LogLevel::Info, $($arg)+)
    };
}

/// Log a warning-level message.
///
/// ```
/// # use hierlog::prelude::*;
/// # let logger = LoggerContext::new().logger("app");
/// use hierlog::warn;
/// warn!(logger, "Retry attempt {} of {}", 3, 5);
/// ```
#[macro_export]
macro_rules! warn {
    ($logger:expr, $($arg:tt)+) => {
        $crate::log!($logger, $crate::core::LogLevel::Warn, $($arg)+)
    };
}

#[macro_export]
macro_rules! error {
    ($logger:expr, $($arg:tt)+) => {
        $crate::log!($logger, $crate::core::LogLevel::Error, $($arg)+)
    };
}

#[cfg(test)]
mod tests {
    use crate::core::{Appender, LifeCycle, LogLevel, LoggerContext, LoggingEvent, Result};
    use parking_lot::Mutex;
    use std::sync::Arc;

    #[derive(Default, Clone)]
    struct Capture {
        events: Arc<Mutex<Vec<LoggingEvent>>>,
    }

    impl LifeCycle for Capture {
        fn start(&mut self) -> Result<()> {
            Ok(())
        }

        fn stop(&mut self) {}

        fn is_started(&self) -> bool {
            true
        }
    }

    impl Appender for Capture {
        fn append(&mut self, event: &LoggingEvent) -> Result<()> {
            self.events.lock().push(event.clone());
            Ok(())
        }

        fn kind(&self) -> &'static str {
            "capture"
        }
    }

    fn setup() -> (LoggerContext, Capture) {
        let context = LoggerContext::new();
        let capture = Capture::default();
        let appender = context.build_appender("CAPTURE", capture.clone());
        context.root_logger().add_appender(appender);
        (context, capture)
    }

    #[test]
    fn test_level_macros() {
        let (context, capture) = setup();
        let logger = context.logger("macros");
        logger.set_level(Some(LogLevel::Trace));

        trace!(logger, "Trace message");
        debug!(logger, "Count: {}", 5);
        info!(logger, "Items: {}", 100);
        warn!(logger, "Retry {} of {}", 1, 3);
        error!(logger, "Code: {}", 500);
        log!(logger, LogLevel::Info, "Formatted: {}", 42);

        let events = capture.events.lock();
        let levels: Vec<LogLevel> = events.iter().map(|e| e.level).collect();
        assert_eq!(
            levels,
            vec![
                LogLevel::Trace,
                LogLevel::Debug,
                LogLevel::Info,
                LogLevel::Warn,
                LogLevel::Error,
                LogLevel::Info
            ]
        );
        assert_eq!(events[3].formatted_message, "Retry 1 of 3");
    }

    #[test]
    fn test_records_call_site() {
        let (context, capture) = setup();
        let logger = context.logger("macros");
        info!(logger, "here");

        let events = capture.events.lock();
        let caller = events[0].caller.as_ref().expect("caller recorded");
        assert_eq!(caller.module_path, module_path!());
        assert!(caller.file.ends_with("macros.rs"));
    }

    #[test]
    fn test_disabled_level_skips_formatting() {
        struct Loud;
        impl std::fmt::Display for Loud {
            fn fmt(&self, _: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
                panic!("formatted a disabled message");
            }
        }

        let (context, capture) = setup();
        let logger = context.logger("quiet");
        logger.set_level(Some(LogLevel::Warn));
        debug!(logger, "{}", Loud);
        assert!(capture.events.lock().is_empty());
    }
}
