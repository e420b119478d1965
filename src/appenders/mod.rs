//! Appender implementations

pub mod console;
pub mod file;
pub mod rolling_file;
pub mod syslog;

pub use console::{ConsoleAppender, ConsoleTarget};
pub use file::FileAppender;
pub use rolling_file::{FixedWindowPolicy, RollingFileAppender, TriggeringStrategy};
pub use syslog::{Facility, SyslogAppender, Transport};

pub use crate::core::Appender;
