//! Layouts turn an event into the text an appender delivers

pub mod json;
pub mod pattern;

pub use json::JsonLayout;
pub use pattern::{PatternLayout, DEFAULT_PATTERN};

use crate::core::{LifeCycle, LoggingEvent, Result};

/// Renders events; must be started before `do_layout` is called
pub trait Layout: LifeCycle + Send {
    fn do_layout(&self, event: &LoggingEvent) -> Result<String>;
}
