//! Console appender implementation

use crate::core::{Appender, LifeCycle, LoggingEvent, Result};
use crate::layout::{Layout, PatternLayout};
use serde::{Deserialize, Serialize};
use std::io::Write;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ConsoleTarget {
    #[default]
    Stdout,
    Stderr,
}

pub struct ConsoleAppender {
    target: ConsoleTarget,
    use_colors: bool,
    layout: Box<dyn Layout>,
    started: bool,
}

impl ConsoleAppender {
    pub fn new() -> Self {
        Self {
            target: ConsoleTarget::Stdout,
            use_colors: true,
            layout: Box::new(PatternLayout::default()),
            started: false,
        }
    }

    #[must_use]
    pub fn with_target(mut self, target: ConsoleTarget) -> Self {
        self.target = target;
        self
    }

    /// Colour each line by level (needs the `console` feature)
    #[must_use]
    pub fn with_colors(mut self, use_colors: bool) -> Self {
        self.use_colors = use_colors;
        self
    }

    /// Set the layout for this appender
    ///
    /// # Example
    ///
    /// ```
    /// use hierlog::appenders::ConsoleAppender;
    /// use hierlog::layout::JsonLayout;
    ///
    /// let appender = ConsoleAppender::new().with_layout(JsonLayout::new());
    /// ```
    #[must_use]
    pub fn with_layout(mut self, layout: impl Layout + 'static) -> Self {
        self.layout = Box::new(layout);
        self
    }

    #[must_use]
    pub fn with_pattern(self, pattern: &str) -> Self {
        self.with_layout(PatternLayout::new(pattern))
    }

    #[cfg(feature = "console")]
    fn decorate(&self, event: &LoggingEvent, text: String) -> String {
        use colored::Colorize;

        if !self.use_colors {
            return text;
        }
        // keep the line break outside the escape sequence
        match text.strip_suffix('\n') {
            Some(line) => format!("{}\n", line.color(event.level.color_code())),
            None => text.color(event.level.color_code()).to_string(),
        }
    }

    #[cfg(not(feature = "console"))]
    fn decorate(&self, _event: &LoggingEvent, text: String) -> String {
        text
    }
}

impl Default for ConsoleAppender {
    fn default() -> Self {
        Self::new()
    }
}

impl LifeCycle for ConsoleAppender {
    fn start(&mut self) -> Result<()> {
        self.layout.start()?;
        self.started = true;
        Ok(())
    }

    fn stop(&mut self) {
        self.started = false;
        self.layout.stop();
    }

    fn is_started(&self) -> bool {
        self.started
    }
}

impl Appender for ConsoleAppender {
    fn append(&mut self, event: &LoggingEvent) -> Result<()> {
        let text = self.layout.do_layout(event)?;
        let output = self.decorate(event, text);

        match self.target {
            ConsoleTarget::Stdout => std::io::stdout().lock().write_all(output.as_bytes())?,
            ConsoleTarget::Stderr => std::io::stderr().lock().write_all(output.as_bytes())?,
        }
        Ok(())
    }

    fn flush(&mut self) -> Result<()> {
        match self.target {
            ConsoleTarget::Stdout => std::io::stdout().flush()?,
            ConsoleTarget::Stderr => std::io::stderr().flush()?,
        }
        Ok(())
    }

    fn kind(&self) -> &'static str {
        "console"
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::{ContextView, LogLevel, LoggerError};

    #[test]
    fn test_console_appender_lifecycle() {
        let mut appender = ConsoleAppender::new()
            .with_target(ConsoleTarget::Stderr)
            .with_colors(false)
            .with_pattern("%-5level %msg%n");
        assert!(!appender.is_started());
        appender.start().unwrap();

        let event = LoggingEvent::new("t", LogLevel::Info, "console test", Vec::new(), ContextView::default());
        appender.append(&event).unwrap();
        appender.flush().unwrap();

        appender.stop();
        assert!(!appender.is_started());
    }

    #[test]
    fn test_bad_pattern_prevents_start() {
        let mut appender = ConsoleAppender::new().with_pattern("%nope");
        assert!(matches!(appender.start(), Err(LoggerError::UnknownConverter(_))));
        assert!(!appender.is_started());
    }

    #[cfg(feature = "console")]
    #[test]
    fn test_colors_keep_line_break_outside() {
        colored::control::set_override(true);
        let appender = ConsoleAppender::new();
        let event = LoggingEvent::new("t", LogLevel::Error, "x", Vec::new(), ContextView::default());
        let out = appender.decorate(&event, "boom\n".to_string());
        assert!(out.ends_with("\u{1b}[0m\n"), "{:?}", out);
        colored::control::unset_override();
    }
}
