//! Pattern layout

use super::Layout;
use crate::core::{LifeCycle, LoggerError, LoggingEvent, Result};
use crate::pattern::{ConverterChain, ConverterFactory};
use std::collections::HashMap;

pub const DEFAULT_PATTERN: &str = "%d{HH:mm:ss.SSS} [%thread] %-5level %logger{36} - %msg%n";

/// Layout driven by a conversion pattern
///
/// The pattern is compiled once by `start`; a pattern that fails to compile
/// leaves the layout stopped.
///
/// # Example
///
/// ```
/// use hierlog::core::{ContextView, LifeCycle, LogLevel, LoggingEvent};
/// use hierlog::layout::{Layout, PatternLayout};
///
/// let mut layout = PatternLayout::new("%-5level %msg%n");
/// layout.start().unwrap();
///
/// let event = LoggingEvent::new("app", LogLevel::Info, "hi", Vec::new(), ContextView::default());
/// assert_eq!(layout.do_layout(&event).unwrap(), "INFO  hi\n");
/// ```
pub struct PatternLayout {
    pattern: String,
    overrides: HashMap<String, ConverterFactory>,
    append_throwable: bool,
    chain: Option<ConverterChain>,
}

impl PatternLayout {
    pub fn new(pattern: impl Into<String>) -> Self {
        Self {
            pattern: pattern.into(),
            overrides: HashMap::new(),
            append_throwable: true,
            chain: None,
        }
    }

    /// Register a converter for this layout only, shadowing any built-in
    /// keyword of the same name
    #[must_use]
    pub fn with_converter(mut self, keyword: impl Into<String>, factory: ConverterFactory) -> Self {
        self.overrides.insert(keyword.into(), factory);
        self
    }

    /// Whether an exception converter is added when the pattern has none
    #[must_use]
    pub fn with_throwable_appended(mut self, append: bool) -> Self {
        self.append_throwable = append;
        self
    }

    pub fn pattern(&self) -> &str {
        &self.pattern
    }

    /// Render into an existing buffer
    pub fn layout_into(&self, event: &LoggingEvent, out: &mut String) -> Result<()> {
        let chain = self
            .chain
            .as_ref()
            .ok_or_else(|| LoggerError::NotStarted(format!("PatternLayout \"{}\"", self.pattern)))?;
        chain.render_into(event, out)
    }
}

impl Default for PatternLayout {
    fn default() -> Self {
        Self::new(DEFAULT_PATTERN)
    }
}

impl LifeCycle for PatternLayout {
    fn start(&mut self) -> Result<()> {
        if self.pattern.is_empty() {
            return Err(LoggerError::config("PatternLayout", "empty or null pattern"));
        }
        let mut chain = ConverterChain::compile(&self.pattern, &self.overrides)?;
        if self.append_throwable {
            chain.ensure_throwable_handling();
        }
        self.chain = Some(chain);
        Ok(())
    }

    fn stop(&mut self) {
        self.chain = None;
    }

    fn is_started(&self) -> bool {
        self.chain.is_some()
    }
}

impl Layout for PatternLayout {
    fn do_layout(&self, event: &LoggingEvent) -> Result<String> {
        let mut out = String::with_capacity(128);
        self.layout_into(event, &mut out)?;
        Ok(out)
    }
}
