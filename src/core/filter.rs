//! Event filters
//!
//! Filters attached to an appender are consulted in attachment order. The
//! first `Deny` or `Accept` decides; if every filter is `Neutral` the event is
//! accepted.

use super::error::Result;
use super::event::LoggingEvent;
use super::log_level::LogLevel;
use super::status::{Status, StatusManager};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum FilterReply {
    Deny,
    Neutral,
    Accept,
}

pub trait Filter: Send + Sync {
    fn decide(&self, event: &LoggingEvent) -> FilterReply;

    fn name(&self) -> &str;

    /// Called once when the filter is attached to an appender
    fn attach_status(&mut self, _status: &StatusManager) {}
}

/// Ordered list of filters
#[derive(Default)]
pub struct FilterChain {
    filters: Vec<Box<dyn Filter>>,
}

impl FilterChain {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, filter: Box<dyn Filter>) {
        self.filters.push(filter);
    }

    pub fn clear(&mut self) {
        self.filters.clear();
    }

    pub fn len(&self) -> usize {
        self.filters.len()
    }

    pub fn is_empty(&self) -> bool {
        self.filters.is_empty()
    }

    /// First non-neutral reply, or `Neutral` when there is none
    pub fn decide(&self, event: &LoggingEvent) -> FilterReply {
        for filter in &self.filters {
            match filter.decide(event) {
                FilterReply::Neutral => continue,
                reply => return reply,
            }
        }
        FilterReply::Neutral
    }

    /// Whether the chain lets `event` through
    pub fn accepts(&self, event: &LoggingEvent) -> bool {
        self.decide(event) != FilterReply::Deny
    }
}

/// Fallible boolean predicate over events
pub trait EventEvaluator: Send + Sync {
    fn evaluate(&self, event: &LoggingEvent) -> Result<bool>;

    fn name(&self) -> &str;
}

/// Matches when every configured condition holds
///
/// Unset conditions always hold, so an evaluator with nothing configured
/// matches every event.
#[derive(Debug, Clone, Default)]
pub struct LevelMarkerEvaluator {
    min_level: Option<LogLevel>,
    marker: Option<String>,
    logger_prefix: Option<String>,
}

impl LevelMarkerEvaluator {
    pub fn new() -> Self {
        Self::default()
    }

    /// Require `event.level >= level`
    #[must_use]
    pub fn with_min_level(mut self, level: LogLevel) -> Self {
        self.min_level = Some(level);
        self
    }

    /// Require a marker that is or references `name`
    #[must_use]
    pub fn with_marker(mut self, name: impl Into<String>) -> Self {
        self.marker = Some(name.into());
        self
    }

    /// Require the logger name to start with `prefix`
    #[must_use]
    pub fn with_logger_prefix(mut self, prefix: impl Into<String>) -> Self {
        self.logger_prefix = Some(prefix.into());
        self
    }
}

impl EventEvaluator for LevelMarkerEvaluator {
    fn evaluate(&self, event: &LoggingEvent) -> Result<bool> {
        if self.min_level.is_some_and(|min| event.level < min) {
            return Ok(false);
        }
        if let Some(ref wanted) = self.marker {
            match event.marker {
                Some(ref marker) if marker.contains(wanted) => {}
                _ => return Ok(false),
            }
        }
        if let Some(ref prefix) = self.logger_prefix {
            if !event.logger_name.starts_with(prefix.as_str()) {
                return Ok(false);
            }
        }
        Ok(true)
    }

    fn name(&self) -> &str {
        "level-marker"
    }
}

type EvalFn = dyn Fn(&LoggingEvent) -> Result<bool> + Send + Sync;

/// Evaluator backed by a closure
pub struct FnEvaluator {
    name: String,
    func: Box<EvalFn>,
}

impl FnEvaluator {
    pub fn new<F>(name: impl Into<String>, func: F) -> Self
    where
        F: Fn(&LoggingEvent) -> Result<bool> + Send + Sync + 'static,
    {
        Self {
            name: name.into(),
            func: Box::new(func),
        }
    }
}

impl EventEvaluator for FnEvaluator {
    fn evaluate(&self, event: &LoggingEvent) -> Result<bool> {
        (self.func)(event)
    }

    fn name(&self) -> &str {
        &self.name
    }
}

/// Maps an evaluator's outcome to a reply
///
/// Evaluation errors are reported as status errors and yield `Neutral`, so a
/// broken predicate never blocks events on its own.
pub struct EvaluatorFilter {
    name: String,
    evaluator: Box<dyn EventEvaluator>,
    on_match: FilterReply,
    on_mismatch: FilterReply,
    status: Option<StatusManager>,
}

impl EvaluatorFilter {
    pub fn new(evaluator: impl EventEvaluator + 'static) -> Self {
        Self {
            name: format!("evaluator-filter[{}]", evaluator.name()),
            evaluator: Box::new(evaluator),
            on_match: FilterReply::Neutral,
            on_mismatch: FilterReply::Neutral,
            status: None,
        }
    }

    #[must_use]
    pub fn with_on_match(mut self, reply: FilterReply) -> Self {
        self.on_match = reply;
        self
    }

    #[must_use]
    pub fn with_on_mismatch(mut self, reply: FilterReply) -> Self {
        self.on_mismatch = reply;
        self
    }
}

impl Filter for EvaluatorFilter {
    fn decide(&self, event: &LoggingEvent) -> FilterReply {
        match self.evaluator.evaluate(event) {
            Ok(true) => self.on_match,
            Ok(false) => self.on_mismatch,
            Err(e) => {
                if let Some(ref status) = self.status {
                    status.add(
                        Status::error(
                            format!("Exception thrown for evaluator named [{}]", self.evaluator.name()),
                            self.name.clone(),
                        )
                        .with_cause(&e),
                    );
                }
                FilterReply::Neutral
            }
        }
    }

    fn name(&self) -> &str {
        &self.name
    }

    fn attach_status(&mut self, status: &StatusManager) {
        self.status = Some(status.clone());
    }
}

/// Matches events at exactly one level
#[derive(Debug, Clone)]
pub struct LevelFilter {
    level: LogLevel,
    on_match: FilterReply,
    on_mismatch: FilterReply,
}

impl LevelFilter {
    pub fn new(level: LogLevel) -> Self {
        Self {
            level,
            on_match: FilterReply::Neutral,
            on_mismatch: FilterReply::Neutral,
        }
    }

    #[must_use]
    pub fn with_on_match(mut self, reply: FilterReply) -> Self {
        self.on_match = reply;
        self
    }

    #[must_use]
    pub fn with_on_mismatch(mut self, reply: FilterReply) -> Self {
        self.on_mismatch = reply;
        self
    }
}

impl Filter for LevelFilter {
    fn decide(&self, event: &LoggingEvent) -> FilterReply {
        if event.level == self.level {
            self.on_match
        } else {
            self.on_mismatch
        }
    }

    fn name(&self) -> &str {
        "level-filter"
    }
}

/// Denies events below a threshold and stays neutral otherwise
#[derive(Debug, Clone)]
pub struct ThresholdFilter {
    threshold: LogLevel,
}

impl ThresholdFilter {
    pub fn new(threshold: LogLevel) -> Self {
        Self { threshold }
    }
}

impl Filter for ThresholdFilter {
    fn decide(&self, event: &LoggingEvent) -> FilterReply {
        if event.level < self.threshold {
            FilterReply::Deny
        } else {
            FilterReply::Neutral
        }
    }

    fn name(&self) -> &str {
        "threshold-filter"
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::context::ContextView;
    use crate::core::event::Marker;
    use crate::core::LoggerError;

    struct Fixed(FilterReply);

    impl Filter for Fixed {
        fn decide(&self, _event: &LoggingEvent) -> FilterReply {
            self.0
        }

        fn name(&self) -> &str {
            "fixed"
        }
    }

    fn event(level: LogLevel) -> LoggingEvent {
        LoggingEvent::new("com.acme.billing", level, "msg", Vec::new(), ContextView::default())
    }

    fn chain(replies: &[FilterReply]) -> FilterChain {
        let mut chain = FilterChain::new();
        for reply in replies {
            chain.push(Box::new(Fixed(*reply)));
        }
        chain
    }

    #[test]
    fn test_first_non_neutral_wins() {
        use FilterReply::*;
        let e = event(LogLevel::Info);
        assert_eq!(chain(&[Neutral, Neutral, Deny]).decide(&e), Deny);
        assert_eq!(chain(&[Neutral, Accept, Deny]).decide(&e), Accept);
        assert_eq!(chain(&[Neutral, Neutral]).decide(&e), Neutral);
        assert!(chain(&[Neutral, Neutral]).accepts(&e));
        assert!(chain(&[]).accepts(&e));
    }

    #[test]
    fn test_level_marker_evaluator() {
        let evaluator = LevelMarkerEvaluator::new()
            .with_min_level(LogLevel::Warn)
            .with_marker("AUDIT")
            .with_logger_prefix("com.acme");

        let hit = event(LogLevel::Error).with_marker(Marker::new("AUDIT"));
        assert!(evaluator.evaluate(&hit).unwrap());

        let low = event(LogLevel::Info).with_marker(Marker::new("AUDIT"));
        assert!(!evaluator.evaluate(&low).unwrap());

        let unmarked = event(LogLevel::Error);
        assert!(!evaluator.evaluate(&unmarked).unwrap());
    }

    #[test]
    fn test_evaluator_filter_maps_outcomes() {
        let filter = EvaluatorFilter::new(LevelMarkerEvaluator::new().with_min_level(LogLevel::Warn))
            .with_on_match(FilterReply::Accept)
            .with_on_mismatch(FilterReply::Deny);

        assert_eq!(filter.decide(&event(LogLevel::Error)), FilterReply::Accept);
        assert_eq!(filter.decide(&event(LogLevel::Debug)), FilterReply::Deny);
    }

    #[test]
    fn test_evaluator_error_is_neutral_and_reported() {
        let status = StatusManager::new();
        let failing = FnEvaluator::new("failing", |_| Err(LoggerError::evaluation("failing", "boom")));
        let mut filter = EvaluatorFilter::new(failing).with_on_match(FilterReply::Deny);
        filter.attach_status(&status);

        assert_eq!(filter.decide(&event(LogLevel::Info)), FilterReply::Neutral);
        assert!(status.contains("Exception thrown for evaluator named [failing]"));
        assert_eq!(status.level(), crate::core::StatusLevel::Error);
    }

    #[test]
    fn test_fn_evaluator() {
        let filter = EvaluatorFilter::new(FnEvaluator::new("has-args", |e| Ok(!e.args.is_empty())))
            .with_on_mismatch(FilterReply::Deny);
        assert_eq!(filter.decide(&event(LogLevel::Info)), FilterReply::Deny);
    }

    #[test]
    fn test_level_and_threshold_filters() {
        let level = LevelFilter::new(LogLevel::Warn)
            .with_on_match(FilterReply::Accept)
            .with_on_mismatch(FilterReply::Deny);
        assert_eq!(level.decide(&event(LogLevel::Warn)), FilterReply::Accept);
        assert_eq!(level.decide(&event(LogLevel::Error)), FilterReply::Deny);

        let threshold = ThresholdFilter::new(LogLevel::Info);
        assert_eq!(threshold.decide(&event(LogLevel::Debug)), FilterReply::Deny);
        assert_eq!(threshold.decide(&event(LogLevel::Info)), FilterReply::Neutral);
    }
}
