//! JSON lines layout

use super::Layout;
use crate::core::{LifeCycle, LoggingEvent, Result};
use serde::Serialize;
use std::collections::BTreeMap;

/// Borrowed view of an event in the shape it is serialized
#[derive(Serialize)]
struct JsonRecord<'a> {
    timestamp: i64,
    level: &'static str,
    logger: &'a str,
    thread: &'a str,
    message: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    context: Option<&'a str>,
    #[serde(skip_serializing_if = "is_empty")]
    mdc: &'a BTreeMap<String, String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    marker: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    caller: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    exception: Option<String>,
}

fn is_empty(map: &&BTreeMap<String, String>) -> bool {
    map.is_empty()
}

/// Writes each event as a single-line JSON object (JSONL)
///
/// Compatible with log aggregation tools like ELK or Loki.
#[derive(Default)]
pub struct JsonLayout {
    pretty: bool,
    started: bool,
}

impl JsonLayout {
    pub fn new() -> Self {
        Self::default()
    }

    /// Pretty-print each object; the output is no longer one line per event
    #[must_use]
    pub fn with_pretty(mut self, pretty: bool) -> Self {
        self.pretty = pretty;
        self
    }
}

impl LifeCycle for JsonLayout {
    fn start(&mut self) -> Result<()> {
        self.started = true;
        Ok(())
    }

    fn stop(&mut self) {
        self.started = false;
    }

    fn is_started(&self) -> bool {
        self.started
    }
}

impl Layout for JsonLayout {
    fn do_layout(&self, event: &LoggingEvent) -> Result<String> {
        let record = JsonRecord {
            timestamp: event.timestamp_millis(),
            level: event.level.to_str(),
            logger: &event.logger_name,
            thread: &event.thread_name,
            message: &event.formatted_message,
            context: event.context.name.as_deref(),
            mdc: &event.mdc,
            marker: event.marker.as_ref().map(|m| m.to_string()),
            caller: event
                .caller
                .as_ref()
                .map(|c| format!("{}({}:{})", c.module_path, c.file, c.line)),
            exception: event.throwable.as_ref().map(|t| t.to_string()),
        };

        let mut json = if self.pretty {
            serde_json::to_string_pretty(&record)?
        } else {
            serde_json::to_string(&record)?
        };
        json.push('\n');
        Ok(json)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::{ContextView, LogLevel, Marker};

    #[test]
    fn test_one_object_per_line() {
        let layout = JsonLayout::new();
        let mut event = LoggingEvent::new(
            "app.db",
            LogLevel::Error,
            "query took {} ms",
            vec!["12".to_string()],
            ContextView::default(),
        )
        .with_marker(Marker::new("SLOW"));
        event.mdc.insert("user_id".into(), "123".into());

        let line = layout.do_layout(&event).unwrap();
        assert!(line.ends_with('\n'));
        assert_eq!(line.matches('\n').count(), 1);

        let parsed: serde_json::Value = serde_json::from_str(line.trim_end()).unwrap();
        assert_eq!(parsed["message"], "query took 12 ms");
        assert_eq!(parsed["level"], "ERROR");
        assert_eq!(parsed["logger"], "app.db");
        assert_eq!(parsed["mdc"]["user_id"], "123");
        assert_eq!(parsed["marker"], "SLOW");
        assert!(parsed.get("exception").is_none());
    }
}
