//! Logging event structure

use super::context::ContextView;
use super::log_level::LogLevel;
use super::mdc::Mdc;
use super::throwable::ThrowableProxy;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::cell::RefCell;
use std::collections::BTreeMap;
use std::fmt;

// Thread names never change after spawn, so compute once per thread
thread_local! {
    static THREAD_NAME_CACHE: RefCell<Option<String>> = const { RefCell::new(None) };
}

fn current_thread_name() -> String {
    THREAD_NAME_CACHE.with(|cache| {
        cache
            .borrow_mut()
            .get_or_insert_with(|| {
                let thread = std::thread::current();
                match thread.name() {
                    Some(name) => name.to_string(),
                    None => format!("{:?}", thread.id()),
                }
            })
            .clone()
    })
}

/// Named tag attached to an event, optionally referencing other markers
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Marker {
    name: String,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    references: Vec<Marker>,
}

impl Marker {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            references: Vec::new(),
        }
    }

    #[must_use]
    pub fn with_reference(mut self, child: Marker) -> Self {
        self.references.push(child);
        self
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn references(&self) -> &[Marker] {
        &self.references
    }

    /// Whether this marker is `name` or references it, directly or not
    pub fn contains(&self, name: &str) -> bool {
        self.name == name || self.references.iter().any(|m| m.contains(name))
    }
}

impl fmt::Display for Marker {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.name)?;
        if !self.references.is_empty() {
            f.write_str(" [ ")?;
            for (i, child) in self.references.iter().enumerate() {
                if i > 0 {
                    f.write_str(", ")?;
                }
                write!(f, "{}", child)?;
            }
            f.write_str(" ]")?;
        }
        Ok(())
    }
}

/// RFC 5424 structured data carried by an event
///
/// `message` may reference parameters as `${name}`; the `%SD{Message}`
/// directive substitutes them when rendering.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct StructuredData {
    pub id: Option<String>,
    pub event_type: Option<String>,
    pub message: Option<String>,
    pub params: BTreeMap<String, String>,
}

impl StructuredData {
    pub fn new(id: impl Into<String>) -> Self {
        Self {
            id: Some(id.into()),
            ..Self::default()
        }
    }

    #[must_use]
    pub fn with_type(mut self, event_type: impl Into<String>) -> Self {
        self.event_type = Some(event_type.into());
        self
    }

    #[must_use]
    pub fn with_message(mut self, message: impl Into<String>) -> Self {
        self.message = Some(message.into());
        self
    }

    #[must_use]
    pub fn with_param(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.params.insert(key.into(), value.into());
        self
    }
}

/// Source location of the logging call
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CallerData {
    pub module_path: String,
    pub file: String,
    pub line: u32,
}

impl CallerData {
    pub fn new(module_path: impl Into<String>, file: impl Into<String>, line: u32) -> Self {
        Self {
            module_path: module_path.into(),
            file: file.into(),
            line,
        }
    }

    /// Last `::` segment of the module path
    pub fn module_name(&self) -> &str {
        self.module_path
            .rsplit("::")
            .next()
            .unwrap_or(&self.module_path)
    }
}

/// Snapshot of one logging call
///
/// Built once by the logger and handed by reference to every appender; never
/// mutated afterwards.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingEvent {
    pub timestamp: DateTime<Utc>,
    pub logger_name: String,
    pub level: LogLevel,
    pub message: String,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub args: Vec<String>,
    pub formatted_message: String,
    pub thread_name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub throwable: Option<ThrowableProxy>,
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub mdc: BTreeMap<String, String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub marker: Option<Marker>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub structured_data: Option<StructuredData>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub caller: Option<CallerData>,
    pub context: ContextView,
}

impl LoggingEvent {
    /// Capture a new event on the current thread
    ///
    /// The timestamp, thread name and MDC are taken now.
    pub fn new(
        logger_name: impl Into<String>,
        level: LogLevel,
        message: impl Into<String>,
        args: Vec<String>,
        context: ContextView,
    ) -> Self {
        let message = message.into();
        let formatted_message = format_message(&message, &args);
        Self {
            timestamp: Utc::now(),
            logger_name: logger_name.into(),
            level,
            message,
            args,
            formatted_message,
            thread_name: current_thread_name(),
            throwable: None,
            mdc: Mdc::snapshot(),
            marker: None,
            structured_data: None,
            caller: None,
            context,
        }
    }

    #[must_use]
    pub fn with_throwable(mut self, throwable: ThrowableProxy) -> Self {
        self.throwable = Some(throwable);
        self
    }

    #[must_use]
    pub fn with_marker(mut self, marker: Marker) -> Self {
        self.marker = Some(marker);
        self
    }

    #[must_use]
    pub fn with_structured_data(mut self, data: StructuredData) -> Self {
        self.structured_data = Some(data);
        self
    }

    #[must_use]
    pub fn with_caller(mut self, caller: CallerData) -> Self {
        self.caller = Some(caller);
        self
    }

    #[must_use]
    pub fn with_timestamp(mut self, timestamp: DateTime<Utc>) -> Self {
        self.timestamp = timestamp;
        self
    }

    pub fn timestamp_millis(&self) -> i64 {
        self.timestamp.timestamp_millis()
    }
}

/// Substitute `{}` placeholders with `args` in order
///
/// `\{}` renders a literal `{}`. Placeholders beyond the last argument are
/// left as they are.
pub fn format_message(message: &str, args: &[String]) -> String {
    if args.is_empty() || !message.contains("{}") {
        return message.to_string();
    }

    let mut out = String::with_capacity(message.len() + args.len() * 8);
    let mut next_arg = args.iter();
    let mut rest = message;
    while let Some(pos) = rest.find("{}") {
        let (head, tail) = rest.split_at(pos);
        if let Some(stripped) = head.strip_suffix('\\') {
            out.push_str(stripped);
            out.push_str("{}");
        } else {
            out.push_str(head);
            match next_arg.next() {
                Some(arg) => out.push_str(arg),
                None => out.push_str("{}"),
            }
        }
        rest = &tail[2..];
    }
    out.push_str(rest);
    out
}
