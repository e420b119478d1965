//! Layout assembling the syslog header and message body

use crate::core::{LifeCycle, LoggingEvent, Result};
use crate::layout::{Layout, PatternLayout};

pub const DEFAULT_SUFFIX_PATTERN: &str = "[%thread] %logger %msg";
const STRUCTURED_SUFFIX_PATTERN: &str = "%SD{Message}";

/// Header options shared by the prefix pattern
#[derive(Debug, Clone)]
pub struct SyslogHeader {
    pub facility: String,
    pub rfc5424: bool,
    pub app_name: Option<String>,
    pub message_id: Option<String>,
    pub message_id_key: Option<String>,
    pub structured_data_id: Option<String>,
    pub enterprise_number: i64,
    pub mdc_included: bool,
    pub mdc_id: String,
}

fn quoted(value: &str) -> String {
    let mut out = String::with_capacity(value.len() + 2);
    out.push('"');
    for c in value.chars() {
        if c == '"' || c == '\\' {
            out.push('\\');
        }
        out.push(c);
    }
    out.push('"');
    out
}

impl SyslogHeader {
    /// Pattern producing the header, ending with `%nopex` so the body never
    /// carries the stack trace
    pub fn prefix_pattern(&self) -> String {
        if !self.rfc5424 {
            return format!("%syslogStart{{{}}}%nopex", self.facility);
        }

        let mut start = vec![self.facility.clone(), "RFC5424=true".to_string()];
        if let Some(ref app_name) = self.app_name {
            start.push(format!("APPNAME={}", quoted(app_name)));
        }
        if let Some(ref id) = self.message_id {
            start.push(format!("MESSAGEID={}", quoted(id)));
        }
        if let Some(ref key) = self.message_id_key {
            start.push(format!("MESSAGEID_KEY={}", quoted(key)));
        }

        let mut sd = vec![
            "TRAILING_SPACE=true".to_string(),
            format!("ENTERPRISE_NUMBER={}", self.enterprise_number),
            format!("INCLUDE_MDC={}", self.mdc_included),
            format!("MDC_ELEMENT={}", quoted(&self.mdc_id)),
        ];
        if let Some(ref id) = self.structured_data_id {
            sd.push(format!("DEFAULT_ID={}", quoted(id)));
        }

        format!("%syslogStart{{{}}}%SD{{{}}}%nopex", start.join(", "), sd.join(", "))
    }
}

/// Renders `header + body`
///
/// Without an explicit suffix pattern, RFC 5424 events whose structured
/// data carries a message template use that message as body.
pub struct SyslogLayout {
    prefix: PatternLayout,
    plain: PatternLayout,
    structured: Option<PatternLayout>,
}

impl SyslogLayout {
    pub fn new(header: &SyslogHeader, suffix_pattern: Option<&str>) -> Self {
        let prefix = header.prefix_pattern();
        let structured = match suffix_pattern {
            None if header.rfc5424 => Some(PatternLayout::new(format!("{}{}", prefix, STRUCTURED_SUFFIX_PATTERN))),
            _ => None,
        };
        let suffix = suffix_pattern.unwrap_or(DEFAULT_SUFFIX_PATTERN);
        Self {
            plain: PatternLayout::new(format!("{}{}", prefix, suffix)),
            structured,
            prefix: PatternLayout::new(prefix),
        }
    }

    /// The header alone, as repeated in front of each stack frame line
    pub fn header(&self, event: &LoggingEvent) -> Result<String> {
        self.prefix.do_layout(event)
    }

    pub fn pattern(&self) -> &str {
        self.plain.pattern()
    }
}

impl LifeCycle for SyslogLayout {
    fn start(&mut self) -> Result<()> {
        self.prefix.start()?;
        self.plain.start()?;
        if let Some(ref mut structured) = self.structured {
            structured.start()?;
        }
        Ok(())
    }

    fn stop(&mut self) {
        self.prefix.stop();
        self.plain.stop();
        if let Some(ref mut structured) = self.structured {
            structured.stop();
        }
    }

    fn is_started(&self) -> bool {
        self.prefix.is_started()
            && self.plain.is_started()
            && self.structured.as_ref().map_or(true, |s| s.is_started())
    }
}

impl Layout for SyslogLayout {
    fn do_layout(&self, event: &LoggingEvent) -> Result<String> {
        let has_sd_message = event
            .structured_data
            .as_ref()
            .map_or(false, |data| data.message.is_some());
        match self.structured {
            Some(ref structured) if has_sd_message => structured.do_layout(event),
            _ => self.plain.do_layout(event),
        }
    }
}
