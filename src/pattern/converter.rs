//! Converters: one per directive, each rendering one piece of an event

use super::date::{CachingDateFormatter, TimeZoneSpec, DEFAULT_DATE_PATTERN};
use crate::core::{LoggerError, LoggingEvent, Result, ThrowableProxy};
use std::fmt::Write as _;

/// Renders one piece of an event into `out`
///
/// Converters are built once when a layout starts and shared by every call
/// afterwards, so `convert` takes `&self`; any cache lives behind a lock.
pub trait Converter: Send + Sync {
    fn convert(&self, event: &LoggingEvent, out: &mut String) -> Result<()>;

    /// Whether this converter renders the event's exception chain itself
    fn handles_throwable(&self) -> bool {
        false
    }
}

/// Builds a converter from the directive's options
pub type ConverterFactory = fn(&[String]) -> Result<Box<dyn Converter>>;

pub struct LiteralConverter(pub String);

impl Converter for LiteralConverter {
    fn convert(&self, _event: &LoggingEvent, out: &mut String) -> Result<()> {
        out.push_str(&self.0);
        Ok(())
    }
}

/// `%d{pattern, zone}`
pub struct DateConverter {
    formatter: CachingDateFormatter,
}

impl DateConverter {
    pub fn create(options: &[String]) -> Result<Box<dyn Converter>> {
        let pattern = options.first().map(String::as_str).unwrap_or(DEFAULT_DATE_PATTERN);
        let zone = match options.get(1) {
            Some(zone) => TimeZoneSpec::parse(zone)?,
            None => TimeZoneSpec::Local,
        };
        Ok(Box::new(Self {
            formatter: CachingDateFormatter::new(pattern, zone)?,
        }))
    }
}

impl Converter for DateConverter {
    fn convert(&self, event: &LoggingEvent, out: &mut String) -> Result<()> {
        out.push_str(&self.formatter.format(&event.timestamp));
        Ok(())
    }
}

/// `%r`: milliseconds since the context was created
pub struct RelativeTimeConverter;

impl Converter for RelativeTimeConverter {
    fn convert(&self, event: &LoggingEvent, out: &mut String) -> Result<()> {
        let elapsed = event.timestamp - event.context.birth_time;
        write!(out, "{}", elapsed.num_milliseconds()).map_err(fmt_error)
    }
}

pub struct ThreadConverter;

impl Converter for ThreadConverter {
    fn convert(&self, event: &LoggingEvent, out: &mut String) -> Result<()> {
        out.push_str(&event.thread_name);
        Ok(())
    }
}

pub struct LevelConverter;

impl Converter for LevelConverter {
    fn convert(&self, event: &LoggingEvent, out: &mut String) -> Result<()> {
        out.push_str(event.level.to_str());
        Ok(())
    }
}

/// `%logger{length}`
pub struct LoggerConverter {
    target: Option<usize>,
}

impl LoggerConverter {
    pub fn create(options: &[String]) -> Result<Box<dyn Converter>> {
        let target = match options.first() {
            Some(text) => Some(text.trim().parse::<usize>().map_err(|_| {
                LoggerError::config("logger converter", format!("'{}' is not a valid length", text))
            })?),
            None => None,
        };
        Ok(Box::new(Self { target }))
    }
}

impl Converter for LoggerConverter {
    fn convert(&self, event: &LoggingEvent, out: &mut String) -> Result<()> {
        match self.target {
            Some(target) => out.push_str(&abbreviate(&event.logger_name, target)),
            None => out.push_str(&event.logger_name),
        }
        Ok(())
    }
}

/// Shorten a dotted name towards `target` characters
///
/// Leading segments are cut to their first letter, left to right, until the
/// name fits. The last segment is always kept whole; a target of zero keeps
/// only the last segment.
///
/// ```
/// use hierlog::pattern::abbreviate;
///
/// assert_eq!(abbreviate("mainPackage.sub.sample.Bar", 16), "m.s.sample.Bar");
/// assert_eq!(abbreviate("mainPackage.sub.sample.Bar", 0), "Bar");
/// ```
pub fn abbreviate(name: &str, target: usize) -> String {
    if target == 0 {
        return name.rsplit('.').next().unwrap_or(name).to_string();
    }
    if name.len() <= target {
        return name.to_string();
    }

    let segments: Vec<&str> = name.split('.').collect();
    let mut length = name.len();
    let mut out = String::with_capacity(target);
    for (i, segment) in segments.iter().enumerate() {
        let is_last = i + 1 == segments.len();
        if !is_last && length > target {
            if let Some(first) = segment.chars().next() {
                out.push(first);
                length -= segment.len() - first.len_utf8();
            }
        } else {
            out.push_str(segment);
        }
        if !is_last {
            out.push('.');
        }
    }
    out
}

/// `%msg`: the message with arguments substituted
pub struct MessageConverter;

impl Converter for MessageConverter {
    fn convert(&self, event: &LoggingEvent, out: &mut String) -> Result<()> {
        out.push_str(&event.formatted_message);
        Ok(())
    }
}

pub struct LineSeparatorConverter;

impl Converter for LineSeparatorConverter {
    fn convert(&self, _event: &LoggingEvent, out: &mut String) -> Result<()> {
        out.push('\n');
        Ok(())
    }
}

/// `%X{key:-default}`, or every entry when no key is given
pub struct MdcConverter {
    key: Option<String>,
    default: String,
}

impl MdcConverter {
    pub fn create(options: &[String]) -> Result<Box<dyn Converter>> {
        let (key, default) = match options.first() {
            Some(option) => match option.split_once(":-") {
                Some((key, default)) => (Some(key.to_string()), default.to_string()),
                None => (Some(option.clone()), String::new()),
            },
            None => (None, String::new()),
        };
        Ok(Box::new(Self { key, default }))
    }
}

impl Converter for MdcConverter {
    fn convert(&self, event: &LoggingEvent, out: &mut String) -> Result<()> {
        match self.key {
            Some(ref key) => match event.mdc.get(key) {
                Some(value) => out.push_str(value),
                None => out.push_str(&self.default),
            },
            None => {
                for (i, (key, value)) in event.mdc.iter().enumerate() {
                    if i > 0 {
                        out.push_str(", ");
                    }
                    write!(out, "{}={}", key, value).map_err(fmt_error)?;
                }
            }
        }
        Ok(())
    }
}

pub struct MarkerConverter;

impl Converter for MarkerConverter {
    fn convert(&self, event: &LoggingEvent, out: &mut String) -> Result<()> {
        if let Some(ref marker) = event.marker {
            write!(out, "{}", marker).map_err(fmt_error)?;
        }
        Ok(())
    }
}

pub struct ContextNameConverter;

impl Converter for ContextNameConverter {
    fn convert(&self, event: &LoggingEvent, out: &mut String) -> Result<()> {
        out.push_str(event.context.name.as_deref().unwrap_or("default"));
        Ok(())
    }
}

/// `%F`, `%L` and `%module`; `?` when the caller is unknown
pub enum CallerConverter {
    File,
    Line,
    Module,
}

impl Converter for CallerConverter {
    fn convert(&self, event: &LoggingEvent, out: &mut String) -> Result<()> {
        let Some(ref caller) = event.caller else {
            out.push('?');
            return Ok(());
        };
        match self {
            CallerConverter::File => out.push_str(&caller.file),
            CallerConverter::Line => write!(out, "{}", caller.line).map_err(fmt_error)?,
            CallerConverter::Module => out.push_str(&caller.module_path),
        }
        Ok(())
    }
}

/// `%ex{depth}`: the exception chain, one line per frame
pub struct ThrowableConverter {
    max_frames: Option<usize>,
}

impl ThrowableConverter {
    pub fn full() -> Self {
        Self { max_frames: None }
    }

    pub fn create(options: &[String]) -> Result<Box<dyn Converter>> {
        let max_frames = match options.first().map(|s| s.trim()) {
            None | Some("full") => None,
            Some("short") => Some(1),
            Some(depth) => Some(depth.parse::<usize>().map_err(|_| {
                LoggerError::config("exception converter", format!("'{}' is not a valid depth", depth))
            })?),
        };
        Ok(Box::new(Self { max_frames }))
    }
}

impl Converter for ThrowableConverter {
    fn convert(&self, event: &LoggingEvent, out: &mut String) -> Result<()> {
        if let Some(ref throwable) = event.throwable {
            render_throwable(throwable, self.max_frames, out).map_err(fmt_error)?;
        }
        Ok(())
    }

    fn handles_throwable(&self) -> bool {
        true
    }
}

fn render_throwable(throwable: &ThrowableProxy, max_frames: Option<usize>, out: &mut String) -> std::fmt::Result {
    for (depth, tp) in throwable.chain().enumerate() {
        if depth > 0 {
            out.push_str("Caused by: ");
        }
        writeln!(out, "{}: {}", tp.class_name, tp.message)?;
        let limit = max_frames.unwrap_or(usize::MAX);
        for frame in tp.frames.iter().take(limit) {
            writeln!(out, "\t{}", frame)?;
        }
        if tp.frames.len() > limit {
            writeln!(out, "\t... {} more", tp.frames.len() - limit)?;
        }
    }
    Ok(())
}

/// `%nopex`: renders nothing and keeps the layout from appending the
/// exception chain
pub struct NopThrowableConverter;

impl Converter for NopThrowableConverter {
    fn convert(&self, _event: &LoggingEvent, _out: &mut String) -> Result<()> {
        Ok(())
    }

    fn handles_throwable(&self) -> bool {
        true
    }
}

fn fmt_error(_: std::fmt::Error) -> LoggerError {
    LoggerError::other("formatting into the output buffer failed")
}
