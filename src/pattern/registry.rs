//! Directive keyword registry and pattern compilation

use super::converter::*;
use super::format_info::FormatInfo;
use super::parser::{parse_pattern, Node};
use crate::appenders::syslog::{StructuredDataConverter, SyslogStartConverter};
use crate::core::{LoggerError, LoggingEvent, Result};
use std::collections::HashMap;
use std::sync::OnceLock;

fn boxed(converter: impl Converter + 'static) -> Result<Box<dyn Converter>> {
    Ok(Box::new(converter))
}

/// Built-in keywords and their aliases
const BUILTIN_CONVERTERS: &[(&[&str], ConverterFactory)] = &[
    (&["d", "date"], DateConverter::create),
    (&["r", "relative"], |_| boxed(RelativeTimeConverter)),
    (&["t", "thread"], |_| boxed(ThreadConverter)),
    (&["p", "le", "level"], |_| boxed(LevelConverter)),
    (&["c", "lo", "logger"], LoggerConverter::create),
    (&["m", "msg", "message"], |_| boxed(MessageConverter)),
    (&["n"], |_| boxed(LineSeparatorConverter)),
    (&["X", "mdc"], MdcConverter::create),
    (&["marker"], |_| boxed(MarkerConverter)),
    (&["cn", "contextName"], |_| boxed(ContextNameConverter)),
    (&["F", "file"], |_| boxed(CallerConverter::File)),
    (&["L", "line"], |_| boxed(CallerConverter::Line)),
    (&["module"], |_| boxed(CallerConverter::Module)),
    (&["ex", "exception", "throwable"], ThrowableConverter::create),
    (&["nopex", "nopexception"], |_| boxed(NopThrowableConverter)),
    (&["SD"], StructuredDataConverter::create),
    (&["syslogStart"], SyslogStartConverter::create),
];

/// The process-wide keyword map, built on first use
pub fn default_converters() -> &'static HashMap<&'static str, ConverterFactory> {
    static MAP: OnceLock<HashMap<&'static str, ConverterFactory>> = OnceLock::new();
    MAP.get_or_init(|| {
        let mut map = HashMap::new();
        for (keywords, factory) in BUILTIN_CONVERTERS {
            for keyword in keywords.iter() {
                map.insert(*keyword, *factory);
            }
        }
        map
    })
}

struct Compiled {
    converter: Box<dyn Converter>,
    format: Option<FormatInfo>,
}

/// A compiled pattern: converters in order, each with its width modifier
pub struct ConverterChain {
    converters: Vec<Compiled>,
}

impl std::fmt::Debug for ConverterChain {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ConverterChain")
            .field("converters", &self.converters.len())
            .finish()
    }
}

impl ConverterChain {
    /// Compile `pattern`, resolving keywords in `overrides` before the
    /// built-in registry
    pub fn compile(pattern: &str, overrides: &HashMap<String, ConverterFactory>) -> Result<Self> {
        let nodes = parse_pattern(pattern)?;
        let defaults = default_converters();
        let mut converters = Vec::with_capacity(nodes.len());

        for node in nodes {
            match node {
                Node::Literal(text) => converters.push(Compiled {
                    converter: Box::new(LiteralConverter(text)),
                    format: None,
                }),
                Node::Directive {
                    keyword,
                    format,
                    options,
                } => {
                    let factory = overrides
                        .get(&keyword)
                        .or_else(|| defaults.get(keyword.as_str()))
                        .ok_or_else(|| LoggerError::UnknownConverter(keyword.clone()))?;
                    converters.push(Compiled {
                        converter: factory(&options)?,
                        format,
                    });
                }
            }
        }
        Ok(Self { converters })
    }

    pub fn handles_throwable(&self) -> bool {
        self.converters.iter().any(|c| c.converter.handles_throwable())
    }

    /// Append a full exception converter unless one is already present
    pub fn ensure_throwable_handling(&mut self) {
        if !self.handles_throwable() {
            self.converters.push(Compiled {
                converter: Box::new(ThrowableConverter::full()),
                format: None,
            });
        }
    }

    pub fn len(&self) -> usize {
        self.converters.len()
    }

    pub fn is_empty(&self) -> bool {
        self.converters.is_empty()
    }

    pub fn render_into(&self, event: &LoggingEvent, out: &mut String) -> Result<()> {
        let mut scratch = String::new();
        for compiled in &self.converters {
            match compiled.format {
                None => compiled.converter.convert(event, out)?,
                Some(ref format) => {
                    scratch.clear();
                    compiled.converter.convert(event, &mut scratch)?;
                    format.apply(&scratch, out);
                }
            }
        }
        Ok(())
    }

    pub fn render(&self, event: &LoggingEvent) -> Result<String> {
        let mut out = String::with_capacity(128);
        self.render_into(event, &mut out)?;
        Ok(out)
    }
}
