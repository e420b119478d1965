//! Pattern mini-language
//!
//! A pattern such as `%d{HH:mm:ss} [%thread] %-5level %logger{36} - %msg%n`
//! is parsed into nodes, each directive is resolved through the keyword
//! registry, and the result is a [`ConverterChain`] that renders events.

pub mod converter;
pub mod date;
pub mod format_info;
pub mod parser;
pub mod registry;
pub mod tokenizer;

pub use converter::{abbreviate, Converter, ConverterFactory, LiteralConverter, ThrowableConverter};
pub use date::{translate_date_pattern, CachingDateFormatter, TimeZoneSpec, DEFAULT_DATE_PATTERN};
pub use format_info::FormatInfo;
pub use parser::{parse_pattern, Node};
pub use registry::{default_converters, ConverterChain};
pub use tokenizer::tokenize_options;
