//! Date patterns for `%date`
//!
//! Patterns use the familiar `yyyy-MM-dd HH:mm:ss,SSS` letters and are
//! translated once into a chrono format string.

use crate::core::{LoggerError, Result};
use chrono::{DateTime, FixedOffset, Local, Offset, Utc};
use parking_lot::Mutex;

pub const DEFAULT_DATE_PATTERN: &str = "yyyy-MM-dd HH:mm:ss,SSS";
pub const ISO8601_KEYWORD: &str = "ISO8601";

/// Translate a date pattern into a chrono format string
///
/// ```
/// use hierlog::pattern::translate_date_pattern;
///
/// assert_eq!(translate_date_pattern("HH:mm:ss.SSS").unwrap(), "%H:%M:%S.%3f");
/// assert_eq!(translate_date_pattern("'day' d").unwrap(), "day %-d");
/// ```
pub fn translate_date_pattern(pattern: &str) -> Result<String> {
    let chars: Vec<char> = pattern.chars().collect();
    let mut out = String::with_capacity(pattern.len() * 2);
    let mut i = 0;

    while i < chars.len() {
        let c = chars[i];

        if c == '\'' {
            // '' is a literal quote, otherwise copy up to the closing quote
            if chars.get(i + 1) == Some(&'\'') {
                out.push('\'');
                i += 2;
                continue;
            }
            i += 1;
            while i < chars.len() && chars[i] != '\'' {
                push_literal(&mut out, chars[i]);
                i += 1;
            }
            if i == chars.len() {
                return Err(LoggerError::config(
                    "date pattern",
                    format!("unterminated quote in '{}'", pattern),
                ));
            }
            i += 1;
            continue;
        }

        if !c.is_ascii_alphabetic() {
            push_literal(&mut out, c);
            i += 1;
            continue;
        }

        let run_start = i;
        while i < chars.len() && chars[i] == c {
            i += 1;
        }
        let count = i - run_start;
        let spec = match (c, count) {
            ('y', 2) => "%y",
            ('y', _) => "%Y",
            ('M', 1) => "%-m",
            ('M', 2) => "%m",
            ('M', 3) => "%b",
            ('M', _) => "%B",
            ('d', 1) => "%-d",
            ('d', _) => "%d",
            ('H', 1) => "%-H",
            ('H', _) => "%H",
            ('h', 1) => "%-I",
            ('h', _) => "%I",
            ('m', 1) => "%-M",
            ('m', _) => "%M",
            ('s', 1) => "%-S",
            ('s', _) => "%S",
            ('S', 1..=3) => "%3f",
            ('S', 4..=6) => "%6f",
            ('S', _) => "%9f",
            ('E', 1..=3) => "%a",
            ('E', _) => "%A",
            ('a', _) => "%p",
            ('D', _) => "%j",
            ('u', _) => "%u",
            ('w', _) => "%V",
            ('Z', _) => "%z",
            ('X', 1 | 2) => "%z",
            ('X', _) => "%:z",
            ('z', _) => "%Z",
            _ => {
                return Err(LoggerError::config(
                    "date pattern",
                    format!("illegal pattern character '{}' in '{}'", c, pattern),
                ));
            }
        };
        out.push_str(spec);
    }
    Ok(out)
}

fn push_literal(out: &mut String, c: char) {
    if c == '%' {
        out.push_str("%%");
    } else {
        out.push(c);
    }
}

/// Time zone used when rendering
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TimeZoneSpec {
    Local,
    Fixed(FixedOffset),
}

impl TimeZoneSpec {
    /// Parse `UTC`, `GMT`, `Z`, `±HH:MM` or `GMT±HH:MM`
    pub fn parse(text: &str) -> Result<Self> {
        let text = text.trim();
        let invalid = || LoggerError::config("time zone", format!("unsupported time zone '{}'", text));

        if text.eq_ignore_ascii_case("local") {
            return Ok(TimeZoneSpec::Local);
        }
        if text.eq_ignore_ascii_case("UTC") || text.eq_ignore_ascii_case("GMT") || text == "Z" {
            return Ok(TimeZoneSpec::Fixed(Utc.fix()));
        }

        let offset = text
            .strip_prefix("GMT")
            .or_else(|| text.strip_prefix("UTC"))
            .unwrap_or(text);
        let (sign, rest) = match offset.chars().next() {
            Some('+') => (1, &offset[1..]),
            Some('-') => (-1, &offset[1..]),
            _ => return Err(invalid()),
        };
        if !rest.chars().all(|c| c.is_ascii_digit() || c == ':') {
            return Err(invalid());
        }
        let (hours, minutes) = match rest.split_once(':') {
            Some((h, m)) => (h, m),
            None if rest.len() == 4 => rest.split_at(2),
            None => (rest, "0"),
        };
        let hours: i32 = hours.parse().map_err(|_| invalid())?;
        let minutes: i32 = minutes.parse().map_err(|_| invalid())?;
        let seconds = sign * (hours * 3600 + minutes * 60);
        FixedOffset::east_opt(seconds)
            .map(TimeZoneSpec::Fixed)
            .ok_or_else(invalid)
    }

    pub fn format(&self, timestamp: &DateTime<Utc>, chrono_format: &str) -> String {
        match self {
            TimeZoneSpec::Local => timestamp.with_timezone(&Local).format(chrono_format).to_string(),
            TimeZoneSpec::Fixed(offset) => timestamp.with_timezone(offset).format(chrono_format).to_string(),
        }
    }
}

/// Formats timestamps, reusing the last result within the same millisecond
pub struct CachingDateFormatter {
    chrono_format: String,
    zone: TimeZoneSpec,
    last: Mutex<Option<(i64, String)>>,
}

impl CachingDateFormatter {
    /// `pattern` uses date pattern letters; `ISO8601` selects
    /// `yyyy-MM-dd HH:mm:ss,SSS`
    pub fn new(pattern: &str, zone: TimeZoneSpec) -> Result<Self> {
        let pattern = if pattern.eq_ignore_ascii_case(ISO8601_KEYWORD) {
            DEFAULT_DATE_PATTERN
        } else {
            pattern
        };
        Ok(Self {
            chrono_format: translate_date_pattern(pattern)?,
            zone,
            last: Mutex::new(None),
        })
    }

    pub fn format(&self, timestamp: &DateTime<Utc>) -> String {
        let millis = timestamp.timestamp_millis();
        let mut last = self.last.lock();
        if let Some((cached_millis, ref text)) = *last {
            if cached_millis == millis {
                return text.clone();
            }
        }
        let text = self.zone.format(timestamp, &self.chrono_format);
        *last = Some((millis, text.clone()));
        text
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn sample() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 3, 7, 14, 5, 9).unwrap() + chrono::Duration::milliseconds(42)
    }

    #[test]
    fn test_translation() {
        assert_eq!(
            translate_date_pattern(DEFAULT_DATE_PATTERN).unwrap(),
            "%Y-%m-%d %H:%M:%S,%3f"
        );
        assert_eq!(translate_date_pattern("MMM dd").unwrap(), "%b %d");
        assert_eq!(translate_date_pattern("yyyy-MM-dd'T'HH:mm:ssXXX").unwrap(), "%Y-%m-%dT%H:%M:%S%:z");
        assert_eq!(translate_date_pattern("'100%'").unwrap(), "100%%");
        assert!(translate_date_pattern("yyyy q").is_err());
        assert!(translate_date_pattern("'open").is_err());
    }

    #[test]
    fn test_time_zones() {
        assert_eq!(TimeZoneSpec::parse("UTC").unwrap(), TimeZoneSpec::Fixed(FixedOffset::east_opt(0).unwrap()));
        assert_eq!(
            TimeZoneSpec::parse("GMT+05:30").unwrap(),
            TimeZoneSpec::Fixed(FixedOffset::east_opt(5 * 3600 + 30 * 60).unwrap())
        );
        assert_eq!(
            TimeZoneSpec::parse("-0800").unwrap(),
            TimeZoneSpec::Fixed(FixedOffset::west_opt(8 * 3600).unwrap())
        );
        assert!(TimeZoneSpec::parse("Mars/Olympus").is_err());
    }

    #[test]
    fn test_non_ascii_offset_is_rejected() {
        assert!(TimeZoneSpec::parse("+1\u{e9}2").is_err());
        assert!(TimeZoneSpec::parse("GMT-\u{665}\u{665}").is_err());
        assert!(TimeZoneSpec::parse("+1x:00").is_err());
    }

    #[test]
    fn test_formatter_renders_in_zone() {
        let formatter = CachingDateFormatter::new("yyyy-MM-dd HH:mm:ss,SSS", TimeZoneSpec::parse("UTC").unwrap()).unwrap();
        assert_eq!(formatter.format(&sample()), "2024-03-07 14:05:09,042");

        let formatter = CachingDateFormatter::new("HH:mm", TimeZoneSpec::parse("+02:00").unwrap()).unwrap();
        assert_eq!(formatter.format(&sample()), "16:05");
    }

    #[test]
    fn test_formatter_caches_same_millisecond() {
        let formatter = CachingDateFormatter::new(ISO8601_KEYWORD, TimeZoneSpec::parse("UTC").unwrap()).unwrap();
        let first = formatter.format(&sample());
        let again = formatter.format(&(sample() + chrono::Duration::microseconds(300)));
        assert_eq!(first, again);
        let later = formatter.format(&(sample() + chrono::Duration::milliseconds(1)));
        assert_ne!(first, later);
    }
}
