//! `%syslogStart` and `%SD` converters

use super::facility::Facility;
use crate::core::{LoggerError, LoggingEvent, Result, StructuredData};
use crate::pattern::{CachingDateFormatter, Converter, TimeZoneSpec};
use chrono::SecondsFormat;
use std::collections::BTreeMap;
use std::fmt::Write as _;

const NIL: &str = "-";
const UNKNOWN_HOST: &str = "UNKNOWN_LOCALHOST";

/// Reserved enterprise number: no `@number` suffix is added to element ids
pub const RESERVED_ENTERPRISE_NUMBER: i64 = -1;

pub(crate) fn local_hostname() -> String {
    hostname::get()
        .ok()
        .and_then(|name| name.into_string().ok())
        .filter(|name| !name.is_empty())
        .unwrap_or_else(|| UNKNOWN_HOST.to_string())
}

/// Split `KEY=value` options after the first bare option
fn keyed_options(options: &[String]) -> Vec<(String, String)> {
    options
        .iter()
        .filter_map(|option| option.split_once('='))
        .map(|(key, value)| (key.trim().to_ascii_uppercase(), value.trim().to_string()))
        .collect()
}

/// The first option when it is not a `KEY=value` pair
fn first_bare_option(options: &[String]) -> Option<&str> {
    options
        .first()
        .map(String::as_str)
        .filter(|option| !option.contains('='))
}

fn parse_flag(component: &str, key: &str, value: &str) -> Result<bool> {
    match value.to_ascii_lowercase().as_str() {
        "true" => Ok(true),
        "false" => Ok(false),
        _ => Err(LoggerError::config(
            component,
            format!("{} expects true or false, got '{}'", key, value),
        )),
    }
}

/// Renders the syslog header: `<PRI>` plus the RFC 3164 or RFC 5424 fields
///
/// Options: the facility name first, then `APPNAME`, `MESSAGEID`,
/// `MESSAGEID_KEY` and `RFC5424` as `KEY=value` pairs.
pub struct SyslogStartConverter {
    facility: Facility,
    rfc5424: bool,
    app_name: Option<String>,
    message_id: Option<String>,
    message_id_key: Option<String>,
    hostname: String,
    legacy_date: CachingDateFormatter,
}

impl SyslogStartConverter {
    pub fn create(options: &[String]) -> Result<Box<dyn Converter>> {
        let facility = first_bare_option(options)
            .ok_or_else(|| LoggerError::config("syslogStart", "was expecting a facility string as an option"))?
            .parse::<Facility>()?;

        let mut converter = Self {
            facility,
            rfc5424: false,
            app_name: None,
            message_id: None,
            message_id_key: None,
            hostname: local_hostname(),
            legacy_date: CachingDateFormatter::new("MMM dd HH:mm:ss", TimeZoneSpec::Local)?,
        };
        for (key, value) in keyed_options(options) {
            match key.as_str() {
                "APPNAME" => converter.app_name = Some(value),
                "MESSAGEID" => converter.message_id = Some(value),
                "MESSAGEID_KEY" => converter.message_id_key = Some(value),
                // RFC5254 is a long-standing misspelling still found in configurations
                "RFC5424" | "RFC5254" => converter.rfc5424 = parse_flag("syslogStart", &key, &value)?,
                _ => {
                    return Err(LoggerError::config(
                        "syslogStart",
                        format!("unknown option '{}'", key),
                    ))
                }
            }
        }
        Ok(Box::new(converter))
    }

    fn message_id<'a>(&'a self, event: &'a LoggingEvent) -> &'a str {
        if let Some(event_type) = event.structured_data.as_ref().and_then(|sd| sd.event_type.as_deref()) {
            return event_type;
        }
        if let Some(value) = self.message_id_key.as_ref().and_then(|key| event.mdc.get(key)) {
            return value;
        }
        if let Some(ref id) = self.message_id {
            return id;
        }
        match event.caller {
            Some(ref caller) => caller.module_name(),
            None => NIL,
        }
    }
}

impl Converter for SyslogStartConverter {
    fn convert(&self, event: &LoggingEvent, out: &mut String) -> Result<()> {
        write!(out, "<{}>", self.facility.priority(event.level))
            .map_err(|_| LoggerError::other("formatting syslog header"))?;

        if !self.rfc5424 {
            out.push_str(&self.legacy_date.format(&event.timestamp));
            out.push(' ');
            out.push_str(&self.hostname);
            out.push(' ');
            return Ok(());
        }

        let app_name = self
            .app_name
            .as_deref()
            .or(event.context.name.as_deref())
            .unwrap_or(NIL);
        out.push_str("1 ");
        out.push_str(&event.timestamp.to_rfc3339_opts(SecondsFormat::Micros, true));
        out.push(' ');
        out.push_str(&self.hostname);
        out.push(' ');
        out.push_str(app_name);
        // no PROCID
        out.push_str(" - ");
        out.push_str(self.message_id(event));
        out.push(' ');
        Ok(())
    }
}

/// Which part of the structured data a keyed `%SD{...}` renders
#[derive(Debug, Clone, PartialEq, Eq)]
enum SdKey {
    Message,
    Id,
    Type,
    Param(String),
}

impl SdKey {
    fn parse(key: &str) -> Self {
        if key.eq_ignore_ascii_case("Message") {
            SdKey::Message
        } else if key.eq_ignore_ascii_case("Id") {
            SdKey::Id
        } else if key.eq_ignore_ascii_case("Type") {
            SdKey::Type
        } else {
            SdKey::Param(key.to_string())
        }
    }
}

/// Renders RFC 5424 structured data, or one field of it
///
/// Without a key the event's structured data becomes an element
/// `[id@number key="value" ...]`, followed by an MDC element when
/// `INCLUDE_MDC=true`. With a key (`Message`, `Id`, `Type` or a parameter
/// name) only that field is rendered; `Message` substitutes `${name}` from
/// the parameters.
pub struct StructuredDataConverter {
    key: Option<SdKey>,
    full_format: bool,
    default_id: Option<String>,
    enterprise_number: i64,
    leading_space: bool,
    trailing_space: bool,
    include_mdc: bool,
    mdc_element: String,
    hide_nil: bool,
}

impl Default for StructuredDataConverter {
    fn default() -> Self {
        Self {
            key: None,
            full_format: false,
            default_id: None,
            enterprise_number: RESERVED_ENTERPRISE_NUMBER,
            leading_space: false,
            trailing_space: false,
            include_mdc: false,
            mdc_element: "mdc".to_string(),
            hide_nil: false,
        }
    }
}

impl StructuredDataConverter {
    pub fn create(options: &[String]) -> Result<Box<dyn Converter>> {
        let mut converter = Self {
            key: first_bare_option(options).map(SdKey::parse),
            ..Self::default()
        };
        for (key, value) in keyed_options(options) {
            match key.as_str() {
                "FORMAT" => converter.full_format = value.eq_ignore_ascii_case("FULL"),
                "DEFAULT_ID" => converter.default_id = Some(value).filter(|v| !v.is_empty()),
                "ENTERPRISE_NUMBER" => {
                    converter.enterprise_number = value.parse().map_err(|_| {
                        LoggerError::config("SD", format!("'{}' is not a valid enterprise number", value))
                    })?
                }
                "LEADING_SPACE" => converter.leading_space = parse_flag("SD", &key, &value)?,
                "TRAILING_SPACE" => converter.trailing_space = parse_flag("SD", &key, &value)?,
                "INCLUDE_MDC" => converter.include_mdc = parse_flag("SD", &key, &value)?,
                "MDC_ELEMENT" => converter.mdc_element = value,
                "HIDE_NIL" => converter.hide_nil = parse_flag("SD", &key, &value)?,
                _ => return Err(LoggerError::config("SD", format!("unknown option '{}'", key))),
            }
        }
        Ok(Box::new(converter))
    }

    /// Element id with the enterprise number appended when it has none
    fn element_id(&self, name: &str, enterprise_number: i64) -> String {
        if enterprise_number > 0 && !name.contains('@') {
            format!("{}@{}", name, enterprise_number)
        } else {
            name.to_string()
        }
    }

    fn render_elements(&self, event: &LoggingEvent, out: &mut String) {
        let start = out.len();
        let mut enterprise_number = self.enterprise_number;

        if let Some(ref data) = event.structured_data {
            if let Some(name) = data.id.as_deref().or(self.default_id.as_deref()) {
                if let Some(number) = name.split_once('@').and_then(|(_, n)| n.parse::<i64>().ok()) {
                    enterprise_number = number;
                }
                let id = self.element_id(name, self.enterprise_number);
                if self.leading_space {
                    out.push(' ');
                }
                if self.full_format {
                    out.push_str(data.event_type.as_deref().unwrap_or(NIL));
                    out.push(' ');
                }
                push_element(out, &id, &data.params);
                if self.full_format {
                    out.push(' ');
                    out.push_str(&self.expand_message(data, event));
                }
            }
        }

        if self.include_mdc && !event.mdc.is_empty() && enterprise_number > 0 {
            if self.leading_space && out.len() == start {
                out.push(' ');
            }
            let id = self.element_id(&self.mdc_element, enterprise_number);
            push_element(out, &id, &event.mdc);
        }

        if out.len() == start && !self.hide_nil {
            out.push_str(NIL);
        }
        if self.trailing_space {
            out.push(' ');
        }
    }

    /// Substitute `${name}` from the parameters, then the MDC when included
    fn expand_message(&self, data: &StructuredData, event: &LoggingEvent) -> String {
        let Some(ref template) = data.message else {
            return String::new();
        };
        let mut out = String::with_capacity(template.len());
        let mut rest = template.as_str();
        while let Some(open) = rest.find("${") {
            let Some(close) = rest[open + 2..].find('}') else {
                break;
            };
            let name = &rest[open + 2..open + 2 + close];
            let value = data
                .params
                .get(name)
                .or_else(|| self.include_mdc.then(|| event.mdc.get(name)).flatten());
            out.push_str(&rest[..open]);
            match value {
                Some(value) => out.push_str(value),
                None => out.push_str(&rest[open..open + 3 + close]),
            }
            rest = &rest[open + 3 + close..];
        }
        out.push_str(rest);
        out
    }
}

fn push_element(out: &mut String, id: &str, params: &BTreeMap<String, String>) {
    out.push('[');
    out.push_str(id);
    for (key, value) in params {
        out.push(' ');
        out.push_str(key);
        out.push_str("=\"");
        for c in value.chars() {
            if matches!(c, '"' | '\\' | ']') {
                out.push('\\');
            }
            out.push(c);
        }
        out.push('"');
    }
    out.push(']');
}

impl Converter for StructuredDataConverter {
    fn convert(&self, event: &LoggingEvent, out: &mut String) -> Result<()> {
        let Some(ref key) = self.key else {
            self.render_elements(event, out);
            return Ok(());
        };
        let Some(ref data) = event.structured_data else {
            return Ok(());
        };
        match key {
            SdKey::Message => out.push_str(&self.expand_message(data, event)),
            SdKey::Id => out.push_str(data.id.as_deref().unwrap_or_default()),
            SdKey::Type => out.push_str(data.event_type.as_deref().unwrap_or_default()),
            SdKey::Param(name) => out.push_str(data.params.get(name).map(String::as_str).unwrap_or_default()),
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::{CallerData, ContextView, LogLevel};

    fn opts(options: &[&str]) -> Vec<String> {
        options.iter().map(|s| s.to_string()).collect()
    }

    fn render(converter: &dyn Converter, event: &LoggingEvent) -> String {
        let mut out = String::new();
        converter.convert(event, &mut out).unwrap();
        out
    }

    fn event(level: LogLevel) -> LoggingEvent {
        LoggingEvent::new("app.Billing", level, "charged", Vec::new(), ContextView::default())
    }

    #[test]
    fn test_facility_is_mandatory() {
        assert!(SyslogStartConverter::create(&[]).is_err());
        assert!(SyslogStartConverter::create(&opts(&["APPNAME=x"])).is_err());
        assert!(matches!(
            SyslogStartConverter::create(&opts(&["SPACE"])),
            Err(LoggerError::InvalidFacility(_))
        ));
        assert!(SyslogStartConverter::create(&opts(&["MAIL", "COLOR=red"])).is_err());
    }

    #[test]
    fn test_rfc5424_header() {
        let converter =
            SyslogStartConverter::create(&opts(&["MAIL", "APPNAME=billing", "MESSAGEID=charge", "RFC5424=true"]))
                .unwrap();
        let out = render(converter.as_ref(), &event(LogLevel::Debug));
        assert!(out.starts_with("<23>1 "), "{}", out);
        assert!(out.ends_with(" billing - charge "), "{}", out);
    }

    #[test]
    fn test_rfc3164_header() {
        let converter = SyslogStartConverter::create(&opts(&["USER"])).unwrap();
        let out = render(converter.as_ref(), &event(LogLevel::Error));
        assert!(out.starts_with("<11>"));
        assert!(!out.starts_with("<11>1 "));
        // MMM dd HH:mm:ss host
        assert_eq!(out.trim_end().split(' ').count(), 4);
    }

    #[test]
    fn test_message_id_precedence() {
        let converter = SyslogStartConverter::create(&opts(&[
            "LOCAL0",
            "RFC5424=true",
            "MESSAGEID=fallback",
            "MESSAGEID_KEY=msgid",
        ]))
        .unwrap();

        let plain = event(LogLevel::Info);
        assert!(render(converter.as_ref(), &plain).ends_with(" fallback "));

        let mut from_mdc = event(LogLevel::Info);
        from_mdc.mdc.insert("msgid".into(), "from-mdc".into());
        assert!(render(converter.as_ref(), &from_mdc).ends_with(" from-mdc "));

        let typed = from_mdc.with_structured_data(StructuredData::new("audit").with_type("login"));
        assert!(render(converter.as_ref(), &typed).ends_with(" login "));

        let bare = SyslogStartConverter::create(&opts(&["LOCAL0", "RFC5424=true"])).unwrap();
        let located = event(LogLevel::Info).with_caller(CallerData::new("app::billing", "billing.rs", 3));
        assert!(render(bare.as_ref(), &located).ends_with(" - billing "));
        assert!(render(bare.as_ref(), &event(LogLevel::Info)).ends_with(" - - - "));
    }

    #[test]
    fn test_structured_data_element() {
        let converter = StructuredDataConverter::create(&opts(&["ENTERPRISE_NUMBER=32473"])).unwrap();
        let e = event(LogLevel::Info).with_structured_data(
            StructuredData::new("audit")
                .with_param("user", "al\"ice")
                .with_param("action", "x]y"),
        );
        assert_eq!(
            render(converter.as_ref(), &e),
            r#"[audit@32473 action="x\]y" user="al\"ice"]"#
        );
    }

    #[test]
    fn test_nil_and_spacing() {
        let plain = event(LogLevel::Info);

        let converter = StructuredDataConverter::create(&opts(&["TRAILING_SPACE=true"])).unwrap();
        assert_eq!(render(converter.as_ref(), &plain), "- ");

        let hidden = StructuredDataConverter::create(&opts(&["HIDE_NIL=true"])).unwrap();
        assert_eq!(render(hidden.as_ref(), &plain), "");

        let leading = StructuredDataConverter::create(&opts(&["LEADING_SPACE=true"])).unwrap();
        let e = plain.with_structured_data(StructuredData::new("id").with_param("k", "v"));
        assert_eq!(render(leading.as_ref(), &e), r#" [id k="v"]"#);
    }

    #[test]
    fn test_mdc_element_needs_enterprise_number() {
        let mut e = event(LogLevel::Info);
        e.mdc.insert("req".into(), "42".into());

        let without = StructuredDataConverter::create(&opts(&["INCLUDE_MDC=true"])).unwrap();
        assert_eq!(render(without.as_ref(), &e), "-");

        let with = StructuredDataConverter::create(&opts(&[
            "INCLUDE_MDC=true",
            "ENTERPRISE_NUMBER=18060",
            "MDC_ELEMENT=ctx",
        ]))
        .unwrap();
        assert_eq!(render(with.as_ref(), &e), r#"[ctx@18060 req="42"]"#);
    }

    #[test]
    fn test_full_format_and_keys() {
        let data = StructuredData::new("audit")
            .with_type("login")
            .with_message("Hello, ${name}")
            .with_param("name", "John");
        let e = event(LogLevel::Info).with_structured_data(data);

        let full = StructuredDataConverter::create(&opts(&["FORMAT=FULL"])).unwrap();
        assert_eq!(render(full.as_ref(), &e), r#"login [audit name="John"] Hello, John"#);

        let message = StructuredDataConverter::create(&opts(&["Message"])).unwrap();
        assert_eq!(render(message.as_ref(), &e), "Hello, John");

        let kind = StructuredDataConverter::create(&opts(&["Type"])).unwrap();
        assert_eq!(render(kind.as_ref(), &e), "login");

        let param = StructuredDataConverter::create(&opts(&["name"])).unwrap();
        assert_eq!(render(param.as_ref(), &e), "John");

        // keyed converters render nothing without structured data
        assert_eq!(render(message.as_ref(), &event(LogLevel::Info)), "");
    }

    #[test]
    fn test_default_id_and_unresolved_placeholder() {
        let converter = StructuredDataConverter::create(&opts(&["DEFAULT_ID=app", "FORMAT=FULL"])).unwrap();
        let mut data = StructuredData::new("ignored").with_message("${missing} ok");
        data.id = None;
        let e = event(LogLevel::Info).with_structured_data(data);
        assert_eq!(render(converter.as_ref(), &e), "- [app] ${missing} ok");
    }
}
