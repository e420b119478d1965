//! Syslog appender (RFC 3164 / RFC 5424 over UDP or TCP)

pub mod converters;
pub mod facility;
pub mod layout;
pub mod writer;

pub use converters::{StructuredDataConverter, SyslogStartConverter, RESERVED_ENTERPRISE_NUMBER};
pub use facility::{Facility, Transport};
pub use layout::{SyslogHeader, SyslogLayout, DEFAULT_SUFFIX_PATTERN};
pub use writer::{Connect, ConnectionState, SyslogWriter, TcpConnect, DEFAULT_RECONNECTION_DELAY, MAX_LEN};

use crate::core::{Appender, LifeCycle, LoggerError, LoggingEvent, Result, StatusManager};
use crate::layout::Layout;
use std::sync::Arc;
use std::time::Duration;

pub const DEFAULT_PORT: u16 = 514;

/// Sends events to a syslog daemon
///
/// The facility is mandatory; everything else has a default (localhost,
/// port 514, UDP, RFC 5424). An event carrying an exception produces one
/// extra message per stack frame, each starting with the event's header.
///
/// # Example
///
/// ```no_run
/// use hierlog::appenders::syslog::{SyslogAppender, Transport};
/// use hierlog::LoggerContext;
///
/// let context = LoggerContext::new();
/// let syslog = SyslogAppender::new()
///     .with_host("logs.example.com")
///     .with_facility("LOCAL0")
///     .with_transport(Transport::Tcp)
///     .with_app_name("billing");
/// let appender = context.build_appender("SYSLOG", syslog);
/// context.root_logger().add_appender(appender);
/// ```
pub struct SyslogAppender {
    host: String,
    port: u16,
    facility: Option<String>,
    transport: Transport,
    rfc5424: bool,
    app_name: Option<String>,
    message_id: Option<String>,
    message_id_key: Option<String>,
    structured_data_id: Option<String>,
    enterprise_number: i64,
    mdc_included: bool,
    mdc_id: String,
    suffix_pattern: Option<String>,
    reconnection_delay: Duration,
    throwable_excluded: bool,
    connect: Option<Arc<dyn Connect>>,
    status: StatusManager,
    layout: Option<SyslogLayout>,
    writer: Option<SyslogWriter>,
}

impl Default for SyslogAppender {
    fn default() -> Self {
        Self::new()
    }
}

impl SyslogAppender {
    pub fn new() -> Self {
        Self {
            host: "localhost".to_string(),
            port: DEFAULT_PORT,
            facility: None,
            transport: Transport::Udp,
            rfc5424: true,
            app_name: None,
            message_id: None,
            message_id_key: None,
            structured_data_id: None,
            enterprise_number: RESERVED_ENTERPRISE_NUMBER,
            mdc_included: false,
            mdc_id: "mdc".to_string(),
            suffix_pattern: None,
            reconnection_delay: DEFAULT_RECONNECTION_DELAY,
            throwable_excluded: false,
            connect: None,
            status: StatusManager::new(),
            layout: None,
            writer: None,
        }
    }

    #[must_use]
    pub fn with_host(mut self, host: impl Into<String>) -> Self {
        self.host = host.into();
        self
    }

    #[must_use]
    pub fn with_port(mut self, port: u16) -> Self {
        self.port = port;
        self
    }

    /// Facility name such as `USER` or `LOCAL3`; checked when starting
    #[must_use]
    pub fn with_facility(mut self, facility: impl Into<String>) -> Self {
        self.facility = Some(facility.into());
        self
    }

    #[must_use]
    pub fn with_transport(mut self, transport: Transport) -> Self {
        self.transport = transport;
        self
    }

    /// RFC 5424 headers when true, RFC 3164 otherwise
    #[must_use]
    pub fn with_rfc5424(mut self, rfc5424: bool) -> Self {
        self.rfc5424 = rfc5424;
        self
    }

    #[must_use]
    pub fn with_app_name(mut self, app_name: impl Into<String>) -> Self {
        self.app_name = Some(app_name.into());
        self
    }

    #[must_use]
    pub fn with_message_id(mut self, message_id: impl Into<String>) -> Self {
        self.message_id = Some(message_id.into());
        self
    }

    /// MDC key whose value becomes the MSGID when present
    #[must_use]
    pub fn with_message_id_key(mut self, key: impl Into<String>) -> Self {
        self.message_id_key = Some(key.into());
        self
    }

    /// Element id used for structured data that has none
    #[must_use]
    pub fn with_structured_data_id(mut self, id: impl Into<String>) -> Self {
        self.structured_data_id = Some(id.into());
        self
    }

    #[must_use]
    pub fn with_enterprise_number(mut self, number: i64) -> Self {
        self.enterprise_number = number;
        self
    }

    #[must_use]
    pub fn with_mdc_included(mut self, included: bool) -> Self {
        self.mdc_included = included;
        self
    }

    /// Name of the structured-data element carrying the MDC
    #[must_use]
    pub fn with_mdc_id(mut self, id: impl Into<String>) -> Self {
        self.mdc_id = id.into();
        self
    }

    /// Pattern for the message body after the header
    ///
    /// Defaults to `[%thread] %logger %msg`, with the structured-data
    /// message taking its place in RFC 5424 mode when one is present.
    #[must_use]
    pub fn with_suffix_pattern(mut self, pattern: impl Into<String>) -> Self {
        self.suffix_pattern = Some(pattern.into());
        self
    }

    /// Zero disables reconnection
    #[must_use]
    pub fn with_reconnection_delay(mut self, delay: Duration) -> Self {
        self.reconnection_delay = delay;
        self
    }

    /// Skip the per-frame messages for events carrying an exception
    #[must_use]
    pub fn with_throwable_excluded(mut self, excluded: bool) -> Self {
        self.throwable_excluded = excluded;
        self
    }

    #[must_use]
    pub fn with_connector(mut self, connect: Arc<dyn Connect>) -> Self {
        self.connect = Some(connect);
        self
    }

    /// Connection state of the writer, `None` when not started
    pub fn connection_state(&mut self) -> Option<ConnectionState> {
        self.writer.as_mut().map(SyslogWriter::state)
    }

    pub fn connector_spawns(&self) -> usize {
        self.writer.as_ref().map_or(0, SyslogWriter::connector_spawns)
    }

    fn header(&self, facility: Facility) -> SyslogHeader {
        SyslogHeader {
            facility: facility.name().to_string(),
            rfc5424: self.rfc5424,
            app_name: self.app_name.clone(),
            message_id: self.message_id.clone(),
            message_id_key: self.message_id_key.clone(),
            structured_data_id: self.structured_data_id.clone(),
            enterprise_number: self.enterprise_number,
            mdc_included: self.mdc_included,
            mdc_id: self.mdc_id.clone(),
        }
    }

    /// One message per stack frame, each prefixed with the event's header
    fn post_process(&mut self, event: &LoggingEvent) -> Result<()> {
        let (Some(throwable), Some(layout), Some(writer)) =
            (event.throwable.as_ref(), self.layout.as_ref(), self.writer.as_mut())
        else {
            return Ok(());
        };

        let prefix = layout.header(event)?;
        for proxy in throwable.chain() {
            for frame in &proxy.frames {
                let line = format!("{}\t{}", prefix, frame);
                writer.write(line.as_bytes());
                writer.flush()?;
            }
        }
        Ok(())
    }
}

impl LifeCycle for SyslogAppender {
    fn start(&mut self) -> Result<()> {
        let facility = self
            .facility
            .as_deref()
            .ok_or_else(|| LoggerError::config("SyslogAppender", "The Facility option is mandatory"))?
            .parse::<Facility>()?;

        let mut layout = SyslogLayout::new(&self.header(facility), self.suffix_pattern.as_deref());
        layout.start()?;

        let mut writer = SyslogWriter::new(self.host.clone(), self.port, self.transport, &self.status)
            .with_reconnection_delay(self.reconnection_delay);
        if let Some(ref connect) = self.connect {
            writer = writer.with_connector(Arc::clone(connect));
        }
        writer.start()?;

        self.layout = Some(layout);
        self.writer = Some(writer);
        Ok(())
    }

    fn stop(&mut self) {
        if let Some(mut writer) = self.writer.take() {
            writer.stop();
        }
        if let Some(mut layout) = self.layout.take() {
            layout.stop();
        }
    }

    fn is_started(&self) -> bool {
        self.writer.is_some()
    }
}

impl Appender for SyslogAppender {
    fn append(&mut self, event: &LoggingEvent) -> Result<()> {
        let (Some(layout), Some(writer)) = (self.layout.as_ref(), self.writer.as_mut()) else {
            return Err(LoggerError::NotStarted(format!("SyslogAppender[{}]", self.host)));
        };

        let message = layout.do_layout(event)?;
        writer.write(message.as_bytes());
        writer.flush()?;

        if !self.throwable_excluded {
            self.post_process(event)?;
        }
        Ok(())
    }

    fn kind(&self) -> &'static str {
        "syslog"
    }

    fn attach_status(&mut self, status: &StatusManager) {
        self.status = status.clone();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::{ContextView, LogLevel, StackFrame, ThrowableProxy};
    use std::net::UdpSocket;

    fn receiver() -> (UdpSocket, u16) {
        let socket = UdpSocket::bind("127.0.0.1:0").unwrap();
        socket.set_read_timeout(Some(Duration::from_secs(5))).unwrap();
        let port = socket.local_addr().unwrap().port();
        (socket, port)
    }

    fn recv(socket: &UdpSocket) -> String {
        let mut buf = [0u8; 2048];
        let (n, _) = socket.recv_from(&mut buf).unwrap();
        String::from_utf8_lossy(&buf[..n]).into_owned()
    }

    #[test]
    fn test_facility_is_mandatory() {
        let mut appender = SyslogAppender::new();
        let err = appender.start().unwrap_err();
        assert!(err.to_string().contains("The Facility option is mandatory"));
        assert!(!appender.is_started());

        let mut appender = SyslogAppender::new().with_facility("NOPE");
        assert!(matches!(appender.start(), Err(LoggerError::InvalidFacility(_))));
    }

    #[test]
    fn test_bad_suffix_pattern_fails_start() {
        let mut appender = SyslogAppender::new()
            .with_host("127.0.0.1")
            .with_facility("USER")
            .with_suffix_pattern("%nosuch");
        assert!(matches!(appender.start(), Err(LoggerError::UnknownConverter(_))));
    }

    #[test]
    fn test_append_before_start() {
        let mut appender = SyslogAppender::new().with_facility("USER");
        let event = LoggingEvent::new("a", LogLevel::Info, "x", Vec::new(), ContextView::default());
        assert!(matches!(appender.append(&event), Err(LoggerError::NotStarted(_))));
    }

    #[test]
    fn test_frames_follow_the_message() {
        let (socket, port) = receiver();
        let mut appender = SyslogAppender::new()
            .with_host("127.0.0.1")
            .with_port(port)
            .with_facility("LOCAL1")
            .with_suffix_pattern("%msg");
        appender.start().unwrap();

        let tp = ThrowableProxy::new("Boom", "bad")
            .with_frame(StackFrame::new("svc", "one", Some("svc.rs".into()), Some(1)))
            .with_frame(StackFrame::new("svc", "two", Some("svc.rs".into()), Some(2)));
        let event = LoggingEvent::new("a", LogLevel::Error, "failed", Vec::new(), ContextView::default())
            .with_throwable(tp);
        appender.append(&event).unwrap();

        let main = recv(&socket);
        let header = main.strip_suffix("failed").unwrap().to_string();
        assert!(header.starts_with("<139>1 "));
        assert_eq!(recv(&socket), format!("{}\tat svc.one(svc.rs:1)", header));
        assert_eq!(recv(&socket), format!("{}\tat svc.two(svc.rs:2)", header));

        appender.stop();
        assert!(!appender.is_started());
    }
}
