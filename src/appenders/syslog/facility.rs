//! Syslog facilities and transports

use crate::core::{LogLevel, LoggerError};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Syslog facility, RFC 5424 section 6.2.1
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub enum Facility {
    /// kernel messages
    Kern = 0,
    /// random user-level messages
    User = 1,
    /// mail system
    Mail = 2,
    /// system daemons
    Daemon = 3,
    /// security/authorization messages
    Auth = 4,
    /// messages generated internally by syslogd
    Syslog = 5,
    /// line printer subsystem
    Lpr = 6,
    /// network news subsystem
    News = 7,
    /// UUCP subsystem
    Uucp = 8,
    /// clock daemon
    Cron = 9,
    /// security/authorization messages (private)
    AuthPriv = 10,
    /// ftp daemon
    Ftp = 11,
    /// NTP subsystem
    Ntp = 12,
    /// log audit
    Audit = 13,
    /// log alert
    Alert = 14,
    /// clock daemon (note 2)
    Clock = 15,
    Local0 = 16,
    Local1 = 17,
    Local2 = 18,
    Local3 = 19,
    Local4 = 20,
    Local5 = 21,
    Local6 = 22,
    Local7 = 23,
}

const FACILITY_NAMES: [(&str, Facility); 24] = [
    ("KERN", Facility::Kern),
    ("USER", Facility::User),
    ("MAIL", Facility::Mail),
    ("DAEMON", Facility::Daemon),
    ("AUTH", Facility::Auth),
    ("SYSLOG", Facility::Syslog),
    ("LPR", Facility::Lpr),
    ("NEWS", Facility::News),
    ("UUCP", Facility::Uucp),
    ("CRON", Facility::Cron),
    ("AUTHPRIV", Facility::AuthPriv),
    ("FTP", Facility::Ftp),
    ("NTP", Facility::Ntp),
    ("AUDIT", Facility::Audit),
    ("ALERT", Facility::Alert),
    ("CLOCK", Facility::Clock),
    ("LOCAL0", Facility::Local0),
    ("LOCAL1", Facility::Local1),
    ("LOCAL2", Facility::Local2),
    ("LOCAL3", Facility::Local3),
    ("LOCAL4", Facility::Local4),
    ("LOCAL5", Facility::Local5),
    ("LOCAL6", Facility::Local6),
    ("LOCAL7", Facility::Local7),
];

impl Facility {
    pub fn code(self) -> u8 {
        self as u8
    }

    pub fn name(self) -> &'static str {
        FACILITY_NAMES[self as usize].0
    }

    /// PRI value of an event at `level`: facility * 8 + severity
    pub fn priority(self, level: LogLevel) -> u8 {
        self.code() * 8 + level.to_syslog_severity()
    }
}

impl FromStr for Facility {
    type Err = LoggerError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let wanted = s.trim();
        FACILITY_NAMES
            .iter()
            .find(|(name, _)| name.eq_ignore_ascii_case(wanted))
            .map(|(_, facility)| *facility)
            .ok_or_else(|| LoggerError::InvalidFacility(s.to_string()))
    }
}

impl TryFrom<String> for Facility {
    type Error = LoggerError;

    fn try_from(s: String) -> Result<Self, Self::Error> {
        s.parse()
    }
}

impl From<Facility> for String {
    fn from(facility: Facility) -> Self {
        facility.name().to_string()
    }
}

impl fmt::Display for Facility {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.pad(self.name())
    }
}

/// How messages reach the syslog daemon
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub enum Transport {
    /// One datagram per message
    #[default]
    Udp,
    /// Persistent stream, messages framed with their octet count
    Tcp,
}

impl FromStr for Transport {
    type Err = LoggerError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_uppercase().as_str() {
            "UDP" => Ok(Transport::Udp),
            "TCP" => Ok(Transport::Tcp),
            _ => Err(LoggerError::InvalidTransport(s.to_string())),
        }
    }
}

impl TryFrom<String> for Transport {
    type Error = LoggerError;

    fn try_from(s: String) -> Result<Self, Self::Error> {
        s.parse()
    }
}

impl From<Transport> for String {
    fn from(transport: Transport) -> Self {
        transport.to_string()
    }
}

impl fmt::Display for Transport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.pad(match self {
            Transport::Udp => "UDP",
            Transport::Tcp => "TCP",
        })
    }
}
