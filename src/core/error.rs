//! Error types for the logging framework

pub type Result<T> = std::result::Result<T, LoggerError>;

#[derive(Debug, thiserror::Error)]
pub enum LoggerError {
    /// IO error with context
    #[error("IO error while {operation}: {message}")]
    IoOperation {
        operation: String,
        message: String,
        #[source]
        source: std::io::Error,
    },

    /// Generic IO error
    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    /// JSON serialization error
    #[error("JSON error: {0}")]
    JsonError(#[from] serde_json::Error),

    /// Invalid configuration with details
    #[error("Invalid configuration for {component}: {message}")]
    InvalidConfiguration { component: String, message: String },

    /// The context already carries a name
    #[error("Context has already been given the name '{current}'")]
    ContextNameAlreadySet { current: String },

    /// Pattern could not be parsed
    #[error("Invalid pattern '{pattern}' at position {position}: {message}")]
    PatternSyntax {
        pattern: String,
        position: usize,
        message: String,
    },

    /// Pattern names a directive nobody registered
    #[error("There is no conversion registered for conversion word '{0}'")]
    UnknownConverter(String),

    /// Facility string not recognized
    #[error("'{0}' is not a valid syslog facility string")]
    InvalidFacility(String),

    /// Transport string not recognized
    #[error("Invalid transport type '{0}'")]
    InvalidTransport(String),

    /// Host name could not be resolved
    #[error("Could not resolve syslog host '{host}': {message}")]
    UnknownHost { host: String, message: String },

    /// Component used before a successful start
    #[error("{0} is not started")]
    NotStarted(String),

    /// Evaluator failed while deciding on an event
    #[error("Evaluator '{evaluator}' failed: {message}")]
    Evaluation { evaluator: String, message: String },

    /// File appender error with path
    #[error("File appender error for '{path}': {message}")]
    FileAppenderError { path: String, message: String },

    /// File rotation error
    #[error("File rotation failed for '{path}': {message}")]
    FileRotationError { path: String, message: String },

    /// Writer error (generic)
    #[error("Writer error: {0}")]
    WriterError(String),

    /// Generic error
    #[error("{0}")]
    Other(String),
}

impl LoggerError {
    /// Create an IO operation error with context
    pub fn io_operation(
        operation: impl Into<String>,
        message: impl Into<String>,
        source: std::io::Error,
    ) -> Self {
        LoggerError::IoOperation {
            operation: operation.into(),
            message: message.into(),
            source,
        }
    }

    /// Create an invalid configuration error
    pub fn config(component: impl Into<String>, message: impl Into<String>) -> Self {
        LoggerError::InvalidConfiguration {
            component: component.into(),
            message: message.into(),
        }
    }

    /// Create a pattern syntax error
    pub fn pattern(pattern: impl Into<String>, position: usize, message: impl Into<String>) -> Self {
        LoggerError::PatternSyntax {
            pattern: pattern.into(),
            position,
            message: message.into(),
        }
    }

    pub fn unknown_host(host: impl Into<String>, message: impl Into<String>) -> Self {
        LoggerError::UnknownHost {
            host: host.into(),
            message: message.into(),
        }
    }

    pub fn evaluation(evaluator: impl Into<String>, message: impl Into<String>) -> Self {
        LoggerError::Evaluation {
            evaluator: evaluator.into(),
            message: message.into(),
        }
    }

    /// Create a file appender error
    pub fn file_appender(path: impl Into<String>, message: impl Into<String>) -> Self {
        LoggerError::FileAppenderError {
            path: path.into(),
            message: message.into(),
        }
    }

    /// Create a file rotation error
    pub fn file_rotation(path: impl Into<String>, message: impl Into<String>) -> Self {
        LoggerError::FileRotationError {
            path: path.into(),
            message: message.into(),
        }
    }

    /// Create a writer error (generic)
    pub fn writer<S: Into<String>>(msg: S) -> Self {
        LoggerError::WriterError(msg.into())
    }

    /// Create a generic error
    pub fn other<S: Into<String>>(msg: S) -> Self {
        LoggerError::Other(msg.into())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_creation() {
        let err = LoggerError::config("SyslogAppender", "The Facility option is mandatory");
        assert!(matches!(err, LoggerError::InvalidConfiguration { .. }));

        let err = LoggerError::file_appender("/var/log/app.log", "Permission denied");
        assert!(matches!(err, LoggerError::FileAppenderError { .. }));

        let err = LoggerError::pattern("%d{", 2, "unterminated option block");
        assert!(matches!(err, LoggerError::PatternSyntax { position: 2, .. }));
    }

    #[test]
    fn test_error_display() {
        let err = LoggerError::InvalidFacility("MAILBOX".to_string());
        assert_eq!(err.to_string(), "'MAILBOX' is not a valid syslog facility string");

        let err = LoggerError::file_rotation("/var/log/app.log", "Disk full");
        assert_eq!(
            err.to_string(),
            "File rotation failed for '/var/log/app.log': Disk full"
        );

        let err = LoggerError::ContextNameAlreadySet {
            current: "main".to_string(),
        };
        assert_eq!(err.to_string(), "Context has already been given the name 'main'");

        let err = LoggerError::UnknownConverter("bogus".to_string());
        assert!(err.to_string().contains("'bogus'"));
    }

    #[test]
    fn test_io_operation_error() {
        let io_err = std::io::Error::new(std::io::ErrorKind::ConnectionRefused, "refused");
        let err = LoggerError::io_operation("connecting to syslog", "connection refused", io_err);

        assert!(matches!(err, LoggerError::IoOperation { .. }));
        assert!(err.to_string().contains("connecting to syslog"));
        assert!(std::error::Error::source(&err).is_some());
    }
}
