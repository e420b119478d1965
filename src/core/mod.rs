//! Core logger types and traits

pub mod appender;
pub mod context;
pub mod error;
pub mod event;
pub mod filter;
pub mod lifecycle;
pub mod log_level;
pub mod logger;
pub mod mdc;
pub mod metrics;
pub mod status;
pub mod throwable;

pub use appender::{Appender, AppenderRef, SharedAppender};
pub use context::{ContextView, LoggerContext};
pub use error::{LoggerError, Result};
pub use event::{format_message, CallerData, LoggingEvent, Marker, StructuredData};
pub use filter::{
    EvaluatorFilter, EventEvaluator, Filter, FilterChain, FilterReply, FnEvaluator, LevelFilter,
    LevelMarkerEvaluator, ThresholdFilter,
};
pub use lifecycle::LifeCycle;
pub use log_level::{LogLevel, ALL_LEVELS};
pub use logger::{EventBuilder, Logger, ROOT_LOGGER_NAME};
pub use mdc::{Mdc, MdcGuard};
pub use metrics::AppenderMetrics;
pub use status::{ConsoleStatusListener, Status, StatusLevel, StatusListener, StatusManager};
pub use throwable::{StackFrame, ThrowableProxy};
