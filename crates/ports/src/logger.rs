//! Structured logging boundary contract.
//!
//! Every component receives an injected `Logger`; nothing calls global
//! logging macros directly except the default `TracingLogger` adapter.

use std::collections::BTreeMap;

/// Log severity.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogLevel {
    /// Debug.
    Debug,
    /// Info.
    Info,
    /// Warn.
    Warn,
    /// Error.
    Error,
}

/// Additional structured fields attached to a log event.
pub type LogFields = BTreeMap<String, serde_json::Value>;

/// A structured log event.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LogEvent {
    /// Severity.
    pub level: LogLevel,
    /// Human-readable message (already redacted of secrets by the caller).
    pub message: String,
    /// Optional structured fields.
    pub fields: Option<LogFields>,
}

/// Boundary contract for structured logging. No component calls a global
/// logger directly; every component holds an `Arc<dyn Logger>`.
pub trait Logger: Send + Sync {
    /// Emit a structured event.
    fn log(&self, event: LogEvent);

    /// Create a child logger with `fields` merged into every subsequent event.
    fn child(&self, fields: LogFields) -> Box<dyn Logger>;

    /// Convenience: debug event.
    fn debug(&self, msg: &str, fields: Option<LogFields>) {
        self.log(LogEvent {
            level: LogLevel::Debug,
            message: msg.to_owned(),
            fields,
        });
    }

    /// Convenience: info event.
    fn info(&self, msg: &str, fields: Option<LogFields>) {
        self.log(LogEvent {
            level: LogLevel::Info,
            message: msg.to_owned(),
            fields,
        });
    }

    /// Convenience: warn event.
    fn warn(&self, msg: &str, fields: Option<LogFields>) {
        self.log(LogEvent {
            level: LogLevel::Warn,
            message: msg.to_owned(),
            fields,
        });
    }

    /// Convenience: error event.
    fn error(&self, msg: &str, fields: Option<LogFields>) {
        self.log(LogEvent {
            level: LogLevel::Error,
            message: msg.to_owned(),
            fields,
        });
    }
}
