//! The default [`Logger`] implementation, backed by the `tracing` crate.

use notifyhub_ports::{LogEvent, LogFields, LogLevel, Logger};
use std::collections::BTreeMap;
use tracing::{debug, error, info, warn};

const SECRET_KEY_MARKERS: [&str; 6] = ["token", "secret", "password", "credential", "authorization", "apikey"];

fn is_secret_key(key: &str) -> bool {
    let lower = key.to_ascii_lowercase();
    SECRET_KEY_MARKERS.iter().any(|marker| lower.contains(marker))
}

fn redact(fields: Option<LogFields>) -> Option<LogFields> {
    fields.map(|fields| {
        fields
            .into_iter()
            .map(|(key, value)| {
                if is_secret_key(&key) {
                    (key, serde_json::Value::String("<redacted>".to_string()))
                } else {
                    (key, value)
                }
            })
            .collect()
    })
}

/// Emits structured events through `tracing`, redacting fields whose key
/// looks secret-bearing and merging any fields attached by [`Self::child`].
#[derive(Debug, Clone, Default)]
pub struct TracingLogger {
    base_fields: LogFields,
}

impl TracingLogger {
    /// Build a logger with no base fields.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    fn merged_fields(&self, fields: Option<LogFields>) -> LogFields {
        let mut merged = self.base_fields.clone();
        if let Some(fields) = redact(fields) {
            merged.extend(fields);
        }
        merged
    }
}

impl Logger for TracingLogger {
    fn log(&self, event: LogEvent) {
        let fields = self.merged_fields(event.fields);
        let fields_json = serde_json::to_string(&fields).unwrap_or_default();
        match event.level {
            LogLevel::Debug => debug!(fields = %fields_json, "{}", event.message),
            LogLevel::Info => info!(fields = %fields_json, "{}", event.message),
            LogLevel::Warn => warn!(fields = %fields_json, "{}", event.message),
            LogLevel::Error => error!(fields = %fields_json, "{}", event.message),
        }
    }

    fn child(&self, fields: LogFields) -> Box<dyn Logger> {
        let mut base_fields: BTreeMap<_, _> = self.base_fields.clone();
        base_fields.extend(fields);
        Box::new(Self { base_fields })
    }
}

/// A logger that discards every event. Used where a `Logger` is required but
/// no output is wanted (e.g. library defaults before a caller wires one in).
#[derive(Debug, Clone, Copy, Default)]
pub struct NoopLogger;

impl Logger for NoopLogger {
    fn log(&self, _event: LogEvent) {}

    fn child(&self, _fields: LogFields) -> Box<dyn Logger> {
        Box::new(Self)
    }
}
