//! Concrete logger adapters.

use crate::ports::Logger;

/// Adapts the [`Logger`] port to the `tracing` ecosystem.
///
/// Key/value fields are rendered as `key=value` pairs appended to the
/// message, since `tracing` events need statically known field names.
pub struct TracingLogger;

impl TracingLogger {
    pub fn new() -> Self {
        Self
    }
}

impl Default for TracingLogger {
    fn default() -> Self {
        Self::new()
    }
}

impl Logger for TracingLogger {
    fn info(&self, msg: &str, fields: &[(&str, String)]) {
        let rendered = format_fields(fields);
        if rendered.is_empty() {
            tracing::info!("{}", msg);
        } else {
            tracing::info!("{} {}", msg, rendered);
        }
    }

    fn error(&self, msg: &str, fields: &[(&str, String)]) {
        let rendered = format_fields(fields);
        if rendered.is_empty() {
            tracing::error!("{}", msg);
        } else {
            tracing::error!("{} {}", msg, rendered);
        }
    }
}

/// Renders key/value pairs into a log-friendly string.
fn format_fields(fields: &[(&str, String)]) -> String {
    fields
        .iter()
        .enumerate()
        .map(|(index, field)| format!("{}={}", sanitize_key(field.0, index), field.1))
        .collect::<Vec<_>>()
        .join(" ")
}

/// Normalizes logging keys and applies deterministic fallbacks.
fn sanitize_key(key: &str, index: usize) -> String {
    let normalized = key.trim().to_ascii_lowercase().replace(' ', "_");
    if normalized.is_empty() {
        return format!("field_{}", index);
    }
    normalized
}
