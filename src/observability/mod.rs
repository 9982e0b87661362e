//! Observability
//!
//! - Structured JSON logging, one line per event
//! - Typed lifecycle events
//! - Counter metrics exposed over HTTP
//!
//! ```ignore
//! use steerable_aqp::observability::{log_event_with_fields, Event};
//!
//! log_event_with_fields(Event::BlockFetched, &[("offset", "20000"), ("rows", "10000")]);
//! ```

mod events;
mod logger;
mod metrics;

pub use events::Event;
pub use logger::{Logger, Severity};
pub use metrics::{MetricsRegistry, MetricsSnapshot};

/// Log a lifecycle event with fields.
///
/// Failure events go out at WARN; callers that want ERROR use [`Logger`]
/// directly.
pub fn log_event_with_fields(event: Event, fields: &[(&str, &str)]) {
    let severity = if event.is_failure() {
        Severity::Warn
    } else {
        Severity::Info
    };
    Logger::log(severity, event.as_str(), fields);
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_log_event_with_fields() {
        log_event_with_fields(Event::BlockFailed, &[("reason", "timeout")]);
    }
}
