//! Bridge from `tracing` events to the JSON logger.
//!
//! Dependencies that log through `tracing` (including `lambda_runtime`) end up
//! on the same JSON lines as the rest of the function when [`JsonLogLayer`] is
//! installed. The `message` field becomes the line's message; every other
//! field is written as a top-level key after the logger's own fields.
//!
//! # Example
//!
//! ```no_run
//! use lambda_json_log::{init_subscriber, LoggerConfig};
//!
//! lambda_json_log::init(LoggerConfig::from_env());
//! init_subscriber().expect("no other subscriber installed");
//!
//! tracing::info!(order_id = 17, "order stored");
//! ```

use crate::encode::short_caller;
use crate::error::Error;
use crate::global;
use crate::logger::Logger;
use serde_json::Value;
use std::fmt;
use tracing::field::{Field, Visit};
use tracing::{Event, Subscriber};
use tracing_subscriber::layer::{Context, SubscriberExt};
use tracing_subscriber::{Layer, Registry};

const MESSAGE_FIELD: &str = "message";

/// A [`Layer`] writing `tracing` events as JSON lines.
///
/// By default each event goes through the global logger as it is at that
/// moment, so fields attached later with [`with`](crate::with) or
/// [`setup_trace_ids`](crate::setup_trace_ids) show up on bridged events too.
#[derive(Debug, Clone, Default)]
pub struct JsonLogLayer {
    logger: Option<Logger>,
}

impl JsonLogLayer {
    /// Layer writing through the global logger.
    pub fn new() -> Self {
        Self::default()
    }

    /// Layer writing through a fixed logger.
    pub fn with_logger(logger: Logger) -> Self {
        Self {
            logger: Some(logger),
        }
    }

    fn logger(&self) -> Logger {
        self.logger.clone().unwrap_or_else(global::current)
    }
}

impl<S> Layer<S> for JsonLogLayer
where
    S: Subscriber,
{
    // Level filtering stays in `on_event`: other layers of the same
    // subscriber must keep seeing events below this logger's level.
    fn on_event(&self, event: &Event<'_>, _ctx: Context<'_, S>) {
        let logger = self.logger();
        let metadata = event.metadata();
        if !logger.enabled(*metadata.level()) {
            return;
        }

        let mut visitor = FieldVisitor::default();
        event.record(&mut visitor);

        let caller = metadata
            .file()
            .zip(metadata.line())
            .map(|(file, line)| short_caller(file, line));

        logger.emit(*metadata.level(), caller, &visitor.message, visitor.fields);
    }
}

/// Install a `tracing` subscriber that only writes through [`JsonLogLayer`].
pub fn init_subscriber() -> Result<(), Error> {
    let subscriber = Registry::default().with(JsonLogLayer::new());
    tracing::subscriber::set_global_default(subscriber)?;
    Ok(())
}

#[derive(Default)]
struct FieldVisitor {
    message: String,
    fields: Vec<(String, Value)>,
}

impl FieldVisitor {
    fn record(&mut self, field: &Field, value: Value) {
        if field.name() == MESSAGE_FIELD {
            match value {
                Value::String(message) => self.message = message,
                other => self.message = other.to_string(),
            }
        } else {
            self.fields.push((field.name().to_string(), value));
        }
    }
}

impl Visit for FieldVisitor {
    fn record_f64(&mut self, field: &Field, value: f64) {
        self.record(field, Value::from(value));
    }

    fn record_i64(&mut self, field: &Field, value: i64) {
        self.record(field, Value::from(value));
    }

    fn record_u64(&mut self, field: &Field, value: u64) {
        self.record(field, Value::from(value));
    }

    fn record_bool(&mut self, field: &Field, value: bool) {
        self.record(field, Value::from(value));
    }

    fn record_str(&mut self, field: &Field, value: &str) {
        self.record(field, Value::from(value));
    }

    fn record_error(&mut self, field: &Field, value: &(dyn std::error::Error + 'static)) {
        self.record(field, Value::from(value.to_string()));
    }

    fn record_debug(&mut self, field: &Field, value: &dyn fmt::Debug) {
        self.record(field, Value::from(format!("{:?}", value)));
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::logger::test_support::{capture_logger, config};
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;

    #[test]
    fn test_bridged_event_shape() {
        let (logger, capture) = capture_logger(&config("info"));
        let subscriber = Registry::default().with(JsonLogLayer::with_logger(logger));

        tracing::subscriber::with_default(subscriber, || {
            tracing::info!(order_id = 17, paid = true, customer = "acme", "order {}", "stored");
        });

        let lines = capture.lines();
        assert_eq!(lines.len(), 1);
        let line = &lines[0];
        assert_eq!(line["level"], "INFO");
        assert_eq!(line["message"], "order stored");
        assert_eq!(line["order_id"], 17);
        assert_eq!(line["paid"], true);
        assert_eq!(line["customer"], "acme");
        assert_eq!(line["application"], "app");
        assert!(line["caller"].as_str().unwrap().starts_with("src/layer.rs:"));
    }

    #[test]
    fn test_bridged_events_respect_logger_level() {
        let (logger, capture) = capture_logger(&config("warn"));
        let subscriber = Registry::default().with(JsonLogLayer::with_logger(logger));

        tracing::subscriber::with_default(subscriber, || {
            tracing::debug!("hidden");
            tracing::info!("hidden");
            tracing::warn!("shown");
        });

        let lines = capture.lines();
        assert_eq!(lines.len(), 1);
        assert_eq!(lines[0]["level"], "WARN");
    }

    #[derive(Clone, Default)]
    struct CountingLayer {
        events: Arc<AtomicUsize>,
    }

    impl<S: Subscriber> Layer<S> for CountingLayer {
        fn on_event(&self, _event: &Event<'_>, _ctx: Context<'_, S>) {
            self.events.fetch_add(1, Ordering::SeqCst);
        }
    }

    #[test]
    fn test_stacked_layers_see_events_below_logger_level() {
        let (logger, capture) = capture_logger(&config("warn"));
        let counting = CountingLayer::default();
        let subscriber = Registry::default()
            .with(JsonLogLayer::with_logger(logger))
            .with(counting.clone());

        tracing::subscriber::with_default(subscriber, || {
            tracing::debug!("debug");
            tracing::info!("info");
            tracing::warn!("warn");
        });

        assert_eq!(counting.events.load(Ordering::SeqCst), 3);
        assert_eq!(capture.lines().len(), 1);
    }

    #[test]
    fn test_bridged_events_carry_logger_context() {
        let (logger, capture) = capture_logger(&config("info"));
        let logger = logger.with([("requestId", Value::from("r-1"))]);
        let subscriber = Registry::default().with(JsonLogLayer::with_logger(logger));

        tracing::subscriber::with_default(subscriber, || {
            tracing::error!(error = %std::io::Error::other("boom"), "request failed");
        });

        let lines = capture.lines();
        assert_eq!(lines[0]["requestId"], "r-1");
        assert_eq!(lines[0]["error"], "boom");
        assert!(lines[0].contains_key("stacktrace"));
    }
}
