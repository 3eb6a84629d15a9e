//! Process-wide logger.
//!
//! Lambda handlers usually log through one shared logger configured at cold
//! start. This module keeps that logger in an [`ArcSwap`]: reads never lock,
//! and [`init`], [`with`], [`with_custom_attr`] and
//! [`setup_trace_ids`](crate::setup_trace_ids) replace it atomically.
//! Attachments are global: every caller sharing the process sees them. Code
//! that wants per-request fields without touching shared state should take
//! [`current`] once and work on the returned [`Logger`] handle instead.
//!
//! Before [`init`] runs, the global logger writes `info` and above to stderr
//! with empty application fields.
//!
//! # Example
//!
//! ```no_run
//! use lambda_json_log::{global, LoggerConfig};
//! use serde_json::json;
//!
//! global::init(LoggerConfig::new("info", "orders", "shop", "commerce", "custom"));
//! global::with([("region", json!("eu-west-1"))]);
//!
//! lambda_json_log::info!("started in {} ms", 12);
//! lambda_json_log::info_w!("order stored", "orderId" => 17);
//!
//! global::flush().ok();
//! ```

use crate::config::LoggerConfig;
use crate::encode;
use crate::error::Error;
use crate::logger::Logger;
use arc_swap::ArcSwap;
use once_cell::sync::Lazy;
use serde::Serialize;
use serde_json::Value;
use std::fmt;
use std::sync::Arc;
use tracing_subscriber::fmt::MakeWriter;

static LOGGER: Lazy<ArcSwap<Logger>> =
    Lazy::new(|| ArcSwap::from_pointee(Logger::build(&LoggerConfig::default())));

/// Configure the global logger, writing to stderr.
pub fn init(config: LoggerConfig) {
    replace(Logger::build(&config));
}

/// Configure the global logger with a custom sink.
pub fn init_with_writer<W>(config: LoggerConfig, make_writer: W)
where
    W: for<'a> MakeWriter<'a> + Send + Sync + 'static,
{
    replace(Logger::build_with_writer(&config, make_writer));
}

/// Install an already built logger as the global one.
pub fn replace(logger: Logger) {
    LOGGER.store(Arc::new(logger));
}

/// Snapshot of the global logger.
pub fn current() -> Logger {
    Logger::clone(&LOGGER.load())
}

/// Replace the global logger with one derived from it.
///
/// `derive` may run more than once when other threads update concurrently;
/// it must not have side effects.
pub fn update<F>(derive: F)
where
    F: Fn(&Logger) -> Logger,
{
    LOGGER.rcu(|current| derive(current));
}

/// Attach fields to every line the global logger writes from now on.
pub fn with<I, K>(fields: I)
where
    I: IntoIterator<Item = (K, Value)>,
    K: Into<String>,
{
    let fields: Vec<(String, Value)> = fields.into_iter().map(|(k, v)| (k.into(), v)).collect();
    update(|logger| logger.with(fields.iter().cloned()));
}

/// Attach a custom attribute (`Body.<prefix>.<key>`) to the global logger.
pub fn with_custom_attr<T>(key: &str, value: &T)
where
    T: Serialize + ?Sized,
{
    let value = encode::to_value(value);
    update(|logger| logger.with([(logger.custom_attribute_key(key), value.clone())]));
}

/// Flush the global logger's sink. Call before the process exits.
pub fn flush() -> Result<(), Error> {
    current().flush()
}

/// Whether the global logger writes debug lines.
pub fn is_debug_enabled() -> bool {
    LOGGER.load().is_debug_enabled()
}

/// Whether the global logger writes info lines.
pub fn is_info_enabled() -> bool {
    LOGGER.load().is_info_enabled()
}

/// Whether the global logger writes warn lines.
pub fn is_warn_enabled() -> bool {
    LOGGER.load().is_warn_enabled()
}

/// Whether the global logger writes error lines.
pub fn is_error_enabled() -> bool {
    LOGGER.load().is_error_enabled()
}

/// Log a formatted message at debug level through the global logger.
#[track_caller]
pub fn debug(args: fmt::Arguments<'_>) {
    LOGGER.load().debug(args);
}

/// Log a formatted message at info level through the global logger.
#[track_caller]
pub fn info(args: fmt::Arguments<'_>) {
    LOGGER.load().info(args);
}

/// Log a formatted message at warn level through the global logger.
#[track_caller]
pub fn warn(args: fmt::Arguments<'_>) {
    LOGGER.load().warn(args);
}

/// Log a formatted message at error level through the global logger.
#[track_caller]
pub fn error(args: fmt::Arguments<'_>) {
    LOGGER.load().error(args);
}

/// Log a message with key/value fields at debug level through the global logger.
#[track_caller]
pub fn debug_w<I, K>(message: &str, fields: I)
where
    I: IntoIterator<Item = (K, Value)>,
    K: Into<String>,
{
    LOGGER.load().debug_w(message, fields);
}

/// Log a message with key/value fields at info level through the global logger.
#[track_caller]
pub fn info_w<I, K>(message: &str, fields: I)
where
    I: IntoIterator<Item = (K, Value)>,
    K: Into<String>,
{
    LOGGER.load().info_w(message, fields);
}

/// Log a message with key/value fields at warn level through the global logger.
#[track_caller]
pub fn warn_w<I, K>(message: &str, fields: I)
where
    I: IntoIterator<Item = (K, Value)>,
    K: Into<String>,
{
    LOGGER.load().warn_w(message, fields);
}

/// Log a message with key/value fields at error level through the global logger.
#[track_caller]
pub fn error_w<I, K>(message: &str, fields: I)
where
    I: IntoIterator<Item = (K, Value)>,
    K: Into<String>,
{
    LOGGER.load().error_w(message, fields);
}
