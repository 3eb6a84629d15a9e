//! Structured JSON logging for AWS Lambda functions.
//!
//! This crate writes one JSON object per line to stderr, tagged with the
//! application, project and project group of the function and, once an
//! invocation starts, with the X-Ray trace identifiers of the request. The
//! lines are ready for CloudWatch Logs Insights queries without any parsing
//! configuration.
//!
//! # Features
//!
//! - **Leveled and keyed logging**: `debug`/`info`/`warn`/`error` with format
//!   arguments, and `*_w` variants taking a message plus key/value pairs
//! - **Immutable handles**: [`Logger::with`] returns a derived logger; the
//!   process-wide logger in [`global`] is swapped atomically
//! - **Trace correlation**: `traceId`, `correlationId`, `spanId` and
//!   `traceFlags` taken from the invocation's X-Ray header
//! - **Event intake**: adapters for SNS, SQS and DynamoDB stream events that
//!   log the payload at debug level only
//! - **Sampling**: repeated messages are thinned out per second
//! - **`tracing` bridge**: [`JsonLogLayer`] routes `tracing` events through
//!   the same logger
//!
//! # Architecture
//!
//! - `config`: [`LoggerConfig`], built from strings, a builder or the environment
//! - `logger`: the immutable [`Logger`] handle and line emission
//! - [`global`]: the process-wide logger and its free functions
//! - `trace`: X-Ray header parsing and [`setup_trace_ids`]
//! - `xray`: [`set_up_xray`], [`extract_context`] and the [`LambdaXrayPropagator`]
//! - `events`: [`set_up_sns`], [`set_up_sqs`] and the other event adapters
//! - `layer`: the `tracing` bridge
//!
//! # Quick Start
//!
//! ```no_run
//! use aws_lambda_events::event::sqs::SqsEvent;
//! use lambda_json_log::LoggerConfig;
//! use lambda_runtime::{service_fn, Error, LambdaEvent};
//!
//! async fn handler(event: LambdaEvent<SqsEvent>) -> Result<(), Error> {
//!     lambda_json_log::set_up_sqs(&event.context, &event.payload);
//!     for record in &event.payload.records {
//!         lambda_json_log::info_w!("message received", "messageId" => record.message_id);
//!     }
//!     Ok(())
//! }
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Error> {
//!     lambda_json_log::init(LoggerConfig::from_env());
//!     lambda_json_log::set_up_xray();
//!
//!     let result = lambda_runtime::run(service_fn(handler)).await;
//!     lambda_json_log::flush()?;
//!     result
//! }
//! ```
//!
//! # Macros
//!
//! The free-standing macros log through the global logger:
//!
//! ```
//! lambda_json_log::info!("processed {} records", 3);
//! lambda_json_log::warn_w!("slow downstream", "service" => "payments", "ms" => 1250);
//! ```
//!
//! Keyed macros only evaluate and serialize their values when the level is
//! enabled.

mod config;
pub mod constants;
mod encode;
mod error;
mod events;
pub mod global;
mod layer;
mod level;
mod logger;
mod sampling;
mod trace;
mod xray;

pub use config::LoggerConfig;
pub use encode::{to_json_string, to_value};
pub use error::Error;
pub use events::{
    set_up_dynamo_record, set_up_event, set_up_sns, set_up_sns_record, set_up_sqs,
    set_up_sqs_record, LoggableEvent,
};
pub use global::{
    current, flush, init, init_with_writer, is_debug_enabled, is_info_enabled, is_warn_enabled,
    with, with_custom_attr,
};
pub use layer::{init_subscriber, JsonLogLayer};
pub use level::parse_level;
pub use logger::Logger;
pub use sampling::Sampling;
pub use serde_json::Value;
pub use trace::{setup_trace_ids, InvalidTraceHeader, SamplingDecision, TraceCarrier, TraceHeader};
pub use tracing::level_filters::LevelFilter;
pub use tracing::Level;
pub use xray::{
    configure as configure_xray, context_missing_strategy, current_config as xray_config,
    extract_context, set_up_xray, ContextMissingStrategy, DaemonAddress, LambdaXrayPropagator,
    XrayConfig,
};

/// Log a formatted message at debug level through the global logger.
#[macro_export]
macro_rules! debug {
    ($($arg:tt)+) => {
        $crate::global::debug(::std::format_args!($($arg)+))
    };
}

/// Log a formatted message at info level through the global logger.
#[macro_export]
macro_rules! info {
    ($($arg:tt)+) => {
        $crate::global::info(::std::format_args!($($arg)+))
    };
}

/// Log a formatted message at warn level through the global logger.
#[macro_export]
macro_rules! warn {
    ($($arg:tt)+) => {
        $crate::global::warn(::std::format_args!($($arg)+))
    };
}

/// Log a formatted message at error level through the global logger.
#[macro_export]
macro_rules! error {
    ($($arg:tt)+) => {
        $crate::global::error(::std::format_args!($($arg)+))
    };
}

/// Log a message with `key => value` pairs at debug level.
///
/// Values can be anything implementing `Serialize`.
#[macro_export]
macro_rules! debug_w {
    ($msg:expr $(, $key:expr => $value:expr)* $(,)?) => {
        if $crate::global::is_debug_enabled() {
            let fields: ::std::vec::Vec<(::std::string::String, $crate::Value)> =
                ::std::vec![$((::std::string::String::from($key), $crate::to_value(&$value))),*];
            $crate::global::debug_w($msg, fields);
        }
    };
}

/// Log a message with `key => value` pairs at info level.
#[macro_export]
macro_rules! info_w {
    ($msg:expr $(, $key:expr => $value:expr)* $(,)?) => {
        if $crate::global::is_info_enabled() {
            let fields: ::std::vec::Vec<(::std::string::String, $crate::Value)> =
                ::std::vec![$((::std::string::String::from($key), $crate::to_value(&$value))),*];
            $crate::global::info_w($msg, fields);
        }
    };
}

/// Log a message with `key => value` pairs at warn level.
#[macro_export]
macro_rules! warn_w {
    ($msg:expr $(, $key:expr => $value:expr)* $(,)?) => {
        if $crate::global::is_warn_enabled() {
            let fields: ::std::vec::Vec<(::std::string::String, $crate::Value)> =
                ::std::vec![$((::std::string::String::from($key), $crate::to_value(&$value))),*];
            $crate::global::warn_w($msg, fields);
        }
    };
}

/// Log a message with `key => value` pairs at error level.
#[macro_export]
macro_rules! error_w {
    ($msg:expr $(, $key:expr => $value:expr)* $(,)?) => {
        if $crate::global::is_error_enabled() {
            let fields: ::std::vec::Vec<(::std::string::String, $crate::Value)> =
                ::std::vec![$((::std::string::String::from($key), $crate::to_value(&$value))),*];
            $crate::global::error_w($msg, fields);
        }
    };
}

#[cfg(doctest)]
#[macro_use]
extern crate doc_comment;

#[cfg(doctest)]
use doc_comment::doctest;

#[cfg(doctest)]
doctest!("../README.md", readme);
