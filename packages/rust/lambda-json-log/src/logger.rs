//! The structured JSON logger.
//!
//! A [`Logger`] is an immutable handle: attaching fields with [`Logger::with`],
//! [`Logger::with_custom_attr`] or [`Logger::named`] returns a new handle and
//! leaves the original untouched, so a handle can be passed down a call chain
//! and narrowed per invocation. Handles are cheap to clone; the level, sink and
//! sampler are shared behind an `Arc`.
//!
//! Every line is one JSON object:
//!
//! ```text
//! {"time":"2024-05-01T12:30:00.123Z","level":"INFO","caller":"src/main.rs:42",
//!  "message":"order stored","application":"orders","project":"shop",
//!  "projectGroup":"commerce","orderId":17}
//! ```
//!
//! # Example
//!
//! ```
//! use lambda_json_log::{Logger, LoggerConfig};
//! use serde_json::json;
//!
//! let logger = Logger::build(&LoggerConfig::new("info", "orders", "shop", "commerce", "custom"));
//! let logger = logger.with([("tenant", json!("acme"))]);
//!
//! logger.info(format_args!("stored {} orders", 3));
//! logger.info_w("order stored", [("orderId", json!(17))]);
//! assert!(!logger.is_debug_enabled());
//! ```

use crate::config::LoggerConfig;
use crate::constants::keys;
use crate::encode::{self, Record};
use crate::error::Error;
use crate::level::resolve_level;
use crate::sampling::Sampler;
use chrono::Utc;
use serde::Serialize;
use serde_json::Value;
use std::backtrace::Backtrace;
use std::borrow::Cow;
use std::fmt;
use std::io::{self, Write};
use std::panic::Location;
use std::sync::Arc;
use tracing::level_filters::LevelFilter;
use tracing::Level;
use tracing_subscriber::fmt::writer::BoxMakeWriter;
use tracing_subscriber::fmt::MakeWriter;

struct Core {
    level: LevelFilter,
    writer: BoxMakeWriter,
    sampler: Option<Sampler>,
    custom_attributes_prefix: String,
}

impl fmt::Debug for Core {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Core")
            .field("level", &self.level)
            .field("sampler", &self.sampler)
            .field("custom_attributes_prefix", &self.custom_attributes_prefix)
            .finish_non_exhaustive()
    }
}

/// Handle to a configured JSON logger.
#[derive(Clone, Debug)]
pub struct Logger {
    core: Arc<Core>,
    context: Arc<Vec<(String, Value)>>,
    name: Option<Arc<str>>,
}

impl Logger {
    /// Build a logger writing to stderr.
    ///
    /// A malformed level in `config` falls back to `info` with a diagnostic on
    /// stderr; building never fails.
    pub fn build(config: &LoggerConfig) -> Self {
        Self::build_with_writer(config, io::stderr)
    }

    /// Build a logger writing to the given [`MakeWriter`].
    pub fn build_with_writer<W>(config: &LoggerConfig, make_writer: W) -> Self
    where
        W: for<'a> MakeWriter<'a> + Send + Sync + 'static,
    {
        let context = vec![
            (keys::APPLICATION.to_string(), Value::from(config.application())),
            (keys::PROJECT.to_string(), Value::from(config.project())),
            (
                keys::PROJECT_GROUP.to_string(),
                Value::from(config.project_group()),
            ),
        ];

        Self {
            core: Arc::new(Core {
                level: resolve_level(config.log_level()),
                writer: BoxMakeWriter::new(make_writer),
                sampler: Sampler::from_policy(config.sampling()),
                custom_attributes_prefix: config.custom_attributes_prefix().to_string(),
            }),
            context: Arc::new(context),
            name: config.name().map(Arc::from),
        }
    }

    /// Minimum level this logger writes.
    pub fn level(&self) -> LevelFilter {
        self.core.level
    }

    /// Whether a line at `level` would be written.
    pub fn enabled(&self, level: Level) -> bool {
        self.core.level >= level
    }

    /// Whether debug lines are written.
    pub fn is_debug_enabled(&self) -> bool {
        self.enabled(Level::DEBUG)
    }

    /// Whether info lines are written.
    pub fn is_info_enabled(&self) -> bool {
        self.enabled(Level::INFO)
    }

    /// Whether warn lines are written.
    pub fn is_warn_enabled(&self) -> bool {
        self.enabled(Level::WARN)
    }

    /// Whether error lines are written.
    pub fn is_error_enabled(&self) -> bool {
        self.enabled(Level::ERROR)
    }

    /// Fields attached to every line written by this handle.
    pub fn context(&self) -> &[(String, Value)] {
        &self.context
    }

    /// Return a logger that also writes the given fields on every line.
    ///
    /// A key that is already attached keeps its position and takes the new value.
    pub fn with<I, K>(&self, fields: I) -> Logger
    where
        I: IntoIterator<Item = (K, Value)>,
        K: Into<String>,
    {
        let mut context = self.context.as_ref().clone();
        for (key, value) in fields {
            merge_field(&mut context, key.into(), value);
        }

        Logger {
            core: Arc::clone(&self.core),
            context: Arc::new(context),
            name: self.name.clone(),
        }
    }

    /// Attach a custom attribute, namespaced as `Body.<prefix>.<key>`.
    pub fn with_custom_attr<T>(&self, key: &str, value: &T) -> Logger
    where
        T: Serialize + ?Sized,
    {
        self.with([(self.custom_attribute_key(key), encode::to_value(value))])
    }

    /// Return a logger with `name` appended to its name, dot-separated.
    pub fn named(&self, name: &str) -> Logger {
        let name: Arc<str> = match &self.name {
            Some(parent) if !name.is_empty() => format!("{}.{}", parent, name).into(),
            Some(parent) => Arc::clone(parent),
            None => name.into(),
        };

        Logger {
            core: Arc::clone(&self.core),
            context: Arc::clone(&self.context),
            name: Some(name),
        }
    }

    /// Flush buffered output of the sink.
    pub fn flush(&self) -> Result<(), Error> {
        self.core.writer.make_writer().flush().map_err(Error::Flush)
    }

    /// Log a formatted message at debug level.
    #[track_caller]
    pub fn debug(&self, args: fmt::Arguments<'_>) {
        self.log(Level::DEBUG, args, Vec::new());
    }

    /// Log a formatted message at info level.
    #[track_caller]
    pub fn info(&self, args: fmt::Arguments<'_>) {
        self.log(Level::INFO, args, Vec::new());
    }

    /// Log a formatted message at warn level.
    #[track_caller]
    pub fn warn(&self, args: fmt::Arguments<'_>) {
        self.log(Level::WARN, args, Vec::new());
    }

    /// Log a formatted message at error level, with a stacktrace.
    #[track_caller]
    pub fn error(&self, args: fmt::Arguments<'_>) {
        self.log(Level::ERROR, args, Vec::new());
    }

    /// Log a message with key/value fields at debug level.
    #[track_caller]
    pub fn debug_w<I, K>(&self, message: &str, fields: I)
    where
        I: IntoIterator<Item = (K, Value)>,
        K: Into<String>,
    {
        self.log_w(Level::DEBUG, message, fields);
    }

    /// Log a message with key/value fields at info level.
    #[track_caller]
    pub fn info_w<I, K>(&self, message: &str, fields: I)
    where
        I: IntoIterator<Item = (K, Value)>,
        K: Into<String>,
    {
        self.log_w(Level::INFO, message, fields);
    }

    /// Log a message with key/value fields at warn level.
    #[track_caller]
    pub fn warn_w<I, K>(&self, message: &str, fields: I)
    where
        I: IntoIterator<Item = (K, Value)>,
        K: Into<String>,
    {
        self.log_w(Level::WARN, message, fields);
    }

    /// Log a message with key/value fields at error level, with a stacktrace.
    #[track_caller]
    pub fn error_w<I, K>(&self, message: &str, fields: I)
    where
        I: IntoIterator<Item = (K, Value)>,
        K: Into<String>,
    {
        self.log_w(Level::ERROR, message, fields);
    }

    pub(crate) fn custom_attribute_key(&self, key: &str) -> String {
        format!(
            "{}.{}.{}",
            keys::CUSTOM_ATTRIBUTES_ROOT,
            self.core.custom_attributes_prefix,
            key
        )
    }

    #[track_caller]
    fn log(&self, level: Level, args: fmt::Arguments<'_>, fields: Vec<(String, Value)>) {
        if !self.enabled(level) {
            return;
        }
        let message = args
            .as_str()
            .map(Cow::Borrowed)
            .unwrap_or_else(|| Cow::Owned(args.to_string()));
        self.emit(level, Some(caller_location()), &message, fields);
    }

    #[track_caller]
    fn log_w<I, K>(&self, level: Level, message: &str, fields: I)
    where
        I: IntoIterator<Item = (K, Value)>,
        K: Into<String>,
    {
        if !self.enabled(level) {
            return;
        }
        let fields = fields.into_iter().map(|(k, v)| (k.into(), v)).collect();
        self.emit(level, Some(caller_location()), message, fields);
    }

    /// Write one line, applying the level gate and sampling.
    pub(crate) fn emit(
        &self,
        level: Level,
        caller: Option<String>,
        message: &str,
        fields: Vec<(String, Value)>,
    ) {
        if !self.enabled(level) {
            return;
        }
        if let Some(sampler) = &self.core.sampler {
            if !sampler.sample(level, message) {
                return;
            }
        }

        let stacktrace = (level == Level::ERROR).then(|| Backtrace::force_capture().to_string());
        let record = Record {
            time: Utc::now(),
            level,
            name: self.name.as_deref(),
            caller,
            message,
            stacktrace,
            context: &self.context,
            fields,
        };

        let line = record.encode();
        let mut writer = self.core.writer.make_writer();
        if let Err(err) = writer.write_all(line.as_bytes()) {
            eprintln!(
                "{} write error: {}",
                encode::format_time(&Utc::now()),
                err
            );
        }
    }
}

#[track_caller]
fn caller_location() -> String {
    let location = Location::caller();
    encode::short_caller(location.file(), location.line())
}

fn merge_field(context: &mut Vec<(String, Value)>, key: String, value: Value) {
    match context.iter_mut().find(|(existing, _)| *existing == key) {
        Some((_, slot)) => *slot = value,
        None => context.push((key, value)),
    }
}
