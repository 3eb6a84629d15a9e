//! Constants for the lambda-json-log package.
//!
//! Log-line keys, environment variable names and defaults live here so the
//! encoder, the trace extractor and the event adapters agree on one shape.

/// Keys of the JSON object written for every log line.
pub mod keys {
    /// ISO-8601 timestamp of the line.
    pub const TIME: &str = "time";

    /// Capitalized severity name.
    pub const LEVEL: &str = "level";

    /// Logger name, only present on named loggers.
    pub const LOGGER: &str = "logger";

    /// Short `file:line` location of the logging call.
    pub const CALLER: &str = "caller";

    /// Free-text message.
    pub const MESSAGE: &str = "message";

    /// Captured backtrace, error level only.
    pub const STACKTRACE: &str = "stacktrace";

    pub const APPLICATION: &str = "application";
    pub const PROJECT: &str = "project";
    pub const PROJECT_GROUP: &str = "projectGroup";

    /// X-Ray root trace id of the current invocation.
    pub const TRACE_ID: &str = "traceId";

    /// Correlation id, the same value as the trace id.
    pub const CORRELATION_ID: &str = "correlationId";

    /// Parent segment id from the trace header.
    pub const SPAN_ID: &str = "spanId";

    /// Whether the upstream sampling decision was "sampled".
    pub const TRACE_FLAGS: &str = "traceFlags";

    /// Label of the source that triggered the invocation.
    pub const EVENT_SOURCE: &str = "eventSource";

    /// Serialized event payload.
    pub const EVENT_BODY: &str = "eventBody";

    /// Root of the namespace used by custom attributes (`Body.<prefix>.<key>`).
    pub const CUSTOM_ATTRIBUTES_ROOT: &str = "Body";
}

/// Environment variable names for configuration.
pub mod env_vars {
    /// Minimum log level.
    pub const LOG_LEVEL: &str = "LOG_LEVEL";

    /// Log level set by the Lambda advanced logging controls, used when
    /// `LOG_LEVEL` is not set.
    pub const AWS_LAMBDA_LOG_LEVEL: &str = "AWS_LAMBDA_LOG_LEVEL";

    pub const APPLICATION: &str = "LOG_APPLICATION";
    pub const PROJECT: &str = "LOG_PROJECT";
    pub const PROJECT_GROUP: &str = "LOG_PROJECT_GROUP";
    pub const CUSTOM_ATTRIBUTES_PREFIX: &str = "LOG_CUSTOM_ATTRIBUTES_PREFIX";

    /// Fallback application name when `LOG_APPLICATION` is not set.
    pub const AWS_LAMBDA_FUNCTION_NAME: &str = "AWS_LAMBDA_FUNCTION_NAME";

    /// Behaviour when trace context is missing: `LOG_ERROR` or `IGNORE_ERROR`.
    pub const XRAY_CONTEXT_MISSING: &str = "AWS_XRAY_CONTEXT_MISSING";

    /// X-Ray daemon address, `host:port` or `tcp:host:port udp:host:port`.
    pub const XRAY_DAEMON_ADDRESS: &str = "AWS_XRAY_DAEMON_ADDRESS";

    /// Trace header the Lambda runtime exposes for the current invocation.
    pub const XRAY_TRACE_ID: &str = "_X_AMZN_TRACE_ID";
}

/// Default values for configuration parameters.
pub mod defaults {
    /// Level used when none is configured or the configured one is malformed.
    pub const LOG_LEVEL: &str = "info";

    /// Custom attribute prefix when none is configured.
    pub const CUSTOM_ATTRIBUTES_PREFIX: &str = "custom";

    /// Lines logged per (level, message) and tick before sampling kicks in.
    pub const SAMPLING_INITIAL: u64 = 100;

    /// After the initial burst, one line in this many is logged.
    pub const SAMPLING_THEREAFTER: u64 = 100;

    /// Length of a sampling tick in nanoseconds.
    pub const SAMPLING_TICK_NANOS: u64 = 1_000_000_000;

    /// Message of the line emitted by the event adapters.
    pub const EVENT_MESSAGE: &str = "Got event";
}

/// Header and attribute names carrying the X-Ray trace header.
pub mod trace_headers {
    /// HTTP header name used by the X-Ray propagator.
    pub const AWS_XRAY_TRACE_HEADER: &str = "x-amzn-trace-id";

    /// SQS system attribute holding the trace header of the sender.
    pub const SQS_TRACE_ATTRIBUTE: &str = "AWSTraceHeader";
}
