//! Trace identity of the current invocation.
//!
//! The Lambda runtime hands every invocation the X-Ray trace header of the
//! request that triggered it, in the form
//! `Root=1-5759e988-bd862e3fe1be46a994272793;Parent=53995c3f42cd8ad8;Sampled=1`.
//! This module parses that header and attaches its identifiers to log lines:
//!
//! - `traceId`: the `Root` value
//! - `correlationId`: the same value as `traceId`
//! - `spanId`: the `Parent` value
//! - `traceFlags`: `true` when the sampling decision is `Sampled=1`
//!
//! Propagation is best-effort: when no header is found nothing is attached.
//!
//! # Example
//!
//! ```
//! use lambda_json_log::{Logger, LoggerConfig, TraceCarrier, TraceHeader};
//! use lambda_runtime::Context;
//!
//! let mut context = Context::default();
//! context.xray_trace_id = Some("Root=1-abc;Parent=span1;Sampled=1".to_string());
//!
//! let header = context.trace_header().unwrap();
//! assert_eq!(header.trace_id(), "1-abc");
//!
//! let logger = Logger::build(&LoggerConfig::default()).with_trace_header(&header);
//! assert_eq!(logger.context().len(), 7);
//! ```

use crate::constants::{keys, trace_headers};
use crate::global;
use crate::logger::Logger;
use crate::xray::{self, ContextMissingStrategy};
use aws_lambda_events::event::sqs::SqsMessage;
use serde_json::Value;
use std::collections::HashMap;
use std::fmt;
use std::str::FromStr;

/// Upstream sampling decision carried by the `Sampled` key.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SamplingDecision {
    /// `Sampled=1`
    Sampled,
    /// `Sampled=0`
    NotSampled,
    /// `Sampled=?`, the receiver is asked to decide.
    Requested,
    /// Absent or unrecognized.
    #[default]
    Unknown,
}

impl SamplingDecision {
    fn parse(value: &str) -> Self {
        match value {
            "1" => SamplingDecision::Sampled,
            "0" => SamplingDecision::NotSampled,
            "?" => SamplingDecision::Requested,
            _ => SamplingDecision::Unknown,
        }
    }

    fn as_header_value(&self) -> Option<&'static str> {
        match self {
            SamplingDecision::Sampled => Some("1"),
            SamplingDecision::NotSampled => Some("0"),
            SamplingDecision::Requested => Some("?"),
            SamplingDecision::Unknown => None,
        }
    }
}

/// Parsed X-Ray trace header.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TraceHeader {
    trace_id: String,
    parent_id: Option<String>,
    sampling_decision: SamplingDecision,
}

impl TraceHeader {
    pub fn new(
        trace_id: impl Into<String>,
        parent_id: Option<String>,
        sampling_decision: SamplingDecision,
    ) -> Self {
        Self {
            trace_id: trace_id.into(),
            parent_id,
            sampling_decision,
        }
    }

    /// Parse a header value. Returns `None` when there is no `Root` key.
    ///
    /// Keys may come in any order, surrounding whitespace is ignored, and
    /// unknown keys such as `Self` or `Lineage` are skipped.
    pub fn parse(value: &str) -> Option<Self> {
        let mut trace_id = None;
        let mut parent_id = None;
        let mut sampling_decision = SamplingDecision::Unknown;

        for part in value.split(';') {
            let Some((key, val)) = part.split_once('=') else {
                continue;
            };
            let val = val.trim();
            match key.trim() {
                "Root" if !val.is_empty() => trace_id = Some(val.to_string()),
                "Parent" if !val.is_empty() => parent_id = Some(val.to_string()),
                "Sampled" => sampling_decision = SamplingDecision::parse(val),
                _ => {}
            }
        }

        trace_id.map(|trace_id| Self {
            trace_id,
            parent_id,
            sampling_decision,
        })
    }

    pub fn trace_id(&self) -> &str {
        &self.trace_id
    }

    /// The correlation id is the trace id.
    pub fn correlation_id(&self) -> &str {
        &self.trace_id
    }

    pub fn parent_id(&self) -> Option<&str> {
        self.parent_id.as_deref()
    }

    pub fn sampling_decision(&self) -> SamplingDecision {
        self.sampling_decision
    }

    pub fn is_sampled(&self) -> bool {
        self.sampling_decision == SamplingDecision::Sampled
    }

    /// The four log fields derived from this header.
    pub fn fields(&self) -> [(&'static str, Value); 4] {
        [
            (keys::TRACE_ID, Value::from(self.trace_id())),
            (keys::CORRELATION_ID, Value::from(self.correlation_id())),
            (
                keys::SPAN_ID,
                Value::from(self.parent_id().unwrap_or_default()),
            ),
            (keys::TRACE_FLAGS, Value::from(self.is_sampled())),
        ]
    }
}

impl FromStr for TraceHeader {
    type Err = InvalidTraceHeader;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        TraceHeader::parse(s).ok_or_else(|| InvalidTraceHeader(s.to_string()))
    }
}

impl fmt::Display for TraceHeader {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Root={}", self.trace_id)?;
        if let Some(parent) = &self.parent_id {
            write!(f, ";Parent={}", parent)?;
        }
        if let Some(sampled) = self.sampling_decision.as_header_value() {
            write!(f, ";Sampled={}", sampled)?;
        }
        Ok(())
    }
}

/// Header value without a `Root` key.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("trace header has no Root key: {0:?}")]
pub struct InvalidTraceHeader(pub String);

/// Anything an X-Ray trace header can be read from.
pub trait TraceCarrier {
    /// The propagated trace header, if present and well formed.
    fn trace_header(&self) -> Option<TraceHeader>;
}

/// Reads the header the runtime received with the invocation.
impl TraceCarrier for lambda_runtime::Context {
    fn trace_header(&self) -> Option<TraceHeader> {
        self.xray_trace_id.as_deref().and_then(TraceHeader::parse)
    }
}

/// Reads the `x-amzn-trace-id` entry, ignoring key case.
impl TraceCarrier for HashMap<String, String> {
    fn trace_header(&self) -> Option<TraceHeader> {
        self.iter()
            .find(|(key, _)| key.eq_ignore_ascii_case(trace_headers::AWS_XRAY_TRACE_HEADER))
            .and_then(|(_, value)| TraceHeader::parse(value))
    }
}

/// Reads the `AWSTraceHeader` system attribute set by the sender.
impl TraceCarrier for SqsMessage {
    fn trace_header(&self) -> Option<TraceHeader> {
        self.attributes
            .get(trace_headers::SQS_TRACE_ATTRIBUTE)
            .and_then(|value| TraceHeader::parse(value))
    }
}

impl TraceCarrier for str {
    fn trace_header(&self) -> Option<TraceHeader> {
        TraceHeader::parse(self)
    }
}

impl TraceCarrier for TraceHeader {
    fn trace_header(&self) -> Option<TraceHeader> {
        Some(self.clone())
    }
}

impl<T: TraceCarrier> TraceCarrier for Option<T> {
    fn trace_header(&self) -> Option<TraceHeader> {
        self.as_ref().and_then(TraceCarrier::trace_header)
    }
}

impl<T: TraceCarrier + ?Sized> TraceCarrier for &T {
    fn trace_header(&self) -> Option<TraceHeader> {
        (**self).trace_header()
    }
}

impl Logger {
    /// Return a logger carrying the trace fields of `header`.
    pub fn with_trace_header(&self, header: &TraceHeader) -> Logger {
        self.with(header.fields())
    }

    /// Return a logger carrying the trace fields found on `carrier`, or a
    /// plain clone when there is none.
    #[track_caller]
    pub fn with_trace_ids<C>(&self, carrier: &C) -> Logger
    where
        C: TraceCarrier + ?Sized,
    {
        match carrier.trace_header() {
            Some(header) => self.with_trace_header(&header),
            None => {
                report_missing_context(self);
                self.clone()
            }
        }
    }
}

/// Attach the trace identifiers found on `carrier` to the global logger.
///
/// Without a trace header this is a no-op, unless the configured
/// context-missing strategy asks for an error line.
#[track_caller]
pub fn setup_trace_ids<C>(carrier: &C)
where
    C: TraceCarrier + ?Sized,
{
    match carrier.trace_header() {
        Some(header) => global::update(|logger| logger.with_trace_header(&header)),
        None => report_missing_context(&global::current()),
    }
}

#[track_caller]
fn report_missing_context(logger: &Logger) {
    if xray::context_missing_strategy() == ContextMissingStrategy::LogError {
        logger.error_w("trace context missing from invocation", Vec::<(String, Value)>::new());
    }
}
