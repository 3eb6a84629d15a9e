//! X-Ray setup and propagation.
//!
//! [`set_up_xray`] runs once at cold start. It reads the X-Ray settings from the
//! environment, decides what happens when an invocation arrives without trace
//! context (ignored by default), and installs [`LambdaXrayPropagator`] as the
//! global OpenTelemetry text-map propagator, which [`extract_context`] uses to
//! read the trace context of incoming requests. A bad setting is logged as an
//! error and the defaults stay in force; setup never fails the caller.

use crate::constants::{env_vars, keys, trace_headers};
use crate::error::Error;
use crate::global;
use crate::trace::{SamplingDecision, TraceCarrier, TraceHeader};
use arc_swap::ArcSwapOption;
use opentelemetry::{
    propagation::{text_map_propagator::FieldIter, Extractor, Injector, TextMapPropagator},
    trace::TraceContextExt,
    Context,
};
use opentelemetry_aws::trace::XrayPropagator;
use serde_json::Value;
use std::collections::HashMap;
use std::env;
use std::net::{SocketAddr, ToSocketAddrs};
use std::str::FromStr;
use std::sync::Arc;

static CONFIG: ArcSwapOption<XrayConfig> = ArcSwapOption::const_empty();

/// What to do when an invocation carries no trace header.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ContextMissingStrategy {
    /// Write an error line and carry on.
    LogError,
    /// Carry on silently.
    #[default]
    IgnoreError,
}

impl FromStr for ContextMissingStrategy {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_uppercase().as_str() {
            "LOG_ERROR" => Ok(ContextMissingStrategy::LogError),
            "IGNORE_ERROR" => Ok(ContextMissingStrategy::IgnoreError),
            _ => Err(Error::InvalidContextMissingStrategy(s.to_string())),
        }
    }
}

/// TCP and UDP endpoints of the X-Ray daemon.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DaemonAddress {
    pub tcp: SocketAddr,
    pub udp: SocketAddr,
}

impl FromStr for DaemonAddress {
    type Err = Error;

    /// Accepts `host:port`, used for both protocols, or
    /// `tcp:host:port udp:host:port` in either order.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let invalid = || Error::InvalidDaemonAddress(s.to_string());
        let parts: Vec<&str> = s.split_whitespace().collect();

        match parts.as_slice() {
            [single] if !single.starts_with("tcp:") && !single.starts_with("udp:") => {
                let addr = resolve(single).ok_or_else(invalid)?;
                Ok(DaemonAddress {
                    tcp: addr,
                    udp: addr,
                })
            }
            [first, second] => {
                let mut tcp = None;
                let mut udp = None;
                for part in [first, second] {
                    if let Some(addr) = part.strip_prefix("tcp:") {
                        tcp = resolve(addr);
                    } else if let Some(addr) = part.strip_prefix("udp:") {
                        udp = resolve(addr);
                    }
                }
                match (tcp, udp) {
                    (Some(tcp), Some(udp)) => Ok(DaemonAddress { tcp, udp }),
                    _ => Err(invalid()),
                }
            }
            _ => Err(invalid()),
        }
    }
}

fn resolve(addr: &str) -> Option<SocketAddr> {
    addr.to_socket_addrs().ok().and_then(|mut addrs| addrs.next())
}

/// X-Ray settings in force for the process.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct XrayConfig {
    context_missing: ContextMissingStrategy,
    daemon_address: Option<DaemonAddress>,
}

impl XrayConfig {
    pub fn new(
        context_missing: ContextMissingStrategy,
        daemon_address: Option<DaemonAddress>,
    ) -> Self {
        Self {
            context_missing,
            daemon_address,
        }
    }

    /// Read `AWS_XRAY_CONTEXT_MISSING` and `AWS_XRAY_DAEMON_ADDRESS`.
    ///
    /// Unset variables keep the defaults (ignore missing context, no daemon
    /// address); malformed ones are an error.
    pub fn from_env() -> Result<Self, Error> {
        let context_missing = match env::var(env_vars::XRAY_CONTEXT_MISSING) {
            Ok(value) => value.parse()?,
            Err(_) => ContextMissingStrategy::default(),
        };
        let daemon_address = match env::var(env_vars::XRAY_DAEMON_ADDRESS) {
            Ok(value) => Some(value.parse()?),
            Err(_) => None,
        };

        Ok(Self::new(context_missing, daemon_address))
    }

    pub fn context_missing(&self) -> ContextMissingStrategy {
        self.context_missing
    }

    pub fn daemon_address(&self) -> Option<DaemonAddress> {
        self.daemon_address
    }
}

/// Configure X-Ray for the process.
///
/// Missing trace context is ignored unless `AWS_XRAY_CONTEXT_MISSING` says
/// otherwise. Configuration errors are logged and never returned.
pub fn set_up_xray() {
    let config = XrayConfig::from_env().unwrap_or_else(|err| {
        global::current().error(format_args!("unable to configure xray: {}", err));
        XrayConfig::default()
    });
    configure(config);
}

/// Install an explicit X-Ray configuration.
pub fn configure(config: XrayConfig) {
    CONFIG.store(Some(Arc::new(config)));
    opentelemetry::global::set_text_map_propagator(LambdaXrayPropagator::new());
}

/// The X-Ray configuration installed by [`set_up_xray`], if any.
pub fn current_config() -> Option<Arc<XrayConfig>> {
    CONFIG.load_full()
}

/// Strategy applied when an invocation has no trace header.
pub fn context_missing_strategy() -> ContextMissingStrategy {
    CONFIG
        .load_full()
        .map(|config| config.context_missing())
        .unwrap_or_default()
}

/// Extract the trace context of an incoming request with the installed
/// text-map propagator.
///
/// After [`set_up_xray`] this is [`LambdaXrayPropagator`], so requests without
/// an `x-amzn-trace-id` header still pick up the invocation's trace. The
/// result is a [`TraceCarrier`] and can be handed to
/// [`setup_trace_ids`](crate::setup_trace_ids) or [`Logger::with_trace_ids`](crate::Logger::with_trace_ids).
///
/// # Example
///
/// ```no_run
/// use std::collections::HashMap;
///
/// lambda_json_log::set_up_xray();
///
/// let headers = HashMap::from([(
///     "x-amzn-trace-id".to_string(),
///     "Root=1-5759e988-bd862e3fe1be46a994272793;Parent=53995c3f42cd8ad8;Sampled=1".to_string(),
/// )]);
/// lambda_json_log::setup_trace_ids(&lambda_json_log::extract_context(&headers));
/// ```
pub fn extract_context(extractor: &dyn Extractor) -> Context {
    opentelemetry::global::get_text_map_propagator(|propagator| propagator.extract(extractor))
}

/// X-Ray propagator falling back to the invocation's own trace header.
///
/// When the carrier holds no usable X-Ray context, the header the Lambda
/// runtime exposes in `_X_AMZN_TRACE_ID` is parsed as a [`TraceHeader`] and
/// used instead. Injection is plain X-Ray.
#[derive(Debug, Default)]
pub struct LambdaXrayPropagator {
    xray: XrayPropagator,
}

impl LambdaXrayPropagator {
    pub fn new() -> Self {
        Self::default()
    }

    fn extract_header(&self, cx: &Context, header: &TraceHeader) -> Context {
        let carrier = HashMap::from([(
            trace_headers::AWS_XRAY_TRACE_HEADER.to_string(),
            header.to_string(),
        )]);
        self.xray.extract_with_context(cx, &carrier)
    }
}

impl TextMapPropagator for LambdaXrayPropagator {
    fn fields(&self) -> FieldIter<'_> {
        self.xray.fields()
    }

    fn extract_with_context(&self, cx: &Context, extractor: &dyn Extractor) -> Context {
        let extracted = self.xray.extract_with_context(cx, extractor);
        if extracted.trace_header().is_some() {
            return extracted;
        }

        let Some(header) = invocation_trace_header() else {
            return extracted;
        };
        let fallback = self.extract_header(cx, &header);
        if fallback.trace_header().is_none() {
            return extracted;
        }

        global::current().debug_w(
            "trace context taken from the invocation environment",
            [(keys::TRACE_ID, Value::from(header.trace_id()))],
        );
        fallback
    }

    fn inject_context(&self, cx: &Context, injector: &mut dyn Injector) {
        self.xray.inject_context(cx, injector)
    }
}

fn invocation_trace_header() -> Option<TraceHeader> {
    env::var(env_vars::XRAY_TRACE_ID)
        .ok()
        .as_deref()
        .and_then(TraceHeader::parse)
}

/// Reads the X-Ray identity of the span active in an OpenTelemetry context.
impl TraceCarrier for Context {
    fn trace_header(&self) -> Option<TraceHeader> {
        let span = self.span();
        let span_context = span.span_context();
        if !span_context.is_valid() {
            return None;
        }

        let trace_id = span_context.trace_id().to_string();
        let (epoch, unique) = trace_id.split_at(8);
        let sampling_decision = if span_context.is_sampled() {
            SamplingDecision::Sampled
        } else {
            SamplingDecision::NotSampled
        };

        Some(TraceHeader::new(
            format!("1-{}-{}", epoch, unique),
            Some(span_context.span_id().to_string()),
            sampling_decision,
        ))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::logger::test_support::{capture_logger, config, Capture};
    use opentelemetry::trace::{SpanContext, SpanId, TraceFlags, TraceId, TraceState};
    use sealed_test::prelude::*;
    use serial_test::serial;

    const TRACE_ID: &str = "1-5759e988-bd862e3fe1be46a994272793";
    const PARENT_ID: &str = "53995c3f42cd8ad8";

    fn header() -> String {
        format!("Root={};Parent={};Sampled=1", TRACE_ID, PARENT_ID)
    }

    #[test]
    fn test_context_missing_strategy_parsing() {
        assert_eq!(
            "LOG_ERROR".parse::<ContextMissingStrategy>().unwrap(),
            ContextMissingStrategy::LogError
        );
        assert_eq!(
            "ignore_error".parse::<ContextMissingStrategy>().unwrap(),
            ContextMissingStrategy::IgnoreError
        );
        assert!(matches!(
            "RUNTIME_ERROR".parse::<ContextMissingStrategy>(),
            Err(Error::InvalidContextMissingStrategy(_))
        ));
    }

    #[test]
    fn test_daemon_address_parsing() {
        let single: DaemonAddress = "127.0.0.1:2000".parse().unwrap();
        assert_eq!(single.tcp, single.udp);
        assert_eq!(single.udp.port(), 2000);

        let split: DaemonAddress = "udp:127.0.0.1:2000 tcp:127.0.0.2:2001".parse().unwrap();
        assert_eq!(split.udp.port(), 2000);
        assert_eq!(split.tcp.port(), 2001);

        assert!("127.0.0.1".parse::<DaemonAddress>().is_err());
        assert!("tcp:127.0.0.1:2000".parse::<DaemonAddress>().is_err());
        assert!("tcp:127.0.0.1:2000 tcp:127.0.0.1:2001"
            .parse::<DaemonAddress>()
            .is_err());
    }

    #[sealed_test(env = [
        ("AWS_XRAY_CONTEXT_MISSING", "LOG_ERROR"),
        ("AWS_XRAY_DAEMON_ADDRESS", "169.254.79.129:2000"),
    ])]
    fn test_config_from_env() {
        let config = XrayConfig::from_env().unwrap();

        assert_eq!(config.context_missing(), ContextMissingStrategy::LogError);
        assert_eq!(
            config.daemon_address().unwrap().udp,
            "169.254.79.129:2000".parse::<SocketAddr>().unwrap()
        );
    }

    #[sealed_test(env = [("AWS_XRAY_DAEMON_ADDRESS", "not an address at all")])]
    fn test_set_up_xray_logs_configuration_errors() {
        let capture = Capture::default();
        let writer = capture.clone();
        global::init_with_writer(config("info"), move || writer.clone());

        set_up_xray();

        let lines = capture.lines();
        assert_eq!(lines.len(), 1);
        assert_eq!(lines[0]["level"], "ERROR");
        assert!(lines[0]["message"]
            .as_str()
            .unwrap()
            .starts_with("unable to configure xray"));
        assert_eq!(
            context_missing_strategy(),
            ContextMissingStrategy::IgnoreError
        );
        assert!(current_config().is_some());
    }

    #[sealed_test(env = [("AWS_XRAY_CONTEXT_MISSING", "LOG_ERROR")])]
    fn test_log_error_strategy_reports_missing_context() {
        let capture = Capture::default();
        let writer = capture.clone();
        global::init_with_writer(config("info"), move || writer.clone());

        set_up_xray();
        let direct_line = line!() + 1;
        crate::setup_trace_ids(&lambda_runtime::Context::default());
        let adapter_line = line!() + 1;
        crate::set_up_sqs_record(&lambda_runtime::Context::default(), &Default::default());

        let lines = capture.lines();
        assert_eq!(lines.len(), 2);
        assert_eq!(lines[0]["message"], "trace context missing from invocation");
        assert!(lines[0].get("traceId").is_none());
        assert_eq!(lines[0]["caller"], format!("src/xray.rs:{}", direct_line));
        assert_eq!(lines[1]["caller"], format!("src/xray.rs:{}", adapter_line));
    }

    fn headers(value: &str) -> HashMap<String, String> {
        HashMap::from([(
            trace_headers::AWS_XRAY_TRACE_HEADER.to_string(),
            value.to_string(),
        )])
    }

    #[test]
    #[serial]
    fn test_extracted_context_feeds_trace_ids() {
        configure(XrayConfig::default());
        let (logger, capture) = capture_logger(&config("info"));

        let context = extract_context(&headers(&header()));
        logger.with_trace_ids(&context).info(format_args!("traced"));

        let lines = capture.lines();
        assert_eq!(lines[0]["traceId"], TRACE_ID);
        assert_eq!(lines[0]["correlationId"], TRACE_ID);
        assert_eq!(lines[0]["spanId"], PARENT_ID);
        assert_eq!(lines[0]["traceFlags"], true);
    }

    #[sealed_test(env = [(
        "_X_AMZN_TRACE_ID",
        "Root=1-5759e988-bd862e3fe1be46a994272793;Parent=53995c3f42cd8ad8;Sampled=1;Lineage=a87bd80c:0"
    )])]
    fn test_invocation_header_fills_empty_carrier() {
        let capture = Capture::default();
        let writer = capture.clone();
        global::init_with_writer(config("debug"), move || writer.clone());
        configure(XrayConfig::default());

        crate::setup_trace_ids(&extract_context(&HashMap::<String, String>::new()));
        global::info(format_args!("traced"));

        let lines = capture.lines();
        assert_eq!(lines.len(), 2);
        assert_eq!(lines[0]["level"], "DEBUG");
        assert_eq!(
            lines[0]["message"],
            "trace context taken from the invocation environment"
        );
        assert_eq!(lines[1]["traceId"], TRACE_ID);
        assert_eq!(lines[1]["spanId"], PARENT_ID);
    }

    #[sealed_test(env = [(
        "_X_AMZN_TRACE_ID",
        "Root=1-5759e988-bd862e3fe1be46a994272793;Parent=53995c3f42cd8ad8;Sampled=1"
    )])]
    fn test_request_header_wins_over_invocation_header() {
        configure(XrayConfig::default());

        let context = extract_context(&headers(
            "Root=1-58406520-a006649127e371903a2de979;Parent=4c721bf33e3caf8f;Sampled=1",
        ));

        assert_eq!(
            context.trace_header().unwrap().trace_id(),
            "1-58406520-a006649127e371903a2de979"
        );
    }

    #[sealed_test(env = [("_X_AMZN_TRACE_ID", "Parent=53995c3f42cd8ad8;Sampled=1")])]
    fn test_invocation_header_without_root_is_ignored() {
        configure(XrayConfig::default());

        let context = extract_context(&HashMap::<String, String>::new());

        assert!(context.trace_header().is_none());
    }

    #[test]
    fn test_otel_context_as_trace_carrier() {
        let span_context = SpanContext::new(
            TraceId::from_hex("5759e988bd862e3fe1be46a994272793").unwrap(),
            SpanId::from_hex(PARENT_ID).unwrap(),
            TraceFlags::default(),
            true,
            TraceState::default(),
        );
        let context = Context::new().with_remote_span_context(span_context);

        let header = context.trace_header().unwrap();
        assert_eq!(header.trace_id(), TRACE_ID);
        assert_eq!(header.parent_id(), Some(PARENT_ID));
        assert_eq!(header.sampling_decision(), SamplingDecision::NotSampled);

        assert!(Context::new().trace_header().is_none());
    }
}
