//! Event intake logging.
//!
//! Each Lambda invocation starts the same way: pick up the trace identity of
//! the invocation, then, when debug logging is on, log the incoming payload
//! with a label naming its source. The work is done by one generic function
//! over [`LoggableEvent`]; the named adapters only fix the event type.
//!
//! Payloads can be large, so the serialization sits behind an explicit
//! [`is_debug_enabled`](Logger::is_debug_enabled) guard and is skipped
//! entirely when debug is off.
//!
//! # Event Sources
//!
//! | Event                     | `eventSource`                     |
//! |---------------------------|-----------------------------------|
//! | [`SnsEvent`]              | `"sns"`                           |
//! | [`SnsRecord`]             | the record's `EventSource`        |
//! | [`SqsEvent`]              | `"sqs"`                           |
//! | [`SqsMessage`]            | the message's `eventSource`       |
//! | DynamoDB [`EventRecord`]  | the record's `eventSource`        |
//!
//! # Example
//!
//! ```no_run
//! use aws_lambda_events::event::sqs::SqsEvent;
//! use lambda_runtime::{service_fn, Error, LambdaEvent};
//!
//! async fn handler(event: LambdaEvent<SqsEvent>) -> Result<(), Error> {
//!     lambda_json_log::set_up_sqs(&event.context, &event.payload);
//!     lambda_json_log::info!("processing {} messages", event.payload.records.len());
//!     Ok(())
//! }
//! ```

use crate::constants::{defaults, keys};
use crate::encode::to_json_string;
use crate::global;
use crate::logger::Logger;
use crate::trace::{setup_trace_ids, TraceCarrier};
use aws_lambda_events::event::dynamodb::EventRecord;
use aws_lambda_events::event::sns::{SnsEvent, SnsRecord};
use aws_lambda_events::event::sqs::{SqsEvent, SqsMessage};
use lambda_runtime::Context;
use serde::Serialize;
use serde_json::Value;
use std::borrow::Cow;
use std::fmt::Debug;

/// Event payloads that can be logged on intake.
pub trait LoggableEvent: Serialize + Debug {
    /// Label written as `eventSource`.
    fn event_source(&self) -> Cow<'_, str>;
}

impl LoggableEvent for SnsEvent {
    fn event_source(&self) -> Cow<'_, str> {
        Cow::Borrowed("sns")
    }
}

impl LoggableEvent for SnsRecord {
    fn event_source(&self) -> Cow<'_, str> {
        Cow::Borrowed(&self.event_source)
    }
}

impl LoggableEvent for SqsEvent {
    fn event_source(&self) -> Cow<'_, str> {
        Cow::Borrowed("sqs")
    }
}

impl LoggableEvent for SqsMessage {
    fn event_source(&self) -> Cow<'_, str> {
        Cow::Borrowed(self.event_source.as_deref().unwrap_or_default())
    }
}

impl LoggableEvent for EventRecord {
    fn event_source(&self) -> Cow<'_, str> {
        Cow::Borrowed(self.event_source.as_deref().unwrap_or_default())
    }
}

impl<T: LoggableEvent + ?Sized> LoggableEvent for &T {
    fn event_source(&self) -> Cow<'_, str> {
        (**self).event_source()
    }
}

impl Logger {
    /// Return a logger carrying the invocation's trace ids, logging `event`
    /// at debug level first.
    #[track_caller]
    pub fn log_event<C, E>(&self, carrier: &C, event: &E) -> Logger
    where
        C: TraceCarrier + ?Sized,
        E: LoggableEvent + ?Sized,
    {
        let logger = self.with_trace_ids(carrier);
        log_event_body(&logger, event);
        logger
    }
}

/// Set up trace ids on the global logger and log `event` at debug level.
#[track_caller]
pub fn set_up_event<C, E>(carrier: &C, event: &E)
where
    C: TraceCarrier + ?Sized,
    E: LoggableEvent + ?Sized,
{
    setup_trace_ids(carrier);
    log_event_body(&global::current(), event);
}

#[track_caller]
pub fn set_up_sns(context: &Context, event: &SnsEvent) {
    set_up_event(context, event);
}

#[track_caller]
pub fn set_up_sns_record(context: &Context, event: &SnsRecord) {
    set_up_event(context, event);
}

#[track_caller]
pub fn set_up_sqs(context: &Context, event: &SqsEvent) {
    set_up_event(context, event);
}

#[track_caller]
pub fn set_up_sqs_record(context: &Context, event: &SqsMessage) {
    set_up_event(context, event);
}

#[track_caller]
pub fn set_up_dynamo_record(context: &Context, event: &EventRecord) {
    set_up_event(context, event);
}

#[track_caller]
fn log_event_body<E>(logger: &Logger, event: &E)
where
    E: LoggableEvent + ?Sized,
{
    if !logger.is_debug_enabled() {
        return;
    }

    logger.debug_w(
        defaults::EVENT_MESSAGE,
        [
            (keys::EVENT_SOURCE, Value::from(event.event_source().into_owned())),
            (keys::EVENT_BODY, Value::from(to_json_string(event))),
        ],
    );
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::logger::test_support::{capture_logger, config, Capture};
    use serde::Serializer;
    use serde_json::json;
    use serial_test::serial;
    use std::collections::HashMap;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;

    #[derive(Debug, Default, Clone)]
    struct CountingEvent {
        serializations: Arc<AtomicUsize>,
    }

    impl Serialize for CountingEvent {
        fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
            self.serializations.fetch_add(1, Ordering::SeqCst);
            serializer.serialize_str("counted")
        }
    }

    impl LoggableEvent for CountingEvent {
        fn event_source(&self) -> Cow<'_, str> {
            Cow::Borrowed("sqs")
        }
    }

    fn traced_context() -> Context {
        let mut context = Context::default();
        context.xray_trace_id = Some("Root=1-abc;Parent=span1;Sampled=1".to_string());
        context
    }

    fn sqs_message() -> SqsMessage {
        SqsMessage {
            message_id: Some("059f36b4-87a3-44ab-83d2-661975830a7d".to_string()),
            body: Some("hello".to_string()),
            event_source: Some("aws:sqs".to_string()),
            attributes: HashMap::from([("ApproximateReceiveCount".to_string(), "1".to_string())]),
            ..Default::default()
        }
    }

    fn sns_record() -> SnsRecord {
        serde_json::from_value(json!({
            "EventVersion": "1.0",
            "EventSubscriptionArn": "arn:aws:sns:us-east-1:123456789012:sns-lambda:21be56ed-a058-49f5-8c98-aedd2564c486",
            "EventSource": "aws:sns",
            "Sns": {
                "SignatureVersion": "1",
                "Timestamp": "2019-01-02T12:45:07.000Z",
                "Signature": "tcc6faL2yUC6dgZdmrwh1Y4cGa/ebXEkAi6RibDsvpi+tE/1+82j...65r==",
                "SigningCertUrl": "https://sns.us-east-1.amazonaws.com/SimpleNotificationService-ac565b8b1a6c5d002d285f9598aa1d9b.pem",
                "MessageId": "95df01b4-ee98-5cb9-9903-4c221d41eb5e",
                "Message": "Hello from SNS!",
                "MessageAttributes": {},
                "Type": "Notification",
                "UnsubscribeUrl": "https://sns.us-east-1.amazonaws.com/?Action=Unsubscribe",
                "TopicArn": "arn:aws:sns:us-east-1:123456789012:sns-lambda",
                "Subject": "TestInvoke"
            }
        }))
        .unwrap()
    }

    fn dynamo_record() -> EventRecord {
        serde_json::from_value(json!({
            "eventID": "c4ca4238a0b923820dcc509a6f75849b",
            "eventName": "INSERT",
            "eventVersion": "1.1",
            "eventSource": "aws:dynamodb",
            "awsRegion": "us-east-1",
            "dynamodb": {
                "ApproximateCreationDateTime": 1428537600,
                "Keys": {"Id": {"N": "101"}},
                "NewImage": {"Message": {"S": "New item!"}, "Id": {"N": "101"}},
                "SequenceNumber": "4421584500000000017450439091",
                "SizeBytes": 26,
                "StreamViewType": "NEW_AND_OLD_IMAGES"
            },
            "eventSourceARN": "arn:aws:dynamodb:us-east-1:123456789012:table/ExampleTableWithStream/stream/2015-06-27T00:48:05.899"
        }))
        .unwrap()
    }

    fn init_capture(level: &str) -> Capture {
        let capture = Capture::default();
        let writer = capture.clone();
        global::init_with_writer(config(level), move || writer.clone());
        capture
    }

    #[test]
    fn test_event_source_labels() {
        let sns: SnsEvent = serde_json::from_value(json!({"Records": []})).unwrap();
        let sqs = SqsEvent {
            records: vec![sqs_message()],
        };

        assert_eq!(sns.event_source(), "sns");
        assert_eq!(sns_record().event_source(), "aws:sns");
        assert_eq!(sqs.event_source(), "sqs");
        assert_eq!(sqs_message().event_source(), "aws:sqs");
        assert_eq!(dynamo_record().event_source(), "aws:dynamodb");
        assert_eq!(SqsMessage::default().event_source(), "");
    }

    #[test]
    fn test_batch_event_is_not_serialized_when_debug_is_off() {
        let (logger, capture) = capture_logger(&config("info"));
        let event = CountingEvent::default();

        logger.log_event(&traced_context(), &event);

        assert_eq!(event.serializations.load(Ordering::SeqCst), 0);
        assert!(capture.lines().is_empty());
    }

    #[test]
    fn test_event_is_serialized_once_when_debug_is_on() {
        let (logger, capture) = capture_logger(&config("debug"));
        let event = CountingEvent::default();

        logger.log_event(&traced_context(), &event);

        assert_eq!(event.serializations.load(Ordering::SeqCst), 1);
        let lines = capture.lines();
        assert_eq!(lines.len(), 1);
        assert_eq!(lines[0]["eventBody"], "\"counted\"");
    }

    #[test]
    fn test_log_event_returns_traced_logger() {
        let (logger, capture) = capture_logger(&config("info"));

        let scoped = logger.log_event(&traced_context(), &sqs_message());
        scoped.info(format_args!("handled"));

        let lines = capture.lines();
        assert_eq!(lines.len(), 1);
        assert_eq!(lines[0]["traceId"], "1-abc");
        assert!(logger.context().iter().all(|(key, _)| key != "traceId"));
    }

    #[test]
    #[serial]
    fn test_set_up_sqs_record_logs_one_debug_line() {
        let capture = init_capture("debug");
        let message = sqs_message();

        set_up_sqs_record(&traced_context(), &message);

        let lines = capture.lines();
        assert_eq!(lines.len(), 1);
        let line = &lines[0];
        assert_eq!(line["level"], "DEBUG");
        assert_eq!(line["message"], "Got event");
        assert_eq!(line["eventSource"], "aws:sqs");
        assert_eq!(line["traceId"], "1-abc");

        let body: Value = serde_json::from_str(line["eventBody"].as_str().unwrap()).unwrap();
        assert_eq!(body, serde_json::to_value(&message).unwrap());
    }

    #[test]
    #[serial]
    fn test_set_up_sqs_skips_body_when_debug_is_off() {
        let capture = init_capture("info");
        let event = SqsEvent {
            records: vec![sqs_message()],
        };

        set_up_sqs(&traced_context(), &event);

        assert!(capture.lines().is_empty());
        assert_eq!(
            global::current()
                .context()
                .iter()
                .find(|(key, _)| key == "traceId")
                .map(|(_, value)| value.clone()),
            Some(json!("1-abc"))
        );
    }

    #[test]
    #[serial]
    fn test_batch_adapters_use_fixed_labels() {
        let capture = init_capture("debug");
        let sns: SnsEvent = serde_json::from_value(json!({"Records": []})).unwrap();
        let sqs = SqsEvent { records: vec![] };

        set_up_sns(&Context::default(), &sns);
        set_up_sqs(&Context::default(), &sqs);

        let lines = capture.lines();
        assert_eq!(lines[0]["eventSource"], "sns");
        assert_eq!(lines[1]["eventSource"], "sqs");
        assert!(lines[0].get("traceId").is_none());
    }

    #[test]
    #[serial]
    fn test_record_adapters_use_record_labels() {
        let capture = init_capture("debug");

        set_up_sns_record(&traced_context(), &sns_record());
        set_up_dynamo_record(&traced_context(), &dynamo_record());

        let lines = capture.lines();
        assert_eq!(lines[0]["eventSource"], "aws:sns");
        assert_eq!(lines[1]["eventSource"], "aws:dynamodb");
        assert!(lines[1]["eventBody"]
            .as_str()
            .unwrap()
            .contains("c4ca4238a0b923820dcc509a6f75849b"));
    }

    #[test]
    #[serial]
    fn test_generic_adapter_accepts_custom_events() {
        let capture = init_capture("info");
        let event = CountingEvent::default();

        set_up_event(&traced_context(), &event);

        assert_eq!(event.serializations.load(Ordering::SeqCst), 0);
        assert!(capture.lines().is_empty());
    }
}
