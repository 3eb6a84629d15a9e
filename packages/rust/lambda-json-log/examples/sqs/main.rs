use aws_lambda_events::event::sqs::{BatchItemFailure, SqsBatchResponse, SqsEvent};
use lambda_json_log::LoggerConfig;
use lambda_runtime::{service_fn, Error, LambdaEvent};
use serde_json::Value;

/// Processes an SQS batch, logging each message with its own trace ids.
///
/// The invocation's trace ids go on the global logger; each message gets a
/// scoped logger carrying the trace header SQS attached to it, so lines
/// written while handling a message point at the trace that produced it.
async fn handler(event: LambdaEvent<SqsEvent>) -> Result<SqsBatchResponse, Error> {
    lambda_json_log::set_up_sqs(&event.context, &event.payload);
    lambda_json_log::info!("received {} messages", event.payload.records.len());

    let mut response = SqsBatchResponse::default();
    for record in &event.payload.records {
        let logger = lambda_json_log::current().log_event(record, record);

        match record
            .body
            .as_deref()
            .map(serde_json::from_str::<Value>)
        {
            Some(Ok(body)) => {
                logger.info_w(
                    "message processed",
                    [
                        ("messageId", lambda_json_log::to_value(&record.message_id)),
                        ("kind", body.get("kind").cloned().unwrap_or(Value::Null)),
                    ],
                );
            }
            Some(Err(err)) => {
                logger.warn(format_args!("message body is not JSON: {}", err));
                response.batch_item_failures.push(BatchItemFailure {
                    item_identifier: record.message_id.clone().unwrap_or_default(),
                });
            }
            None => logger.warn_w(
                "empty message",
                [("messageId", lambda_json_log::to_value(&record.message_id))],
            ),
        }
    }

    Ok(response)
}

#[tokio::main]
async fn main() -> Result<(), Error> {
    lambda_json_log::init(LoggerConfig::from_env());
    lambda_json_log::set_up_xray();
    lambda_json_log::init_subscriber()?;

    let result = lambda_runtime::run(service_fn(handler)).await;
    lambda_json_log::flush()?;
    result
}
