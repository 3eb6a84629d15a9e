use aws_lambda_events::event::dynamodb::Event;
use lambda_json_log::{LoggerConfig, Sampling};
use lambda_runtime::{service_fn, Error, LambdaEvent};

/// Logs every change of a DynamoDB stream batch.
async fn handler(event: LambdaEvent<Event>) -> Result<(), Error> {
    for record in &event.payload.records {
        lambda_json_log::set_up_dynamo_record(&event.context, record);

        lambda_json_log::info_w!(
            "stream record",
            "eventName" => record.event_name,
            "eventId" => record.event_id,
            "sequenceNumber" => record.change.sequence_number,
        );
    }

    lambda_json_log::debug!("batch of {} records done", event.payload.records.len());
    Ok(())
}

#[tokio::main]
async fn main() -> Result<(), Error> {
    let config = LoggerConfig::builder()
        .log_level(std::env::var("LOG_LEVEL").unwrap_or_else(|_| "info".to_string()))
        .application("stream-auditor")
        .project("inventory")
        .project_group("warehouse")
        .sampling(Sampling::Disabled)
        .build();
    lambda_json_log::init(config);
    lambda_json_log::with_custom_attr("table", "products");
    lambda_json_log::set_up_xray();

    let result = lambda_runtime::run(service_fn(handler)).await;
    lambda_json_log::flush()?;
    result
}
