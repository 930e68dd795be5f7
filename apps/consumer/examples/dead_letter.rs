use std::sync::Arc;

use async_trait::async_trait;
use pull_consumer::messaging::{InMemoryPubSub, Publisher};
use pull_consumer::metrics::Metrics;
use pull_consumer::{
    ConsumerConfig, ConsumerFactory, Delivery, Handler, HandlerError, Message, Worker, logging,
};
use serde::Deserialize;
use tokio::sync::Notify;
use tracing::{info, warn};

const TOPIC: &str = "telemetry";
const EVENT_VERSION_ATTRIBUTE: &str = "x-event-version";

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct TelemetryEvent {
    event_type: String,
    message: String,
    #[serde(default)]
    fail: bool,
}

struct TelemetryHandler;

#[async_trait]
impl Handler<TelemetryEvent> for TelemetryHandler {
    async fn handle(
        &self,
        event: TelemetryEvent,
        delivery: &mut Delivery<'_>,
    ) -> Result<(), HandlerError> {
        let version = delivery
            .message()
            .attribute(EVENT_VERSION_ATTRIBUTE)
            .unwrap_or("v1");

        if version != "v1" {
            return Err(HandlerError::failed(format!(
                "Unsupported event version: {version}. Only v1 is supported."
            )));
        }
        if event.fail {
            return Err(HandlerError::failed("Simulated failure"));
        }

        info!(
            event_type = %event.event_type,
            text = %event.message,
            "Handled telemetry event"
        );
        Ok(())
    }
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let config = ConsumerConfig::from_env().unwrap_or_else(|_| {
        ConsumerConfig::new("telemetry-worker")
            .with_failed_topic("telemetry-failed")
            .with_max_processed_messages(Some(5))
    });

    logging::init_global(&config.rust_log)?;

    let broker = Arc::new(InMemoryPubSub::new());
    broker.create_subscription(TOPIC, &config.subscription_name);
    if let Some(failed) = &config.failed_topic_name {
        broker.create_subscription(failed, "telemetry-failed-inspector");
    }

    let messages = vec![
        Message::new(r#"{"eventType":"log","message":"Success message 1"}"#),
        Message::new(r#"{"eventType":"log","message":"Will fail","fail":true}"#),
        Message::new("this is not json"),
        Message::new(r#"{"eventType":"log","message":"From the future"}"#)
            .with_attribute(EVENT_VERSION_ATTRIBUTE, "v2"),
        Message::new(r#"{"eventType":"log","message":"Success message 2"}"#),
    ];
    for message in &messages {
        broker.publish(message, TOPIC).await?;
    }

    let factory = ConsumerFactory::new(Arc::clone(&broker), logging::console_logger(&config.rust_log));
    let mut consumer = factory.create_from_config(&config);
    let metrics = Metrics::new()?;
    consumer
        .set_callback::<TelemetryEvent, _>(TelemetryHandler)
        .set_metrics(Arc::clone(&metrics));

    let shutdown = Arc::new(Notify::new());
    let trigger = Arc::clone(&shutdown);
    tokio::spawn(async move {
        tokio::time::sleep(std::time::Duration::from_secs(1)).await;
        trigger.notify_one();
    });

    let mut worker = Worker::new(consumer, shutdown);
    let handled = worker.run().await?;

    info!(handled, "Worker finished");
    if let Some(failed) = &config.failed_topic_name {
        warn!(
            topic = %failed,
            count = broker.published_to(failed).len(),
            "Messages waiting on failed topic"
        );
    }
    println!("{}", metrics.render()?);
    Ok(())
}
