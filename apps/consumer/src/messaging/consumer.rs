use std::any::Any;
use std::panic::AssertUnwindSafe;
use std::sync::Arc;
use std::time::Instant;

use async_trait::async_trait;
use futures::FutureExt;
use tracing::instrument::WithSubscriber;
use tracing::{Dispatch, debug, error, info, warn};

use super::counter::ConsumptionCounter;
use super::delivery::Delivery;
use super::handler::{Dispatcher, FnHandler, Handler, HandlerError, Hook, TypedDispatcher};
use super::message::Message;
use super::payload::{PayloadFormat, PayloadShape};
use super::processor::MessageProcessor;
use super::router::{FailureRouter, Route};
use super::transport::{Publisher, Subscription, TransportError};
use crate::config::ConsumerConfig;
use crate::error::ConsumeError;
use crate::metrics::Metrics;

/// How the in-flight message was finally resolved.
#[derive(Debug, Clone, PartialEq, Eq)]
enum Resolution {
    Acknowledged,
    DeadLettered,
    Rejected,
    Abandoned,
}

impl Resolution {
    fn label(&self) -> &'static str {
        match self {
            Self::Acknowledged => "acknowledged",
            Self::DeadLettered => "dead_lettered",
            Self::Rejected => "rejected",
            Self::Abandoned => "abandoned",
        }
    }
}

/// Pulls and resolves messages from one subscription, one at a time.
pub struct Consumer {
    subscription: Arc<dyn Subscription>,
    publisher: Arc<dyn Publisher>,
    logger: Dispatch,
    processor: MessageProcessor,
    router: FailureRouter,
    counter: ConsumptionCounter,
    metrics: Option<Arc<Metrics>>,
}

impl Consumer {
    /// `logger` receives every event emitted while a message is consumed; pass
    /// [`crate::logging::noop_logger`] to discard them.
    pub fn new(
        subscription: Arc<dyn Subscription>,
        publisher: Arc<dyn Publisher>,
        logger: Dispatch,
    ) -> Self {
        Self {
            subscription,
            publisher,
            logger,
            processor: MessageProcessor::new(),
            router: FailureRouter::default(),
            counter: ConsumptionCounter::default(),
            metrics: None,
        }
    }

    pub fn apply_config(&mut self, config: &ConsumerConfig) -> &mut Self {
        self.set_failed_topic_name(config.failed_topic_name.clone());
        self.set_maximum_number_of_processed_messages(config.max_processed_messages);
        self.set_payload_format(config.payload_format);
        self
    }

    /// Registers the callback together with the payload shape it expects.
    pub fn set_callback<T, H>(&mut self, handler: H) -> &mut Self
    where
        T: PayloadShape,
        H: Handler<T> + 'static,
    {
        self.processor
            .set_dispatcher(Arc::new(TypedDispatcher::<T, H>::new(handler)));
        self
    }

    pub fn set_callback_fn<T, F>(&mut self, callback: F) -> &mut Self
    where
        T: PayloadShape,
        F: Fn(T, &Message) -> Result<(), HandlerError> + Send + Sync + 'static,
    {
        self.set_callback::<T, FnHandler<F>>(FnHandler(callback))
    }

    /// Replaces the dispatch step; no callback is needed afterwards.
    pub fn set_dispatcher(&mut self, dispatcher: Arc<dyn Dispatcher>) -> &mut Self {
        self.processor.set_dispatcher(dispatcher);
        self
    }

    pub fn set_before_hook(&mut self, hook: Option<Arc<dyn Hook>>) -> &mut Self {
        self.processor.set_before_hook(hook);
        self
    }

    pub fn set_after_hook(&mut self, hook: Option<Arc<dyn Hook>>) -> &mut Self {
        self.processor.set_after_hook(hook);
        self
    }

    pub fn set_failed_topic_name(&mut self, topic: Option<String>) -> &mut Self {
        self.router.set_failed_topic(topic);
        self
    }

    /// `None` means no limit.
    pub fn set_maximum_number_of_processed_messages(&mut self, maximum: Option<u64>) -> &mut Self {
        self.counter.set_maximum(maximum);
        self
    }

    pub fn set_payload_format(&mut self, format: PayloadFormat) -> &mut Self {
        self.processor.set_format(format);
        self
    }

    pub fn set_metrics(&mut self, metrics: Arc<Metrics>) -> &mut Self {
        self.metrics = Some(metrics);
        self
    }

    pub fn can_consume(&self) -> bool {
        self.counter.can_consume()
    }

    pub fn processed_count(&self) -> u64 {
        self.counter.processed()
    }

    pub fn subscription_name(&self) -> &str {
        self.subscription.name()
    }

    pub fn failed_topic_name(&self) -> Option<&str> {
        self.router.failed_topic()
    }

    pub fn logger(&self) -> &Dispatch {
        &self.logger
    }

    /// Pulls at most one message and resolves it before returning.
    ///
    /// With `should_block` set, an empty subscription is reported as
    /// [`ConsumeError::Timeout`]; otherwise it is a silent no-op. Parse and
    /// processing failures are routed and do not surface here.
    pub async fn consume_one_msg(&mut self, should_block: bool) -> Result<(), ConsumeError> {
        let logger = self.logger.clone();
        self.consume(should_block).with_subscriber(logger).await
    }

    async fn consume(&mut self, should_block: bool) -> Result<(), ConsumeError> {
        let subscription = Arc::clone(&self.subscription);
        let publisher = Arc::clone(&self.publisher);

        let Some(message) = subscription.pull(!should_block).await? else {
            if should_block {
                return Err(ConsumeError::Timeout {
                    subscription: subscription.name().to_string(),
                });
            }
            debug!(subscription = %subscription.name(), "No message available");
            return Ok(());
        };

        let message_id = message.id().to_string();
        debug!(
            subscription = %subscription.name(),
            message_id = %message_id,
            payload_size = message.data().len(),
            "Processing message"
        );

        let start = Instant::now();
        let mut delivery = Delivery::new(message, subscription.as_ref(), publisher.as_ref());

        let processed = AssertUnwindSafe(self.processor.process(&mut delivery))
            .catch_unwind()
            .await
            .unwrap_or_else(|panic| {
                Err(ConsumeError::Processing(HandlerError::failed(format!(
                    "Processing panicked: {}",
                    panic_message(panic.as_ref())
                ))))
            });

        let (outcome, mut resolution): (Result<(), ConsumeError>, Resolution) =
            match processed {
                Ok(()) => (Ok(()), Resolution::Acknowledged),
                Err(failure) if failure.is_recoverable() => {
                    self.record_failure(&failure);
                    match self.router.route(&failure, &mut delivery).await {
                        Ok(Route::DeadLettered { .. }) => (Ok(()), Resolution::DeadLettered),
                        Ok(Route::Rejected) => (Ok(()), Resolution::Rejected),
                        Err(e) => {
                            error!(
                                message_id = %message_id,
                                error = %e,
                                "Failed to route message, leaving it for redelivery"
                            );
                            delivery.abandon();
                            (Err(e.into()), Resolution::Abandoned)
                        }
                    }
                }
                Err(failure) => {
                    self.record_failure(&failure);
                    error!(message_id = %message_id, error = %failure, "Cannot process message");
                    let resolution = match delivery.reject().await {
                        Ok(()) => Resolution::Rejected,
                        Err(e) => {
                            warn!(message_id = %message_id, error = %e, "Failed to reject message");
                            delivery.abandon();
                            Resolution::Abandoned
                        }
                    };
                    (Err(failure), resolution)
                }
            };

        // Unconditional; a no-op when the message was already resolved.
        let acknowledged = delivery.acknowledge().await;
        if acknowledged.is_err() {
            resolution = Resolution::Abandoned;
        }
        self.counter.record();
        self.record_resolution(&resolution, start.elapsed().as_secs_f64());

        info!(
            message_id = %message_id,
            resolution = resolution.label(),
            processed = self.counter.processed(),
            "Message resolved"
        );

        outcome?;
        acknowledged?;
        Ok(())
    }

    fn record_failure(&self, failure: &ConsumeError) {
        if let Some(metrics) = &self.metrics {
            metrics
                .messages_failed_total
                .with_label_values(&[self.subscription.name(), failure.error_type()])
                .inc();
        }
    }

    fn record_resolution(&self, resolution: &Resolution, duration: f64) {
        let Some(metrics) = &self.metrics else {
            return;
        };
        let subscription = self.subscription.name();

        metrics
            .messages_processed_total
            .with_label_values(&[subscription, resolution.label()])
            .inc();
        metrics
            .message_processing_duration_seconds
            .with_label_values(&[subscription, resolution.label()])
            .observe(duration);

        if *resolution == Resolution::DeadLettered {
            let topic = self.router.failed_topic().unwrap_or_default();
            metrics
                .messages_dead_lettered_total
                .with_label_values(&[subscription, topic])
                .inc();
        }
    }
}

fn panic_message(payload: &(dyn Any + Send)) -> &str {
    if let Some(s) = payload.downcast_ref::<&str>() {
        s
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.as_str()
    } else {
        "Unknown panic payload"
    }
}

#[async_trait]
impl Publisher for Consumer {
    async fn publish(&self, message: &Message, topic: &str) -> Result<(), TransportError> {
        self.publisher.publish(message, topic).await
    }
}
