use std::sync::Arc;

use futures::FutureExt;
use tokio::sync::Notify;
use tracing::{debug, info};

use crate::error::ConsumeError;
use crate::messaging::Consumer;

/// Drives a [`Consumer`] until its limit is reached or shutdown is signalled.
///
/// Shutdown is only observed between messages, so an in-flight message is always
/// resolved before the loop exits.
pub struct Worker {
    consumer: Consumer,
    shutdown: Arc<Notify>,
    should_block: bool,
}

impl Worker {
    pub fn new(consumer: Consumer, shutdown: Arc<Notify>) -> Self {
        Self {
            consumer,
            shutdown,
            should_block: true,
        }
    }

    /// Non-blocking pulls return immediately on an empty subscription.
    pub fn with_blocking(mut self, should_block: bool) -> Self {
        self.should_block = should_block;
        self
    }

    pub fn consumer(&self) -> &Consumer {
        &self.consumer
    }

    /// Returns the number of messages handled by this run.
    pub async fn run(&mut self) -> Result<u64, ConsumeError> {
        let started_at = self.consumer.processed_count();
        let shutdown = Arc::clone(&self.shutdown);
        let notified = shutdown.notified();
        tokio::pin!(notified);

        info!(
            subscription = %self.consumer.subscription_name(),
            "Starting consumer loop"
        );

        while self.consumer.can_consume() {
            if notified.as_mut().now_or_never().is_some() {
                info!(
                    subscription = %self.consumer.subscription_name(),
                    "Shutdown signal received, stopping consumer"
                );
                break;
            }

            match self.consumer.consume_one_msg(self.should_block).await {
                Ok(()) => {}
                Err(ConsumeError::Timeout { subscription }) => {
                    debug!(subscription = %subscription, "No message within wait window");
                }
                Err(e) => return Err(e),
            }

            if !self.should_block {
                tokio::task::yield_now().await;
            }
        }

        let handled = self.consumer.processed_count() - started_at;
        info!(
            subscription = %self.consumer.subscription_name(),
            handled,
            "Consumer loop stopped"
        );
        Ok(handled)
    }
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use super::*;
    use crate::logging::noop_logger;
    use crate::messaging::{EmptyPayload, InMemoryPubSub, Message, PubSubClient};

    fn consumer(broker: &InMemoryPubSub, subscription: &str) -> Consumer {
        let mut consumer = Consumer::new(
            broker.subscription(subscription),
            Arc::new(broker.clone()),
            noop_logger(),
        );
        consumer.set_callback_fn(|_: EmptyPayload, _: &Message| Ok(()));
        consumer
    }

    #[tokio::test]
    async fn test_stops_at_maximum() {
        let broker = InMemoryPubSub::new().with_wait_window(Duration::from_millis(10));
        for i in 0..5 {
            broker.enqueue("jobs", Message::new(format!("job {i}")));
        }
        let mut consumer = consumer(&broker, "jobs");
        consumer.set_maximum_number_of_processed_messages(Some(3));

        let mut worker = Worker::new(consumer, Arc::new(Notify::new()));
        let handled = worker.run().await.unwrap();

        assert_eq!(handled, 3);
        assert_eq!(broker.acknowledged("jobs").len(), 3);
        assert_eq!(broker.backlog_len("jobs"), 2);
    }

    #[tokio::test]
    async fn test_stops_on_shutdown() {
        let broker = InMemoryPubSub::new().with_wait_window(Duration::from_millis(10));
        let shutdown = Arc::new(Notify::new());
        let mut worker = Worker::new(consumer(&broker, "jobs"), Arc::clone(&shutdown));

        let trigger = Arc::clone(&shutdown);
        tokio::spawn(async move {
            tokio::time::sleep(Duration::from_millis(30)).await;
            trigger.notify_one();
        });

        let handled = tokio::time::timeout(Duration::from_secs(5), worker.run())
            .await
            .expect("worker did not stop")
            .unwrap();
        assert_eq!(handled, 0);
    }

    #[tokio::test]
    async fn test_surfaces_configuration_errors() {
        let broker = InMemoryPubSub::new();
        broker.enqueue("jobs", Message::new("hello"));
        let unconfigured = Consumer::new(
            broker.subscription("jobs"),
            Arc::new(broker.clone()),
            noop_logger(),
        );

        let mut worker = Worker::new(unconfigured, Arc::new(Notify::new())).with_blocking(false);
        let err = worker.run().await.unwrap_err();

        assert!(matches!(err, ConsumeError::Configuration(_)));
        assert_eq!(worker.consumer().processed_count(), 1);
    }
}
