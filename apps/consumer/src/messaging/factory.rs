use std::sync::Arc;

use tracing::{Dispatch, info};

use super::consumer::Consumer;
use super::transport::{PubSubClient, Publisher};
use crate::config::ConsumerConfig;

/// Builds consumers that share one client and one logger.
pub struct ConsumerFactory<C> {
    client: Arc<C>,
    logger: Dispatch,
}

impl<C> ConsumerFactory<C>
where
    C: PubSubClient + 'static,
{
    pub fn new(client: Arc<C>, logger: Dispatch) -> Self {
        Self { client, logger }
    }

    pub fn create(&self, subscription_name: &str) -> Consumer {
        let publisher: Arc<dyn Publisher> = self.client.clone();
        info!(subscription = %subscription_name, "Creating consumer");
        Consumer::new(
            self.client.subscription(subscription_name),
            publisher,
            self.logger.clone(),
        )
    }

    pub fn create_from_config(&self, config: &ConsumerConfig) -> Consumer {
        let mut consumer = self.create(&config.subscription_name);
        consumer.apply_config(config);
        consumer
    }
}
