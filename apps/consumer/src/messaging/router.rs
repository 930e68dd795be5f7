use tracing::{error, info};

use super::delivery::Delivery;
use super::transport::TransportError;
use crate::error::ConsumeError;

/// Where a failed message ended up.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Route {
    DeadLettered { topic: String },
    Rejected,
}

/// Sends failed messages to the dead-letter topic, or back to the queue when
/// none is configured.
#[derive(Debug, Default)]
pub struct FailureRouter {
    failed_topic: Option<String>,
}

impl FailureRouter {
    pub fn new(failed_topic: Option<String>) -> Self {
        Self { failed_topic }
    }

    pub fn failed_topic(&self) -> Option<&str> {
        self.failed_topic.as_deref()
    }

    pub fn set_failed_topic(&mut self, topic: Option<String>) {
        self.failed_topic = topic;
    }

    /// Logs the failure, then republishes or rejects the message.
    ///
    /// A dead-lettered message is left unresolved so the caller's final
    /// acknowledge removes it from the source subscription.
    pub async fn route(
        &self,
        failure: &ConsumeError,
        delivery: &mut Delivery<'_>,
    ) -> Result<Route, TransportError> {
        error!(
            message_id = %delivery.message().id(),
            error_type = failure.error_type(),
            error = %failure,
            "Message processing failed"
        );

        match &self.failed_topic {
            Some(topic) => {
                delivery.publish(delivery.message(), topic).await?;
                info!(
                    message_id = %delivery.message().id(),
                    topic = %topic,
                    "Message sent to failed topic"
                );
                Ok(Route::DeadLettered {
                    topic: topic.clone(),
                })
            }
            None => {
                delivery.reject().await?;
                Ok(Route::Rejected)
            }
        }
    }
}
