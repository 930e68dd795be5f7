use std::sync::Arc;

use async_trait::async_trait;

use super::message::Message;

/// A named pull endpoint. Every call pulls at most one message.
#[async_trait]
pub trait Subscription: Send + Sync {
    fn name(&self) -> &str;

    /// Pulls one message. With `return_immediately` unset the call may wait up to
    /// the transport's wait window before returning `None`.
    async fn pull(&self, return_immediately: bool) -> Result<Option<Message>, TransportError>;

    async fn acknowledge(&self, message: &Message) -> Result<(), TransportError>;

    /// A deadline of zero hands the message back to the queue for redelivery.
    async fn modify_ack_deadline(&self, message: &Message, seconds: u32)
    -> Result<(), TransportError>;
}

#[async_trait]
pub trait Publisher: Send + Sync {
    async fn publish(&self, message: &Message, topic: &str) -> Result<(), TransportError>;
}

/// A client that can publish and hand out subscriptions by name.
pub trait PubSubClient: Publisher {
    fn subscription(&self, name: &str) -> Arc<dyn Subscription>;
}

#[derive(Debug, thiserror::Error)]
pub enum TransportError {
    #[error("Failed to pull from subscription: {0}")]
    PullFailed(String),

    #[error("Failed to acknowledge message: {0}")]
    AckFailed(String),

    #[error("Failed to modify ack deadline: {0}")]
    DeadlineFailed(String),

    #[error("Failed to publish to topic '{topic}': {reason}")]
    PublishFailed { topic: String, reason: String },
}
