use tracing::debug;

use super::message::Message;
use super::transport::{Publisher, Subscription, TransportError};

/// At-most-once resolution of a single message.
///
/// The first successful acknowledge or reject resolves the message; every later
/// call is a no-op that never reaches the transport.
#[derive(Debug, Default)]
pub struct DeliveryGate {
    resolved: bool,
}

impl DeliveryGate {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_resolved(&self) -> bool {
        self.resolved
    }

    /// Returns `true` when the transport was actually called.
    pub async fn acknowledge(
        &mut self,
        subscription: &dyn Subscription,
        message: &Message,
    ) -> Result<bool, TransportError> {
        if self.resolved {
            return Ok(false);
        }
        subscription.acknowledge(message).await?;
        self.resolved = true;
        Ok(true)
    }

    /// Returns `true` when the transport was actually called.
    pub async fn reject(
        &mut self,
        subscription: &dyn Subscription,
        message: &Message,
    ) -> Result<bool, TransportError> {
        if self.resolved {
            return Ok(false);
        }
        subscription.modify_ack_deadline(message, 0).await?;
        self.resolved = true;
        Ok(true)
    }

    /// Resolves without touching the transport; the ack deadline will lapse.
    pub fn abandon(&mut self) {
        self.resolved = true;
    }
}

/// The in-flight message together with the means to resolve it.
///
/// A fresh `Delivery` is created for every pulled message, so its gate always
/// starts unresolved.
pub struct Delivery<'a> {
    message: Message,
    gate: DeliveryGate,
    subscription: &'a dyn Subscription,
    publisher: &'a dyn Publisher,
}

impl<'a> Delivery<'a> {
    pub fn new(
        message: Message,
        subscription: &'a dyn Subscription,
        publisher: &'a dyn Publisher,
    ) -> Self {
        Self {
            message,
            gate: DeliveryGate::new(),
            subscription,
            publisher,
        }
    }

    pub fn message(&self) -> &Message {
        &self.message
    }

    pub fn is_resolved(&self) -> bool {
        self.gate.is_resolved()
    }

    pub async fn acknowledge(&mut self) -> Result<(), TransportError> {
        if self.gate.acknowledge(self.subscription, &self.message).await? {
            debug!(message_id = %self.message.id(), "Message acknowledged");
        }
        Ok(())
    }

    pub async fn reject(&mut self) -> Result<(), TransportError> {
        if self.gate.reject(self.subscription, &self.message).await? {
            debug!(message_id = %self.message.id(), "Message rejected");
        }
        Ok(())
    }

    /// Buys more processing time. Ignored once the message is resolved; a
    /// deadline of zero is a reject.
    pub async fn extend_ack_deadline(&mut self, seconds: u32) -> Result<(), TransportError> {
        if seconds == 0 {
            return self.reject().await;
        }
        if self.gate.is_resolved() {
            return Ok(());
        }
        self.subscription
            .modify_ack_deadline(&self.message, seconds)
            .await
    }

    pub async fn publish(&self, message: &Message, topic: &str) -> Result<(), TransportError> {
        self.publisher.publish(message, topic).await
    }

    pub(crate) fn abandon(&mut self) {
        self.gate.abandon();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::messaging::memory::InMemoryPubSub;
    use crate::messaging::transport::PubSubClient;

    #[tokio::test]
    async fn test_acknowledge_twice_hits_transport_once() {
        let broker = InMemoryPubSub::new();
        let id = broker.enqueue("jobs", Message::new("work"));
        let sub = broker.subscription("jobs");
        let msg = sub.pull(true).await.unwrap().unwrap();

        let mut gate = DeliveryGate::new();
        assert!(gate.acknowledge(sub.as_ref(), &msg).await.unwrap());
        assert!(!gate.acknowledge(sub.as_ref(), &msg).await.unwrap());

        assert_eq!(broker.acknowledged("jobs"), vec![id]);
    }

    #[tokio::test]
    async fn test_reject_twice_hits_transport_once() {
        let broker = InMemoryPubSub::new();
        let id = broker.enqueue("jobs", Message::new("work"));
        let sub = broker.subscription("jobs");
        let msg = sub.pull(true).await.unwrap().unwrap();

        let mut gate = DeliveryGate::new();
        assert!(gate.reject(sub.as_ref(), &msg).await.unwrap());
        assert!(!gate.reject(sub.as_ref(), &msg).await.unwrap());

        assert_eq!(broker.deadline_changes("jobs"), vec![(id, 0)]);
    }

    #[tokio::test]
    async fn test_acknowledge_after_reject_is_noop() {
        let broker = InMemoryPubSub::new();
        broker.enqueue("jobs", Message::new("work"));
        let sub = broker.subscription("jobs");
        let msg = sub.pull(true).await.unwrap().unwrap();

        let mut delivery = Delivery::new(msg, sub.as_ref(), &broker);
        delivery.reject().await.unwrap();
        delivery.acknowledge().await.unwrap();

        assert!(delivery.is_resolved());
        assert!(broker.acknowledged("jobs").is_empty());
        assert_eq!(broker.deadline_changes("jobs").len(), 1);
    }

    #[tokio::test]
    async fn test_failed_transport_call_leaves_gate_open() {
        let broker = InMemoryPubSub::new();
        let sub = broker.subscription("jobs");
        let never_pulled = Message::new("work").with_id("ghost");

        let mut gate = DeliveryGate::new();
        assert!(gate.acknowledge(sub.as_ref(), &never_pulled).await.is_err());
        assert!(!gate.is_resolved());
    }

    #[tokio::test]
    async fn test_extend_deadline_is_not_a_resolution() {
        let broker = InMemoryPubSub::new();
        let id = broker.enqueue("jobs", Message::new("work"));
        let sub = broker.subscription("jobs");
        let msg = sub.pull(true).await.unwrap().unwrap();

        let mut delivery = Delivery::new(msg, sub.as_ref(), &broker);
        delivery.extend_ack_deadline(60).await.unwrap();
        assert!(!delivery.is_resolved());

        delivery.acknowledge().await.unwrap();
        delivery.extend_ack_deadline(60).await.unwrap();

        assert_eq!(broker.deadline_changes("jobs"), vec![(id.clone(), 60)]);
        assert_eq!(broker.acknowledged("jobs"), vec![id]);
    }

    #[tokio::test]
    async fn test_zero_deadline_extension_resolves_as_reject() {
        let broker = InMemoryPubSub::new();
        let id = broker.enqueue("jobs", Message::new("work"));
        let sub = broker.subscription("jobs");
        let msg = sub.pull(true).await.unwrap().unwrap();

        let mut delivery = Delivery::new(msg, sub.as_ref(), &broker);
        delivery.extend_ack_deadline(0).await.unwrap();
        assert!(delivery.is_resolved());

        delivery.acknowledge().await.unwrap();
        delivery.extend_ack_deadline(0).await.unwrap();

        assert_eq!(broker.deadline_changes("jobs"), vec![(id, 0)]);
        assert!(broker.acknowledged("jobs").is_empty());
    }
}
