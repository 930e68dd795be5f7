use std::collections::{HashMap, HashSet, VecDeque};
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use parking_lot::Mutex;
use tokio::sync::Notify;
use tracing::debug;
use uuid::Uuid;

use super::message::Message;
use super::transport::{PubSubClient, Publisher, Subscription, TransportError};

const DEFAULT_WAIT_WINDOW_MS: u64 = 100;

/// In-process pub/sub broker.
///
/// Topics fan out to the subscriptions bound to them. Every transport call is
/// recorded so callers can inspect what happened to each message.
#[derive(Clone)]
pub struct InMemoryPubSub {
    state: Arc<Mutex<BrokerState>>,
    wait_window: Duration,
}

#[derive(Default)]
struct BrokerState {
    subscriptions: HashMap<String, SubscriptionState>,
    bindings: HashMap<String, Vec<String>>,
    published: Vec<(String, Message)>,
    failing_topics: HashSet<String>,
}

#[derive(Default)]
struct SubscriptionState {
    backlog: VecDeque<Message>,
    outstanding: HashMap<String, Message>,
    acknowledged: Vec<String>,
    deadline_changes: Vec<(String, u32)>,
    ready: Arc<Notify>,
}

impl BrokerState {
    fn subscription_mut(&mut self, name: &str) -> &mut SubscriptionState {
        self.subscriptions.entry(name.to_string()).or_default()
    }
}

impl InMemoryPubSub {
    pub fn new() -> Self {
        Self {
            state: Arc::new(Mutex::new(BrokerState::default())),
            wait_window: Duration::from_millis(DEFAULT_WAIT_WINDOW_MS),
        }
    }

    /// How long a blocking pull waits for a message before giving up.
    pub fn with_wait_window(mut self, wait_window: Duration) -> Self {
        self.wait_window = wait_window;
        self
    }

    /// Binds `subscription` to `topic` so that publishes reach it.
    pub fn create_subscription(&self, topic: &str, subscription: &str) {
        let mut state = self.state.lock();
        state.subscription_mut(subscription);
        let bound = state.bindings.entry(topic.to_string()).or_default();
        if !bound.iter().any(|name| name == subscription) {
            bound.push(subscription.to_string());
        }
    }

    /// Puts a message straight onto a subscription's backlog and returns its id.
    pub fn enqueue(&self, subscription: &str, message: Message) -> String {
        let mut state = self.state.lock();
        let sub = state.subscription_mut(subscription);
        let message = assign_id(message);
        let id = message.id().to_string();
        sub.backlog.push_back(message);
        sub.ready.notify_one();
        id
    }

    /// Makes every later publish to `topic` fail.
    pub fn fail_publishes_to(&self, topic: &str) {
        self.state.lock().failing_topics.insert(topic.to_string());
    }

    pub fn published_to(&self, topic: &str) -> Vec<Message> {
        self.state
            .lock()
            .published
            .iter()
            .filter(|(name, _)| name == topic)
            .map(|(_, message)| message.clone())
            .collect()
    }

    pub fn acknowledged(&self, subscription: &str) -> Vec<String> {
        self.state
            .lock()
            .subscriptions
            .get(subscription)
            .map(|sub| sub.acknowledged.clone())
            .unwrap_or_default()
    }

    pub fn deadline_changes(&self, subscription: &str) -> Vec<(String, u32)> {
        self.state
            .lock()
            .subscriptions
            .get(subscription)
            .map(|sub| sub.deadline_changes.clone())
            .unwrap_or_default()
    }

    pub fn backlog_len(&self, subscription: &str) -> usize {
        self.state
            .lock()
            .subscriptions
            .get(subscription)
            .map_or(0, |sub| sub.backlog.len())
    }

    pub fn outstanding_len(&self, subscription: &str) -> usize {
        self.state
            .lock()
            .subscriptions
            .get(subscription)
            .map_or(0, |sub| sub.outstanding.len())
    }
}

impl Default for InMemoryPubSub {
    fn default() -> Self {
        Self::new()
    }
}

fn assign_id(message: Message) -> Message {
    if message.id().is_empty() {
        message.with_id(Uuid::new_v4().to_string())
    } else {
        message
    }
}

#[async_trait]
impl Publisher for InMemoryPubSub {
    async fn publish(&self, message: &Message, topic: &str) -> Result<(), TransportError> {
        let mut state = self.state.lock();
        if state.failing_topics.contains(topic) {
            return Err(TransportError::PublishFailed {
                topic: topic.to_string(),
                reason: "topic rejected the publish".to_string(),
            });
        }

        state.published.push((topic.to_string(), message.clone()));

        let bound = state.bindings.get(topic).cloned().unwrap_or_default();
        for name in &bound {
            // Each subscription receives its own copy under a fresh server id.
            let copy = message.clone().with_id(Uuid::new_v4().to_string());
            let sub = state.subscription_mut(name);
            sub.backlog.push_back(copy);
            sub.ready.notify_one();
        }

        debug!(topic, subscriptions = bound.len(), "Message published");
        Ok(())
    }
}

impl PubSubClient for InMemoryPubSub {
    fn subscription(&self, name: &str) -> Arc<dyn Subscription> {
        let ready = Arc::clone(&self.state.lock().subscription_mut(name).ready);
        Arc::new(MemorySubscription {
            name: name.to_string(),
            state: Arc::clone(&self.state),
            ready,
            wait_window: self.wait_window,
        })
    }
}

pub struct MemorySubscription {
    name: String,
    state: Arc<Mutex<BrokerState>>,
    ready: Arc<Notify>,
    wait_window: Duration,
}

impl MemorySubscription {
    fn take_next(&self) -> Option<Message> {
        let mut state = self.state.lock();
        let sub = state.subscription_mut(&self.name);
        let message = sub.backlog.pop_front()?;
        sub.outstanding
            .insert(message.id().to_string(), message.clone());
        Some(message)
    }
}

#[async_trait]
impl Subscription for MemorySubscription {
    fn name(&self) -> &str {
        &self.name
    }

    async fn pull(&self, return_immediately: bool) -> Result<Option<Message>, TransportError> {
        let deadline = tokio::time::Instant::now() + self.wait_window;
        loop {
            if let Some(message) = self.take_next() {
                return Ok(Some(message));
            }
            if return_immediately {
                return Ok(None);
            }
            if tokio::time::timeout_at(deadline, self.ready.notified())
                .await
                .is_err()
            {
                return Ok(None);
            }
        }
    }

    async fn acknowledge(&self, message: &Message) -> Result<(), TransportError> {
        let mut state = self.state.lock();
        let sub = state.subscription_mut(&self.name);
        if sub.outstanding.remove(message.id()).is_none() {
            return Err(TransportError::AckFailed(format!(
                "message '{}' is not outstanding on '{}'",
                message.id(),
                self.name
            )));
        }
        sub.acknowledged.push(message.id().to_string());
        Ok(())
    }

    async fn modify_ack_deadline(
        &self,
        message: &Message,
        seconds: u32,
    ) -> Result<(), TransportError> {
        let mut state = self.state.lock();
        let sub = state.subscription_mut(&self.name);
        if !sub.outstanding.contains_key(message.id()) {
            return Err(TransportError::DeadlineFailed(format!(
                "message '{}' is not outstanding on '{}'",
                message.id(),
                self.name
            )));
        }
        sub.deadline_changes
            .push((message.id().to_string(), seconds));

        if seconds == 0 {
            if let Some(expired) = sub.outstanding.remove(message.id()) {
                sub.backlog.push_front(expired);
                sub.ready.notify_one();
            }
        }
        Ok(())
    }
}
