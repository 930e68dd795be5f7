use std::sync::Arc;

use super::delivery::Delivery;
use super::handler::{Dispatcher, Hook};
use super::payload::PayloadFormat;
use crate::error::ConsumeError;

/// Runs the before-hook, the dispatch step and the after-hook around one message.
#[derive(Default)]
pub struct MessageProcessor {
    before: Option<Arc<dyn Hook>>,
    dispatcher: Option<Arc<dyn Dispatcher>>,
    after: Option<Arc<dyn Hook>>,
    format: PayloadFormat,
}

impl MessageProcessor {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set_before_hook(&mut self, hook: Option<Arc<dyn Hook>>) {
        self.before = hook;
    }

    pub fn set_dispatcher(&mut self, dispatcher: Arc<dyn Dispatcher>) {
        self.dispatcher = Some(dispatcher);
    }

    pub fn set_after_hook(&mut self, hook: Option<Arc<dyn Hook>>) {
        self.after = hook;
    }

    pub fn set_format(&mut self, format: PayloadFormat) {
        self.format = format;
    }

    /// Hook failures surface as `Processing`, decode failures as `Parse`, and a
    /// missing dispatcher as `Configuration`.
    pub async fn process(&self, delivery: &mut Delivery<'_>) -> Result<(), ConsumeError> {
        if let Some(hook) = &self.before {
            hook.run(delivery).await?;
        }

        let dispatcher = self.dispatcher.as_ref().ok_or_else(|| {
            ConsumeError::Configuration(
                "consumer has no callback; use set_callback() or set_dispatcher()".to_string(),
            )
        })?;
        dispatcher.dispatch(self.format, delivery).await?;

        if let Some(hook) = &self.after {
            hook.run(delivery).await?;
        }
        Ok(())
    }
}
