//! Single-message consumption engine for pull-based publish/subscribe queues.
//!
//! A [`Consumer`] pulls one message per call, decodes it into the shape the
//! registered callback declares, runs the callback between optional hooks and
//! resolves the message exactly once: acknowledged on success, republished to a
//! failed topic or rejected back to the queue on failure.

pub mod config;
pub mod contracts;
pub mod error;
pub mod logging;
pub mod messaging;
pub mod metrics;
pub mod worker;

pub use config::{ConfigError, ConsumerConfig};
pub use error::ConsumeError;
pub use messaging::{
    Consumer, ConsumerFactory, Delivery, EmptyPayload, Handler, HandlerError, Message,
    PayloadFormat,
};
pub use worker::Worker;
