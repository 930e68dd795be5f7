use std::marker::PhantomData;

use async_trait::async_trait;

use super::delivery::Delivery;
use super::message::Message;
use super::payload::{PayloadFormat, PayloadShape};
use super::transport::TransportError;
use crate::contracts::ProcessingFailure;

/// User logic for one decoded message.
///
/// The consumer acknowledges the message once `handle` returns. A handler may
/// resolve it earlier through the [`Delivery`]; the consumer's own resolution then
/// becomes a no-op.
#[async_trait]
pub trait Handler<T: Send + 'static>: Send + Sync {
    async fn handle(&self, payload: T, delivery: &mut Delivery<'_>) -> Result<(), HandlerError>;
}

/// A step run before or after dispatch.
#[async_trait]
pub trait Hook: Send + Sync {
    async fn run(&self, delivery: &mut Delivery<'_>) -> Result<(), HandlerError>;
}

/// The dispatch step. Registering a callback installs one; a custom
/// implementation replaces decoding and callback invocation entirely.
#[async_trait]
pub trait Dispatcher: Send + Sync {
    async fn dispatch(
        &self,
        format: PayloadFormat,
        delivery: &mut Delivery<'_>,
    ) -> Result<(), ProcessingFailure>;
}

#[derive(Debug, thiserror::Error)]
pub enum HandlerError {
    #[error("{0}")]
    Failed(String),

    #[error(transparent)]
    Transport(#[from] TransportError),

    #[error(transparent)]
    Other(#[from] Box<dyn std::error::Error + Send + Sync>),
}

impl HandlerError {
    pub fn failed(reason: impl Into<String>) -> Self {
        Self::Failed(reason.into())
    }
}

/// Decodes the payload into `T` and hands it to the registered handler.
pub struct TypedDispatcher<T, H> {
    handler: H,
    _shape: PhantomData<fn() -> T>,
}

impl<T, H> TypedDispatcher<T, H> {
    pub fn new(handler: H) -> Self {
        Self {
            handler,
            _shape: PhantomData,
        }
    }
}

#[async_trait]
impl<T, H> Dispatcher for TypedDispatcher<T, H>
where
    T: PayloadShape,
    H: Handler<T>,
{
    async fn dispatch(
        &self,
        format: PayloadFormat,
        delivery: &mut Delivery<'_>,
    ) -> Result<(), ProcessingFailure> {
        let payload = T::from_message(delivery.message(), format)?;
        self.handler.handle(payload, delivery).await?;
        Ok(())
    }
}

/// Adapts a plain closure into a [`Handler`].
pub struct FnHandler<F>(pub F);

#[async_trait]
impl<T, F> Handler<T> for FnHandler<F>
where
    T: Send + 'static,
    F: Fn(T, &Message) -> Result<(), HandlerError> + Send + Sync,
{
    async fn handle(&self, payload: T, delivery: &mut Delivery<'_>) -> Result<(), HandlerError> {
        (self.0)(payload, delivery.message())
    }
}
