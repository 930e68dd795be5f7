use crate::messaging::handler::HandlerError;
use crate::messaging::payload::ParseError;

/// Classification of a message that could not be processed.
///
/// Both variants are routed the same way (dead-letter topic or reject); the
/// classification only feeds logs and metrics:
/// - `Parse`: the payload could not be decoded into the declared shape
/// - `Handler`: the payload was understood but a hook or the callback failed
#[derive(Debug, thiserror::Error)]
pub enum ProcessingFailure {
    #[error(transparent)]
    Parse(#[from] ParseError),

    #[error(transparent)]
    Handler(#[from] HandlerError),
}
