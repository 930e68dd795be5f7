use crate::contracts::ProcessingFailure;
use crate::messaging::handler::HandlerError;
use crate::messaging::payload::ParseError;
use crate::messaging::transport::TransportError;

/// Everything that can go wrong while consuming one message.
///
/// `Parse` and `Processing` are recovered inside the consumer: the message is
/// routed and the call still returns `Ok`. The remaining variants reach the caller.
#[derive(Debug, thiserror::Error)]
pub enum ConsumeError {
    #[error("No message received from '{subscription}' while blocking")]
    Timeout { subscription: String },

    #[error(transparent)]
    Transport(#[from] TransportError),

    #[error(transparent)]
    Parse(#[from] ParseError),

    #[error("Message processing failed: {0}")]
    Processing(#[from] HandlerError),

    #[error("Consumer is misconfigured: {0}")]
    Configuration(String),
}

impl ConsumeError {
    pub fn is_recoverable(&self) -> bool {
        matches!(self, Self::Parse(_) | Self::Processing(_))
    }

    pub fn error_type(&self) -> &'static str {
        match self {
            Self::Timeout { .. } => "timeout",
            Self::Transport(_) => "transport",
            Self::Parse(_) => "parse",
            Self::Processing(_) => "processing",
            Self::Configuration(_) => "configuration",
        }
    }
}

impl From<ProcessingFailure> for ConsumeError {
    fn from(failure: ProcessingFailure) -> Self {
        match failure {
            ProcessingFailure::Parse(err) => Self::Parse(err),
            ProcessingFailure::Handler(err) => Self::Processing(err),
        }
    }
}
