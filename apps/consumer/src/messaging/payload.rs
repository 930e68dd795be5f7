use std::fmt;
use std::str::FromStr;

use serde::de::DeserializeOwned;

use super::message::Message;
use crate::config::ConfigError;

/// Sentinel payload for callbacks that only want the raw message.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct EmptyPayload;

/// Wire format of message payloads.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum PayloadFormat {
    #[default]
    Json,
}

impl PayloadFormat {
    pub fn name(&self) -> &'static str {
        match self {
            Self::Json => "json",
        }
    }

    fn decode<T: DeserializeOwned>(&self, bytes: &[u8]) -> Result<T, serde_json::Error> {
        match self {
            Self::Json => serde_json::from_slice(bytes),
        }
    }
}

impl fmt::Display for PayloadFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for PayloadFormat {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "json" => Ok(Self::Json),
            other => Err(ConfigError::Invalid {
                name: "PAYLOAD_FORMAT",
                reason: format!("unsupported payload format '{other}'"),
            }),
        }
    }
}

/// A shape a message payload can be decoded into.
///
/// Every `DeserializeOwned` type is a shape; [`EmptyPayload`] is the shape that
/// leaves the bytes alone.
pub trait PayloadShape: Sized + Send + 'static {
    fn from_message(message: &Message, format: PayloadFormat) -> Result<Self, ParseError>;
}

impl PayloadShape for EmptyPayload {
    fn from_message(_message: &Message, _format: PayloadFormat) -> Result<Self, ParseError> {
        Ok(EmptyPayload)
    }
}

impl<T> PayloadShape for T
where
    T: DeserializeOwned + Send + 'static,
{
    fn from_message(message: &Message, format: PayloadFormat) -> Result<Self, ParseError> {
        format
            .decode(message.data())
            .map_err(|source| ParseError {
                message_id: message.id().to_string(),
                format,
                source,
            })
    }
}

/// The payload of a message could not be decoded into the declared shape.
#[derive(Debug, thiserror::Error)]
#[error("Message '{message_id}' cannot be parsed as {format}: {source}")]
pub struct ParseError {
    pub message_id: String,
    pub format: PayloadFormat,
    #[source]
    pub source: serde_json::Error,
}
