use std::env;

use crate::messaging::PayloadFormat;

#[derive(Debug, Clone)]
pub struct ConsumerConfig {
    pub subscription_name: String,
    pub failed_topic_name: Option<String>,
    pub max_processed_messages: Option<u64>,
    pub payload_format: PayloadFormat,
    pub rust_log: String,
}

impl ConsumerConfig {
    pub fn new(subscription_name: impl Into<String>) -> Self {
        Self {
            subscription_name: subscription_name.into(),
            failed_topic_name: None,
            max_processed_messages: None,
            payload_format: PayloadFormat::default(),
            rust_log: "info".to_string(),
        }
    }

    pub fn with_failed_topic(mut self, topic: impl Into<String>) -> Self {
        self.failed_topic_name = Some(topic.into());
        self
    }

    pub fn with_max_processed_messages(mut self, maximum: Option<u64>) -> Self {
        self.max_processed_messages = maximum;
        self
    }

    pub fn with_payload_format(mut self, format: PayloadFormat) -> Self {
        self.payload_format = format;
        self
    }

    pub fn from_env() -> Result<Self, ConfigError> {
        let subscription_name = env::var("SUBSCRIPTION_NAME")
            .map_err(|_| ConfigError::MissingRequired("SUBSCRIPTION_NAME"))?;

        let failed_topic_name = env::var("FAILED_TOPIC_NAME")
            .ok()
            .filter(|topic| !topic.trim().is_empty());

        let max_processed_messages = match env::var("MAX_PROCESSED_MESSAGES") {
            Ok(raw) => parse_limit(&raw)?,
            Err(_) => None,
        };

        let payload_format = match env::var("PAYLOAD_FORMAT") {
            Ok(raw) => raw.parse()?,
            Err(_) => PayloadFormat::default(),
        };

        let rust_log = env::var("RUST_LOG").unwrap_or_else(|_| "info".to_string());

        Ok(Self {
            subscription_name,
            failed_topic_name,
            max_processed_messages,
            payload_format,
            rust_log,
        })
    }
}

/// `-1` means unbounded.
fn parse_limit(raw: &str) -> Result<Option<u64>, ConfigError> {
    let value: i64 = raw.trim().parse().map_err(|_| ConfigError::Invalid {
        name: "MAX_PROCESSED_MESSAGES",
        reason: format!("'{raw}' is not an integer"),
    })?;

    match value {
        -1 => Ok(None),
        n if n < 0 => Err(ConfigError::Invalid {
            name: "MAX_PROCESSED_MESSAGES",
            reason: format!("{n} is negative; use -1 for no limit"),
        }),
        n => Ok(Some(n as u64)),
    }
}

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Missing required environment variable: {0}")]
    MissingRequired(&'static str),

    #[error("Invalid value for {name}: {reason}")]
    Invalid { name: &'static str, reason: String },
}
