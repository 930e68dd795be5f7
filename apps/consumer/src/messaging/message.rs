use std::collections::HashMap;

/// A single unit of work pulled from a subscription.
///
/// The transport assigns `id`; messages built locally for publishing start with an
/// empty id until the transport hands them out again. The payload is kept as raw
/// bytes and only decoded when a callback declares a typed shape.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct Message {
    id: String,
    data: Vec<u8>,
    attributes: HashMap<String, String>,
}

impl Message {
    pub fn new(data: impl Into<Vec<u8>>) -> Self {
        Self {
            id: String::new(),
            data: data.into(),
            attributes: HashMap::new(),
        }
    }

    pub fn with_id(mut self, id: impl Into<String>) -> Self {
        self.id = id.into();
        self
    }

    pub fn with_attribute(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.attributes.insert(key.into(), value.into());
        self
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn data(&self) -> &[u8] {
        &self.data
    }

    /// Payload as UTF-8, if it is valid UTF-8.
    pub fn data_as_str(&self) -> Option<&str> {
        std::str::from_utf8(&self.data).ok()
    }

    pub fn attributes(&self) -> &HashMap<String, String> {
        &self.attributes
    }

    pub fn attribute(&self, key: &str) -> Option<&str> {
        self.attributes.get(key).map(String::as_str)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_builder_keeps_payload_and_attributes() {
        let msg = Message::new("hello")
            .with_id("42")
            .with_attribute("x-event-version", "v1");

        assert_eq!(msg.id(), "42");
        assert_eq!(msg.data(), b"hello");
        assert_eq!(msg.data_as_str(), Some("hello"));
        assert_eq!(msg.attribute("x-event-version"), Some("v1"));
        assert_eq!(msg.attribute("missing"), None);
    }

    #[test]
    fn test_non_utf8_payload() {
        let msg = Message::new(vec![0xff, 0xfe]);
        assert_eq!(msg.data_as_str(), None);
        assert!(msg.id().is_empty());
    }
}
