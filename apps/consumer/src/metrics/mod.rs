use prometheus::{CounterVec, Encoder, HistogramOpts, HistogramVec, Opts, Registry, TextEncoder};
use std::sync::Arc;

pub struct Metrics {
    pub messages_processed_total: CounterVec,
    pub messages_failed_total: CounterVec,
    pub messages_dead_lettered_total: CounterVec,
    pub message_processing_duration_seconds: HistogramVec,
    pub registry: Registry,
}

impl Metrics {
    pub fn new() -> Result<Arc<Self>, Box<dyn std::error::Error>> {
        let registry = Registry::new();

        let messages_processed_total = CounterVec::new(
            Opts::new(
                "consumer_messages_processed_total",
                "Total number of messages pulled and resolved",
            ),
            &["subscription", "resolution"],
        )?;

        let messages_failed_total = CounterVec::new(
            Opts::new(
                "consumer_messages_failed_total",
                "Total number of messages that failed processing",
            ),
            &["subscription", "error_type"],
        )?;

        let messages_dead_lettered_total = CounterVec::new(
            Opts::new(
                "consumer_messages_dead_lettered_total",
                "Total number of messages republished to a failed topic",
            ),
            &["subscription", "topic"],
        )?;

        let message_processing_duration_seconds = HistogramVec::new(
            HistogramOpts::new(
                "consumer_message_processing_duration_seconds",
                "Time taken to process and resolve a message",
            )
            .buckets(vec![0.001, 0.005, 0.01, 0.025, 0.05, 0.1, 0.25, 0.5, 1.0, 2.5, 5.0]),
            &["subscription", "resolution"],
        )?;

        registry.register(Box::new(messages_processed_total.clone()))?;
        registry.register(Box::new(messages_failed_total.clone()))?;
        registry.register(Box::new(messages_dead_lettered_total.clone()))?;
        registry.register(Box::new(message_processing_duration_seconds.clone()))?;

        Ok(Arc::new(Self {
            messages_processed_total,
            messages_failed_total,
            messages_dead_lettered_total,
            message_processing_duration_seconds,
            registry,
        }))
    }

    /// Text exposition format of everything in the registry.
    pub fn render(&self) -> Result<String, Box<dyn std::error::Error>> {
        let encoder = TextEncoder::new();
        let metric_families = self.registry.gather();
        let mut buffer = vec![];
        encoder.encode(&metric_families, &mut buffer)?;
        Ok(String::from_utf8(buffer)?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_render_includes_recorded_series() {
        let metrics = Metrics::new().unwrap();
        metrics
            .messages_failed_total
            .with_label_values(&["orders", "parse"])
            .inc();

        let text = metrics.render().unwrap();
        assert!(text.contains("consumer_messages_failed_total"));
        assert!(text.contains("error_type=\"parse\""));
    }
}
