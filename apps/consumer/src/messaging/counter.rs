/// Counts handled messages against an optional limit.
#[derive(Debug, Default, Clone)]
pub struct ConsumptionCounter {
    processed: u64,
    maximum: Option<u64>,
}

impl ConsumptionCounter {
    pub fn new(maximum: Option<u64>) -> Self {
        Self {
            processed: 0,
            maximum,
        }
    }

    pub fn record(&mut self) {
        self.processed += 1;
    }

    pub fn processed(&self) -> u64 {
        self.processed
    }

    pub fn maximum(&self) -> Option<u64> {
        self.maximum
    }

    /// `None` removes the limit.
    pub fn set_maximum(&mut self, maximum: Option<u64>) {
        self.maximum = maximum;
    }

    pub fn can_consume(&self) -> bool {
        self.maximum.is_none_or(|max| self.processed < max)
    }
}
