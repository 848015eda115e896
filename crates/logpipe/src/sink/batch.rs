//! Size- and count-bounded batch accumulation.

/// One encoded event bound for the telemetry backend.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LogEvent {
    pub message: String,
    pub timestamp_millis: i64,
}

/// Maximum payload bytes in one put-events batch.
pub const MAX_BATCH_BYTES: usize = 1_048_576;

/// Maximum events in one put-events batch.
pub const MAX_BATCH_COUNT: usize = 10_000;

/// Fixed accounting overhead the backend adds per event, on top of the
/// message bytes.
pub const EVENT_OVERHEAD_BYTES: usize = 26;

/// Encoded size of an event for batch accounting.
pub fn event_size(event: &LogEvent) -> usize {
    event.message.len() + EVENT_OVERHEAD_BYTES
}

/// Accumulates events for one sink worker until a flush trigger fires.
///
/// Owned exclusively by that worker; reset by [`PendingBatch::take`] after
/// every flush.
#[derive(Debug, Default)]
pub struct PendingBatch {
    events: Vec<LogEvent>,
    size_bytes: usize,
}

impl PendingBatch {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_empty(&self) -> bool {
        self.events.is_empty()
    }

    pub fn len(&self) -> usize {
        self.events.len()
    }

    pub fn size_bytes(&self) -> usize {
        self.size_bytes
    }

    /// Whether appending an event of `size` encoded bytes would exceed the
    /// size or count ceiling. An empty batch accepts any event.
    pub fn would_exceed(&self, size: usize) -> bool {
        !self.events.is_empty()
            && (self.size_bytes + size > MAX_BATCH_BYTES || self.events.len() >= MAX_BATCH_COUNT)
    }

    pub fn push(&mut self, event: LogEvent) {
        self.size_bytes += event_size(&event);
        self.events.push(event);
    }

    /// Take the batch contents for dispatch, sorted by timestamp ascending
    /// (stable), resetting the accumulator.
    pub fn take(&mut self) -> Vec<LogEvent> {
        self.size_bytes = 0;
        let mut events = std::mem::take(&mut self.events);
        events.sort_by_key(|event| event.timestamp_millis);
        events
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn event(message: &str, timestamp_millis: i64) -> LogEvent {
        LogEvent {
            message: message.to_string(),
            timestamp_millis,
        }
    }

    #[test]
    fn test_empty_batch_accepts_any_event() {
        let batch = PendingBatch::new();
        assert!(!batch.would_exceed(MAX_BATCH_BYTES + 1));
    }

    #[test]
    fn test_size_accounting_includes_overhead() {
        let mut batch = PendingBatch::new();
        batch.push(event("hello", 1));
        assert_eq!(batch.size_bytes(), 5 + EVENT_OVERHEAD_BYTES);
    }

    #[test]
    fn test_count_ceiling() {
        let mut batch = PendingBatch::new();
        for i in 0..MAX_BATCH_COUNT {
            assert!(!batch.would_exceed(1));
            batch.push(event("x", i as i64));
        }
        assert_eq!(batch.len(), MAX_BATCH_COUNT);
        assert!(batch.would_exceed(1));
    }

    #[test]
    fn test_size_ceiling() {
        let message = "a".repeat(1000);
        let size = message.len() + EVENT_OVERHEAD_BYTES;
        let mut batch = PendingBatch::new();
        while !batch.would_exceed(size) {
            batch.push(event(&message, 0));
        }
        assert!(batch.size_bytes() <= MAX_BATCH_BYTES);
        assert!(batch.size_bytes() + size > MAX_BATCH_BYTES);
    }

    #[test]
    fn test_take_sorts_by_timestamp_and_resets() {
        let mut batch = PendingBatch::new();
        batch.push(event("third", 30));
        batch.push(event("first", 10));
        batch.push(event("second", 20));

        let events = batch.take();
        let timestamps: Vec<i64> = events.iter().map(|e| e.timestamp_millis).collect();
        assert_eq!(timestamps, vec![10, 20, 30]);

        assert!(batch.is_empty());
        assert_eq!(batch.size_bytes(), 0);
    }

    #[test]
    fn test_take_sort_is_stable() {
        let mut batch = PendingBatch::new();
        batch.push(event("a", 10));
        batch.push(event("b", 10));
        batch.push(event("c", 5));

        let events = batch.take();
        assert_eq!(events[0].message, "c");
        assert_eq!(events[1].message, "a");
        assert_eq!(events[2].message, "b");
    }
}
