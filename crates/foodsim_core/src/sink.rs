//! The Sink Adapter boundary (spec.md C12, §6, §12): a narrow trait the engine writes
//! fully-formed records through. Concrete sinks (local files, a message bus, object
//! storage) are an external collaborator with a fixed interface per spec.md §1 and
//! live in `foodsim_cli`; this crate only depends on the trait.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum SinkError {
    #[error("sink write failed for topic {topic}: {reason}")]
    WriteFailed { topic: String, reason: String },
    #[error("sink flush failed: {0}")]
    FlushFailed(String),
}

/// `Sink.Write(topic, payload)` per spec.md §4.12. The engine calls `write` once per
/// emitted record, in event-time order (spec.md §5); it never retries a failed write
/// (spec.md §7: "logged; payload not retried within the loop").
pub trait EventSink: Send + Sync {
    fn write(&self, topic: &str, payload: &serde_json::Value) -> Result<(), SinkError>;

    /// Flush and close all open writers. Called once at loop termination (spec.md §5).
    fn flush(&self) -> Result<(), SinkError> {
        Ok(())
    }
}

/// A sink that discards everything. Useful for tests and for `--output-destination
/// none`-style dry runs.
#[derive(Debug, Default)]
pub struct NullSink;

impl EventSink for NullSink {
    fn write(&self, _topic: &str, _payload: &serde_json::Value) -> Result<(), SinkError> {
        Ok(())
    }
}

/// An in-memory sink that records every write, keyed by topic, in arrival order.
/// Used by the engine's own tests and available to downstream consumers that want to
/// inspect a run without standing up a real sink.
#[derive(Debug, Default)]
pub struct RecordingSink {
    records: std::sync::Mutex<std::collections::HashMap<String, Vec<serde_json::Value>>>,
}

impl RecordingSink {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn topic(&self, topic: &str) -> Vec<serde_json::Value> {
        self.records
            .lock()
            .unwrap()
            .get(topic)
            .cloned()
            .unwrap_or_default()
    }

    pub fn total_count(&self) -> usize {
        self.records.lock().unwrap().values().map(Vec::len).sum()
    }
}

impl EventSink for RecordingSink {
    fn write(&self, topic: &str, payload: &serde_json::Value) -> Result<(), SinkError> {
        self.records
            .lock()
            .unwrap()
            .entry(topic.to_string())
            .or_default()
            .push(payload.clone());
        Ok(())
    }
}
