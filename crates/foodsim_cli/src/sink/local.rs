//! Writes directly to the local filesystem (spec.md §6's `local` output destination).

use foodsim_core::sink::{EventSink, SinkError};
use serde_json::Value;

use crate::config::OutputFormat;

use super::PartitionedSink;

pub struct LocalFileSink {
    inner: PartitionedSink,
}

impl LocalFileSink {
    pub fn new(output_path: impl Into<String>, output_folder: impl Into<String>, format: OutputFormat) -> Self {
        Self {
            inner: PartitionedSink::new(output_path.into(), output_folder.into(), format),
        }
    }
}

impl EventSink for LocalFileSink {
    fn write(&self, topic: &str, payload: &Value) -> Result<(), SinkError> {
        self.inner.write(topic, payload)
    }

    fn flush(&self) -> Result<(), SinkError> {
        self.inner.flush()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;

    #[test]
    fn writes_one_json_line_per_record_to_the_partitioned_path() {
        let dir = tempfile::tempdir().unwrap();
        let sink = LocalFileSink::new(
            dir.path().to_str().unwrap().to_string(),
            "foodsim".to_string(),
            OutputFormat::Json,
        );
        let payload = serde_json::json!({"timestamp": "2024-01-01T05:00:00Z", "order_id": "abc"});
        sink.write("order_placed_events", &payload).unwrap();
        sink.write("order_placed_events", &payload).unwrap();
        sink.flush().unwrap();

        let path = dir
            .path()
            .join("foodsim/order_placed_events/year=2024/month=01/day=01/hour=05/data.json");
        let contents = fs::read_to_string(path).unwrap();
        assert_eq!(contents.lines().count(), 2);
        let parsed: Value = serde_json::from_str(contents.lines().next().unwrap()).unwrap();
        assert_eq!(parsed["order_id"], "abc");
    }

    #[test]
    fn csv_writes_header_once() {
        let dir = tempfile::tempdir().unwrap();
        let sink = LocalFileSink::new(
            dir.path().to_str().unwrap().to_string(),
            "foodsim".to_string(),
            OutputFormat::Csv,
        );
        let payload = serde_json::json!({"timestamp": "2024-01-01T05:00:00Z", "a": 1});
        sink.write("review_events", &payload).unwrap();
        sink.write("review_events", &payload).unwrap();
        sink.flush().unwrap();

        let path = dir
            .path()
            .join("foodsim/review_events/year=2024/month=01/day=01/hour=05/data.csv");
        let contents = fs::read_to_string(path).unwrap();
        let mut lines = contents.lines();
        assert_eq!(lines.next(), Some("a,timestamp"));
        assert_eq!(lines.count(), 2);
    }
}
