//! Models the `object-store` output destination (spec.md §6) without depending on a
//! live bucket API: `root` is treated as `{bucket}/{prefix}` and the same
//! partitioned-file contract as [`super::local::LocalFileSink`] is used underneath,
//! since object stores are addressed by key paths the same way a filesystem is.

use foodsim_core::sink::{EventSink, SinkError};
use serde_json::Value;

use crate::config::OutputFormat;

use super::PartitionedSink;

pub struct ObjectStoreSink {
    inner: PartitionedSink,
}

impl ObjectStoreSink {
    pub fn new(bucket_root: impl Into<String>, output_folder: impl Into<String>, format: OutputFormat) -> Self {
        Self {
            inner: PartitionedSink::new(bucket_root.into(), output_folder.into(), format),
        }
    }
}

impl EventSink for ObjectStoreSink {
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

    #[test]
    fn writes_under_the_bucket_root_like_a_local_path() {
        let dir = tempfile::tempdir().unwrap();
        let bucket_root = dir.path().join("my-bucket/prefix");
        let sink = ObjectStoreSink::new(
            bucket_root.to_str().unwrap().to_string(),
            "foodsim".to_string(),
            OutputFormat::Json,
        );
        let payload = serde_json::json!({"timestamp": "2024-03-02T10:00:00Z", "x": 1});
        sink.write("partner_location_events", &payload).unwrap();
        sink.flush().unwrap();

        let path = bucket_root.join(
            "foodsim/partner_location_events/year=2024/month=03/day=02/hour=10/data.json",
        );
        assert!(path.exists());
    }
}
