//! Models the `message-bus` output destination (spec.md §6) as a bounded channel to
//! a background thread appending to a per-topic, append-only JSON-lines log
//! (spec.md §5: "the engine enqueues writes on a bounded channel to a separate
//! writer task, preserving relative order per topic"), rather than depending on a
//! live broker.

use std::collections::HashMap;
use std::fs::{self, File, OpenOptions};
use std::io::{BufWriter, Write};
use std::path::PathBuf;
use std::sync::mpsc::{self, SyncSender};
use std::thread::JoinHandle;

use foodsim_core::sink::{EventSink, SinkError};
use serde_json::Value;

const CHANNEL_CAPACITY: usize = 1024;

struct Record {
    topic: String,
    payload: Value,
}

enum Command {
    Write(Record),
    Flush,
}

pub struct MessageBusSink {
    sender: std::sync::Mutex<Option<SyncSender<Command>>>,
    worker: std::sync::Mutex<Option<JoinHandle<()>>>,
    log_dir: PathBuf,
}

impl MessageBusSink {
    pub fn new(log_dir: impl Into<PathBuf>) -> Self {
        let log_dir = log_dir.into();
        fs::create_dir_all(&log_dir).ok();
        let (sender, receiver) = mpsc::sync_channel::<Command>(CHANNEL_CAPACITY);
        let worker_dir = log_dir.clone();
        let worker = std::thread::spawn(move || {
            let mut writers: HashMap<String, BufWriter<File>> = HashMap::new();
            while let Ok(cmd) = receiver.recv() {
                match cmd {
                    Command::Write(record) => {
                        let writer = writers.entry(record.topic.clone()).or_insert_with(|| {
                            let path = worker_dir.join(format!("{}.log", record.topic));
                            let file = OpenOptions::new()
                                .create(true)
                                .append(true)
                                .open(path)
                                .expect("open message-bus log file");
                            BufWriter::new(file)
                        });
                        if serde_json::to_writer(&mut *writer, &record.payload).is_ok() {
                            let _ = writer.write_all(b"\n");
                        }
                    }
                    Command::Flush => {
                        for writer in writers.values_mut() {
                            let _ = writer.flush();
                        }
                    }
                }
            }
        });
        Self {
            sender: std::sync::Mutex::new(Some(sender)),
            worker: std::sync::Mutex::new(Some(worker)),
            log_dir,
        }
    }

    /// The per-topic append-only logs the background worker writes, for inspection
    /// in tests or by a downstream consumer standing in for a real broker.
    pub fn log_path(&self, topic: &str) -> PathBuf {
        self.log_dir.join(format!("{}.log", topic))
    }
}

impl EventSink for MessageBusSink {
    fn write(&self, topic: &str, payload: &Value) -> Result<(), SinkError> {
        let guard = self.sender.lock().unwrap();
        let sender = guard.as_ref().ok_or_else(|| SinkError::WriteFailed {
            topic: topic.to_string(),
            reason: "sink already flushed and closed".to_string(),
        })?;
        sender
            .send(Command::Write(Record {
                topic: topic.to_string(),
                payload: payload.clone(),
            }))
            .map_err(|e| SinkError::WriteFailed {
                topic: topic.to_string(),
                reason: e.to_string(),
            })
    }

    /// Sends a final `Flush`, then drops the sender so the worker thread's `recv`
    /// loop exits, and joins it so every queued write lands before returning.
    fn flush(&self) -> Result<(), SinkError> {
        let mut guard = self.sender.lock().unwrap();
        if let Some(sender) = guard.take() {
            sender
                .send(Command::Flush)
                .map_err(|e| SinkError::FlushFailed(e.to_string()))?;
            drop(sender);
        }
        drop(guard);
        if let Some(handle) = self.worker.lock().unwrap().take() {
            let _ = handle.join();
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn writes_land_in_the_per_topic_log_in_order() {
        let dir = tempfile::tempdir().unwrap();
        let sink = MessageBusSink::new(dir.path());
        for i in 0..5 {
            sink.write("order_placed_events", &serde_json::json!({"i": i}))
                .unwrap();
        }
        sink.flush().unwrap();

        let contents = fs::read_to_string(sink.log_path("order_placed_events")).unwrap();
        let values: Vec<i64> = contents
            .lines()
            .map(|l| serde_json::from_str::<Value>(l).unwrap()["i"].as_i64().unwrap())
            .collect();
        assert_eq!(values, vec![0, 1, 2, 3, 4]);
    }
}
