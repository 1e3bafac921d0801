//! Concrete `EventSink` implementations (spec.md §6, §5): the destinations the
//! engine's `foodsim_core::sink::EventSink` trait is written against.
//!
//! All three destinations share the same partitioned-file contract:
//! `{root}/{folder}/{topic}/year=YYYY/month=MM/day=DD/hour=HH/data.{ext}`, one
//! writer per partition. [`PartitionWriter`] and [`partition_dir`] hold that shared
//! plumbing; [`local::LocalFileSink`], [`object_store::ObjectStoreSink`], and
//! [`bus::MessageBusSink`] differ only in where `root` points and, for the bus, in
//! routing writes through a background thread instead of writing inline.

pub mod bus;
pub mod local;
pub mod object_store;

use std::collections::HashMap;
use std::fs::{self, File, OpenOptions};
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};
use std::sync::Mutex;

use arrow::array::{ArrayRef, BooleanArray, Float64Array, Int64Array, StringArray};
use arrow::datatypes::{DataType, Field, Schema};
use arrow::record_batch::RecordBatch;
use chrono::{DateTime, Datelike, Timelike, Utc};
use foodsim_core::sink::SinkError;
use parquet::arrow::ArrowWriter;
use parquet::file::properties::WriterProperties;
use serde_json::Value;
use std::sync::Arc;

use crate::config::OutputFormat;

pub fn ext_for_format(format: OutputFormat) -> &'static str {
    match format {
        OutputFormat::Json => "json",
        OutputFormat::Csv => "csv",
        OutputFormat::Parquet => "parquet",
    }
}

pub fn partition_dir(root: &str, folder: &str, topic: &str, ts: DateTime<Utc>) -> PathBuf {
    Path::new(root).join(folder).join(topic).join(format!(
        "year={:04}/month={:02}/day={:02}/hour={:02}",
        ts.year(),
        ts.month(),
        ts.day(),
        ts.hour()
    ))
}

fn extract_timestamp(topic: &str, payload: &Value) -> Result<DateTime<Utc>, SinkError> {
    payload
        .get("timestamp")
        .and_then(Value::as_str)
        .and_then(|s| DateTime::parse_from_rfc3339(s).ok())
        .map(|dt| dt.with_timezone(&Utc))
        .ok_or_else(|| SinkError::WriteFailed {
            topic: topic.to_string(),
            reason: "payload missing an RFC3339 `timestamp` field".to_string(),
        })
}

/// Open file handle and per-format write state for a single partition's `data.{ext}`.
/// Parquet has no row-at-a-time writer in the `arrow`/`parquet` crates worth using
/// here, so rows are buffered and the file is written once, at `flush`, against the
/// topic's pre-declared schema.
enum PartitionWriter {
    Json(BufWriter<File>),
    Csv {
        writer: csv::Writer<File>,
        header_written: bool,
    },
    Parquet { path: PathBuf, topic: String, rows: Vec<Value> },
}

impl PartitionWriter {
    fn open(path: &Path, topic: &str, format: OutputFormat) -> Result<Self, SinkError> {
        let io_err = |e: std::io::Error| SinkError::WriteFailed {
            topic: path.display().to_string(),
            reason: e.to_string(),
        };
        match format {
            OutputFormat::Json => {
                let file = OpenOptions::new()
                    .create(true)
                    .append(true)
                    .open(path)
                    .map_err(io_err)?;
                Ok(Self::Json(BufWriter::new(file)))
            }
            OutputFormat::Csv => {
                let header_written = path.exists() && fs::metadata(path).map(|m| m.len() > 0).unwrap_or(false);
                let file = OpenOptions::new()
                    .create(true)
                    .append(true)
                    .open(path)
                    .map_err(io_err)?;
                Ok(Self::Csv {
                    writer: csv::Writer::from_writer(file),
                    header_written,
                })
            }
            OutputFormat::Parquet => Ok(Self::Parquet {
                path: path.to_path_buf(),
                topic: topic.to_string(),
                rows: Vec::new(),
            }),
        }
    }

    fn write_record(&mut self, topic: &str, payload: &Value) -> Result<(), SinkError> {
        let fail = |reason: String| SinkError::WriteFailed {
            topic: topic.to_string(),
            reason,
        };
        match self {
            Self::Json(w) => {
                serde_json::to_writer(&mut *w, payload).map_err(|e| fail(e.to_string()))?;
                w.write_all(b"\n").map_err(|e| fail(e.to_string()))
            }
            Self::Csv {
                writer,
                header_written,
            } => {
                let obj = payload.as_object().ok_or_else(|| {
                    fail("expected a JSON object payload for CSV output".to_string())
                })?;
                if !*header_written {
                    writer
                        .write_record(obj.keys())
                        .map_err(|e| fail(e.to_string()))?;
                    *header_written = true;
                }
                let row: Vec<String> = obj.values().map(json_scalar_to_string).collect();
                writer.write_record(&row).map_err(|e| fail(e.to_string()))?;
                writer.flush().map_err(|e| fail(e.to_string()))
            }
            Self::Parquet { rows, .. } => {
                rows.push(payload.clone());
                Ok(())
            }
        }
    }

    fn flush(&mut self) -> Result<(), SinkError> {
        match self {
            Self::Json(w) => w.flush().map_err(|e| SinkError::FlushFailed(e.to_string())),
            Self::Csv { writer, .. } => writer
                .flush()
                .map_err(|e| SinkError::FlushFailed(e.to_string())),
            Self::Parquet { path, topic, rows } => {
                if rows.is_empty() {
                    return Ok(());
                }
                write_parquet_file(path, topic, rows).map_err(|e| SinkError::FlushFailed(e.to_string()))
            }
        }
    }
}

fn json_scalar_to_string(v: &Value) -> String {
    match v {
        Value::Null => String::new(),
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}

/// One `(name, type, nullable)` triple per field of the topic's payload struct in
/// `foodsim_core::events` — kept in lockstep with those structs by hand, since every
/// payload is a plain, non-polymorphic type (spec.md §6: "columnar-format records with
/// a pre-declared schema per topic").
fn schema_fields_for_topic(topic: &str) -> Vec<(&'static str, DataType, bool)> {
    const ORDER_EVENT_FIELDS: &[(&str, DataType, bool)] = &[
        ("timestamp", DataType::Utf8, false),
        ("order_id", DataType::Utf8, false),
        ("customer_id", DataType::Utf8, false),
        ("restaurant_id", DataType::Utf8, false),
        ("delivery_partner_id", DataType::Utf8, true),
        ("status", DataType::Utf8, false),
        ("total_amount", DataType::Float64, false),
    ];
    match topic {
        "order_placed_events" | "order_preparation_events" | "order_ready_events"
        | "order_pickup_events" | "order_in_transit_events" | "delivery_status_check_events"
        | "order_delivery_events" | "order_cancellation_events" => ORDER_EVENT_FIELDS.to_vec(),
        "delivery_partner_assignment_events" => vec![
            ("timestamp", DataType::Utf8, false),
            ("order_id", DataType::Utf8, false),
            ("delivery_partner_id", DataType::Utf8, true),
            ("restaurant_id", DataType::Utf8, false),
            ("assigned", DataType::Boolean, false),
            ("estimated_delivery_time", DataType::Utf8, true),
        ],
        "partner_location_events" => vec![
            ("timestamp", DataType::Utf8, false),
            ("delivery_partner_id", DataType::Utf8, false),
            ("lat", DataType::Float64, false),
            ("lon", DataType::Float64, false),
            ("status", DataType::Utf8, false),
            ("speed", DataType::Float64, false),
        ],
        "restaurant_status_events" => vec![
            ("timestamp", DataType::Utf8, false),
            ("restaurant_id", DataType::Utf8, false),
            ("is_open", DataType::Boolean, false),
            ("rating", DataType::Float64, false),
            ("current_load", DataType::Float64, false),
            ("base_popularity", DataType::Float64, false),
            ("popularity_trend", DataType::Float64, false),
            ("competitive_score", DataType::Float64, false),
        ],
        "user_behaviour_events" => vec![
            ("timestamp", DataType::Utf8, false),
            ("user_id", DataType::Utf8, false),
            ("order_frequency", DataType::Float64, false),
            ("lifetime_orders", DataType::Int64, false),
            ("lifetime_spend", DataType::Float64, false),
        ],
        "review_events" => vec![
            ("timestamp", DataType::Utf8, false),
            ("review_id", DataType::Utf8, false),
            ("order_id", DataType::Utf8, false),
            ("restaurant_id", DataType::Utf8, false),
            ("delivery_partner_id", DataType::Utf8, true),
            ("food_rating", DataType::Float64, false),
            ("delivery_rating", DataType::Float64, false),
            ("overall_rating", DataType::Float64, false),
            ("is_ignored", DataType::Boolean, false),
        ],
        // Unknown topic (e.g. a future payload this sink hasn't been taught yet): fall
        // back to whatever the first buffered row's keys/types look like rather than
        // panicking or dropping the partition.
        _ => vec![],
    }
}

fn schema_for_topic(topic: &str, first_row: Option<&Value>) -> Schema {
    let declared = schema_fields_for_topic(topic);
    if !declared.is_empty() {
        return Schema::new(
            declared
                .into_iter()
                .map(|(name, dtype, nullable)| Field::new(name, dtype, nullable))
                .collect::<Vec<_>>(),
        );
    }
    let fallback = first_row
        .and_then(Value::as_object)
        .map(|obj| {
            obj.iter()
                .map(|(k, v)| Field::new(k, infer_type(v), true))
                .collect::<Vec<_>>()
        })
        .unwrap_or_default();
    Schema::new(fallback)
}

fn infer_type(v: &Value) -> DataType {
    match v {
        Value::Bool(_) => DataType::Boolean,
        Value::Number(n) if n.is_i64() || n.is_u64() => DataType::Int64,
        Value::Number(_) => DataType::Float64,
        _ => DataType::Utf8,
    }
}

/// Writes every buffered row for `topic` as one Parquet file against its declared
/// (or, for an untaught topic, inferred) schema.
fn write_parquet_file(path: &Path, topic: &str, rows: &[Value]) -> Result<(), Box<dyn std::error::Error>> {
    let schema = Arc::new(schema_for_topic(topic, rows.first()));
    let columns: Vec<ArrayRef> = schema
        .fields()
        .iter()
        .map(|field| build_column(rows, field.name(), field.data_type()))
        .collect();

    let batch = RecordBatch::try_new(schema.clone(), columns)?;
    fs::create_dir_all(path.parent().unwrap_or_else(|| Path::new(".")))?;
    let file = File::create(path)?;
    let mut writer = ArrowWriter::try_new(file, schema, Some(WriterProperties::builder().build()))?;
    writer.write(&batch)?;
    writer.close()?;
    Ok(())
}

fn build_column(rows: &[Value], name: &str, dtype: &DataType) -> ArrayRef {
    match dtype {
        DataType::Boolean => Arc::new(BooleanArray::from(
            rows.iter()
                .map(|r| r.get(name).and_then(Value::as_bool))
                .collect::<Vec<_>>(),
        )),
        DataType::Int64 => Arc::new(Int64Array::from(
            rows.iter()
                .map(|r| r.get(name).and_then(Value::as_i64))
                .collect::<Vec<_>>(),
        )),
        DataType::Float64 => Arc::new(Float64Array::from(
            rows.iter()
                .map(|r| r.get(name).and_then(Value::as_f64))
                .collect::<Vec<_>>(),
        )),
        _ => Arc::new(StringArray::from(
            rows.iter()
                .map(|r| r.get(name).map(json_scalar_to_string))
                .collect::<Vec<_>>(),
        )),
    }
}

/// Shared, format-aware, partitioned sink. `root` is a local path for
/// [`local::LocalFileSink`] and a bucket-prefix path for
/// [`object_store::ObjectStoreSink`] — the write path is identical either way.
struct PartitionedSink {
    root: String,
    folder: String,
    format: OutputFormat,
    writers: Mutex<HashMap<PathBuf, PartitionWriter>>,
}

impl PartitionedSink {
    fn new(root: String, folder: String, format: OutputFormat) -> Self {
        Self {
            root,
            folder,
            format,
            writers: Mutex::new(HashMap::new()),
        }
    }

    fn write(&self, topic: &str, payload: &Value) -> Result<(), SinkError> {
        let ts = extract_timestamp(topic, payload)?;
        let dir = partition_dir(&self.root, &self.folder, topic, ts);
        fs::create_dir_all(&dir).map_err(|e| SinkError::WriteFailed {
            topic: topic.to_string(),
            reason: e.to_string(),
        })?;
        let path = dir.join(format!("data.{}", ext_for_format(self.format)));

        let mut writers = self.writers.lock().unwrap();
        if !writers.contains_key(&path) {
            let writer = PartitionWriter::open(&path, topic, self.format)?;
            writers.insert(path.clone(), writer);
        }
        writers.get_mut(&path).unwrap().write_record(topic, payload)
    }

    fn flush(&self) -> Result<(), SinkError> {
        let mut writers = self.writers.lock().unwrap();
        for writer in writers.values_mut() {
            writer.flush()?;
        }
        Ok(())
    }
}
