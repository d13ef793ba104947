use crate::client::LogRecord;
use crate::window::TimeWindow;
use flate2::read::GzDecoder;
use flate2::write::GzEncoder;
use flate2::Compression;
use serde_json::{Map, Value};
use std::io::Read;
use thiserror::Error;

/// Key prefix shared by every artifact, in both sinks.
pub const ARTIFACT_PREFIX: &str = "exports";

#[derive(Debug, Error)]
pub enum ArtifactError {
    #[error("refusing to build an artifact with no records")]
    Empty,

    #[error("failed to serialize records: {0}")]
    Json(#[from] serde_json::Error),

    #[error("compression failed: {0}")]
    Io(#[from] std::io::Error),
}

/// Compressed JSON for all records of one window, addressed by sink key.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Artifact {
    key: String,
    payload: Vec<u8>,
    record_count: usize,
}

impl Artifact {
    /// Serialize and compress the records of `window`.
    pub fn encode(window: &TimeWindow, records: &[LogRecord]) -> Result<Self, ArtifactError> {
        if records.is_empty() {
            return Err(ArtifactError::Empty);
        }

        Ok(Self {
            key: artifact_key(window),
            payload: encode_records(records)?,
            record_count: records.len(),
        })
    }

    pub fn key(&self) -> &str {
        &self.key
    }

    pub fn payload(&self) -> &[u8] {
        &self.payload
    }

    pub fn record_count(&self) -> usize {
        self.record_count
    }
}

/// `exports/<window start>.json.gz`
pub fn artifact_key(window: &TimeWindow) -> String {
    format!("{}/{}.json.gz", ARTIFACT_PREFIX, window.start_param())
}

/// Pretty-printed (2-space) JSON array with object keys sorted at every
/// depth, gzip level 9.
pub fn encode_records(records: &[LogRecord]) -> Result<Vec<u8>, ArtifactError> {
    let sorted: Vec<Value> = records
        .iter()
        .map(|record| sort_keys(Value::Object(record.clone())))
        .collect();

    let mut encoder = GzEncoder::new(Vec::new(), Compression::best());
    serde_json::to_writer_pretty(&mut encoder, &sorted)?;
    Ok(encoder.finish()?)
}

/// Inverse of [`encode_records`].
pub fn decode_records(payload: &[u8]) -> Result<Vec<LogRecord>, ArtifactError> {
    let mut json = String::new();
    GzDecoder::new(payload).read_to_string(&mut json)?;
    Ok(serde_json::from_str(&json)?)
}

fn sort_keys(value: Value) -> Value {
    match value {
        Value::Object(map) => {
            let mut entries: Vec<(String, Value)> = map.into_iter().collect();
            entries.sort_by(|a, b| a.0.cmp(&b.0));
            let mut sorted = Map::with_capacity(entries.len());
            for (key, value) in entries {
                sorted.insert(key, sort_keys(value));
            }
            Value::Object(sorted)
        }
        Value::Array(items) => Value::Array(items.into_iter().map(sort_keys).collect()),
        other => other,
    }
}
