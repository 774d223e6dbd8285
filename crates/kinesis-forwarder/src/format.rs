// Copyright 2025-Present Datadog, Inc. https://www.datadoghq.com/
// SPDX-License-Identifier: Apache-2.0

//! Pluggable strategies applied to a record in formatted mode.
//!
//! ```text
//!   RawRecord ──> Injector ──> Formatter ──> [chomp] ──> Compressor ──> payload
//! ```
//!
//! Each strategy is built once from validated configuration and shared by
//! every record of a chunk. None of them keep state between records.

use std::fmt::Debug;
use std::io::Write;

use chrono::SecondsFormat;
use serde_json::{json, Value};

use crate::config::{Compression, TimeType};
use crate::record::EventTime;

#[derive(Debug, thiserror::Error)]
#[error("{0}")]
pub struct FormatError(pub String);

impl From<serde_json::Error> for FormatError {
    fn from(e: serde_json::Error) -> Self {
        Self(format!("failed to encode record: {e}"))
    }
}

impl From<std::io::Error> for FormatError {
    fn from(e: std::io::Error) -> Self {
        Self(format!("failed to compress record: {e}"))
    }
}

/// Turns a record into the bytes sent downstream.
pub trait Formatter: Debug + Send + Sync {
    fn format(&self, tag: &str, time: EventTime, record: &Value) -> Result<Vec<u8>, FormatError>;
}

/// Encodes the whole record as JSON.
#[derive(Debug, Clone, Copy)]
pub struct JsonFormatter {
    add_newline: bool,
}

impl JsonFormatter {
    pub fn new(add_newline: bool) -> Self {
        Self { add_newline }
    }
}

impl Default for JsonFormatter {
    fn default() -> Self {
        Self::new(true)
    }
}

impl Formatter for JsonFormatter {
    fn format(&self, _tag: &str, _time: EventTime, record: &Value) -> Result<Vec<u8>, FormatError> {
        let mut data = serde_json::to_vec(record)?;
        if self.add_newline {
            data.push(b'\n');
        }
        Ok(data)
    }
}

/// Emits the value of a single field, as is.
#[derive(Debug, Clone)]
pub struct SingleValueFormatter {
    message_key: String,
    add_newline: bool,
}

impl SingleValueFormatter {
    pub fn new(message_key: impl Into<String>, add_newline: bool) -> Self {
        Self {
            message_key: message_key.into(),
            add_newline,
        }
    }
}

impl Formatter for SingleValueFormatter {
    fn format(&self, _tag: &str, _time: EventTime, record: &Value) -> Result<Vec<u8>, FormatError> {
        let mut data = match record.get(&self.message_key) {
            Some(Value::String(s)) => s.as_bytes().to_vec(),
            Some(Value::Null) | None => {
                return Err(FormatError(format!(
                    "field '{}' is missing",
                    self.message_key
                )))
            }
            Some(other) => other.to_string().into_bytes(),
        };
        if self.add_newline {
            data.push(b'\n');
        }
        Ok(data)
    }
}

/// Adds enrichment fields to a record before it is formatted.
pub trait Injector: Debug + Send + Sync {
    fn inject(&self, tag: &str, time: EventTime, record: Value) -> Value;
}

#[derive(Debug, Clone, Copy, Default)]
pub struct NoopInjector;

impl Injector for NoopInjector {
    fn inject(&self, _tag: &str, _time: EventTime, record: Value) -> Value {
        record
    }
}

/// Writes the tag and/or event time into configured fields.
///
/// Records that are not JSON objects are returned untouched.
#[derive(Debug, Clone, Default)]
pub struct FieldInjector {
    tag_key: Option<String>,
    time_key: Option<String>,
    time_type: TimeType,
}

impl FieldInjector {
    pub fn new(tag_key: Option<String>, time_key: Option<String>, time_type: TimeType) -> Self {
        Self {
            tag_key,
            time_key,
            time_type,
        }
    }

    pub fn is_noop(&self) -> bool {
        self.tag_key.is_none() && self.time_key.is_none()
    }

    fn time_value(&self, time: EventTime) -> Value {
        match self.time_type {
            TimeType::String => Value::String(time.to_rfc3339_opts(SecondsFormat::Millis, true)),
            TimeType::Unixtime => json!(time.timestamp()),
            TimeType::Float => {
                json!(time.timestamp() as f64 + f64::from(time.timestamp_subsec_nanos()) / 1e9)
            }
        }
    }
}

impl Injector for FieldInjector {
    fn inject(&self, tag: &str, time: EventTime, mut record: Value) -> Value {
        if let Value::Object(map) = &mut record {
            if let Some(key) = &self.tag_key {
                map.insert(key.clone(), Value::String(tag.to_string()));
            }
            if let Some(key) = &self.time_key {
                map.insert(key.clone(), self.time_value(time));
            }
        }
        record
    }
}

/// Post-format compression.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Compressor {
    #[default]
    Identity,
    /// zlib-framed deflate stream.
    Deflate(u32),
    Zstd(i32),
}

impl Compressor {
    pub fn new(compression: Compression, level: Option<i32>) -> Self {
        match compression {
            Compression::None => Self::Identity,
            Compression::Deflate => {
                Self::Deflate(level.map_or(6, |l| l.clamp(0, 9).unsigned_abs()))
            }
            Compression::Zstd => Self::Zstd(level.unwrap_or(3)),
        }
    }

    pub fn compress(&self, data: Vec<u8>) -> Result<Vec<u8>, FormatError> {
        match self {
            Self::Identity => Ok(data),
            Self::Deflate(level) => {
                let mut encoder = flate2::write::ZlibEncoder::new(
                    Vec::new(),
                    flate2::Compression::new(*level),
                );
                encoder.write_all(&data)?;
                Ok(encoder.finish()?)
            }
            Self::Zstd(level) => {
                let mut encoder = zstd::stream::write::Encoder::new(Vec::new(), *level)?;
                encoder.write_all(&data)?;
                Ok(encoder.finish()?)
            }
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use chrono::DateTime;
    use std::io::Read;

    fn time() -> EventTime {
        DateTime::from_timestamp(1_700_000_000, 250_000_000).unwrap()
    }

    #[test]
    fn test_json_formatter() {
        let record = json!({"message": "hello", "level": "info"});

        let with_newline = JsonFormatter::default()
            .format("tag", time(), &record)
            .unwrap();
        assert_eq!(with_newline.last(), Some(&b'\n'));

        let without = JsonFormatter::new(false)
            .format("tag", time(), &record)
            .unwrap();
        let parsed: Value = serde_json::from_slice(&without).unwrap();
        assert_eq!(parsed, record);
    }

    #[test]
    fn test_single_value_formatter() {
        let formatter = SingleValueFormatter::new("message", false);

        let data = formatter
            .format("tag", time(), &json!({"message": "raw line"}))
            .unwrap();
        assert_eq!(data, b"raw line");

        let data = formatter
            .format("tag", time(), &json!({"message": 42}))
            .unwrap();
        assert_eq!(data, b"42");

        let err = formatter
            .format("tag", time(), &json!({"other": "x"}))
            .unwrap_err();
        assert!(err.to_string().contains("'message' is missing"));
    }

    #[test]
    fn test_field_injector_time_types() {
        let record = json!({"message": "m"});

        let injector = FieldInjector::new(
            Some("tag".to_string()),
            Some("time".to_string()),
            TimeType::String,
        );
        let injected = injector.inject("app.web", time(), record.clone());
        assert_eq!(injected["tag"], "app.web");
        assert_eq!(injected["time"], "2023-11-14T22:13:20.250Z");

        let injector = FieldInjector::new(None, Some("time".to_string()), TimeType::Unixtime);
        let injected = injector.inject("app.web", time(), record.clone());
        assert_eq!(injected["time"], 1_700_000_000);
        assert!(injected.get("tag").is_none());

        let injector = FieldInjector::new(None, Some("time".to_string()), TimeType::Float);
        let injected = injector.inject("app.web", time(), record);
        assert_eq!(injected["time"].as_f64(), Some(1_700_000_000.25));
    }

    #[test]
    fn test_field_injector_ignores_non_objects() {
        let injector = FieldInjector::new(Some("tag".to_string()), None, TimeType::String);
        let injected = injector.inject("t", time(), json!(["a", "b"]));
        assert_eq!(injected, json!(["a", "b"]));
        assert!(!injector.is_noop());
        assert!(FieldInjector::default().is_noop());
    }

    #[test]
    fn test_compressor_identity() {
        let data = b"plain".to_vec();
        assert_eq!(Compressor::Identity.compress(data.clone()).unwrap(), data);
    }

    #[test]
    fn test_compressor_deflate_inflates_back() {
        let data = br#"{"message":"compress me please","n":1}"#.repeat(8);
        let compressed = Compressor::new(Compression::Deflate, None)
            .compress(data.clone())
            .unwrap();
        assert_ne!(compressed, data);

        let mut decoder = flate2::read::ZlibDecoder::new(&compressed[..]);
        let mut inflated = Vec::new();
        decoder.read_to_end(&mut inflated).unwrap();
        assert_eq!(inflated, data);
    }

    #[test]
    fn test_compressor_zstd_decodes_back() {
        let data = b"test log data for compression".to_vec();
        let compressed = Compressor::new(Compression::Zstd, Some(3))
            .compress(data.clone())
            .unwrap();

        let mut decoder = zstd::stream::read::Decoder::new(&compressed[..]).unwrap();
        let mut decompressed = Vec::new();
        decoder.read_to_end(&mut decompressed).unwrap();
        assert_eq!(decompressed, data);
    }

    #[test]
    fn test_compressor_deflate_level_is_clamped() {
        assert_eq!(
            Compressor::new(Compression::Deflate, Some(42)),
            Compressor::Deflate(9)
        );
        assert_eq!(
            Compressor::new(Compression::Deflate, Some(-1)),
            Compressor::Deflate(0)
        );
        assert_eq!(Compressor::new(Compression::None, Some(9)), Compressor::Identity);
    }
}
