// Copyright 2025-Present Datadog, Inc. https://www.datadoghq.com/
// SPDX-License-Identifier: Apache-2.0

//! Turns raw records into size-checked payloads, or into a skip reason.
//!
//! Two modes are supported:
//!
//! - **Direct key**: the record must be a mapping holding a non-null value
//!   under the configured key; that value's string form is the payload.
//! - **Formatted** (default): the record goes through the injector and the
//!   formatter, optionally loses one trailing newline (`chomp_record`).
//!
//! Compression, when configured, applies last in both modes. The resulting
//! size is then checked against the per-record cap, including whatever the
//! current delivery mode adds on top of the payload.

use std::sync::Arc;

use serde_json::Value;

use crate::aggregator::member_size;
use crate::error::SkipReason;
use crate::format::{Compressor, Formatter, Injector};
use crate::record::{RawRecord, SerializedRecord};
use crate::reporter::ErrorReporter;

#[derive(Debug, Clone)]
pub enum ValidationMode {
    DirectKey(String),
    Formatted {
        formatter: Arc<dyn Formatter>,
        injector: Arc<dyn Injector>,
        chomp: bool,
    },
}

/// What a payload costs against the per-record cap besides its own bytes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SizeAccounting {
    /// Sent as its own stream record: the partition key counts too.
    Stream { partition_key_len: usize },
    /// Packed into an aggregate: protobuf framing of the member counts too.
    AggregateMember,
}

impl SizeAccounting {
    pub fn record_size(&self, data_len: usize) -> usize {
        match self {
            Self::Stream { partition_key_len } => data_len + partition_key_len,
            Self::AggregateMember => member_size(data_len),
        }
    }
}

#[derive(Debug, Clone)]
pub struct RecordValidator {
    mode: ValidationMode,
    compressor: Compressor,
    accounting: SizeAccounting,
    max_record_size: usize,
    reporter: ErrorReporter,
}

impl RecordValidator {
    pub fn new(
        mode: ValidationMode,
        compressor: Compressor,
        accounting: SizeAccounting,
        max_record_size: usize,
        reporter: ErrorReporter,
    ) -> Self {
        Self {
            mode,
            compressor,
            accounting,
            max_record_size,
            reporter,
        }
    }

    /// Replaces the formatter. Has no effect in direct-key mode.
    pub fn with_formatter(mut self, formatter: Arc<dyn Formatter>) -> Self {
        if let ValidationMode::Formatted { formatter: f, .. } = &mut self.mode {
            *f = formatter;
        }
        self
    }

    /// Replaces the injector. Has no effect in direct-key mode.
    pub fn with_injector(mut self, injector: Arc<dyn Injector>) -> Self {
        if let ValidationMode::Formatted { injector: i, .. } = &mut self.mode {
            *i = injector;
        }
        self
    }

    pub fn mode(&self) -> &ValidationMode {
        &self.mode
    }

    /// Effective cap applied to `SerializedRecord::size`.
    pub fn max_record_size(&self) -> usize {
        self.max_record_size
    }

    pub fn reporter(&self) -> &ErrorReporter {
        &self.reporter
    }

    pub fn validate(&self, raw: RawRecord) -> Result<SerializedRecord, SkipReason> {
        let (data, record) = match &self.mode {
            ValidationMode::DirectKey(key) => (self.extract_key(key, &raw.record)?, raw.record),
            ValidationMode::Formatted {
                formatter,
                injector,
                chomp,
            } => {
                let record = injector.inject(&raw.tag, raw.time, raw.record);
                let mut data = formatter
                    .format(&raw.tag, raw.time, &record)
                    .map_err(|e| self.invalid_shape(e.to_string(), &record))?;
                if *chomp && data.last() == Some(&b'\n') {
                    data.pop();
                }
                (data, record)
            }
        };

        let data = self
            .compressor
            .compress(data)
            .map_err(|e| self.invalid_shape(e.to_string(), &record))?;

        let size = self.accounting.record_size(data.len());
        if size > self.max_record_size {
            return Err(SkipReason::RecordTooLarge {
                size,
                limit: self.max_record_size,
                record: self.describe(&record),
            });
        }

        Ok(SerializedRecord::new(data, size))
    }

    /// Validates `raw`, reporting and dropping it on failure.
    pub fn validate_or_report(&self, chunk_id: &str, raw: RawRecord) -> Option<SerializedRecord> {
        match self.validate(raw) {
            Ok(record) => Some(record),
            Err(reason) => {
                self.reporter.report(chunk_id, &reason);
                None
            }
        }
    }

    fn extract_key(&self, key: &str, record: &Value) -> Result<Vec<u8>, SkipReason> {
        let Value::Object(map) = record else {
            return Err(self.invalid_shape("record is not a mapping".to_string(), record));
        };
        match map.get(key) {
            None | Some(Value::Null) => Err(SkipReason::KeyNotFound {
                key: key.to_string(),
                record: self.describe(record),
            }),
            Some(Value::String(s)) => Ok(s.as_bytes().to_vec()),
            Some(other) => Ok(other.to_string().into_bytes()),
        }
    }

    fn invalid_shape(&self, message: String, record: &Value) -> SkipReason {
        SkipReason::InvalidShape {
            message,
            record: self.describe(record),
        }
    }

    fn describe(&self, record: &Value) -> String {
        self.reporter.truncate(&record.to_string()).into_owned()
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::config::TimeType;
    use crate::format::{FieldInjector, JsonFormatter, NoopInjector, SingleValueFormatter};
    use chrono::{DateTime, Utc};
    use serde_json::json;
    use std::io::Read;
    use tracing_test::traced_test;

    fn time() -> DateTime<Utc> {
        DateTime::from_timestamp(1_700_000_000, 0).unwrap()
    }

    fn raw(record: Value) -> RawRecord {
        RawRecord::new("app", time(), record)
    }

    fn formatted(chomp: bool) -> ValidationMode {
        ValidationMode::Formatted {
            formatter: Arc::new(JsonFormatter::default()),
            injector: Arc::new(NoopInjector),
            chomp,
        }
    }

    fn validator(mode: ValidationMode) -> RecordValidator {
        RecordValidator::new(
            mode,
            Compressor::Identity,
            SizeAccounting::Stream {
                partition_key_len: 0,
            },
            1024,
            ErrorReporter::new(1024),
        )
    }

    #[test]
    fn test_direct_key_string_value() {
        let v = validator(ValidationMode::DirectKey("msg".to_string()));
        let record = v.validate(raw(json!({"msg": "hello", "other": 1}))).unwrap();

        assert_eq!(record.data().as_ref(), b"hello");
        assert_eq!(record.size(), 5);
    }

    #[test]
    fn test_direct_key_non_string_value() {
        let v = validator(ValidationMode::DirectKey("msg".to_string()));
        let record = v.validate(raw(json!({"msg": {"a": 1}}))).unwrap();

        assert_eq!(record.data().as_ref(), br#"{"a":1}"#);
    }

    #[test]
    fn test_direct_key_missing_or_null() {
        let v = validator(ValidationMode::DirectKey("msg".to_string()));

        let err = v.validate(raw(json!({"other": 1}))).unwrap_err();
        assert_eq!(
            err,
            SkipReason::KeyNotFound {
                key: "msg".to_string(),
                record: r#"{"other":1}"#.to_string(),
            }
        );

        let err = v.validate(raw(json!({"msg": null}))).unwrap_err();
        assert_eq!(err.kind(), "key_not_found");
    }

    #[test]
    fn test_direct_key_requires_mapping() {
        let v = validator(ValidationMode::DirectKey("msg".to_string()));
        let err = v.validate(raw(json!("just a string"))).unwrap_err();

        assert_eq!(err.kind(), "invalid_shape");
        assert!(err.to_string().contains("not a mapping"));
    }

    #[test]
    fn test_formatted_mode_keeps_newline_unless_chomped() {
        let record = json!({"message": "m"});

        let kept = validator(formatted(false)).validate(raw(record.clone())).unwrap();
        assert_eq!(kept.data().as_ref(), b"{\"message\":\"m\"}\n");

        let chomped = validator(formatted(true)).validate(raw(record)).unwrap();
        assert_eq!(chomped.data().as_ref(), b"{\"message\":\"m\"}");
    }

    #[test]
    fn test_chomp_strips_a_single_byte() {
        let v = validator(ValidationMode::Formatted {
            formatter: Arc::new(SingleValueFormatter::new("message", false)),
            injector: Arc::new(NoopInjector),
            chomp: true,
        });
        let record = v.validate(raw(json!({"message": "line\n\n"}))).unwrap();

        assert_eq!(record.data().as_ref(), b"line\n");
    }

    #[test]
    fn test_formatted_mode_injects_before_formatting() {
        let v = validator(ValidationMode::Formatted {
            formatter: Arc::new(JsonFormatter::new(false)),
            injector: Arc::new(FieldInjector::new(
                None,
                Some("time".to_string()),
                TimeType::Unixtime,
            )),
            chomp: false,
        });
        let record = v.validate(raw(json!({"message": "m"}))).unwrap();
        let parsed: Value = serde_json::from_slice(record.data()).unwrap();

        assert_eq!(parsed["time"], 1_700_000_000);
    }

    #[test]
    fn test_formatter_failure_is_invalid_shape() {
        let v = validator(ValidationMode::Formatted {
            formatter: Arc::new(SingleValueFormatter::new("message", false)),
            injector: Arc::new(NoopInjector),
            chomp: false,
        });
        let err = v.validate(raw(json!({"other": "x"}))).unwrap_err();

        assert_eq!(err.kind(), "invalid_shape");
    }

    #[test]
    fn test_record_too_large_counts_overhead() {
        let v = RecordValidator::new(
            ValidationMode::DirectKey("msg".to_string()),
            Compressor::Identity,
            SizeAccounting::Stream {
                partition_key_len: 32,
            },
            100,
            ErrorReporter::new(1024),
        );

        assert!(v.validate(raw(json!({"msg": "x".repeat(68)}))).is_ok());
        let err = v
            .validate(raw(json!({"msg": "x".repeat(69)})))
            .unwrap_err();
        match err {
            SkipReason::RecordTooLarge { size, limit, .. } => {
                assert_eq!(size, 101);
                assert_eq!(limit, 100);
            }
            other => panic!("unexpected {other:?}"),
        }
    }

    #[test]
    fn test_with_formatter_only_applies_in_formatted_mode() {
        let v = validator(formatted(false))
            .with_formatter(Arc::new(SingleValueFormatter::new("message", false)));
        let record = v.validate(raw(json!({"message": "plain"}))).unwrap();
        assert_eq!(record.data().as_ref(), b"plain");

        let v = validator(ValidationMode::DirectKey("msg".to_string()))
            .with_formatter(Arc::new(JsonFormatter::default()));
        assert!(matches!(v.mode(), ValidationMode::DirectKey(_)));
    }

    #[test]
    fn test_aggregate_member_accounting() {
        let accounting = SizeAccounting::AggregateMember;
        assert_eq!(accounting.record_size(10), member_size(10));
        assert!(accounting.record_size(10) > 10);
    }

    #[test]
    fn test_skip_reason_record_is_truncated() {
        let v = RecordValidator::new(
            ValidationMode::DirectKey("msg".to_string()),
            Compressor::Identity,
            SizeAccounting::Stream {
                partition_key_len: 0,
            },
            1024,
            ErrorReporter::new(10),
        );
        let err = v
            .validate(raw(json!({"other": "a long value that goes on"})))
            .unwrap_err();

        match err {
            SkipReason::KeyNotFound { record, .. } => assert_eq!(record, r#"{"other":""#),
            other => panic!("unexpected {other:?}"),
        }
    }

    #[test]
    fn test_deflate_payload_inflates_to_formatted_bytes() {
        let record = json!({"message": "compress", "nested": {"list": [1, 2, 3]}});
        let plain = validator(formatted(false)).validate(raw(record.clone())).unwrap();

        let v = RecordValidator::new(
            formatted(false),
            Compressor::Deflate(6),
            SizeAccounting::Stream {
                partition_key_len: 0,
            },
            1024,
            ErrorReporter::new(1024),
        );
        let compressed = v.validate(raw(record)).unwrap();

        let mut inflated = Vec::new();
        flate2::read::ZlibDecoder::new(compressed.data().as_ref())
            .read_to_end(&mut inflated)
            .unwrap();
        assert_eq!(inflated, plain.data().as_ref());
        assert_eq!(compressed.size(), compressed.data().len());
    }

    #[test]
    #[traced_test]
    fn test_validate_or_report_logs_and_drops() {
        let v = validator(ValidationMode::DirectKey("msg".to_string()));

        assert!(v
            .validate_or_report("chunk-9", raw(json!({"other": 1})))
            .is_none());
        assert!(logs_contain("Key 'msg' doesn't exist"));

        assert!(v
            .validate_or_report("chunk-9", raw(json!({"msg": "ok"})))
            .is_some());
    }
}
