// Copyright 2025-Present Datadog, Inc. https://www.datadoghq.com/
// SPDX-License-Identifier: Apache-2.0

//! Builders for chunks and configurations used across integration tests

#![allow(dead_code)]

use chrono::{DateTime, Utc};
use kinesis_forwarder::{Config, MemoryChunk, RawRecord};
use serde_json::{json, Value};

pub fn event_time() -> DateTime<Utc> {
    DateTime::from_timestamp(1_700_000_000, 0).unwrap_or_default()
}

pub fn raw(record: Value) -> RawRecord {
    RawRecord::new("app.logs", event_time(), record)
}

/// A chunk of `count` records shaped `{"msg": "<prefix>-<i>"}`.
pub fn message_chunk(id: &str, prefix: &str, count: usize) -> MemoryChunk {
    let records = (0..count)
        .map(|i| raw(json!({ "msg": format!("{prefix}-{i}") })))
        .collect();
    MemoryChunk::new(id, records)
}

pub fn config() -> Config {
    Config {
        stream_name: "test-stream".to_string(),
        ..Default::default()
    }
}

pub fn direct_key_config() -> Config {
    Config {
        data_key: Some("msg".to_string()),
        ..config()
    }
}
