// Copyright 2025-Present Datadog, Inc. https://www.datadoghq.com/
// SPDX-License-Identifier: Apache-2.0

//! Record types flowing through validation, batching and submission.

use bytes::Bytes;
use chrono::{DateTime, Utc};
use serde_json::Value;

/// Timestamp attached to every buffered record.
pub type EventTime = DateTime<Utc>;

/// A log entry as read back from a durable chunk.
///
/// `record` is usually a JSON object but nothing upstream guarantees it; the
/// validator rejects shapes it cannot handle.
#[derive(Debug, Clone, PartialEq)]
pub struct RawRecord {
    pub tag: String,
    pub time: EventTime,
    pub record: Value,
}

impl RawRecord {
    pub fn new(tag: impl Into<String>, time: EventTime, record: Value) -> Self {
        Self {
            tag: tag.into(),
            time,
            record,
        }
    }
}

/// Anything the batcher can pack: it only needs to know its byte size.
pub trait ByteSize {
    fn byte_size(&self) -> usize;
}

/// A validated payload ready for batching.
///
/// `size` is the number of bytes the record occupies against the service
/// limits, which includes mode-specific overhead (partition key, aggregate
/// member framing) on top of `data.len()`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SerializedRecord {
    data: Bytes,
    size: usize,
}

impl SerializedRecord {
    pub fn new(data: impl Into<Bytes>, size: usize) -> Self {
        Self {
            data: data.into(),
            size,
        }
    }

    pub fn data(&self) -> &Bytes {
        &self.data
    }

    pub fn size(&self) -> usize {
        self.size
    }

    pub fn into_data(self) -> Bytes {
        self.data
    }
}

impl ByteSize for SerializedRecord {
    fn byte_size(&self) -> usize {
        self.size
    }
}
