// Copyright 2025-Present Datadog, Inc. https://www.datadoghq.com/
// SPDX-License-Identifier: Apache-2.0

//! Boundary to the stream service.
//!
//! Authentication, endpoint selection, HTTP and retry/backoff all live behind
//! [`Transport`]. This crate only builds requests that satisfy the service
//! limits and interprets the per-record outcome of each call.

use async_trait::async_trait;
use bytes::Bytes;

use crate::record::ByteSize;

/// One record of a `PutRecords` call.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PutRecordsEntry {
    pub data: Bytes,
    pub partition_key: String,
}

impl PutRecordsEntry {
    pub fn new(data: Bytes, partition_key: String) -> Self {
        Self {
            data,
            partition_key,
        }
    }
}

impl ByteSize for PutRecordsEntry {
    fn byte_size(&self) -> usize {
        self.data.len() + self.partition_key.len()
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PutRecordsRequest {
    pub stream_name: String,
    pub records: Vec<PutRecordsEntry>,
}

impl PutRecordsRequest {
    /// Bytes the request weighs against the per-call limit.
    pub fn byte_size(&self) -> usize {
        self.records.iter().map(ByteSize::byte_size).sum()
    }
}

/// Per-record result, in request order.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RecordOutcome {
    pub sequence_number: Option<String>,
    pub shard_id: Option<String>,
    pub error_code: Option<String>,
    pub error_message: Option<String>,
}

impl RecordOutcome {
    pub fn is_failure(&self) -> bool {
        self.error_code.is_some()
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PutRecordsResponse {
    pub failed_record_count: usize,
    pub records: Vec<RecordOutcome>,
}

impl PutRecordsResponse {
    /// First error code reported for a record, if any.
    pub fn first_error_code(&self) -> Option<&str> {
        self.records
            .iter()
            .find_map(|outcome| outcome.error_code.as_deref())
    }
}

/// A call that did not produce a response at all.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("{message}")]
pub struct TransportError {
    pub message: String,
    pub code: Option<String>,
}

impl TransportError {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            code: None,
        }
    }

    pub fn with_code(mut self, code: impl Into<String>) -> Self {
        self.code = Some(code.into());
        self
    }
}

#[async_trait]
pub trait Transport: Send + Sync {
    /// Performs one `PutRecords` call.
    async fn put_records(
        &self,
        request: PutRecordsRequest,
    ) -> Result<PutRecordsResponse, TransportError>;
}
