// Copyright 2025-Present Datadog, Inc. https://www.datadoghq.com/
// SPDX-License-Identifier: Apache-2.0

//! Mock transports standing in for the stream service

#![allow(dead_code)]

use std::sync::Mutex;

use async_trait::async_trait;
use kinesis_forwarder::transport::{
    PutRecordsRequest, PutRecordsResponse, RecordOutcome, Transport, TransportError,
};

fn accepted(request: &PutRecordsRequest, offset: usize) -> Vec<RecordOutcome> {
    (0..request.records.len())
        .map(|i| RecordOutcome {
            sequence_number: Some((offset + i).to_string()),
            shard_id: Some("shardId-000000000000".to_string()),
            ..Default::default()
        })
        .collect()
}

/// Accepts every record and remembers every request
#[derive(Default)]
pub struct RecordingTransport {
    requests: Mutex<Vec<PutRecordsRequest>>,
}

impl RecordingTransport {
    pub fn requests(&self) -> Vec<PutRecordsRequest> {
        self.requests.lock().map(|r| r.clone()).unwrap_or_default()
    }
}

#[async_trait]
impl Transport for RecordingTransport {
    async fn put_records(
        &self,
        request: PutRecordsRequest,
    ) -> Result<PutRecordsResponse, TransportError> {
        let mut requests = self
            .requests
            .lock()
            .map_err(|e| TransportError::new(e.to_string()))?;
        let offset = requests.iter().map(|r| r.records.len()).sum();
        let response = PutRecordsResponse {
            failed_record_count: 0,
            records: accepted(&request, offset),
        };
        requests.push(request);
        Ok(response)
    }
}

/// Fails every call without a response
pub struct FailingTransport {
    pub message: String,
    calls: Mutex<usize>,
}

impl FailingTransport {
    pub fn new(message: &str) -> Self {
        Self {
            message: message.to_string(),
            calls: Mutex::new(0),
        }
    }

    pub fn calls(&self) -> usize {
        self.calls.lock().map(|c| *c).unwrap_or_default()
    }
}

#[async_trait]
impl Transport for FailingTransport {
    async fn put_records(
        &self,
        _request: PutRecordsRequest,
    ) -> Result<PutRecordsResponse, TransportError> {
        if let Ok(mut calls) = self.calls.lock() {
            *calls += 1;
        }
        Err(TransportError::new(self.message.clone()))
    }
}

/// Rejects the last `failed` records of the first call, accepts everything after
pub struct PartialFailureTransport {
    failed: usize,
    requests: Mutex<Vec<PutRecordsRequest>>,
}

impl PartialFailureTransport {
    pub fn new(failed: usize) -> Self {
        Self {
            failed,
            requests: Mutex::new(Vec::new()),
        }
    }

    pub fn requests(&self) -> Vec<PutRecordsRequest> {
        self.requests.lock().map(|r| r.clone()).unwrap_or_default()
    }
}

#[async_trait]
impl Transport for PartialFailureTransport {
    async fn put_records(
        &self,
        request: PutRecordsRequest,
    ) -> Result<PutRecordsResponse, TransportError> {
        let mut requests = self
            .requests
            .lock()
            .map_err(|e| TransportError::new(e.to_string()))?;
        let first_call = requests.is_empty();
        let mut records = accepted(&request, 0);
        let failed = if first_call {
            self.failed.min(records.len())
        } else {
            0
        };
        let total = records.len();
        for outcome in records.iter_mut().skip(total - failed) {
            *outcome = RecordOutcome {
                error_code: Some("ProvisionedThroughputExceededException".to_string()),
                error_message: Some("Rate exceeded for shard".to_string()),
                ..Default::default()
            };
        }
        requests.push(request);
        Ok(PutRecordsResponse {
            failed_record_count: failed,
            records,
        })
    }
}
