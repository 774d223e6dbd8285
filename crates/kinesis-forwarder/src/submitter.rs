// Copyright 2025-Present Datadog, Inc. https://www.datadoghq.com/
// SPDX-License-Identifier: Apache-2.0

use std::sync::Arc;

use tracing::{debug, error};

use crate::aggregator::{AggregateRecord, PartitionKeyGenerator};
use crate::batcher::Batch;
use crate::record::SerializedRecord;
use crate::transport::{
    PutRecordsEntry, PutRecordsRequest, PutRecordsResponse, Transport, TransportError,
};

/// Shapes batches into `PutRecords` calls.
///
/// No retries happen here: a transport error goes back to the caller as is,
/// and the outer buffering layer decides when to try the chunk again.
pub struct Submitter<T: ?Sized> {
    transport: Arc<T>,
    stream_name: String,
}

impl<T: Transport + ?Sized> Submitter<T> {
    pub fn new(transport: Arc<T>, stream_name: impl Into<String>) -> Self {
        Self {
            transport,
            stream_name: stream_name.into(),
        }
    }

    pub fn stream_name(&self) -> &str {
        &self.stream_name
    }

    /// Sends each record of `batch` as its own stream record.
    pub async fn submit_records(
        &self,
        chunk_id: &str,
        batch: Batch<SerializedRecord>,
        keys: &PartitionKeyGenerator,
    ) -> Result<PutRecordsResponse, TransportError> {
        let entries = batch
            .into_iter()
            .map(|record| PutRecordsEntry::new(record.into_data(), keys.generate()))
            .collect();
        self.submit(chunk_id, entries).await
    }

    /// Sends every aggregate of `group` under its own partition key.
    pub async fn submit_aggregates(
        &self,
        chunk_id: &str,
        group: Batch<AggregateRecord>,
    ) -> Result<PutRecordsResponse, TransportError> {
        let members: usize = group.iter().map(|aggregate| aggregate.member_count).sum();
        debug!(
            chunk_id,
            "KINESIS | Sending {} aggregates holding {} records",
            group.len(),
            members
        );
        let entries = group
            .into_iter()
            .map(|aggregate| PutRecordsEntry::new(aggregate.data, aggregate.partition_key))
            .collect();
        self.submit(chunk_id, entries).await
    }

    async fn submit(
        &self,
        chunk_id: &str,
        records: Vec<PutRecordsEntry>,
    ) -> Result<PutRecordsResponse, TransportError> {
        let request = PutRecordsRequest {
            stream_name: self.stream_name.clone(),
            records,
        };
        let count = request.records.len();
        let bytes = request.byte_size();
        debug!(
            chunk_id,
            "KINESIS | Putting {} records ({} bytes) to {}", count, bytes, self.stream_name
        );

        match self.transport.put_records(request).await {
            Ok(response) => {
                debug!(
                    chunk_id,
                    "KINESIS | Put {} records to {}, {} failed",
                    count,
                    self.stream_name,
                    response.failed_record_count
                );
                Ok(response)
            }
            Err(e) => {
                error!(chunk_id, "KINESIS | Failed to put {} records: {}", count, e);
                Err(e)
            }
        }
    }
}
