// Copyright 2025-Present Datadog, Inc. https://www.datadoghq.com/
// SPDX-License-Identifier: Apache-2.0

//! Writes one chunk to the stream.
//!
//! A write streams the chunk's records through the validator and the batcher,
//! submitting each batch as soon as it closes. Nothing is kept between
//! attempts: on error every in-memory batch is dropped and the caller retries
//! the chunk from its first record.
//!
//! ```text
//!   single-stage:  records ──> Batcher[call] ──> PutRecords
//!   aggregated:    records ──> Batcher[aggregate] ──> Aggregator
//!                          ──> Batcher[call] ──> PutRecords
//! ```

use std::sync::Arc;

use tracing::{debug, error};

use crate::aggregator::{AggregateRecord, Aggregator, PartitionKeyGenerator};
use crate::batcher::{Batch, BatchLimits, Batcher};
use crate::chunk::Chunk;
use crate::config::{Config, FormatType};
use crate::error::Error;
use crate::format::{
    Compressor, FieldInjector, Formatter, Injector, JsonFormatter, NoopInjector,
    SingleValueFormatter,
};
use crate::record::{RawRecord, SerializedRecord};
use crate::reporter::ErrorReporter;
use crate::submitter::Submitter;
use crate::transport::{PutRecordsResponse, Transport};
use crate::validator::{RecordValidator, SizeAccounting, ValidationMode};

/// What a successful write did.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct WriteSummary {
    /// `PutRecords` calls made
    pub calls: usize,
    /// Records delivered, counting aggregate members individually
    pub records: usize,
    /// Aggregates delivered, 0 in single-stage mode
    pub aggregates: usize,
    /// Records dropped by validation
    pub skipped: usize,
    /// Bytes sent, partition keys included
    pub bytes: usize,
}

#[derive(Debug, Clone)]
enum Delivery {
    Records {
        keys: PartitionKeyGenerator,
    },
    Aggregated {
        aggregator: Aggregator,
        member_limits: BatchLimits,
    },
}

pub struct ChunkWriter<T: ?Sized> {
    validator: RecordValidator,
    submitter: Submitter<T>,
    delivery: Delivery,
    call_limits: BatchLimits,
}

impl<T: Transport + ?Sized> ChunkWriter<T> {
    /// Wires validator, batchers, aggregator and submitter from `config`.
    pub fn from_config(config: &Config, transport: Arc<T>) -> Result<Self, Error> {
        config.validate()?;

        let keys = PartitionKeyGenerator::new(config.fixed_partition_key.as_deref());
        let reporter = ErrorReporter::new(config.log_truncate_max_size);
        let compressor = Compressor::new(config.compression, config.compression_level);

        let (delivery, accounting, record_cap) = if config.aggregate {
            let aggregator = Aggregator::new(keys);
            let overhead = aggregator.header_overhead();
            if overhead >= config.max_record_size {
                return Err(Error::InvalidConfig(format!(
                    "max_record_size {} leaves no room for aggregated records ({} bytes of overhead)",
                    config.max_record_size, overhead
                )));
            }
            let cap = config.max_record_size - overhead;
            (
                Delivery::Aggregated {
                    aggregator,
                    member_limits: BatchLimits::new(config.max_records_per_aggregate, cap),
                },
                SizeAccounting::AggregateMember,
                cap,
            )
        } else {
            let accounting = SizeAccounting::Stream {
                partition_key_len: keys.key_len(),
            };
            (
                Delivery::Records { keys },
                accounting,
                config.max_record_size,
            )
        };

        let validator = RecordValidator::new(
            validation_mode(config),
            compressor,
            accounting,
            record_cap,
            reporter,
        );

        debug!(
            "KINESIS | Writer for {} ready, aggregate: {}, record cap: {} bytes",
            config.stream_name, config.aggregate, record_cap
        );

        Ok(Self {
            validator,
            submitter: Submitter::new(transport, config.stream_name.clone()),
            delivery,
            call_limits: config.call_limits(),
        })
    }

    pub fn with_formatter(mut self, formatter: Arc<dyn Formatter>) -> Self {
        self.validator = self.validator.with_formatter(formatter);
        self
    }

    pub fn with_injector(mut self, injector: Arc<dyn Injector>) -> Self {
        self.validator = self.validator.with_injector(injector);
        self
    }

    pub fn validator(&self) -> &RecordValidator {
        &self.validator
    }

    /// Delivers every valid record of `chunk`.
    ///
    /// Stops at the first failed call. A transport error is returned as
    /// [`Error::Transport`]; a call that came back with rejected records is
    /// returned as [`Error::PartialFailure`]. Either way the whole chunk has
    /// to be written again.
    pub async fn write<C: Chunk + ?Sized>(&self, chunk: &C) -> Result<WriteSummary, Error> {
        let chunk_id = chunk.id();
        let mut summary = WriteSummary::default();

        match &self.delivery {
            Delivery::Records { keys } => {
                let mut batcher = Batcher::new(self.call_limits);
                for raw in chunk.open() {
                    let Some(record) = self.accept(chunk_id, raw, &mut summary) else {
                        continue;
                    };
                    if let Some(batch) = batcher.push(record) {
                        self.put_records(chunk_id, batch, keys, &mut summary).await?;
                    }
                }
                if let Some(batch) = batcher.finish() {
                    self.put_records(chunk_id, batch, keys, &mut summary).await?;
                }
            }
            Delivery::Aggregated {
                aggregator,
                member_limits,
            } => {
                let mut members = Batcher::new(*member_limits);
                let mut groups = Batcher::new(self.call_limits);
                for raw in chunk.open() {
                    let Some(record) = self.accept(chunk_id, raw, &mut summary) else {
                        continue;
                    };
                    if let Some(batch) = members.push(record) {
                        let aggregate = aggregator.aggregate(batch.items())?;
                        if let Some(group) = groups.push(aggregate) {
                            self.put_aggregates(chunk_id, group, &mut summary).await?;
                        }
                    }
                }
                if let Some(batch) = members.finish() {
                    let aggregate = aggregator.aggregate(batch.items())?;
                    if let Some(group) = groups.push(aggregate) {
                        self.put_aggregates(chunk_id, group, &mut summary).await?;
                    }
                }
                if let Some(group) = groups.finish() {
                    self.put_aggregates(chunk_id, group, &mut summary).await?;
                }
            }
        }

        debug!(
            chunk_id,
            "KINESIS | Wrote chunk: {} records in {} calls ({} bytes), {} skipped",
            summary.records,
            summary.calls,
            summary.bytes,
            summary.skipped
        );
        Ok(summary)
    }

    fn accept(
        &self,
        chunk_id: &str,
        raw: RawRecord,
        summary: &mut WriteSummary,
    ) -> Option<SerializedRecord> {
        let record = self.validator.validate_or_report(chunk_id, raw);
        if record.is_none() {
            summary.skipped += 1;
        }
        record
    }

    async fn put_records(
        &self,
        chunk_id: &str,
        batch: Batch<SerializedRecord>,
        keys: &PartitionKeyGenerator,
        summary: &mut WriteSummary,
    ) -> Result<(), Error> {
        let count = batch.len();
        let bytes = batch.size();
        let response = self.submitter.submit_records(chunk_id, batch, keys).await?;
        check_response(chunk_id, &response, count)?;

        summary.calls += 1;
        summary.records += count;
        summary.bytes += bytes;
        Ok(())
    }

    async fn put_aggregates(
        &self,
        chunk_id: &str,
        group: Batch<AggregateRecord>,
        summary: &mut WriteSummary,
    ) -> Result<(), Error> {
        let count = group.len();
        let members: usize = group.iter().map(|aggregate| aggregate.member_count).sum();
        let bytes = group.size();
        let response = self.submitter.submit_aggregates(chunk_id, group).await?;
        check_response(chunk_id, &response, count)?;

        summary.calls += 1;
        summary.aggregates += count;
        summary.records += members;
        summary.bytes += bytes;
        Ok(())
    }
}

fn validation_mode(config: &Config) -> ValidationMode {
    if let Some(key) = &config.data_key {
        return ValidationMode::DirectKey(key.clone());
    }

    let formatter: Arc<dyn Formatter> = match config.format {
        FormatType::Json => Arc::new(JsonFormatter::new(config.add_newline)),
        FormatType::SingleValue => Arc::new(SingleValueFormatter::new(
            config.message_key.clone(),
            config.add_newline,
        )),
    };
    let injector = FieldInjector::new(
        config.inject_tag_key.clone(),
        config.inject_time_key.clone(),
        config.inject_time_type,
    );
    let injector: Arc<dyn Injector> = if injector.is_noop() {
        Arc::new(NoopInjector)
    } else {
        Arc::new(injector)
    };

    ValidationMode::Formatted {
        formatter,
        injector,
        chomp: config.chomp_record,
    }
}

fn check_response(
    chunk_id: &str,
    response: &PutRecordsResponse,
    total: usize,
) -> Result<(), Error> {
    if response.failed_record_count == 0 {
        return Ok(());
    }
    error!(
        chunk_id,
        "KINESIS | {} of {} records were rejected, first error: {}",
        response.failed_record_count,
        total,
        response.first_error_code().unwrap_or("unknown")
    );
    Err(Error::PartialFailure {
        chunk_id: chunk_id.to_string(),
        failed: response.failed_record_count,
        total,
    })
}
