// Copyright 2025-Present Datadog, Inc. https://www.datadoghq.com/
// SPDX-License-Identifier: Apache-2.0

//! KPL aggregation: packing many member records into one stream record.
//!
//! # Output Format
//!
//! ```text
//! +-------------+---------------------------------------+--------------+
//! | magic (4B)  | protobuf AggregatedRecord             | md5 (16B)    |
//! | F3 89 9A C2 |   partition_key_table = [key]         | of protobuf  |
//! |             |   records = [{partition_key_index: 0, |              |
//! |             |               data: member}, ...]     |              |
//! +-------------+---------------------------------------+--------------+
//! ```
//!
//! The aggregate is put with the same key as its partition key, so the key
//! is counted twice against the record limit: once in the table, once as
//! request metadata.
//!
//! # Size Accounting
//!
//! Sizes are exact, not estimated. For an aggregate holding members
//! `m1..mn` under key `k`:
//!
//! ```text
//! byte_size = header_overhead(len(k)) + member_size(len(m1)) + ... + member_size(len(mn))
//! ```
//!
//! so checking members against `max_record_size - header_overhead` up front
//! guarantees the encoded aggregate never exceeds `max_record_size`.

use bytes::{BufMut, Bytes, BytesMut};
use md5::{Digest, Md5};
use protobuf::CodedOutputStream;
use rand::Rng;
use tracing::debug;

use crate::constants::RANDOM_PARTITION_KEY_BYTES;
use crate::error::Error;
use crate::record::{ByteSize, SerializedRecord};

/// Identifies a KPL aggregated record.
pub const KPL_MAGIC: [u8; 4] = [0xF3, 0x89, 0x9A, 0xC2];

const DIGEST_LEN: usize = 16;

// AggregatedRecord
const FIELD_PARTITION_KEY_TABLE: u32 = 1;
const FIELD_RECORDS: u32 = 3;
// Record
const FIELD_PARTITION_KEY_INDEX: u32 = 1;
const FIELD_DATA: u32 = 3;

fn varint_len(value: usize) -> usize {
    protobuf::rt::compute_raw_varint64_size(value as u64) as usize
}

// One-byte tag, length prefix, payload. All our field numbers are < 16.
fn length_delimited_len(len: usize) -> usize {
    1 + varint_len(len) + len
}

/// Bytes an aggregate spends on everything but its members.
pub fn header_overhead(partition_key_len: usize) -> usize {
    KPL_MAGIC.len() + DIGEST_LEN + length_delimited_len(partition_key_len) + partition_key_len
}

/// Bytes a member of `data_len` bytes adds to an aggregate.
pub fn member_size(data_len: usize) -> usize {
    // partition_key_index = 0: tag + one varint byte
    let record_len = 2 + length_delimited_len(data_len);
    length_delimited_len(record_len)
}

/// Policy for the partition key of each stream record.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PartitionKeyGenerator {
    Fixed(String),
    /// Hex-encoded random bytes, drawn afresh for every key.
    Random,
}

impl PartitionKeyGenerator {
    pub fn new(fixed_partition_key: Option<&str>) -> Self {
        match fixed_partition_key {
            Some(key) => Self::Fixed(key.to_string()),
            None => Self::Random,
        }
    }

    pub fn generate(&self) -> String {
        match self {
            Self::Fixed(key) => key.clone(),
            Self::Random => {
                let mut bytes = [0u8; RANDOM_PARTITION_KEY_BYTES];
                rand::thread_rng().fill(&mut bytes);
                hex::encode(bytes)
            }
        }
    }

    /// Length of every key this generator produces.
    pub fn key_len(&self) -> usize {
        match self {
            Self::Fixed(key) => key.len(),
            Self::Random => RANDOM_PARTITION_KEY_BYTES * 2,
        }
    }
}

/// One encoded aggregate and the key it is put under.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AggregateRecord {
    pub partition_key: String,
    pub data: Bytes,
    pub member_count: usize,
}

impl ByteSize for AggregateRecord {
    fn byte_size(&self) -> usize {
        self.data.len() + self.partition_key.len()
    }
}

#[derive(Debug, Clone)]
pub struct Aggregator {
    key_generator: PartitionKeyGenerator,
}

impl Aggregator {
    pub fn new(key_generator: PartitionKeyGenerator) -> Self {
        Self { key_generator }
    }

    pub fn header_overhead(&self) -> usize {
        header_overhead(self.key_generator.key_len())
    }

    /// Aggregates `members` under a freshly generated key.
    pub fn aggregate(&self, members: &[SerializedRecord]) -> Result<AggregateRecord, Error> {
        self.aggregate_with_key(members, self.key_generator.generate())
    }

    /// Deterministic: the same members and key always encode to the same bytes.
    pub fn aggregate_with_key(
        &self,
        members: &[SerializedRecord],
        partition_key: String,
    ) -> Result<AggregateRecord, Error> {
        let message = encode_message(&partition_key, members)?;

        let mut buf = BytesMut::with_capacity(KPL_MAGIC.len() + message.len() + DIGEST_LEN);
        buf.put_slice(&KPL_MAGIC);
        buf.put_slice(&message);
        buf.put_slice(&Md5::digest(&message));

        debug!(
            "KINESIS | Aggregated {} records into {} bytes",
            members.len(),
            buf.len()
        );

        Ok(AggregateRecord {
            partition_key,
            data: buf.freeze(),
            member_count: members.len(),
        })
    }
}

fn encode_message(partition_key: &str, members: &[SerializedRecord]) -> Result<Vec<u8>, Error> {
    let mut message = Vec::new();
    let mut record = Vec::new();
    {
        let mut os = CodedOutputStream::vec(&mut message);
        os.write_string(FIELD_PARTITION_KEY_TABLE, partition_key)?;
        for member in members {
            record.clear();
            {
                let mut rs = CodedOutputStream::vec(&mut record);
                rs.write_uint64(FIELD_PARTITION_KEY_INDEX, 0)?;
                rs.write_bytes(FIELD_DATA, member.data())?;
                rs.flush()?;
            }
            os.write_bytes(FIELD_RECORDS, &record)?;
        }
        os.flush()?;
    }
    Ok(message)
}
