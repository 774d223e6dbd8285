// Copyright 2025-Present Datadog, Inc. https://www.datadoghq.com/
// SPDX-License-Identifier: Apache-2.0

//! Kinesis service limits and configuration defaults.
//!
//! The service enforces three independent constraints on a `PutRecords`
//! call: a record count, a total request size and a per-record size. The
//! per-record size counts the partition key as well as the data blob.
//!
//! Configured limits may be tighter than these caps, never looser.

/// Maximum number of records accepted by a single `PutRecords` call.
pub const SERVICE_MAX_RECORDS_PER_CALL: usize = 500;

/// Maximum total size of a single `PutRecords` call in bytes.
///
/// # Value: 5MB (5,242,880 bytes)
pub const SERVICE_MAX_REQUEST_SIZE: usize = 5 * 1_024 * 1_024;

/// Maximum size of a single record (data blob plus partition key) in bytes.
///
/// # Value: 1MB (1,048,576 bytes)
///
/// In aggregated mode this caps the encoded aggregate, not the members.
pub const SERVICE_MAX_RECORD_SIZE: usize = 1_024 * 1_024;

/// Maximum length of a partition key accepted by the service.
pub const SERVICE_MAX_PARTITION_KEY_LEN: usize = 256;

/// Default number of records (or aggregates) sent per call.
pub const DEFAULT_MAX_RECORDS_PER_CALL: usize = 128;

/// Default request size limit per call in bytes.
pub const DEFAULT_MAX_REQUEST_SIZE: usize = 4_096;

/// Default per-record size limit in bytes.
///
/// Must stay below [`DEFAULT_MAX_REQUEST_SIZE`] so that a valid record always
/// fits a call on its own.
pub const DEFAULT_MAX_RECORD_SIZE: usize = 1_024;

/// Default number of member records packed into one aggregate.
pub const DEFAULT_MAX_RECORDS_PER_AGGREGATE: usize = 100;

/// Default truncation length for per-record skip diagnostics.
pub const DEFAULT_LOG_TRUNCATE_MAX_SIZE: usize = 1_024;

/// Number of random bytes drawn for a generated partition key.
///
/// Hex-encoded, a generated key is twice this many characters long.
pub const RANDOM_PARTITION_KEY_BYTES: usize = 16;

/// Default field read by the single-value formatter.
pub const DEFAULT_MESSAGE_KEY: &str = "message";
