// Copyright 2025-Present Datadog, Inc. https://www.datadoghq.com/
// SPDX-License-Identifier: Apache-2.0

use crate::transport::TransportError;

/// Errors that escalate out of a chunk write or out of startup.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    #[error(transparent)]
    Transport(#[from] TransportError),

    #[error("{failed} of {total} records failed to be put in chunk {chunk_id}")]
    PartialFailure {
        chunk_id: String,
        failed: usize,
        total: usize,
    },

    #[error("Failed to encode aggregated record: {0}")]
    Encode(#[from] protobuf::Error),

    #[error("Failed to install logger: {0}")]
    Logger(String),
}

/// Why a single record was left out of delivery.
///
/// Every variant carries the textual form of the offending record, already
/// truncated to the configured diagnostic length.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum SkipReason {
    #[error("Key '{key}' doesn't exist: {record}")]
    KeyNotFound { key: String, record: String },

    #[error("Record size limit exceeded in {size} bytes (limit {limit}): {record}")]
    RecordTooLarge {
        size: usize,
        limit: usize,
        record: String,
    },

    #[error("{message}: {record}")]
    InvalidShape { message: String, record: String },
}

impl SkipReason {
    /// Short name of the variant, used as a structured log field.
    pub fn kind(&self) -> &'static str {
        match self {
            Self::KeyNotFound { .. } => "key_not_found",
            Self::RecordTooLarge { .. } => "record_too_large",
            Self::InvalidShape { .. } => "invalid_shape",
        }
    }
}
