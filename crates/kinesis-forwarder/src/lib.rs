// Copyright 2025-Present Datadog, Inc. https://www.datadoghq.com/
// SPDX-License-Identifier: Apache-2.0

//! # Kinesis Forwarder
//!
//! Delivery core for buffered log records bound to a Kinesis data stream.
//!
//! A chunk of records, handed over by a durable buffering layer, is turned
//! into the smallest sequence of `PutRecords` calls that respects the
//! service limits:
//!
//! - [`validator`]: per-record formatting, compression and size checks;
//!   records that cannot be sent are reported and dropped
//! - [`batcher`]: greedy count- and byte-bounded packing
//! - [`aggregator`]: optional KPL aggregation of many records into one
//! - [`submitter`]: request shaping over a pluggable [`transport::Transport`]
//! - [`writer`]: configuration-driven wiring of all of the above
//!
//! Retries, backoff and persistence belong to the caller. A failed write
//! leaves the chunk untouched so it can be written again from the start.

#![deny(clippy::all)]
#![cfg_attr(not(test), deny(clippy::unwrap_used))]
#![cfg_attr(not(test), deny(clippy::expect_used))]
#![cfg_attr(not(test), deny(clippy::panic))]

pub mod aggregator;
pub mod batcher;
pub mod chunk;
pub mod config;
pub mod constants;
pub mod error;
pub mod format;
pub mod logger;
pub mod record;
pub mod reporter;
pub mod submitter;
pub mod transport;
pub mod validator;
pub mod writer;

pub use chunk::{Chunk, MemoryChunk};
pub use config::Config;
pub use error::{Error, SkipReason};
pub use record::RawRecord;
pub use transport::Transport;
pub use writer::{ChunkWriter, WriteSummary};
