// Copyright 2025-Present Datadog, Inc. https://www.datadoghq.com/
// SPDX-License-Identifier: Apache-2.0

//! Durable chunk collaborator.
//!
//! The buffering layer owns persistence; a write attempt only ever reads a
//! chunk front to back, once. A retry opens the chunk again from the start.

use crate::record::RawRecord;

pub type RecordStream<'a> = Box<dyn Iterator<Item = RawRecord> + Send + 'a>;

pub trait Chunk: Send + Sync {
    /// Unique identifier, used for logging only.
    fn id(&self) -> &str;

    /// Opens a forward-only, single-pass stream over the chunk's records.
    fn open(&self) -> RecordStream<'_>;
}

/// A chunk held entirely in memory.
#[derive(Debug, Clone, Default)]
pub struct MemoryChunk {
    id: String,
    records: Vec<RawRecord>,
}

impl MemoryChunk {
    pub fn new(id: impl Into<String>, records: Vec<RawRecord>) -> Self {
        Self {
            id: id.into(),
            records,
        }
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }
}

impl Chunk for MemoryChunk {
    fn id(&self) -> &str {
        &self.id
    }

    fn open(&self) -> RecordStream<'_> {
        Box::new(self.records.iter().cloned())
    }
}
