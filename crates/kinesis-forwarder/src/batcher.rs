// Copyright 2025-Present Datadog, Inc. https://www.datadoghq.com/
// SPDX-License-Identifier: Apache-2.0

//! Greedy packing of sized items into count- and byte-bounded batches.
//!
//! # Batching Strategy
//!
//! Items are appended to a running batch until the next one would break
//! either limit:
//! 1. **Count limit**: the batch would hold more than `max_count` items
//! 2. **Size limit**: the batch would weigh more than `max_bytes`
//!
//! At that point the running batch is emitted and the item starts a new one.
//! An item that breaks a limit on its own is still emitted as a singleton
//! batch; excluding oversize records is the validator's job, not ours.
//!
//! The same routine serves both stages of aggregated mode:
//!
//! ```text
//!   members ──[per-aggregate limits]──> Batch<member>  ──> AggregateRecord
//!   aggregates ──[per-call limits]────> Batch<aggregate> ──> one PutRecords call
//! ```
//!
//! Boundaries depend only on the input order and the limits.

use crate::record::ByteSize;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BatchLimits {
    pub max_count: usize,
    pub max_bytes: usize,
}

impl BatchLimits {
    pub fn new(max_count: usize, max_bytes: usize) -> Self {
        Self {
            max_count,
            max_bytes,
        }
    }
}

/// An ordered run of items and their accumulated byte size.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Batch<T> {
    items: Vec<T>,
    size: usize,
}

impl<T> Default for Batch<T> {
    fn default() -> Self {
        Self {
            items: Vec::new(),
            size: 0,
        }
    }
}

impl<T> Batch<T> {
    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    pub fn size(&self) -> usize {
        self.size
    }

    pub fn items(&self) -> &[T] {
        &self.items
    }

    pub fn into_items(self) -> Vec<T> {
        self.items
    }

    pub fn iter(&self) -> std::slice::Iter<'_, T> {
        self.items.iter()
    }
}

impl<T: ByteSize> Batch<T> {
    fn push(&mut self, item: T) {
        self.size += item.byte_size();
        self.items.push(item);
    }

    fn would_overflow(&self, item_size: usize, limits: &BatchLimits) -> bool {
        self.items.len() + 1 > limits.max_count || self.size + item_size > limits.max_bytes
    }
}

impl<T> IntoIterator for Batch<T> {
    type Item = T;
    type IntoIter = std::vec::IntoIter<T>;

    fn into_iter(self) -> Self::IntoIter {
        self.items.into_iter()
    }
}

/// Incremental form of the packing routine, for callers that consume
/// batches as they close (e.g. across an `.await`).
#[derive(Debug)]
pub struct Batcher<T> {
    limits: BatchLimits,
    current: Batch<T>,
}

impl<T: ByteSize> Batcher<T> {
    pub fn new(limits: BatchLimits) -> Self {
        Self {
            limits,
            current: Batch::default(),
        }
    }

    pub fn limits(&self) -> BatchLimits {
        self.limits
    }

    /// Adds an item, returning the previous batch if the item closed it.
    pub fn push(&mut self, item: T) -> Option<Batch<T>> {
        let item_size = item.byte_size();
        let closed = if !self.current.is_empty()
            && self.current.would_overflow(item_size, &self.limits)
        {
            Some(std::mem::take(&mut self.current))
        } else {
            None
        };
        self.current.push(item);
        closed
    }

    /// Returns the last, still open batch if it holds anything.
    pub fn finish(&mut self) -> Option<Batch<T>> {
        if self.current.is_empty() {
            None
        } else {
            Some(std::mem::take(&mut self.current))
        }
    }
}

/// Packs `items` under `limits`, handing every closed batch to `emit` in order.
pub fn pack_into<T, I, F>(limits: BatchLimits, items: I, mut emit: F)
where
    T: ByteSize,
    I: IntoIterator<Item = T>,
    F: FnMut(Batch<T>),
{
    let mut batcher = Batcher::new(limits);
    for item in items {
        if let Some(batch) = batcher.push(item) {
            emit(batch);
        }
    }
    if let Some(batch) = batcher.finish() {
        emit(batch);
    }
}

/// Collecting convenience over [`pack_into`].
pub fn pack<T, I>(limits: BatchLimits, items: I) -> Vec<Batch<T>>
where
    T: ByteSize,
    I: IntoIterator<Item = T>,
{
    let mut batches = Vec::new();
    pack_into(limits, items, |batch| batches.push(batch));
    batches
}
