// Copyright 2025-Present Datadog, Inc. https://www.datadoghq.com/
// SPDX-License-Identifier: Apache-2.0

use std::borrow::Cow;

use tracing::warn;

use crate::error::SkipReason;

/// Returns at most the first `max_len` characters of `message`.
///
/// A `max_len` of 0 disables truncation.
pub fn truncate(message: &str, max_len: usize) -> Cow<'_, str> {
    if max_len == 0 {
        return Cow::Borrowed(message);
    }
    match message.char_indices().nth(max_len) {
        Some((end, _)) => Cow::Borrowed(&message[..end]),
        None => Cow::Borrowed(message),
    }
}

/// Logs per-record skip diagnostics without interrupting the chunk write.
///
/// Only skip reasons go through here. Transport errors are logged by the
/// caller at full length.
#[derive(Debug, Clone, Copy)]
pub struct ErrorReporter {
    max_len: usize,
}

impl ErrorReporter {
    pub fn new(max_len: usize) -> Self {
        Self { max_len }
    }

    pub fn max_len(&self) -> usize {
        self.max_len
    }

    pub fn truncate<'a>(&self, message: &'a str) -> Cow<'a, str> {
        truncate(message, self.max_len)
    }

    pub fn report(&self, chunk_id: &str, reason: &SkipReason) {
        let message = reason.to_string();
        warn!(
            chunk_id,
            reason = reason.kind(),
            "KINESIS | Skipping record: {}",
            self.truncate(&message)
        );
    }
}
