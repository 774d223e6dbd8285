// Copyright 2025-Present Datadog, Inc. https://www.datadoghq.com/
// SPDX-License-Identifier: Apache-2.0

//! Log line formatting and subscriber installation.
//!
//! Lines look like:
//!
//! ```text
//! KINESIS_FORWARDER | LEVEL | [chunk_id] span{fields}: message key=value
//! ```
//!
//! The `chunk_id` field, when an event carries one, is lifted out of the
//! trailing fields so lines of one chunk write line up when grepped.
//!
//! Embedding applications that install their own subscriber can skip
//! [`init`] entirely; the crate only emits through `tracing` macros.

use std::fmt::{self, Write as _};

use tracing_core::field::{Field, Visit};
use tracing_core::{Dispatch, Event, Subscriber};
use tracing_subscriber::fmt::{
    format::{self, FormatEvent, FormatFields},
    FmtContext, FormattedFields,
};
use tracing_subscriber::registry::LookupSpan;
use tracing_subscriber::EnvFilter;

use crate::error::Error;

pub const LOG_PREFIX: &str = "KINESIS_FORWARDER";

const CHUNK_ID_FIELD: &str = "chunk_id";

/// Splits an event into its chunk id, message and remaining fields.
#[derive(Debug, Default)]
struct EventFields {
    chunk_id: Option<String>,
    message: String,
    rest: String,
}

impl Visit for EventFields {
    fn record_str(&mut self, field: &Field, value: &str) {
        if field.name() == CHUNK_ID_FIELD {
            self.chunk_id = Some(value.to_string());
        } else {
            self.record_debug(field, &value);
        }
    }

    fn record_debug(&mut self, field: &Field, value: &dyn fmt::Debug) {
        match field.name() {
            "message" => self.message = format!("{value:?}"),
            CHUNK_ID_FIELD => self.chunk_id = Some(format!("{value:?}")),
            name => {
                let _ = write!(self.rest, " {name}={value:?}");
            }
        }
    }
}

#[derive(Debug, Clone, Copy)]
pub struct Formatter;

impl<S, N> FormatEvent<S, N> for Formatter
where
    S: Subscriber + for<'a> LookupSpan<'a>,
    N: for<'a> FormatFields<'a> + 'static,
{
    fn format_event(
        &self,
        ctx: &FmtContext<'_, S, N>,
        mut writer: format::Writer<'_>,
        event: &Event<'_>,
    ) -> fmt::Result {
        let mut fields = EventFields::default();
        event.record(&mut fields);

        write!(writer, "{LOG_PREFIX} | {} | ", event.metadata().level())?;
        if let Some(chunk_id) = &fields.chunk_id {
            write!(writer, "[{chunk_id}] ")?;
        }

        for span in ctx.event_scope().into_iter().flat_map(|scope| scope.from_root()) {
            let ext = span.extensions();
            match ext.get::<FormattedFields<N>>() {
                Some(span_fields) if !span_fields.is_empty() => {
                    write!(writer, "{}{{{span_fields}}}: ", span.name())?
                }
                _ => write!(writer, "{}: ", span.name())?,
            }
        }

        writeln!(writer, "{}{}", fields.message, fields.rest)
    }
}

/// Directive string for `log_level`, with noisy transport crates silenced.
pub fn env_filter_directives(log_level: &str) -> String {
    format!("h2=off,hyper=off,rustls=off,{log_level}")
}

/// Installs the global subscriber.
pub fn init(log_level: &str) -> Result<(), Error> {
    let filter = EnvFilter::try_new(env_filter_directives(log_level))
        .map_err(|e| Error::Logger(format!("could not parse log level '{log_level}': {e}")))?;

    let subscriber = tracing_subscriber::fmt::Subscriber::builder()
        .with_env_filter(filter)
        .with_ansi(false)
        .event_format(Formatter)
        .finish();

    tracing_core::dispatcher::set_global_default(Dispatch::new(subscriber))
        .map_err(|e| Error::Logger(e.to_string()))?;

    tracing::debug!("KINESIS | Logging subsystem enabled");
    Ok(())
}
