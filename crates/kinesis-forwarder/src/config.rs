// Copyright 2025-Present Datadog, Inc. https://www.datadoghq.com/
// SPDX-License-Identifier: Apache-2.0

use std::env;
use std::str::FromStr;

use serde::Deserialize;

use crate::batcher::BatchLimits;
use crate::constants;
use crate::error::Error;

/// Post-format compression applied to each record.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Compression {
    #[default]
    None,
    Deflate,
    Zstd,
}

impl FromStr for Compression {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "" | "none" => Ok(Self::None),
            "deflate" | "zlib" => Ok(Self::Deflate),
            "zstd" => Ok(Self::Zstd),
            other => Err(Error::InvalidConfig(format!(
                "Invalid compression '{other}'. Must be one of: none, deflate, zstd"
            ))),
        }
    }
}

/// Record formatter selected for formatted mode.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FormatType {
    #[default]
    Json,
    SingleValue,
}

impl FromStr for FormatType {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "json" => Ok(Self::Json),
            "single_value" => Ok(Self::SingleValue),
            other => Err(Error::InvalidConfig(format!(
                "Invalid format '{other}'. Must be one of: json, single_value"
            ))),
        }
    }
}

/// Representation of the injected event time.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TimeType {
    /// RFC 3339 with millisecond precision.
    #[default]
    String,
    /// Integer seconds since the epoch.
    Unixtime,
    /// Fractional seconds since the epoch.
    Float,
}

impl FromStr for TimeType {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "string" => Ok(Self::String),
            "unixtime" => Ok(Self::Unixtime),
            "float" => Ok(Self::Float),
            other => Err(Error::InvalidConfig(format!(
                "Invalid time type '{other}'. Must be one of: string, unixtime, float"
            ))),
        }
    }
}

/// Configuration recognized by the forwarder.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Target stream
    pub stream_name: String,
    /// When set, only this field of each record is sent (direct-key mode)
    pub data_key: Option<String>,
    /// Truncation length of per-record skip diagnostics, 0 disables it
    pub log_truncate_max_size: usize,
    pub compression: Compression,
    pub compression_level: Option<i32>,
    /// Strip one trailing newline from formatted records
    pub chomp_record: bool,
    pub format: FormatType,
    /// Field read by the single_value formatter
    pub message_key: String,
    pub add_newline: bool,
    pub inject_tag_key: Option<String>,
    pub inject_time_key: Option<String>,
    pub inject_time_type: TimeType,
    /// Records (or aggregates) per call
    pub max_records_per_call: usize,
    /// Bytes per call
    pub max_request_size: usize,
    /// Bytes per record, partition key included
    pub max_record_size: usize,
    /// Pack records into KPL aggregates
    pub aggregate: bool,
    pub max_records_per_aggregate: usize,
    /// Otherwise a random key is generated per record or aggregate
    pub fixed_partition_key: Option<String>,
    pub log_level: String,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            stream_name: String::new(),
            data_key: None,
            log_truncate_max_size: constants::DEFAULT_LOG_TRUNCATE_MAX_SIZE,
            compression: Compression::None,
            compression_level: None,
            chomp_record: false,
            format: FormatType::Json,
            message_key: constants::DEFAULT_MESSAGE_KEY.to_string(),
            add_newline: true,
            inject_tag_key: None,
            inject_time_key: None,
            inject_time_type: TimeType::String,
            max_records_per_call: constants::DEFAULT_MAX_RECORDS_PER_CALL,
            max_request_size: constants::DEFAULT_MAX_REQUEST_SIZE,
            max_record_size: constants::DEFAULT_MAX_RECORD_SIZE,
            aggregate: false,
            max_records_per_aggregate: constants::DEFAULT_MAX_RECORDS_PER_AGGREGATE,
            fixed_partition_key: None,
            log_level: "info".to_string(),
        }
    }
}

fn env_string(name: &str) -> Option<String> {
    env::var(name).ok().filter(|v| !v.trim().is_empty())
}

fn env_parse<T: FromStr>(name: &str) -> Result<Option<T>, Error> {
    match env_string(name) {
        None => Ok(None),
        Some(raw) => raw.trim().parse::<T>().map(Some).map_err(|_| {
            Error::InvalidConfig(format!("{name} has a malformed value '{raw}'"))
        }),
    }
}

fn env_bool(name: &str) -> Option<bool> {
    env_string(name).map(|val| val.to_lowercase() == "true")
}

impl Config {
    /// Create configuration from `KINESIS_*` environment variables.
    pub fn from_env() -> Result<Self, Error> {
        let defaults = Self::default();

        let config = Self {
            stream_name: env_string("KINESIS_STREAM_NAME").unwrap_or_default(),
            data_key: env_string("KINESIS_DATA_KEY"),
            log_truncate_max_size: env_parse("KINESIS_LOG_TRUNCATE_MAX_SIZE")?
                .unwrap_or(defaults.log_truncate_max_size),
            compression: env_string("KINESIS_COMPRESSION")
                .map(|val| val.parse())
                .transpose()?
                .unwrap_or_default(),
            compression_level: env_parse("KINESIS_COMPRESSION_LEVEL")?,
            chomp_record: env_bool("KINESIS_CHOMP_RECORD").unwrap_or(defaults.chomp_record),
            format: env_string("KINESIS_FORMAT")
                .map(|val| val.parse())
                .transpose()?
                .unwrap_or_default(),
            message_key: env_string("KINESIS_MESSAGE_KEY").unwrap_or(defaults.message_key),
            add_newline: env_bool("KINESIS_ADD_NEWLINE").unwrap_or(defaults.add_newline),
            inject_tag_key: env_string("KINESIS_INJECT_TAG_KEY"),
            inject_time_key: env_string("KINESIS_INJECT_TIME_KEY"),
            inject_time_type: env_string("KINESIS_INJECT_TIME_TYPE")
                .map(|val| val.parse())
                .transpose()?
                .unwrap_or_default(),
            max_records_per_call: env_parse("KINESIS_MAX_RECORDS_PER_CALL")?
                .unwrap_or(defaults.max_records_per_call),
            max_request_size: env_parse("KINESIS_MAX_REQUEST_SIZE")?
                .unwrap_or(defaults.max_request_size),
            max_record_size: env_parse("KINESIS_MAX_RECORD_SIZE")?
                .unwrap_or(defaults.max_record_size),
            aggregate: env_bool("KINESIS_AGGREGATE").unwrap_or(defaults.aggregate),
            max_records_per_aggregate: env_parse("KINESIS_MAX_RECORDS_PER_AGGREGATE")?
                .unwrap_or(defaults.max_records_per_aggregate),
            fixed_partition_key: env_string("KINESIS_FIXED_PARTITION_KEY"),
            log_level: env_string("KINESIS_LOG_LEVEL")
                .map(|val| val.to_lowercase())
                .unwrap_or(defaults.log_level),
        };

        config.validate()?;
        Ok(config)
    }

    /// Validate the configuration
    pub fn validate(&self) -> Result<(), Error> {
        if self.stream_name.trim().is_empty() {
            return Err(Error::InvalidConfig(
                "stream_name cannot be empty".to_string(),
            ));
        }

        if self.data_key.as_deref().is_some_and(|k| k.is_empty()) {
            return Err(Error::InvalidConfig("data_key cannot be empty".to_string()));
        }

        if self.max_records_per_call == 0
            || self.max_records_per_call > constants::SERVICE_MAX_RECORDS_PER_CALL
        {
            return Err(Error::InvalidConfig(format!(
                "max_records_per_call must be between 1 and {}, got {}",
                constants::SERVICE_MAX_RECORDS_PER_CALL,
                self.max_records_per_call
            )));
        }

        if self.max_request_size == 0 || self.max_request_size > constants::SERVICE_MAX_REQUEST_SIZE
        {
            return Err(Error::InvalidConfig(format!(
                "max_request_size must be between 1 and {}, got {}",
                constants::SERVICE_MAX_REQUEST_SIZE,
                self.max_request_size
            )));
        }

        if self.max_record_size == 0
            || self.max_record_size > constants::SERVICE_MAX_RECORD_SIZE
            || self.max_record_size > self.max_request_size
        {
            return Err(Error::InvalidConfig(format!(
                "max_record_size must be between 1 and min({}, max_request_size), got {}",
                constants::SERVICE_MAX_RECORD_SIZE,
                self.max_record_size
            )));
        }

        if self.aggregate && self.max_records_per_aggregate == 0 {
            return Err(Error::InvalidConfig(
                "max_records_per_aggregate must be greater than 0".to_string(),
            ));
        }

        if let Some(key) = &self.fixed_partition_key {
            if key.is_empty() || key.len() > constants::SERVICE_MAX_PARTITION_KEY_LEN {
                return Err(Error::InvalidConfig(format!(
                    "fixed_partition_key must be 1 to {} bytes long",
                    constants::SERVICE_MAX_PARTITION_KEY_LEN
                )));
            }
        }

        let valid_log_levels = ["trace", "debug", "info", "warn", "error"];
        if !valid_log_levels.contains(&self.log_level.as_str()) {
            return Err(Error::InvalidConfig(format!(
                "Invalid log level '{}'. Must be one of: trace, debug, info, warn, error",
                self.log_level
            )));
        }

        Ok(())
    }

    /// Limits of a single `PutRecords` call.
    pub fn call_limits(&self) -> BatchLimits {
        BatchLimits::new(self.max_records_per_call, self.max_request_size)
    }
}
