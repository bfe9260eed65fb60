//! Error types for daylog
//!
//! Row-scoped problems (`Parse`, `Data`) are normally collected as
//! [`Warning`](crate::types::Warning) values and only surface as errors in
//! strict mode. `Config` always aborts a build.

use serde::Serialize;
use thiserror::Error;

/// Errors that can occur while building a dataset
#[derive(Debug, Error)]
pub enum IngestError {
    #[error("Parse error on line {line}: {kind}")]
    Parse { line: usize, kind: ParseErrorKind },

    #[error("Data error on line {line}: {kind}")]
    Data { line: usize, kind: DataErrorKind },

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Invalid TOML config: {0}")]
    Toml(#[from] toml::de::Error),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl IngestError {
    /// Short machine-readable code, stable across releases
    pub fn code(&self) -> &'static str {
        match self {
            IngestError::Parse { .. } => "PARSE_ERROR",
            IngestError::Data { .. } => "DATA_ERROR",
            IngestError::Config(_) => "CONFIG_ERROR",
            IngestError::Toml(_) => "CONFIG_ERROR",
            IngestError::Io(_) => "IO_ERROR",
        }
    }
}

/// Line-level parse failures
#[derive(Debug, Clone, PartialEq, Eq, Error, Serialize)]
#[serde(tag = "kind", content = "detail", rename_all = "snake_case")]
pub enum ParseErrorKind {
    #[error("malformed header ({0})")]
    MalformedHeader(String),

    #[error("unknown category '{0}'")]
    UnknownCategory(String),

    #[error("malformed time '{0}'")]
    MalformedTime(String),

    #[error("activity line before any day header")]
    OrphanActivity,
}

/// Inconsistencies found while resolving durations
#[derive(Debug, Clone, PartialEq, Eq, Error, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum DataErrorKind {
    #[error("time travel: interval {start} -> {end} runs backwards")]
    TimeTravel { start: String, end: String },
}
