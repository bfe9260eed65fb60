//! daylog - Ingestion pipeline for a hand-written daily activity log
//!
//! daylog turns a reverse-chronological plain-text day log into an
//! analysis-ready table of categorized activity intervals through a
//! deterministic pipeline: record parsing → category normalization → duration
//! resolution → metric derivation → week-pair grouping.
//!
//! ## Modules
//!
//! - **Pipeline**: [`build_dataset`] and [`LogProcessor`], the single entry point
//! - **Stages**: [`parser`], [`normalizer`], [`durations`], [`features`], [`grouping`]
//! - **Reporting**: [`summary`] aggregates over a finished dataset

pub mod config;
pub mod durations;
pub mod error;
pub mod features;
pub mod grouping;
pub mod normalizer;
pub mod parser;
pub mod pipeline;
pub mod summary;
pub mod types;

pub use config::{PipelineConfig, TallyRule, UnknownCategoryPolicy};
pub use error::{DataErrorKind, IngestError, ParseErrorKind};
pub use pipeline::{build_dataset, LogProcessor};
pub use types::{
    ActivityRecord, Category, Dataset, DaySpan, DerivedMetrics, NightSummary, Warning,
    WarningKind, WeekPairGroup,
};

/// daylog version
pub const DAYLOG_VERSION: &str = env!("CARGO_PKG_VERSION");
