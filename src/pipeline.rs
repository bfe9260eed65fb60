//! Pipeline orchestration
//!
//! This module provides the public entry point of daylog. It runs the full
//! pipeline from raw log text to a finished [`Dataset`].

use tracing::{debug, info, instrument, warn};

use crate::config::PipelineConfig;
use crate::durations::DurationResolver;
use crate::error::IngestError;
use crate::features::{FeatureDeriver, FeatureRules};
use crate::grouping::SpanGrouper;
use crate::normalizer::CategoryNormalizer;
use crate::parser::RecordParser;
use crate::types::Dataset;

/// Build a dataset from raw log text.
///
/// Row-level problems are returned in `Dataset::warnings`; with
/// `config.strict` the first of them (in file order) is returned as an error
/// instead. Invalid configuration always fails.
///
/// # Example
/// ```
/// use daylog::{build_dataset, PipelineConfig};
///
/// let text = "7/24/25 Th 0830-0040\n0030 LO lo\n0025 S comm\n0020 R br";
/// let dataset = build_dataset(text, &PipelineConfig::default()).unwrap();
/// assert_eq!(dataset.records.len(), 3);
/// assert!(dataset.warnings.is_empty());
/// ```
pub fn build_dataset(raw_text: &str, config: &PipelineConfig) -> Result<Dataset, IngestError> {
    LogProcessor::new(config.clone())?.build(raw_text)
}

/// Reusable processor holding a validated config.
///
/// `build` takes `&self` and keeps no state between calls, so the same input
/// always yields the same dataset.
#[derive(Debug, Clone)]
pub struct LogProcessor {
    config: PipelineConfig,
    parser: RecordParser,
    normalizer: CategoryNormalizer,
    rules: FeatureRules,
    grouper: SpanGrouper,
}

impl LogProcessor {
    /// Validate the config and prepare every stage
    pub fn new(config: PipelineConfig) -> Result<Self, IngestError> {
        config.validate()?;

        Ok(Self {
            parser: RecordParser::new(config.on_unknown_category),
            normalizer: CategoryNormalizer::from_config(&config)?,
            rules: FeatureRules::from_config(&config),
            grouper: SpanGrouper::from_config(&config)?,
            config,
        })
    }

    pub fn config(&self) -> &PipelineConfig {
        &self.config
    }

    pub fn normalizer(&self) -> &CategoryNormalizer {
        &self.normalizer
    }

    /// Run every stage over the given text.
    ///
    /// Pipeline stages:
    /// 1. RecordParser - Recognize headers and activity lines
    /// 2. CategoryNormalizer - Label categories and form day blocks
    /// 3. DurationResolver - Order chronologically and compute durations
    /// 4. FeatureDeriver - Attach derived metrics and nightly sleep
    /// 5. SpanGrouper - Partition dates into week pairs
    #[instrument(skip_all, fields(bytes = raw_text.len(), strict = self.config.strict))]
    pub fn build(&self, raw_text: &str) -> Result<Dataset, IngestError> {
        // Stage 1: Parse lines
        let parsed = self.parser.parse(raw_text);
        let mut warnings = parsed.warnings;

        // Stage 2: Normalize categories
        let blocks = self.normalizer.normalize(parsed.lines);

        // Stage 3: Resolve durations
        let resolved = DurationResolver::resolve(blocks);
        warnings.extend(resolved.warnings);
        warnings.sort_by_key(|w| w.line);

        if self.config.strict {
            if let Some(first) = warnings.into_iter().next() {
                warn!(line = first.line, "{}", first.message);
                return Err(first.into_error());
            }
            warnings = Vec::new();
        }

        // Stage 4: Derive metrics
        let records = FeatureDeriver::derive(resolved.records, &self.rules);
        let nights = FeatureDeriver::nights(&records, &resolved.spans);

        // Stage 5: Group dates
        let groups = self
            .grouper
            .group(resolved.spans.iter().map(|span| span.date));
        debug!(groups = groups.len(), "grouped dates");

        for warning in &warnings {
            warn!(line = warning.line, "{}", warning.message);
        }
        info!(
            records = records.len(),
            days = resolved.spans.len(),
            warnings = warnings.len(),
            "built dataset"
        );

        Ok(Dataset {
            records,
            day_spans: resolved.spans,
            groups,
            nights,
            warnings,
        })
    }
}
