//! Category normalization
//!
//! This module maps category codes to canonical categories and human labels,
//! and gathers the parsed lines into day blocks.
//! - Fixed code table with optional label overrides
//! - Table completeness checked once, at construction
//! - Activity lines attached to the header above them

use std::collections::BTreeMap;

use tracing::debug;

use crate::config::PipelineConfig;
use crate::error::IngestError;
use crate::types::{Category, DayBlock, LabeledActivity, RawLine};

/// The canonical code → label table
pub const CATEGORY_TABLE: [(&str, &str); 8] = [
    ("P", "Productive"),
    ("R", "Routine"),
    ("E", "Eat"),
    ("S", "Social"),
    ("W", "Workout"),
    ("F", "Fun"),
    ("GOD", "God"),
    ("LO", "Sleep"),
];

const UNKNOWN_LABEL: &str = "Unknown";

/// Normalizer for mapping codes to labeled categories
#[derive(Debug, Clone)]
pub struct CategoryNormalizer {
    labels: BTreeMap<Category, String>,
}

impl CategoryNormalizer {
    /// Normalizer over the built-in table
    pub fn new() -> Result<Self, IngestError> {
        Self::from_table(&CATEGORY_TABLE, &BTreeMap::new())
    }

    /// Normalizer over the built-in table with the config's label overrides
    pub fn from_config(config: &PipelineConfig) -> Result<Self, IngestError> {
        Self::from_table(&CATEGORY_TABLE, &config.category_labels)
    }

    /// Build from an explicit table. Every known category must appear exactly
    /// once; overrides may only name known codes.
    pub fn from_table(
        table: &[(&str, &str)],
        overrides: &BTreeMap<String, String>,
    ) -> Result<Self, IngestError> {
        let mut labels = BTreeMap::new();

        for (code, label) in table {
            let category = Category::from_code(code).ok_or_else(|| {
                IngestError::Config(format!(
                    "incomplete category table: unexpected code '{code}'"
                ))
            })?;
            if label.trim().is_empty() {
                return Err(IngestError::Config(format!(
                    "incomplete category table: empty label for '{code}'"
                )));
            }
            if labels.insert(category, label.to_string()).is_some() {
                return Err(IngestError::Config(format!(
                    "incomplete category table: duplicate code '{code}'"
                )));
            }
        }

        if let Some(missing) = Category::KNOWN.iter().find(|c| !labels.contains_key(*c)) {
            return Err(IngestError::Config(format!(
                "incomplete category table: missing code '{}'",
                missing.code()
            )));
        }

        for (code, label) in overrides {
            let category = Category::from_code(code).ok_or_else(|| {
                IngestError::Config(format!(
                    "incomplete category table: label override for unknown code '{code}'"
                ))
            })?;
            if label.trim().is_empty() {
                return Err(IngestError::Config(format!(
                    "incomplete category table: empty label override for '{code}'"
                )));
            }
            labels.insert(category, label.clone());
        }

        Ok(Self { labels })
    }

    /// Human label for a category
    pub fn label(&self, category: Category) -> &str {
        self.labels
            .get(&category)
            .map(String::as_str)
            .unwrap_or(UNKNOWN_LABEL)
    }

    /// `code → (canonical category, label)`
    pub fn lookup(&self, code: &str) -> Option<(Category, &str)> {
        Category::from_code(code).map(|category| (category, self.label(category)))
    }

    /// Label every activity and attach it to the header above it. Activity
    /// lines keep their file order inside each block.
    pub fn normalize(&self, lines: Vec<RawLine>) -> Vec<DayBlock> {
        let mut blocks: Vec<DayBlock> = Vec::new();

        for line in lines {
            match line {
                RawLine::DayHeader(header) => blocks.push(DayBlock {
                    header,
                    activities: Vec::new(),
                }),
                RawLine::Activity(activity) => {
                    // The parser never emits an activity before a header.
                    let Some(block) = blocks.last_mut() else {
                        continue;
                    };
                    block.activities.push(LabeledActivity {
                        line: activity.line,
                        start_time: activity.time,
                        category: activity.category,
                        category_label: self.label(activity.category).to_string(),
                        description: activity.description,
                    });
                }
            }
        }

        debug!(blocks = blocks.len(), "normalized day blocks");

        blocks
    }
}
