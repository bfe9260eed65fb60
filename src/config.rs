//! Pipeline configuration
//!
//! All knobs of a build live in one [`PipelineConfig`], passed explicitly into
//! the pipeline so the same input can be run under different policies.
//! Configs can be written as TOML; every field has a default:
//!
//! ```toml
//! strict = false
//! on_unknown_category = "tag_unknown"
//! gap_threshold_days = 30
//! walking_keywords = ["walk", "hike"]
//!
//! [category_labels]
//! GOD = "Faith"
//!
//! [[tallies]]
//! name = "STAT Homework"
//! pattern = "hw STAT"
//! ```

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::Path;

use crate::error::IngestError;
use crate::types::Category;

/// Default maximum day-to-day gap inside one group
pub const DEFAULT_GAP_THRESHOLD_DAYS: i64 = 30;

/// Default number of dates per group (two weeks)
pub const DEFAULT_GROUP_SIZE: usize = 14;

/// What to do with an activity line whose code is not one of the known codes
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum UnknownCategoryPolicy {
    /// Drop the line and record a warning
    Reject,
    /// Keep the line under category `UNKNOWN` and record a warning
    #[default]
    TagUnknown,
}

/// A named description pattern whose matching hours are summed in reports
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct TallyRule {
    pub name: String,
    /// Case-insensitive substring matched against descriptions
    pub pattern: String,
    /// Restrict to one category code
    #[serde(default)]
    pub category: Option<String>,
}

/// Configuration for a dataset build
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct PipelineConfig {
    /// Escalate any row-level warning into a hard failure
    #[serde(default)]
    pub strict: bool,
    #[serde(default)]
    pub on_unknown_category: UnknownCategoryPolicy,
    #[serde(default = "default_gap_threshold_days")]
    pub gap_threshold_days: i64,
    #[serde(default = "default_group_size")]
    pub group_size: usize,
    #[serde(default = "default_walking_keywords")]
    pub walking_keywords: Vec<String>,
    /// Miles per hour of walking
    #[serde(default = "default_walking_speed_mph")]
    pub walking_speed_mph: f64,
    /// Kilocalories per hour of walking
    #[serde(default = "default_walking_calories_per_hour")]
    pub walking_calories_per_hour: f64,
    /// Share of walking time attributed to communication
    #[serde(default = "default_multitask_communication_fraction")]
    pub multitask_communication_fraction: f64,
    /// Share of walking time attributed to note taking
    #[serde(default = "default_multitask_notes_fraction")]
    pub multitask_notes_fraction: f64,
    /// Label overrides keyed by category code
    #[serde(default)]
    pub category_labels: BTreeMap<String, String>,
    #[serde(default)]
    pub tallies: Vec<TallyRule>,
}

fn default_gap_threshold_days() -> i64 {
    DEFAULT_GAP_THRESHOLD_DAYS
}

fn default_group_size() -> usize {
    DEFAULT_GROUP_SIZE
}

fn default_walking_keywords() -> Vec<String> {
    vec!["walk".to_string()]
}

fn default_walking_speed_mph() -> f64 {
    3.0
}

fn default_walking_calories_per_hour() -> f64 {
    250.0
}

fn default_multitask_communication_fraction() -> f64 {
    0.33
}

fn default_multitask_notes_fraction() -> f64 {
    0.25
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            strict: false,
            on_unknown_category: UnknownCategoryPolicy::default(),
            gap_threshold_days: default_gap_threshold_days(),
            group_size: default_group_size(),
            walking_keywords: default_walking_keywords(),
            walking_speed_mph: default_walking_speed_mph(),
            walking_calories_per_hour: default_walking_calories_per_hour(),
            multitask_communication_fraction: default_multitask_communication_fraction(),
            multitask_notes_fraction: default_multitask_notes_fraction(),
            category_labels: BTreeMap::new(),
            tallies: Vec::new(),
        }
    }
}

impl PipelineConfig {
    /// Default config with strict mode enabled
    pub fn strict() -> Self {
        Self {
            strict: true,
            ..Self::default()
        }
    }

    /// Parse and validate a TOML config
    pub fn from_toml_str(toml_str: &str) -> Result<Self, IngestError> {
        let config: PipelineConfig = toml::from_str(toml_str)?;
        config.validate()?;
        Ok(config)
    }

    /// Load and validate a TOML config file
    pub fn load(path: &Path) -> Result<Self, IngestError> {
        let content = std::fs::read_to_string(path)?;
        Self::from_toml_str(&content)
    }

    /// Check that every value is usable. Category label overrides are checked
    /// when the normalizer is built.
    pub fn validate(&self) -> Result<(), IngestError> {
        if self.gap_threshold_days < 1 {
            return Err(IngestError::Config(format!(
                "invalid threshold: gap_threshold_days must be at least 1, got {}",
                self.gap_threshold_days
            )));
        }

        if self.group_size == 0 {
            return Err(IngestError::Config(
                "invalid group size: group_size must be at least 1".to_string(),
            ));
        }

        if self.walking_keywords.iter().any(|k| k.trim().is_empty()) {
            return Err(IngestError::Config(
                "walking_keywords must not contain empty entries".to_string(),
            ));
        }

        check_rate("walking_speed_mph", self.walking_speed_mph)?;
        check_rate("walking_calories_per_hour", self.walking_calories_per_hour)?;
        check_fraction(
            "multitask_communication_fraction",
            self.multitask_communication_fraction,
        )?;
        check_fraction("multitask_notes_fraction", self.multitask_notes_fraction)?;

        for rule in &self.tallies {
            if rule.pattern.trim().is_empty() {
                return Err(IngestError::Config(format!(
                    "tally '{}' has an empty pattern",
                    rule.name
                )));
            }
            if let Some(code) = &rule.category {
                if Category::from_code(code).is_none() {
                    return Err(IngestError::Config(format!(
                        "tally '{}' names unknown category '{}'",
                        rule.name, code
                    )));
                }
            }
        }

        Ok(())
    }
}

fn check_rate(name: &str, value: f64) -> Result<(), IngestError> {
    if !value.is_finite() || value < 0.0 {
        return Err(IngestError::Config(format!(
            "{name} must be a finite non-negative number, got {value}"
        )));
    }
    Ok(())
}

fn check_fraction(name: &str, value: f64) -> Result<(), IngestError> {
    if !(0.0..=1.0).contains(&value) {
        return Err(IngestError::Config(format!(
            "{name} must be within [0, 1], got {value}"
        )));
    }
    Ok(())
}
