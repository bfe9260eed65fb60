//! Week-pair grouping
//!
//! This module partitions the distinct dates of a log into ordered groups of
//! up to `group_size` dates for two-week trend comparison. A day-to-day gap
//! larger than the threshold always closes the current group; a short final
//! group is kept as a partial group.

use std::collections::BTreeSet;

use chrono::NaiveDate;
use tracing::trace;

use crate::config::{PipelineConfig, DEFAULT_GAP_THRESHOLD_DAYS, DEFAULT_GROUP_SIZE};
use crate::error::IngestError;
use crate::types::WeekPairGroup;

/// Grouper for consecutive date spans
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SpanGrouper {
    gap_threshold_days: i64,
    group_size: usize,
}

impl Default for SpanGrouper {
    fn default() -> Self {
        Self {
            gap_threshold_days: DEFAULT_GAP_THRESHOLD_DAYS,
            group_size: DEFAULT_GROUP_SIZE,
        }
    }
}

impl SpanGrouper {
    /// Create a grouper; both limits must be at least 1
    pub fn new(gap_threshold_days: i64, group_size: usize) -> Result<Self, IngestError> {
        if gap_threshold_days < 1 {
            return Err(IngestError::Config(format!(
                "invalid threshold: gap_threshold_days must be at least 1, got {gap_threshold_days}"
            )));
        }
        if group_size == 0 {
            return Err(IngestError::Config(
                "invalid group size: group_size must be at least 1".to_string(),
            ));
        }
        Ok(Self {
            gap_threshold_days,
            group_size,
        })
    }

    pub fn from_config(config: &PipelineConfig) -> Result<Self, IngestError> {
        Self::new(config.gap_threshold_days, config.group_size)
    }

    /// Partition dates (any order, duplicates allowed) into groups ordered by
    /// start date
    pub fn group(&self, dates: impl IntoIterator<Item = NaiveDate>) -> Vec<WeekPairGroup> {
        let dates: BTreeSet<NaiveDate> = dates.into_iter().collect();

        let mut groups: Vec<WeekPairGroup> = Vec::new();
        let mut current: Vec<NaiveDate> = Vec::with_capacity(self.group_size);

        for date in dates {
            if let Some(previous) = current.last() {
                let gap = (date - *previous).num_days();
                if gap > self.gap_threshold_days || current.len() >= self.group_size {
                    trace!(%date, gap, size = current.len(), "closing group");
                    close_group(&mut groups, &mut current);
                }
            }
            current.push(date);
        }
        close_group(&mut groups, &mut current);

        groups
    }
}

fn close_group(groups: &mut Vec<WeekPairGroup>, current: &mut Vec<NaiveDate>) {
    let (Some(&start_date), Some(&end_date)) = (current.first(), current.last()) else {
        return;
    };
    groups.push(WeekPairGroup {
        group_index: groups.len(),
        start_date,
        end_date,
        member_dates: std::mem::take(current),
    });
}
