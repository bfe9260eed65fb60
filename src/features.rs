//! Feature derivation
//!
//! This module derives supplementary metrics from resolved records:
//! - Sleep hours from LO records
//! - Walking distance and calories from description keywords
//! - Multitask overlay (communication and notes while walking)
//! - Per-night sleep totals and overnight gaps
//!
//! Derived values live in their own field and never change a record's
//! category or duration.

use std::collections::BTreeMap;

use chrono::{Duration, NaiveDate};
use tracing::debug;

use crate::config::PipelineConfig;
use crate::types::{hours_between, ActivityRecord, DaySpan, DerivedMetrics, NightSummary};

/// Rates and keywords used by the derivation rules
#[derive(Debug, Clone, PartialEq)]
pub struct FeatureRules {
    walking_keywords: Vec<String>,
    walking_speed_mph: f64,
    walking_calories_per_hour: f64,
    communication_fraction: f64,
    notes_fraction: f64,
}

impl FeatureRules {
    pub fn from_config(config: &PipelineConfig) -> Self {
        Self {
            walking_keywords: config
                .walking_keywords
                .iter()
                .map(|k| k.to_lowercase())
                .collect(),
            walking_speed_mph: config.walking_speed_mph,
            walking_calories_per_hour: config.walking_calories_per_hour,
            communication_fraction: config.multitask_communication_fraction,
            notes_fraction: config.multitask_notes_fraction,
        }
    }

    /// Whether a description names a walking activity
    pub fn is_walking(&self, description: &str) -> bool {
        let description = description.to_lowercase();
        self.walking_keywords
            .iter()
            .any(|keyword| description.contains(keyword.as_str()))
    }
}

impl Default for FeatureRules {
    fn default() -> Self {
        Self::from_config(&PipelineConfig::default())
    }
}

/// Feature deriver for computing derived metrics
pub struct FeatureDeriver;

impl FeatureDeriver {
    /// Attach derived metrics to every record a rule applies to
    pub fn derive(records: Vec<ActivityRecord>, rules: &FeatureRules) -> Vec<ActivityRecord> {
        let records: Vec<ActivityRecord> = records
            .into_iter()
            .map(|mut record| {
                record.metrics = compute_metrics(&record, rules);
                record
            })
            .collect();

        debug!(
            with_metrics = records.iter().filter(|r| r.metrics.is_some()).count(),
            "derived metrics"
        );
        records
    }

    /// Sleep figures per day span date, ascending
    pub fn nights(records: &[ActivityRecord], spans: &[DaySpan]) -> Vec<NightSummary> {
        let mut logged: BTreeMap<NaiveDate, f64> = spans.iter().map(|s| (s.date, 0.0)).collect();
        for record in records.iter().filter(|r| r.category_code.is_sleep()) {
            *logged.entry(record.date).or_insert(0.0) += record.duration_hours;
        }

        logged
            .into_iter()
            .map(|(date, logged_sleep_hours)| NightSummary {
                date,
                logged_sleep_hours,
                overnight_gap_hours: overnight_gap(spans, date),
            })
            .collect()
    }
}

fn compute_metrics(record: &ActivityRecord, rules: &FeatureRules) -> Option<DerivedMetrics> {
    let is_sleep = record.category_code.is_sleep();
    let is_walking = rules.is_walking(&record.description);

    if !is_sleep && !is_walking {
        return None;
    }

    let hours = record.duration_hours;
    let mut metrics = DerivedMetrics::default();

    if is_sleep {
        metrics.sleep_hours = hours;
    }

    if is_walking {
        metrics.walking_distance = hours * rules.walking_speed_mph;
        metrics.calories_burned = hours * rules.walking_calories_per_hour;
        metrics.multitask_communication_hours = hours * rules.communication_fraction;
        metrics.multitask_notes_hours = hours * rules.notes_fraction;
    }

    Some(metrics)
}

/// Hours between the latest end of `date` and the earliest start of the
/// following calendar day. `None` when either side is missing or open.
fn overnight_gap(spans: &[DaySpan], date: NaiveDate) -> Option<f64> {
    let next_date = date + Duration::days(1);

    let end = spans
        .iter()
        .filter(|s| s.date == date)
        .map(|s| s.nominal_end)
        .collect::<Option<Vec<_>>>()?
        .into_iter()
        .max()?;
    let next_start = spans
        .iter()
        .filter(|s| s.date == next_date)
        .map(|s| s.nominal_start)
        .min()?;

    let gap = hours_between(end, next_start);
    (gap >= 0.0).then_some(gap)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::Category;
    use chrono::{Datelike, NaiveTime};
    use pretty_assertions::assert_eq;

    fn make_record(category: Category, description: &str, hours: f64) -> ActivityRecord {
        let date = NaiveDate::from_ymd_opt(2025, 3, 10).unwrap();
        let start_time = NaiveTime::from_hms_opt(9, 0, 0).unwrap();
        ActivityRecord {
            date,
            weekday: date.weekday(),
            start_time,
            started_at: date.and_time(start_time),
            category_code: category,
            category_label: category.code().to_string(),
            description: description.to_string(),
            duration_hours: hours,
            day_span_id: 0,
            line: 1,
            metrics: None,
        }
    }

    fn make_span(day: u32, start: (u32, u32), end: Option<(u32, u32, u32)>) -> DaySpan {
        let date = NaiveDate::from_ymd_opt(2025, 3, day).unwrap();
        DaySpan {
            id: 0,
            date,
            weekday_label: "M".to_string(),
            nominal_start: date.and_hms_opt(start.0, start.1, 0).unwrap(),
            nominal_end: end.map(|(d, h, m)| {
                NaiveDate::from_ymd_opt(2025, 3, d)
                    .unwrap()
                    .and_hms_opt(h, m, 0)
                    .unwrap()
            }),
            untracked_hours: 0.0,
            line: 1,
        }
    }

    #[test]
    fn test_multitask_overlay_leaves_record_unchanged() {
        let records = vec![make_record(Category::Routine, "walk to campus", 1.0)];
        let derived = FeatureDeriver::derive(records, &FeatureRules::default());

        let record = &derived[0];
        let metrics = record.metrics.as_ref().unwrap();
        assert_eq!(metrics.multitask_communication_hours, 0.33);
        assert_eq!(metrics.multitask_notes_hours, 0.25);
        assert_eq!(record.duration_hours, 1.0);
        assert_eq!(record.category_code, Category::Routine);
    }

    #[test]
    fn test_walking_distance_and_calories_follow_config() {
        let config = PipelineConfig {
            walking_speed_mph: 4.0,
            walking_calories_per_hour: 300.0,
            walking_keywords: vec!["Hike".to_string()],
            ..Default::default()
        };
        let rules = FeatureRules::from_config(&config);
        let derived = FeatureDeriver::derive(
            vec![
                make_record(Category::Workout, "HIKE up the ridge", 1.5),
                make_record(Category::Workout, "walk", 1.0),
            ],
            &rules,
        );

        let metrics = derived[0].metrics.as_ref().unwrap();
        assert!((metrics.walking_distance - 6.0).abs() < 1e-9);
        assert!((metrics.calories_burned - 450.0).abs() < 1e-9);
        assert_eq!(derived[1].metrics, None);
    }

    #[test]
    fn test_sleep_metrics() {
        let derived = FeatureDeriver::derive(
            vec![
                make_record(Category::Sleep, "nap", 0.5),
                make_record(Category::Productive, "essay", 2.0),
            ],
            &FeatureRules::default(),
        );

        let metrics = derived[0].metrics.as_ref().unwrap();
        assert_eq!(metrics.sleep_hours, 0.5);
        assert_eq!(metrics.walking_distance, 0.0);
        assert_eq!(derived[1].metrics, None);
    }

    #[test]
    fn test_nights_sum_sleep_fragments() {
        let records = vec![
            make_record(Category::Sleep, "nap", 0.5),
            make_record(Category::Fun, "movie", 2.0),
            make_record(Category::Sleep, "bed", 1.25),
        ];
        let spans = vec![make_span(10, (8, 0), Some((11, 0, 30)))];

        let nights = FeatureDeriver::nights(&records, &spans);
        assert_eq!(nights.len(), 1);
        assert_eq!(nights[0].logged_sleep_hours, 1.75);
        assert_eq!(nights[0].overnight_gap_hours, None);
    }

    #[test]
    fn test_overnight_gap_between_consecutive_days() {
        let spans = vec![
            make_span(10, (8, 0), Some((11, 0, 30))),
            make_span(11, (7, 30), Some((11, 23, 0))),
            make_span(13, (9, 0), None),
            make_span(14, (8, 0), Some((14, 22, 0))),
        ];

        let nights = FeatureDeriver::nights(&[], &spans);
        let gaps: Vec<Option<f64>> = nights.iter().map(|n| n.overnight_gap_hours).collect();
        // 3/11 has no next day, 3/13 is open.
        assert_eq!(gaps, vec![Some(7.0), None, None, None]);
        assert!(nights.iter().all(|n| n.logged_sleep_hours == 0.0));
    }
}
