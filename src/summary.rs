//! Reporting aggregates
//!
//! Read-only views over a finished record table, shaped for charts: category
//! totals, per-day stacks, per-description breakdowns, keyword tallies and
//! weekday averages.

use std::collections::BTreeMap;

use chrono::{NaiveDate, Weekday};
use serde::Serialize;

use crate::config::TallyRule;
use crate::normalizer::CategoryNormalizer;
use crate::types::{ActivityRecord, Category};

/// Totals for one category
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CategorySummary {
    pub category: Category,
    pub label: String,
    pub total_hours: f64,
    pub count: usize,
    pub mean_hours: f64,
    pub median_hours: f64,
}

impl CategorySummary {
    /// One row per known category (zeros when absent), plus a row for
    /// `UNKNOWN` when any record carries it
    pub fn from_records<'a>(
        records: impl IntoIterator<Item = &'a ActivityRecord>,
        normalizer: &CategoryNormalizer,
    ) -> Vec<CategorySummary> {
        let mut durations: BTreeMap<Category, Vec<f64>> = BTreeMap::new();
        for record in records {
            durations
                .entry(record.category_code)
                .or_default()
                .push(record.duration_hours);
        }

        let mut categories = Category::KNOWN.to_vec();
        if durations.contains_key(&Category::Unknown) {
            categories.push(Category::Unknown);
        }

        categories
            .into_iter()
            .map(|category| {
                let mut hours = durations.remove(&category).unwrap_or_default();
                let total_hours: f64 = hours.iter().sum();
                let count = hours.len();
                let mean_hours = if count > 0 {
                    total_hours / count as f64
                } else {
                    0.0
                };
                CategorySummary {
                    category,
                    label: normalizer.label(category).to_string(),
                    total_hours,
                    count,
                    mean_hours,
                    median_hours: median(&mut hours),
                }
            })
            .collect()
    }
}

/// Hours for one (date, category) cell of a stacked daily chart
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DailyCategoryHours {
    pub date: NaiveDate,
    pub category: Category,
    pub hours: f64,
}

/// Sum hours per date and category, ordered by date then category
pub fn daily_category_hours<'a>(
    records: impl IntoIterator<Item = &'a ActivityRecord>,
) -> Vec<DailyCategoryHours> {
    let mut cells: BTreeMap<(NaiveDate, Category), f64> = BTreeMap::new();
    for record in records {
        *cells.entry((record.date, record.category_code)).or_insert(0.0) += record.duration_hours;
    }

    cells
        .into_iter()
        .map(|((date, category), hours)| DailyCategoryHours {
            date,
            category,
            hours,
        })
        .collect()
}

/// Hours and count for one description within a category
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ActivityBreakdown {
    pub description: String,
    pub total_hours: f64,
    pub count: usize,
}

/// Per-description totals for one category, largest first
pub fn activity_breakdown<'a>(
    records: impl IntoIterator<Item = &'a ActivityRecord>,
    category: Category,
) -> Vec<ActivityBreakdown> {
    let mut by_description: BTreeMap<&str, (f64, usize)> = BTreeMap::new();
    for record in records.into_iter().filter(|r| r.category_code == category) {
        let entry = by_description
            .entry(record.description.as_str())
            .or_insert((0.0, 0));
        entry.0 += record.duration_hours;
        entry.1 += 1;
    }

    let mut rows: Vec<ActivityBreakdown> = by_description
        .into_iter()
        .map(|(description, (total_hours, count))| ActivityBreakdown {
            description: description.to_string(),
            total_hours,
            count,
        })
        .collect();

    // Ties stay in description order.
    rows.sort_by(|a, b| b.total_hours.total_cmp(&a.total_hours));
    rows
}

/// Hours matched by one tally rule
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TallyTotal {
    pub name: String,
    pub hours: f64,
}

/// Sum hours per tally rule; rules matching nothing are dropped
pub fn tally(records: &[ActivityRecord], rules: &[TallyRule]) -> Vec<TallyTotal> {
    rules
        .iter()
        .filter_map(|rule| {
            let pattern = rule.pattern.to_lowercase();
            let category = rule.category.as_deref().and_then(Category::from_code);
            let hours: f64 = records
                .iter()
                .filter(|r| category.map_or(true, |c| r.category_code == c))
                .filter(|r| r.description.to_lowercase().contains(&pattern))
                .map(|r| r.duration_hours)
                .sum();

            (hours > 0.0).then(|| TallyTotal {
                name: rule.name.clone(),
                hours,
            })
        })
        .collect()
}

/// Mean minutes of matching records for one weekday
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct WeekdayAverage {
    pub weekday: Weekday,
    pub average_minutes: f64,
    pub count: usize,
}

/// Mean duration in minutes per weekday, Monday first, of records in
/// `category` whose description contains `keyword`. Weekdays without a match
/// are omitted.
pub fn weekday_average_minutes(
    records: &[ActivityRecord],
    category: Category,
    keyword: &str,
) -> Vec<WeekdayAverage> {
    let keyword = keyword.to_lowercase();
    let mut sums: BTreeMap<u32, (Weekday, f64, usize)> = BTreeMap::new();

    for record in records
        .iter()
        .filter(|r| r.category_code == category)
        .filter(|r| r.description.to_lowercase().contains(&keyword))
    {
        let entry = sums
            .entry(record.weekday.num_days_from_monday())
            .or_insert((record.weekday, 0.0, 0));
        entry.1 += record.duration_minutes();
        entry.2 += 1;
    }

    sums.into_values()
        .map(|(weekday, minutes, count)| WeekdayAverage {
            weekday,
            average_minutes: minutes / count as f64,
            count,
        })
        .collect()
}

fn median(values: &mut [f64]) -> f64 {
    if values.is_empty() {
        return 0.0;
    }
    values.sort_by(f64::total_cmp);
    let mid = values.len() / 2;
    if values.len() % 2 == 0 {
        (values[mid - 1] + values[mid]) / 2.0
    } else {
        values[mid]
    }
}
