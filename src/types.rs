//! Core types for the daylog pipeline
//!
//! This module defines the data structures that flow through each stage of the
//! pipeline: raw log lines, labeled day blocks, resolved activity records,
//! derived metrics and week-pair groupings.

use chrono::{NaiveDate, NaiveDateTime, NaiveTime, Weekday};
use serde::{Deserialize, Serialize};

use crate::error::{DataErrorKind, IngestError, ParseErrorKind};

/// Activity category. The eight known codes form a closed set; `Unknown` only
/// appears when the parser is configured to keep unrecognized codes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum Category {
    #[serde(rename = "P")]
    Productive,
    #[serde(rename = "R")]
    Routine,
    #[serde(rename = "E")]
    Eat,
    #[serde(rename = "S")]
    Social,
    #[serde(rename = "W")]
    Workout,
    #[serde(rename = "F")]
    Fun,
    #[serde(rename = "GOD")]
    God,
    #[serde(rename = "LO")]
    Sleep,
    #[serde(rename = "UNKNOWN")]
    Unknown,
}

impl Category {
    /// Every category a well-formed log may use, in display order
    pub const KNOWN: [Category; 8] = [
        Category::Productive,
        Category::Routine,
        Category::Eat,
        Category::Social,
        Category::Workout,
        Category::Fun,
        Category::God,
        Category::Sleep,
    ];

    pub fn code(&self) -> &'static str {
        match self {
            Category::Productive => "P",
            Category::Routine => "R",
            Category::Eat => "E",
            Category::Social => "S",
            Category::Workout => "W",
            Category::Fun => "F",
            Category::God => "GOD",
            Category::Sleep => "LO",
            Category::Unknown => "UNKNOWN",
        }
    }

    /// Look up a known category by its log code, ignoring case.
    /// `UNKNOWN` is not a log code and never matches.
    pub fn from_code(code: &str) -> Option<Category> {
        Category::KNOWN
            .into_iter()
            .find(|c| c.code().eq_ignore_ascii_case(code))
    }

    pub fn is_sleep(&self) -> bool {
        matches!(self, Category::Sleep)
    }
}

/// A day header: `M/D/YY <weekday> HHMM-HHMM`
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DayHeader {
    /// 1-based line number in the source text
    pub line: usize,
    pub date: NaiveDate,
    /// Weekday label exactly as written (`M`, `Th`, `Sa`, ...)
    pub weekday_label: String,
    pub start: NaiveTime,
    /// `None` when the day is still open (`later` or no end time)
    pub end: Option<NaiveTime>,
}

/// An activity line: `HHMM <CODE> <description>`
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ActivityLine {
    pub line: usize,
    pub time: NaiveTime,
    /// Code as written in the log
    pub code: String,
    pub category: Category,
    pub description: String,
}

/// One recognized physical log line, in file order
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum RawLine {
    DayHeader(DayHeader),
    Activity(ActivityLine),
}

/// An activity line after category normalization
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct LabeledActivity {
    pub line: usize,
    pub start_time: NaiveTime,
    pub category: Category,
    pub category_label: String,
    pub description: String,
}

/// A header together with the activity lines it owns, still in file order
/// (latest activity first)
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DayBlock {
    pub header: DayHeader,
    pub activities: Vec<LabeledActivity>,
}

/// A day header's resolved interval
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DaySpan {
    /// Index into the dataset's span list, ordered by date
    pub id: usize,
    pub date: NaiveDate,
    pub weekday_label: String,
    pub nominal_start: NaiveDateTime,
    /// May fall on the following calendar date; `None` for an open day
    pub nominal_end: Option<NaiveDateTime>,
    /// Time between the nominal start and the first logged activity
    pub untracked_hours: f64,
    pub line: usize,
}

impl DaySpan {
    /// Total nominal span in hours, when the day is closed
    pub fn span_hours(&self) -> Option<f64> {
        self.nominal_end
            .map(|end| hours_between(self.nominal_start, end))
    }
}

/// Heuristic values computed from a record, never parsed
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct DerivedMetrics {
    pub sleep_hours: f64,
    pub walking_distance: f64,
    pub calories_burned: f64,
    pub multitask_communication_hours: f64,
    pub multitask_notes_hours: f64,
}

/// The normalized unit: one row per activity
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ActivityRecord {
    pub date: NaiveDate,
    pub weekday: Weekday,
    pub start_time: NaiveTime,
    /// Absolute start, after midnight rollover
    pub started_at: NaiveDateTime,
    pub category_code: Category,
    pub category_label: String,
    pub description: String,
    pub duration_hours: f64,
    pub day_span_id: usize,
    pub line: usize,
    /// Present only when a derived-metric rule applies
    pub metrics: Option<DerivedMetrics>,
}

impl ActivityRecord {
    pub fn duration_minutes(&self) -> f64 {
        self.duration_hours * 60.0
    }
}

/// A run of up to `group_size` consecutive calendar dates
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct WeekPairGroup {
    pub group_index: usize,
    pub start_date: NaiveDate,
    pub end_date: NaiveDate,
    pub member_dates: Vec<NaiveDate>,
}

impl WeekPairGroup {
    /// Stable UI label: "Weeks 1-2", "Weeks 3-4", ...
    pub fn label(&self) -> String {
        let first = self.group_index * 2 + 1;
        format!("Weeks {}-{}", first, first + 1)
    }

    pub fn contains(&self, date: NaiveDate) -> bool {
        self.member_dates.binary_search(&date).is_ok()
    }

    pub fn len(&self) -> usize {
        self.member_dates.len()
    }

    pub fn is_empty(&self) -> bool {
        self.member_dates.is_empty()
    }
}

/// Per-night sleep figures
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct NightSummary {
    pub date: NaiveDate,
    /// Sum of the day's LO records
    pub logged_sleep_hours: f64,
    /// Gap between this day's end and the next calendar day's start
    pub overnight_gap_hours: Option<f64>,
}

/// Which stage produced a warning
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum WarningKind {
    Parse(ParseErrorKind),
    Data(DataErrorKind),
}

/// A row-level data-quality problem that did not abort the build
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Warning {
    pub line: usize,
    pub kind: WarningKind,
    pub message: String,
}

impl Warning {
    pub fn parse(line: usize, kind: ParseErrorKind) -> Self {
        Self {
            line,
            message: kind.to_string(),
            kind: WarningKind::Parse(kind),
        }
    }

    pub fn data(line: usize, kind: DataErrorKind) -> Self {
        Self {
            line,
            message: kind.to_string(),
            kind: WarningKind::Data(kind),
        }
    }

    /// Escalate into a hard error (strict mode)
    pub fn into_error(self) -> IngestError {
        match self.kind {
            WarningKind::Parse(kind) => IngestError::Parse {
                line: self.line,
                kind,
            },
            WarningKind::Data(kind) => IngestError::Data {
                line: self.line,
                kind,
            },
        }
    }
}

/// Finished pipeline output
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Dataset {
    /// Chronological activity table
    pub records: Vec<ActivityRecord>,
    pub day_spans: Vec<DaySpan>,
    pub groups: Vec<WeekPairGroup>,
    pub nights: Vec<NightSummary>,
    pub warnings: Vec<Warning>,
}

impl Dataset {
    /// The three consumer-facing outputs
    pub fn into_parts(self) -> (Vec<ActivityRecord>, Vec<WeekPairGroup>, Vec<Warning>) {
        (self.records, self.groups, self.warnings)
    }

    /// Records excluding sleep
    pub fn awake_records(&self) -> impl Iterator<Item = &ActivityRecord> {
        self.records.iter().filter(|r| !r.category_code.is_sleep())
    }

    /// Records whose date falls in the given group
    pub fn records_in_group<'a>(
        &'a self,
        group: &'a WeekPairGroup,
    ) -> impl Iterator<Item = &'a ActivityRecord> {
        self.records.iter().filter(move |r| group.contains(r.date))
    }

    /// Group a date belongs to, if any
    pub fn group_for(&self, date: NaiveDate) -> Option<&WeekPairGroup> {
        self.groups.iter().find(|g| g.contains(date))
    }

    pub fn total_sleep_hours(&self, date: NaiveDate) -> f64 {
        self.nights
            .iter()
            .filter(|n| n.date == date)
            .map(|n| n.logged_sleep_hours)
            .sum()
    }
}

/// Signed hours between two instants
pub(crate) fn hours_between(start: NaiveDateTime, end: NaiveDateTime) -> f64 {
    (end - start).num_seconds() as f64 / 3600.0
}
