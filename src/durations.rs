//! Duration resolution
//!
//! Day blocks arrive in file order (most recent day first, latest activity
//! first). This module walks them chronologically so that each record ends
//! where the next one starts, and the last record of a day ends at the
//! header's end time.
//!
//! Midnight handling: a header whose end clock is earlier than its start ends
//! on the next calendar day. Inside a block, the first time the clock moves
//! backwards the record is placed on the next calendar day, as long as that
//! does not pass the day's end. Any other backwards step stays where it is and
//! shows up as a negative duration, which is reported as time travel.

use chrono::{Datelike, Duration, NaiveDateTime};
use tracing::debug;

use crate::error::DataErrorKind;
use crate::types::{hours_between, ActivityRecord, DayBlock, DaySpan, LabeledActivity, Warning};

/// Records and spans with durations filled in, in chronological order
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ResolvedLog {
    pub spans: Vec<DaySpan>,
    pub records: Vec<ActivityRecord>,
    pub warnings: Vec<Warning>,
}

/// Resolver for record durations
pub struct DurationResolver;

impl DurationResolver {
    /// Resolve every block. Blocks are ordered by date (then start time);
    /// span ids index into the returned span list.
    pub fn resolve(mut blocks: Vec<DayBlock>) -> ResolvedLog {
        // File order is newest first; reversing before the stable sort keeps
        // same-date blocks in chronological order.
        blocks.reverse();
        blocks.sort_by_key(|b| (b.header.date, b.header.start));

        let mut resolved = ResolvedLog::default();
        for (id, block) in blocks.into_iter().enumerate() {
            resolve_block(id, block, &mut resolved);
        }

        debug!(
            spans = resolved.spans.len(),
            records = resolved.records.len(),
            anomalies = resolved.warnings.len(),
            "resolved durations"
        );

        resolved
    }
}

fn resolve_block(id: usize, block: DayBlock, out: &mut ResolvedLog) {
    let header = block.header;
    let one_day = Duration::days(1);

    let nominal_start = header.date.and_time(header.start);
    let nominal_end = header.end.map(|end| {
        let at = header.date.and_time(end);
        if end < header.start {
            at + one_day
        } else {
            at
        }
    });

    let placed = place_chronologically(block.activities, nominal_start, nominal_end);

    let untracked_hours = match placed.first() {
        Some((first, at)) => {
            let gap = hours_between(nominal_start, *at);
            if gap < 0.0 {
                out.warnings.push(time_travel(first.line, nominal_start, *at));
            }
            gap.max(0.0)
        }
        None => nominal_end
            .map(|end| hours_between(nominal_start, end).max(0.0))
            .unwrap_or(0.0),
    };

    let ends: Vec<Option<NaiveDateTime>> = placed
        .iter()
        .skip(1)
        .map(|(_, at)| Some(*at))
        .chain(std::iter::once(nominal_end))
        .collect();

    for ((activity, started_at), ended_at) in placed.into_iter().zip(ends) {
        let duration_hours = match ended_at {
            // Open day: the final record has no end yet.
            None => 0.0,
            Some(end) => {
                let hours = hours_between(started_at, end);
                if hours < 0.0 {
                    out.warnings.push(time_travel(activity.line, started_at, end));
                    0.0
                } else {
                    hours
                }
            }
        };

        out.records.push(ActivityRecord {
            date: header.date,
            weekday: header.date.weekday(),
            start_time: activity.start_time,
            started_at,
            category_code: activity.category,
            category_label: activity.category_label,
            description: activity.description,
            duration_hours,
            day_span_id: id,
            line: activity.line,
            metrics: None,
        });
    }

    out.spans.push(DaySpan {
        id,
        date: header.date,
        weekday_label: header.weekday_label,
        nominal_start,
        nominal_end,
        untracked_hours,
        line: header.line,
    });
}

/// Reverse file order and give each activity an absolute start, allowing a
/// single midnight rollover that stays within the day's end.
fn place_chronologically(
    activities: Vec<LabeledActivity>,
    nominal_start: NaiveDateTime,
    nominal_end: Option<NaiveDateTime>,
) -> Vec<(LabeledActivity, NaiveDateTime)> {
    let date = nominal_start.date();
    let one_day = Duration::days(1);
    let mut cursor = nominal_start;
    let mut rolled = false;

    activities
        .into_iter()
        .rev()
        .map(|activity| {
            let same_day = date.and_time(activity.start_time);
            let mut at = if rolled { same_day + one_day } else { same_day };

            if !rolled && at < cursor {
                let next_day = same_day + one_day;
                if nominal_end.map_or(true, |end| next_day <= end) {
                    rolled = true;
                    at = next_day;
                }
            }

            cursor = at;
            (activity, at)
        })
        .collect()
}

fn time_travel(line: usize, start: NaiveDateTime, end: NaiveDateTime) -> Warning {
    Warning::data(
        line,
        DataErrorKind::TimeTravel {
            start: start.format("%Y-%m-%d %H:%M").to_string(),
            end: end.format("%Y-%m-%d %H:%M").to_string(),
        },
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::normalizer::CategoryNormalizer;
    use crate::parser::RecordParser;
    use crate::types::{Category, WarningKind};
    use chrono::{NaiveDate, NaiveTime};
    use pretty_assertions::assert_eq;

    fn resolve(text: &str) -> ResolvedLog {
        let parsed = RecordParser::default().parse(text);
        assert!(parsed.warnings.is_empty(), "unexpected parse warnings");
        let blocks = CategoryNormalizer::new().unwrap().normalize(parsed.lines);
        DurationResolver::resolve(blocks)
    }

    fn assert_hours(actual: f64, expected: f64) {
        assert!(
            (actual - expected).abs() < 1e-9,
            "expected {expected} hours, got {actual}"
        );
    }

    #[test]
    fn test_midnight_rollover_example() {
        let resolved = resolve("7/24/25 Th 0830-0040\n0030 LO lo\n0025 S comm\n0020 R br");

        assert!(resolved.warnings.is_empty());
        let codes: Vec<Category> = resolved.records.iter().map(|r| r.category_code).collect();
        assert_eq!(codes, vec![Category::Routine, Category::Social, Category::Sleep]);

        assert_hours(resolved.records[0].duration_hours, 5.0 / 60.0);
        assert_hours(resolved.records[1].duration_hours, 5.0 / 60.0);
        assert_hours(resolved.records[2].duration_hours, 10.0 / 60.0);

        let next_day = NaiveDate::from_ymd_opt(2025, 7, 25).unwrap();
        assert_eq!(resolved.records[0].started_at.date(), next_day);
        assert_eq!(
            resolved.spans[0].nominal_end,
            Some(next_day.and_hms_opt(0, 40, 0).unwrap())
        );
        // Every record still belongs to the header's day.
        assert!(resolved
            .records
            .iter()
            .all(|r| r.date == NaiveDate::from_ymd_opt(2025, 7, 24).unwrap()));
    }

    #[test]
    fn test_durations_cover_nominal_span() {
        let resolved = resolve(
            "3/10/25 M 0700-0130\n2330 LO bed\n2200 F show\n1800 E dinner\n0900 P work\n0700 R wake",
        );
        assert!(resolved.warnings.is_empty());

        let span = &resolved.spans[0];
        let total: f64 = resolved.records.iter().map(|r| r.duration_hours).sum();
        assert_hours(total + span.untracked_hours, span.span_hours().unwrap());
        assert_hours(total, 18.5);
        assert_hours(resolved.records[4].duration_hours, 2.0);
    }

    #[test]
    fn test_overnight_sleep_is_not_time_travel() {
        let resolved = resolve("3/10/25 M 0800-0600\n2300 LO sleep\n0800 P work");
        assert!(resolved.warnings.is_empty());
        assert_hours(resolved.records[1].duration_hours, 7.0);
    }

    #[test]
    fn test_untracked_morning() {
        let resolved = resolve("3/10/25 M 0700-2200\n2000 F games\n0900 P work");
        assert_hours(resolved.spans[0].untracked_hours, 2.0);
        assert_hours(resolved.records[0].duration_hours, 11.0);
        assert_hours(resolved.records[1].duration_hours, 2.0);
    }

    #[test]
    fn test_time_travel_is_reported_not_clamped_silently() {
        // Chronological order 0800 -> 1200 -> 1100 cannot fit in one day.
        let resolved = resolve("3/10/25 M 0800-2300\n1100 E lunch\n1200 R errands\n0800 P work");

        assert_eq!(resolved.warnings.len(), 1);
        let warning = &resolved.warnings[0];
        assert_eq!(warning.line, 3);
        assert!(matches!(
            warning.kind,
            WarningKind::Data(DataErrorKind::TimeTravel { .. })
        ));

        assert_hours(resolved.records[0].duration_hours, 4.0);
        assert_hours(resolved.records[1].duration_hours, 0.0);
        assert_hours(resolved.records[2].duration_hours, 12.0);
    }

    #[test]
    fn test_second_rollover_is_time_travel() {
        let resolved = resolve("3/10/25 M 2000-0300\n0030 R late\n0200 F later\n2000 P evening");
        assert_eq!(resolved.warnings.len(), 1);
        assert_eq!(resolved.warnings[0].line, 3);
    }

    #[test]
    fn test_record_before_day_start() {
        let resolved = resolve("3/10/25 M 0800-2200\n0700 R early");
        assert_eq!(resolved.warnings.len(), 1);
        assert_eq!(resolved.warnings[0].line, 2);
        assert_hours(resolved.spans[0].untracked_hours, 0.0);
        assert_hours(resolved.records[0].duration_hours, 15.0);
    }

    #[test]
    fn test_open_day_last_record_has_zero_duration() {
        let resolved = resolve("3/11/25 T 0800-later\n1000 P coding\n0800 R wake");
        assert!(resolved.warnings.is_empty());
        assert_eq!(resolved.spans[0].nominal_end, None);
        assert_hours(resolved.records[0].duration_hours, 2.0);
        assert_hours(resolved.records[1].duration_hours, 0.0);
    }

    #[test]
    fn test_days_are_chronological() {
        let resolved = resolve(
            "3/12/25 W 0800-2200\n0800 P b\n3/10/25 M 0800-2200\n0800 P a\n3/11/25 T 0800-2200\n0800 P c",
        );
        let dates: Vec<u32> = resolved.spans.iter().map(|s| s.date.day()).collect();
        assert_eq!(dates, vec![10, 11, 12]);
        let ids: Vec<usize> = resolved.records.iter().map(|r| r.day_span_id).collect();
        assert_eq!(ids, vec![0, 1, 2]);
        assert_eq!(resolved.records[2].description, "b");
    }

    #[test]
    fn test_empty_day_span() {
        let resolved = resolve("3/10/25 M 0800-2200");
        assert!(resolved.records.is_empty());
        assert_hours(resolved.spans[0].untracked_hours, 14.0);
        assert_eq!(
            resolved.spans[0].nominal_start.time(),
            NaiveTime::from_hms_opt(8, 0, 0).unwrap()
        );
    }
}
