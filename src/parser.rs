//! Record parser
//!
//! Turns raw log text into [`RawLine`] values in file order. The log format:
//!
//! ```text
//! 7/24/25 Th 0830-0040
//! 0030 LO lo
//! 0025 S comm
//! 0020 R br
//! ```
//!
//! Blank lines and lines matching neither shape are skipped silently. Lines
//! that look like a header or an activity but fail to parse are reported as
//! warnings; after a malformed header, the activity lines of that block are
//! dropped until the next valid header.

use chrono::{NaiveDate, NaiveTime};
use tracing::debug;

use crate::config::UnknownCategoryPolicy;
use crate::error::ParseErrorKind;
use crate::types::{ActivityLine, Category, DayHeader, RawLine, Warning};

/// Parser output: recognized lines plus row-level warnings
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ParsedLog {
    pub lines: Vec<RawLine>,
    pub warnings: Vec<Warning>,
}

/// Parser for the plain-text day log
#[derive(Debug, Clone, Copy, Default)]
pub struct RecordParser {
    on_unknown_category: UnknownCategoryPolicy,
}

/// Where the parser is relative to day blocks
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum BlockState {
    BeforeFirstHeader,
    InBlock,
    /// Inside the block of a header that failed to parse
    SkippingBlock,
}

impl RecordParser {
    pub fn new(on_unknown_category: UnknownCategoryPolicy) -> Self {
        Self {
            on_unknown_category,
        }
    }

    /// Parse the full log text
    pub fn parse(&self, text: &str) -> ParsedLog {
        let mut parsed = ParsedLog::default();
        let mut state = BlockState::BeforeFirstHeader;

        for (index, raw) in text.lines().enumerate() {
            let line_no = index + 1;
            let line = raw.trim();
            if line.is_empty() {
                continue;
            }

            let mut tokens = line.split_whitespace();
            let Some(first) = tokens.next() else {
                continue;
            };

            if looks_like_date(first) {
                match parse_day_header(line_no, line) {
                    Ok(header) => {
                        state = BlockState::InBlock;
                        parsed.lines.push(RawLine::DayHeader(header));
                    }
                    Err(kind) => {
                        state = BlockState::SkippingBlock;
                        parsed.warnings.push(Warning::parse(line_no, kind));
                    }
                }
                continue;
            }

            if !looks_like_clock(first) {
                continue;
            }
            let Some(code) = tokens.next() else {
                continue;
            };

            match state {
                BlockState::SkippingBlock => continue,
                BlockState::BeforeFirstHeader => {
                    parsed
                        .warnings
                        .push(Warning::parse(line_no, ParseErrorKind::OrphanActivity));
                    continue;
                }
                BlockState::InBlock => {}
            }

            match self.parse_activity(line_no, line, first, code) {
                Ok((activity, warning)) => {
                    if let Some(warning) = warning {
                        parsed.warnings.push(warning);
                    }
                    if let Some(activity) = activity {
                        parsed.lines.push(RawLine::Activity(activity));
                    }
                }
                Err(kind) => parsed.warnings.push(Warning::parse(line_no, kind)),
            }
        }

        debug!(
            lines = parsed.lines.len(),
            warnings = parsed.warnings.len(),
            "parsed log text"
        );

        parsed
    }

    /// Parse an activity line whose first two tokens are known. Returns the
    /// activity (if kept) and a warning for an unknown code.
    fn parse_activity(
        &self,
        line_no: usize,
        line: &str,
        time_token: &str,
        code: &str,
    ) -> Result<(Option<ActivityLine>, Option<Warning>), ParseErrorKind> {
        let time = parse_clock(time_token)
            .ok_or_else(|| ParseErrorKind::MalformedTime(time_token.to_string()))?;
        let description = description_after(line, 2);

        let (category, warning) = match Category::from_code(code) {
            Some(category) => (category, None),
            None => {
                let warning =
                    Warning::parse(line_no, ParseErrorKind::UnknownCategory(code.to_string()));
                match self.on_unknown_category {
                    UnknownCategoryPolicy::Reject => return Ok((None, Some(warning))),
                    UnknownCategoryPolicy::TagUnknown => (Category::Unknown, Some(warning)),
                }
            }
        };

        let activity = ActivityLine {
            line: line_no,
            time,
            code: code.to_string(),
            category,
            description,
        };

        Ok((Some(activity), warning))
    }
}

/// Parse a day header line: `M/D/YY <weekday> HHMM[-HHMM|-later]`
pub fn parse_day_header(line_no: usize, line: &str) -> Result<DayHeader, ParseErrorKind> {
    let malformed = |reason: String| ParseErrorKind::MalformedHeader(reason);
    let mut tokens = line.split_whitespace();

    let date_token = tokens
        .next()
        .ok_or_else(|| malformed("missing date".to_string()))?;
    let date = parse_date(date_token)
        .ok_or_else(|| malformed(format!("invalid date '{date_token}'")))?;

    let weekday_label = tokens
        .next()
        .ok_or_else(|| malformed("missing weekday".to_string()))?;
    if !weekday_label.chars().all(|c| c.is_ascii_alphabetic()) {
        return Err(malformed(format!("invalid weekday '{weekday_label}'")));
    }

    let span = tokens
        .next()
        .ok_or_else(|| malformed("missing start time".to_string()))?;
    let (start_token, end_token) = match span.split_once('-') {
        Some((start, end)) => (start, end),
        None => (span, ""),
    };

    let start = parse_clock(start_token)
        .ok_or_else(|| malformed(format!("invalid start time '{start_token}'")))?;

    let end = if end_token.is_empty() || end_token.eq_ignore_ascii_case("later") {
        None
    } else {
        Some(
            parse_clock(end_token)
                .ok_or_else(|| malformed(format!("invalid end time '{end_token}'")))?,
        )
    };

    Ok(DayHeader {
        line: line_no,
        date,
        weekday_label: weekday_label.to_string(),
        start,
        end,
    })
}

/// Parse `M/D/YY`. Two-digit years below 50 are 20YY, the rest 19YY; a
/// four-digit year is taken as written.
pub fn parse_date(token: &str) -> Option<NaiveDate> {
    let mut parts = token.split('/');
    let month: u32 = parts.next()?.parse().ok()?;
    let day: u32 = parts.next()?.parse().ok()?;
    let year_token = parts.next()?;
    if parts.next().is_some() {
        return None;
    }

    let year: i32 = year_token.parse().ok()?;
    let year = match year_token.len() {
        1 | 2 if year < 50 => 2000 + year,
        1 | 2 => 1900 + year,
        4 => year,
        _ => return None,
    };

    NaiveDate::from_ymd_opt(year, month, day)
}

/// Parse a four-digit 24-hour clock value (`HHMM`)
pub fn parse_clock(token: &str) -> Option<NaiveTime> {
    if !looks_like_clock(token) {
        return None;
    }
    let hours: u32 = token[..2].parse().ok()?;
    let minutes: u32 = token[2..].parse().ok()?;
    NaiveTime::from_hms_opt(hours, minutes, 0)
}

fn looks_like_clock(token: &str) -> bool {
    token.len() == 4 && token.bytes().all(|b| b.is_ascii_digit())
}

/// Three slash-separated digit groups (`M/D/YY`). Shorter fractions such as
/// `1/2` are free text.
fn looks_like_date(token: &str) -> bool {
    let parts: Vec<&str> = token.split('/').collect();
    parts.len() == 3
        && parts
            .iter()
            .all(|part| !part.is_empty() && part.bytes().all(|b| b.is_ascii_digit()))
}

/// Text after the first `skip` whitespace-separated tokens, with inner
/// spacing preserved
fn description_after(line: &str, skip: usize) -> String {
    let mut rest = line.trim_start();
    for _ in 0..skip {
        rest = rest
            .find(char::is_whitespace)
            .map(|idx| rest[idx..].trim_start())
            .unwrap_or("");
    }
    rest.trim_end().to_string()
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn time(h: u32, m: u32) -> NaiveTime {
        NaiveTime::from_hms_opt(h, m, 0).unwrap()
    }

    fn activities(parsed: &ParsedLog) -> Vec<&ActivityLine> {
        parsed
            .lines
            .iter()
            .filter_map(|l| match l {
                RawLine::Activity(a) => Some(a),
                RawLine::DayHeader(_) => None,
            })
            .collect()
    }

    #[test]
    fn test_parse_header_and_activities() {
        let parsed = RecordParser::default().parse("7/24/25 Th 0830-0040\n0030 LO lo\n0025 S comm\n0020 R br");

        assert!(parsed.warnings.is_empty());
        assert_eq!(parsed.lines.len(), 4);

        match &parsed.lines[0] {
            RawLine::DayHeader(header) => {
                assert_eq!(header.date, NaiveDate::from_ymd_opt(2025, 7, 24).unwrap());
                assert_eq!(header.weekday_label, "Th");
                assert_eq!(header.start, time(8, 30));
                assert_eq!(header.end, Some(time(0, 40)));
                assert_eq!(header.line, 1);
            }
            other => panic!("expected header, got {other:?}"),
        }

        let acts = activities(&parsed);
        assert_eq!(acts[0].time, time(0, 30));
        assert_eq!(acts[0].category, Category::Sleep);
        assert_eq!(acts[0].description, "lo");
        assert_eq!(acts[2].category, Category::Routine);
        assert_eq!(acts[2].line, 4);
    }

    #[test]
    fn test_codes_are_case_insensitive() {
        let parsed = RecordParser::default().parse("1/2/25 Th 0800-2200\n0900 god church\n0800 lo nap");
        let acts = activities(&parsed);
        assert_eq!(acts[0].category, Category::God);
        assert_eq!(acts[0].code, "god");
        assert_eq!(acts[1].category, Category::Sleep);
    }

    #[test]
    fn test_description_keeps_inner_spacing() {
        let parsed = RecordParser::default().parse("1/2/25 Th 0800-2200\n0900  P   hw  STAT  ch 3  ");
        assert_eq!(activities(&parsed)[0].description, "hw  STAT  ch 3");
    }

    #[test]
    fn test_missing_description_is_empty() {
        let parsed = RecordParser::default().parse("1/2/25 Th 0800-2200\n0900 E");
        assert_eq!(activities(&parsed)[0].description, "");
    }

    #[test]
    fn test_open_ended_headers() {
        let later = parse_day_header(1, "3/1/25 Sa 0900-later").unwrap();
        assert_eq!(later.end, None);

        let bare = parse_day_header(1, "3/1/25 Sa 0900").unwrap();
        assert_eq!(bare.end, None);

        let dash = parse_day_header(1, "3/1/25 Sa 0900-").unwrap();
        assert_eq!(dash.end, None);
    }

    #[test]
    fn test_two_digit_year_pivot() {
        assert_eq!(parse_date("1/1/49"), NaiveDate::from_ymd_opt(2049, 1, 1));
        assert_eq!(parse_date("1/1/99"), NaiveDate::from_ymd_opt(1999, 1, 1));
        assert_eq!(parse_date("12/31/2024"), NaiveDate::from_ymd_opt(2024, 12, 31));
        assert_eq!(parse_date("2/30/25"), None);
        assert_eq!(parse_date("1/2"), None);
    }

    #[test]
    fn test_clock_bounds() {
        assert_eq!(parse_clock("2359"), Some(time(23, 59)));
        assert_eq!(parse_clock("0000"), Some(time(0, 0)));
        assert_eq!(parse_clock("2400"), None);
        assert_eq!(parse_clock("1260"), None);
        assert_eq!(parse_clock("930"), None);
    }

    #[test]
    fn test_malformed_header_skips_block() {
        let text = "13/45/25 Th 0800-2200\n0900 P lost\n0800 R lost\n7/24/25 Th 0800-2200\n0800 P kept";
        let parsed = RecordParser::default().parse(text);

        assert_eq!(parsed.warnings.len(), 1);
        assert_eq!(parsed.warnings[0].line, 1);
        assert!(matches!(
            &parsed.warnings[0].kind,
            crate::types::WarningKind::Parse(ParseErrorKind::MalformedHeader(_))
        ));

        let acts = activities(&parsed);
        assert_eq!(acts.len(), 1);
        assert_eq!(acts[0].description, "kept");
    }

    #[test]
    fn test_malformed_header_time() {
        let err = parse_day_header(1, "7/24/25 Th 0800-2561").unwrap_err();
        assert_eq!(
            err,
            ParseErrorKind::MalformedHeader("invalid end time '2561'".to_string())
        );

        let err = parse_day_header(1, "7/24/25 0800-2200").unwrap_err();
        assert_eq!(
            err,
            ParseErrorKind::MalformedHeader("invalid weekday '0800-2200'".to_string())
        );
    }

    #[test]
    fn test_orphan_activity_is_reported() {
        let parsed = RecordParser::default().parse("0900 P early\n7/24/25 Th 0800-2200\n0800 P ok");
        assert_eq!(
            parsed.warnings,
            vec![Warning::parse(1, ParseErrorKind::OrphanActivity)]
        );
        assert_eq!(activities(&parsed).len(), 1);
    }

    #[test]
    fn test_unknown_category_policies() {
        let text = "7/24/25 Th 0800-2200\n0900 X mystery\n0800 P ok";

        let tagged = RecordParser::new(UnknownCategoryPolicy::TagUnknown).parse(text);
        assert_eq!(tagged.warnings.len(), 1);
        let acts = activities(&tagged);
        assert_eq!(acts.len(), 2);
        assert_eq!(acts[0].category, Category::Unknown);
        assert_eq!(acts[0].code, "X");

        let rejected = RecordParser::new(UnknownCategoryPolicy::Reject).parse(text);
        assert_eq!(
            rejected.warnings,
            vec![Warning::parse(
                2,
                ParseErrorKind::UnknownCategory("X".to_string())
            )]
        );
        assert_eq!(activities(&rejected).len(), 1);
    }

    #[test]
    fn test_invalid_activity_time_is_reported() {
        let parsed = RecordParser::default().parse("7/24/25 Th 0800-2200\n2575 P bad\n0800 P ok");
        assert_eq!(
            parsed.warnings,
            vec![Warning::parse(
                2,
                ParseErrorKind::MalformedTime("2575".to_string())
            )]
        );
    }

    #[test]
    fn test_free_text_lines_are_ignored() {
        let text = "notes for the week\n\n7/24/25 Th 0800-2200\n-- summary --\n0800 P ok\n12345 not a time";
        let parsed = RecordParser::default().parse(text);
        assert!(parsed.warnings.is_empty());
        assert_eq!(parsed.lines.len(), 2);
    }

    #[test]
    fn test_fraction_note_inside_block_is_ignored() {
        let text = "3/10/25 M 0800-2200\n1800 E dinner\n1/2 cup rice\n1200 E lunch\n0800 P work";
        let parsed = RecordParser::default().parse(text);

        assert!(parsed.warnings.is_empty());
        let descriptions: Vec<&str> = activities(&parsed)
            .iter()
            .map(|a| a.description.as_str())
            .collect();
        assert_eq!(descriptions, vec!["dinner", "lunch", "work"]);

        assert!(!looks_like_date("1/2"));
        assert!(!looks_like_date("1//25"));
        assert!(looks_like_date("3/10/25"));
    }
}
