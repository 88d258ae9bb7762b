//! Calendar description parsing.
//!
//! The `clndr_data` column of the CALENDAR table holds a nested,
//! parenthesised description of a calendar's working time:
//!
//! ```text
//! (0||CalendarData()(
//!   (0||DaysOfWeek()(
//!     (0||1()())
//!     (0||2()((0||0(s|08:00|f|12:00)()) (0||1(s|13:00|f|17:00)())))
//!     ...
//!     (0||7()())))
//!   (0||Exceptions()(
//!     (0||0(d|45292)())
//!     (0||1(d|45293)((0||0(s|08:00|f|12:00)()))))))
//! ```
//!
//! Each day-of-week node (Sunday = 1 .. Saturday = 7) contains zero or more
//! time slots. Each exception node carries an OLE date serial and an
//! optional block of time slots. Parsing never fails: anything without a
//! recognisable structure falls back to a default work week.

use crate::constants::{CONTINUOUS_OPERATIONS_HOURS, day_name};
use chrono::NaiveDate;
use once_cell::sync::Lazy;
use regex::Regex;
use tracing::warn;

static DAYS_SECTION: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?i)DaysOfWeek\s*\(\s*\)\s*\(").expect("valid regex"));

static EXCEPTIONS_SECTION: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?i)Exceptions\s*\(\s*\)\s*\(").expect("valid regex"));

/// `(0||N()(` opening a day-of-week block
static DAY_BLOCK: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"\(\s*\d+\s*\|\|\s*([1-7])\s*\(\s*\)\s*\(").expect("valid regex"));

/// `(s|08:00|f|17:00)` in any tag order
static TIME_SLOT: Lazy<Regex> = Lazy::new(|| {
    Regex::new(
        r"(?i)\(\s*([sf])\s*\|\s*(\d{1,2})\s*:\s*(\d{2})\s*\|\s*([sf])\s*\|\s*(\d{1,2})\s*:\s*(\d{2})\s*\)",
    )
    .expect("valid regex")
});

/// `(d|45292)` date parameter of an exception node
static EXCEPTION_DATE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?i)\(\s*d\s*\|\s*(\d+)\s*\)").expect("valid regex"));

const MINUTES_PER_DAY: u32 = 24 * 60;

/// Kind of a derived calendar entry
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EntryKind {
    Weekday,
    ExceptionWorking,
    Holiday,
}

impl EntryKind {
    pub fn label(&self) -> &'static str {
        match self {
            EntryKind::Weekday => "Weekday",
            EntryKind::ExceptionWorking => "Exception - Working",
            EntryKind::Holiday => "Holiday",
        }
    }
}

/// Working hours for one day of the week or one dated exception
#[derive(Debug, Clone, PartialEq)]
pub struct CalendarEntry {
    pub kind: EntryKind,
    /// Sunday = 1 .. Saturday = 7; `None` for exceptions
    pub day_of_week: Option<u8>,
    /// Exception date; `None` for weekdays
    pub date: Option<NaiveDate>,
    pub hours: f64,
}

impl CalendarEntry {
    fn weekday(day: u8, hours: f64) -> Self {
        Self {
            kind: EntryKind::Weekday,
            day_of_week: Some(day),
            date: None,
            hours,
        }
    }

    fn exception(date: NaiveDate, hours: f64) -> Self {
        let kind = if hours > 0.0 {
            EntryKind::ExceptionWorking
        } else {
            EntryKind::Holiday
        };
        Self {
            kind,
            day_of_week: None,
            date: Some(date),
            hours,
        }
    }

    pub fn day_name(&self) -> &'static str {
        self.day_of_week.map(day_name).unwrap_or("")
    }
}

/// Derive the weekly pattern and exceptions described by `blob`
pub fn parse_calendar(blob: &str, fallback_hours: f64) -> Vec<CalendarEntry> {
    let text = sanitize(blob);
    let mut entries = parse_week(&text, fallback_hours).unwrap_or_else(|| {
        if !text.is_empty() {
            warn!("Calendar description has no day-of-week section, using default week");
        }
        default_week(fallback_hours)
    });
    entries.extend(parse_exceptions(&text));
    entries
}

/// Mon-Fri at `fallback_hours`, or all seven days for continuous operations
pub fn default_week(fallback_hours: f64) -> Vec<CalendarEntry> {
    let continuous = fallback_hours >= CONTINUOUS_OPERATIONS_HOURS;
    (1..=7u8)
        .map(|day| {
            let hours = if continuous || !is_weekend(day) {
                fallback_hours
            } else {
                0.0
            };
            CalendarEntry::weekday(day, hours)
        })
        .collect()
}

/// Convert an OLE Automation date serial (epoch 1899-12-30) to a date.
///
/// Serials from 60 onwards are shifted one day later to step over the
/// phantom 1900-02-29.
pub fn ole_serial_to_date(serial: i64) -> Option<NaiveDate> {
    let epoch = NaiveDate::from_ymd_opt(1899, 12, 30)?;
    let days = if serial >= 60 { serial + 1 } else { serial };
    epoch.checked_add_signed(chrono::Duration::try_days(days)?)
}

fn is_weekend(day: u8) -> bool {
    day == 1 || day == 7
}

/// Replace control and non-printable characters with spaces and collapse
/// whitespace runs
fn sanitize(blob: &str) -> String {
    let cleaned: String = blob
        .chars()
        .map(|c| if c.is_control() { ' ' } else { c })
        .collect();
    cleaned.split_whitespace().collect::<Vec<_>>().join(" ")
}

fn parse_week(text: &str, fallback_hours: f64) -> Option<Vec<CalendarEntry>> {
    let section = DAYS_SECTION.find(text)?;
    let open = section.end() - 1;
    let close = matching_paren(text, open)?;
    let days = &text[open + 1..close];

    let mut hours: [Option<f64>; 7] = [None; 7];
    for captures in DAY_BLOCK.captures_iter(days) {
        let (Some(whole), Some(number)) = (captures.get(0), captures.get(1)) else {
            continue;
        };
        let Ok(day) = number.as_str().parse::<usize>() else {
            continue;
        };
        let slot = &mut hours[day - 1];
        if slot.is_some() {
            continue;
        }
        let block_open = whole.end() - 1;
        if let Some(block_close) = matching_paren(days, block_open) {
            *slot = Some(sum_time_slots(&days[block_open + 1..block_close]));
        }
    }

    Some(
        (1..=7u8)
            .map(|day| {
                let default = if is_weekend(day) { 0.0 } else { fallback_hours };
                CalendarEntry::weekday(day, hours[day as usize - 1].unwrap_or(default))
            })
            .collect(),
    )
}

fn parse_exceptions(text: &str) -> Vec<CalendarEntry> {
    let mut entries = Vec::new();
    for section in EXCEPTIONS_SECTION.find_iter(text) {
        let open = section.end() - 1;
        let Some(close) = matching_paren(text, open) else {
            continue;
        };
        let body = &text[open + 1..close];

        for captures in EXCEPTION_DATE.captures_iter(body) {
            let (Some(whole), Some(serial)) = (captures.get(0), captures.get(1)) else {
                continue;
            };
            let Some(date) = serial
                .as_str()
                .parse::<i64>()
                .ok()
                .and_then(ole_serial_to_date)
            else {
                continue;
            };
            // Shape one: `(d|N)()` with an empty work block, a holiday.
            // Shape two: `(d|N)(...)` with time slots inside the block.
            let hours = work_block(body, whole.end())
                .map(sum_time_slots)
                .unwrap_or(0.0);
            entries.push(CalendarEntry::exception(date, hours));
        }
    }
    entries
}

/// Inner text of the parenthesised block starting at or after `from`
fn work_block(text: &str, from: usize) -> Option<&str> {
    let rest = &text[from..];
    let offset = rest.len() - rest.trim_start().len();
    let open = from + offset;
    if !text[open..].starts_with('(') {
        return None;
    }
    let close = matching_paren(text, open)?;
    Some(&text[open + 1..close])
}

/// Index of the `)` closing the `(` at `open`
fn matching_paren(text: &str, open: usize) -> Option<usize> {
    let mut depth = 0usize;
    for (index, byte) in text.bytes().enumerate().skip(open) {
        match byte {
            b'(' => depth += 1,
            b')' => {
                depth = depth.checked_sub(1)?;
                if depth == 0 {
                    return Some(index);
                }
            }
            _ => {}
        }
    }
    None
}

/// Total hours of every time slot in `block`
fn sum_time_slots(block: &str) -> f64 {
    let minutes: u32 = TIME_SLOT
        .captures_iter(block)
        .filter_map(|c| {
            let first_tag = c.get(1)?.as_str().to_ascii_lowercase();
            let first = clock_minutes(c.get(2)?.as_str(), c.get(3)?.as_str())?;
            let second_tag = c.get(4)?.as_str().to_ascii_lowercase();
            let second = clock_minutes(c.get(5)?.as_str(), c.get(6)?.as_str())?;
            Some(slot_minutes(&first_tag, first, &second_tag, second))
        })
        .sum();
    minutes as f64 / 60.0
}

/// Minutes covered by one slot once its start and end are resolved.
///
/// `s` then `f` is canonical, `f` then `s` is swapped, and identical tags
/// take the earlier clock time as the start.
fn slot_minutes(first_tag: &str, first: u32, second_tag: &str, second: u32) -> u32 {
    let (start, end) = match (first_tag, second_tag) {
        ("s", "f") => (first, second),
        ("f", "s") => (second, first),
        _ => (first.min(second), first.max(second)),
    };
    if end == start {
        0
    } else if end < start {
        MINUTES_PER_DAY - start + end
    } else {
        end - start
    }
}

fn clock_minutes(hours: &str, minutes: &str) -> Option<u32> {
    let hours: u32 = hours.parse().ok()?;
    let minutes: u32 = minutes.parse().ok()?;
    if hours > 24 || minutes > 59 || (hours == 24 && minutes > 0) {
        return None;
    }
    Some(hours * 60 + minutes)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn weekday_hours(entries: &[CalendarEntry]) -> Vec<f64> {
        entries
            .iter()
            .filter(|e| e.kind == EntryKind::Weekday)
            .map(|e| e.hours)
            .collect()
    }

    const STANDARD: &str = "(0||CalendarData()(\n  (0||DaysOfWeek()(\n    (0||1()())\n    (0||2()(\n      (0||0(s|08:00|f|12:00)())\n      (0||1(s|13:00|f|17:00)())))\n    (0||3()(\n      (0||0(s|08:00|f|16:00)())))\n    (0||4()(\n      (0||0(f|17:00|s|08:00)())))\n    (0||5()(\n      (0||0(s|22:00|f|06:00)())))\n    (0||6()(\n      (0||0(s|09:00|s|07:00)())))\n    (0||7()())))\n  (0||VIEW(ShowTotal|Y)())\n  (0||Exceptions()(\n    (0||0(d|45292)())\n    (0||1(d|45293)(\n      (0||0(s|08:00|f|12:00)())))))))";

    #[test]
    fn test_default_week_standard() {
        let entries = parse_calendar("", 8.0);
        assert_eq!(entries.len(), 7);
        assert_eq!(
            weekday_hours(&entries),
            vec![0.0, 8.0, 8.0, 8.0, 8.0, 8.0, 0.0]
        );
    }

    #[test]
    fn test_default_week_continuous_operations() {
        let entries = parse_calendar("   ", 12.0);
        assert_eq!(weekday_hours(&entries), vec![12.0; 7]);
    }

    #[test]
    fn test_unstructured_blob_falls_back() {
        let entries = parse_calendar("garbage (with) parens", 7.5);
        assert_eq!(
            weekday_hours(&entries),
            vec![0.0, 7.5, 7.5, 7.5, 7.5, 7.5, 0.0]
        );
    }

    #[test]
    fn test_day_blocks_and_slot_orderings() {
        let entries = parse_calendar(STANDARD, 8.0);
        let hours = weekday_hours(&entries);
        assert_eq!(hours[0], 0.0); // Sunday, empty block
        assert_eq!(hours[1], 8.0); // two slots
        assert_eq!(hours[2], 8.0);
        assert_eq!(hours[3], 9.0); // reversed tags swapped
        assert_eq!(hours[4], 8.0); // overnight 22:00 -> 06:00
        assert_eq!(hours[5], 2.0); // both tagged s, earlier is start
        assert_eq!(hours[6], 0.0);
        assert_eq!(entries[1].day_name(), "Monday");
    }

    #[test]
    fn test_exceptions_both_shapes() {
        let entries = parse_calendar(STANDARD, 8.0);
        let exceptions: Vec<_> = entries.iter().filter(|e| e.date.is_some()).collect();
        assert_eq!(exceptions.len(), 2);

        assert_eq!(exceptions[0].kind, EntryKind::Holiday);
        assert_eq!(exceptions[0].hours, 0.0);
        assert_eq!(exceptions[0].date, ole_serial_to_date(45292));

        assert_eq!(exceptions[1].kind, EntryKind::ExceptionWorking);
        assert_eq!(exceptions[1].hours, 4.0);
        assert_eq!(exceptions[1].kind.label(), "Exception - Working");
    }

    #[test]
    fn test_missing_day_block_uses_defaults() {
        let blob = "(0||CalendarData()((0||DaysOfWeek()((0||3()((0||0(s|07:00|f|17:00)())))))))";
        let hours = weekday_hours(&parse_calendar(blob, 8.0));
        assert_eq!(hours, vec![0.0, 8.0, 10.0, 8.0, 8.0, 8.0, 0.0]);
    }

    #[test]
    fn test_equal_start_and_end_is_zero() {
        assert_eq!(sum_time_slots("(s|08:00|f|08:00)"), 0.0);
        assert_eq!(sum_time_slots("(s|00:00|f|24:00)"), 24.0);
        assert_eq!(sum_time_slots("(s|08:30|f|12:00)"), 3.5);
    }

    #[test]
    fn test_control_characters_are_neutralised() {
        let noisy = STANDARD.replace('\n', "\u{7f}\r\n\t");
        assert_eq!(
            weekday_hours(&parse_calendar(&noisy, 8.0)),
            weekday_hours(&parse_calendar(STANDARD, 8.0))
        );
    }

    #[test]
    fn test_ole_serials() {
        assert_eq!(ole_serial_to_date(1), NaiveDate::from_ymd_opt(1899, 12, 31));
        assert_eq!(ole_serial_to_date(59), NaiveDate::from_ymd_opt(1900, 2, 27));
        assert_eq!(ole_serial_to_date(60), NaiveDate::from_ymd_opt(1900, 3, 1));
        assert_ne!(ole_serial_to_date(60), NaiveDate::from_ymd_opt(1900, 2, 29));
    }

    #[test]
    fn test_unbalanced_blob_degrades() {
        let entries = parse_calendar("(0||CalendarData()((0||DaysOfWeek()((0||2()(", 8.0);
        assert_eq!(entries.len(), 7);
        assert_eq!(entries[1].hours, 8.0);
    }
}
