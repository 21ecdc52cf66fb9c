//! Calendar-date helpers.
//!
//! Milestone dates are plain calendar dates (`YYYY-MM-DD`) with no time zone
//! attached. Everything here works on [`time::Date`] so a stored date never
//! shifts by a day depending on where it is read.

use thiserror::Error;
use time::{
    Date, Duration, Month, OffsetDateTime, Weekday,
    format_description::BorrowedFormatItem,
    macros::format_description,
};

const ISO_DATE: &[BorrowedFormatItem<'static>] = format_description!("[year]-[month]-[day]");

/// Human formats tried in order when a date is not already `YYYY-MM-DD`.
const HUMAN_FORMATS: &[&[BorrowedFormatItem<'static>]] = &[
    format_description!("[month repr:long case_sensitive:false] [day padding:none], [year]"),
    format_description!("[month repr:long case_sensitive:false] [day padding:none] [year]"),
    format_description!("[month repr:short case_sensitive:false] [day padding:none], [year]"),
    format_description!("[month repr:short case_sensitive:false] [day padding:none] [year]"),
    format_description!("[day padding:none] [month repr:long case_sensitive:false] [year]"),
    format_description!("[day padding:none] [month repr:short case_sensitive:false] [year]"),
    format_description!("[day padding:none] [month repr:long case_sensitive:false], [year]"),
    format_description!("[month padding:none]/[day padding:none]/[year]"),
    format_description!("[year]/[month padding:none]/[day padding:none]"),
    format_description!("[day padding:none].[month padding:none].[year]"),
    format_description!("[year]-[month padding:none]-[day padding:none]"),
];

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum DateError {
    #[error("empty date")]
    Empty,
    #[error("invalid date '{0}', expected YYYY-MM-DD")]
    Invalid(String),
}

/// Parse a strict `YYYY-MM-DD` date.
pub fn parse_iso_date(input: &str) -> Result<Date, DateError> {
    let input = input.trim();
    if input.is_empty() {
        return Err(DateError::Empty);
    }
    Date::parse(input, ISO_DATE).map_err(|_| DateError::Invalid(input.to_string()))
}

pub fn format_iso_date(date: Date) -> String {
    // The ISO description only contains numeric components, formatting cannot fail.
    date.format(ISO_DATE)
        .unwrap_or_else(|_| format!("{:04}-{:02}-{:02}", date.year(), u8::from(date.month()), date.day()))
}

/// Best-effort parse of a date written by a human (or a language model).
///
/// `YYYY-MM-DD` is taken verbatim, an ISO date-time contributes its date
/// part, and a handful of common spelled-out and numeric layouts are tried
/// after that.
pub fn normalize_date(input: &str) -> Option<Date> {
    let input = input.trim();
    if input.is_empty() {
        return None;
    }
    if let Ok(date) = parse_iso_date(input) {
        return Some(date);
    }
    if let Some(prefix) = input.get(..10) {
        let rest = &input[10..];
        if rest.starts_with('T') || rest.starts_with(' ') {
            if let Ok(date) = parse_iso_date(prefix) {
                return Some(date);
            }
        }
    }

    let cleaned = clean_human_date(input);
    HUMAN_FORMATS
        .iter()
        .find_map(|format| Date::parse(&cleaned, *format).ok())
}

/// Collapse whitespace, drop ordinal suffixes ("15th") and a trailing period.
fn clean_human_date(input: &str) -> String {
    input
        .trim_end_matches('.')
        .split_whitespace()
        .map(|token| {
            let (body, comma) = match token.strip_suffix(',') {
                Some(body) => (body, ","),
                None => (token, ""),
            };
            let digits = body.trim_end_matches(|c: char| c.is_ascii_alphabetic());
            let suffix = &body[digits.len()..];
            if !digits.is_empty()
                && digits.chars().all(|c| c.is_ascii_digit())
                && matches!(suffix.to_ascii_lowercase().as_str(), "st" | "nd" | "rd" | "th")
            {
                format!("{digits}{comma}")
            } else {
                token.to_string()
            }
        })
        .collect::<Vec<_>>()
        .join(" ")
}

/// Today's date on the local calendar, falling back to UTC when the local
/// offset cannot be determined.
pub fn today_local() -> Date {
    OffsetDateTime::now_local()
        .unwrap_or_else(|_| OffsetDateTime::now_utc())
        .date()
}

/// Same month and day `years` later; Feb 29 becomes Feb 28 in non-leap years.
pub fn add_years(date: Date, years: i32) -> Date {
    let year = date.year() + years;
    date.replace_year(year)
        .or_else(|_| Date::from_calendar_date(year, date.month(), 28))
        .unwrap_or(date)
}

pub fn add_days(date: Date, days: i64) -> Date {
    date.checked_add(Duration::days(days)).unwrap_or(date)
}

pub fn first_of_month(date: Date) -> Date {
    date.replace_day(1).unwrap_or(date)
}

/// Day 1 of the month after `date`'s month, `None` past the supported range.
pub fn first_of_next_month(date: Date) -> Option<Date> {
    let (year, month) = match date.month() {
        Month::December => (date.year() + 1, Month::January),
        month => (date.year(), month.next()),
    };
    Date::from_calendar_date(year, month, 1).ok()
}

pub fn monday_on_or_before(date: Date) -> Date {
    let offset = date.weekday().number_days_from_monday();
    add_days(date, -i64::from(offset))
}

pub fn is_monday(date: Date) -> bool {
    date.weekday() == Weekday::Monday
}
