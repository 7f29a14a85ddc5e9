//! Journal page names
//!
//! Logseq names journal pages after their date, e.g. `Dec 25th, 2023`.

use crate::error::{LogseqMcpError, Result};
use chrono::{Datelike, NaiveDate};
use once_cell::sync::Lazy;
use regex::Regex;

static JOURNAL_FORMAT: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^[A-Za-z]{3} \d{1,2}(st|nd|rd|th), \d{4}$").expect("Valid journal format regex")
});

static ORDINAL_SUFFIX: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(\d+)(st|nd|rd|th)").expect("Valid ordinal suffix regex"));

static COMPACT_DATE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^(\d{4})(\d{2})(\d{2})$").expect("Valid compact date regex"));

/// Accepted input formats, tried in order. US month-first wins over
/// day-first when both parse.
const INPUT_FORMATS: &[&str] = &[
    "%Y-%m-%d",
    "%Y/%m/%d",
    "%m/%d/%Y",
    "%d/%m/%Y",
    "%m-%d-%Y",
    "%d-%m-%Y",
    "%B %d, %Y",
    "%b %d, %Y",
];

/// `st`, `nd`, `rd` or `th` for a day of the month
pub fn ordinal_suffix(day: u32) -> &'static str {
    if (10..=20).contains(&(day % 100)) {
        return "th";
    }
    match day % 10 {
        1 => "st",
        2 => "nd",
        3 => "rd",
        _ => "th",
    }
}

/// Parse a date in any accepted input format
pub fn parse_date(input: &str) -> Result<NaiveDate> {
    let input = input.trim();

    if let Some(caps) = COMPACT_DATE.captures(input) {
        let part = |i: usize| caps[i].parse::<u32>().ok();
        if let (Some(year), Some(month), Some(day)) = (part(1), part(2), part(3)) {
            if let Some(date) = NaiveDate::from_ymd_opt(year as i32, month, day) {
                return Ok(date);
            }
        }
    }

    INPUT_FORMATS
        .iter()
        .find_map(|format| NaiveDate::parse_from_str(input, format).ok())
        .ok_or_else(|| LogseqMcpError::InvalidDate(format!("Cannot parse date: {}", input)))
}

/// `Dec 25th, 2023`
pub fn format_journal_name(date: NaiveDate) -> String {
    format!(
        "{} {}{}, {}",
        date.format("%b"),
        date.day(),
        ordinal_suffix(date.day()),
        date.year()
    )
}

/// `December 25th, 2023`, used by graphs configured with full month names
pub fn format_journal_name_full(date: NaiveDate) -> String {
    format!(
        "{} {}{}, {}",
        date.format("%B"),
        date.day(),
        ordinal_suffix(date.day()),
        date.year()
    )
}

/// Convert a user-supplied date into the journal page name.
///
/// Input already in journal form is returned unchanged.
pub fn date_to_journal_format(input: &str) -> Result<String> {
    let trimmed = input.trim();
    if JOURNAL_FORMAT.is_match(trimmed) {
        return Ok(trimmed.to_string());
    }
    parse_date(trimmed).map(format_journal_name)
}

/// Parse a journal page name back into a date
pub fn journal_format_to_date(name: &str) -> Result<NaiveDate> {
    let cleaned = ORDINAL_SUFFIX.replace_all(name.trim(), "$1");
    NaiveDate::parse_from_str(&cleaned, "%b %d, %Y").map_err(|_| {
        LogseqMcpError::InvalidDate(format!("Cannot parse journal format: {}", name))
    })
}

/// Page names worth trying for a date, most likely first, without duplicates
pub fn journal_name_candidates(input: &str) -> Result<Vec<String>> {
    let primary = date_to_journal_format(input)?;

    let mut candidates = vec![primary.clone()];
    let date = journal_format_to_date(&primary).or_else(|_| parse_date(input));
    if let Ok(date) = date {
        candidates.push(format_journal_name_full(date));
    }
    candidates.push(input.trim().to_string());

    let mut unique = Vec::with_capacity(candidates.len());
    for candidate in candidates {
        if !unique.contains(&candidate) {
            unique.push(candidate);
        }
    }
    Ok(unique)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_input_formats() {
        for input in [
            "2023-12-25",
            "2023/12/25",
            "12/25/2023",
            "25/12/2023",
            "12-25-2023",
            "25-12-2023",
            "20231225",
            "December 25, 2023",
            "Dec 25, 2023",
        ] {
            assert_eq!(date_to_journal_format(input).unwrap(), "Dec 25th, 2023", "{}", input);
        }
    }

    #[test]
    fn test_month_first_wins_when_ambiguous() {
        assert_eq!(date_to_journal_format("01/02/2024").unwrap(), "Jan 2nd, 2024");
    }

    #[test]
    fn test_already_journal_format() {
        assert_eq!(date_to_journal_format("Jul 1st, 2024").unwrap(), "Jul 1st, 2024");
        assert_eq!(date_to_journal_format("  Dec 25th, 2023 ").unwrap(), "Dec 25th, 2023");
    }

    #[test]
    fn test_ordinal_suffixes() {
        let cases = [
            (1, "st"),
            (2, "nd"),
            (3, "rd"),
            (4, "th"),
            (11, "th"),
            (12, "th"),
            (13, "th"),
            (21, "st"),
            (22, "nd"),
            (23, "rd"),
            (31, "st"),
        ];
        for (day, suffix) in cases {
            assert_eq!(ordinal_suffix(day), suffix, "day {}", day);
        }
    }

    #[test]
    fn test_invalid_date() {
        let err = date_to_journal_format("not a date").unwrap_err();
        assert!(matches!(err, LogseqMcpError::InvalidDate(_)));
        assert!(err.to_string().starts_with("Invalid date format"));
        assert!(date_to_journal_format("2023-02-30").is_err());
    }

    #[test]
    fn test_journal_format_to_date() {
        assert_eq!(
            journal_format_to_date("Dec 25th, 2023").unwrap(),
            NaiveDate::from_ymd_opt(2023, 12, 25).unwrap()
        );
        assert_eq!(
            journal_format_to_date("Mar 3rd, 2024").unwrap(),
            NaiveDate::from_ymd_opt(2024, 3, 3).unwrap()
        );
        assert!(journal_format_to_date("Someday").is_err());
    }

    #[test]
    fn test_candidates() {
        assert_eq!(
            journal_name_candidates("2023-12-25").unwrap(),
            vec!["Dec 25th, 2023", "December 25th, 2023", "2023-12-25"]
        );
        assert_eq!(
            journal_name_candidates("May 5th, 2024").unwrap(),
            vec!["May 5th, 2024"]
        );
    }
}
