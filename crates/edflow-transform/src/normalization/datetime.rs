//! Timestamp parsing for hand-exported date cells.
//!
//! Accepted layouts, tried in order:
//!
//! - ISO: `YYYY-MM-DD[T| ]hh:mm[:ss[.fff]]`, optional `Z` or offset (ignored)
//! - Slash: `YYYY/MM/DD[ hh:mm[:ss]]`
//! - European: `DD.MM.YYYY` or `DD/MM/YYYY`, optional time
//! - Bare `YYYY-MM-DD` prefix of any longer text
//!
//! Offsets are dropped rather than applied: exports carry local wall-clock
//! times and shift days are computed on wall-clock time.

use std::sync::LazyLock;

use chrono::{NaiveDate, NaiveDateTime, NaiveTime};
use regex::{Captures, Regex};

static ISO_REGEX: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        r"^(\d{4})-(\d{1,2})-(\d{1,2})(?:[T ]+(\d{1,2}):(\d{2})(?::(\d{2})(?:[.,](\d{1,9}))?)?)?\s*(?:Z|[+-]\d{2}(?::?\d{2})?)?$",
    )
    .expect("Invalid ISO timestamp regex")
});

static SLASH_REGEX: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^(\d{4})/(\d{1,2})/(\d{1,2})(?:[T ]+(\d{1,2}):(\d{2})(?::(\d{2}))?)?$")
        .expect("Invalid slash timestamp regex")
});

static EUROPEAN_REGEX: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^(\d{1,2})[./](\d{1,2})[./](\d{4})(?:[T ]+(\d{1,2}):(\d{2})(?::(\d{2}))?)?$")
        .expect("Invalid European timestamp regex")
});

static DATE_PREFIX_REGEX: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^(\d{4})-(\d{1,2})-(\d{1,2})").expect("Invalid date prefix regex")
});

/// A parsed cell and whether it carried a meaningful time of day.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ParsedTimestamp {
    pub value: NaiveDateTime,
    /// False for date-only cells and for times of exactly `00:00:00`.
    pub has_time: bool,
}

impl ParsedTimestamp {
    fn new(value: NaiveDateTime, time_present: bool) -> Self {
        Self {
            value,
            has_time: time_present && value.time() != NaiveTime::MIN,
        }
    }
}

/// Positions of date and time groups inside a layout's captures.
struct Layout {
    regex: &'static LazyLock<Regex>,
    year: usize,
    month: usize,
    day: usize,
    /// Index of the hour group; minute, second and fraction follow it.
    hour: Option<usize>,
}

static LAYOUTS: [Layout; 4] = [
    Layout {
        regex: &ISO_REGEX,
        year: 1,
        month: 2,
        day: 3,
        hour: Some(4),
    },
    Layout {
        regex: &SLASH_REGEX,
        year: 1,
        month: 2,
        day: 3,
        hour: Some(4),
    },
    Layout {
        regex: &EUROPEAN_REGEX,
        year: 3,
        month: 2,
        day: 1,
        hour: Some(4),
    },
    Layout {
        regex: &DATE_PREFIX_REGEX,
        year: 1,
        month: 2,
        day: 3,
        hour: None,
    },
];

fn group<T: std::str::FromStr>(caps: &Captures<'_>, idx: usize) -> Option<T> {
    caps.get(idx)?.as_str().parse().ok()
}

fn fraction_millis(caps: &Captures<'_>, idx: usize) -> u32 {
    caps.get(idx)
        .map(|m| {
            let digits: String = m.as_str().chars().chain("000".chars()).take(3).collect();
            digits.parse().unwrap_or(0)
        })
        .unwrap_or(0)
}

impl Layout {
    fn parse(&self, text: &str) -> Option<ParsedTimestamp> {
        let caps = self.regex.captures(text)?;
        let date = NaiveDate::from_ymd_opt(
            group(&caps, self.year)?,
            group(&caps, self.month)?,
            group(&caps, self.day)?,
        )?;
        let Some(hour_idx) = self.hour.filter(|idx| caps.get(*idx).is_some()) else {
            return Some(ParsedTimestamp::new(date.and_time(NaiveTime::MIN), false));
        };
        let hour = group(&caps, hour_idx)?;
        let minute = group(&caps, hour_idx + 1)?;
        let second = group(&caps, hour_idx + 2).unwrap_or(0);
        let millis = fraction_millis(&caps, hour_idx + 3);
        let time = NaiveTime::from_hms_milli_opt(hour, minute, second, millis)?;
        Some(ParsedTimestamp::new(date.and_time(time), true))
    }
}

/// Parses a date cell. Returns `None` when no layout matches or the matched
/// values are not a valid calendar date and time.
pub fn parse_timestamp(raw: &str) -> Option<ParsedTimestamp> {
    let text = raw.trim();
    if text.is_empty() {
        return None;
    }
    LAYOUTS.iter().find_map(|layout| layout.parse(text))
}
