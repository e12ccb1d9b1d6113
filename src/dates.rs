//! Display-date handling.
//!
//! The source renders dates as `"15 March 2026"` and that exact string is
//! used as the cache key. Parsing only happens for two purposes: deciding
//! whether a record is stale, and ordering the list of cached dates.

use chrono::{DateTime, Days, NaiveDate, Utc};
use chrono_tz::Tz;

/// Format the source uses for display dates.
pub const DISPLAY_FORMAT: &str = "%d %B %Y";

/// Parse a display date. Returns `None` for anything not in
/// [`DISPLAY_FORMAT`].
pub fn parse_display_date(s: &str) -> Option<NaiveDate> {
    NaiveDate::parse_from_str(s.trim(), DISPLAY_FORMAT).ok()
}

/// Render a calendar date the way the source does (no zero padding).
pub fn format_display_date(date: NaiveDate) -> String {
    date.format("%-d %B %Y").to_string()
}

/// Today's calendar date in `tz`.
pub fn today_in(tz: Tz) -> NaiveDate {
    today_at(Utc::now(), tz)
}

fn today_at(now: DateTime<Utc>, tz: Tz) -> NaiveDate {
    now.with_timezone(&tz).date_naive()
}

/// Oldest date that survives a purge with `retention_days` of history.
///
/// With the default retention of one day this is "yesterday".
pub fn retention_cutoff(today: NaiveDate, retention_days: u32) -> NaiveDate {
    today
        .checked_sub_days(Days::new(u64::from(retention_days)))
        .unwrap_or(NaiveDate::MIN)
}

/// Reduce a `"D Month YYYY"` label to `"D Month"`.
///
/// Labels with fewer than two tokens are returned unchanged. Any other shape
/// keeps whatever its first two tokens are.
pub fn strip_year(label: &str) -> String {
    let mut tokens = label.split_whitespace();
    match (tokens.next(), tokens.next()) {
        (Some(day), Some(month)) => format!("{day} {month}"),
        _ => label.to_string(),
    }
}

/// Sort date strings chronologically. Strings that don't parse go last,
/// in lexical order.
pub fn sort_display_dates(dates: &mut [String]) {
    dates.sort_by(|a, b| match (parse_display_date(a), parse_display_date(b)) {
        (Some(x), Some(y)) => x.cmp(&y).then_with(|| a.cmp(b)),
        (Some(_), None) => std::cmp::Ordering::Less,
        (None, Some(_)) => std::cmp::Ordering::Greater,
        (None, None) => a.cmp(b),
    });
}
