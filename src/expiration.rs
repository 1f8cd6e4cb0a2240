//! Date normalization for vendor output: expiration tokens and checkout
//! timestamps. Expiration parsing never fails; anything unreadable becomes
//! the vendor's permanent sentinel, because expiration is best-effort
//! metadata rather than a correctness-critical field.

use crate::models::ServerType;
use chrono::{DateTime, Datelike, Local, LocalResult, Months, NaiveDate, NaiveDateTime, TimeZone, Utc};
use tracing::debug;

/// Date formats observed in the wild, attempted in order. `%d` and `%m`
/// accept one- or two-digit values, so this list also covers the
/// `D-Mon-YYYY` and `M/D/YYYY` variants.
const EXPIRATION_FORMATS: [&str; 5] = [
    "%d-%b-%Y", // 31-mar-2021, 1-jan-2036
    "%Y-%m-%d", // 2021-03-31
    "%m/%d/%Y", // 03/31/2021, 3/1/2021
    "%b %d, %Y", // Mar 31, 2021
    "%B %d %Y", // March 31 2021
];

/// Handles parsing of expiration-date tokens from license utility output.
pub struct ExpirationParser;

impl ExpirationParser {
    /// Normalize an expiration token into a concrete date.
    ///
    /// "permanent" (any case) and unparseable input both resolve to the
    /// vendor's far-future sentinel. Legacy zero-year dates (`-jan-0`,
    /// `-jan-0000`), which some vendors emit as an informal "never", are
    /// rewritten to `-jan-2036` before standard parsing.
    pub fn parse(raw: &str, server_type: ServerType) -> NaiveDate {
        let token = raw.trim();
        if token.is_empty() || token.eq_ignore_ascii_case("permanent") {
            return Self::permanent(server_type);
        }

        let rewritten = rewrite_zero_year(token);
        let token = rewritten.as_deref().unwrap_or(token);

        for format in EXPIRATION_FORMATS {
            if let Ok(date) = NaiveDate::parse_from_str(token, format) {
                return date;
            }
        }

        debug!(token, "unparseable expiration, using permanent sentinel");
        Self::permanent(server_type)
    }

    /// The vendor-specific "never expires" date. RLM pools use a fixed
    /// 2099-01-01; FlexLM permanent licenses synthesize 100 years from now
    /// at parse time. The asymmetry is inherited behavior and preserved.
    pub fn permanent(server_type: ServerType) -> NaiveDate {
        match server_type {
            ServerType::Rlm => NaiveDate::from_ymd_opt(2099, 1, 1).unwrap(),
            ServerType::FlexLm => Utc::now().date_naive() + Months::new(1200),
        }
    }
}

/// Rewrite a trailing zero-year January token to 2036, case-insensitively.
fn rewrite_zero_year(token: &str) -> Option<String> {
    let lower = token.to_ascii_lowercase();
    for suffix in ["-jan-0000", "-jan-0"] {
        if let Some(day) = lower.strip_suffix(suffix) {
            return Some(format!("{}-jan-2036", &token[..day.len()]));
        }
    }
    None
}

/// Parse a checkout start timestamp into server-local time.
///
/// The observed shapes are `Wed 3/17 9:55`, `Wed 3/17/2021 9:55`,
/// `Wed 3/17/21 9:55` (FlexLM) and `09/19 10:21` (RLM). When the year is
/// absent it is inferred as the current calendar year. The leading weekday
/// is dropped before parsing; chrono would otherwise reject an inferred
/// year whose weekday disagrees with the printed one.
pub fn parse_checkout_time(raw: &str) -> Option<DateTime<Local>> {
    let trimmed = raw.trim();
    let rest = match trimmed.split_once(' ') {
        Some((first, rest)) if first.chars().all(|c| c.is_ascii_alphabetic()) => {
            rest.trim_start()
        }
        _ => trimmed,
    };

    // %y before %Y: an unsigned %Y accepts 1-4 digits, so it would
    // swallow a two-digit year as year 21 instead of 2021.
    for format in ["%m/%d/%y %H:%M", "%m/%d/%Y %H:%M"] {
        if let Ok(naive) = NaiveDateTime::parse_from_str(rest, format) {
            return resolve_local(naive);
        }
    }

    let with_year = format!("{}/{}", Local::now().year(), rest);
    if let Ok(naive) = NaiveDateTime::parse_from_str(&with_year, "%Y/%m/%d %H:%M") {
        return resolve_local(naive);
    }

    None
}

fn resolve_local(naive: NaiveDateTime) -> Option<DateTime<Local>> {
    match Local.from_local_datetime(&naive) {
        LocalResult::Single(dt) => Some(dt),
        LocalResult::Ambiguous(dt, _) => Some(dt),
        LocalResult::None => None,
    }
}
