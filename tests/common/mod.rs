use chrono::NaiveDate;

/// Shorthand for expected dates in fixture assertions.
pub fn date(y: i32, m: u32, d: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(y, m, d).unwrap()
}
