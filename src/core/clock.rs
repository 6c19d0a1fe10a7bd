//! Wall-clock timestamps stamped onto cards at issuance and transfer.

use chrono::{DateTime, Local, TimeZone};

/// `YYYY-MM-DD hh:mm:ss AM/PM`
pub const DATE_FORMAT: &str = "%Y-%m-%d %I:%M:%S %p";

/// Current local time in ledger date format.
#[must_use]
pub fn now() -> String {
    format_date(&Local::now())
}

/// Formats a timestamp in ledger date format.
#[must_use]
pub fn format_date<Tz: TimeZone>(at: &DateTime<Tz>) -> String
where
    Tz::Offset: std::fmt::Display,
{
    at.format(DATE_FORMAT).to_string()
}
