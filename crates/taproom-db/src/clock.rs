//! Local wall-clock time as the till stores it.

use chrono::{Local, NaiveDate, NaiveDateTime, SubsecRound};
use taproom_core::TIMESTAMP_FORMAT;

/// Current local time, truncated to whole seconds.
pub fn local_now() -> NaiveDateTime {
    Local::now().naive_local().trunc_subsecs(0)
}

/// Current local calendar date.
pub fn today() -> NaiveDate {
    Local::now().date_naive()
}

/// Text form written to every timestamp column.
pub fn format_timestamp(at: NaiveDateTime) -> String {
    at.format(TIMESTAMP_FORMAT).to_string()
}
