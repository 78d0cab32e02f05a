//! Calendar helpers.

use chrono::{Local, NaiveDate};

/// The local calendar date, used to name staging and backup directories.
pub fn today() -> NaiveDate {
    Local::now().date_naive()
}
