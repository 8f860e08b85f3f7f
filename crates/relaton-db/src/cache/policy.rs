//! Freshness policy.

use chrono::NaiveDate;

/// A not-found sentinel only vouches for the day it was recorded.
pub(crate) fn not_found_is_fresh(fetched: NaiveDate, today: NaiveDate) -> bool {
    fetched == today
}
