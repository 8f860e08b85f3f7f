//! Calendar source for not-found freshness.

use chrono::{Local, NaiveDate};

/// Supplies "today" to the cache engine.
pub trait Clock: Send + Sync {
    /// Current calendar day.
    fn today(&self) -> NaiveDate;
}

/// Local wall-clock calendar.
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn today(&self) -> NaiveDate {
        Local::now().date_naive()
    }
}

/// Clock pinned to one day.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FixedClock(pub NaiveDate);

impl Clock for FixedClock {
    fn today(&self) -> NaiveDate {
        self.0
    }
}
