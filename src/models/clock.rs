//! Time source used when measuring days to expiration.

use chrono::{Local, NaiveDate};

pub trait Clock: Send + Sync {
    /// The calendar date "now" falls on.
    fn today(&self) -> NaiveDate;
}

/// Reads the local wall clock.
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn today(&self) -> NaiveDate {
        Local::now().date_naive()
    }
}

/// Always reports the same date.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FixedClock(pub NaiveDate);

impl Clock for FixedClock {
    fn today(&self) -> NaiveDate {
        self.0
    }
}
