//! Wall-clock source for stamps and backup names.
//!
//! Local time is a fixed UTC offset taken from configuration, so stamps do
//! not depend on the host timezone.

use crate::error::{Result, StoreError};
use chrono::{DateTime, Duration, FixedOffset, NaiveDate, Utc};
use parking_lot::Mutex;

/// Format of `open_date` / `completion_date`.
pub const DATE_FORMAT: &str = "%d/%m/%Y";

/// Format of `open_time` / `completion_time`.
pub const TIME_FORMAT: &str = "%H:%M:%S";

/// Timestamp embedded in backup file names. Sorts chronologically as a string.
pub const BACKUP_STAMP_FORMAT: &str = "%Y%m%d_%H%M%S";

/// Source of local wall-clock time.
pub trait Clock: Send + Sync {
    fn now(&self) -> DateTime<FixedOffset>;
}

/// Reads the system clock and shifts it to a fixed offset.
#[derive(Clone, Copy, Debug)]
pub struct SystemClock {
    offset: FixedOffset,
}

impl SystemClock {
    pub fn new(offset: FixedOffset) -> Self {
        Self { offset }
    }

    /// Build from a whole-hour offset, e.g. `-3` for UTC-03:00.
    pub fn with_offset_hours(hours: i32) -> Result<Self> {
        let offset = FixedOffset::east_opt(hours * 3600)
            .ok_or_else(|| StoreError::Config(format!("invalid UTC offset: {hours} hours")))?;
        Ok(Self::new(offset))
    }
}

impl Clock for SystemClock {
    fn now(&self) -> DateTime<FixedOffset> {
        Utc::now().with_timezone(&self.offset)
    }
}

/// Manually driven clock for tests and replays.
///
/// With a non-zero `tick`, every call to `now` advances the clock by `tick`
/// after reading it.
#[derive(Debug)]
pub struct ManualClock {
    now: Mutex<DateTime<FixedOffset>>,
    tick: Duration,
}

impl ManualClock {
    pub fn new(start: DateTime<FixedOffset>) -> Self {
        Self {
            now: Mutex::new(start),
            tick: Duration::zero(),
        }
    }

    pub fn ticking(start: DateTime<FixedOffset>, tick: Duration) -> Self {
        Self {
            now: Mutex::new(start),
            tick,
        }
    }

    pub fn set(&self, at: DateTime<FixedOffset>) {
        *self.now.lock() = at;
    }

    pub fn advance(&self, by: Duration) {
        let mut now = self.now.lock();
        *now += by;
    }
}

impl Clock for ManualClock {
    fn now(&self) -> DateTime<FixedOffset> {
        let mut now = self.now.lock();
        let current = *now;
        *now += self.tick;
        current
    }
}

/// Split a local instant into the `(date, time)` strings stored on disk.
pub fn stamp(at: DateTime<FixedOffset>) -> (String, String) {
    (
        at.format(DATE_FORMAT).to_string(),
        at.format(TIME_FORMAT).to_string(),
    )
}

/// Normalize a user-entered date to `DD/MM/YYYY`.
///
/// Accepts `DD/MM/YYYY` or the compact `DDMMYYYY`. Returns `None` for
/// anything that is not a real calendar date.
pub fn parse_date_input(input: &str) -> Option<String> {
    let input = input.trim();
    let parsed = if input.len() == 8 && input.chars().all(|c| c.is_ascii_digit()) {
        NaiveDate::parse_from_str(input, "%d%m%Y")
    } else {
        NaiveDate::parse_from_str(input, DATE_FORMAT)
    };
    parsed.ok().map(|d| d.format(DATE_FORMAT).to_string())
}
