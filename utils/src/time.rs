use chrono::{Local, NaiveDateTime, Timelike};

const DATE_FORMAT: &str = "%Y-%m-%d";
const TIMESTAMP_FORMAT: &str = "%Y%m%d_%H%M%S";
const ISO_FORMAT: &str = "%Y-%m-%dT%H:%M:%S";
const ISO_MICROS_FORMAT: &str = "%Y-%m-%dT%H:%M:%S%.6f";

/// Wall clock reading taken once at the start of a run.
///
/// Every key written during a run embeds the same date and timestamp, so
/// the clock is captured up front and passed down instead of calling
/// `Local::now()` at each write.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RunClock {
    now: NaiveDateTime,
}

impl RunClock {
    /// Local time, without timezone normalization.
    pub fn now() -> Self {
        Self {
            now: Local::now().naive_local(),
        }
    }

    pub fn at(now: NaiveDateTime) -> Self {
        Self { now }
    }

    pub fn naive(&self) -> NaiveDateTime {
        self.now
    }

    /// `YYYY-MM-DD`, used as the date segment of every prefix.
    pub fn date(&self) -> String {
        self.now.format(DATE_FORMAT).to_string()
    }

    /// `YYYYMMDD_HHMMSS`, embedded in every filename of the run.
    pub fn timestamp(&self) -> String {
        self.now.format(TIMESTAMP_FORMAT).to_string()
    }

    /// ISO 8601 local time. Microseconds are printed only when non-zero.
    pub fn iso(&self) -> String {
        let format = if self.now.nanosecond() / 1_000 == 0 {
            ISO_FORMAT
        } else {
            ISO_MICROS_FORMAT
        };
        self.now.format(format).to_string()
    }
}
