//! Business-time clock.
//!
//! Attendance days are calendar days in the company's local offset, not UTC.
//! Services take an `Arc<dyn Clock>` so tests can pin "now".

use chrono::{DateTime, FixedOffset, NaiveDate, NaiveDateTime, Timelike, Utc};
use std::sync::{Arc, RwLock};

pub trait Clock: Send + Sync {
    /// Current instant in the business offset.
    fn now(&self) -> DateTime<FixedOffset>;

    /// Local wall-clock time truncated to whole seconds, as stored on attendance rows.
    fn now_local(&self) -> NaiveDateTime {
        let now = self.now().naive_local();
        now.with_nanosecond(0).unwrap_or(now)
    }

    fn today(&self) -> NaiveDate {
        self.now().date_naive()
    }

    fn now_utc(&self) -> DateTime<Utc> {
        self.now().with_timezone(&Utc)
    }
}

/// Reads the system clock and projects it into a fixed offset.
#[derive(Debug, Clone, Copy)]
pub struct SystemClock {
    offset: FixedOffset,
}

impl SystemClock {
    pub fn new(offset: FixedOffset) -> Self {
        Self { offset }
    }
}

impl Clock for SystemClock {
    fn now(&self) -> DateTime<FixedOffset> {
        Utc::now().with_timezone(&self.offset)
    }
}

/// A clock that only moves when told to.
#[derive(Debug, Clone)]
pub struct FixedClock {
    inner: Arc<RwLock<DateTime<FixedOffset>>>,
}

impl FixedClock {
    pub fn new(at: DateTime<FixedOffset>) -> Self {
        Self {
            inner: Arc::new(RwLock::new(at)),
        }
    }

    /// Builds a clock from a local wall-clock time in the given offset.
    pub fn at_local(local: NaiveDateTime, offset: FixedOffset) -> Self {
        let at = local
            .and_local_timezone(offset)
            .single()
            .expect("fixed offsets are never ambiguous");
        Self::new(at)
    }

    pub fn set(&self, at: DateTime<FixedOffset>) {
        *self.inner.write().expect("clock lock poisoned") = at;
    }

    pub fn set_local(&self, local: NaiveDateTime) {
        let offset = *self.now().offset();
        self.set(
            local
                .and_local_timezone(offset)
                .single()
                .expect("fixed offsets are never ambiguous"),
        );
    }

    pub fn advance(&self, by: chrono::Duration) {
        let mut guard = self.inner.write().expect("clock lock poisoned");
        *guard += by;
    }
}

impl Clock for FixedClock {
    fn now(&self) -> DateTime<FixedOffset> {
        *self.inner.read().expect("clock lock poisoned")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    fn wita() -> FixedOffset {
        FixedOffset::east_opt(8 * 3600).unwrap()
    }

    #[test]
    fn business_day_follows_local_offset() {
        // 17:30 UTC on the 1st is already 01:30 on the 2nd at +08:00.
        let utc = NaiveDate::from_ymd_opt(2025, 3, 1)
            .unwrap()
            .and_hms_opt(17, 30, 0)
            .unwrap()
            .and_utc();
        let clock = FixedClock::new(utc.with_timezone(&wita()));
        assert_eq!(clock.today(), NaiveDate::from_ymd_opt(2025, 3, 2).unwrap());
    }

    #[test]
    fn now_local_drops_subseconds() {
        let local = NaiveDate::from_ymd_opt(2025, 3, 2)
            .unwrap()
            .and_hms_milli_opt(8, 0, 5, 750)
            .unwrap();
        let clock = FixedClock::at_local(local, wita());
        assert_eq!(clock.now_local().nanosecond(), 0);
        assert_eq!(clock.now_local().second(), 5);
    }

    #[test]
    fn advance_moves_time_forward() {
        let local = NaiveDate::from_ymd_opt(2025, 3, 2)
            .unwrap()
            .and_hms_opt(8, 0, 0)
            .unwrap();
        let clock = FixedClock::at_local(local, wita());
        clock.advance(chrono::Duration::minutes(90));
        assert_eq!(clock.now_local().hour(), 9);
        assert_eq!(clock.now_local().minute(), 30);
    }
}
