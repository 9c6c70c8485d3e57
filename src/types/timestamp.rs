use std::sync::atomic::{AtomicI64, Ordering};
use chrono::{DateTime, FixedOffset, NaiveDate, Offset, Utc};

/// Source of "now" for the ledger. Day-file placement is derived from it, so
/// tests and replays inject their own.
pub trait Clock: Send + Sync {
    fn now(&self) -> DateTime<Utc>;
}

pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> DateTime<Utc> {
        Utc::now()
    }
}

/// Clock that only moves when told to.
pub struct ManualClock {
    millis: AtomicI64,
}

impl ManualClock {
    pub fn new(start: DateTime<Utc>) -> Self {
        ManualClock {
            millis: AtomicI64::new(start.timestamp_millis()),
        }
    }

    pub fn set(&self, now: DateTime<Utc>) {
        self.millis.store(now.timestamp_millis(), Ordering::SeqCst);
    }

    pub fn advance(&self, duration: chrono::Duration) {
        self.millis.fetch_add(duration.num_milliseconds(), Ordering::SeqCst);
    }
}

impl Clock for ManualClock {
    fn now(&self) -> DateTime<Utc> {
        DateTime::<Utc>::from_timestamp_millis(self.millis.load(Ordering::SeqCst))
            .unwrap_or_default()
    }
}

/// Calendar day of `instant` in the ledger's configured UTC offset.
pub fn calendar_day(instant: DateTime<Utc>, utc_offset_minutes: i32) -> NaiveDate {
    let offset = FixedOffset::east_opt(utc_offset_minutes * 60).unwrap_or(Utc.fix());
    instant.with_timezone(&offset).date_naive()
}
