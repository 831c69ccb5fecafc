use std::io;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use std::time::Duration;

use chrono::{DateTime, Local, NaiveDate, Utc};
use parking_lot::RwLock;

pub const DEFAULT_POLL_INTERVAL: Duration = Duration::from_secs(60);

/// Source of "now" and of the consumer's local calendar day.
pub trait Clock: Send + Sync {
    fn now(&self) -> DateTime<Utc>;
    fn today(&self) -> NaiveDate;
}

#[derive(Debug, Default, Clone, Copy)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> DateTime<Utc> {
        Utc::now()
    }

    fn today(&self) -> NaiveDate {
        Local::now().date_naive()
    }
}

/// Manually driven clock; its calendar day is the UTC date of `now`.
#[derive(Debug)]
pub struct FixedClock {
    now: RwLock<DateTime<Utc>>,
}

impl FixedClock {
    pub fn new(now: DateTime<Utc>) -> Self {
        Self {
            now: RwLock::new(now),
        }
    }

    pub fn set(&self, now: DateTime<Utc>) {
        *self.now.write() = now;
    }

    pub fn advance(&self, by: chrono::Duration) {
        let mut now = self.now.write();
        *now += by;
    }
}

impl Clock for FixedClock {
    fn now(&self) -> DateTime<Utc> {
        *self.now.read()
    }

    fn today(&self) -> NaiveDate {
        self.now.read().date_naive()
    }
}

/// Remembers the last observed calendar day.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DayTracker {
    current: NaiveDate,
}

impl DayTracker {
    pub fn new(today: NaiveDate) -> Self {
        Self { current: today }
    }

    pub fn current(&self) -> NaiveDate {
        self.current
    }

    /// Returns the new day when `today` differs from the remembered one.
    pub fn observe(&mut self, today: NaiveDate) -> Option<NaiveDate> {
        if today == self.current {
            return None;
        }
        self.current = today;
        Some(today)
    }
}

/// Background timer that fires a callback when the calendar day rolls over.
///
/// The callback runs on the ticker's own thread. Dropping the ticker stops it.
pub struct DayTicker {
    stop: Arc<AtomicBool>,
    handle: Option<JoinHandle<()>>,
}

impl DayTicker {
    pub fn spawn<F>(clock: Arc<dyn Clock>, interval: Duration, mut on_day_changed: F) -> io::Result<Self>
    where
        F: FnMut(NaiveDate) + Send + 'static,
    {
        let stop = Arc::new(AtomicBool::new(false));
        let flag = stop.clone();
        let handle = thread::Builder::new()
            .name("day-ticker".into())
            .spawn(move || {
                let mut tracker = DayTracker::new(clock.today());
                loop {
                    thread::park_timeout(interval);
                    if flag.load(Ordering::SeqCst) {
                        break;
                    }
                    if let Some(day) = tracker.observe(clock.today()) {
                        tracing::info!(%day, "calendar day changed");
                        on_day_changed(day);
                    }
                }
            })?;
        Ok(Self {
            stop,
            handle: Some(handle),
        })
    }

    pub fn stop(mut self) {
        self.shutdown();
    }

    fn shutdown(&mut self) {
        self.stop.store(true, Ordering::SeqCst);
        if let Some(handle) = self.handle.take() {
            handle.thread().unpark();
            if handle.join().is_err() {
                tracing::warn!("day ticker thread panicked");
            }
        }
    }
}

impl Drop for DayTicker {
    fn drop(&mut self) {
        self.shutdown();
    }
}
