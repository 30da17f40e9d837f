//! Wall-clock rest countdown.
//!
//! The countdown stores an absolute deadline instead of a decrementing
//! counter. Hosts may throttle or suspend periodic callbacks while in the
//! background, so "seconds left" is always recomputed from the deadline and
//! the caller's `now`.

use chrono::{DateTime, Duration, Utc};
use std::sync::{Arc, Mutex};

/// Seconds at which the audible 3-2-1 countdown fires
const CUE_SECONDS: u32 = 3;

/// `now + delay`, saturating at the far future instead of overflowing
pub fn deadline_after(now: DateTime<Utc>, delay: Duration) -> DateTime<Utc> {
    now.checked_add_signed(delay).unwrap_or(DateTime::<Utc>::MAX_UTC)
}

/// A pausable countdown anchored to a wall-clock deadline
#[derive(Clone, Debug, PartialEq)]
pub struct Countdown {
    deadline: DateTime<Utc>,
    paused_at: Option<DateTime<Utc>>,
    speed: f64,
    cues_played: [bool; CUE_SECONDS as usize],
}

impl Countdown {
    /// Start a countdown of `seconds` (countdown seconds, divided by `speed`
    /// to get wall-clock time)
    pub fn start(seconds: u32, now: DateTime<Utc>, speed: f64) -> Self {
        let speed = if speed.is_finite() && speed > 0.0 { speed } else { 1.0 };
        // Saturating cast; absurd speeds land on the far-future deadline
        let wall_millis = (f64::from(seconds) * 1000.0 / speed).round() as i64;
        let delay = Duration::try_milliseconds(wall_millis).unwrap_or(Duration::MAX);
        Self {
            deadline: deadline_after(now, delay),
            paused_at: None,
            speed,
            cues_played: [false; CUE_SECONDS as usize],
        }
    }

    pub fn deadline(&self) -> DateTime<Utc> {
        self.deadline
    }

    pub fn is_paused(&self) -> bool {
        self.paused_at.is_some()
    }

    /// Countdown seconds remaining, rounded up; frozen while paused
    pub fn seconds_left(&self, now: DateTime<Utc>) -> u32 {
        let reference = self.paused_at.unwrap_or(now);
        let remaining = (self.deadline - reference).num_milliseconds();
        if remaining <= 0 {
            return 0;
        }
        (remaining as f64 * self.speed / 1000.0).ceil() as u32
    }

    /// True once the deadline has passed (never while paused)
    pub fn is_elapsed(&self, now: DateTime<Utc>) -> bool {
        self.paused_at.is_none() && now >= self.deadline
    }

    /// Freeze the countdown; returns false if already paused
    pub fn pause(&mut self, now: DateTime<Utc>) -> bool {
        if self.paused_at.is_some() {
            return false;
        }
        self.paused_at = Some(now);
        true
    }

    /// Unfreeze, pushing the deadline out by the time spent paused
    pub fn resume(&mut self, now: DateTime<Utc>) -> bool {
        let Some(paused_at) = self.paused_at.take() else {
            return false;
        };
        if now > paused_at {
            self.deadline = deadline_after(self.deadline, now - paused_at);
        }
        true
    }

    /// Force the deadline to `now` (skip)
    pub fn expire(&mut self, now: DateTime<Utc>) {
        self.paused_at = None;
        self.deadline = now;
    }

    /// Next 3-2-1 cue due at `now`, each value yielded at most once
    pub fn take_cue(&mut self, now: DateTime<Utc>) -> Option<u32> {
        if self.is_paused() {
            return None;
        }
        let left = self.seconds_left(now);
        if !(1..=CUE_SECONDS).contains(&left) {
            return None;
        }
        let slot = &mut self.cues_played[(left - 1) as usize];
        if *slot {
            return None;
        }
        *slot = true;
        Some(left)
    }
}

/// Source of the current instant for the coach
pub trait Clock: Send {
    fn now(&self) -> DateTime<Utc>;
}

#[derive(Clone, Copy, Debug, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> DateTime<Utc> {
        Utc::now()
    }
}

/// Hand-driven clock; clones share the same instant
#[derive(Clone, Debug)]
pub struct ManualClock {
    now: Arc<Mutex<DateTime<Utc>>>,
}

impl ManualClock {
    pub fn new(start: DateTime<Utc>) -> Self {
        Self {
            now: Arc::new(Mutex::new(start)),
        }
    }

    pub fn set(&self, instant: DateTime<Utc>) {
        if let Ok(mut now) = self.now.lock() {
            *now = instant;
        }
    }

    pub fn advance(&self, by: Duration) {
        if let Ok(mut now) = self.now.lock() {
            *now += by;
        }
    }
}

impl Clock for ManualClock {
    fn now(&self) -> DateTime<Utc> {
        self.now.lock().map(|n| *n).unwrap_or_else(|_| Utc::now())
    }
}
