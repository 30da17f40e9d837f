//! Standalone micro-break.
//!
//! One short drill from the catalog's micro-break rotation, timed on the
//! same deadline countdown as rests. Which drill comes next is decided by the
//! caller from a stored rotation index (see
//! [`Catalog::next_micro_break`](crate::catalog::Catalog::next_micro_break)).

use crate::feedback::Feedback;
use crate::timer::Countdown;
use crate::MobilityDrill;
use chrono::{DateTime, Utc};

/// What an event did to the break
#[must_use]
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum BreakStep {
    Ignored,
    Applied,
    /// The drill's time is up (or it was skipped)
    Done,
}

pub struct MicroBreak {
    drill: MobilityDrill,
    speed: f64,
    feedback: Box<dyn Feedback>,
    countdown: Option<Countdown>,
    done: bool,
}

impl MicroBreak {
    pub fn new(drill: MobilityDrill, speed: f64, feedback: Box<dyn Feedback>) -> Self {
        Self {
            drill,
            speed,
            feedback,
            countdown: None,
            done: false,
        }
    }

    pub fn drill(&self) -> &MobilityDrill {
        &self.drill
    }

    pub fn is_done(&self) -> bool {
        self.done
    }

    pub fn is_paused(&self) -> bool {
        self.countdown.as_ref().is_some_and(Countdown::is_paused)
    }

    pub fn seconds_left(&self, now: DateTime<Utc>) -> Option<u32> {
        self.countdown.as_ref().map(|c| c.seconds_left(now))
    }

    pub fn start(&mut self, now: DateTime<Utc>) -> BreakStep {
        if self.countdown.is_some() || self.done {
            return BreakStep::Ignored;
        }
        self.countdown = Some(Countdown::start(self.drill.seconds, now, self.speed));
        self.feedback.on_break_start();
        tracing::info!("Micro-break: {} ({}s)", self.drill.name, self.drill.seconds);
        BreakStep::Applied
    }

    pub fn tick(&mut self, now: DateTime<Utc>) -> BreakStep {
        if self.done {
            return BreakStep::Ignored;
        }
        let Some(countdown) = self.countdown.as_mut() else {
            return BreakStep::Ignored;
        };
        if let Some(seconds_left) = countdown.take_cue(now) {
            self.feedback.on_countdown_tick(seconds_left);
        }
        if countdown.is_elapsed(now) {
            return self.finish();
        }
        BreakStep::Ignored
    }

    /// End the drill early
    pub fn skip(&mut self, _now: DateTime<Utc>) -> BreakStep {
        if self.done || self.countdown.is_none() {
            return BreakStep::Ignored;
        }
        self.finish()
    }

    pub fn pause(&mut self, now: DateTime<Utc>) -> BreakStep {
        match self.countdown.as_mut() {
            Some(c) if !self.done => {
                if c.pause(now) {
                    BreakStep::Applied
                } else {
                    BreakStep::Ignored
                }
            }
            _ => BreakStep::Ignored,
        }
    }

    pub fn resume(&mut self, now: DateTime<Utc>) -> BreakStep {
        match self.countdown.as_mut() {
            Some(c) if !self.done => {
                if c.resume(now) {
                    BreakStep::Applied
                } else {
                    BreakStep::Ignored
                }
            }
            _ => BreakStep::Ignored,
        }
    }

    fn finish(&mut self) -> BreakStep {
        self.done = true;
        self.countdown = None;
        self.feedback.on_break_done();
        tracing::info!("Micro-break done");
        BreakStep::Done
    }
}
