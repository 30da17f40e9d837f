//! Rest-day mobility routine.
//!
//! A timed walk through the catalog's mobility drills. Drills marked `sides`
//! run twice, left then right. Like the workout machine, the flow is driven
//! by explicit `now` values and recomputes everything from countdown
//! deadlines.

use crate::timer::Countdown;
use crate::MobilityDrill;
use chrono::{DateTime, Utc};

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum MobilityState {
    Idle,
    Active,
    Complete,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Side {
    Left,
    Right,
}

impl Side {
    pub fn label(self) -> &'static str {
        match self {
            Side::Left => "left",
            Side::Right => "right",
        }
    }
}

/// What an event did to the flow
#[must_use]
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum MobilityStep {
    Ignored,
    Applied,
    /// Every drill finished
    Completed { drills: usize },
}

pub struct MobilityFlow {
    drills: Vec<MobilityDrill>,
    speed: f64,
    state: MobilityState,
    index: usize,
    side: Option<Side>,
    countdown: Option<Countdown>,
}

impl MobilityFlow {
    pub fn new(drills: Vec<MobilityDrill>, speed: f64) -> Self {
        Self {
            drills,
            speed,
            state: MobilityState::Idle,
            index: 0,
            side: None,
            countdown: None,
        }
    }

    pub fn state(&self) -> MobilityState {
        self.state
    }

    pub fn drills(&self) -> &[MobilityDrill] {
        &self.drills
    }

    pub fn index(&self) -> usize {
        self.index
    }

    pub fn current(&self) -> Option<&MobilityDrill> {
        match self.state {
            MobilityState::Active => self.drills.get(self.index),
            _ => None,
        }
    }

    /// Side being worked, for two-sided drills
    pub fn side(&self) -> Option<Side> {
        self.side
    }

    pub fn seconds_left(&self, now: DateTime<Utc>) -> Option<u32> {
        self.countdown.as_ref().map(|c| c.seconds_left(now))
    }

    pub fn is_paused(&self) -> bool {
        self.countdown.as_ref().is_some_and(Countdown::is_paused)
    }

    /// Begin the routine from the first drill
    pub fn start(&mut self, now: DateTime<Utc>) -> MobilityStep {
        if self.state == MobilityState::Active {
            return MobilityStep::Ignored;
        }
        self.index = 0;
        if self.drills.is_empty() {
            self.state = MobilityState::Complete;
            return MobilityStep::Completed { drills: 0 };
        }
        self.state = MobilityState::Active;
        self.begin_drill(now);
        tracing::info!("Starting mobility routine ({} drills)", self.drills.len());
        MobilityStep::Applied
    }

    pub fn tick(&mut self, now: DateTime<Utc>) -> MobilityStep {
        if self.state != MobilityState::Active {
            return MobilityStep::Ignored;
        }
        if self.countdown.as_ref().is_some_and(|c| c.is_elapsed(now)) {
            return self.advance(now);
        }
        MobilityStep::Ignored
    }

    /// Finish the current drill (or side) early
    pub fn skip(&mut self, now: DateTime<Utc>) -> MobilityStep {
        if self.state != MobilityState::Active {
            return MobilityStep::Ignored;
        }
        self.advance(now)
    }

    pub fn pause(&mut self, now: DateTime<Utc>) -> MobilityStep {
        if self.state != MobilityState::Active {
            return MobilityStep::Ignored;
        }
        match self.countdown.as_mut() {
            Some(c) => {
                if c.pause(now) {
                    MobilityStep::Applied
                } else {
                    MobilityStep::Ignored
                }
            }
            None => MobilityStep::Ignored,
        }
    }

    pub fn resume(&mut self, now: DateTime<Utc>) -> MobilityStep {
        if self.state != MobilityState::Active {
            return MobilityStep::Ignored;
        }
        match self.countdown.as_mut() {
            Some(c) => {
                if c.resume(now) {
                    MobilityStep::Applied
                } else {
                    MobilityStep::Ignored
                }
            }
            None => MobilityStep::Ignored,
        }
    }

    pub fn quit(&mut self) -> MobilityStep {
        if self.state == MobilityState::Idle {
            return MobilityStep::Ignored;
        }
        self.state = MobilityState::Idle;
        self.index = 0;
        self.side = None;
        self.countdown = None;
        MobilityStep::Applied
    }

    fn begin_drill(&mut self, now: DateTime<Utc>) {
        let Some(drill) = self.drills.get(self.index) else {
            return;
        };
        self.side = drill.sides.then_some(Side::Left);
        self.countdown = Some(Countdown::start(drill.seconds, now, self.speed));
    }

    fn advance(&mut self, now: DateTime<Utc>) -> MobilityStep {
        if self.side == Some(Side::Left) {
            if let Some(drill) = self.drills.get(self.index) {
                self.side = Some(Side::Right);
                self.countdown = Some(Countdown::start(drill.seconds, now, self.speed));
                return MobilityStep::Applied;
            }
        }

        self.index += 1;
        if self.index < self.drills.len() {
            self.begin_drill(now);
            return MobilityStep::Applied;
        }

        self.state = MobilityState::Complete;
        self.side = None;
        self.countdown = None;
        tracing::info!("Mobility routine complete");
        MobilityStep::Completed {
            drills: self.drills.len(),
        }
    }
}
