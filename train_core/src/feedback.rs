//! Feedback and device collaborators injected into the session machine.
//!
//! Feedback is fire-and-forget: the machine calls these hooks but never waits
//! on them and never lets them influence a transition.

use std::sync::{Arc, Mutex};

/// Audio/haptic cues emitted by the session machine
///
/// Every method defaults to a no-op so implementors pick what they support.
pub trait Feedback: Send {
    fn on_session_start(&self) {}
    fn on_set_logged(&self, _hit_target: bool) {}
    /// Fires at 3, 2 and 1 seconds left, once each per rest period
    fn on_countdown_tick(&self, _seconds_left: u32) {}
    fn on_rest_complete(&self) {}
    fn on_next_exercise(&self) {}
    fn on_skip(&self) {}
    fn on_session_complete(&self) {}
    fn on_undo(&self) {}
    fn on_break_start(&self) {}
    fn on_break_done(&self) {}
}

/// Feedback sink that ignores everything
#[derive(Clone, Copy, Debug, Default)]
pub struct NoFeedback;

impl Feedback for NoFeedback {}

/// Screen wake lock, best-effort
pub trait WakeLock: Send {
    /// Returns false when the platform denied the request; never fatal
    fn acquire(&self) -> bool;
    fn release(&self);
}

#[derive(Clone, Copy, Debug, Default)]
pub struct NoWakeLock;

impl WakeLock for NoWakeLock {
    fn acquire(&self) -> bool {
        false
    }

    fn release(&self) {}
}

/// A single emitted cue, as captured by [`RecordingFeedback`]
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Cue {
    SessionStart,
    SetLogged { hit_target: bool },
    CountdownTick(u32),
    RestComplete,
    NextExercise,
    Skip,
    SessionComplete,
    Undo,
    BreakStart,
    BreakDone,
}

/// Feedback sink that records cues into a shared buffer
#[derive(Clone, Debug, Default)]
pub struct RecordingFeedback {
    cues: Arc<Mutex<Vec<Cue>>>,
}

impl RecordingFeedback {
    pub fn new() -> Self {
        Self::default()
    }

    /// Snapshot of the cues recorded so far
    pub fn cues(&self) -> Vec<Cue> {
        self.cues.lock().map(|c| c.clone()).unwrap_or_default()
    }

    pub fn count(&self, cue: Cue) -> usize {
        self.cues().iter().filter(|c| **c == cue).count()
    }

    fn push(&self, cue: Cue) {
        if let Ok(mut cues) = self.cues.lock() {
            cues.push(cue);
        }
    }
}

impl Feedback for RecordingFeedback {
    fn on_session_start(&self) {
        self.push(Cue::SessionStart);
    }

    fn on_set_logged(&self, hit_target: bool) {
        self.push(Cue::SetLogged { hit_target });
    }

    fn on_countdown_tick(&self, seconds_left: u32) {
        self.push(Cue::CountdownTick(seconds_left));
    }

    fn on_rest_complete(&self) {
        self.push(Cue::RestComplete);
    }

    fn on_next_exercise(&self) {
        self.push(Cue::NextExercise);
    }

    fn on_skip(&self) {
        self.push(Cue::Skip);
    }

    fn on_session_complete(&self) {
        self.push(Cue::SessionComplete);
    }

    fn on_undo(&self) {
        self.push(Cue::Undo);
    }

    fn on_break_start(&self) {
        self.push(Cue::BreakStart);
    }

    fn on_break_done(&self) {
        self.push(Cue::BreakDone);
    }
}

/// Wake lock double that tracks whether it is held
#[derive(Clone, Debug, Default)]
pub struct FlagWakeLock {
    held: Arc<Mutex<bool>>,
}

impl FlagWakeLock {
    pub fn is_held(&self) -> bool {
        self.held.lock().map(|h| *h).unwrap_or(false)
    }
}

impl WakeLock for FlagWakeLock {
    fn acquire(&self) -> bool {
        if let Ok(mut held) = self.held.lock() {
            *held = true;
        }
        true
    }

    fn release(&self) {
        if let Ok(mut held) = self.held.lock() {
            *held = false;
        }
    }
}
