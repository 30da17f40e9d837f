//! Workout session state machine.
//!
//! States: `idle -> exercising -> resting -> (exercising | transitioning |
//! complete)`, `transitioning -> exercising`, and `quit` from anywhere back to
//! `idle`.
//!
//! The machine does no I/O and never reads the clock itself: every event takes
//! `now`, and completion hands the finished [`SessionRecord`] back to the
//! caller in [`Step::Completed`] for persistence. Every event is a total
//! function of (state, event); events that make no sense in the current state
//! are ignored rather than treated as errors, so duplicate or out-of-order UI
//! events are harmless.

use crate::config::SessionConfig;
use crate::feedback::{Feedback, WakeLock};
use crate::timer::{deadline_after, Countdown};
use crate::{Exercise, SessionRecord, WorkoutType};
use chrono::{DateTime, Duration, DurationRound, NaiveDate, Utc};
use std::collections::BTreeMap;

/// Discrete state tag of the active session
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum WorkoutState {
    Idle,
    Exercising,
    Resting,
    Transitioning,
    Complete,
}

/// Transient hit/miss indicator shown after logging a set
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Flash {
    Hit,
    Miss,
}

/// What an event did to the machine
#[must_use]
#[derive(Clone, Debug, PartialEq)]
pub enum Step {
    /// Event not valid in the current state, or nothing was due
    Ignored,
    /// State changed
    Applied,
    /// The session finished; the record must be persisted by the caller
    Completed(SessionRecord),
}

impl Step {
    pub fn is_ignored(&self) -> bool {
        matches!(self, Step::Ignored)
    }
}

fn applied(changed: bool) -> Step {
    if changed {
        Step::Applied
    } else {
        Step::Ignored
    }
}

/// One exercise of a planned session with its per-set targets
#[derive(Clone, Debug, PartialEq)]
pub struct PlannedExercise {
    pub exercise: Exercise,
    pub targets: Vec<u32>,
}

/// Everything the machine needs to run one session
#[derive(Clone, Debug, PartialEq)]
pub struct SessionPlan {
    pub date: NaiveDate,
    pub workout_type: WorkoutType,
    pub week_number: u32,
    pub sets_per_exercise: usize,
    pub exercises: Vec<PlannedExercise>,
}

/// Timing knobs for the machine
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Pacing {
    pub rest_seconds: u32,
    pub settle: Duration,
    pub flash: Duration,
    /// 0 waits for an explicit `finish_transition`
    pub transition_seconds: u32,
    pub speed: f64,
}

impl Default for Pacing {
    fn default() -> Self {
        Self::from(&SessionConfig::default())
    }
}

impl From<&SessionConfig> for Pacing {
    fn from(config: &SessionConfig) -> Self {
        let millis = |ms: u64| {
            Duration::try_milliseconds(i64::try_from(ms).unwrap_or(i64::MAX)).unwrap_or(Duration::MAX)
        };
        Self {
            rest_seconds: config.rest_seconds,
            settle: millis(config.settle_millis),
            flash: millis(config.flash_millis),
            transition_seconds: config.transition_seconds,
            speed: config.timer_speed,
        }
    }
}

/// Read-only view of the machine for rendering
#[derive(Clone, Debug, PartialEq)]
pub struct Snapshot {
    pub state: WorkoutState,
    pub exercise_index: usize,
    pub exercise_count: usize,
    pub set_index: usize,
    pub sets_per_exercise: usize,
    pub current_exercise: Option<Exercise>,
    pub current_target: Option<u32>,
    pub seconds_left: Option<u32>,
    pub paused: bool,
    pub flash: Option<Flash>,
    pub session_reps: BTreeMap<String, Vec<u32>>,
    pub next_exercise_name: String,
    pub week_number: u32,
}

/// The session state machine
pub struct WorkoutMachine {
    pacing: Pacing,
    feedback: Box<dyn Feedback>,
    wake_lock: Box<dyn WakeLock>,

    state: WorkoutState,
    plan: Option<SessionPlan>,
    exercise_index: usize,
    set_index: usize,
    session_reps: BTreeMap<String, Vec<u32>>,
    /// Rest countdown while resting, auto-advance countdown while transitioning
    countdown: Option<Countdown>,
    flash: Option<(Flash, DateTime<Utc>)>,
    /// Pending exit from `exercising` after a logged set
    settle_at: Option<DateTime<Utc>>,
    next_exercise_name: String,
}

impl WorkoutMachine {
    pub fn new(pacing: Pacing, feedback: Box<dyn Feedback>, wake_lock: Box<dyn WakeLock>) -> Self {
        Self {
            pacing,
            feedback,
            wake_lock,
            state: WorkoutState::Idle,
            plan: None,
            exercise_index: 0,
            set_index: 0,
            session_reps: BTreeMap::new(),
            countdown: None,
            flash: None,
            settle_at: None,
            next_exercise_name: String::new(),
        }
    }

    // ------------------------------------------------------------------------
    // Accessors
    // ------------------------------------------------------------------------

    pub fn state(&self) -> WorkoutState {
        self.state
    }

    pub fn plan(&self) -> Option<&SessionPlan> {
        self.plan.as_ref()
    }

    pub fn exercise_index(&self) -> usize {
        self.exercise_index
    }

    pub fn set_index(&self) -> usize {
        self.set_index
    }

    pub fn session_reps(&self) -> &BTreeMap<String, Vec<u32>> {
        &self.session_reps
    }

    pub fn next_exercise_name(&self) -> &str {
        &self.next_exercise_name
    }

    pub fn flash(&self) -> Option<Flash> {
        self.flash.map(|(f, _)| f)
    }

    pub fn is_paused(&self) -> bool {
        self.state == WorkoutState::Resting
            && self.countdown.as_ref().is_some_and(Countdown::is_paused)
    }

    /// Countdown seconds left while resting or transitioning
    pub fn seconds_left(&self, now: DateTime<Utc>) -> Option<u32> {
        self.countdown.as_ref().map(|c| c.seconds_left(now))
    }

    pub fn current_exercise(&self) -> Option<&PlannedExercise> {
        self.plan.as_ref()?.exercises.get(self.exercise_index)
    }

    /// Target for the current set, falling back to the first set's target
    pub fn current_target(&self) -> Option<u32> {
        let planned = self.current_exercise()?;
        planned
            .targets
            .get(self.set_index)
            .or_else(|| planned.targets.first())
            .copied()
    }

    pub fn snapshot(&self, now: DateTime<Utc>) -> Snapshot {
        Snapshot {
            state: self.state,
            exercise_index: self.exercise_index,
            exercise_count: self.plan.as_ref().map_or(0, |p| p.exercises.len()),
            set_index: self.set_index,
            sets_per_exercise: self.sets_per_exercise(),
            current_exercise: self.current_exercise().map(|p| p.exercise.clone()),
            current_target: self.current_target(),
            seconds_left: self.seconds_left(now),
            paused: self.is_paused(),
            flash: self.flash(),
            session_reps: self.session_reps.clone(),
            next_exercise_name: self.next_exercise_name.clone(),
            week_number: self.plan.as_ref().map_or(1, |p| p.week_number),
        }
    }

    fn sets_per_exercise(&self) -> usize {
        self.plan.as_ref().map_or(0, |p| p.sets_per_exercise)
    }

    fn exercise_count(&self) -> usize {
        self.plan.as_ref().map_or(0, |p| p.exercises.len())
    }

    fn is_last_set_of_session(&self) -> bool {
        self.set_index + 1 >= self.sets_per_exercise()
            && self.exercise_index + 1 >= self.exercise_count()
    }

    // ------------------------------------------------------------------------
    // Events
    // ------------------------------------------------------------------------

    /// Begin a session; only valid from `idle`
    pub fn start(&mut self, plan: SessionPlan, _now: DateTime<Utc>) -> Step {
        if self.state != WorkoutState::Idle {
            tracing::debug!("start ignored: session already {:?}", self.state);
            return Step::Ignored;
        }
        if plan.exercises.is_empty() || plan.sets_per_exercise == 0 {
            tracing::warn!(
                "start ignored: empty plan for {} ({})",
                plan.date,
                plan.workout_type
            );
            return Step::Ignored;
        }

        self.reset();
        tracing::info!(
            "Starting {} session for {}: {} exercises x {} sets (week {})",
            plan.workout_type,
            plan.date,
            plan.exercises.len(),
            plan.sets_per_exercise,
            plan.week_number
        );
        self.plan = Some(plan);
        self.state = WorkoutState::Exercising;

        if !self.wake_lock.acquire() {
            tracing::debug!("Wake lock not granted; continuing without it");
        }
        self.feedback.on_session_start();
        Step::Applied
    }

    /// Record a set value (non-negative, validated by the input layer)
    pub fn log_set(&mut self, value: u32, now: DateTime<Utc>) -> Step {
        if self.state != WorkoutState::Exercising || self.settle_at.is_some() {
            return Step::Ignored;
        }
        let Some(planned) = self.current_exercise() else {
            return Step::Ignored;
        };
        let key = planned.exercise.key.clone();
        let target = self.current_target();

        let sets_per_exercise = self.sets_per_exercise();
        let logged = self.session_reps.entry(key.clone()).or_default();
        if logged.len() >= sets_per_exercise {
            return Step::Ignored;
        }
        logged.push(value);

        let hit = target.map_or(true, |t| value >= t);
        self.flash = Some((
            if hit { Flash::Hit } else { Flash::Miss },
            deadline_after(now, self.pacing.flash),
        ));
        self.feedback.on_set_logged(hit);
        tracing::debug!(
            "Logged {} for {} set {} (target {:?}, {})",
            value,
            key,
            self.set_index + 1,
            target,
            if hit { "hit" } else { "miss" }
        );

        if self.pacing.settle <= Duration::zero() {
            return self.settle(now);
        }
        self.settle_at = Some(deadline_after(now, self.pacing.settle));
        Step::Applied
    }

    /// Periodic timer tick and foreground-recovery check
    ///
    /// Safe to call at any rate: all timing is recomputed from deadlines, so a
    /// tick arriving long after a deadline fires the due transition exactly
    /// once.
    pub fn tick(&mut self, now: DateTime<Utc>) -> Step {
        if matches!(self.flash, Some((_, until)) if now >= until) {
            self.flash = None;
        }

        match self.state {
            WorkoutState::Exercising => match self.settle_at {
                Some(at) if now >= at => self.settle(now),
                _ => Step::Ignored,
            },
            WorkoutState::Resting => {
                let Some(countdown) = self.countdown.as_mut() else {
                    return self.advance_after_rest(now);
                };
                if let Some(seconds_left) = countdown.take_cue(now) {
                    self.feedback.on_countdown_tick(seconds_left);
                }
                if countdown.is_elapsed(now) {
                    self.feedback.on_rest_complete();
                    return self.advance_after_rest(now);
                }
                Step::Ignored
            }
            WorkoutState::Transitioning => {
                if self.countdown.as_ref().is_some_and(|c| c.is_elapsed(now)) {
                    self.finish_transition(now)
                } else {
                    Step::Ignored
                }
            }
            WorkoutState::Idle | WorkoutState::Complete => Step::Ignored,
        }
    }

    /// Freeze the rest countdown
    pub fn pause(&mut self, now: DateTime<Utc>) -> Step {
        if self.state != WorkoutState::Resting {
            return Step::Ignored;
        }
        applied(self.countdown.as_mut().is_some_and(|c| c.pause(now)))
    }

    /// Resume a paused rest countdown with the same remaining time
    pub fn resume(&mut self, now: DateTime<Utc>) -> Step {
        if self.state != WorkoutState::Resting {
            return Step::Ignored;
        }
        applied(self.countdown.as_mut().is_some_and(|c| c.resume(now)))
    }

    /// End the rest period immediately
    pub fn skip(&mut self, now: DateTime<Utc>) -> Step {
        if self.state != WorkoutState::Resting {
            return Step::Ignored;
        }
        if let Some(c) = self.countdown.as_mut() {
            c.expire(now);
        }
        self.feedback.on_skip();
        self.advance_after_rest(now)
    }

    /// Take back the set that started the current rest period
    pub fn undo(&mut self, _now: DateTime<Utc>) -> Step {
        if self.state != WorkoutState::Resting {
            return Step::Ignored;
        }
        let Some(key) = self.current_exercise().map(|p| p.exercise.key.clone()) else {
            return Step::Ignored;
        };

        if let Some(values) = self.session_reps.get_mut(&key) {
            values.pop();
            if values.is_empty() {
                self.session_reps.remove(&key);
            }
        }
        self.countdown = None;
        self.flash = None;
        self.state = WorkoutState::Exercising;
        self.feedback.on_undo();
        tracing::debug!("Undid set {} of {}", self.set_index + 1, key);
        Step::Applied
    }

    /// Leave the between-exercise interstitial
    pub fn finish_transition(&mut self, _now: DateTime<Utc>) -> Step {
        if self.state != WorkoutState::Transitioning {
            return Step::Ignored;
        }
        self.countdown = None;
        self.state = WorkoutState::Exercising;
        Step::Applied
    }

    /// Abandon the session from any state; nothing is persisted
    pub fn quit(&mut self) -> Step {
        if self.state == WorkoutState::Idle {
            return Step::Ignored;
        }
        tracing::info!("Session ended from {:?}", self.state);
        self.reset();
        self.wake_lock.release();
        Step::Applied
    }

    // ------------------------------------------------------------------------
    // Internal transitions
    // ------------------------------------------------------------------------

    fn reset(&mut self) {
        self.state = WorkoutState::Idle;
        self.plan = None;
        self.exercise_index = 0;
        self.set_index = 0;
        self.session_reps.clear();
        self.countdown = None;
        self.flash = None;
        self.settle_at = None;
        self.next_exercise_name.clear();
    }

    /// Leave `exercising` after the feedback delay
    fn settle(&mut self, now: DateTime<Utc>) -> Step {
        self.settle_at = None;
        if self.is_last_set_of_session() {
            return self.complete(now);
        }
        self.countdown = Some(Countdown::start(self.pacing.rest_seconds, now, self.pacing.speed));
        self.state = WorkoutState::Resting;
        tracing::debug!("Resting {}s", self.pacing.rest_seconds);
        Step::Applied
    }

    /// The "reached zero" transition, shared by ticks, recovery and skip
    fn advance_after_rest(&mut self, now: DateTime<Utc>) -> Step {
        self.countdown = None;

        let next_set = self.set_index + 1;
        if next_set < self.sets_per_exercise() {
            self.set_index = next_set;
            self.state = WorkoutState::Exercising;
            return Step::Applied;
        }

        let next_exercise = self.exercise_index + 1;
        if next_exercise < self.exercise_count() {
            self.feedback.on_next_exercise();
            self.exercise_index = next_exercise;
            self.set_index = 0;
            self.next_exercise_name = self
                .current_exercise()
                .map(|p| p.exercise.name.clone())
                .unwrap_or_default();
            if self.pacing.transition_seconds > 0 {
                self.countdown = Some(Countdown::start(
                    self.pacing.transition_seconds,
                    now,
                    self.pacing.speed,
                ));
            }
            self.state = WorkoutState::Transitioning;
            tracing::debug!("Next exercise: {}", self.next_exercise_name);
            return Step::Applied;
        }

        self.complete(now)
    }

    fn complete(&mut self, now: DateTime<Utc>) -> Step {
        let Some(plan) = self.plan.as_ref() else {
            return Step::Ignored;
        };

        let sets: BTreeMap<String, Vec<u32>> = self
            .session_reps
            .iter()
            .filter(|(_, values)| !values.is_empty())
            .map(|(k, v)| (k.clone(), v.clone()))
            .collect();

        let record = SessionRecord {
            sets,
            logged_at: now
                .duration_trunc(Duration::milliseconds(1))
                .unwrap_or(now),
            week_number: plan.week_number,
            workout_type: Some(plan.workout_type),
        };

        self.countdown = None;
        self.settle_at = None;
        self.state = WorkoutState::Complete;
        self.wake_lock.release();
        self.feedback.on_session_complete();
        tracing::info!(
            "Session complete for {}: {} sets across {} exercises",
            plan.date,
            record.total_sets(),
            record.sets.len()
        );
        Step::Completed(record)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::feedback::{Cue, FlagWakeLock, RecordingFeedback};
    use crate::Unit;
    use chrono::TimeZone;

    fn t0() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2026, 2, 17, 7, 0, 0).unwrap()
    }

    fn at(secs: i64) -> DateTime<Utc> {
        t0() + Duration::seconds(secs)
    }

    fn exercise(key: &str) -> Exercise {
        Exercise {
            key: key.into(),
            name: key.to_uppercase(),
            unit: Unit::Reps,
            instruction: String::new(),
            workout_type: WorkoutType::Push,
            demo_ref: None,
        }
    }

    fn plan(keys: &[&str], sets: usize, target: u32) -> SessionPlan {
        SessionPlan {
            date: NaiveDate::from_ymd_opt(2026, 2, 17).unwrap(),
            workout_type: WorkoutType::Push,
            week_number: 1,
            sets_per_exercise: sets,
            exercises: keys
                .iter()
                .map(|k| PlannedExercise {
                    exercise: exercise(k),
                    targets: vec![target; sets],
                })
                .collect(),
        }
    }

    /// Immediate transitions, 90s rest, user-acknowledged interstitials
    fn instant() -> Pacing {
        Pacing {
            rest_seconds: 90,
            settle: Duration::zero(),
            flash: Duration::milliseconds(600),
            transition_seconds: 0,
            speed: 1.0,
        }
    }

    fn machine(pacing: Pacing) -> (WorkoutMachine, RecordingFeedback, FlagWakeLock) {
        let feedback = RecordingFeedback::new();
        let wake_lock = FlagWakeLock::default();
        let m = WorkoutMachine::new(pacing, Box::new(feedback.clone()), Box::new(wake_lock.clone()));
        (m, feedback, wake_lock)
    }

    #[test]
    fn test_start_lands_in_exercising() {
        let (mut m, feedback, wake_lock) = machine(instant());
        assert_eq!(m.start(plan(&["ex1", "ex2"], 2, 8), t0()), Step::Applied);
        assert_eq!(m.state(), WorkoutState::Exercising);
        assert_eq!(m.exercise_index(), 0);
        assert_eq!(m.set_index(), 0);
        assert!(m.session_reps().is_empty());
        assert!(wake_lock.is_held());
        assert_eq!(feedback.cues(), vec![Cue::SessionStart]);
    }

    #[test]
    fn test_start_only_from_idle() {
        let (mut m, _, _) = machine(instant());
        let _ = m.start(plan(&["ex1"], 2, 8), t0());
        let _ = m.log_set(9, t0());
        assert!(m.start(plan(&["other"], 3, 8), t0()).is_ignored());
        assert_eq!(m.plan().unwrap().exercises[0].exercise.key, "ex1");
        assert_eq!(m.session_reps()["ex1"], vec![9]);
    }

    #[test]
    fn test_start_rejects_empty_plan() {
        let (mut m, _, _) = machine(instant());
        assert!(m.start(plan(&[], 2, 8), t0()).is_ignored());
        assert!(m.start(plan(&["ex1"], 0, 8), t0()).is_ignored());
        assert_eq!(m.state(), WorkoutState::Idle);
    }

    #[test]
    fn test_full_session_two_by_two() {
        let (mut m, feedback, wake_lock) = machine(instant());
        let _ = m.start(plan(&["ex1", "ex2"], 2, 8), t0());

        assert_eq!(m.log_set(10, at(1)), Step::Applied);
        assert_eq!(m.state(), WorkoutState::Resting);
        let _ = m.tick(at(91));
        assert_eq!(m.state(), WorkoutState::Exercising);
        assert_eq!(m.set_index(), 1);

        let _ = m.log_set(8, at(100));
        let _ = m.tick(at(190));
        assert_eq!(m.state(), WorkoutState::Transitioning);
        assert_eq!(m.next_exercise_name(), "EX2");
        assert_eq!(m.exercise_index(), 1);
        assert_eq!(m.set_index(), 0);

        let _ = m.finish_transition(at(191));
        let _ = m.log_set(12, at(200));
        let _ = m.skip(at(201));
        assert_eq!(m.set_index(), 1);

        let record = match m.log_set(9, at(210)) {
            Step::Completed(record) => record,
            other => panic!("expected completion, got {:?}", other),
        };
        assert_eq!(m.state(), WorkoutState::Complete);
        assert_eq!(record.sets["ex1"], vec![10, 8]);
        assert_eq!(record.sets["ex2"], vec![12, 9]);
        assert_eq!(record.week_number, 1);
        assert_eq!(record.workout_type, Some(WorkoutType::Push));
        assert_eq!(record.logged_at, at(210));
        assert_eq!(feedback.count(Cue::SessionComplete), 1);
        assert!(!wake_lock.is_held());

        // Complete is terminal: nothing else fires another completion
        assert!(m.log_set(5, at(211)).is_ignored());
        assert!(m.tick(at(500)).is_ignored());
        assert!(m.skip(at(501)).is_ignored());
        assert_eq!(feedback.count(Cue::SessionComplete), 1);
    }

    #[test]
    fn test_hit_and_miss_feedback() {
        let (mut m, feedback, _) = machine(instant());
        let _ = m.start(plan(&["ex1"], 3, 8), t0());

        let _ = m.log_set(8, t0());
        assert_eq!(m.flash(), Some(Flash::Hit));
        let _ = m.skip(at(1));
        let _ = m.log_set(7, at(2));
        assert_eq!(m.flash(), Some(Flash::Miss));

        // Flash clears after its delay, independent of state
        let _ = m.tick(at(2) + Duration::milliseconds(599));
        assert_eq!(m.flash(), Some(Flash::Miss));
        let _ = m.tick(at(3));
        assert_eq!(m.flash(), None);

        let logged: Vec<Cue> = feedback
            .cues()
            .into_iter()
            .filter(|c| matches!(c, Cue::SetLogged { .. }))
            .collect();
        assert_eq!(
            logged,
            vec![
                Cue::SetLogged { hit_target: true },
                Cue::SetLogged { hit_target: false }
            ]
        );
    }

    #[test]
    fn test_settle_delay_before_rest() {
        let pacing = Pacing {
            settle: Duration::milliseconds(700),
            ..instant()
        };
        let (mut m, _, _) = machine(pacing);
        let _ = m.start(plan(&["ex1"], 2, 8), t0());

        assert_eq!(m.log_set(10, t0()), Step::Applied);
        assert_eq!(m.state(), WorkoutState::Exercising);
        // Duplicate submit during the delay is dropped
        assert!(m.log_set(10, t0() + Duration::milliseconds(100)).is_ignored());
        assert!(m.tick(t0() + Duration::milliseconds(699)).is_ignored());

        assert_eq!(m.tick(t0() + Duration::milliseconds(700)), Step::Applied);
        assert_eq!(m.state(), WorkoutState::Resting);
        assert_eq!(m.session_reps()["ex1"], vec![10]);
        // Rest starts when the delay ends
        assert_eq!(m.seconds_left(t0() + Duration::milliseconds(700)), Some(90));
    }

    #[test]
    fn test_settle_delay_before_completion() {
        let pacing = Pacing {
            settle: Duration::milliseconds(700),
            ..instant()
        };
        let (mut m, _, _) = machine(pacing);
        let _ = m.start(plan(&["ex1"], 1, 8), t0());
        let _ = m.log_set(10, t0());
        assert_eq!(m.state(), WorkoutState::Exercising);
        assert!(matches!(m.tick(at(1)), Step::Completed(_)));
        assert_eq!(m.state(), WorkoutState::Complete);
    }

    #[test]
    fn test_countdown_cues_once() {
        let (mut m, feedback, _) = machine(instant());
        let _ = m.start(plan(&["ex1"], 2, 8), t0());
        let _ = m.log_set(8, t0());

        for s in 0..=90 {
            let _ = m.tick(at(s));
            let _ = m.tick(at(s) + Duration::milliseconds(500));
        }

        let ticks: Vec<Cue> = feedback
            .cues()
            .into_iter()
            .filter(|c| matches!(c, Cue::CountdownTick(_)))
            .collect();
        assert_eq!(
            ticks,
            vec![Cue::CountdownTick(3), Cue::CountdownTick(2), Cue::CountdownTick(1)]
        );
        assert_eq!(feedback.count(Cue::RestComplete), 1);
        assert_eq!(m.state(), WorkoutState::Exercising);
        assert_eq!(m.set_index(), 1);
    }

    #[test]
    fn test_recovery_after_deadline_matches_normal_ticking() {
        // Backgrounded through the whole rest: one late check
        let (mut late, late_fb, _) = machine(instant());
        let _ = late.start(plan(&["ex1", "ex2"], 2, 8), t0());
        let _ = late.log_set(8, t0());
        let _ = late.tick(at(10));
        assert_eq!(late.tick(at(3600)), Step::Applied);
        assert!(late.tick(at(3601)).is_ignored());

        // Same session ticked every second
        let (mut normal, normal_fb, _) = machine(instant());
        let _ = normal.start(plan(&["ex1", "ex2"], 2, 8), t0());
        let _ = normal.log_set(8, t0());
        for s in 1..=95 {
            let _ = normal.tick(at(s));
        }

        assert_eq!(late.state(), normal.state());
        assert_eq!(late.set_index(), normal.set_index());
        assert_eq!(late.exercise_index(), normal.exercise_index());
        assert_eq!(late_fb.count(Cue::RestComplete), 1);
        assert_eq!(normal_fb.count(Cue::RestComplete), 1);
    }

    #[test]
    fn test_recovery_past_last_rest_of_exercise() {
        let (mut m, feedback, _) = machine(instant());
        let _ = m.start(plan(&["ex1", "ex2"], 1, 8), t0());
        let _ = m.log_set(8, t0());
        assert_eq!(m.tick(at(10_000)), Step::Applied);
        assert_eq!(m.state(), WorkoutState::Transitioning);
        assert_eq!(feedback.count(Cue::NextExercise), 1);
    }

    #[test]
    fn test_pause_and_resume_preserve_remaining() {
        let (mut m, _, _) = machine(instant());
        let _ = m.start(plan(&["ex1"], 2, 8), t0());
        let _ = m.log_set(8, t0());

        assert_eq!(m.pause(at(30)), Step::Applied);
        assert!(m.is_paused());
        assert!(m.pause(at(31)).is_ignored());

        // Long pause: still resting, countdown frozen
        assert!(m.tick(at(1000)).is_ignored());
        assert_eq!(m.state(), WorkoutState::Resting);
        assert_eq!(m.seconds_left(at(1000)), Some(60));

        assert_eq!(m.resume(at(1000)), Step::Applied);
        assert!(!m.is_paused());
        assert!(m.tick(at(1059)).is_ignored());
        assert_eq!(m.tick(at(1060)), Step::Applied);
        assert_eq!(m.state(), WorkoutState::Exercising);
    }

    #[test]
    fn test_skip_while_paused() {
        let (mut m, feedback, _) = machine(instant());
        let _ = m.start(plan(&["ex1"], 2, 8), t0());
        let _ = m.log_set(8, t0());
        let _ = m.pause(at(5));
        assert_eq!(m.skip(at(6)), Step::Applied);
        assert_eq!(m.state(), WorkoutState::Exercising);
        assert_eq!(m.set_index(), 1);
        assert_eq!(feedback.count(Cue::Skip), 1);
        assert_eq!(feedback.count(Cue::RestComplete), 0);
    }

    #[test]
    fn test_undo_returns_to_same_set() {
        let (mut m, feedback, _) = machine(instant());
        let _ = m.start(plan(&["ex1", "ex2"], 2, 8), t0());
        let _ = m.log_set(10, t0());
        let _ = m.skip(at(1));
        let _ = m.log_set(6, at(2));
        assert_eq!(m.state(), WorkoutState::Resting);

        assert_eq!(m.undo(at(3)), Step::Applied);
        assert_eq!(m.state(), WorkoutState::Exercising);
        assert_eq!(m.set_index(), 1);
        assert_eq!(m.session_reps()["ex1"], vec![10]);
        assert_eq!(m.seconds_left(at(3)), None);
        assert_eq!(feedback.count(Cue::Undo), 1);

        // Re-log and carry on normally
        let _ = m.log_set(9, at(4));
        assert_eq!(m.session_reps()["ex1"], vec![10, 9]);
        assert_eq!(m.undo(at(4)), Step::Applied);
    }

    #[test]
    fn test_undo_first_set_drops_empty_entry() {
        let (mut m, _, _) = machine(instant());
        let _ = m.start(plan(&["ex1"], 2, 8), t0());
        let _ = m.log_set(10, t0());
        let _ = m.undo(at(1));
        assert!(m.session_reps().is_empty());
        assert!(m.undo(at(2)).is_ignored());
    }

    #[test]
    fn test_auto_transition() {
        let pacing = Pacing {
            transition_seconds: 2,
            ..instant()
        };
        let (mut m, _, _) = machine(pacing);
        let _ = m.start(plan(&["ex1", "ex2"], 1, 8), t0());
        let _ = m.log_set(8, t0());
        let _ = m.skip(at(1));
        assert_eq!(m.state(), WorkoutState::Transitioning);
        assert!(m.tick(at(2)).is_ignored());
        assert_eq!(m.tick(at(3)), Step::Applied);
        assert_eq!(m.state(), WorkoutState::Exercising);
        assert_eq!(m.exercise_index(), 1);
    }

    #[test]
    fn test_quit_from_every_state() {
        let reach: [fn(&mut WorkoutMachine); 5] = [
            |_| {},
            |m| {
                let _ = m.start(plan(&["ex1", "ex2"], 1, 8), t0());
            },
            |m| {
                let _ = m.start(plan(&["ex1", "ex2"], 2, 8), t0());
                let _ = m.log_set(8, t0());
            },
            |m| {
                let _ = m.start(plan(&["ex1", "ex2"], 1, 8), t0());
                let _ = m.log_set(8, t0());
                let _ = m.skip(at(1));
            },
            |m| {
                let _ = m.start(plan(&["ex1"], 1, 8), t0());
                let _ = m.log_set(8, t0());
            },
        ];
        let expected = [
            WorkoutState::Idle,
            WorkoutState::Exercising,
            WorkoutState::Resting,
            WorkoutState::Transitioning,
            WorkoutState::Complete,
        ];

        for (setup, want) in reach.iter().zip(expected) {
            let (mut m, _, wake_lock) = machine(instant());
            setup(&mut m);
            assert_eq!(m.state(), want);

            let _ = m.quit();
            assert_eq!(m.state(), WorkoutState::Idle);
            assert!(m.session_reps().is_empty());
            assert_eq!(m.seconds_left(at(2)), None);
            assert!(m.plan().is_none());
            assert!(!wake_lock.is_held());
            // A stale tick after quitting does nothing
            assert!(m.tick(at(10_000)).is_ignored());
        }
    }

    #[test]
    fn test_events_ignored_in_wrong_state() {
        let (mut m, _, _) = machine(instant());
        assert!(m.log_set(8, t0()).is_ignored());
        assert!(m.skip(t0()).is_ignored());
        assert!(m.undo(t0()).is_ignored());
        assert!(m.pause(t0()).is_ignored());
        assert!(m.finish_transition(t0()).is_ignored());
        assert!(m.quit().is_ignored());

        let _ = m.start(plan(&["ex1"], 2, 8), t0());
        assert!(m.skip(t0()).is_ignored());
        assert!(m.undo(t0()).is_ignored());
        assert!(m.resume(t0()).is_ignored());
        assert!(m.finish_transition(t0()).is_ignored());
        assert_eq!(m.state(), WorkoutState::Exercising);
    }

    #[test]
    fn test_reps_never_exceed_sets() {
        let (mut m, _, _) = machine(instant());
        let _ = m.start(plan(&["ex1", "ex2"], 2, 8), t0());
        for i in 0..40 {
            let _ = m.log_set(8, at(i * 2));
            let _ = m.skip(at(i * 2 + 1));
            let _ = m.finish_transition(at(i * 2 + 1));
            for values in m.session_reps().values() {
                assert!(values.len() <= 2);
            }
        }
        assert_eq!(m.state(), WorkoutState::Complete);
    }

    #[test]
    fn test_extreme_pacing_does_not_overflow() {
        let config = SessionConfig {
            settle_millis: u64::MAX,
            flash_millis: u64::MAX,
            timer_speed: 1e-15,
            ..SessionConfig::default()
        };
        let (mut m, _, _) = machine(Pacing::from(&config));
        let _ = m.start(plan(&["ex1"], 1, 8), t0());
        assert_eq!(m.log_set(8, t0()), Step::Applied);
        // Settle never arrives, so the set stays pending
        assert!(m.tick(at(3600)).is_ignored());
        assert_eq!(m.state(), WorkoutState::Exercising);
        assert_eq!(m.session_reps()["ex1"], vec![8]);
    }

    #[test]
    fn test_snapshot() {
        let (mut m, _, _) = machine(instant());
        let _ = m.start(plan(&["ex1", "ex2"], 2, 11), t0());
        let _ = m.log_set(12, t0());
        let snap = m.snapshot(at(10));
        assert_eq!(snap.state, WorkoutState::Resting);
        assert_eq!(snap.exercise_count, 2);
        assert_eq!(snap.sets_per_exercise, 2);
        assert_eq!(snap.current_target, Some(11));
        assert_eq!(snap.seconds_left, Some(80));
        assert_eq!(snap.current_exercise.unwrap().key, "ex1");
        assert!(!snap.paused);
    }
}
