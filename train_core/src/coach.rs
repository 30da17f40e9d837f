//! Coach: the async driver around the session machine.
//!
//! The coach owns the [`WorkoutMachine`], the [`MobilityFlow`] and the
//! injected collaborators. Event methods are synchronous and read `now` from
//! the clock; completion never waits on storage. A finished session is queued
//! and written by [`Coach::persist_pending`], whose result lands in
//! [`SaveStatus`] instead of failing the session.

use crate::catalog::{default_catalog, Catalog};
use crate::feedback::{Feedback, NoFeedback, NoWakeLock, WakeLock};
use crate::mobility::{MobilityFlow, MobilityState, MobilityStep};
use crate::progression::{
    compute_targets, previous_value, sets_per_week, should_increase_difficulty,
};
use crate::schedule::{week_number, weekly_stats, Schedule, WeekProgress, WeeklyStats};
use crate::session::{Pacing, PlannedExercise, SessionPlan, Snapshot, Step, WorkoutMachine, WorkoutState};
use crate::storage::StorageAdapter;
use crate::timer::{Clock, SystemClock};
use crate::{Config, Exercise, MobilityDrill, Result, SessionOutcome, WorkoutHistory, WorkoutType};
use chrono::{DateTime, NaiveDate, Utc};

/// Outcome of the most recent write
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum SaveStatus {
    Idle,
    /// A finished session is waiting for `persist_pending`
    Pending,
    Saved,
    Failed(String),
}

/// Result of asking the coach to start today's workout
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum StartOutcome {
    Started,
    RestDay,
    /// A workout or mobility routine is already running
    Busy,
}

/// One exercise as shown on the day overview
#[derive(Clone, Debug, PartialEq)]
pub struct ExerciseTarget {
    pub exercise: Exercise,
    pub targets: Vec<u32>,
    /// Values from the most recent earlier session that logged this exercise
    pub previous: Option<Vec<u32>>,
    pub increase_difficulty: bool,
}

/// Everything the "today" screen shows
#[derive(Clone, Debug, PartialEq)]
pub struct DayOverview {
    pub date: NaiveDate,
    pub workout_type: WorkoutType,
    pub week_number: u32,
    pub sets_per_exercise: usize,
    pub exercises: Vec<ExerciseTarget>,
    pub done: bool,
    pub week_progress: WeekProgress,
    pub streak: u32,
    pub weekly: WeeklyStats,
    pub next_training_day: Option<NaiveDate>,
    pub mobility_done: bool,
}

pub struct Coach<S: StorageAdapter> {
    config: Config,
    storage: S,
    clock: Box<dyn Clock>,
    schedule: Schedule,
    catalog: Catalog,
    machine: WorkoutMachine,
    mobility: MobilityFlow,
    mobility_date: Option<NaiveDate>,

    history: WorkoutHistory,
    first_session_date: Option<NaiveDate>,

    pending: Option<SessionOutcome>,
    save_status: SaveStatus,
    last_outcome: Option<SessionOutcome>,
}

impl<S: StorageAdapter> Coach<S> {
    /// Coach with silent feedback, no wake lock and the system clock
    pub fn new(config: Config, storage: S) -> Result<Self> {
        Self::with_collaborators(
            config,
            storage,
            Box::new(NoFeedback),
            Box::new(NoWakeLock),
            Box::new(SystemClock),
        )
    }

    pub fn with_collaborators(
        config: Config,
        storage: S,
        feedback: Box<dyn Feedback>,
        wake_lock: Box<dyn WakeLock>,
        clock: Box<dyn Clock>,
    ) -> Result<Self> {
        config.validate()?;
        let schedule = Schedule::from_config(&config.schedule)?;
        let catalog = default_catalog().clone();
        let machine = WorkoutMachine::new(Pacing::from(&config.session), feedback, wake_lock);
        let mobility = MobilityFlow::new(catalog.mobility.clone(), config.session.timer_speed);

        Ok(Self {
            config,
            storage,
            clock,
            schedule,
            catalog,
            machine,
            mobility,
            mobility_date: None,
            history: WorkoutHistory::new(),
            first_session_date: None,
            pending: None,
            save_status: SaveStatus::Idle,
            last_outcome: None,
        })
    }

    /// Replace the exercise catalog (only while nothing is running)
    pub fn with_catalog(mut self, catalog: Catalog) -> Self {
        self.mobility = MobilityFlow::new(catalog.mobility.clone(), self.config.session.timer_speed);
        self.catalog = catalog;
        self
    }

    // ------------------------------------------------------------------------
    // Accessors
    // ------------------------------------------------------------------------

    pub fn config(&self) -> &Config {
        &self.config
    }

    pub fn storage(&self) -> &S {
        &self.storage
    }

    pub fn schedule(&self) -> &Schedule {
        &self.schedule
    }

    pub fn catalog(&self) -> &Catalog {
        &self.catalog
    }

    pub fn history(&self) -> &WorkoutHistory {
        &self.history
    }

    pub fn first_session_date(&self) -> Option<NaiveDate> {
        self.first_session_date
    }

    pub fn now(&self) -> DateTime<Utc> {
        self.clock.now()
    }

    pub fn state(&self) -> WorkoutState {
        self.machine.state()
    }

    pub fn machine(&self) -> &WorkoutMachine {
        &self.machine
    }

    pub fn snapshot(&self) -> Snapshot {
        self.machine.snapshot(self.clock.now())
    }

    pub fn mobility(&self) -> &MobilityFlow {
        &self.mobility
    }

    pub fn save_status(&self) -> &SaveStatus {
        &self.save_status
    }

    pub fn has_pending(&self) -> bool {
        self.pending.is_some()
    }

    /// The most recently finished session, saved or not
    pub fn last_outcome(&self) -> Option<&SessionOutcome> {
        self.last_outcome.as_ref()
    }

    /// Value logged for the current set in the previous session
    pub fn previous_for_current_set(&self) -> Option<u32> {
        let plan = self.machine.plan()?;
        let planned = self.machine.current_exercise()?;
        previous_value(
            &planned.exercise.key,
            self.machine.set_index(),
            plan.date,
            &self.history,
        )
    }

    // ------------------------------------------------------------------------
    // Loading and planning
    // ------------------------------------------------------------------------

    /// Reload history and the first-session marker from storage
    ///
    /// Read failures leave an empty history and no first date.
    pub async fn refresh(&mut self) {
        self.history = match self.storage.load_history().await {
            Ok(history) => history,
            Err(e) => {
                tracing::warn!("Failed to load history: {}. Continuing with none.", e);
                WorkoutHistory::new()
            }
        };
        self.first_session_date = match self.storage.first_session_date().await {
            Ok(date) => date,
            Err(e) => {
                tracing::warn!("Failed to load first session date: {}", e);
                None
            }
        };
        tracing::debug!(
            "Loaded {} sessions, first session {:?}",
            self.history.len(),
            self.first_session_date
        );
    }

    pub fn week_number(&self, today: NaiveDate) -> u32 {
        week_number(self.first_session_date, today)
    }

    /// Session plan for a date from the cached history; None on rest days
    pub fn plan_for(&self, today: NaiveDate) -> Option<SessionPlan> {
        let workout_type = self.schedule.workout_type_for_date(today);
        if !workout_type.is_training() {
            return None;
        }

        let week = self.week_number(today);
        let progression = &self.config.progression;
        let exercises: Vec<PlannedExercise> = self
            .catalog
            .exercises_for(workout_type)
            .into_iter()
            .map(|exercise| {
                let targets = compute_targets(
                    progression,
                    &exercise.key,
                    exercise.unit,
                    week,
                    today,
                    &self.history,
                );
                PlannedExercise { exercise, targets }
            })
            .collect();

        if exercises.is_empty() {
            tracing::warn!("No exercises in the catalog for {}", workout_type);
            return None;
        }

        Some(SessionPlan {
            date: today,
            workout_type,
            week_number: week,
            sets_per_exercise: sets_per_week(progression, week),
            exercises,
        })
    }

    pub async fn overview(&self, today: NaiveDate) -> DayOverview {
        let workout_type = self.schedule.workout_type_for_date(today);
        let week = self.week_number(today);
        let progression = &self.config.progression;

        let exercises = self
            .plan_for(today)
            .map(|plan| plan.exercises)
            .unwrap_or_default()
            .into_iter()
            .map(|planned| {
                let key = &planned.exercise.key;
                ExerciseTarget {
                    previous: self
                        .history
                        .previous_with(key, today)
                        .map(|(_, values)| values.to_vec()),
                    increase_difficulty: should_increase_difficulty(
                        progression,
                        key,
                        planned.exercise.unit,
                        &self.history,
                    ),
                    exercise: planned.exercise,
                    targets: planned.targets,
                }
            })
            .collect();

        let mobility_done = if workout_type.is_training() {
            false
        } else {
            self.storage.mobility_done(today).await.unwrap_or_else(|e| {
                tracing::warn!("Failed to read mobility marker: {}", e);
                false
            })
        };

        DayOverview {
            date: today,
            workout_type,
            week_number: week,
            sets_per_exercise: sets_per_week(progression, week),
            exercises,
            done: self.history.is_logged(today),
            week_progress: self.schedule.week_progress(today, &self.history),
            streak: self.schedule.training_streak(today, &self.history),
            weekly: weekly_stats(&self.history, today),
            next_training_day: self.schedule.next_training_day(today),
            mobility_done,
        }
    }

    // ------------------------------------------------------------------------
    // Workout events
    // ------------------------------------------------------------------------

    pub fn start(&mut self, today: NaiveDate) -> StartOutcome {
        if self.machine.state() != WorkoutState::Idle
            || self.mobility.state() == MobilityState::Active
        {
            return StartOutcome::Busy;
        }
        let Some(plan) = self.plan_for(today) else {
            return StartOutcome::RestDay;
        };
        if self.history.is_logged(today) {
            tracing::info!("{} already logged; a new session will replace it", today);
        }

        match self.machine.start(plan, self.clock.now()) {
            Step::Ignored => StartOutcome::Busy,
            _ => StartOutcome::Started,
        }
    }

    pub fn log_set(&mut self, value: u32) -> Step {
        let step = self.machine.log_set(value, self.clock.now());
        self.track(step)
    }

    /// Periodic tick for the workout
    pub fn tick(&mut self) -> Step {
        let step = self.machine.tick(self.clock.now());
        self.track(step)
    }

    pub fn pause(&mut self) -> Step {
        self.machine.pause(self.clock.now())
    }

    pub fn resume(&mut self) -> Step {
        self.machine.resume(self.clock.now())
    }

    pub fn skip(&mut self) -> Step {
        let step = self.machine.skip(self.clock.now());
        self.track(step)
    }

    pub fn undo(&mut self) -> Step {
        self.machine.undo(self.clock.now())
    }

    pub fn finish_transition(&mut self) -> Step {
        self.machine.finish_transition(self.clock.now())
    }

    /// Abandon the active workout; an already finished one stays queued
    pub fn quit(&mut self) -> Step {
        self.machine.quit()
    }

    /// Leave the completion screen
    pub fn done(&mut self) -> Step {
        if self.machine.state() != WorkoutState::Complete {
            return Step::Ignored;
        }
        self.machine.quit()
    }

    /// Host regained visibility: recompute every countdown from its deadline
    pub fn on_foreground(&mut self) -> Step {
        let _ = self.mobility_tick();
        self.tick()
    }

    fn track(&mut self, step: Step) -> Step {
        if let Step::Completed(record) = &step {
            let date = self
                .machine
                .plan()
                .map(|p| p.date)
                .unwrap_or_else(|| self.clock.now().date_naive());
            self.queue(SessionOutcome::Workout {
                date,
                record: record.clone(),
            });
        }
        step
    }

    fn queue(&mut self, outcome: SessionOutcome) {
        self.last_outcome = Some(outcome.clone());
        self.pending = Some(outcome);
        self.save_status = SaveStatus::Pending;
    }

    // ------------------------------------------------------------------------
    // Mobility events
    // ------------------------------------------------------------------------

    pub fn start_mobility(&mut self, today: NaiveDate) -> MobilityStep {
        if matches!(
            self.machine.state(),
            WorkoutState::Exercising | WorkoutState::Resting | WorkoutState::Transitioning
        ) {
            return MobilityStep::Ignored;
        }
        let step = self.mobility.start(self.clock.now());
        if !matches!(step, MobilityStep::Ignored) {
            self.mobility_date = Some(today);
        }
        self.track_mobility(step)
    }

    pub fn mobility_tick(&mut self) -> MobilityStep {
        let step = self.mobility.tick(self.clock.now());
        self.track_mobility(step)
    }

    pub fn mobility_skip(&mut self) -> MobilityStep {
        let step = self.mobility.skip(self.clock.now());
        self.track_mobility(step)
    }

    pub fn mobility_pause(&mut self) -> MobilityStep {
        self.mobility.pause(self.clock.now())
    }

    pub fn mobility_resume(&mut self) -> MobilityStep {
        self.mobility.resume(self.clock.now())
    }

    pub fn mobility_quit(&mut self) -> MobilityStep {
        self.mobility_date = None;
        self.mobility.quit()
    }

    fn track_mobility(&mut self, step: MobilityStep) -> MobilityStep {
        if let MobilityStep::Completed { drills } = step {
            let date = self
                .mobility_date
                .unwrap_or_else(|| self.clock.now().date_naive());
            self.queue(SessionOutcome::Mobility { date, drills });
        }
        step
    }

    // ------------------------------------------------------------------------
    // Persistence
    // ------------------------------------------------------------------------

    /// Write the queued outcome, if any
    ///
    /// Workout order: save the session, set the first-session date (first
    /// write wins), then reload history. Failures are logged and recorded in
    /// [`SaveStatus::Failed`]; the session itself stays finished.
    pub async fn persist_pending(&mut self) -> &SaveStatus {
        let Some(outcome) = self.pending.take() else {
            return &self.save_status;
        };

        self.save_status = match &outcome {
            SessionOutcome::Workout { date, record } => {
                match self.storage.save_session(*date, record).await {
                    Ok(()) => {
                        if let Err(e) = self.storage.set_first_session_date(*date).await {
                            tracing::warn!("Failed to record first session date: {}", e);
                        }
                        self.first_session_date.get_or_insert(*date);
                        self.reload_history().await;
                        if !self.history.is_logged(*date) {
                            self.history.insert(*date, record.clone());
                        }
                        tracing::info!("Saved session for {}", date);
                        SaveStatus::Saved
                    }
                    Err(e) => {
                        tracing::warn!("Failed to save session for {}: {}", date, e);
                        SaveStatus::Failed(e.to_string())
                    }
                }
            }
            SessionOutcome::Mobility { date, .. } => {
                match self.storage.set_mobility_done(*date).await {
                    Ok(()) => SaveStatus::Saved,
                    Err(e) => {
                        tracing::warn!("Failed to mark mobility done for {}: {}", date, e);
                        SaveStatus::Failed(e.to_string())
                    }
                }
            }
        };

        &self.save_status
    }

    /// Queue the last outcome again after a failed save
    pub fn retry_save(&mut self) -> bool {
        if !matches!(self.save_status, SaveStatus::Failed(_)) {
            return false;
        }
        match self.last_outcome.clone() {
            Some(outcome) => {
                self.queue(outcome);
                true
            }
            None => false,
        }
    }

    /// Next drill in the micro-break rotation, advancing the stored index
    ///
    /// Storage failures are logged; the rotation then restarts or stays put.
    pub async fn take_micro_break(&self) -> Option<MobilityDrill> {
        let count = self.catalog.micro_breaks.len();
        let index = self.storage.break_index().await.unwrap_or_else(|e| {
            tracing::warn!("Failed to read micro-break index: {}", e);
            0
        });
        let drill = self.catalog.next_micro_break(index as usize)?.clone();
        let next = (index as usize % count + 1) % count;
        if let Err(e) = self.storage.set_break_index(next as u32).await {
            tracing::warn!("Failed to store micro-break index: {}", e);
        }
        Some(drill)
    }

    async fn reload_history(&mut self) {
        match self.storage.load_history().await {
            Ok(history) => self.history = history,
            Err(e) => tracing::warn!("Failed to reload history after save: {}", e),
        }
    }
}
