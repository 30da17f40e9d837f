//! Schedule calculator: which workout falls on which date.
//!
//! All functions here are pure. Dates are calendar days in the user's local
//! time zone; no normalization happens beyond `YYYY-MM-DD` formatting.

use crate::config::ScheduleConfig;
use crate::{Error, Result, WorkoutHistory, WorkoutType};
use chrono::{Datelike, Duration, NaiveDate};

/// Upper bound for backward streak scans
const STREAK_LOOKBACK_DAYS: u32 = 365;

/// Format a date as a `YYYY-MM-DD` key
pub fn date_key(date: NaiveDate) -> String {
    date.format("%Y-%m-%d").to_string()
}

/// Parse a strict `YYYY-MM-DD` key
pub fn parse_date_key(key: &str) -> Result<NaiveDate> {
    let bytes = key.as_bytes();
    if bytes.len() != 10 || bytes[4] != b'-' || bytes[7] != b'-' {
        return Err(Error::InvalidDateKey(key.to_string()));
    }
    NaiveDate::parse_from_str(key, "%Y-%m-%d").map_err(|_| Error::InvalidDateKey(key.to_string()))
}

/// Monday of the week containing `date`
pub fn week_start(date: NaiveDate) -> NaiveDate {
    date - Duration::days(date.weekday().num_days_from_monday() as i64)
}

/// Training week number since the first logged session (1-based)
///
/// `max(1, floor(weeks_between(first, today)) + 1)`; week 1 when nothing has
/// been logged yet.
pub fn week_number(first_session: Option<NaiveDate>, today: NaiveDate) -> u32 {
    let Some(first) = first_session else {
        return 1;
    };
    // Truncates toward zero, so a first date in the future still lands on week 1
    let weeks = (today - first).num_days() / 7;
    (weeks + 1).max(1) as u32
}

/// Completed vs. scheduled training days for one week
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct WeekProgress {
    pub completed: usize,
    pub total: usize,
}

/// Summary of one Monday-start week
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct WeeklyStats {
    pub sessions_completed: usize,
    pub total_sets: usize,
    /// Session difference versus the previous week; None if that week was empty
    pub vs_last_week: Option<i64>,
}

/// A repeating workout cycle anchored on a Monday
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Schedule {
    cycle: Vec<WorkoutType>,
}

impl Default for Schedule {
    fn default() -> Self {
        Self {
            cycle: ScheduleConfig::default().cycle,
        }
    }
}

impl Schedule {
    pub fn new(cycle: Vec<WorkoutType>) -> Result<Self> {
        if cycle.is_empty() {
            return Err(Error::Config("schedule cycle must not be empty".into()));
        }
        Ok(Self { cycle })
    }

    pub fn from_config(config: &ScheduleConfig) -> Result<Self> {
        Self::new(config.cycle.clone())
    }

    pub fn cycle_len(&self) -> usize {
        self.cycle.len()
    }

    /// Workout type scheduled for a date
    pub fn workout_type_for_date(&self, date: NaiveDate) -> WorkoutType {
        // 2024-01-01 is a Monday
        let anchor = NaiveDate::from_ymd_opt(2024, 1, 1).unwrap_or(NaiveDate::MIN);
        let offset = (date - anchor).num_days();
        let index = offset.rem_euclid(self.cycle.len() as i64) as usize;
        self.cycle[index]
    }

    pub fn is_training_day(&self, date: NaiveDate) -> bool {
        self.workout_type_for_date(date).is_training()
    }

    /// Earliest training day strictly after `date`
    ///
    /// Returns None when the cycle contains no training days at all.
    pub fn next_training_day(&self, date: NaiveDate) -> Option<NaiveDate> {
        (1..=self.cycle.len() as i64)
            .map(|n| date + Duration::days(n))
            .find(|d| self.is_training_day(*d))
    }

    /// Number of scheduled training days in the Monday-start week of `date`
    pub fn training_days_in_week(&self, date: NaiveDate) -> usize {
        let start = week_start(date);
        (0..7)
            .filter(|i| self.is_training_day(start + Duration::days(*i)))
            .count()
    }

    /// Training days completed in the Monday-start week containing `date`
    pub fn week_progress(&self, date: NaiveDate, history: &WorkoutHistory) -> WeekProgress {
        let start = week_start(date);
        let completed = (0..7)
            .map(|i| start + Duration::days(i))
            .filter(|d| self.is_training_day(*d) && history.is_logged(*d))
            .count();

        WeekProgress {
            completed,
            total: self.training_days_in_week(date),
        }
    }

    /// Consecutive logged training days before `date`
    ///
    /// Walks backward from the day before `date`. Rest days neither break nor
    /// extend the streak; the first unlogged training day ends it.
    pub fn training_streak(&self, date: NaiveDate, history: &WorkoutHistory) -> u32 {
        let mut streak = 0;
        let mut check = date - Duration::days(1);

        for _ in 0..STREAK_LOOKBACK_DAYS {
            if self.is_training_day(check) {
                if !history.is_logged(check) {
                    break;
                }
                streak += 1;
            }
            check -= Duration::days(1);
        }

        streak
    }
}

/// Sessions and sets logged in the week containing `date`
pub fn weekly_stats(history: &WorkoutHistory, date: NaiveDate) -> WeeklyStats {
    let start = week_start(date);
    let count_week = |from: NaiveDate| {
        (0..7)
            .filter_map(|i| history.get(from + Duration::days(i)))
            .fold((0usize, 0usize), |(sessions, sets), r| {
                (sessions + 1, sets + r.total_sets())
            })
    };

    let (sessions_completed, total_sets) = count_week(start);
    let (previous_sessions, _) = count_week(start - Duration::days(7));

    WeeklyStats {
        sessions_completed,
        total_sets,
        vs_last_week: (previous_sessions > 0)
            .then(|| sessions_completed as i64 - previous_sessions as i64),
    }
}
