//! Progression logic for computing set targets.
//!
//! The rule is a monotone ratchet over the previous session for the same
//! exercise:
//! - No prior data: the configured starting target
//! - Every prior set at or above the ceiling: back to the start (time for a
//!   harder variation, which the user picks manually)
//! - Otherwise: floor(average of prior sets) + increment, clamped to
//!   [floor, ceiling]
//!
//! Every set in a session shares the one computed target.

use crate::config::ProgressionConfig;
use crate::{Unit, WorkoutHistory};
use chrono::NaiveDate;

/// Number of sets per exercise for a training week
///
/// A step function: `sets_before` up to and including `threshold_week`,
/// `sets_after` from then on.
pub fn sets_per_week(config: &ProgressionConfig, week_number: u32) -> usize {
    if week_number <= config.threshold_week {
        config.sets_before
    } else {
        config.sets_after
    }
}

/// Compute the target for every set of an exercise today
///
/// Looks at the most recent session strictly before `today` that logged this
/// exercise. The returned list always has `sets_per_week(week_number)` entries.
pub fn compute_targets(
    config: &ProgressionConfig,
    exercise_key: &str,
    unit: Unit,
    week_number: u32,
    today: NaiveDate,
    history: &WorkoutHistory,
) -> Vec<u32> {
    let sets = sets_per_week(config, week_number);
    let bounds = config.bounds(unit);

    let Some((prev_date, prev)) = history.previous_with(exercise_key, today) else {
        tracing::debug!("{}: no prior data, starting at {}", exercise_key, bounds.start);
        return vec![bounds.start; sets];
    };

    if prev.iter().all(|v| *v >= bounds.ceiling) {
        tracing::debug!(
            "{}: all sets on {} reached ceiling {}, resetting to {}",
            exercise_key,
            prev_date,
            bounds.ceiling,
            bounds.start
        );
        return vec![bounds.start; sets];
    }

    let sum: u64 = prev.iter().map(|v| u64::from(*v)).sum();
    let average = (sum / prev.len() as u64) as u32;
    let target = average
        .saturating_add(config.increment)
        .clamp(bounds.floor, bounds.ceiling);

    tracing::debug!(
        "{}: prior average {} on {}, target {} x {}",
        exercise_key,
        average,
        prev_date,
        target,
        sets
    );
    vec![target; sets]
}

/// Whether the latest session for this exercise hit the ceiling on every set
///
/// Scans history newest first; false when the exercise was never logged.
pub fn should_increase_difficulty(
    config: &ProgressionConfig,
    exercise_key: &str,
    unit: Unit,
    history: &WorkoutHistory,
) -> bool {
    let ceiling = config.bounds(unit).ceiling;
    history
        .latest_with(exercise_key)
        .is_some_and(|(_, values)| values.iter().all(|v| *v >= ceiling))
}

/// Value logged for the same set in the most recent prior session
pub fn previous_value(
    exercise_key: &str,
    set_index: usize,
    today: NaiveDate,
    history: &WorkoutHistory,
) -> Option<u32> {
    history
        .previous_with(exercise_key, today)
        .and_then(|(_, values)| values.get(set_index).copied())
}

/// How a logged value compares to the previous session's value
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Comparison {
    Improved { previous: u32 },
    Decreased { previous: u32 },
    Same { previous: u32 },
    None,
}

pub fn compare(current: u32, previous: Option<u32>) -> Comparison {
    match previous {
        None => Comparison::None,
        Some(previous) if current > previous => Comparison::Improved { previous },
        Some(previous) if current < previous => Comparison::Decreased { previous },
        Some(previous) => Comparison::Same { previous },
    }
}
