//! Core domain types for the TrainDaily system.
//!
//! This module defines the fundamental types used throughout the system:
//! - Workout types and exercise definitions
//! - Mobility drills for rest days
//! - Session records (the persisted outcome of one workout)
//! - Session outcomes handed back to front ends

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;

// ============================================================================
// Workout Types
// ============================================================================

/// Category of training scheduled for a date
#[derive(Clone, Copy, Debug, Serialize, Deserialize, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[serde(rename_all = "snake_case")]
pub enum WorkoutType {
    Push,
    Pull,
    Legs,
    Rest,
}

impl WorkoutType {
    /// All training types, in cycle order
    pub const TRAINING: [WorkoutType; 3] = [WorkoutType::Push, WorkoutType::Pull, WorkoutType::Legs];

    pub fn is_training(self) -> bool {
        self != WorkoutType::Rest
    }

    pub fn as_str(self) -> &'static str {
        match self {
            WorkoutType::Push => "push",
            WorkoutType::Pull => "pull",
            WorkoutType::Legs => "legs",
            WorkoutType::Rest => "rest",
        }
    }
}

impl fmt::Display for WorkoutType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Unit an exercise is measured in
#[derive(Clone, Copy, Debug, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum Unit {
    Reps,
    Seconds,
}

impl Unit {
    pub fn label(self) -> &'static str {
        match self {
            Unit::Reps => "reps",
            Unit::Seconds => "sec",
        }
    }
}

// ============================================================================
// Exercise Definitions
// ============================================================================

/// A static exercise definition (e.g., "TRX Row")
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
pub struct Exercise {
    pub key: String,
    pub name: String,
    pub unit: Unit,
    pub instruction: String,
    pub workout_type: WorkoutType,
    pub demo_ref: Option<String>,
}

/// A timed mobility drill performed on rest days
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
pub struct MobilityDrill {
    pub name: String,
    pub seconds: u32,
    /// Drill runs once per side (left, then right)
    pub sides: bool,
    pub instruction: String,
    pub demo_ref: Option<String>,
}

impl MobilityDrill {
    /// Total time the drill occupies, counting both sides
    pub fn total_seconds(&self) -> u32 {
        if self.sides {
            self.seconds * 2
        } else {
            self.seconds
        }
    }
}

// ============================================================================
// Session Records
// ============================================================================

/// The persisted outcome of one completed workout for one calendar date.
///
/// Wire shape (shared with the pairing collaborator):
///
/// ```json
/// { "<exercise_key>": [10, 8], "logged_at": "...", "week_number": 1, "workout_type": "push" }
/// ```
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq, Eq)]
pub struct SessionRecord {
    /// Logged values per exercise key, one entry per set in set order
    #[serde(flatten)]
    pub sets: BTreeMap<String, Vec<u32>>,
    #[serde(with = "iso_millis")]
    pub logged_at: DateTime<Utc>,
    pub week_number: u32,
    /// Missing on records written by older clients
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub workout_type: Option<WorkoutType>,
}

impl SessionRecord {
    /// Values logged for an exercise, if the record has any
    pub fn values(&self, exercise_key: &str) -> Option<&[u32]> {
        self.sets
            .get(exercise_key)
            .map(Vec::as_slice)
            .filter(|v| !v.is_empty())
    }

    /// Total number of sets across all exercises
    pub fn total_sets(&self) -> usize {
        self.sets.values().map(Vec::len).sum()
    }
}

/// ISO-8601 timestamps with millisecond precision and a `Z` suffix,
/// matching what the other clients write.
pub mod iso_millis {
    use chrono::{DateTime, SecondsFormat, Utc};
    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S>(dt: &DateTime<Utc>, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        serializer.serialize_str(&dt.to_rfc3339_opts(SecondsFormat::Millis, true))
    }

    pub fn deserialize<'de, D>(deserializer: D) -> Result<DateTime<Utc>, D::Error>
    where
        D: Deserializer<'de>,
    {
        let raw = String::deserialize(deserializer)?;
        DateTime::parse_from_rfc3339(&raw)
            .map(|dt| dt.with_timezone(&Utc))
            .map_err(serde::de::Error::custom)
    }
}

// ============================================================================
// Session Outcomes
// ============================================================================

/// Result of a finished session, one variant per session kind
#[derive(Clone, Debug, PartialEq)]
pub enum SessionOutcome {
    /// A strength workout that produced a persisted record
    Workout {
        date: NaiveDate,
        record: SessionRecord,
    },
    /// A rest-day mobility routine
    Mobility { date: NaiveDate, drills: usize },
}

impl SessionOutcome {
    pub fn date(&self) -> NaiveDate {
        match self {
            SessionOutcome::Workout { date, .. } => *date,
            SessionOutcome::Mobility { date, .. } => *date,
        }
    }

    /// The workout record, if this was a workout (None for mobility)
    pub fn as_workout(&self) -> Option<&SessionRecord> {
        match self {
            SessionOutcome::Workout { record, .. } => Some(record),
            SessionOutcome::Mobility { .. } => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn sample_record() -> SessionRecord {
        let mut sets = BTreeMap::new();
        sets.insert("trx_row".to_string(), vec![10, 8]);
        sets.insert("face_pull".to_string(), vec![12, 9]);
        SessionRecord {
            sets,
            logged_at: Utc.with_ymd_and_hms(2026, 2, 15, 10, 0, 0).unwrap(),
            week_number: 1,
            workout_type: Some(WorkoutType::Pull),
        }
    }

    #[test]
    fn test_record_wire_shape() {
        let json = serde_json::to_value(sample_record()).unwrap();
        assert_eq!(json["trx_row"], serde_json::json!([10, 8]));
        assert_eq!(json["logged_at"], "2026-02-15T10:00:00.000Z");
        assert_eq!(json["week_number"], 1);
        assert_eq!(json["workout_type"], "pull");
    }

    #[test]
    fn test_record_roundtrip_is_byte_identical() {
        let first = serde_json::to_string(&sample_record()).unwrap();
        let parsed: SessionRecord = serde_json::from_str(&first).unwrap();
        let second = serde_json::to_string(&parsed).unwrap();
        assert_eq!(first, second);
        assert_eq!(parsed, sample_record());
    }

    #[test]
    fn test_legacy_record_without_workout_type() {
        let json = r#"{"pushup":[10,8],"logged_at":"2026-02-15T10:00:00Z","week_number":2}"#;
        let record: SessionRecord = serde_json::from_str(json).unwrap();
        assert_eq!(record.values("pushup"), Some(&[10, 8][..]));
        assert_eq!(record.week_number, 2);
        assert!(record.workout_type.is_none());
    }

    #[test]
    fn test_empty_values_are_treated_as_missing() {
        let mut record = sample_record();
        record.sets.insert("calf_raise".into(), vec![]);
        assert!(record.values("calf_raise").is_none());
        assert_eq!(record.total_sets(), 4);
    }

    #[test]
    fn test_drill_total_seconds() {
        let drill = MobilityDrill {
            name: "HIP FLEXOR STRETCH".into(),
            seconds: 60,
            sides: true,
            instruction: String::new(),
            demo_ref: None,
        };
        assert_eq!(drill.total_seconds(), 120);
    }
}
