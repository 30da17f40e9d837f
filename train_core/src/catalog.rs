//! Default catalog of exercises and mobility drills.
//!
//! This module provides the built-in push/pull/legs exercises, the
//! rest-day mobility routine and the rotating micro-break drills.

use crate::types::*;
use once_cell::sync::Lazy;
use std::collections::HashSet;

/// Cached default catalog - built once and reused across all operations
static DEFAULT_CATALOG: Lazy<Catalog> = Lazy::new(build_default_catalog);

/// Get a reference to the cached default catalog
pub fn default_catalog() -> &'static Catalog {
    &DEFAULT_CATALOG
}

/// The complete catalog of exercises and mobility drills
#[derive(Clone, Debug)]
pub struct Catalog {
    /// Exercises in session order (push block, pull block, legs block)
    pub exercises: Vec<Exercise>,
    pub mobility: Vec<MobilityDrill>,
    /// Short standalone drills, taken one at a time in rotation
    pub micro_breaks: Vec<MobilityDrill>,
}

impl Catalog {
    /// Exercises performed on a given workout type, in session order
    pub fn exercises_for(&self, workout_type: WorkoutType) -> Vec<Exercise> {
        self.exercises
            .iter()
            .filter(|e| e.workout_type == workout_type)
            .cloned()
            .collect()
    }

    pub fn get(&self, key: &str) -> Option<&Exercise> {
        self.exercises.iter().find(|e| e.key == key)
    }

    /// Total mobility routine length in seconds, both sides included
    pub fn mobility_total_seconds(&self) -> u32 {
        self.mobility.iter().map(MobilityDrill::total_seconds).sum()
    }

    /// Micro-break for a rotation counter; wraps around the list
    pub fn next_micro_break(&self, index: usize) -> Option<&MobilityDrill> {
        if self.micro_breaks.is_empty() {
            return None;
        }
        self.micro_breaks.get(index % self.micro_breaks.len())
    }

    /// Validate the catalog and return every problem found
    pub fn validate(&self) -> Vec<String> {
        let mut errors = Vec::new();
        let mut seen = HashSet::new();

        for exercise in &self.exercises {
            if !seen.insert(exercise.key.as_str()) {
                errors.push(format!("Duplicate exercise key '{}'", exercise.key));
            }
            if exercise.name.trim().is_empty() {
                errors.push(format!("Exercise '{}' has an empty name", exercise.key));
            }
            if !exercise.workout_type.is_training() {
                errors.push(format!("Exercise '{}' is filed under rest", exercise.key));
            }
        }

        for workout_type in WorkoutType::TRAINING {
            if !self.exercises.iter().any(|e| e.workout_type == workout_type) {
                errors.push(format!("Catalog has no {} exercises", workout_type));
            }
        }

        for drill in &self.mobility {
            if drill.seconds == 0 {
                errors.push(format!("Mobility drill '{}' has zero duration", drill.name));
            }
        }

        for drill in &self.micro_breaks {
            if drill.seconds == 0 {
                errors.push(format!("Micro-break '{}' has zero duration", drill.name));
            }
            if drill.sides {
                errors.push(format!("Micro-break '{}' cannot be split by side", drill.name));
            }
        }

        errors
    }
}

fn exercise(
    key: &str,
    name: &str,
    workout_type: WorkoutType,
    instruction: &str,
    demo_ref: &str,
) -> Exercise {
    Exercise {
        key: key.into(),
        name: name.into(),
        unit: Unit::Reps,
        instruction: instruction.into(),
        workout_type,
        demo_ref: Some(format!("https://www.youtube.com/watch?v={}", demo_ref)),
    }
}

fn drill(name: &str, sides: bool, instruction: &str) -> MobilityDrill {
    MobilityDrill {
        name: name.into(),
        seconds: 60,
        sides,
        instruction: instruction.into(),
        demo_ref: None,
    }
}

fn micro_break(name: &str, instruction: &str, demo_ref: &str) -> MobilityDrill {
    MobilityDrill {
        name: name.into(),
        seconds: 120,
        sides: false,
        instruction: instruction.into(),
        demo_ref: Some(format!("https://www.youtube.com/watch?v={}", demo_ref)),
    }
}

/// Builds the default catalog
///
/// **Note**: For production use, prefer `default_catalog()` which returns a
/// cached reference.
pub fn build_default_catalog() -> Catalog {
    use WorkoutType::*;

    let exercises = vec![
        // ====================================================================
        // Push
        // ====================================================================
        exercise(
            "trx_pushup",
            "TRX PUSH-UP",
            Push,
            "Hands in TRX handles, body straight. Lower chest between handles, press back up.",
            "IODxDxX7oi4",
        ),
        exercise(
            "pike_pushup",
            "PIKE PUSH-UP",
            Push,
            "Pike position, hips high. Bend elbows, lower head toward floor. Press back up.",
            "FnQYhyUzVpQ",
        ),
        exercise(
            "tricep_extension",
            "TRX TRICEP EXTENSION",
            Push,
            "Face away from anchor, arms extended. Bend elbows, lower body. Keep elbows tight.",
            "zgZ7_o5aYlw",
        ),
        exercise(
            "regular_pushup",
            "REGULAR PUSH-UP",
            Push,
            "Hands shoulder-width, body straight. Lower chest to floor, elbows at 45 degrees.",
            "IODxDxX7oi4",
        ),
        // ====================================================================
        // Pull
        // ====================================================================
        exercise(
            "trx_row",
            "TRX ROW",
            Pull,
            "Hang under TRX, body straight. Pull chest to handles, squeeze shoulder blades.",
            "FyXAZW5zDhw",
        ),
        exercise(
            "face_pull",
            "TRX FACE PULL",
            Pull,
            "Lean back holding TRX. Pull handles to face, elbows high and wide.",
            "zgZ7_o5aYlw",
        ),
        exercise(
            "bicep_curl",
            "TRX BICEP CURL",
            Pull,
            "Lean back, palms up. Curl handles to shoulders, keep elbows high.",
            "fZjzpiOJjpg",
        ),
        exercise(
            "inverted_row",
            "INVERTED ROW",
            Pull,
            "Under TRX, feet forward. Pull chest to handles, body straight.",
            "FyXAZW5zDhw",
        ),
        // ====================================================================
        // Legs
        // ====================================================================
        exercise(
            "bulgarian_split_squat",
            "BULGARIAN SPLIT SQUAT",
            Legs,
            "Rear foot elevated. Lower front knee to 90 degrees. Do all reps, switch legs.",
            "FyXAZW5zDhw",
        ),
        exercise(
            "pistol_squat_progression",
            "PISTOL SQUAT PROGRESSION",
            Legs,
            "One leg, hold TRX for balance. Lower slowly, press back up.",
            "fZjzpiOJjpg",
        ),
        exercise(
            "trx_hamstring_curl",
            "TRX HAMSTRING CURL",
            Legs,
            "Heels in TRX cradles, face up. Lift hips, curl heels to glutes.",
            "FnQYhyUzVpQ",
        ),
        exercise(
            "calf_raise",
            "CALF RAISE",
            Legs,
            "Stand on edge of step. Raise up on toes, lower heels below step.",
            "zgZ7_o5aYlw",
        ),
    ];

    let mobility = vec![
        drill("CAT-COW (DYNAMIC)", false, "On hands and knees. Arch, then round the spine. 20 slow reps."),
        drill("HIP FLEXOR STRETCH", true, "Kneel on one knee, push hips forward. Pulse 10x, then hold 20s."),
        drill("THORACIC ROTATION", true, "On all fours, hand behind head. Rotate open 15x."),
        drill("SCAPULAR CARS", false, "Standing. Shoulder blades up, back, down, forward. 10 circles each way."),
        drill("WRIST & ANKLE CIRCLES", false, "10 circles each wrist and ankle, both directions."),
        drill("DEEP SQUAT HOLD", false, "Deep squat, heels down if possible. Hold 30s, stand, repeat."),
        drill("CHEST OPENER (DYNAMIC)", false, "Clasp hands behind back. Lift arms 20x, then doorway pulses."),
    ];

    let micro_breaks = vec![
        micro_break(
            "WALL SLIDES",
            "Back against wall, arms at 90 degrees. Slide up and down slowly.",
            "oMSVe7PWJ3o",
        ),
        micro_break(
            "THORACIC ROTATION",
            "On all fours, hand behind head. Rotate open. Alternate sides.",
            "QWwiOHexU8I",
        ),
        micro_break(
            "HIP FLEXOR STRETCH",
            "Kneel on one knee, push hips forward. 60s each side.",
            "iZ1eZBY4fwM",
        ),
        micro_break(
            "CHEST DOORWAY STRETCH",
            "Arms on doorframe at 90 degrees. Lean through and hold.",
            "8wiZpixdHPU",
        ),
    ];

    Catalog {
        exercises,
        mobility,
        micro_breaks,
    }
}
