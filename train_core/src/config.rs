//! Configuration file support for TrainDaily.
//!
//! Configuration is loaded from `$XDG_CONFIG_HOME/traindaily/config.toml`.
//! Every section is optional; missing values fall back to defaults.

use crate::{Error, Result, Unit, WorkoutType};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Accepted range for `session.timer_speed`
pub const TIMER_SPEED_RANGE: std::ops::RangeInclusive<f64> = 0.01..=1000.0;
const MAX_REST_SECONDS: u64 = 3600;
const MAX_TRANSITION_SECONDS: u64 = 600;
const MAX_FEEDBACK_MILLIS: u64 = 10_000;

/// Application configuration
#[derive(Clone, Debug, Serialize, Deserialize, Default, PartialEq)]
pub struct Config {
    #[serde(default)]
    pub data: DataConfig,

    #[serde(default)]
    pub schedule: ScheduleConfig,

    #[serde(default)]
    pub progression: ProgressionConfig,

    #[serde(default)]
    pub session: SessionConfig,
}

/// Data storage configuration
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
pub struct DataConfig {
    #[serde(default = "default_data_dir")]
    pub data_dir: PathBuf,
}

impl Default for DataConfig {
    fn default() -> Self {
        Self {
            data_dir: default_data_dir(),
        }
    }
}

/// Weekly training cycle
///
/// `cycle[0]` falls on a Monday; the cycle repeats with its own length.
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
pub struct ScheduleConfig {
    #[serde(default = "default_cycle")]
    pub cycle: Vec<WorkoutType>,
}

impl Default for ScheduleConfig {
    fn default() -> Self {
        Self {
            cycle: default_cycle(),
        }
    }
}

/// Bounds for one measurement unit
#[derive(Clone, Copy, Debug, Serialize, Deserialize, PartialEq, Eq)]
pub struct UnitBounds {
    pub start: u32,
    pub floor: u32,
    pub ceiling: u32,
}

/// Progression parameters configuration
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
pub struct ProgressionConfig {
    /// Last week (inclusive) that uses `sets_before`
    #[serde(default = "default_threshold_week")]
    pub threshold_week: u32,

    #[serde(default = "default_sets_before")]
    pub sets_before: usize,

    #[serde(default = "default_sets_after")]
    pub sets_after: usize,

    /// Added to the previous session's average; 0 holds the target flat
    #[serde(default = "default_increment")]
    pub increment: u32,

    #[serde(default = "default_reps_bounds")]
    pub reps: UnitBounds,

    #[serde(default = "default_seconds_bounds")]
    pub seconds: UnitBounds,
}

impl Default for ProgressionConfig {
    fn default() -> Self {
        Self {
            threshold_week: default_threshold_week(),
            sets_before: default_sets_before(),
            sets_after: default_sets_after(),
            increment: default_increment(),
            reps: default_reps_bounds(),
            seconds: default_seconds_bounds(),
        }
    }
}

impl ProgressionConfig {
    pub fn bounds(&self, unit: Unit) -> UnitBounds {
        match unit {
            Unit::Reps => self.reps,
            Unit::Seconds => self.seconds,
        }
    }
}

/// Session pacing configuration
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
pub struct SessionConfig {
    #[serde(default = "default_rest_seconds")]
    pub rest_seconds: u32,

    /// Delay after logging a set before the machine leaves `exercising`
    #[serde(default = "default_settle_millis")]
    pub settle_millis: u64,

    #[serde(default = "default_flash_millis")]
    pub flash_millis: u64,

    /// Auto-advance delay between exercises; 0 waits for the user
    #[serde(default = "default_transition_seconds")]
    pub transition_seconds: u32,

    /// Countdown speed multiplier (dev/test tooling)
    #[serde(default = "default_timer_speed")]
    pub timer_speed: f64,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            rest_seconds: default_rest_seconds(),
            settle_millis: default_settle_millis(),
            flash_millis: default_flash_millis(),
            transition_seconds: default_transition_seconds(),
            timer_speed: default_timer_speed(),
        }
    }
}

// Default value functions
fn default_data_dir() -> PathBuf {
    let base = dirs::data_local_dir().unwrap_or_else(|| {
        std::env::var_os("HOME")
            .map(|home| PathBuf::from(home).join(".local/share"))
            .unwrap_or_else(|| PathBuf::from("."))
    });
    base.join("traindaily")
}

fn default_cycle() -> Vec<WorkoutType> {
    use WorkoutType::*;
    vec![Push, Pull, Legs, Push, Pull, Legs, Rest]
}

fn default_threshold_week() -> u32 {
    4
}

fn default_sets_before() -> usize {
    2
}

fn default_sets_after() -> usize {
    3
}

fn default_increment() -> u32 {
    1
}

fn default_reps_bounds() -> UnitBounds {
    UnitBounds {
        start: 8,
        floor: 6,
        ceiling: 20,
    }
}

fn default_seconds_bounds() -> UnitBounds {
    UnitBounds {
        start: 20,
        floor: 15,
        ceiling: 60,
    }
}

fn default_rest_seconds() -> u32 {
    90
}

fn default_settle_millis() -> u64 {
    700
}

fn default_flash_millis() -> u64 {
    600
}

fn default_transition_seconds() -> u32 {
    2
}

fn default_timer_speed() -> f64 {
    1.0
}

impl Config {
    /// Load configuration from the standard config path
    pub fn load() -> Result<Self> {
        let config_path = Self::default_config_path();
        if config_path.exists() {
            Self::load_from(&config_path)
        } else {
            tracing::info!("No config file found at {:?}, using defaults", config_path);
            Ok(Self::default())
        }
    }

    /// Load configuration from a specific path
    pub fn load_from(path: &Path) -> Result<Self> {
        let contents = std::fs::read_to_string(path)?;
        let config: Config = toml::from_str(&contents)?;
        config.validate()?;
        tracing::info!("Loaded config from {:?}", path);
        Ok(config)
    }

    /// Get the default config file path
    pub fn default_config_path() -> PathBuf {
        let base = dirs::config_dir().unwrap_or_else(|| {
            std::env::var_os("HOME")
                .map(|home| PathBuf::from(home).join(".config"))
                .unwrap_or_else(|| PathBuf::from("."))
        });
        base.join("traindaily").join("config.toml")
    }

    /// Save the current configuration to the default path
    pub fn save(&self) -> Result<()> {
        let config_path = Self::default_config_path();
        self.save_to(&config_path)
    }

    /// Save the current configuration to a specific path
    pub fn save_to(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }

        let contents = toml::to_string_pretty(self)
            .map_err(|e| Error::Config(format!("Failed to serialize config: {}", e)))?;
        std::fs::write(path, contents)?;
        tracing::info!("Saved config to {:?}", path);
        Ok(())
    }

    /// Check cross-field constraints that serde defaults cannot express
    pub fn validate(&self) -> Result<()> {
        if self.schedule.cycle.is_empty() {
            return Err(Error::Config("schedule.cycle must not be empty".into()));
        }

        let p = &self.progression;
        if p.sets_before == 0 || p.sets_after == 0 {
            return Err(Error::Config("set counts must be at least 1".into()));
        }
        if p.sets_before > p.sets_after {
            return Err(Error::Config(format!(
                "sets_before ({}) exceeds sets_after ({})",
                p.sets_before, p.sets_after
            )));
        }
        for (unit, b) in [("reps", p.reps), ("seconds", p.seconds)] {
            if !(b.floor <= b.start && b.start <= b.ceiling) {
                return Err(Error::Config(format!(
                    "progression.{}: expected floor <= start <= ceiling, got {} / {} / {}",
                    unit, b.floor, b.start, b.ceiling
                )));
            }
        }

        let session = &self.session;
        if !(session.timer_speed.is_finite() && TIMER_SPEED_RANGE.contains(&session.timer_speed)) {
            return Err(Error::Config(format!(
                "session.timer_speed must be within {}..={}, got {}",
                TIMER_SPEED_RANGE.start(),
                TIMER_SPEED_RANGE.end(),
                session.timer_speed
            )));
        }
        for (name, value, max) in [
            ("rest_seconds", u64::from(session.rest_seconds), MAX_REST_SECONDS),
            ("transition_seconds", u64::from(session.transition_seconds), MAX_TRANSITION_SECONDS),
            ("settle_millis", session.settle_millis, MAX_FEEDBACK_MILLIS),
            ("flash_millis", session.flash_millis, MAX_FEEDBACK_MILLIS),
        ] {
            if value > max {
                return Err(Error::Config(format!(
                    "session.{} must be at most {}, got {}",
                    name, max, value
                )));
            }
        }

        Ok(())
    }
}
