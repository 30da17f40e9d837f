#![forbid(unsafe_code)]

//! Core domain model and business logic for TrainDaily.
//!
//! This crate provides:
//! - Domain types (exercises, drills, session records, outcomes)
//! - Catalog, schedule and progression rules
//! - The workout session state machine, the mobility flow and micro-breaks
//! - Storage adapters, history merge and CSV export
//! - The async coach that drives a session against storage

pub mod types;
pub mod error;
pub mod catalog;
pub mod config;
pub mod logging;
pub mod history;
pub mod schedule;
pub mod progression;
pub mod timer;
pub mod feedback;
pub mod session;
pub mod mobility;
pub mod micro_break;
pub mod storage;
pub mod coach;
pub mod sync;
pub mod export;

// Re-export commonly used types
pub use error::{Error, Result};
pub use types::*;
pub use catalog::{build_default_catalog, default_catalog, Catalog};
pub use config::Config;
pub use history::WorkoutHistory;
pub use schedule::Schedule;
pub use session::{Step, WorkoutMachine, WorkoutState};
pub use micro_break::{BreakStep, MicroBreak};
pub use storage::{FileStorage, MemoryStorage, StorageAdapter};
pub use coach::{Coach, SaveStatus, StartOutcome};
