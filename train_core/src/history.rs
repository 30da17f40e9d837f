//! Workout history: the date-keyed collection of session records.
//!
//! This is the durable ground truth read by the progression engine and the
//! schedule calculator. Storage adapters own it; the coach holds a cached copy.

use crate::{SessionRecord, Result};
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Mapping of calendar date to session record, ordered by date
#[derive(Clone, Debug, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(transparent)]
pub struct WorkoutHistory {
    sessions: BTreeMap<NaiveDate, SessionRecord>,
}

impl WorkoutHistory {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.sessions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.sessions.is_empty()
    }

    pub fn get(&self, date: NaiveDate) -> Option<&SessionRecord> {
        self.sessions.get(&date)
    }

    /// A date counts as done when it has a record
    pub fn is_logged(&self, date: NaiveDate) -> bool {
        self.sessions.contains_key(&date)
    }

    /// Insert or replace the record for a date
    pub fn insert(&mut self, date: NaiveDate, record: SessionRecord) -> Option<SessionRecord> {
        self.sessions.insert(date, record)
    }

    /// Iterate oldest first
    pub fn iter(&self) -> impl DoubleEndedIterator<Item = (NaiveDate, &SessionRecord)> {
        self.sessions.iter().map(|(d, r)| (*d, r))
    }

    /// Most recent session strictly before `before`, of any kind
    pub fn previous_session(&self, before: NaiveDate) -> Option<(NaiveDate, &SessionRecord)> {
        self.sessions
            .range(..before)
            .next_back()
            .map(|(d, r)| (*d, r))
    }

    /// Most recent session strictly before `before` that logged `exercise_key`
    pub fn previous_with(
        &self,
        exercise_key: &str,
        before: NaiveDate,
    ) -> Option<(NaiveDate, &[u32])> {
        self.sessions
            .range(..before)
            .rev()
            .find_map(|(d, r)| r.values(exercise_key).map(|v| (*d, v)))
    }

    /// Most recent session anywhere in history that logged `exercise_key`
    pub fn latest_with(&self, exercise_key: &str) -> Option<(NaiveDate, &[u32])> {
        self.sessions
            .iter()
            .rev()
            .find_map(|(d, r)| r.values(exercise_key).map(|v| (*d, v)))
    }

    /// Parse a serialized history, skipping entries that fail to parse
    ///
    /// A document that is not a JSON object at all yields an error; callers
    /// at the storage boundary turn that into an empty history.
    pub fn from_json_lenient(contents: &str) -> Result<Self> {
        let raw: BTreeMap<String, serde_json::Value> = serde_json::from_str(contents)?;
        let mut history = Self::new();

        for (key, value) in raw {
            let date = match crate::schedule::parse_date_key(&key) {
                Ok(date) => date,
                Err(e) => {
                    tracing::warn!("Skipping history entry: {}", e);
                    continue;
                }
            };
            match serde_json::from_value::<SessionRecord>(value) {
                Ok(record) => {
                    history.insert(date, record);
                }
                Err(e) => {
                    tracing::warn!("Skipping malformed session for {}: {}", key, e);
                }
            }
        }

        tracing::debug!("Parsed {} sessions from history", history.len());
        Ok(history)
    }
}

impl FromIterator<(NaiveDate, SessionRecord)> for WorkoutHistory {
    fn from_iter<I: IntoIterator<Item = (NaiveDate, SessionRecord)>>(iter: I) -> Self {
        Self {
            sessions: iter.into_iter().collect(),
        }
    }
}
