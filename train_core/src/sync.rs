//! Merging histories from two devices.
//!
//! Last writer wins per exercise key. For a date present on both sides the
//! exercise maps are unioned; keys present on both come from the record with
//! the later `logged_at`, which also supplies the timestamp, week number and
//! workout type. Ties go to the remote copy. Dates on only one side pass
//! through untouched.

use crate::{SessionRecord, WorkoutHistory};
use chrono::NaiveDate;

#[derive(Clone, Debug, Default, PartialEq)]
pub struct MergeReport {
    pub merged: WorkoutHistory,
    /// Local dates the remote is missing or holds an older copy of
    pub to_upload: Vec<NaiveDate>,
}

pub fn merge_histories(local: &WorkoutHistory, remote: &WorkoutHistory) -> MergeReport {
    let mut merged = remote.clone();
    let mut to_upload = Vec::new();

    for (date, mine) in local.iter() {
        match remote.get(date) {
            None => {
                merged.insert(date, mine.clone());
                to_upload.push(date);
            }
            Some(theirs) => {
                if mine.logged_at > theirs.logged_at {
                    to_upload.push(date);
                }
                merged.insert(date, merge_records(mine, theirs));
            }
        }
    }

    tracing::debug!(
        "Merged {} local and {} remote sessions into {}; {} to upload",
        local.len(),
        remote.len(),
        merged.len(),
        to_upload.len()
    );
    MergeReport { merged, to_upload }
}

fn merge_records(local: &SessionRecord, remote: &SessionRecord) -> SessionRecord {
    let (newer, older) = if local.logged_at > remote.logged_at {
        (local, remote)
    } else {
        (remote, local)
    };

    let mut record = newer.clone();
    for (key, values) in &older.sets {
        record.sets.entry(key.clone()).or_insert_with(|| values.clone());
    }
    record
}
