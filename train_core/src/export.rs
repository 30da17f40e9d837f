//! CSV export of workout history.
//!
//! One row per logged set, oldest session first. The file is rewritten on
//! every export and fsynced before returning.

use crate::schedule::date_key;
use crate::{Result, WorkoutHistory};
use chrono::SecondsFormat;
use std::fs::File;
use std::path::Path;

#[derive(Debug, serde::Serialize)]
struct CsvRow<'a> {
    date: String,
    workout_type: &'static str,
    week_number: u32,
    exercise: &'a str,
    /// 1-based set number
    set: usize,
    value: u32,
    logged_at: String,
}

/// Write `history` to `path` as CSV and return the number of rows written
pub fn export_history_csv(history: &WorkoutHistory, path: &Path) -> Result<usize> {
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        std::fs::create_dir_all(parent)?;
    }

    let file = File::create(path)?;
    let mut writer = csv::WriterBuilder::new()
        .has_headers(true)
        .from_writer(file);

    let mut rows = 0;
    for (date, record) in history.iter() {
        let date = date_key(date);
        let workout_type = record.workout_type.map_or("", |t| t.as_str());
        let logged_at = record.logged_at.to_rfc3339_opts(SecondsFormat::Millis, true);

        for (exercise, values) in &record.sets {
            for (i, value) in values.iter().enumerate() {
                writer.serialize(CsvRow {
                    date: date.clone(),
                    workout_type,
                    week_number: record.week_number,
                    exercise,
                    set: i + 1,
                    value: *value,
                    logged_at: logged_at.clone(),
                })?;
                rows += 1;
            }
        }
    }

    writer.flush()?;
    let file = writer
        .into_inner()
        .map_err(|e| std::io::Error::new(std::io::ErrorKind::Other, e.to_string()))?;
    file.sync_all()?;

    tracing::info!("Exported {} sets from {} sessions to {:?}", rows, history.len(), path);
    Ok(rows)
}
