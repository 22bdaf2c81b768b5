//! Full-board backup and restore.
//!
//! A backup is one JSON document holding every collection. Restoring is
//! all-or-nothing: the document is parsed and validated completely before any
//! board state is touched.

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::dates::parse_iso_date;
use crate::db::Database;
use crate::error::{BoardError, Result};
use crate::goal::{ArchivedGoal, Goal};
use crate::rollover::HistoryEntry;
use crate::task::{Shoutout, Task};

pub const BACKUP_VERSION: &str = "1.0";

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Backup {
    pub version: String,
    #[serde(default)]
    pub export_date: Option<DateTime<Utc>>,
    pub tasks: Vec<Task>,
    pub period_start: NaiveDate,
    #[serde(default)]
    pub history: Vec<HistoryEntry>,
    #[serde(default)]
    pub shoutouts: Vec<Shoutout>,
    #[serde(default)]
    pub goals: Vec<Goal>,
    #[serde(default)]
    pub goal_archive: Vec<ArchivedGoal>,
}

/// Counts of what a restore brought in.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ImportReport {
    pub version: String,
    pub export_date: Option<DateTime<Utc>>,
    pub tasks: usize,
    pub history: usize,
    pub shoutouts: usize,
    pub goals: usize,
}

/// Snapshot the whole board.
pub fn export(db: &Database, now: DateTime<Utc>) -> Backup {
    Backup {
        version: BACKUP_VERSION.to_string(),
        export_date: Some(now),
        tasks: db.tasks.clone(),
        period_start: db.period_start,
        history: db.history.clone(),
        shoutouts: db.shoutouts.clone(),
        goals: db.goals.goals.clone(),
        goal_archive: db.goals.archive.clone(),
    }
}

pub fn export_json(db: &Database, now: DateTime<Utc>) -> Result<String> {
    Ok(serde_json::to_string_pretty(&export(db, now))?)
}

/// Suggested file name for a backup taken on `today`.
pub fn backup_file_name(today: NaiveDate) -> String {
    format!("task-prioritizer-backup-{}.json", today.format("%Y-%m-%d"))
}

fn required<'a>(doc: &'a Value, keys: &[&str]) -> Result<&'a Value> {
    keys.iter()
        .find_map(|k| doc.get(*k).filter(|v| !v.is_null()))
        .ok_or_else(|| BoardError::InvalidBackup(format!("missing '{}'", keys[0])))
}

fn optional<T: serde::de::DeserializeOwned>(doc: &Value, keys: &[&str]) -> Result<Vec<T>> {
    match keys.iter().find_map(|k| doc.get(*k).filter(|v| !v.is_null())) {
        Some(v) => Ok(serde_json::from_value(v.clone())?),
        None => Ok(Vec::new()),
    }
}

/// Parse and validate a backup document without touching any board.
pub fn parse(raw: &str) -> Result<Backup> {
    let doc: Value = serde_json::from_str(raw)?;
    if !doc.is_object() {
        return Err(BoardError::InvalidBackup("not a JSON object".into()));
    }
    let version = required(&doc, &["version"])?
        .as_str()
        .map(str::to_string)
        .ok_or_else(|| BoardError::InvalidBackup("'version' is not a string".into()))?;
    let tasks: Vec<Task> = serde_json::from_value(required(&doc, &["tasks"])?.clone())?;
    let period_start = required(&doc, &["periodStart", "weekStart"])?
        .as_str()
        .and_then(parse_iso_date)
        .ok_or_else(|| BoardError::InvalidBackup("'periodStart' is not a date".into()))?;
    let export_date = doc
        .get("exportDate")
        .and_then(|v| serde_json::from_value::<DateTime<Utc>>(v.clone()).ok());

    Ok(Backup {
        version,
        export_date,
        tasks,
        period_start,
        history: optional(&doc, &["history", "weeklyHistory"])?,
        shoutouts: optional(&doc, &["shoutouts"])?,
        goals: optional(&doc, &["goals"])?,
        goal_archive: optional(&doc, &["goalArchive"])?,
    })
}

/// Replace the whole board with a backup. On error the board is left untouched.
/// Undo history is dropped since it refers to the replaced state.
pub fn import(db: &mut Database, raw: &str) -> Result<ImportReport> {
    let backup = parse(raw).inspect_err(|e| tracing::warn!(error = %e, "backup rejected"))?;

    let report = ImportReport {
        version: backup.version.clone(),
        export_date: backup.export_date,
        tasks: backup.tasks.len(),
        history: backup.history.len(),
        shoutouts: backup.shoutouts.len(),
        goals: backup.goals.len(),
    };
    db.tasks = backup.tasks;
    db.period_start = backup.period_start;
    db.history = backup.history;
    db.shoutouts = backup.shoutouts;
    db.goals.goals = backup.goals;
    db.goals.archive = backup.goal_archive;
    db.clear_log();
    tracing::info!(tasks = report.tasks, history = report.history, "backup restored");
    Ok(report)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fields::Quadrant;
    use crate::task::TaskInput;
    use chrono::TimeZone;

    fn d(y: i32, m: u32, day: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, day).unwrap()
    }

    fn now() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 1, 17, 8, 30, 0).unwrap()
    }

    fn board() -> Database {
        let mut db = Database::new(d(2024, 1, 15));
        db.create_task(TaskInput::titled("Pay invoice").in_quadrant(Quadrant::Q1), now(), d(2024, 1, 17));
        db.create_task(TaskInput::titled("Read book"), now(), d(2024, 1, 17));
        db.add_shoutout("Mo", "Great demo", now());
        db
    }

    #[test]
    fn export_then_import_restores_board() {
        let src = board();
        let json = export_json(&src, now()).unwrap();

        let mut dst = Database::new(d(2023, 6, 5));
        dst.create_task(TaskInput::titled("Old"), now(), d(2024, 1, 17));
        let report = import(&mut dst, &json).unwrap();

        assert_eq!(report.version, BACKUP_VERSION);
        assert_eq!(report.tasks, 2);
        assert_eq!(report.shoutouts, 1);
        assert_eq!(report.export_date, Some(now()));
        assert_eq!(dst.tasks, src.tasks);
        assert_eq!(dst.shoutouts, src.shoutouts);
        assert_eq!(dst.period_start, d(2024, 1, 15));
        assert!(!dst.log().can_undo());
    }

    #[test]
    fn missing_tasks_leaves_board_untouched() {
        let mut db = board();
        let before = serde_json::to_string(&db.tasks).unwrap();
        let raw = r#"{"version":"1.0","periodStart":"2024-01-15","history":[]}"#;
        let err = import(&mut db, raw).unwrap_err();
        assert!(matches!(err, BoardError::InvalidBackup(_)));
        assert_eq!(serde_json::to_string(&db.tasks).unwrap(), before);
        assert!(db.log().can_undo());
    }

    #[test]
    fn rejects_garbage_and_missing_fields() {
        let mut db = board();
        assert!(matches!(import(&mut db, "{nope"), Err(BoardError::Json(_))));
        assert!(import(&mut db, "[]").is_err());
        assert!(import(&mut db, r#"{"tasks":[],"periodStart":"2024-01-15"}"#).is_err());
        assert!(import(&mut db, r#"{"version":"1.0","tasks":[]}"#).is_err());
        assert!(import(&mut db, r#"{"version":"1.0","tasks":[],"periodStart":"someday"}"#).is_err());
        // A malformed task anywhere rejects the whole file.
        assert!(import(&mut db, r#"{"version":"1.0","tasks":[{"id":1}],"periodStart":"2024-01-15"}"#).is_err());
        assert_eq!(db.tasks.len(), 2);
    }

    #[test]
    fn accepts_legacy_key_names() {
        let raw = r#"{
            "version": "1.0",
            "exportDate": "2024-01-10T12:00:00.000Z",
            "weekStart": "2024-01-08",
            "tasks": [{
                "id": 1704880000000,
                "title": "Legacy task",
                "description": "",
                "quadrant": "q2",
                "dueDate": "",
                "completed": true,
                "createdAt": "2024-01-10T10:00:00.000Z"
            }],
            "weeklyHistory": [{
                "id": "2024-01-01-1704470400000",
                "weekStart": "2024-01-01",
                "weekEnd": "2024-01-07",
                "dateRange": "Jan 1 - Jan 7, 2024",
                "completedCount": 4,
                "summary": "...",
                "endedAt": "2024-01-05T16:00:00.000Z"
            }]
        }"#;
        let mut db = Database::new(d(2024, 1, 15));
        let report = import(&mut db, raw).unwrap();
        assert_eq!(report.tasks, 1);
        assert_eq!(report.history, 1);
        assert_eq!(db.period_start, d(2024, 1, 8));
        assert_eq!(db.history[0].completed_count, 4);
        assert!(db.tasks[0].completed);
        assert!(db.goals.goals.is_empty());
    }

    #[test]
    fn backup_name_embeds_date() {
        assert_eq!(backup_file_name(d(2024, 1, 17)), "task-prioritizer-backup-2024-01-17.json");
    }
}
