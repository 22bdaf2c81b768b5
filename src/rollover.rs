//! End-of-period rollover.
//!
//! Ending a period writes a plain-text summary of what got done, keeps a copy in
//! the history list, clears completed tasks and shoutouts, and moves the period
//! start forward. A rollover cannot be undone.

use std::fmt::Write as _;
use std::fs;
use std::path::{Path, PathBuf};

use chrono::{DateTime, Duration, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

use crate::dates::{iso_week_number, next_period_start, week_date_range, week_start};
use crate::db::Database;
use crate::error::{BoardError, Result};
use crate::fields::{GoalStatus, Quadrant};
use crate::goal::{progress, staleness_text};

/// One archived period.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct HistoryEntry {
    pub id: String,
    #[serde(alias = "weekStart")]
    pub period_start: NaiveDate,
    #[serde(alias = "weekEnd")]
    pub period_end: NaiveDate,
    #[serde(default)]
    pub week_number: u32,
    pub date_range: String,
    pub completed_count: usize,
    pub summary: String,
    pub ended_at: DateTime<Utc>,
}

impl HistoryEntry {
    /// File name the summary is written under.
    pub fn file_name(&self) -> String {
        format!(
            "task-summary-{}-W{:02}-{}.txt",
            self.period_start.format("%G"),
            self.week_number,
            self.period_start.format("%Y-%m-%d")
        )
    }
}

/// Outcome of [`Database::end_period`].
#[derive(Debug, Clone)]
pub struct Rollover {
    pub entry: HistoryEntry,
    pub cleared_tasks: usize,
    pub cleared_shoutouts: usize,
    pub next_period_start: NaiveDate,
}

/// Render the text summary for one period.
pub fn render_summary(db: &Database, start: NaiveDate, today: NaiveDate) -> String {
    let mut out = String::new();
    let _ = writeln!(
        out,
        "Weekly Task Summary - {} (Week {})\n",
        week_date_range(start),
        iso_week_number(start)
    );

    let completed: Vec<_> = db.tasks.iter().filter(|t| t.completed).collect();
    if completed.is_empty() {
        out.push_str("No completed tasks this week.\n\n");
    }
    for q in Quadrant::ALL {
        let done: Vec<_> = completed.iter().filter(|t| t.quadrant == q).collect();
        if done.is_empty() {
            continue;
        }
        let _ = writeln!(out, "{} ({}):", q.label(), q.subtitle());
        for t in done {
            match &t.delegate {
                Some(who) => {
                    let _ = writeln!(out, "✓ {} (delegated to {})", t.title, who);
                }
                None => {
                    let _ = writeln!(out, "✓ {}", t.title);
                }
            }
            if let Some(desc) = &t.description {
                let _ = writeln!(out, "  {desc}");
            }
        }
        out.push('\n');
    }

    if !db.shoutouts.is_empty() {
        out.push_str("Shoutouts:\n");
        for s in &db.shoutouts {
            let _ = writeln!(out, "★ {}: {}", s.colleague, s.note);
        }
        out.push('\n');
    }

    let open_goals: Vec<_> = db
        .goals
        .goals
        .iter()
        .filter(|g| matches!(g.status, GoalStatus::Active | GoalStatus::Paused))
        .collect();
    if !open_goals.is_empty() {
        out.push_str("Goals:\n");
        for g in open_goals {
            let _ = writeln!(
                out,
                "• {} [{}] {}% - last activity: {}",
                g.title,
                g.status.label(),
                progress(g),
                staleness_text(g, today)
            );
        }
        out.push('\n');
    }
    out
}

impl Database {
    /// Close the current period and start the next one.
    pub fn end_period(&mut self, now: DateTime<Utc>, today: NaiveDate) -> Rollover {
        let start = week_start(self.period_start);
        let summary = render_summary(self, start, today);
        let completed_count = self.tasks.iter().filter(|t| t.completed).count();
        let entry = HistoryEntry {
            id: format!("{}-{}", start.format("%Y-%m-%d"), now.timestamp_millis()),
            period_start: start,
            period_end: start + Duration::days(6),
            week_number: iso_week_number(start),
            date_range: week_date_range(start),
            completed_count,
            summary,
            ended_at: now,
        };
        self.history.insert(0, entry.clone());

        self.tasks.retain(|t| !t.completed);
        let cleared_shoutouts = self.shoutouts.len();
        self.shoutouts.clear();
        // Older entries would resurrect the cleared tasks.
        self.clear_log();

        let next = next_period_start(self.period_start, today);
        self.period_start = next;
        tracing::info!(
            week = entry.week_number,
            completed = completed_count,
            next = %next,
            "period ended"
        );
        Rollover {
            entry,
            cleared_tasks: completed_count,
            cleared_shoutouts,
            next_period_start: next,
        }
    }

    /// History entry whose id starts with `prefix`, if exactly one does.
    pub fn find_history(&self, prefix: &str) -> Option<&HistoryEntry> {
        let mut hits = self.history.iter().filter(|h| h.id.starts_with(prefix));
        let first = hits.next()?;
        if hits.next().is_some() {
            return None;
        }
        Some(first)
    }

    pub fn delete_history(&mut self, id: &str) -> bool {
        let before = self.history.len();
        self.history.retain(|h| h.id != id);
        self.history.len() != before
    }
}

/// Write a summary into `dir`, creating it if needed.
pub fn write_summary(dir: &Path, entry: &HistoryEntry) -> Result<PathBuf> {
    fs::create_dir_all(dir).map_err(|source| BoardError::IoPath {
        path: dir.to_path_buf(),
        source,
    })?;
    let path = dir.join(entry.file_name());
    fs::write(&path, &entry.summary).map_err(|source| BoardError::IoPath {
        path: path.clone(),
        source,
    })?;
    Ok(path)
}
