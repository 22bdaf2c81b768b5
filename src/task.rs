//! Task and shoutout data structures.
//!
//! `Task` is the central entity of the board: a titled work item placed in exactly one
//! quadrant, optionally dated, optionally linked to a goal. `Shoutout` is a small
//! colleague-recognition note that shares the undo/redo machinery with tasks.

use chrono::{DateTime, Duration, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

use crate::dates::{optional_date, optional_text};
use crate::fields::Quadrant;

/// A work item on the matrix.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Task {
    pub id: u64,
    pub title: String,
    /// Free text; a leading `*` marks a bullet and `N.` an ordered item when rendered.
    #[serde(default, deserialize_with = "optional_text::deserialize")]
    pub description: Option<String>,
    pub quadrant: Quadrant,
    #[serde(default, with = "optional_date")]
    pub due_date: Option<NaiveDate>,
    #[serde(default)]
    pub completed: bool,
    #[serde(default)]
    pub icon: String,
    /// Who a q3 task was handed to.
    #[serde(default, deserialize_with = "optional_text::deserialize")]
    pub delegate: Option<String>,
    #[serde(default, deserialize_with = "optional_text::deserialize")]
    pub goal_id: Option<String>,
    pub created_at: DateTime<Utc>,
}

impl Task {
    /// True when completing this task must first ask who it was delegated to.
    pub fn needs_delegate(&self) -> bool {
        self.quadrant == Quadrant::Q3 && !self.completed && self.delegate.is_none()
    }
}

/// Fields supplied when creating a task.
#[derive(Debug, Clone, Default)]
pub struct TaskInput {
    pub title: String,
    pub description: Option<String>,
    pub quadrant: Option<Quadrant>,
    pub due_date: Option<NaiveDate>,
    pub icon: Option<String>,
    pub delegate: Option<String>,
    pub goal_id: Option<String>,
}

impl TaskInput {
    pub fn titled(title: &str) -> Self {
        TaskInput {
            title: title.to_string(),
            ..Default::default()
        }
    }

    pub fn in_quadrant(mut self, quadrant: Quadrant) -> Self {
        self.quadrant = Some(quadrant);
        self
    }

    pub fn due(mut self, date: NaiveDate) -> Self {
        self.due_date = Some(date);
        self
    }
}

/// A partial update. `None` leaves a field alone; for optional fields `Some(None)` clears it.
/// Completion is not editable here; it goes through `Database::toggle_complete`.
#[derive(Debug, Clone, Default)]
pub struct TaskPatch {
    pub title: Option<String>,
    pub description: Option<Option<String>>,
    pub quadrant: Option<Quadrant>,
    pub due_date: Option<Option<NaiveDate>>,
    pub icon: Option<String>,
    pub delegate: Option<Option<String>>,
    pub goal_id: Option<Option<String>>,
}

impl TaskPatch {
    pub fn is_empty(&self) -> bool {
        self.title.is_none()
            && self.description.is_none()
            && self.quadrant.is_none()
            && self.due_date.is_none()
            && self.icon.is_none()
            && self.delegate.is_none()
            && self.goal_id.is_none()
    }
}

/// A note recognising a colleague's help during the period.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Shoutout {
    pub id: u64,
    pub colleague: String,
    pub note: String,
    pub created_at: DateTime<Utc>,
}

/// Normalise free text: trimmed, with blank input treated as absent.
pub fn clean_text(s: Option<String>) -> Option<String> {
    s.map(|v| v.trim().to_string()).filter(|v| !v.is_empty())
}

/// Starter tasks shown to a first-time user, one or more per quadrant.
pub fn example_tasks(now: DateTime<Utc>, today: NaiveDate) -> Vec<Task> {
    let base = now.timestamp_millis().max(0) as u64;
    let rows: [(&str, &str, Quadrant, Option<NaiveDate>, &str); 8] = [
        ("Fix critical bug in production", "Server crashes affecting users", Quadrant::Q1, Some(today), "🐛"),
        ("Learn new programming framework", "Invest in professional development", Quadrant::Q2, None, "📚"),
        ("Plan next quarter strategy", "Set goals and roadmap", Quadrant::Q2, None, "🗺️"),
        ("Respond to non-urgent emails", "Quick replies needed", Quadrant::Q3, None, "📧"),
        ("Attend optional meeting", "Could be handled via email", Quadrant::Q3, None, "📞"),
        ("Browse social media", "Time-waster - consider eliminating", Quadrant::Q4, None, "📱"),
        ("Exercise and meal prep", "Important for long-term health", Quadrant::Q2, None, "💪"),
        ("Client presentation tomorrow", "Final preparations needed", Quadrant::Q1, Some(today + Duration::days(1)), "📊"),
    ];
    rows.into_iter()
        .enumerate()
        .map(|(i, (title, desc, quadrant, due_date, icon))| Task {
            id: base + i as u64 + 1,
            title: title.to_string(),
            description: Some(desc.to_string()),
            quadrant,
            due_date,
            completed: false,
            icon: icon.to_string(),
            delegate: None,
            goal_id: None,
            created_at: now,
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn reads_legacy_json_with_empty_strings() {
        let raw = r#"{
            "id": 17,
            "title": "Call plumber",
            "description": "",
            "quadrant": "q3",
            "dueDate": "",
            "completed": false,
            "createdAt": "2024-01-15T09:00:00Z",
            "icon": "📞",
            "delegate": "",
            "goalId": null
        }"#;
        let t: Task = serde_json::from_str(raw).unwrap();
        assert_eq!(t.description, None);
        assert_eq!(t.due_date, None);
        assert_eq!(t.delegate, None);
        assert_eq!(t.goal_id, None);
        assert!(t.needs_delegate());
    }

    #[test]
    fn writes_camel_case_dates() {
        let now = DateTime::parse_from_rfc3339("2024-01-15T09:00:00Z").unwrap().with_timezone(&Utc);
        let task = Task {
            id: 1,
            title: "Ship".into(),
            description: None,
            quadrant: Quadrant::Q1,
            due_date: NaiveDate::from_ymd_opt(2024, 1, 16),
            completed: false,
            icon: "🚀".into(),
            delegate: None,
            goal_id: None,
            created_at: now,
        };
        let v = serde_json::to_value(&task).unwrap();
        assert_eq!(v["dueDate"], "2024-01-16");
        assert_eq!(v["quadrant"], "q1");
        assert!(v.get("createdAt").is_some());
    }

    #[test]
    fn examples_cover_every_quadrant() {
        let now = Utc::now();
        let today = now.date_naive();
        let tasks = example_tasks(now, today);
        assert_eq!(tasks.len(), 8);
        for q in Quadrant::ALL {
            assert!(tasks.iter().any(|t| t.quadrant == q));
        }
        let mut ids: Vec<u64> = tasks.iter().map(|t| t.id).collect();
        ids.dedup();
        assert_eq!(ids.len(), 8);
    }
}
