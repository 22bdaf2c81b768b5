//! Goals: longer-running outcomes that tasks can be linked to.
//!
//! A simple goal is either done or not. A major goal carries sub-goals and its
//! progress is the share of those that are complete. Each goal tracks the day of
//! its last linked activity, which drives the staleness indicator.

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::dates::{days_between, optional_date};
use crate::fields::{GoalKind, GoalStatus, Staleness, SubGoalStatus};
use crate::task::Task;

pub const NO_LINKED_TASKS: &str = "No tasks linked to this goal";
pub const ALL_LINKED_DONE: &str = "All linked tasks completed";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Timeline {
    pub start: NaiveDate,
    pub end: NaiveDate,
}

impl Timeline {
    pub fn days(&self) -> i64 {
        days_between(self.start, self.end)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SubGoal {
    pub id: String,
    pub title: String,
    #[serde(default, with = "optional_date")]
    pub target_date: Option<NaiveDate>,
    #[serde(default)]
    pub status: SubGoalStatus,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Goal {
    pub id: String,
    #[serde(rename = "type", default)]
    pub kind: GoalKind,
    pub title: String,
    #[serde(default)]
    pub outcome: String,
    pub timeline: Timeline,
    #[serde(default)]
    pub status: GoalStatus,
    #[serde(default, with = "optional_date")]
    pub last_activity: Option<NaiveDate>,
    pub created_at: DateTime<Utc>,
    #[serde(default)]
    pub linked_tasks: Vec<u64>,
    #[serde(default)]
    pub sub_goals: Vec<SubGoal>,
}

/// A goal moved out of the active set.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ArchivedGoal {
    #[serde(flatten)]
    pub goal: Goal,
    pub archived_at: DateTime<Utc>,
}

/// Fields for a new sub-goal.
#[derive(Debug, Clone, Default)]
pub struct SubGoalDraft {
    pub title: String,
    pub target_date: Option<NaiveDate>,
}

/// Fields for a new goal, validated by [`GoalBook::create`].
#[derive(Debug, Clone, Default)]
pub struct GoalDraft {
    pub kind: GoalKind,
    pub title: String,
    pub outcome: String,
    pub start: Option<NaiveDate>,
    pub end: Option<NaiveDate>,
    pub sub_goals: Vec<SubGoalDraft>,
}

/// Partial goal update. Unset fields are left alone.
#[derive(Debug, Clone, Default)]
pub struct GoalPatch {
    pub title: Option<String>,
    pub outcome: Option<String>,
    pub start: Option<NaiveDate>,
    pub end: Option<NaiveDate>,
}

fn new_id() -> String {
    Uuid::new_v4().to_string()
}

impl GoalDraft {
    /// Validated timeline and sub-goals, or `None` when the draft is incomplete.
    fn validate(&self) -> Option<(Timeline, Vec<SubGoal>)> {
        if self.title.trim().is_empty() || self.outcome.trim().is_empty() {
            return None;
        }
        let timeline = Timeline {
            start: self.start?,
            end: self.end?,
        };
        if timeline.end <= timeline.start {
            return None;
        }
        let subs = match self.kind {
            GoalKind::Simple => Vec::new(),
            GoalKind::Major => {
                if self.sub_goals.is_empty() || self.sub_goals.iter().any(|s| s.title.trim().is_empty()) {
                    return None;
                }
                self.sub_goals
                    .iter()
                    .map(|s| SubGoal {
                        id: new_id(),
                        title: s.title.trim().to_string(),
                        target_date: s.target_date,
                        status: SubGoalStatus::Pending,
                    })
                    .collect()
            }
        };
        Some((timeline, subs))
    }
}

/// Active goals plus the archive.
#[derive(Debug, Clone, Default)]
pub struct GoalBook {
    pub goals: Vec<Goal>,
    pub archive: Vec<ArchivedGoal>,
}

impl GoalBook {
    pub fn new(goals: Vec<Goal>, archive: Vec<ArchivedGoal>) -> Self {
        GoalBook { goals, archive }
    }

    pub fn get(&self, id: &str) -> Option<&Goal> {
        self.goals.iter().find(|g| g.id == id)
    }

    fn get_mut(&mut self, id: &str) -> Option<&mut Goal> {
        self.goals.iter_mut().find(|g| g.id == id)
    }

    /// Full id of the single active goal whose id starts with `prefix`.
    pub fn resolve(&self, prefix: &str) -> Option<String> {
        resolve_prefix(self.goals.iter().map(|g| g.id.as_str()), prefix)
    }

    /// Same as [`resolve`](Self::resolve), for archived goals.
    pub fn resolve_archived(&self, prefix: &str) -> Option<String> {
        resolve_prefix(self.archive.iter().map(|a| a.goal.id.as_str()), prefix)
    }

    /// Create a goal. Returns its id, or `None` when the draft fails validation.
    pub fn create(&mut self, draft: GoalDraft, now: DateTime<Utc>) -> Option<String> {
        let Some((timeline, sub_goals)) = draft.validate() else {
            tracing::debug!(title = %draft.title, "goal draft rejected");
            return None;
        };
        let goal = Goal {
            id: new_id(),
            kind: draft.kind,
            title: draft.title.trim().to_string(),
            outcome: draft.outcome.trim().to_string(),
            timeline,
            status: GoalStatus::Active,
            last_activity: None,
            created_at: now,
            linked_tasks: Vec::new(),
            sub_goals,
        };
        let id = goal.id.clone();
        tracing::debug!(id = %id, kind = ?goal.kind, "goal created");
        self.goals.push(goal);
        Some(id)
    }

    /// Apply a patch. The result must still have a title and outcome, and an end after its start.
    pub fn update(&mut self, id: &str, patch: GoalPatch) -> bool {
        let Some(goal) = self.get_mut(id) else {
            return false;
        };
        let title = patch.title.map(|t| t.trim().to_string()).unwrap_or_else(|| goal.title.clone());
        let outcome = patch
            .outcome
            .map(|o| o.trim().to_string())
            .unwrap_or_else(|| goal.outcome.clone());
        let timeline = Timeline {
            start: patch.start.unwrap_or(goal.timeline.start),
            end: patch.end.unwrap_or(goal.timeline.end),
        };
        if title.is_empty() || outcome.is_empty() || timeline.end <= timeline.start {
            return false;
        }
        goal.title = title;
        goal.outcome = outcome;
        goal.timeline = timeline;
        true
    }

    pub fn set_status(&mut self, id: &str, status: GoalStatus) -> bool {
        match self.get_mut(id) {
            Some(goal) => {
                goal.status = status;
                true
            }
            None => false,
        }
    }

    pub fn delete(&mut self, id: &str) -> Option<Goal> {
        let pos = self.goals.iter().position(|g| g.id == id)?;
        Some(self.goals.remove(pos))
    }

    /// Move a goal into the archive.
    pub fn archive(&mut self, id: &str, now: DateTime<Utc>) -> bool {
        let Some(goal) = self.delete(id) else {
            return false;
        };
        self.archive.push(ArchivedGoal { goal, archived_at: now });
        true
    }

    pub fn delete_archived(&mut self, id: &str) -> bool {
        let before = self.archive.len();
        self.archive.retain(|a| a.goal.id != id);
        self.archive.len() != before
    }

    /// Link a task and stamp activity. Linking an already linked task changes nothing.
    pub fn link_task(&mut self, goal_id: &str, task_id: u64, today: NaiveDate) -> bool {
        let Some(goal) = self.get_mut(goal_id) else {
            return false;
        };
        if goal.linked_tasks.contains(&task_id) {
            return false;
        }
        goal.linked_tasks.push(task_id);
        goal.last_activity = Some(today);
        true
    }

    pub fn unlink_task(&mut self, goal_id: &str, task_id: u64) -> bool {
        let Some(goal) = self.get_mut(goal_id) else {
            return false;
        };
        let before = goal.linked_tasks.len();
        goal.linked_tasks.retain(|t| *t != task_id);
        goal.linked_tasks.len() != before
    }

    /// Add a sub-goal to a major goal. Returns the new sub-goal id.
    pub fn add_sub_goal(&mut self, goal_id: &str, draft: SubGoalDraft, today: NaiveDate) -> Option<String> {
        let title = draft.title.trim().to_string();
        if title.is_empty() {
            return None;
        }
        let goal = self.get_mut(goal_id).filter(|g| g.kind == GoalKind::Major)?;
        let sub = SubGoal {
            id: new_id(),
            title,
            target_date: draft.target_date,
            status: SubGoalStatus::Pending,
        };
        let id = sub.id.clone();
        goal.sub_goals.push(sub);
        goal.last_activity = Some(today);
        Some(id)
    }

    /// Flip a sub-goal between pending and complete. Returns the new status.
    pub fn toggle_sub_goal(&mut self, goal_id: &str, sub_id: &str, today: NaiveDate) -> Option<SubGoalStatus> {
        let goal = self.get_mut(goal_id).filter(|g| g.kind == GoalKind::Major)?;
        let sub = goal.sub_goals.iter_mut().find(|s| s.id == sub_id)?;
        sub.status = match sub.status {
            SubGoalStatus::Complete => SubGoalStatus::Pending,
            SubGoalStatus::Pending => SubGoalStatus::Complete,
        };
        let status = sub.status;
        goal.last_activity = Some(today);
        Some(status)
    }

    pub fn remove_sub_goal(&mut self, goal_id: &str, sub_id: &str, today: NaiveDate) -> bool {
        let Some(goal) = self.get_mut(goal_id).filter(|g| g.kind == GoalKind::Major) else {
            return false;
        };
        let before = goal.sub_goals.len();
        goal.sub_goals.retain(|s| s.id != sub_id);
        if goal.sub_goals.len() == before {
            return false;
        }
        goal.last_activity = Some(today);
        true
    }

    pub fn with_status(&self, status: GoalStatus) -> impl Iterator<Item = &Goal> {
        self.goals.iter().filter(move |g| g.status == status)
    }

    pub fn stale(&self, today: NaiveDate) -> impl Iterator<Item = &Goal> {
        self.goals
            .iter()
            .filter(move |g| staleness(g, today) == Staleness::Stale)
    }
}

fn resolve_prefix<'a>(ids: impl Iterator<Item = &'a str>, prefix: &str) -> Option<String> {
    if prefix.is_empty() {
        return None;
    }
    let mut hits = ids.filter(|id| id.starts_with(prefix));
    let first = hits.next()?;
    if hits.next().is_some() {
        return None;
    }
    Some(first.to_string())
}

/// Days without activity before a goal counts as stale; longer goals get more slack.
pub fn staleness_threshold(timeline: &Timeline) -> i64 {
    match timeline.days() {
        d if d < 30 => 7,
        d if d < 90 => 14,
        d if d < 180 => 21,
        _ => 30,
    }
}

pub fn staleness(goal: &Goal, today: NaiveDate) -> Staleness {
    let Some(last) = goal.last_activity else {
        return Staleness::Never;
    };
    let threshold = staleness_threshold(&goal.timeline);
    let since = days_between(last, today);
    if since >= threshold {
        Staleness::Stale
    } else if since as f64 >= threshold as f64 * 0.75 {
        Staleness::Warning
    } else {
        Staleness::Fresh
    }
}

pub fn staleness_text(goal: &Goal, today: NaiveDate) -> String {
    match goal.last_activity.map(|last| days_between(last, today)) {
        None => "Never started".into(),
        Some(0) => "Today".into(),
        Some(1) => "1 day ago".into(),
        Some(n) => format!("{n} days ago"),
    }
}

/// Percent complete, 0..=100.
pub fn progress(goal: &Goal) -> u32 {
    match goal.kind {
        GoalKind::Simple => {
            if goal.status == GoalStatus::Completed {
                100
            } else {
                0
            }
        }
        GoalKind::Major => {
            let total = goal.sub_goals.len();
            if total == 0 {
                return 0;
            }
            let done = goal
                .sub_goals
                .iter()
                .filter(|s| s.status == SubGoalStatus::Complete)
                .count();
            ((done as f64 / total as f64) * 100.0).round() as u32
        }
    }
}

/// Title of the first incomplete linked task, in board order.
pub fn next_action(goal: &Goal, tasks: &[Task]) -> String {
    if goal.linked_tasks.is_empty() {
        return NO_LINKED_TASKS.into();
    }
    tasks
        .iter()
        .find(|t| !t.completed && goal.linked_tasks.contains(&t.id))
        .map(|t| t.title.clone())
        .unwrap_or_else(|| ALL_LINKED_DONE.into())
}
