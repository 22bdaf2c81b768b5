//! The board: task store, undo/redo wiring and the settle pass.
//!
//! `Database` owns every collection the board works with and is the only place
//! tasks are mutated. Each reversible mutation records an [`ActionEntry`] before
//! it takes effect; validation failures are silent no-ops that record nothing.

use chrono::{DateTime, NaiveDate, Utc};

use crate::classify::{self, OverloadMonitor};
use crate::config::Config;
use crate::dates::{format_due, parse_iso_date, week_start};
use crate::error::Result;
use crate::fields::{ActionKind, Quadrant};
use crate::goal::{ArchivedGoal, Goal, GoalBook};
use crate::history::{ActionEntry, ActionLog, Snapshot};
use crate::icon::auto_icon;
use crate::rollover::HistoryEntry;
use crate::storage::*;
use crate::task::{clean_text, example_tasks, Shoutout, Task, TaskInput, TaskPatch};

/// Result of asking to toggle a task's completion.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Completion {
    /// The flag was flipped; carries the new value.
    Toggled { completed: bool },
    /// A q3 task without a delegate: call [`Database::confirm_delegate`] to finish,
    /// or do nothing to cancel.
    NeedsDelegate,
    Missing,
}

/// What one settle pass changed.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Settled {
    pub promoted: Vec<(u64, Quadrant, Quadrant)>,
    /// q1 load, set the first time it reaches the overload threshold this session.
    pub overload: Option<usize>,
}

/// In-memory board state.
#[derive(Debug, Clone)]
pub struct Database {
    pub tasks: Vec<Task>,
    pub shoutouts: Vec<Shoutout>,
    pub goals: GoalBook,
    pub period_start: NaiveDate,
    /// Rolled-over periods, newest first.
    pub history: Vec<HistoryEntry>,
    log: ActionLog,
    overload: OverloadMonitor,
    dragging: Option<u64>,
}

impl Database {
    /// An empty board whose current period starts at `period_start`.
    pub fn new(period_start: NaiveDate) -> Self {
        Database {
            tasks: Vec::new(),
            shoutouts: Vec::new(),
            goals: GoalBook::default(),
            period_start,
            history: Vec::new(),
            log: ActionLog::default(),
            overload: OverloadMonitor::default(),
            dragging: None,
        }
    }

    pub fn with_limits(mut self, undo_capacity: usize, overload_threshold: usize) -> Self {
        self.log.set_capacity(undo_capacity);
        self.overload = OverloadMonitor::new(overload_threshold);
        self
    }

    /// Load the board from `store`. Missing or unreadable keys fall back to defaults;
    /// the example tasks are only seeded when the task key has never been written.
    pub fn load(store: &dyn KeyValueStore, config: &Config, now: DateTime<Utc>, today: NaiveDate) -> Self {
        let tasks = match load_json::<Vec<Task>>(store, KEY_TASKS) {
            Loaded::Value(tasks) => tasks,
            Loaded::Missing if config.seed_examples => {
                tracing::info!("no stored tasks, seeding examples");
                example_tasks(now, today)
            }
            Loaded::Missing => Vec::new(),
            Loaded::Corrupt(e) => {
                tracing::warn!(error = %e, "stored tasks unreadable, starting empty");
                Vec::new()
            }
        };
        let period_start = load_or::<Option<String>>(store, KEY_PERIOD_START, None)
            .as_deref()
            .and_then(parse_iso_date)
            .unwrap_or_else(|| week_start(today));
        let mut log: ActionLog = load_or(store, KEY_ACTION_LOG, ActionLog::default());
        log.set_capacity(config.undo_capacity);

        Database {
            tasks,
            shoutouts: load_or(store, KEY_SHOUTOUTS, Vec::new()),
            goals: GoalBook::new(
                load_or::<Vec<Goal>>(store, KEY_GOALS, Vec::new()),
                load_or::<Vec<ArchivedGoal>>(store, KEY_GOAL_ARCHIVE, Vec::new()),
            ),
            period_start,
            history: load_or(store, KEY_HISTORY, Vec::new()),
            log,
            overload: OverloadMonitor::new(config.overload_threshold),
            dragging: None,
        }
    }

    /// Persist every collection, the period start and the action log.
    ///
    /// Each key is written atomically but the set as a whole is not. The action log
    /// goes first, so a failure part-way leaves it ahead of the stored tasks and
    /// never behind them. The next successful save rewrites every key.
    pub fn save(&self, store: &mut dyn KeyValueStore) -> Result<()> {
        save_json(store, KEY_ACTION_LOG, &self.log)?;
        save_json(store, KEY_TASKS, &self.tasks)?;
        save_json(store, KEY_PERIOD_START, &self.period_start.format("%Y-%m-%d").to_string())?;
        save_json(store, KEY_HISTORY, &self.history)?;
        save_json(store, KEY_SHOUTOUTS, &self.shoutouts)?;
        save_json(store, KEY_GOALS, &self.goals.goals)?;
        save_json(store, KEY_GOAL_ARCHIVE, &self.goals.archive)?;
        Ok(())
    }

    /// Generate an id that is unique in the task list and roughly tracks creation time.
    fn next_task_id(&self, now: DateTime<Utc>) -> u64 {
        let max = self.tasks.iter().map(|t| t.id).max().unwrap_or(0);
        (now.timestamp_millis().max(0) as u64).max(max + 1)
    }

    fn next_shoutout_id(&self, now: DateTime<Utc>) -> u64 {
        let max = self.shoutouts.iter().map(|s| s.id).max().unwrap_or(0);
        (now.timestamp_millis().max(0) as u64).max(max + 1)
    }

    pub fn get(&self, id: u64) -> Option<&Task> {
        self.tasks.iter().find(|t| t.id == id)
    }

    fn position(&self, id: u64) -> Option<usize> {
        self.tasks.iter().position(|t| t.id == id)
    }

    pub fn log(&self) -> &ActionLog {
        &self.log
    }

    /// Drop all undo/redo history.
    pub fn clear_log(&mut self) {
        self.log.clear();
    }

    /// Add a task. Returns its id, or `None` when the title is blank.
    pub fn create_task(&mut self, input: TaskInput, now: DateTime<Utc>, today: NaiveDate) -> Option<u64> {
        let title = input.title.trim().to_string();
        if title.is_empty() {
            return None;
        }
        let icon = clean_text(input.icon).unwrap_or_else(|| auto_icon(&title).to_string());
        let goal_id = clean_text(input.goal_id).filter(|g| self.goals.get(g).is_some());
        let task = Task {
            id: self.next_task_id(now),
            title,
            description: clean_text(input.description),
            quadrant: input.quadrant.unwrap_or(Quadrant::Q2),
            due_date: input.due_date,
            completed: false,
            icon,
            delegate: clean_text(input.delegate),
            goal_id,
            created_at: now,
        };
        let id = task.id;
        if let Some(goal) = &task.goal_id {
            self.goals.link_task(goal, id, today);
        }
        self.log.record(ActionEntry::new(
            ActionKind::Create,
            None,
            Some(Snapshot::Task(task.clone())),
            self.tasks.len(),
        ));
        tracing::debug!(id, quadrant = ?task.quadrant, "task created");
        self.tasks.push(task);
        Some(id)
    }

    /// Apply a partial update. Returns false when the task is missing, the resulting
    /// title would be blank, or nothing actually changes.
    pub fn update_task(&mut self, id: u64, patch: TaskPatch, today: NaiveDate) -> bool {
        let Some(pos) = self.position(id) else {
            return false;
        };
        let before = self.tasks[pos].clone();
        let mut after = before.clone();

        if let Some(title) = patch.title {
            let title = title.trim().to_string();
            if title.is_empty() {
                return false;
            }
            after.title = title;
        }
        if let Some(description) = patch.description {
            after.description = clean_text(description);
        }
        if let Some(quadrant) = patch.quadrant {
            after.quadrant = quadrant;
        }
        if let Some(due) = patch.due_date {
            after.due_date = due;
        }
        match clean_text(patch.icon) {
            Some(icon) => after.icon = icon,
            None if after.title != before.title => after.icon = auto_icon(&after.title).to_string(),
            None => {}
        }
        if let Some(delegate) = patch.delegate {
            after.delegate = clean_text(delegate);
        }
        if let Some(goal) = patch.goal_id {
            after.goal_id = clean_text(goal).filter(|g| self.goals.get(g).is_some());
        }
        if after == before {
            return false;
        }

        if after.goal_id != before.goal_id {
            if let Some(old) = &before.goal_id {
                self.goals.unlink_task(old, id);
            }
            if let Some(new) = &after.goal_id {
                self.goals.link_task(new, id, today);
            }
        }
        self.log.record(ActionEntry::new(
            ActionKind::Edit,
            Some(Snapshot::Task(before)),
            Some(Snapshot::Task(after.clone())),
            pos,
        ));
        tracing::debug!(id, "task edited");
        self.tasks[pos] = after;
        true
    }

    /// Remove a task. Goal links are left in place so an undo restores a consistent board.
    pub fn delete_task(&mut self, id: u64) -> Option<Task> {
        let pos = self.position(id)?;
        let task = self.tasks.remove(pos);
        self.log.record(ActionEntry::new(
            ActionKind::Delete,
            Some(Snapshot::Task(task.clone())),
            None,
            pos,
        ));
        tracing::debug!(id, "task deleted");
        Some(task)
    }

    /// First phase of completion. Flips the flag unless the task is an undelegated,
    /// incomplete q3 task, in which case nothing changes and a delegate is requested.
    pub fn toggle_complete(&mut self, id: u64) -> Completion {
        let Some(pos) = self.position(id) else {
            return Completion::Missing;
        };
        if self.tasks[pos].needs_delegate() {
            return Completion::NeedsDelegate;
        }
        let before = self.tasks[pos].clone();
        let mut after = before.clone();
        after.completed = !before.completed;
        let completed = after.completed;
        self.log.record(ActionEntry::new(
            ActionKind::Complete,
            Some(Snapshot::Task(before)),
            Some(Snapshot::Task(after.clone())),
            pos,
        ));
        tracing::debug!(id, completed, "task completion toggled");
        self.tasks[pos] = after;
        Completion::Toggled { completed }
    }

    /// Second phase: record who the task went to and complete it, as one action.
    pub fn confirm_delegate(&mut self, id: u64, name: &str) -> bool {
        let name = name.trim();
        if name.is_empty() {
            return false;
        }
        let Some(pos) = self.position(id) else {
            return false;
        };
        let before = self.tasks[pos].clone();
        if before.completed {
            return false;
        }
        let mut after = before.clone();
        after.delegate = Some(name.to_string());
        after.completed = true;
        self.log.record(ActionEntry::new(
            ActionKind::Complete,
            Some(Snapshot::Task(before)),
            Some(Snapshot::Task(after.clone())),
            pos,
        ));
        tracing::debug!(id, delegate = name, "task delegated and completed");
        self.tasks[pos] = after;
        true
    }

    /// Move a task to another quadrant. Moving to the current quadrant records nothing.
    pub fn move_task(&mut self, id: u64, quadrant: Quadrant) -> bool {
        let Some(pos) = self.position(id) else {
            return false;
        };
        if self.tasks[pos].quadrant == quadrant {
            return false;
        }
        let before = self.tasks[pos].clone();
        let mut after = before.clone();
        after.quadrant = quadrant;
        self.log.record(ActionEntry::new(
            ActionKind::Move,
            Some(Snapshot::Task(before)),
            Some(Snapshot::Task(after.clone())),
            pos,
        ));
        tracing::debug!(id, to = ?quadrant, "task moved");
        self.tasks[pos] = after;
        true
    }

    /// Tasks of one quadrant in display order.
    pub fn list_by_quadrant(&self, quadrant: Quadrant, hide_completed: bool) -> Vec<&Task> {
        let mut tasks: Vec<&Task> = self
            .tasks
            .iter()
            .filter(|t| t.quadrant == quadrant)
            .filter(|t| !(hide_completed && t.completed))
            .collect();
        classify::sort_for_display(&mut tasks);
        tasks
    }

    /// The ranked top-priority q1 tasks.
    pub fn top_priorities(&self) -> Vec<(&Task, usize)> {
        classify::top_priorities(&self.tasks)
            .into_iter()
            .filter_map(|(id, rank)| self.get(id).map(|t| (t, rank)))
            .collect()
    }

    pub fn priority_rank(&self, id: u64) -> Option<usize> {
        classify::priority_rank(&self.tasks, id)
    }

    /// Revert the newest recorded action.
    pub fn undo(&mut self) -> Option<ActionKind> {
        let (tasks, shoutouts) = (&mut self.tasks, &mut self.shoutouts);
        let kind = self.log.undo(|entry| {
            restore(tasks, shoutouts, entry.before.as_ref(), entry.after.as_ref(), entry.index)
        });
        match kind {
            Some(k) => tracing::info!(kind = ?k, "undo"),
            None => tracing::info!("nothing to undo"),
        }
        kind
    }

    /// Re-apply the newest undone action.
    pub fn redo(&mut self) -> Option<ActionKind> {
        let (tasks, shoutouts) = (&mut self.tasks, &mut self.shoutouts);
        let kind = self.log.redo(|entry| {
            restore(tasks, shoutouts, entry.after.as_ref(), entry.before.as_ref(), entry.index)
        });
        match kind {
            Some(k) => tracing::info!(kind = ?k, "redo"),
            None => tracing::info!("nothing to redo"),
        }
        kind
    }

    pub fn is_dragging(&self) -> bool {
        self.dragging.is_some()
    }

    pub fn dragged(&self) -> Option<u64> {
        self.dragging
    }

    /// Start an interactive move. Promotion is held off until the drag ends.
    pub fn begin_drag(&mut self, id: u64) -> bool {
        if self.get(id).is_none() {
            return false;
        }
        self.dragging = Some(id);
        true
    }

    /// Finish an interactive move: drop on `target`, or cancel with `None`.
    /// The drag flag is cleared either way.
    pub fn end_drag(&mut self, target: Option<Quadrant>) -> bool {
        let Some(id) = self.dragging.take() else {
            return false;
        };
        match target {
            Some(q) => self.move_task(id, q),
            None => false,
        }
    }

    /// Move every due-or-overdue task out of the non-urgent quadrants. Each move is
    /// recorded like a manual one. Does nothing while a drag is in progress.
    pub fn promote(&mut self, today: NaiveDate) -> Vec<(u64, Quadrant, Quadrant)> {
        if self.is_dragging() {
            return Vec::new();
        }
        let mut moved = Vec::new();
        for (id, to) in classify::promotion_candidates(&self.tasks, today) {
            let from = self.get(id).map(|t| t.quadrant);
            if let Some(from) = from {
                if self.move_task(id, to) {
                    tracing::info!(id, from = ?from, to = ?to, "task auto-promoted");
                    moved.push((id, from, to));
                }
            }
        }
        moved
    }

    /// Promotion followed by the overload check. Run after forward mutations and at
    /// session start, never straight after undo/redo.
    pub fn settle(&mut self, today: NaiveDate) -> Settled {
        let promoted = self.promote(today);
        let overload = self.overload.check(&self.tasks);
        if let Some(load) = overload {
            tracing::warn!(load, threshold = self.overload.threshold(), "q1 is overloaded");
        }
        Settled { promoted, overload }
    }

    /// Add a shoutout. Both fields must be non-blank.
    pub fn add_shoutout(&mut self, colleague: &str, note: &str, now: DateTime<Utc>) -> Option<u64> {
        let (colleague, note) = (colleague.trim(), note.trim());
        if colleague.is_empty() || note.is_empty() {
            return None;
        }
        let shoutout = Shoutout {
            id: self.next_shoutout_id(now),
            colleague: colleague.to_string(),
            note: note.to_string(),
            created_at: now,
        };
        let id = shoutout.id;
        tracing::debug!(id, "shoutout added");
        self.shoutouts.push(shoutout);
        Some(id)
    }

    pub fn delete_shoutout(&mut self, id: u64) -> Option<Shoutout> {
        let pos = self.shoutouts.iter().position(|s| s.id == id)?;
        let shoutout = self.shoutouts.remove(pos);
        self.log.record(ActionEntry::new(
            ActionKind::DeleteShoutout,
            Some(Snapshot::Shoutout(shoutout.clone())),
            None,
            pos,
        ));
        tracing::debug!(id, "shoutout deleted");
        Some(shoutout)
    }
}

/// Make the board hold `target` (or not hold the entity at all when `target` is absent).
/// `other` names the entity when `target` is absent.
fn restore(
    tasks: &mut Vec<Task>,
    shoutouts: &mut Vec<Shoutout>,
    target: Option<&Snapshot>,
    other: Option<&Snapshot>,
    index: usize,
) {
    match (target, other) {
        (Some(Snapshot::Task(t)), _) => upsert(tasks, t.clone(), index, |x| x.id),
        (Some(Snapshot::Shoutout(s)), _) => upsert(shoutouts, s.clone(), index, |x| x.id),
        (None, Some(Snapshot::Task(t))) => tasks.retain(|x| x.id != t.id),
        (None, Some(Snapshot::Shoutout(s))) => shoutouts.retain(|x| x.id != s.id),
        (None, None) => {}
    }
}

fn upsert<T>(items: &mut Vec<T>, item: T, index: usize, id: impl Fn(&T) -> u64) {
    let key = id(&item);
    match items.iter().position(|x| id(x) == key) {
        Some(pos) => items[pos] = item,
        None => {
            let at = index.min(items.len());
            items.insert(at, item);
        }
    }
}

/// Print tasks in a formatted table.
pub fn print_table(db: &Database, tasks: &[&Task], today: NaiveDate) {
    println!("{:<14} {:<4} {:<5} {:<12} {}", "ID", "Q", "Done", "Due", "Title");
    for t in tasks {
        let rank = db
            .priority_rank(t.id)
            .map(|r| format!(" #{r}"))
            .unwrap_or_default();
        let delegate = t
            .delegate
            .as_deref()
            .map(|d| format!(" → {d}"))
            .unwrap_or_default();
        let due = format_due(t.due_date, today);
        println!(
            "{:<14} {:<4} {:<5} {:<12} {} {}{}{}",
            t.id,
            t.quadrant.short(),
            if t.completed { "x" } else { "" },
            if due.is_empty() { "-".to_string() } else { due },
            t.icon,
            truncate(&t.title, 48),
            rank,
            delegate
        );
    }
}

/// Resolve a task identifier (either ID or title) to a task ID.
/// Returns an error if the title has multiple matches and suggests using the ID instead.
pub fn resolve_task_identifier(identifier: &str, db: &Database) -> std::result::Result<u64, String> {
    if let Ok(id) = identifier.parse::<u64>() {
        return match db.get(id) {
            Some(_) => Ok(id),
            None => Err(format!("Task with ID {id} not found")),
        };
    }

    let wanted = identifier.trim().to_lowercase();
    let matches: Vec<&Task> = db
        .tasks
        .iter()
        .filter(|task| task.title.to_lowercase() == wanted)
        .collect();

    match matches.len() {
        0 => Err(format!("No task found with title '{identifier}'")),
        1 => Ok(matches[0].id),
        _ => {
            let mut error_msg = format!("Multiple tasks found with title '{identifier}':\n");
            for task in matches {
                error_msg.push_str(&format!("  ID {}: {} ({})\n", task.id, task.title, task.quadrant.short()));
            }
            error_msg.push_str("Please use the specific ID instead.");
            Err(error_msg)
        }
    }
}

/// Truncate a string to a maximum width, adding ellipsis if needed.
pub fn truncate(s: &str, width: usize) -> String {
    if s.chars().count() <= width {
        s.to_string()
    } else {
        let mut out = String::new();
        for (i, ch) in s.chars().enumerate() {
            if i + 1 >= width {
                out.push('…');
                break;
            }
            out.push(ch);
        }
        out
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fields::GoalKind;
    use crate::goal::GoalDraft;
    use crate::storage::MemoryStore;
    use chrono::TimeZone;

    fn d(y: i32, m: u32, day: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, day).unwrap()
    }

    fn now() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 1, 15, 9, 0, 0).unwrap()
    }

    fn today() -> NaiveDate {
        d(2024, 1, 15)
    }

    fn board() -> Database {
        Database::new(today())
    }

    fn add(db: &mut Database, title: &str, q: Quadrant) -> u64 {
        db.create_task(TaskInput::titled(title).in_quadrant(q), now(), today())
            .unwrap()
    }

    /// Memory store whose writes to one key fail.
    struct BrokenKey {
        inner: MemoryStore,
        key: &'static str,
    }

    impl KeyValueStore for BrokenKey {
        fn get(&self, key: &str) -> Option<String> {
            self.inner.get(key)
        }

        fn set(&mut self, key: &str, value: String) -> Result<()> {
            if key == self.key {
                return Err(crate::error::BoardError::IoPath {
                    path: key.into(),
                    source: std::io::Error::other("disk full"),
                });
            }
            self.inner.set(key, value)
        }

        fn remove(&mut self, key: &str) -> Result<()> {
            self.inner.remove(key)
        }
    }

    #[test]
    fn save_writes_action_log_before_tasks() {
        let mut db = board();
        add(&mut db, "Pay invoice", Quadrant::Q1);
        let mut store = BrokenKey { inner: MemoryStore::new(), key: KEY_TASKS };
        assert!(db.save(&mut store).is_err());
        assert!(store.get(KEY_ACTION_LOG).is_some());
        assert!(store.get(KEY_TASKS).is_none());

        // Once the write goes through, the two agree again.
        let mut store = store.inner;
        db.save(&mut store).unwrap();
        let loaded = Database::load(&store, &Config::default(), now(), today());
        assert_eq!(loaded.tasks.len(), 1);
        assert_eq!(loaded.log().undo_len(), 1);
    }

    #[test]
    fn lowering_capacity_on_load_keeps_redo_in_order() {
        let mut db = board().with_limits(5, 6);
        let id = add(&mut db, "Plan offsite", Quadrant::Q1);
        for q in [Quadrant::Q2, Quadrant::Q3, Quadrant::Q4, Quadrant::Q1] {
            db.move_task(id, q);
        }
        for _ in 0..5 {
            db.undo();
        }
        assert!(db.tasks.is_empty());

        let mut db = db.with_limits(2, 6);
        assert_eq!(db.redo(), Some(ActionKind::Create));
        assert_eq!(db.get(id).map(|t| t.quadrant), Some(Quadrant::Q1));
        assert_eq!(db.redo(), Some(ActionKind::Move));
        assert_eq!(db.get(id).map(|t| t.quadrant), Some(Quadrant::Q2));
        assert_eq!(db.redo(), None);
    }

    #[test]
    fn create_rejects_blank_titles() {
        let mut db = board();
        assert_eq!(db.create_task(TaskInput::titled("   "), now(), today()), None);
        assert!(db.tasks.is_empty());
        assert!(!db.log().can_undo());
    }

    #[test]
    fn create_defaults_quadrant_and_icon() {
        let mut db = board();
        let id = db.create_task(TaskInput::titled("  Fix the login bug "), now(), today()).unwrap();
        let t = db.get(id).unwrap();
        assert_eq!(t.title, "Fix the login bug");
        assert_eq!(t.quadrant, Quadrant::Q2);
        assert_eq!(t.icon, "🐛");
        assert!(!t.completed);
    }

    #[test]
    fn ids_stay_unique_within_one_instant() {
        let mut db = board();
        let a = add(&mut db, "a", Quadrant::Q1);
        let b = add(&mut db, "b", Quadrant::Q1);
        let c = add(&mut db, "c", Quadrant::Q1);
        assert!(a < b && b < c);
    }

    #[test]
    fn undo_redo_round_trip() {
        let mut db = board();
        let keep = add(&mut db, "Keep me", Quadrant::Q1);
        let victim = add(&mut db, "Delete me", Quadrant::Q4);
        db.clear_log();
        let start = db.tasks.clone();

        let created = add(&mut db, "Write report", Quadrant::Q2);
        assert!(db.update_task(
            keep,
            TaskPatch { title: Some("Kept and renamed".into()), ..Default::default() },
            today()
        ));
        assert!(db.move_task(created, Quadrant::Q3));
        assert_eq!(db.toggle_complete(keep), Completion::Toggled { completed: true });
        assert!(db.delete_task(victim).is_some());
        let end = db.tasks.clone();

        for _ in 0..5 {
            assert!(db.undo().is_some());
        }
        assert_eq!(db.tasks, start);
        assert_eq!(db.undo(), None);

        for _ in 0..5 {
            assert!(db.redo().is_some());
        }
        assert_eq!(db.tasks, end);
        assert_eq!(db.redo(), None);
    }

    #[test]
    fn redo_after_edit_restores_post_edit_state() {
        let mut db = board();
        let id = add(&mut db, "Draft", Quadrant::Q2);
        db.update_task(id, TaskPatch { title: Some("Final".into()), ..Default::default() }, today());
        db.undo();
        assert_eq!(db.get(id).unwrap().title, "Draft");
        db.redo();
        assert_eq!(db.get(id).unwrap().title, "Final");
    }

    #[test]
    fn undo_of_delete_reinserts_at_original_position() {
        let mut db = board();
        let a = add(&mut db, "a", Quadrant::Q1);
        let b = add(&mut db, "b", Quadrant::Q1);
        let c = add(&mut db, "c", Quadrant::Q1);
        db.delete_task(b);
        assert_eq!(db.undo(), Some(ActionKind::Delete));
        let ids: Vec<u64> = db.tasks.iter().map(|t| t.id).collect();
        assert_eq!(ids, vec![a, b, c]);
    }

    #[test]
    fn new_action_clears_redo() {
        let mut db = board();
        let id = add(&mut db, "a", Quadrant::Q2);
        db.move_task(id, Quadrant::Q1);
        db.undo();
        assert!(db.log().can_redo());
        db.move_task(id, Quadrant::Q4);
        assert_eq!(db.redo(), None);
        assert_eq!(db.get(id).unwrap().quadrant, Quadrant::Q4);
    }

    #[test]
    fn capacity_limits_undo_depth() {
        let mut db = board().with_limits(3, 6);
        let id = add(&mut db, "a", Quadrant::Q1);
        for q in [Quadrant::Q2, Quadrant::Q3, Quadrant::Q4, Quadrant::Q1] {
            db.move_task(id, q);
        }
        let mut undone = 0;
        while db.undo().is_some() {
            undone += 1;
        }
        assert_eq!(undone, 3);
        // The create and the first move were evicted.
        assert_eq!(db.get(id).unwrap().quadrant, Quadrant::Q2);
    }

    #[test]
    fn move_to_same_quadrant_is_not_recorded() {
        let mut db = board();
        let id = add(&mut db, "a", Quadrant::Q3);
        db.clear_log();
        let before = db.tasks.clone();
        assert!(!db.move_task(id, Quadrant::Q3));
        assert_eq!(db.tasks, before);
        assert!(!db.log().can_undo());
    }

    #[test]
    fn delegate_gated_completion() {
        let mut db = board();
        let id = add(&mut db, "Book venue", Quadrant::Q3);
        db.clear_log();
        let before = db.get(id).unwrap().clone();

        assert_eq!(db.toggle_complete(id), Completion::NeedsDelegate);
        assert_eq!(db.get(id).unwrap(), &before);
        assert!(!db.log().can_undo());

        // Cancelling is simply never confirming; a blank name is rejected.
        assert!(!db.confirm_delegate(id, "   "));
        assert_eq!(db.get(id).unwrap(), &before);

        assert!(db.confirm_delegate(id, " Sam "));
        let t = db.get(id).unwrap();
        assert!(t.completed);
        assert_eq!(t.delegate.as_deref(), Some("Sam"));
        assert_eq!(db.log().undo_len(), 1);

        db.undo();
        assert_eq!(db.get(id).unwrap(), &before);

        // Once delegated, toggling works directly.
        db.redo();
        assert_eq!(db.toggle_complete(id), Completion::Toggled { completed: false });
        assert_eq!(db.toggle_complete(id), Completion::Toggled { completed: true });
        assert_eq!(db.toggle_complete(42), Completion::Missing);
    }

    #[test]
    fn edits_leave_completion_to_the_delegate_gate() {
        let mut db = board();
        let id = add(&mut db, "Order supplies", Quadrant::Q1);
        let patch = TaskPatch {
            title: Some("Order office supplies".into()),
            quadrant: Some(Quadrant::Q3),
            ..Default::default()
        };
        assert!(db.update_task(id, patch, today()));
        assert!(!db.get(id).unwrap().completed);
        assert_eq!(db.toggle_complete(id), Completion::NeedsDelegate);

        let patch = TaskPatch { delegate: Some(Some("Ana".into())), ..Default::default() };
        assert!(db.update_task(id, patch, today()));
        assert!(!db.get(id).unwrap().completed);
        assert_eq!(db.toggle_complete(id), Completion::Toggled { completed: true });
    }

    #[test]
    fn promotion_moves_due_tasks() {
        let mut db = board();
        let due_today = db
            .create_task(TaskInput::titled("a").in_quadrant(Quadrant::Q2).due(today()), now(), today())
            .unwrap();
        let overdue = db
            .create_task(TaskInput::titled("b").in_quadrant(Quadrant::Q4).due(d(2024, 1, 14)), now(), today())
            .unwrap();
        let tomorrow = db
            .create_task(TaskInput::titled("c").in_quadrant(Quadrant::Q2).due(d(2024, 1, 16)), now(), today())
            .unwrap();

        let settled = db.settle(today());
        assert_eq!(settled.promoted.len(), 2);
        assert_eq!(db.get(due_today).unwrap().quadrant, Quadrant::Q1);
        assert_eq!(db.get(overdue).unwrap().quadrant, Quadrant::Q3);
        assert_eq!(db.get(tomorrow).unwrap().quadrant, Quadrant::Q2);

        // Fixed point after one pass.
        let snapshot = db.tasks.clone();
        let undo_depth = db.log().undo_len();
        assert!(db.promote(today()).is_empty());
        assert_eq!(db.tasks, snapshot);
        assert_eq!(db.log().undo_len(), undo_depth);

        // Promotions are undoable.
        assert_eq!(db.undo(), Some(ActionKind::Move));
        assert_eq!(db.get(overdue).unwrap().quadrant, Quadrant::Q4);
    }

    #[test]
    fn promotion_waits_for_drag_to_end() {
        let mut db = board();
        let id = db
            .create_task(TaskInput::titled("a").in_quadrant(Quadrant::Q2).due(today()), now(), today())
            .unwrap();
        assert!(db.begin_drag(id));
        assert!(db.settle(today()).promoted.is_empty());
        assert_eq!(db.get(id).unwrap().quadrant, Quadrant::Q2);

        // Cancelled drag clears the flag without moving.
        assert!(!db.end_drag(None));
        assert!(!db.is_dragging());
        assert_eq!(db.settle(today()).promoted.len(), 1);
    }

    #[test]
    fn drop_moves_and_clears_flag() {
        let mut db = board();
        let id = add(&mut db, "a", Quadrant::Q2);
        db.begin_drag(id);
        assert_eq!(db.dragged(), Some(id));
        assert!(db.end_drag(Some(Quadrant::Q4)));
        assert!(!db.is_dragging());
        assert_eq!(db.get(id).unwrap().quadrant, Quadrant::Q4);
        assert!(!db.begin_drag(999));
    }

    #[test]
    fn overload_advisory_fires_once() {
        let mut db = board().with_limits(20, 3);
        for i in 0..2 {
            add(&mut db, &format!("t{i}"), Quadrant::Q1);
        }
        assert_eq!(db.settle(today()).overload, None);
        add(&mut db, "third", Quadrant::Q1);
        assert_eq!(db.settle(today()).overload, Some(3));
        add(&mut db, "fourth", Quadrant::Q1);
        assert_eq!(db.settle(today()).overload, None);
    }

    #[test]
    fn edits_rederive_icon_unless_overridden() {
        let mut db = board();
        let id = add(&mut db, "Reply to email", Quadrant::Q3);
        assert_eq!(db.get(id).unwrap().icon, "📧");
        db.update_task(id, TaskPatch { title: Some("Deploy site".into()), ..Default::default() }, today());
        assert_eq!(db.get(id).unwrap().icon, "🚀");
        db.update_task(
            id,
            TaskPatch { title: Some("Fix crash".into()), icon: Some("⭐".into()), ..Default::default() },
            today(),
        );
        assert_eq!(db.get(id).unwrap().icon, "⭐");
    }

    #[test]
    fn no_op_edits_are_not_recorded() {
        let mut db = board();
        let id = add(&mut db, "Same", Quadrant::Q2);
        db.clear_log();
        assert!(!db.update_task(id, TaskPatch { title: Some("Same".into()), ..Default::default() }, today()));
        assert!(!db.update_task(id, TaskPatch { title: Some("  ".into()), ..Default::default() }, today()));
        assert!(!db.log().can_undo());
    }

    #[test]
    fn goal_links_follow_task_goal_id() {
        let mut db = board();
        let draft = |title: &str| GoalDraft {
            kind: GoalKind::Simple,
            title: title.into(),
            outcome: "done".into(),
            start: Some(d(2024, 1, 1)),
            end: Some(d(2024, 2, 1)),
            sub_goals: Vec::new(),
        };
        let g1 = db.goals.create(draft("one"), now()).unwrap();
        let g2 = db.goals.create(draft("two"), now()).unwrap();

        let mut input = TaskInput::titled("Linked");
        input.goal_id = Some(g1.clone());
        let id = db.create_task(input, now(), today()).unwrap();
        assert_eq!(db.goals.get(&g1).unwrap().linked_tasks, vec![id]);
        assert_eq!(db.goals.get(&g1).unwrap().last_activity, Some(today()));

        let later = d(2024, 1, 17);
        db.update_task(id, TaskPatch { goal_id: Some(Some(g2.clone())), ..Default::default() }, later);
        assert!(db.goals.get(&g1).unwrap().linked_tasks.is_empty());
        assert_eq!(db.goals.get(&g2).unwrap().linked_tasks, vec![id]);
        assert_eq!(db.goals.get(&g2).unwrap().last_activity, Some(later));

        // Unknown goals are not linked.
        let mut stray = TaskInput::titled("Stray");
        stray.goal_id = Some("nope".into());
        let sid = db.create_task(stray, now(), today()).unwrap();
        assert_eq!(db.get(sid).unwrap().goal_id, None);
    }

    #[test]
    fn list_by_quadrant_filters_and_orders() {
        let mut db = board();
        let undated = add(&mut db, "undated", Quadrant::Q1);
        let late = db
            .create_task(TaskInput::titled("late").in_quadrant(Quadrant::Q1).due(d(2024, 1, 20)), now(), today())
            .unwrap();
        let soon = db
            .create_task(TaskInput::titled("soon").in_quadrant(Quadrant::Q1).due(d(2024, 1, 16)), now(), today())
            .unwrap();
        let done = add(&mut db, "done", Quadrant::Q1);
        db.toggle_complete(done);
        add(&mut db, "elsewhere", Quadrant::Q2);

        let ids: Vec<u64> = db.list_by_quadrant(Quadrant::Q1, false).iter().map(|t| t.id).collect();
        assert_eq!(ids, vec![soon, late, undated, done]);
        let ids: Vec<u64> = db.list_by_quadrant(Quadrant::Q1, true).iter().map(|t| t.id).collect();
        assert_eq!(ids, vec![soon, late, undated]);

        let top: Vec<(u64, usize)> = db.top_priorities().iter().map(|(t, r)| (t.id, *r)).collect();
        assert_eq!(top, vec![(soon, 1), (late, 2), (undated, 3)]);
    }

    #[test]
    fn shoutout_delete_is_undoable() {
        let mut db = board();
        assert_eq!(db.add_shoutout("  ", "thanks", now()), None);
        let id = db.add_shoutout("Ana", "Covered my on-call", now()).unwrap();
        assert_eq!(db.delete_shoutout(id).map(|s| s.colleague), Some("Ana".to_string()));
        assert!(db.shoutouts.is_empty());
        assert_eq!(db.undo(), Some(ActionKind::DeleteShoutout));
        assert_eq!(db.shoutouts.len(), 1);
        assert_eq!(db.redo(), Some(ActionKind::DeleteShoutout));
        assert!(db.shoutouts.is_empty());
    }

    #[test]
    fn first_load_seeds_examples_only_once() {
        let mut store = MemoryStore::new();
        let config = Config::default();
        let db = Database::load(&store, &config, now(), today());
        assert_eq!(db.tasks.len(), 8);
        assert_eq!(db.period_start, today());

        let mut emptied = db.clone();
        emptied.tasks.clear();
        emptied.save(&mut store).unwrap();
        let again = Database::load(&store, &config, now(), today());
        assert!(again.tasks.is_empty());

        let no_seed = Config { seed_examples: false, ..Config::default() };
        let fresh = Database::load(&MemoryStore::new(), &no_seed, now(), today());
        assert!(fresh.tasks.is_empty());
    }

    #[test]
    fn corrupt_keys_fall_back_without_panicking() {
        let mut store = MemoryStore::new();
        store.set(KEY_TASKS, "not json".into()).unwrap();
        store.set(KEY_PERIOD_START, "\"garbage\"".into()).unwrap();
        store.set(KEY_HISTORY, "{".into()).unwrap();
        let db = Database::load(&store, &Config::default(), now(), d(2024, 1, 18));
        assert!(db.tasks.is_empty());
        assert!(db.history.is_empty());
        assert_eq!(db.period_start, d(2024, 1, 15));
    }

    #[test]
    fn save_and_load_keep_state_and_undo_log() {
        let mut store = MemoryStore::new();
        let mut db = board();
        let id = add(&mut db, "Persist me", Quadrant::Q3);
        db.move_task(id, Quadrant::Q1);
        db.save(&mut store).unwrap();

        let mut loaded = Database::load(&store, &Config::default(), now(), today());
        assert_eq!(loaded.tasks, db.tasks);
        assert_eq!(loaded.period_start, today());
        assert_eq!(loaded.undo(), Some(ActionKind::Move));
        assert_eq!(loaded.get(id).unwrap().quadrant, Quadrant::Q3);
    }
}
