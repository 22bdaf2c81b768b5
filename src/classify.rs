//! Due-date classification and the quadrant policies derived from it.
//!
//! Everything here is pure: functions take the task list and today's date and
//! return decisions. The board applies those decisions through its normal
//! recorded mutation path.

use chrono::NaiveDate;

use crate::dates::days_between;
use crate::fields::Quadrant;
use crate::task::Task;

pub const DEFAULT_OVERLOAD_THRESHOLD: usize = 6;
pub const TOP_PRIORITY_SLOTS: usize = 3;

/// How pressing a due date is relative to today.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DueUrgency {
    None,
    /// Days past due. `Overdue(1)` is displayed as "yesterday".
    Overdue(u32),
    Today,
    Tomorrow,
    /// Due in 2..=7 days.
    Within7(u32),
    Far,
}

impl DueUrgency {
    pub fn is_pressing(self) -> bool {
        matches!(self, DueUrgency::Overdue(_) | DueUrgency::Today)
    }
}

/// Classify a due date against today. Both are plain calendar dates.
pub fn due_urgency(due: Option<NaiveDate>, today: NaiveDate) -> DueUrgency {
    let Some(due) = due else {
        return DueUrgency::None;
    };
    match days_between(today, due) {
        0 => DueUrgency::Today,
        1 => DueUrgency::Tomorrow,
        n if n < 0 => DueUrgency::Overdue(n.unsigned_abs() as u32),
        n if n <= 7 => DueUrgency::Within7(n as u32),
        _ => DueUrgency::Far,
    }
}

/// Strictly before today.
pub fn is_overdue(due: Option<NaiveDate>, today: NaiveDate) -> bool {
    due.is_some_and(|d| d < today)
}

/// Sort tasks of one quadrant for display: incomplete first, then dated before
/// undated, then by ascending due date. The sort is stable, so ties keep their
/// insertion order.
pub fn sort_for_display(tasks: &mut [&Task]) {
    tasks.sort_by_key(|t| (t.completed, t.due_date.is_none(), t.due_date));
}

/// Tasks whose deadline has arrived while they sit in a non-urgent quadrant,
/// paired with the quadrant they should move to.
pub fn promotion_candidates(tasks: &[Task], today: NaiveDate) -> Vec<(u64, Quadrant)> {
    tasks
        .iter()
        .filter(|t| !t.completed)
        .filter(|t| due_urgency(t.due_date, today).is_pressing())
        .filter_map(|t| t.quadrant.promoted().map(|q| (t.id, q)))
        .collect()
}

/// Number of incomplete tasks in q1.
pub fn q1_load(tasks: &[Task]) -> usize {
    tasks
        .iter()
        .filter(|t| t.quadrant == Quadrant::Q1 && !t.completed)
        .count()
}

/// Ids of the top incomplete q1 tasks with their rank (1-based).
pub fn top_priorities(tasks: &[Task]) -> Vec<(u64, usize)> {
    let mut q1: Vec<&Task> = tasks
        .iter()
        .filter(|t| t.quadrant == Quadrant::Q1 && !t.completed)
        .collect();
    sort_for_display(&mut q1);
    q1.iter()
        .take(TOP_PRIORITY_SLOTS)
        .enumerate()
        .map(|(i, t)| (t.id, i + 1))
        .collect()
}

/// Rank of a task among the top priorities, if it is one.
pub fn priority_rank(tasks: &[Task], id: u64) -> Option<usize> {
    top_priorities(tasks)
        .into_iter()
        .find(|(tid, _)| *tid == id)
        .map(|(_, rank)| rank)
}

/// One-shot advisory raised when q1 fills up.
#[derive(Debug, Clone)]
pub struct OverloadMonitor {
    threshold: usize,
    warned: bool,
}

impl Default for OverloadMonitor {
    fn default() -> Self {
        OverloadMonitor::new(DEFAULT_OVERLOAD_THRESHOLD)
    }
}

impl OverloadMonitor {
    pub fn new(threshold: usize) -> Self {
        OverloadMonitor {
            threshold: threshold.max(1),
            warned: false,
        }
    }

    pub fn threshold(&self) -> usize {
        self.threshold
    }

    #[cfg(test)]
    pub fn has_warned(&self) -> bool {
        self.warned
    }

    /// Returns the q1 load the first time it reaches the threshold in this session.
    pub fn check(&mut self, tasks: &[Task]) -> Option<usize> {
        if self.warned {
            return None;
        }
        let load = q1_load(tasks);
        if load >= self.threshold {
            self.warned = true;
            Some(load)
        } else {
            None
        }
    }
}
