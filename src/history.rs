//! Bounded undo/redo log.
//!
//! Every reversible mutation of the board is recorded as an [`ActionEntry`] holding
//! the affected entity as it was before and after the change, plus its position in
//! its collection. Undo restores `before`, redo restores `after`; an absent side
//! means "the entity does not exist" (a create has no `before`, a delete has no
//! `after`). The log itself is pure stack bookkeeping: applying an entry to the
//! board is the caller's job.

use std::collections::VecDeque;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::fields::ActionKind;
use crate::task::{Shoutout, Task};

pub const DEFAULT_CAPACITY: usize = 20;

/// Snapshot of one entity touched by an action.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "entity", content = "value", rename_all = "camelCase")]
pub enum Snapshot {
    Task(Task),
    Shoutout(Shoutout),
}

impl Snapshot {
    pub fn id(&self) -> u64 {
        match self {
            Snapshot::Task(t) => t.id,
            Snapshot::Shoutout(s) => s.id,
        }
    }
}

/// One recorded action.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ActionEntry {
    pub kind: ActionKind,
    pub before: Option<Snapshot>,
    pub after: Option<Snapshot>,
    /// Position of the entity in its collection when the action happened.
    pub index: usize,
    pub timestamp: DateTime<Utc>,
}

impl ActionEntry {
    pub fn new(kind: ActionKind, before: Option<Snapshot>, after: Option<Snapshot>, index: usize) -> Self {
        ActionEntry {
            kind,
            before,
            after,
            index,
            timestamp: Utc::now(),
        }
    }

    /// Id of the entity this entry is about.
    pub fn subject_id(&self) -> Option<u64> {
        self.before.as_ref().or(self.after.as_ref()).map(Snapshot::id)
    }
}

/// Two stacks: `undone` holds actions that can be undone (newest at the back), `redone`
/// holds actions that were undone and can be re-applied.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ActionLog {
    undone: VecDeque<ActionEntry>,
    redone: Vec<ActionEntry>,
    #[serde(skip, default = "default_capacity")]
    capacity: usize,
}

fn default_capacity() -> usize {
    DEFAULT_CAPACITY
}

impl Default for ActionLog {
    fn default() -> Self {
        ActionLog::with_capacity(DEFAULT_CAPACITY)
    }
}

impl ActionLog {
    pub fn with_capacity(capacity: usize) -> Self {
        ActionLog {
            undone: VecDeque::new(),
            redone: Vec::new(),
            capacity: capacity.max(1),
        }
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Change the capacity, evicting the oldest undoable entries if needed. The
    /// redo stack keeps the entries nearest the current state, which sit at its back.
    pub fn set_capacity(&mut self, capacity: usize) {
        self.capacity = capacity.max(1);
        self.evict();
        let excess = self.redone.len().saturating_sub(self.capacity);
        self.redone.drain(..excess);
    }

    /// Push a new action. Any redo history is discarded: a new action forks away
    /// from the undone branch.
    pub fn record(&mut self, entry: ActionEntry) {
        tracing::debug!(kind = ?entry.kind, id = ?entry.subject_id(), "recording action");
        self.undone.push_back(entry);
        self.evict();
        self.redone.clear();
    }

    fn evict(&mut self) {
        while self.undone.len() > self.capacity {
            self.undone.pop_front();
        }
    }

    /// Pop the newest undoable entry, hand it to `apply`, and park it on the redo stack.
    pub fn undo<F: FnOnce(&ActionEntry)>(&mut self, apply: F) -> Option<ActionKind> {
        let entry = self.undone.pop_back()?;
        apply(&entry);
        let kind = entry.kind;
        self.redone.push(entry);
        Some(kind)
    }

    /// Pop the newest redoable entry, hand it to `apply`, and return it to the undo stack.
    pub fn redo<F: FnOnce(&ActionEntry)>(&mut self, apply: F) -> Option<ActionKind> {
        let entry = self.redone.pop()?;
        apply(&entry);
        let kind = entry.kind;
        self.undone.push_back(entry);
        self.evict();
        Some(kind)
    }

    #[cfg(test)]
    pub fn can_undo(&self) -> bool {
        !self.undone.is_empty()
    }

    #[cfg(test)]
    pub fn can_redo(&self) -> bool {
        !self.redone.is_empty()
    }

    #[cfg(test)]
    pub fn undo_len(&self) -> usize {
        self.undone.len()
    }

    #[cfg(test)]
    pub fn redo_len(&self) -> usize {
        self.redone.len()
    }

    /// The entry `undo` would apply next.
    pub fn peek_undo(&self) -> Option<&ActionEntry> {
        self.undone.back()
    }

    pub fn peek_redo(&self) -> Option<&ActionEntry> {
        self.redone.last()
    }

    pub fn clear(&mut self) {
        self.undone.clear();
        self.redone.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fields::Quadrant;

    fn task(id: u64) -> Task {
        Task {
            id,
            title: format!("task {id}"),
            description: None,
            quadrant: Quadrant::Q2,
            due_date: None,
            completed: false,
            icon: String::new(),
            delegate: None,
            goal_id: None,
            created_at: Utc::now(),
        }
    }

    fn entry(kind: ActionKind, id: u64) -> ActionEntry {
        ActionEntry::new(kind, Some(Snapshot::Task(task(id))), None, 0)
    }

    #[test]
    fn starts_empty() {
        let log = ActionLog::default();
        assert!(!log.can_undo());
        assert!(!log.can_redo());
        assert_eq!(log.capacity(), DEFAULT_CAPACITY);
    }

    #[test]
    fn empty_stacks_report_nothing_to_do() {
        let mut log = ActionLog::default();
        let mut called = false;
        assert_eq!(log.undo(|_| called = true), None);
        assert_eq!(log.redo(|_| called = true), None);
        assert!(!called);
    }

    #[test]
    fn undo_moves_entry_to_redo_and_back() {
        let mut log = ActionLog::default();
        log.record(entry(ActionKind::Delete, 1));

        let mut seen = None;
        assert_eq!(log.undo(|e| seen = e.subject_id()), Some(ActionKind::Delete));
        assert_eq!(seen, Some(1));
        assert_eq!((log.undo_len(), log.redo_len()), (0, 1));

        assert_eq!(log.redo(|_| {}), Some(ActionKind::Delete));
        assert_eq!((log.undo_len(), log.redo_len()), (1, 0));
    }

    #[test]
    fn recording_clears_redo() {
        let mut log = ActionLog::default();
        log.record(entry(ActionKind::Delete, 1));
        log.undo(|_| {});
        assert!(log.can_redo());

        log.record(entry(ActionKind::Edit, 2));
        assert!(!log.can_redo());
        assert_eq!(log.redo(|_| {}), None);
    }

    #[test]
    fn capacity_evicts_oldest() {
        let mut log = ActionLog::with_capacity(3);
        for id in 1..=4 {
            log.record(entry(ActionKind::Edit, id));
        }
        assert_eq!(log.undo_len(), 3);

        let mut ids = Vec::new();
        while log.undo(|e| ids.push(e.subject_id().unwrap())).is_some() {}
        assert_eq!(ids, vec![4, 3, 2]);
    }

    #[test]
    fn shrinking_capacity_truncates() {
        let mut log = ActionLog::with_capacity(5);
        for id in 1..=5 {
            log.record(entry(ActionKind::Move, id));
        }
        log.set_capacity(2);
        assert_eq!(log.undo_len(), 2);
        assert_eq!(log.peek_undo().and_then(ActionEntry::subject_id), Some(5));
    }

    #[test]
    fn shrinking_capacity_keeps_next_redo() {
        let mut log = ActionLog::with_capacity(5);
        log.record(entry(ActionKind::Create, 1));
        for id in 2..=5 {
            log.record(entry(ActionKind::Move, id));
        }
        for _ in 0..5 {
            log.undo(|_| {});
        }
        log.set_capacity(2);
        assert_eq!(log.redo_len(), 2);

        // The create, undone last, must still be the first thing redone.
        let mut applied = Vec::new();
        log.redo(|e| applied.push((e.kind, e.subject_id())));
        log.redo(|e| applied.push((e.kind, e.subject_id())));
        assert_eq!(applied, vec![(ActionKind::Create, Some(1)), (ActionKind::Move, Some(2))]);
        assert!(!log.can_redo());
    }

    #[test]
    fn serialises_both_stacks() {
        let mut log = ActionLog::default();
        log.record(entry(ActionKind::Delete, 1));
        log.record(entry(ActionKind::Move, 2));
        log.undo(|_| {});
        let json = serde_json::to_string(&log).unwrap();
        let back: ActionLog = serde_json::from_str(&json).unwrap();
        assert_eq!(back.undo_len(), 1);
        assert_eq!(back.redo_len(), 1);
        assert_eq!(back.peek_redo().map(|e| e.kind), Some(ActionKind::Move));
    }
}
