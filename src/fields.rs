//! Enumerations and field types for the board.
//!
//! This module defines the structured values used to classify tasks and goals:
//! the four matrix quadrants, goal kinds and statuses, and the action kinds
//! recorded by the undo/redo log.

use clap::ValueEnum;
use serde::{Deserialize, Serialize};

/// One of the four urgency/importance buckets of the Eisenhower matrix.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, ValueEnum, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[serde(rename_all = "lowercase")]
pub enum Quadrant {
    /// Urgent and important.
    Q1,
    /// Important, not urgent.
    Q2,
    /// Urgent, not important.
    Q3,
    /// Neither urgent nor important.
    Q4,
}

impl Quadrant {
    pub const ALL: [Quadrant; 4] = [Quadrant::Q1, Quadrant::Q2, Quadrant::Q3, Quadrant::Q4];

    /// Long label used in summaries and board headers.
    pub fn label(self) -> &'static str {
        match self {
            Quadrant::Q1 => "Urgent & Important",
            Quadrant::Q2 => "Important, Not Urgent",
            Quadrant::Q3 => "Urgent, Not Important",
            Quadrant::Q4 => "Neither Urgent nor Important",
        }
    }

    /// The recommended action for the quadrant.
    pub fn subtitle(self) -> &'static str {
        match self {
            Quadrant::Q1 => "Do First",
            Quadrant::Q2 => "Schedule",
            Quadrant::Q3 => "Delegate",
            Quadrant::Q4 => "Eliminate",
        }
    }

    pub fn short(self) -> &'static str {
        match self {
            Quadrant::Q1 => "q1",
            Quadrant::Q2 => "q2",
            Quadrant::Q3 => "q3",
            Quadrant::Q4 => "q4",
        }
    }

    pub fn index(self) -> usize {
        match self {
            Quadrant::Q1 => 0,
            Quadrant::Q2 => 1,
            Quadrant::Q3 => 2,
            Quadrant::Q4 => 3,
        }
    }

    pub fn from_index(i: usize) -> Option<Quadrant> {
        Quadrant::ALL.get(i).copied()
    }

    pub fn is_urgent(self) -> bool {
        matches!(self, Quadrant::Q1 | Quadrant::Q3)
    }

    pub fn is_important(self) -> bool {
        matches!(self, Quadrant::Q1 | Quadrant::Q2)
    }

    /// The quadrant a task lands in once its deadline arrives.
    ///
    /// Only the urgency axis flips: q2 becomes q1 and q4 becomes q3. Quadrants that
    /// are already urgent have nowhere to go.
    pub fn promoted(self) -> Option<Quadrant> {
        match self {
            Quadrant::Q2 => Some(Quadrant::Q1),
            Quadrant::Q4 => Some(Quadrant::Q3),
            Quadrant::Q1 | Quadrant::Q3 => None,
        }
    }
}

/// Forward action that produced an undo/redo log entry.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub enum ActionKind {
    Create,
    Delete,
    Complete,
    Edit,
    Move,
    DeleteShoutout,
}

impl ActionKind {
    pub fn describe(self) -> &'static str {
        match self {
            ActionKind::Create => "create",
            ActionKind::Delete => "delete",
            ActionKind::Complete => "completion",
            ActionKind::Edit => "edit",
            ActionKind::Move => "move",
            ActionKind::DeleteShoutout => "shoutout deletion",
        }
    }
}

/// Goal shape: a simple goal is done or not, a major goal tracks sub-goals.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, ValueEnum, PartialEq, Eq, Default)]
#[serde(rename_all = "lowercase")]
pub enum GoalKind {
    #[default]
    Simple,
    Major,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, ValueEnum, PartialEq, Eq, Default)]
#[serde(rename_all = "lowercase")]
pub enum GoalStatus {
    #[default]
    Active,
    Paused,
    Completed,
    Abandoned,
}

impl GoalStatus {
    pub fn label(self) -> &'static str {
        match self {
            GoalStatus::Active => "active",
            GoalStatus::Paused => "paused",
            GoalStatus::Completed => "completed",
            GoalStatus::Abandoned => "abandoned",
        }
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "lowercase")]
pub enum SubGoalStatus {
    #[default]
    Pending,
    Complete,
}

/// How long a goal has gone without linked activity, relative to its threshold.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Staleness {
    Never,
    Fresh,
    Warning,
    Stale,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn promotion_keeps_importance_axis() {
        assert_eq!(Quadrant::Q2.promoted(), Some(Quadrant::Q1));
        assert_eq!(Quadrant::Q4.promoted(), Some(Quadrant::Q3));
        assert_eq!(Quadrant::Q1.promoted(), None);
        assert_eq!(Quadrant::Q3.promoted(), None);
        for q in [Quadrant::Q2, Quadrant::Q4] {
            let p = q.promoted().unwrap();
            assert_eq!(p.is_important(), q.is_important());
            assert!(p.is_urgent());
        }
    }

    #[test]
    fn quadrant_serialises_lowercase() {
        assert_eq!(serde_json::to_string(&Quadrant::Q3).unwrap(), "\"q3\"");
        let q: Quadrant = serde_json::from_str("\"q4\"").unwrap();
        assert_eq!(q, Quadrant::Q4);
    }

    #[test]
    fn index_round_trips() {
        for q in Quadrant::ALL {
            assert_eq!(Quadrant::from_index(q.index()), Some(q));
        }
        assert_eq!(Quadrant::from_index(4), None);
    }
}
