//! Command implementations for the CLI interface.
//!
//! Each handler works on a board that `main` has already loaded. Forward
//! mutations run the settle pass before persisting; undo and redo persist
//! without settling so the redo stack survives.

use std::fs;
use std::path::Path;

use chrono::{Local, NaiveDate, Utc};
use clap::Subcommand;
use clap_complete::{generate, Shell};

use crate::backup::{self, backup_file_name, export_json};
use crate::config::{Config, Preferences, FONTS};
use crate::dates::{format_due, parse_due_input};
use crate::db::*;
use crate::error::BoardError;
use crate::fields::*;
use crate::goal::{next_action, progress, staleness_text, GoalDraft, SubGoalDraft};
use crate::rollover::write_summary;
use crate::storage::FileStore;
use crate::task::{TaskInput, TaskPatch};
use crate::tui::board_run::run_board_tui;

#[derive(Subcommand)]
pub enum Commands {
    /// Launch the interactive quadrant board.
    Ui,

    /// Add a new task.
    Add {
        /// Short title for the task.
        title: String,
        /// Optional longer description.
        #[arg(long)]
        desc: Option<String>,
        /// Quadrant: q1 (do first) | q2 (schedule) | q3 (delegate) | q4 (eliminate).
        #[arg(long, short, value_enum, default_value_t = Quadrant::Q2)]
        quadrant: Quadrant,
        /// Due date: YYYY-MM-DD, "today", "tomorrow", "friday", "in 3d", "eow", ...
        #[arg(long)]
        due: Option<String>,
        /// Icon override. Derived from the title when omitted.
        #[arg(long)]
        icon: Option<String>,
        /// Goal ID (or unique prefix) to link the task to.
        #[arg(long)]
        goal: Option<String>,
    },

    /// List tasks grouped by quadrant.
    List {
        /// Only show one quadrant.
        #[arg(long, short, value_enum)]
        quadrant: Option<Quadrant>,
        /// Hide completed tasks. Defaults to the saved preference.
        #[arg(long)]
        hide_completed: bool,
    },

    /// View a single task by ID or title.
    View {
        /// Task ID or title to view
        id: String,
    },

    /// Update fields on a task.
    Edit {
        /// Task ID or title to update
        id: String,
        #[arg(long)]
        title: Option<String>,
        #[arg(long)]
        desc: Option<String>,
        /// Clear the description.
        #[arg(long)]
        clear_desc: bool,
        #[arg(long, short, value_enum)]
        quadrant: Option<Quadrant>,
        #[arg(long)]
        due: Option<String>,
        /// Clear due date.
        #[arg(long)]
        clear_due: bool,
        #[arg(long)]
        icon: Option<String>,
        /// Who the task was handed to.
        #[arg(long)]
        delegate: Option<String>,
        /// Goal ID (or unique prefix) to link the task to.
        #[arg(long)]
        goal: Option<String>,
        /// Unlink the task from its goal.
        #[arg(long)]
        clear_goal: bool,
    },

    /// Toggle a task's completion.
    Done {
        /// Task ID or title
        id: String,
        /// Name of the person a q3 task was delegated to.
        #[arg(long)]
        delegate: Option<String>,
    },

    /// Move a task to another quadrant.
    Move {
        /// Task ID or title
        id: String,
        #[arg(value_enum)]
        quadrant: Quadrant,
    },

    /// Delete a task by ID or title.
    Delete {
        /// Task ID or title to delete
        id: String,
    },

    /// Revert the last change.
    Undo,

    /// Re-apply the last undone change.
    Redo,

    /// Show the ranked top priorities in q1.
    Top,

    /// Close the current week: write a summary and clear completed tasks.
    EndWeek {
        /// Keep the summary in history only, without writing a file.
        #[arg(long)]
        no_file: bool,
    },

    /// Browse past weekly summaries.
    History {
        #[command(subcommand)]
        action: HistoryAction,
    },

    /// Record thanks for a colleague.
    Shoutout {
        #[command(subcommand)]
        action: ShoutoutAction,
    },

    /// Manage goals.
    Goal {
        #[command(subcommand)]
        action: GoalAction,
    },

    /// Export the whole board to a JSON backup.
    Export {
        /// Output file path (default: task-prioritizer-backup-<date>.json)
        #[arg(long, short)]
        output: Option<String>,
    },

    /// Replace the board with a JSON backup.
    Import {
        /// Input JSON file path
        input: String,
        /// Skip creating backup before import
        #[arg(long)]
        no_backup: bool,
    },

    /// Show or change preferences.
    Prefs {
        /// Card font.
        #[arg(long)]
        font: Option<String>,
        /// Hide completed tasks by default.
        #[arg(long)]
        hide_completed: Option<bool>,
        /// Show the help overlay again on the next board launch.
        #[arg(long)]
        reset_help: bool,
        /// List the available fonts.
        #[arg(long)]
        list_fonts: bool,
    },

    /// Generate shell completion scripts.
    Completions {
        /// Shell to generate completions for
        #[arg(value_enum)]
        shell: Shell,
    },
}

#[derive(Subcommand)]
pub enum HistoryAction {
    /// List past weeks, newest first.
    List,
    /// Print the stored summary of one week.
    Show {
        /// History entry ID or unique prefix
        id: String,
    },
    /// Delete a history entry.
    Delete {
        /// History entry ID or unique prefix
        id: String,
    },
}

#[derive(Subcommand)]
pub enum ShoutoutAction {
    /// Add a shoutout.
    Add {
        /// Colleague's name.
        colleague: String,
        /// What they did.
        note: String,
    },
    /// List this week's shoutouts.
    List,
    /// Delete a shoutout.
    Delete {
        /// Shoutout ID
        id: u64,
    },
}

#[derive(Subcommand)]
pub enum GoalAction {
    /// Create a goal.
    Add {
        title: String,
        /// The outcome that means the goal is met.
        #[arg(long)]
        outcome: String,
        #[arg(long, value_enum, default_value_t = GoalKind::Simple)]
        kind: GoalKind,
        /// Start date (defaults to today).
        #[arg(long)]
        start: Option<String>,
        /// End date.
        #[arg(long)]
        end: String,
        /// Sub-goal title for a major goal. May be repeated.
        #[arg(long = "sub")]
        sub_goals: Vec<String>,
    },
    /// List goals.
    List {
        #[arg(long, value_enum)]
        status: Option<GoalStatus>,
        /// Only goals without recent activity.
        #[arg(long)]
        stale: bool,
    },
    /// Show one goal.
    View {
        /// Goal ID or unique prefix
        id: String,
    },
    /// Update a goal's title, outcome or timeline.
    Edit {
        /// Goal ID or unique prefix
        id: String,
        #[arg(long)]
        title: Option<String>,
        #[arg(long)]
        outcome: Option<String>,
        #[arg(long)]
        start: Option<String>,
        #[arg(long)]
        end: Option<String>,
    },
    /// Change a goal's status.
    Status {
        /// Goal ID or unique prefix
        id: String,
        #[arg(value_enum)]
        status: GoalStatus,
    },
    /// Link a task to a goal.
    Link {
        /// Goal ID or unique prefix
        id: String,
        /// Task ID or title
        task: String,
    },
    /// Unlink a task from a goal.
    Unlink {
        /// Goal ID or unique prefix
        id: String,
        /// Task ID or title
        task: String,
    },
    /// Move a goal to the archive.
    Archive {
        /// Goal ID or unique prefix
        id: String,
    },
    /// Delete a goal.
    Delete {
        /// Goal ID or unique prefix
        id: String,
        /// Delete from the archive instead.
        #[arg(long)]
        archived: bool,
    },
    /// List archived goals.
    Archived,
    /// Add a sub-goal to a major goal.
    SubAdd {
        /// Goal ID or unique prefix
        id: String,
        title: String,
        /// Target date.
        #[arg(long)]
        target: Option<String>,
    },
    /// Toggle a sub-goal between pending and complete.
    SubToggle {
        /// Goal ID or unique prefix
        id: String,
        /// Sub-goal number as shown by `goal view` (1-based)
        index: usize,
    },
    /// Remove a sub-goal.
    SubRemove {
        /// Goal ID or unique prefix
        id: String,
        /// Sub-goal number as shown by `goal view` (1-based)
        index: usize,
    },
}

fn today() -> NaiveDate {
    Local::now().date_naive()
}

/// Persist the board or exit.
fn save(db: &Database, store: &mut FileStore) {
    if let Err(e) = db.save(store) {
        eprintln!("Failed to save board: {e}");
        std::process::exit(1);
    }
}

/// Run the settle pass and report what it changed.
fn settle(db: &mut Database, today: NaiveDate) {
    let settled = db.settle(today);
    for (id, from, to) in &settled.promoted {
        let title = db.get(*id).map(|t| t.title.as_str()).unwrap_or("?");
        println!("Due date reached: moved '{}' from {} to {}.", title, from.short(), to.short());
    }
    if let Some(load) = settled.overload {
        eprintln!(
            "Warning: {load} open tasks in {}. Consider delegating or rescheduling some of them.",
            Quadrant::Q1.label()
        );
    }
}

/// Settle, then persist. Used after every forward mutation.
fn commit(db: &mut Database, store: &mut FileStore, today: NaiveDate) {
    settle(db, today);
    save(db, store);
}

fn task_or_exit(db: &Database, identifier: &str) -> u64 {
    match resolve_task_identifier(identifier, db) {
        Ok(id) => id,
        Err(e) => {
            eprintln!("Error resolving task: {e}");
            std::process::exit(1);
        }
    }
}

fn goal_or_exit(db: &Database, prefix: &str) -> String {
    match db.goals.resolve(prefix) {
        Some(id) => id,
        None => {
            eprintln!("{}", BoardError::GoalNotFound(prefix.to_string()));
            std::process::exit(1);
        }
    }
}

fn due_or_exit(input: &str, today: NaiveDate) -> NaiveDate {
    match parse_due_input(input, today) {
        Some(d) => d,
        None => {
            eprintln!("Could not understand date '{input}'. Try YYYY-MM-DD, 'tomorrow', 'friday' or 'in 3d'.");
            std::process::exit(1);
        }
    }
}

/// Launch the terminal user interface.
pub fn cmd_ui(data_dir: &Path, config: &Config) {
    if let Err(e) = run_board_tui(data_dir, config) {
        eprintln!("UI error: {e}");
        std::process::exit(1);
    }
}

/// Add a new task to the board.
pub fn cmd_add(
    db: &mut Database,
    store: &mut FileStore,
    title: String,
    desc: Option<String>,
    quadrant: Quadrant,
    due: Option<String>,
    icon: Option<String>,
    goal: Option<String>,
) {
    let today = today();
    let mut input = TaskInput::titled(&title).in_quadrant(quadrant);
    input.description = desc;
    input.due_date = due.as_deref().map(|s| due_or_exit(s, today));
    input.icon = icon;
    input.goal_id = goal.as_deref().map(|g| goal_or_exit(db, g));

    let Some(id) = db.create_task(input, Utc::now(), today) else {
        eprintln!("Task title cannot be empty.");
        std::process::exit(1);
    };
    commit(db, store, today);
    if let Some(task) = db.get(id) {
        println!("Added task {} {} [{}]", task.id, task.title, task.quadrant.short());
    }
}

/// List tasks quadrant by quadrant.
pub fn cmd_list(db: &mut Database, store: &mut FileStore, quadrant: Option<Quadrant>, hide_completed: bool) {
    let today = today();
    commit(db, store, today);
    let hide = hide_completed || Preferences::load(store).hide_completed;

    let quadrants: Vec<Quadrant> = match quadrant {
        Some(q) => vec![q],
        None => Quadrant::ALL.to_vec(),
    };
    for (i, q) in quadrants.into_iter().enumerate() {
        if i > 0 {
            println!();
        }
        println!("== {} ({}) ==", q.label(), q.subtitle());
        let tasks = db.list_by_quadrant(q, hide);
        if tasks.is_empty() {
            println!("  (empty)");
        } else {
            print_table(db, &tasks, today);
        }
    }
}

/// Show every field of one task.
pub fn cmd_view(db: &mut Database, store: &mut FileStore, id: String) {
    let today = today();
    commit(db, store, today);
    let task_id = task_or_exit(db, &id);
    let Some(task) = db.get(task_id) else {
        eprintln!("{}", BoardError::TaskNotFound(task_id));
        std::process::exit(1);
    };
    let goal = task
        .goal_id
        .as_deref()
        .map(|g| db.goals.get(g).map(|g| g.title.clone()).unwrap_or_else(|| format!("{g} (missing)")));

    println!("ID:           {}", task.id);
    println!("Title:        {} {}", task.icon, task.title);
    println!("Quadrant:     {} ({})", task.quadrant.label(), task.quadrant.subtitle());
    println!("Completed:    {}", if task.completed { "yes" } else { "no" });
    println!(
        "Due:          {}",
        match task.due_date {
            Some(d) => format!("{d} ({})", format_due(Some(d), today)),
            None => "-".into(),
        }
    );
    println!("Priority:     {}", db.priority_rank(task.id).map(|r| format!("#{r}")).unwrap_or_else(|| "-".into()));
    println!("Delegate:     {}", task.delegate.as_deref().unwrap_or("-"));
    println!("Goal:         {}", goal.unwrap_or_else(|| "-".into()));
    println!("Created UTC:  {}", task.created_at.to_rfc3339());
    println!("Description:\n{}", task.description.as_deref().unwrap_or("-"));
}

/// Update fields on a task.
pub fn cmd_edit(
    db: &mut Database,
    store: &mut FileStore,
    id: String,
    title: Option<String>,
    desc: Option<String>,
    clear_desc: bool,
    quadrant: Option<Quadrant>,
    due: Option<String>,
    clear_due: bool,
    icon: Option<String>,
    delegate: Option<String>,
    goal: Option<String>,
    clear_goal: bool,
) {
    let today = today();
    let task_id = task_or_exit(db, &id);
    let mut patch = TaskPatch {
        title,
        quadrant,
        icon,
        ..Default::default()
    };
    if clear_desc {
        patch.description = Some(None);
    } else if desc.is_some() {
        patch.description = Some(desc);
    }
    if clear_due {
        patch.due_date = Some(None);
    } else if let Some(s) = due {
        patch.due_date = Some(Some(due_or_exit(&s, today)));
    }
    if delegate.is_some() {
        patch.delegate = Some(delegate);
    }
    if clear_goal {
        patch.goal_id = Some(None);
    } else if let Some(g) = goal {
        patch.goal_id = Some(Some(goal_or_exit(db, &g)));
    }
    if patch.is_empty() {
        eprintln!("Nothing to update. Pass at least one field.");
        std::process::exit(1);
    }

    if db.update_task(task_id, patch, today) {
        commit(db, store, today);
        println!("Updated task {task_id}.");
    } else {
        println!("Task {task_id} unchanged.");
    }
}

/// Toggle completion, finishing a delegated q3 task when `--delegate` is given.
pub fn cmd_done(db: &mut Database, store: &mut FileStore, id: String, delegate: Option<String>) {
    let today = today();
    let task_id = task_or_exit(db, &id);

    if let Some(name) = delegate {
        if db.confirm_delegate(task_id, &name) {
            commit(db, store, today);
            println!("Task {task_id} delegated to {} and marked done.", name.trim());
        } else {
            eprintln!("Could not delegate task {task_id}: the name is empty or the task is already done.");
            std::process::exit(1);
        }
        return;
    }

    match db.toggle_complete(task_id) {
        Completion::Toggled { completed } => {
            commit(db, store, today);
            if completed {
                println!("Task {task_id} marked done.");
            } else {
                println!("Task {task_id} reopened.");
            }
        }
        Completion::NeedsDelegate => {
            println!(
                "Task {task_id} is in {} ({}). Who did you hand it to? Rerun with --delegate NAME.",
                Quadrant::Q3.label(),
                Quadrant::Q3.subtitle()
            );
        }
        Completion::Missing => {
            eprintln!("{}", BoardError::TaskNotFound(task_id));
            std::process::exit(1);
        }
    }
}

pub fn cmd_move(db: &mut Database, store: &mut FileStore, id: String, quadrant: Quadrant) {
    let today = today();
    let task_id = task_or_exit(db, &id);
    if db.move_task(task_id, quadrant) {
        commit(db, store, today);
        println!("Moved task {task_id} to {} ({}).", quadrant.short(), quadrant.subtitle());
    } else {
        println!("Task {task_id} is already in {}.", quadrant.short());
    }
}

pub fn cmd_delete(db: &mut Database, store: &mut FileStore, id: String) {
    let today = today();
    let task_id = task_or_exit(db, &id);
    match db.delete_task(task_id) {
        Some(task) => {
            commit(db, store, today);
            println!("Deleted task {} {}. Run `em undo` to bring it back.", task.id, task.title);
        }
        None => {
            eprintln!("{}", BoardError::TaskNotFound(task_id));
            std::process::exit(1);
        }
    }
}

pub fn cmd_undo(db: &mut Database, store: &mut FileStore) {
    match db.undo() {
        Some(kind) => {
            save(db, store);
            println!("Undid {}.", kind.describe());
        }
        None => println!("Nothing to undo."),
    }
}

pub fn cmd_redo(db: &mut Database, store: &mut FileStore) {
    match db.redo() {
        Some(kind) => {
            save(db, store);
            println!("Redid {}.", kind.describe());
        }
        None => println!("Nothing to redo."),
    }
}

/// Print the ranked top priorities.
pub fn cmd_top(db: &mut Database, store: &mut FileStore) {
    let today = today();
    commit(db, store, today);
    let top = db.top_priorities();
    if top.is_empty() {
        println!("No open tasks in {}.", Quadrant::Q1.label());
        return;
    }
    println!("Top priorities:");
    for (task, rank) in top {
        let due = format_due(task.due_date, today);
        println!(
            "  #{rank} {} {}{}",
            task.icon,
            task.title,
            if due.is_empty() { String::new() } else { format!(" ({due})") }
        );
    }
}

/// End the week: archive the summary and roll the board forward.
pub fn cmd_end_week(db: &mut Database, store: &mut FileStore, config: &Config, no_file: bool) {
    let today = today();
    let rollover = db.end_period(Utc::now(), today);
    if !no_file {
        let dir = config.summary_dir(store.dir());
        match write_summary(&dir, &rollover.entry) {
            Ok(path) => println!("Summary written to {}", path.display()),
            Err(e) => eprintln!("Warning: failed to write summary: {e}"),
        }
    }
    commit(db, store, today);
    println!(
        "Week {} closed: {} completed task(s) archived, {} shoutout(s) cleared. Next week starts {}.",
        rollover.entry.week_number,
        rollover.cleared_tasks,
        rollover.cleared_shoutouts,
        rollover.next_period_start
    );
}

fn history_or_exit(db: &Database, prefix: &str) -> String {
    match db.find_history(prefix) {
        Some(entry) => entry.id.clone(),
        None => {
            eprintln!("{}", BoardError::HistoryNotFound(prefix.to_string()));
            std::process::exit(1);
        }
    }
}

pub fn cmd_history(db: &mut Database, store: &mut FileStore, action: HistoryAction) {
    match action {
        HistoryAction::List => {
            if db.history.is_empty() {
                println!("No past weeks yet.");
                return;
            }
            println!("{:<28} {:<6} {:<26} {}", "ID", "Week", "Dates", "Done");
            for h in &db.history {
                println!("{:<28} {:<6} {:<26} {}", h.id, format!("W{:02}", h.week_number), h.date_range, h.completed_count);
            }
        }
        HistoryAction::Show { id } => {
            let id = history_or_exit(db, &id);
            if let Some(entry) = db.history.iter().find(|h| h.id == id) {
                print!("{}", entry.summary);
            }
        }
        HistoryAction::Delete { id } => {
            let id = history_or_exit(db, &id);
            db.delete_history(&id);
            save(db, store);
            println!("Deleted history entry {id}.");
        }
    }
}

pub fn cmd_shoutout(db: &mut Database, store: &mut FileStore, action: ShoutoutAction) {
    match action {
        ShoutoutAction::Add { colleague, note } => match db.add_shoutout(&colleague, &note, Utc::now()) {
            Some(id) => {
                save(db, store);
                println!("Shoutout {id} added for {}.", colleague.trim());
            }
            None => {
                eprintln!("Both a name and a note are required.");
                std::process::exit(1);
            }
        },
        ShoutoutAction::List => {
            if db.shoutouts.is_empty() {
                println!("No shoutouts this week.");
            }
            for s in &db.shoutouts {
                println!("{:<14} ★ {}: {}", s.id, s.colleague, s.note);
            }
        }
        ShoutoutAction::Delete { id } => match db.delete_shoutout(id) {
            Some(s) => {
                save(db, store);
                println!("Deleted shoutout for {}.", s.colleague);
            }
            None => {
                eprintln!("{}", BoardError::ShoutoutNotFound(id));
                std::process::exit(1);
            }
        },
    }
}

fn sub_goal_id_or_exit(db: &Database, goal_id: &str, index: usize) -> String {
    let sub = db
        .goals
        .get(goal_id)
        .and_then(|g| index.checked_sub(1).and_then(|i| g.sub_goals.get(i)));
    match sub {
        Some(s) => s.id.clone(),
        None => {
            eprintln!("Goal has no sub-goal #{index}.");
            std::process::exit(1);
        }
    }
}

fn print_goal_row(db: &Database, goal: &crate::goal::Goal, today: NaiveDate) {
    println!(
        "{:<10} {:<7} {:<10} {:>4}%  {:<15} {}",
        goal.id.chars().take(8).collect::<String>(),
        match goal.kind {
            GoalKind::Simple => "simple",
            GoalKind::Major => "major",
        },
        goal.status.label(),
        progress(goal),
        staleness_text(goal, today),
        truncate(&goal.title, 40)
    );
    println!("{:<10} next: {}", "", next_action(goal, &db.tasks));
}

pub fn cmd_goal(db: &mut Database, store: &mut FileStore, action: GoalAction) {
    let today = today();
    match action {
        GoalAction::Add {
            title,
            outcome,
            kind,
            start,
            end,
            sub_goals,
        } => {
            let draft = GoalDraft {
                kind,
                title,
                outcome,
                start: Some(start.as_deref().map(|s| due_or_exit(s, today)).unwrap_or(today)),
                end: Some(due_or_exit(&end, today)),
                sub_goals: sub_goals
                    .into_iter()
                    .map(|title| SubGoalDraft { title, target_date: None })
                    .collect(),
            };
            match db.goals.create(draft, Utc::now()) {
                Some(id) => {
                    save(db, store);
                    println!("Created goal {id}.");
                }
                None => {
                    eprintln!(
                        "Goal not created: title and outcome are required, the end must come after the start, \
                         and a major goal needs at least one --sub."
                    );
                    std::process::exit(1);
                }
            }
        }
        GoalAction::List { status, stale } => {
            let goals: Vec<_> = if stale {
                db.goals.stale(today).collect()
            } else if let Some(status) = status {
                db.goals.with_status(status).collect()
            } else {
                db.goals.goals.iter().collect()
            };
            if goals.is_empty() {
                println!("No goals.");
                return;
            }
            println!("{:<10} {:<7} {:<10} {:>5}  {:<15} {}", "ID", "Type", "Status", "Done", "Last activity", "Title");
            for g in goals {
                print_goal_row(db, g, today);
            }
        }
        GoalAction::View { id } => {
            let id = goal_or_exit(db, &id);
            let Some(goal) = db.goals.get(&id) else {
                return;
            };
            println!("ID:           {}", goal.id);
            println!("Title:        {}", goal.title);
            println!("Outcome:      {}", goal.outcome);
            println!("Status:       {}", goal.status.label());
            println!("Timeline:     {} to {} ({} days)", goal.timeline.start, goal.timeline.end, goal.timeline.days());
            println!("Progress:     {}%", progress(goal));
            println!("Activity:     {}", staleness_text(goal, today));
            println!("Next action:  {}", next_action(goal, &db.tasks));
            if !goal.sub_goals.is_empty() {
                println!("Sub-goals:");
                for (i, s) in goal.sub_goals.iter().enumerate() {
                    let mark = if s.status == SubGoalStatus::Complete { "x" } else { " " };
                    let target = s.target_date.map(|d| format!(" (by {d})")).unwrap_or_default();
                    println!("  {}. [{mark}] {}{target}", i + 1, s.title);
                }
            }
            if !goal.linked_tasks.is_empty() {
                println!("Linked tasks:");
                for task_id in &goal.linked_tasks {
                    match db.get(*task_id) {
                        Some(t) => println!("  {} [{}] {}", t.id, if t.completed { "x" } else { " " }, t.title),
                        None => println!("  {task_id} (no longer on the board)"),
                    }
                }
            }
        }
        GoalAction::Edit { id, title, outcome, start, end } => {
            let id = goal_or_exit(db, &id);
            let patch = crate::goal::GoalPatch {
                title,
                outcome,
                start: start.as_deref().map(|s| due_or_exit(s, today)),
                end: end.as_deref().map(|s| due_or_exit(s, today)),
            };
            if db.goals.update(&id, patch) {
                save(db, store);
                println!("Updated goal {id}.");
            } else {
                println!("Goal {id} unchanged.");
            }
        }
        GoalAction::Status { id, status } => {
            let id = goal_or_exit(db, &id);
            db.goals.set_status(&id, status);
            save(db, store);
            println!("Goal {id} is now {}.", status.label());
        }
        GoalAction::Link { id, task } => {
            let id = goal_or_exit(db, &id);
            let task_id = task_or_exit(db, &task);
            let patch = TaskPatch {
                goal_id: Some(Some(id.clone())),
                ..Default::default()
            };
            if db.update_task(task_id, patch, today) {
                commit(db, store, today);
            }
            println!("Task {task_id} linked to goal {id}.");
        }
        GoalAction::Unlink { id, task } => {
            let id = goal_or_exit(db, &id);
            let task_id = task_or_exit(db, &task);
            if db.get(task_id).and_then(|t| t.goal_id.as_deref()) == Some(id.as_str()) {
                let patch = TaskPatch {
                    goal_id: Some(None),
                    ..Default::default()
                };
                db.update_task(task_id, patch, today);
                commit(db, store, today);
            } else if db.goals.unlink_task(&id, task_id) {
                save(db, store);
            }
            println!("Task {task_id} unlinked from goal {id}.");
        }
        GoalAction::Archive { id } => {
            let id = goal_or_exit(db, &id);
            db.goals.archive(&id, Utc::now());
            save(db, store);
            println!("Goal {id} archived.");
        }
        GoalAction::Delete { id, archived } => {
            if archived {
                let Some(id) = db.goals.resolve_archived(&id) else {
                    eprintln!("{}", BoardError::GoalNotFound(id));
                    std::process::exit(1);
                };
                db.goals.delete_archived(&id);
                save(db, store);
                println!("Archived goal {id} deleted.");
            } else {
                let id = goal_or_exit(db, &id);
                db.goals.delete(&id);
                save(db, store);
                println!("Goal {id} deleted.");
            }
        }
        GoalAction::Archived => {
            if db.goals.archive.is_empty() {
                println!("No archived goals.");
            }
            for a in &db.goals.archive {
                println!(
                    "{:<10} {:<10} {:>4}%  archived {}  {}",
                    a.goal.id.chars().take(8).collect::<String>(),
                    a.goal.status.label(),
                    progress(&a.goal),
                    a.archived_at.format("%Y-%m-%d"),
                    a.goal.title
                );
            }
        }
        GoalAction::SubAdd { id, title, target } => {
            let id = goal_or_exit(db, &id);
            let draft = SubGoalDraft {
                title,
                target_date: target.as_deref().map(|s| due_or_exit(s, today)),
            };
            if db.goals.add_sub_goal(&id, draft, today).is_some() {
                save(db, store);
                println!("Sub-goal added to {id}.");
            } else {
                eprintln!("Sub-goals need a title and can only be added to major goals.");
                std::process::exit(1);
            }
        }
        GoalAction::SubToggle { id, index } => {
            let id = goal_or_exit(db, &id);
            let sub_id = sub_goal_id_or_exit(db, &id, index);
            if let Some(status) = db.goals.toggle_sub_goal(&id, &sub_id, today) {
                save(db, store);
                let state = match status {
                    SubGoalStatus::Complete => "complete",
                    SubGoalStatus::Pending => "pending",
                };
                println!("Sub-goal #{index} is now {state}.");
            }
        }
        GoalAction::SubRemove { id, index } => {
            let id = goal_or_exit(db, &id);
            let sub_id = sub_goal_id_or_exit(db, &id, index);
            if db.goals.remove_sub_goal(&id, &sub_id, today) {
                save(db, store);
                println!("Sub-goal #{index} removed.");
            }
        }
    }
}

pub fn cmd_export(db: &Database, output: Option<String>) {
    let json = match export_json(db, Utc::now()) {
        Ok(json) => json,
        Err(e) => {
            eprintln!("Failed to encode backup: {e}");
            std::process::exit(1);
        }
    };
    let path = output.unwrap_or_else(|| backup_file_name(today()));
    match fs::write(&path, json) {
        Ok(_) => println!("Exported {} task(s) to {path}", db.tasks.len()),
        Err(e) => {
            eprintln!("Failed to write backup file '{path}': {e}");
            std::process::exit(1);
        }
    }
}

/// Write a timestamped copy of the current board into `<data dir>/backup/`.
pub fn create_backup(db: &Database, data_dir: &Path) -> crate::error::Result<String> {
    let backup_dir = data_dir.join("backup");
    fs::create_dir_all(&backup_dir).map_err(|source| BoardError::IoPath {
        path: backup_dir.clone(),
        source,
    })?;
    let timestamp = Local::now().format("%Y-%m-%d_%H-%M-%S");
    let backup_path = backup_dir.join(format!("{timestamp}_board.json"));
    fs::write(&backup_path, export_json(db, Utc::now())?).map_err(|source| BoardError::IoPath {
        path: backup_path.clone(),
        source,
    })?;
    Ok(backup_path.to_string_lossy().to_string())
}

pub fn cmd_import(db: &mut Database, store: &mut FileStore, input: String, no_backup: bool) {
    let raw = match fs::read_to_string(&input) {
        Ok(content) => content,
        Err(e) => {
            eprintln!("Failed to read backup file '{input}': {e}");
            std::process::exit(1);
        }
    };

    // Validate before touching anything so a bad file never costs a backup copy.
    if let Err(e) = backup::parse(&raw) {
        eprintln!("Import failed: {e}");
        std::process::exit(1);
    }
    if !no_backup {
        match create_backup(db, store.dir()) {
            Ok(path) => println!("Created backup: {path}"),
            Err(e) => {
                eprintln!("Failed to create backup, import cancelled: {e}");
                std::process::exit(1);
            }
        }
    }

    match backup::import(db, &raw) {
        Ok(report) => {
            save(db, store);
            println!(
                "Imported backup v{}{}: {} task(s), {} past week(s), {} shoutout(s), {} goal(s).",
                report.version,
                report
                    .export_date
                    .map(|d| format!(" from {}", d.format("%Y-%m-%d %H:%M")))
                    .unwrap_or_default(),
                report.tasks,
                report.history,
                report.shoutouts,
                report.goals
            );
        }
        Err(e) => {
            eprintln!("Import failed: {e}");
            std::process::exit(1);
        }
    }
}

pub fn cmd_prefs(
    store: &mut FileStore,
    font: Option<String>,
    hide_completed: Option<bool>,
    reset_help: bool,
    list_fonts: bool,
) {
    if list_fonts {
        for f in FONTS {
            println!("{f}");
        }
        return;
    }

    let mut prefs = Preferences::load(store);
    let mut changed = false;
    if let Some(name) = font {
        if !prefs.set_font(&name) {
            eprintln!("Unknown font '{name}'. Run `em prefs --list-fonts` to see the choices.");
            std::process::exit(1);
        }
        changed = true;
    }
    if let Some(hide) = hide_completed {
        prefs.hide_completed = hide;
        changed = true;
    }
    if reset_help {
        prefs.has_seen_help = false;
        changed = true;
    }
    if changed {
        if let Err(e) = prefs.save(store) {
            eprintln!("Failed to save preferences: {e}");
            std::process::exit(1);
        }
    }

    println!("Font:            {}", prefs.font);
    println!("Hide completed:  {}", prefs.hide_completed);
    println!("Seen help:       {}", prefs.has_seen_help);
}

pub fn cmd_completions(shell: Shell) {
    use crate::cli::Cli;
    use clap::CommandFactory;

    let mut app = Cli::command();
    let app_name = app.get_name().to_string();
    generate(shell, &mut app, app_name, &mut std::io::stdout());
}
