//! Quadrant board interface.
//!
//! The four quadrants sit in a 2x2 grid: important on the top row, urgent in
//! the left column. Cards can be added, edited, completed, deleted and moved
//! between quadrants with a keyboard grab (`g`, then arrows and Enter). Every
//! change is saved straight away.

use std::io;
use std::path::{Path, PathBuf};
use std::time::Duration;

use chrono::{Local, NaiveDate, Utc};
use crossterm::event::{self, Event, KeyCode, KeyEvent, KeyEventKind, KeyModifiers};
use ratatui::{
    backend::Backend,
    layout::{Alignment, Constraint, Direction, Layout, Rect},
    style::{Color, Modifier, Style},
    text::{Line, Span},
    widgets::{Block, BorderType, Borders, Clear, Paragraph, Wrap},
    Frame, Terminal,
};

use crate::classify::is_overdue;
use crate::config::{Config, Preferences};
use crate::dates::{format_due, iso_week_number, week_date_range};
use crate::db::{truncate, Completion, Database};
use crate::fields::{GoalStatus, Quadrant};
use crate::goal::Goal;
use crate::rollover::write_summary;
use crate::storage::FileStore;
use crate::task::Task;
use crate::tui::colors::{quadrant_color, text_on, DELEGATE_GOLD, WARN_RED};
use crate::tui::enums::{AppState, InputMode};
use crate::tui::input::InputField;
use crate::tui::task_form::*;

/// Lines per card, borders included.
const CARD_HEIGHT: usize = 4;

/// Main board application state
pub struct BoardApp {
    db: Database,
    store: FileStore,
    prefs: Preferences,
    summary_dir: PathBuf,
    state: AppState,
    selected_quadrant: usize,
    selected_card: [usize; 4],
    scroll_offsets: [usize; 4],
    /// Task ids per quadrant, in display order.
    columns: [Vec<u64>; 4],
    task_form: Option<TaskForm>,
    editing: Option<u64>,
    delegate_input: InputField,
    delegate_task: Option<u64>,
    grab_target: usize,
    /// q1 load when the overload advisory fired; shown until the next key.
    overload: Option<usize>,
    status_message: String,
}

fn today() -> NaiveDate {
    Local::now().date_naive()
}

impl BoardApp {
    /// Open the board stored in `data_dir` and run the start-of-session settle pass.
    pub fn new(data_dir: &Path, config: &Config) -> io::Result<Self> {
        let store = FileStore::open(data_dir).map_err(io::Error::other)?;
        let db = Database::load(&store, config, Utc::now(), today());
        let prefs = Preferences::load(&store);
        let state = if prefs.has_seen_help { AppState::Board } else { AppState::Help };

        let mut app = BoardApp {
            db,
            store,
            prefs,
            summary_dir: config.summary_dir(data_dir),
            state,
            selected_quadrant: 0,
            selected_card: [0; 4],
            scroll_offsets: [0; 4],
            columns: Default::default(),
            task_form: None,
            editing: None,
            delegate_input: InputField::new(),
            delegate_task: None,
            grab_target: 0,
            overload: None,
            status_message: String::new(),
        };
        app.commit();
        tracing::info!(tasks = app.db.tasks.len(), "board opened");
        Ok(app)
    }

    /// Rebuild the per-quadrant card lists and keep selections in range.
    fn refresh_columns(&mut self) {
        for q in Quadrant::ALL {
            let i = q.index();
            self.columns[i] = self
                .db
                .list_by_quadrant(q, self.prefs.hide_completed)
                .iter()
                .map(|t| t.id)
                .collect();
            let len = self.columns[i].len();
            if self.selected_card[i] >= len {
                self.selected_card[i] = len.saturating_sub(1);
            }
        }
    }

    fn selected_task_id(&self) -> Option<u64> {
        let q = self.selected_quadrant;
        self.columns[q].get(self.selected_card[q]).copied()
    }

    /// Move the selection onto `id`, wherever it now lives.
    fn select_task(&mut self, id: u64) {
        for q in 0..4 {
            if let Some(pos) = self.columns[q].iter().position(|&t| t == id) {
                self.selected_quadrant = q;
                self.selected_card[q] = pos;
            }
        }
    }

    fn set_status_message(&mut self, msg: impl Into<String>) {
        self.status_message = msg.into();
    }

    fn clear_status_message(&mut self) {
        self.status_message.clear();
    }

    fn persist(&mut self) {
        if let Err(e) = self.db.save(&mut self.store) {
            tracing::error!(error = %e, "failed to save board");
            self.set_status_message(format!("Error saving: {e}"));
        }
    }

    fn apply_settle(&mut self, today: NaiveDate) {
        let settled = self.db.settle(today);
        if !settled.promoted.is_empty() {
            self.set_status_message(format!(
                "Due date reached: {} task(s) moved to the urgent column",
                settled.promoted.len()
            ));
        }
        if settled.overload.is_some() {
            self.overload = settled.overload;
        }
    }

    /// Settle, save and refresh after a forward change.
    fn commit(&mut self) {
        self.apply_settle(today());
        self.persist();
        self.refresh_columns();
    }

    /// Save and refresh without settling, for undo and redo.
    fn commit_quiet(&mut self) {
        self.persist();
        self.refresh_columns();
    }

    fn linkable_goals(&self) -> Vec<Goal> {
        self.db
            .goals
            .goals
            .iter()
            .filter(|g| matches!(g.status, GoalStatus::Active | GoalStatus::Paused))
            .cloned()
            .collect()
    }

    /// Handle keyboard input
    fn handle_input(&mut self) -> io::Result<bool> {
        if event::poll(Duration::from_millis(50))? {
            if let Event::Key(key) = event::read()? {
                if key.kind == KeyEventKind::Press {
                    return Ok(self.handle_key(key));
                }
            }
        }
        Ok(false)
    }

    /// Apply one key press. Returns true when the board should close.
    pub fn handle_key(&mut self, key: KeyEvent) -> bool {
        if key.code == KeyCode::Char('c') && key.modifiers.contains(KeyModifiers::CONTROL) {
            return true;
        }
        if self.state.input_mode() == InputMode::Text {
            match self.state {
                AppState::DelegatePrompt => self.handle_delegate_key(key),
                _ => self.handle_form_key(key),
            }
            return false;
        }
        match self.state {
            AppState::Board => return self.handle_board_key(key),
            AppState::Detail => self.handle_detail_key(key),
            AppState::Grab => self.handle_grab_key(key),
            AppState::ConfirmEndWeek => self.handle_confirm_key(key),
            AppState::Help => self.close_help(),
            AppState::AddTask | AppState::EditTask | AppState::DelegatePrompt => {}
        }
        false
    }

    fn handle_board_key(&mut self, key: KeyEvent) -> bool {
        self.clear_status_message();
        self.overload = None;
        let ctrl = key.modifiers.contains(KeyModifiers::CONTROL);

        match key.code {
            KeyCode::Char('q') | KeyCode::Esc => return true,
            KeyCode::Char('z') if ctrl => self.undo(),
            KeyCode::Char('y') if ctrl => self.redo(),
            KeyCode::Char('u') => self.undo(),
            KeyCode::Char('r') => self.redo(),

            KeyCode::Left | KeyCode::Right | KeyCode::Char('h') | KeyCode::Char('l') => {
                self.selected_quadrant ^= 1;
            }
            KeyCode::Tab => self.selected_quadrant = (self.selected_quadrant + 1) % 4,
            KeyCode::BackTab => self.selected_quadrant = (self.selected_quadrant + 3) % 4,
            KeyCode::Up | KeyCode::Char('k') => self.move_selection(false),
            KeyCode::Down | KeyCode::Char('j') => self.move_selection(true),
            KeyCode::Char(c @ '1'..='4') => self.selected_quadrant = c as usize - '1' as usize,

            KeyCode::Char('a') => self.open_add_form(),
            KeyCode::Char('e') => self.open_edit_form(),
            KeyCode::Char(' ') | KeyCode::Char('c') => self.toggle_selected(),
            KeyCode::Char('d') | KeyCode::Delete => self.delete_selected(),
            KeyCode::Char('t') => self.toggle_hide_completed(),
            KeyCode::Char('g') => self.begin_grab(),
            KeyCode::Enter => {
                if self.selected_task_id().is_some() {
                    self.state = AppState::Detail;
                }
            }
            KeyCode::Char('W') => {
                self.state = AppState::ConfirmEndWeek;
            }
            KeyCode::Char('?') => self.state = AppState::Help,
            _ => {}
        }
        false
    }

    /// Step through the selected quadrant's cards, spilling over into the
    /// quadrant above or below at either end.
    fn move_selection(&mut self, down: bool) {
        let q = self.selected_quadrant;
        let len = self.columns[q].len();
        let card = &mut self.selected_card[q];
        if down {
            if *card + 1 < len {
                *card += 1;
            } else if q < 2 {
                self.selected_quadrant = q + 2;
            }
        } else if *card > 0 {
            *card -= 1;
        } else if q >= 2 {
            self.selected_quadrant = q - 2;
        }
    }

    fn undo(&mut self) {
        match self.db.undo() {
            Some(kind) => self.set_status_message(format!("Undid {}", kind.describe())),
            None => self.set_status_message("Nothing to undo"),
        }
        self.commit_quiet();
    }

    fn redo(&mut self) {
        match self.db.redo() {
            Some(kind) => self.set_status_message(format!("Redid {}", kind.describe())),
            None => self.set_status_message("Nothing to redo"),
        }
        self.commit_quiet();
    }

    fn open_add_form(&mut self) {
        let quadrant = Quadrant::from_index(self.selected_quadrant).unwrap_or(Quadrant::Q2);
        self.task_form = Some(TaskForm::new(quadrant, &self.linkable_goals()));
        self.editing = None;
        self.state = AppState::AddTask;
    }

    fn open_edit_form(&mut self) {
        let Some(id) = self.selected_task_id() else {
            return;
        };
        let goals = self.linkable_goals();
        if let Some(task) = self.db.get(id) {
            self.task_form = Some(TaskForm::from_task(task, &goals));
            self.editing = Some(id);
            self.state = AppState::EditTask;
        }
    }

    /// Toggle completion of the selected task
    fn toggle_selected(&mut self) {
        let Some(id) = self.selected_task_id() else {
            return;
        };
        match self.db.toggle_complete(id) {
            Completion::Toggled { completed } => {
                self.set_status_message(if completed {
                    "Task marked as completed"
                } else {
                    "Task reopened"
                });
                self.commit();
            }
            Completion::NeedsDelegate => {
                self.delegate_task = Some(id);
                self.delegate_input = InputField::new();
                self.delegate_input.active = true;
                self.state = AppState::DelegatePrompt;
            }
            Completion::Missing => {}
        }
    }

    fn delete_selected(&mut self) {
        let Some(id) = self.selected_task_id() else {
            return;
        };
        if let Some(task) = self.db.delete_task(id) {
            self.set_status_message(format!("Deleted '{}' (u to undo)", truncate(&task.title, 40)));
            self.commit();
        }
    }

    fn toggle_hide_completed(&mut self) {
        self.prefs.hide_completed = !self.prefs.hide_completed;
        match self.prefs.save(&mut self.store) {
            Ok(()) => self.set_status_message(if self.prefs.hide_completed {
                "Hiding completed tasks"
            } else {
                "Showing completed tasks"
            }),
            Err(e) => self.set_status_message(format!("Error saving preferences: {e}")),
        }
        self.refresh_columns();
    }

    fn handle_detail_key(&mut self, key: KeyEvent) {
        match key.code {
            KeyCode::Enter | KeyCode::Esc | KeyCode::Char('q') => self.state = AppState::Board,
            KeyCode::Char('e') => self.open_edit_form(),
            _ => {}
        }
    }

    fn handle_form_key(&mut self, key: KeyEvent) {
        let Some(form) = self.task_form.as_mut() else {
            self.state = AppState::Board;
            return;
        };
        match key.code {
            KeyCode::Esc => {
                self.task_form = None;
                self.editing = None;
                self.state = AppState::Board;
            }
            KeyCode::Enter => self.submit_form(),
            KeyCode::Tab | KeyCode::Down => form.next_field(),
            KeyCode::BackTab | KeyCode::Up => form.prev_field(),
            KeyCode::Left => form.handle_left_right(false),
            KeyCode::Right => form.handle_left_right(true),
            KeyCode::Backspace => form.handle_backspace(),
            KeyCode::Delete => form.handle_delete(),
            KeyCode::Char(c) => form.handle_char(c),
            _ => {}
        }
    }

    fn close_form(&mut self) {
        self.task_form = None;
        self.editing = None;
        self.state = AppState::Board;
    }

    fn submit_form(&mut self) {
        let Some(form) = self.task_form.as_ref() else {
            return;
        };
        let today = today();
        let blank_title = form.title.value.trim().is_empty();

        match self.editing {
            None => {
                let input = match form.to_input(today) {
                    Ok(input) => input,
                    Err(e) => return self.set_status_message(e),
                };
                match self.db.create_task(input, Utc::now(), today) {
                    Some(id) => {
                        self.close_form();
                        self.set_status_message("Task added");
                        self.commit();
                        self.select_task(id);
                    }
                    None => self.set_status_message("Title is required"),
                }
            }
            Some(id) => {
                let patch = match form.to_patch(today) {
                    Ok(patch) => patch,
                    Err(e) => return self.set_status_message(e),
                };
                if blank_title {
                    return self.set_status_message("Title is required");
                }
                if self.db.update_task(id, patch, today) {
                    self.close_form();
                    self.set_status_message("Task updated");
                    self.commit();
                    self.select_task(id);
                } else {
                    self.close_form();
                    self.set_status_message("No changes");
                }
            }
        }
    }

    fn handle_delegate_key(&mut self, key: KeyEvent) {
        match key.code {
            KeyCode::Esc => {
                self.delegate_task = None;
                self.state = AppState::Board;
                self.set_status_message("Completion cancelled");
            }
            KeyCode::Enter => {
                let Some(id) = self.delegate_task else {
                    self.state = AppState::Board;
                    return;
                };
                if self.db.confirm_delegate(id, &self.delegate_input.value) {
                    let name = self.delegate_input.value.trim().to_string();
                    self.delegate_task = None;
                    self.state = AppState::Board;
                    self.set_status_message(format!("Delegated to {name} and marked done"));
                    self.commit();
                } else {
                    self.set_status_message("Enter a name, or Esc to cancel");
                }
            }
            KeyCode::Backspace => self.delegate_input.handle_backspace(),
            KeyCode::Delete => self.delegate_input.handle_delete(),
            KeyCode::Left => self.delegate_input.move_cursor_left(),
            KeyCode::Right => self.delegate_input.move_cursor_right(),
            KeyCode::Char(c) => self.delegate_input.handle_char(c),
            _ => {}
        }
    }

    /// Pick up the selected card. Promotion waits until it is dropped.
    fn begin_grab(&mut self) {
        let Some(id) = self.selected_task_id() else {
            return;
        };
        if self.db.begin_drag(id) {
            self.grab_target = self.selected_quadrant;
            self.state = AppState::Grab;
            self.set_status_message("Moving: arrows or 1-4 pick a quadrant, Enter drops, Esc cancels");
        }
    }

    fn handle_grab_key(&mut self, key: KeyEvent) {
        match key.code {
            KeyCode::Left | KeyCode::Right | KeyCode::Char('h') | KeyCode::Char('l') => self.grab_target ^= 1,
            KeyCode::Up | KeyCode::Down | KeyCode::Char('k') | KeyCode::Char('j') => self.grab_target ^= 2,
            KeyCode::Char(c @ '1'..='4') => self.grab_target = c as usize - '1' as usize,
            KeyCode::Enter => {
                let id = self.db.dragged();
                let target = Quadrant::from_index(self.grab_target);
                let moved = self.db.end_drag(target);
                self.state = AppState::Board;
                match (moved, target) {
                    (true, Some(q)) => self.set_status_message(format!("Moved to {} ({})", q.short(), q.subtitle())),
                    _ => self.set_status_message("Dropped in place"),
                }
                self.commit();
                if let Some(id) = id {
                    self.select_task(id);
                }
            }
            KeyCode::Esc => {
                self.db.end_drag(None);
                self.state = AppState::Board;
                self.set_status_message("Move cancelled");
                self.commit();
            }
            _ => {}
        }
    }

    fn handle_confirm_key(&mut self, key: KeyEvent) {
        match key.code {
            KeyCode::Char('y') | KeyCode::Char('Y') => self.end_week(),
            KeyCode::Char('n') | KeyCode::Char('N') | KeyCode::Esc => {
                self.state = AppState::Board;
                self.set_status_message("End of week cancelled");
            }
            _ => {}
        }
    }

    fn end_week(&mut self) {
        let rollover = self.db.end_period(Utc::now(), today());
        let written = write_summary(&self.summary_dir, &rollover.entry);
        self.state = AppState::Board;
        self.commit();
        match written {
            Ok(path) => self.set_status_message(format!(
                "Week {} closed: {} task(s) archived. Summary saved to {}",
                rollover.entry.week_number,
                rollover.cleared_tasks,
                path.display()
            )),
            Err(e) => {
                tracing::warn!(error = %e, "summary file not written");
                self.set_status_message(format!("Week closed, but the summary file failed: {e}"));
            }
        }
    }

    /// Leave the help screen. The first time, remember it has been seen.
    fn close_help(&mut self) {
        self.state = AppState::Board;
        if !self.prefs.has_seen_help {
            self.prefs.has_seen_help = true;
            if let Err(e) = self.prefs.save(&mut self.store) {
                self.set_status_message(format!("Error saving preferences: {e}"));
            }
        }
    }

    /// Render the header with the current week and the overload advisory
    fn render_header(&self, f: &mut Frame, area: Rect) {
        let start = self.db.period_start;
        let mut spans = vec![
            Span::styled("EISENHOWER MATRIX", Style::default().add_modifier(Modifier::BOLD)),
            Span::raw("  "),
            Span::styled(
                format!("Week {} · {}", iso_week_number(start), week_date_range(start)),
                Style::default().fg(Color::Cyan).add_modifier(Modifier::ITALIC),
            ),
        ];
        if let Some(load) = self.overload {
            spans.push(Span::raw("  "));
            spans.push(Span::styled(
                format!(" ⚠ {load} tasks in Do First. Delegate or reschedule some. "),
                Style::default().bg(WARN_RED).fg(Color::White).add_modifier(Modifier::BOLD),
            ));
        }

        let header = Paragraph::new(Line::from(spans))
            .block(Block::default().borders(Borders::ALL))
            .alignment(Alignment::Center);
        f.render_widget(header, area);
    }

    /// Render the 2x2 grid
    fn render_board(&mut self, f: &mut Frame, area: Rect) {
        let rows = Layout::default()
            .direction(Direction::Vertical)
            .constraints([Constraint::Percentage(50), Constraint::Percentage(50)])
            .split(area);
        for (r, row) in rows.iter().enumerate() {
            let cells = Layout::default()
                .direction(Direction::Horizontal)
                .constraints([Constraint::Percentage(50), Constraint::Percentage(50)])
                .split(*row);
            for (c, cell) in cells.iter().enumerate() {
                self.render_quadrant(f, *cell, r * 2 + c);
            }
        }
    }

    fn render_quadrant(&mut self, f: &mut Frame, area: Rect, index: usize) {
        let Some(q) = Quadrant::from_index(index) else {
            return;
        };
        let color = quadrant_color(q);
        let is_selected = index == self.selected_quadrant && self.state != AppState::Grab;
        let is_target = self.state == AppState::Grab && index == self.grab_target;

        let border_style = if is_selected || is_target {
            Style::default().fg(color).add_modifier(Modifier::BOLD)
        } else {
            Style::default().fg(color)
        };
        let title = format!(
            " {}{} · {} ({}) [{}] ",
            if is_target { "▼ drop here · " } else { "" },
            q.short().to_uppercase(),
            q.label(),
            q.subtitle(),
            self.columns[index].len(),
        );
        let block = Block::default()
            .borders(Borders::ALL)
            .border_type(if is_selected || is_target { BorderType::Thick } else { BorderType::Plain })
            .title(title)
            .border_style(border_style);

        let inner = block.inner(area);
        f.render_widget(block, area);

        if self.columns[index].is_empty() {
            let empty = Paragraph::new("(empty)")
                .style(Style::default().fg(Color::DarkGray))
                .alignment(Alignment::Center);
            f.render_widget(empty, inner);
            return;
        }

        let available_height = inner.height as usize;
        let visible_cards = (available_height / CARD_HEIGHT).max(1);
        let selected = self.selected_card[index];
        let mut offset = self.scroll_offsets[index];
        if selected < offset {
            offset = selected;
        } else if selected >= offset + visible_cards {
            offset = selected + 1 - visible_cards;
        }
        self.scroll_offsets[index] = offset;

        let today = today();
        let mut current_y = 0;
        let mut rendered = 0;
        for (card_index, &task_id) in self.columns[index].iter().enumerate().skip(offset) {
            if current_y + CARD_HEIGHT > available_height {
                break;
            }
            if let Some(task) = self.db.get(task_id) {
                let card_area = Rect {
                    x: inner.x,
                    y: inner.y + current_y as u16,
                    width: inner.width,
                    height: CARD_HEIGHT as u16,
                };
                let highlighted = index == self.selected_quadrant && card_index == selected;
                self.render_card(f, card_area, task, q, highlighted, today);
                current_y += CARD_HEIGHT;
                rendered += 1;
            }
        }

        let remaining = self.columns[index].len().saturating_sub(offset + rendered);
        if remaining > 0 && inner.height > 0 {
            let indicator = Paragraph::new(format!("▼ +{remaining} below")).style(Style::default().fg(Color::Cyan));
            f.render_widget(
                indicator,
                Rect {
                    x: inner.x,
                    y: inner.y + inner.height - 1,
                    width: inner.width,
                    height: 1,
                },
            );
        }
    }

    /// Render a single task card
    fn render_card(&self, f: &mut Frame, area: Rect, task: &Task, q: Quadrant, is_selected: bool, today: NaiveDate) {
        let color = quadrant_color(q);
        let mut style = if is_selected {
            Style::default().bg(color).fg(text_on(color)).add_modifier(Modifier::BOLD)
        } else {
            Style::default().bg(Color::DarkGray)
        };
        if self.db.dragged() == Some(task.id) {
            style = style.add_modifier(Modifier::REVERSED);
        }

        let title_style = if task.completed {
            Style::default().add_modifier(Modifier::CROSSED_OUT | Modifier::DIM)
        } else {
            Style::default()
        };
        let width = area.width.saturating_sub(5) as usize;

        let mut meta: Vec<Span> = Vec::new();
        let due = format_due(task.due_date, today);
        if !due.is_empty() {
            let due_style = if !task.completed && is_overdue(task.due_date, today) && !is_selected {
                Style::default().fg(Color::LightRed).add_modifier(Modifier::BOLD)
            } else {
                Style::default()
            };
            meta.push(Span::styled(due, due_style));
        }
        if let Some(rank) = self.db.priority_rank(task.id) {
            meta.push(Span::styled(format!("#{rank}"), Style::default().add_modifier(Modifier::BOLD)));
        }
        if let Some(who) = &task.delegate {
            meta.push(Span::raw(format!("→ {who}")));
        }
        if task.goal_id.is_some() {
            meta.push(Span::raw("◎"));
        }
        let mut meta_line = Vec::new();
        for (i, span) in meta.into_iter().enumerate() {
            if i > 0 {
                meta_line.push(Span::raw("  "));
            }
            meta_line.push(span);
        }

        let card_text = vec![
            Line::from(vec![
                Span::raw(format!("{} ", task.icon)),
                Span::styled(truncate(&task.title, width), title_style),
            ]),
            Line::from(meta_line),
        ];
        let card = Paragraph::new(card_text)
            .block(Block::default().borders(Borders::ALL))
            .style(style);
        f.render_widget(card, area);
    }

    /// Render the status bar
    fn render_status_bar(&self, f: &mut Frame, area: Rect) {
        let status_text = if !self.status_message.is_empty() {
            self.status_message.clone()
        } else {
            match self.state {
                AppState::Board => {
                    let total: usize = self.columns.iter().map(|c| c.len()).sum();
                    let done = if self.prefs.hide_completed { " [done hidden]" } else { "" };
                    let undo = self
                        .db
                        .log()
                        .peek_undo()
                        .map(|e| format!(" | u: Undo {}", e.kind.describe()))
                        .unwrap_or_default();
                    let redo = self
                        .db
                        .log()
                        .peek_redo()
                        .map(|e| format!(" | r: Redo {}", e.kind.describe()))
                        .unwrap_or_default();
                    format!(
                        "Tasks: {total}{done} | a: Add | e: Edit | Space: Done | g: Move{undo}{redo} | t: Toggle done | W: End week | ?: Help | q: Quit"
                    )
                }
                AppState::Detail => "Task Details | e: Edit | Enter/Esc: Close".to_string(),
                AppState::AddTask => "Add Task | Tab: Next field | ←/→: Change selector | Enter: Save | Esc: Cancel".to_string(),
                AppState::EditTask => "Edit Task | Tab: Next field | ←/→: Change selector | Enter: Save | Esc: Cancel".to_string(),
                AppState::DelegatePrompt => "Delegate | Enter: Confirm | Esc: Cancel".to_string(),
                AppState::Grab => "Moving | arrows/1-4: Target | Enter: Drop | Esc: Cancel".to_string(),
                AppState::ConfirmEndWeek => "End of week | y: Confirm | n: Cancel".to_string(),
                AppState::Help => "Help | Press any key to return".to_string(),
            }
        };

        let focus = if self.state == AppState::Grab { self.grab_target } else { self.selected_quadrant };
        let bg = Quadrant::from_index(focus).map(quadrant_color).unwrap_or(Color::Blue);
        let status = Paragraph::new(status_text)
            .style(Style::default().bg(bg).fg(text_on(bg)))
            .alignment(Alignment::Left);
        f.render_widget(status, area);
    }

    /// Render the task detail popup
    fn render_task_detail_popup(&self, f: &mut Frame) {
        let Some(task) = self.selected_task_id().and_then(|id| self.db.get(id)) else {
            return;
        };
        let popup_area = centered_rect(80, 80, f.area());
        f.render_widget(Clear, popup_area);

        let today = today();
        let due = match task.due_date {
            Some(d) => format!("{d} ({})", format_due(Some(d), today)),
            None => "-".to_string(),
        };
        let goal = match &task.goal_id {
            Some(id) => self
                .db
                .goals
                .get(id)
                .map(|g| g.title.clone())
                .unwrap_or_else(|| format!("{id} (missing)")),
            None => "-".to_string(),
        };

        let detail_lines = vec![
            Line::from(vec![Span::styled(
                format!("Task #{}: {} {}", task.id, task.icon, task.title),
                Style::default().add_modifier(Modifier::BOLD),
            )]),
            Line::from(""),
            Line::from(format!("Quadrant:     {} ({})", task.quadrant.label(), task.quadrant.subtitle())),
            Line::from(format!("Status:       {}", if task.completed { "Done" } else { "Open" })),
            Line::from(format!("Due:          {due}")),
            Line::from(format!(
                "Priority:     {}",
                self.db.priority_rank(task.id).map(|r| format!("#{r}")).unwrap_or_else(|| "-".into())
            )),
            Line::from(format!("Delegated to: {}", task.delegate.as_deref().unwrap_or("-"))),
            Line::from(format!("Goal:         {goal}")),
            Line::from(format!("Created:      {}", task.created_at.with_timezone(&Local).format("%Y-%m-%d %H:%M"))),
            Line::from(""),
            Line::from("Description:"),
            Line::from(task.description.as_deref().unwrap_or("-")),
        ];

        let popup_block = Block::default()
            .borders(Borders::ALL)
            .title("Task Details (Press Enter to close)")
            .title_alignment(Alignment::Center)
            .border_style(Style::default().fg(quadrant_color(task.quadrant)).add_modifier(Modifier::BOLD));
        let popup = Paragraph::new(detail_lines)
            .block(popup_block)
            .wrap(Wrap { trim: true })
            .style(Style::default().bg(Color::Black));
        f.render_widget(popup, popup_area);
    }

    fn render_task_form(&self, f: &mut Frame, area: Rect) {
        let Some(form) = self.task_form.as_ref() else {
            return;
        };
        let area = centered_rect(70, 90, area);
        f.render_widget(Clear, area);
        let title = if self.editing.is_some() { "Edit Task" } else { "Add Task" };
        let outer = Block::default()
            .borders(Borders::ALL)
            .title(title)
            .style(Style::default().bg(Color::Black));
        let inner = outer.inner(area);
        f.render_widget(outer, area);

        let chunks = Layout::default()
            .direction(Direction::Vertical)
            .constraints([
                Constraint::Length(3), // Title
                Constraint::Length(4), // Description
                Constraint::Length(3), // Due
                Constraint::Length(3), // Icon
                Constraint::Length(3), // Quadrant
                Constraint::Length(3), // Goal
                Constraint::Min(0),
            ])
            .split(inner);

        let focus = |order: usize| {
            if form.current_field == order {
                Style::default().fg(DELEGATE_GOLD)
            } else {
                Style::default()
            }
        };
        let text_fields = [
            (TITLE_GLOBAL_ORDER, "Title *", &form.title),
            (DESCRIPTION_GLOBAL_ORDER, "Description", &form.description),
            (DUE_GLOBAL_ORDER, "Due (YYYY-MM-DD, today, friday, in 3d, eow...)", &form.due),
            (ICON_GLOBAL_ORDER, "Icon (blank picks one from the title)", &form.icon),
        ];
        for (order, label, field) in text_fields {
            let widget = Paragraph::new(field.value.as_str())
                .block(Block::default().borders(Borders::ALL).title(label).border_style(focus(order)))
                .wrap(Wrap { trim: false });
            f.render_widget(widget, chunks[order]);
            if field.active {
                let width = chunks[order].width.saturating_sub(2);
                let x = (field.cursor as u16).min(width.saturating_sub(1));
                f.set_cursor_position((chunks[order].x + 1 + x, chunks[order].y + 1));
            }
        }

        let q = form.selected_quadrant();
        let quadrant = Paragraph::new(format!("< {} · {} ({}) >", q.short(), q.label(), q.subtitle()))
            .style(Style::default().fg(quadrant_color(q)))
            .block(Block::default().borders(Borders::ALL).title("Quadrant").border_style(focus(QUADRANT_GLOBAL_ORDER)));
        f.render_widget(quadrant, chunks[QUADRANT_GLOBAL_ORDER]);

        let goal = form.selected_goal().map(|(_, title)| title.as_str()).unwrap_or("None");
        let goal = Paragraph::new(format!("< {goal} >"))
            .block(Block::default().borders(Borders::ALL).title("Goal").border_style(focus(GOAL_GLOBAL_ORDER)));
        f.render_widget(goal, chunks[GOAL_GLOBAL_ORDER]);
    }

    fn render_delegate_prompt(&self, f: &mut Frame, area: Rect) {
        let area = centered_rect(60, 30, area);
        f.render_widget(Clear, area);
        let title = self
            .delegate_task
            .and_then(|id| self.db.get(id))
            .map(|t| truncate(&t.title, 40))
            .unwrap_or_default();

        let block = Block::default()
            .borders(Borders::ALL)
            .title("Delegate")
            .border_style(Style::default().fg(DELEGATE_GOLD).add_modifier(Modifier::BOLD))
            .style(Style::default().bg(Color::Black));
        let inner = block.inner(area);
        f.render_widget(block, area);

        let chunks = Layout::default()
            .direction(Direction::Vertical)
            .constraints([Constraint::Length(2), Constraint::Length(3), Constraint::Min(0)])
            .split(inner);
        let question = Paragraph::new(format!("Who did you hand '{title}' to?"))
            .alignment(Alignment::Center)
            .wrap(Wrap { trim: true });
        f.render_widget(question, chunks[0]);

        let input = Paragraph::new(self.delegate_input.value.as_str())
            .block(Block::default().borders(Borders::ALL).title("Name"));
        f.render_widget(input, chunks[1]);
        let width = chunks[1].width.saturating_sub(2);
        let x = (self.delegate_input.cursor as u16).min(width.saturating_sub(1));
        f.set_cursor_position((chunks[1].x + 1 + x, chunks[1].y + 1));
    }

    /// Render the end-of-week confirmation.
    fn render_confirm(&self, f: &mut Frame, area: Rect) {
        let block = Block::default()
            .title("End Week")
            .borders(Borders::ALL)
            .style(Style::default().bg(WARN_RED));

        let area = centered_rect(50, 40, area);
        f.render_widget(Clear, area);

        let completed = self.db.tasks.iter().filter(|t| t.completed).count();
        let text = vec![
            Line::from(""),
            Line::from(vec![Span::styled(
                format!("Close {}?", week_date_range(self.db.period_start)),
                Style::default().add_modifier(Modifier::BOLD),
            )]),
            Line::from(format!("{completed} completed task(s) will be archived and cleared.")),
            Line::from(format!("{} shoutout(s) will be cleared.", self.db.shoutouts.len())),
            Line::from(""),
            Line::from("This action cannot be undone."),
            Line::from(""),
            Line::from("Press 'y' to confirm, 'n' to cancel"),
        ];
        let paragraph = Paragraph::new(text)
            .block(block)
            .alignment(Alignment::Center)
            .wrap(Wrap { trim: true });
        f.render_widget(paragraph, area);
    }

    fn render_help(&self, f: &mut Frame, area: Rect) {
        let heading = |s: &'static str| Line::from(vec![Span::styled(s, Style::default().add_modifier(Modifier::BOLD))]);
        let mut help_text = Vec::new();
        if !self.prefs.has_seen_help {
            help_text.push(Line::from(vec![Span::styled(
                "Welcome! Sort each task by urgency (left column) and importance (top row).",
                Style::default().fg(Color::Cyan),
            )]));
            help_text.push(Line::from(""));
        }
        help_text.extend([
            heading("Board:"),
            Line::from("  ←/→ h/l        Switch column"),
            Line::from("  ↑/↓ k/j        Move between cards"),
            Line::from("  1-4 Tab        Jump to a quadrant"),
            Line::from("  Enter          Task details"),
            Line::from("  a              Add task"),
            Line::from("  e              Edit selected task"),
            Line::from("  Space/c        Toggle done (q3 asks who it was delegated to)"),
            Line::from("  d/Delete       Delete selected task"),
            Line::from("  g              Pick up a task, then arrows/1-4 and Enter to drop, Esc to cancel"),
            Line::from("  u, Ctrl+Z      Undo"),
            Line::from("  r, Ctrl+Y      Redo"),
            Line::from("  t              Show/hide completed tasks"),
            Line::from("  W              End the week and archive a summary"),
            Line::from("  ?              Show this help"),
            Line::from("  q/Esc/Ctrl+C   Quit"),
            Line::from(""),
            heading("Automatic:"),
            Line::from("  Tasks in Schedule or Eliminate move to the urgent column once they are due."),
            Line::from("  #1-#3 mark the most pressing Do First tasks."),
            Line::from(""),
            heading("Due Date Formats:"),
            Line::from("  YYYY-MM-DD   Specific date (e.g., 2024-12-25)"),
            Line::from("  today        Today's date"),
            Line::from("  tomorrow     Tomorrow's date"),
            Line::from("  friday       The coming Friday (\"next friday\" for the week after)"),
            Line::from("  in 3d        3 days from today (also 2w, 1m)"),
            Line::from("  eow, eom     End of week, end of month"),
        ]);

        let paragraph = Paragraph::new(help_text)
            .block(Block::default().borders(Borders::ALL).title("Help - Press any key to return"))
            .wrap(Wrap { trim: false });
        f.render_widget(paragraph, area);
    }

    /// Draw the whole screen.
    fn render(&mut self, f: &mut Frame) {
        let chunks = Layout::default()
            .direction(Direction::Vertical)
            .constraints([Constraint::Length(3), Constraint::Min(0), Constraint::Length(1)])
            .split(f.area());

        self.render_header(f, chunks[0]);
        if self.state == AppState::Help {
            self.render_help(f, chunks[1]);
        } else {
            self.render_board(f, chunks[1]);
        }
        match self.state {
            AppState::Detail => self.render_task_detail_popup(f),
            AppState::AddTask | AppState::EditTask => self.render_task_form(f, chunks[1]),
            AppState::DelegatePrompt => self.render_delegate_prompt(f, chunks[1]),
            AppState::ConfirmEndWeek => self.render_confirm(f, chunks[1]),
            AppState::Board | AppState::Grab | AppState::Help => {}
        }
        self.render_status_bar(f, chunks[2]);
    }

    /// Main event loop
    pub fn run<B: Backend>(&mut self, terminal: &mut Terminal<B>) -> io::Result<()> {
        loop {
            terminal.draw(|f| self.render(f))?;

            if self.handle_input()? {
                break;
            }
        }
        // A drag left open at exit is dropped nowhere.
        if self.db.is_dragging() {
            self.db.end_drag(None);
        }
        tracing::info!("board closed");
        Ok(())
    }
}

/// A rectangle of `percent_x` by `percent_y` centered in `area`.
fn centered_rect(percent_x: u16, percent_y: u16, area: Rect) -> Rect {
    let vertical = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Percentage((100 - percent_y) / 2),
            Constraint::Percentage(percent_y),
            Constraint::Percentage((100 - percent_y) / 2),
        ])
        .split(area);
    Layout::default()
        .direction(Direction::Horizontal)
        .constraints([
            Constraint::Percentage((100 - percent_x) / 2),
            Constraint::Percentage(percent_x),
            Constraint::Percentage((100 - percent_x) / 2),
        ])
        .split(vertical[1])[1]
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::task::TaskInput;
    use ratatui::backend::TestBackend;

    fn open(dir: &Path) -> BoardApp {
        let config = Config {
            seed_examples: false,
            ..Config::default()
        };
        BoardApp::new(dir, &config).unwrap()
    }

    /// A board with the first-run help already dismissed.
    fn ready(dir: &Path) -> BoardApp {
        let mut app = open(dir);
        if app.state == AppState::Help {
            press(&mut app, KeyCode::Char('x'));
        }
        app
    }

    fn press(app: &mut BoardApp, code: KeyCode) -> bool {
        app.handle_key(KeyEvent::new(code, KeyModifiers::NONE))
    }

    fn type_text(app: &mut BoardApp, text: &str) {
        for c in text.chars() {
            press(app, KeyCode::Char(c));
        }
    }

    fn add(app: &mut BoardApp, title: &str, q: Quadrant) -> u64 {
        let id = app
            .db
            .create_task(TaskInput::titled(title).in_quadrant(q), Utc::now(), today())
            .unwrap();
        app.refresh_columns();
        id
    }

    fn screen(app: &mut BoardApp) -> String {
        let mut terminal = Terminal::new(TestBackend::new(120, 40)).unwrap();
        terminal.draw(|f| app.render(f)).unwrap();
        terminal.backend().buffer().content.iter().map(|c| c.symbol()).collect()
    }

    #[test]
    fn help_shows_on_first_run_only() {
        let dir = tempfile::tempdir().unwrap();
        let mut app = open(dir.path());
        assert_eq!(app.state, AppState::Help);
        assert!(!press(&mut app, KeyCode::Char('x')));
        assert_eq!(app.state, AppState::Board);
        drop(app);

        let app = open(dir.path());
        assert_eq!(app.state, AppState::Board);
    }

    #[test]
    fn add_form_creates_task_in_selected_quadrant() {
        let dir = tempfile::tempdir().unwrap();
        let mut app = ready(dir.path());
        press(&mut app, KeyCode::Char('4'));
        press(&mut app, KeyCode::Char('a'));
        assert_eq!(app.state, AppState::AddTask);

        // Blank titles keep the form open.
        press(&mut app, KeyCode::Enter);
        assert_eq!(app.state, AppState::AddTask);
        assert!(app.db.tasks.is_empty());

        type_text(&mut app, "Clear old newsletters");
        press(&mut app, KeyCode::Enter);
        assert_eq!(app.state, AppState::Board);
        assert_eq!(app.db.tasks.len(), 1);
        assert_eq!(app.db.tasks[0].quadrant, Quadrant::Q4);
        assert_eq!(app.selected_task_id(), Some(app.db.tasks[0].id));

        press(&mut app, KeyCode::Char('u'));
        assert!(app.db.tasks.is_empty());
        press(&mut app, KeyCode::Char('r'));
        assert_eq!(app.db.tasks.len(), 1);

        // Saved straight away.
        let reopened = open(dir.path());
        assert_eq!(reopened.db.tasks.len(), 1);
    }

    #[test]
    fn delegate_prompt_gates_q3_completion() {
        let dir = tempfile::tempdir().unwrap();
        let mut app = ready(dir.path());
        let id = add(&mut app, "Book meeting room", Quadrant::Q3);
        press(&mut app, KeyCode::Char('3'));

        press(&mut app, KeyCode::Char(' '));
        assert_eq!(app.state, AppState::DelegatePrompt);
        press(&mut app, KeyCode::Esc);
        assert_eq!(app.state, AppState::Board);
        assert!(!app.db.get(id).unwrap().completed);

        press(&mut app, KeyCode::Char(' '));
        press(&mut app, KeyCode::Enter);
        assert_eq!(app.state, AppState::DelegatePrompt);
        type_text(&mut app, "Sam");
        press(&mut app, KeyCode::Enter);
        assert_eq!(app.state, AppState::Board);
        let task = app.db.get(id).unwrap();
        assert!(task.completed);
        assert_eq!(task.delegate.as_deref(), Some("Sam"));
    }

    #[test]
    fn grab_holds_promotion_until_drop() {
        let dir = tempfile::tempdir().unwrap();
        let mut app = ready(dir.path());
        let id = app
            .db
            .create_task(TaskInput::titled("Renew passport").in_quadrant(Quadrant::Q2).due(today()), Utc::now(), today())
            .unwrap();
        app.refresh_columns();
        press(&mut app, KeyCode::Char('2'));
        press(&mut app, KeyCode::Char('g'));
        assert_eq!(app.state, AppState::Grab);
        assert!(app.db.is_dragging());

        app.commit();
        assert_eq!(app.db.get(id).unwrap().quadrant, Quadrant::Q2);

        // q2 -> q4, then the due date pulls it over to q3 once dropped.
        press(&mut app, KeyCode::Down);
        press(&mut app, KeyCode::Enter);
        assert!(!app.db.is_dragging());
        assert_eq!(app.state, AppState::Board);
        assert_eq!(app.db.get(id).unwrap().quadrant, Quadrant::Q3);
    }

    #[test]
    fn cancelled_grab_clears_flag_without_moving() {
        let dir = tempfile::tempdir().unwrap();
        let mut app = ready(dir.path());
        let id = add(&mut app, "Sort receipts", Quadrant::Q4);
        press(&mut app, KeyCode::Char('4'));
        press(&mut app, KeyCode::Char('g'));
        press(&mut app, KeyCode::Char('1'));
        press(&mut app, KeyCode::Esc);
        assert!(!app.db.is_dragging());
        assert_eq!(app.db.get(id).unwrap().quadrant, Quadrant::Q4);
    }

    #[test]
    fn end_week_asks_first() {
        let dir = tempfile::tempdir().unwrap();
        let mut app = ready(dir.path());
        let id = add(&mut app, "Ship release", Quadrant::Q1);
        app.db.toggle_complete(id);
        app.refresh_columns();

        press(&mut app, KeyCode::Char('W'));
        assert_eq!(app.state, AppState::ConfirmEndWeek);
        press(&mut app, KeyCode::Char('n'));
        assert_eq!(app.db.tasks.len(), 1);

        press(&mut app, KeyCode::Char('W'));
        press(&mut app, KeyCode::Char('y'));
        assert!(app.db.tasks.is_empty());
        assert_eq!(app.db.history.len(), 1);
        let written = dir.path().join("summaries").join(app.db.history[0].file_name());
        assert!(written.exists());
    }

    #[test]
    fn hide_completed_is_remembered() {
        let dir = tempfile::tempdir().unwrap();
        let mut app = ready(dir.path());
        let id = add(&mut app, "Done already", Quadrant::Q2);
        app.db.toggle_complete(id);
        app.refresh_columns();
        assert_eq!(app.columns[1].len(), 1);

        press(&mut app, KeyCode::Char('t'));
        assert!(app.columns[1].is_empty());
        assert!(open(dir.path()).prefs.hide_completed);
    }

    #[test]
    fn status_bar_names_next_undo_and_redo() {
        let dir = tempfile::tempdir().unwrap();
        let mut app = ready(dir.path());
        assert!(!screen(&mut app).contains("u: Undo"));

        press(&mut app, KeyCode::Char('a'));
        type_text(&mut app, "Water plants");
        press(&mut app, KeyCode::Enter);
        app.clear_status_message();
        let text = screen(&mut app);
        assert!(text.contains("u: Undo create"));
        assert!(!text.contains("r: Redo"));

        press(&mut app, KeyCode::Char('u'));
        app.clear_status_message();
        let text = screen(&mut app);
        assert!(text.contains("r: Redo create"));
        assert!(!text.contains("u: Undo"));
    }

    #[test]
    fn renders_every_state() {
        let dir = tempfile::tempdir().unwrap();
        let mut app = ready(dir.path());
        add(&mut app, "Prepare slides", Quadrant::Q1);
        add(&mut app, "Call the bank", Quadrant::Q3);

        let text = screen(&mut app);
        assert!(text.contains("EISENHOWER MATRIX"));
        assert!(text.contains("Do First"));
        assert!(text.contains("Prepare slides"));

        press(&mut app, KeyCode::Enter);
        assert!(screen(&mut app).contains("Task Details"));
        press(&mut app, KeyCode::Esc);

        press(&mut app, KeyCode::Char('a'));
        assert!(screen(&mut app).contains("Add Task"));
        press(&mut app, KeyCode::Esc);

        press(&mut app, KeyCode::Char('3'));
        press(&mut app, KeyCode::Char(' '));
        assert!(screen(&mut app).contains("Who did you hand"));
        press(&mut app, KeyCode::Esc);

        press(&mut app, KeyCode::Char('g'));
        assert!(screen(&mut app).contains("drop here"));
        press(&mut app, KeyCode::Esc);

        press(&mut app, KeyCode::Char('W'));
        assert!(screen(&mut app).contains("cannot be undone"));
        press(&mut app, KeyCode::Char('n'));

        press(&mut app, KeyCode::Char('?'));
        assert!(screen(&mut app).contains("Due Date Formats"));
    }
}
