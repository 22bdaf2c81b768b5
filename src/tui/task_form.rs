//! Task form handling for the terminal user interface.
//!
//! This module provides the `TaskForm` structure used by the board to add and
//! edit tasks: text fields for title, description, due date and icon, plus
//! selectors for the quadrant and the linked goal.

use chrono::NaiveDate;

use crate::dates::parse_due_input;
use crate::fields::Quadrant;
use crate::goal::Goal;
use crate::task::{Task, TaskInput, TaskPatch};
use crate::tui::input::InputField;

/// Global order constants for form fields.
pub const TITLE_GLOBAL_ORDER: usize = 0;
pub const DESCRIPTION_GLOBAL_ORDER: usize = 1;
pub const DUE_GLOBAL_ORDER: usize = 2;
pub const ICON_GLOBAL_ORDER: usize = 3;
pub const QUADRANT_GLOBAL_ORDER: usize = 4;
pub const GOAL_GLOBAL_ORDER: usize = 5;

/// Task form for editing fields
pub struct TaskForm {
    pub title: InputField,
    pub description: InputField,
    pub due: InputField,
    pub icon: InputField,
    pub quadrant: usize,
    /// 0 is "no goal"; `n` is `goals[n - 1]`.
    pub goal: usize,
    pub current_field: usize,
    /// (id, title) of the goals a task can be linked to.
    pub goals: Vec<(String, String)>,
    /// Icon the edited task had when the form opened.
    original_icon: Option<String>,
}

impl TaskForm {
    /// Empty form for a new task in `quadrant`.
    pub fn new(quadrant: Quadrant, goals: &[Goal]) -> Self {
        let mut form = TaskForm {
            title: InputField::new(),
            description: InputField::new(),
            due: InputField::new(),
            icon: InputField::new(),
            quadrant: quadrant.index(),
            goal: 0,
            current_field: TITLE_GLOBAL_ORDER,
            goals: goals.iter().map(|g| (g.id.clone(), g.title.clone())).collect(),
            original_icon: None,
        };
        form.update_active_field();
        form
    }

    /// Create a task form populated from an existing task.
    pub fn from_task(task: &Task, goals: &[Goal]) -> Self {
        let mut form = Self::new(task.quadrant, goals);
        form.title = InputField::with_value(&task.title);
        form.description = InputField::with_value(task.description.as_deref().unwrap_or_default());
        form.due = InputField::with_value(
            &task.due_date.map(|d| d.format("%Y-%m-%d").to_string()).unwrap_or_default(),
        );
        form.icon = InputField::with_value(&task.icon);
        form.goal = task
            .goal_id
            .as_ref()
            .and_then(|id| form.goals.iter().position(|(g, _)| g == id))
            .map(|i| i + 1)
            .unwrap_or(0);
        form.original_icon = Some(task.icon.clone());
        form.update_active_field();
        form
    }

    /// Get mutable references to all input fields in visual order.
    pub fn fields_mut(&mut self) -> Vec<&mut InputField> {
        vec![&mut self.title, &mut self.description, &mut self.due, &mut self.icon]
    }

    fn active_input(&mut self) -> Option<&mut InputField> {
        match self.current_field {
            TITLE_GLOBAL_ORDER => Some(&mut self.title),
            DESCRIPTION_GLOBAL_ORDER => Some(&mut self.description),
            DUE_GLOBAL_ORDER => Some(&mut self.due),
            ICON_GLOBAL_ORDER => Some(&mut self.icon),
            _ => None,
        }
    }

    /// Get the total number of fields (input fields + selectors).
    pub fn field_count(&self) -> usize {
        6
    }

    /// Move to the next field in the form.
    pub fn next_field(&mut self) {
        self.current_field = (self.current_field + 1) % self.field_count();
        self.update_active_field();
    }

    /// Move to the previous field in the form.
    pub fn prev_field(&mut self) {
        self.current_field = if self.current_field == 0 {
            self.field_count() - 1
        } else {
            self.current_field - 1
        };
        self.update_active_field();
    }

    /// Update which field is currently active for editing.
    pub fn update_active_field(&mut self) {
        for field in self.fields_mut() {
            field.active = false;
        }
        if let Some(field) = self.active_input() {
            field.active = true;
        }
    }

    pub fn handle_char(&mut self, c: char) {
        if let Some(field) = self.active_input() {
            field.handle_char(c);
        }
    }

    pub fn handle_backspace(&mut self) {
        if let Some(field) = self.active_input() {
            field.handle_backspace();
        }
    }

    pub fn handle_delete(&mut self) {
        if let Some(field) = self.active_input() {
            field.handle_delete();
        }
    }

    /// Handle left/right arrow keys for cursor movement or selector changes.
    pub fn handle_left_right(&mut self, right: bool) {
        match self.current_field {
            QUADRANT_GLOBAL_ORDER => self.quadrant = cycle(self.quadrant, Quadrant::ALL.len(), right),
            GOAL_GLOBAL_ORDER => self.goal = cycle(self.goal, self.goals.len() + 1, right),
            _ => {
                if let Some(field) = self.active_input() {
                    if right {
                        field.move_cursor_right();
                    } else {
                        field.move_cursor_left();
                    }
                }
            }
        }
    }

    pub fn selected_quadrant(&self) -> Quadrant {
        Quadrant::from_index(self.quadrant).unwrap_or(Quadrant::Q2)
    }

    pub fn selected_goal(&self) -> Option<&(String, String)> {
        self.goal.checked_sub(1).and_then(|i| self.goals.get(i))
    }

    fn parsed_due(&self, today: NaiveDate) -> Result<Option<NaiveDate>, String> {
        match self.due.text() {
            None => Ok(None),
            Some(s) => parse_due_input(&s, today)
                .map(Some)
                .ok_or_else(|| format!("Could not understand due date '{s}'")),
        }
    }

    /// Build the input for a new task. Fails only on an unreadable due date.
    pub fn to_input(&self, today: NaiveDate) -> Result<TaskInput, String> {
        Ok(TaskInput {
            title: self.title.value.clone(),
            description: self.description.text(),
            quadrant: Some(self.selected_quadrant()),
            due_date: self.parsed_due(today)?,
            icon: self.icon.text(),
            delegate: None,
            goal_id: self.selected_goal().map(|(id, _)| id.clone()),
        })
    }

    /// Build the patch for an edited task. An untouched icon is left out so a
    /// new title can pick a fresh one.
    pub fn to_patch(&self, today: NaiveDate) -> Result<TaskPatch, String> {
        let icon = self.icon.text().filter(|i| Some(i) != self.original_icon.as_ref());
        Ok(TaskPatch {
            title: Some(self.title.value.clone()),
            description: Some(self.description.text()),
            quadrant: Some(self.selected_quadrant()),
            due_date: Some(self.parsed_due(today)?),
            icon,
            delegate: None,
            goal_id: Some(self.selected_goal().map(|(id, _)| id.clone())),
        })
    }
}

fn cycle(current: usize, len: usize, forward: bool) -> usize {
    if len == 0 {
        return 0;
    }
    if forward {
        (current + 1) % len
    } else if current == 0 {
        len - 1
    } else {
        current - 1
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{TimeZone, Utc};

    fn today() -> NaiveDate {
        NaiveDate::from_ymd_opt(2024, 1, 15).unwrap()
    }

    fn task() -> Task {
        Task {
            id: 7,
            title: "Reply to email".into(),
            description: None,
            quadrant: Quadrant::Q3,
            due_date: Some(today()),
            completed: false,
            icon: "📧".into(),
            delegate: None,
            goal_id: None,
            created_at: Utc.with_ymd_and_hms(2024, 1, 15, 9, 0, 0).unwrap(),
        }
    }

    #[test]
    fn new_form_builds_input() {
        let mut form = TaskForm::new(Quadrant::Q4, &[]);
        for c in "Tidy desk".chars() {
            form.handle_char(c);
        }
        form.current_field = DUE_GLOBAL_ORDER;
        for c in "tomorrow".chars() {
            form.handle_char(c);
        }
        let input = form.to_input(today()).unwrap();
        assert_eq!(input.title, "Tidy desk");
        assert_eq!(input.quadrant, Some(Quadrant::Q4));
        assert_eq!(input.due_date, NaiveDate::from_ymd_opt(2024, 1, 16));
        assert_eq!(input.icon, None);
    }

    #[test]
    fn bad_due_date_is_reported() {
        let mut form = TaskForm::new(Quadrant::Q1, &[]);
        form.due = InputField::with_value("someday");
        assert!(form.to_input(today()).is_err());
    }

    #[test]
    fn selectors_wrap_around() {
        let mut form = TaskForm::new(Quadrant::Q1, &[]);
        form.current_field = QUADRANT_GLOBAL_ORDER;
        form.handle_left_right(false);
        assert_eq!(form.selected_quadrant(), Quadrant::Q4);
        form.handle_left_right(true);
        assert_eq!(form.selected_quadrant(), Quadrant::Q1);

        form.current_field = GOAL_GLOBAL_ORDER;
        form.handle_left_right(true);
        assert_eq!(form.goal, 0);
        assert!(form.selected_goal().is_none());
    }

    #[test]
    fn unchanged_icon_is_left_out_of_patch() {
        let form = TaskForm::from_task(&task(), &[]);
        assert_eq!(form.selected_quadrant(), Quadrant::Q3);
        let patch = form.to_patch(today()).unwrap();
        assert_eq!(patch.icon, None);
        assert_eq!(patch.due_date, Some(Some(today())));

        let mut form = TaskForm::from_task(&task(), &[]);
        form.icon = InputField::with_value("⭐");
        assert_eq!(form.to_patch(today()).unwrap().icon.as_deref(), Some("⭐"));
    }

    #[test]
    fn tab_order_cycles_and_marks_active() {
        let mut form = TaskForm::new(Quadrant::Q2, &[]);
        assert!(form.title.active);
        form.next_field();
        assert!(form.description.active && !form.title.active);
        form.prev_field();
        form.prev_field();
        assert_eq!(form.current_field, GOAL_GLOBAL_ORDER);
        assert!(form.fields_mut().iter().all(|f| !f.active));
    }
}
