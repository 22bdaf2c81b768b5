//! Enumerations for TUI state management.

/// What the board is currently showing on top of the quadrants.
#[derive(Clone, Copy, PartialEq, Debug)]
pub enum AppState {
    Board,
    Detail,
    AddTask,
    EditTask,
    /// Asking who an undelegated q3 task went to.
    DelegatePrompt,
    /// A task is picked up; arrows choose where it lands.
    Grab,
    ConfirmEndWeek,
    Help,
}

/// Input mode for text entry fields.
#[derive(Clone, Copy, PartialEq, Debug)]
pub enum InputMode {
    None,
    Text,
}

impl AppState {
    /// States that capture typed characters.
    pub fn input_mode(self) -> InputMode {
        match self {
            AppState::AddTask | AppState::EditTask | AppState::DelegatePrompt => InputMode::Text,
            _ => InputMode::None,
        }
    }
}
