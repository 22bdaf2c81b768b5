//! Input field handling for the terminal user interface.

/// A text input field with cursor position and active state management.
/// The cursor counts characters, not bytes.
#[derive(Clone, Debug, Default)]
pub struct InputField {
    pub value: String,
    pub cursor: usize,
    pub active: bool,
}

impl InputField {
    /// Create a new empty input field.
    pub fn new() -> Self {
        Self::default()
    }

    /// Create an input field with initial text value.
    pub fn with_value(value: &str) -> Self {
        Self {
            value: value.to_string(),
            cursor: value.chars().count(),
            active: false,
        }
    }

    fn byte_offset(&self, char_index: usize) -> usize {
        self.value
            .char_indices()
            .nth(char_index)
            .map(|(i, _)| i)
            .unwrap_or(self.value.len())
    }

    fn len_chars(&self) -> usize {
        self.value.chars().count()
    }

    /// Insert a character at the current cursor position.
    pub fn handle_char(&mut self, c: char) {
        let at = self.byte_offset(self.cursor);
        self.value.insert(at, c);
        self.cursor += 1;
    }

    /// Delete the character before the cursor.
    pub fn handle_backspace(&mut self) {
        if self.cursor > 0 {
            let at = self.byte_offset(self.cursor - 1);
            self.value.remove(at);
            self.cursor -= 1;
        }
    }

    /// Delete the character at the cursor position.
    pub fn handle_delete(&mut self) {
        if self.cursor < self.len_chars() {
            let at = self.byte_offset(self.cursor);
            self.value.remove(at);
        }
    }

    pub fn move_cursor_left(&mut self) {
        self.cursor = self.cursor.saturating_sub(1);
    }

    pub fn move_cursor_right(&mut self) {
        if self.cursor < self.len_chars() {
            self.cursor += 1;
        }
    }

    pub fn clear(&mut self) {
        self.value.clear();
        self.cursor = 0;
    }

    /// Trimmed value, `None` when blank.
    pub fn text(&self) -> Option<String> {
        let t = self.value.trim();
        (!t.is_empty()).then(|| t.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn edits_multibyte_text_by_character() {
        let mut f = InputField::with_value("café");
        assert_eq!(f.cursor, 4);
        f.handle_backspace();
        assert_eq!(f.value, "caf");
        f.handle_char('é');
        f.move_cursor_left();
        f.move_cursor_left();
        f.handle_char('🚀');
        assert_eq!(f.value, "ca🚀fé");
        f.handle_delete();
        assert_eq!(f.value, "ca🚀é");
        f.move_cursor_right();
        f.move_cursor_right();
        f.move_cursor_right();
        assert_eq!(f.cursor, 4);
    }

    #[test]
    fn blank_text_is_none() {
        assert_eq!(InputField::with_value("   ").text(), None);
        assert_eq!(InputField::with_value(" Sam ").text().as_deref(), Some("Sam"));
        let mut f = InputField::with_value("x");
        f.clear();
        assert_eq!(f.cursor, 0);
        f.move_cursor_left();
        assert_eq!(f.cursor, 0);
    }
}
