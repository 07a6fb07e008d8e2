//! Draft question buffer with auto-growing height.

/// A key press relevant to the input area.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum KeyInput {
    Char(char),
    /// Confirm without inserting a newline.
    Enter,
    /// Insert a newline and keep editing.
    ShiftEnter,
    Backspace,
}

/// What the caller should do after a key press.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InputAction {
    /// The user asked to send the draft.
    Submit,
    /// The draft changed; redraw the input area.
    Edited,
    /// Nothing happened.
    Ignored,
}

/// The editable draft.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InputBuffer {
    text: String,
    max_rows: usize,
}

impl InputBuffer {
    /// Empty buffer whose height is capped at `max_rows` (at least 1).
    pub fn new(max_rows: usize) -> Self {
        Self {
            text: String::new(),
            max_rows: max_rows.max(1),
        }
    }

    /// Buffer prefilled with `text`.
    pub fn with_text(text: &str, max_rows: usize) -> Self {
        let mut buf = Self::new(max_rows);
        buf.text = text.to_string();
        buf
    }

    pub fn text(&self) -> &str {
        &self.text
    }

    pub fn set_text(&mut self, text: &str) {
        self.text = text.to_string();
    }

    pub fn clear(&mut self) {
        self.text.clear();
    }

    pub fn is_blank(&self) -> bool {
        self.text.trim().is_empty()
    }

    /// Whether the send control is enabled.
    pub fn can_submit(&self) -> bool {
        !self.is_blank()
    }

    /// The draft as it would be submitted.
    pub fn trimmed(&self) -> &str {
        self.text.trim()
    }

    /// Apply a key press.
    pub fn handle_key(&mut self, key: KeyInput) -> InputAction {
        match key {
            KeyInput::Enter => InputAction::Submit,
            KeyInput::ShiftEnter => {
                self.text.push('\n');
                InputAction::Edited
            }
            KeyInput::Char(c) => {
                self.text.push(c);
                InputAction::Edited
            }
            KeyInput::Backspace => {
                if self.text.pop().is_some() {
                    InputAction::Edited
                } else {
                    InputAction::Ignored
                }
            }
        }
    }

    /// The draft split into display rows, soft-wrapping at `width` columns.
    ///
    /// Every logical line takes at least one row, so blank lines are kept.
    pub fn wrapped_lines(&self, width: usize) -> Vec<String> {
        let width = width.max(1);
        let mut rows = Vec::new();
        for line in self.text.split('\n') {
            let chars: Vec<char> = line.chars().collect();
            if chars.is_empty() {
                rows.push(String::new());
                continue;
            }
            rows.extend(chars.chunks(width).map(|chunk| chunk.iter().collect::<String>()));
        }
        rows
    }

    /// Visible height at `width` columns: one row per wrapped line, capped
    /// at `max_rows`. Beyond the cap the draft scrolls.
    pub fn rows(&self, width: usize) -> usize {
        self.wrapped_lines(width).len().min(self.max_rows)
    }
}
