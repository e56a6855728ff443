use std::fmt;

/// A key press as the line editor understands it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Key {
    Char(char),
    Paste(String),
    Backspace,
    Delete,
    Left,
    Right,
    Home,
    End,
    Up,
    Down,
    Enter,
}

impl Key {
    /// Translate a DOM `KeyboardEvent.key` value. Ctrl+V is not mapped here:
    /// the paste text arrives later from the clipboard as [`Key::Paste`].
    pub fn from_dom(key: &str, ctrl: bool) -> Option<Key> {
        let mut chars = key.chars();
        if let (Some(c), None) = (chars.next(), chars.next()) {
            return if ctrl { None } else { Some(Key::Char(c)) };
        }
        match key {
            "Backspace" => Some(Key::Backspace),
            "Delete" => Some(Key::Delete),
            "ArrowLeft" => Some(Key::Left),
            "ArrowRight" => Some(Key::Right),
            "Home" => Some(Key::Home),
            "End" => Some(Key::End),
            "ArrowUp" => Some(Key::Up),
            "ArrowDown" => Some(Key::Down),
            "Enter" => Some(Key::Enter),
            _ => None,
        }
    }

    pub fn is_paste_shortcut(key: &str, ctrl: bool) -> bool {
        ctrl && key.eq_ignore_ascii_case("v")
    }
}

/// The line being typed. `cursor` counts characters, never bytes.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct InputBuffer {
    text: String,
    cursor: usize,
}

impl InputBuffer {
    pub fn text(&self) -> &str {
        &self.text
    }

    pub fn cursor(&self) -> usize {
        self.cursor
    }

    pub fn len(&self) -> usize {
        self.text.chars().count()
    }

    pub fn is_empty(&self) -> bool {
        self.text.is_empty()
    }

    fn byte_offset(&self, chars: usize) -> usize {
        self.text
            .char_indices()
            .nth(chars)
            .map(|(i, _)| i)
            .unwrap_or(self.text.len())
    }

    /// Insert text at the cursor and move past it
    pub fn insert(&mut self, s: &str) {
        let at = self.byte_offset(self.cursor);
        self.text.insert_str(at, s);
        self.cursor += s.chars().count();
    }

    /// Remove the character before the cursor
    pub fn backspace(&mut self) {
        if self.cursor > 0 {
            let at = self.byte_offset(self.cursor - 1);
            self.text.remove(at);
            self.cursor -= 1;
        }
    }

    /// Remove the character under the cursor
    pub fn delete(&mut self) {
        if self.cursor < self.len() {
            let at = self.byte_offset(self.cursor);
            self.text.remove(at);
        }
    }

    pub fn left(&mut self) {
        self.cursor = self.cursor.saturating_sub(1);
    }

    pub fn right(&mut self) {
        if self.cursor < self.len() {
            self.cursor += 1;
        }
    }

    pub fn home(&mut self) {
        self.cursor = 0;
    }

    pub fn end(&mut self) {
        self.cursor = self.len();
    }

    /// Replace the whole line, cursor at the end
    pub fn replace(&mut self, text: &str) {
        self.text = text.to_string();
        self.cursor = self.len();
    }

    /// Empty the buffer and hand back what was in it
    pub fn take(&mut self) -> String {
        self.cursor = 0;
        std::mem::take(&mut self.text)
    }

    /// Split around the cursor for rendering
    pub fn split(&self) -> (&str, &str) {
        self.text.split_at(self.byte_offset(self.cursor))
    }
}

/// Submitted lines in the order they ran.
///
/// `index` is -1 before anything is submitted and `len()` right after each
/// submission. Recall walks it back and forth within `[0, len - 1]`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct History {
    entries: Vec<String>,
    index: isize,
}

impl Default for History {
    fn default() -> Self {
        Self::new()
    }
}

impl History {
    pub fn new() -> Self {
        History {
            entries: Vec::new(),
            index: -1,
        }
    }

    pub fn push(&mut self, line: &str) {
        self.entries.push(line.to_string());
        self.index = self.entries.len() as isize;
    }

    pub fn index(&self) -> isize {
        self.index
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn entries(&self) -> &[String] {
        &self.entries
    }

    pub fn previous(&mut self) -> Option<&str> {
        if self.index > 0 {
            self.index -= 1;
            return self.entries.get(self.index as usize).map(String::as_str);
        }
        None
    }

    pub fn next(&mut self) -> Option<&str> {
        if self.index < self.entries.len() as isize - 1 {
            self.index += 1;
            return self.entries.get(self.index as usize).map(String::as_str);
        }
        None
    }
}

/// What a single key did to the line.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EditOutcome {
    Ignored,
    Edited,
    Commit(String),
}

/// One frame of the prompt line.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PromptView {
    pub prompt: String,
    pub before: String,
    pub cursor: char,
    pub after: String,
}

impl fmt::Display for PromptView {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}{}{}{}", self.prompt, self.before, self.cursor, self.after)
    }
}

pub const CURSOR_ON: char = '|';
pub const CURSOR_OFF: char = '_';

#[derive(Debug, Clone, Default)]
pub struct LineEditor {
    buffer: InputBuffer,
    blink: bool,
}

impl LineEditor {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn buffer(&self) -> &InputBuffer {
        &self.buffer
    }

    pub fn handle(&mut self, key: Key, history: &mut History) -> EditOutcome {
        match key {
            Key::Char(c) => {
                let mut tmp = [0u8; 4];
                self.buffer.insert(c.encode_utf8(&mut tmp));
            }
            Key::Paste(text) => self.buffer.insert(&text),
            Key::Backspace => self.buffer.backspace(),
            Key::Delete => self.buffer.delete(),
            Key::Left => self.buffer.left(),
            Key::Right => self.buffer.right(),
            Key::Home => self.buffer.home(),
            Key::End => self.buffer.end(),
            Key::Up => match history.previous() {
                Some(line) => self.buffer.replace(line),
                None => return EditOutcome::Ignored,
            },
            Key::Down => match history.next() {
                Some(line) => self.buffer.replace(line),
                None => return EditOutcome::Ignored,
            },
            Key::Enter => {
                let line = self.buffer.take();
                return EditOutcome::Commit(line.trim().to_string());
            }
        }
        EditOutcome::Edited
    }

    /// Produce the next frame. Each call flips the cursor glyph, so the
    /// cursor blinks only while keys are arriving.
    pub fn render(&mut self, prompt: &str) -> PromptView {
        self.blink = !self.blink;
        let (before, after) = self.buffer.split();
        PromptView {
            prompt: prompt.to_string(),
            before: before.to_string(),
            cursor: if self.blink { CURSOR_ON } else { CURSOR_OFF },
            after: after.to_string(),
        }
    }
}
