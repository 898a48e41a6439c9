//! Command line for the TUI: a char-indexed edit buffer with history and
//! command-word completion.

use crate::session::COMMAND_WORDS;

/// Submitted lines, newest last.
pub struct History {
    entries: Vec<String>,
    position: Option<usize>,
    limit: usize,
}

impl History {
    pub fn new(limit: usize) -> Self {
        Self { entries: Vec::new(), position: None, limit }
    }

    pub fn add(&mut self, entry: String) {
        self.position = None;
        if entry.trim().is_empty() || self.entries.last() == Some(&entry) {
            return;
        }
        self.entries.push(entry);
        if self.entries.len() > self.limit {
            self.entries.remove(0);
        }
    }

    pub fn older(&mut self) -> Option<&str> {
        let pos = match self.position {
            None if self.entries.is_empty() => return None,
            None => self.entries.len() - 1,
            Some(p) => p.saturating_sub(1),
        };
        self.position = Some(pos);
        self.entries.get(pos).map(String::as_str)
    }

    pub fn newer(&mut self) -> Option<&str> {
        let p = self.position?;
        if p + 1 >= self.entries.len() {
            self.position = None;
            return None;
        }
        self.position = Some(p + 1);
        self.entries.get(p + 1).map(String::as_str)
    }
}

pub struct InputLine {
    chars: Vec<char>,
    /// In chars, not bytes.
    cursor: usize,
    history: History,
    draft: Option<String>,
}

impl Default for InputLine {
    fn default() -> Self {
        Self::new()
    }
}

impl InputLine {
    pub fn new() -> Self {
        Self { chars: Vec::new(), cursor: 0, history: History::new(100), draft: None }
    }

    pub fn value(&self) -> String {
        self.chars.iter().collect()
    }

    pub fn cursor(&self) -> usize {
        self.cursor
    }

    pub fn insert(&mut self, c: char) {
        self.chars.insert(self.cursor, c);
        self.cursor += 1;
    }

    pub fn backspace(&mut self) {
        if self.cursor > 0 {
            self.cursor -= 1;
            self.chars.remove(self.cursor);
        }
    }

    pub fn delete(&mut self) {
        if self.cursor < self.chars.len() {
            self.chars.remove(self.cursor);
        }
    }

    pub fn move_left(&mut self) {
        self.cursor = self.cursor.saturating_sub(1);
    }

    pub fn move_right(&mut self) {
        self.cursor = (self.cursor + 1).min(self.chars.len());
    }

    pub fn move_home(&mut self) {
        self.cursor = 0;
    }

    pub fn move_end(&mut self) {
        self.cursor = self.chars.len();
    }

    pub fn clear(&mut self) {
        self.set("");
        self.draft = None;
    }

    pub fn set(&mut self, content: &str) {
        self.chars = content.chars().collect();
        self.cursor = self.chars.len();
    }

    pub fn submit(&mut self) -> String {
        let line = self.value();
        self.set("");
        self.draft = None;
        self.history.add(line.clone());
        line
    }

    pub fn history_prev(&mut self) {
        if self.draft.is_none() {
            self.draft = Some(self.value());
        }
        if let Some(entry) = self.history.older().map(str::to_string) {
            self.set(&entry);
        }
    }

    pub fn history_next(&mut self) {
        match self.history.newer().map(str::to_string) {
            Some(entry) => self.set(&entry),
            None => {
                let draft = self.draft.take().unwrap_or_default();
                self.set(&draft);
            }
        }
    }

    /// Complete the command word under the cursor. Returns the candidates
    /// when more than one matches.
    pub fn complete(&mut self) -> Vec<&'static str> {
        let before: String = self.chars[..self.cursor].iter().collect();
        if before.contains(char::is_whitespace) {
            return Vec::new();
        }
        let matches: Vec<&'static str> =
            COMMAND_WORDS.iter().copied().filter(|w| w.starts_with(before.as_str())).collect();
        match matches.as_slice() {
            [only] => {
                let rest: String = self.chars[self.cursor..].iter().collect();
                self.set(&format!("{} {}", only, rest.trim_start()));
                self.cursor = only.chars().count() + 1;
                Vec::new()
            }
            _ => matches,
        }
    }
}
