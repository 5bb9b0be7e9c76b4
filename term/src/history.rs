//! Command history: a fixed-depth ring of past lines.

use alloc::collections::VecDeque;
use alloc::string::String;

/// Depth of the history ring.
pub const HIST_SIZE: usize = 50;

pub struct History {
    /// Newest entry at the back.
    lines: VecDeque<String>,
    /// Position while the user browses with prev/next. `None` = at the
    /// fresh-input line below the newest entry.
    cursor: Option<usize>,
}

impl History {
    pub const fn new() -> Self {
        Self {
            lines: VecDeque::new(),
            cursor: None,
        }
    }

    /// Append a line. Consecutive duplicates are collapsed.
    pub fn add(&mut self, line: &str) {
        if line.is_empty() {
            return;
        }
        if self.lines.back().map(String::as_str) == Some(line) {
            return;
        }
        if self.lines.len() == HIST_SIZE {
            self.lines.pop_front();
        }
        self.lines.push_back(String::from(line));
        self.cursor = None;
    }

    pub fn reset_cursor(&mut self) {
        self.cursor = None;
    }

    /// Step back in time (Ctrl-O / arrow up).
    pub fn prev(&mut self) -> Option<&str> {
        if self.lines.is_empty() {
            return None;
        }
        let next = match self.cursor {
            None => self.lines.len() - 1,
            Some(0) => 0,
            Some(i) => i - 1,
        };
        self.cursor = Some(next);
        self.lines.get(next).map(String::as_str)
    }

    /// Step forward (Ctrl-P / arrow down). Walking past the newest entry
    /// returns `None` and leaves the cursor on the fresh-input line.
    pub fn next(&mut self) -> Option<&str> {
        let i = self.cursor?;
        if i + 1 >= self.lines.len() {
            self.cursor = None;
            return None;
        }
        self.cursor = Some(i + 1);
        self.lines.get(i + 1).map(String::as_str)
    }

    /// Most-recent-first search. Substring by default, anchored prefix when
    /// the pattern starts with `^`.
    pub fn search(&self, pattern: &str) -> Option<&str> {
        let (anchored, pat) = match pattern.strip_prefix('^') {
            Some(rest) => (true, rest),
            None => (false, pattern),
        };
        if pat.is_empty() {
            return None;
        }
        self.lines
            .iter()
            .rev()
            .find(|line| {
                if anchored {
                    line.starts_with(pat)
                } else {
                    line.contains(pat)
                }
            })
            .map(String::as_str)
    }

    /// Oldest-first iteration for `show history`.
    pub fn iter(&self) -> impl Iterator<Item = &str> {
        self.lines.iter().map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.lines.len()
    }

    pub fn is_empty(&self) -> bool {
        self.lines.is_empty()
    }
}

impl Default for History {
    fn default() -> Self {
        Self::new()
    }
}
