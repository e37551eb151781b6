//! Session state: working directory, history, tab completion
//!
//! Scoped to one terminal instance (one browser tab on one level view) and
//! destroyed when the view unloads; nothing here persists.
//!
//! History is append-only. The cursor `index` ranges over `[0, len]`, where
//! `len` means "fresh line": the first step back saves the in-progress
//! input so stepping forward past the newest entry restores it.

/// Result of a tab-completion attempt
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Completion {
    /// Nothing matched; leave the input alone
    None,
    /// Exactly one match; replace the input with it
    Single(String),
    /// Several matches; list them, do not touch the input
    Many(Vec<String>),
}

/// Mutable per-terminal navigation state
pub struct SessionState {
    pub current_path: String,
    history: Vec<String>,
    index: usize,
    /// In-progress input saved on the first step back from the fresh line
    stash: Option<String>,
    /// Next hint to show, advanced by the `hint` command's side effect
    hint_cursor: usize,
}

impl SessionState {
    pub fn new(start_path: impl Into<String>) -> Self {
        Self {
            current_path: start_path.into(),
            history: Vec::new(),
            index: 0,
            stash: None,
            hint_cursor: 0,
        }
    }

    /// Append a command to history and reset the cursor to the fresh line.
    pub fn push_history(&mut self, line: impl Into<String>) {
        self.history.push(line.into());
        self.index = self.history.len();
        self.stash = None;
    }

    pub fn history(&self) -> &[String] {
        &self.history
    }

    /// Step back in history. Returns the line to place in the input, or
    /// `None` if history is empty.
    pub fn history_prev(&mut self, current_input: &str) -> Option<String> {
        if self.history.is_empty() {
            return None;
        }
        if self.index == self.history.len() {
            self.stash = Some(current_input.to_string());
        }
        if self.index > 0 {
            self.index -= 1;
        }
        Some(self.history[self.index].clone())
    }

    /// Step forward in history. At the fresh-line position this restores
    /// the stashed in-progress input (or an empty line if none was saved).
    pub fn history_next(&mut self) -> Option<String> {
        if self.index >= self.history.len() {
            return None;
        }
        self.index += 1;
        if self.index == self.history.len() {
            Some(self.stash.take().unwrap_or_default())
        } else {
            Some(self.history[self.index].clone())
        }
    }

    /// Complete a partial command name against the given candidate set.
    pub fn complete(&self, prefix: &str, candidates: &[String]) -> Completion {
        let matches: Vec<String> = candidates
            .iter()
            .filter(|c| c.starts_with(prefix))
            .cloned()
            .collect();
        match matches.len() {
            0 => Completion::None,
            1 => Completion::Single(matches.into_iter().next().unwrap_or_default()),
            _ => Completion::Many(matches),
        }
    }

    /// The hint the `hint` command should show next.
    pub fn hint_cursor(&self) -> usize {
        self.hint_cursor
    }

    pub fn advance_hint(&mut self, hint_count: usize) {
        if hint_count > 0 {
            self.hint_cursor = (self.hint_cursor + 1) % hint_count;
        }
    }
}
