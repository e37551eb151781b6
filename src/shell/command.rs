//! Command capability interface
//!
//! A command is an object with a name, an argument contract, and an
//! `execute` method that reads session/filesystem state and returns an
//! `Outcome`: display lines plus side effects. Handlers get shared
//! references only; all mutation travels through `SideEffect` so a failed
//! handler can never leave the session half-updated.

use crate::level::LevelDescriptor;
use crate::shell::session::SessionState;
use crate::vfs::Vfs;
use std::collections::HashMap;

/// Presentation hint for one output line. The core never emits escape
/// sequences; mapping hints to colors is the renderer's concern.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StyleHint {
    Plain,
    Error,
    Success,
    Banner,
    /// Echo of a submitted input line (prompt + command)
    Input,
    /// Secondary text, e.g. "Checking flag..."
    Muted,
}

/// One line of terminal output
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Line {
    pub text: String,
    pub style: StyleHint,
}

impl Line {
    pub fn plain(text: impl Into<String>) -> Self {
        Self { text: text.into(), style: StyleHint::Plain }
    }

    pub fn error(text: impl Into<String>) -> Self {
        Self { text: text.into(), style: StyleHint::Error }
    }

    pub fn success(text: impl Into<String>) -> Self {
        Self { text: text.into(), style: StyleHint::Success }
    }
}

/// State mutations requested by a command, applied by the dispatcher (or
/// the terminal, for the ones that touch the output buffer or the flag
/// protocol) strictly after the handler returns.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SideEffect {
    CwdChange(String),
    PermissionChange { path: String, mode: String },
    ClearScreen,
    AdvanceHint,
    /// Hand the flag text to the submission state machine
    Submit(String),
}

/// The structured result of executing one command
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct Outcome {
    pub lines: Vec<Line>,
    pub effects: Vec<SideEffect>,
}

impl Outcome {
    pub fn empty() -> Self {
        Self::default()
    }

    /// Plain output; multi-line text becomes one `Line` per line.
    pub fn text(text: impl AsRef<str>) -> Self {
        let mut out = Self::default();
        for line in text.as_ref().lines() {
            out.lines.push(Line::plain(line));
        }
        if text.as_ref().is_empty() {
            out.lines.push(Line::plain(""));
        }
        out
    }

    pub fn error(text: impl Into<String>) -> Self {
        Self { lines: vec![Line::error(text)], effects: Vec::new() }
    }

    pub fn with_effect(mut self, effect: SideEffect) -> Self {
        self.effects.push(effect);
        self
    }
}

/// Argument count contract, checked by the dispatcher before `execute`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ArgSpec {
    None,
    Exactly(usize),
    AtMost(usize),
    Any,
}

impl ArgSpec {
    pub fn accepts(&self, count: usize) -> bool {
        match self {
            Self::None => count == 0,
            Self::Exactly(n) => count == *n,
            Self::AtMost(n) => count <= *n,
            Self::Any => true,
        }
    }
}

/// Read-only view handed to command handlers.
pub struct Context<'a> {
    pub args: &'a [String],
    pub session: &'a SessionState,
    pub fs: &'a Vfs,
    pub level: &'a LevelDescriptor,
    /// Display string for `date`, set by the platform
    pub clock: &'a str,
    /// Command names visible in this level, for `help`
    pub available: &'a [String],
    pub registry: &'a CommandRegistry,
}

/// A command the terminal can execute
pub trait Command {
    fn name(&self) -> &'static str;
    /// One-line description for `help`
    fn summary(&self) -> &'static str;
    fn usage(&self) -> &'static str;
    fn arg_spec(&self) -> ArgSpec {
        ArgSpec::Any
    }
    fn execute(&self, ctx: &Context) -> Outcome;
}

/// Registry of all known commands. Which of them a player can actually run
/// is decided per level by the dispatcher.
pub struct CommandRegistry {
    commands: HashMap<&'static str, Box<dyn Command>>,
}

impl CommandRegistry {
    pub fn new() -> Self {
        let mut reg = Self { commands: HashMap::new() };
        for cmd in crate::shell::programs::all() {
            reg.register(cmd);
        }
        reg
    }

    pub fn register(&mut self, cmd: Box<dyn Command>) {
        self.commands.insert(cmd.name(), cmd);
    }

    pub fn get(&self, name: &str) -> Option<&dyn Command> {
        self.commands.get(name).map(|c| c.as_ref())
    }

    pub fn contains(&self, name: &str) -> bool {
        self.commands.contains_key(name)
    }

    pub fn names(&self) -> Vec<&'static str> {
        let mut names: Vec<_> = self.commands.keys().copied().collect();
        names.sort_unstable();
        names
    }
}

impl Default for CommandRegistry {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_outcome_text_splits_lines() {
        let out = Outcome::text("one\ntwo");
        assert_eq!(out.lines.len(), 2);
        assert_eq!(out.lines[0], Line::plain("one"));
        assert_eq!(out.lines[1], Line::plain("two"));
    }

    #[test]
    fn test_outcome_empty_text_prints_blank_line() {
        let out = Outcome::text("");
        assert_eq!(out.lines, vec![Line::plain("")]);
    }

    #[test]
    fn test_arg_spec() {
        assert!(ArgSpec::None.accepts(0));
        assert!(!ArgSpec::None.accepts(1));
        assert!(ArgSpec::Exactly(2).accepts(2));
        assert!(!ArgSpec::Exactly(2).accepts(1));
        assert!(ArgSpec::AtMost(1).accepts(0));
        assert!(ArgSpec::AtMost(1).accepts(1));
        assert!(!ArgSpec::AtMost(1).accepts(2));
        assert!(ArgSpec::Any.accepts(17));
    }

    #[test]
    fn test_registry_knows_global_commands() {
        let reg = CommandRegistry::new();
        for name in ["help", "clear", "pwd", "echo", "date", "whoami", "hint", "submit"] {
            assert!(reg.contains(name), "missing {}", name);
        }
        assert!(!reg.contains("sudo"));
    }

    #[test]
    fn test_registry_names_sorted() {
        let reg = CommandRegistry::new();
        let names = reg.names();
        let mut sorted = names.clone();
        sorted.sort_unstable();
        assert_eq!(names, sorted);
    }
}
