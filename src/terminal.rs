//! Terminal engine
//!
//! Ties the pieces together: output buffer, line editing, history and tab
//! completion keys, dispatch, and the flag submission round-trip. The
//! engine is renderer-agnostic - it never touches the DOM and is fully
//! constructible in native tests. A renderer consumes `lines()` and
//! `input_line()` and feeds `handle_key`.
//!
//! Execution is single-threaded and cooperative. The only suspension point
//! is flag verification: `submit` parks a `VerifyRequest` for the platform
//! to pick up (`take_verify_request`), and the platform later calls
//! `resolve_submission` with the server's verdict. One line of input is
//! processed at a time, strictly in submission order.

use crate::console_log;
use crate::flag::{FlagProtocol, SubmitAction, Verdict, VerifyRequest, VerifyResponse};
use crate::level::LevelDescriptor;
use crate::shell::{Dispatcher, Line, SessionState, SideEffect, StyleHint};
use crate::shell::session::Completion;
use crate::vfs::Vfs;
use std::collections::VecDeque;

/// Maximum lines kept in the output buffer. Oldest lines are discarded
/// first; long sessions must not grow without bound.
const MAX_LINES: usize = 1000;

pub struct Terminal {
    level: LevelDescriptor,
    fs: Vfs,
    session: SessionState,
    dispatcher: Dispatcher,
    flag: FlagProtocol,

    /// Rendered output (scrollback)
    lines: VecDeque<Line>,
    /// Line being edited
    input: String,
    /// Cursor position in `input` (byte offset, always on a char boundary)
    cursor: usize,
    /// Display string for the `date` command, set by the platform
    clock_text: String,

    /// Verification request waiting for the platform to send
    pending_request: Option<VerifyRequest>,
    /// Level to navigate to after an accepted flag
    pending_navigation: Option<u32>,
}

impl Terminal {
    pub fn new(level: LevelDescriptor) -> Self {
        let fs = Vfs::build_from_level(&level);
        let session = SessionState::new(level.start_path.clone());
        let flag = FlagProtocol::new(level.level);
        let mut term = Self {
            fs,
            session,
            dispatcher: Dispatcher::new(),
            flag,
            lines: VecDeque::with_capacity(MAX_LINES),
            input: String::new(),
            cursor: 0,
            clock_text: "Thu Jan 15 12:00:00 2026".to_string(),
            pending_request: None,
            pending_navigation: None,
            level,
        };
        term.banner();
        console_log!("[term] level {} ready", term.level.level);
        term
    }

    fn banner(&mut self) {
        self.print(Line { text: "QuickSnatch Terminal".into(), style: StyleHint::Banner });
        self.print(Line {
            text: format!("Level {}: {}", self.level.level, self.level.title),
            style: StyleHint::Banner,
        });
        if !self.level.description.is_empty() {
            self.print(Line::plain(self.level.description.clone()));
        }
        self.print(Line::plain(""));
        self.print(Line::plain("Type 'help' for available commands."));
        self.print(Line::plain(""));
    }

    fn print(&mut self, line: Line) {
        self.lines.push_back(line);
        while self.lines.len() > MAX_LINES {
            self.lines.pop_front();
        }
    }

    /// Handle a key press. Returns true if the key was consumed.
    pub fn handle_key(&mut self, key: &str, code: &str, ctrl: bool) -> bool {
        if ctrl {
            match key {
                "c" => {
                    let echoed = format!("{}{}^C", self.prompt(), self.input);
                    self.print(Line { text: echoed, style: StyleHint::Input });
                    self.input.clear();
                    self.cursor = 0;
                    return true;
                }
                "l" => {
                    self.lines.clear();
                    return true;
                }
                _ => return false,
            }
        }

        match code {
            "Enter" | "NumpadEnter" => {
                self.submit_line();
                return true;
            }
            "Backspace" => {
                if let Some(prev) = self.prev_boundary() {
                    self.input.remove(prev);
                    self.cursor = prev;
                }
                return true;
            }
            "Delete" => {
                if self.cursor < self.input.len() {
                    self.input.remove(self.cursor);
                }
                return true;
            }
            "ArrowLeft" => {
                if let Some(prev) = self.prev_boundary() {
                    self.cursor = prev;
                }
                return true;
            }
            "ArrowRight" => {
                if let Some(ch) = self.input[self.cursor..].chars().next() {
                    self.cursor += ch.len_utf8();
                }
                return true;
            }
            "ArrowUp" => {
                if let Some(line) = self.session.history_prev(&self.input) {
                    self.input = line;
                    self.cursor = self.input.len();
                }
                return true;
            }
            "ArrowDown" => {
                if let Some(line) = self.session.history_next() {
                    self.input = line;
                    self.cursor = self.input.len();
                }
                return true;
            }
            "Home" => {
                self.cursor = 0;
                return true;
            }
            "End" => {
                self.cursor = self.input.len();
                return true;
            }
            "Tab" => {
                self.tab_complete();
                return true;
            }
            _ => {}
        }

        if key.chars().count() == 1 {
            if let Some(ch) = key.chars().next() {
                if !ch.is_control() {
                    self.input.insert(self.cursor, ch);
                    self.cursor += ch.len_utf8();
                    return true;
                }
            }
        }

        false
    }

    /// Byte offset of the char left of the cursor, or `None` at the
    /// start of the line. Keystrokes may insert multi-byte chars, so
    /// cursor movement steps over whole chars, never single bytes.
    fn prev_boundary(&self) -> Option<usize> {
        self.input[..self.cursor]
            .chars()
            .next_back()
            .map(|ch| self.cursor - ch.len_utf8())
    }

    /// Complete the command name under edit. Only the first token is
    /// completed; arguments are not.
    fn tab_complete(&mut self) {
        if self.input.is_empty() || self.input.contains(char::is_whitespace) {
            return;
        }
        let candidates = self.dispatcher.available(&self.level);
        match self.session.complete(&self.input, &candidates) {
            Completion::None => {}
            Completion::Single(name) => {
                self.input = name;
                self.cursor = self.input.len();
            }
            Completion::Many(names) => {
                self.print(Line::plain(names.join("  ")));
            }
        }
    }

    /// Execute the current input line.
    pub fn submit_line(&mut self) {
        let input = std::mem::take(&mut self.input);
        self.cursor = 0;

        let echoed = format!("{}{}", self.prompt(), input);
        self.print(Line { text: echoed, style: StyleHint::Input });

        if !input.trim().is_empty() {
            self.session.push_history(input.clone());
        }

        let outcome = self.dispatcher.dispatch(
            &input,
            &mut self.session,
            &mut self.fs,
            &self.level,
            &self.clock_text,
        );

        for effect in &outcome.effects {
            match effect {
                SideEffect::ClearScreen => self.lines.clear(),
                SideEffect::Submit(flag) => self.begin_submission(flag.clone()),
                // Session and filesystem effects were applied by the dispatcher
                _ => {}
            }
        }

        for line in outcome.lines {
            self.print(line);
        }
    }

    fn begin_submission(&mut self, flag: String) {
        match self.flag.submit(&flag) {
            SubmitAction::BadFormat => {
                self.print(Line::error("Invalid flag format. Flags look like flag{...}."));
            }
            SubmitAction::AlreadyPending => {
                self.print(Line::error(
                    "A submission is already being checked. Wait for the verdict.",
                ));
            }
            SubmitAction::Verify(req) => {
                console_log!("[flag] submitting for level {}", req.level);
                self.print(Line {
                    text: "Checking flag...".into(),
                    style: StyleHint::Muted,
                });
                self.pending_request = Some(req);
            }
        }
    }

    /// The verification request produced by the last `submit`, if any.
    /// The platform takes it, performs the round-trip, and reports back
    /// through `resolve_submission`.
    pub fn take_verify_request(&mut self) -> Option<VerifyRequest> {
        self.pending_request.take()
    }

    /// Feed the server's verdict (or the transport failure) back in.
    pub fn resolve_submission(&mut self, result: Result<VerifyResponse, String>) {
        match self.flag.resolve(result) {
            None => {}
            Some(Verdict::Accepted { message, next_level }) => {
                self.print(Line::success(message));
                self.print(Line {
                    text: format!("Advancing to level {}...", next_level),
                    style: StyleHint::Muted,
                });
                self.pending_navigation = Some(next_level);
            }
            Some(Verdict::WrongAnswer { message }) => {
                self.print(Line::error(message));
            }
            Some(Verdict::VerificationFailed { message }) => {
                console_log!("[flag] verification transport failure");
                self.print(Line::error(message));
            }
        }
    }

    /// Level to navigate to after an accepted flag. The platform applies
    /// the user-visible delay before acting on it.
    pub fn take_navigation(&mut self) -> Option<u32> {
        self.pending_navigation.take()
    }

    /// Is a flag verification in flight? Renderers use this to indicate
    /// the pending state and discourage re-submits.
    pub fn is_submission_pending(&self) -> bool {
        self.flag.is_pending()
    }

    pub fn prompt(&self) -> String {
        self.level.prompt(&self.session.current_path)
    }

    pub fn lines(&self) -> impl Iterator<Item = &Line> {
        self.lines.iter()
    }

    pub fn line_count(&self) -> usize {
        self.lines.len()
    }

    /// Current input line for rendering: (prompt, text, cursor)
    pub fn input_line(&self) -> (String, &str, usize) {
        (self.prompt(), &self.input, self.cursor)
    }

    pub fn set_clock_text(&mut self, text: impl Into<String>) {
        self.clock_text = text.into();
    }

    pub fn session(&self) -> &SessionState {
        &self.session
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::BTreeMap;

    fn test_level() -> LevelDescriptor {
        let mut level = LevelDescriptor::fallback(1);
        level.title = "Hidden Files".into();
        level.description = "Something is hiding in your home directory.".into();
        level.files = vec![
            ("/home/user/readme.txt".into(), "Welcome!".into()),
            ("/home/user/.secret_file".into(), "flag{quick_basics}".into()),
        ];
        level.hints = vec!["Not every file shows up in a plain listing.".into()];
        level.permissions = BTreeMap::new();
        level
    }

    fn term() -> Terminal {
        Terminal::new(test_level())
    }

    fn type_line(term: &mut Terminal, line: &str) {
        for ch in line.chars() {
            term.handle_key(&ch.to_string(), "Key", false);
        }
        term.handle_key("Enter", "Enter", false);
    }

    fn all_text(term: &Terminal) -> String {
        term.lines().map(|l| l.text.as_str()).collect::<Vec<_>>().join("\n")
    }

    #[test]
    fn test_banner_on_start() {
        let term = term();
        let text = all_text(&term);
        assert!(text.contains("QuickSnatch Terminal"));
        assert!(text.contains("Level 1: Hidden Files"));
    }

    #[test]
    fn test_prompt_tracks_cwd() {
        let mut term = term();
        assert_eq!(term.prompt(), "user@quicksnatch:/home/user$ ");
        type_line(&mut term, "cd /etc");
        assert_eq!(term.prompt(), "user@quicksnatch:/etc$ ");
    }

    #[test]
    fn test_echoed_input_line() {
        let mut term = term();
        type_line(&mut term, "pwd");
        let echoed: Vec<_> = term
            .lines()
            .filter(|l| l.style == StyleHint::Input)
            .map(|l| l.text.as_str())
            .collect();
        assert_eq!(echoed, vec!["user@quicksnatch:/home/user$ pwd"]);
        assert!(all_text(&term).contains("/home/user"));
    }

    #[test]
    fn test_hidden_file_discovery_flow() {
        let mut term = term();
        type_line(&mut term, "ls");
        assert!(!all_text(&term).contains(".secret_file"));
        type_line(&mut term, "ls -a");
        assert!(all_text(&term).contains(".secret_file"));
        type_line(&mut term, "cat .secret_file");
        assert!(all_text(&term).contains("flag{quick_basics}"));
    }

    #[test]
    fn test_clear_empties_buffer_but_keeps_history() {
        let mut term = term();
        type_line(&mut term, "pwd");
        type_line(&mut term, "clear");
        assert_eq!(term.line_count(), 0);
        assert_eq!(term.session().history(), ["pwd", "clear"]);
    }

    #[test]
    fn test_ctrl_l_clears() {
        let mut term = term();
        term.handle_key("l", "KeyL", true);
        assert_eq!(term.line_count(), 0);
    }

    #[test]
    fn test_ctrl_c_cancels_input() {
        let mut term = term();
        for ch in "half a comm".chars() {
            term.handle_key(&ch.to_string(), "Key", false);
        }
        term.handle_key("c", "KeyC", true);
        let (_, input, cursor) = term.input_line();
        assert!(input.is_empty());
        assert_eq!(cursor, 0);
        assert!(all_text(&term).contains("half a comm^C"));
    }

    #[test]
    fn test_editing_keys() {
        let mut term = term();
        for ch in "cta".chars() {
            term.handle_key(&ch.to_string(), "Key", false);
        }
        // Fix the typo: cta -> cat
        term.handle_key("ArrowLeft", "ArrowLeft", false);
        term.handle_key("Backspace", "Backspace", false);
        term.handle_key("End", "End", false);
        term.handle_key("t", "KeyT", false);
        let (_, input, _) = term.input_line();
        assert_eq!(input, "cat");
    }

    #[test]
    fn test_backspace_over_multibyte_char() {
        let mut term = term();
        for key in ["e", "é", "ß"] {
            term.handle_key(key, "Key", false);
        }
        term.handle_key("Backspace", "Backspace", false);
        assert_eq!(term.input_line().1, "eé");
        term.handle_key("Backspace", "Backspace", false);
        assert_eq!(term.input_line().1, "e");
    }

    #[test]
    fn test_arrow_keys_step_whole_chars() {
        let mut term = term();
        for key in ["c", "é", "t"] {
            term.handle_key(key, "Key", false);
        }
        // Left over 't' and 'é', insert, then the cursor must still sit
        // on a char boundary
        term.handle_key("ArrowLeft", "ArrowLeft", false);
        term.handle_key("ArrowLeft", "ArrowLeft", false);
        term.handle_key("a", "KeyA", false);
        assert_eq!(term.input_line().1, "caét");
        term.handle_key("ArrowRight", "ArrowRight", false);
        term.handle_key("x", "KeyX", false);
        assert_eq!(term.input_line().1, "caéxt");
    }

    #[test]
    fn test_delete_at_multibyte_char() {
        let mut term = term();
        for key in ["é", "x"] {
            term.handle_key(key, "Key", false);
        }
        term.handle_key("Home", "Home", false);
        term.handle_key("Delete", "Delete", false);
        assert_eq!(term.input_line().1, "x");
    }

    #[test]
    fn test_history_round_trip_restores_draft() {
        let mut term = term();
        type_line(&mut term, "echo a");
        type_line(&mut term, "echo b");
        type_line(&mut term, "echo c");
        for ch in "draft".chars() {
            term.handle_key(&ch.to_string(), "Key", false);
        }
        for _ in 0..3 {
            term.handle_key("ArrowUp", "ArrowUp", false);
        }
        assert_eq!(term.input_line().1, "echo a");
        for _ in 0..3 {
            term.handle_key("ArrowDown", "ArrowDown", false);
        }
        assert_eq!(term.input_line().1, "draft");
    }

    #[test]
    fn test_tab_completion_unique() {
        let mut term = term();
        for ch in "hel".chars() {
            term.handle_key(&ch.to_string(), "Key", false);
        }
        term.handle_key("Tab", "Tab", false);
        assert_eq!(term.input_line().1, "help");
    }

    #[test]
    fn test_tab_completion_ambiguous_lists_candidates() {
        let mut term = term();
        term.handle_key("h", "KeyH", false);
        let before = term.line_count();
        term.handle_key("Tab", "Tab", false);
        // Input untouched, candidates printed
        assert_eq!(term.input_line().1, "h");
        assert!(term.line_count() > before);
        assert!(all_text(&term).contains("help  hint"));
    }

    #[test]
    fn test_tab_completion_no_match_is_noop() {
        let mut term = term();
        for ch in "xyz".chars() {
            term.handle_key(&ch.to_string(), "Key", false);
        }
        let before = term.line_count();
        term.handle_key("Tab", "Tab", false);
        assert_eq!(term.input_line().1, "xyz");
        assert_eq!(term.line_count(), before);
    }

    #[test]
    fn test_bad_format_flag_never_produces_request() {
        let mut term = term();
        type_line(&mut term, "submit not-a-flag");
        assert!(term.take_verify_request().is_none());
        assert!(all_text(&term).contains("Invalid flag format"));
        assert!(!term.is_submission_pending());
    }

    #[test]
    fn test_well_formed_flag_produces_one_request() {
        let mut term = term();
        type_line(&mut term, "submit flag{quick_basics}");
        let req = term.take_verify_request();
        assert_eq!(
            req,
            Some(VerifyRequest { level: 1, flag: "flag{quick_basics}".into() })
        );
        assert!(term.take_verify_request().is_none());
        assert!(term.is_submission_pending());
    }

    #[test]
    fn test_submit_while_pending_is_refused() {
        let mut term = term();
        type_line(&mut term, "submit flag{first}");
        let _ = term.take_verify_request();
        type_line(&mut term, "submit flag{second}");
        assert!(term.take_verify_request().is_none());
        assert!(all_text(&term).contains("already being checked"));
    }

    #[test]
    fn test_other_commands_run_while_pending() {
        let mut term = term();
        type_line(&mut term, "submit flag{first}");
        let _ = term.take_verify_request();
        type_line(&mut term, "pwd");
        assert!(all_text(&term).contains("/home/user"));
    }

    #[test]
    fn test_accepted_flag_schedules_navigation() {
        let mut term = term();
        type_line(&mut term, "submit flag{quick_basics}");
        let _ = term.take_verify_request();
        term.resolve_submission(Ok(VerifyResponse {
            success: true,
            message: "Correct!".into(),
            next_level: Some(2),
        }));
        assert!(all_text(&term).contains("Correct!"));
        assert_eq!(term.take_navigation(), Some(2));
        assert!(!term.is_submission_pending());
    }

    #[test]
    fn test_wrong_answer_stays_on_level() {
        let mut term = term();
        type_line(&mut term, "submit flag{nope}");
        let _ = term.take_verify_request();
        term.resolve_submission(Ok(VerifyResponse {
            success: false,
            message: String::new(),
            next_level: None,
        }));
        assert!(all_text(&term).contains("Incorrect flag"));
        assert_eq!(term.take_navigation(), None);
    }

    #[test]
    fn test_transport_failure_distinct_from_wrong_answer() {
        let mut term = term();
        type_line(&mut term, "submit flag{x}");
        let _ = term.take_verify_request();
        term.resolve_submission(Err("timeout".into()));
        let text = all_text(&term);
        assert!(text.contains("not graded"));
        assert!(!text.contains("Incorrect flag"));
        assert_eq!(term.take_navigation(), None);
    }

    #[test]
    fn test_output_buffer_trimming() {
        let mut term = term();
        for i in 0..(MAX_LINES + 50) {
            type_line(&mut term, &format!("echo line{}", i));
        }
        assert_eq!(term.line_count(), MAX_LINES);
    }

    #[test]
    fn test_date_uses_clock_text() {
        let mut term = term();
        term.set_clock_text("Mon Aug 24 10:00:00 2026");
        type_line(&mut term, "date");
        assert!(all_text(&term).contains("Mon Aug 24 10:00:00 2026"));
    }
}
