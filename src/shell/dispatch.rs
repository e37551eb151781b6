//! Command dispatcher
//!
//! Takes one raw input line and turns it into an `Outcome`:
//! 1. Scripted lines (exact match against the level's script table) win
//!    outright, so multi-word puzzle commands work verbatim.
//! 2. Otherwise the line is split on whitespace; the first token is the
//!    command name, the rest are positional arguments. No quoting or
//!    escaping - a documented limitation of the simulation.
//! 3. The name is gated against the level's allowed set plus the global
//!    set; anything else is a uniform "command not found".
//! 4. Session and filesystem side effects are applied here, strictly after
//!    the handler has returned - a failed handler mutates nothing.

use crate::level::LevelDescriptor;
use crate::shell::command::{CommandRegistry, Context, Outcome, SideEffect};
use crate::shell::session::SessionState;
use crate::vfs::Vfs;

/// Commands available in every level regardless of its allowed set.
pub const GLOBAL_COMMANDS: &[&str] =
    &["help", "clear", "pwd", "echo", "date", "whoami", "hint", "submit"];

pub struct Dispatcher {
    registry: CommandRegistry,
}

impl Dispatcher {
    pub fn new() -> Self {
        Self { registry: CommandRegistry::new() }
    }

    /// Command names the player can run in this level, sorted. Used for
    /// `help` and tab completion.
    pub fn available(&self, level: &LevelDescriptor) -> Vec<String> {
        let mut names: Vec<String> = self
            .registry
            .names()
            .into_iter()
            .filter(|n| GLOBAL_COMMANDS.contains(n) || level.allowed_commands.contains(*n))
            .map(|n| n.to_string())
            .collect();
        names.sort_unstable();
        names
    }

    /// Execute one raw input line.
    pub fn dispatch(
        &self,
        line: &str,
        session: &mut SessionState,
        fs: &mut Vfs,
        level: &LevelDescriptor,
        clock: &str,
    ) -> Outcome {
        let line = line.trim();
        if line.is_empty() {
            return Outcome::empty();
        }

        if let Some(output) = level.scripts.get(line) {
            return Outcome::text(output);
        }

        let mut tokens = line.split_whitespace();
        let name = match tokens.next() {
            Some(n) => n,
            None => return Outcome::empty(),
        };
        let args: Vec<String> = tokens.map(|t| t.to_string()).collect();

        let allowed =
            GLOBAL_COMMANDS.contains(&name) || level.allowed_commands.contains(name);
        let cmd = match self.registry.get(name) {
            Some(c) if allowed => c,
            _ => {
                return Outcome::error(format!(
                    "Command not found: {}. Type 'help' for available commands.",
                    name
                ))
            }
        };

        if !cmd.arg_spec().accepts(args.len()) {
            return Outcome::error(cmd.usage());
        }

        let available = self.available(level);
        let outcome = cmd.execute(&Context {
            args: &args,
            session,
            fs,
            level,
            clock,
            available: &available,
            registry: &self.registry,
        });

        self.apply_state_effects(&outcome, session, fs, level);
        outcome
    }

    /// Apply the session/filesystem effects of a successful handler. The
    /// remaining effects (screen clear, flag submission) belong to the
    /// terminal layer.
    fn apply_state_effects(
        &self,
        outcome: &Outcome,
        session: &mut SessionState,
        fs: &mut Vfs,
        level: &LevelDescriptor,
    ) {
        for effect in &outcome.effects {
            match effect {
                SideEffect::CwdChange(cwd) => session.current_path = cwd.clone(),
                SideEffect::PermissionChange { path, mode } => {
                    // The handler validated existence; a race is impossible
                    // in a single-threaded session
                    let _ = fs.set_permission(path, mode);
                }
                SideEffect::AdvanceHint => session.advance_hint(level.hints.len()),
                SideEffect::ClearScreen | SideEffect::Submit(_) => {}
            }
        }
    }
}

impl Default for Dispatcher {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::shell::command::StyleHint;

    struct Env {
        dispatcher: Dispatcher,
        level: LevelDescriptor,
        session: SessionState,
        fs: Vfs,
    }

    impl Env {
        fn new() -> Self {
            let mut level = LevelDescriptor::fallback(2);
            level.allowed_commands.insert("chmod".into());
            level.allowed_commands.insert("find".into());
            level.files = vec![("/home/user/secret.txt".into(), "flag{chmod_master}".into())];
            level.permissions.insert("/home/user/secret.txt".into(), "000".into());
            level
                .scripts
                .insert("zcat logs/server.log.gz".into(), "flag{grep_master_123}".into());
            let fs = Vfs::build_from_level(&level);
            let session = SessionState::new(level.start_path.clone());
            Self { dispatcher: Dispatcher::new(), level, session, fs }
        }

        fn run(&mut self, line: &str) -> Outcome {
            self.dispatcher
                .dispatch(line, &mut self.session, &mut self.fs, &self.level, "clock")
        }
    }

    #[test]
    fn test_empty_line_is_noop() {
        let mut env = Env::new();
        let out = env.run("   ");
        assert!(out.lines.is_empty());
        assert!(out.effects.is_empty());
    }

    #[test]
    fn test_unknown_command() {
        let mut env = Env::new();
        let out = env.run("sudo rm -rf /");
        assert_eq!(out.lines[0].style, StyleHint::Error);
        assert!(out.lines[0].text.contains("Command not found: sudo"));
    }

    #[test]
    fn test_registered_but_not_allowed_is_not_found() {
        let mut env = Env::new();
        env.level.allowed_commands.remove("chmod");
        let out = env.run("chmod 644 secret.txt");
        assert!(out.lines[0].text.contains("Command not found: chmod"));
    }

    #[test]
    fn test_global_commands_always_available() {
        let mut env = Env::new();
        env.level.allowed_commands.clear();
        let out = env.run("pwd");
        assert_eq!(out.lines[0].text, "/home/user");
    }

    #[test]
    fn test_scripted_line_wins() {
        let mut env = Env::new();
        let out = env.run("zcat logs/server.log.gz");
        assert_eq!(out.lines[0].text, "flag{grep_master_123}");
    }

    #[test]
    fn test_arg_spec_violation_shows_usage() {
        let mut env = Env::new();
        let out = env.run("submit");
        assert!(out.lines[0].text.contains("Usage: submit"));
    }

    #[test]
    fn test_cd_updates_session_after_success() {
        let mut env = Env::new();
        env.run("cd /var/log");
        assert_eq!(env.session.current_path, "/var/log");
    }

    #[test]
    fn test_failed_cd_leaves_session_untouched() {
        let mut env = Env::new();
        env.run("cd /missing");
        assert_eq!(env.session.current_path, "/home/user");
    }

    #[test]
    fn test_chmod_then_cat_permission_flow() {
        let mut env = Env::new();
        let out = env.run("cat secret.txt");
        assert!(out.lines[0].text.contains("Permission denied"));

        env.run("chmod 644 secret.txt");
        let out = env.run("cat secret.txt");
        assert_eq!(out.lines[0].text, "flag{chmod_master}");
    }

    #[test]
    fn test_available_is_union_of_global_and_allowed() {
        let env = Env::new();
        let available = env.dispatcher.available(&env.level);
        for name in GLOBAL_COMMANDS {
            assert!(available.iter().any(|a| a == name), "missing {}", name);
        }
        assert!(available.iter().any(|a| a == "chmod"));
        // `find` is in the allowed set but no registry entry backs it
        assert!(!available.iter().any(|a| a == "find"));
    }

    #[test]
    fn test_extra_whitespace_tokenization() {
        let mut env = Env::new();
        let out = env.run("  echo   hello    world  ");
        assert_eq!(out.lines[0].text, "hello world");
    }
}
