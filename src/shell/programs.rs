//! Built-in commands
//!
//! One type per command, registered into the `CommandRegistry`. The global
//! set (`help`, `clear`, `pwd`, `echo`, `date`, `whoami`, `hint`, `submit`)
//! is available in every level; the rest (`ls`, `cd`, `cat`, `chmod`) only
//! where the level's `allowed_commands` names them.
//!
//! Argument splitting is plain whitespace; there is no quoting or escaping.

use crate::shell::command::{ArgSpec, Command, Context, Line, Outcome, SideEffect, StyleHint};
use crate::vfs::resolve_path;

/// All built-in commands, for registry construction.
pub fn all() -> Vec<Box<dyn Command>> {
    vec![
        Box::new(Help),
        Box::new(Clear),
        Box::new(Pwd),
        Box::new(Echo),
        Box::new(Date),
        Box::new(Whoami),
        Box::new(Hint),
        Box::new(Submit),
        Box::new(Ls),
        Box::new(Cd),
        Box::new(Cat),
        Box::new(Chmod),
    ]
}

// ============ Global commands ============

pub struct Help;

impl Command for Help {
    fn name(&self) -> &'static str {
        "help"
    }
    fn summary(&self) -> &'static str {
        "Show available commands"
    }
    fn usage(&self) -> &'static str {
        "Usage: help [COMMAND]"
    }
    fn arg_spec(&self) -> ArgSpec {
        ArgSpec::AtMost(1)
    }

    fn execute(&self, ctx: &Context) -> Outcome {
        if let Some(name) = ctx.args.first() {
            let visible = ctx.available.iter().any(|c| c == name);
            return match ctx.registry.get(name) {
                Some(cmd) if visible => {
                    let mut out = Outcome::text(cmd.usage());
                    out.lines.insert(0, Line::plain(cmd.summary()));
                    out
                }
                _ => Outcome::error(format!("help: no help for '{}'", name)),
            };
        }

        let mut out = Outcome::default();
        out.lines.push(Line { text: "Available commands:".into(), style: StyleHint::Banner });
        for name in ctx.available {
            if let Some(cmd) = ctx.registry.get(name) {
                out.lines.push(Line::plain(format!("  {:<8} - {}", name, cmd.summary())));
            }
        }
        out.lines.push(Line::plain(""));
        out.lines.push(Line::plain("Type 'help COMMAND' for details, 'hint' if you are stuck."));
        out
    }
}

pub struct Clear;

impl Command for Clear {
    fn name(&self) -> &'static str {
        "clear"
    }
    fn summary(&self) -> &'static str {
        "Clear the terminal screen"
    }
    fn usage(&self) -> &'static str {
        "Usage: clear"
    }
    fn arg_spec(&self) -> ArgSpec {
        ArgSpec::None
    }

    fn execute(&self, _ctx: &Context) -> Outcome {
        Outcome::empty().with_effect(SideEffect::ClearScreen)
    }
}

pub struct Pwd;

impl Command for Pwd {
    fn name(&self) -> &'static str {
        "pwd"
    }
    fn summary(&self) -> &'static str {
        "Print working directory"
    }
    fn usage(&self) -> &'static str {
        "Usage: pwd"
    }
    fn arg_spec(&self) -> ArgSpec {
        ArgSpec::None
    }

    fn execute(&self, ctx: &Context) -> Outcome {
        Outcome::text(&ctx.session.current_path)
    }
}

pub struct Echo;

impl Command for Echo {
    fn name(&self) -> &'static str {
        "echo"
    }
    fn summary(&self) -> &'static str {
        "Print a message"
    }
    fn usage(&self) -> &'static str {
        "Usage: echo [TEXT...]"
    }

    fn execute(&self, ctx: &Context) -> Outcome {
        Outcome::text(ctx.args.join(" "))
    }
}

pub struct Date;

impl Command for Date {
    fn name(&self) -> &'static str {
        "date"
    }
    fn summary(&self) -> &'static str {
        "Show current date/time"
    }
    fn usage(&self) -> &'static str {
        "Usage: date"
    }
    fn arg_spec(&self) -> ArgSpec {
        ArgSpec::None
    }

    fn execute(&self, ctx: &Context) -> Outcome {
        Outcome::text(ctx.clock)
    }
}

pub struct Whoami;

impl Command for Whoami {
    fn name(&self) -> &'static str {
        "whoami"
    }
    fn summary(&self) -> &'static str {
        "Show current user"
    }
    fn usage(&self) -> &'static str {
        "Usage: whoami"
    }
    fn arg_spec(&self) -> ArgSpec {
        ArgSpec::None
    }

    fn execute(&self, _ctx: &Context) -> Outcome {
        Outcome::text("user")
    }
}

pub struct Hint;

impl Command for Hint {
    fn name(&self) -> &'static str {
        "hint"
    }
    fn summary(&self) -> &'static str {
        "Show a hint for this level"
    }
    fn usage(&self) -> &'static str {
        "Usage: hint"
    }
    fn arg_spec(&self) -> ArgSpec {
        ArgSpec::None
    }

    fn execute(&self, ctx: &Context) -> Outcome {
        let hints = &ctx.level.hints;
        if hints.is_empty() {
            return Outcome::text("No hints available for this level.");
        }
        let idx = ctx.session.hint_cursor() % hints.len();
        Outcome::text(format!("Hint {}/{}: {}", idx + 1, hints.len(), hints[idx]))
            .with_effect(SideEffect::AdvanceHint)
    }
}

pub struct Submit;

impl Command for Submit {
    fn name(&self) -> &'static str {
        "submit"
    }
    fn summary(&self) -> &'static str {
        "Submit a flag (flag{...})"
    }
    fn usage(&self) -> &'static str {
        "Usage: submit flag{...}"
    }
    fn arg_spec(&self) -> ArgSpec {
        ArgSpec::Exactly(1)
    }

    fn execute(&self, ctx: &Context) -> Outcome {
        // Validation and verification live in the flag protocol
        Outcome::empty().with_effect(SideEffect::Submit(ctx.args[0].clone()))
    }
}

// ============ Level commands ============

pub struct Ls;

impl Command for Ls {
    fn name(&self) -> &'static str {
        "ls"
    }
    fn summary(&self) -> &'static str {
        "List directory contents"
    }
    fn usage(&self) -> &'static str {
        "Usage: ls [-a] [-l] [PATH]\n  -a    show hidden files\n  -l    long listing format"
    }

    fn execute(&self, ctx: &Context) -> Outcome {
        let mut all = false;
        let mut long = false;
        let mut target: Option<&str> = None;

        for arg in ctx.args {
            if let Some(flags) = arg.strip_prefix('-') {
                for c in flags.chars() {
                    match c {
                        'a' => all = true,
                        'l' => long = true,
                        other => {
                            return Outcome::error(format!("ls: invalid option -- '{}'", other))
                        }
                    }
                }
            } else {
                target = Some(arg);
            }
        }

        let path = resolve_path(&ctx.session.current_path, target.unwrap_or("."));
        let entries = match ctx.fs.list(&path) {
            Ok(e) => e,
            Err(e) => return Outcome::error(format!("ls: {}", e)),
        };

        let visible: Vec<_> = entries
            .iter()
            .filter(|e| all || !e.name.starts_with('.'))
            .collect();

        if long {
            let mut out = Outcome::default();
            out.lines.push(Line::plain(format!("total {}", visible.len())));
            if all {
                out.lines.push(Line::plain(long_line("drwxr-xr-x", 4096, ".")));
                out.lines.push(Line::plain(long_line("drwxr-xr-x", 4096, "..")));
            }
            for e in &visible {
                let mode = if e.is_dir {
                    "drwxr-xr-x".to_string()
                } else {
                    render_mode(e.perms.as_deref().unwrap_or("644"))
                };
                out.lines.push(Line::plain(long_line(&mode, e.size, &e.name)));
            }
            return out;
        }

        let mut names: Vec<&str> = Vec::new();
        if all {
            names.push(".");
            names.push("..");
        }
        names.extend(visible.iter().map(|e| e.name.as_str()));
        if names.is_empty() {
            return Outcome::empty();
        }
        Outcome::text(names.join("  "))
    }
}

fn long_line(mode: &str, size: usize, name: &str) -> String {
    format!("{}  1 user user {:>5} Jan 15 12:00 {}", mode, size, name)
}

/// Render an octal-style permission tag as an `ls -l` mode column.
/// Malformed tags fall back to the default file mode.
fn render_mode(tag: &str) -> String {
    let digits: Vec<u32> = tag.chars().filter_map(|c| c.to_digit(8)).collect();
    if digits.len() != 3 || tag.len() != 3 {
        return "-rw-r--r--".to_string();
    }
    let mut mode = String::from("-");
    for d in digits {
        mode.push(if d & 4 != 0 { 'r' } else { '-' });
        mode.push(if d & 2 != 0 { 'w' } else { '-' });
        mode.push(if d & 1 != 0 { 'x' } else { '-' });
    }
    mode
}

pub struct Cd;

impl Command for Cd {
    fn name(&self) -> &'static str {
        "cd"
    }
    fn summary(&self) -> &'static str {
        "Change directory"
    }
    fn usage(&self) -> &'static str {
        "Usage: cd [PATH]"
    }
    fn arg_spec(&self) -> ArgSpec {
        ArgSpec::AtMost(1)
    }

    fn execute(&self, ctx: &Context) -> Outcome {
        let target = match ctx.args.first() {
            Some(arg) => resolve_path(&ctx.session.current_path, arg),
            None => ctx.level.start_path.clone(),
        };
        match ctx.fs.change_directory(&target) {
            Ok(cwd) => Outcome::empty().with_effect(SideEffect::CwdChange(cwd)),
            Err(e) => Outcome::error(format!("cd: {}", e)),
        }
    }
}

pub struct Cat;

impl Command for Cat {
    fn name(&self) -> &'static str {
        "cat"
    }
    fn summary(&self) -> &'static str {
        "Display file contents"
    }
    fn usage(&self) -> &'static str {
        "Usage: cat FILE"
    }
    fn arg_spec(&self) -> ArgSpec {
        ArgSpec::Exactly(1)
    }

    fn execute(&self, ctx: &Context) -> Outcome {
        let path = resolve_path(&ctx.session.current_path, &ctx.args[0]);
        if ctx.fs.permission(&path) == Some("000") {
            return Outcome::error(format!("cat: {}: Permission denied", ctx.args[0]));
        }
        match ctx.fs.read(&path) {
            Ok(content) => Outcome::text(content),
            Err(e) => Outcome::error(format!("cat: {}", e)),
        }
    }
}

pub struct Chmod;

impl Command for Chmod {
    fn name(&self) -> &'static str {
        "chmod"
    }
    fn summary(&self) -> &'static str {
        "Change file permissions"
    }
    fn usage(&self) -> &'static str {
        "Usage: chmod MODE FILE\nMODE is three octal digits, e.g. 644"
    }
    fn arg_spec(&self) -> ArgSpec {
        ArgSpec::Exactly(2)
    }

    fn execute(&self, ctx: &Context) -> Outcome {
        let mode = &ctx.args[0];
        if mode.len() != 3 || !mode.chars().all(|c| c.is_digit(8)) {
            return Outcome::error(format!("chmod: invalid mode: '{}'", mode));
        }
        let path = resolve_path(&ctx.session.current_path, &ctx.args[1]);
        if ctx.fs.lookup(&path).is_none() {
            return Outcome::error(format!("chmod: {}: No such file or directory", ctx.args[1]));
        }
        Outcome::text("File permissions updated").with_effect(SideEffect::PermissionChange {
            path,
            mode: mode.clone(),
        })
    }
}
