//! Shell - the command layer of the terminal
//!
//! - Command capability interface and registry
//! - Built-in command implementations
//! - Dispatcher (tokenize, gate against the level's vocabulary, execute)
//! - Session state (cwd, history, tab completion)
//!
//! Commands never mutate session or filesystem state directly: they return
//! an `Outcome` whose side effects the dispatcher applies only after the
//! handler has succeeded.

pub mod command;
pub mod dispatch;
pub mod programs;
pub mod session;

pub use command::{ArgSpec, Command, CommandRegistry, Context, Line, Outcome, SideEffect, StyleHint};
pub use dispatch::{Dispatcher, GLOBAL_COMMANDS};
pub use session::{Completion, SessionState};
