//! quicksnatch - a browser terminal for learning Unix basics
//!
//! Simulates an interactive shell inside a browser page to teach basic Unix
//! skills through a sequence of puzzle levels. Each level carries its own
//! virtual filesystem, a closed command vocabulary, and a target flag that
//! the player hunts down with `ls`, `cat`, `chmod` and friends, then turns
//! in with `submit flag{...}`.
//!
//! Layout:
//! - `vfs`: per-level virtual filesystem (tree, path resolution)
//! - `level`: level descriptors loaded from JSON, with a fallback
//! - `shell`: command registry, dispatcher, session state
//! - `flag`: flag submission state machine
//! - `terminal`: the engine that ties it together, renderer-agnostic
//! - `platform::web`: DOM rendering and fetch glue (wasm32 only)
//!
//! The core engine never touches the DOM; it is constructible and testable
//! with no rendering surface at all. Correctness of flags is decided by the
//! server, never locally.

#[cfg(target_arch = "wasm32")]
use wasm_bindgen::prelude::*;

pub mod flag;
pub mod level;
pub mod platform;
pub mod shell;
pub mod terminal;
pub mod vfs;

/// Initialize panic hook for better error messages in browser console
#[cfg(target_arch = "wasm32")]
fn init_panic_hook() {
    #[cfg(feature = "console_error_panic_hook")]
    console_error_panic_hook::set_once();
}

/// Mount the terminal onto the page. This is the WASM entry point.
#[cfg(target_arch = "wasm32")]
#[wasm_bindgen(start)]
pub fn main() {
    init_panic_hook();
    platform::web::boot();
}

/// Console logging helper
#[cfg(target_arch = "wasm32")]
#[wasm_bindgen]
extern "C" {
    #[wasm_bindgen(js_namespace = console)]
    pub fn log(s: &str);
}

/// Log to browser console (WASM)
#[cfg(target_arch = "wasm32")]
#[macro_export]
macro_rules! console_log {
    ($($t:tt)*) => {
        $crate::log(&format!($($t)*))
    };
}

/// Log to stderr (native)
#[cfg(not(target_arch = "wasm32"))]
#[macro_export]
macro_rules! console_log {
    ($($t:tt)*) => {
        eprintln!($($t)*)
    };
}
