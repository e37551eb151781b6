//! Platform integration
//!
//! The engine is platform-free; everything that touches the browser
//! (DOM rendering, fetch, navigation) lives here.

#[cfg(target_arch = "wasm32")]
pub mod web;
