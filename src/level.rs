//! Level descriptors
//!
//! Immutable per-level configuration, loaded once from JSON when a level
//! view is entered. A level brings its own filesystem overlay, the set of
//! commands it allows beyond the global ones, ordered hints, and optional
//! scripted command lines (exact line -> canned output) for puzzles the
//! filesystem alone cannot express (`zcat`, `ps aux`, `netstat`, ...).
//!
//! Loading is defensive: any failure (transport, status, parse) falls back
//! to a minimal descriptor instead of failing the terminal.

use serde::de::{MapAccess, Visitor};
use serde::{Deserialize, Deserializer};
use std::collections::{BTreeMap, BTreeSet};
use std::fmt;

/// Immutable configuration for one puzzle level.
#[derive(Debug, Clone, Deserialize)]
pub struct LevelDescriptor {
    pub level: u32,
    pub title: String,
    #[serde(default)]
    pub difficulty: String,
    #[serde(default)]
    pub description: String,
    /// Prompt template; `{cwd}` is replaced with the current directory.
    #[serde(default = "default_prompt")]
    pub prompt_template: String,
    /// Commands this level enables on top of the global set.
    #[serde(default)]
    pub allowed_commands: BTreeSet<String>,
    /// Ordered hints, cycled by the `hint` command.
    #[serde(default)]
    pub hints: Vec<String>,
    /// Flattened path -> content overlay, in document order. Order matters:
    /// it becomes the directory listing order.
    #[serde(default, deserialize_with = "ordered_entries")]
    pub files: Vec<(String, String)>,
    /// Path -> octal-style permission tag, for levels that model a
    /// permission puzzle.
    #[serde(default)]
    pub permissions: BTreeMap<String, String>,
    /// Exact command line -> canned output, checked before tokenizing.
    #[serde(default)]
    pub scripts: BTreeMap<String, String>,
    /// Where the session starts.
    #[serde(default = "default_start_path")]
    pub start_path: String,
}

fn default_prompt() -> String {
    "user@quicksnatch:{cwd}$ ".to_string()
}

fn default_start_path() -> String {
    "/home/user".to_string()
}

impl LevelDescriptor {
    /// Parse a descriptor from JSON.
    pub fn parse(json: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(json)
    }

    /// Minimal descriptor used when level data cannot be loaded: empty
    /// files, a placeholder hint, basic navigation commands only.
    pub fn fallback(level: u32) -> Self {
        Self {
            level,
            title: format!("Level {}", level),
            difficulty: String::new(),
            description: "Level data could not be loaded. Basic commands are available.".to_string(),
            prompt_template: default_prompt(),
            allowed_commands: ["ls", "cd", "cat"].iter().map(|s| s.to_string()).collect(),
            hints: vec!["No hints available for this level.".to_string()],
            files: Vec::new(),
            permissions: BTreeMap::new(),
            scripts: BTreeMap::new(),
            start_path: default_start_path(),
        }
    }

    /// Render the prompt for a working directory.
    pub fn prompt(&self, cwd: &str) -> String {
        self.prompt_template.replace("{cwd}", cwd)
    }
}

/// Deserialize a JSON object into a vec of pairs, preserving document
/// order (a plain map type would re-sort the overlay).
fn ordered_entries<'de, D>(deserializer: D) -> Result<Vec<(String, String)>, D::Error>
where
    D: Deserializer<'de>,
{
    struct Entries;

    impl<'de> Visitor<'de> for Entries {
        type Value = Vec<(String, String)>;

        fn expecting(&self, f: &mut fmt::Formatter) -> fmt::Result {
            f.write_str("a map of path to file content")
        }

        fn visit_map<A: MapAccess<'de>>(self, mut map: A) -> Result<Self::Value, A::Error> {
            let mut entries = Vec::new();
            while let Some((k, v)) = map.next_entry::<String, String>()? {
                entries.push((k, v));
            }
            Ok(entries)
        }
    }

    deserializer.deserialize_map(Entries)
}
