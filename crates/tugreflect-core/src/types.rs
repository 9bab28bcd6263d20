//! Common types shared between the engine, error and output modules.
//!
//! This module contains types that are used by both the error and output modules,
//! avoiding circular dependencies.

use std::fmt;

use serde::{Deserialize, Serialize};

// ============================================================================
// FileId Type
// ============================================================================

/// Stable identity of a source file within a module.
///
/// The value is the module-relative path (e.g. `"src/app/Main.kt"`). It is used
/// as a grouping key; its only ordering role is the lexicographic file visitation
/// order that makes class/object match results reproducible.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub struct FileId(String);

impl FileId {
    /// Create a file ID from a module-relative path.
    ///
    /// Backslashes are normalized to `/` so the same file gets the same ID on
    /// every platform.
    pub fn new(path: impl Into<String>) -> Self {
        let path: String = path.into();
        FileId(path.replace('\\', "/"))
    }

    /// The module-relative path.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for FileId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for FileId {
    fn from(path: &str) -> Self {
        FileId::new(path)
    }
}

impl From<String> for FileId {
    fn from(path: String) -> Self {
        FileId::new(path)
    }
}

impl From<FileId> for String {
    fn from(id: FileId) -> Self {
        id.0
    }
}

// ============================================================================
// Location Type
// ============================================================================

/// Location in a source file.
///
/// - `file`: Module-relative path (required)
/// - `line`: 1-indexed line number (required)
/// - `col`: 1-indexed column, UTF-8 bytes (required)
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq, Hash)]
pub struct Location {
    /// File path (module-relative).
    pub file: String,
    /// Line number (1-indexed).
    pub line: u32,
    /// Column number (1-indexed, UTF-8 bytes).
    pub col: u32,
}

impl Location {
    /// Create a new location.
    pub fn new(file: impl Into<String>, line: u32, col: u32) -> Self {
        Location {
            file: file.into(),
            line,
            col,
        }
    }

    /// Comparison key for deterministic sorting: (file, line, col).
    fn sort_key(&self) -> (&str, u32, u32) {
        (&self.file, self.line, self.col)
    }
}

impl fmt::Display for Location {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}:{}", self.file, self.line, self.col)
    }
}

impl PartialOrd for Location {
    fn partial_cmp(&self, other: &Self) -> Option<std::cmp::Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for Location {
    fn cmp(&self, other: &Self) -> std::cmp::Ordering {
        self.sort_key().cmp(&other.sort_key())
    }
}

// ============================================================================
// Tests
// ============================================================================
