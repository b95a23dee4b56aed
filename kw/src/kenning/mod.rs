//! Kenning documents
//!
//! A kenning is the markdown preparation document for a ken:
//!
//! ```text
//! # Kenning: core/kenning-parser
//!
//! ## Frame 1: Orientation
//! ...prompt body...
//!
//! ## Frame 2: The format
//! ...prompt body...
//!
//! ## Task
//! ## Reflection
//! ## Meta
//! ```
//!
//! Only frames are extracted. `## Task`, `## Reflection` and `## Meta` end the
//! preceding frame's body and are otherwise ignored. Parsing is lenient: a
//! malformed document yields whatever frames can be found, possibly none.

use std::fmt::Write as _;
use std::path::Path;

use eyre::{Context, Result};
use serde::{Deserialize, Serialize};
use tracing::info;

mod parser;

/// Identifier used when a kenning has no `# Kenning:` header
pub const UNKNOWN_IDENTIFIER: &str = "unknown";

/// One preparation step, sent to the agent as a single user turn
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Frame {
    /// Declared ordinal; need not start at 1 or be contiguous
    pub number: u64,
    pub title: String,
    /// Body text with separators and outer whitespace removed
    pub prompt: String,
}

/// A parsed kenning
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Kenning {
    pub identifier: String,
    /// Sorted by ordinal; duplicates keep document order
    pub frames: Vec<Frame>,
}

impl Kenning {
    /// Parse kenning markdown. Never fails.
    pub fn parse(text: &str) -> Self {
        parser::parse(text)
    }

    /// Read and parse a kenning file
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let text = std::fs::read_to_string(path).context(format!("Failed to read kenning: {}", path.display()))?;
        let kenning = Self::parse(&text);
        info!(path = %path.display(), identifier = %kenning.identifier, frames = kenning.frames.len(), "Loaded kenning");
        Ok(kenning)
    }

    pub fn is_empty(&self) -> bool {
        self.frames.is_empty()
    }

    /// Render the canonical markdown form; parsing it gives back `self`
    pub fn to_markdown(&self) -> String {
        let mut out = format!("# Kenning: {}\n", self.identifier);
        for frame in &self.frames {
            let _ = write!(out, "\n## Frame {}: {}\n\n{}\n", frame.number, frame.title, frame.prompt);
        }
        out
    }
}
