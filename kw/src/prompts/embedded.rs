//! Embedded prompts
//!
//! These are compiled into the binary from .pmt files at build time.

use tracing::debug;

/// Task delivery turn
pub const TASK: &str = include_str!("../../prompts/task.pmt");

/// Reflection request turn
pub const REFLECTION: &str = include_str!("../../prompts/reflection.pmt");

/// Get the embedded prompt by name
pub fn get_embedded(name: &str) -> Option<&'static str> {
    debug!(%name, "get_embedded: called");
    match name {
        "task" => Some(TASK),
        "reflection" => Some(REFLECTION),
        _ => {
            debug!("get_embedded: no match found");
            None
        }
    }
}
