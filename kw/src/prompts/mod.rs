//! Prompt Template System
//!
//! Renders the synthetic turns a wake appends after the frames: the task
//! turn and the reflection request.
//!
//! Template loading chain:
//! 1. `{prompts-dir}/{name}.pmt` (user override, default `.ken/prompts/`)
//! 2. Embedded fallback in code
//!
//! Templates use Handlebars syntax for variable substitution.

pub mod embedded;
mod loader;

pub use loader::{PromptContext, PromptLoader};
