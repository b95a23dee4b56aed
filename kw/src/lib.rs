//! Kenwake - walk an agent through a kenning, then put it to work
//!
//! A kenning is a markdown document split into numbered frames. Waking an
//! agent replays those frames as conversation turns so the model builds up
//! an understanding step by step, then delivers a task on top of that
//! conversation and asks the agent to reflect on how well the frames
//! prepared it. The reflection is saved for whoever maintains the kenning.
//!
//! # Modules
//!
//! - [`kenning`] - Kenning parsing and frame segmentation
//! - [`wake`] - The wake session: frames, task, reflection
//! - [`llm`] - LLM client trait and Anthropic implementation
//! - [`prompts`] - Task and reflection turn templates
//! - [`reflection`] - Reflection persistence
//! - [`config`] - Configuration types and loading
//! - [`cli`] - Command-line interface

pub mod cli;
pub mod config;
pub mod kenning;
pub mod llm;
pub mod prompts;
pub mod reflection;
pub mod wake;

pub use config::Config;
pub use kenning::{Frame, Kenning};
pub use llm::{LlmClient, LlmError};
pub use reflection::ReflectionStore;
pub use wake::{Transcript, WakeError, WakeOutcome, WakeSession};
