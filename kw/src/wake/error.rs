//! Wake error types

use std::fmt;

use thiserror::Error;

use super::WakeState;
use crate::llm::LlmError;

/// The call a wake was making when it stopped
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Phase {
    Frame { number: u64, title: String },
    Task,
    Reflection,
}

impl fmt::Display for Phase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Phase::Frame { number, title } => write!(f, "frame {} ({})", number, title),
            Phase::Task => write!(f, "task"),
            Phase::Reflection => write!(f, "reflection"),
        }
    }
}

/// Errors that abort a wake
#[derive(Debug, Error)]
pub enum WakeError {
    #[error("Completion failed during {phase}: {source}")]
    Completion {
        phase: Phase,
        #[source]
        source: LlmError,
    },

    #[error("Completion for {phase} returned no text")]
    EmptyResponse { phase: Phase },

    #[error("Cannot {operation} while the session is {state}")]
    OutOfOrder { operation: &'static str, state: WakeState },

    #[error("Failed to render {template} prompt: {message}")]
    Template { template: &'static str, message: String },
}

impl WakeError {
    /// The phase whose call failed, if a call failed
    pub fn phase(&self) -> Option<&Phase> {
        match self {
            WakeError::Completion { phase, .. } | WakeError::EmptyResponse { phase } => Some(phase),
            _ => None,
        }
    }
}
