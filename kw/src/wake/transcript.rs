//! The conversation a wake builds up, and where it is in the protocol

use std::fmt;

use crate::llm::{Message, TokenUsage};
use crate::prompts::PromptContext;

/// Position in the wake protocol
///
/// `Idle → WalkingFrames → DeliveringTask → CollectingReflection → Done`.
/// A failed call aborts the session instead of moving to another state.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WakeState {
    Idle,
    /// Index into the kenning's sorted frames
    WalkingFrames { frame: usize },
    DeliveringTask,
    CollectingReflection,
    Done,
}

impl fmt::Display for WakeState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            WakeState::Idle => write!(f, "idle"),
            WakeState::WalkingFrames { frame } => write!(f, "walking frames (at index {})", frame),
            WakeState::DeliveringTask => write!(f, "delivering the task"),
            WakeState::CollectingReflection => write!(f, "collecting the reflection"),
            WakeState::Done => write!(f, "done"),
        }
    }
}

/// Append-only list of turns, passed by value from phase to phase
#[derive(Debug, Clone)]
pub struct Transcript {
    turns: Vec<Message>,
    pub(super) state: WakeState,
    pub(super) usage: TokenUsage,
    pub(super) ken: String,
    pub(super) task: String,
    pub(super) frames_walked: usize,
}

impl Default for Transcript {
    fn default() -> Self {
        Self::new()
    }
}

impl Transcript {
    pub fn new() -> Self {
        Self {
            turns: Vec::new(),
            state: WakeState::Idle,
            usage: TokenUsage::default(),
            ken: String::new(),
            task: String::new(),
            frames_walked: 0,
        }
    }

    pub fn turns(&self) -> &[Message] {
        &self.turns
    }

    pub fn len(&self) -> usize {
        self.turns.len()
    }

    pub fn is_empty(&self) -> bool {
        self.turns.is_empty()
    }

    pub fn state(&self) -> WakeState {
        self.state
    }

    /// Token usage summed over every call so far
    pub fn usage(&self) -> &TokenUsage {
        &self.usage
    }

    pub(super) fn push(&mut self, message: Message) {
        self.turns.push(message);
    }

    pub(super) fn prompt_context(&self) -> PromptContext {
        PromptContext {
            ken: self.ken.clone(),
            task: self.task.clone(),
            frame_count: self.frames_walked,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_new_transcript() {
        let transcript = Transcript::new();
        assert!(transcript.is_empty());
        assert_eq!(transcript.state(), WakeState::Idle);
        assert_eq!(transcript.usage(), &TokenUsage::default());
    }

    #[test]
    fn test_push_appends_in_order() {
        let mut transcript = Transcript::new();
        transcript.push(Message::user("frame"));
        transcript.push(Message::assistant("first"));
        transcript.push(Message::user("task"));

        assert_eq!(transcript.len(), 3);
        assert_eq!(transcript.turns()[1], Message::assistant("first"));
        assert_eq!(transcript.turns()[2], Message::user("task"));
    }

    #[test]
    fn test_state_display() {
        assert_eq!(WakeState::WalkingFrames { frame: 2 }.to_string(), "walking frames (at index 2)");
        assert_eq!(WakeState::Done.to_string(), "done");
    }
}
