//! Wake session: walk frames, deliver the task, collect the reflection

use std::io::{self, Write};
use std::sync::Arc;

use colored::Colorize;
use tokio::sync::mpsc;
use tracing::{debug, info, warn};

use super::{Phase, Transcript, WakeError, WakeState};
use crate::config::WakeConfig;
use crate::kenning::Kenning;
use crate::llm::{CompletionRequest, CompletionResponse, LlmClient, LlmError, Message, StopReason, StreamChunk};
use crate::prompts::PromptLoader;

const BANNER_WIDTH: usize = 60;

/// Max output tokens for each kind of call
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TurnLimits {
    pub frame: u32,
    pub task: u32,
    pub reflection: u32,
}

impl Default for TurnLimits {
    fn default() -> Self {
        Self {
            frame: 4096,
            task: 8192,
            reflection: 4096,
        }
    }
}

impl From<&WakeConfig> for TurnLimits {
    fn from(config: &WakeConfig) -> Self {
        Self {
            frame: config.frame_max_tokens,
            task: config.task_max_tokens,
            reflection: config.reflection_max_tokens,
        }
    }
}

/// Result of a completed wake
#[derive(Debug, Clone)]
pub struct WakeOutcome {
    /// Every turn, ending with the reflection
    pub transcript: Transcript,
    pub reflection: String,
}

/// Drives one agent through a kenning
///
/// Every call is awaited before the next request is built, and every request
/// carries the whole transcript.
pub struct WakeSession {
    llm: Arc<dyn LlmClient>,
    prompts: PromptLoader,
    limits: TurnLimits,
    system_prompt: String,
    narrate: bool,
}

impl WakeSession {
    /// A quiet session using embedded prompts and default limits
    pub fn new(llm: Arc<dyn LlmClient>) -> Self {
        Self {
            llm,
            prompts: PromptLoader::embedded_only(),
            limits: TurnLimits::default(),
            system_prompt: String::new(),
            narrate: false,
        }
    }

    pub fn from_config(llm: Arc<dyn LlmClient>, config: &WakeConfig) -> Self {
        Self {
            llm,
            prompts: PromptLoader::new(&config.prompts_dir),
            limits: TurnLimits::from(config),
            system_prompt: config.system_prompt.clone().unwrap_or_default(),
            narrate: false,
        }
    }

    /// Print phase banners and stream replies to stdout
    pub fn with_narration(mut self, narrate: bool) -> Self {
        self.narrate = narrate;
        self
    }

    pub fn with_limits(mut self, limits: TurnLimits) -> Self {
        self.limits = limits;
        self
    }

    pub fn with_system_prompt(mut self, system_prompt: impl Into<String>) -> Self {
        self.system_prompt = system_prompt.into();
        self
    }

    pub fn with_prompts(mut self, prompts: PromptLoader) -> Self {
        self.prompts = prompts;
        self
    }

    /// Walk the frames, deliver the task and collect the reflection
    pub async fn run(&self, kenning: &Kenning, task: &str) -> Result<WakeOutcome, WakeError> {
        info!(ken = %kenning.identifier, frames = kenning.frames.len(), model = %self.llm.model(), "Wake starting");
        let transcript = self.walk_frames(Transcript::new(), kenning).await?;
        let transcript = self.deliver_task(transcript, task).await?;
        let outcome = self.collect_reflection(transcript).await?;
        info!(
            turns = outcome.transcript.len(),
            input_tokens = outcome.transcript.usage().input_tokens,
            output_tokens = outcome.transcript.usage().output_tokens,
            "Wake complete"
        );
        Ok(outcome)
    }

    /// Send each frame's prompt as a user turn, in ordinal order
    pub async fn walk_frames(&self, mut transcript: Transcript, kenning: &Kenning) -> Result<Transcript, WakeError> {
        expect_state(&transcript, WakeState::Idle, "walk the frames")?;
        transcript.ken = kenning.identifier.clone();

        for (index, frame) in kenning.frames.iter().enumerate() {
            transcript.state = WakeState::WalkingFrames { frame: index };
            debug!(index, number = frame.number, title = %frame.title, "walk_frames: sending frame");

            self.banner(&format!("Frame {}: {}", frame.number, frame.title));
            self.note("[Sending prompt...]");

            let phase = Phase::Frame {
                number: frame.number,
                title: frame.title.clone(),
            };
            self.exchange(&mut transcript, phase, frame.prompt.clone(), self.limits.frame)
                .await?;
            transcript.frames_walked += 1;

            self.note(&format!("[Frame {} complete]", frame.number));
        }

        transcript.state = WakeState::DeliveringTask;
        Ok(transcript)
    }

    /// Send the task turn and take the agent's work reply
    pub async fn deliver_task(&self, mut transcript: Transcript, task: &str) -> Result<Transcript, WakeError> {
        expect_state(&transcript, WakeState::DeliveringTask, "deliver the task")?;
        transcript.task = task.to_string();

        let prompt = self
            .prompts
            .task_prompt(&transcript.prompt_context())
            .map_err(|e| WakeError::Template {
                template: "task",
                message: e.to_string(),
            })?;

        self.banner("TASK");
        if self.narrate {
            println!("\n{}\n", task);
        }
        self.note("[Agent working...]");

        self.exchange(&mut transcript, Phase::Task, prompt, self.limits.task).await?;

        transcript.state = WakeState::CollectingReflection;
        Ok(transcript)
    }

    /// Ask for the reflection; its reply is the wake's result
    pub async fn collect_reflection(&self, mut transcript: Transcript) -> Result<WakeOutcome, WakeError> {
        expect_state(&transcript, WakeState::CollectingReflection, "collect the reflection")?;

        let prompt = self
            .prompts
            .reflection_prompt(&transcript.prompt_context())
            .map_err(|e| WakeError::Template {
                template: "reflection",
                message: e.to_string(),
            })?;

        self.banner("REFLECTION");

        let reflection = self
            .exchange(&mut transcript, Phase::Reflection, prompt, self.limits.reflection)
            .await?;

        transcript.state = WakeState::Done;
        Ok(WakeOutcome { transcript, reflection })
    }

    /// Append a user turn, make one call with the whole transcript, append the reply
    async fn exchange(
        &self,
        transcript: &mut Transcript,
        phase: Phase,
        content: String,
        max_tokens: u32,
    ) -> Result<String, WakeError> {
        transcript.push(Message::user(content));

        let request = CompletionRequest {
            system_prompt: self.system_prompt.clone(),
            messages: transcript.turns().to_vec(),
            max_tokens,
        };
        debug!(%phase, turns = request.messages.len(), %max_tokens, "exchange: calling model");

        let result = if self.narrate {
            self.stream_to_stdout(request).await
        } else {
            self.llm.complete(request).await
        };
        let response = result.map_err(|source| {
            warn!(%phase, error = %source, "exchange: completion failed");
            WakeError::Completion {
                phase: phase.clone(),
                source,
            }
        })?;

        transcript.usage += &response.usage;
        if response.stop_reason == StopReason::MaxTokens {
            warn!(%phase, %max_tokens, "exchange: reply truncated at max tokens");
        }

        let text = match response.content {
            Some(text) if !text.is_empty() => text,
            _ => return Err(WakeError::EmptyResponse { phase }),
        };
        transcript.push(Message::assistant(text.clone()));
        Ok(text)
    }

    /// Call the model with streaming, echoing text to stdout as it arrives
    async fn stream_to_stdout(&self, request: CompletionRequest) -> Result<CompletionResponse, LlmError> {
        let (tx, mut rx) = mpsc::channel::<StreamChunk>(100);

        let print_handle = tokio::spawn(async move {
            println!();
            while let Some(chunk) = rx.recv().await {
                match chunk {
                    StreamChunk::TextDelta(text) => {
                        print!("{}", text);
                        let _ = io::stdout().flush();
                    }
                    StreamChunk::Error(err) => {
                        eprintln!("\n{} {}", "Stream error:".red(), err);
                    }
                    StreamChunk::MessageStart { .. } | StreamChunk::MessageDone { .. } => {}
                }
            }
            println!();
        });

        // The sender is dropped when the call returns, which ends the printer
        let response = self.llm.stream(request, tx).await;
        let _ = print_handle.await;

        response
    }

    fn banner(&self, heading: &str) {
        if self.narrate {
            let rule = "=".repeat(BANNER_WIDTH);
            println!("\n{}", rule.dimmed());
            println!("{}", heading.bold());
            println!("{}", rule.dimmed());
        }
    }

    fn note(&self, text: &str) {
        if self.narrate {
            println!("\n{}", text.dimmed());
        }
    }
}

fn expect_state(transcript: &Transcript, expected: WakeState, operation: &'static str) -> Result<(), WakeError> {
    if transcript.state == expected {
        Ok(())
    } else {
        Err(WakeError::OutOfOrder {
            operation,
            state: transcript.state,
        })
    }
}
