//! Chat service: one user turn in, one streamed assistant turn out.

use std::sync::Arc;

use tokio::task::JoinHandle;
use tracing::{debug, info};

use crate::config::LlmConfig;
use crate::error::{MemoryError, Result};
use crate::llm::{GenerationRequest, GenerationService};
use crate::memory::MemoryStore;
use crate::models::ChatMessage;
use crate::stream::{FrameStream, RunOutcome, StreamBridge};

/// Wires the memory store, a generation service and the stream bridge.
#[derive(Clone)]
pub struct ChatService {
    memory: MemoryStore,
    generator: Arc<dyn GenerationService>,
    bridge: StreamBridge,
    llm: LlmConfig,
}

/// Streaming reply to one user message
pub struct ChatReply {
    pub session_id: String,
    /// Id assigned to the persisted user message
    pub user_message_id: String,
    pub run_id: String,
    /// Frames of the assistant turn; dropping them cancels generation
    pub frames: FrameStream,
    pub completion: ChatCompletion,
}

/// Background task that persists the assistant turn once the run ends
pub struct ChatCompletion {
    task: JoinHandle<Result<RunOutcome>>,
}

impl ChatCompletion {
    /// Wait until the run is over and its outcome has been persisted.
    pub async fn wait(self) -> Result<RunOutcome> {
        self.task
            .await
            .map_err(|e| MemoryError::Storage(anyhow::anyhow!("Chat completion task failed: {}", e)))?
    }
}

impl ChatService {
    pub fn new(
        memory: MemoryStore,
        generator: Arc<dyn GenerationService>,
        bridge: StreamBridge,
        llm: LlmConfig,
    ) -> Self {
        Self {
            memory,
            generator,
            bridge,
            llm,
        }
    }

    pub fn memory(&self) -> &MemoryStore {
        &self.memory
    }

    /// Send plain text as the next user message of `session_id`.
    pub fn send(&self, session_id: &str, text: impl Into<String>) -> Result<ChatReply> {
        self.send_message(session_id, ChatMessage::user(text))
    }

    /// Persist `message`, then stream the assistant's answer to it.
    ///
    /// The answer is appended to the session only when the run completes;
    /// failed and cancelled runs leave just the user message behind.
    pub fn send_message(&self, session_id: &str, message: ChatMessage) -> Result<ChatReply> {
        if !matches!(message, ChatMessage::User(_)) {
            return Err(MemoryError::UnsupportedVariant(format!(
                "expected a user message, got {}",
                message.kind()
            )));
        }

        let stored = self.memory.append(session_id, message)?;
        let user_message_id = stored
            .as_stored()
            .map(|m| m.id.clone())
            .unwrap_or_default();

        let request = self.build_request(self.memory.context(session_id)?);
        debug!(
            session_id,
            message_count = request.messages.len(),
            model = self.generator.model(),
            "Built generation context"
        );

        let source = self.generator.stream(request);
        let (frames, handle) = self.bridge.start(Some(user_message_id.clone()), source);
        let run_id = handle.run_id().to_string();
        info!(session_id, run_id = %run_id, "Chat turn started");

        let memory = self.memory.clone();
        let owner = session_id.to_string();
        let task = tokio::spawn(async move {
            let outcome = handle.wait().await;
            if let Some(answer) = outcome.clone().into_message() {
                memory.append(&owner, answer)?;
            } else {
                debug!(session_id = %owner, state = ?outcome.state, "Assistant turn not persisted");
            }
            Ok::<_, MemoryError>(outcome)
        });

        Ok(ChatReply {
            session_id: session_id.to_string(),
            user_message_id,
            run_id,
            frames,
            completion: ChatCompletion { task },
        })
    }

    fn build_request(&self, context: Vec<ChatMessage>) -> GenerationRequest {
        let mut messages = Vec::with_capacity(context.len() + 1);
        if let Some(prompt) = self.llm.system_prompt.as_deref()
            && !prompt.trim().is_empty()
        {
            messages.push(ChatMessage::system(prompt));
        }
        messages.extend(context);

        GenerationRequest::new(messages)
            .with_temperature(self.llm.temperature)
            .with_top_p(self.llm.top_p)
            .with_max_tokens(self.llm.max_tokens)
    }
}
