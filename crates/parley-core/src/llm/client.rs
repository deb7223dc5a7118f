//! Generation service trait and types

use std::pin::Pin;

use futures::Stream;

use crate::error::GenerationError;
use crate::models::ChatMessage;

/// One partial output of a generation run
#[derive(Debug, Clone, PartialEq)]
pub enum GenerationEvent {
    /// Partial final-answer text
    Answer(String),
    /// Partial intermediate reasoning text
    Reasoning(String),
}

/// Token stream of one generation run.
///
/// The stream ends after the last token on success; a failure is delivered
/// as a single `Err` item and nothing follows it. Dropping the stream cancels
/// the run.
pub type GenerationStream =
    Pin<Box<dyn Stream<Item = Result<GenerationEvent, GenerationError>> + Send>>;

/// Generation request
#[derive(Debug, Clone)]
pub struct GenerationRequest {
    pub messages: Vec<ChatMessage>,
    pub temperature: Option<f32>,
    pub top_p: Option<f32>,
    pub max_tokens: Option<u32>,
}

impl GenerationRequest {
    /// Create a new generation request
    pub fn new(messages: Vec<ChatMessage>) -> Self {
        Self {
            messages,
            temperature: None,
            top_p: None,
            max_tokens: None,
        }
    }

    /// Set temperature
    pub fn with_temperature(mut self, temperature: f32) -> Self {
        self.temperature = Some(temperature);
        self
    }

    /// Set nucleus sampling
    pub fn with_top_p(mut self, top_p: f32) -> Self {
        self.top_p = Some(top_p);
        self
    }

    /// Set max tokens
    pub fn with_max_tokens(mut self, tokens: u32) -> Self {
        self.max_tokens = Some(tokens);
        self
    }

    /// Text of the newest user message in the request
    pub fn last_user_text(&self) -> Option<&str> {
        self.messages
            .iter()
            .rev()
            .find(|m| matches!(m, ChatMessage::User(_)))
            .map(ChatMessage::content)
    }
}

/// Token-producing language model service
pub trait GenerationService: Send + Sync {
    /// Get provider name
    fn provider(&self) -> &str;

    /// Get model name
    fn model(&self) -> &str;

    /// Start a streaming generation run
    fn stream(&self, request: GenerationRequest) -> GenerationStream;
}
