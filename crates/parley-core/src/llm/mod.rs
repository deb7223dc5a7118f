//! Generation service abstraction and providers

mod client;
mod mock_client;
mod openai;

pub use client::{GenerationEvent, GenerationRequest, GenerationService, GenerationStream};
pub use mock_client::{MockGenerationClient, MockStep};
pub use openai::OpenAiGenerationClient;
