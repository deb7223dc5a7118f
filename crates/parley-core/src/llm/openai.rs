//! OpenAI-compatible streaming generation client

use futures::StreamExt;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use serde_json::{Value, json};

use crate::error::GenerationError;
use crate::models::{ChatMessage, PartKind};

use super::{GenerationEvent, GenerationRequest, GenerationService, GenerationStream};

const DEFAULT_BASE_URL: &str = "https://api.openai.com/v1";
const DEFAULT_MODEL: &str = "gpt-4o";
const MAX_ERROR_BODY: usize = 512;

/// Client for any `/chat/completions` endpoint that speaks the OpenAI
/// streaming protocol
#[derive(Debug, Clone)]
pub struct OpenAiGenerationClient {
    client: Client,
    api_key: String,
    model: String,
    base_url: String,
}

impl OpenAiGenerationClient {
    /// Create a new client
    pub fn new(api_key: impl Into<String>) -> Self {
        Self {
            client: Client::new(),
            api_key: api_key.into(),
            model: DEFAULT_MODEL.to_string(),
            base_url: DEFAULT_BASE_URL.to_string(),
        }
    }

    /// Set the model to use
    pub fn with_model(mut self, model: impl Into<String>) -> Self {
        self.model = model.into();
        self
    }

    /// Set custom base URL (for API-compatible services)
    pub fn with_base_url(mut self, url: impl Into<String>) -> Self {
        self.base_url = url.into().trim_end_matches('/').to_string();
        self
    }
}

#[derive(Serialize)]
struct OpenAIMessage {
    role: &'static str,
    content: Value,
    #[serde(skip_serializing_if = "Option::is_none")]
    tool_call_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    tool_calls: Option<Vec<Value>>,
}

#[derive(Deserialize, Debug)]
struct OpenAIStreamResponse {
    #[serde(default)]
    choices: Vec<OpenAIStreamChoice>,
}

#[derive(Deserialize, Debug)]
struct OpenAIStreamChoice {
    delta: OpenAIStreamDelta,
}

#[derive(Deserialize, Debug, Default)]
struct OpenAIStreamDelta {
    content: Option<String>,
    /// Reasoning tokens as emitted by DeepSeek/Qwen-style servers
    reasoning_content: Option<String>,
}

fn to_openai_message(message: &ChatMessage) -> OpenAIMessage {
    match message.clone() {
        ChatMessage::System(m) => OpenAIMessage {
            role: "system",
            content: Value::String(m.content),
            tool_call_id: None,
            tool_calls: None,
        },
        ChatMessage::User(m) => {
            let images: Vec<Value> = m
                .parts
                .iter()
                .filter(|part| part.kind == PartKind::Image)
                .map(|part| {
                    let mime = part.mime_type.as_deref().unwrap_or("image/png");
                    json!({
                        "type": "image_url",
                        "image_url": { "url": format!("data:{};base64,{}", mime, part.data) },
                    })
                })
                .collect();

            let content = if images.is_empty() {
                Value::String(m.content)
            } else {
                let mut blocks = vec![json!({ "type": "text", "text": m.content })];
                blocks.extend(images);
                Value::Array(blocks)
            };

            OpenAIMessage {
                role: "user",
                content,
                tool_call_id: None,
                tool_calls: None,
            }
        }
        ChatMessage::Assistant(m) => {
            let tool_calls = (!m.tool_calls.is_empty()).then(|| {
                m.tool_calls
                    .iter()
                    .map(|call| {
                        json!({
                            "id": call.id,
                            "type": "function",
                            "function": { "name": call.name, "arguments": call.arguments },
                        })
                    })
                    .collect()
            });
            let content = if tool_calls.is_some() && m.content.is_empty() {
                Value::Null
            } else {
                Value::String(m.content)
            };

            OpenAIMessage {
                role: "assistant",
                content,
                tool_call_id: None,
                tool_calls,
            }
        }
        ChatMessage::ToolResult(m) => OpenAIMessage {
            role: "tool",
            content: Value::String(m.content),
            tool_call_id: Some(m.id),
            tool_calls: None,
        },
        ChatMessage::Stored(stored) => to_openai_message(&stored.message.into_message()),
    }
}

/// Raw bytes of an SSE response, split into complete events.
///
/// Network chunks can end inside a multi-byte character, so bytes are only
/// decoded once a whole event has arrived.
#[derive(Debug, Default)]
struct SseBuffer {
    bytes: Vec<u8>,
}

impl SseBuffer {
    fn push(&mut self, chunk: &[u8]) {
        self.bytes.extend_from_slice(chunk);
    }

    /// Next complete event, without its terminating blank line.
    fn next_event(&mut self) -> Option<String> {
        let pos = self.bytes.windows(2).position(|pair| pair == b"\n\n")?;
        let event: Vec<u8> = self.bytes.drain(..pos + 2).take(pos).collect();
        Some(String::from_utf8_lossy(&event).into_owned())
    }

    /// Whatever is left once the response body has ended.
    fn finish(self) -> Option<String> {
        (!self.bytes.is_empty()).then(|| String::from_utf8_lossy(&self.bytes).into_owned())
    }
}

fn data_lines(event: &str) -> impl Iterator<Item = &str> {
    event.lines().filter_map(|line| line.strip_prefix("data:"))
}

/// Parse one SSE `data:` payload. `None` marks the end of the stream.
fn parse_data(data: &str) -> Option<Vec<GenerationEvent>> {
    let data = data.trim();
    if data == "[DONE]" {
        return None;
    }

    let parsed: OpenAIStreamResponse = match serde_json::from_str(data) {
        Ok(parsed) => parsed,
        Err(e) => {
            tracing::debug!(error = %e, "Ignoring unparsable stream event");
            return Some(Vec::new());
        }
    };

    let mut events = Vec::new();
    for choice in parsed.choices {
        if let Some(reasoning) = choice.delta.reasoning_content
            && !reasoning.is_empty()
        {
            events.push(GenerationEvent::Reasoning(reasoning));
        }
        if let Some(content) = choice.delta.content
            && !content.is_empty()
        {
            events.push(GenerationEvent::Answer(content));
        }
    }
    Some(events)
}

impl GenerationService for OpenAiGenerationClient {
    fn provider(&self) -> &str {
        "openai"
    }

    fn model(&self) -> &str {
        &self.model
    }

    fn stream(&self, request: GenerationRequest) -> GenerationStream {
        let client = self.client.clone();
        let api_key = self.api_key.clone();
        let base_url = self.base_url.clone();
        let model = self.model.clone();

        Box::pin(async_stream::stream! {
            let messages: Vec<OpenAIMessage> =
                request.messages.iter().map(to_openai_message).collect();

            let body = json!({
                "model": model,
                "messages": messages,
                "temperature": request.temperature,
                "top_p": request.top_p,
                "max_tokens": request.max_tokens,
                "stream": true,
            });

            let response = match client
                .post(format!("{}/chat/completions", base_url))
                .header("Authorization", format!("Bearer {}", api_key))
                .json(&body)
                .send()
                .await
            {
                Ok(resp) => resp,
                Err(e) => {
                    yield Err(GenerationError::Http(e));
                    return;
                }
            };

            if !response.status().is_success() {
                let status = response.status().as_u16();
                let body = response.text().await.unwrap_or_default();
                let message = if body.len() > MAX_ERROR_BODY {
                    let cut = body.char_indices().take_while(|(i, _)| *i < MAX_ERROR_BODY).count();
                    format!("{}... [truncated]", body.chars().take(cut).collect::<String>())
                } else {
                    body
                };
                yield Err(GenerationError::Api { status, message });
                return;
            }

            let mut byte_stream = response.bytes_stream();
            let mut buffer = SseBuffer::default();

            while let Some(chunk_result) = byte_stream.next().await {
                let chunk = match chunk_result {
                    Ok(bytes) => bytes,
                    Err(e) => {
                        yield Err(GenerationError::Stream(format!("Stream error: {}", e)));
                        return;
                    }
                };

                buffer.push(&chunk);
                while let Some(event) = buffer.next_event() {
                    for data in data_lines(&event) {
                        match parse_data(data) {
                            Some(events) => {
                                for event in events {
                                    yield Ok(event);
                                }
                            }
                            None => return,
                        }
                    }
                }
            }

            // The last event may lack its trailing blank line.
            if let Some(event) = buffer.finish() {
                for data in data_lines(&event) {
                    if let Some(events) = parse_data(data) {
                        for event in events {
                            yield Ok(event);
                        }
                    }
                }
            }
        })
    }
}
