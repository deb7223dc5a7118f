//! Deterministic mock generation client for tests and offline runs.

use std::collections::VecDeque;
use std::sync::Arc;

use parking_lot::Mutex;
use tokio::time::{Duration, sleep};

use crate::error::GenerationError;

use super::{GenerationEvent, GenerationRequest, GenerationService, GenerationStream};

/// Scripted step of a mock generation run.
#[derive(Debug, Clone)]
pub enum MockStep {
    /// Emit a partial answer token.
    Answer(String),
    /// Emit a partial reasoning token.
    Reasoning(String),
    /// Fail the run with this message.
    Error(String),
    /// Pause before the next step.
    Delay(u64),
    /// Never produce another item.
    Hang,
}

impl MockStep {
    pub fn answer(token: impl Into<String>) -> Self {
        MockStep::Answer(token.into())
    }

    pub fn reasoning(token: impl Into<String>) -> Self {
        MockStep::Reasoning(token.into())
    }

    pub fn error(message: impl Into<String>) -> Self {
        MockStep::Error(message.into())
    }
}

/// A deterministic mock generation client driven by scripted runs.
///
/// Each call to `stream` consumes the next scripted run; once the script is
/// exhausted the client echoes the newest user message.
#[derive(Debug, Clone, Default)]
pub struct MockGenerationClient {
    model: String,
    script: Arc<Mutex<VecDeque<Vec<MockStep>>>>,
    requests: Arc<Mutex<Vec<GenerationRequest>>>,
}

impl MockGenerationClient {
    pub fn new(model: impl Into<String>) -> Self {
        Self {
            model: model.into(),
            ..Self::default()
        }
    }

    pub fn from_runs(model: impl Into<String>, runs: Vec<Vec<MockStep>>) -> Self {
        Self {
            model: model.into(),
            script: Arc::new(Mutex::new(VecDeque::from(runs))),
            requests: Arc::new(Mutex::new(Vec::new())),
        }
    }

    pub fn push_run(&self, steps: Vec<MockStep>) {
        self.script.lock().push_back(steps);
    }

    /// Requests received so far, oldest first.
    pub fn requests(&self) -> Vec<GenerationRequest> {
        self.requests.lock().clone()
    }

    fn fallback_run(request: &GenerationRequest) -> Vec<MockStep> {
        let text = request
            .last_user_text()
            .map(|text| format!("mock-echo: {}", text))
            .unwrap_or_else(|| "mock-ok".to_string());
        vec![MockStep::Answer(text)]
    }
}

impl GenerationService for MockGenerationClient {
    fn provider(&self) -> &str {
        "mock"
    }

    fn model(&self) -> &str {
        &self.model
    }

    fn stream(&self, request: GenerationRequest) -> GenerationStream {
        let steps = self
            .script
            .lock()
            .pop_front()
            .unwrap_or_else(|| Self::fallback_run(&request));
        self.requests.lock().push(request);

        Box::pin(async_stream::stream! {
            for step in steps {
                match step {
                    MockStep::Answer(token) => yield Ok(GenerationEvent::Answer(token)),
                    MockStep::Reasoning(token) => yield Ok(GenerationEvent::Reasoning(token)),
                    MockStep::Error(message) => {
                        yield Err(GenerationError::Stream(message));
                        return;
                    }
                    MockStep::Delay(ms) => sleep(Duration::from_millis(ms)).await,
                    MockStep::Hang => futures::future::pending::<()>().await,
                }
            }
        })
    }
}

#[cfg(test)]
mod tests {
    use futures::StreamExt;

    use super::*;
    use crate::models::ChatMessage;

    #[tokio::test]
    async fn mock_client_plays_scripted_run() {
        let client = MockGenerationClient::from_runs(
            "mock-model",
            vec![vec![
                MockStep::reasoning("hmm"),
                MockStep::answer("hi"),
                MockStep::error("boom"),
                MockStep::answer("never"),
            ]],
        );

        let items: Vec<_> = client
            .stream(GenerationRequest::new(vec![ChatMessage::user("ping")]))
            .collect()
            .await;

        assert_eq!(items.len(), 3);
        assert_eq!(
            items[0].as_ref().unwrap(),
            &GenerationEvent::Reasoning("hmm".to_string())
        );
        assert_eq!(
            items[1].as_ref().unwrap(),
            &GenerationEvent::Answer("hi".to_string())
        );
        assert!(matches!(items[2], Err(GenerationError::Stream(ref m)) if m == "boom"));
    }

    #[tokio::test]
    async fn mock_client_echoes_when_script_is_empty() {
        let client = MockGenerationClient::new("mock-model");

        let items: Vec<_> = client
            .stream(GenerationRequest::new(vec![
                ChatMessage::user("first"),
                ChatMessage::assistant("reply"),
                ChatMessage::user("second"),
            ]))
            .collect()
            .await;

        assert_eq!(items.len(), 1);
        assert_eq!(
            items[0].as_ref().unwrap(),
            &GenerationEvent::Answer("mock-echo: second".to_string())
        );
        assert_eq!(client.requests().len(), 1);
    }

    #[tokio::test]
    async fn mock_client_plays_pushed_runs_in_order() {
        let client = MockGenerationClient::new("mock-model");
        client.push_run(vec![MockStep::answer("one")]);
        client.push_run(vec![MockStep::answer("two")]);

        let mut answers = Vec::new();
        for _ in 0..3 {
            let items: Vec<_> = client
                .stream(GenerationRequest::new(vec![ChatMessage::user("ping")]))
                .collect()
                .await;
            answers.push(items[0].as_ref().unwrap().clone());
        }

        assert_eq!(
            answers,
            vec![
                GenerationEvent::Answer("one".to_string()),
                GenerationEvent::Answer("two".to_string()),
                GenerationEvent::Answer("mock-echo: ping".to_string()),
            ]
        );
    }
}
