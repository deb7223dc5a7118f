use std::pin::Pin;
use std::task::{Context, Poll};

use futures::{Stream, StreamExt};
use serde::{Deserialize, Serialize};
use tokio::sync::{mpsc, watch};
use tokio::task::JoinHandle;
use tokio_stream::wrappers::ReceiverStream;
use tokio_util::sync::{CancellationToken, DropGuard};
use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::llm::{GenerationEvent, GenerationStream};
use crate::models::ChatMessage;

use super::Frame;

/// Default bound on frames buffered between a run and its consumer.
pub const DEFAULT_BUFFER_SIZE: usize = 64;

/// Lifecycle of one generation run
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RunState {
    Init,
    Streaming,
    Complete,
    Error,
    Cancelled,
}

impl RunState {
    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            RunState::Complete | RunState::Error | RunState::Cancelled
        )
    }
}

/// Final result of a run, available once its frames have been produced
#[derive(Debug, Clone, PartialEq)]
pub struct RunOutcome {
    pub run_id: String,
    pub state: RunState,
    /// Concatenated answer tokens
    pub answer: String,
    /// Concatenated reasoning tokens
    pub reasoning: String,
}

impl RunOutcome {
    fn new(run_id: String) -> Self {
        Self {
            run_id,
            state: RunState::Init,
            answer: String::new(),
            reasoning: String::new(),
        }
    }

    /// The assistant turn produced by a completed run.
    pub fn into_message(self) -> Option<ChatMessage> {
        (self.state == RunState::Complete)
            .then(|| ChatMessage::assistant_with_reasoning(self.answer, self.reasoning))
    }
}

/// Converts generation streams into ordered frame sequences.
///
/// Each run is drained by its own task into a bounded channel. When the
/// channel is full the task stops pulling tokens until the consumer catches
/// up, so nothing is dropped and nothing grows without bound.
#[derive(Debug, Clone)]
pub struct StreamBridge {
    buffer_size: usize,
}

impl Default for StreamBridge {
    fn default() -> Self {
        Self::new(DEFAULT_BUFFER_SIZE)
    }
}

impl StreamBridge {
    pub fn new(buffer_size: usize) -> Self {
        Self {
            buffer_size: buffer_size.max(1),
        }
    }

    pub fn buffer_size(&self) -> usize {
        self.buffer_size
    }

    /// Start draining `source` on a background task.
    ///
    /// Every frame carries a freshly generated run id and `parent_id`.
    /// Dropping the returned [`FrameStream`] cancels the run.
    pub fn start(
        &self,
        parent_id: Option<String>,
        source: GenerationStream,
    ) -> (FrameStream, RunHandle) {
        let run_id = Uuid::new_v4().to_string();
        let (tx, rx) = mpsc::channel(self.buffer_size);
        let (state_tx, state_rx) = watch::channel(RunState::Init);
        let cancel = CancellationToken::new();

        info!(run_id = %run_id, parent_id = ?parent_id, "Starting generation run");

        let task = tokio::spawn(pump(
            run_id.clone(),
            parent_id,
            source,
            tx,
            state_tx,
            cancel.clone(),
        ));

        let frames = FrameStream {
            inner: ReceiverStream::new(rx),
            _guard: cancel.clone().drop_guard(),
        };
        let handle = RunHandle {
            run_id,
            cancel,
            state: state_rx,
            task,
        };
        (frames, handle)
    }
}

/// Ordered frames of one run. Ends after its terminal frame.
pub struct FrameStream {
    inner: ReceiverStream<Frame>,
    _guard: DropGuard,
}

impl Stream for FrameStream {
    type Item = Frame;

    fn poll_next(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<Frame>> {
        Pin::new(&mut self.inner).poll_next(cx)
    }
}

/// Control side of a running generation
pub struct RunHandle {
    run_id: String,
    cancel: CancellationToken,
    state: watch::Receiver<RunState>,
    task: JoinHandle<RunOutcome>,
}

impl RunHandle {
    pub fn run_id(&self) -> &str {
        &self.run_id
    }

    pub fn state(&self) -> RunState {
        *self.state.borrow()
    }

    /// Stop the run. No frames are emitted after cancellation.
    pub fn cancel(&self) {
        self.cancel.cancel();
    }

    /// Wait for the run to reach a terminal state.
    pub async fn wait(self) -> RunOutcome {
        match self.task.await {
            Ok(outcome) => outcome,
            Err(e) => {
                warn!(run_id = %self.run_id, error = %e, "Generation run task failed");
                RunOutcome {
                    state: RunState::Error,
                    ..RunOutcome::new(self.run_id)
                }
            }
        }
    }
}

enum Delivery {
    Sent,
    Stopped,
}

async fn deliver(tx: &mpsc::Sender<Frame>, cancel: &CancellationToken, frame: Frame) -> Delivery {
    tokio::select! {
        biased;
        _ = cancel.cancelled() => Delivery::Stopped,
        sent = tx.send(frame) => match sent {
            Ok(()) => Delivery::Sent,
            Err(_) => Delivery::Stopped,
        },
    }
}

async fn pump(
    run_id: String,
    parent_id: Option<String>,
    mut source: GenerationStream,
    tx: mpsc::Sender<Frame>,
    state: watch::Sender<RunState>,
    cancel: CancellationToken,
) -> RunOutcome {
    let mut outcome = RunOutcome::new(run_id);
    let parent = parent_id.as_deref();

    let terminal = loop {
        let next = tokio::select! {
            biased;
            _ = cancel.cancelled() => break RunState::Cancelled,
            _ = tx.closed() => break RunState::Cancelled,
            next = source.next() => next,
        };

        let frame = match next {
            Some(Ok(event)) => {
                if outcome.state == RunState::Init {
                    outcome.state = RunState::Streaming;
                    state.send_replace(RunState::Streaming);
                }
                match event {
                    GenerationEvent::Answer(token) => {
                        outcome.answer.push_str(&token);
                        Frame::answer(&outcome.run_id, parent, token)
                    }
                    GenerationEvent::Reasoning(token) => {
                        outcome.reasoning.push_str(&token);
                        Frame::reasoning(&outcome.run_id, parent, token)
                    }
                }
            }
            Some(Err(e)) => {
                warn!(run_id = %outcome.run_id, error = %e, "Generation run failed");
                // The consumer may already be gone; the run is failed either way.
                let _ = deliver(&tx, &cancel, Frame::error(&outcome.run_id, parent, &e)).await;
                break RunState::Error;
            }
            None => {
                // A run only completes once its terminal frame was handed over.
                break match deliver(&tx, &cancel, Frame::Done).await {
                    Delivery::Sent => RunState::Complete,
                    Delivery::Stopped => RunState::Cancelled,
                };
            }
        };

        if let Delivery::Stopped = deliver(&tx, &cancel, frame).await {
            break RunState::Cancelled;
        }
    };

    // Releases the generation handle before the outcome is observable.
    drop(source);

    outcome.state = terminal;
    state.send_replace(terminal);

    match terminal {
        RunState::Cancelled => info!(run_id = %outcome.run_id, "Generation run cancelled"),
        _ => debug!(
            run_id = %outcome.run_id,
            state = ?terminal,
            answer_len = outcome.answer.len(),
            "Generation run finished"
        ),
    }
    outcome
}
