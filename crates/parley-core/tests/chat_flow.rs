use std::sync::Arc;
use std::time::Duration;

use futures::StreamExt;
use parley_core::llm::{MockGenerationClient, MockStep};
use parley_core::{AppCore, ChatMessage, Frame, ParleyConfig, RunState, WireType};
use tempfile::TempDir;

fn open_core(client: &MockGenerationClient, config: ParleyConfig) -> (AppCore, TempDir) {
    let temp_dir = tempfile::tempdir().expect("failed to create temp dir");
    let core = AppCore::with_db_path(
        temp_dir.path().join("parley.db"),
        config,
        Arc::new(client.clone()),
    )
    .expect("failed to open core");
    (core, temp_dir)
}

#[tokio::test]
async fn streamed_turn_is_persisted_with_causal_links() {
    let client = MockGenerationClient::from_runs(
        "mock",
        vec![vec![
            MockStep::answer("Hel"),
            MockStep::answer("lo"),
            MockStep::reasoning("think"),
        ]],
    );
    let (core, _temp_dir) = open_core(&client, ParleyConfig::default());

    let reply = core.chat.send("session-1", "hi there").expect("send failed");
    let user_id = reply.user_message_id.clone();
    let run_id = reply.run_id.clone();

    let frames: Vec<Frame> = reply.frames.collect().await;
    assert_eq!(frames.len(), 4);
    assert_eq!(frames.last(), Some(&Frame::Done));
    for frame in &frames[..3] {
        let message = frame.as_message().expect("chunk frame");
        assert_eq!(message.id.as_deref(), Some(run_id.as_str()));
        assert_eq!(message.parent_id.as_deref(), Some(user_id.as_str()));
    }

    let outcome = reply.completion.wait().await.expect("persist failed");
    assert_eq!(outcome.state, RunState::Complete);

    let history = core.memory.history("session-1").expect("history failed");
    assert_eq!(history.len(), 2);
    assert_eq!(history[0].message_type, WireType::Human);
    assert_eq!(history[0].id.as_deref(), Some(user_id.as_str()));
    assert!(history[0].parent_id.is_none());
    assert_eq!(history[1].message_type, WireType::Ai);
    assert_eq!(history[1].content, "Hello");
    assert_eq!(history[1].reasoning.as_deref(), Some("think"));
    assert_eq!(history[1].parent_id.as_deref(), Some(user_id.as_str()));
}

#[tokio::test]
async fn second_turn_sees_first_turn_in_context() {
    let client = MockGenerationClient::from_runs(
        "mock",
        vec![vec![MockStep::answer("first answer")]],
    );
    let (core, _temp_dir) = open_core(&client, ParleyConfig::default());

    let reply = core.chat.send("session-1", "one").expect("send failed");
    let _: Vec<Frame> = reply.frames.collect().await;
    reply.completion.wait().await.expect("persist failed");

    let reply = core.chat.send("session-1", "two").expect("send failed");
    let frames: Vec<Frame> = reply.frames.collect().await;
    reply.completion.wait().await.expect("persist failed");

    assert_eq!(
        frames[0].as_message().map(|m| m.content.as_str()),
        Some("mock-echo: two")
    );

    let requests = client.requests();
    assert_eq!(
        requests[1].messages,
        vec![
            ChatMessage::user("one"),
            ChatMessage::assistant("first answer"),
            ChatMessage::user("two"),
        ]
    );
}

#[tokio::test]
async fn context_window_bounds_generation_input() {
    let client = MockGenerationClient::new("mock");
    let mut config = ParleyConfig::default();
    config.memory.max_messages = 3;
    let (core, _temp_dir) = open_core(&client, config);

    for text in ["a", "b", "c", "d"] {
        let reply = core.chat.send("session-1", text).expect("send failed");
        let _: Vec<Frame> = reply.frames.collect().await;
        reply.completion.wait().await.expect("persist failed");
    }

    let last = client.requests().pop().expect("no requests");
    assert_eq!(last.messages.len(), 3);
    assert_eq!(last.messages[2], ChatMessage::user("d"));
    assert_eq!(core.memory.read("session-1").expect("read failed").len(), 8);
}

#[tokio::test]
async fn dropping_frames_cancels_and_skips_persistence() {
    let client = MockGenerationClient::from_runs(
        "mock",
        vec![vec![MockStep::answer("partial"), MockStep::Hang]],
    );
    let (core, _temp_dir) = open_core(&client, ParleyConfig::default());

    let mut reply = core.chat.send("session-1", "hello").expect("send failed");
    assert!(reply.frames.next().await.is_some());
    drop(reply.frames);

    let outcome = tokio::time::timeout(Duration::from_secs(2), reply.completion.wait())
        .await
        .expect("run did not stop")
        .expect("persist failed");
    assert_eq!(outcome.state, RunState::Cancelled);
    assert_eq!(outcome.answer, "partial");

    let log = core.memory.read("session-1").expect("read failed");
    assert_eq!(log.len(), 1);
}

#[test]
fn concurrent_appends_to_one_session_are_not_lost() {
    let client = MockGenerationClient::new("mock");
    let (core, _temp_dir) = open_core(&client, ParleyConfig::default());

    std::thread::scope(|scope| {
        for worker in 0..8 {
            let memory = core.memory.clone();
            scope.spawn(move || {
                for turn in 0..5 {
                    memory
                        .append("shared", ChatMessage::user(format!("{worker}-{turn}")))
                        .expect("append failed");
                }
            });
        }
    });

    let log = core.memory.read("shared").expect("read failed");
    assert_eq!(log.len(), 40);

    let mut ids: Vec<_> = log
        .iter()
        .map(|m| m.as_stored().expect("enriched").id.clone())
        .collect();
    ids.sort();
    ids.dedup();
    assert_eq!(ids.len(), 40);
}

#[test]
fn delete_is_idempotent_and_hides_history() {
    let client = MockGenerationClient::new("mock");
    let (core, _temp_dir) = open_core(&client, ParleyConfig::default());

    core.memory
        .append("session-1", ChatMessage::user("hello"))
        .expect("append failed");
    assert_eq!(core.memory.sessions().expect("sessions failed").len(), 1);

    core.memory.delete("session-1").expect("delete failed");
    core.memory.delete("session-1").expect("second delete failed");
    core.memory.delete("never-existed").expect("absent delete failed");

    assert!(core.memory.read("session-1").expect("read failed").is_empty());
    assert!(core.memory.sessions().expect("sessions failed").is_empty());
}
