use anyhow::{Result, bail};
use futures::StreamExt;
use std::sync::Arc;
use uuid::Uuid;

use parley_core::{AppCore, RunState};

pub async fn run(core: Arc<AppCore>, message: String, session: Option<String>) -> Result<()> {
    let session_id = session.unwrap_or_else(|| Uuid::new_v4().to_string());
    eprintln!("session: {session_id}");

    let reply = core.chat.send(&session_id, message)?;
    let mut frames = reply.frames;

    loop {
        tokio::select! {
            frame = frames.next() => match frame {
                Some(frame) => println!("{}", frame.to_data()?),
                None => break,
            },
            _ = tokio::signal::ctrl_c() => {
                eprintln!("interrupted");
                break;
            }
        }
    }
    // Closing the frame stream stops a run that is still in flight.
    drop(frames);

    let outcome = reply.completion.wait().await?;
    match outcome.state {
        RunState::Complete => Ok(()),
        state => bail!("Run {} ended as {:?}", outcome.run_id, state),
    }
}
