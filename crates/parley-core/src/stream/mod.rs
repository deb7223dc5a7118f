//! Streaming event bridge
//!
//! Turns a generation token stream into the ordered frame sequence consumed
//! by clients.

mod bridge;
mod frame;

pub use bridge::{DEFAULT_BUFFER_SIZE, FrameStream, RunHandle, RunOutcome, RunState, StreamBridge};
pub use frame::{DONE_SENTINEL, Frame};
