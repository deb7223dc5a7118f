use anyhow::Result;
use comfy_table::{Cell, Table};
use serde::Serialize;
use serde_json::json;
use std::sync::Arc;

use crate::output::{OutputFormat, format_timestamp, preview_text, print_json, print_table, short_id};
use parley_core::{AppCore, WireMessage, WireType};

#[derive(Debug, Serialize)]
struct SessionRow {
    id: String,
    message_count: usize,
    updated_at: i64,
}

pub fn list_sessions(core: &Arc<AppCore>, format: OutputFormat) -> Result<()> {
    let sessions = core.memory.sessions()?;

    if format.is_json() {
        let rows: Vec<SessionRow> = sessions
            .into_iter()
            .map(|s| SessionRow {
                id: s.id,
                message_count: s.message_count,
                updated_at: s.updated_at,
            })
            .collect();
        return print_json(&rows);
    }

    let mut table = Table::new();
    table.set_header(vec!["ID", "Messages", "Updated"]);
    for session in sessions {
        table.add_row(vec![
            Cell::new(session.id),
            Cell::new(session.message_count),
            Cell::new(format_timestamp(Some(session.updated_at))),
        ]);
    }
    print_table(table)
}

pub fn show_history(core: &Arc<AppCore>, session_id: &str, format: OutputFormat) -> Result<()> {
    let history = core.memory.history(session_id)?;

    if format.is_json() {
        return print_json(&history);
    }

    if history.is_empty() {
        println!("No messages in session {session_id}");
        return Ok(());
    }

    let mut table = Table::new();
    table.set_header(vec!["ID", "Parent", "Type", "Sent", "Content"]);
    for message in &history {
        table.add_row(vec![
            Cell::new(message.id.as_deref().map(short_id).unwrap_or("-")),
            Cell::new(message.parent_id.as_deref().map(short_id).unwrap_or("-")),
            Cell::new(type_label(message)),
            Cell::new(format_timestamp(message.sent_at)),
            Cell::new(preview_text(&message.content)),
        ]);
    }
    print_table(table)
}

pub fn delete_session(
    core: &Arc<AppCore>,
    session_id: &str,
    purge: bool,
    format: OutputFormat,
) -> Result<()> {
    if purge {
        core.memory.purge(session_id)?;
    } else {
        core.memory.delete(session_id)?;
    }

    if format.is_json() {
        return print_json(&json!({ "id": session_id, "deleted": true, "purged": purge }));
    }

    println!("Session deleted: {session_id}");
    Ok(())
}

fn type_label(message: &WireMessage) -> &'static str {
    match message.message_type {
        WireType::System => "system",
        WireType::Human => "human",
        WireType::Ai => "ai",
        WireType::Tool => "tool",
        WireType::AiChunk => "chunk",
        WireType::Error => "error",
    }
}
