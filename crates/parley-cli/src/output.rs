use anyhow::Result;
use chrono::{DateTime, Local, TimeZone};
use comfy_table::Table;
use serde::Serialize;

pub use crate::cli::OutputFormat;

const PREVIEW_CHARS: usize = 60;

pub fn print_json<T: Serialize>(value: &T) -> Result<()> {
    let output = serde_json::to_string_pretty(value)?;
    println!("{output}");
    Ok(())
}

pub fn print_table(table: Table) -> Result<()> {
    println!("{table}");
    Ok(())
}

/// Local time for an epoch-millis timestamp, `-` when absent or invalid.
pub fn format_timestamp(timestamp: Option<i64>) -> String {
    let Some(ts) = timestamp else {
        return "-".to_string();
    };

    let datetime: DateTime<Local> = match Local.timestamp_millis_opt(ts).single() {
        Some(dt) => dt,
        None => return "-".to_string(),
    };

    datetime.format("%Y-%m-%d %H:%M:%S").to_string()
}

/// First line of `text`, cut to a table-friendly width.
pub fn preview_text(text: &str) -> String {
    let line = text.lines().next().unwrap_or_default();
    if line.chars().count() > PREVIEW_CHARS {
        let cut: String = line.chars().take(PREVIEW_CHARS).collect();
        format!("{cut}...")
    } else {
        line.to_string()
    }
}

pub fn short_id(id: &str) -> &str {
    id.get(..8).unwrap_or(id)
}
