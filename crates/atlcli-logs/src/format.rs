//! Human-readable one-line rendering of records

use serde_json::Value;

use atlcli_types::{EventRecord, event_types};

/// Longest error message shown before truncation
pub const MAX_MESSAGE_CHARS: usize = 100;

const TIME_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

/// Format a record as `<time> <LEVEL> <type> <summary>`
pub fn format_line(record: &EventRecord) -> String {
    let summary = summarize(record);
    let line = format!(
        "{} {} {:<13}",
        record.timestamp.format(TIME_FORMAT),
        record.level.as_str(),
        record.event_type
    );
    if summary.is_empty() {
        line.trim_end().to_string()
    } else {
        format!("{line} {summary}")
    }
}

/// Type-specific summary of the payload
pub fn summarize(record: &EventRecord) -> String {
    let data = &record.data;
    match record.event_type.as_str() {
        event_types::CLI_COMMAND => command_text(data.get("command")),
        event_types::CLI_RESULT => {
            let command = command_text(data.get("command"));
            let outcome = match record.data_i64("exitCode") {
                Some(0) => "ok".to_string(),
                Some(code) => format!("failed (exit {code})"),
                None => "finished".to_string(),
            };
            match record.data_i64("durationMs") {
                Some(ms) => format!("{command} -> {outcome} in {ms}ms"),
                None => format!("{command} -> {outcome}"),
            }
        }
        event_types::API_REQUEST => join_present(&[
            record.data_str("method").map(str::to_string),
            record.data_str("path").map(str::to_string),
        ]),
        event_types::API_RESPONSE => join_present(&[
            data.get("status").map(scalar_text),
            record.data_i64("durationMs").map(|ms| format!("({ms}ms)")),
        ]),
        event_types::SYNC_EVENT => join_present(&[
            record.data_str("eventType").map(str::to_string),
            data.get("file").or_else(|| data.get("pageId")).map(scalar_text),
        ]),
        event_types::AUTH_CHANGE => join_present(&[
            record.data_str("action").map(str::to_string),
            record.data_str("profile").map(|p| format!("({p})")),
        ]),
        event_types::ERROR => truncate(record.data_str("message").unwrap_or_default()),
        _ => match data {
            Value::Null => String::new(),
            other => truncate(&other.to_string()),
        },
    }
}

/// `command` may be stored as an argument list or as a single string
fn command_text(value: Option<&Value>) -> String {
    match value {
        Some(Value::Array(parts)) => parts.iter().map(scalar_text).collect::<Vec<_>>().join(" "),
        Some(other) => scalar_text(other),
        None => String::new(),
    }
}

fn scalar_text(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}

fn join_present(parts: &[Option<String>]) -> String {
    parts.iter().flatten().cloned().collect::<Vec<_>>().join(" ")
}

fn truncate(text: &str) -> String {
    if text.chars().count() <= MAX_MESSAGE_CHARS {
        return text.to_string();
    }
    let cut: String = text.chars().take(MAX_MESSAGE_CHARS).collect();
    format!("{cut}...")
}
