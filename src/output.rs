//! Human and JSON rendering of command results

use std::io::{self, Write};

use anyhow::Result;
use serde::Serialize;

use atlcli_logs::{EventRecord, format_line};

/// Output mode selected by `--json`
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum OutputMode {
    Human,
    Json,
}

impl OutputMode {
    pub fn from_flag(json: bool) -> Self {
        if json { Self::Json } else { Self::Human }
    }
}

/// Print a result set: a JSON array, or one formatted line per record
pub fn print_records(mode: OutputMode, records: &[EventRecord]) -> Result<()> {
    let mut out = io::stdout().lock();
    match mode {
        OutputMode::Json => writeln!(out, "{}", serde_json::to_string_pretty(records)?)?,
        OutputMode::Human if records.is_empty() => writeln!(out, "No log entries found.")?,
        OutputMode::Human => {
            for record in records {
                writeln!(out, "{}", format_line(record))?;
            }
        }
    }
    Ok(())
}

/// Print a single record in full
pub fn print_record(mode: OutputMode, record: &EventRecord) -> Result<()> {
    let mut out = io::stdout().lock();
    match mode {
        OutputMode::Json => writeln!(out, "{}", serde_json::to_string_pretty(record)?)?,
        OutputMode::Human => {
            writeln!(out, "ID:        {}", record.id)?;
            writeln!(out, "Timestamp: {}", record.timestamp.to_rfc3339())?;
            writeln!(out, "Level:     {}", record.level)?;
            writeln!(out, "Type:      {}", record.event_type)?;
            if let Some(session) = &record.session_id {
                writeln!(out, "Session:   {session}")?;
            }
            if let Some(pid) = record.pid {
                writeln!(out, "PID:       {pid}")?;
            }
            writeln!(out, "Data:")?;
            writeln!(out, "{}", serde_json::to_string_pretty(&record.data)?)?;
        }
    }
    Ok(())
}

/// Print a record arriving in follow mode (one line in either mode)
pub fn print_live(mode: OutputMode, record: &EventRecord) -> Result<()> {
    let mut out = io::stdout().lock();
    match mode {
        OutputMode::Json => writeln!(out, "{}", serde_json::to_string(record)?)?,
        OutputMode::Human => writeln!(out, "{}", format_line(record))?,
    }
    out.flush()?;
    Ok(())
}

#[derive(Serialize)]
struct ClearSummary {
    deleted: usize,
}

/// Print the number of files removed by `clear`
pub fn print_cleared(mode: OutputMode, deleted: usize) -> Result<()> {
    let mut out = io::stdout().lock();
    match mode {
        OutputMode::Json => writeln!(out, "{}", serde_json::to_string(&ClearSummary { deleted })?)?,
        OutputMode::Human => {
            let noun = if deleted == 1 { "file" } else { "files" };
            writeln!(out, "Deleted {deleted} log {noun}.")?;
        }
    }
    Ok(())
}
