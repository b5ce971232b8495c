//! Recording of each CLI invocation into the event log

use std::time::Instant;

use serde_json::json;

use atlcli_logs::{LogLevel, LogPaths, LogWriter, event_types};

/// Writers for the current process, one per scope that should receive records
pub struct Invocation {
    writers: Vec<LogWriter>,
    command: Vec<String>,
    started: Instant,
}

impl Invocation {
    /// Record `cli.command` for `command`
    ///
    /// The global scope always receives records; the project scope only when
    /// the project's `.atlcli` directory already exists.
    pub fn start(paths: &LogPaths, command: Vec<String>) -> Self {
        let global = LogWriter::new(&paths.global);
        let mut writers = Vec::with_capacity(2);
        if paths.project.parent().is_some_and(|dir| dir.is_dir()) {
            writers.push(LogWriter::with_session(&paths.project, global.session_id()));
        }
        writers.insert(0, global);

        let invocation = Self {
            writers,
            command,
            started: Instant::now(),
        };
        invocation.record(LogLevel::Info, event_types::CLI_COMMAND, json!({ "command": invocation.command }));
        invocation
    }

    /// Record `cli.result`, preceded by an `error` record on failure
    pub fn finish(self, exit_code: i32, error: Option<&anyhow::Error>) {
        if let Some(err) = error {
            self.record(LogLevel::Error, event_types::ERROR, json!({ "message": format!("{err:#}") }));
        }
        let duration_ms = self.started.elapsed().as_millis() as u64;
        let level = if exit_code == 0 { LogLevel::Info } else { LogLevel::Error };
        self.record(
            level,
            event_types::CLI_RESULT,
            json!({
                "command": self.command,
                "exitCode": exit_code,
                "durationMs": duration_ms,
            }),
        );
    }

    fn record(&self, level: LogLevel, event_type: &str, data: serde_json::Value) {
        for writer in &self.writers {
            // Logging must never fail the command itself
            if let Err(e) = writer.log(level, event_type, data.clone()) {
                tracing::warn!(error = %e, "failed to write event log");
            }
        }
    }
}
