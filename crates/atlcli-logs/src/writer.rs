//! Appending records to the daily log of a scope

use std::fs::{self, OpenOptions};
use std::io::{self, Write};
use std::path::{Path, PathBuf};

use chrono::{SubsecRound, Utc};
use uuid::Uuid;

use atlcli_types::{EventRecord, LogLevel};

use crate::error::{LogError, LogResult};
use crate::files;

/// Appends records for one process invocation to a scope directory
#[derive(Clone, Debug)]
pub struct LogWriter {
    dir: PathBuf,
    session_id: String,
    pid: u32,
}

impl LogWriter {
    /// Writer with a fresh session id
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self::with_session(dir, Uuid::new_v4().to_string())
    }

    /// Writer sharing an existing session id (e.g. one per scope, same process)
    pub fn with_session(dir: impl Into<PathBuf>, session_id: impl Into<String>) -> Self {
        Self {
            dir: dir.into(),
            session_id: session_id.into(),
            pid: std::process::id(),
        }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    pub fn session_id(&self) -> &str {
        &self.session_id
    }

    /// Build, stamp, and append a record
    pub fn log(
        &self,
        level: LogLevel,
        event_type: &str,
        data: serde_json::Value,
    ) -> LogResult<EventRecord> {
        let record = EventRecord::new(
            Uuid::new_v4().to_string(),
            Utc::now().trunc_subsecs(3),
            level,
            event_type,
        )
        .with_data(data);
        self.append(record)
    }

    /// Append a record to the file for its timestamp's day
    ///
    /// A record without `sessionId` or `pid` gets this writer's.
    pub fn append(&self, mut record: EventRecord) -> LogResult<EventRecord> {
        record.session_id.get_or_insert_with(|| self.session_id.clone());
        record.pid.get_or_insert(self.pid);

        fs::create_dir_all(&self.dir).map_err(|e| LogError::io(&self.dir, e))?;
        let path = files::daily_file_path(&self.dir, record.timestamp);

        let mut line = serde_json::to_string(&record)
            .map_err(|e| LogError::io(&path, io::Error::other(e)))?;
        line.push('\n');

        // Single write so concurrent appenders do not interleave within a line
        let mut file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&path)
            .map_err(|e| LogError::io(&path, e))?;
        file.write_all(line.as_bytes())
            .map_err(|e| LogError::io(&path, e))?;
        Ok(record)
    }
}
