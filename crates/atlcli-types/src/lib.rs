//! Shared types for the atlcli event log
//!
//! This crate contains the record model that is written by every CLI
//! invocation and read back by the log query, tail, and retention commands.

use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

// ============================================================================
// Event Types
// ============================================================================

/// Well-known values of [`EventRecord::event_type`]
pub mod event_types {
    pub const CLI_COMMAND: &str = "cli.command";
    pub const CLI_RESULT: &str = "cli.result";
    pub const API_REQUEST: &str = "api.request";
    pub const API_RESPONSE: &str = "api.response";
    pub const SYNC_EVENT: &str = "sync.event";
    pub const AUTH_CHANGE: &str = "auth.change";
    pub const ERROR: &str = "error";
}

// ============================================================================
// Log Types
// ============================================================================

/// Record severity
///
/// Readers never compare levels by rank; filtering is exact match.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogLevel {
    Error,
    Warn,
    #[default]
    Info,
    Debug,
}

impl LogLevel {
    pub const ALL: [LogLevel; 4] = [Self::Error, Self::Warn, Self::Info, Self::Debug];

    /// Lowercase name as stored on disk
    pub fn name(&self) -> &'static str {
        match self {
            Self::Error => "error",
            Self::Warn => "warn",
            Self::Info => "info",
            Self::Debug => "debug",
        }
    }

    /// Fixed-width uppercase label for human output
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Error => "ERROR",
            Self::Warn => "WARN ",
            Self::Info => "INFO ",
            Self::Debug => "DEBUG",
        }
    }
}

impl FromStr for LogLevel {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "error" => Ok(Self::Error),
            "warn" | "warning" => Ok(Self::Warn),
            "info" => Ok(Self::Info),
            "debug" => Ok(Self::Debug),
            other => Err(format!(
                "unknown level '{other}' (expected one of: error, warn, info, debug)"
            )),
        }
    }
}

impl fmt::Display for LogLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// A single structured event, one per line of a daily log file
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EventRecord {
    /// Unique identifier assigned by the writer
    pub id: String,

    /// When the event happened
    pub timestamp: DateTime<Utc>,

    /// Severity
    pub level: LogLevel,

    /// Dot-segmented category, e.g. `api.request`
    #[serde(rename = "type")]
    pub event_type: String,

    /// Process invocation that produced the record
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub session_id: Option<String>,

    /// OS process id of the writer
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub pid: Option<u32>,

    /// Payload; shape depends on `event_type`
    #[serde(default)]
    pub data: serde_json::Value,
}

impl EventRecord {
    /// Create a record with an empty payload
    pub fn new(
        id: impl Into<String>,
        timestamp: DateTime<Utc>,
        level: LogLevel,
        event_type: impl Into<String>,
    ) -> Self {
        Self {
            id: id.into(),
            timestamp,
            level,
            event_type: event_type.into(),
            session_id: None,
            pid: None,
            data: serde_json::Value::Null,
        }
    }

    /// Attach a payload
    pub fn with_data(mut self, data: serde_json::Value) -> Self {
        self.data = data;
        self
    }

    /// Attach writer identity
    pub fn with_session(mut self, session_id: impl Into<String>, pid: u32) -> Self {
        self.session_id = Some(session_id.into());
        self.pid = Some(pid);
        self
    }

    /// Get a string field from the payload
    pub fn data_str(&self, key: &str) -> Option<&str> {
        self.data.get(key).and_then(|v| v.as_str())
    }

    /// Get an integer field from the payload
    pub fn data_i64(&self, key: &str) -> Option<i64> {
        self.data.get(key).and_then(|v| v.as_i64())
    }
}

// ============================================================================
// Scopes
// ============================================================================

/// Log namespace, each with its own directory
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Scope {
    Global,
    Project,
}

impl Scope {
    pub fn name(&self) -> &'static str {
        match self {
            Self::Global => "global",
            Self::Project => "project",
        }
    }
}

impl fmt::Display for Scope {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Which scopes an operation reads from
#[derive(Clone, Copy, Debug, PartialEq, Eq, Default)]
pub enum ScopeSelection {
    Global,
    Project,
    #[default]
    Both,
}

impl ScopeSelection {
    /// Scopes in read order (global first)
    pub fn scopes(&self) -> &'static [Scope] {
        match self {
            Self::Global => &[Scope::Global],
            Self::Project => &[Scope::Project],
            Self::Both => &[Scope::Global, Scope::Project],
        }
    }
}

impl From<Scope> for ScopeSelection {
    fn from(scope: Scope) -> Self {
        match scope {
            Scope::Global => Self::Global,
            Scope::Project => Self::Project,
        }
    }
}
