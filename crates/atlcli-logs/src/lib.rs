//! Event log storage for atlcli
//!
//! This crate resolves the daily log files of the global and project scopes,
//! streams their records lazily, and provides listing, lookup by id, tailing
//! (with polling follow mode), and retention on top of that stream.

mod error;
mod files;
mod filter;
mod format;
mod query;
mod reader;
mod retention;
mod tail;
mod timespec;
mod writer;

pub use error::{LogError, LogResult};
pub use files::{
    LOG_FILE_EXTENSION, LogPaths, PROJECT_DIR_NAME, daily_file_name, daily_file_path, file_date,
    log_files, resolve_files, scan_order,
};
pub use filter::RecordFilter;
pub use format::{MAX_MESSAGE_CHARS, format_line, summarize};
pub use query::{ListQuery, LogStore};
pub use reader::{RecordStream, decode_bytes, decode_line};
pub use retention::ClearRequest;
pub use tail::{DEFAULT_POLL_INTERVAL, TailCursor, TailFollower};
pub use timespec::{parse_optional, parse_time_expr};
pub use writer::LogWriter;

// Re-export types used in our public API
pub use atlcli_types::{EventRecord, LogLevel, Scope, ScopeSelection, event_types};
