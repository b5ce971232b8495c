//! Log directory layout and daily file resolution

use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use chrono::{DateTime, NaiveDate, Utc};

use atlcli_types::{Scope, ScopeSelection};

/// Extension of daily log files
pub const LOG_FILE_EXTENSION: &str = "jsonl";

/// Per-project state directory, relative to the project root
pub const PROJECT_DIR_NAME: &str = ".atlcli";

const DATE_FORMAT: &str = "%Y-%m-%d";

/// Directories holding the two log scopes
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct LogPaths {
    pub global: PathBuf,
    pub project: PathBuf,
}

impl LogPaths {
    pub fn new(global: impl Into<PathBuf>, project: impl Into<PathBuf>) -> Self {
        Self {
            global: global.into(),
            project: project.into(),
        }
    }

    /// Global dir as given, project dir as `<root>/.atlcli/logs`
    pub fn for_project_root(global: impl Into<PathBuf>, project_root: &Path) -> Self {
        Self::new(global, project_root.join(PROJECT_DIR_NAME).join("logs"))
    }

    /// Directory for a scope
    pub fn dir(&self, scope: Scope) -> &Path {
        match scope {
            Scope::Global => &self.global,
            Scope::Project => &self.project,
        }
    }
}

/// File name for a given day, e.g. `2024-01-15.jsonl`
pub fn daily_file_name(date: NaiveDate) -> String {
    format!("{}.{}", date.format(DATE_FORMAT), LOG_FILE_EXTENSION)
}

/// Path of the file that receives records written at `now`
pub fn daily_file_path(dir: &Path, now: DateTime<Utc>) -> PathBuf {
    dir.join(daily_file_name(now.date_naive()))
}

/// Date encoded in a daily log file name, `None` for any other file
pub fn file_date(path: &Path) -> Option<NaiveDate> {
    if path.extension()? != LOG_FILE_EXTENSION {
        return None;
    }
    let stem = path.file_stem()?.to_str()?;
    // Only zero-padded names sort correctly by name
    if stem.len() != 10 {
        return None;
    }
    NaiveDate::parse_from_str(stem, DATE_FORMAT).ok()
}

/// Daily log files in `dir`, newest first
///
/// A missing directory yields no files.
pub fn log_files(dir: &Path) -> Vec<PathBuf> {
    let entries = match fs::read_dir(dir) {
        Ok(entries) => entries,
        Err(e) if e.kind() == io::ErrorKind::NotFound => return Vec::new(),
        Err(e) => {
            tracing::warn!(dir = %dir.display(), error = %e, "cannot list log directory");
            return Vec::new();
        }
    };

    let mut files: Vec<PathBuf> = entries
        .filter_map(|entry| entry.ok())
        .map(|entry| entry.path())
        .filter(|path| path.is_file() && file_date(path).is_some())
        .collect();

    sort_newest_first(&mut files);
    tracing::debug!(dir = %dir.display(), count = files.len(), "resolved log files");
    files
}

/// Files for the selected scopes, merged and re-sorted newest first
pub fn resolve_files(paths: &LogPaths, selection: ScopeSelection) -> Vec<PathBuf> {
    let mut files: Vec<PathBuf> = selection
        .scopes()
        .iter()
        .flat_map(|scope| log_files(paths.dir(*scope)))
        .collect();

    if selection == ScopeSelection::Both {
        sort_newest_first(&mut files);
    }
    files
}

/// Files of every scope in scan order: all global files, then all project
/// files, each newest first
pub fn scan_order(paths: &LogPaths) -> Vec<PathBuf> {
    ScopeSelection::Both
        .scopes()
        .iter()
        .flat_map(|scope| log_files(paths.dir(*scope)))
        .collect()
}

fn sort_newest_first(files: &mut [PathBuf]) {
    files.sort_by(|a, b| b.file_name().cmp(&a.file_name()));
}
