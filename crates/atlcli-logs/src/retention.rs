//! Whole-file deletion of old daily logs

use std::fs;
use std::io;

use chrono::{DateTime, NaiveDate, Utc};

use atlcli_types::ScopeSelection;

use crate::error::{LogError, LogResult};
use crate::files;
use crate::query::LogStore;
use crate::timespec;

/// Options for [`LogStore::clear`]
#[derive(Clone, Debug, Default)]
pub struct ClearRequest {
    /// Keep files dated on or after this expression's day
    pub before: Option<String>,
    pub scope: ScopeSelection,
    /// Deletion is refused unless set
    pub confirmed: bool,
}

impl ClearRequest {
    /// Day before which files are deleted (None = all), once the request is
    /// known to be confirmed
    pub fn cutoff(&self, now: DateTime<Utc>) -> LogResult<Option<NaiveDate>> {
        let cutoff = timespec::parse_optional(self.before.as_deref(), now)?
            .map(|instant| instant.date_naive());
        if !self.confirmed {
            return Err(LogError::ConfirmationRequired);
        }
        Ok(cutoff)
    }

    /// Check the request without touching any file
    pub fn validate(&self) -> LogResult<()> {
        self.cutoff(Utc::now()).map(drop)
    }
}

impl LogStore {
    /// Delete daily files from the selected scopes, returning how many were
    /// removed
    ///
    /// Without a cutoff every daily file goes. Missing directories count as
    /// empty.
    pub fn clear(&self, request: &ClearRequest) -> LogResult<usize> {
        let cutoff = request.cutoff(Utc::now())?;

        let mut deleted = 0;
        for scope in request.scope.scopes() {
            for path in files::log_files(self.paths().dir(*scope)) {
                let Some(date) = files::file_date(&path) else {
                    continue;
                };
                if cutoff.is_some_and(|cutoff| date >= cutoff) {
                    continue;
                }

                match fs::remove_file(&path) {
                    Ok(()) => {
                        tracing::info!(scope = %scope, path = %path.display(), "deleted log file");
                        deleted += 1;
                    }
                    Err(e) if e.kind() == io::ErrorKind::NotFound => {}
                    Err(e) => return Err(LogError::io(path, e)),
                }
            }
        }

        Ok(deleted)
    }
}
