//! List and show-by-id over the merged log scopes

use chrono::{DateTime, Utc};

use atlcli_types::{EventRecord, LogLevel, ScopeSelection};

use crate::error::{LogError, LogResult};
use crate::files::{self, LogPaths};
use crate::filter::RecordFilter;
use crate::reader::RecordStream;
use crate::timespec;

/// Options for [`LogStore::list`]; time bounds are unparsed expressions
#[derive(Clone, Debug, Default)]
pub struct ListQuery {
    pub since: Option<String>,
    pub until: Option<String>,
    pub level: Option<LogLevel>,
    pub event_type: Option<String>,
    pub limit: Option<usize>,
    pub scope: ScopeSelection,
}

impl ListQuery {
    /// Resolve time expressions against `now` and build the filter
    pub fn to_filter(&self, now: DateTime<Utc>) -> LogResult<RecordFilter> {
        Ok(RecordFilter::new()
            .with_since(timespec::parse_optional(self.since.as_deref(), now)?)
            .with_until(timespec::parse_optional(self.until.as_deref(), now)?)
            .with_level(self.level)
            .with_type_prefix(self.event_type.clone())
            .with_limit(self.limit))
    }

    /// Reject unparseable time expressions without touching any file
    pub fn validate(&self) -> LogResult<()> {
        self.to_filter(Utc::now()).map(drop)
    }
}

/// Read/delete access to the global and project event logs
#[derive(Clone, Debug)]
pub struct LogStore {
    paths: LogPaths,
}

impl LogStore {
    pub fn new(paths: LogPaths) -> Self {
        Self { paths }
    }

    pub fn paths(&self) -> &LogPaths {
        &self.paths
    }

    /// Lazy record stream over the selected scopes, newest file first
    pub fn records(&self, selection: ScopeSelection) -> RecordStream {
        RecordStream::new(files::resolve_files(&self.paths, selection))
    }

    /// Records matching `query`, newest file first
    ///
    /// Invalid time expressions fail before any file is opened.
    pub fn list(&self, query: &ListQuery) -> LogResult<Vec<EventRecord>> {
        let filter = query.to_filter(Utc::now())?;
        let records: Vec<EventRecord> = filter.apply(self.records(query.scope)).collect();
        tracing::debug!(count = records.len(), scope = ?query.scope, "listed log entries");
        Ok(records)
    }

    /// First record with exactly this id, scanning global then project files
    pub fn show(&self, id: &str) -> LogResult<EventRecord> {
        let id = id.trim();
        if id.is_empty() {
            return Err(LogError::MissingId);
        }

        RecordStream::new(files::scan_order(&self.paths))
            .find(|record| record.id == id)
            .ok_or_else(|| LogError::NotFound(id.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use std::path::Path;

    fn line(id: &str, ts: &str, level: &str, event_type: &str) -> String {
        format!(r#"{{"id":"{id}","timestamp":"{ts}","level":"{level}","type":"{event_type}","sessionId":"s","pid":1,"data":{{}}}}"#)
    }

    fn write(dir: &Path, name: &str, lines: &[String]) {
        fs::create_dir_all(dir).unwrap();
        fs::write(dir.join(name), lines.join("\n") + "\n").unwrap();
    }

    fn store() -> (tempfile::TempDir, LogStore) {
        let dir = tempfile::tempdir().unwrap();
        let paths = LogPaths::new(dir.path().join("global"), dir.path().join("project"));
        write(
            &paths.global,
            "2024-01-14.jsonl",
            &[
                line("g1", "2024-01-14T09:00:00Z", "info", "cli.command"),
                line("g2", "2024-01-14T09:00:01Z", "error", "error"),
            ],
        );
        write(
            &paths.project,
            "2024-01-15.jsonl",
            &[
                line("p1", "2024-01-15T10:00:00Z", "info", "api.request"),
                "garbage".to_string(),
                line("p2", "2024-01-15T10:00:01Z", "debug", "api.response"),
                line("p3", "2024-01-15T10:00:02Z", "info", "auth.change"),
            ],
        );
        (dir, LogStore::new(paths))
    }

    fn ids(records: &[EventRecord]) -> Vec<&str> {
        records.iter().map(|r| r.id.as_str()).collect()
    }

    #[test]
    fn test_list_merges_scopes_newest_file_first() {
        let (_dir, store) = store();
        let all = store.list(&ListQuery::default()).unwrap();
        assert_eq!(ids(&all), ["p1", "p2", "p3", "g1", "g2"]);
    }

    #[test]
    fn test_list_single_scope() {
        let (_dir, store) = store();
        let query = ListQuery {
            scope: ScopeSelection::Global,
            ..Default::default()
        };
        assert_eq!(ids(&store.list(&query).unwrap()), ["g1", "g2"]);
    }

    #[test]
    fn test_list_filters() {
        let (_dir, store) = store();
        let query = ListQuery {
            event_type: Some("api".to_string()),
            ..Default::default()
        };
        assert_eq!(ids(&store.list(&query).unwrap()), ["p1", "p2"]);

        let query = ListQuery {
            level: Some(LogLevel::Info),
            limit: Some(2),
            ..Default::default()
        };
        assert_eq!(ids(&store.list(&query).unwrap()), ["p1", "p3"]);

        let query = ListQuery {
            since: Some("2024-01-15".to_string()),
            until: Some("2024-01-15T10:00:01Z".to_string()),
            ..Default::default()
        };
        assert_eq!(ids(&store.list(&query).unwrap()), ["p1", "p2"]);
    }

    #[test]
    fn test_list_rejects_bad_time_expression() {
        let (_dir, store) = store();
        let query = ListQuery {
            since: Some("???".to_string()),
            ..Default::default()
        };
        let err = store.list(&query).unwrap_err();
        assert!(matches!(err, LogError::InvalidTimeExpression(_)));
        assert!(matches!(query.validate(), Err(LogError::InvalidTimeExpression(_))));

        let query = ListQuery {
            since: Some("7d".to_string()),
            until: Some("today".to_string()),
            ..Default::default()
        };
        assert!(query.validate().is_ok());
    }

    #[test]
    fn test_limit_short_circuits_decoder() {
        let dir = tempfile::tempdir().unwrap();
        let paths = LogPaths::new(dir.path().join("global"), dir.path().join("project"));
        for day in 1..=5 {
            let lines: Vec<String> = (0..100)
                .map(|i| line(&format!("d{day}-{i}"), &format!("2024-01-0{day}T10:00:00Z"), "info", "cli.command"))
                .collect();
            write(&paths.global, &format!("2024-01-0{day}.jsonl"), &lines);
        }
        let store = LogStore::new(paths);
        let filter = RecordFilter::new().with_limit(Some(10));

        let mut stream = store.records(ScopeSelection::Both);
        let got: Vec<_> = filter.apply(stream.by_ref()).collect();
        assert_eq!(got.len(), 10);
        assert_eq!(got[0].id, "d5-0");
        assert!(stream.lines_read() <= 11, "read {} lines", stream.lines_read());
    }

    #[test]
    fn test_show_scans_global_first() {
        let dir = tempfile::tempdir().unwrap();
        let paths = LogPaths::new(dir.path().join("global"), dir.path().join("project"));
        write(&paths.global, "2024-01-01.jsonl", &[line("dup", "2024-01-01T00:00:00Z", "info", "global.copy")]);
        write(&paths.project, "2024-01-09.jsonl", &[
            line("dup", "2024-01-09T00:00:00Z", "info", "project.copy"),
            line("only-project", "2024-01-09T00:00:01Z", "warn", "sync.event"),
        ]);
        let store = LogStore::new(paths);

        assert_eq!(store.show("dup").unwrap().event_type, "global.copy");
        assert_eq!(store.show("only-project").unwrap().level, LogLevel::Warn);
        assert!(matches!(store.show("only"), Err(LogError::NotFound(_))));
        assert!(matches!(store.show("missing"), Err(LogError::NotFound(_))));
        assert!(matches!(store.show("  "), Err(LogError::MissingId)));
    }

    #[test]
    fn test_missing_directories_are_empty() {
        let dir = tempfile::tempdir().unwrap();
        let store = LogStore::new(LogPaths::new(dir.path().join("a"), dir.path().join("b")));
        assert!(store.list(&ListQuery::default()).unwrap().is_empty());
        assert!(matches!(store.show("x"), Err(LogError::NotFound(_))));
    }
}
