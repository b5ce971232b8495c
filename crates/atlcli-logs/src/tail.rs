//! Tail snapshot and polling follow mode
//!
//! Follow mode does not use OS file notifications. A timer tick stats
//! today's file and decodes only the bytes appended since the previous tick.

use std::fs::File;
use std::io::{self, Read, Seek, SeekFrom};
use std::path::{Path, PathBuf};
use std::time::Duration;

use chrono::{DateTime, Utc};
use tokio::sync::mpsc;
use tokio::time::MissedTickBehavior;
use tokio_util::sync::CancellationToken;

use atlcli_types::{EventRecord, Scope};

use crate::files;
use crate::filter::RecordFilter;
use crate::query::LogStore;
use crate::reader::{RecordStream, decode_bytes};

/// Default poll interval for follow mode
pub const DEFAULT_POLL_INTERVAL: Duration = Duration::from_millis(500);

impl LogStore {
    /// Read the tail window of one scope, oldest first
    pub fn tail_snapshot(&self, scope: Scope, filter: &RecordFilter) -> Vec<EventRecord> {
        self.tail_start(scope, filter).0
    }

    /// Tail window of one scope plus the cursor to follow it with
    pub fn tail_start(&self, scope: Scope, filter: &RecordFilter) -> (Vec<EventRecord>, TailCursor) {
        self.tail_start_at(scope, filter, Utc::now())
    }

    /// [`LogStore::tail_start`] with "today" taken from `now`
    ///
    /// Records are taken newest first (files newest first, each file bottom
    /// to top), capped by the filter's limit, then reversed so the window
    /// reads oldest first. Today's file is read once, up to its last complete
    /// line, and the cursor starts exactly there, so nothing appended during
    /// the snapshot is missed or shown twice.
    pub(crate) fn tail_start_at(
        &self,
        scope: Scope,
        filter: &RecordFilter,
        now: DateTime<Utc>,
    ) -> (Vec<EventRecord>, TailCursor) {
        let dir = self.paths().dir(scope);
        let today = files::daily_file_path(dir, now);
        let (mut today_records, offset) = read_complete_lines(&today);
        today_records.reverse();
        let mut today_records = Some(today_records);

        let newest_first = files::log_files(dir).into_iter().flat_map(|path| {
            if path == today {
                today_records.take().unwrap_or_default()
            } else {
                let mut records: Vec<EventRecord> = RecordStream::new(vec![path]).collect();
                records.reverse();
                records
            }
        });
        let mut window: Vec<EventRecord> = filter.apply(newest_first).collect();
        window.reverse();

        let cursor = TailCursor {
            dir: dir.to_path_buf(),
            path: today,
            offset,
        };
        (window, cursor)
    }
}

/// Records on the newline-terminated lines of `path`, and the byte length
/// those lines span
fn read_complete_lines(path: &Path) -> (Vec<EventRecord>, u64) {
    let buf = match std::fs::read(path) {
        Ok(buf) => buf,
        Err(e) => {
            if e.kind() != io::ErrorKind::NotFound {
                tracing::debug!(path = %path.display(), error = %e, "cannot read log file");
            }
            return (Vec::new(), 0);
        }
    };
    let end = buf.iter().rposition(|&b| b == b'\n').map_or(0, |i| i + 1);
    (decode_lines(&buf[..end]), end as u64)
}

fn decode_lines(buf: &[u8]) -> Vec<EventRecord> {
    buf.split(|&b| b == b'\n').filter_map(decode_bytes).collect()
}

/// Byte offset into today's log file
#[derive(Clone, Debug)]
pub struct TailCursor {
    /// Scope directory
    dir: PathBuf,

    /// File the offset refers to
    path: PathBuf,

    /// End of the last complete line consumed
    offset: u64,
}

impl TailCursor {
    /// Start after the last complete line of the file for `now` (0 if absent)
    pub fn at_end(dir: &Path, now: DateTime<Utc>) -> Self {
        let path = files::daily_file_path(dir, now);
        let (_, offset) = read_complete_lines(&path);
        Self {
            dir: dir.to_path_buf(),
            path,
            offset,
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn offset(&self) -> u64 {
        self.offset
    }

    /// One tick: decode records appended since the last call
    ///
    /// Only newline terminated lines are consumed; a trailing partial line
    /// stays unread until the writer completes it. A shrunken file becomes
    /// the new baseline without re-reading. When the day changes, whatever
    /// reached the previous day's file is returned before the new file's
    /// records.
    pub fn poll(&mut self, now: DateTime<Utc>) -> io::Result<Vec<EventRecord>> {
        let today = files::daily_file_path(&self.dir, now);
        if today == self.path {
            return self.read_appended();
        }

        let mut records = self.read_appended().unwrap_or_else(|e| {
            tracing::debug!(path = %self.path.display(), error = %e, "cannot finish previous log day");
            Vec::new()
        });
        tracing::debug!(path = %today.display(), "log day rolled over");
        self.path = today;
        self.offset = 0;

        // The offset only moves on success, so a failed read is retried next tick
        match self.read_appended() {
            Ok(more) => records.extend(more),
            Err(e) => tracing::debug!(path = %self.path.display(), error = %e, "tail poll failed"),
        }
        Ok(records)
    }

    /// Complete lines between the offset and the current end of the file
    fn read_appended(&mut self) -> io::Result<Vec<EventRecord>> {
        let size = match std::fs::metadata(&self.path) {
            Ok(meta) => meta.len(),
            Err(e) if e.kind() == io::ErrorKind::NotFound => return Ok(Vec::new()),
            Err(e) => return Err(e),
        };

        if size <= self.offset {
            self.offset = size;
            return Ok(Vec::new());
        }

        let mut file = File::open(&self.path)?;
        file.seek(SeekFrom::Start(self.offset))?;
        let mut buf = Vec::with_capacity((size - self.offset) as usize);
        file.take(size - self.offset).read_to_end(&mut buf)?;

        let Some(last_newline) = buf.iter().rposition(|&b| b == b'\n') else {
            return Ok(Vec::new());
        };
        self.offset += last_newline as u64 + 1;

        Ok(decode_lines(&buf[..last_newline]))
    }
}

/// Background polling loop for follow mode
pub struct TailFollower {
    /// Cancellation token for stopping the loop
    cancel: CancellationToken,

    /// Poll task handle
    task: Option<tokio::task::JoinHandle<()>>,
}

impl TailFollower {
    /// Spawn the poll loop; matching records are sent in append order
    pub fn start(
        mut cursor: TailCursor,
        filter: RecordFilter,
        interval: Duration,
        tx: mpsc::UnboundedSender<EventRecord>,
    ) -> Self {
        let cancel = CancellationToken::new();
        let token = cancel.clone();
        let filter = filter.live();

        let task = tokio::spawn(async move {
            let mut ticker = tokio::time::interval(interval);
            ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

            loop {
                tokio::select! {
                    _ = token.cancelled() => break,

                    _ = ticker.tick() => {
                        let records = match cursor.poll(Utc::now()) {
                            Ok(records) => records,
                            Err(e) => {
                                tracing::debug!(path = %cursor.path().display(), error = %e, "tail poll failed");
                                continue;
                            }
                        };
                        for record in records.into_iter().filter(|r| filter.matches(r)) {
                            if tx.send(record).is_err() {
                                // Receiver gone, nothing left to follow for
                                return;
                            }
                        }
                    }
                }
            }
        });

        Self {
            cancel,
            task: Some(task),
        }
    }

    /// Token that stops the loop when cancelled
    pub fn cancel_token(&self) -> CancellationToken {
        self.cancel.clone()
    }

    /// Check if the poll loop is still running
    pub fn is_running(&self) -> bool {
        self.task.as_ref().is_some_and(|t| !t.is_finished())
    }

    /// Stop polling and wait for the loop to exit
    pub async fn shutdown(mut self) {
        self.cancel.cancel();
        if let Some(task) = self.task.take() {
            let _ = task.await;
        }
    }
}

impl Drop for TailFollower {
    fn drop(&mut self) {
        self.cancel.cancel();
        if let Some(task) = self.task.take() {
            task.abort();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs::{self, OpenOptions};
    use std::io::Write;

    use atlcli_types::LogLevel;
    use chrono::TimeZone;

    use crate::files::LogPaths;

    fn line(id: &str, level: &str) -> String {
        line_at(id, level, "2024-01-15T10:00:00Z")
    }

    fn line_at(id: &str, level: &str, ts: &str) -> String {
        format!(r#"{{"id":"{id}","timestamp":"{ts}","level":"{level}","type":"cli.command"}}"#)
    }

    fn now() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 1, 15, 12, 0, 0).unwrap()
    }

    fn append(path: &Path, text: &str) {
        let mut f = OpenOptions::new().create(true).append(true).open(path).unwrap();
        f.write_all(text.as_bytes()).unwrap();
        f.flush().unwrap();
    }

    fn ids(records: &[EventRecord]) -> Vec<&str> {
        records.iter().map(|r| r.id.as_str()).collect()
    }

    #[test]
    fn test_snapshot_is_oldest_first() {
        let dir = tempfile::tempdir().unwrap();
        let paths = LogPaths::new(dir.path().join("g"), dir.path().join("p"));
        fs::create_dir_all(&paths.project).unwrap();
        fs::write(
            paths.project.join("2024-01-15.jsonl"),
            format!("{}\n{}\n", line("new1", "info"), line("new2", "error")),
        )
        .unwrap();
        fs::write(
            paths.project.join("2024-01-14.jsonl"),
            format!("{}\n{}\n", line("old1", "info"), line("old2", "info")),
        )
        .unwrap();
        let store = LogStore::new(paths);

        let all = store.tail_snapshot(Scope::Project, &RecordFilter::new());
        assert_eq!(ids(&all), ["old1", "old2", "new1", "new2"]);

        let window = store.tail_snapshot(Scope::Project, &RecordFilter::new().with_limit(Some(3)));
        assert_eq!(ids(&window), ["old2", "new1", "new2"]);

        let errors = store.tail_snapshot(
            Scope::Project,
            &RecordFilter::new().with_level(Some(LogLevel::Error)),
        );
        assert_eq!(ids(&errors), ["new2"]);
        assert!(store.tail_snapshot(Scope::Global, &RecordFilter::new()).is_empty());
    }

    #[test]
    fn test_cursor_starts_at_end() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("2024-01-15.jsonl");
        append(&path, &format!("{}\n", line("before", "info")));

        let mut cursor = TailCursor::at_end(dir.path(), now());
        assert_eq!(cursor.offset(), fs::metadata(&path).unwrap().len());
        assert!(cursor.poll(now()).unwrap().is_empty());

        append(&path, &format!("{}\n{}\n", line("a", "info"), line("b", "warn")));
        assert_eq!(ids(&cursor.poll(now()).unwrap()), ["a", "b"]);
        assert!(cursor.poll(now()).unwrap().is_empty());
    }

    #[test]
    fn test_cursor_missing_file() {
        let dir = tempfile::tempdir().unwrap();
        let mut cursor = TailCursor::at_end(dir.path(), now());
        assert_eq!(cursor.offset(), 0);
        assert!(cursor.poll(now()).unwrap().is_empty());

        append(&dir.path().join("2024-01-15.jsonl"), &format!("{}\n", line("first", "info")));
        assert_eq!(ids(&cursor.poll(now()).unwrap()), ["first"]);
    }

    #[test]
    fn test_cursor_buffers_partial_line() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("2024-01-15.jsonl");
        let mut cursor = TailCursor::at_end(dir.path(), now());

        let full = line("split", "info");
        let (head, tail) = full.split_at(20);
        append(&path, &format!("{}\n{head}", line("whole", "info")));
        assert_eq!(ids(&cursor.poll(now()).unwrap()), ["whole"]);

        append(&path, &format!("{tail}\n"));
        assert_eq!(ids(&cursor.poll(now()).unwrap()), ["split"]);
    }

    #[test]
    fn test_cursor_skips_malformed_lines() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("2024-01-15.jsonl");
        let mut cursor = TailCursor::at_end(dir.path(), now());

        append(&path, &format!("{}\nnot json\n\n{}\n", line("a", "info"), line("b", "info")));
        assert_eq!(ids(&cursor.poll(now()).unwrap()), ["a", "b"]);
    }

    #[test]
    fn test_cursor_shrink_resets_baseline() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("2024-01-15.jsonl");
        append(&path, &format!("{}\n{}\n", line("a", "info"), line("b", "info")));
        let mut cursor = TailCursor::at_end(dir.path(), now());

        let short = format!("{}\n", line("c", "info"));
        fs::write(&path, &short).unwrap();
        assert!(cursor.poll(now()).unwrap().is_empty());
        assert_eq!(cursor.offset(), short.len() as u64);

        append(&path, &format!("{}\n", line("d", "info")));
        assert_eq!(ids(&cursor.poll(now()).unwrap()), ["d"]);
    }

    #[test]
    fn test_snapshot_window_is_latest_of_the_day() {
        let dir = tempfile::tempdir().unwrap();
        let paths = LogPaths::new(dir.path().join("g"), dir.path().join("p"));
        fs::create_dir_all(&paths.project).unwrap();
        let content: String = (0..10)
            .map(|i| line_at(&format!("r{i}"), "info", &format!("2024-01-15T10:00:0{i}Z")) + "\n")
            .collect();
        fs::write(paths.project.join("2024-01-15.jsonl"), content).unwrap();
        let store = LogStore::new(paths);

        let (window, _) = store.tail_start_at(
            Scope::Project,
            &RecordFilter::new().with_limit(Some(3)),
            now(),
        );
        assert_eq!(ids(&window), ["r7", "r8", "r9"]);
        assert!(window.windows(2).all(|w| w[0].timestamp <= w[1].timestamp));
    }

    #[test]
    fn test_tail_start_cursor_continues_after_snapshot() {
        let dir = tempfile::tempdir().unwrap();
        let paths = LogPaths::new(dir.path().join("g"), dir.path().join("p"));
        fs::create_dir_all(&paths.project).unwrap();
        let path = paths.project.join("2024-01-15.jsonl");

        let full = line("split", "info");
        let (head, tail) = full.split_at(20);
        let complete = format!("{}\n{}\n", line("a", "info"), line("b", "info"));
        append(&path, &format!("{complete}{head}"));
        let store = LogStore::new(paths);

        let (window, mut cursor) = store.tail_start_at(Scope::Project, &RecordFilter::new(), now());
        assert_eq!(ids(&window), ["a", "b"]);
        assert_eq!(cursor.path(), path.as_path());
        assert_eq!(cursor.offset(), complete.len() as u64);

        append(&path, &format!("{tail}\n{}\n", line("c", "info")));
        assert_eq!(ids(&cursor.poll(now()).unwrap()), ["split", "c"]);
    }

    #[test]
    fn test_cursor_day_rollover() {
        let dir = tempfile::tempdir().unwrap();
        let old_day = dir.path().join("2024-01-15.jsonl");
        append(&old_day, &format!("{}\n", line("yesterday", "info")));
        let mut cursor = TailCursor::at_end(dir.path(), now());

        // Written just before midnight, after the last tick of the old day
        append(&old_day, &format!("{}\n", line("late", "info")));

        let tomorrow = Utc.with_ymd_and_hms(2024, 1, 16, 0, 0, 1).unwrap();
        append(&dir.path().join("2024-01-16.jsonl"), &format!("{}\n", line("new-day", "info")));
        assert_eq!(ids(&cursor.poll(tomorrow).unwrap()), ["late", "new-day"]);
        assert!(cursor.path().ends_with("2024-01-16.jsonl"));

        append(&old_day, &format!("{}\n", line("stale", "info")));
        assert!(cursor.poll(tomorrow).unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_follower_emits_appended_records() {
        let dir = tempfile::tempdir().unwrap();
        let path = files::daily_file_path(dir.path(), Utc::now());
        append(&path, &format!("{}\n", line("snapshot", "info")));
        let cursor = TailCursor::at_end(dir.path(), Utc::now());

        let (tx, mut rx) = mpsc::unbounded_channel();
        let filter = RecordFilter::new()
            .with_level(Some(LogLevel::Warn))
            .with_limit(Some(1));
        let follower = TailFollower::start(cursor, filter, Duration::from_millis(10), tx);
        assert!(follower.is_running());

        append(
            &path,
            &format!("{}\n{}\n{}\n", line("w1", "warn"), line("i1", "info"), line("w2", "warn")),
        );

        let timeout = Duration::from_secs(5);
        let first = tokio::time::timeout(timeout, rx.recv()).await.unwrap().unwrap();
        let second = tokio::time::timeout(timeout, rx.recv()).await.unwrap().unwrap();
        assert_eq!(first.id, "w1");
        assert_eq!(second.id, "w2");

        follower.shutdown().await;
        assert!(rx.recv().await.is_none());
    }

    #[tokio::test]
    async fn test_follower_stops_on_cancel() {
        let dir = tempfile::tempdir().unwrap();
        let cursor = TailCursor::at_end(dir.path(), Utc::now());
        let (tx, _rx) = mpsc::unbounded_channel();
        let follower = TailFollower::start(cursor, RecordFilter::new(), Duration::from_millis(10), tx);

        follower.cancel_token().cancel();
        tokio::time::timeout(Duration::from_secs(5), follower.shutdown())
            .await
            .unwrap();
    }
}
