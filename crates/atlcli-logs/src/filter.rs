use chrono::{DateTime, Utc};

use atlcli_types::{EventRecord, LogLevel};

/// Record predicate plus result cap, applied while streaming
#[derive(Clone, Debug, Default, PartialEq)]
pub struct RecordFilter {
    /// Inclusive lower bound on timestamp
    since: Option<DateTime<Utc>>,

    /// Inclusive upper bound on timestamp
    until: Option<DateTime<Utc>>,

    /// Exact level match
    level: Option<LogLevel>,

    /// Prefix of the record type
    type_prefix: Option<String>,

    /// Maximum records to yield (None = unbounded)
    limit: Option<usize>,
}

impl RecordFilter {
    /// Filter that matches everything
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_since(mut self, since: Option<DateTime<Utc>>) -> Self {
        self.since = since;
        self
    }

    pub fn with_until(mut self, until: Option<DateTime<Utc>>) -> Self {
        self.until = until;
        self
    }

    pub fn with_level(mut self, level: Option<LogLevel>) -> Self {
        self.level = level;
        self
    }

    pub fn with_type_prefix(mut self, prefix: Option<String>) -> Self {
        self.type_prefix = prefix.filter(|p| !p.is_empty());
        self
    }

    pub fn with_limit(mut self, limit: Option<usize>) -> Self {
        self.limit = limit;
        self
    }

    /// Only the level criterion; used for records arriving in follow mode
    pub fn live(&self) -> Self {
        Self::new().with_level(self.level)
    }

    pub fn limit(&self) -> Option<usize> {
        self.limit
    }

    /// Check if a record passes every criterion (the limit is not a criterion)
    pub fn matches(&self, record: &EventRecord) -> bool {
        if self.since.is_some_and(|since| record.timestamp < since) {
            return false;
        }

        if self.until.is_some_and(|until| record.timestamp > until) {
            return false;
        }

        if self.level.is_some_and(|level| record.level != level) {
            return false;
        }

        match &self.type_prefix {
            Some(prefix) => record.event_type.starts_with(prefix.as_str()),
            None => true,
        }
    }

    /// Filter and cap a record stream
    ///
    /// Stops pulling from `records` as soon as the limit is reached.
    pub fn apply<I>(&self, records: I) -> impl Iterator<Item = EventRecord>
    where
        I: Iterator<Item = EventRecord>,
    {
        records
            .filter(move |record| self.matches(record))
            .take(self.limit.unwrap_or(usize::MAX))
    }

    /// Check if filter is empty (matches everything, no cap)
    pub fn is_empty(&self) -> bool {
        self == &Self::default()
    }
}
