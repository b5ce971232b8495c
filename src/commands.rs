//! Handlers for `atlcli log ...`

use anyhow::Result;
use tokio::sync::mpsc;

use atlcli_logs::{
    ClearRequest, EventRecord, ListQuery, LogLevel, LogStore, RecordFilter, Scope,
    TailFollower,
};

use crate::config::LogSettings;
use crate::output::{self, OutputMode};

/// Shared state for log command handlers
pub struct LogContext {
    pub store: LogStore,
    pub settings: LogSettings,
    pub mode: OutputMode,
}

pub fn list(ctx: &LogContext, mut query: ListQuery) -> Result<()> {
    if query.limit.is_none() {
        query.limit = ctx.settings.list_limit;
    }
    let records = ctx.store.list(&query)?;
    output::print_records(ctx.mode, &records)
}

pub fn show(ctx: &LogContext, id: &str) -> Result<()> {
    let record = ctx.store.show(id)?;
    output::print_record(ctx.mode, &record)
}

pub fn clear(ctx: &LogContext, request: &ClearRequest) -> Result<()> {
    let deleted = ctx.store.clear(request)?;
    output::print_cleared(ctx.mode, deleted)
}

/// Print the tail window and, when following, stream new records until
/// Ctrl-C
pub async fn tail(
    ctx: &LogContext,
    scope: Scope,
    level: Option<LogLevel>,
    limit: Option<usize>,
    follow: bool,
) -> Result<()> {
    let filter = RecordFilter::new()
        .with_level(level)
        .with_limit(Some(limit.unwrap_or(ctx.settings.tail_limit)));

    let (snapshot, cursor) = ctx.store.tail_start(scope, &filter);
    if follow && ctx.mode == OutputMode::Human {
        for record in &snapshot {
            output::print_live(ctx.mode, record)?;
        }
    } else {
        output::print_records(ctx.mode, &snapshot)?;
    }
    if !follow {
        return Ok(());
    }

    tracing::debug!(path = %cursor.path().display(), offset = cursor.offset(), "following log");
    let (tx, mut rx) = mpsc::unbounded_channel();
    let follower = TailFollower::start(cursor, filter, ctx.settings.poll_interval(), tx);

    let interrupted = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            tracing::warn!(error = %e, "cannot listen for Ctrl-C");
        }
    };
    let result = print_until(ctx.mode, &mut rx, interrupted).await;

    follower.shutdown().await;
    result.map(|printed| tracing::debug!(printed, "stopped following log"))
}

/// Print live records until `stop` resolves or the channel closes,
/// returning how many were printed
async fn print_until<F>(
    mode: OutputMode,
    rx: &mut mpsc::UnboundedReceiver<EventRecord>,
    stop: F,
) -> Result<usize>
where
    F: Future<Output = ()>,
{
    tokio::pin!(stop);
    let mut printed = 0;
    loop {
        tokio::select! {
            _ = &mut stop => return Ok(printed),

            maybe = rx.recv() => match maybe {
                Some(record) => {
                    output::print_live(mode, &record)?;
                    printed += 1;
                }
                None => return Ok(printed),
            },
        }
    }
}
