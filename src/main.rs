use std::path::PathBuf;
use std::process::ExitCode;

use anyhow::Result;
use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;

use atlcli_logs::{ClearRequest, ListQuery, LogError, LogLevel, LogStore, Scope, ScopeSelection};

mod commands;
mod config;
mod invocation;
mod output;

use commands::LogContext;
use config::Config;
use invocation::Invocation;
use output::OutputMode;

/// atlcli - Atlassian Cloud from the command line
#[derive(Parser, Debug)]
#[command(name = "atlcli")]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Increase diagnostic verbosity (-v, -vv)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    verbose: u8,

    /// Emit machine-readable JSON
    #[arg(long, global = true)]
    json: bool,

    /// Project root (default: current directory)
    #[arg(long, global = true, value_name = "DIR")]
    project_dir: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Inspect and prune the local event log
    #[command(subcommand)]
    Log(LogCommand),
}

#[derive(Subcommand, Debug)]
enum LogCommand {
    /// List log entries, newest day first
    List {
        /// Only entries at or after this time (30m, 2h, 7d, today, 2024-01-15, ...)
        #[arg(long, value_name = "WHEN")]
        since: Option<String>,

        /// Only entries at or before this time
        #[arg(long, value_name = "WHEN")]
        until: Option<String>,

        /// Only entries with exactly this level (error, warn, info, debug)
        #[arg(long)]
        level: Option<LogLevel>,

        /// Only entries whose type starts with this prefix (e.g. api)
        #[arg(long = "type", value_name = "PREFIX")]
        event_type: Option<String>,

        /// Maximum number of entries
        #[arg(long)]
        limit: Option<usize>,

        #[command(flatten)]
        scope: ScopeArgs,
    },

    /// Show the most recent entries, oldest first
    Tail {
        /// Read the global log instead of the project log
        #[arg(long)]
        global: bool,

        /// Only entries with exactly this level
        #[arg(long)]
        level: Option<LogLevel>,

        /// Number of entries in the initial window
        #[arg(short = 'n', long)]
        limit: Option<usize>,

        /// Keep printing new entries as they are written
        #[arg(short, long)]
        follow: bool,
    },

    /// Show a single entry by id
    Show {
        /// Entry id
        id: Option<String>,
    },

    /// Delete log files
    Clear {
        /// Only delete files dated before this day
        #[arg(long, value_name = "WHEN")]
        before: Option<String>,

        #[command(flatten)]
        scope: ScopeArgs,

        /// Required; nothing is deleted without it
        #[arg(long)]
        confirm: bool,
    },
}

#[derive(clap::Args, Debug)]
struct ScopeArgs {
    /// Only the global log
    #[arg(long, conflicts_with = "project")]
    global: bool,

    /// Only the project log
    #[arg(long)]
    project: bool,
}

impl ScopeArgs {
    fn selection(&self) -> ScopeSelection {
        match (self.global, self.project) {
            (true, _) => ScopeSelection::Global,
            (_, true) => ScopeSelection::Project,
            _ => ScopeSelection::Both,
        }
    }
}

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    let config = match Config::load() {
        Ok(config) => config,
        Err(e) => {
            eprintln!("Error: {e:#}");
            return ExitCode::FAILURE;
        }
    };

    let project_root = match cli.project_dir.clone() {
        Some(dir) => dir,
        None => match std::env::current_dir() {
            Ok(dir) => dir,
            Err(e) => {
                eprintln!("Error: cannot determine current directory: {e}");
                return ExitCode::FAILURE;
            }
        },
    };
    let paths = config.log_paths(&project_root);

    // Bad input is rejected before anything is written, the invocation record included
    let request = match LogRequest::from_command(cli.command) {
        Ok(request) => request,
        Err(e) => {
            eprintln!("Error: {e:#}");
            return ExitCode::from(exit_code(&Err(e)) as u8);
        }
    };

    let invocation = config
        .logs
        .enabled
        .then(|| Invocation::start(&paths, invocation_args()));

    let ctx = LogContext {
        store: LogStore::new(paths),
        settings: config.logs.clone(),
        mode: OutputMode::from_flag(cli.json),
    };
    let result = run(request, &ctx).await;

    let code = exit_code(&result);
    if let Err(e) = &result {
        eprintln!("Error: {e:#}");
    }
    if let Some(invocation) = invocation {
        invocation.finish(code, result.as_ref().err());
    }

    ExitCode::from(code as u8)
}

/// A `log` subcommand whose input has been checked
#[derive(Debug)]
enum LogRequest {
    List(ListQuery),
    Tail {
        scope: Scope,
        level: Option<LogLevel>,
        limit: Option<usize>,
        follow: bool,
    },
    Show(String),
    Clear(ClearRequest),
}

impl LogRequest {
    fn from_command(command: Command) -> Result<Self> {
        let request = match command {
            Command::Log(LogCommand::List {
                since,
                until,
                level,
                event_type,
                limit,
                scope,
            }) => {
                let query = ListQuery {
                    since,
                    until,
                    level,
                    event_type,
                    limit,
                    scope: scope.selection(),
                };
                query.validate()?;
                Self::List(query)
            }

            Command::Log(LogCommand::Tail {
                global,
                level,
                limit,
                follow,
            }) => Self::Tail {
                scope: if global { Scope::Global } else { Scope::Project },
                level,
                limit,
                follow,
            },

            Command::Log(LogCommand::Show { id }) => {
                let id = id
                    .map(|id| id.trim().to_string())
                    .filter(|id| !id.is_empty())
                    .ok_or(LogError::MissingId)?;
                Self::Show(id)
            }

            Command::Log(LogCommand::Clear {
                before,
                scope,
                confirm,
            }) => {
                let request = ClearRequest {
                    before,
                    scope: scope.selection(),
                    confirmed: confirm,
                };
                request.validate()?;
                Self::Clear(request)
            }
        };
        Ok(request)
    }
}

async fn run(request: LogRequest, ctx: &LogContext) -> Result<()> {
    match request {
        LogRequest::List(query) => commands::list(ctx, query),
        LogRequest::Tail {
            scope,
            level,
            limit,
            follow,
        } => commands::tail(ctx, scope, level, limit, follow).await,
        LogRequest::Show(id) => commands::show(ctx, &id),
        LogRequest::Clear(request) => commands::clear(ctx, &request),
    }
}

fn invocation_args() -> Vec<String> {
    std::env::args_os()
        .skip(1)
        .map(|arg| arg.to_string_lossy().into_owned())
        .collect()
}

/// 2 for bad input, 1 for any other failure
fn exit_code(result: &Result<()>) -> i32 {
    match result {
        Ok(()) => 0,
        Err(e) if e.downcast_ref::<LogError>().is_some_and(LogError::is_usage) => 2,
        Err(_) => 1,
    }
}

fn init_tracing(verbose: u8) {
    let filter = env_filter(
        verbose,
        std::env::var("ATLCLI_LOG").ok().as_deref(),
        std::env::var("RUST_LOG").ok().as_deref(),
    );

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

/// `ATLCLI_LOG`, else `RUST_LOG`, else a level picked by `-v`
fn env_filter(verbose: u8, atlcli_log: Option<&str>, rust_log: Option<&str>) -> EnvFilter {
    atlcli_log
        .into_iter()
        .chain(rust_log)
        .filter(|directives| !directives.trim().is_empty())
        .find_map(|directives| EnvFilter::try_new(directives).ok())
        .unwrap_or_else(|| {
            let default_level = match verbose {
                0 => tracing::Level::WARN,
                1 => tracing::Level::INFO,
                _ => tracing::Level::DEBUG,
            };
            EnvFilter::default().add_directive(default_level.into())
        })
}
