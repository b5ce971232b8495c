//! Configuration for the event log commands
//!
//! Settings live in the `[logs]` table of `<root>/config.toml`, where root is
//! `$ATLCLI_HOME` or `~/.atlcli`. Other tables in that file belong to the
//! profile store and are ignored here.

use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use anyhow::{Context, Result};
use serde::Deserialize;

use atlcli_logs::{DEFAULT_POLL_INTERVAL, LogPaths};

/// Environment variable overriding the global root directory
pub const HOME_ENV: &str = "ATLCLI_HOME";

const CONFIG_FILE: &str = "config.toml";

/// `[logs]` settings
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct LogSettings {
    /// Record each invocation as `cli.command` / `cli.result`
    pub enabled: bool,

    /// Follow-mode poll interval in milliseconds
    pub poll_interval_ms: u64,

    /// Default number of entries shown by `tail`
    pub tail_limit: usize,

    /// Default cap for `list` (None = unbounded)
    pub list_limit: Option<usize>,

    /// Override for the global log directory
    pub global_dir: Option<PathBuf>,
}

impl Default for LogSettings {
    fn default() -> Self {
        Self {
            enabled: true,
            poll_interval_ms: DEFAULT_POLL_INTERVAL.as_millis() as u64,
            tail_limit: 20,
            list_limit: None,
            global_dir: None,
        }
    }
}

impl LogSettings {
    pub fn poll_interval(&self) -> Duration {
        Duration::from_millis(self.poll_interval_ms.max(10))
    }
}

#[derive(Debug, Default, Deserialize)]
struct ConfigFile {
    #[serde(default)]
    logs: LogSettings,
}

/// Resolved configuration
#[derive(Debug, Clone)]
pub struct Config {
    /// Global root directory
    pub root: PathBuf,

    pub logs: LogSettings,
}

impl Config {
    /// Global root: `$ATLCLI_HOME`, else `~/.atlcli`
    pub fn root_dir() -> Result<PathBuf> {
        if let Some(dir) = std::env::var_os(HOME_ENV).filter(|v| !v.is_empty()) {
            return Ok(PathBuf::from(dir));
        }
        let home = dirs::home_dir().context("cannot determine home directory")?;
        Ok(home.join(".atlcli"))
    }

    /// Load from the default root
    pub fn load() -> Result<Self> {
        Self::load_from(Self::root_dir()?)
    }

    /// Load `<root>/config.toml`; a missing file yields defaults
    pub fn load_from(root: PathBuf) -> Result<Self> {
        let path = root.join(CONFIG_FILE);
        let file = match fs::read_to_string(&path) {
            Ok(content) => toml::from_str::<ConfigFile>(&content)
                .with_context(|| format!("invalid config file {}", path.display()))?,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => ConfigFile::default(),
            Err(e) => {
                return Err(e).with_context(|| format!("cannot read config file {}", path.display()));
            }
        };
        tracing::debug!(root = %root.display(), "loaded configuration");

        Ok(Self {
            root,
            logs: file.logs,
        })
    }

    /// Directory of the global scope
    pub fn global_log_dir(&self) -> PathBuf {
        self.logs
            .global_dir
            .clone()
            .unwrap_or_else(|| self.root.join("logs"))
    }

    /// Scope directories for a project rooted at `project_root`
    pub fn log_paths(&self, project_root: &Path) -> LogPaths {
        LogPaths::for_project_root(self.global_log_dir(), project_root)
    }
}
