//! Agent configuration.
//!
//! Loaded from an optional TOML file with `[engine]`, `[ledger]` and
//! `[executor]` tables, then overridden by `FRICTION_*` environment variables:
//!
//! | Variable                              | Overrides                            |
//! |---------------------------------------|--------------------------------------|
//! | `FRICTION_LEDGER_PATH`                | `ledger.path`                        |
//! | `FRICTION_EXECUTOR_MODE`              | `executor.mode` (`dry_run`/`command`)|
//! | `FRICTION_WORKING_DIR`                | `executor.working_dir`               |
//! | `FRICTION_ALLOWED_PROGRAMS`           | `executor.allowed_programs` (comma)  |
//! | `FRICTION_COMMAND_TIMEOUT_MS`         | `executor.command_timeout_ms`        |
//! | `FRICTION_MAX_CONCURRENT_RESOLUTIONS` | `engine.max_concurrent_resolutions`  |
//! | `FRICTION_MODEL_TIMEOUT_MS`           | `engine.model_timeout_ms`            |

use std::path::{Path, PathBuf};
use std::str::FromStr;
use std::time::Duration;

use anyhow::{bail, Context, Result};
use friction_engine::EngineConfig;
use serde::{Deserialize, Serialize};

/// Programs a `command` executor may launch unless configured otherwise.
const DEFAULT_ALLOWED_PROGRAMS: &[&str] = &["cargo", "git", "make", "just", "npm"];

/// Default timeout for one remedy or rollback command.
const DEFAULT_COMMAND_TIMEOUT_MS: u64 = 120_000;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ExecutorMode {
    /// Record resolutions without touching the workspace.
    #[default]
    DryRun,
    /// Run each solution's automation script.
    Command,
}

impl FromStr for ExecutorMode {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "dry_run" | "dry-run" => Ok(Self::DryRun),
            "command" => Ok(Self::Command),
            other => bail!("unknown executor mode '{other}' (expected dry_run or command)"),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LedgerConfig {
    /// JSONL file; in-memory only when unset.
    pub path: Option<PathBuf>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ExecutorConfig {
    pub mode: ExecutorMode,
    pub working_dir: PathBuf,
    pub allowed_programs: Vec<String>,
    pub command_timeout_ms: u64,
}

impl Default for ExecutorConfig {
    fn default() -> Self {
        Self {
            mode: ExecutorMode::default(),
            working_dir: PathBuf::from("."),
            allowed_programs: DEFAULT_ALLOWED_PROGRAMS
                .iter()
                .map(|p| p.to_string())
                .collect(),
            command_timeout_ms: DEFAULT_COMMAND_TIMEOUT_MS,
        }
    }
}

impl ExecutorConfig {
    pub fn command_timeout(&self) -> Duration {
        Duration::from_millis(self.command_timeout_ms)
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AgentConfig {
    pub engine: EngineConfig,
    pub ledger: LedgerConfig,
    pub executor: ExecutorConfig,
}

impl AgentConfig {
    /// Defaults, then the TOML file if given, then the process environment.
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let mut config = match path {
            Some(path) => Self::from_file(path)?,
            None => Self::default(),
        };
        config.apply_env(|key| std::env::var(key).ok())?;
        config.validate()?;
        Ok(config)
    }

    pub fn from_file(path: &Path) -> Result<Self> {
        let text = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config from {}", path.display()))?;
        toml::from_str(&text)
            .with_context(|| format!("Failed to parse config TOML in {}", path.display()))
    }

    /// Apply `FRICTION_*` overrides read through `lookup`.
    pub fn apply_env(&mut self, lookup: impl Fn(&str) -> Option<String>) -> Result<()> {
        if let Some(path) = lookup("FRICTION_LEDGER_PATH") {
            self.ledger.path = Some(PathBuf::from(path));
        }
        if let Some(mode) = lookup("FRICTION_EXECUTOR_MODE") {
            self.executor.mode = mode.parse()?;
        }
        if let Some(dir) = lookup("FRICTION_WORKING_DIR") {
            self.executor.working_dir = PathBuf::from(dir);
        }
        if let Some(programs) = lookup("FRICTION_ALLOWED_PROGRAMS") {
            self.executor.allowed_programs = programs
                .split(',')
                .map(str::trim)
                .filter(|p| !p.is_empty())
                .map(String::from)
                .collect();
        }
        if let Some(ms) = lookup("FRICTION_COMMAND_TIMEOUT_MS") {
            self.executor.command_timeout_ms = parse_number("FRICTION_COMMAND_TIMEOUT_MS", &ms)?;
        }
        if let Some(n) = lookup("FRICTION_MAX_CONCURRENT_RESOLUTIONS") {
            self.engine.max_concurrent_resolutions =
                parse_number("FRICTION_MAX_CONCURRENT_RESOLUTIONS", &n)?;
        }
        if let Some(ms) = lookup("FRICTION_MODEL_TIMEOUT_MS") {
            self.engine.model_timeout_ms = parse_number("FRICTION_MODEL_TIMEOUT_MS", &ms)?;
        }
        Ok(())
    }

    pub fn validate(&self) -> Result<()> {
        self.engine.validate()?;
        if self.executor.command_timeout_ms == 0 {
            bail!("executor.command_timeout_ms must be greater than zero");
        }
        if self.executor.mode == ExecutorMode::Command {
            if self.executor.allowed_programs.is_empty() {
                bail!("executor.allowed_programs is empty; the command executor could run nothing");
            }
            // A remedy may spend one command timeout applying and another rolling
            // back, and both must finish before the gate abandons the attempt.
            let worst_case = self.executor.command_timeout_ms.saturating_mul(2);
            if worst_case >= self.engine.execution_timeout_ms {
                bail!(
                    "executor.command_timeout_ms ({}) leaves no room for a rollback within \
                     engine.execution_timeout_ms ({}); twice the command timeout must be lower",
                    self.executor.command_timeout_ms,
                    self.engine.execution_timeout_ms
                );
            }
        }
        Ok(())
    }
}

fn parse_number<T>(key: &str, value: &str) -> Result<T>
where
    T: FromStr,
    T::Err: std::error::Error + Send + Sync + 'static,
{
    value
        .trim()
        .parse()
        .with_context(|| format!("{key} must be a number, got '{value}'"))
}
