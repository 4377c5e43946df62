//! Solution executors.
//!
//! [`CommandExecutor`] runs a remedy's automation script inside the working
//! directory. Only allowlisted programs run, each bounded by a timeout; a
//! failed application triggers the solution's rollback script when it has one.
//! [`DryRunExecutor`] records what would have run and touches nothing.

use std::path::{Path, PathBuf};
use std::process::Output;
use std::sync::Arc;
use std::time::{Duration, Instant};

use async_trait::async_trait;
use friction_engine::{
    DetectedFriction, FrictionResolution, SolutionExecutor, SolutionRecommendation,
};
use tracing::{info, warn};
use uuid::Uuid;

use crate::config::{ExecutorConfig, ExecutorMode};

#[derive(Debug, thiserror::Error)]
pub enum CommandError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("solution {0} has no automation script")]
    MissingScript(Uuid),

    #[error("command `{command}` could not be parsed")]
    Unparseable { command: String },

    #[error("command `{command}` not in allowlist")]
    NotAllowed { command: String },

    #[error("command timed out after {timeout_ms}ms")]
    Timeout { timeout_ms: u64 },
}

/// A script split into program and arguments, already checked against the allowlist.
#[derive(Debug, Clone, PartialEq, Eq)]
struct ParsedCommand {
    program: String,
    args: Vec<String>,
}

pub struct CommandExecutor {
    working_dir: PathBuf,
    allowed_programs: Vec<String>,
    timeout: Duration,
}

impl CommandExecutor {
    pub fn new(working_dir: &Path, allowed_programs: Vec<String>, timeout: Duration) -> Self {
        Self {
            working_dir: working_dir.to_path_buf(),
            allowed_programs,
            timeout,
        }
    }

    pub fn from_config(config: &ExecutorConfig) -> Self {
        Self::new(
            &config.working_dir,
            config.allowed_programs.clone(),
            config.command_timeout(),
        )
    }

    fn parse(&self, command: &str) -> Result<ParsedCommand, CommandError> {
        let mut parts = shlex::split(command)
            .filter(|parts| !parts.is_empty())
            .ok_or_else(|| CommandError::Unparseable {
                command: command.to_string(),
            })?;
        let program = parts.remove(0);
        if !self.allowed_programs.iter().any(|p| *p == program) {
            return Err(CommandError::NotAllowed { command: program });
        }
        Ok(ParsedCommand {
            program,
            args: parts,
        })
    }

    async fn run(&self, command: &ParsedCommand) -> Result<Output, CommandError> {
        let child = tokio::process::Command::new(&command.program)
            .args(&command.args)
            .current_dir(&self.working_dir)
            .kill_on_drop(true)
            .output();

        match tokio::time::timeout(self.timeout, child).await {
            Ok(output) => Ok(output?),
            Err(_) => Err(CommandError::Timeout {
                timeout_ms: self.timeout.as_millis() as u64,
            }),
        }
    }

    /// Run the rollback script, reporting whether it completed successfully.
    async fn roll_back(
        &self,
        solution: &SolutionRecommendation,
        rollback: Option<&ParsedCommand>,
    ) -> bool {
        let Some(rollback) = rollback else {
            return false;
        };
        match self.run(rollback).await {
            Ok(output) if output.status.success() => {
                info!(solution_id = %solution.id, "Rollback completed");
                true
            }
            Ok(output) => {
                let stderr = String::from_utf8_lossy(&output.stderr);
                warn!(
                    solution_id = %solution.id,
                    exit_code = output.status.code().unwrap_or(-1),
                    stderr = %stderr.trim(),
                    "Rollback script failed"
                );
                false
            }
            Err(e) => {
                warn!(solution_id = %solution.id, error = %e, "Rollback script did not run");
                false
            }
        }
    }
}

#[async_trait]
impl SolutionExecutor for CommandExecutor {
    async fn implement_solution(
        &self,
        friction: &DetectedFriction,
        solution: &SolutionRecommendation,
    ) -> anyhow::Result<FrictionResolution> {
        let script = solution
            .automation_script
            .as_deref()
            .ok_or(CommandError::MissingScript(solution.id))?;
        let apply = self.parse(script)?;
        // Refuse up front if the undo path could never run.
        let rollback = solution
            .rollback_script
            .as_deref()
            .map(|s| self.parse(s))
            .transpose()?;

        let start = Instant::now();
        let failure = match self.run(&apply).await {
            Ok(output) if output.status.success() => {
                info!(
                    friction_id = %friction.id,
                    solution_id = %solution.id,
                    program = %apply.program,
                    elapsed_ms = start.elapsed().as_millis() as u64,
                    "Remedy applied"
                );
                return Ok(FrictionResolution::succeeded(
                    friction.id,
                    solution.id,
                    solution.solution_type.clone(),
                    start.elapsed(),
                ));
            }
            Ok(output) => format!(
                "exit {}: {}",
                output.status.code().unwrap_or(-1),
                String::from_utf8_lossy(&output.stderr).trim()
            ),
            Err(e @ CommandError::Timeout { .. }) => e.to_string(),
            Err(e) => return Err(e.into()),
        };

        warn!(
            friction_id = %friction.id,
            solution_id = %solution.id,
            program = %apply.program,
            failure = %failure,
            "Remedy failed"
        );
        let rolled_back = self.roll_back(solution, rollback.as_ref()).await;
        Ok(FrictionResolution::failed(
            friction.id,
            solution.id,
            solution.solution_type.clone(),
            start.elapsed(),
            rolled_back,
        ))
    }
}

/// Records resolutions without running anything.
#[derive(Debug, Default, Clone, Copy)]
pub struct DryRunExecutor;

#[async_trait]
impl SolutionExecutor for DryRunExecutor {
    async fn implement_solution(
        &self,
        friction: &DetectedFriction,
        solution: &SolutionRecommendation,
    ) -> anyhow::Result<FrictionResolution> {
        info!(
            friction_id = %friction.id,
            friction_type = %friction.friction_type,
            solution_id = %solution.id,
            script = solution.automation_script.as_deref().unwrap_or("<none>"),
            "Dry run, remedy not applied"
        );
        Ok(FrictionResolution::succeeded(
            friction.id,
            solution.id,
            solution.solution_type.clone(),
            Duration::ZERO,
        ))
    }
}

pub fn from_config(config: &ExecutorConfig) -> Arc<dyn SolutionExecutor> {
    match config.mode {
        ExecutorMode::DryRun => Arc::new(DryRunExecutor),
        ExecutorMode::Command => Arc::new(CommandExecutor::from_config(config)),
    }
}

#[cfg(test)]
mod tests {
    use friction_engine::{FrictionSource, FrictionType, RiskLevel, SolutionType};

    use super::*;

    fn executor(dir: &Path) -> CommandExecutor {
        CommandExecutor::new(
            dir,
            vec!["true".into(), "false".into(), "touch".into(), "sleep".into()],
            Duration::from_secs(10),
        )
    }

    fn friction() -> DetectedFriction {
        DetectedFriction::new(
            FrictionType::RepetitiveTask,
            FrictionSource::Pattern,
            0.5,
            0.5,
            0.5,
        )
    }

    fn solution(apply: &str, rollback: Option<&str>) -> SolutionRecommendation {
        SolutionRecommendation::new(SolutionType::Automation, 0.9, RiskLevel::Low)
            .with_scripts(apply, rollback.map(String::from))
    }

    #[test]
    fn parse_splits_quoted_arguments() {
        let exec = executor(Path::new("."));
        let parsed = exec.parse(r#"touch "with space.txt" plain"#).unwrap();
        assert_eq!(parsed.program, "touch");
        assert_eq!(parsed.args, ["with space.txt", "plain"]);
    }

    #[test]
    fn parse_rejects_programs_outside_allowlist() {
        let exec = executor(Path::new("."));
        assert!(matches!(
            exec.parse("rm -rf target"),
            Err(CommandError::NotAllowed { command }) if command == "rm"
        ));
        assert!(matches!(
            exec.parse("touch \"unterminated"),
            Err(CommandError::Unparseable { .. })
        ));
        assert!(matches!(exec.parse("   "), Err(CommandError::Unparseable { .. })));
    }

    #[tokio::test]
    async fn successful_script_resolves_in_working_dir() {
        let dir = tempfile::tempdir().unwrap();
        let friction = friction();
        let resolution = executor(dir.path())
            .implement_solution(&friction, &solution("touch applied.marker", None))
            .await
            .unwrap();

        assert!(resolution.success);
        assert_eq!(resolution.friction_id, friction.id);
        assert!(dir.path().join("applied.marker").exists());
    }

    #[tokio::test]
    async fn failed_script_runs_rollback() {
        let dir = tempfile::tempdir().unwrap();
        let resolution = executor(dir.path())
            .implement_solution(&friction(), &solution("false", Some("touch rolled.back")))
            .await
            .unwrap();

        assert!(!resolution.success);
        assert!(resolution.rolled_back);
        assert!(dir.path().join("rolled.back").exists());
    }

    #[tokio::test]
    async fn failed_script_without_rollback_is_not_rolled_back() {
        let dir = tempfile::tempdir().unwrap();
        let resolution = executor(dir.path())
            .implement_solution(&friction(), &solution("false", None))
            .await
            .unwrap();
        assert!(!resolution.success);
        assert!(!resolution.rolled_back);
    }

    #[tokio::test]
    async fn timed_out_script_counts_as_failed_application() {
        let dir = tempfile::tempdir().unwrap();
        let exec = CommandExecutor::new(
            dir.path(),
            vec!["sleep".into(), "true".into()],
            Duration::from_millis(100),
        );
        let resolution = exec
            .implement_solution(&friction(), &solution("sleep 5", Some("true")))
            .await
            .unwrap();
        assert!(!resolution.success);
        assert!(resolution.rolled_back);
    }

    #[tokio::test]
    async fn disallowed_rollback_refuses_before_applying() {
        let dir = tempfile::tempdir().unwrap();
        let err = executor(dir.path())
            .implement_solution(
                &friction(),
                &solution("touch applied.marker", Some("git checkout .")),
            )
            .await
            .unwrap_err();
        assert!(err.to_string().contains("not in allowlist"));
        assert!(!dir.path().join("applied.marker").exists());
    }

    #[tokio::test]
    async fn missing_script_is_an_error() {
        let exec = executor(Path::new("."));
        let plain = SolutionRecommendation::new(SolutionType::Automation, 0.9, RiskLevel::Low);
        let err = exec
            .implement_solution(&friction(), &plain)
            .await
            .unwrap_err();
        assert!(err.to_string().contains("no automation script"));
    }

    #[tokio::test]
    async fn dry_run_always_succeeds() {
        let friction = friction();
        let resolution = DryRunExecutor
            .implement_solution(&friction, &solution("cargo clean", None))
            .await
            .unwrap();
        assert!(resolution.success);
        assert_eq!(resolution.time_taken(), Duration::ZERO);
    }
}
