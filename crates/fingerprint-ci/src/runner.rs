//! Stage execution.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::io::ErrorKind;
use std::time::{Duration, Instant};
use tokio::process::Command;

use crate::stage::{BuiltinStage, StageSpec};

/// Why a stage did not succeed.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, thiserror::Error)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum StageFailure {
    /// The executable is not installed or not on PATH.
    #[error("{program} not found")]
    ToolNotFound { program: String },

    /// The process ran and exited unsuccessfully. `code` is `None` when it
    /// was terminated by a signal.
    #[error("exited with status {code:?}")]
    ExitStatus { code: Option<i32> },

    /// The executable exists but could not be started.
    #[error("{program} could not be launched: {reason}")]
    Launch { program: String, reason: String },

    /// A configured timeout elapsed and the process was killed.
    #[error("timed out after {secs} seconds")]
    TimedOut { secs: u64 },

    /// The stage's output directory could not be created.
    #[error("failed to create {path}: {reason}")]
    OutputDirectory { path: String, reason: String },
}

impl StageFailure {
    /// Operator-facing diagnostic for this failure in `stage`.
    pub fn diagnostic(&self, stage: BuiltinStage) -> String {
        match self {
            StageFailure::ToolNotFound { program } => stage.not_found_message(program),
            StageFailure::ExitStatus { .. } => stage.failed_message().to_string(),
            StageFailure::TimedOut { secs } => {
                format!("{} (timed out after {secs}s)", stage.failed_message())
            }
            other => format!("{} ({other})", stage.failed_message()),
        }
    }
}

/// Outcome of one executed stage.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PipelineResult {
    /// 1-based stage position.
    pub index: usize,

    /// Stage name.
    pub stage_name: String,

    /// Whether the stage succeeded.
    pub success: bool,

    /// Operator-facing message.
    pub diagnostic: String,

    /// Failure detail; `None` on success.
    pub failure: Option<StageFailure>,

    /// Exit code when the process ran to completion.
    pub exit_code: Option<i32>,

    /// Duration in milliseconds.
    pub duration_ms: u64,
}

impl PipelineResult {
    /// Successful result for `stage`.
    pub fn ok(stage: BuiltinStage, exit_code: Option<i32>, duration_ms: u64) -> Self {
        Self {
            index: stage.index(),
            stage_name: stage.name().to_string(),
            success: true,
            diagnostic: stage.success_message().to_string(),
            failure: None,
            exit_code,
            duration_ms,
        }
    }

    /// Failed result for `stage`.
    pub fn failed(stage: BuiltinStage, failure: StageFailure, duration_ms: u64) -> Self {
        let exit_code = match &failure {
            StageFailure::ExitStatus { code } => *code,
            _ => None,
        };
        Self {
            index: stage.index(),
            stage_name: stage.name().to_string(),
            success: false,
            diagnostic: failure.diagnostic(stage),
            failure: Some(failure),
            exit_code,
            duration_ms,
        }
    }

    /// Whether this stage passed.
    pub fn passed(&self) -> bool {
        self.success
    }

    /// Whether the failure was a missing executable rather than a failed run.
    pub fn is_tool_missing(&self) -> bool {
        matches!(self.failure, Some(StageFailure::ToolNotFound { .. }))
    }
}

/// Executes a single stage.
#[async_trait]
pub trait StageExecutor: Send + Sync {
    async fn execute(&self, spec: &StageSpec) -> PipelineResult;
}

/// Runs stages as child processes with inherited stdio.
///
/// Waits for the child to exit. Without a configured timeout a hung tool
/// blocks the pipeline indefinitely.
#[derive(Debug, Default, Clone, Copy)]
pub struct ProcessRunner;

impl ProcessRunner {
    pub fn new() -> Self {
        Self
    }

    /// Launch the process described by `spec` and wait for it.
    pub async fn run(spec: &StageSpec) -> Result<Option<i32>, StageFailure> {
        let mut child = Command::new(&spec.program)
            .args(&spec.args)
            .current_dir(&spec.working_dir)
            .kill_on_drop(true)
            .spawn()
            .map_err(|e| match e.kind() {
                ErrorKind::NotFound => StageFailure::ToolNotFound {
                    program: spec.program.clone(),
                },
                _ => StageFailure::Launch {
                    program: spec.program.clone(),
                    reason: e.to_string(),
                },
            })?;

        let waited = if spec.timeout_secs > 0 {
            match tokio::time::timeout(Duration::from_secs(spec.timeout_secs), child.wait()).await
            {
                Ok(waited) => waited,
                Err(_) => {
                    let _ = child.kill().await;
                    return Err(StageFailure::TimedOut {
                        secs: spec.timeout_secs,
                    });
                }
            }
        } else {
            child.wait().await
        };

        let status = waited.map_err(|e| StageFailure::Launch {
            program: spec.program.clone(),
            reason: e.to_string(),
        })?;

        if status.success() {
            Ok(status.code())
        } else {
            Err(StageFailure::ExitStatus {
                code: status.code(),
            })
        }
    }
}

#[async_trait]
impl StageExecutor for ProcessRunner {
    async fn execute(&self, spec: &StageSpec) -> PipelineResult {
        let start = Instant::now();
        let outcome = Self::run(spec).await;
        let duration_ms = start.elapsed().as_millis() as u64;

        match outcome {
            Ok(code) => PipelineResult::ok(spec.stage, code, duration_ms),
            Err(failure) => PipelineResult::failed(spec.stage, failure, duration_ms),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::PathBuf;

    fn spec(program: &str, args: &[&str], timeout_secs: u64) -> StageSpec {
        StageSpec {
            stage: BuiltinStage::CompileAnalysis,
            program: program.to_string(),
            args: args.iter().map(|a| a.to_string()).collect(),
            input: PathBuf::from("in"),
            output: PathBuf::from("out"),
            working_dir: std::env::temp_dir(),
            timeout_secs,
        }
    }

    #[test]
    fn test_failed_result_carries_exit_code() {
        let result = PipelineResult::failed(
            BuiltinStage::RunKernel,
            StageFailure::ExitStatus { code: Some(3) },
            10,
        );
        assert!(!result.passed());
        assert_eq!(result.index, 3);
        assert_eq!(result.exit_code, Some(3));
        assert_eq!(result.diagnostic, "Execution of CUDA binary failed.");
        assert!(!result.is_tool_missing());
    }

    #[test]
    fn test_tool_missing_diagnostic() {
        let result = PipelineResult::failed(
            BuiltinStage::CompileKernel,
            StageFailure::ToolNotFound {
                program: "nvcc".to_string(),
            },
            0,
        );
        assert!(result.is_tool_missing());
        assert_eq!(result.diagnostic, "nvcc not found. Check your CUDA path.");
    }

    #[test]
    fn test_failure_serializes_with_kind_tag() {
        let json = serde_json::to_value(StageFailure::TimedOut { secs: 5 }).unwrap();
        assert_eq!(json["kind"], "timed_out");
        assert_eq!(json["secs"], 5);
    }

    #[tokio::test]
    async fn test_missing_program_is_tool_not_found() {
        let result = ProcessRunner
            .execute(&spec("no-such-compiler-fingerprint", &[], 0))
            .await;
        assert!(!result.success);
        assert!(result.is_tool_missing());
        assert!(result.diagnostic.contains("not found"));
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_execute_simple_command() {
        let result = ProcessRunner.execute(&spec("true", &[], 60)).await;
        assert!(result.success);
        assert_eq!(result.exit_code, Some(0));
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_execute_failing_command() {
        let result = ProcessRunner.execute(&spec("false", &[], 0)).await;
        assert!(!result.success);
        assert!(matches!(
            result.failure,
            Some(StageFailure::ExitStatus { code: Some(1) })
        ));
        assert_eq!(result.diagnostic, "C++ compilation failed.");
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_execute_times_out() {
        let result = ProcessRunner.execute(&spec("sleep", &["5"], 1)).await;
        assert!(!result.success);
        assert_eq!(result.failure, Some(StageFailure::TimedOut { secs: 1 }));
    }
}
