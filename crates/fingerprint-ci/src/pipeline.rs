//! Fail-fast orchestration of the four probe stages.

use chrono::{DateTime, Utc};
use fingerprint_core::{
    emit_pipeline_finished, emit_pipeline_started, emit_stage_finished, emit_stage_started,
    run_span, ArchitectureId, Precision, ProjectLayout, Reporter,
};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Instant;
use tracing::{debug, info, warn, Instrument};
use uuid::Uuid;

use crate::runner::{PipelineResult, StageExecutor, StageFailure};
use crate::spec::PipelinePlan;
use crate::stage::{BuiltinStage, StageSpec, ToolchainConfig};

/// Orchestrator state.
///
/// `Init → CompilingA → CompilingB → RunningA → RunningB → Done`, with
/// `Aborted` reachable from every stage state and absorbing.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PipelineState {
    Init,
    CompilingA,
    CompilingB,
    RunningA,
    RunningB,
    Done,
    Aborted,
}

impl PipelineState {
    pub fn as_str(&self) -> &'static str {
        match self {
            PipelineState::Init => "init",
            PipelineState::CompilingA => "compiling_a",
            PipelineState::CompilingB => "compiling_b",
            PipelineState::RunningA => "running_a",
            PipelineState::RunningB => "running_b",
            PipelineState::Done => "done",
            PipelineState::Aborted => "aborted",
        }
    }

    /// Stage executed while in this state.
    pub fn stage(&self) -> Option<BuiltinStage> {
        match self {
            PipelineState::CompilingA => Some(BuiltinStage::CompileKernel),
            PipelineState::CompilingB => Some(BuiltinStage::CompileAnalysis),
            PipelineState::RunningA => Some(BuiltinStage::RunKernel),
            PipelineState::RunningB => Some(BuiltinStage::RunAnalysis),
            _ => None,
        }
    }

    /// Successor after the current stage succeeded. Terminal states map to
    /// themselves.
    pub fn advance(&self) -> PipelineState {
        match self {
            PipelineState::Init => PipelineState::CompilingA,
            PipelineState::CompilingA => PipelineState::CompilingB,
            PipelineState::CompilingB => PipelineState::RunningA,
            PipelineState::RunningA => PipelineState::RunningB,
            PipelineState::RunningB => PipelineState::Done,
            PipelineState::Done => PipelineState::Done,
            PipelineState::Aborted => PipelineState::Aborted,
        }
    }

    /// Check if a transition to `next` is valid.
    pub fn can_transition_to(&self, next: PipelineState) -> bool {
        if self.is_terminal() {
            return false;
        }
        if next == PipelineState::Aborted {
            return self.stage().is_some();
        }
        self.advance() == next
    }

    pub fn is_terminal(&self) -> bool {
        matches!(self, PipelineState::Done | PipelineState::Aborted)
    }
}

/// Working directory the next stage runs in.
///
/// Starts at the project root and switches once, to the output directory,
/// before the first run stage. The process's own current directory is never
/// touched.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RunContext {
    working_dir: PathBuf,
    switched: bool,
}

impl RunContext {
    pub fn new(root: &Path) -> Self {
        Self {
            working_dir: root.to_path_buf(),
            switched: false,
        }
    }

    pub fn working_dir(&self) -> &Path {
        &self.working_dir
    }

    /// Switch to `dir`. Returns `false` if the switch already happened.
    pub fn switch_to(&mut self, dir: &Path) -> bool {
        if self.switched {
            return false;
        }
        self.working_dir = dir.to_path_buf();
        self.switched = true;
        true
    }
}

/// Ordered record of a pipeline run.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RunLog {
    pub run_id: Uuid,
    pub started_at: DateTime<Utc>,
    pub finished_at: DateTime<Utc>,
    pub precision: Precision,
    pub architecture: ArchitectureId,
    pub device: String,

    /// Digest of the planned stage invocations.
    pub stages_digest: String,

    /// Terminal state, `Done` or `Aborted`.
    pub state: PipelineState,

    /// One entry per executed stage, in execution order.
    pub results: Vec<PipelineResult>,

    pub duration_ms: u64,
}

impl RunLog {
    /// Whether all four stages ran and passed.
    pub fn succeeded(&self) -> bool {
        self.state == PipelineState::Done
    }

    /// Process exit status for this run.
    pub fn exit_code(&self) -> i32 {
        if self.succeeded() {
            0
        } else {
            1
        }
    }

    /// Number of stages that passed.
    pub fn passed_count(&self) -> usize {
        self.results.iter().filter(|r| r.passed()).count()
    }

    /// Number of stages that failed (0 or 1).
    pub fn failed_count(&self) -> usize {
        self.results.iter().filter(|r| !r.passed()).count()
    }

    /// The stage that aborted the run, if any.
    pub fn failure(&self) -> Option<&PipelineResult> {
        self.results.iter().find(|r| !r.passed())
    }
}

/// Create `dir` if missing. Returns whether it was created.
pub async fn ensure_output_dir(dir: &Path) -> std::io::Result<bool> {
    if tokio::fs::metadata(dir).await.map(|m| m.is_dir()).unwrap_or(false) {
        return Ok(false);
    }
    tokio::fs::create_dir_all(dir).await?;
    Ok(true)
}

/// Anchor a relative `root` at the current directory.
///
/// Compile stages run inside the root and run stages inside `<root>/<p>/lib`,
/// so every path handed to a stage has to be absolute.
pub fn absolute_root(root: &Path) -> std::io::Result<PathBuf> {
    if root.is_absolute() {
        return Ok(root.to_path_buf());
    }
    Ok(std::env::current_dir()?.join(root))
}

/// Drives compile-kernel, compile-analysis, run-kernel, run-analysis in
/// that order, stopping at the first failure.
pub struct BuildOrchestrator {
    root: PathBuf,
    toolchain: ToolchainConfig,
    executor: Arc<dyn StageExecutor>,
    reporter: Arc<dyn Reporter>,
}

impl BuildOrchestrator {
    pub fn new(
        root: impl Into<PathBuf>,
        toolchain: ToolchainConfig,
        executor: Arc<dyn StageExecutor>,
        reporter: Arc<dyn Reporter>,
    ) -> Self {
        Self {
            root: root.into(),
            toolchain,
            executor,
            reporter,
        }
    }

    /// Run the pipeline for `precision` targeting `architecture`.
    ///
    /// Never returns early: failures end up in the returned [`RunLog`] with
    /// state [`PipelineState::Aborted`].
    pub async fn run(
        &self,
        precision: Precision,
        architecture: &ArchitectureId,
        device_label: &str,
    ) -> RunLog {
        let run_id = Uuid::new_v4();
        let span = run_span(&run_id.to_string());
        self.run_stages(run_id, precision, architecture, device_label)
            .instrument(span)
            .await
    }

    async fn run_stages(
        &self,
        run_id: Uuid,
        precision: Precision,
        architecture: &ArchitectureId,
        device_label: &str,
    ) -> RunLog {
        let start = Instant::now();
        let started_at = Utc::now();

        let root = match absolute_root(&self.root) {
            Ok(root) => root,
            Err(e) => {
                warn!(root = %self.root.display(), error = %e, "could not anchor project root");
                self.root.clone()
            }
        };
        let layout = ProjectLayout::new(&root, precision);
        let plan = PipelinePlan::new(&layout, architecture, &self.toolchain);
        emit_pipeline_started(&run_id.to_string(), precision.as_str(), architecture.as_str());
        debug!(digest = %plan.short_digest(), device = %device_label, "pipeline planned");

        let mut ctx = RunContext::new(&root);
        let mut results = Vec::with_capacity(BuiltinStage::ORDER.len());
        let mut state = PipelineState::Init.advance();

        while let Some(stage) = state.stage() {
            let spec = &plan.stages[stage.index() - 1];
            debug_assert_eq!(spec.stage, stage);
            let result = self.enter(spec, &layout, &mut ctx).await;
            let passed = result.passed();
            results.push(result);

            let next = if passed {
                state.advance()
            } else {
                PipelineState::Aborted
            };
            debug_assert!(state.can_transition_to(next));
            debug!(from = state.as_str(), to = next.as_str(), "pipeline transition");
            state = next;
        }

        let duration_ms = start.elapsed().as_millis() as u64;
        emit_pipeline_finished(&run_id.to_string(), state.as_str(), results.len(), duration_ms);

        if state == PipelineState::Done {
            self.reporter.step("Automation Complete.");
        } else {
            info!(run_id = %run_id, "pipeline aborted");
        }

        RunLog {
            run_id,
            started_at,
            finished_at: Utc::now(),
            precision,
            architecture: architecture.clone(),
            device: device_label.to_string(),
            stages_digest: plan.stages_digest,
            state,
            results,
            duration_ms,
        }
    }

    /// Execute `spec`: switch context if it is the first run stage, make
    /// sure the output directory exists, then run its planned spec.
    async fn enter(
        &self,
        spec: &StageSpec,
        layout: &ProjectLayout,
        ctx: &mut RunContext,
    ) -> PipelineResult {
        let stage = spec.stage;
        if stage.is_run() && ctx.switch_to(&layout.lib_dir) {
            self.reporter.step("Running Analysis...");
            self.reporter.info(&format!(
                "Changed working directory to: {}",
                ctx.working_dir().display()
            ));
        }

        if stage.is_run() {
            self.reporter.heading(&stage.title(layout.precision));
        } else {
            self.reporter.step(&stage.title(layout.precision));
        }

        match ensure_output_dir(&layout.lib_dir).await {
            Ok(true) => self
                .reporter
                .success(&format!("Created directory: {}", layout.lib_dir.display())),
            Ok(false) => {}
            Err(e) => {
                let result = PipelineResult::failed(
                    stage,
                    StageFailure::OutputDirectory {
                        path: layout.lib_dir.display().to_string(),
                        reason: e.to_string(),
                    },
                    0,
                );
                self.reporter.error(&result.diagnostic);
                return result;
            }
        }

        debug_assert_eq!(spec.working_dir, ctx.working_dir());
        if !stage.is_run() {
            self.reporter
                .info(&format!("Executing: {}", spec.command_line()));
        }

        emit_stage_started(stage.index(), stage.name());
        let result = self.executor.execute(spec).await;
        emit_stage_finished(stage.index(), stage.name(), result.success, result.duration_ms);

        if result.success {
            if !stage.is_run() {
                self.reporter.success(&result.diagnostic);
            }
        } else {
            self.reporter.error(&result.diagnostic);
        }
        result
    }
}
