//! Probe pipeline
//!
//! Provides the fail-fast build orchestrator that:
//! - Compiles the CUDA kernel for the resolved architecture
//! - Compiles the host analysis program
//! - Runs the kernel, then the analysis, from the shared output directory
//! - Records every executed stage in an ordered run log

pub mod pipeline;
pub mod runner;
pub mod spec;
pub mod stage;

// Re-export key types
pub use pipeline::{absolute_root, ensure_output_dir, BuildOrchestrator, PipelineState, RunContext, RunLog};
pub use runner::{PipelineResult, ProcessRunner, StageExecutor, StageFailure};
pub use spec::{compute_stages_digest, PipelinePlan};
pub use stage::{BuiltinStage, StageSpec, ToolchainConfig};
