//! Structured observability hooks for the pipeline lifecycle.
//!
//! Events are emitted at `info!`/`warn!` level and carry an `event` field so
//! JSON output (`--json`) can be filtered by event name.

use tracing::info;

/// Span tagging every event of one pipeline run with its run id.
///
/// ```ignore
/// orchestrate().instrument(run_span(&run_id)).await;
/// ```
pub fn run_span(run_id: &str) -> tracing::Span {
    tracing::info_span!("fingerprint.run", run_id = %run_id)
}

/// Emit event: device and architecture chosen for the run.
pub fn emit_device_selected(device: &str, architecture: &str, manual: bool) {
    info!(
        event = "device.selected",
        device = %device,
        architecture = %architecture,
        manual = manual,
    );
}

/// Emit event: pipeline started.
pub fn emit_pipeline_started(run_id: &str, precision: &str, architecture: &str) {
    info!(
        event = "pipeline.started",
        run_id = %run_id,
        precision = %precision,
        architecture = %architecture,
    );
}

/// Emit event: a stage is about to execute.
pub fn emit_stage_started(index: usize, stage: &str) {
    info!(event = "stage.started", index = index, stage = %stage);
}

/// Emit event: a stage finished, successfully or not.
pub fn emit_stage_finished(index: usize, stage: &str, success: bool, duration_ms: u64) {
    if success {
        info!(
            event = "stage.finished",
            index = index,
            stage = %stage,
            success = success,
            duration_ms = duration_ms,
        );
    } else {
        tracing::warn!(
            event = "stage.finished",
            index = index,
            stage = %stage,
            success = success,
            duration_ms = duration_ms,
        );
    }
}

/// Emit event: pipeline reached a terminal state.
pub fn emit_pipeline_finished(run_id: &str, state: &str, stages_run: usize, duration_ms: u64) {
    info!(
        event = "pipeline.finished",
        run_id = %run_id,
        state = %state,
        stages_run = stages_run,
        duration_ms = duration_ms,
    );
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_run_span_create() {
        let _entered = run_span("test-run-id").entered();
        emit_stage_started(1, "compile_kernel");
        emit_stage_finished(1, "compile_kernel", false, 3);
    }
}
