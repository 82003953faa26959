//! Pipeline plan and identity.

use fingerprint_core::{ArchitectureId, ProjectLayout};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

use crate::stage::{BuiltinStage, StageSpec, ToolchainConfig};

/// The four stage invocations of one run, in order.
///
/// Compile stages run from the project root; run stages run from the
/// output directory so the report the kernel writes is where the analysis
/// looks for it.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct PipelinePlan {
    pub stages: Vec<StageSpec>,

    /// SHA-256 over the ordered command lines and working directories.
    pub stages_digest: String,
}

impl PipelinePlan {
    pub fn new(
        layout: &ProjectLayout,
        architecture: &ArchitectureId,
        toolchain: &ToolchainConfig,
    ) -> Self {
        let stages: Vec<StageSpec> = BuiltinStage::ORDER
            .iter()
            .map(|&stage| {
                let working_dir = if stage.is_run() {
                    &layout.lib_dir
                } else {
                    &layout.root
                };
                StageSpec::build(stage, layout, architecture, toolchain, working_dir)
            })
            .collect();
        let stages_digest = compute_stages_digest(&stages);
        Self {
            stages,
            stages_digest,
        }
    }

    /// Short form of the digest (first 12 hex chars).
    pub fn short_digest(&self) -> &str {
        &self.stages_digest[..12.min(self.stages_digest.len())]
    }
}

/// Compute a deterministic digest of ordered stage invocations.
pub fn compute_stages_digest(stages: &[StageSpec]) -> String {
    let mut hasher = Sha256::new();
    for spec in stages {
        hasher.update(spec.stage.name().as_bytes());
        hasher.update(b"\0");
        hasher.update(spec.command_line().as_bytes());
        hasher.update(b"\0");
        hasher.update(spec.working_dir.to_string_lossy().as_bytes());
        hasher.update(b"\0");
    }
    hex::encode(hasher.finalize())
}

#[cfg(test)]
mod tests {
    use super::*;
    use fingerprint_core::Precision;
    use std::path::Path;

    fn plan(arch: &str, precision: Precision) -> PipelinePlan {
        let layout = ProjectLayout::new(Path::new("/root"), precision);
        PipelinePlan::new(
            &layout,
            &ArchitectureId::manual(arch),
            &ToolchainConfig::default(),
        )
    }

    #[test]
    fn test_plan_has_fixed_order_and_working_dirs() {
        let p = plan("sm_80", Precision::Fp16);
        let order: Vec<_> = p.stages.iter().map(|s| s.stage).collect();
        assert_eq!(order, BuiltinStage::ORDER.to_vec());
        assert_eq!(p.stages[0].working_dir, Path::new("/root"));
        assert_eq!(p.stages[1].working_dir, Path::new("/root"));
        assert_eq!(p.stages[2].working_dir, Path::new("/root/fp16/lib"));
        assert_eq!(p.stages[3].working_dir, Path::new("/root/fp16/lib"));
    }

    #[test]
    fn test_stages_digest_deterministic() {
        assert_eq!(
            plan("sm_80", Precision::Fp16).stages_digest,
            plan("sm_80", Precision::Fp16).stages_digest
        );
    }

    #[test]
    fn test_stages_digest_tracks_inputs() {
        let base = plan("sm_80", Precision::Fp16);
        assert_ne!(base.stages_digest, plan("sm_86", Precision::Fp16).stages_digest);
        assert_ne!(base.stages_digest, plan("sm_80", Precision::Bf16).stages_digest);
        assert_eq!(base.short_digest().len(), 12);
    }

    #[test]
    fn test_stages_digest_order_sensitive() {
        let p = plan("sm_80", Precision::Fp16);
        let mut reversed = p.stages.clone();
        reversed.reverse();
        assert_ne!(compute_stages_digest(&reversed), p.stages_digest);
    }
}
