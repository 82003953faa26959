//! GPU enumeration through `nvidia-smi`.

use async_trait::async_trait;
use std::io::ErrorKind;
use tokio::process::Command;
use tracing::{debug, warn};

use crate::error::{ProbeError, Result};
use crate::reporter::Reporter;

/// Source of raw device names.
///
/// An empty list means "no devices detected" and is not an error.
#[async_trait]
pub trait DeviceLister: Send + Sync {
    async fn list_devices(&self) -> Result<Vec<String>>;
}

/// Lists NVIDIA GPUs with `nvidia-smi --query-gpu=name --format=csv,noheader`.
#[derive(Debug, Clone)]
pub struct NvidiaSmiLister {
    program: String,
}

impl Default for NvidiaSmiLister {
    fn default() -> Self {
        Self {
            program: "nvidia-smi".to_string(),
        }
    }
}

impl NvidiaSmiLister {
    pub fn new() -> Self {
        Self::default()
    }

    /// Use a different query binary (tests, wrapped installs).
    pub fn with_program(program: impl Into<String>) -> Self {
        Self {
            program: program.into(),
        }
    }
}

#[async_trait]
impl DeviceLister for NvidiaSmiLister {
    async fn list_devices(&self) -> Result<Vec<String>> {
        let output = Command::new(&self.program)
            .args(["--query-gpu=name", "--format=csv,noheader"])
            .output()
            .await
            .map_err(|e| {
                if e.kind() == ErrorKind::NotFound {
                    ProbeError::ListerNotFound(self.program.clone())
                } else {
                    ProbeError::DeviceListing(e.to_string())
                }
            })?;

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            return Err(ProbeError::DeviceListing(format!(
                "{} exited with {}: {}",
                self.program,
                output.status,
                stderr.trim()
            )));
        }

        let devices = parse_device_list(&String::from_utf8_lossy(&output.stdout));
        debug!(count = devices.len(), "nvidia-smi listed devices");
        Ok(devices)
    }
}

/// One device per non-blank line, surrounding whitespace trimmed.
pub fn parse_device_list(stdout: &str) -> Vec<String> {
    stdout
        .lines()
        .map(str::trim)
        .filter(|line| !line.is_empty())
        .map(str::to_string)
        .collect()
}

/// Query `lister`, degrading any failure to an empty list after telling the
/// operator what went wrong.
pub async fn detect_devices(lister: &dyn DeviceLister, reporter: &dyn Reporter) -> Vec<String> {
    match lister.list_devices().await {
        Ok(devices) => devices,
        Err(ProbeError::ListerNotFound(program)) => {
            warn!(program = %program, "device lister not installed");
            reporter.error(&format!(
                "{program} not found. Please ensure CUDA drivers are installed."
            ));
            Vec::new()
        }
        Err(e) => {
            warn!(error = %e, "device listing failed");
            reporter.error(&format!("Error checking GPUs: {e}"));
            Vec::new()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fakes::{RecordingReporter, StaticDeviceLister};

    #[test]
    fn test_parse_device_list() {
        let out = "NVIDIA A100-SXM4-80GB\n  NVIDIA A100-SXM4-80GB  \n\n";
        assert_eq!(
            parse_device_list(out),
            vec!["NVIDIA A100-SXM4-80GB", "NVIDIA A100-SXM4-80GB"]
        );
        assert!(parse_device_list("").is_empty());
        assert!(parse_device_list("\n \n").is_empty());
    }

    #[tokio::test]
    async fn test_missing_lister_yields_empty_list() {
        let lister = NvidiaSmiLister::with_program("definitely-not-nvidia-smi-xyz");
        let err = lister.list_devices().await.unwrap_err();
        assert!(matches!(err, ProbeError::ListerNotFound(_)));

        let reporter = RecordingReporter::new();
        let devices = detect_devices(&lister, &reporter).await;
        assert!(devices.is_empty());
        assert!(reporter
            .errors()
            .iter()
            .any(|line| line.contains("not found")));
    }

    #[tokio::test]
    async fn test_failing_lister_is_reported() {
        let lister = StaticDeviceLister::failing("driver/library version mismatch");
        let reporter = RecordingReporter::new();
        let devices = detect_devices(&lister, &reporter).await;
        assert!(devices.is_empty());
        assert!(reporter.errors()[0].starts_with("Error checking GPUs"));
    }
}
