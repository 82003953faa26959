//! Numeric fingerprint probe automation CLI
//!
//! The `fingerprint` command detects the local NVIDIA GPU, resolves the nvcc
//! architecture flag, then compiles and runs the DP16A probes.
//!
//! ## Commands
//!
//! - *(default)*: detect, select precision, compile both programs, run them
//! - `detect`: list detected GPUs and the architecture each resolves to
//! - `resolve`: resolve a device name without touching the hardware

use anyhow::{Context, Result};
use clap::{Args, Parser, Subcommand};
use std::path::{Path, PathBuf};
use std::process::ExitCode;
use std::sync::Arc;
use tracing::{info, Level};

use fingerprint_ci::{absolute_root, BuildOrchestrator, ProcessRunner, RunLog, ToolchainConfig};
use fingerprint_core::{
    choose_precision, detect_devices, emit_device_selected, resolve, select, ArchSource,
    ArchitectureId, NvidiaSmiLister, Precision, Reporter, Selection, StdinInput,
    TerminalReporter, MANUAL_DEVICE_LABEL,
};

#[derive(Parser)]
#[command(name = "fingerprint")]
#[command(version = env!("CARGO_PKG_VERSION"))]
#[command(about = "DP16A numeric fingerprint probe automation", long_about = None)]
struct Cli {
    /// Enable verbose output
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Emit JSON-formatted log lines
    #[arg(long, global = true)]
    json: bool,

    /// Disable ANSI colors in progress output
    #[arg(long, global = true)]
    no_color: bool,

    /// Query binary used to enumerate GPUs
    #[arg(long, global = true, env = "FINGERPRINT_NVIDIA_SMI", default_value = "nvidia-smi")]
    nvidia_smi: String,

    #[command(flatten)]
    run: RunArgs,

    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
    /// List detected GPUs and their resolved architecture
    Detect,

    /// Resolve a device name to its nvcc architecture flag
    Resolve {
        /// Device name as reported by nvidia-smi
        name: String,
    },
}

#[derive(Args, Debug, Clone)]
struct RunArgs {
    /// Project root containing the fp16/ and bf16/ trees
    #[arg(long, env = "FINGERPRINT_ROOT", default_value = ".")]
    root: PathBuf,

    /// Precision variant (skips the prompt)
    #[arg(short, long, env = "FINGERPRINT_PRECISION")]
    precision: Option<Precision>,

    /// Architecture flag such as sm_90 (skips detection)
    #[arg(short, long, env = "FINGERPRINT_ARCH")]
    arch: Option<String>,

    /// CUDA compiler
    #[arg(long, env = "FINGERPRINT_NVCC", default_value = "nvcc")]
    nvcc: String,

    /// Host C++ compiler
    #[arg(long, env = "FINGERPRINT_CXX", default_value = "g++")]
    cxx: String,

    /// Language standard passed as -std=
    #[arg(long = "std", env = "FINGERPRINT_STD", default_value = "c++17")]
    language_standard: String,

    /// Per-stage timeout in seconds (0 = wait indefinitely)
    #[arg(long, env = "FINGERPRINT_TIMEOUT_SECS", default_value = "0")]
    timeout_secs: u64,

    /// Write the run log as JSON to this path
    #[arg(long)]
    run_log: Option<PathBuf>,
}

impl RunArgs {
    fn toolchain(&self) -> ToolchainConfig {
        ToolchainConfig {
            cuda_compiler: self.nvcc.clone(),
            host_compiler: self.cxx.clone(),
            language_standard: self.language_standard.clone(),
            timeout_secs: self.timeout_secs,
            ..ToolchainConfig::default()
        }
    }
}

#[tokio::main]
async fn main() -> Result<ExitCode> {
    let cli = Cli::parse();

    // Setup logging
    let level = if cli.verbose {
        Level::DEBUG
    } else {
        Level::WARN
    };
    fingerprint_core::init_tracing(cli.json, level);

    let reporter = Arc::new(TerminalReporter::new(!cli.no_color));
    let lister = NvidiaSmiLister::with_program(&cli.nvidia_smi);

    match cli.command {
        Some(Commands::Detect) => cmd_detect(&lister, reporter.as_ref()).await,
        Some(Commands::Resolve { name }) => Ok(cmd_resolve(&name)),
        None => cmd_run(&cli.run, &lister, reporter).await,
    }
}

/// Detect, select, compile and run.
async fn cmd_run(
    args: &RunArgs,
    lister: &NvidiaSmiLister,
    reporter: Arc<TerminalReporter>,
) -> Result<ExitCode> {
    reporter.banner("DP16A AUTOMATION PROBE SYSTEM");
    let mut input = StdinInput::new();

    let selection = match &args.arch {
        Some(arch) => manual_selection(arch, reporter.as_ref()),
        None => {
            reporter.step("Detecting Hardware...");
            let devices = detect_devices(lister, reporter.as_ref()).await;
            select(&devices, &mut input, reporter.as_ref())
        }
    };

    let precision = match args.precision {
        Some(precision) => {
            reporter.success(&format!("Selected Precision: {precision}"));
            precision
        }
        None => choose_precision(&mut input, reporter.as_ref()),
    };

    let root = absolute_root(&args.root).context("Failed to get current directory")?;
    info!(root = %root.display(), precision = %precision, "starting pipeline");

    let orchestrator = BuildOrchestrator::new(
        root,
        args.toolchain(),
        Arc::new(ProcessRunner::new()),
        reporter.clone(),
    );
    let log = orchestrator
        .run(precision, &selection.architecture, &selection.device)
        .await;

    if let Some(path) = &args.run_log {
        write_run_log(&log, path)?;
    }

    Ok(exit_code(&log))
}

/// List GPUs and what each resolves to.
async fn cmd_detect(lister: &NvidiaSmiLister, reporter: &dyn Reporter) -> Result<ExitCode> {
    reporter.step("Detecting Hardware...");
    let devices = detect_devices(lister, reporter).await;
    if devices.is_empty() {
        reporter.error("No NVIDIA GPUs detected.");
        return Ok(ExitCode::FAILURE);
    }

    for (i, device) in devices.iter().enumerate() {
        let arch = resolve(device)
            .map(|a| a.to_string())
            .unwrap_or_else(|| "unresolved".to_string());
        reporter.info(&format!("  [{}] {} -> {}", i + 1, device, arch));
    }
    Ok(ExitCode::SUCCESS)
}

/// Print the architecture for `name`, failing when nothing matches.
fn cmd_resolve(name: &str) -> ExitCode {
    match resolve(name) {
        Some(arch) => {
            println!("{arch}");
            ExitCode::SUCCESS
        }
        None => {
            eprintln!("No architecture rule matches '{name}'");
            ExitCode::FAILURE
        }
    }
}

fn manual_selection(arch: &str, reporter: &dyn Reporter) -> Selection {
    let selection = Selection {
        device: MANUAL_DEVICE_LABEL.to_string(),
        architecture: ArchitectureId::manual(arch),
        source: ArchSource::Manual,
    };
    emit_device_selected(&selection.device, selection.architecture.as_str(), true);
    reporter.success(&format!(
        "Target Hardware: {} | Arch: {}",
        selection.device, selection.architecture
    ));
    selection
}

fn write_run_log(log: &RunLog, path: &Path) -> Result<()> {
    let json = serde_json::to_string_pretty(log).context("Failed to serialize run log")?;
    std::fs::write(path, json)
        .with_context(|| format!("Failed to write run log to {}", path.display()))?;
    info!(path = %path.display(), "run log written");
    Ok(())
}

fn exit_code(log: &RunLog) -> ExitCode {
    if log.succeeded() {
        ExitCode::SUCCESS
    } else {
        ExitCode::from(log.exit_code() as u8)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;
    use fingerprint_ci::{BuiltinStage, PipelineResult, PipelineState, StageFailure};
    use fingerprint_core::fakes::RecordingReporter;

    fn sample_log(state: PipelineState) -> RunLog {
        let now = chrono::Utc::now();
        RunLog {
            run_id: uuid::Uuid::nil(),
            started_at: now,
            finished_at: now,
            precision: Precision::Fp16,
            architecture: ArchitectureId::manual("sm_80"),
            device: "NVIDIA A100".to_string(),
            stages_digest: "0".repeat(64),
            state,
            results: vec![PipelineResult::failed(
                BuiltinStage::CompileKernel,
                StageFailure::ToolNotFound {
                    program: "nvcc".to_string(),
                },
                0,
            )],
            duration_ms: 1,
        }
    }

    #[test]
    fn test_cli_definition_is_valid() {
        Cli::command().debug_assert();
    }

    #[test]
    fn test_parse_run_flags() {
        let cli = Cli::try_parse_from([
            "fingerprint",
            "--precision",
            "bf16",
            "--arch",
            "sm_90",
            "--nvcc",
            "/opt/cuda/bin/nvcc",
            "--timeout-secs",
            "30",
        ])
        .unwrap();
        assert!(cli.command.is_none());
        assert_eq!(cli.run.precision, Some(Precision::Bf16));
        assert_eq!(cli.run.arch.as_deref(), Some("sm_90"));

        let tc = cli.run.toolchain();
        assert_eq!(tc.cuda_compiler, "/opt/cuda/bin/nvcc");
        assert_eq!(tc.host_compiler, "g++");
        assert_eq!(tc.language_standard, "c++17");
        assert_eq!(tc.timeout_secs, 30);
    }

    #[test]
    fn test_invalid_precision_rejected() {
        assert!(Cli::try_parse_from(["fingerprint", "--precision", "fp8"]).is_err());
    }

    #[test]
    fn test_parse_subcommands() {
        let cli = Cli::try_parse_from(["fingerprint", "resolve", "Tesla T4"]).unwrap();
        assert!(matches!(cli.command, Some(Commands::Resolve { ref name }) if name == "Tesla T4"));

        let cli = Cli::try_parse_from(["fingerprint", "--no-color", "detect"]).unwrap();
        assert!(cli.no_color);
        assert!(matches!(cli.command, Some(Commands::Detect)));
    }

    #[test]
    fn test_manual_selection_skips_detection() {
        let reporter = RecordingReporter::new();
        let sel = manual_selection(" sm_89 ", &reporter);
        assert_eq!(sel.device, MANUAL_DEVICE_LABEL);
        assert_eq!(sel.architecture.as_str(), "sm_89");
        assert_eq!(
            reporter.successes(),
            vec!["Target Hardware: Manual Selection | Arch: sm_89".to_string()]
        );
    }

    #[test]
    fn test_write_run_log_and_exit_code() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("run.json");
        let log = sample_log(PipelineState::Aborted);

        write_run_log(&log, &path).unwrap();
        let back: RunLog = serde_json::from_str(&std::fs::read_to_string(&path).unwrap()).unwrap();
        assert_eq!(back, log);
        assert_eq!(exit_code(&log), ExitCode::from(1));
        assert_eq!(exit_code(&sample_log(PipelineState::Done)), ExitCode::SUCCESS);
    }
}
