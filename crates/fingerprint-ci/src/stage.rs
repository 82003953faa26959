//! Pipeline stage definitions and configuration.

use fingerprint_core::{host_exe_suffix, ArchitectureId, Precision, ProjectLayout, ANALYSIS_SOURCE};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// The four probe stages, in execution order.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum BuiltinStage {
    /// nvcc -arch=<arch> -std=<std> -o <lib>/<p>_dp16a_wmma <src>/<p>_dp16a_wmma.cu
    CompileKernel,

    /// g++ -o <lib>/probe_analysis <src>/ProbeDesign.cpp -std=<std>
    CompileAnalysis,

    /// <lib>/<p>_dp16a_wmma, writes the fingerprint report into <lib>
    RunKernel,

    /// <lib>/probe_analysis, reads the report written by RunKernel
    RunAnalysis,
}

impl BuiltinStage {
    /// Fixed execution order.
    pub const ORDER: [BuiltinStage; 4] = [
        BuiltinStage::CompileKernel,
        BuiltinStage::CompileAnalysis,
        BuiltinStage::RunKernel,
        BuiltinStage::RunAnalysis,
    ];

    /// Get the stage name as a string.
    pub fn name(&self) -> &'static str {
        match self {
            BuiltinStage::CompileKernel => "compile_kernel",
            BuiltinStage::CompileAnalysis => "compile_analysis",
            BuiltinStage::RunKernel => "run_kernel",
            BuiltinStage::RunAnalysis => "run_analysis",
        }
    }

    /// 1-based position in [`BuiltinStage::ORDER`].
    pub fn index(&self) -> usize {
        match self {
            BuiltinStage::CompileKernel => 1,
            BuiltinStage::CompileAnalysis => 2,
            BuiltinStage::RunKernel => 3,
            BuiltinStage::RunAnalysis => 4,
        }
    }

    /// Whether the stage executes a produced artifact rather than a compiler.
    pub fn is_run(&self) -> bool {
        matches!(self, BuiltinStage::RunKernel | BuiltinStage::RunAnalysis)
    }

    /// Operator-facing title announced when the stage starts.
    pub fn title(&self, precision: Precision) -> String {
        match self {
            BuiltinStage::CompileKernel => {
                format!("Compiling CUDA Kernel ({})...", precision.kernel_source())
            }
            BuiltinStage::CompileAnalysis => {
                format!("Compiling Probe Analysis ({ANALYSIS_SOURCE})...")
            }
            BuiltinStage::RunKernel => "--- Step A: Generating Fingerprint (CUDA) ---".to_string(),
            BuiltinStage::RunAnalysis => "--- Step B: Analyzing Report (C++) ---".to_string(),
        }
    }

    /// Diagnostic when the stage's executable does not exist.
    pub fn not_found_message(&self, program: &str) -> String {
        match self {
            BuiltinStage::CompileKernel => format!("{program} not found. Check your CUDA path."),
            BuiltinStage::CompileAnalysis => {
                format!("{program} not found. Check your MinGW/GCC path.")
            }
            BuiltinStage::RunKernel => format!("CUDA binary not found: {program}"),
            BuiltinStage::RunAnalysis => format!("Probe Analysis binary not found: {program}"),
        }
    }

    /// Diagnostic when the stage ran and exited unsuccessfully.
    pub fn failed_message(&self) -> &'static str {
        match self {
            BuiltinStage::CompileKernel => "CUDA compilation failed.",
            BuiltinStage::CompileAnalysis => "C++ compilation failed.",
            BuiltinStage::RunKernel => "Execution of CUDA binary failed.",
            BuiltinStage::RunAnalysis => "Execution of Probe Analysis failed.",
        }
    }

    /// Message reported when the stage succeeds.
    pub fn success_message(&self) -> &'static str {
        match self {
            BuiltinStage::CompileKernel => "CUDA compilation successful.",
            BuiltinStage::CompileAnalysis => "C++ compilation successful.",
            BuiltinStage::RunKernel => "Fingerprint generated.",
            BuiltinStage::RunAnalysis => "Report analysed.",
        }
    }
}

/// Compiler programs and flags shared by every run.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct ToolchainConfig {
    /// CUDA compiler used for the kernel.
    pub cuda_compiler: String,

    /// Host C++ compiler used for the analysis program.
    pub host_compiler: String,

    /// Value of `-std=` for both compilers.
    pub language_standard: String,

    /// Suffix appended to produced executables (`.exe` on Windows).
    pub exe_suffix: String,

    /// Per-stage timeout in seconds; 0 means no timeout.
    pub timeout_secs: u64,
}

impl Default for ToolchainConfig {
    fn default() -> Self {
        Self {
            cuda_compiler: "nvcc".to_string(),
            host_compiler: "g++".to_string(),
            language_standard: "c++17".to_string(),
            exe_suffix: host_exe_suffix().to_string(),
            timeout_secs: 0,
        }
    }
}

impl ToolchainConfig {
    fn std_flag(&self) -> String {
        format!("-std={}", self.language_standard)
    }
}

/// Fully derived description of one stage invocation.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct StageSpec {
    pub stage: BuiltinStage,

    /// Executable to launch.
    pub program: String,

    /// Arguments after the program.
    pub args: Vec<String>,

    /// Artifact consumed by the stage.
    pub input: PathBuf,

    /// Artifact the stage produces or, for run stages, executes.
    pub output: PathBuf,

    /// Directory the process runs in.
    pub working_dir: PathBuf,

    /// Timeout in seconds (0 = wait indefinitely).
    pub timeout_secs: u64,
}

impl StageSpec {
    /// Derive the invocation for `stage`. Only [`BuiltinStage::CompileKernel`]
    /// depends on `architecture`.
    pub fn build(
        stage: BuiltinStage,
        layout: &ProjectLayout,
        architecture: &ArchitectureId,
        toolchain: &ToolchainConfig,
        working_dir: &Path,
    ) -> Self {
        let suffix = toolchain.exe_suffix.as_str();
        let kernel_exe = layout.kernel_executable(suffix);
        let analysis_exe = layout.analysis_executable(suffix);

        let (program, args, input, output) = match stage {
            BuiltinStage::CompileKernel => {
                let input = layout.kernel_source();
                let args = vec![
                    architecture.nvcc_flag(),
                    toolchain.std_flag(),
                    "-o".to_string(),
                    kernel_exe.display().to_string(),
                    input.display().to_string(),
                ];
                (toolchain.cuda_compiler.clone(), args, input, kernel_exe)
            }
            BuiltinStage::CompileAnalysis => {
                let input = layout.analysis_source();
                let args = vec![
                    "-o".to_string(),
                    analysis_exe.display().to_string(),
                    input.display().to_string(),
                    toolchain.std_flag(),
                ];
                (toolchain.host_compiler.clone(), args, input, analysis_exe)
            }
            BuiltinStage::RunKernel => (
                kernel_exe.display().to_string(),
                Vec::new(),
                kernel_exe.clone(),
                kernel_exe,
            ),
            BuiltinStage::RunAnalysis => (
                analysis_exe.display().to_string(),
                Vec::new(),
                analysis_exe.clone(),
                analysis_exe,
            ),
        };

        Self {
            stage,
            program,
            args,
            input,
            output,
            working_dir: working_dir.to_path_buf(),
            timeout_secs: toolchain.timeout_secs,
        }
    }

    /// Program and arguments joined with spaces, as echoed to the operator.
    pub fn command_line(&self) -> String {
        std::iter::once(self.program.as_str())
            .chain(self.args.iter().map(String::as_str))
            .collect::<Vec<_>>()
            .join(" ")
    }
}
