//! Precision variants and the on-disk layout each one selects.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::{Path, PathBuf};
use std::str::FromStr;

use crate::error::ProbeError;

/// Numeric format probed by a run.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash, Default)]
#[serde(rename_all = "lowercase")]
pub enum Precision {
    #[default]
    Fp16,
    Bf16,
}

impl Precision {
    /// Directory and file prefix for this variant.
    pub fn as_str(&self) -> &'static str {
        match self {
            Precision::Fp16 => "fp16",
            Precision::Bf16 => "bf16",
        }
    }

    /// Interpret the answer to the precision menu.
    ///
    /// `2` or `bf16` (any case) picks bf16; everything else, including an
    /// empty line, falls back to fp16.
    pub fn from_menu_choice(choice: &str) -> Self {
        let choice = choice.trim();
        if choice == "2" || choice.eq_ignore_ascii_case("bf16") {
            Precision::Bf16
        } else {
            Precision::Fp16
        }
    }

    /// Kernel source file name, e.g. `fp16_dp16a_wmma.cu`.
    pub fn kernel_source(&self) -> String {
        format!("{}_dp16a_wmma.cu", self.as_str())
    }

    /// Kernel executable stem, e.g. `fp16_dp16a_wmma`.
    pub fn kernel_stem(&self) -> String {
        format!("{}_dp16a_wmma", self.as_str())
    }
}

impl fmt::Display for Precision {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Precision {
    type Err = ProbeError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "fp16" => Ok(Precision::Fp16),
            "bf16" => Ok(Precision::Bf16),
            other => Err(ProbeError::InvalidPrecision(other.to_string())),
        }
    }
}

/// Analysis source shared by both variants.
pub const ANALYSIS_SOURCE: &str = "ProbeDesign.cpp";

/// Analysis executable stem shared by both variants.
pub const ANALYSIS_STEM: &str = "probe_analysis";

/// Directory tree for one precision variant:
/// `<root>/<precision>/src` for inputs and `<root>/<precision>/lib` for
/// executables and the report the run stages exchange.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProjectLayout {
    pub root: PathBuf,
    pub precision: Precision,
    pub base_dir: PathBuf,
    pub src_dir: PathBuf,
    pub lib_dir: PathBuf,
}

impl ProjectLayout {
    pub fn new(root: &Path, precision: Precision) -> Self {
        let base_dir = root.join(precision.as_str());
        Self {
            root: root.to_path_buf(),
            precision,
            src_dir: base_dir.join("src"),
            lib_dir: base_dir.join("lib"),
            base_dir,
        }
    }

    pub fn kernel_source(&self) -> PathBuf {
        self.src_dir.join(self.precision.kernel_source())
    }

    pub fn analysis_source(&self) -> PathBuf {
        self.src_dir.join(ANALYSIS_SOURCE)
    }

    /// Kernel executable path; `exe_suffix` is `.exe` on Windows, empty elsewhere.
    pub fn kernel_executable(&self, exe_suffix: &str) -> PathBuf {
        self.lib_dir
            .join(format!("{}{}", self.precision.kernel_stem(), exe_suffix))
    }

    pub fn analysis_executable(&self, exe_suffix: &str) -> PathBuf {
        self.lib_dir.join(format!("{}{}", ANALYSIS_STEM, exe_suffix))
    }
}

/// Executable suffix for the host platform.
pub fn host_exe_suffix() -> &'static str {
    if cfg!(windows) {
        ".exe"
    } else {
        ""
    }
}
