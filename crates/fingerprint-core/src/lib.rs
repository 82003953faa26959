//! Numeric fingerprint probe core
//!
//! Everything the pipeline needs before the first compiler runs:
//! - GPU enumeration (`nvidia-smi`) behind the `DeviceLister` trait
//! - Device name to nvcc architecture resolution (ordered rule table)
//! - Device selection with manual fallback through an `InputProvider`
//! - Precision variants and their on-disk layout
//! - The `Reporter` progress sink, tracing setup and lifecycle events

pub mod arch;
pub mod device;
pub mod error;
pub mod fakes;
pub mod input;
pub mod obs;
pub mod precision;
pub mod reporter;
pub mod selector;
pub mod telemetry;

pub use arch::{resolve, resolve_with, ArchRule, ArchitectureId, ARCH_RULES};
pub use device::{detect_devices, parse_device_list, DeviceLister, NvidiaSmiLister};
pub use error::{ProbeError, Result};
pub use input::{InputProvider, StdinInput};
pub use obs::{
    emit_device_selected, emit_pipeline_finished, emit_pipeline_started, emit_stage_finished,
    emit_stage_started, run_span,
};
pub use precision::{host_exe_suffix, Precision, ProjectLayout, ANALYSIS_SOURCE, ANALYSIS_STEM};
pub use reporter::{Palette, Reporter, TerminalReporter};
pub use selector::{
    choose_precision, pick_index, select, select_with, ArchSource, Selection,
    MANUAL_DEVICE_LABEL,
};
pub use telemetry::init_tracing;
