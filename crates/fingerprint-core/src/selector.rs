//! Device selection with manual fallback.
//!
//! Selection never fails. Whatever detection produces (nothing, one device,
//! several devices, or a device the rule table does not know) the operator
//! is asked for exactly the missing piece and the answer is used verbatim.

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::arch::{resolve, ArchitectureId};
use crate::input::InputProvider;
use crate::obs::emit_device_selected;
use crate::precision::Precision;
use crate::reporter::Reporter;

/// Device label used when no device was detected.
pub const MANUAL_DEVICE_LABEL: &str = "Manual Selection";

const MANUAL_ARCH_PROMPT: &str = "Please enter architecture flag manually (e.g., sm_90): ";
const OVERRIDE_ARCH_PROMPT: &str = "Please enter -arch flag (e.g., sm_90): ";
const INDEX_PROMPT: &str = "Select GPU index (default 1): ";

/// How the architecture of a [`Selection`] was obtained.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum ArchSource {
    /// Resolved from the device name.
    Detected,
    /// Typed in by the operator.
    Manual,
}

/// The single (device, architecture) pair a run targets.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Selection {
    pub device: String,
    pub architecture: ArchitectureId,
    pub source: ArchSource,
}

/// Pick a device and resolve its architecture with the built-in rule table.
pub fn select(
    devices: &[String],
    input: &mut dyn InputProvider,
    reporter: &dyn Reporter,
) -> Selection {
    select_with(devices, input, reporter, resolve)
}

/// Like [`select`], with the resolver supplied by the caller.
pub fn select_with<F>(
    devices: &[String],
    input: &mut dyn InputProvider,
    reporter: &dyn Reporter,
    resolver: F,
) -> Selection
where
    F: Fn(&str) -> Option<ArchitectureId>,
{
    let selection = match devices {
        [] => {
            reporter.error("No NVIDIA GPUs detected.");
            Selection {
                device: MANUAL_DEVICE_LABEL.to_string(),
                architecture: ArchitectureId::manual(&input.prompt(MANUAL_ARCH_PROMPT)),
                source: ArchSource::Manual,
            }
        }
        [only] => {
            reporter.info(&format!("Detected: {only}"));
            resolve_or_ask(only, input, reporter, &resolver)
        }
        many => {
            reporter.info("Multiple GPUs detected:");
            for (i, name) in many.iter().enumerate() {
                reporter.info(&format!("  [{}] {}", i + 1, name));
            }
            let choice = input.prompt(INDEX_PROMPT);
            let idx = pick_index(&choice, many.len());
            resolve_or_ask(&many[idx], input, reporter, &resolver)
        }
    };

    emit_device_selected(
        &selection.device,
        selection.architecture.as_str(),
        selection.source == ArchSource::Manual,
    );
    reporter.success(&format!(
        "Target Hardware: {} | Arch: {}",
        selection.device, selection.architecture
    ));
    selection
}

fn resolve_or_ask<F>(
    device: &str,
    input: &mut dyn InputProvider,
    reporter: &dyn Reporter,
    resolver: &F,
) -> Selection
where
    F: Fn(&str) -> Option<ArchitectureId>,
{
    match resolver(device) {
        Some(architecture) => Selection {
            device: device.to_string(),
            architecture,
            source: ArchSource::Detected,
        },
        None => {
            reporter.warning(&format!(
                "Could not auto-detect architecture for {device}."
            ));
            Selection {
                device: device.to_string(),
                architecture: ArchitectureId::manual(&input.prompt(OVERRIDE_ARCH_PROMPT)),
                source: ArchSource::Manual,
            }
        }
    }
}

/// Map a 1-based index answer to a 0-based position in a list of `len`
/// devices. Anything that is not a plain in-range number selects the first
/// device.
pub fn pick_index(choice: &str, len: usize) -> usize {
    let choice = choice.trim();
    let parsed = if !choice.is_empty() && choice.chars().all(|c| c.is_ascii_digit()) {
        choice.parse::<usize>().ok()
    } else {
        None
    };

    match parsed {
        Some(n) if (1..=len).contains(&n) => n - 1,
        _ => {
            debug!(choice = %choice, len = len, "invalid device index, defaulting to 1");
            0
        }
    }
}

/// Ask for the precision variant with the `[1] fp16 / [2] bf16` menu.
pub fn choose_precision(input: &mut dyn InputProvider, reporter: &dyn Reporter) -> Precision {
    reporter.step("Select Precision");
    reporter.info("  [1] fp16");
    reporter.info("  [2] bf16");
    let precision = Precision::from_menu_choice(&input.prompt("Enter choice (1 or 2): "));
    reporter.success(&format!("Selected Precision: {precision}"));
    precision
}
