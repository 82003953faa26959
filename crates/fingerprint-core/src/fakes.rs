//! In-memory fakes for the external collaborators (testing only)
//!
//! Provides `ScriptedInput`, `StaticDeviceLister`, and `RecordingReporter`
//! so selection and pipeline logic can run without a terminal or a GPU.

use std::collections::VecDeque;
use std::sync::Mutex;

use async_trait::async_trait;

use crate::device::DeviceLister;
use crate::error::{ProbeError, Result};
use crate::input::InputProvider;
use crate::reporter::Reporter;

// ---------------------------------------------------------------------------
// ScriptedInput
// ---------------------------------------------------------------------------

/// Replays a fixed list of answers and records every prompt it was shown.
/// Once the script runs out it answers with an empty line.
#[derive(Debug, Default)]
pub struct ScriptedInput {
    answers: VecDeque<String>,
    prompts: Vec<String>,
}

impl ScriptedInput {
    pub fn new<I, S>(answers: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            answers: answers.into_iter().map(Into::into).collect(),
            prompts: Vec::new(),
        }
    }

    /// Prompts shown so far, in order.
    pub fn prompts(&self) -> Vec<String> {
        self.prompts.clone()
    }

    /// Answers not yet consumed.
    pub fn remaining(&self) -> usize {
        self.answers.len()
    }
}

impl InputProvider for ScriptedInput {
    fn prompt(&mut self, message: &str) -> String {
        self.prompts.push(message.to_string());
        self.answers.pop_front().unwrap_or_default()
    }
}

// ---------------------------------------------------------------------------
// StaticDeviceLister
// ---------------------------------------------------------------------------

/// Returns a fixed device list, or a fixed failure.
#[derive(Debug, Clone)]
pub struct StaticDeviceLister {
    outcome: std::result::Result<Vec<String>, String>,
}

impl StaticDeviceLister {
    pub fn new<I, S>(devices: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            outcome: Ok(devices.into_iter().map(Into::into).collect()),
        }
    }

    pub fn failing(reason: &str) -> Self {
        Self {
            outcome: Err(reason.to_string()),
        }
    }
}

#[async_trait]
impl DeviceLister for StaticDeviceLister {
    async fn list_devices(&self) -> Result<Vec<String>> {
        self.outcome
            .clone()
            .map_err(ProbeError::DeviceListing)
    }
}

// ---------------------------------------------------------------------------
// RecordingReporter
// ---------------------------------------------------------------------------

/// Category of a recorded line.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Channel {
    Banner,
    Step,
    Success,
    Error,
    Warning,
    Heading,
    Info,
}

/// Captures every message instead of printing it.
#[derive(Debug, Default)]
pub struct RecordingReporter {
    lines: Mutex<Vec<(Channel, String)>>,
}

impl RecordingReporter {
    pub fn new() -> Self {
        Self::default()
    }

    fn push(&self, channel: Channel, msg: &str) {
        self.lines.lock().unwrap().push((channel, msg.to_string()));
    }

    pub fn on(&self, channel: Channel) -> Vec<String> {
        self.lines
            .lock()
            .unwrap()
            .iter()
            .filter(|(c, _)| *c == channel)
            .map(|(_, m)| m.clone())
            .collect()
    }

    pub fn errors(&self) -> Vec<String> {
        self.on(Channel::Error)
    }

    pub fn warnings(&self) -> Vec<String> {
        self.on(Channel::Warning)
    }

    pub fn successes(&self) -> Vec<String> {
        self.on(Channel::Success)
    }

    pub fn steps(&self) -> Vec<String> {
        self.on(Channel::Step)
    }

    pub fn infos(&self) -> Vec<String> {
        self.on(Channel::Info)
    }
}

impl Reporter for RecordingReporter {
    fn banner(&self, title: &str) {
        self.push(Channel::Banner, title);
    }

    fn step(&self, msg: &str) {
        self.push(Channel::Step, msg);
    }

    fn success(&self, msg: &str) {
        self.push(Channel::Success, msg);
    }

    fn error(&self, msg: &str) {
        self.push(Channel::Error, msg);
    }

    fn warning(&self, msg: &str) {
        self.push(Channel::Warning, msg);
    }

    fn heading(&self, msg: &str) {
        self.push(Channel::Heading, msg);
    }

    fn info(&self, msg: &str) {
        self.push(Channel::Info, msg);
    }
}
