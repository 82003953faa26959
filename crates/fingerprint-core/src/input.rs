//! Operator input.

use std::io::{self, BufRead, Write};
use tracing::warn;

/// Blocking source of operator answers.
///
/// Implementations return the raw line without its trailing newline. A
/// closed or unreadable input yields an empty string, which every caller
/// treats as "no answer".
pub trait InputProvider {
    fn prompt(&mut self, message: &str) -> String;
}

/// Reads answers from stdin after printing the prompt to stdout.
#[derive(Debug, Default)]
pub struct StdinInput;

impl StdinInput {
    pub fn new() -> Self {
        Self
    }
}

impl InputProvider for StdinInput {
    fn prompt(&mut self, message: &str) -> String {
        let mut stdout = io::stdout();
        let _ = write!(stdout, "{message}");
        let _ = stdout.flush();

        let mut line = String::new();
        match io::stdin().lock().read_line(&mut line) {
            Ok(_) => line.trim_end_matches(['\r', '\n']).to_string(),
            Err(e) => {
                warn!(error = %e, "failed to read operator input");
                String::new()
            }
        }
    }
}
