//! Operator-facing progress output.
//!
//! The pipeline never prints directly; it talks to a [`Reporter`]. Color is
//! configuration of the terminal reporter, not global state.

use std::io::{self, Write};

/// Sink for progress messages.
pub trait Reporter: Send + Sync {
    /// Title block shown once at start-up.
    fn banner(&self, title: &str);
    /// A new top-level step (`[*] ...`).
    fn step(&self, msg: &str);
    /// Something completed (`[+] ...`).
    fn success(&self, msg: &str);
    /// Something failed (`[!] ...`).
    fn error(&self, msg: &str);
    /// Recoverable problem the operator should see.
    fn warning(&self, msg: &str);
    /// Emphasised sub-heading.
    fn heading(&self, msg: &str);
    /// Plain line.
    fn info(&self, msg: &str);
}

/// ANSI escape sequences used by [`TerminalReporter`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Palette {
    pub header: &'static str,
    pub blue: &'static str,
    pub green: &'static str,
    pub warning: &'static str,
    pub fail: &'static str,
    pub bold: &'static str,
    pub reset: &'static str,
}

impl Palette {
    pub const fn ansi() -> Self {
        Self {
            header: "\x1b[95m",
            blue: "\x1b[94m",
            green: "\x1b[92m",
            warning: "\x1b[93m",
            fail: "\x1b[91m",
            bold: "\x1b[1m",
            reset: "\x1b[0m",
        }
    }

    pub const fn plain() -> Self {
        Self {
            header: "",
            blue: "",
            green: "",
            warning: "",
            fail: "",
            bold: "",
            reset: "",
        }
    }
}

/// Writes formatted progress lines to stdout.
#[derive(Debug, Clone, Copy)]
pub struct TerminalReporter {
    palette: Palette,
}

impl TerminalReporter {
    pub fn new(color: bool) -> Self {
        Self {
            palette: if color {
                Palette::ansi()
            } else {
                Palette::plain()
            },
        }
    }

    pub fn palette(&self) -> Palette {
        self.palette
    }

    fn emit(&self, line: String) {
        let mut out = io::stdout().lock();
        let _ = writeln!(out, "{line}");
        let _ = out.flush();
    }
}

impl Reporter for TerminalReporter {
    fn banner(&self, title: &str) {
        let p = self.palette;
        let rule = "=".repeat(60);
        self.emit(format!("{}{rule}\n      {title}\n{rule}{}", p.header, p.reset));
    }

    fn step(&self, msg: &str) {
        let p = self.palette;
        self.emit(format!("\n{}{}[*] {msg}{}", p.blue, p.bold, p.reset));
    }

    fn success(&self, msg: &str) {
        let p = self.palette;
        self.emit(format!("{}[+] {msg}{}", p.green, p.reset));
    }

    fn error(&self, msg: &str) {
        let p = self.palette;
        self.emit(format!("{}[!] {msg}{}", p.fail, p.reset));
    }

    fn warning(&self, msg: &str) {
        let p = self.palette;
        self.emit(format!("{}{msg}{}", p.warning, p.reset));
    }

    fn heading(&self, msg: &str) {
        let p = self.palette;
        self.emit(format!("\n{}{msg}{}", p.bold, p.reset));
    }

    fn info(&self, msg: &str) {
        self.emit(msg.to_string());
    }
}
