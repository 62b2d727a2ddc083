//! Leveled progress and warning output.
//!
//! Fatal conditions travel as `Err` values up to the driver; everything
//! else is printed here. Warnings and notes go to stderr so generated
//! output stays clean when stdout is redirected.

use std::fmt;

/// How much non-fatal output to emit.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum Verbosity {
    /// Errors only (`--quiet`).
    Error,
    /// Errors plus warnings and progress lines (default).
    Warning,
    /// Everything, including per-option informational notes (`--loud`).
    Info,
}

/// Sink for leveled messages. Cheap to copy; components keep their own.
#[derive(Debug, Clone, Copy)]
pub struct Reporter {
    verbosity: Verbosity,
}

impl Default for Reporter {
    fn default() -> Self {
        Self { verbosity: Verbosity::Warning }
    }
}

impl Reporter {
    pub fn new(verbosity: Verbosity) -> Self {
        Self { verbosity }
    }

    pub fn verbosity(&self) -> Verbosity {
        self.verbosity
    }

    /// A progress line ("  Passing configure file..." style).
    pub fn status(&self, msg: impl fmt::Display) {
        if self.verbosity >= Verbosity::Warning {
            println!("{}", msg);
        }
    }

    pub fn error(&self, msg: impl fmt::Display) {
        eprintln!("Error: {}", msg);
    }

    pub fn warning(&self, msg: impl fmt::Display) {
        if self.verbosity >= Verbosity::Warning {
            eprintln!("Warning: {}", msg);
        }
    }

    pub fn info(&self, msg: impl fmt::Display) {
        if self.verbosity >= Verbosity::Info {
            eprintln!("Info: {}", msg);
        }
    }

    /// Continuation line for a preceding error or warning, without a
    /// severity prefix.
    pub fn note(&self, msg: impl fmt::Display) {
        if self.verbosity >= Verbosity::Warning {
            eprintln!("  {}", msg);
        }
    }
}
