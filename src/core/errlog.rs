//! Error log: captured failures kept for the `/error` command.

use std::collections::VecDeque;
use std::fmt;

use crate::parser::ParseError;

/// A failure worth keeping.
#[derive(Debug)]
pub enum CapturedError {
    /// The input line could not be parsed
    Parse(ParseError),
    /// A handler failed with an unexpected error
    Fault { command: String, error: anyhow::Error },
    /// A handler panicked
    Panic { command: String, message: String },
}

impl fmt::Display for CapturedError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CapturedError::Parse(err) => write!(f, "ParseError: {}", err),
            // Debug output of anyhow carries the cause chain (and backtrace
            // when RUST_BACKTRACE is set).
            CapturedError::Fault { command, error } => write!(f, "{}: {:?}", command, error),
            CapturedError::Panic { command, message } => {
                write!(f, "{}: panicked: {}", command, message)
            }
        }
    }
}

/// FIFO queue of captured failures.
#[derive(Debug, Default)]
pub struct ErrorLog {
    entries: VecDeque<CapturedError>,
}

impl ErrorLog {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn record(&mut self, error: CapturedError) {
        self.entries.push_back(error);
    }

    /// Remove and return everything, oldest first.
    pub fn drain_all(&mut self) -> Vec<CapturedError> {
        self.entries.drain(..).collect()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}
