use std::error::Error;
use std::fmt::{self, Display, Formatter};
use std::io;
use std::path::{Path, PathBuf};

use owo_colors::OwoColorize;

#[derive(Debug)]
pub enum Severity {
    Error,
}

impl Display for Severity {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        match self {
            Severity::Error => write!(f, "{}", "error".bright_red().bold()),
        }
    }
}

#[derive(Debug)]
pub struct Location {
    pub file: PathBuf,
    pub line: Option<u32>,
}

impl Display for Location {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        match self.line {
            Some(line) => write!(f, "{}:{}", self.file.display(), line),
            None => write!(f, "{}", self.file.display()),
        }
    }
}

// Diagnostics render as `file[:line]: error: message`; the binary prefixes
// the program name.
#[derive(Debug)]
pub struct LlrecError {
    severity: Severity,
    location: Location,
    message: String,
}

impl LlrecError {
    pub fn new(file: &Path, line: Option<u32>, message: String) -> Self {
        LlrecError {
            severity: Severity::Error,
            location: Location {
                file: file.to_path_buf(),
                line,
            },
            message,
        }
    }

    pub fn io(file: &Path, error: io::Error) -> Self {
        LlrecError::new(file, None, format!("cannot read file: {}", error))
    }

    pub fn location(&self) -> &Location {
        &self.location
    }

    pub fn message(&self) -> &str {
        &self.message
    }
}

impl Error for LlrecError {}

impl Display for LlrecError {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}: {}", self.location, self.severity, self.message)
    }
}
