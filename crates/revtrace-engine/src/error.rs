use crate::oracle::OracleError;
use std::fmt;

/// Result type for revtrace-engine operations
pub type Result<T> = std::result::Result<T, Error>;

/// Error types that can occur while searching
#[derive(Debug)]
pub enum Error {
    /// Checkout or evaluation failed
    Oracle(OracleError),

    /// The search reached a state that correct oracle behavior cannot produce
    InvariantViolation(String),

    /// Abort was requested. Used to unwind to the finder, which reports it
    /// as a cancelled outcome rather than a failure.
    Cancelled,

    /// Recording a transition failed
    Sink(std::io::Error),
}

impl Error {
    pub fn is_cancelled(&self) -> bool {
        matches!(self, Error::Cancelled)
    }
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Error::Oracle(err) => write!(f, "{}", err),
            Error::InvariantViolation(msg) => write!(f, "Search invariant violated: {}", msg),
            Error::Cancelled => write!(f, "Search cancelled"),
            Error::Sink(err) => write!(f, "Failed to record change: {}", err),
        }
    }
}

impl std::error::Error for Error {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            // displayed verbatim, so skip straight to its cause
            Error::Oracle(err) => std::error::Error::source(err),
            Error::Sink(err) => Some(err),
            Error::InvariantViolation(_) | Error::Cancelled => None,
        }
    }
}

impl From<OracleError> for Error {
    fn from(err: OracleError) -> Self {
        Error::Oracle(err)
    }
}
