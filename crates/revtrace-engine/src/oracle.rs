use revtrace_types::Reading;
use std::fmt;

/// Checkout + evaluation backend the search consults.
///
/// Every call is synchronous and may take seconds. Calls mutate shared
/// external state (the working tree), so one oracle serves one search.
pub trait Oracle {
    /// Check out the commit `depth` first-parent steps before `revision`.
    fn checkout(&mut self, revision: &str, depth: u64) -> Result<(), OracleError>;

    /// Version and build identity of the artifact at the current checkout.
    fn evaluate(&mut self) -> Result<Reading, OracleError>;

    /// Commit date of the current checkout.
    fn commit_date(&mut self) -> Result<String, OracleError>;

    /// Full commit id of the current checkout.
    fn commit_revision(&mut self) -> Result<String, OracleError>;
}

impl<O: Oracle + ?Sized> Oracle for &mut O {
    fn checkout(&mut self, revision: &str, depth: u64) -> Result<(), OracleError> {
        (**self).checkout(revision, depth)
    }

    fn evaluate(&mut self) -> Result<Reading, OracleError> {
        (**self).evaluate()
    }

    fn commit_date(&mut self) -> Result<String, OracleError> {
        (**self).commit_date()
    }

    fn commit_revision(&mut self) -> Result<String, OracleError> {
        (**self).commit_revision()
    }
}

/// Failure of a checkout or evaluation. Always fatal to the run.
#[derive(Debug)]
pub enum OracleError {
    /// Subprocess exited unsuccessfully
    CommandFailed { command: String, stderr: String },

    /// Subprocess succeeded but its output could not be understood
    MalformedOutput { command: String, detail: String },

    /// Subprocess could not be spawned
    Io(std::io::Error),
}

impl fmt::Display for OracleError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            OracleError::CommandFailed { command, stderr } => {
                write!(f, "Command '{}' failed with output:\n{}", command, stderr)
            }
            OracleError::MalformedOutput { command, detail } => {
                write!(f, "Command '{}' produced unexpected output: {}", command, detail)
            }
            OracleError::Io(err) => write!(f, "IO error: {}", err),
        }
    }
}

impl std::error::Error for OracleError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            OracleError::Io(err) => Some(err),
            OracleError::CommandFailed { .. } | OracleError::MalformedOutput { .. } => None,
        }
    }
}

impl From<std::io::Error> for OracleError {
    fn from(err: std::io::Error) -> Self {
        OracleError::Io(err)
    }
}
