use crate::abort::AbortSignal;
use crate::error::{Error, Result};
use crate::oracle::{Oracle, OracleError};
use revtrace_types::{Baseline, Reading};
use tracing::{debug, info};

/// Everything a search step needs, passed explicitly through gallop and
/// bisect: the oracle, the abort signal and the revision depths are
/// counted from.
pub struct SearchContext<O> {
    oracle: O,
    abort: AbortSignal,
    start_revision: String,
    evaluations: u64,
}

impl<O: Oracle> SearchContext<O> {
    pub fn new(oracle: O, abort: AbortSignal, start_revision: impl Into<String>) -> Self {
        Self {
            oracle,
            abort,
            start_revision: start_revision.into(),
            evaluations: 0,
        }
    }

    pub fn start_revision(&self) -> &str {
        &self.start_revision
    }

    /// Number of completed evaluations so far
    pub fn evaluations(&self) -> u64 {
        self.evaluations
    }

    pub fn oracle(&self) -> &O {
        &self.oracle
    }

    pub fn into_oracle(self) -> O {
        self.oracle
    }

    /// Safe point between oracle calls.
    pub fn checkpoint(&self) -> Result<()> {
        if self.abort.is_requested() {
            return Err(Error::Cancelled);
        }
        Ok(())
    }

    /// Check out and evaluate the commit `offset` steps past `baseline`.
    ///
    /// Commits are addressed as `start_revision~depth`, which for a recorded
    /// transition is the same commit as `baseline.revision~offset`.
    pub fn read(&mut self, baseline: &Baseline, offset: u64) -> Result<Reading> {
        let depth = baseline.depth_at(offset).ok_or_else(|| {
            Error::InvariantViolation(format!(
                "offset {} from baseline at depth {} is not a valid depth",
                offset, baseline.depth
            ))
        })?;

        info!(
            "Checking depth {} (relative to last change: {})",
            depth, offset
        );

        self.checkpoint()?;
        let checked_out = self.oracle.checkout(&self.start_revision, depth);
        checked_out.map_err(|err| self.oracle_failure(err))?;
        self.checkpoint()?;

        let evaluated = self.oracle.evaluate();
        let reading = evaluated.map_err(|err| self.oracle_failure(err))?;
        self.evaluations += 1;
        self.checkpoint()?;

        Ok(reading)
    }

    /// Date and full revision of the current checkout.
    pub fn describe_checkout(&mut self) -> Result<(String, String)> {
        let date = self.oracle.commit_date();
        let date = date.map_err(|err| self.oracle_failure(err))?;
        let revision = self.oracle.commit_revision();
        let revision = revision.map_err(|err| self.oracle_failure(err))?;
        Ok((date, revision))
    }

    // Ctrl-C also reaches the child process, so a failure after an abort
    // request is the abort, not a broken oracle.
    fn oracle_failure(&self, err: OracleError) -> Error {
        if self.abort.is_requested() {
            debug!("Oracle call failed after abort was requested: {}", err);
            return Error::Cancelled;
        }
        Error::Oracle(err)
    }
}
