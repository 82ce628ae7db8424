//! Scripted oracle for driving the search without git or nix.

use chrono::{DateTime, Duration, FixedOffset};
use revtrace_engine::{AbortSignal, Oracle, OracleError};
use revtrace_types::{COMMIT_DATE_FORMAT, Reading};

/// A call the search made, in order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum OracleCall {
    Checkout { revision: String, depth: u64 },
    Evaluate,
    CommitDate,
    CommitRevision,
}

/// Oracle over a linear history where `history[d]` is the reading at depth `d`.
///
/// Checking out past the end of the history fails like git does for an
/// unknown revision.
///
/// # Example
/// ```
/// use revtrace_engine::{AbortSignal, ChangeFinder, SearchContext, Transition};
/// use revtrace_testing::ScriptedOracle;
///
/// let oracle = ScriptedOracle::new([("2.33", "d"), ("2.32", "c")]);
/// let ctx = SearchContext::new(oracle, AbortSignal::new(), "start");
/// let mut found: Vec<Transition> = Vec::new();
/// ChangeFinder::new(ctx, 0).run(2, &mut found).unwrap();
/// assert_eq!(found.len(), 2);
/// ```
pub struct ScriptedOracle {
    history: Vec<Reading>,
    newest: DateTime<FixedOffset>,
    current: Option<u64>,
    calls: Vec<OracleCall>,
    fail_checkout_at: Option<u64>,
    abort_after: Option<(usize, AbortSignal)>,
}

impl ScriptedOracle {
    /// Build from `(version, identity)` pairs, newest commit first.
    pub fn new<V, I>(history: impl IntoIterator<Item = (V, I)>) -> Self
    where
        V: Into<String>,
        I: Into<String>,
    {
        let history = history
            .into_iter()
            .map(|(version, identity)| Reading::new(version, identity))
            .collect();
        let newest = DateTime::parse_from_str("2021-10-25 12:00:00 +0000", COMMIT_DATE_FORMAT)
            .expect("static date parses");
        Self {
            history,
            newest,
            current: None,
            calls: Vec::new(),
            fail_checkout_at: None,
            abort_after: None,
        }
    }

    /// Every identity gets its own version (`v-<identity>`).
    pub fn from_identities(identities: &[&str]) -> Self {
        Self::new(
            identities
                .iter()
                .map(|identity| (format!("v-{}", identity), identity.to_string())),
        )
    }

    /// Fail the checkout of `depth` even if it exists.
    pub fn fail_checkout_at(mut self, depth: u64) -> Self {
        self.fail_checkout_at = Some(depth);
        self
    }

    /// Request abort on `signal` once `evaluations` evaluations have completed.
    pub fn abort_after(mut self, evaluations: usize, signal: AbortSignal) -> Self {
        self.abort_after = Some((evaluations, signal));
        self
    }

    pub fn len(&self) -> usize {
        self.history.len()
    }

    pub fn is_empty(&self) -> bool {
        self.history.is_empty()
    }

    pub fn calls(&self) -> &[OracleCall] {
        &self.calls
    }

    /// Depths checked out, in call order
    pub fn checked_out_depths(&self) -> Vec<u64> {
        self.calls
            .iter()
            .filter_map(|call| match call {
                OracleCall::Checkout { depth, .. } => Some(*depth),
                _ => None,
            })
            .collect()
    }

    pub fn evaluations(&self) -> usize {
        self.calls
            .iter()
            .filter(|call| matches!(call, OracleCall::Evaluate))
            .count()
    }

    /// Revision reported for the commit at `depth`.
    pub fn revision_at(depth: u64) -> String {
        format!("{:040x}", 0x8e18c70u64 + depth)
    }

    /// Date reported for the commit at `depth`: one hour per commit.
    pub fn date_at(&self, depth: u64) -> String {
        (self.newest - Duration::hours(depth as i64))
            .format(COMMIT_DATE_FORMAT)
            .to_string()
    }

    fn current(&self, command: &str) -> Result<u64, OracleError> {
        self.current.ok_or_else(|| OracleError::MalformedOutput {
            command: command.to_string(),
            detail: "nothing checked out".to_string(),
        })
    }
}

impl Oracle for ScriptedOracle {
    fn checkout(&mut self, revision: &str, depth: u64) -> Result<(), OracleError> {
        self.calls.push(OracleCall::Checkout {
            revision: revision.to_string(),
            depth,
        });
        if self.fail_checkout_at == Some(depth) || depth as usize >= self.history.len() {
            return Err(OracleError::CommandFailed {
                command: format!("git checkout {}~{}", revision, depth),
                stderr: format!("fatal: invalid reference: {}~{}", revision, depth),
            });
        }
        self.current = Some(depth);
        Ok(())
    }

    fn evaluate(&mut self) -> Result<Reading, OracleError> {
        self.calls.push(OracleCall::Evaluate);
        let depth = self.current("nix eval")?;
        let reading = self.history[depth as usize].clone();

        if let Some((after, signal)) = &self.abort_after
            && self.evaluations() >= *after
        {
            signal.request();
        }
        Ok(reading)
    }

    fn commit_date(&mut self) -> Result<String, OracleError> {
        self.calls.push(OracleCall::CommitDate);
        let depth = self.current("git show")?;
        Ok(self.date_at(depth))
    }

    fn commit_revision(&mut self) -> Result<String, OracleError> {
        self.calls.push(OracleCall::CommitRevision);
        let depth = self.current("git rev-parse")?;
        Ok(Self::revision_at(depth))
    }
}
