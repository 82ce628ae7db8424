use crate::bisect::locate_boundary;
use crate::context::SearchContext;
use crate::error::{Error, Result};
use crate::oracle::Oracle;
use crate::gallop::find_upper_bound;
use revtrace_types::{Baseline, Transition};
use tracing::info;

/// Destination for transitions as they are found.
pub trait TransitionSink {
    fn record(&mut self, transition: &Transition) -> std::io::Result<()>;
}

impl TransitionSink for Vec<Transition> {
    fn record(&mut self, transition: &Transition) -> std::io::Result<()> {
        self.push(transition.clone());
        Ok(())
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RunSummary {
    /// Transitions recorded, rebuilds included
    pub transitions: usize,
    /// Transitions that introduced a version different from their baseline
    pub versions: usize,
    pub evaluations: u64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RunOutcome {
    /// The requested number of versions was found
    Completed(RunSummary),
    /// Abort was requested before that
    Cancelled(RunSummary),
}

impl RunOutcome {
    pub fn summary(&self) -> &RunSummary {
        match self {
            RunOutcome::Completed(summary) | RunOutcome::Cancelled(summary) => summary,
        }
    }

    pub fn is_cancelled(&self) -> bool {
        matches!(self, RunOutcome::Cancelled(_))
    }
}

/// Repeats gallop + bisect from the latest transition until enough distinct
/// versions have been seen.
pub struct ChangeFinder<O> {
    ctx: SearchContext<O>,
    baseline: Baseline,
}

impl<O: Oracle> ChangeFinder<O> {
    /// Start from the synthetic seed just before `start_depth`.
    pub fn new(ctx: SearchContext<O>, start_depth: u64) -> Self {
        let baseline = Baseline::seed(ctx.start_revision(), start_depth);
        Self { ctx, baseline }
    }

    /// Continue from a transition recorded by an earlier run.
    pub fn resume_from(ctx: SearchContext<O>, last: Transition) -> Self {
        Self {
            ctx,
            baseline: Baseline::from(last),
        }
    }

    pub fn baseline(&self) -> &Baseline {
        &self.baseline
    }

    pub fn context(&self) -> &SearchContext<O> {
        &self.ctx
    }

    pub fn into_context(self) -> SearchContext<O> {
        self.ctx
    }

    /// Record transitions into `sink` until `target_versions` distinct
    /// versions have been found. A rebuild (same version, new identity) is
    /// recorded but does not count.
    pub fn run<S: TransitionSink>(
        &mut self,
        target_versions: usize,
        sink: &mut S,
    ) -> Result<RunOutcome> {
        let mut summary = RunSummary::default();
        let evaluations_before = self.ctx.evaluations();

        while summary.versions < target_versions {
            let step = self.next_transition();
            summary.evaluations = self.ctx.evaluations() - evaluations_before;

            let transition = match step {
                Ok(transition) => transition,
                Err(Error::Cancelled) => {
                    info!("Abort requested, stopping search");
                    return Ok(RunOutcome::Cancelled(summary));
                }
                Err(err) => return Err(err),
            };

            info!(
                version = %transition.version,
                date = %transition.date,
                revision = %transition.revision,
                depth = transition.depth,
                "Found change"
            );
            sink.record(&transition).map_err(Error::Sink)?;

            summary.transitions += 1;
            if self.baseline.is_new_version(&transition.version) {
                summary.versions += 1;
            }
            self.baseline = Baseline::from(transition);
        }

        Ok(RunOutcome::Completed(summary))
    }

    fn next_transition(&mut self) -> Result<Transition> {
        let upper_bound = find_upper_bound(&mut self.ctx, &self.baseline)?;
        locate_boundary(&mut self.ctx, &self.baseline, upper_bound)
    }
}
