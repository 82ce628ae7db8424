// Engine module - the search itself (gallop, bisect, iterate)
// Everything that touches git, nix or the filesystem lives behind the
// `Oracle` and `TransitionSink` traits so the search can run against fakes.

pub mod abort;
pub mod bisect;
pub mod context;
pub mod error;
pub mod finder;
pub mod oracle;
pub mod gallop;

pub use abort::AbortSignal;
pub use bisect::locate_boundary;
pub use context::SearchContext;
pub use error::{Error, Result};
pub use finder::{ChangeFinder, RunOutcome, RunSummary, TransitionSink};
pub use oracle::{Oracle, OracleError};
pub use gallop::find_upper_bound;

pub use revtrace_types::{Baseline, Reading, Transition};

// Façade API

/// Walk back from `start_depth` until `target_versions` distinct versions
/// have been recorded into `sink`.
pub fn find_changes<O: Oracle, S: TransitionSink>(
    ctx: SearchContext<O>,
    start_depth: u64,
    target_versions: usize,
    sink: &mut S,
) -> Result<RunOutcome> {
    ChangeFinder::new(ctx, start_depth).run(target_versions, sink)
}
