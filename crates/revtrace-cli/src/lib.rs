// revtrace walks a repository's first-parent history backwards from a start
// revision and records every commit where the evaluated package changes.
//
// The search itself lives in revtrace-engine and never touches git or nix
// directly; this crate wires the runtime oracle, the change log and the
// operator's abort request together.

mod abort;
mod args;
mod commands;
mod handlers;
pub mod logging;
pub mod report;

pub use args::{Cli, Commands, FindArgs};
pub use commands::run;
