use crate::abort;
use crate::report;
use anyhow::{Context, Result};
use is_terminal::IsTerminal;
use revtrace_engine::{AbortSignal, ChangeFinder, RunOutcome, SearchContext};
use revtrace_runtime::{ChangeLog, NixOracle, Settings};
use std::io::BufReader;
use tracing::{info, warn};

pub fn handle(settings: &Settings, resume: bool) -> Result<()> {
    println!();
    println!("Press ENTER to cleanly exit this program");
    println!();

    let signal = AbortSignal::new();
    abort::spawn_line_listener(BufReader::new(std::io::stdin()), signal.clone());
    abort::install_interrupt_handler(signal.clone())?;

    let oracle = NixOracle::new(settings)
        .with_context(|| format!("Failed to open repository {}", settings.repo.display()))?;
    let ctx = SearchContext::new(oracle, signal, settings.start_rev.clone());

    let path = settings.log_path();
    let (mut log, mut finder) = if resume {
        let log = ChangeLog::load(&path)
            .with_context(|| format!("Failed to load {}", path.display()))?;
        let finder = match log.last_transition()? {
            Some(last) => {
                info!(
                    version = %last.version,
                    depth = last.depth,
                    "Resuming from recorded change"
                );
                ChangeFinder::resume_from(ctx, last)
            }
            None => ChangeFinder::new(ctx, settings.start_depth),
        };
        (log, finder)
    } else {
        (ChangeLog::create(&path), ChangeFinder::new(ctx, settings.start_depth))
    };

    let outcome = finder.run(settings.versions, &mut log);
    let rows = report::rows(log.versions());
    let finished = log.finish();

    let outcome = match outcome {
        Ok(outcome) => outcome,
        Err(err) => {
            if let Err(flush_err) = finished {
                warn!("Failed to write {}: {}", path.display(), flush_err);
            }
            return Err(err).context("Search failed");
        }
    };
    finished.with_context(|| format!("Failed to write {}", path.display()))?;

    match outcome {
        RunOutcome::Completed(summary) => {
            info!(
                transitions = summary.transitions,
                versions = summary.versions,
                evaluations = summary.evaluations,
                "Search complete, log written to {}",
                path.display()
            );
            println!("{}", report::render(&rows, std::io::stdout().is_terminal()));
        }
        RunOutcome::Cancelled(summary) => {
            info!(
                transitions = summary.transitions,
                evaluations = summary.evaluations,
                "Stopped early, log written to {}",
                path.display()
            );
        }
    }

    Ok(())
}
