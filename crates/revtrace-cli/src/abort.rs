//! Operator-side abort requests.
//!
//! Both listeners only set the flag; the search notices it at its next
//! checkpoint between oracle calls.

use anyhow::{Context, Result};
use revtrace_engine::AbortSignal;
use std::io::BufRead;
use std::thread::JoinHandle;
use tracing::{debug, info, warn};

/// Request abort once a line arrives on `input`.
///
/// Closed input (EOF) is not a request: runs with stdin redirected from
/// `/dev/null` keep going.
pub fn spawn_line_listener<R>(input: R, signal: AbortSignal) -> JoinHandle<bool>
where
    R: BufRead + Send + 'static,
{
    std::thread::spawn(move || wait_for_line(input, &signal))
}

fn wait_for_line<R: BufRead>(mut input: R, signal: &AbortSignal) -> bool {
    let mut line = String::new();
    match input.read_line(&mut line) {
        Ok(0) => {
            debug!("Input closed, abort via ENTER unavailable");
            false
        }
        Ok(_) => {
            info!("Abort requested, stopping after the current step");
            signal.request();
            true
        }
        Err(err) => {
            warn!("Failed to read from stdin: {}", err);
            false
        }
    }
}

/// Route SIGINT, SIGTERM and SIGHUP to `signal` so the log is still flushed.
pub fn install_interrupt_handler(signal: AbortSignal) -> Result<()> {
    ctrlc::set_handler(move || signal.request()).context("Failed to install signal handler")
}
