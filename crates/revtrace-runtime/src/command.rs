//! Subprocess helper shared by the git and nix calls.

use revtrace_engine::OracleError;
use std::process::Command;
use tracing::debug;

/// Run `command` to completion and return its stdout.
///
/// A non-zero exit becomes [`OracleError::CommandFailed`] carrying the
/// command line and its stderr.
pub fn capture(mut command: Command) -> Result<String, OracleError> {
    let shown = describe(&command);
    debug!(command = %shown, "Running");

    let output = command.output().map_err(|err| OracleError::CommandFailed {
        command: shown.clone(),
        stderr: format!("failed to start: {}", err),
    })?;

    if !output.status.success() {
        return Err(OracleError::CommandFailed {
            command: shown,
            stderr: String::from_utf8_lossy(&output.stderr).into_owned(),
        });
    }

    String::from_utf8(output.stdout).map_err(|err| OracleError::MalformedOutput {
        command: shown,
        detail: err.to_string(),
    })
}

/// Shell-like rendering of a command for messages.
pub fn describe(command: &Command) -> String {
    std::iter::once(command.get_program())
        .chain(command.get_args())
        .map(|part| part.to_string_lossy())
        .collect::<Vec<_>>()
        .join(" ")
}
