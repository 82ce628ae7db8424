use crate::report;
use anyhow::{Context, Result};
use is_terminal::IsTerminal;
use revtrace_runtime::ChangeLog;
use std::path::Path;

pub fn handle(path: &Path) -> Result<()> {
    let entries =
        ChangeLog::read(path).with_context(|| format!("Failed to read {}", path.display()))?;

    let rows = report::rows(
        entries
            .iter()
            .map(|(version, occurrences)| (version.as_str(), occurrences.as_slice())),
    );
    println!("{}", report::render(&rows, std::io::stdout().is_terminal()));
    Ok(())
}
