//! Assertions over persisted change logs.

use anyhow::{Context, Result};
use serde_json::Value;

/// Every recorded depth, ascending.
pub fn log_depths(log: &Value) -> Result<Vec<u64>> {
    let versions = log.as_object().context("Expected change log object")?;
    let mut depths = Vec::new();
    for (version, occurrences) in versions {
        let occurrences = occurrences
            .as_array()
            .with_context(|| format!("Version {} is not a list", version))?;
        for occurrence in occurrences {
            let depth = occurrence["depth"]
                .as_u64()
                .with_context(|| format!("Occurrence of {} missing depth", version))?;
            depths.push(depth);
        }
    }
    depths.sort_unstable();
    Ok(depths)
}

/// Assert the log holds exactly `expected` transitions.
pub fn assert_transition_count(log: &Value, expected: usize) -> Result<()> {
    let count = log_depths(log)?.len();
    if count != expected {
        anyhow::bail!("Expected {} transitions, got {}", expected, count);
    }
    Ok(())
}

/// Assert occurrences under each version are in increasing depth order and
/// that no depth is recorded twice.
pub fn assert_depths_increasing(log: &Value) -> Result<()> {
    let versions = log.as_object().context("Expected change log object")?;
    for (version, occurrences) in versions {
        let depths: Vec<u64> = occurrences
            .as_array()
            .with_context(|| format!("Version {} is not a list", version))?
            .iter()
            .filter_map(|o| o["depth"].as_u64())
            .collect();
        if depths.windows(2).any(|w| w[0] >= w[1]) {
            anyhow::bail!("Depths for {} are not increasing: {:?}", version, depths);
        }
    }

    let mut all = log_depths(log)?;
    let total = all.len();
    all.dedup();
    if all.len() != total {
        anyhow::bail!("Some depth was recorded more than once");
    }
    Ok(())
}
