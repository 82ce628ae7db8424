/// Number of revision characters used in log file names
pub const SHORT_REVISION_LEN: usize = 7;

/// Abbreviate a revision the way git does for display (`8e18c70`).
pub fn short_revision(revision: &str) -> &str {
    match revision.char_indices().nth(SHORT_REVISION_LEN) {
        Some((idx, _)) => &revision[..idx],
        None => revision,
    }
}
