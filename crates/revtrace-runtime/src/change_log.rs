//! Append-only, resumable record of discovered transitions.
//!
//! The log maps each version to the occurrences found for it, in discovery
//! order, and is persisted as pretty-printed JSON:
//!
//! ```json
//! {
//!   "2.33": [
//!     { "drv": "/nix/store/...-glibc-2.33.drv", "date": "...", "rev": "...", "depth": 0 }
//!   ]
//! }
//! ```
//!
//! Writes happen every [`FLUSH_EVERY`] additions and once more when the log
//! is finished or dropped, so a crash loses nothing already handed to it
//! unless the process is killed outright.

use crate::{Error, Result};
use revtrace_engine::TransitionSink;
use revtrace_types::{Occurrence, Transition};
use serde::de::{MapAccess, Visitor};
use serde::ser::SerializeMap;
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::fmt;
use std::io::Write;
use std::path::{Path, PathBuf};
use tracing::{debug, warn};

/// Additions between periodic flushes
pub const FLUSH_EVERY: usize = 5;

type Entries = Vec<(String, Vec<Occurrence>)>;

pub struct ChangeLog {
    path: PathBuf,
    entries: Entries,
    added: usize,
    finished: bool,
}

impl ChangeLog {
    /// Start an empty log; the first flush replaces whatever is at `path`.
    pub fn create(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            entries: Vec::new(),
            added: 0,
            finished: false,
        }
    }

    /// Open the log at `path`, keeping its contents. A missing file is an empty log.
    pub fn load(path: impl Into<PathBuf>) -> Result<Self> {
        let mut log = Self::create(path);
        if log.path.exists() {
            log.entries = Self::read(&log.path)?;
        }
        Ok(log)
    }

    /// Parse the log at `path` without taking ownership of the file.
    pub fn read(path: &Path) -> Result<Vec<(String, Vec<Occurrence>)>> {
        let content = std::fs::read_to_string(path)?;
        let OrderedLog(entries) = serde_json::from_str(&content)?;
        Ok(entries)
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Number of recorded occurrences across all versions
    pub fn len(&self) -> usize {
        self.entries.iter().map(|(_, list)| list.len()).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Versions in first-discovery order with their occurrences.
    pub fn versions(&self) -> impl Iterator<Item = (&str, &[Occurrence])> {
        self.entries
            .iter()
            .map(|(version, list)| (version.as_str(), list.as_slice()))
    }

    /// Append `transition` under its version, flushing every [`FLUSH_EVERY`] additions.
    pub fn add(&mut self, transition: Transition) -> Result<()> {
        let (version, occurrence) = transition.into_occurrence();
        match self.entries.iter_mut().find(|(v, _)| *v == version) {
            Some((_, list)) => list.push(occurrence),
            None => self.entries.push((version, vec![occurrence])),
        }

        self.added += 1;
        if self.added % FLUSH_EVERY == 0 {
            self.flush()?;
        }
        Ok(())
    }

    /// The deepest recorded occurrence, rejoined with its version.
    pub fn last_transition(&self) -> Result<Option<Transition>> {
        let deepest = self
            .entries
            .iter()
            .flat_map(|(version, list)| list.iter().map(move |o| (version, o)))
            .max_by_key(|(_, occurrence)| occurrence.depth);

        let Some((version, occurrence)) = deepest else {
            return Ok(None);
        };
        occurrence.to_transition(version).map(Some).ok_or_else(|| {
            Error::InvalidLog(format!(
                "occurrence of {} at depth {} has no drv",
                version, occurrence.depth
            ))
        })
    }

    /// Pretty-printed JSON with a trailing newline.
    pub fn to_json(&self) -> Result<String> {
        let mut json = serde_json::to_string_pretty(&OrderedLogRef(&self.entries))?;
        json.push('\n');
        Ok(json)
    }

    /// Atomically replace the file at `path` with the full log.
    pub fn flush(&self) -> Result<()> {
        let json = self.to_json()?;
        write_atomically(&self.path, &json)?;
        debug!(path = %self.path.display(), transitions = self.len(), "Flushed change log");
        Ok(())
    }

    /// Final flush. After this, dropping the log writes nothing.
    pub fn finish(mut self) -> Result<()> {
        self.finished = true;
        self.flush()
    }
}

impl Drop for ChangeLog {
    fn drop(&mut self) {
        if self.finished {
            return;
        }
        self.finished = true;
        if let Err(err) = self.flush() {
            warn!(path = %self.path.display(), "Failed to flush change log: {}", err);
        }
    }
}

impl TransitionSink for ChangeLog {
    fn record(&mut self, transition: &Transition) -> std::io::Result<()> {
        self.add(transition.clone()).map_err(|err| match err {
            Error::Io(err) => err,
            other => std::io::Error::other(other),
        })
    }
}

fn write_atomically(path: &Path, content: &str) -> Result<()> {
    let dir = match path.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent,
        _ => Path::new("."),
    };
    std::fs::create_dir_all(dir)?;

    let mut file = tempfile::NamedTempFile::new_in(dir)?;
    file.write_all(content.as_bytes())?;
    file.persist(path).map_err(|err| err.error)?;
    Ok(())
}

// JSON objects have no inherent order; these keep versions in discovery order.

struct OrderedLogRef<'a>(&'a Entries);

impl Serialize for OrderedLogRef<'_> {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(self.0.len()))?;
        for (version, occurrences) in self.0 {
            map.serialize_entry(version, occurrences)?;
        }
        map.end()
    }
}

struct OrderedLog(Entries);

impl<'de> Deserialize<'de> for OrderedLog {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> std::result::Result<Self, D::Error> {
        struct LogVisitor;

        impl<'de> Visitor<'de> for LogVisitor {
            type Value = OrderedLog;

            fn expecting(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str("a map from version to a list of occurrences")
            }

            fn visit_map<A: MapAccess<'de>>(self, mut access: A) -> std::result::Result<OrderedLog, A::Error> {
                let mut entries: Entries = Vec::new();
                while let Some((version, occurrences)) =
                    access.next_entry::<String, Vec<Occurrence>>()?
                {
                    match entries.iter_mut().find(|(v, _)| *v == version) {
                        Some((_, list)) => list.extend(occurrences),
                        None => entries.push((version, occurrences)),
                    }
                }
                Ok(OrderedLog(entries))
            }
        }

        deserializer.deserialize_map(LogVisitor)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn transition(version: &str, depth: u64) -> Transition {
        Transition {
            version: version.to_string(),
            identity: format!("/nix/store/{}-glibc-{}.drv", depth, version),
            date: "2021-10-25 10:14:02 +0200".to_string(),
            revision: format!("{:040x}", depth),
            depth,
        }
    }

    #[test]
    fn test_groups_by_version_in_discovery_order() -> Result<()> {
        let temp_dir = TempDir::new()?;
        let mut log = ChangeLog::create(temp_dir.path().join("changes.json"));

        log.add(transition("2.33", 0))?;
        log.add(transition("2.32", 3))?;
        log.add(transition("2.32", 4))?;

        let versions: Vec<(&str, Vec<u64>)> = log
            .versions()
            .map(|(v, list)| (v, list.iter().map(|o| o.depth).collect()))
            .collect();
        assert_eq!(versions, vec![("2.33", vec![0]), ("2.32", vec![3, 4])]);
        assert_eq!(log.len(), 3);

        log.finish()
    }

    #[test]
    fn test_persisted_format() -> Result<()> {
        let temp_dir = TempDir::new()?;
        let path = temp_dir.path().join("changes-8e18c70.json");
        let mut log = ChangeLog::create(&path);
        log.add(transition("2.33", 0))?;
        log.add(transition("2.32", 3))?;
        log.finish()?;

        let content = std::fs::read_to_string(&path)?;
        assert!(content.ends_with("}\n"));
        insta::assert_snapshot!(content.trim_end(), @r#"
        {
          "2.33": [
            {
              "drv": "/nix/store/0-glibc-2.33.drv",
              "date": "2021-10-25 10:14:02 +0200",
              "rev": "0000000000000000000000000000000000000000",
              "depth": 0
            }
          ],
          "2.32": [
            {
              "drv": "/nix/store/3-glibc-2.32.drv",
              "date": "2021-10-25 10:14:02 +0200",
              "rev": "0000000000000000000000000000000000000003",
              "depth": 3
            }
          ]
        }
        "#);
        Ok(())
    }

    #[test]
    fn test_flushes_every_fifth_addition() -> Result<()> {
        let temp_dir = TempDir::new()?;
        let path = temp_dir.path().join("changes.json");
        let mut log = ChangeLog::create(&path);

        for depth in 0..4 {
            log.add(transition(&format!("2.{}", 40 - depth), depth))?;
        }
        assert!(!path.exists());

        log.add(transition("2.30", 4))?;
        assert_eq!(ChangeLog::load(&path)?.len(), 5);

        log.add(transition("2.29", 5))?;
        assert_eq!(ChangeLog::load(&path)?.len(), 5);

        log.finish()?;
        assert_eq!(ChangeLog::load(&path)?.len(), 6);
        Ok(())
    }

    #[test]
    fn test_drop_flushes_unfinished_log() -> Result<()> {
        let temp_dir = TempDir::new()?;
        let path = temp_dir.path().join("changes.json");
        {
            let mut log = ChangeLog::create(&path);
            log.add(transition("2.33", 0))?;
            log.add(transition("2.32", 2))?;
        }
        assert_eq!(ChangeLog::load(&path)?.len(), 2);
        Ok(())
    }

    #[test]
    fn test_drop_flushes_during_panic() -> Result<()> {
        let temp_dir = TempDir::new()?;
        let path = temp_dir.path().join("changes.json");
        let moved = path.clone();

        let result = std::panic::catch_unwind(move || {
            let mut log = ChangeLog::create(moved);
            log.add(transition("2.33", 0)).unwrap();
            panic!("evaluator crashed");
        });
        assert!(result.is_err());
        assert_eq!(ChangeLog::load(&path)?.len(), 1);
        Ok(())
    }

    #[test]
    fn test_empty_log_writes_empty_object() -> Result<()> {
        let temp_dir = TempDir::new()?;
        let path = temp_dir.path().join("changes.json");
        ChangeLog::create(&path).finish()?;
        assert_eq!(std::fs::read_to_string(&path)?, "{}\n");
        Ok(())
    }

    #[test]
    fn test_create_overwrites_previous_file() -> Result<()> {
        let temp_dir = TempDir::new()?;
        let path = temp_dir.path().join("changes.json");
        let mut first = ChangeLog::create(&path);
        first.add(transition("2.33", 0))?;
        first.finish()?;

        let mut second = ChangeLog::create(&path);
        second.add(transition("2.20", 9))?;
        second.finish()?;

        let reloaded = ChangeLog::load(&path)?;
        assert_eq!(reloaded.len(), 1);
        assert_eq!(reloaded.versions().next().map(|(v, _)| v), Some("2.20"));
        Ok(())
    }

    #[test]
    fn test_load_keeps_order_and_resumes() -> Result<()> {
        let temp_dir = TempDir::new()?;
        let path = temp_dir.path().join("changes.json");
        let mut log = ChangeLog::create(&path);
        log.add(transition("2.9", 0))?;
        log.add(transition("2.10", 1))?;
        log.add(transition("2.10", 6))?;
        log.finish()?;

        let mut resumed = ChangeLog::load(&path)?;
        let order: Vec<&str> = resumed.versions().map(|(v, _)| v).collect();
        assert_eq!(order, vec!["2.9", "2.10"]);
        assert_eq!(resumed.last_transition()?, Some(transition("2.10", 6)));

        resumed.add(transition("2.8", 8))?;
        resumed.finish()?;
        assert_eq!(ChangeLog::load(&path)?.len(), 4);
        Ok(())
    }

    #[test]
    fn test_read_leaves_file_untouched() -> Result<()> {
        let temp_dir = TempDir::new()?;
        let path = temp_dir.path().join("changes.json");
        let compact = r#"{"2.33":[{"drv":"d","date":"x","rev":"r","depth":0}]}"#;
        std::fs::write(&path, compact)?;

        let entries = ChangeLog::read(&path)?;
        assert_eq!(entries.len(), 1);
        assert_eq!(entries[0].1[0].identity.as_deref(), Some("d"));
        assert_eq!(std::fs::read_to_string(&path)?, compact);
        Ok(())
    }

    #[test]
    fn test_load_missing_file_is_empty() -> Result<()> {
        let temp_dir = TempDir::new()?;
        let log = ChangeLog::load(temp_dir.path().join("missing.json"))?;
        assert!(log.is_empty());
        assert_eq!(log.last_transition()?, None);
        Ok(())
    }

    #[test]
    fn test_last_transition_needs_identity() -> Result<()> {
        let temp_dir = TempDir::new()?;
        let path = temp_dir.path().join("changes.json");
        std::fs::write(
            &path,
            r#"{"2.33": [{"drv": null, "date": "", "rev": "abc", "depth": 4}]}"#,
        )?;

        let log = ChangeLog::load(&path)?;
        assert!(matches!(log.last_transition(), Err(Error::InvalidLog(_))));
        Ok(())
    }

    #[test]
    fn test_load_rejects_malformed_file() -> Result<()> {
        let temp_dir = TempDir::new()?;
        let path = temp_dir.path().join("changes.json");
        std::fs::write(&path, "[1, 2, 3]")?;

        assert!(matches!(ChangeLog::load(&path), Err(Error::Json(_))));
        Ok(())
    }
}
