use serde::{Deserialize, Serialize};

/// Format produced by `git show -s --format=%ci`
pub const COMMIT_DATE_FORMAT: &str = "%Y-%m-%d %H:%M:%S %z";

/// What the evaluator reports for the artifact at the current checkout
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Reading {
    pub version: String,
    /// Build identity (e.g. a `.drv` store path). Changes on every rebuild,
    /// even when `version` does not.
    #[serde(rename = "drv")]
    pub identity: String,
}

impl Reading {
    pub fn new(version: impl Into<String>, identity: impl Into<String>) -> Self {
        Self {
            version: version.into(),
            identity: identity.into(),
        }
    }
}

/// A commit at which the artifact's identity differs from the previous baseline.
///
/// Created once by the bisection step and never modified afterwards.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Transition {
    pub version: String,
    pub identity: String,
    /// Commit timestamp as reported by git
    pub date: String,
    /// Full commit id
    pub revision: String,
    /// Distance (in first-parent commits) from the start revision
    pub depth: u64,
}

impl Transition {
    /// Split into the version key and the occurrence stored under it.
    pub fn into_occurrence(self) -> (String, Occurrence) {
        let occurrence = Occurrence {
            identity: Some(self.identity),
            date: self.date,
            revision: self.revision,
            depth: self.depth,
        };
        (self.version, occurrence)
    }
}

/// One persisted occurrence of a version: everything in a [`Transition`]
/// except the version, which is the key it is stored under.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Occurrence {
    #[serde(rename = "drv", default)]
    pub identity: Option<String>,
    pub date: String,
    #[serde(rename = "rev")]
    pub revision: String,
    pub depth: u64,
}

impl Occurrence {
    /// Rejoin with its version key. Returns `None` when the identity was not recorded.
    pub fn to_transition(&self, version: &str) -> Option<Transition> {
        let identity = self.identity.clone()?;
        Some(Transition {
            version: version.to_string(),
            identity,
            date: self.date.clone(),
            revision: self.revision.clone(),
            depth: self.depth,
        })
    }
}
