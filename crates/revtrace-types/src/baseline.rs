use crate::transition::Transition;

/// The point the next search starts from: the most recent transition, or a
/// synthetic seed placed just before the start depth.
///
/// Replaced (never mutated) every time a new transition is recorded.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Baseline {
    pub version: Option<String>,
    pub identity: Option<String>,
    pub revision: String,
    /// Depth relative to the start revision. The seed sits at `start_depth - 1`,
    /// which is `-1` for a fresh run.
    pub depth: i64,
}

impl Baseline {
    /// Seed with no version and no identity, so the first reading always differs.
    pub fn seed(start_revision: impl Into<String>, start_depth: u64) -> Self {
        Self {
            version: None,
            identity: None,
            revision: start_revision.into(),
            depth: start_depth as i64 - 1,
        }
    }

    /// Whether `identity` is the same build as this baseline.
    pub fn matches(&self, identity: &str) -> bool {
        self.identity.as_deref() == Some(identity)
    }

    /// Whether `version` counts as a new version relative to this baseline.
    pub fn is_new_version(&self, version: &str) -> bool {
        self.version.as_deref() != Some(version)
    }

    /// Absolute depth of the commit `offset` steps past this baseline.
    pub fn depth_at(&self, offset: u64) -> Option<u64> {
        let offset = i64::try_from(offset).ok()?;
        let depth = self.depth.checked_add(offset)?;
        u64::try_from(depth).ok()
    }
}

impl From<&Transition> for Baseline {
    fn from(transition: &Transition) -> Self {
        Self {
            version: Some(transition.version.clone()),
            identity: Some(transition.identity.clone()),
            revision: transition.revision.clone(),
            depth: transition.depth as i64,
        }
    }
}

impl From<Transition> for Baseline {
    fn from(transition: Transition) -> Self {
        Self {
            depth: transition.depth as i64,
            version: Some(transition.version),
            identity: Some(transition.identity),
            revision: transition.revision,
        }
    }
}
