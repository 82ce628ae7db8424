use crate::{Error, Result};
use revtrace_types::short_revision;
use serde::Deserialize;
use std::path::{Path, PathBuf};

/// nixpkgs master as of 2021-10-25
pub const DEFAULT_START_REV: &str = "8e18c70837aa01ade3718cd0fd35b649b3a2cf52";
pub const DEFAULT_ATTR: &str = "glibc";
pub const DEFAULT_VERSIONS: usize = 10;

/// Resolve the config file path based on priority:
/// 1. Explicit path (with tilde expansion)
/// 2. REVTRACE_CONFIG environment variable (with tilde expansion)
/// 3. XDG config directory
/// 4. ~/.revtrace/config.toml (fallback for systems without XDG)
pub fn resolve_config_path(explicit_path: Option<&str>) -> Result<PathBuf> {
    if let Some(path) = explicit_path {
        return Ok(expand_tilde(path));
    }

    if let Ok(env_path) = std::env::var("REVTRACE_CONFIG") {
        return Ok(expand_tilde(&env_path));
    }

    if let Some(config_dir) = dirs::config_dir() {
        return Ok(config_dir.join("revtrace").join("config.toml"));
    }

    if let Some(home) = std::env::var_os("HOME") {
        return Ok(PathBuf::from(home).join(".revtrace").join("config.toml"));
    }

    Err(Error::Config(
        "Could not determine config path: no HOME directory or XDG config directory found"
            .to_string(),
    ))
}

/// Expand tilde (~) in paths to the user's home directory
fn expand_tilde(path: &str) -> PathBuf {
    if let Some(stripped) = path.strip_prefix("~/")
        && let Some(home) = std::env::var_os("HOME")
    {
        return PathBuf::from(home).join(stripped);
    }
    PathBuf::from(path)
}

/// On-disk configuration. Every key is optional; command-line flags are
/// layered on top with [`Config::merge`] before [`Config::resolve`].
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct Config {
    /// Checkout of the repository being searched
    pub repo: Option<PathBuf>,
    pub start_rev: Option<String>,
    /// Attribute whose version is tracked
    pub attr: Option<String>,
    /// Distinct versions to find
    pub versions: Option<usize>,
    pub start_depth: Option<u64>,
    /// Directory the change log is written to
    pub output_dir: Option<PathBuf>,
    pub git: Option<PathBuf>,
    pub nix: Option<PathBuf>,
}

impl Config {
    pub fn load(explicit_path: Option<&str>) -> Result<Self> {
        let config_path = resolve_config_path(explicit_path)?;
        Self::load_from(&config_path)
    }

    pub fn load_from(path: &Path) -> Result<Self> {
        if !path.exists() {
            return Ok(Self::default());
        }

        let content = std::fs::read_to_string(path)?;
        let config: Config = toml::from_str(&content)?;
        Ok(config)
    }

    /// Overlay `overrides` on top of `self`; set keys in `overrides` win.
    pub fn merge(self, overrides: Config) -> Config {
        Config {
            repo: overrides.repo.or(self.repo),
            start_rev: overrides.start_rev.or(self.start_rev),
            attr: overrides.attr.or(self.attr),
            versions: overrides.versions.or(self.versions),
            start_depth: overrides.start_depth.or(self.start_depth),
            output_dir: overrides.output_dir.or(self.output_dir),
            git: overrides.git.or(self.git),
            nix: overrides.nix.or(self.nix),
        }
    }

    /// Fill in defaults and validate.
    pub fn resolve(self) -> Result<Settings> {
        let repo = self.repo.ok_or_else(|| {
            Error::Config(
                "no repository configured; set `repo` in the config file or pass --repo"
                    .to_string(),
            )
        })?;
        if !repo.is_dir() {
            return Err(Error::Config(format!(
                "repository path {} does not exist",
                repo.display()
            )));
        }

        let start_rev = self
            .start_rev
            .unwrap_or_else(|| DEFAULT_START_REV.to_string());
        if start_rev.trim().is_empty() {
            return Err(Error::Config("start revision is empty".to_string()));
        }

        let attr = self.attr.unwrap_or_else(|| DEFAULT_ATTR.to_string());
        if attr.is_empty() || !attr.chars().all(is_attr_char) {
            return Err(Error::Config(format!("invalid attribute path '{}'", attr)));
        }

        let start_depth = self.start_depth.unwrap_or(0);
        if i64::try_from(start_depth).is_err() {
            return Err(Error::Config(format!(
                "start depth {} is out of range (at most {})",
                start_depth,
                i64::MAX
            )));
        }

        Ok(Settings {
            repo,
            start_rev,
            attr,
            versions: self.versions.unwrap_or(DEFAULT_VERSIONS),
            start_depth,
            output_dir: self.output_dir.unwrap_or_else(|| PathBuf::from(".")),
            git: self.git.unwrap_or_else(|| PathBuf::from("git")),
            nix: self.nix.unwrap_or_else(|| PathBuf::from("nix")),
        })
    }
}

fn is_attr_char(c: char) -> bool {
    c.is_ascii_alphanumeric() || matches!(c, '_' | '-' | '.' | '\'')
}

/// Validated settings for one run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Settings {
    pub repo: PathBuf,
    pub start_rev: String,
    pub attr: String,
    pub versions: usize,
    pub start_depth: u64,
    pub output_dir: PathBuf,
    pub git: PathBuf,
    pub nix: PathBuf,
}

impl Settings {
    /// `changes-<short start rev>.json` inside the output directory
    pub fn log_path(&self) -> PathBuf {
        self.output_dir
            .join(format!("changes-{}.json", short_revision(&self.start_rev)))
    }
}
