//! TestWorld pattern for CLI integration tests.
//!
//! Builds an isolated directory holding:
//! - a git repository whose commits each carry a `pkg.json` reading
//! - a fake `nix` that prints `pkg.json` from the checked-out tree
//! - a config file pointing revtrace at both

use anyhow::{Context, Result};
use assert_cmd::Command;
use chrono::{Duration, NaiveDate};
use revtrace_types::short_revision;
use serde_json::{Value, json};
use std::ffi::OsStr;
use std::path::{Path, PathBuf};
use tempfile::TempDir;

const FAKE_NIX: &str = "#!/bin/sh\ncat pkg.json\n";

/// Declarative test environment builder.
///
/// # Example
/// ```no_run
/// use revtrace_testing::TestWorld;
///
/// let world = TestWorld::new()
///     .with_history(&[("2.32", "drv-b"), ("2.33", "drv-c")])
///     .unwrap();
/// assert!(world.log_path().ends_with(format!("changes-{}.json", &world.head()[..7])));
/// ```
pub struct TestWorld {
    temp_dir: TempDir,
    repo: PathBuf,
    output_dir: PathBuf,
    config_path: PathBuf,
    nix: PathBuf,
    head: Option<String>,
}

impl Default for TestWorld {
    fn default() -> Self {
        Self::new()
    }
}

impl TestWorld {
    /// Create a new isolated test environment with an empty repository.
    pub fn new() -> Self {
        let temp_dir = TempDir::new().expect("Failed to create temp dir");
        let base = temp_dir.path().to_path_buf();
        let repo = base.join("repo");
        let output_dir = base.join("out");
        let nix = base.join("bin").join("nix");

        std::fs::create_dir_all(&repo).expect("Failed to create repo dir");
        std::fs::create_dir_all(&output_dir).expect("Failed to create output dir");
        write_executable(&nix, FAKE_NIX).expect("Failed to write fake nix");
        git(&repo, &["init", "--quiet"]).expect("Failed to init repository");

        Self {
            config_path: base.join("config.toml"),
            temp_dir,
            repo,
            output_dir,
            nix,
            head: None,
        }
    }

    /// Commit one `(version, identity)` reading per commit, oldest first.
    ///
    /// The last entry becomes the start revision (depth 0).
    pub fn with_history(mut self, commits: &[(&str, &str)]) -> Result<Self> {
        let first_day = NaiveDate::from_ymd_opt(2021, 1, 1).context("invalid date")?;

        for (i, (version, identity)) in commits.iter().enumerate() {
            let reading = json!({ "version": version, "drv": identity });
            std::fs::write(self.repo.join("pkg.json"), format!("{}\n", reading))?;

            let date = (first_day + Duration::days(i as i64))
                .format("%Y-%m-%d 12:00:00 +0000")
                .to_string();
            git(&self.repo, &["add", "pkg.json"])?;
            git_commit(&self.repo, &format!("{} {}", version, identity), &date)?;
        }

        self.head = Some(git(&self.repo, &["rev-parse", "HEAD"])?);
        self.write_config()?;
        Ok(self)
    }

    /// Make every evaluation take `seconds`, leaving time to interrupt a run.
    pub fn with_slow_nix(self, seconds: &str) -> Result<Self> {
        write_executable(
            &self.nix,
            &format!("#!/bin/sh\nsleep {}\ncat pkg.json\n", seconds),
        )?;
        Ok(self)
    }

    pub fn repo(&self) -> &Path {
        &self.repo
    }

    pub fn output_dir(&self) -> &Path {
        &self.output_dir
    }

    pub fn config_path(&self) -> &Path {
        &self.config_path
    }

    pub fn temp_dir(&self) -> &Path {
        self.temp_dir.path()
    }

    /// The fake `nix` executable.
    pub fn nix(&self) -> &Path {
        &self.nix
    }

    /// Start revision of the search (the newest commit).
    pub fn head(&self) -> &str {
        self.head.as_deref().unwrap_or_default()
    }

    /// Where revtrace writes the change log for this world.
    pub fn log_path(&self) -> PathBuf {
        self.output_dir
            .join(format!("changes-{}.json", short_revision(self.head())))
    }

    pub fn read_log(&self) -> Result<Value> {
        let path = self.log_path();
        let content = std::fs::read_to_string(&path)
            .with_context(|| format!("Failed to read {}", path.display()))?;
        Ok(serde_json::from_str(&content)?)
    }

    /// Write the config file the CLI is pointed at.
    pub fn write_config(&self) -> Result<()> {
        let config = format!(
            "repo = {:?}\nstart_rev = {:?}\nnix = {:?}\noutput_dir = {:?}\n",
            self.repo.display().to_string(),
            self.head(),
            self.nix.display().to_string(),
            self.output_dir.display().to_string(),
        );
        std::fs::write(&self.config_path, config)?;
        Ok(())
    }

    /// Configure a CLI command with this environment's config and cwd.
    ///
    /// The caller provides the base command (e.g. from `cargo_bin_cmd!("revtrace")`).
    pub fn configure_command<'a>(&self, cmd: &'a mut Command) -> &'a mut Command {
        cmd.arg("--config")
            .arg(&self.config_path)
            .current_dir(&self.output_dir)
            .env_remove("RUST_LOG")
            .env_remove("REVTRACE_CONFIG")
    }

    /// Same setup as [`TestWorld::configure_command`] for a plain
    /// `std::process::Command`, for runs driven through [`crate::BackgroundRun`].
    pub fn command(&self, program: impl AsRef<OsStr>) -> std::process::Command {
        let mut cmd = std::process::Command::new(program);
        cmd.arg("--config")
            .arg(&self.config_path)
            .current_dir(&self.output_dir)
            .env_remove("RUST_LOG")
            .env_remove("REVTRACE_CONFIG");
        cmd
    }
}

fn git(repo: &Path, args: &[&str]) -> Result<String> {
    let output = std::process::Command::new("git")
        .arg("-C")
        .arg(repo)
        .args(["-c", "init.defaultBranch=main"])
        .args(args)
        .output()
        .context("Failed to run git")?;
    if !output.status.success() {
        anyhow::bail!(
            "git {:?} failed: {}",
            args,
            String::from_utf8_lossy(&output.stderr)
        );
    }
    Ok(String::from_utf8_lossy(&output.stdout).trim().to_string())
}

fn git_commit(repo: &Path, message: &str, date: &str) -> Result<()> {
    let output = std::process::Command::new("git")
        .arg("-C")
        .arg(repo)
        .args([
            "-c",
            "user.name=revtrace",
            "-c",
            "user.email=revtrace@example.com",
            "-c",
            "commit.gpgsign=false",
            "commit",
            "--quiet",
            // a reading identical to the previous commit's leaves the tree unchanged
            "--allow-empty",
            "-m",
            message,
        ])
        .env("GIT_AUTHOR_DATE", date)
        .env("GIT_COMMITTER_DATE", date)
        .output()
        .context("Failed to run git commit")?;
    if !output.status.success() {
        anyhow::bail!(
            "git commit failed: {}",
            String::from_utf8_lossy(&output.stderr)
        );
    }
    Ok(())
}

fn write_executable(path: &Path, content: &str) -> Result<()> {
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)?;
    }
    std::fs::write(path, content)?;

    #[cfg(unix)]
    {
        use std::os::unix::fs::PermissionsExt;
        std::fs::set_permissions(path, std::fs::Permissions::from_mode(0o755))?;
    }
    Ok(())
}
