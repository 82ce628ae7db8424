use crate::command::{capture, describe};
use crate::config::Settings;
use revtrace_engine::{Oracle, OracleError};
use revtrace_types::Reading;
use std::path::{Path, PathBuf};
use std::process::Command;

/// Oracle backed by a git checkout of a nixpkgs-style repository and `nix eval`.
pub struct NixOracle {
    repo: PathBuf,
    git: PathBuf,
    nix: PathBuf,
    expr: String,
}

impl NixOracle {
    pub fn new(settings: &Settings) -> crate::Result<Self> {
        let repo = std::fs::canonicalize(&settings.repo)?;
        let expr = attr_expression(&repo, &settings.attr);
        Ok(Self {
            repo,
            git: settings.git.clone(),
            nix: settings.nix.clone(),
            expr,
        })
    }

    pub fn repo(&self) -> &Path {
        &self.repo
    }

    /// The expression handed to `nix eval`
    pub fn expression(&self) -> &str {
        &self.expr
    }

    fn git(&self, args: &[&str]) -> Result<String, OracleError> {
        let mut command = Command::new(&self.git);
        command.arg("-C").arg(&self.repo).args(args);
        capture(command).map(|out| out.trim().to_string())
    }
}

/// Expression returning `{ version, drv }` for `attr` in the repository at `repo`.
pub fn attr_expression(repo: &Path, attr: &str) -> String {
    format!(
        "with (import {} {{ config = {{}}; overlays = []; }});\n\
         {{\n  version = {attr}.version;\n  drv = {attr}.drvPath;\n}}\n",
        nix_string(&repo.to_string_lossy()),
        attr = attr,
    )
}

fn nix_string(value: &str) -> String {
    let escaped = value
        .replace('\\', "\\\\")
        .replace('"', "\\\"")
        .replace("${", "\\${");
    format!("\"{}\"", escaped)
}

impl Oracle for NixOracle {
    fn checkout(&mut self, revision: &str, depth: u64) -> Result<(), OracleError> {
        let target = format!("{}~{}", revision, depth);
        self.git(&["checkout", "--quiet", &target]).map(|_| ())
    }

    fn evaluate(&mut self) -> Result<Reading, OracleError> {
        let mut command = Command::new(&self.nix);
        command
            .args(["eval", "--impure", "--json", "--expr", &self.expr])
            .current_dir(&self.repo);
        let display = describe(&command);

        let json = capture(command)?;
        serde_json::from_str(&json).map_err(|err| OracleError::MalformedOutput {
            command: display,
            detail: err.to_string(),
        })
    }

    fn commit_date(&mut self) -> Result<String, OracleError> {
        self.git(&["show", "-s", "--format=%ci"])
    }

    fn commit_revision(&mut self) -> Result<String, OracleError> {
        self.git(&["rev-parse", "HEAD"])
    }
}
