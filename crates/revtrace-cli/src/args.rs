use crate::logging::LogLevel;
use clap::{Args, Parser, Subcommand};
use revtrace_runtime::Config;
use std::path::PathBuf;

#[derive(Parser)]
#[command(name = "revtrace")]
#[command(
    about = "Find the commits where a package's version or build changed",
    long_about = None
)]
#[command(version)]
pub struct Cli {
    #[arg(long, global = true, help = "Config file (default: $REVTRACE_CONFIG or the XDG config dir)")]
    pub config: Option<String>,

    #[arg(long, default_value = "info", global = true)]
    pub log_level: LogLevel,

    #[command(subcommand)]
    pub command: Option<Commands>,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Walk history back from the start revision and log every change (default)
    Find(FindArgs),

    /// Summarize a change log written by `find`
    Show {
        #[arg(help = "Path to a changes-<rev>.json file")]
        path: PathBuf,
    },
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Args)]
pub struct FindArgs {
    #[arg(long, help = "Checkout of the repository to search")]
    pub repo: Option<PathBuf>,

    #[arg(long, help = "Revision that depth 0 refers to")]
    pub start_rev: Option<String>,

    #[arg(long, help = "Attribute to evaluate (default: glibc)")]
    pub attr: Option<String>,

    #[arg(long, help = "Distinct versions to find before stopping (default: 10)")]
    pub versions: Option<usize>,

    #[arg(long, help = "First depth to inspect (default: 0)")]
    pub start_depth: Option<u64>,

    #[arg(long, help = "Directory the change log is written to (default: .)")]
    pub output_dir: Option<PathBuf>,

    #[arg(long, help = "Continue from the deepest change in the existing log")]
    pub resume: bool,
}

impl FindArgs {
    /// Flag values as a config layer to merge over the file.
    pub fn overrides(&self) -> Config {
        Config {
            repo: self.repo.clone(),
            start_rev: self.start_rev.clone(),
            attr: self.attr.clone(),
            versions: self.versions,
            start_depth: self.start_depth,
            output_dir: self.output_dir.clone(),
            ..Config::default()
        }
    }
}
