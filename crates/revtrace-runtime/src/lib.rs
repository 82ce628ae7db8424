pub mod change_log;
pub mod command;
pub mod config;
pub mod error;
pub mod nix;

pub use change_log::ChangeLog;
pub use config::{Config, Settings, resolve_config_path};
pub use error::{Error, Result};
pub use nix::NixOracle;
