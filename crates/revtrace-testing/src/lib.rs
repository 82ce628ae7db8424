//! Testing infrastructure for revtrace.
//!
//! - `ScriptedOracle`: in-memory oracle driven by an identity-by-depth table
//! - `TestWorld`: temporary git repository plus fake evaluator for CLI tests
//! - `BackgroundRun`: a running CLI process to interrupt mid-search
//! - `assertions`: checks over persisted change logs

pub mod assertions;
pub mod oracle;
pub mod process;
pub mod world;

pub use oracle::{OracleCall, ScriptedOracle};
pub use process::BackgroundRun;
pub use world::TestWorld;
