//! envsync: reconcile a project's assistant permissions and MCP integrations
//!
//! The binary is a thin shell over `envsync-host`: it parses flags, sets up
//! logging and the runtime configuration, runs the reconcilers and renders
//! their reports as text or JSON.

pub mod cli;
pub mod run;
pub mod summary;
pub mod tracing_support;

pub use cli::{Cli, Commands};
pub use run::{build_config, run, run_with_config, RunReport};
