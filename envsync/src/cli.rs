//! Command-line arguments

use clap::{Parser, Subcommand};
use std::path::PathBuf;

use crate::tracing_support::TracingFormat;

/// envsync command line
#[derive(Debug, Parser)]
#[command(name = "envsync")]
#[command(about = "Reconcile a project's assistant permissions and MCP integrations", long_about = None)]
#[command(version)]
pub struct Cli {
    /// Project root to reconcile
    #[arg(short, long, env = "ENVSYNC_TARGET", default_value = ".", global = true)]
    pub target: PathBuf,

    /// Installer program used to list and add integrations
    #[arg(long, env = "ENVSYNC_INSTALLER_BIN", default_value = "claude", global = true)]
    pub installer_bin: String,

    /// Accept every default without prompting
    #[arg(short, long, env = "ENVSYNC_YES", global = true)]
    pub yes: bool,

    /// Print reports as JSON on stdout
    #[arg(long, env = "ENVSYNC_JSON", global = true)]
    pub json: bool,

    /// Append audit events to this JSON Lines file
    #[arg(long, env = "ENVSYNC_AUDIT_LOG", global = true)]
    pub audit_log: Option<PathBuf>,

    /// Log output format
    #[arg(long, env = "ENVSYNC_LOG_FORMAT", value_enum, default_value = "compact", global = true)]
    pub log_format: TracingFormat,

    /// More log output (-v info, -vv debug, -vvv trace)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    #[command(subcommand)]
    pub command: Option<Commands>,
}

impl Cli {
    pub fn subcommand(&self) -> Commands {
        self.command.clone().unwrap_or(Commands::All)
    }
}

/// Available commands
#[derive(Debug, Clone, PartialEq, Eq, Subcommand)]
pub enum Commands {
    /// Add missing permission rules to the settings document
    Permissions {
        /// Extra rule to merge without prompting (repeatable)
        #[arg(long = "add-rule", value_name = "RULE")]
        add_rules: Vec<String>,
    },

    /// Install missing integrations
    Integrations,

    /// Permissions, then integrations (default)
    All,

    /// Print the required permission rules
    Rules,
}
