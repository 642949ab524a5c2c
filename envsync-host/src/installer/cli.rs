//! Installer backed by an external command-line tool
//!
//! Runs `<program> --version` as the availability probe,
//! `<program> mcp list` for discovery and `<program> mcp add ...` to
//! install. Arguments are passed directly, never through a shell.

use envsync_api::InstallRequest;
use std::path::Path;
use std::process::{Command, Output, Stdio};

use super::{CapabilityInstaller, InstallerError};

/// Default installer program
pub const DEFAULT_PROGRAM: &str = "claude";

/// Production installer that spawns the CLI tool
#[derive(Debug, Clone)]
pub struct CliInstaller {
    program: String,
}

impl CliInstaller {
    pub fn new(program: impl Into<String>) -> Self {
        Self {
            program: program.into(),
        }
    }

    fn run(&self, env: Option<&Path>, args: &[String]) -> Result<Output, InstallerError> {
        let mut command = Command::new(&self.program);
        command.args(args).stdin(Stdio::null());
        if let Some(env) = env {
            command.current_dir(env);
        }
        command.output().map_err(InstallerError::Spawn)
    }

    fn check(output: Output) -> Result<String, InstallerError> {
        if output.status.success() {
            Ok(String::from_utf8_lossy(&output.stdout).to_string())
        } else {
            Err(InstallerError::CommandFailed {
                status: output.status.to_string(),
                stderr: String::from_utf8_lossy(&output.stderr).trim().to_string(),
            })
        }
    }
}

impl Default for CliInstaller {
    fn default() -> Self {
        Self::new(DEFAULT_PROGRAM)
    }
}

impl CapabilityInstaller for CliInstaller {
    fn probe(&self) -> Result<(), InstallerError> {
        let output = self
            .run(None, &["--version".to_string()])
            .map_err(|e| InstallerError::Unavailable(format!("{}: {}", self.program, e)))?;
        Self::check(output)
            .map(|version| {
                tracing::debug!(program = %self.program, version = %version.trim(), "Installer available");
            })
            .map_err(|e| InstallerError::Unavailable(format!("{}: {}", self.program, e)))
    }

    fn list(&self, env: &Path) -> Result<String, InstallerError> {
        let args = ["mcp".to_string(), "list".to_string()];
        Self::check(self.run(Some(env), &args)?)
    }

    fn install(&self, env: &Path, request: &InstallRequest) -> Result<(), InstallerError> {
        let args = request.args();
        tracing::info!(
            program = %self.program,
            integration = %request.identifier,
            env = %env.display(),
            "Running installer"
        );
        Self::check(self.run(Some(env), &args)?).map(|_| ())
    }

    fn program(&self) -> &str {
        &self.program
    }
}
