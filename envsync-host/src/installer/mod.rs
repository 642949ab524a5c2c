//! Capability installation service
//!
//! The external installer is reached only through the narrow
//! `CapabilityInstaller` trait: a reachability probe, a raw listing and a
//! single install call. Everything that interprets the listing lives in
//! [`listing`], so its heuristics can change without touching the
//! reconciliation workflow.

pub mod cli;
pub mod fake;
pub mod listing;

use envsync_api::{InstallRequest, IntegrationStatus, ListedIntegration};
use std::path::Path;
use thiserror::Error;

pub use cli::CliInstaller;
pub use fake::FakeInstaller;
pub use listing::parse_listing;

/// Error type for installer operations
#[derive(Debug, Error)]
pub enum InstallerError {
    #[error("Installer not available: {0}")]
    Unavailable(String),

    #[error("Installer command failed ({status}): {stderr}")]
    CommandFailed { status: String, stderr: String },

    #[error("Failed to run installer: {0}")]
    Spawn(#[source] std::io::Error),
}

/// Trait for the external installation service
pub trait CapabilityInstaller: Send + Sync {
    /// Check that the service can run at all
    fn probe(&self) -> Result<(), InstallerError>;

    /// Raw listing output for an environment
    fn list(&self, env: &Path) -> Result<String, InstallerError>;

    /// Register one integration in an environment
    fn install(&self, env: &Path, request: &InstallRequest) -> Result<(), InstallerError>;

    /// Program name shown in manual instructions
    fn program(&self) -> &str {
        "claude"
    }
}

/// Integrations currently registered in `env`.
///
/// A failed listing call yields an empty sequence: it is indistinguishable
/// from "nothing installed" for the caller.
pub fn list_integrations(installer: &dyn CapabilityInstaller, env: &Path) -> Vec<ListedIntegration> {
    match installer.list(env) {
        Ok(output) => parse_listing(&output),
        Err(e) => {
            tracing::warn!(env = %env.display(), error = %e, "Could not list integrations, treating as none installed");
            Vec::new()
        }
    }
}

/// Connection status of one integration in `env`
pub fn status(
    installer: &dyn CapabilityInstaller,
    env: &Path,
    identifier: &str,
) -> IntegrationStatus {
    let listed = list_integrations(installer, env);
    let wanted = identifier.to_lowercase();
    IntegrationStatus::from_listing(listed.iter().find(|l| l.identifier == wanted))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_from_raw_listing() {
        let installer = FakeInstaller::new().with_raw_listing(
            "Checking MCP server health...\n\n\
             atlassian: https://mcp.atlassian.com/v1/sse (SSE) - ✓ Connected\n\
             github: https://api.githubcopilot.com/mcp (HTTP) - ⚠ Needs authentication\n",
        );
        let env = Path::new(".");

        assert_eq!(
            status(&installer, env, "atlassian"),
            IntegrationStatus::PresentReady
        );
        assert_eq!(
            status(&installer, env, "GitHub"),
            IntegrationStatus::PresentUnauthenticated
        );
        assert_eq!(status(&installer, env, "linear"), IntegrationStatus::Absent);
    }

    #[test]
    fn test_listing_failure_reads_as_absent() {
        let installer = FakeInstaller::new()
            .with_installed("atlassian", true)
            .failing_list();
        let env = Path::new(".");

        assert!(list_integrations(&installer, env).is_empty());
        assert_eq!(status(&installer, env, "atlassian"), IntegrationStatus::Absent);
    }
}
