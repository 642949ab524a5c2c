//! In-memory installer for tests and dry runs
//!
//! Keeps its own registry of installed integrations, renders it in the same
//! line format as the real listing, and records every install request.

use envsync_api::InstallRequest;
use std::collections::HashSet;
use std::path::Path;
use std::sync::Mutex;

use super::{CapabilityInstaller, InstallerError};

#[derive(Debug, Clone)]
struct FakeEntry {
    identifier: String,
    endpoint: String,
    connected: bool,
}

/// Test-double installer
#[derive(Debug)]
pub struct FakeInstaller {
    entries: Mutex<Vec<FakeEntry>>,
    requests: Mutex<Vec<InstallRequest>>,
    raw_listing: Option<String>,
    available: bool,
    list_fails: bool,
    failing: HashSet<String>,
    connect_on_install: bool,
}

impl Default for FakeInstaller {
    fn default() -> Self {
        Self::new()
    }
}

impl FakeInstaller {
    /// Available installer with nothing installed; installs come up connected
    pub fn new() -> Self {
        Self {
            entries: Mutex::new(Vec::new()),
            requests: Mutex::new(Vec::new()),
            raw_listing: None,
            available: true,
            list_fails: false,
            failing: HashSet::new(),
            connect_on_install: true,
        }
    }

    /// Installer whose probe fails
    pub fn unavailable() -> Self {
        Self {
            available: false,
            ..Self::new()
        }
    }

    /// Pre-register an integration
    pub fn with_installed(self, identifier: &str, connected: bool) -> Self {
        self.entries.lock().unwrap().push(FakeEntry {
            identifier: identifier.to_string(),
            endpoint: "https://example.invalid".to_string(),
            connected,
        });
        self
    }

    /// Return this text from `list` instead of the rendered registry
    pub fn with_raw_listing(mut self, output: impl Into<String>) -> Self {
        self.raw_listing = Some(output.into());
        self
    }

    /// Make `list` fail while the probe still succeeds
    pub fn failing_list(mut self) -> Self {
        self.list_fails = true;
        self
    }

    /// Make installs of `identifier` fail
    pub fn failing_install(mut self, identifier: &str) -> Self {
        self.failing.insert(identifier.to_string());
        self
    }

    /// Newly installed integrations show up without a connection
    pub fn installs_unauthenticated(mut self) -> Self {
        self.connect_on_install = false;
        self
    }

    /// All install requests received, in order
    pub fn requests(&self) -> Vec<InstallRequest> {
        self.requests.lock().unwrap().clone()
    }

    pub fn install_count(&self) -> usize {
        self.requests.lock().unwrap().len()
    }

    fn render(&self) -> String {
        self.entries
            .lock()
            .unwrap()
            .iter()
            .map(|e| {
                let state = if e.connected {
                    "✓ Connected"
                } else {
                    "⚠ Needs authentication"
                };
                format!("{}: {} - {}\n", e.identifier, e.endpoint, state)
            })
            .collect()
    }
}

impl CapabilityInstaller for FakeInstaller {
    fn probe(&self) -> Result<(), InstallerError> {
        if self.available {
            Ok(())
        } else {
            Err(InstallerError::Unavailable("fake installer offline".to_string()))
        }
    }

    fn list(&self, _env: &Path) -> Result<String, InstallerError> {
        if !self.available || self.list_fails {
            return Err(InstallerError::CommandFailed {
                status: "exit status: 1".to_string(),
                stderr: "listing failed".to_string(),
            });
        }
        Ok(self.raw_listing.clone().unwrap_or_else(|| self.render()))
    }

    fn install(&self, _env: &Path, request: &InstallRequest) -> Result<(), InstallerError> {
        self.requests.lock().unwrap().push(request.clone());

        if !self.available {
            return Err(InstallerError::Unavailable("fake installer offline".to_string()));
        }
        if self.failing.contains(&request.identifier) {
            return Err(InstallerError::CommandFailed {
                status: "exit status: 1".to_string(),
                stderr: format!("could not add {}", request.identifier),
            });
        }

        let mut entries = self.entries.lock().unwrap();
        entries.retain(|e| e.identifier != request.identifier);
        entries.push(FakeEntry {
            identifier: request.identifier.clone(),
            endpoint: request.endpoint.clone(),
            connected: self.connect_on_install,
        });
        Ok(())
    }

    fn program(&self) -> &str {
        "fake"
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::installer::parse_listing;
    use envsync_api::Transport;

    fn request(id: &str) -> InstallRequest {
        InstallRequest {
            identifier: id.to_string(),
            transport: Transport::Sse,
            endpoint: "https://mcp.example.com/sse".to_string(),
            params: vec![("TOKEN".into(), "t".into())],
        }
    }

    #[test]
    fn test_install_then_list() {
        let fake = FakeInstaller::new().with_installed("old", false);
        fake.install(Path::new("."), &request("new")).unwrap();

        let listed = parse_listing(&fake.list(Path::new(".")).unwrap());
        assert_eq!(listed.len(), 2);
        assert!(!listed[0].connected);
        assert_eq!(listed[1].identifier, "new");
        assert!(listed[1].connected);
        assert_eq!(fake.requests()[0].params[0].0, "TOKEN");
    }

    #[test]
    fn test_failing_install_records_request() {
        let fake = FakeInstaller::new().failing_install("bad");
        assert!(fake.install(Path::new("."), &request("bad")).is_err());
        assert_eq!(fake.install_count(), 1);
        assert!(fake.list(Path::new(".")).unwrap().is_empty());
    }
}
