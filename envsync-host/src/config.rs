//! Runtime configuration bundle for the reconcilers
//!
//! Provides ready-to-use setups for interactive shells, unattended runs and
//! tests, plus a builder for everything in between.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use crate::audit::{AuditSink, FileAuditSink, NullAuditSink};
use crate::catalog::{Catalog, CatalogError};
use crate::installer::{CapabilityInstaller, CliInstaller};
use crate::prompt::{AutoPrompts, PromptProvider, TerminalPrompts};

/// Error type for configuration assembly
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Invalid catalog: {0}")]
    InvalidCatalog(#[from] CatalogError),

    #[error("Failed to initialize audit: {0}")]
    AuditInit(String),
}

/// Everything a reconciliation pass depends on
pub struct EnvsyncConfig {
    /// Required rules and known integrations
    pub catalog: Catalog,
    /// User interaction
    pub prompt: Arc<dyn PromptProvider>,
    /// Installation service
    pub installer: Arc<dyn CapabilityInstaller>,
    /// Audit sink
    pub audit: Arc<dyn AuditSink>,
}

impl std::fmt::Debug for EnvsyncConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EnvsyncConfig")
            .field("catalog", &self.catalog.version())
            .field("installer", &self.installer.program())
            .field("interactive", &self.prompt.is_interactive())
            .finish_non_exhaustive()
    }
}

impl EnvsyncConfig {
    pub fn builder() -> EnvsyncConfigBuilder {
        EnvsyncConfigBuilder::new()
    }
}

/// Builder for `EnvsyncConfig`
pub struct EnvsyncConfigBuilder {
    catalog: Option<Catalog>,
    prompt: Option<Arc<dyn PromptProvider>>,
    installer: Option<Arc<dyn CapabilityInstaller>>,
    audit: Option<Arc<dyn AuditSink>>,
    audit_path: Option<PathBuf>,
}

impl EnvsyncConfigBuilder {
    pub fn new() -> Self {
        Self {
            catalog: None,
            prompt: None,
            installer: None,
            audit: None,
            audit_path: None,
        }
    }

    pub fn catalog(mut self, catalog: Catalog) -> Self {
        self.catalog = Some(catalog);
        self
    }

    pub fn prompt(mut self, prompt: impl PromptProvider + 'static) -> Self {
        self.prompt = Some(Arc::new(prompt));
        self
    }

    /// Share a prompt provider the caller keeps a handle to
    pub fn shared_prompt(mut self, prompt: Arc<dyn PromptProvider>) -> Self {
        self.prompt = Some(prompt);
        self
    }

    pub fn installer(mut self, installer: impl CapabilityInstaller + 'static) -> Self {
        self.installer = Some(Arc::new(installer));
        self
    }

    pub fn shared_installer(mut self, installer: Arc<dyn CapabilityInstaller>) -> Self {
        self.installer = Some(installer);
        self
    }

    pub fn audit(mut self, audit: impl AuditSink + 'static) -> Self {
        self.audit = Some(Arc::new(audit));
        self
    }

    pub fn shared_audit(mut self, audit: Arc<dyn AuditSink>) -> Self {
        self.audit = Some(audit);
        self
    }

    /// Append audit events to a JSON Lines file (ignored if `audit` is set)
    pub fn audit_log(mut self, path: impl AsRef<Path>) -> Self {
        self.audit_path = Some(path.as_ref().to_path_buf());
        self
    }

    pub fn build(self) -> Result<EnvsyncConfig, ConfigError> {
        let audit: Arc<dyn AuditSink> = match (self.audit, self.audit_path) {
            (Some(audit), _) => audit,
            (None, Some(path)) => Arc::new(
                FileAuditSink::new(&path).map_err(|e| ConfigError::AuditInit(e.to_string()))?,
            ),
            (None, None) => Arc::new(NullAuditSink),
        };

        Ok(EnvsyncConfig {
            catalog: self.catalog.unwrap_or_else(Catalog::bundled),
            prompt: self
                .prompt
                .unwrap_or_else(|| Arc::new(TerminalPrompts::new())),
            installer: self
                .installer
                .unwrap_or_else(|| Arc::new(CliInstaller::default())),
            audit,
        })
    }
}

impl Default for EnvsyncConfigBuilder {
    fn default() -> Self {
        Self::new()
    }
}

// ============================================================================
// Preset Configurations
// ============================================================================

/// Preset configurations for common use cases
pub struct Presets;

impl Presets {
    /// Interactive shell
    ///
    /// - Terminal prompts
    /// - CLI installer running `program`
    /// - File-based audit log under the user's local data directory
    pub fn interactive(app_name: &str, program: &str) -> Result<EnvsyncConfig, ConfigError> {
        EnvsyncConfigBuilder::new()
            .prompt(TerminalPrompts::new())
            .installer(CliInstaller::new(program))
            .audit_log(default_audit_path(app_name))
            .build()
    }

    /// Unattended run (`--yes`, CI)
    ///
    /// Every prompt takes its default; inputs without a valid default abort
    /// the pass. No audit log.
    pub fn unattended(program: &str) -> Result<EnvsyncConfig, ConfigError> {
        EnvsyncConfigBuilder::new()
            .prompt(AutoPrompts::accept_defaults())
            .installer(CliInstaller::new(program))
            .build()
    }

    /// Test setup with injected prompts and installer, bundled catalog
    pub fn testing(
        prompt: Arc<dyn PromptProvider>,
        installer: Arc<dyn CapabilityInstaller>,
    ) -> EnvsyncConfig {
        EnvsyncConfig {
            catalog: Catalog::bundled(),
            prompt,
            installer,
            audit: Arc::new(NullAuditSink),
        }
    }
}

/// `<data_local_dir>/<app_name>/audit.jsonl`
pub fn default_audit_path(app_name: &str) -> PathBuf {
    dirs::data_local_dir()
        .unwrap_or_else(|| PathBuf::from(".local/share"))
        .join(app_name)
        .join("audit.jsonl")
}
