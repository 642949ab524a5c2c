//! envsync-host: reconciliation runtime for envsync
//!
//! This crate brings a project environment in line with a declared catalog:
//! the permission allowlist in the settings document, and the external
//! integrations registered through the installer CLI.

pub mod audit;
pub mod catalog;
pub mod config;
pub mod installer;
pub mod integration;
pub mod permission;
pub mod prompt;

pub use audit::{AuditEvent, AuditEventType, AuditSink, FileAuditSink, MemoryAuditSink, NullAuditSink};
pub use catalog::{Catalog, CatalogError};
pub use config::{ConfigError, EnvsyncConfig, EnvsyncConfigBuilder, Presets};
pub use envsync_api::{
    Disposition, IntegrationDescriptor, IntegrationStatus, ParamSpec, PermissionOutcome,
    PermissionReport, ReconciliationResult, RuleSet, Transport,
};
pub use installer::{CapabilityInstaller, CliInstaller, FakeInstaller, InstallerError};
pub use integration::IntegrationReconciler;
pub use permission::{FileSettingsStore, PermissionReconciler, SettingsStore};
pub use prompt::{AutoPrompts, PromptError, PromptProvider, ScriptedPrompts, TerminalPrompts};
