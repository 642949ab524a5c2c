//! Permission allowlist management
//!
//! Keeps the `permissions.allow` list of a project's settings document in
//! line with the required rules, without touching anything else in the file.
//!
//! # Architecture
//!
//! ```text
//! ┌──────────────────────────────────────────────────────────┐
//! │                  PermissionReconciler                     │
//! │  ┌──────────────┐  ┌───────────────┐  ┌───────────────┐  │
//! │  │   Document   │  │     Store     │  │    Prompt     │  │
//! │  │              │  │               │  │               │  │
//! │  │ - parse      │  │ - File        │  │ - Terminal    │  │
//! │  │ - allow_list │  │ - Memory      │  │ - Auto        │  │
//! │  │ - splice     │  │ - ReadOnly    │  │ - Scripted    │  │
//! │  └──────────────┘  └───────────────┘  └───────────────┘  │
//! └──────────────────────────────────────────────────────────┘
//! ```
//!
//! # Quick Start
//!
//! ```rust,ignore
//! use envsync_host::permission::{FileSettingsStore, PermissionReconciler};
//! use envsync_host::config::Presets;
//!
//! let config = Presets::interactive("envsync", "claude")?;
//! let store = FileSettingsStore::for_environment(".");
//! let report = PermissionReconciler::from_config(&config).reconcile(&store)?;
//! println!("{:?}: {} added", report.outcome, report.added);
//! ```
//!
//! Comments and unrelated members survive an update byte for byte: new rules
//! are spliced into the original text instead of re-serializing the tree.

pub mod document;
pub mod reconciler;
pub mod store;

pub use document::{ConfigDocument, DocumentError};
pub use reconciler::{compute_missing, PermissionPlan, PermissionReconciler};
pub use store::{
    FileSettingsStore, MemorySettingsStore, ReadOnlySettingsStore, SettingsStore,
    SETTINGS_RELATIVE_PATH,
};
