//! Settings document storage
//!
//! Provides trait-based storage for the settings document so the reconciler
//! can run against the real file or an in-memory fixture.

use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::RwLock;

use super::document::{ConfigDocument, DocumentError};

/// Relative location of the settings document under an environment root
pub const SETTINGS_RELATIVE_PATH: &str = ".claude/settings.local.json";

/// Trait for settings document storage
///
/// Reads happen once per reconciliation pass and writes replace the whole
/// document.
pub trait SettingsStore: Send + Sync {
    /// Whether a document currently exists
    fn exists(&self) -> bool;

    /// Load the document; `Ok(None)` when none exists
    fn load(&self) -> Result<Option<ConfigDocument>, DocumentError>;

    /// Replace the stored document
    fn save(&self, document: &ConfigDocument) -> Result<(), DocumentError>;

    /// Human-readable location used in reports
    fn location(&self) -> String;
}

// ============================================================================
// File-based Settings Store
// ============================================================================

/// Settings document on disk, written atomically via temp file + rename
#[derive(Debug)]
pub struct FileSettingsStore {
    path: PathBuf,
}

impl FileSettingsStore {
    /// Create a store at an explicit path
    pub fn new(path: impl AsRef<Path>) -> Self {
        Self {
            path: path.as_ref().to_path_buf(),
        }
    }

    /// Store for the settings document of an environment root
    pub fn for_environment(root: impl AsRef<Path>) -> Self {
        Self::new(root.as_ref().join(SETTINGS_RELATIVE_PATH))
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl SettingsStore for FileSettingsStore {
    fn exists(&self) -> bool {
        self.path.exists()
    }

    fn load(&self) -> Result<Option<ConfigDocument>, DocumentError> {
        if !self.path.exists() {
            return Ok(None);
        }
        let text = fs::read_to_string(&self.path).map_err(DocumentError::Read)?;
        ConfigDocument::parse(text).map(Some)
    }

    fn save(&self, document: &ConfigDocument) -> Result<(), DocumentError> {
        let parent = match self.path.parent() {
            Some(p) if !p.as_os_str().is_empty() => p.to_path_buf(),
            _ => PathBuf::from("."),
        };
        fs::create_dir_all(&parent).map_err(DocumentError::Write)?;

        let mut tmp = tempfile::NamedTempFile::new_in(&parent).map_err(DocumentError::Write)?;
        tmp.write_all(document.text().as_bytes())
            .map_err(DocumentError::Write)?;
        tmp.as_file().sync_all().map_err(DocumentError::Write)?;
        tmp.persist(&self.path)
            .map_err(|e| DocumentError::Write(e.error))?;

        tracing::debug!(path = %self.path.display(), "Settings document written");
        Ok(())
    }

    fn location(&self) -> String {
        self.path.display().to_string()
    }
}

// ============================================================================
// In-Memory Settings Store
// ============================================================================

/// In-memory settings store for tests and dry runs
#[derive(Debug, Default)]
pub struct MemorySettingsStore {
    text: RwLock<Option<String>>,
    fail_writes: bool,
    writes: RwLock<usize>,
}

impl MemorySettingsStore {
    /// Create an empty store (no document)
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a store holding raw document text
    pub fn with_text(text: impl Into<String>) -> Self {
        Self {
            text: RwLock::new(Some(text.into())),
            ..Self::default()
        }
    }

    /// Make every save fail with a write error
    pub fn failing_writes(mut self) -> Self {
        self.fail_writes = true;
        self
    }

    /// Current raw text
    pub fn text(&self) -> Option<String> {
        self.text.read().unwrap().clone()
    }

    /// Number of successful saves
    pub fn write_count(&self) -> usize {
        *self.writes.read().unwrap()
    }
}

impl SettingsStore for MemorySettingsStore {
    fn exists(&self) -> bool {
        self.text.read().unwrap().is_some()
    }

    fn load(&self) -> Result<Option<ConfigDocument>, DocumentError> {
        match self.text.read().unwrap().as_deref() {
            Some(text) => ConfigDocument::parse(text).map(Some),
            None => Ok(None),
        }
    }

    fn save(&self, document: &ConfigDocument) -> Result<(), DocumentError> {
        if self.fail_writes {
            return Err(DocumentError::Write(std::io::Error::new(
                std::io::ErrorKind::PermissionDenied,
                "simulated write failure",
            )));
        }
        *self.text.write().unwrap() = Some(document.text().to_string());
        *self.writes.write().unwrap() += 1;
        Ok(())
    }

    fn location(&self) -> String {
        "<memory>".to_string()
    }
}

// ============================================================================
// Read-Only Settings Store
// ============================================================================

/// Read-only wrapper for any settings store
///
/// Used for check-only runs: the reconciler reads and diffs, and any apply
/// step reports an error instead of touching the document.
#[derive(Debug)]
pub struct ReadOnlySettingsStore<S: SettingsStore> {
    inner: S,
}

impl<S: SettingsStore> ReadOnlySettingsStore<S> {
    pub fn new(inner: S) -> Self {
        Self { inner }
    }
}

impl<S: SettingsStore> SettingsStore for ReadOnlySettingsStore<S> {
    fn exists(&self) -> bool {
        self.inner.exists()
    }

    fn load(&self) -> Result<Option<ConfigDocument>, DocumentError> {
        self.inner.load()
    }

    fn save(&self, _document: &ConfigDocument) -> Result<(), DocumentError> {
        Err(DocumentError::ReadOnly)
    }

    fn location(&self) -> String {
        self.inner.location()
    }
}
