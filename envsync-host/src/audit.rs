//! Audit trail for reconciliation changes
//!
//! Every decision that changes (or deliberately leaves alone) the user's
//! environment is emitted as an `AuditEvent` to an `AuditSink`.

use envsync_api::IntegrationStatus;
use serde::Serialize;
use std::fmt;
use std::fs::{File, OpenOptions};
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};
use std::sync::{Mutex, RwLock};
use thiserror::Error;

/// Audit event for one reconciliation decision
#[derive(Debug, Clone, Serialize)]
pub struct AuditEvent {
    /// RFC 3339 timestamp
    pub timestamp: String,
    pub event_type: AuditEventType,
    /// Document location or integration identifier
    pub subject: String,
    pub details: AuditDetails,
}

impl AuditEvent {
    pub fn new(event_type: AuditEventType, subject: impl Into<String>, details: AuditDetails) -> Self {
        Self {
            timestamp: chrono::Utc::now().to_rfc3339(),
            event_type,
            subject: subject.into(),
            details,
        }
    }
}

/// Type of audit event
#[derive(Debug, Clone, Copy, Serialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum AuditEventType {
    DocumentCreated,
    RulesAdded,
    PermissionsUnchanged,
    PermissionsSkipped,
    DocumentFailed,
    ServiceUnavailable,
    IntegrationPresent,
    IntegrationInstalled,
    IntegrationFailed,
    IntegrationSkipped,
    IntegrationVerified,
}

/// Details about the audit event
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "snake_case", tag = "type")]
pub enum AuditDetails {
    Document {
        rules_added: usize,
        #[serde(skip_serializing_if = "Option::is_none")]
        reason: Option<String>,
    },
    Integration {
        #[serde(skip_serializing_if = "Option::is_none")]
        status: Option<IntegrationStatus>,
        #[serde(skip_serializing_if = "Option::is_none")]
        reason: Option<String>,
    },
    Service {
        reason: String,
    },
}

/// Error type for audit operations
#[derive(Debug, Error)]
pub enum AuditError {
    #[error("Failed to write audit log: {0}")]
    WriteError(#[from] std::io::Error),

    #[error("Failed to serialize audit event: {0}")]
    SerializationError(#[from] serde_json::Error),
}

/// Trait for audit event sinks
pub trait AuditSink: Send + Sync {
    fn record(&self, event: AuditEvent) -> Result<(), AuditError>;

    fn flush(&self) -> Result<(), AuditError>;
}

/// Record an event, logging instead of failing when the sink errors
pub(crate) fn emit(sink: &dyn AuditSink, event: AuditEvent) {
    if let Err(e) = sink.record(event) {
        tracing::warn!(error = %e, "Failed to record audit event");
    }
}

// ============================================================================
// Default Implementations
// ============================================================================

/// File-based audit sink (JSON Lines, appended)
pub struct FileAuditSink {
    path: PathBuf,
    writer: Mutex<BufWriter<File>>,
}

impl FileAuditSink {
    pub fn new(path: impl AsRef<Path>) -> Result<Self, AuditError> {
        let path = path.as_ref().to_path_buf();

        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }

        let file = OpenOptions::new().create(true).append(true).open(&path)?;

        Ok(Self {
            path,
            writer: Mutex::new(BufWriter::new(file)),
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl AuditSink for FileAuditSink {
    fn record(&self, event: AuditEvent) -> Result<(), AuditError> {
        let json = serde_json::to_string(&event)?;
        let mut writer = self.writer.lock().unwrap();
        writeln!(writer, "{}", json)?;
        Ok(())
    }

    fn flush(&self) -> Result<(), AuditError> {
        self.writer.lock().unwrap().flush()?;
        Ok(())
    }
}

impl Drop for FileAuditSink {
    fn drop(&mut self) {
        if let Ok(mut writer) = self.writer.lock() {
            let _ = writer.flush();
        }
    }
}

impl fmt::Debug for FileAuditSink {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FileAuditSink")
            .field("path", &self.path)
            .finish()
    }
}

/// In-memory audit sink for testing
pub struct MemoryAuditSink {
    events: RwLock<Vec<AuditEvent>>,
    max_events: usize,
}

impl MemoryAuditSink {
    /// Create a new memory sink with default capacity (1000 events)
    pub fn new() -> Self {
        Self::with_capacity(1000)
    }

    pub fn with_capacity(max_events: usize) -> Self {
        Self {
            events: RwLock::new(Vec::with_capacity(max_events.min(1000))),
            max_events,
        }
    }

    pub fn events(&self) -> Vec<AuditEvent> {
        self.events.read().unwrap().clone()
    }

    pub fn count(&self) -> usize {
        self.events.read().unwrap().len()
    }

    pub fn find_by_type(&self, event_type: AuditEventType) -> Vec<AuditEvent> {
        self.events
            .read()
            .unwrap()
            .iter()
            .filter(|e| e.event_type == event_type)
            .cloned()
            .collect()
    }

    pub fn find_by_subject(&self, subject: &str) -> Vec<AuditEvent> {
        self.events
            .read()
            .unwrap()
            .iter()
            .filter(|e| e.subject == subject)
            .cloned()
            .collect()
    }
}

impl Default for MemoryAuditSink {
    fn default() -> Self {
        Self::new()
    }
}

impl AuditSink for MemoryAuditSink {
    fn record(&self, event: AuditEvent) -> Result<(), AuditError> {
        let mut events = self.events.write().unwrap();
        if events.len() >= self.max_events {
            events.remove(0); // FIFO eviction
        }
        events.push(event);
        Ok(())
    }

    fn flush(&self) -> Result<(), AuditError> {
        Ok(())
    }
}

impl fmt::Debug for MemoryAuditSink {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("MemoryAuditSink")
            .field("count", &self.count())
            .field("max_events", &self.max_events)
            .finish()
    }
}

/// Null audit sink (discards all events)
#[derive(Debug, Default)]
pub struct NullAuditSink;

impl AuditSink for NullAuditSink {
    fn record(&self, _event: AuditEvent) -> Result<(), AuditError> {
        Ok(())
    }

    fn flush(&self) -> Result<(), AuditError> {
        Ok(())
    }
}

// ============================================================================
// Helper functions
// ============================================================================

pub fn document_event(
    event_type: AuditEventType,
    location: &str,
    rules_added: usize,
    reason: Option<String>,
) -> AuditEvent {
    AuditEvent::new(
        event_type,
        location,
        AuditDetails::Document {
            rules_added,
            reason,
        },
    )
}

pub fn integration_event(
    event_type: AuditEventType,
    identifier: &str,
    status: Option<IntegrationStatus>,
    reason: Option<String>,
) -> AuditEvent {
    AuditEvent::new(
        event_type,
        identifier,
        AuditDetails::Integration { status, reason },
    )
}

pub fn service_unavailable(program: &str, reason: &str) -> AuditEvent {
    AuditEvent::new(
        AuditEventType::ServiceUnavailable,
        program,
        AuditDetails::Service {
            reason: reason.to_string(),
        },
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_memory_sink() {
        let sink = MemoryAuditSink::new();
        sink.record(integration_event(
            AuditEventType::IntegrationInstalled,
            "atlassian",
            None,
            None,
        ))
        .unwrap();

        assert_eq!(sink.count(), 1);
        assert_eq!(
            sink.find_by_type(AuditEventType::IntegrationInstalled)[0].subject,
            "atlassian"
        );
        assert!(sink.find_by_subject("other").is_empty());
    }

    #[test]
    fn test_memory_sink_eviction() {
        let sink = MemoryAuditSink::with_capacity(2);
        for i in 0..3 {
            let event = document_event(AuditEventType::RulesAdded, &format!("doc-{}", i), i, None);
            sink.record(event).unwrap();
        }

        let events = sink.events();
        assert_eq!(events.len(), 2);
        assert_eq!(events[0].subject, "doc-1");
        assert_eq!(events[1].subject, "doc-2");
    }

    #[test]
    fn test_event_serialization() {
        let event = integration_event(
            AuditEventType::IntegrationVerified,
            "atlassian",
            Some(IntegrationStatus::PresentUnauthenticated),
            None,
        );
        let json = serde_json::to_string(&event).unwrap();
        assert!(json.contains(r#""event_type":"integration_verified""#));
        assert!(json.contains(r#""status":"present_unauthenticated""#));
        assert!(!json.contains("reason"));
    }

    #[test]
    fn test_file_sink() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("logs/audit.jsonl");

        let sink = FileAuditSink::new(&path).unwrap();
        sink.record(service_unavailable("claude", "not found")).unwrap();
        sink.flush().unwrap();

        let content = std::fs::read_to_string(&path).unwrap();
        assert!(content.contains("service_unavailable"));
        assert_eq!(content.lines().count(), 1);
    }
}
