//! Permission allowlist reconciliation
//!
//! Diffs the required rules against the document's `permissions.allow`,
//! asks before changing anything, and appends only what is missing.

use envsync_api::{PermissionOutcome, PermissionReport, RuleSet};
use std::collections::HashSet;
use std::sync::Arc;

use super::document::{ConfigDocument, DocumentError};
use super::store::SettingsStore;
use crate::audit::{self, AuditEventType, AuditSink};
use crate::config::EnvsyncConfig;
use crate::prompt::{PromptError, PromptProvider};

/// Required rules absent from `current`, in the order of `required`
pub fn compute_missing(required: &RuleSet, current: &RuleSet) -> RuleSet {
    let present: HashSet<&str> = current.iter().collect();
    RuleSet::new(required.iter().filter(|rule| !present.contains(rule)))
}

/// What applying the required rules would do to a document
#[derive(Debug, Clone, PartialEq)]
pub enum PermissionPlan {
    /// No document exists; this one would be written
    Create(ConfigDocument),
    /// Rules are missing; `document` already has them appended
    Append {
        document: ConfigDocument,
        missing: RuleSet,
    },
    /// Every required rule is present
    Unchanged,
}

/// Reconciles the permission allowlist of a settings document
pub struct PermissionReconciler {
    rules: RuleSet,
    prompt: Arc<dyn PromptProvider>,
    audit: Arc<dyn AuditSink>,
}

impl std::fmt::Debug for PermissionReconciler {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PermissionReconciler")
            .field("rules", &self.rules.len())
            .finish_non_exhaustive()
    }
}

impl PermissionReconciler {
    pub fn new(
        rules: RuleSet,
        prompt: Arc<dyn PromptProvider>,
        audit: Arc<dyn AuditSink>,
    ) -> Self {
        Self {
            rules,
            prompt,
            audit,
        }
    }

    pub fn from_config(config: &EnvsyncConfig) -> Self {
        Self::new(
            config.catalog.rules().clone(),
            Arc::clone(&config.prompt),
            Arc::clone(&config.audit),
        )
    }

    /// Canonical rules this reconciler enforces
    pub fn rules(&self) -> &RuleSet {
        &self.rules
    }

    /// Decide what to do with a document without prompting or writing
    pub fn plan(&self, document: Option<ConfigDocument>) -> Result<PermissionPlan, DocumentError> {
        let Some(mut document) = document else {
            return Ok(PermissionPlan::Create(ConfigDocument::with_rules(&self.rules)));
        };

        let missing = compute_missing(&self.rules, &document.allow_list()?);
        if missing.is_empty() {
            return Ok(PermissionPlan::Unchanged);
        }

        document.append_allow(missing.as_slice())?;
        Ok(PermissionPlan::Append { document, missing })
    }

    /// Run one reconciliation pass against `store`.
    ///
    /// Document failures are reported in the returned report; only a prompt
    /// abort is returned as an error, and nothing is written in that case.
    pub fn reconcile(&self, store: &dyn SettingsStore) -> Result<PermissionReport, PromptError> {
        let location = store.location();

        let loaded = store.load();
        let existed = !matches!(loaded, Ok(None));
        let report = PermissionReport::new(location.clone(), existed);

        let plan = match loaded.and_then(|doc| self.plan(doc)) {
            Ok(plan) => plan,
            Err(e) => return Ok(self.failed(report, &location, e)),
        };

        let (document, added, outcome) = match plan {
            PermissionPlan::Unchanged => {
                tracing::info!(path = %location, "Required permissions already present");
                audit::emit(
                    &*self.audit,
                    audit::document_event(AuditEventType::PermissionsUnchanged, &location, 0, None),
                );
                return Ok(report.with_outcome(PermissionOutcome::Unchanged, 0));
            }
            PermissionPlan::Create(document) => {
                let question = "Grant the required permissions? (Recommended)";
                if !self.prompt.confirm(question, true)? {
                    return Ok(self.skipped(report, &location));
                }
                (document, self.rules.len(), PermissionOutcome::Created)
            }
            PermissionPlan::Append { document, missing } => {
                let question = format!(
                    "Add {} missing permission rules to {}?",
                    missing.len(),
                    location
                );
                if !self.prompt.confirm(&question, true)? {
                    return Ok(self.skipped(report, &location));
                }
                (document, missing.len(), PermissionOutcome::Updated)
            }
        };

        if let Err(e) = store.save(&document) {
            return Ok(self.failed(report, &location, e));
        }

        tracing::info!(path = %location, added, ?outcome, "Permissions written");
        let event_type = if outcome == PermissionOutcome::Created {
            AuditEventType::DocumentCreated
        } else {
            AuditEventType::RulesAdded
        };
        audit::emit(
            &*self.audit,
            audit::document_event(event_type, &location, added, None),
        );
        Ok(report.with_outcome(outcome, added))
    }

    /// Merge extra rules into the document without prompting.
    ///
    /// Creates the document when absent. Returns how many rules were added;
    /// nothing is written when that is zero.
    pub fn add_custom_rules(
        &self,
        store: &dyn SettingsStore,
        rules: &RuleSet,
    ) -> Result<usize, DocumentError> {
        let mut document = match store.load()? {
            Some(doc) => doc,
            None => ConfigDocument::parse("{}")?,
        };

        let missing = compute_missing(rules, &document.allow_list()?);
        if missing.is_empty() {
            return Ok(0);
        }

        document.append_allow(missing.as_slice())?;
        store.save(&document)?;

        let location = store.location();
        tracing::info!(path = %location, added = missing.len(), "Custom permissions added");
        audit::emit(
            &*self.audit,
            audit::document_event(AuditEventType::RulesAdded, &location, missing.len(), None),
        );
        Ok(missing.len())
    }

    /// Example document for manual setup, abbreviated to the first rules
    pub fn manual_snippet(&self) -> String {
        let mut shown: Vec<String> = self.rules.iter().take(5).map(str::to_string).collect();
        if self.rules.len() > shown.len() {
            shown.push("... (see full list in docs)".to_string());
        }
        let example = serde_json::json!({ "permissions": { "allow": shown } });
        serde_json::to_string_pretty(&example).unwrap_or_default()
    }

    fn skipped(&self, report: PermissionReport, location: &str) -> PermissionReport {
        tracing::info!(path = %location, "Permission setup skipped by user");
        audit::emit(
            &*self.audit,
            audit::document_event(AuditEventType::PermissionsSkipped, location, 0, None),
        );
        report.with_outcome(PermissionOutcome::Skipped, 0)
    }

    fn failed(
        &self,
        report: PermissionReport,
        location: &str,
        error: DocumentError,
    ) -> PermissionReport {
        tracing::warn!(path = %location, error = %error, "Permission setup failed");
        audit::emit(
            &*self.audit,
            audit::document_event(
                AuditEventType::DocumentFailed,
                location,
                0,
                Some(error.to_string()),
            ),
        );
        report.with_error(error.to_string())
    }
}
