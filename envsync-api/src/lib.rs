//! envsync-api: Shared types for envsync reconciliation
//!
//! This crate defines the data exchanged between the reconcilers in
//! `envsync-host` and the shell that renders their results. Nothing in here
//! performs I/O.

use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashSet};
use std::fmt;

/// Report format version, bumped when result shapes change
pub const REPORT_VERSION: u32 = 1;

// ============================================================================
// Rule sets
// ============================================================================

/// Ordered sequence of unique access-rule strings
///
/// Duplicates are dropped on construction, keeping the first occurrence.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "Vec<String>", into = "Vec<String>")]
pub struct RuleSet {
    rules: Vec<String>,
}

impl RuleSet {
    /// Create a rule set from any sequence of rules
    pub fn new<I, S>(rules: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let mut seen = HashSet::new();
        let rules = rules
            .into_iter()
            .map(Into::into)
            .filter(|rule: &String| seen.insert(rule.clone()))
            .collect();
        Self { rules }
    }

    /// Check whether a rule is present (exact string equality)
    pub fn contains(&self, rule: &str) -> bool {
        self.rules.iter().any(|r| r == rule)
    }

    pub fn len(&self) -> usize {
        self.rules.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rules.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &str> {
        self.rules.iter().map(String::as_str)
    }

    pub fn as_slice(&self) -> &[String] {
        &self.rules
    }
}

impl From<Vec<String>> for RuleSet {
    fn from(rules: Vec<String>) -> Self {
        Self::new(rules)
    }
}

impl From<RuleSet> for Vec<String> {
    fn from(set: RuleSet) -> Self {
        set.rules
    }
}

impl<'a> IntoIterator for &'a RuleSet {
    type Item = &'a String;
    type IntoIter = std::slice::Iter<'a, String>;

    fn into_iter(self) -> Self::IntoIter {
        self.rules.iter()
    }
}

// ============================================================================
// Integration descriptors
// ============================================================================

/// Transport used to reach an integration endpoint
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Transport {
    Sse,
    Http,
    Stdio,
}

impl Transport {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Sse => "sse",
            Self::Http => "http",
            Self::Stdio => "stdio",
        }
    }
}

impl fmt::Display for Transport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Shape of a parameter value, used to pick a validator
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ParamKind {
    #[default]
    Text,
    Url,
}

impl ParamKind {
    /// Guess the kind from a parameter name (`*_URL` names are URLs)
    pub fn infer(name: &str) -> Self {
        if name.to_ascii_uppercase().ends_with("_URL") {
            Self::Url
        } else {
            Self::Text
        }
    }
}

/// Required-parameter schema entry for an integration
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ParamSpec {
    /// Parameter name, passed to the installer as `NAME=value`
    pub name: String,

    /// Human-readable description shown when asking for the value
    pub description: String,

    /// Whether an empty value is rejected
    #[serde(default)]
    pub required: bool,

    /// Example value, offered as the prompt default
    #[serde(default)]
    pub example: Option<String>,

    #[serde(default)]
    pub kind: ParamKind,
}

impl ParamSpec {
    /// Create an optional parameter; the kind is inferred from the name
    pub fn new(name: impl Into<String>, description: impl Into<String>) -> Self {
        let name = name.into();
        let kind = ParamKind::infer(&name);
        Self {
            name,
            description: description.into(),
            required: false,
            example: None,
            kind,
        }
    }

    /// Set as required
    pub fn required(mut self) -> Self {
        self.required = true;
        self
    }

    /// Set example value
    pub fn example(mut self, example: impl Into<String>) -> Self {
        self.example = Some(example.into());
        self
    }

    /// Override the inferred kind
    pub fn kind(mut self, kind: ParamKind) -> Self {
        self.kind = kind;
        self
    }
}

/// Static definition of one external integration
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct IntegrationDescriptor {
    /// Unique lowercase identifier (`[a-z0-9-]+`)
    pub identifier: String,

    pub display_name: String,

    #[serde(default)]
    pub description: String,

    pub transport: Transport,

    /// Endpoint URL handed to the installer
    pub endpoint: String,

    /// Parameters in declaration order
    #[serde(default)]
    pub params: Vec<ParamSpec>,

    /// Mandatory integrations are always processed; optional ones only when selected
    #[serde(default)]
    pub mandatory: bool,
}

impl IntegrationDescriptor {
    /// Create an optional integration with no parameters
    pub fn new(
        identifier: impl Into<String>,
        display_name: impl Into<String>,
        transport: Transport,
        endpoint: impl Into<String>,
    ) -> Self {
        Self {
            identifier: identifier.into(),
            display_name: display_name.into(),
            description: String::new(),
            transport,
            endpoint: endpoint.into(),
            params: Vec::new(),
            mandatory: false,
        }
    }

    /// Set description
    pub fn description(mut self, description: impl Into<String>) -> Self {
        self.description = description.into();
        self
    }

    /// Add a parameter
    pub fn param(mut self, param: ParamSpec) -> Self {
        self.params.push(param);
        self
    }

    /// Mark as mandatory
    pub fn mandatory(mut self) -> Self {
        self.mandatory = true;
        self
    }

    /// Install command a user can run by hand, with `<name>` placeholders
    /// in place of parameter values
    pub fn manual_command(&self, program: &str) -> String {
        let placeholders = self
            .params
            .iter()
            .map(|p| (p.name.clone(), format!("<{}>", p.name.to_lowercase())))
            .collect();
        let request = InstallRequest::new(self, placeholders);

        let mut parts = vec![program.to_string()];
        parts.extend(request.args());
        parts.join(" ")
    }
}

/// Check an identifier against `[a-z0-9-]+`
pub fn is_valid_identifier(identifier: &str) -> bool {
    !identifier.is_empty()
        && identifier
            .chars()
            .all(|c| c.is_ascii_lowercase() || c.is_ascii_digit() || c == '-')
}

// ============================================================================
// Installer exchange types
// ============================================================================

/// One integration reported by the installer's listing
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ListedIntegration {
    pub identifier: String,
    pub connected: bool,
}

/// Derived connection state of an integration
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum IntegrationStatus {
    Absent,
    PresentUnauthenticated,
    PresentReady,
}

impl IntegrationStatus {
    /// Classify from a listing entry (`None` means not listed)
    pub fn from_listing(entry: Option<&ListedIntegration>) -> Self {
        match entry {
            None => Self::Absent,
            Some(e) if e.connected => Self::PresentReady,
            Some(_) => Self::PresentUnauthenticated,
        }
    }

    pub fn is_present(&self) -> bool {
        !matches!(self, Self::Absent)
    }
}

impl fmt::Display for IntegrationStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Self::Absent => "absent",
            Self::PresentUnauthenticated => "present, not authenticated",
            Self::PresentReady => "ready",
        };
        f.write_str(s)
    }
}

/// Everything the installer needs to register one integration
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct InstallRequest {
    pub identifier: String,
    pub transport: Transport,
    pub endpoint: String,
    /// Parameter values in declaration order
    pub params: Vec<(String, String)>,
}

impl InstallRequest {
    /// Build a request from a descriptor and collected values.
    /// Empty values are dropped.
    pub fn new(descriptor: &IntegrationDescriptor, values: Vec<(String, String)>) -> Self {
        Self {
            identifier: descriptor.identifier.clone(),
            transport: descriptor.transport,
            endpoint: descriptor.endpoint.clone(),
            params: values
                .into_iter()
                .filter(|(_, value)| !value.trim().is_empty())
                .collect(),
        }
    }

    /// Installer arguments: `mcp add <id> --transport <t> <endpoint> [--env K=V]...`
    pub fn args(&self) -> Vec<String> {
        let mut args = vec![
            "mcp".to_string(),
            "add".to_string(),
            self.identifier.clone(),
            "--transport".to_string(),
            self.transport.to_string(),
            self.endpoint.clone(),
        ];
        for (name, value) in &self.params {
            args.push("--env".to_string());
            args.push(format!("{}={}", name, value));
        }
        args
    }
}

// ============================================================================
// Results
// ============================================================================

/// Terminal outcome of a permission reconciliation
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PermissionOutcome {
    Created,
    Updated,
    Unchanged,
    Skipped,
    Error,
}

/// Result of one permission reconciliation pass
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PermissionReport {
    /// Where the document lives (path or store description)
    pub location: String,
    pub document_existed: bool,
    pub outcome: PermissionOutcome,
    /// Rules appended (or written, for a created document)
    pub added: usize,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl PermissionReport {
    pub fn new(location: impl Into<String>, document_existed: bool) -> Self {
        Self {
            location: location.into(),
            document_existed,
            outcome: PermissionOutcome::Unchanged,
            added: 0,
            error: None,
        }
    }

    pub fn with_outcome(mut self, outcome: PermissionOutcome, added: usize) -> Self {
        self.outcome = outcome;
        self.added = added;
        self
    }

    pub fn with_error(mut self, error: impl Into<String>) -> Self {
        self.outcome = PermissionOutcome::Error;
        self.added = 0;
        self.error = Some(error.into());
        self
    }
}

/// Terminal bucket an integration ends up in
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Disposition {
    Installed,
    AlreadyConfigured,
    Skipped,
    Failed,
}

/// Post-run status probe for an installed or already present integration
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Verification {
    pub identifier: String,
    pub status: IntegrationStatus,
}

/// Accumulated outcome of one integration reconciliation pass
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReconciliationResult {
    pub report_version: u32,
    /// False when the installer could not run at all; nothing was visited
    pub service_available: bool,
    pub checked: Vec<String>,
    pub installed: Vec<String>,
    pub already_configured: Vec<String>,
    pub skipped: Vec<String>,
    pub failed: Vec<String>,
    /// Installer error per failed identifier
    #[serde(default)]
    pub failure_reasons: BTreeMap<String, String>,
    #[serde(default)]
    pub verification: Vec<Verification>,
}

impl Default for ReconciliationResult {
    fn default() -> Self {
        Self::new()
    }
}

impl ReconciliationResult {
    /// Empty result for a pass that can reach the installer
    pub fn new() -> Self {
        Self {
            report_version: REPORT_VERSION,
            service_available: true,
            checked: Vec::new(),
            installed: Vec::new(),
            already_configured: Vec::new(),
            skipped: Vec::new(),
            failed: Vec::new(),
            failure_reasons: BTreeMap::new(),
            verification: Vec::new(),
        }
    }

    /// Result for a pass that short-circuited because the installer is missing
    pub fn unavailable() -> Self {
        Self {
            service_available: false,
            ..Self::new()
        }
    }

    pub fn record_checked(&mut self, identifier: &str) {
        self.checked.push(identifier.to_string());
    }

    /// Place an identifier in its terminal bucket
    pub fn record(&mut self, identifier: &str, disposition: Disposition) {
        let bucket = match disposition {
            Disposition::Installed => &mut self.installed,
            Disposition::AlreadyConfigured => &mut self.already_configured,
            Disposition::Skipped => &mut self.skipped,
            Disposition::Failed => &mut self.failed,
        };
        bucket.push(identifier.to_string());
    }

    pub fn record_failure(&mut self, identifier: &str, reason: impl Into<String>) {
        self.record(identifier, Disposition::Failed);
        self.failure_reasons
            .insert(identifier.to_string(), reason.into());
    }

    pub fn record_verification(&mut self, identifier: &str, status: IntegrationStatus) {
        self.verification.push(Verification {
            identifier: identifier.to_string(),
            status,
        });
    }

    /// Bucket an identifier ended up in, if any
    pub fn disposition_of(&self, identifier: &str) -> Option<Disposition> {
        let has = |v: &Vec<String>| v.iter().any(|i| i == identifier);
        if has(&self.installed) {
            Some(Disposition::Installed)
        } else if has(&self.already_configured) {
            Some(Disposition::AlreadyConfigured)
        } else if has(&self.skipped) {
            Some(Disposition::Skipped)
        } else if has(&self.failed) {
            Some(Disposition::Failed)
        } else {
            None
        }
    }

    /// Whether the four buckets are disjoint and together equal `checked`
    pub fn is_partitioned(&self) -> bool {
        let buckets = [
            &self.installed,
            &self.already_configured,
            &self.skipped,
            &self.failed,
        ];
        let total: usize = buckets.iter().map(|b| b.len()).sum();
        let union: HashSet<&String> = buckets.iter().flat_map(|b| b.iter()).collect();
        let checked: HashSet<&String> = self.checked.iter().collect();

        total == union.len() && checked.len() == self.checked.len() && union == checked
    }

    /// Whether anything was attempted and nothing failed
    pub fn is_success(&self) -> bool {
        self.service_available && self.failed.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn atlassian() -> IntegrationDescriptor {
        IntegrationDescriptor::new(
            "atlassian",
            "Atlassian MCP Server",
            Transport::Sse,
            "https://mcp.atlassian.com/v1/sse",
        )
        .param(
            ParamSpec::new("JIRA_BASE_URL", "Your JIRA instance URL")
                .required()
                .example("https://example.atlassian.net"),
        )
        .mandatory()
    }

    #[test]
    fn test_rule_set_dedup_keeps_first() {
        let set = RuleSet::new(["B", "A", "B", "C", "A"]);
        assert_eq!(set.as_slice(), &["B", "A", "C"]);
        assert!(set.contains("C"));
        assert!(!set.contains("c"));
    }

    #[test]
    fn test_rule_set_deserialize_dedups() {
        let set: RuleSet = serde_json::from_str(r#"["x", "y", "x"]"#).unwrap();
        assert_eq!(set.len(), 2);
        assert_eq!(serde_json::to_string(&set).unwrap(), r#"["x","y"]"#);
    }

    #[test]
    fn test_param_kind_inferred() {
        assert_eq!(ParamSpec::new("JIRA_BASE_URL", "").kind, ParamKind::Url);
        assert_eq!(ParamSpec::new("API_TOKEN", "").kind, ParamKind::Text);
    }

    #[test]
    fn test_identifier_validation() {
        assert!(is_valid_identifier("atlassian"));
        assert!(is_valid_identifier("my-server-2"));
        assert!(!is_valid_identifier("My Server"));
        assert!(!is_valid_identifier("my_server"));
        assert!(!is_valid_identifier(""));
    }

    #[test]
    fn test_install_request_args_drop_empty_values() {
        let request = InstallRequest::new(
            &atlassian(),
            vec![
                ("JIRA_BASE_URL".into(), "https://x.atlassian.net".into()),
                ("UNUSED".into(), "  ".into()),
            ],
        );
        assert_eq!(
            request.args(),
            vec![
                "mcp",
                "add",
                "atlassian",
                "--transport",
                "sse",
                "https://mcp.atlassian.com/v1/sse",
                "--env",
                "JIRA_BASE_URL=https://x.atlassian.net",
            ]
        );
    }

    #[test]
    fn test_manual_command_uses_placeholders() {
        assert_eq!(
            atlassian().manual_command("claude"),
            "claude mcp add atlassian --transport sse https://mcp.atlassian.com/v1/sse \
             --env JIRA_BASE_URL=<jira_base_url>"
        );
    }

    #[test]
    fn test_status_from_listing() {
        assert_eq!(
            IntegrationStatus::from_listing(None),
            IntegrationStatus::Absent
        );
        let entry = ListedIntegration {
            identifier: "a".into(),
            connected: false,
        };
        assert_eq!(
            IntegrationStatus::from_listing(Some(&entry)),
            IntegrationStatus::PresentUnauthenticated
        );
    }

    #[test]
    fn test_result_partition() {
        let mut result = ReconciliationResult::new();
        for id in ["a", "b", "c"] {
            result.record_checked(id);
        }
        result.record("a", Disposition::Installed);
        result.record("b", Disposition::Skipped);
        assert!(!result.is_partitioned());

        result.record_failure("c", "exit status 1");
        assert!(result.is_partitioned());
        assert_eq!(result.disposition_of("c"), Some(Disposition::Failed));
        assert!(!result.is_success());

        result.record("a", Disposition::Skipped);
        assert!(!result.is_partitioned());
    }

    #[test]
    fn test_unavailable_result_serialization() {
        let json = serde_json::to_string(&ReconciliationResult::unavailable()).unwrap();
        assert!(json.contains(r#""service_available":false"#));
        assert!(json.contains(r#""checked":[]"#));
    }
}
