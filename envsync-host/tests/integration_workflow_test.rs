//! Integration tests for the provisioning workflow with a fake installer

use std::path::Path;
use std::sync::Arc;

use envsync_api::{Disposition, IntegrationDescriptor, IntegrationStatus, ParamSpec, Transport};
use envsync_host::audit::{AuditEventType, MemoryAuditSink};
use envsync_host::catalog::Catalog;
use envsync_host::config::Presets;
use envsync_host::installer::FakeInstaller;
use envsync_host::integration::IntegrationReconciler;
use envsync_host::prompt::{Answer, ScriptedPrompts};

fn atlassian_optional() -> IntegrationDescriptor {
    IntegrationDescriptor::new(
        "atlassian",
        "Atlassian MCP Server",
        Transport::Sse,
        "https://mcp.atlassian.com/v1/sse",
    )
    .param(ParamSpec::new("JIRA_BASE_URL", "Your JIRA instance URL").required())
}

struct Harness {
    reconciler: IntegrationReconciler,
    installer: Arc<FakeInstaller>,
    prompts: Arc<ScriptedPrompts>,
    audit: Arc<MemoryAuditSink>,
}

fn harness(
    integrations: Vec<IntegrationDescriptor>,
    installer: FakeInstaller,
    answers: Vec<Answer>,
) -> Harness {
    let installer = Arc::new(installer);
    let prompts = Arc::new(ScriptedPrompts::new(answers));
    let audit = Arc::new(MemoryAuditSink::new());
    let reconciler = IntegrationReconciler::new(
        integrations,
        installer.clone(),
        prompts.clone(),
        audit.clone(),
    );
    Harness {
        reconciler,
        installer,
        prompts,
        audit,
    }
}

#[test]
fn test_selected_absent_integration_is_installed() {
    let h = harness(
        vec![atlassian_optional()],
        FakeInstaller::new().with_raw_listing("github: https://api.github.com - ✓ Connected\n"),
        vec![
            Answer::Select(vec![0]),
            Answer::yes(),
            Answer::text("https://stellaint.atlassian.net"),
            Answer::no(),
        ],
    );

    assert_eq!(
        h.reconciler.status(Path::new("."), "atlassian"),
        IntegrationStatus::Absent
    );

    let result = h.reconciler.reconcile(Path::new(".")).unwrap();
    assert_eq!(result.installed, vec!["atlassian"]);
    assert!(result.is_partitioned());
    assert!(result.is_success());

    let requests = h.installer.requests();
    assert_eq!(requests.len(), 1);
    assert_eq!(
        requests[0].args(),
        vec![
            "mcp",
            "add",
            "atlassian",
            "--transport",
            "sse",
            "https://mcp.atlassian.com/v1/sse",
            "--env",
            "JIRA_BASE_URL=https://stellaint.atlassian.net",
        ]
    );
    assert_eq!(h.audit.find_by_type(AuditEventType::IntegrationInstalled).len(), 1);
}

#[test]
fn test_invalid_url_is_asked_again() {
    let h = harness(
        vec![atlassian_optional().mandatory()],
        FakeInstaller::new(),
        vec![
            Answer::yes(),
            Answer::text(""),
            Answer::text("stellaint"),
            Answer::text("https://stellaint.atlassian.net"),
            Answer::no(),
        ],
    );

    let result = h.reconciler.reconcile(Path::new(".")).unwrap();
    assert_eq!(result.installed, vec!["atlassian"]);

    let asked = h.prompts.prompts();
    let url_prompt = asked
        .iter()
        .find(|p| p.message.contains("JIRA_BASE_URL"))
        .unwrap();
    assert_eq!(url_prompt.rejected, vec!["", "stellaint"]);
}

#[test]
fn test_already_configured_is_verified_not_reinstalled() {
    let h = harness(
        vec![atlassian_optional().mandatory()],
        FakeInstaller::new().with_installed("atlassian", false),
        vec![Answer::no()],
    );

    let result = h.reconciler.reconcile(Path::new(".")).unwrap();
    assert_eq!(result.already_configured, vec!["atlassian"]);
    assert_eq!(h.installer.install_count(), 0);
    assert_eq!(result.verification.len(), 1);
    assert_eq!(
        result.verification[0].status,
        IntegrationStatus::PresentUnauthenticated
    );
}

#[test]
fn test_service_unavailable_short_circuits() {
    let h = harness(
        vec![atlassian_optional().mandatory()],
        FakeInstaller::unavailable(),
        vec![],
    );

    let result = h.reconciler.reconcile(Path::new(".")).unwrap();
    assert!(!result.service_available);
    assert!(result.checked.is_empty());
    assert!(result.installed.is_empty());
    assert!(result.failed.is_empty());
    assert_eq!(h.prompts.prompt_count(), 0);
    assert_eq!(h.audit.find_by_type(AuditEventType::ServiceUnavailable).len(), 1);
}

#[test]
fn test_failed_listing_counts_as_absent() {
    let h = harness(
        vec![atlassian_optional().mandatory()],
        FakeInstaller::new()
            .with_installed("atlassian", true)
            .failing_list(),
        vec![
            Answer::yes(),
            Answer::text("https://stellaint.atlassian.net"),
            Answer::no(),
        ],
    );

    let result = h.reconciler.reconcile(Path::new(".")).unwrap();
    assert_eq!(result.installed, vec!["atlassian"]);
    assert_eq!(result.verification[0].status, IntegrationStatus::Absent);
}

#[test]
fn test_install_failure_does_not_stop_the_pass() {
    let second = IntegrationDescriptor::new(
        "search",
        "Search",
        Transport::Http,
        "https://search.example.com/mcp",
    )
    .mandatory();
    let h = harness(
        vec![atlassian_optional().mandatory(), second],
        FakeInstaller::new().failing_install("atlassian"),
        vec![
            Answer::yes(),
            Answer::text("https://stellaint.atlassian.net"),
            Answer::yes(),
            Answer::no(),
        ],
    );

    let result = h.reconciler.reconcile(Path::new(".")).unwrap();
    assert_eq!(result.failed, vec!["atlassian"]);
    assert_eq!(result.installed, vec!["search"]);
    assert!(result.failure_reasons["atlassian"].contains("could not add atlassian"));
    assert!(!result.is_success());
    assert!(result.is_partitioned());
}

#[test]
fn test_custom_integration_rejects_bad_identifier() {
    let h = harness(
        vec![],
        FakeInstaller::new(),
        vec![
            Answer::yes(),
            Answer::text("My Server"),
            Answer::text("my-server"),
            Answer::Default,
            Answer::text("http://localhost:3000/mcp"),
            Answer::text("API_TOKEN=secret"),
            Answer::text(""),
            Answer::no(),
        ],
    );

    let result = h.reconciler.reconcile(Path::new(".")).unwrap();
    assert_eq!(result.installed, vec!["my-server"]);

    let requests = h.installer.requests();
    assert_eq!(requests.len(), 1);
    assert_eq!(requests[0].identifier, "my-server");
    assert_eq!(requests[0].transport, Transport::Http);
    assert_eq!(
        requests[0].params,
        vec![("API_TOKEN".to_string(), "secret".to_string())]
    );

    let id_prompt = &h.prompts.prompts()[1];
    assert_eq!(id_prompt.rejected, vec!["My Server"]);
}

#[test]
fn test_custom_identifier_cannot_collide() {
    let h = harness(
        vec![atlassian_optional().mandatory()],
        FakeInstaller::new().with_installed("atlassian", true),
        vec![
            Answer::yes(),
            Answer::text("atlassian"),
            Answer::text("other"),
            Answer::text("Other"),
            Answer::text("https://other.example.com/mcp"),
            Answer::text(""),
            Answer::no(),
        ],
    );

    let result = h.reconciler.reconcile(Path::new(".")).unwrap();
    assert_eq!(result.checked, vec!["atlassian", "other"]);
    assert_eq!(result.disposition_of("other"), Some(Disposition::Installed));
}

#[test]
fn test_custom_url_parameter_is_asked_again() {
    let h = harness(
        vec![],
        FakeInstaller::new(),
        vec![
            Answer::yes(),
            Answer::text("my-server"),
            Answer::Default,
            Answer::text("http://localhost:3000/mcp"),
            Answer::text("BASE_URL=not a url"),
            Answer::text("BASE_URL=https://api.example.com"),
            Answer::text(""),
            Answer::no(),
        ],
    );

    let result = h.reconciler.reconcile(Path::new(".")).unwrap();
    assert_eq!(result.installed, vec!["my-server"]);
    assert_eq!(
        h.installer.requests()[0].params,
        vec![("BASE_URL".to_string(), "https://api.example.com".to_string())]
    );

    let asked = h.prompts.prompts();
    let param_prompt = asked
        .iter()
        .find(|p| p.message.starts_with("Parameter as NAME=value") && !p.rejected.is_empty())
        .unwrap();
    assert_eq!(param_prompt.rejected, vec!["BASE_URL=not a url"]);
}

#[test]
fn test_rerun_is_idempotent() {
    let installer = Arc::new(FakeInstaller::new());
    let config = Presets::testing(
        Arc::new(ScriptedPrompts::new([
            Answer::yes(),
            Answer::text("https://stellaint.atlassian.net"),
            Answer::no(),
            Answer::no(),
        ])),
        installer.clone(),
    );
    let reconciler = IntegrationReconciler::from_config(&config);

    let first = reconciler.reconcile(Path::new(".")).unwrap();
    assert_eq!(first.installed, vec!["atlassian"]);

    let second = reconciler.reconcile(Path::new(".")).unwrap();
    assert!(second.installed.is_empty());
    assert_eq!(second.already_configured, vec!["atlassian"]);
    assert_eq!(installer.install_count(), 1);
}

#[test]
fn test_manual_command_for_bundled_integration() {
    let catalog = Catalog::bundled();
    let atlassian = catalog.integration("atlassian").unwrap();
    assert_eq!(
        atlassian.manual_command("claude"),
        "claude mcp add atlassian --transport sse https://mcp.atlassian.com/v1/sse --env JIRA_BASE_URL=<jira_base_url>"
    );
}
