//! Command dispatch

use anyhow::{bail, Context};
use serde::Serialize;
use std::io::Write;
use std::path::Path;

use envsync_api::{PermissionOutcome, PermissionReport, ReconciliationResult, RuleSet};
use envsync_host::catalog::Catalog;
use envsync_host::config::{ConfigError, EnvsyncConfig, Presets};
use envsync_host::installer::CliInstaller;
use envsync_host::permission::{FileSettingsStore, PermissionReconciler};
use envsync_host::prompt::{AutoPrompts, TerminalPrompts};
use envsync_host::IntegrationReconciler;

use crate::cli::{Cli, Commands};
use crate::summary;

/// Application name used for default data paths
pub const APP_NAME: &str = "envsync";

/// Machine-readable result of one invocation (`--json`)
#[derive(Debug, Default, Serialize)]
pub struct RunReport {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub permissions: Option<PermissionReport>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub custom_rules_added: Option<usize>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub custom_rules_error: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub integrations: Option<ReconciliationResult>,
}

impl RunReport {
    /// No document error, no failed rule merge and no failed integration
    pub fn is_success(&self) -> bool {
        let permissions_ok = self
            .permissions
            .as_ref()
            .map_or(true, |r| r.outcome != PermissionOutcome::Error);
        let integrations_ok = self
            .integrations
            .as_ref()
            .map_or(true, |r| r.failed.is_empty());
        permissions_ok && self.custom_rules_error.is_none() && integrations_ok
    }
}

/// Assemble the runtime configuration from command-line flags
pub fn build_config(cli: &Cli) -> Result<EnvsyncConfig, ConfigError> {
    match (&cli.audit_log, cli.yes) {
        (None, false) => Presets::interactive(APP_NAME, &cli.installer_bin),
        (None, true) => Presets::unattended(&cli.installer_bin),
        (Some(path), yes) => {
            let builder = EnvsyncConfig::builder()
                .installer(CliInstaller::new(&cli.installer_bin))
                .audit_log(path);
            if yes {
                builder.prompt(AutoPrompts::accept_defaults()).build()
            } else {
                builder.prompt(TerminalPrompts::new()).build()
            }
        }
    }
}

/// Run the selected command; `Ok(false)` means something failed but a
/// report was still produced
pub fn run(cli: &Cli, out: &mut impl Write) -> anyhow::Result<bool> {
    if cli.subcommand() == Commands::Rules {
        write_rules(out, Catalog::bundled().rules(), cli.json)?;
        return Ok(true);
    }
    let config = build_config(cli).context("Failed to set up envsync")?;
    run_with_config(cli, &config, out)
}

pub fn run_with_config(cli: &Cli, config: &EnvsyncConfig, out: &mut impl Write) -> anyhow::Result<bool> {
    let command = cli.subcommand();
    if command == Commands::Rules {
        write_rules(out, config.catalog.rules(), cli.json)?;
        return Ok(true);
    }

    if !cli.target.is_dir() {
        bail!("Target {} is not a directory", cli.target.display());
    }
    tracing::debug!(target_dir = %cli.target.display(), ?command, ?config, "Starting reconciliation");

    let mut report = RunReport::default();

    if let Commands::Permissions { .. } | Commands::All = command {
        let permissions = PermissionReconciler::from_config(config);
        let store = FileSettingsStore::for_environment(&cli.target);

        let result = permissions
            .reconcile(&store)
            .context("Permission setup aborted")?;
        if !cli.json {
            summary::write_permission_summary(out, &result, &permissions.manual_snippet())?;
        }
        let document_ok = result.outcome != PermissionOutcome::Error;
        report.permissions = Some(result);

        if let Commands::Permissions { add_rules } = &command {
            // an unreadable document is already in the report
            if !add_rules.is_empty() && document_ok {
                let rules = RuleSet::new(add_rules.iter().map(String::as_str));
                match permissions.add_custom_rules(&store, &rules) {
                    Ok(added) => {
                        if !cli.json {
                            writeln!(out, "   {} custom permission rules added.", added)?;
                        }
                        report.custom_rules_added = Some(added);
                    }
                    Err(e) => {
                        tracing::warn!(path = %store.path().display(), error = %e, "Failed to add custom rules");
                        if !cli.json {
                            writeln!(out, "\n✗ Failed to add custom rules: {}", e)?;
                        }
                        report.custom_rules_error = Some(e.to_string());
                    }
                }
            }
        }
    }

    if let Commands::Integrations | Commands::All = command {
        report.integrations = Some(integrations(cli, config, &cli.target, out)?);
    }

    if let Err(e) = config.audit.flush() {
        tracing::warn!(error = %e, "Failed to flush audit log");
    }

    if cli.json {
        serde_json::to_writer_pretty(&mut *out, &report)?;
        writeln!(out)?;
    }
    Ok(report.is_success())
}

fn integrations(
    cli: &Cli,
    config: &EnvsyncConfig,
    env: &Path,
    out: &mut impl Write,
) -> anyhow::Result<ReconciliationResult> {
    let reconciler = IntegrationReconciler::from_config(config).allow_custom(!cli.yes);
    let result = reconciler
        .reconcile(env)
        .context("Integration setup aborted")?;

    if !cli.json {
        summary::write_integration_summary(
            out,
            &result,
            reconciler.integrations(),
            config.installer.program(),
        )?;
    }
    Ok(result)
}

fn write_rules(out: &mut impl Write, rules: &RuleSet, json: bool) -> anyhow::Result<()> {
    if json {
        serde_json::to_writer_pretty(&mut *out, rules)?;
        writeln!(out)?;
    } else {
        for rule in rules {
            writeln!(out, "{}", rule)?;
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::Parser;

    #[test]
    fn test_report_success() {
        let mut report = RunReport::default();
        assert!(report.is_success());

        report.permissions = Some(PermissionReport::new("x", false).with_error("boom"));
        assert!(!report.is_success());
    }

    #[test]
    fn test_failed_rule_merge_is_not_success() {
        let report = RunReport {
            custom_rules_error: Some("disk full".to_string()),
            ..RunReport::default()
        };
        assert!(!report.is_success());
    }

    #[test]
    fn test_rules_does_not_need_config() {
        // audit log under a regular file can never be opened
        let blocker = tempfile::NamedTempFile::new().unwrap();
        let log = blocker.path().join("audit.jsonl");
        let cli = Cli::try_parse_from(["envsync", "rules", "--audit-log", log.to_str().unwrap()])
            .unwrap();
        assert!(build_config(&cli).is_err());

        let mut buf = Vec::new();
        assert!(run(&cli, &mut buf).unwrap());
        assert_eq!(
            String::from_utf8(buf).unwrap().lines().count(),
            Catalog::bundled().rules().len()
        );
    }

    #[test]
    fn test_build_config_with_audit_log() {
        let dir = tempfile::tempdir().unwrap();
        let log = dir.path().join("audit.jsonl");
        let cli = Cli::try_parse_from([
            "envsync",
            "--yes",
            "--installer-bin",
            "my-claude",
            "--audit-log",
            log.to_str().unwrap(),
        ])
        .unwrap();

        let config = build_config(&cli).unwrap();
        assert_eq!(config.installer.program(), "my-claude");
        assert!(!config.prompt.is_interactive());
        assert!(log.exists());
    }

    #[test]
    fn test_rules_json() {
        let mut buf = Vec::new();
        write_rules(&mut buf, &RuleSet::new(["A", "B"]), true).unwrap();
        let parsed: Vec<String> = serde_json::from_slice(&buf).unwrap();
        assert_eq!(parsed, vec!["A", "B"]);
    }
}
