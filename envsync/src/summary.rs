//! Human-readable summaries of reconciliation reports

use envsync_api::{
    IntegrationDescriptor, IntegrationStatus, PermissionOutcome, PermissionReport,
    ReconciliationResult,
};
use std::io::{self, Write};

/// Summary of a permission pass, with manual instructions on error
pub fn write_permission_summary(
    out: &mut impl Write,
    report: &PermissionReport,
    manual_snippet: &str,
) -> io::Result<()> {
    match report.outcome {
        PermissionOutcome::Created => {
            writeln!(out, "\n✓ Permissions configured successfully!")?;
            writeln!(out, "   {} permission rules added.", report.added)?;
        }
        PermissionOutcome::Updated => {
            writeln!(out, "\n✓ Permissions updated successfully!")?;
            writeln!(out, "   {} new permission rules added.", report.added)?;
        }
        PermissionOutcome::Unchanged => {
            writeln!(out, "\n✓ All required permissions are already configured.")?;
        }
        PermissionOutcome::Skipped => {
            writeln!(out, "\n⚠ Permissions were not configured.")?;
            writeln!(out, "   Run envsync again or add permissions manually.")?;
        }
        PermissionOutcome::Error => {
            let reason = report.error.as_deref().unwrap_or("unknown error");
            writeln!(out, "\n✗ Permissions setup failed: {}", reason)?;
            writeln!(out, "You may need to add the permissions manually.")?;
            write_manual_permissions(out, &report.location, manual_snippet)?;
        }
    }
    Ok(())
}

fn write_manual_permissions(out: &mut impl Write, location: &str, snippet: &str) -> io::Result<()> {
    writeln!(out, "\nManual setup:")?;
    writeln!(out, "1. Create {}", location)?;
    writeln!(out, "2. Add the following content:\n")?;
    writeln!(out, "{}", snippet)?;
    writeln!(out, "\nRun `envsync rules` for the complete list of required permissions.")
}

/// Summary of an integration pass, with install commands for whatever is
/// still missing
pub fn write_integration_summary(
    out: &mut impl Write,
    result: &ReconciliationResult,
    integrations: &[IntegrationDescriptor],
    program: &str,
) -> io::Result<()> {
    if !result.service_available {
        writeln!(
            out,
            "\n⚠ {} is not available. Integrations cannot be configured automatically.",
            program
        )?;
        let commands: Vec<&IntegrationDescriptor> = integrations.iter().collect();
        return write_manual_commands(out, &commands, program);
    }

    if !result.already_configured.is_empty() {
        writeln!(
            out,
            "\n✓ {} integration(s) already configured:",
            result.already_configured.len()
        )?;
        for id in &result.already_configured {
            writeln!(out, "  - {}{}", id, verification_note(result, id))?;
        }
    }

    if !result.installed.is_empty() {
        writeln!(out, "\n✓ Configured {} integration(s):", result.installed.len())?;
        for id in &result.installed {
            writeln!(out, "  - {}{}", id, verification_note(result, id))?;
        }
    }

    if !result.failed.is_empty() {
        writeln!(
            out,
            "\n✗ Failed to configure {} integration(s):",
            result.failed.len()
        )?;
        for id in &result.failed {
            match result.failure_reasons.get(id) {
                Some(reason) => writeln!(out, "  - {}: {}", id, reason)?,
                None => writeln!(out, "  - {}", id)?,
            }
        }
        writeln!(out, "\n⚠ Some features may not work without these integrations.")?;
        let failed = known(integrations, &result.failed);
        write_manual_commands(out, &failed, program)?;
    }

    if !result.skipped.is_empty() && result.installed.is_empty() {
        writeln!(out, "\n⚠ No integrations were configured.")?;
        let skipped = known(integrations, &result.skipped);
        write_manual_commands(out, &skipped, program)?;
    }

    Ok(())
}

fn verification_note(result: &ReconciliationResult, id: &str) -> &'static str {
    let status = result
        .verification
        .iter()
        .rev()
        .find(|v| v.identifier == id)
        .map(|v| v.status);
    match status {
        Some(IntegrationStatus::PresentUnauthenticated) => " (needs authentication)",
        Some(IntegrationStatus::Absent) => " (not listed yet)",
        _ => "",
    }
}

fn known<'a>(integrations: &'a [IntegrationDescriptor], ids: &[String]) -> Vec<&'a IntegrationDescriptor> {
    integrations
        .iter()
        .filter(|d| ids.contains(&d.identifier))
        .collect()
}

fn write_manual_commands(
    out: &mut impl Write,
    integrations: &[&IntegrationDescriptor],
    program: &str,
) -> io::Result<()> {
    if integrations.is_empty() {
        return Ok(());
    }
    writeln!(out, "You can configure them manually later using:")?;
    for descriptor in integrations {
        writeln!(out, "  {}", descriptor.manual_command(program))?;
    }
    Ok(())
}
