//! Sequential provisioning workflow
//!
//! Each integration is probed, decided, installed if needed and verified
//! before the next one starts. Mandatory integrations come first, then the
//! optional ones the user picked, then any custom integrations added
//! interactively.

use envsync_api::{
    Disposition, IntegrationDescriptor, IntegrationStatus, InstallRequest, ListedIntegration,
    ParamSpec, ReconciliationResult, Transport,
};
use std::path::Path;
use std::sync::Arc;

use super::{decide, validate, Decision, Selection};
use crate::audit::{self, AuditEventType, AuditSink};
use crate::config::EnvsyncConfig;
use crate::installer::{self, CapabilityInstaller};
use crate::prompt::{PromptError, PromptProvider};

/// Drives the provisioning state machine for a set of integrations
pub struct IntegrationReconciler {
    integrations: Vec<IntegrationDescriptor>,
    installer: Arc<dyn CapabilityInstaller>,
    prompt: Arc<dyn PromptProvider>,
    audit: Arc<dyn AuditSink>,
    custom_transport: Transport,
    allow_custom: bool,
}

impl std::fmt::Debug for IntegrationReconciler {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("IntegrationReconciler")
            .field("integrations", &self.integrations.len())
            .field("installer", &self.installer.program())
            .field("allow_custom", &self.allow_custom)
            .finish_non_exhaustive()
    }
}

impl IntegrationReconciler {
    pub fn new(
        integrations: Vec<IntegrationDescriptor>,
        installer: Arc<dyn CapabilityInstaller>,
        prompt: Arc<dyn PromptProvider>,
        audit: Arc<dyn AuditSink>,
    ) -> Self {
        Self {
            integrations,
            installer,
            prompt,
            audit,
            custom_transport: Transport::Http,
            allow_custom: true,
        }
    }

    pub fn from_config(config: &EnvsyncConfig) -> Self {
        Self::new(
            config.catalog.integrations().to_vec(),
            Arc::clone(&config.installer),
            Arc::clone(&config.prompt),
            Arc::clone(&config.audit),
        )
    }

    /// Offer to add custom integrations after the catalog ones
    pub fn allow_custom(mut self, allow: bool) -> Self {
        self.allow_custom = allow;
        self
    }

    /// Transport used for custom integrations
    pub fn custom_transport(mut self, transport: Transport) -> Self {
        self.custom_transport = transport;
        self
    }

    pub fn integrations(&self) -> &[IntegrationDescriptor] {
        &self.integrations
    }

    /// Integrations registered in `env`; empty when the listing fails
    pub fn list(&self, env: &Path) -> Vec<ListedIntegration> {
        installer::list_integrations(&*self.installer, env)
    }

    pub fn status(&self, env: &Path, identifier: &str) -> IntegrationStatus {
        installer::status(&*self.installer, env, identifier)
    }

    /// Run one provisioning pass against `env`.
    ///
    /// An unavailable installer short-circuits to
    /// [`ReconciliationResult::unavailable`]. Install failures are recorded
    /// per identifier; only a prompt abort is returned as an error.
    pub fn reconcile(&self, env: &Path) -> Result<ReconciliationResult, PromptError> {
        if let Err(e) = self.installer.probe() {
            tracing::warn!(program = %self.installer.program(), error = %e, "Installer unavailable, skipping integrations");
            audit::emit(
                &*self.audit,
                audit::service_unavailable(self.installer.program(), &e.to_string()),
            );
            return Ok(ReconciliationResult::unavailable());
        }

        let selections = self.select_optional()?;
        let mut result = ReconciliationResult::new();

        let (mandatory, optional): (Vec<_>, Vec<_>) = self
            .integrations
            .iter()
            .zip(selections)
            .partition(|(descriptor, _)| descriptor.mandatory);

        for (descriptor, selection) in mandatory.into_iter().chain(optional) {
            self.process(env, descriptor, selection, None, &mut result)?;
        }

        if self.allow_custom {
            self.custom_loop(env, &mut result)?;
        }

        tracing::info!(
            checked = result.checked.len(),
            installed = result.installed.len(),
            already_configured = result.already_configured.len(),
            skipped = result.skipped.len(),
            failed = result.failed.len(),
            "Integration pass finished"
        );
        Ok(result)
    }

    /// One selection per declared integration, in declaration order
    fn select_optional(&self) -> Result<Vec<Selection>, PromptError> {
        let optional: Vec<usize> = self
            .integrations
            .iter()
            .enumerate()
            .filter(|(_, d)| !d.mandatory)
            .map(|(i, _)| i)
            .collect();

        let mut selections: Vec<Selection> = self
            .integrations
            .iter()
            .map(|d| {
                if d.mandatory {
                    Selection::Mandatory
                } else {
                    Selection::NotSelected
                }
            })
            .collect();

        if optional.is_empty() {
            return Ok(selections);
        }

        let choices: Vec<String> = optional
            .iter()
            .map(|&i| {
                let d = &self.integrations[i];
                if d.description.is_empty() {
                    d.display_name.clone()
                } else {
                    format!("{} - {}", d.display_name, d.description)
                }
            })
            .collect();
        let defaults = vec![false; choices.len()];

        let picked = self.prompt.multi_select(
            "Select optional integrations to configure",
            &choices,
            &defaults,
        )?;
        for pick in picked {
            if let Some(&index) = optional.get(pick) {
                selections[index] = Selection::Selected;
            }
        }
        Ok(selections)
    }

    /// Walk one integration through the state machine.
    ///
    /// `values` carries parameters already collected (custom integrations);
    /// otherwise they are asked for after confirmation.
    fn process(
        &self,
        env: &Path,
        descriptor: &IntegrationDescriptor,
        selection: Selection,
        values: Option<Vec<(String, String)>>,
        result: &mut ReconciliationResult,
    ) -> Result<(), PromptError> {
        let id = descriptor.identifier.as_str();
        result.record_checked(id);

        let status = self.status(env, id);
        tracing::debug!(integration = %id, %status, ?selection, "Integration checked");

        match decide(status, selection) {
            Decision::AlreadyPresent => {
                tracing::info!(integration = %id, %status, "Integration already configured");
                result.record(id, Disposition::AlreadyConfigured);
                audit::emit(
                    &*self.audit,
                    audit::integration_event(AuditEventType::IntegrationPresent, id, Some(status), None),
                );
                self.verify(env, id, result);
            }
            Decision::Skip => {
                self.skip(id, result);
            }
            Decision::NeedsInstall => {
                let values = match values {
                    Some(values) => values,
                    None => {
                        let question = format!("Configure {} now?", descriptor.display_name);
                        if !self.prompt.confirm(&question, true)? {
                            self.skip(id, result);
                            return Ok(());
                        }
                        self.collect_params(descriptor)?
                    }
                };

                let request = InstallRequest::new(descriptor, values);
                match self.installer.install(env, &request) {
                    Ok(()) => {
                        tracing::info!(integration = %id, "Integration installed");
                        result.record(id, Disposition::Installed);
                        audit::emit(
                            &*self.audit,
                            audit::integration_event(AuditEventType::IntegrationInstalled, id, None, None),
                        );
                        self.verify(env, id, result);
                    }
                    Err(e) => {
                        tracing::warn!(integration = %id, error = %e, "Integration install failed");
                        audit::emit(
                            &*self.audit,
                            audit::integration_event(
                                AuditEventType::IntegrationFailed,
                                id,
                                None,
                                Some(e.to_string()),
                            ),
                        );
                        result.record_failure(id, e.to_string());
                    }
                }
            }
        }
        Ok(())
    }

    fn skip(&self, id: &str, result: &mut ReconciliationResult) {
        tracing::info!(integration = %id, "Integration skipped");
        result.record(id, Disposition::Skipped);
        audit::emit(
            &*self.audit,
            audit::integration_event(AuditEventType::IntegrationSkipped, id, None, None),
        );
    }

    fn verify(&self, env: &Path, id: &str, result: &mut ReconciliationResult) {
        let status = self.status(env, id);
        if status == IntegrationStatus::Absent {
            tracing::warn!(integration = %id, "Integration not listed after setup");
        }
        result.record_verification(id, status);
        audit::emit(
            &*self.audit,
            audit::integration_event(AuditEventType::IntegrationVerified, id, Some(status), None),
        );
    }

    /// Ask for every declared parameter, validated, examples as defaults.
    /// Optional parameters left empty are not passed on.
    fn collect_params(
        &self,
        descriptor: &IntegrationDescriptor,
    ) -> Result<Vec<(String, String)>, PromptError> {
        let mut values = Vec::with_capacity(descriptor.params.len());
        for spec in &descriptor.params {
            let message = format!("{} ({})", spec.description, spec.name);
            let validator = |value: &str| validate::param(spec, value);
            let value = self
                .prompt
                .input(&message, spec.example.as_deref(), &validator)?;
            if !value.trim().is_empty() {
                values.push((spec.name.clone(), value));
            }
        }
        Ok(values)
    }

    fn custom_loop(&self, env: &Path, result: &mut ReconciliationResult) -> Result<(), PromptError> {
        let mut question = "Add a custom integration?";
        while self.prompt.confirm(question, false)? {
            let (descriptor, values) = self.ask_custom(&result.checked)?;
            self.process(env, &descriptor, Selection::Custom, Some(values), result)?;
            question = "Add another custom integration?";
        }
        Ok(())
    }

    fn ask_custom(
        &self,
        taken: &[String],
    ) -> Result<(IntegrationDescriptor, Vec<(String, String)>), PromptError> {
        let identify = |value: &str| validate::identifier(value, taken);
        let identifier = self
            .prompt
            .input("Integration identifier (e.g., my-server)", None, &identify)?;

        let name_check = |value: &str| validate::required(value);
        let display_name = self
            .prompt
            .input("Display name", Some(identifier.as_str()), &name_check)?;

        let endpoint_check = |value: &str| validate::endpoint(value);
        let endpoint = self
            .prompt
            .input("Endpoint URL", None, &endpoint_check)?;

        let mut descriptor =
            IntegrationDescriptor::new(identifier, display_name, self.custom_transport, endpoint);
        let mut values = Vec::new();

        let pair_check = |value: &str| validate::param_pair(value);
        loop {
            let entry = self.prompt.input(
                "Parameter as NAME=value (leave empty to finish)",
                None,
                &pair_check,
            )?;
            let Some((name, value)) = entry.split_once('=') else {
                break;
            };
            descriptor = descriptor.param(ParamSpec::new(name, "custom parameter").required());
            values.push((name.to_string(), value.trim().to_string()));
        }

        Ok((descriptor, values))
    }
}
