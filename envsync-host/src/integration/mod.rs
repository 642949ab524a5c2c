//! Integration provisioning
//!
//! The decision core here is pure: given a probed status and how the
//! integration came to be considered, [`decide`] names the next state.
//! [`IntegrationReconciler`] drives it with an installer and a prompt
//! provider.

pub mod reconciler;
pub mod validate;

use envsync_api::IntegrationStatus;

pub use reconciler::IntegrationReconciler;

/// How an integration entered the pass
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Selection {
    /// Declared mandatory in the catalog
    Mandatory,
    /// Optional and picked by the user
    Selected,
    /// Optional and not picked
    NotSelected,
    /// Added by the user during this pass
    Custom,
}

/// Next state after the status probe
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Decision {
    AlreadyPresent,
    NeedsInstall,
    Skip,
}

pub fn decide(status: IntegrationStatus, selection: Selection) -> Decision {
    if status.is_present() {
        return Decision::AlreadyPresent;
    }
    match selection {
        Selection::Mandatory | Selection::Selected | Selection::Custom => Decision::NeedsInstall,
        Selection::NotSelected => Decision::Skip,
    }
}
