use atrium_types::{AgentId, EntitlementType, PolicyId};
use thiserror::Error;

/// Errors raised by the licensing engine.
#[derive(Debug, Error)]
pub enum LicensingError {
    #[error(
        "License: entitlement '{entitlement_type}' not granted to agent {agent_id} under policy {policy_id}"
    )]
    ForbiddenLicense {
        entitlement_type: EntitlementType,
        policy_id: PolicyId,
        agent_id: AgentId,
    },

    #[error("License entitlements not initialized on license: {0}")]
    EntitlementsNotInitialized(String),
}
