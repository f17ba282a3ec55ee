use atrium_types::{PolicyId, Privilege, RuleId};
use thiserror::Error;

/// Errors raised by the core policy engine.
///
/// `Forbidden` is the expected, user-facing outcome of `grant_access_or_fail`
/// and is always safe to surface as "not authorized". The remaining variants
/// indicate caller bugs, not user errors.
#[derive(Debug, Error)]
pub enum PolicyError {
    #[error("Authorization: unable to grant '{privilege}' privilege: {context}")]
    Forbidden {
        privilege: Privilege,
        context: String,
    },

    #[error("Not able to locate authorization policy with the specified ID: {0}")]
    PolicyNotFound(PolicyId),

    #[error("Rule not found on policy {policy_id}: {rule_id}")]
    RuleNotFound {
        policy_id: PolicyId,
        rule_id: RuleId,
    },
}
