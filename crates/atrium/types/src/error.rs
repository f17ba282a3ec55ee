use thiserror::Error;

/// Malformed rule input, rejected before any policy is mutated.
#[derive(Debug, Error)]
pub enum ValidationError {
    #[error("Unknown credential type: {0}")]
    UnknownCredentialType(String),

    #[error("Unknown privilege: {0}")]
    UnknownPrivilege(String),
}
