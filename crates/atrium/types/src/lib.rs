//! Atrium Types - the shared vocabulary of the authorization layer.
//!
//! Pure data: credentials, privileges, rules, policies and entitlements.
//! All behavior lives in `atrium-policy`, `atrium-propagation` and
//! `atrium-licensing`.

#![deny(unsafe_code)]

mod credential;
mod entitlement;
mod error;
mod policy;
mod privilege;
mod rules;

pub use credential::{Agent, Credential, CredentialType};
pub use entitlement::{Entitlement, EntitlementType, LicenseEntitlement};
pub use error::ValidationError;
pub use policy::{AuthorizationPolicy, PolicyType};
pub use privilege::Privilege;
pub use rules::{CredentialRule, PrivilegeRule};

use serde::{Deserialize, Serialize};

macro_rules! uuid_id {
    ($(#[$doc:meta])* $name:ident) => {
        $(#[$doc])*
        #[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
        #[serde(transparent)]
        pub struct $name(pub String);

        impl $name {
            pub fn new(id: impl Into<String>) -> Self {
                Self(id.into())
            }

            pub fn generate() -> Self {
                Self(uuid::Uuid::new_v4().to_string())
            }

            pub fn as_str(&self) -> &str {
                &self.0
            }
        }

        impl std::fmt::Display for $name {
            fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
                write!(f, "{}", self.0)
            }
        }
    };
}

uuid_id! {
    /// Identity-bearing actor whose credentials are evaluated.
    AgentId
}
uuid_id! {
    /// An authorization policy row.
    PolicyId
}
uuid_id! {
    /// A credential or privilege rule within a policy. Stable across
    /// update/delete.
    RuleId
}
uuid_id! {
    /// A governed domain entity (space, callout, memo, ...).
    EntityId
}
