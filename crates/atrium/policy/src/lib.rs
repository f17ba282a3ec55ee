//! Atrium Policy - the core authorization engine.
//!
//! Pure rule evaluation over [`atrium_types::AuthorizationPolicy`] records:
//! reset, inheritance, rule CRUD, effective-rule-set computation and
//! privilege-closure evaluation. The engine knows nothing about any specific
//! domain entity; `atrium-propagation` orchestrates it across the entity
//! hierarchy.

#![deny(unsafe_code)]

mod arena;
mod engine;
mod error;

pub use arena::{PolicyArena, PolicyResolver};
pub use engine::{
    append_credential_rules, append_privilege_rule_mapping, delete_credential_rule,
    effective_credential_rules, expand_privileges, grant_access_or_fail, granted_privileges,
    inherit_parent, is_access_granted, reset, update_credential_rule,
};
pub use error::PolicyError;
