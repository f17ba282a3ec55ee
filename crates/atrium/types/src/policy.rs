use serde::{Deserialize, Serialize};

use crate::{CredentialRule, PolicyId, PrivilegeRule};

/// The kind of entity that owns a policy. Diagnostic only; the engine never
/// branches on it.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum PolicyType {
    Platform,
    Account,
    Space,
    Community,
    RoleSet,
    Collaboration,
    Callout,
    Memo,
    Discussion,
    InnovationFlow,
    About,
    Agent,
    StorageAggregator,
    License,
}

/// The per-entity authorization record.
///
/// Exactly one policy is owned by each governed entity. `parent_policy` is a
/// non-owning id reference, retained so a later reset can re-derive
/// inheritance without the caller re-supplying the parent; resolution goes
/// through the policy arena.
///
/// `anonymous_read_access` is a denormalized marker kept for introspection
/// surfaces: evaluation never branches on it, anonymous agents match rules
/// through their `GLOBAL_ANONYMOUS` credential like any other.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct AuthorizationPolicy {
    pub id: PolicyId,
    pub policy_type: PolicyType,
    pub credential_rules: Vec<CredentialRule>,
    pub privilege_rules: Vec<PrivilegeRule>,
    pub parent_policy: Option<PolicyId>,
    pub anonymous_read_access: bool,
}

impl AuthorizationPolicy {
    /// A fresh policy with empty rule sets and no parent.
    pub fn new(policy_type: PolicyType) -> Self {
        Self {
            id: PolicyId::generate(),
            policy_type,
            credential_rules: Vec::new(),
            privilege_rules: Vec::new(),
            parent_policy: None,
            anonymous_read_access: false,
        }
    }

    pub fn rule_count(&self) -> usize {
        self.credential_rules.len() + self.privilege_rules.len()
    }
}
