use std::collections::HashMap;

use atrium_types::{AuthorizationPolicy, PolicyId};

use crate::error::PolicyError;

/// Resolves policy ids to policies during parent-chain walks.
///
/// The arena is the canonical implementation; a propagation batch layers its
/// staged-but-unflushed policies over the arena through this same trait.
pub trait PolicyResolver {
    fn policy(&self, id: &PolicyId) -> Option<&AuthorizationPolicy>;
}

/// Id-keyed table of authorization policies.
///
/// Parent links between policies are ids resolved here, never in-memory
/// back-pointers, so a policy loaded in isolation can still re-derive its
/// inheritance.
#[derive(Clone, Debug, Default)]
pub struct PolicyArena {
    policies: HashMap<PolicyId, AuthorizationPolicy>,
}

impl PolicyArena {
    pub fn new() -> Self {
        Self::default()
    }

    /// Inserts or replaces a policy under its own id.
    pub fn upsert(&mut self, policy: AuthorizationPolicy) {
        self.policies.insert(policy.id.clone(), policy);
    }

    pub fn upsert_all(&mut self, policies: impl IntoIterator<Item = AuthorizationPolicy>) {
        for policy in policies {
            self.upsert(policy);
        }
    }

    pub fn get(&self, id: &PolicyId) -> Option<&AuthorizationPolicy> {
        self.policies.get(id)
    }

    pub fn get_or_fail(&self, id: &PolicyId) -> Result<&AuthorizationPolicy, PolicyError> {
        self.get(id)
            .ok_or_else(|| PolicyError::PolicyNotFound(id.clone()))
    }

    pub fn get_mut(&mut self, id: &PolicyId) -> Option<&mut AuthorizationPolicy> {
        self.policies.get_mut(id)
    }

    /// Removes a policy; called when its owning entity is deleted.
    pub fn remove(&mut self, id: &PolicyId) -> Option<AuthorizationPolicy> {
        self.policies.remove(id)
    }

    pub fn len(&self) -> usize {
        self.policies.len()
    }

    pub fn is_empty(&self) -> bool {
        self.policies.is_empty()
    }
}

impl PolicyResolver for PolicyArena {
    fn policy(&self, id: &PolicyId) -> Option<&AuthorizationPolicy> {
        self.get(id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use atrium_types::PolicyType;

    #[test]
    fn upsert_replaces_by_id() {
        let mut arena = PolicyArena::new();
        let mut policy = AuthorizationPolicy::new(PolicyType::Space);
        let id = policy.id.clone();
        arena.upsert(policy.clone());

        policy.parent_policy = Some(PolicyId::generate());
        arena.upsert(policy);

        assert_eq!(arena.len(), 1);
        assert!(arena.get(&id).unwrap().parent_policy.is_some());
    }

    #[test]
    fn get_or_fail_reports_missing_policy() {
        let arena = PolicyArena::new();
        let missing = PolicyId::generate();
        assert!(matches!(
            arena.get_or_fail(&missing),
            Err(PolicyError::PolicyNotFound(_))
        ));
    }
}
