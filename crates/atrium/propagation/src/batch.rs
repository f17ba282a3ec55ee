use std::collections::HashMap;

use atrium_policy::{PolicyArena, PolicyResolver};
use atrium_types::{AuthorizationPolicy, PolicyId, PolicyType};

use crate::error::PropagationError;

/// Proof that a parent's policy has already been computed and staged in the
/// current traversal.
///
/// Only [`PolicyBatch::stage`] can construct one, so a child propagation
/// cannot run against a parent whose policy this traversal has not produced
/// yet. Parent-before-child ordering is enforced by the type, not by caller
/// discipline.
#[derive(Clone, Debug)]
pub struct ComputedParent {
    policy_id: PolicyId,
}

impl ComputedParent {
    pub fn policy_id(&self) -> &PolicyId {
        &self.policy_id
    }
}

/// Staged policy writes for one traversal.
///
/// Policies recomputed during the traversal are staged here and flushed to
/// the arena once at the end; children read just-computed parents from the
/// staged overlay, never from storage. The base snapshot supplies ancestor
/// policies outside the subtree being recomputed.
pub struct PolicyBatch {
    base: PolicyArena,
    staged: HashMap<PolicyId, AuthorizationPolicy>,
    order: Vec<PolicyId>,
}

impl PolicyBatch {
    pub fn new(base: PolicyArena) -> Self {
        Self {
            base,
            staged: HashMap::new(),
            order: Vec::new(),
        }
    }

    /// Starts recomputation of the policy with the given id: takes the
    /// staged or stored version with its rules cleared, or a fresh policy
    /// under that id if none exists yet.
    pub fn begin(&self, id: &PolicyId, policy_type: PolicyType) -> AuthorizationPolicy {
        let mut policy = self
            .staged
            .get(id)
            .or_else(|| self.base.get(id))
            .cloned()
            .unwrap_or_else(|| AuthorizationPolicy {
                id: id.clone(),
                policy_type,
                credential_rules: Vec::new(),
                privilege_rules: Vec::new(),
                parent_policy: None,
                anonymous_read_access: false,
            });
        atrium_policy::reset(&mut policy);
        policy
    }

    /// Stages a computed policy and returns the handle children propagate
    /// under.
    pub fn stage(&mut self, policy: AuthorizationPolicy) -> ComputedParent {
        let policy_id = policy.id.clone();
        if !self.staged.contains_key(&policy_id) {
            self.order.push(policy_id.clone());
        }
        self.staged.insert(policy_id.clone(), policy);
        ComputedParent { policy_id }
    }

    /// The staged policy behind a parent handle.
    pub fn parent_policy(
        &self,
        parent: &ComputedParent,
    ) -> Result<&AuthorizationPolicy, PropagationError> {
        self.staged.get(&parent.policy_id).ok_or_else(|| {
            PropagationError::EntityNotInitialized(format!(
                "staged parent policy {}",
                parent.policy_id
            ))
        })
    }

    /// Drains the batch into the staged policies, in staging order.
    pub fn into_policies(mut self) -> Vec<AuthorizationPolicy> {
        self.order
            .iter()
            .filter_map(|id| self.staged.remove(id))
            .collect()
    }
}

impl PolicyResolver for PolicyBatch {
    fn policy(&self, id: &PolicyId) -> Option<&AuthorizationPolicy> {
        self.staged.get(id).or_else(|| self.base.get(id))
    }
}
