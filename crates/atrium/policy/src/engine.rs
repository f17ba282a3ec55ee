use std::collections::BTreeSet;

use atrium_types::{
    AuthorizationPolicy, Credential, CredentialRule, Privilege, PrivilegeRule, RuleId,
};
use tracing::debug;

use crate::arena::PolicyResolver;
use crate::error::PolicyError;

/// Clears both rule sets and the anonymous-read marker. The parent link is
/// preserved: reset is not detachment, and a later propagation pass
/// re-derives inheritance from it.
pub fn reset(policy: &mut AuthorizationPolicy) {
    policy.credential_rules.clear();
    policy.privilege_rules.clear();
    policy.anonymous_read_access = false;
}

/// Sets the child's parent link and merges the parent's effective cascading
/// rules into the child's rule set.
///
/// The merge is additive: rules already appended to the child in the same
/// pass are kept. The parent's *effective* set is used, so a subtree
/// recomputed on its own still sees rules cascading from higher ancestors.
pub fn inherit_parent(
    child: &mut AuthorizationPolicy,
    parent: &AuthorizationPolicy,
    resolver: &dyn PolicyResolver,
) {
    child.parent_policy = Some(parent.id.clone());
    child.anonymous_read_access = parent.anonymous_read_access;
    let inherited: Vec<CredentialRule> = effective_credential_rules(parent, resolver)
        .into_iter()
        .filter(|rule| rule.cascade)
        .collect();
    debug!(
        child = %child.id,
        parent = %parent.id,
        inherited = inherited.len(),
        "inheriting parent authorization"
    );
    child.credential_rules.extend(inherited);
}

/// Appends credential rules without deduplication; a duplicate rule id is a
/// logic error upstream, not something the engine silently merges.
pub fn append_credential_rules(policy: &mut AuthorizationPolicy, rules: Vec<CredentialRule>) {
    policy.credential_rules.extend(rules);
}

/// Appends a privilege-mapping rule (`source` implies each of `mapped`).
pub fn append_privilege_rule_mapping(
    policy: &mut AuthorizationPolicy,
    source: Privilege,
    mapped: Vec<Privilege>,
    name: impl Into<String>,
) {
    policy
        .privilege_rules
        .push(PrivilegeRule::new(source, mapped, name));
}

/// Replaces the rule carrying the same id, keeping its position.
pub fn update_credential_rule(
    policy: &mut AuthorizationPolicy,
    rule: CredentialRule,
) -> Result<(), PolicyError> {
    match policy
        .credential_rules
        .iter_mut()
        .find(|existing| existing.id == rule.id)
    {
        Some(existing) => {
            *existing = rule;
            Ok(())
        }
        None => Err(PolicyError::RuleNotFound {
            policy_id: policy.id.clone(),
            rule_id: rule.id,
        }),
    }
}

/// Removes a rule by id; other rules keep their ids and fields.
pub fn delete_credential_rule(
    policy: &mut AuthorizationPolicy,
    rule_id: &RuleId,
) -> Result<CredentialRule, PolicyError> {
    let index = policy
        .credential_rules
        .iter()
        .position(|rule| &rule.id == rule_id)
        .ok_or_else(|| PolicyError::RuleNotFound {
            policy_id: policy.id.clone(),
            rule_id: rule_id.clone(),
        })?;
    Ok(policy.credential_rules.remove(index))
}

/// The policy's own rules plus every ancestor rule that cascades through all
/// links of the parent chain down to this policy.
///
/// A rule with `cascade == false` is only effective on the policy that
/// declares it.
pub fn effective_credential_rules(
    policy: &AuthorizationPolicy,
    resolver: &dyn PolicyResolver,
) -> Vec<CredentialRule> {
    let mut rules = policy.credential_rules.clone();
    let mut visited = BTreeSet::new();
    visited.insert(policy.id.as_str().to_string());

    let mut next = policy.parent_policy.clone();
    while let Some(parent_id) = next {
        if !visited.insert(parent_id.as_str().to_string()) {
            break;
        }
        let Some(parent) = resolver.policy(&parent_id) else {
            break;
        };
        rules.extend(
            parent
                .credential_rules
                .iter()
                .filter(|rule| rule.cascade)
                .cloned(),
        );
        next = parent.parent_policy.clone();
    }
    rules
}

/// Expands a privilege set to its transitive closure under the mapping rules.
///
/// Iterates to a fixpoint; mapping rules are acyclic by construction, and the
/// privilege universe is finite, so the loop terminates regardless.
pub fn expand_privileges(
    granted: &BTreeSet<Privilege>,
    privilege_rules: &[PrivilegeRule],
) -> BTreeSet<Privilege> {
    let mut closed = granted.clone();
    loop {
        let before = closed.len();
        for rule in privilege_rules {
            if closed.contains(&rule.source_privilege) {
                closed.extend(rule.granted_privileges.iter().copied());
            }
        }
        if closed.len() == before {
            return closed;
        }
    }
}

fn matched_privileges(
    credentials: &[Credential],
    policy: &AuthorizationPolicy,
    resolver: &dyn PolicyResolver,
) -> BTreeSet<Privilege> {
    let mut granted = BTreeSet::new();
    for rule in effective_credential_rules(policy, resolver) {
        if rule.matched_by(credentials) {
            granted.extend(rule.granted_privileges.iter().copied());
        }
    }
    granted
}

/// Whether the held credentials grant the required privilege on this policy.
///
/// Never errors for "no access": a policy with no parent and no rules simply
/// denies everything, and an empty credential list matches only rules whose
/// criteria name an anonymous-style credential type explicitly.
pub fn is_access_granted(
    credentials: &[Credential],
    policy: &AuthorizationPolicy,
    resolver: &dyn PolicyResolver,
    privilege_required: Privilege,
) -> bool {
    let granted = matched_privileges(credentials, policy, resolver);
    if granted.contains(&privilege_required) {
        return true;
    }
    expand_privileges(&granted, &policy.privilege_rules).contains(&privilege_required)
}

/// The full closed privilege set for the held credentials, for introspection
/// surfaces. Deterministically ordered.
pub fn granted_privileges(
    credentials: &[Credential],
    policy: &AuthorizationPolicy,
    resolver: &dyn PolicyResolver,
) -> Vec<Privilege> {
    let granted = matched_privileges(credentials, policy, resolver);
    expand_privileges(&granted, &policy.privilege_rules)
        .into_iter()
        .collect()
}

/// Like [`is_access_granted`], but failure is an error carrying the required
/// privilege and the caller-supplied diagnostic context.
pub fn grant_access_or_fail(
    credentials: &[Credential],
    policy: &AuthorizationPolicy,
    resolver: &dyn PolicyResolver,
    privilege_required: Privilege,
    context: impl Into<String>,
) -> Result<(), PolicyError> {
    if is_access_granted(credentials, policy, resolver, privilege_required) {
        return Ok(());
    }
    let context = context.into();
    debug!(
        policy_id = %policy.id,
        privilege = %privilege_required,
        credentials = credentials.len(),
        rules = policy.rule_count(),
        %context,
        "access denied"
    );
    Err(PolicyError::Forbidden {
        privilege: privilege_required,
        context,
    })
}
