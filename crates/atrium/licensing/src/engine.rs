use std::collections::BTreeSet;

use atrium_types::{Agent, Entitlement, EntitlementType, LicenseEntitlement};
use tracing::debug;

use crate::error::LicensingError;
use crate::policy::LicensePolicy;

/// Grants entitlements by credential type.
///
/// The default policy is injected at construction by the bootstrap step;
/// callers that manage a specific policy (e.g. per-tenant) pass it
/// explicitly and the default is the fallback.
pub struct LicensingEngine {
    default_policy: LicensePolicy,
}

impl LicensingEngine {
    pub fn new(default_policy: LicensePolicy) -> Self {
        Self { default_policy }
    }

    pub fn default_policy(&self) -> &LicensePolicy {
        &self.default_policy
    }

    fn policy_or_default<'a>(&'a self, policy: Option<&'a LicensePolicy>) -> &'a LicensePolicy {
        policy.unwrap_or(&self.default_policy)
    }

    /// Whether any held credential's type maps to the entitlement. The
    /// existence of the mapping is sufficient; the limit is not compared.
    pub fn is_entitlement_granted(
        &self,
        entitlement_type: EntitlementType,
        agent: &Agent,
        policy: Option<&LicensePolicy>,
    ) -> bool {
        self.entitlement_if_granted(entitlement_type, agent, policy)
            .is_some()
    }

    /// The matched entitlement record, including its limit.
    pub fn entitlement_if_granted(
        &self,
        entitlement_type: EntitlementType,
        agent: &Agent,
        policy: Option<&LicensePolicy>,
    ) -> Option<Entitlement> {
        let policy = self.policy_or_default(policy);
        for rule in &policy.credential_rules {
            if !agent.has_credential_of_type(rule.credential_type) {
                continue;
            }
            if let Some(entitlement) = rule
                .granted_entitlements
                .iter()
                .find(|entitlement| entitlement.entitlement_type == entitlement_type)
            {
                return Some(*entitlement);
            }
        }
        None
    }

    pub fn grant_entitlement_or_fail(
        &self,
        entitlement_type: EntitlementType,
        agent: &Agent,
        policy: Option<&LicensePolicy>,
    ) -> Result<Entitlement, LicensingError> {
        let policy_id = self.policy_or_default(policy).id.clone();
        self.entitlement_if_granted(entitlement_type, agent, policy)
            .ok_or_else(|| {
                debug!(
                    %entitlement_type,
                    agent_id = %agent.id,
                    %policy_id,
                    "entitlement denied"
                );
                LicensingError::ForbiddenLicense {
                    entitlement_type,
                    policy_id,
                    agent_id: agent.id.clone(),
                }
            })
    }

    /// Every entitlement type granted with a positive limit, de-duplicated
    /// and deterministically ordered.
    pub fn granted_entitlements(
        &self,
        agent: &Agent,
        policy: Option<&LicensePolicy>,
    ) -> Vec<EntitlementType> {
        let policy = self.policy_or_default(policy);
        let mut granted = BTreeSet::new();
        for rule in &policy.credential_rules {
            if !agent.has_credential_of_type(rule.credential_type) {
                continue;
            }
            granted.extend(
                rule.granted_entitlements
                    .iter()
                    .filter(|entitlement| entitlement.limit > 0)
                    .map(|entitlement| entitlement.entitlement_type),
            );
        }
        granted.into_iter().collect()
    }

    /// Disables every entitlement record and zeroes its limit, so a license
    /// pass always extends from a clean state.
    pub fn reset_entitlements(&self, entitlements: &mut [LicenseEntitlement]) {
        for entitlement in entitlements.iter_mut() {
            entitlement.limit = 0;
            entitlement.enabled = false;
        }
    }

    /// Re-enables the entitlement records that the root agent's plan
    /// credentials grant, copying the granted limit onto each record.
    ///
    /// The agent is always the root (L0) space's agent: plan credentials are
    /// issued at the root, and subspaces extend against the same agent.
    pub fn extend_entitlements(
        &self,
        entitlements: &mut [LicenseEntitlement],
        agent: &Agent,
        policy: Option<&LicensePolicy>,
    ) {
        for record in entitlements.iter_mut() {
            if let Some(granted) =
                self.entitlement_if_granted(record.entitlement_type, agent, policy)
            {
                record.limit = granted.limit;
                record.enabled = true;
            }
        }
    }
}

impl Default for LicensingEngine {
    fn default() -> Self {
        Self::new(LicensePolicy::platform_default())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::policy::LicensingCredentialRule;
    use atrium_types::{AgentId, Credential, CredentialType};

    fn plus_plan_agent() -> Agent {
        Agent::new(
            AgentId::new("agent-1"),
            vec![Credential::global(CredentialType::LicenseSpacePlus)],
        )
    }

    fn plus_plan_policy() -> LicensePolicy {
        LicensePolicy::new(
            "test",
            vec![LicensingCredentialRule::new(
                CredentialType::LicenseSpacePlus,
                vec![Entitlement::new(EntitlementType::SpacePlus, 1)],
                "Plus plan",
            )],
        )
    }

    #[test]
    fn entitlement_granted_by_credential_type() {
        let engine = LicensingEngine::new(plus_plan_policy());
        assert!(engine.is_entitlement_granted(EntitlementType::SpacePlus, &plus_plan_agent(), None));
    }

    #[test]
    fn entitlement_denied_without_the_credential() {
        let engine = LicensingEngine::new(plus_plan_policy());
        let agent = Agent::new(AgentId::new("agent-2"), vec![]);
        assert!(!engine.is_entitlement_granted(EntitlementType::SpacePlus, &agent, None));
    }

    #[test]
    fn entitlement_if_granted_returns_the_limit() {
        let engine = LicensingEngine::new(plus_plan_policy());
        let entitlement = engine
            .entitlement_if_granted(EntitlementType::SpacePlus, &plus_plan_agent(), None)
            .unwrap();
        assert_eq!(entitlement.limit, 1);
    }

    #[test]
    fn grant_or_fail_carries_diagnostics() {
        let engine = LicensingEngine::new(plus_plan_policy());
        let agent = Agent::new(AgentId::new("agent-3"), vec![]);
        let err = engine
            .grant_entitlement_or_fail(EntitlementType::SpacePlus, &agent, None)
            .unwrap_err();
        match err {
            LicensingError::ForbiddenLicense {
                entitlement_type,
                agent_id,
                ..
            } => {
                assert_eq!(entitlement_type, EntitlementType::SpacePlus);
                assert_eq!(agent_id, AgentId::new("agent-3"));
            }
            other => panic!("unexpected error {other:?}"),
        }
    }

    #[test]
    fn granted_entitlements_skip_zero_limits_and_dedupe() {
        let policy = LicensePolicy::new(
            "test",
            vec![
                LicensingCredentialRule::new(
                    CredentialType::LicenseSpacePlus,
                    vec![
                        Entitlement::new(EntitlementType::SpacePlus, 1),
                        Entitlement::new(EntitlementType::SpaceFlagSaveAsTemplate, 0),
                    ],
                    "Plus plan",
                ),
                LicensingCredentialRule::new(
                    CredentialType::BetaTester,
                    vec![Entitlement::new(EntitlementType::SpacePlus, 1)],
                    "Beta testers",
                ),
            ],
        );
        let engine = LicensingEngine::new(policy);
        let agent = Agent::new(
            AgentId::new("agent-4"),
            vec![
                Credential::global(CredentialType::LicenseSpacePlus),
                Credential::global(CredentialType::BetaTester),
            ],
        );
        assert_eq!(
            engine.granted_entitlements(&agent, None),
            vec![EntitlementType::SpacePlus]
        );
    }

    #[test]
    fn explicit_policy_overrides_the_default() {
        let engine = LicensingEngine::default();
        let narrow = LicensePolicy::new("narrow", vec![]);
        let agent = plus_plan_agent();

        assert!(engine.is_entitlement_granted(EntitlementType::SpacePlus, &agent, None));
        assert!(!engine.is_entitlement_granted(EntitlementType::SpacePlus, &agent, Some(&narrow)));
    }

    #[test]
    fn reset_then_extend_reflects_the_plan() {
        let engine = LicensingEngine::new(plus_plan_policy());
        let mut entitlements = vec![
            LicenseEntitlement {
                entitlement_type: EntitlementType::SpacePlus,
                limit: 7,
                enabled: true,
            },
            LicenseEntitlement {
                entitlement_type: EntitlementType::SpacePremium,
                limit: 3,
                enabled: true,
            },
        ];

        engine.reset_entitlements(&mut entitlements);
        assert!(entitlements.iter().all(|e| !e.enabled && e.limit == 0));

        engine.extend_entitlements(&mut entitlements, &plus_plan_agent(), None);
        assert!(entitlements[0].enabled);
        assert_eq!(entitlements[0].limit, 1);
        assert!(!entitlements[1].enabled);
    }
}
