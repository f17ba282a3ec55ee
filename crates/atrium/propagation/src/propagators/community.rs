use async_trait::async_trait;
use tracing::{debug, warn};

use atrium_policy::inherit_parent;
use atrium_types::{Credential, CredentialRule, CredentialType, EntityId, PolicyType, Privilege};

use crate::batch::ComputedParent;
use crate::entity::AggregateKind;
use crate::error::PropagationError;
use crate::registry::{PropagationContext, Propagator};

/// Membership surface of a space: who may read, apply, join and invite.
pub struct CommunityPropagator;

#[async_trait]
impl Propagator for CommunityPropagator {
    async fn apply(
        &self,
        ctx: &mut PropagationContext,
        entity_id: &EntityId,
        parent: &ComputedParent,
    ) -> Result<(), PropagationError> {
        let store = ctx.store();
        let community = store.community(entity_id).await?;
        let role_set_id = community.role_set.clone().ok_or_else(|| {
            warn!(community_id = %community.id, "community is missing its role set");
            PropagationError::RelationshipNotFound {
                kind: AggregateKind::Community,
                entity_id: community.id.clone(),
                relation: "role_set",
            }
        })?;
        let role_set = store.role_set(&role_set_id).await?;
        let scope = ctx.scope_or_fail()?.clone();

        let mut policy = ctx.batch.begin(&community.policy, PolicyType::Community);
        let parent_policy = ctx.batch.parent_policy(parent)?.clone();
        inherit_parent(&mut policy, &parent_policy, &ctx.batch);

        if !scope.member_criteria.is_empty() {
            policy.credential_rules.push(CredentialRule::new(
                vec![Privilege::Read],
                scope.member_criteria.clone(),
                "community members",
            ));
        }
        policy.credential_rules.push(
            CredentialRule::using_types_only(
                vec![Privilege::CommunityApply],
                vec![CredentialType::GlobalRegistered],
                "registered users may apply",
            )
            .with_cascade(false),
        );
        policy.credential_rules.push(
            CredentialRule::new(
                vec![Privilege::CommunityJoin],
                vec![Credential::new(
                    CredentialType::SpaceMemberInvitee,
                    role_set.id.as_str(),
                )],
                "invited users may join",
            )
            .with_cascade(false),
        );
        if !scope.lead_criteria.is_empty() {
            policy.credential_rules.push(
                CredentialRule::new(
                    vec![Privilege::CommunityInvite],
                    scope.lead_criteria.clone(),
                    "leads may invite",
                )
                .with_cascade(false),
            );
        }
        if !scope.admin_criteria.is_empty() {
            policy.credential_rules.push(
                CredentialRule::new(
                    vec![
                        Privilege::CommunityAddMember,
                        Privilege::CommunityInvite,
                        Privilege::Grant,
                    ],
                    scope.admin_criteria.clone(),
                    "admins manage membership",
                )
                .with_cascade(false),
            );
        }

        debug!(community_id = %community.id, rules = policy.rule_count(), "community authorization recomputed");
        let self_parent = ctx.batch.stage(policy);

        ctx.apply(AggregateKind::RoleSet, &role_set_id, &self_parent)
            .await
    }
}

/// The role set itself: inherits the community policy; only admins may
/// grant roles directly on it.
pub struct RoleSetPropagator;

#[async_trait]
impl Propagator for RoleSetPropagator {
    async fn apply(
        &self,
        ctx: &mut PropagationContext,
        entity_id: &EntityId,
        parent: &ComputedParent,
    ) -> Result<(), PropagationError> {
        let store = ctx.store();
        let role_set = store.role_set(entity_id).await?;
        let scope = ctx.scope_or_fail()?.clone();

        let mut policy = ctx.batch.begin(&role_set.policy, PolicyType::RoleSet);
        let parent_policy = ctx.batch.parent_policy(parent)?.clone();
        inherit_parent(&mut policy, &parent_policy, &ctx.batch);

        if !scope.admin_criteria.is_empty() {
            policy.credential_rules.push(
                CredentialRule::new(
                    vec![Privilege::Grant],
                    scope.admin_criteria.clone(),
                    "admins assign roles",
                )
                .with_cascade(false),
            );
        }

        ctx.batch.stage(policy);
        Ok(())
    }
}
