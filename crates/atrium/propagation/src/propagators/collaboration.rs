use async_trait::async_trait;
use tracing::{debug, warn};

use atrium_policy::{append_privilege_rule_mapping, inherit_parent};
use atrium_types::{CredentialRule, EntityId, PolicyType, Privilege};

use crate::batch::ComputedParent;
use crate::entity::AggregateKind;
use crate::error::PropagationError;
use crate::registry::{PropagationContext, Propagator};

/// Content surface of a space: contribution rules, then recursion into the
/// innovation flow and every callout.
pub struct CollaborationPropagator;

#[async_trait]
impl Propagator for CollaborationPropagator {
    async fn apply(
        &self,
        ctx: &mut PropagationContext,
        entity_id: &EntityId,
        parent: &ComputedParent,
    ) -> Result<(), PropagationError> {
        let store = ctx.store();
        let collaboration = store.collaboration(entity_id).await?;
        let innovation_flow_id = collaboration.innovation_flow.clone().ok_or_else(|| {
            warn!(
                collaboration_id = %collaboration.id,
                "collaboration is missing its innovation flow"
            );
            PropagationError::RelationshipNotFound {
                kind: AggregateKind::Collaboration,
                entity_id: collaboration.id.clone(),
                relation: "innovation_flow",
            }
        })?;
        let scope = ctx.scope_or_fail()?.clone();

        let mut policy = ctx
            .batch
            .begin(&collaboration.policy, PolicyType::Collaboration);
        let parent_policy = ctx.batch.parent_policy(parent)?.clone();
        inherit_parent(&mut policy, &parent_policy, &ctx.batch);

        if !scope.member_criteria.is_empty() {
            // Contribution stays local; callouts decide per their own
            // settings whether contributions are open.
            policy.credential_rules.push(
                CredentialRule::new(
                    vec![Privilege::Contribute],
                    scope.member_criteria.clone(),
                    "members contribute",
                )
                .with_cascade(false),
            );
            if scope.members_may_create_callouts {
                policy.credential_rules.push(
                    CredentialRule::new(
                        vec![Privilege::CreateCallout],
                        scope.member_criteria.clone(),
                        "members may create callouts",
                    )
                    .with_cascade(false),
                );
            }
        }
        if !scope.lead_criteria.is_empty() {
            policy.credential_rules.push(
                CredentialRule::new(
                    vec![Privilege::Update, Privilege::MoveContribution],
                    scope.lead_criteria.clone(),
                    "leads curate content",
                )
                .with_cascade(false),
            );
        }

        append_privilege_rule_mapping(
            &mut policy,
            Privilege::Contribute,
            vec![Privilege::CreateMessage],
            "contributors may post messages",
        );

        debug!(
            collaboration_id = %collaboration.id,
            callouts = collaboration.callout_ids.len(),
            "collaboration authorization recomputed"
        );
        let self_parent = ctx.batch.stage(policy);

        ctx.apply(AggregateKind::InnovationFlow, &innovation_flow_id, &self_parent)
            .await?;
        for callout_id in &collaboration.callout_ids {
            ctx.apply(AggregateKind::Callout, callout_id, &self_parent)
                .await?;
        }
        Ok(())
    }
}
