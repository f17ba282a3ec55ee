use async_trait::async_trait;
use tracing::info;

use atrium_policy::inherit_parent;
use atrium_types::{CredentialRule, CredentialType, EntityId, PolicyType, Privilege};

use crate::batch::ComputedParent;
use crate::entity::AggregateKind;
use crate::error::PropagationError;
use crate::registry::{PropagationContext, Propagator};

/// Account aggregate: seeds from the platform root and recurses into every
/// space the account owns.
pub struct AccountPropagator;

#[async_trait]
impl Propagator for AccountPropagator {
    async fn apply(
        &self,
        ctx: &mut PropagationContext,
        entity_id: &EntityId,
        parent: &ComputedParent,
    ) -> Result<(), PropagationError> {
        let account = ctx.store().account(entity_id).await?;

        let mut policy = ctx.batch.begin(&account.policy, PolicyType::Account);
        let parent_policy = ctx.batch.parent_policy(parent)?.clone();
        inherit_parent(&mut policy, &parent_policy, &ctx.batch);

        policy.credential_rules.push(CredentialRule::new(
            vec![
                Privilege::Create,
                Privilege::Read,
                Privilege::Update,
                Privilege::Delete,
                Privilege::Grant,
            ],
            vec![account.admin_credential.clone()],
            "account admins",
        ));
        policy.credential_rules.push(CredentialRule::new(
            vec![Privilege::Create, Privilege::Read, Privilege::Update],
            vec![account.host_credential.clone()],
            "account hosts",
        ));
        policy.credential_rules.push(
            CredentialRule::using_types_only(
                vec![
                    Privilege::Create,
                    Privilege::Read,
                    Privilege::Update,
                    Privilege::Delete,
                    Privilege::Grant,
                ],
                vec![CredentialType::GlobalAdmin, CredentialType::GlobalSupport],
                "platform settings admins",
            )
            .with_cascade(false),
        );

        info!(
            account_id = %account.id,
            spaces = account.space_ids.len(),
            "account authorization recomputed"
        );
        let self_parent = ctx.batch.stage(policy);

        for space_id in &account.space_ids {
            ctx.apply(AggregateKind::Space, space_id, &self_parent)
                .await?;
        }
        Ok(())
    }
}
