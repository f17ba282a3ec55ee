use async_trait::async_trait;
use tracing::{debug, warn};

use atrium_licensing::LicensingError;
use atrium_policy::inherit_parent;
use atrium_types::{CredentialRule, CredentialType, EntityId, PolicyType, Privilege};

use crate::batch::ComputedParent;
use crate::entity::AggregateKind;
use crate::error::PropagationError;
use crate::registry::{PropagationContext, Propagator};

/// Contribution container. Closed callouts keep their content readable but
/// grant no contribution privileges.
pub struct CalloutPropagator;

#[async_trait]
impl Propagator for CalloutPropagator {
    async fn apply(
        &self,
        ctx: &mut PropagationContext,
        entity_id: &EntityId,
        parent: &ComputedParent,
    ) -> Result<(), PropagationError> {
        let callout = ctx.store().callout(entity_id).await?;
        let scope = ctx.scope_or_fail()?.clone();

        let mut policy = ctx.batch.begin(&callout.policy, PolicyType::Callout);
        let parent_policy = ctx.batch.parent_policy(parent)?.clone();
        inherit_parent(&mut policy, &parent_policy, &ctx.batch);

        if callout.settings.allow_contributions && !scope.member_criteria.is_empty() {
            policy.credential_rules.push(
                CredentialRule::new(
                    vec![Privilege::Contribute, Privilege::CreateMessage],
                    scope.member_criteria.clone(),
                    "callout contributions",
                )
                .with_cascade(false),
            );
        }
        if !scope.lead_criteria.is_empty() {
            policy.credential_rules.push(
                CredentialRule::new(
                    vec![Privilege::Update, Privilege::MoveContribution],
                    scope.lead_criteria.clone(),
                    "leads curate callout",
                )
                .with_cascade(false),
            );
        }

        debug!(callout_id = %callout.id, open = callout.settings.allow_contributions, "callout authorization recomputed");
        let self_parent = ctx.batch.stage(policy);

        for memo_id in &callout.memo_ids {
            ctx.apply(AggregateKind::Memo, memo_id, &self_parent).await?;
        }
        if let Some(discussion_id) = &callout.discussion {
            ctx.apply(AggregateKind::Discussion, discussion_id, &self_parent)
                .await?;
        }
        Ok(())
    }
}

/// Collaboratively edited document: members may update.
pub struct MemoPropagator;

#[async_trait]
impl Propagator for MemoPropagator {
    async fn apply(
        &self,
        ctx: &mut PropagationContext,
        entity_id: &EntityId,
        parent: &ComputedParent,
    ) -> Result<(), PropagationError> {
        let memo = ctx.store().memo(entity_id).await?;
        let scope = ctx.scope_or_fail()?.clone();

        let mut policy = ctx.batch.begin(&memo.policy, PolicyType::Memo);
        let parent_policy = ctx.batch.parent_policy(parent)?.clone();
        inherit_parent(&mut policy, &parent_policy, &ctx.batch);

        if !scope.member_criteria.is_empty() {
            policy.credential_rules.push(
                CredentialRule::new(
                    vec![Privilege::Update],
                    scope.member_criteria.clone(),
                    "memo collaborative editing",
                )
                .with_cascade(false),
            );
        }

        ctx.batch.stage(policy);
        Ok(())
    }
}

pub struct DiscussionPropagator;

#[async_trait]
impl Propagator for DiscussionPropagator {
    async fn apply(
        &self,
        ctx: &mut PropagationContext,
        entity_id: &EntityId,
        parent: &ComputedParent,
    ) -> Result<(), PropagationError> {
        let discussion = ctx.store().discussion(entity_id).await?;
        let scope = ctx.scope_or_fail()?.clone();

        let mut policy = ctx.batch.begin(&discussion.policy, PolicyType::Discussion);
        let parent_policy = ctx.batch.parent_policy(parent)?.clone();
        inherit_parent(&mut policy, &parent_policy, &ctx.batch);

        if !scope.member_criteria.is_empty() {
            policy.credential_rules.push(
                CredentialRule::new(
                    vec![Privilege::CreateMessage],
                    scope.member_criteria.clone(),
                    "members post in discussions",
                )
                .with_cascade(false),
            );
        }

        ctx.batch.stage(policy);
        Ok(())
    }
}

pub struct InnovationFlowPropagator;

#[async_trait]
impl Propagator for InnovationFlowPropagator {
    async fn apply(
        &self,
        ctx: &mut PropagationContext,
        entity_id: &EntityId,
        parent: &ComputedParent,
    ) -> Result<(), PropagationError> {
        let flow = ctx.store().innovation_flow(entity_id).await?;
        let scope = ctx.scope_or_fail()?.clone();

        let mut policy = ctx.batch.begin(&flow.policy, PolicyType::InnovationFlow);
        let parent_policy = ctx.batch.parent_policy(parent)?.clone();
        inherit_parent(&mut policy, &parent_policy, &ctx.batch);

        if !scope.member_criteria.is_empty() {
            policy.credential_rules.push(
                CredentialRule::new(
                    vec![Privilege::UpdateInnovationFlow],
                    scope.member_criteria.clone(),
                    "members advance the flow",
                )
                .with_cascade(false),
            );
        }

        ctx.batch.stage(policy);
        Ok(())
    }
}

/// Space profile. Readable for discovery even when the space itself is
/// private; the READ_ABOUT grant does not expose the space's content.
pub struct AboutPropagator;

#[async_trait]
impl Propagator for AboutPropagator {
    async fn apply(
        &self,
        ctx: &mut PropagationContext,
        entity_id: &EntityId,
        parent: &ComputedParent,
    ) -> Result<(), PropagationError> {
        let about = ctx.store().about(entity_id).await?;

        let mut policy = ctx.batch.begin(&about.policy, PolicyType::About);
        let parent_policy = ctx.batch.parent_policy(parent)?.clone();
        inherit_parent(&mut policy, &parent_policy, &ctx.batch);

        policy.credential_rules.push(
            CredentialRule::using_types_only(
                vec![Privilege::ReadAbout],
                vec![
                    CredentialType::GlobalAnonymous,
                    CredentialType::GlobalRegistered,
                ],
                "space discoverability",
            )
            .with_cascade(false),
        );

        ctx.batch.stage(policy);
        Ok(())
    }
}

pub struct AgentPropagator;

#[async_trait]
impl Propagator for AgentPropagator {
    async fn apply(
        &self,
        ctx: &mut PropagationContext,
        entity_id: &EntityId,
        parent: &ComputedParent,
    ) -> Result<(), PropagationError> {
        let record = ctx.store().agent_record(entity_id).await?;
        let scope = ctx.scope_or_fail()?.clone();

        let mut policy = ctx.batch.begin(&record.policy, PolicyType::Agent);
        let parent_policy = ctx.batch.parent_policy(parent)?.clone();
        inherit_parent(&mut policy, &parent_policy, &ctx.batch);

        if !scope.admin_criteria.is_empty() {
            policy.credential_rules.push(
                CredentialRule::new(
                    vec![Privilege::Grant],
                    scope.admin_criteria.clone(),
                    "admins manage credentials",
                )
                .with_cascade(false),
            );
        }

        ctx.batch.stage(policy);
        Ok(())
    }
}

pub struct StoragePropagator;

#[async_trait]
impl Propagator for StoragePropagator {
    async fn apply(
        &self,
        ctx: &mut PropagationContext,
        entity_id: &EntityId,
        parent: &ComputedParent,
    ) -> Result<(), PropagationError> {
        let aggregator = ctx.store().storage_aggregator(entity_id).await?;
        let scope = ctx.scope_or_fail()?.clone();

        let mut policy = ctx
            .batch
            .begin(&aggregator.policy, PolicyType::StorageAggregator);
        let parent_policy = ctx.batch.parent_policy(parent)?.clone();
        inherit_parent(&mut policy, &parent_policy, &ctx.batch);

        if !scope.member_criteria.is_empty() {
            policy.credential_rules.push(
                CredentialRule::new(
                    vec![Privilege::FileUpload],
                    scope.member_criteria.clone(),
                    "members upload files",
                )
                .with_cascade(false),
            );
        }

        ctx.batch.stage(policy);
        Ok(())
    }
}

/// License record: authorization for reading/resetting it, plus the
/// entitlement recomputation against the root space agent's plan
/// credentials.
pub struct LicensePropagator;

#[async_trait]
impl Propagator for LicensePropagator {
    async fn apply(
        &self,
        ctx: &mut PropagationContext,
        entity_id: &EntityId,
        parent: &ComputedParent,
    ) -> Result<(), PropagationError> {
        let store = ctx.store();
        let mut record = store.license_record(entity_id).await?;
        let scope = ctx.scope_or_fail()?.clone();

        // A license with no entitlement records cannot be extended; fail
        // before staging so the node leaves zero writes behind.
        if record.entitlements.is_empty() {
            warn!(license_id = %record.id, "license has no entitlement records");
            return Err(LicensingError::EntitlementsNotInitialized(record.id.to_string()).into());
        }

        let mut policy = ctx.batch.begin(&record.policy, PolicyType::License);
        let parent_policy = ctx.batch.parent_policy(parent)?.clone();
        inherit_parent(&mut policy, &parent_policy, &ctx.batch);

        policy.credential_rules.push(
            CredentialRule::using_types_only(
                vec![Privilege::Read, Privilege::ReadLicense, Privilege::LicenseReset],
                vec![CredentialType::GlobalLicenseManager],
                "license managers",
            )
            .with_cascade(false),
        );

        ctx.batch.stage(policy);

        let licensing = ctx.licensing();
        licensing.reset_entitlements(&mut record.entitlements);
        licensing.extend_entitlements(&mut record.entitlements, &scope.root_agent, None);
        debug!(
            license_id = %record.id,
            agent_id = %scope.root_agent.id,
            enabled = record.entitlements.iter().filter(|e| e.enabled).count(),
            "license entitlements recomputed"
        );
        store.save_license_record(&record).await
    }
}
