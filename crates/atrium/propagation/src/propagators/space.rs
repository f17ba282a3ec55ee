use async_trait::async_trait;
use tracing::{info, warn};

use atrium_policy::{append_privilege_rule_mapping, inherit_parent};
use atrium_types::{Credential, CredentialRule, CredentialType, EntityId, PolicyType, Privilege};

use crate::batch::ComputedParent;
use crate::entity::{AggregateKind, PrivacyMode, RoleName, Space};
use crate::error::PropagationError;
use crate::registry::{PropagationContext, Propagator, RoleScope};
use crate::visibility;

/// The full per-space recomputation: reset + inherit, visibility criteria,
/// role rules, privilege mappings, then recursion into components and
/// subspaces.
pub struct SpacePropagator;

fn require_relation(
    space: &Space,
    relation: &Option<EntityId>,
    name: &'static str,
) -> Result<EntityId, PropagationError> {
    relation.clone().ok_or_else(|| {
        warn!(space_id = %space.id, relation = name, "space is missing a required relation");
        PropagationError::RelationshipNotFound {
            kind: AggregateKind::Space,
            entity_id: space.id.clone(),
            relation: name,
        }
    })
}

#[async_trait]
impl Propagator for SpacePropagator {
    async fn apply(
        &self,
        ctx: &mut PropagationContext,
        entity_id: &EntityId,
        parent: &ComputedParent,
    ) -> Result<(), PropagationError> {
        let store = ctx.store();
        let space = store.space(entity_id).await?;

        // Validate the invariant-required substructure before staging
        // anything, so a broken node leaves zero writes behind.
        let community_id = require_relation(&space, &space.community, "community")?;
        let about_id = require_relation(&space, &space.about, "about")?;
        let agent_id = require_relation(&space, &space.agent, "agent")?;
        let storage_id = require_relation(&space, &space.storage, "storage")?;
        let collaboration_id = require_relation(&space, &space.collaboration, "collaboration")?;
        let license_id = require_relation(&space, &space.license, "license")?;

        let community = store.community(&community_id).await?;
        let role_set_id = community.role_set.clone().ok_or_else(|| {
            warn!(community_id = %community.id, "community is missing its role set");
            PropagationError::RelationshipNotFound {
                kind: AggregateKind::Community,
                entity_id: community.id.clone(),
                relation: "role_set",
            }
        })?;
        let role_set = store.role_set(&role_set_id).await?;
        let agent_record = store.agent_record(&agent_id).await?;

        let mut policy = ctx.batch.begin(&space.policy, PolicyType::Space);

        // A private subspace detaches from its parent's cascading read
        // rules and chains to the platform root instead; its own visibility
        // rule below narrows reads to the privacy boundary's members.
        let inherit_from =
            if !space.level.is_root() && space.settings.privacy == PrivacyMode::Private {
                ctx.platform_root()
            } else {
                parent.clone()
            };
        let parent_policy = ctx.batch.parent_policy(&inherit_from)?.clone();
        inherit_parent(&mut policy, &parent_policy, &ctx.batch);

        if !space.archived {
            let criteria = visibility::read_visibility_criteria(&store, &space).await?;
            policy.anonymous_read_access = criteria
                .iter()
                .any(|criterion| criterion.credential_type == CredentialType::GlobalAnonymous);
            policy
                .credential_rules
                .push(CredentialRule::new(
                    vec![Privilege::Read],
                    criteria,
                    "space read visibility",
                ));
        }

        let member_criteria = role_set.credentials_for_role_with_parents(RoleName::Member);
        let lead_criteria = role_set.credentials_for_role_with_parents(RoleName::Lead);
        let admin_criteria = role_set.credentials_for_role_with_parents(RoleName::Admin);

        if !member_criteria.is_empty() {
            policy.credential_rules.push(CredentialRule::new(
                vec![Privilege::Read],
                member_criteria.clone(),
                "space members",
            ));
        }
        if !lead_criteria.is_empty() {
            policy.credential_rules.push(
                CredentialRule::new(
                    vec![Privilege::Read, Privilege::Update, Privilege::CommunityInvite],
                    lead_criteria.clone(),
                    "space leads",
                )
                .with_cascade(false),
            );
        }
        if !admin_criteria.is_empty() {
            policy.credential_rules.push(
                CredentialRule::new(
                    vec![
                        Privilege::Create,
                        Privilege::Read,
                        Privilege::Update,
                        Privilege::Delete,
                        Privilege::Grant,
                    ],
                    admin_criteria.clone(),
                    "space admins",
                )
                .with_cascade(false),
            );
        }
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
        if space.settings.allow_members_to_create_subspaces && !member_criteria.is_empty() {
            policy.credential_rules.push(
                CredentialRule::new(
                    vec![Privilege::CreateSubspace],
                    member_criteria.clone(),
                    "members may create subspaces",
                )
                .with_cascade(false),
            );
        }
        if let Some(parent_space_id) = &space.parent_space {
            policy.credential_rules.push(
                CredentialRule::new(
                    vec![Privilege::Delete],
                    vec![Credential::new(
                        CredentialType::SpaceAdmin,
                        parent_space_id.as_str(),
                    )],
                    "parent space admins may delete",
                )
                .with_cascade(false),
            );
        }

        append_privilege_rule_mapping(
            &mut policy,
            Privilege::Read,
            vec![Privilege::ReadAbout, Privilege::ReadLicense],
            "read implies read-about and read-license",
        );
        append_privilege_rule_mapping(
            &mut policy,
            Privilege::Create,
            vec![Privilege::CreateSubspace],
            "create implies create-subspace",
        );

        info!(
            space_id = %space.id,
            level = ?space.level,
            privacy = ?space.settings.privacy,
            rules = policy.rule_count(),
            "space authorization recomputed"
        );
        let self_parent = ctx.batch.stage(policy);

        // The licensing pass always evaluates the root space's agent, so
        // subspaces keep the scope agent set at L0.
        let root_agent = if space.level.is_root() {
            agent_record.agent.clone()
        } else {
            ctx.scope()
                .map(|scope| scope.root_agent.clone())
                .unwrap_or_else(|| agent_record.agent.clone())
        };
        ctx.set_scope(RoleScope {
            member_criteria,
            lead_criteria,
            admin_criteria,
            members_may_create_callouts: space.settings.allow_members_to_create_callouts,
            root_agent,
        });

        let components = [
            (AggregateKind::Community, community_id),
            (AggregateKind::About, about_id),
            (AggregateKind::Agent, agent_id),
            (AggregateKind::StorageAggregator, storage_id),
            (AggregateKind::Collaboration, collaboration_id),
            (AggregateKind::License, license_id),
        ];
        for (kind, child_id) in components {
            ctx.apply(kind, &child_id, &self_parent).await?;
        }
        for subspace_id in &space.subspace_ids {
            ctx.apply(AggregateKind::Space, subspace_id, &self_parent)
                .await?;
        }
        Ok(())
    }
}
