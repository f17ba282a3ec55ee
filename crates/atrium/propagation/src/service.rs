use std::sync::Arc;

use atrium_licensing::LicensingEngine;
use atrium_policy::{PolicyArena, PolicyResolver};
use atrium_types::{AuthorizationPolicy, EntityId};
use tokio::sync::{RwLock, RwLockReadGuard};
use tokio::task::JoinSet;
use tracing::{info, warn};

use crate::batch::PolicyBatch;
use crate::entity::AggregateKind;
use crate::error::PropagationError;
use crate::platform::build_platform_policy;
use crate::propagators::standard_registry;
use crate::registry::{PropagationContext, PropagationRegistry};
use crate::store::EntityStore;

/// Per-root outcome of a platform-wide reset. Roots are independent;
/// partial completion is expected and retried per root.
#[derive(Debug, Default)]
pub struct ResetOutcome {
    pub succeeded: Vec<(EntityId, usize)>,
    pub failed: Vec<(EntityId, PropagationError)>,
}

/// Entry point for authorization propagation.
///
/// Owns the policy arena; each traversal works against a snapshot plus its
/// own staged batch and flushes once at the end. Policies staged before a
/// structural failure are still flushed: shallower nodes stay consistent,
/// the broken subtree stays untouched.
pub struct AuthorizationService {
    store: Arc<dyn EntityStore>,
    registry: Arc<PropagationRegistry>,
    licensing: Arc<LicensingEngine>,
    arena: RwLock<PolicyArena>,
}

impl AuthorizationService {
    pub fn new(store: Arc<dyn EntityStore>, licensing: Arc<LicensingEngine>) -> Self {
        Self::with_registry(store, licensing, standard_registry())
    }

    pub fn with_registry(
        store: Arc<dyn EntityStore>,
        licensing: Arc<LicensingEngine>,
        registry: PropagationRegistry,
    ) -> Self {
        Self {
            store,
            registry: Arc::new(registry),
            licensing,
            arena: RwLock::new(PolicyArena::new()),
        }
    }

    /// Read access to the flushed policies, for evaluation callers.
    pub async fn arena(&self) -> RwLockReadGuard<'_, PolicyArena> {
        self.arena.read().await
    }

    async fn begin_traversal(&self) -> Result<PropagationContext, PropagationError> {
        let platform = self.store.platform().await?;
        let snapshot = self.arena.read().await.clone();
        let mut batch = PolicyBatch::new(snapshot);
        let platform_root = batch.stage(build_platform_policy(&platform.policy));
        Ok(PropagationContext::new(
            Arc::clone(&self.store),
            Arc::clone(&self.registry),
            Arc::clone(&self.licensing),
            platform_root,
            batch,
        ))
    }

    async fn flush(&self, ctx: PropagationContext) -> Vec<AuthorizationPolicy> {
        let policies = ctx.into_batch().into_policies();
        let mut arena = self.arena.write().await;
        arena.upsert_all(policies.iter().cloned());
        info!(count = policies.len(), "authorization batch flushed");
        policies
    }

    /// Recomputes authorization for one space subtree.
    ///
    /// A root space chains to the platform root policy; a subspace chains to
    /// its parent's already-computed policy, which must exist in the arena.
    pub async fn apply_on_space(
        &self,
        space_id: &EntityId,
    ) -> Result<Vec<AuthorizationPolicy>, PropagationError> {
        let mut ctx = self.begin_traversal().await?;
        let space = self.store.space(space_id).await?;
        let parent = match &space.parent_space {
            None => ctx.platform_root(),
            Some(parent_space_id) => {
                let parent_space = self.store.space(parent_space_id).await?;
                let stored = ctx
                    .batch
                    .policy(&parent_space.policy)
                    .cloned()
                    .ok_or_else(|| {
                        PropagationError::EntityNotInitialized(format!(
                            "parent policy of space {space_id} has not been computed yet"
                        ))
                    })?;
                ctx.batch.stage(stored)
            }
        };

        let outcome = ctx.apply(AggregateKind::Space, space_id, &parent).await;
        let policies = self.flush(ctx).await;
        outcome.map(|()| policies)
    }

    /// Recomputes authorization for an account and every space it owns.
    pub async fn apply_on_account(
        &self,
        account_id: &EntityId,
    ) -> Result<Vec<AuthorizationPolicy>, PropagationError> {
        let mut ctx = self.begin_traversal().await?;
        let parent = ctx.platform_root();
        let outcome = ctx.apply(AggregateKind::Account, account_id, &parent).await;
        let policies = self.flush(ctx).await;
        outcome.map(|()| policies)
    }

    /// Platform-wide reset: one independent traversal per root space, fanned
    /// out as separate tasks. A failed root does not cancel its siblings.
    pub async fn reset_all(self: &Arc<Self>) -> Result<ResetOutcome, PropagationError> {
        let roots = self.store.root_space_ids().await?;
        info!(roots = roots.len(), "resetting authorization for all roots");

        let mut tasks = JoinSet::new();
        for root in roots {
            let service = Arc::clone(self);
            tasks.spawn(async move {
                let result = service.apply_on_space(&root).await;
                (root, result)
            });
        }

        let mut outcome = ResetOutcome::default();
        while let Some(joined) = tasks.join_next().await {
            match joined {
                Ok((root, Ok(policies))) => outcome.succeeded.push((root, policies.len())),
                Ok((root, Err(err))) => {
                    warn!(root = %root, error = %err, "root propagation failed");
                    outcome.failed.push((root, err));
                }
                Err(join_err) => {
                    warn!(error = %join_err, "root propagation task aborted");
                }
            }
        }
        Ok(outcome)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::entity::{
        About, AgentRecord, Callout, CalloutSettings, Collaboration, Community, Discussion,
        InnovationFlow, LicenseRecord, Memo, Platform, PrivacyMode, Role, RoleName, RoleSet, Space,
        SpaceLevel, SpaceSettings, StorageAggregator,
    };
    use crate::store::InMemoryEntityStore;
    use atrium_licensing::LicensingError;
    use atrium_policy::is_access_granted;
    use atrium_types::{
        Agent, AgentId, Credential, CredentialType, LicenseEntitlement, EntitlementType, PolicyId,
        Privilege,
    };
    use std::collections::HashMap;

    fn member(space: &str) -> Credential {
        Credential::new(CredentialType::SpaceMember, space)
    }

    fn registered() -> Credential {
        Credential::global(CredentialType::GlobalRegistered)
    }

    /// Inserts a space with its full required substructure and returns it.
    async fn seed_space(
        store: &InMemoryEntityStore,
        id: &str,
        level: SpaceLevel,
        parent: Option<&Space>,
        privacy: PrivacyMode,
        plan: Option<CredentialType>,
    ) -> Space {
        let entity = |suffix: &str| EntityId::new(format!("{id}-{suffix}"));
        let policy = |suffix: &str| PolicyId::new(format!("{id}-{suffix}-policy"));

        let mut roles = HashMap::new();
        let parent_member = parent
            .map(|p| vec![member(p.id.as_str())])
            .unwrap_or_default();
        roles.insert(
            RoleName::Member,
            Role {
                credential: member(id),
                parent_credentials: parent_member,
            },
        );
        roles.insert(
            RoleName::Lead,
            Role {
                credential: Credential::new(CredentialType::SpaceLead, id),
                parent_credentials: Vec::new(),
            },
        );
        roles.insert(
            RoleName::Admin,
            Role {
                credential: Credential::new(CredentialType::SpaceAdmin, id),
                parent_credentials: Vec::new(),
            },
        );
        let role_set = RoleSet {
            id: entity("role-set"),
            policy: policy("role-set"),
            roles,
        };
        store.insert_role_set(role_set.clone()).await;
        store
            .insert_community(Community {
                id: entity("community"),
                policy: policy("community"),
                role_set: Some(role_set.id),
            })
            .await;
        store
            .insert_about(About {
                id: entity("about"),
                policy: policy("about"),
            })
            .await;
        let mut credentials = Vec::new();
        if let Some(plan) = plan {
            credentials.push(Credential::global(plan));
        }
        store
            .insert_agent_record(AgentRecord {
                id: entity("agent"),
                policy: policy("agent"),
                agent: Agent::new(AgentId::new(format!("{id}-agent")), credentials),
            })
            .await;
        store
            .insert_storage_aggregator(StorageAggregator {
                id: entity("storage"),
                policy: policy("storage"),
            })
            .await;
        store
            .insert_innovation_flow(InnovationFlow {
                id: entity("flow"),
                policy: policy("flow"),
            })
            .await;
        store
            .insert_memo(Memo {
                id: entity("memo"),
                policy: policy("memo"),
            })
            .await;
        store
            .insert_discussion(Discussion {
                id: entity("discussion"),
                policy: policy("discussion"),
            })
            .await;
        store
            .insert_callout(Callout {
                id: entity("callout"),
                policy: policy("callout"),
                settings: CalloutSettings {
                    allow_contributions: true,
                },
                memo_ids: vec![entity("memo")],
                discussion: Some(entity("discussion")),
            })
            .await;
        store
            .insert_collaboration(Collaboration {
                id: entity("collaboration"),
                policy: policy("collaboration"),
                innovation_flow: Some(entity("flow")),
                callout_ids: vec![entity("callout")],
            })
            .await;
        store
            .insert_license_record(LicenseRecord {
                id: entity("license"),
                policy: policy("license"),
                entitlements: vec![
                    LicenseEntitlement::disabled(EntitlementType::SpacePlus),
                    LicenseEntitlement::disabled(EntitlementType::SpacePremium),
                ],
            })
            .await;

        let space = Space {
            id: EntityId::new(id),
            level,
            parent_space: parent.map(|p| p.id.clone()),
            account_id: EntityId::new("account-1"),
            settings: SpaceSettings {
                privacy,
                allow_members_to_create_subspaces: false,
                allow_members_to_create_callouts: true,
            },
            archived: false,
            policy: PolicyId::new(format!("{id}-policy")),
            community: Some(entity("community")),
            about: Some(entity("about")),
            agent: Some(entity("agent")),
            storage: Some(entity("storage")),
            collaboration: Some(entity("collaboration")),
            license: Some(entity("license")),
            subspace_ids: Vec::new(),
        };
        store.insert_space(space.clone()).await;
        space
    }

    async fn link_subspace(store: &InMemoryEntityStore, parent: &mut Space, child: &Space) {
        parent.subspace_ids.push(child.id.clone());
        store.insert_space(parent.clone()).await;
    }

    async fn three_level_tree(
        store: &InMemoryEntityStore,
        privacies: [PrivacyMode; 3],
    ) -> (Space, Space, Space) {
        store
            .set_platform(Platform {
                policy: PolicyId::new("platform-policy"),
            })
            .await;
        let mut l0 = seed_space(
            store,
            "l0",
            SpaceLevel::L0,
            None,
            privacies[0],
            Some(CredentialType::LicenseSpacePlus),
        )
        .await;
        let mut l1 = seed_space(store, "l1", SpaceLevel::L1, Some(&l0), privacies[1], None).await;
        let l2 = seed_space(store, "l2", SpaceLevel::L2, Some(&l1), privacies[2], None).await;
        link_subspace(store, &mut l1, &l2).await;
        link_subspace(store, &mut l0, &l1).await;
        (l0, l1, l2)
    }

    fn service(store: Arc<InMemoryEntityStore>) -> Arc<AuthorizationService> {
        Arc::new(AuthorizationService::new(
            store,
            Arc::new(LicensingEngine::default()),
        ))
    }

    async fn has_privilege(
        service: &AuthorizationService,
        policy_id: &PolicyId,
        credentials: &[Credential],
        privilege: Privilege,
    ) -> bool {
        let arena = service.arena().await;
        let policy = arena.get(policy_id).expect("policy should be flushed");
        is_access_granted(credentials, policy, &*arena, privilege)
    }

    #[tokio::test]
    async fn registered_agents_read_down_to_the_first_private_boundary() {
        let store = Arc::new(InMemoryEntityStore::new());
        let (l0, l1, l2) = three_level_tree(
            &store,
            [PrivacyMode::Public, PrivacyMode::Public, PrivacyMode::Private],
        )
        .await;
        let service = service(store);
        service.apply_on_space(&l0.id).await.unwrap();

        let reg = [registered()];
        assert!(has_privilege(&service, &l0.policy, &reg, Privilege::Read).await);
        assert!(has_privilege(&service, &l1.policy, &reg, Privilege::Read).await);
        assert!(!has_privilege(&service, &l2.policy, &reg, Privilege::Read).await);

        let l2_member = [member("l2")];
        assert!(has_privilege(&service, &l2.policy, &l2_member, Privilege::Read).await);
    }

    #[tokio::test]
    async fn private_root_denies_outsiders_regardless_of_child_flags() {
        let store = Arc::new(InMemoryEntityStore::new());
        let (l0, l1, l2) = three_level_tree(
            &store,
            [PrivacyMode::Private, PrivacyMode::Public, PrivacyMode::Public],
        )
        .await;
        let service = service(store);
        service.apply_on_space(&l0.id).await.unwrap();

        let reg = [registered()];
        assert!(!has_privilege(&service, &l0.policy, &reg, Privilege::Read).await);
        assert!(!has_privilege(&service, &l1.policy, &reg, Privilege::Read).await);
        assert!(!has_privilege(&service, &l2.policy, &reg, Privilege::Read).await);

        // Root members read the whole subtree: the boundary's member
        // credentials govern every level beneath it.
        let root_member = [member("l0")];
        assert!(has_privilege(&service, &l0.policy, &root_member, Privilege::Read).await);
        assert!(has_privilege(&service, &l2.policy, &root_member, Privilege::Read).await);
    }

    #[tokio::test]
    async fn cascading_member_rules_reach_leaf_components() {
        let store = Arc::new(InMemoryEntityStore::new());
        let (l0, _l1, _l2) = three_level_tree(
            &store,
            [PrivacyMode::Public, PrivacyMode::Public, PrivacyMode::Public],
        )
        .await;
        let service = service(store);
        service.apply_on_space(&l0.id).await.unwrap();

        let callout_policy = PolicyId::new("l2-callout-policy");
        let root_member = [member("l0")];
        assert!(has_privilege(&service, &callout_policy, &root_member, Privilege::Read).await);

        // Platform administration cascades from the platform root policy
        // through every chain.
        let admin = [Credential::global(CredentialType::GlobalAdmin)];
        assert!(has_privilege(&service, &callout_policy, &admin, Privilege::Update).await);
    }

    #[tokio::test]
    async fn members_edit_memos_but_outsiders_do_not() {
        let store = Arc::new(InMemoryEntityStore::new());
        let (l0, _, _) = three_level_tree(
            &store,
            [PrivacyMode::Public, PrivacyMode::Public, PrivacyMode::Public],
        )
        .await;
        let service = service(store);
        service.apply_on_space(&l0.id).await.unwrap();

        let memo_policy = PolicyId::new("l2-memo-policy");
        let l2_member = [member("l2")];
        assert!(has_privilege(&service, &memo_policy, &l2_member, Privilege::Update).await);
        assert!(!has_privilege(&service, &memo_policy, &[registered()], Privilege::Update).await);
        assert!(has_privilege(&service, &memo_policy, &[registered()], Privilege::Read).await);
    }

    #[tokio::test]
    async fn read_expands_to_read_about_and_read_license() {
        let store = Arc::new(InMemoryEntityStore::new());
        let (l0, _, _) = three_level_tree(
            &store,
            [PrivacyMode::Public, PrivacyMode::Public, PrivacyMode::Public],
        )
        .await;
        let service = service(store);
        service.apply_on_space(&l0.id).await.unwrap();

        let reg = [registered()];
        assert!(has_privilege(&service, &l0.policy, &reg, Privilege::ReadAbout).await);
        assert!(has_privilege(&service, &l0.policy, &reg, Privilege::ReadLicense).await);
        assert!(!has_privilege(&service, &l0.policy, &reg, Privilege::Update).await);
    }

    #[tokio::test]
    async fn missing_community_fails_the_subtree_with_no_writes_below_it() {
        let store = Arc::new(InMemoryEntityStore::new());
        let (l0, mut l1, l2) = three_level_tree(
            &store,
            [PrivacyMode::Public, PrivacyMode::Public, PrivacyMode::Public],
        )
        .await;
        l1.community = None;
        store.insert_space(l1.clone()).await;

        let service = service(store);
        let err = service.apply_on_space(&l0.id).await.unwrap_err();
        assert!(matches!(
            err,
            PropagationError::RelationshipNotFound {
                relation: "community",
                ..
            }
        ));

        let arena = service.arena().await;
        // The broken node and its descendants are untouched; the shallower
        // node keeps its recomputed policy.
        assert!(arena.get(&l1.policy).is_none());
        assert!(arena.get(&l2.policy).is_none());
        assert!(arena.get(&l0.policy).is_some());
    }

    #[tokio::test]
    async fn anonymous_read_marker_tracks_the_privacy_boundary() {
        let store = Arc::new(InMemoryEntityStore::new());
        let (l0, _l1, l2) = three_level_tree(
            &store,
            [PrivacyMode::Public, PrivacyMode::Public, PrivacyMode::Private],
        )
        .await;
        let service = service(store);
        service.apply_on_space(&l0.id).await.unwrap();

        let arena = service.arena().await;
        assert!(arena.get(&l0.policy).unwrap().anonymous_read_access);
        assert!(!arena.get(&l2.policy).unwrap().anonymous_read_access);
        // Components under a private space do not inherit the marker either.
        let callout = arena.get(&PolicyId::new("l2-callout-policy")).unwrap();
        assert!(!callout.anonymous_read_access);
    }

    #[tokio::test]
    async fn empty_license_entitlements_fail_before_staging() {
        let store = Arc::new(InMemoryEntityStore::new());
        let (l0, _, _) = three_level_tree(
            &store,
            [PrivacyMode::Public, PrivacyMode::Public, PrivacyMode::Public],
        )
        .await;
        let mut record = store
            .license_record(&EntityId::new("l1-license"))
            .await
            .unwrap();
        record.entitlements.clear();
        store.insert_license_record(record).await;

        let service = service(store);
        let err = service.apply_on_space(&l0.id).await.unwrap_err();
        assert!(matches!(
            err,
            PropagationError::License(LicensingError::EntitlementsNotInitialized(_))
        ));

        let arena = service.arena().await;
        assert!(arena.get(&PolicyId::new("l1-license-policy")).is_none());
        assert!(arena.get(&l0.policy).is_some());
    }

    #[tokio::test]
    async fn license_entitlements_follow_the_root_agent_plan() {
        let store = Arc::new(InMemoryEntityStore::new());
        let (l0, _, _) = three_level_tree(
            &store,
            [PrivacyMode::Public, PrivacyMode::Public, PrivacyMode::Public],
        )
        .await;
        let service = service(Arc::clone(&store));
        service.apply_on_space(&l0.id).await.unwrap();

        // Subspace licenses extend against the L0 agent's plan credential.
        let record = store
            .license_record(&EntityId::new("l1-license"))
            .await
            .unwrap();
        let plus = record
            .entitlements
            .iter()
            .find(|e| e.entitlement_type == EntitlementType::SpacePlus)
            .unwrap();
        assert!(plus.enabled);
        assert_eq!(plus.limit, 1);
        let premium = record
            .entitlements
            .iter()
            .find(|e| e.entitlement_type == EntitlementType::SpacePremium)
            .unwrap();
        assert!(!premium.enabled);
    }

    #[tokio::test]
    async fn reset_all_completes_healthy_roots_when_one_is_broken() {
        let store = Arc::new(InMemoryEntityStore::new());
        store
            .set_platform(Platform {
                policy: PolicyId::new("platform-policy"),
            })
            .await;
        let healthy = seed_space(
            &store,
            "root-a",
            SpaceLevel::L0,
            None,
            PrivacyMode::Public,
            None,
        )
        .await;
        let mut broken = seed_space(
            &store,
            "root-b",
            SpaceLevel::L0,
            None,
            PrivacyMode::Public,
            None,
        )
        .await;
        broken.community = None;
        store.insert_space(broken.clone()).await;

        let service = service(store);
        let outcome = service.reset_all().await.unwrap();

        assert_eq!(outcome.succeeded.len(), 1);
        assert_eq!(outcome.succeeded[0].0, healthy.id);
        assert_eq!(outcome.failed.len(), 1);
        assert_eq!(outcome.failed[0].0, broken.id);
    }

    #[tokio::test]
    async fn subspace_reset_requires_a_computed_parent_policy() {
        let store = Arc::new(InMemoryEntityStore::new());
        let (_l0, l1, _l2) = three_level_tree(
            &store,
            [PrivacyMode::Public, PrivacyMode::Public, PrivacyMode::Public],
        )
        .await;
        let service = service(store);

        // Without a prior root pass there is no parent policy to chain to.
        let err = service.apply_on_space(&l1.id).await.unwrap_err();
        assert!(matches!(err, PropagationError::EntityNotInitialized(_)));
    }

    #[tokio::test]
    async fn subspace_reset_reuses_the_stored_parent_policy() {
        let store = Arc::new(InMemoryEntityStore::new());
        let (l0, l1, _l2) = three_level_tree(
            &store,
            [PrivacyMode::Public, PrivacyMode::Public, PrivacyMode::Private],
        )
        .await;
        let service = service(store);
        service.apply_on_space(&l0.id).await.unwrap();

        // Recomputing just the L1 subtree keeps the same semantics.
        service.apply_on_space(&l1.id).await.unwrap();
        let reg = [registered()];
        assert!(has_privilege(&service, &l1.policy, &reg, Privilege::Read).await);
        assert!(
            !has_privilege(
                &service,
                &PolicyId::new("l2-policy"),
                &reg,
                Privilege::Read
            )
            .await
        );
    }
}
