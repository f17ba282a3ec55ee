use std::collections::HashMap;

use async_trait::async_trait;
use atrium_types::EntityId;
use tokio::sync::RwLock;

use crate::entity::{
    About, Account, AgentRecord, AggregateKind, Callout, Collaboration, Community, Discussion,
    InnovationFlow, LicenseRecord, Memo, Platform, RoleSet, Space, StorageAggregator,
};
use crate::error::PropagationError;

/// Load/save boundary for the governed entity graph.
///
/// Propagation only ever reads entities and writes license entitlement state;
/// authorization policies themselves travel through the policy batch, not
/// through this trait.
#[async_trait]
pub trait EntityStore: Send + Sync {
    async fn platform(&self) -> Result<Platform, PropagationError>;
    async fn account(&self, id: &EntityId) -> Result<Account, PropagationError>;
    async fn space(&self, id: &EntityId) -> Result<Space, PropagationError>;
    async fn community(&self, id: &EntityId) -> Result<Community, PropagationError>;
    async fn role_set(&self, id: &EntityId) -> Result<RoleSet, PropagationError>;
    async fn collaboration(&self, id: &EntityId) -> Result<Collaboration, PropagationError>;
    async fn callout(&self, id: &EntityId) -> Result<Callout, PropagationError>;
    async fn memo(&self, id: &EntityId) -> Result<Memo, PropagationError>;
    async fn discussion(&self, id: &EntityId) -> Result<Discussion, PropagationError>;
    async fn innovation_flow(&self, id: &EntityId) -> Result<InnovationFlow, PropagationError>;
    async fn about(&self, id: &EntityId) -> Result<About, PropagationError>;
    async fn agent_record(&self, id: &EntityId) -> Result<AgentRecord, PropagationError>;
    async fn storage_aggregator(&self, id: &EntityId)
        -> Result<StorageAggregator, PropagationError>;
    async fn license_record(&self, id: &EntityId) -> Result<LicenseRecord, PropagationError>;

    /// Persists recomputed license entitlement state.
    async fn save_license_record(&self, record: &LicenseRecord) -> Result<(), PropagationError>;

    /// The L0 spaces, each the root of one independent propagation.
    async fn root_space_ids(&self) -> Result<Vec<EntityId>, PropagationError>;
}

#[derive(Default)]
struct Tables {
    platform: Option<Platform>,
    accounts: HashMap<EntityId, Account>,
    spaces: HashMap<EntityId, Space>,
    communities: HashMap<EntityId, Community>,
    role_sets: HashMap<EntityId, RoleSet>,
    collaborations: HashMap<EntityId, Collaboration>,
    callouts: HashMap<EntityId, Callout>,
    memos: HashMap<EntityId, Memo>,
    discussions: HashMap<EntityId, Discussion>,
    innovation_flows: HashMap<EntityId, InnovationFlow>,
    abouts: HashMap<EntityId, About>,
    agent_records: HashMap<EntityId, AgentRecord>,
    storage_aggregators: HashMap<EntityId, StorageAggregator>,
    license_records: HashMap<EntityId, LicenseRecord>,
}

/// In-memory entity store; the canonical test double and reference
/// implementation of [`EntityStore`].
#[derive(Default)]
pub struct InMemoryEntityStore {
    tables: RwLock<Tables>,
}

impl InMemoryEntityStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn set_platform(&self, platform: Platform) {
        self.tables.write().await.platform = Some(platform);
    }

    pub async fn insert_account(&self, account: Account) {
        let mut tables = self.tables.write().await;
        tables.accounts.insert(account.id.clone(), account);
    }

    pub async fn insert_space(&self, space: Space) {
        let mut tables = self.tables.write().await;
        tables.spaces.insert(space.id.clone(), space);
    }

    pub async fn insert_community(&self, community: Community) {
        let mut tables = self.tables.write().await;
        tables.communities.insert(community.id.clone(), community);
    }

    pub async fn insert_role_set(&self, role_set: RoleSet) {
        let mut tables = self.tables.write().await;
        tables.role_sets.insert(role_set.id.clone(), role_set);
    }

    pub async fn insert_collaboration(&self, collaboration: Collaboration) {
        let mut tables = self.tables.write().await;
        tables
            .collaborations
            .insert(collaboration.id.clone(), collaboration);
    }

    pub async fn insert_callout(&self, callout: Callout) {
        let mut tables = self.tables.write().await;
        tables.callouts.insert(callout.id.clone(), callout);
    }

    pub async fn insert_memo(&self, memo: Memo) {
        let mut tables = self.tables.write().await;
        tables.memos.insert(memo.id.clone(), memo);
    }

    pub async fn insert_discussion(&self, discussion: Discussion) {
        let mut tables = self.tables.write().await;
        tables.discussions.insert(discussion.id.clone(), discussion);
    }

    pub async fn insert_innovation_flow(&self, flow: InnovationFlow) {
        let mut tables = self.tables.write().await;
        tables.innovation_flows.insert(flow.id.clone(), flow);
    }

    pub async fn insert_about(&self, about: About) {
        let mut tables = self.tables.write().await;
        tables.abouts.insert(about.id.clone(), about);
    }

    pub async fn insert_agent_record(&self, record: AgentRecord) {
        let mut tables = self.tables.write().await;
        tables.agent_records.insert(record.id.clone(), record);
    }

    pub async fn insert_storage_aggregator(&self, aggregator: StorageAggregator) {
        let mut tables = self.tables.write().await;
        tables
            .storage_aggregators
            .insert(aggregator.id.clone(), aggregator);
    }

    pub async fn insert_license_record(&self, record: LicenseRecord) {
        let mut tables = self.tables.write().await;
        tables.license_records.insert(record.id.clone(), record);
    }
}

fn lookup<T: Clone>(
    table: &HashMap<EntityId, T>,
    kind: AggregateKind,
    id: &EntityId,
) -> Result<T, PropagationError> {
    table
        .get(id)
        .cloned()
        .ok_or_else(|| PropagationError::EntityNotFound {
            kind,
            id: id.clone(),
        })
}

#[async_trait]
impl EntityStore for InMemoryEntityStore {
    async fn platform(&self) -> Result<Platform, PropagationError> {
        self.tables
            .read()
            .await
            .platform
            .clone()
            .ok_or_else(|| PropagationError::EntityNotInitialized("platform".to_string()))
    }

    async fn account(&self, id: &EntityId) -> Result<Account, PropagationError> {
        lookup(&self.tables.read().await.accounts, AggregateKind::Account, id)
    }

    async fn space(&self, id: &EntityId) -> Result<Space, PropagationError> {
        lookup(&self.tables.read().await.spaces, AggregateKind::Space, id)
    }

    async fn community(&self, id: &EntityId) -> Result<Community, PropagationError> {
        lookup(
            &self.tables.read().await.communities,
            AggregateKind::Community,
            id,
        )
    }

    async fn role_set(&self, id: &EntityId) -> Result<RoleSet, PropagationError> {
        lookup(
            &self.tables.read().await.role_sets,
            AggregateKind::RoleSet,
            id,
        )
    }

    async fn collaboration(&self, id: &EntityId) -> Result<Collaboration, PropagationError> {
        lookup(
            &self.tables.read().await.collaborations,
            AggregateKind::Collaboration,
            id,
        )
    }

    async fn callout(&self, id: &EntityId) -> Result<Callout, PropagationError> {
        lookup(
            &self.tables.read().await.callouts,
            AggregateKind::Callout,
            id,
        )
    }

    async fn memo(&self, id: &EntityId) -> Result<Memo, PropagationError> {
        lookup(&self.tables.read().await.memos, AggregateKind::Memo, id)
    }

    async fn discussion(&self, id: &EntityId) -> Result<Discussion, PropagationError> {
        lookup(
            &self.tables.read().await.discussions,
            AggregateKind::Discussion,
            id,
        )
    }

    async fn innovation_flow(&self, id: &EntityId) -> Result<InnovationFlow, PropagationError> {
        lookup(
            &self.tables.read().await.innovation_flows,
            AggregateKind::InnovationFlow,
            id,
        )
    }

    async fn about(&self, id: &EntityId) -> Result<About, PropagationError> {
        lookup(&self.tables.read().await.abouts, AggregateKind::About, id)
    }

    async fn agent_record(&self, id: &EntityId) -> Result<AgentRecord, PropagationError> {
        lookup(
            &self.tables.read().await.agent_records,
            AggregateKind::Agent,
            id,
        )
    }

    async fn storage_aggregator(
        &self,
        id: &EntityId,
    ) -> Result<StorageAggregator, PropagationError> {
        lookup(
            &self.tables.read().await.storage_aggregators,
            AggregateKind::StorageAggregator,
            id,
        )
    }

    async fn license_record(&self, id: &EntityId) -> Result<LicenseRecord, PropagationError> {
        lookup(
            &self.tables.read().await.license_records,
            AggregateKind::License,
            id,
        )
    }

    async fn save_license_record(&self, record: &LicenseRecord) -> Result<(), PropagationError> {
        let mut tables = self.tables.write().await;
        tables
            .license_records
            .insert(record.id.clone(), record.clone());
        Ok(())
    }

    async fn root_space_ids(&self) -> Result<Vec<EntityId>, PropagationError> {
        let tables = self.tables.read().await;
        let mut roots: Vec<EntityId> = tables
            .spaces
            .values()
            .filter(|space| space.level.is_root())
            .map(|space| space.id.clone())
            .collect();
        roots.sort_by(|a, b| a.as_str().cmp(b.as_str()));
        Ok(roots)
    }
}
