use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use atrium_licensing::LicensingEngine;
use atrium_types::{Agent, Credential, EntityId};

use crate::batch::{ComputedParent, PolicyBatch};
use crate::entity::AggregateKind;
use crate::error::PropagationError;
use crate::store::EntityStore;

/// Recomputes authorization for one aggregate kind.
///
/// Implementations stage every policy they touch in the context's batch and
/// recurse into structural children through [`PropagationContext::apply`].
#[async_trait]
pub trait Propagator: Send + Sync {
    async fn apply(
        &self,
        ctx: &mut PropagationContext,
        entity_id: &EntityId,
        parent: &ComputedParent,
    ) -> Result<(), PropagationError>;
}

/// Kind-to-propagator dispatch table.
///
/// Recursion across aggregate types goes through this registry over
/// data-described `(kind, id)` children, so aggregate modules do not depend
/// on each other directly.
#[derive(Default)]
pub struct PropagationRegistry {
    propagators: HashMap<AggregateKind, Arc<dyn Propagator>>,
}

impl PropagationRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register(&mut self, kind: AggregateKind, propagator: Arc<dyn Propagator>) {
        self.propagators.insert(kind, propagator);
    }

    pub fn propagator(
        &self,
        kind: AggregateKind,
    ) -> Result<Arc<dyn Propagator>, PropagationError> {
        self.propagators
            .get(&kind)
            .cloned()
            .ok_or(PropagationError::UnknownAggregateKind(kind))
    }
}

/// Role credentials of the space currently being traversed, passed down to
/// its component propagators.
#[derive(Clone, Debug)]
pub struct RoleScope {
    pub member_criteria: Vec<Credential>,
    pub lead_criteria: Vec<Credential>,
    pub admin_criteria: Vec<Credential>,
    /// Space setting forwarded to the collaboration propagator.
    pub members_may_create_callouts: bool,
    /// The L0 space's agent; licensing always extends against the root
    /// agent's plan credentials, also for subspaces.
    pub root_agent: Agent,
}

/// Per-traversal state: the entity store, the dispatch registry, the staged
/// policy batch and the platform root handle every chain terminates in.
pub struct PropagationContext {
    store: Arc<dyn EntityStore>,
    registry: Arc<PropagationRegistry>,
    licensing: Arc<LicensingEngine>,
    platform_root: ComputedParent,
    pub batch: PolicyBatch,
    scope: Option<RoleScope>,
}

impl PropagationContext {
    pub fn new(
        store: Arc<dyn EntityStore>,
        registry: Arc<PropagationRegistry>,
        licensing: Arc<LicensingEngine>,
        platform_root: ComputedParent,
        batch: PolicyBatch,
    ) -> Self {
        Self {
            store,
            registry,
            licensing,
            platform_root,
            batch,
            scope: None,
        }
    }

    /// Dispatches one child propagation through the registry.
    pub async fn apply(
        &mut self,
        kind: AggregateKind,
        entity_id: &EntityId,
        parent: &ComputedParent,
    ) -> Result<(), PropagationError> {
        let propagator = self.registry.propagator(kind)?;
        propagator.apply(self, entity_id, parent).await
    }

    pub fn store(&self) -> Arc<dyn EntityStore> {
        Arc::clone(&self.store)
    }

    pub fn licensing(&self) -> &LicensingEngine {
        &self.licensing
    }

    pub fn platform_root(&self) -> ComputedParent {
        self.platform_root.clone()
    }

    pub fn set_scope(&mut self, scope: RoleScope) {
        self.scope = Some(scope);
    }

    /// The enclosing space's role scope, set by the space propagator before
    /// it recurses into components.
    pub fn scope(&self) -> Option<&RoleScope> {
        self.scope.as_ref()
    }

    /// Like [`scope`](Self::scope), but a missing scope is a structural
    /// error; component propagators fail closed outside a space traversal.
    pub fn scope_or_fail(&self) -> Result<&RoleScope, PropagationError> {
        self.scope
            .as_ref()
            .ok_or_else(|| PropagationError::EntityNotInitialized("role scope".to_string()))
    }

    pub fn into_batch(self) -> PolicyBatch {
        self.batch
    }
}
