//! One propagator per governed aggregate kind.
//!
//! Every propagator follows the same shape: load the entity with the
//! relations the pass needs, fail the subtree on missing structure before
//! staging anything, reset-and-inherit the entity's policy, append the
//! entity-specific rules, stage, then recurse into structural children
//! through the registry.

mod account;
mod community;
mod collaboration;
mod components;
mod space;

use std::sync::Arc;

pub use account::AccountPropagator;
pub use collaboration::CollaborationPropagator;
pub use community::{CommunityPropagator, RoleSetPropagator};
pub use components::{
    AboutPropagator, AgentPropagator, CalloutPropagator, DiscussionPropagator,
    InnovationFlowPropagator, LicensePropagator, MemoPropagator, StoragePropagator,
};
pub use space::SpacePropagator;

use crate::entity::AggregateKind;
use crate::registry::PropagationRegistry;

/// The registry with every aggregate kind wired to its propagator.
pub fn standard_registry() -> PropagationRegistry {
    let mut registry = PropagationRegistry::new();
    registry.register(AggregateKind::Account, Arc::new(AccountPropagator));
    registry.register(AggregateKind::Space, Arc::new(SpacePropagator));
    registry.register(AggregateKind::Community, Arc::new(CommunityPropagator));
    registry.register(AggregateKind::RoleSet, Arc::new(RoleSetPropagator));
    registry.register(
        AggregateKind::Collaboration,
        Arc::new(CollaborationPropagator),
    );
    registry.register(AggregateKind::Callout, Arc::new(CalloutPropagator));
    registry.register(AggregateKind::Memo, Arc::new(MemoPropagator));
    registry.register(AggregateKind::Discussion, Arc::new(DiscussionPropagator));
    registry.register(
        AggregateKind::InnovationFlow,
        Arc::new(InnovationFlowPropagator),
    );
    registry.register(AggregateKind::About, Arc::new(AboutPropagator));
    registry.register(AggregateKind::Agent, Arc::new(AgentPropagator));
    registry.register(
        AggregateKind::StorageAggregator,
        Arc::new(StoragePropagator),
    );
    registry.register(AggregateKind::License, Arc::new(LicensePropagator));
    registry
}
