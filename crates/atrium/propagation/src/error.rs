use atrium_licensing::LicensingError;
use atrium_policy::PolicyError;
use atrium_types::EntityId;
use thiserror::Error;

use crate::entity::AggregateKind;

/// Errors raised while recomputing authorization across the entity tree.
///
/// `RelationshipNotFound` and `EntityNotInitialized` are broken structural
/// invariants: fatal for the subtree being propagated, never silently
/// skipped. `EntityNotFound` is a plain lookup miss.
#[derive(Debug, Error)]
pub enum PropagationError {
    #[error("Unable to load relationship '{relation}' on {kind:?} entity {entity_id}")]
    RelationshipNotFound {
        kind: AggregateKind,
        entity_id: EntityId,
        relation: &'static str,
    },

    #[error("Entity not initialized for propagation: {0}")]
    EntityNotInitialized(String),

    #[error("{kind:?} entity not found: {id}")]
    EntityNotFound { kind: AggregateKind, id: EntityId },

    #[error("No propagator registered for aggregate kind {0:?}")]
    UnknownAggregateKind(AggregateKind),

    #[error(transparent)]
    Policy(#[from] PolicyError),

    #[error(transparent)]
    License(#[from] LicensingError),
}
