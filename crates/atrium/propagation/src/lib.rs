//! Atrium Propagation - per-aggregate authorization recomputation.
//!
//! Walks the Platform -> Account -> Space -> component containment
//! hierarchy depth-first, recomputing every entity's [`atrium_types::AuthorizationPolicy`]
//! with the core engine from `atrium-policy` and re-deriving license
//! entitlements with `atrium-licensing`. Recursion is dispatched over
//! data-described `(kind, id)` children through a registry, parent-before-
//! child ordering is enforced by the [`batch::ComputedParent`] handle, and
//! all policy writes for one traversal flush in a single batch.

#![deny(unsafe_code)]

pub mod batch;
pub mod entity;
pub mod error;
pub mod platform;
pub mod propagators;
pub mod registry;
pub mod service;
pub mod store;
pub mod visibility;

pub use batch::{ComputedParent, PolicyBatch};
pub use entity::AggregateKind;
pub use error::PropagationError;
pub use registry::{PropagationContext, PropagationRegistry, Propagator, RoleScope};
pub use service::{AuthorizationService, ResetOutcome};
pub use store::{EntityStore, InMemoryEntityStore};
