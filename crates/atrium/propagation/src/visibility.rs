use std::collections::BTreeSet;
use std::sync::Arc;

use atrium_types::{Credential, CredentialType};
use tracing::warn;

use crate::entity::{AggregateKind, PrivacyMode, RoleName, Space};
use crate::error::PropagationError;
use crate::store::EntityStore;

/// Who may currently read a space, as credential criteria.
///
/// A node is visible to anonymous/registered agents only if it and every
/// ancestor up to the root are public. Below the first private boundary on
/// the root-to-node path, visibility narrows to that boundary's member-role
/// credentials, regardless of what deeper nodes declare themselves.
pub async fn read_visibility_criteria(
    store: &Arc<dyn EntityStore>,
    space: &Space,
) -> Result<Vec<Credential>, PropagationError> {
    let chain = load_chain_root_first(store, space).await?;
    match privacy_boundary(&chain) {
        None => Ok(vec![
            Credential::global(CredentialType::GlobalAnonymous),
            Credential::global(CredentialType::GlobalRegistered),
        ]),
        Some(boundary) => member_criteria(store, boundary).await,
    }
}

/// The shallowest private space on the root-to-node path, if any. The
/// narrowest visibility always wins, so the first private ancestor governs
/// everything beneath it.
fn privacy_boundary<'a>(chain_root_first: &'a [Space]) -> Option<&'a Space> {
    chain_root_first
        .iter()
        .find(|space| space.settings.privacy == PrivacyMode::Private)
}

/// The member-role credentials (including parent-space equivalents) of a
/// space's role set.
async fn member_criteria(
    store: &Arc<dyn EntityStore>,
    space: &Space,
) -> Result<Vec<Credential>, PropagationError> {
    let community_id = space.community.as_ref().ok_or_else(|| {
        warn!(space_id = %space.id, "space has no community relation");
        PropagationError::RelationshipNotFound {
            kind: AggregateKind::Space,
            entity_id: space.id.clone(),
            relation: "community",
        }
    })?;
    let community = store.community(community_id).await?;
    let role_set_id = community.role_set.as_ref().ok_or_else(|| {
        warn!(community_id = %community.id, "community has no role set relation");
        PropagationError::RelationshipNotFound {
            kind: AggregateKind::Community,
            entity_id: community.id.clone(),
            relation: "role_set",
        }
    })?;
    let role_set = store.role_set(role_set_id).await?;
    Ok(role_set.credentials_for_role_with_parents(RoleName::Member))
}

/// The space and its ancestors, root first. Broken parent links abort the
/// pass rather than computing visibility against a truncated chain.
async fn load_chain_root_first(
    store: &Arc<dyn EntityStore>,
    space: &Space,
) -> Result<Vec<Space>, PropagationError> {
    let mut chain = vec![space.clone()];
    let mut seen = BTreeSet::new();
    seen.insert(space.id.as_str().to_string());

    let mut next = space.parent_space.clone();
    while let Some(parent_id) = next {
        if !seen.insert(parent_id.as_str().to_string()) {
            warn!(space_id = %space.id, "cycle in space parent chain");
            return Err(PropagationError::EntityNotInitialized(format!(
                "space parent chain of {} contains a cycle",
                space.id
            )));
        }
        let parent = store.space(&parent_id).await?;
        next = parent.parent_space.clone();
        chain.push(parent);
    }
    chain.reverse();
    Ok(chain)
}
