use std::collections::HashMap;

use serde::{Deserialize, Serialize};

use atrium_types::{Agent, Credential, EntityId, LicenseEntitlement, PolicyId};

/// Tags every governed aggregate the propagation registry can dispatch on.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum AggregateKind {
    Account,
    Space,
    Community,
    RoleSet,
    Collaboration,
    Callout,
    Memo,
    Discussion,
    InnovationFlow,
    About,
    Agent,
    StorageAggregator,
    License,
}

/// Depth of a space in the containment hierarchy.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
pub enum SpaceLevel {
    L0,
    L1,
    L2,
}

impl SpaceLevel {
    pub fn is_root(&self) -> bool {
        matches!(self, Self::L0)
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum PrivacyMode {
    Public,
    Private,
}

/// Per-space configuration consumed by the propagation pass.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct SpaceSettings {
    pub privacy: PrivacyMode,
    pub allow_members_to_create_subspaces: bool,
    pub allow_members_to_create_callouts: bool,
}

impl SpaceSettings {
    pub fn public() -> Self {
        Self {
            privacy: PrivacyMode::Public,
            allow_members_to_create_subspaces: false,
            allow_members_to_create_callouts: true,
        }
    }

    pub fn private() -> Self {
        Self {
            privacy: PrivacyMode::Private,
            ..Self::public()
        }
    }
}

/// The platform root. Owns the policy every chain terminates in.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct Platform {
    pub policy: PolicyId,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct Account {
    pub id: EntityId,
    pub policy: PolicyId,
    pub admin_credential: Credential,
    pub host_credential: Credential,
    pub space_ids: Vec<EntityId>,
}

/// A content space at any level of the hierarchy.
///
/// The component links are `Option` purely to make a broken graph
/// representable; every one of them is required, and propagation fails the
/// subtree when one is missing.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct Space {
    pub id: EntityId,
    pub level: SpaceLevel,
    pub parent_space: Option<EntityId>,
    pub account_id: EntityId,
    pub settings: SpaceSettings,
    pub archived: bool,
    pub policy: PolicyId,
    pub community: Option<EntityId>,
    pub about: Option<EntityId>,
    pub agent: Option<EntityId>,
    pub storage: Option<EntityId>,
    pub collaboration: Option<EntityId>,
    pub license: Option<EntityId>,
    pub subspace_ids: Vec<EntityId>,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum RoleName {
    Member,
    Lead,
    Admin,
}

/// One role definition inside a role set.
///
/// `parent_credentials` carries the equivalent credentials issued by parent
/// spaces, so a rule built "with parents" also admits members of the
/// enclosing space.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct Role {
    pub credential: Credential,
    pub parent_credentials: Vec<Credential>,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct RoleSet {
    pub id: EntityId,
    pub policy: PolicyId,
    pub roles: HashMap<RoleName, Role>,
}

impl RoleSet {
    pub fn credentials_for_role(&self, role: RoleName) -> Vec<Credential> {
        self.roles
            .get(&role)
            .map(|r| vec![r.credential.clone()])
            .unwrap_or_default()
    }

    pub fn credentials_for_role_with_parents(&self, role: RoleName) -> Vec<Credential> {
        self.roles
            .get(&role)
            .map(|r| {
                let mut credentials = vec![r.credential.clone()];
                credentials.extend(r.parent_credentials.iter().cloned());
                credentials
            })
            .unwrap_or_default()
    }
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct Community {
    pub id: EntityId,
    pub policy: PolicyId,
    pub role_set: Option<EntityId>,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct Collaboration {
    pub id: EntityId,
    pub policy: PolicyId,
    pub innovation_flow: Option<EntityId>,
    pub callout_ids: Vec<EntityId>,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct CalloutSettings {
    /// Closed callouts keep their content readable but accept no new
    /// contributions.
    pub allow_contributions: bool,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct Callout {
    pub id: EntityId,
    pub policy: PolicyId,
    pub settings: CalloutSettings,
    pub memo_ids: Vec<EntityId>,
    pub discussion: Option<EntityId>,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct Memo {
    pub id: EntityId,
    pub policy: PolicyId,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct Discussion {
    pub id: EntityId,
    pub policy: PolicyId,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct InnovationFlow {
    pub id: EntityId,
    pub policy: PolicyId,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct About {
    pub id: EntityId,
    pub policy: PolicyId,
}

/// The agent attached to a space. For root spaces its credentials include the
/// licensing plan credentials the entitlement pass evaluates.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct AgentRecord {
    pub id: EntityId,
    pub policy: PolicyId,
    pub agent: Agent,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct StorageAggregator {
    pub id: EntityId,
    pub policy: PolicyId,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct LicenseRecord {
    pub id: EntityId,
    pub policy: PolicyId,
    pub entitlements: Vec<LicenseEntitlement>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use atrium_types::CredentialType;

    fn role_set_with_member(space: &str, parent_space: &str) -> RoleSet {
        let mut roles = HashMap::new();
        roles.insert(
            RoleName::Member,
            Role {
                credential: Credential::new(CredentialType::SpaceMember, space),
                parent_credentials: vec![Credential::new(
                    CredentialType::SpaceMember,
                    parent_space,
                )],
            },
        );
        RoleSet {
            id: EntityId::generate(),
            policy: PolicyId::generate(),
            roles,
        }
    }

    #[test]
    fn role_credentials_with_parents_include_enclosing_space() {
        let role_set = role_set_with_member("l1", "l0");
        assert_eq!(role_set.credentials_for_role(RoleName::Member).len(), 1);
        let with_parents = role_set.credentials_for_role_with_parents(RoleName::Member);
        assert_eq!(with_parents.len(), 2);
        assert_eq!(with_parents[1].resource_id, "l0");
    }

    #[test]
    fn missing_role_yields_no_credentials() {
        let role_set = role_set_with_member("l1", "l0");
        assert!(role_set.credentials_for_role(RoleName::Admin).is_empty());
    }
}
