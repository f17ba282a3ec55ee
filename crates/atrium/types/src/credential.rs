use serde::{Deserialize, Serialize};
use std::str::FromStr;

use crate::error::ValidationError;
use crate::AgentId;

/// The kind of claim a credential asserts.
///
/// Global credentials are never resource-scoped; resource credentials carry
/// the id of the entity they apply to in [`Credential::resource_id`].
/// `GlobalAnonymous` is an ordinary credential type: the evaluation engine has
/// no special case for unauthenticated agents.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum CredentialType {
    GlobalAnonymous,
    GlobalRegistered,
    GlobalAdmin,
    GlobalSupport,
    GlobalLicenseManager,
    GlobalSpacesReader,
    AccountAdmin,
    AccountHost,
    SpaceAdmin,
    SpaceMember,
    SpaceLead,
    SpaceMemberInvitee,
    OrganizationAdmin,
    UserSelfManagement,
    LicenseSpaceFree,
    LicenseSpacePlus,
    LicenseSpacePremium,
    LicenseSpaceEnterprise,
    BetaTester,
}

impl CredentialType {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::GlobalAnonymous => "GLOBAL_ANONYMOUS",
            Self::GlobalRegistered => "GLOBAL_REGISTERED",
            Self::GlobalAdmin => "GLOBAL_ADMIN",
            Self::GlobalSupport => "GLOBAL_SUPPORT",
            Self::GlobalLicenseManager => "GLOBAL_LICENSE_MANAGER",
            Self::GlobalSpacesReader => "GLOBAL_SPACES_READER",
            Self::AccountAdmin => "ACCOUNT_ADMIN",
            Self::AccountHost => "ACCOUNT_HOST",
            Self::SpaceAdmin => "SPACE_ADMIN",
            Self::SpaceMember => "SPACE_MEMBER",
            Self::SpaceLead => "SPACE_LEAD",
            Self::SpaceMemberInvitee => "SPACE_MEMBER_INVITEE",
            Self::OrganizationAdmin => "ORGANIZATION_ADMIN",
            Self::UserSelfManagement => "USER_SELF_MANAGEMENT",
            Self::LicenseSpaceFree => "LICENSE_SPACE_FREE",
            Self::LicenseSpacePlus => "LICENSE_SPACE_PLUS",
            Self::LicenseSpacePremium => "LICENSE_SPACE_PREMIUM",
            Self::LicenseSpaceEnterprise => "LICENSE_SPACE_ENTERPRISE",
            Self::BetaTester => "BETA_TESTER",
        }
    }
}

impl FromStr for CredentialType {
    type Err = ValidationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "GLOBAL_ANONYMOUS" => Ok(Self::GlobalAnonymous),
            "GLOBAL_REGISTERED" => Ok(Self::GlobalRegistered),
            "GLOBAL_ADMIN" => Ok(Self::GlobalAdmin),
            "GLOBAL_SUPPORT" => Ok(Self::GlobalSupport),
            "GLOBAL_LICENSE_MANAGER" => Ok(Self::GlobalLicenseManager),
            "GLOBAL_SPACES_READER" => Ok(Self::GlobalSpacesReader),
            "ACCOUNT_ADMIN" => Ok(Self::AccountAdmin),
            "ACCOUNT_HOST" => Ok(Self::AccountHost),
            "SPACE_ADMIN" => Ok(Self::SpaceAdmin),
            "SPACE_MEMBER" => Ok(Self::SpaceMember),
            "SPACE_LEAD" => Ok(Self::SpaceLead),
            "SPACE_MEMBER_INVITEE" => Ok(Self::SpaceMemberInvitee),
            "ORGANIZATION_ADMIN" => Ok(Self::OrganizationAdmin),
            "USER_SELF_MANAGEMENT" => Ok(Self::UserSelfManagement),
            "LICENSE_SPACE_FREE" => Ok(Self::LicenseSpaceFree),
            "LICENSE_SPACE_PLUS" => Ok(Self::LicenseSpacePlus),
            "LICENSE_SPACE_PREMIUM" => Ok(Self::LicenseSpacePremium),
            "LICENSE_SPACE_ENTERPRISE" => Ok(Self::LicenseSpaceEnterprise),
            "BETA_TESTER" => Ok(Self::BetaTester),
            other => Err(ValidationError::UnknownCredentialType(other.to_string())),
        }
    }
}

impl std::fmt::Display for CredentialType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A typed, optionally resource-scoped claim.
///
/// An empty `resource_id` means the claim is global. On a rule *criterion* an
/// empty `resource_id` is a wildcard: it matches any held resource of that
/// type.
#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Credential {
    #[serde(rename = "type")]
    pub credential_type: CredentialType,
    #[serde(rename = "resourceID")]
    pub resource_id: String,
}

impl Credential {
    pub fn new(credential_type: CredentialType, resource_id: impl Into<String>) -> Self {
        Self {
            credential_type,
            resource_id: resource_id.into(),
        }
    }

    /// A claim not scoped to any resource.
    pub fn global(credential_type: CredentialType) -> Self {
        Self::new(credential_type, "")
    }

    /// Whether a held credential satisfies this criterion.
    ///
    /// Types must match exactly. A criterion with an empty resource id
    /// matches any resource of that type; otherwise resource ids must match
    /// exactly.
    pub fn matches(&self, held: &Credential) -> bool {
        if self.credential_type != held.credential_type {
            return false;
        }
        self.resource_id.is_empty() || self.resource_id == held.resource_id
    }
}

/// The identity-bearing actor, as supplied by the credential subsystem.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct Agent {
    pub id: AgentId,
    pub credentials: Vec<Credential>,
}

impl Agent {
    pub fn new(id: AgentId, credentials: Vec<Credential>) -> Self {
        Self { id, credentials }
    }

    pub fn has_credential_of_type(&self, credential_type: CredentialType) -> bool {
        self.credentials
            .iter()
            .any(|c| c.credential_type == credential_type)
    }
}
