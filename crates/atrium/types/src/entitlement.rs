use serde::{Deserialize, Serialize};

/// A feature or quota grant, distinct from an access privilege.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum EntitlementType {
    SpaceFree,
    SpacePlus,
    SpacePremium,
    SpaceFlagSaveAsTemplate,
    SpaceFlagVirtualContributorAccess,
    SpaceFlagWhiteboardMultiUser,
    AccountSpaceFree,
    AccountInnovationHub,
    AccountVirtualContributor,
}

impl std::fmt::Display for EntitlementType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            Self::SpaceFree => "SPACE_FREE",
            Self::SpacePlus => "SPACE_PLUS",
            Self::SpacePremium => "SPACE_PREMIUM",
            Self::SpaceFlagSaveAsTemplate => "SPACE_FLAG_SAVE_AS_TEMPLATE",
            Self::SpaceFlagVirtualContributorAccess => "SPACE_FLAG_VIRTUAL_CONTRIBUTOR_ACCESS",
            Self::SpaceFlagWhiteboardMultiUser => "SPACE_FLAG_WHITEBOARD_MULTI_USER",
            Self::AccountSpaceFree => "ACCOUNT_SPACE_FREE",
            Self::AccountInnovationHub => "ACCOUNT_INNOVATION_HUB",
            Self::AccountVirtualContributor => "ACCOUNT_VIRTUAL_CONTRIBUTOR",
        };
        f.write_str(s)
    }
}

/// An entitlement granted by a licensing rule, with its quota.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Entitlement {
    #[serde(rename = "type")]
    pub entitlement_type: EntitlementType,
    pub limit: u64,
}

impl Entitlement {
    pub fn new(entitlement_type: EntitlementType, limit: u64) -> Self {
        Self {
            entitlement_type,
            limit,
        }
    }
}

/// The entitlement record carried on a license entity. Reset disables it;
/// the licensing engine re-enables what the root agent's plan grants.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct LicenseEntitlement {
    #[serde(rename = "type")]
    pub entitlement_type: EntitlementType,
    pub limit: u64,
    pub enabled: bool,
}

impl LicenseEntitlement {
    pub fn disabled(entitlement_type: EntitlementType) -> Self {
        Self {
            entitlement_type,
            limit: 0,
            enabled: false,
        }
    }
}
