use serde::{Deserialize, Serialize};

use atrium_types::{CredentialType, Entitlement, EntitlementType, PolicyId};

/// Maps one credential type to the entitlements it grants.
///
/// Flat by design: no resource-id matching and no cascade. Holding any
/// credential of the type is sufficient.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct LicensingCredentialRule {
    pub credential_type: CredentialType,
    pub granted_entitlements: Vec<Entitlement>,
    pub name: String,
}

impl LicensingCredentialRule {
    pub fn new(
        credential_type: CredentialType,
        granted_entitlements: Vec<Entitlement>,
        name: impl Into<String>,
    ) -> Self {
        Self {
            credential_type,
            granted_entitlements,
            name: name.into(),
        }
    }
}

/// The licensing counterpart of an authorization policy: a flat rule list,
/// non-hierarchical.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct LicensePolicy {
    pub id: PolicyId,
    pub name: String,
    pub credential_rules: Vec<LicensingCredentialRule>,
}

impl LicensePolicy {
    pub fn new(name: impl Into<String>, credential_rules: Vec<LicensingCredentialRule>) -> Self {
        Self {
            id: PolicyId::generate(),
            name: name.into(),
            credential_rules,
        }
    }

    /// The platform default policy, installed by bootstrap and injected into
    /// the engine: the standard plan credentials and what each one unlocks.
    pub fn platform_default() -> Self {
        Self::new(
            "platform-default",
            vec![
                LicensingCredentialRule::new(
                    CredentialType::LicenseSpaceFree,
                    vec![Entitlement::new(EntitlementType::SpaceFree, 1)],
                    "Space Free plan",
                ),
                LicensingCredentialRule::new(
                    CredentialType::LicenseSpacePlus,
                    vec![
                        Entitlement::new(EntitlementType::SpacePlus, 1),
                        Entitlement::new(EntitlementType::SpaceFlagSaveAsTemplate, 1),
                        Entitlement::new(EntitlementType::SpaceFlagWhiteboardMultiUser, 1),
                    ],
                    "Space Plus plan",
                ),
                LicensingCredentialRule::new(
                    CredentialType::LicenseSpacePremium,
                    vec![
                        Entitlement::new(EntitlementType::SpacePremium, 1),
                        Entitlement::new(EntitlementType::SpaceFlagSaveAsTemplate, 1),
                        Entitlement::new(EntitlementType::SpaceFlagWhiteboardMultiUser, 1),
                        Entitlement::new(EntitlementType::SpaceFlagVirtualContributorAccess, 1),
                    ],
                    "Space Premium plan",
                ),
                LicensingCredentialRule::new(
                    CredentialType::BetaTester,
                    vec![Entitlement::new(
                        EntitlementType::SpaceFlagVirtualContributorAccess,
                        1,
                    )],
                    "Beta tester feature access",
                ),
            ],
        )
    }
}
