use atrium_policy::append_privilege_rule_mapping;
use atrium_types::{AuthorizationPolicy, CredentialRule, CredentialType, PolicyId, PolicyType, Privilege};

/// Builds the platform root policy every propagation chain terminates in.
///
/// Constructed fresh at the start of each traversal from the platform's
/// stored policy id, so there is no runtime singleton lookup: the bootstrap
/// step decides the id, the builder decides the rules.
pub fn build_platform_policy(id: &PolicyId) -> AuthorizationPolicy {
    // The public-surface rule below grants anonymous read, so the marker is
    // set on the root record itself.
    let mut policy = AuthorizationPolicy {
        id: id.clone(),
        policy_type: PolicyType::Platform,
        credential_rules: Vec::new(),
        privilege_rules: Vec::new(),
        parent_policy: None,
        anonymous_read_access: true,
    };

    policy.credential_rules.push(CredentialRule::using_types_only(
        vec![
            Privilege::Create,
            Privilege::Read,
            Privilege::Update,
            Privilege::Delete,
            Privilege::Grant,
            Privilege::PlatformAdmin,
            Privilege::AuthorizationReset,
            Privilege::LicenseReset,
        ],
        vec![CredentialType::GlobalAdmin, CredentialType::GlobalSupport],
        "platform administration",
    ));
    policy.credential_rules.push(CredentialRule::using_types_only(
        vec![Privilege::Read],
        vec![CredentialType::GlobalSpacesReader],
        "global spaces reader",
    ));
    policy.credential_rules.push(
        CredentialRule::using_types_only(
            vec![Privilege::Read],
            vec![
                CredentialType::GlobalAnonymous,
                CredentialType::GlobalRegistered,
            ],
            "public platform surface",
        )
        .with_cascade(false),
    );

    append_privilege_rule_mapping(
        &mut policy,
        Privilege::Read,
        vec![Privilege::ReadAbout],
        "platform read implies read-about",
    );

    policy
}
