use serde::{Deserialize, Serialize};

use crate::{Credential, CredentialType, Privilege, RuleId};

/// Grants privileges to any agent holding a credential matching one of the
/// criteria.
///
/// `cascade` controls whether the rule is copied into a child policy's
/// inherited rule set when that child inherits from this rule's policy.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct CredentialRule {
    pub id: RuleId,
    pub name: String,
    pub criteria: Vec<Credential>,
    pub granted_privileges: Vec<Privilege>,
    pub cascade: bool,
}

impl CredentialRule {
    pub fn new(
        granted_privileges: Vec<Privilege>,
        criteria: Vec<Credential>,
        name: impl Into<String>,
    ) -> Self {
        Self {
            id: RuleId::generate(),
            name: name.into(),
            criteria,
            granted_privileges,
            cascade: true,
        }
    }

    /// Builds criteria from credential types alone, with wildcard (empty)
    /// resource ids.
    pub fn using_types_only(
        granted_privileges: Vec<Privilege>,
        credential_types: Vec<CredentialType>,
        name: impl Into<String>,
    ) -> Self {
        let criteria = credential_types
            .into_iter()
            .map(Credential::global)
            .collect();
        Self::new(granted_privileges, criteria, name)
    }

    pub fn with_cascade(mut self, cascade: bool) -> Self {
        self.cascade = cascade;
        self
    }

    /// Whether any of the held credentials satisfies any criterion.
    pub fn matched_by(&self, credentials: &[Credential]) -> bool {
        self.criteria
            .iter()
            .any(|criterion| credentials.iter().any(|held| criterion.matches(held)))
    }
}

/// Maps one privilege to additional implied privileges.
///
/// If an agent is granted `source_privilege`, it is also granted each of
/// `granted_privileges`. Mappings must not form cycles; rule authors keep the
/// mapping a DAG by construction.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct PrivilegeRule {
    pub id: RuleId,
    pub name: String,
    pub source_privilege: Privilege,
    pub granted_privileges: Vec<Privilege>,
}

impl PrivilegeRule {
    pub fn new(
        source_privilege: Privilege,
        granted_privileges: Vec<Privilege>,
        name: impl Into<String>,
    ) -> Self {
        Self {
            id: RuleId::generate(),
            name: name.into(),
            source_privilege,
            granted_privileges,
        }
    }
}
