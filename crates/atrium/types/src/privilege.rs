use serde::{Deserialize, Serialize};
use std::str::FromStr;

use crate::error::ValidationError;

/// An access privilege a rule can grant on a governed entity.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Privilege {
    Create,
    Read,
    Update,
    Delete,
    Grant,
    ReadAbout,
    ReadLicense,
    CreateSubspace,
    CreateCallout,
    Contribute,
    CreateMessage,
    CommunityJoin,
    CommunityApply,
    CommunityInvite,
    CommunityAddMember,
    MoveContribution,
    UpdateInnovationFlow,
    PlatformAdmin,
    AuthorizationReset,
    LicenseReset,
    FileUpload,
}

impl Privilege {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Create => "CREATE",
            Self::Read => "READ",
            Self::Update => "UPDATE",
            Self::Delete => "DELETE",
            Self::Grant => "GRANT",
            Self::ReadAbout => "READ_ABOUT",
            Self::ReadLicense => "READ_LICENSE",
            Self::CreateSubspace => "CREATE_SUBSPACE",
            Self::CreateCallout => "CREATE_CALLOUT",
            Self::Contribute => "CONTRIBUTE",
            Self::CreateMessage => "CREATE_MESSAGE",
            Self::CommunityJoin => "COMMUNITY_JOIN",
            Self::CommunityApply => "COMMUNITY_APPLY",
            Self::CommunityInvite => "COMMUNITY_INVITE",
            Self::CommunityAddMember => "COMMUNITY_ADD_MEMBER",
            Self::MoveContribution => "MOVE_CONTRIBUTION",
            Self::UpdateInnovationFlow => "UPDATE_INNOVATION_FLOW",
            Self::PlatformAdmin => "PLATFORM_ADMIN",
            Self::AuthorizationReset => "AUTHORIZATION_RESET",
            Self::LicenseReset => "LICENSE_RESET",
            Self::FileUpload => "FILE_UPLOAD",
        }
    }
}

impl FromStr for Privilege {
    type Err = ValidationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "CREATE" => Ok(Self::Create),
            "READ" => Ok(Self::Read),
            "UPDATE" => Ok(Self::Update),
            "DELETE" => Ok(Self::Delete),
            "GRANT" => Ok(Self::Grant),
            "READ_ABOUT" => Ok(Self::ReadAbout),
            "READ_LICENSE" => Ok(Self::ReadLicense),
            "CREATE_SUBSPACE" => Ok(Self::CreateSubspace),
            "CREATE_CALLOUT" => Ok(Self::CreateCallout),
            "CONTRIBUTE" => Ok(Self::Contribute),
            "CREATE_MESSAGE" => Ok(Self::CreateMessage),
            "COMMUNITY_JOIN" => Ok(Self::CommunityJoin),
            "COMMUNITY_APPLY" => Ok(Self::CommunityApply),
            "COMMUNITY_INVITE" => Ok(Self::CommunityInvite),
            "COMMUNITY_ADD_MEMBER" => Ok(Self::CommunityAddMember),
            "MOVE_CONTRIBUTION" => Ok(Self::MoveContribution),
            "UPDATE_INNOVATION_FLOW" => Ok(Self::UpdateInnovationFlow),
            "PLATFORM_ADMIN" => Ok(Self::PlatformAdmin),
            "AUTHORIZATION_RESET" => Ok(Self::AuthorizationReset),
            "LICENSE_RESET" => Ok(Self::LicenseReset),
            "FILE_UPLOAD" => Ok(Self::FileUpload),
            other => Err(ValidationError::UnknownPrivilege(other.to_string())),
        }
    }
}

impl std::fmt::Display for Privilege {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn unknown_privilege_is_rejected() {
        let err = "TELEPORT".parse::<Privilege>().unwrap_err();
        assert!(matches!(err, ValidationError::UnknownPrivilege(_)));
    }

    #[test]
    fn privilege_round_trips_through_str() {
        let parsed: Privilege = Privilege::CommunityAddMember.as_str().parse().unwrap();
        assert_eq!(parsed, Privilege::CommunityAddMember);
    }
}
