//! RBAC data models: identifiers, users, organizations, teams, role
//! assignments and the access summary rendered by access-list endpoints.

use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashSet};
use std::fmt;
use uuid::Uuid;

use super::roles::OrganizationRole;

// ═══════════════════════════════════════════════════════════════════════════════
// Identifiers
// ═══════════════════════════════════════════════════════════════════════════════

macro_rules! string_id {
    ($(#[$meta:meta])* $name:ident) => {
        $(#[$meta])*
        #[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
        #[serde(transparent)]
        pub struct $name(pub String);

        impl $name {
            pub fn new(id: impl Into<String>) -> Self {
                Self(id.into())
            }

            /// Generate a fresh random identifier.
            pub fn generate() -> Self {
                Self(Uuid::new_v4().simple().to_string())
            }

            pub fn as_str(&self) -> &str {
                &self.0
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                write!(f, "{}", self.0)
            }
        }

        impl From<String> for $name {
            fn from(s: String) -> Self {
                Self(s)
            }
        }

        impl From<&str> for $name {
            fn from(s: &str) -> Self {
                Self(s.to_string())
            }
        }
    };
}

string_id!(
    /// Strongly-typed user identifier.
    UserId
);
string_id!(
    /// Strongly-typed team identifier.
    TeamId
);
string_id!(
    /// Strongly-typed organization identifier.
    OrganizationId
);
string_id!(
    /// Identifier of a credential, inventory, project or job template.
    ResourceId
);

// ═══════════════════════════════════════════════════════════════════════════════
// User
// ═══════════════════════════════════════════════════════════════════════════════

/// A user as seen by the access subsystem. Immutable for a request.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct User {
    pub id: UserId,
    pub username: String,
    #[serde(default)]
    pub first_name: String,
    #[serde(default)]
    pub last_name: String,
    #[serde(default)]
    pub email: String,
    /// Bypasses every check.
    #[serde(rename = "is_superuser", default)]
    pub is_super_user: bool,
    /// Implicit global read.
    #[serde(default)]
    pub is_system_auditor: bool,
}

impl User {
    pub fn new(id: impl Into<UserId>, username: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            username: username.into(),
            first_name: String::new(),
            last_name: String::new(),
            email: String::new(),
            is_super_user: false,
            is_system_auditor: false,
        }
    }

    pub fn super_user(mut self) -> Self {
        self.is_super_user = true;
        self
    }

    pub fn system_auditor(mut self) -> Self {
        self.is_system_auditor = true;
        self
    }

    pub fn with_email(mut self, email: impl Into<String>) -> Self {
        self.email = email.into();
        self
    }
}

// ═══════════════════════════════════════════════════════════════════════════════
// Grantees & role assignments
// ═══════════════════════════════════════════════════════════════════════════════

/// Kind of principal a role is assigned to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum GranteeType {
    User,
    Team,
}

/// A resolved reference to a user or team grantee.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum GranteeRef {
    User(UserId),
    Team(TeamId),
}

impl GranteeRef {
    pub fn grantee_type(&self) -> GranteeType {
        match self {
            Self::User(_) => GranteeType::User,
            Self::Team(_) => GranteeType::Team,
        }
    }
}

impl fmt::Display for GranteeRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::User(id) => write!(f, "user:{}", id),
            Self::Team(id) => write!(f, "team:{}", id),
        }
    }
}

/// A role granted to a user or team, in the stored document shape
/// `{"type": "user", "grantee_id": "...", "role": "admin"}`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct RoleAssignment<R> {
    #[serde(rename = "type")]
    pub grantee_type: GranteeType,
    pub grantee_id: String,
    pub role: R,
}

impl<R> RoleAssignment<R> {
    pub fn user(user_id: impl Into<UserId>, role: R) -> Self {
        Self {
            grantee_type: GranteeType::User,
            grantee_id: user_id.into().0,
            role,
        }
    }

    pub fn team(team_id: impl Into<TeamId>, role: R) -> Self {
        Self {
            grantee_type: GranteeType::Team,
            grantee_id: team_id.into().0,
            role,
        }
    }

    pub fn grantee(&self) -> GranteeRef {
        match self.grantee_type {
            GranteeType::User => GranteeRef::User(UserId::new(self.grantee_id.as_str())),
            GranteeType::Team => GranteeRef::Team(TeamId::new(self.grantee_id.as_str())),
        }
    }

    /// True when this assignment names `user_id` directly.
    pub fn is_user(&self, user_id: &UserId) -> bool {
        self.grantee_type == GranteeType::User && self.grantee_id == user_id.0
    }
}

// ═══════════════════════════════════════════════════════════════════════════════
// Organization & team
// ═══════════════════════════════════════════════════════════════════════════════

/// An organization owns resources and carries organization-scope grants.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Organization {
    pub id: OrganizationId,
    pub name: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub roles: Vec<RoleAssignment<OrganizationRole>>,
}

impl Organization {
    pub fn new(id: impl Into<OrganizationId>, name: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            description: String::new(),
            roles: Vec::new(),
        }
    }

    pub fn grant(mut self, assignment: RoleAssignment<OrganizationRole>) -> Self {
        self.roles.push(assignment);
        self
    }

    pub fn related_link(&self) -> String {
        format!("/v1/organizations/{}/", self.id)
    }
}

/// A team belongs to one organization and may itself be a grantee.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Team {
    pub id: TeamId,
    pub name: String,
    pub organization_id: OrganizationId,
    #[serde(default)]
    pub members: HashSet<UserId>,
}

impl Team {
    pub fn new(
        id: impl Into<TeamId>,
        name: impl Into<String>,
        organization_id: impl Into<OrganizationId>,
    ) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            organization_id: organization_id.into(),
            members: HashSet::new(),
        }
    }

    pub fn with_member(mut self, user_id: impl Into<UserId>) -> Self {
        self.members.insert(user_id.into());
        self
    }

    pub fn has_member(&self, user_id: &UserId) -> bool {
        self.members.contains(user_id)
    }
}

// ═══════════════════════════════════════════════════════════════════════════════
// Access summary
// ═══════════════════════════════════════════════════════════════════════════════

/// The role an access entry originates from and where it was granted.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AccessRole {
    pub name: String,
    pub description: String,
    pub resource_type: String,
    pub resource_name: String,
    pub related: BTreeMap<String, String>,
}

/// One path through which a user holds access.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AccessEntry {
    pub descendant_roles: Vec<String>,
    pub role: AccessRole,
}

/// Who a user is and every recorded grant that gives them access.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AccessSummary {
    pub user: User,
    pub direct_access: Vec<AccessEntry>,
    pub indirect_access: Vec<AccessEntry>,
}

/// Entries gathered for one user before the profile is resolved.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AccessEntries {
    pub direct_access: Vec<AccessEntry>,
    pub indirect_access: Vec<AccessEntry>,
}

impl AccessEntries {
    pub fn into_summary(self, user: User) -> AccessSummary {
        AccessSummary {
            user,
            direct_access: self.direct_access,
            indirect_access: self.indirect_access,
        }
    }
}

// ═══════════════════════════════════════════════════════════════════════════════
// Tests
// ═══════════════════════════════════════════════════════════════════════════════
