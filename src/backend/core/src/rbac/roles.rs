//! Role catalog: the fixed role vocabulary and what each role implies.
//!
//! | Scope        | Role    | Implies            |
//! |--------------|---------|--------------------|
//! | Organization | admin   | admin, use, read   |
//! | Organization | member  | read, use          |
//! | Organization | auditor | read               |
//! | Resource     | admin   | admin, use, read   |
//! | Resource     | use     | use, read          |
//! | Resource     | update  | use, read          |
//! | Resource     | read    | read               |
//!
//! Every resource type supports a subset of the resource roles, listed in
//! [`ResourceKind::supported_roles`]. A new resource type is registered here
//! and nowhere else.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

use super::error::EvaluationError;
use super::models::ResourceId;

// ═══════════════════════════════════════════════════════════════════════════════
// Capability
// ═══════════════════════════════════════════════════════════════════════════════

/// A capability requested from the evaluator.
///
/// `Write` is the admin-equivalent capability used to gate mutation; in
/// descendant role lists it renders as `admin`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Capability {
    Read,
    Use,
    Write,
}

impl Capability {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Read => "read",
            Self::Use => "use",
            Self::Write => "write",
        }
    }

    /// Name of this capability inside a `descendant_roles` list.
    pub fn descendant_name(&self) -> &'static str {
        match self {
            Self::Read => "read",
            Self::Use => "use",
            Self::Write => "admin",
        }
    }

    pub fn all() -> [Capability; 3] {
        [Self::Read, Self::Use, Self::Write]
    }
}

impl fmt::Display for Capability {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Capability {
    type Err = EvaluationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "read" => Ok(Self::Read),
            "use" => Ok(Self::Use),
            "write" => Ok(Self::Write),
            other => Err(EvaluationError::malformed(other, "unknown capability")),
        }
    }
}

// ═══════════════════════════════════════════════════════════════════════════════
// Organization roles
// ═══════════════════════════════════════════════════════════════════════════════

/// Role held by a user or team on an organization.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OrganizationRole {
    Admin,
    Member,
    Auditor,
}

impl OrganizationRole {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Admin => "admin",
            Self::Member => "member",
            Self::Auditor => "auditor",
        }
    }

    pub fn description(&self) -> &'static str {
        match self {
            Self::Admin => "Can manage all aspects of the organization",
            Self::Member => "User is a member of the Organization",
            Self::Auditor => "Can view all aspects of the organization",
        }
    }

    /// Capabilities implied by this role, in rendering order.
    pub fn descendants(&self) -> &'static [Capability] {
        match self {
            Self::Admin => &[Capability::Write, Capability::Use, Capability::Read],
            Self::Member => &[Capability::Read, Capability::Use],
            Self::Auditor => &[Capability::Read],
        }
    }

    pub fn implies(&self, capability: Capability) -> bool {
        self.descendants().contains(&capability)
    }

    pub fn all() -> [OrganizationRole; 3] {
        [Self::Admin, Self::Member, Self::Auditor]
    }
}

impl fmt::Display for OrganizationRole {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for OrganizationRole {
    type Err = EvaluationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "admin" => Ok(Self::Admin),
            "member" => Ok(Self::Member),
            "auditor" => Ok(Self::Auditor),
            other => Err(EvaluationError::malformed(other, "unknown organization role")),
        }
    }
}

// ═══════════════════════════════════════════════════════════════════════════════
// Resource roles
// ═══════════════════════════════════════════════════════════════════════════════

/// Role recorded on a resource's own assignment list.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ResourceRole {
    Admin,
    Use,
    Update,
    Read,
}

impl ResourceRole {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Admin => "admin",
            Self::Use => "use",
            Self::Update => "update",
            Self::Read => "read",
        }
    }

    /// Capabilities implied by this role, in rendering order.
    pub fn descendants(&self) -> &'static [Capability] {
        match self {
            Self::Admin => &[Capability::Write, Capability::Use, Capability::Read],
            Self::Use | Self::Update => &[Capability::Use, Capability::Read],
            Self::Read => &[Capability::Read],
        }
    }

    pub fn implies(&self, capability: Capability) -> bool {
        self.descendants().contains(&capability)
    }

    /// Human-readable description of this role on a resource of `kind`.
    pub fn description(&self, kind: ResourceKind) -> String {
        let noun = kind.noun();
        match self {
            Self::Admin => format!("Can manage all aspects of the {}", noun),
            Self::Use if kind.is_template() => format!("May run the {}", noun),
            Self::Use => format!("Can use the {} in a job template", noun),
            Self::Update => format!(
                "May update the {} using the configured source update system",
                noun
            ),
            Self::Read => format!("May view settings for the {}", noun),
        }
    }

    pub fn all() -> [ResourceRole; 4] {
        [Self::Admin, Self::Use, Self::Update, Self::Read]
    }
}

impl fmt::Display for ResourceRole {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ResourceRole {
    type Err = EvaluationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "admin" => Ok(Self::Admin),
            "use" => Ok(Self::Use),
            "update" => Ok(Self::Update),
            "read" => Ok(Self::Read),
            other => Err(EvaluationError::malformed(other, "unknown resource role")),
        }
    }
}

/// A role together with the scope it was granted in.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ScopedRole {
    Organization(OrganizationRole),
    Resource(ResourceRole),
}

impl ScopedRole {
    pub fn name(&self) -> &'static str {
        match self {
            Self::Organization(role) => role.as_str(),
            Self::Resource(role) => role.as_str(),
        }
    }

    pub fn descendants(&self) -> &'static [Capability] {
        match self {
            Self::Organization(role) => role.descendants(),
            Self::Resource(role) => role.descendants(),
        }
    }

    /// Descendant names as rendered in access summaries.
    pub fn descendant_names(&self) -> Vec<String> {
        self.descendants()
            .iter()
            .map(|c| c.descendant_name().to_string())
            .collect()
    }
}

/// Capabilities implied by `role` in its scope.
pub fn descendants(role: ScopedRole) -> &'static [Capability] {
    role.descendants()
}

// ═══════════════════════════════════════════════════════════════════════════════
// Resource kinds
// ═══════════════════════════════════════════════════════════════════════════════

/// Every resource type that carries its own role assignments.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ResourceKind {
    Credential,
    Inventory,
    JobTemplate,
    Project,
    TerraformJobTemplate,
}

impl ResourceKind {
    /// Identifier used in `related` link keys and on the command line.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Credential => "credential",
            Self::Inventory => "inventory",
            Self::JobTemplate => "job_template",
            Self::Project => "project",
            Self::TerraformJobTemplate => "terraform_job_template",
        }
    }

    /// Lower-case noun used in descriptions and `resource_type` fields.
    pub fn noun(&self) -> &'static str {
        match self {
            Self::Credential => "credential",
            Self::Inventory => "inventory",
            Self::JobTemplate => "job template",
            Self::Project => "project",
            Self::TerraformJobTemplate => "terraform job template",
        }
    }

    pub fn display_name(&self) -> &'static str {
        match self {
            Self::Credential => "Credential",
            Self::Inventory => "Inventory",
            Self::JobTemplate => "Job Template",
            Self::Project => "Project",
            Self::TerraformJobTemplate => "Terraform Job Template",
        }
    }

    /// URL collection segment.
    pub fn collection(&self) -> &'static str {
        match self {
            Self::Credential => "credentials",
            Self::Inventory => "inventories",
            Self::JobTemplate => "job_templates",
            Self::Project => "projects",
            Self::TerraformJobTemplate => "terraform_job_templates",
        }
    }

    pub fn is_template(&self) -> bool {
        matches!(self, Self::JobTemplate | Self::TerraformJobTemplate)
    }

    /// Roles that may be recorded on a resource of this kind.
    pub fn supported_roles(&self) -> &'static [ResourceRole] {
        match self {
            Self::Credential | Self::JobTemplate | Self::TerraformJobTemplate => {
                &[ResourceRole::Admin, ResourceRole::Use, ResourceRole::Read]
            }
            Self::Inventory | Self::Project => &[
                ResourceRole::Admin,
                ResourceRole::Use,
                ResourceRole::Update,
                ResourceRole::Read,
            ],
        }
    }

    pub fn supports(&self, role: ResourceRole) -> bool {
        self.supported_roles().contains(&role)
    }

    /// Reject a recorded role this kind does not support.
    pub fn ensure_supported(&self, role: ResourceRole) -> Result<(), EvaluationError> {
        if self.supports(role) {
            Ok(())
        } else {
            Err(EvaluationError::malformed(
                role.as_str(),
                format!("role not supported on a {}", self.noun()),
            ))
        }
    }

    /// API link to a resource of this kind.
    pub fn related_link(&self, id: &ResourceId) -> String {
        format!("/v1/{}/{}/", self.collection(), id)
    }

    pub fn all() -> [ResourceKind; 5] {
        [
            Self::Credential,
            Self::Inventory,
            Self::JobTemplate,
            Self::Project,
            Self::TerraformJobTemplate,
        ]
    }
}

impl fmt::Display for ResourceKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ResourceKind {
    type Err = EvaluationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::all()
            .into_iter()
            .find(|kind| kind.as_str() == s)
            .ok_or_else(|| EvaluationError::malformed(s, "unknown resource type"))
    }
}

// ═══════════════════════════════════════════════════════════════════════════════
// Object roles
// ═══════════════════════════════════════════════════════════════════════════════

/// Summary of the resource a role belongs to.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RoleSummaryFields {
    pub resource_name: String,
    pub resource_type: String,
    pub resource_type_display_name: String,
}

/// One assignable role on a specific resource.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RoleDescriptor {
    #[serde(rename = "type")]
    pub object_type: String,
    pub name: String,
    pub description: String,
    pub related: BTreeMap<String, String>,
    pub summary_fields: RoleSummaryFields,
}

/// List the roles that can be granted on one resource.
pub fn object_roles(kind: ResourceKind, id: &ResourceId, name: &str) -> Vec<RoleDescriptor> {
    kind.supported_roles()
        .iter()
        .map(|role| RoleDescriptor {
            object_type: "role".to_string(),
            name: role.as_str().to_string(),
            description: role.description(kind),
            related: BTreeMap::from([(kind.as_str().to_string(), kind.related_link(id))]),
            summary_fields: RoleSummaryFields {
                resource_name: name.to_string(),
                resource_type: kind.noun().to_string(),
                resource_type_display_name: kind.display_name().to_string(),
            },
        })
        .collect()
}

// ═══════════════════════════════════════════════════════════════════════════════
// Tests
// ═══════════════════════════════════════════════════════════════════════════════
