//! Resources that carry their own role assignments.
//!
//! The evaluator and the aggregator only see a resource through
//! [`AccessControlled`]: its kind, owning organization and assignment list.

use serde::{Deserialize, Serialize};

use super::models::{OrganizationId, ResourceId, RoleAssignment};
use super::roles::{ResourceKind, ResourceRole};

/// Capability every access-controlled resource exposes.
pub trait AccessControlled: Send + Sync {
    fn kind(&self) -> ResourceKind;

    fn id(&self) -> &ResourceId;

    fn name(&self) -> &str;

    /// The owning organization. Fixed at creation.
    fn organization_id(&self) -> &OrganizationId;

    /// Role assignments recorded on the resource itself.
    fn roles(&self) -> &[RoleAssignment<ResourceRole>];
}

macro_rules! access_controlled {
    ($ty:ident => $kind:expr) => {
        impl $ty {
            /// Record a grant on this resource.
            pub fn grant(mut self, assignment: RoleAssignment<ResourceRole>) -> Self {
                self.roles.push(assignment);
                self
            }
        }

        impl AccessControlled for $ty {
            fn kind(&self) -> ResourceKind {
                $kind
            }

            fn id(&self) -> &ResourceId {
                &self.id
            }

            fn name(&self) -> &str {
                &self.name
            }

            fn organization_id(&self) -> &OrganizationId {
                &self.organization_id
            }

            fn roles(&self) -> &[RoleAssignment<ResourceRole>] {
                &self.roles
            }
        }
    };
}

/// Secret material used to reach machines, clouds or source control.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Credential {
    pub id: ResourceId,
    pub name: String,
    #[serde(default)]
    pub description: String,
    /// `ssh`, `net`, `scm`, `aws`, `azure`, ...
    pub kind: String,
    pub organization_id: OrganizationId,
    #[serde(default)]
    pub roles: Vec<RoleAssignment<ResourceRole>>,
}

impl Credential {
    pub fn new(
        name: impl Into<String>,
        kind: impl Into<String>,
        organization_id: impl Into<OrganizationId>,
    ) -> Self {
        Self {
            id: ResourceId::generate(),
            name: name.into(),
            description: String::new(),
            kind: kind.into(),
            organization_id: organization_id.into(),
            roles: Vec::new(),
        }
    }
}

access_controlled!(Credential => ResourceKind::Credential);

/// A set of hosts jobs run against.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Inventory {
    pub id: ResourceId,
    pub name: String,
    #[serde(default)]
    pub description: String,
    pub organization_id: OrganizationId,
    #[serde(default)]
    pub variables: String,
    #[serde(default)]
    pub roles: Vec<RoleAssignment<ResourceRole>>,
}

impl Inventory {
    pub fn new(name: impl Into<String>, organization_id: impl Into<OrganizationId>) -> Self {
        Self {
            id: ResourceId::generate(),
            name: name.into(),
            description: String::new(),
            organization_id: organization_id.into(),
            variables: String::new(),
            roles: Vec::new(),
        }
    }
}

access_controlled!(Inventory => ResourceKind::Inventory);

/// A source-controlled collection of playbooks or Terraform modules.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Project {
    pub id: ResourceId,
    pub name: String,
    #[serde(default)]
    pub description: String,
    pub organization_id: OrganizationId,
    /// `git`, `hg`, `svn` or `manual`.
    #[serde(default)]
    pub scm_type: String,
    #[serde(default)]
    pub scm_url: String,
    #[serde(default)]
    pub scm_credential_id: Option<ResourceId>,
    #[serde(default)]
    pub roles: Vec<RoleAssignment<ResourceRole>>,
}

impl Project {
    pub fn new(name: impl Into<String>, organization_id: impl Into<OrganizationId>) -> Self {
        Self {
            id: ResourceId::generate(),
            name: name.into(),
            description: String::new(),
            organization_id: organization_id.into(),
            scm_type: "manual".to_string(),
            scm_url: String::new(),
            scm_credential_id: None,
            roles: Vec::new(),
        }
    }
}

access_controlled!(Project => ResourceKind::Project);

/// An Ansible job definition: playbook, inventory, project and credential.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct JobTemplate {
    pub id: ResourceId,
    pub name: String,
    #[serde(default)]
    pub description: String,
    pub organization_id: OrganizationId,
    /// `run` or `check`.
    #[serde(default = "default_job_type")]
    pub job_type: String,
    pub inventory_id: ResourceId,
    pub project_id: ResourceId,
    #[serde(default)]
    pub machine_credential_id: Option<ResourceId>,
    pub playbook: String,
    #[serde(default)]
    pub roles: Vec<RoleAssignment<ResourceRole>>,
}

impl JobTemplate {
    pub fn new(
        name: impl Into<String>,
        organization_id: impl Into<OrganizationId>,
        inventory_id: ResourceId,
        project_id: ResourceId,
        playbook: impl Into<String>,
    ) -> Self {
        Self {
            id: ResourceId::generate(),
            name: name.into(),
            description: String::new(),
            organization_id: organization_id.into(),
            job_type: default_job_type(),
            inventory_id,
            project_id,
            machine_credential_id: None,
            playbook: playbook.into(),
            roles: Vec::new(),
        }
    }
}

access_controlled!(JobTemplate => ResourceKind::JobTemplate);

/// A Terraform job definition over a project directory.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TerraformJobTemplate {
    pub id: ResourceId,
    pub name: String,
    #[serde(default)]
    pub description: String,
    pub organization_id: OrganizationId,
    /// `plan`, `apply` or `destroy`.
    #[serde(default = "default_terraform_job_type")]
    pub job_type: String,
    pub project_id: ResourceId,
    #[serde(default)]
    pub directory: String,
    #[serde(default)]
    pub roles: Vec<RoleAssignment<ResourceRole>>,
}

impl TerraformJobTemplate {
    pub fn new(
        name: impl Into<String>,
        organization_id: impl Into<OrganizationId>,
        project_id: ResourceId,
    ) -> Self {
        Self {
            id: ResourceId::generate(),
            name: name.into(),
            description: String::new(),
            organization_id: organization_id.into(),
            job_type: default_terraform_job_type(),
            project_id,
            directory: String::new(),
            roles: Vec::new(),
        }
    }
}

access_controlled!(TerraformJobTemplate => ResourceKind::TerraformJobTemplate);

fn default_job_type() -> String { "run".to_string() }
fn default_terraform_job_type() -> String { "plan".to_string() }

/// Any stored resource, tagged by kind.
///
/// Used where resources of different kinds travel together, such as grant
/// snapshots.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "resource_type", rename_all = "snake_case")]
pub enum AnyResource {
    Credential(Credential),
    Inventory(Inventory),
    JobTemplate(JobTemplate),
    Project(Project),
    TerraformJobTemplate(TerraformJobTemplate),
}

impl AnyResource {
    fn inner(&self) -> &dyn AccessControlled {
        match self {
            Self::Credential(r) => r,
            Self::Inventory(r) => r,
            Self::JobTemplate(r) => r,
            Self::Project(r) => r,
            Self::TerraformJobTemplate(r) => r,
        }
    }
}

impl AccessControlled for AnyResource {
    fn kind(&self) -> ResourceKind {
        self.inner().kind()
    }

    fn id(&self) -> &ResourceId {
        self.inner().id()
    }

    fn name(&self) -> &str {
        self.inner().name()
    }

    fn organization_id(&self) -> &OrganizationId {
        self.inner().organization_id()
    }

    fn roles(&self) -> &[RoleAssignment<ResourceRole>] {
        self.inner().roles()
    }
}
