//! Grant snapshots: users, organizations, teams and resources exported to a
//! single JSON or YAML file.

use anyhow::{anyhow, bail, Context, Result};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::Path;
use std::str::FromStr;
use std::sync::Arc;

use tensor_core::rbac::{
    AccessControlled, AnyResource, InMemoryGrantStore, Organization, ResourceId, ResourceKind,
    Team, User,
};

/// Everything the CLI needs to answer access questions offline.
#[derive(Debug, Default, Serialize, Deserialize)]
pub struct Snapshot {
    #[serde(default)]
    pub users: Vec<User>,
    #[serde(default)]
    pub organizations: Vec<Organization>,
    #[serde(default)]
    pub teams: Vec<Team>,
    #[serde(default)]
    pub resources: Vec<AnyResource>,
}

impl Snapshot {
    /// Read a snapshot. `.yaml`/`.yml` files are parsed as YAML, anything else
    /// as JSON.
    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read {}", path.display()))?;

        let is_yaml = matches!(
            path.extension().and_then(|e| e.to_str()),
            Some("yaml") | Some("yml")
        );
        let snapshot = if is_yaml {
            serde_yaml::from_str(&content)
                .with_context(|| format!("Failed to parse YAML snapshot {}", path.display()))?
        } else {
            serde_json::from_str(&content)
                .with_context(|| format!("Failed to parse JSON snapshot {}", path.display()))?
        };
        Ok(snapshot)
    }

    /// Load into an in-memory grant store, keeping resources aside.
    pub fn into_session(self) -> Session {
        let store = InMemoryGrantStore::new();
        for user in self.users {
            store.insert_user(user);
        }
        for organization in self.organizations {
            store.insert_organization(organization);
        }
        for team in self.teams {
            store.insert_team(team);
        }
        Session {
            store: Arc::new(store),
            resources: self.resources,
        }
    }
}

/// A loaded snapshot.
pub struct Session {
    pub store: Arc<InMemoryGrantStore>,
    pub resources: Vec<AnyResource>,
}

impl Session {
    pub fn resource(&self, reference: &ResourceRef) -> Result<&AnyResource> {
        self.resources
            .iter()
            .find(|r| r.kind() == reference.kind && r.id() == &reference.id)
            .ok_or_else(|| anyhow!("{} not found in snapshot", reference))
    }

    pub fn organization_of(&self, resource: &AnyResource) -> Result<Organization> {
        self.store
            .organization(resource.organization_id())
            .ok_or_else(|| {
                anyhow!(
                    "organization {} of {} {} not found in snapshot",
                    resource.organization_id(),
                    resource.kind().noun(),
                    resource.id()
                )
            })
    }
}

/// `kind/id` as typed on the command line, e.g. `inventory/i-1`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResourceRef {
    pub kind: ResourceKind,
    pub id: ResourceId,
}

impl FromStr for ResourceRef {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self> {
        let Some((kind, id)) = s.split_once('/') else {
            bail!("expected <type>/<id>, got '{}'", s);
        };
        if id.is_empty() {
            bail!("missing resource id in '{}'", s);
        }
        let kind: ResourceKind = kind.parse()?;
        Ok(Self {
            kind,
            id: ResourceId::new(id),
        })
    }
}

impl fmt::Display for ResourceRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.kind, self.id)
    }
}
