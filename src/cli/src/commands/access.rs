//! Access list: every user with a recorded grant on a resource.

use anyhow::{Context, Result};
use clap::Args;
use tabled::Tabled;

use tensor_core::rbac::{AccessAggregator, AccessEntry, AccessSummary};

use crate::output::{self, OutputFormat};
use crate::snapshot::{ResourceRef, Session};

#[derive(Args)]
pub struct AccessListArgs {
    /// Resource as <type>/<id>, e.g. credential/c-1
    #[arg(short, long)]
    pub resource: ResourceRef,
}

/// One grant per row.
#[derive(Debug, Tabled)]
pub struct AccessRow {
    #[tabled(rename = "User")]
    pub username: String,
    #[tabled(rename = "Access")]
    pub scope: &'static str,
    #[tabled(rename = "Role")]
    pub role: String,
    #[tabled(rename = "Granted On")]
    pub granted_on: String,
    #[tabled(rename = "Implies")]
    pub implies: String,
}

impl AccessRow {
    fn new(username: &str, scope: &'static str, entry: &AccessEntry) -> Self {
        Self {
            username: username.to_string(),
            scope,
            role: entry.role.name.clone(),
            granted_on: format!("{} '{}'", entry.role.resource_type, entry.role.resource_name),
            implies: entry.descendant_roles.join(", "),
        }
    }
}

pub fn rows(summaries: &[AccessSummary]) -> Vec<AccessRow> {
    let mut rows = Vec::new();
    for summary in summaries {
        let username = summary.user.username.as_str();
        rows.extend(summary.indirect_access.iter().map(|e| AccessRow::new(username, "indirect", e)));
        rows.extend(summary.direct_access.iter().map(|e| AccessRow::new(username, "direct", e)));
    }
    rows
}

pub async fn summarize(args: &AccessListArgs, session: &Session) -> Result<Vec<AccessSummary>> {
    let resource = session.resource(&args.resource)?;
    let organization = session.organization_of(resource)?;

    let aggregator = AccessAggregator::new(session.store.clone());
    aggregator
        .build_access_summary(&organization, resource)
        .await
        .with_context(|| format!("Failed to build access list for {}", args.resource))
}

pub async fn execute(args: AccessListArgs, session: &Session, format: OutputFormat) -> Result<()> {
    let summaries = summarize(&args, session).await?;

    if format == OutputFormat::Table {
        output::print_header(&format!("Access to {}", args.resource));
    }
    output::print_list(&rows(&summaries), &summaries, format)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::snapshot::Snapshot;
    use tensor_core::rbac::{
        AnyResource, Credential, Organization, OrganizationRole, ResourceId, ResourceRole,
        RoleAssignment, User,
    };

    fn session(with_bob: bool) -> Session {
        let mut credential = Credential::new("deploy key", "ssh", "o-1")
            .grant(RoleAssignment::user("u-2", ResourceRole::Read));
        credential.id = ResourceId::new("c-1");

        let mut users = vec![User::new("u-1", "alice")];
        if with_bob {
            users.push(User::new("u-2", "bob"));
        }

        Snapshot {
            users,
            organizations: vec![Organization::new("o-1", "Acme")
                .grant(RoleAssignment::user("u-1", OrganizationRole::Admin))],
            teams: Vec::new(),
            resources: vec![AnyResource::Credential(credential)],
        }
        .into_session()
    }

    fn args() -> AccessListArgs {
        AccessListArgs {
            resource: "credential/c-1".parse().unwrap(),
        }
    }

    #[tokio::test]
    async fn test_summarize_and_rows() {
        let summaries = summarize(&args(), &session(true)).await.unwrap();
        assert_eq!(summaries.len(), 2);

        let rows = rows(&summaries);
        assert_eq!(rows.len(), 2);
        assert_eq!(rows[0].username, "alice");
        assert_eq!(rows[0].scope, "indirect");
        assert_eq!(rows[0].granted_on, "organization 'Acme'");
        assert_eq!(rows[0].implies, "admin, use, read");
        assert_eq!(rows[1].username, "bob");
        assert_eq!(rows[1].granted_on, "credential 'deploy key'");
    }

    #[tokio::test]
    async fn test_missing_profile_fails() {
        let err = summarize(&args(), &session(false)).await.unwrap_err();
        assert!(err.to_string().contains("credential/c-1"));
    }
}
