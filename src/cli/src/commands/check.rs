//! Single capability check.
//!
//! Exits non-zero when access is denied so the command can gate scripts.

use anyhow::{Context, Result};
use clap::Args;
use serde::Serialize;

use tensor_core::config::AccessConfig;
use tensor_core::rbac::{
    AccessControlled, Capability, EvaluatorConfig, PermissionEvaluator, UserDirectory, UserId,
};

use crate::output::{self, OutputFormat};
use crate::snapshot::{ResourceRef, Session};

#[derive(Args)]
pub struct CheckArgs {
    /// User id
    #[arg(short, long)]
    pub user: String,

    /// Resource as <type>/<id>, e.g. inventory/i-1
    #[arg(short, long)]
    pub resource: ResourceRef,

    /// Capability to check (read, use, write)
    #[arg(short, long, default_value = "read")]
    pub capability: Capability,
}

/// Result of a check, as printed in JSON/YAML output.
#[derive(Debug, Serialize)]
pub struct CheckReport {
    pub user_id: String,
    pub username: String,
    pub resource_type: String,
    pub resource_id: String,
    pub resource_name: String,
    pub capability: Capability,
    pub allowed: bool,
    pub path: String,
}

pub async fn evaluate(
    args: &CheckArgs,
    session: &Session,
    config: &AccessConfig,
) -> Result<CheckReport> {
    let user = session
        .store
        .find_user(&UserId::new(args.user.as_str()))
        .await
        .with_context(|| format!("Unknown user '{}'", args.user))?;
    let resource = session.resource(&args.resource)?;

    let evaluator =
        PermissionEvaluator::with_config(session.store.clone(), EvaluatorConfig::from(config));
    let decision = evaluator
        .decide(&user, resource, args.capability)
        .await
        .context("Access could not be evaluated")?;

    Ok(CheckReport {
        user_id: user.id.to_string(),
        username: user.username,
        resource_type: resource.kind().as_str().to_string(),
        resource_id: resource.id().to_string(),
        resource_name: resource.name().to_string(),
        capability: args.capability,
        allowed: decision.is_allowed(),
        path: decision.path.to_string(),
    })
}

/// Returns whether access was granted.
pub async fn execute(
    args: CheckArgs,
    session: &Session,
    config: &AccessConfig,
    format: OutputFormat,
) -> Result<bool> {
    let report = evaluate(&args, session, config).await?;

    match format {
        OutputFormat::Table => {
            let message = format!(
                "{} {} {} '{}'",
                report.username, report.capability, report.resource_type, report.resource_name
            );
            if report.allowed {
                output::print_success(&format!("{} (via {})", message, report.path));
            } else {
                output::print_denied(&message);
            }
        }
        _ => output::print_item(&report, format)?,
    }

    Ok(report.allowed)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::snapshot::Snapshot;
    use tensor_core::rbac::{
        AnyResource, Inventory, Organization, ResourceId, ResourceRole, RoleAssignment, Team, User,
    };

    fn session() -> Session {
        let mut inventory = Inventory::new("prod", "o-1")
            .grant(RoleAssignment::team("t-1", ResourceRole::Use));
        inventory.id = ResourceId::new("i-1");

        Snapshot {
            users: vec![User::new("u-1", "alice"), User::new("u-2", "bob")],
            organizations: vec![Organization::new("o-1", "Acme")],
            teams: vec![Team::new("t-1", "Ops", "o-1").with_member("u-1")],
            resources: vec![AnyResource::Inventory(inventory)],
        }
        .into_session()
    }

    fn args(user: &str, capability: Capability) -> CheckArgs {
        CheckArgs {
            user: user.to_string(),
            resource: "inventory/i-1".parse().unwrap(),
            capability,
        }
    }

    #[tokio::test]
    async fn test_team_member_may_use() {
        let report = evaluate(&args("u-1", Capability::Use), &session(), &AccessConfig::default())
            .await
            .unwrap();
        assert!(report.allowed);
        assert_eq!(report.path, "team t-1 (use)");
        assert_eq!(report.resource_name, "prod");
    }

    #[tokio::test]
    async fn test_denied_reports_path() {
        let report = evaluate(&args("u-2", Capability::Read), &session(), &AccessConfig::default())
            .await
            .unwrap();
        assert!(!report.allowed);
        assert_eq!(report.path, "denied");
    }

    #[tokio::test]
    async fn test_unknown_user() {
        let err = evaluate(&args("u-9", Capability::Read), &session(), &AccessConfig::default())
            .await
            .unwrap_err();
        assert!(err.to_string().contains("u-9"));
    }
}
