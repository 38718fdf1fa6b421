//! Assignable roles on a resource.

use anyhow::Result;
use clap::Args;
use tabled::Tabled;

use tensor_core::rbac::{object_roles, AccessControlled, RoleDescriptor};

use crate::output::{self, OutputFormat};
use crate::snapshot::{ResourceRef, Session};

#[derive(Args)]
pub struct RolesArgs {
    /// Resource as <type>/<id>, e.g. project/p-1
    #[arg(short, long)]
    pub resource: ResourceRef,
}

#[derive(Debug, Tabled)]
struct RoleRow {
    #[tabled(rename = "Role")]
    name: String,
    #[tabled(rename = "Description")]
    description: String,
}

pub fn describe(args: &RolesArgs, session: &Session) -> Result<Vec<RoleDescriptor>> {
    let resource = session.resource(&args.resource)?;
    Ok(object_roles(resource.kind(), resource.id(), resource.name()))
}

pub async fn execute(args: RolesArgs, session: &Session, format: OutputFormat) -> Result<()> {
    let roles = describe(&args, session)?;
    let rows: Vec<RoleRow> = roles
        .iter()
        .map(|r| RoleRow {
            name: r.name.clone(),
            description: r.description.clone(),
        })
        .collect();

    output::print_list(&rows, &roles, format)
}
