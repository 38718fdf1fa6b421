//! Database layer for Tensor.
//!
//! PostgreSQL-backed [`GrantStore`] and [`UserDirectory`] using sqlx.
//! Role strings are stored verbatim and parsed with the role catalog on the
//! way out, so a corrupt row surfaces as a malformed grant.

use async_trait::async_trait;
use metrics::counter;
use sqlx::{postgres::PgPoolOptions, PgPool};
use std::collections::HashSet;
use tracing::{info, warn};

use crate::config::DatabaseConfig;
use crate::error::Result;
use crate::rbac::error::{EvaluationError, StoreError};
use crate::rbac::models::{
    GranteeRef, Organization, OrganizationId, RoleAssignment, TeamId, User, UserId,
};
use crate::rbac::roles::OrganizationRole;
use crate::rbac::store::{GrantStore, UserDirectory};

/// Database connection and grant reads.
#[derive(Clone)]
pub struct Database {
    pool: PgPool,
}

impl Database {
    /// Create a new database connection pool.
    pub async fn new(config: &DatabaseConfig) -> Result<Self> {
        let pool = PgPoolOptions::new()
            .max_connections(config.max_connections)
            .min_connections(config.min_connections)
            .acquire_timeout(config.acquire_timeout)
            .connect(&config.url)
            .await?;

        info!(max_connections = config.max_connections, "Connected to grant database");
        Ok(Self { pool })
    }

    /// Wrap an existing pool.
    pub fn from_pool(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Run migrations.
    pub async fn migrate(&self) -> Result<()> {
        sqlx::migrate!("./migrations").run(&self.pool).await?;
        Ok(())
    }

    /// Get the connection pool.
    pub fn pool(&self) -> &PgPool {
        &self.pool
    }

    /// Load an organization with its role assignments in recorded order.
    pub async fn organization(
        &self,
        organization_id: &OrganizationId,
    ) -> std::result::Result<Option<Organization>, EvaluationError> {
        let row = sqlx::query_as::<_, OrganizationRow>(
            "SELECT id, name, description FROM organizations WHERE id = $1",
        )
        .bind(organization_id.as_str())
        .fetch_optional(&self.pool)
        .await
        .map_err(store_failure)?;

        let Some(row) = row else {
            return Ok(None);
        };

        let assignments = sqlx::query_as::<_, AssignmentRow>(
            r#"
            SELECT grantee_type, grantee_id, role
            FROM organization_roles
            WHERE organization_id = $1
            ORDER BY position
            "#,
        )
        .bind(organization_id.as_str())
        .fetch_all(&self.pool)
        .await
        .map_err(store_failure)?;

        let mut organization = Organization::new(row.id, row.name);
        organization.description = row.description;
        for assignment in assignments {
            let role: OrganizationRole = assignment.role.parse()?;
            let grantee = parse_grantee(&assignment.grantee_type, assignment.grantee_id)?;
            organization.roles.push(match grantee {
                GranteeRef::User(id) => RoleAssignment::user(id, role),
                GranteeRef::Team(id) => RoleAssignment::team(id, role),
            });
        }
        Ok(Some(organization))
    }
}

// ═══════════════════════════════════════════════════════════════════════════════
// Grant Store
// ═══════════════════════════════════════════════════════════════════════════════

#[async_trait]
impl GrantStore for Database {
    async fn organization_role_holders(
        &self,
        organization_id: &OrganizationId,
        role: OrganizationRole,
    ) -> std::result::Result<HashSet<GranteeRef>, EvaluationError> {
        let rows = sqlx::query_as::<_, GranteeRow>(
            r#"
            SELECT grantee_type, grantee_id
            FROM organization_roles
            WHERE organization_id = $1 AND role = $2
            "#,
        )
        .bind(organization_id.as_str())
        .bind(role.as_str())
        .fetch_all(&self.pool)
        .await
        .map_err(store_failure)?;

        rows.into_iter()
            .map(|row| parse_grantee(&row.grantee_type, row.grantee_id))
            .collect()
    }

    async fn team_members(
        &self,
        team_id: &TeamId,
    ) -> std::result::Result<HashSet<UserId>, EvaluationError> {
        let members: Vec<String> =
            sqlx::query_scalar("SELECT user_id FROM team_members WHERE team_id = $1")
                .bind(team_id.as_str())
                .fetch_all(&self.pool)
                .await
                .map_err(store_failure)?;

        Ok(members.into_iter().map(UserId::from).collect())
    }

    async fn is_user_in_org_with_role(
        &self,
        user_id: &UserId,
        organization_id: &OrganizationId,
        role: OrganizationRole,
    ) -> std::result::Result<bool, EvaluationError> {
        sqlx::query_scalar::<_, bool>(
            r#"
            SELECT EXISTS (
                SELECT 1 FROM organization_roles
                WHERE organization_id = $1 AND role = $2
                  AND grantee_type = 'user' AND grantee_id = $3
            )
            "#,
        )
        .bind(organization_id.as_str())
        .bind(role.as_str())
        .bind(user_id.as_str())
        .fetch_one(&self.pool)
        .await
        .map_err(store_failure)
    }

    fn name(&self) -> &'static str {
        "postgres"
    }
}

#[async_trait]
impl UserDirectory for Database {
    async fn find_user(&self, user_id: &UserId) -> std::result::Result<User, StoreError> {
        let row = sqlx::query_as::<_, UserRow>(
            r#"
            SELECT id, username, first_name, last_name, email, is_superuser, is_system_auditor
            FROM users
            WHERE id = $1
            "#,
        )
        .bind(user_id.as_str())
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| StoreError::Unavailable(e.to_string()))?;

        row.map(User::from)
            .ok_or_else(|| StoreError::NotFound(format!("user {}", user_id)))
    }
}

fn store_failure(error: sqlx::Error) -> EvaluationError {
    warn!(error = %error, "Grant store query failed");
    counter!("grant_store_failures_total", "backend" => "postgres").increment(1);
    EvaluationError::unavailable(error.to_string())
}

fn parse_grantee(
    grantee_type: &str,
    grantee_id: String,
) -> std::result::Result<GranteeRef, EvaluationError> {
    match grantee_type {
        "user" => Ok(GranteeRef::User(UserId::from(grantee_id))),
        "team" => Ok(GranteeRef::Team(TeamId::from(grantee_id))),
        other => Err(EvaluationError::malformed(other, "unknown grantee type")),
    }
}

// ═══════════════════════════════════════════════════════════════════════════════
// Row Types
// ═══════════════════════════════════════════════════════════════════════════════

#[derive(Debug, sqlx::FromRow)]
pub struct UserRow {
    pub id: String,
    pub username: String,
    pub first_name: String,
    pub last_name: String,
    pub email: String,
    pub is_superuser: bool,
    pub is_system_auditor: bool,
}

impl From<UserRow> for User {
    fn from(row: UserRow) -> Self {
        Self {
            id: UserId::from(row.id),
            username: row.username,
            first_name: row.first_name,
            last_name: row.last_name,
            email: row.email,
            is_super_user: row.is_superuser,
            is_system_auditor: row.is_system_auditor,
        }
    }
}

#[derive(Debug, sqlx::FromRow)]
struct OrganizationRow {
    id: String,
    name: String,
    description: String,
}

#[derive(Debug, sqlx::FromRow)]
struct GranteeRow {
    grantee_type: String,
    grantee_id: String,
}

#[derive(Debug, sqlx::FromRow)]
struct AssignmentRow {
    grantee_type: String,
    grantee_id: String,
    role: String,
}
