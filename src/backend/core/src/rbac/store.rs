//! Grant store: the read-only view over persisted role assignments.
//!
//! This module provides:
//! - **GrantStore**: organization holders, team membership, resource holders
//! - **UserDirectory**: profile lookups for access summaries
//! - **InMemoryGrantStore**: DashMap-backed implementation of both

use async_trait::async_trait;
use dashmap::{DashMap, DashSet};
use metrics::counter;
use std::collections::HashSet;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use tracing::{debug, warn};

use super::error::{EvaluationError, StoreError};
use super::models::{
    GranteeRef, Organization, OrganizationId, Team, TeamId, User, UserId,
};
use super::resources::AccessControlled;
use super::roles::{OrganizationRole, ResourceRole};

// ═══════════════════════════════════════════════════════════════════════════════
// Traits
// ═══════════════════════════════════════════════════════════════════════════════

/// Read adapter over stored grants.
///
/// Implementations never mutate grants. Any failed read is reported as an
/// [`EvaluationError`]; callers treat it as a deny.
#[async_trait]
pub trait GrantStore: Send + Sync {
    /// Grantees holding exactly `role` on the organization. Descendants are
    /// not included.
    async fn organization_role_holders(
        &self,
        organization_id: &OrganizationId,
        role: OrganizationRole,
    ) -> Result<HashSet<GranteeRef>, EvaluationError>;

    /// Current members of a team. An unknown team has no members.
    async fn team_members(&self, team_id: &TeamId) -> Result<HashSet<UserId>, EvaluationError>;

    /// Whether the user is directly assigned `role` on the organization.
    async fn is_user_in_org_with_role(
        &self,
        user_id: &UserId,
        organization_id: &OrganizationId,
        role: OrganizationRole,
    ) -> Result<bool, EvaluationError> {
        let holders = self.organization_role_holders(organization_id, role).await?;
        Ok(holders.contains(&GranteeRef::User(user_id.clone())))
    }

    /// Grantees holding exactly `role` on the resource's own assignment list.
    ///
    /// Reads only the resource document. Fails if the kind does not support
    /// `role`, or if any recorded assignment is outside the kind's subset.
    fn resource_role_holders(
        &self,
        resource: &dyn AccessControlled,
        role: ResourceRole,
    ) -> Result<HashSet<GranteeRef>, EvaluationError> {
        let kind = resource.kind();
        kind.ensure_supported(role)?;

        let mut holders = HashSet::new();
        for assignment in resource.roles() {
            kind.ensure_supported(assignment.role)?;
            if assignment.role == role {
                holders.insert(assignment.grantee());
            }
        }
        Ok(holders)
    }

    /// Backend name used in logs and metric labels.
    fn name(&self) -> &'static str;
}

/// Profile lookup used when rendering access summaries.
#[async_trait]
pub trait UserDirectory: Send + Sync {
    async fn find_user(&self, user_id: &UserId) -> Result<User, StoreError>;
}

// ═══════════════════════════════════════════════════════════════════════════════
// In-Memory Store
// ═══════════════════════════════════════════════════════════════════════════════

/// In-memory grant store and user directory.
///
/// Backs the CLI's snapshot mode and the test suites. Fault injection is
/// available through [`set_unavailable`](Self::set_unavailable),
/// [`fail_team`](Self::fail_team) and [`fail_user`](Self::fail_user).
#[derive(Default)]
pub struct InMemoryGrantStore {
    organizations: DashMap<OrganizationId, Organization>,
    teams: DashMap<TeamId, Team>,
    users: DashMap<UserId, User>,

    unavailable: AtomicBool,
    failing_teams: DashSet<TeamId>,
    failing_users: DashSet<UserId>,

    /// Number of reads served or refused, for asserting short-circuits.
    lookups: AtomicU64,
}

impl InMemoryGrantStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert_organization(&self, organization: Organization) {
        debug!(organization_id = %organization.id, "Seeding organization");
        self.organizations.insert(organization.id.clone(), organization);
    }

    pub fn insert_team(&self, team: Team) {
        debug!(team_id = %team.id, members = team.members.len(), "Seeding team");
        self.teams.insert(team.id.clone(), team);
    }

    pub fn insert_user(&self, user: User) {
        self.users.insert(user.id.clone(), user);
    }

    /// Add a user to an existing team. Returns `false` if the team is unknown.
    pub fn add_team_member(&self, team_id: &TeamId, user_id: UserId) -> bool {
        match self.teams.get_mut(team_id) {
            Some(mut team) => {
                team.members.insert(user_id);
                true
            }
            None => false,
        }
    }

    /// Make every subsequent lookup fail.
    pub fn set_unavailable(&self, unavailable: bool) {
        if unavailable {
            warn!("In-memory grant store switched to unavailable");
        }
        self.unavailable.store(unavailable, Ordering::SeqCst);
    }

    /// Make membership lookups for one team fail.
    pub fn fail_team(&self, team_id: impl Into<TeamId>) {
        self.failing_teams.insert(team_id.into());
    }

    /// Make profile lookups for one user fail.
    pub fn fail_user(&self, user_id: impl Into<UserId>) {
        self.failing_users.insert(user_id.into());
    }

    pub fn lookup_count(&self) -> u64 {
        self.lookups.load(Ordering::SeqCst)
    }

    pub fn organization(&self, organization_id: &OrganizationId) -> Option<Organization> {
        self.organizations.get(organization_id).map(|o| o.clone())
    }

    fn begin_lookup(&self, what: &str) -> Result<(), EvaluationError> {
        self.lookups.fetch_add(1, Ordering::SeqCst);
        if self.unavailable.load(Ordering::SeqCst) {
            counter!("grant_store_failures_total", "backend" => "in_memory").increment(1);
            return Err(EvaluationError::unavailable(format!(
                "in-memory store offline while reading {}",
                what
            )));
        }
        Ok(())
    }
}

#[async_trait]
impl GrantStore for InMemoryGrantStore {
    async fn organization_role_holders(
        &self,
        organization_id: &OrganizationId,
        role: OrganizationRole,
    ) -> Result<HashSet<GranteeRef>, EvaluationError> {
        self.begin_lookup("organization roles")?;

        let holders = self
            .organizations
            .get(organization_id)
            .map(|org| {
                org.roles
                    .iter()
                    .filter(|assignment| assignment.role == role)
                    .map(|assignment| assignment.grantee())
                    .collect()
            })
            .unwrap_or_default();
        Ok(holders)
    }

    async fn team_members(&self, team_id: &TeamId) -> Result<HashSet<UserId>, EvaluationError> {
        self.begin_lookup("team members")?;

        if self.failing_teams.contains(team_id) {
            counter!("grant_store_failures_total", "backend" => "in_memory").increment(1);
            return Err(EvaluationError::unavailable(format!(
                "membership of team {} could not be read",
                team_id
            )));
        }

        Ok(self
            .teams
            .get(team_id)
            .map(|team| team.members.clone())
            .unwrap_or_default())
    }

    fn name(&self) -> &'static str {
        "in_memory"
    }
}

#[async_trait]
impl UserDirectory for InMemoryGrantStore {
    async fn find_user(&self, user_id: &UserId) -> Result<User, StoreError> {
        self.lookups.fetch_add(1, Ordering::SeqCst);
        if self.unavailable.load(Ordering::SeqCst) || self.failing_users.contains(user_id) {
            return Err(StoreError::Unavailable(format!(
                "profile of {} could not be read",
                user_id
            )));
        }

        self.users
            .get(user_id)
            .map(|u| u.clone())
            .ok_or_else(|| StoreError::NotFound(format!("user {}", user_id)))
    }
}

// ═══════════════════════════════════════════════════════════════════════════════
// Tests
// ═══════════════════════════════════════════════════════════════════════════════

#[cfg(test)]
mod tests {
    use super::*;
    use crate::rbac::models::RoleAssignment;
    use crate::rbac::resources::{Credential, Inventory};

    fn seeded() -> InMemoryGrantStore {
        let store = InMemoryGrantStore::new();
        store.insert_organization(
            Organization::new("o-1", "Acme")
                .grant(RoleAssignment::user("u-admin", OrganizationRole::Admin))
                .grant(RoleAssignment::team("t-ops", OrganizationRole::Admin))
                .grant(RoleAssignment::user("u-member", OrganizationRole::Member)),
        );
        store.insert_team(Team::new("t-ops", "Ops", "o-1").with_member("u-2"));
        store.insert_user(User::new("u-2", "bob"));
        store
    }

    #[tokio::test]
    async fn test_organization_holders_exact_role() {
        let store = seeded();
        let org = OrganizationId::new("o-1");

        let admins = store
            .organization_role_holders(&org, OrganizationRole::Admin)
            .await
            .unwrap();
        assert_eq!(admins.len(), 2);
        assert!(admins.contains(&GranteeRef::Team(TeamId::new("t-ops"))));

        let auditors = store
            .organization_role_holders(&org, OrganizationRole::Auditor)
            .await
            .unwrap();
        assert!(auditors.is_empty());
    }

    #[tokio::test]
    async fn test_is_user_in_org_with_role_ignores_teams() {
        let store = seeded();
        let org = OrganizationId::new("o-1");

        assert!(store
            .is_user_in_org_with_role(&UserId::new("u-admin"), &org, OrganizationRole::Admin)
            .await
            .unwrap());
        assert!(!store
            .is_user_in_org_with_role(&UserId::new("u-member"), &org, OrganizationRole::Admin)
            .await
            .unwrap());
        // u-2 is only admin through a team
        assert!(!store
            .is_user_in_org_with_role(&UserId::new("u-2"), &org, OrganizationRole::Admin)
            .await
            .unwrap());
    }

    #[tokio::test]
    async fn test_unknown_team_and_org_are_empty() {
        let store = seeded();
        assert!(store.team_members(&TeamId::new("nope")).await.unwrap().is_empty());
        assert!(store
            .organization_role_holders(&OrganizationId::new("nope"), OrganizationRole::Admin)
            .await
            .unwrap()
            .is_empty());
    }

    #[tokio::test]
    async fn test_unavailable_fails_every_lookup() {
        let store = seeded();
        store.set_unavailable(true);

        let err = store.team_members(&TeamId::new("t-ops")).await.unwrap_err();
        assert!(matches!(err, EvaluationError::StoreUnavailable(_)));
        assert!(store.find_user(&UserId::new("u-2")).await.is_err());
        assert_eq!(store.lookup_count(), 2);

        store.set_unavailable(false);
        assert_eq!(store.team_members(&TeamId::new("t-ops")).await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_find_user() {
        let store = seeded();
        assert_eq!(store.find_user(&UserId::new("u-2")).await.unwrap().username, "bob");
        assert!(matches!(
            store.find_user(&UserId::new("ghost")).await,
            Err(StoreError::NotFound(_))
        ));

        store.fail_user("u-2");
        assert!(matches!(
            store.find_user(&UserId::new("u-2")).await,
            Err(StoreError::Unavailable(_))
        ));
    }

    #[test]
    fn test_add_team_member() {
        let store = seeded();
        let team = TeamId::new("t-ops");

        assert!(store.add_team_member(&team, UserId::new("u-7")));
        assert!(!store.add_team_member(&TeamId::new("nope"), UserId::new("u-7")));

        let members = tokio_test::block_on(store.team_members(&team)).unwrap();
        assert!(members.contains(&UserId::new("u-7")));
    }

    #[test]
    fn test_resource_role_holders() {
        let store = seeded();
        let inv = Inventory::new("prod", "o-1")
            .grant(RoleAssignment::user("u-1", ResourceRole::Update))
            .grant(RoleAssignment::team("t-ops", ResourceRole::Update))
            .grant(RoleAssignment::user("u-3", ResourceRole::Read));

        let updaters = store.resource_role_holders(&inv, ResourceRole::Update).unwrap();
        assert_eq!(updaters.len(), 2);
        assert!(updaters.contains(&GranteeRef::User(UserId::new("u-1"))));
        assert_eq!(store.lookup_count(), 0);
    }

    #[test]
    fn test_resource_role_holders_rejects_unsupported() {
        let store = seeded();
        let cred = Credential::new("key", "ssh", "o-1");
        assert!(store.resource_role_holders(&cred, ResourceRole::Update).is_err());

        let corrupt = Credential::new("key", "ssh", "o-1")
            .grant(RoleAssignment::user("u-1", ResourceRole::Update));
        let err = store
            .resource_role_holders(&corrupt, ResourceRole::Read)
            .unwrap_err();
        assert_eq!(err.source_label(), "malformed_grant");
    }
}
