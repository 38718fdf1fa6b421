//! Access aggregator.
//!
//! Builds the "who has access and why" listing for one resource from the
//! grants that are directly recorded: user assignments on the owning
//! organization (indirect access) and user assignments on the resource itself
//! (direct access). Team grantees are not expanded into their members; only
//! the evaluator follows team membership.

use futures::future::try_join_all;
use std::collections::{BTreeMap, HashMap};
use std::sync::Arc;
use tracing::{debug, error};

use super::error::AggregationError;
use super::models::{
    AccessEntries, AccessEntry, AccessRole, AccessSummary, GranteeType, Organization, UserId,
};
use super::resources::AccessControlled;
use super::roles::ScopedRole;
use super::store::UserDirectory;

/// Renders access summaries using a [`UserDirectory`] for profiles.
pub struct AccessAggregator<D: UserDirectory + ?Sized> {
    directory: Arc<D>,
}

impl<D: UserDirectory + ?Sized> Clone for AccessAggregator<D> {
    fn clone(&self) -> Self {
        Self {
            directory: Arc::clone(&self.directory),
        }
    }
}

/// Per-user entries in first-seen order.
#[derive(Default)]
struct Collected {
    order: Vec<UserId>,
    by_user: HashMap<UserId, AccessEntries>,
}

impl Collected {
    fn entry(&mut self, user_id: UserId) -> &mut AccessEntries {
        if !self.by_user.contains_key(&user_id) {
            self.order.push(user_id.clone());
        }
        self.by_user.entry(user_id).or_default()
    }
}

impl<D: UserDirectory + ?Sized> AccessAggregator<D> {
    pub fn new(directory: Arc<D>) -> Self {
        Self { directory }
    }

    /// Summarize recorded grants on `resource`, which must belong to
    /// `organization`.
    ///
    /// All-or-nothing: a foreign organization, a failed profile lookup or a
    /// malformed grant aborts the whole summary.
    pub async fn build_access_summary<R>(
        &self,
        organization: &Organization,
        resource: &R,
    ) -> Result<Vec<AccessSummary>, AggregationError>
    where
        R: AccessControlled + ?Sized,
    {
        // Indirect access only flows from the owning organization.
        if &organization.id != resource.organization_id() {
            return Err(AggregationError::OrganizationMismatch {
                organization_id: organization.id.clone(),
                owner_id: resource.organization_id().clone(),
            });
        }

        let mut collected = Collected::default();

        for assignment in &organization.roles {
            if assignment.grantee_type != GranteeType::User {
                continue;
            }
            let role = assignment.role;
            collected
                .entry(UserId::new(assignment.grantee_id.as_str()))
                .indirect_access
                .push(AccessEntry {
                    descendant_roles: ScopedRole::Organization(role).descendant_names(),
                    role: AccessRole {
                        name: role.as_str().to_string(),
                        description: role.description().to_string(),
                        resource_type: "organization".to_string(),
                        resource_name: organization.name.clone(),
                        related: BTreeMap::from([(
                            "organization".to_string(),
                            organization.related_link(),
                        )]),
                    },
                });
        }

        let kind = resource.kind();
        for assignment in resource.roles() {
            kind.ensure_supported(assignment.role)?;
            if assignment.grantee_type != GranteeType::User {
                continue;
            }
            let role = assignment.role;
            collected
                .entry(UserId::new(assignment.grantee_id.as_str()))
                .direct_access
                .push(AccessEntry {
                    descendant_roles: ScopedRole::Resource(role).descendant_names(),
                    role: AccessRole {
                        name: role.as_str().to_string(),
                        description: role.description(kind),
                        resource_type: kind.noun().to_string(),
                        resource_name: resource.name().to_string(),
                        related: BTreeMap::from([(
                            kind.as_str().to_string(),
                            kind.related_link(resource.id()),
                        )]),
                    },
                });
        }

        let users = try_join_all(collected.order.iter().map(|user_id| async move {
            self.directory.find_user(user_id).await.map_err(|err| {
                error!(user_id = %user_id, error = %err, "Failed to resolve grantee profile");
                AggregationError::UserLookupFailed {
                    user_id: user_id.clone(),
                    reason: err.to_string(),
                }
            })
        }))
        .await?;

        let Collected { order, mut by_user } = collected;
        let summaries: Vec<AccessSummary> = order
            .iter()
            .zip(users)
            .map(|(user_id, user)| {
                by_user
                    .remove(user_id)
                    .unwrap_or_default()
                    .into_summary(user)
            })
            .collect();

        debug!(
            resource_type = kind.as_str(),
            resource_id = %resource.id(),
            users = summaries.len(),
            "Built access summary"
        );
        Ok(summaries)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::rbac::error::EvaluationError;
    use crate::rbac::models::{RoleAssignment, User};
    use crate::rbac::resources::{Credential, Project};
    use crate::rbac::roles::{OrganizationRole, ResourceRole};
    use crate::rbac::store::InMemoryGrantStore;

    fn directory(ids: &[&str]) -> Arc<InMemoryGrantStore> {
        let store = InMemoryGrantStore::new();
        for id in ids {
            store.insert_user(User::new(*id, format!("user-{}", id)));
        }
        Arc::new(store)
    }

    #[tokio::test]
    async fn test_entries_accumulate_per_user_in_order() {
        let aggregator = AccessAggregator::new(directory(&["u-1", "u-2"]));
        let org = Organization::new("o-1", "Acme")
            .grant(RoleAssignment::user("u-2", OrganizationRole::Auditor))
            .grant(RoleAssignment::user("u-1", OrganizationRole::Admin));
        let project = Project::new("playbooks", "o-1")
            .grant(RoleAssignment::user("u-1", ResourceRole::Update))
            .grant(RoleAssignment::user("u-1", ResourceRole::Read));

        let summaries = aggregator.build_access_summary(&org, &project).await.unwrap();

        let ids: Vec<&str> = summaries.iter().map(|s| s.user.id.as_str()).collect();
        assert_eq!(ids, vec!["u-2", "u-1"]);

        let u1 = &summaries[1];
        assert_eq!(u1.indirect_access.len(), 1);
        assert_eq!(u1.indirect_access[0].descendant_roles, vec!["admin", "use", "read"]);
        let direct: Vec<&str> = u1.direct_access.iter().map(|e| e.role.name.as_str()).collect();
        assert_eq!(direct, vec!["update", "read"]);
        assert_eq!(
            u1.direct_access[0].role.description,
            "May update the project using the configured source update system"
        );
        assert!(summaries[0].direct_access.is_empty());
    }

    #[tokio::test]
    async fn test_direct_entry_shape() {
        let aggregator = AccessAggregator::new(directory(&["u-1"]));
        let org = Organization::new("o-1", "Acme");
        let mut cred = Credential::new("deploy key", "ssh", "o-1");
        cred.id = "c-1".into();
        let cred = cred.grant(RoleAssignment::user("u-1", ResourceRole::Use));

        let summaries = aggregator.build_access_summary(&org, &cred).await.unwrap();
        let entry = &summaries[0].direct_access[0];

        assert_eq!(entry.descendant_roles, vec!["use", "read"]);
        assert_eq!(entry.role.resource_type, "credential");
        assert_eq!(entry.role.resource_name, "deploy key");
        assert_eq!(entry.role.description, "Can use the credential in a job template");
        assert_eq!(
            entry.role.related.get("credential").map(String::as_str),
            Some("/v1/credentials/c-1/")
        );
    }

    #[tokio::test]
    async fn test_each_user_fetched_once() {
        let store = directory(&["u-1"]);
        let aggregator = AccessAggregator::new(store.clone());
        let org = Organization::new("o-1", "Acme")
            .grant(RoleAssignment::user("u-1", OrganizationRole::Member));
        let project = Project::new("playbooks", "o-1")
            .grant(RoleAssignment::user("u-1", ResourceRole::Admin));

        aggregator.build_access_summary(&org, &project).await.unwrap();
        assert_eq!(store.lookup_count(), 1);
    }

    #[tokio::test]
    async fn test_missing_user_aborts() {
        let aggregator = AccessAggregator::new(directory(&["u-1"]));
        let org = Organization::new("o-1", "Acme")
            .grant(RoleAssignment::user("u-1", OrganizationRole::Member))
            .grant(RoleAssignment::user("ghost", OrganizationRole::Member));
        let project = Project::new("playbooks", "o-1");

        let err = aggregator.build_access_summary(&org, &project).await.unwrap_err();
        assert!(matches!(
            err,
            AggregationError::UserLookupFailed { ref user_id, .. } if user_id.as_str() == "ghost"
        ));
    }

    #[tokio::test]
    async fn test_unsupported_resource_role_aborts() {
        let aggregator = AccessAggregator::new(directory(&["u-1"]));
        let org = Organization::new("o-1", "Acme");
        let cred = Credential::new("key", "ssh", "o-1")
            .grant(RoleAssignment::user("u-1", ResourceRole::Update));

        let err = aggregator.build_access_summary(&org, &cred).await.unwrap_err();
        assert!(matches!(
            err,
            AggregationError::Grant(EvaluationError::MalformedGrant { .. })
        ));
    }

    #[tokio::test]
    async fn test_empty_grants_yield_empty_summary() {
        let aggregator = AccessAggregator::new(directory(&[]));
        let org = Organization::new("o-1", "Acme");
        let project = Project::new("playbooks", "o-1");

        assert!(aggregator.build_access_summary(&org, &project).await.unwrap().is_empty());
    }
}
