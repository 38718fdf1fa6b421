//! Integration tests for access-list summaries.

use std::sync::Arc;

use tensor_core::rbac::{
    AccessAggregator, AccessControlled, AggregationError, Capability, Credential,
    EvaluationError, InMemoryGrantStore, Inventory, JobTemplate, Organization, OrganizationId,
    OrganizationRole, PermissionEvaluator, ResourceId, ResourceRole, RoleAssignment, Team, User,
    UserId,
};

const ORG: &str = "o-1";

fn directory(users: &[&str]) -> Arc<InMemoryGrantStore> {
    let store = InMemoryGrantStore::new();
    for id in users {
        store.insert_user(User::new(*id, format!("user-{}", id)));
    }
    Arc::new(store)
}

fn ids(summaries: &[tensor_core::rbac::AccessSummary]) -> Vec<&str> {
    summaries.iter().map(|s| s.user.id.as_str()).collect()
}

#[tokio::test]
async fn test_direct_and_indirect_entries() {
    let aggregator = AccessAggregator::new(directory(&["u-1", "u-2"]));
    let organization = Organization::new(ORG, "Acme")
        .grant(RoleAssignment::user("u-1", OrganizationRole::Admin));
    let cred = Credential::new("deploy key", "ssh", ORG)
        .grant(RoleAssignment::user("u-1", ResourceRole::Use))
        .grant(RoleAssignment::user("u-2", ResourceRole::Read));

    let summaries = aggregator.build_access_summary(&organization, &cred).await.unwrap();
    assert_eq!(ids(&summaries), vec!["u-1", "u-2"]);

    let first = &summaries[0];
    assert_eq!(first.indirect_access.len(), 1);
    assert_eq!(first.indirect_access[0].role.name, "admin");
    assert_eq!(first.indirect_access[0].role.resource_type, "organization");
    assert_eq!(first.indirect_access[0].role.resource_name, "Acme");
    assert_eq!(
        first.indirect_access[0].descendant_roles,
        vec!["admin", "use", "read"]
    );
    assert_eq!(first.direct_access.len(), 1);
    assert_eq!(first.direct_access[0].role.name, "use");
    assert_eq!(first.direct_access[0].role.resource_type, "credential");
    assert_eq!(first.direct_access[0].role.resource_name, "deploy key");
    assert_eq!(
        first.direct_access[0].role.related.get("credential").map(String::as_str),
        Some(format!("/v1/credentials/{}/", cred.id).as_str())
    );

    let second = &summaries[1];
    assert!(second.indirect_access.is_empty());
    assert_eq!(second.direct_access[0].descendant_roles, vec!["read"]);
}

#[tokio::test]
async fn test_teams_are_not_expanded() {
    let store = directory(&["u-1", "u-member"]);
    store.insert_team(Team::new("t-ops", "Ops", ORG).with_member("u-member"));
    let aggregator = AccessAggregator::new(store);

    let organization = Organization::new(ORG, "Acme")
        .grant(RoleAssignment::team("t-ops", OrganizationRole::Member));
    let inv = Inventory::new("prod", ORG)
        .grant(RoleAssignment::team("t-ops", ResourceRole::Admin))
        .grant(RoleAssignment::user("u-1", ResourceRole::Read));

    let summaries = aggregator.build_access_summary(&organization, &inv).await.unwrap();
    assert_eq!(ids(&summaries), vec!["u-1"]);
}

#[tokio::test]
async fn test_users_in_first_seen_order() {
    let aggregator = AccessAggregator::new(directory(&["a", "b", "c"]));
    let organization = Organization::new(ORG, "Acme")
        .grant(RoleAssignment::user("c", OrganizationRole::Auditor))
        .grant(RoleAssignment::user("a", OrganizationRole::Member));
    let inv = Inventory::new("prod", ORG)
        .grant(RoleAssignment::user("b", ResourceRole::Update))
        .grant(RoleAssignment::user("c", ResourceRole::Use));

    let summaries = aggregator.build_access_summary(&organization, &inv).await.unwrap();
    assert_eq!(ids(&summaries), vec!["c", "a", "b"]);
    assert_eq!(summaries[0].indirect_access.len(), 1);
    assert_eq!(summaries[0].direct_access.len(), 1);
}

#[tokio::test]
async fn test_repeated_grants_keep_every_entry() {
    let store = directory(&["u-1"]);
    let aggregator = AccessAggregator::new(store.clone());
    let organization = Organization::new(ORG, "Acme")
        .grant(RoleAssignment::user("u-1", OrganizationRole::Admin))
        .grant(RoleAssignment::user("u-1", OrganizationRole::Member));
    let inv = Inventory::new("prod", ORG)
        .grant(RoleAssignment::user("u-1", ResourceRole::Read))
        .grant(RoleAssignment::user("u-1", ResourceRole::Admin));

    let summaries = aggregator.build_access_summary(&organization, &inv).await.unwrap();
    assert_eq!(summaries.len(), 1);
    assert_eq!(summaries[0].indirect_access.len(), 2);
    assert_eq!(summaries[0].direct_access.len(), 2);
    assert_eq!(summaries[0].direct_access[0].role.name, "read");

    // Profiles are fetched once per user.
    assert_eq!(store.lookup_count(), 1);
}

#[tokio::test]
async fn test_no_grants_is_empty() {
    let aggregator = AccessAggregator::new(directory(&[]));
    let organization = Organization::new(ORG, "Acme");
    let inv = Inventory::new("prod", ORG);

    let summaries = aggregator.build_access_summary(&organization, &inv).await.unwrap();
    assert!(summaries.is_empty());
}

#[tokio::test]
async fn test_missing_user_aborts() {
    let aggregator = AccessAggregator::new(directory(&["u-1"]));
    let organization = Organization::new(ORG, "Acme");
    let inv = Inventory::new("prod", ORG)
        .grant(RoleAssignment::user("u-1", ResourceRole::Read))
        .grant(RoleAssignment::user("u-gone", ResourceRole::Read));

    let err = aggregator
        .build_access_summary(&organization, &inv)
        .await
        .unwrap_err();
    match err {
        AggregationError::UserLookupFailed { user_id, .. } => {
            assert_eq!(user_id, UserId::new("u-gone"));
        }
        other => panic!("unexpected error: {other}"),
    }
}

#[tokio::test]
async fn test_user_lookup_failure_aborts() {
    let store = directory(&["u-1"]);
    store.fail_user("u-1");
    let aggregator = AccessAggregator::new(store);
    let organization = Organization::new(ORG, "Acme")
        .grant(RoleAssignment::user("u-1", OrganizationRole::Member));
    let inv = Inventory::new("prod", ORG);

    let result = aggregator.build_access_summary(&organization, &inv).await;
    assert!(matches!(result, Err(AggregationError::UserLookupFailed { .. })));
}

#[tokio::test]
async fn test_unsupported_role_aborts() {
    let aggregator = AccessAggregator::new(directory(&["u-1"]));
    let organization = Organization::new(ORG, "Acme");
    let jt = JobTemplate::new("deploy", ORG, ResourceId::new("i"), ResourceId::new("p"), "x.yml")
        .grant(RoleAssignment::team("t-1", ResourceRole::Update));

    let result = aggregator.build_access_summary(&organization, &jt).await;
    assert!(matches!(
        result,
        Err(AggregationError::Grant(EvaluationError::MalformedGrant { .. }))
    ));
}

#[tokio::test]
async fn test_foreign_organization_rejected() {
    let store = directory(&["u-x"]);
    let other = Organization::new("o-other", "Other")
        .grant(RoleAssignment::user("u-x", OrganizationRole::Admin));
    store.insert_organization(Organization::new(ORG, "Acme"));
    store.insert_organization(other.clone());
    let inv = Inventory::new("prod", ORG);

    let evaluator = PermissionEvaluator::new(store.clone());
    assert!(!evaluator
        .can_access(&User::new("u-x", "user-u-x"), &inv, Capability::Write)
        .await
        .unwrap());

    let aggregator = AccessAggregator::new(store.clone());
    let err = aggregator.build_access_summary(&other, &inv).await.unwrap_err();
    assert_eq!(
        err,
        AggregationError::OrganizationMismatch {
            organization_id: OrganizationId::new("o-other"),
            owner_id: OrganizationId::new(ORG),
        }
    );
    // Rejected before any profile is fetched.
    assert_eq!(store.lookup_count(), 1);
}

#[tokio::test]
async fn test_trait_object_resource() {
    let aggregator = AccessAggregator::new(directory(&["u-1"]));
    let organization = Organization::new(ORG, "Acme");
    let inv: Box<dyn AccessControlled> = Box::new(
        Inventory::new("prod", ORG).grant(RoleAssignment::user("u-1", ResourceRole::Update)),
    );

    let summaries = aggregator
        .build_access_summary(&organization, &*inv)
        .await
        .unwrap();
    assert_eq!(summaries[0].direct_access[0].role.resource_type, "inventory");
    assert_eq!(summaries[0].direct_access[0].descendant_roles, vec!["use", "read"]);
}
