//! Benchmarks for access evaluation and access-list summaries.
use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion};
use std::sync::Arc;
use tensor_core::rbac::{
    AccessAggregator, Capability, EvaluatorConfig, InMemoryGrantStore, Inventory, Organization,
    OrganizationRole, PermissionEvaluator, ResourceRole, RoleAssignment, Team, User,
};

const ORG: &str = "o-bench";

fn fixture(teams: usize) -> (Arc<InMemoryGrantStore>, Organization, Inventory) {
    let store = InMemoryGrantStore::new();
    let mut organization = Organization::new(ORG, "Bench");
    let mut inventory = Inventory::new("hosts", ORG);

    for i in 0..teams {
        let team_id = format!("t-{}", i);
        store.insert_team(Team::new(team_id.as_str(), format!("team {}", i), ORG).with_member(format!("u-{}", i)));
        inventory = inventory.grant(RoleAssignment::team(team_id.as_str(), ResourceRole::Use));
        organization = organization.grant(RoleAssignment::user(format!("u-{}", i), OrganizationRole::Member));
        store.insert_user(User::new(format!("u-{}", i), format!("user{}", i)));
    }
    store.insert_organization(organization.clone());
    (Arc::new(store), organization, inventory)
}

fn bench_flag_short_circuit(c: &mut Criterion) {
    let mut group = c.benchmark_group("evaluator_flags");
    let rt = tokio::runtime::Runtime::new().unwrap();
    let (store, _, inventory) = fixture(8);
    let evaluator = PermissionEvaluator::new(store);
    let root = User::new("root", "root").super_user();
    let auditor = User::new("aud", "auditor").system_auditor();
    group.bench_function("super_user", |b| { b.iter(|| rt.block_on(async { black_box(evaluator.can_access(&root, &inventory, Capability::Write).await.unwrap()) })); });
    group.bench_function("system_auditor_read", |b| { b.iter(|| rt.block_on(async { black_box(evaluator.can_access(&auditor, &inventory, Capability::Read).await.unwrap()) })); });
    group.finish();
}

fn bench_team_fan_out(c: &mut Criterion) {
    let mut group = c.benchmark_group("evaluator_team_fan_out");
    let rt = tokio::runtime::Runtime::new().unwrap();
    for teams in [1, 16, 128] {
        let (store, _, inventory) = fixture(teams);
        // Last team holds the member, so every team is checked.
        let user = User::new(format!("u-{}", teams - 1), "last");
        for concurrency in [1, 8] {
            let evaluator = PermissionEvaluator::with_config(store.clone(), EvaluatorConfig { team_check_concurrency: concurrency });
            group.bench_with_input(BenchmarkId::new(format!("concurrency_{}", concurrency), teams), &teams, |b, _| {
                b.iter(|| rt.block_on(async { black_box(evaluator.can_access(&user, &inventory, Capability::Use).await.unwrap()) }));
            });
        }
    }
    group.finish();
}

fn bench_denied(c: &mut Criterion) {
    let mut group = c.benchmark_group("evaluator_denied");
    let rt = tokio::runtime::Runtime::new().unwrap();
    for teams in [16, 128] {
        let (store, _, inventory) = fixture(teams);
        let evaluator = PermissionEvaluator::new(store);
        let outsider = User::new("u-outsider", "outsider");
        group.bench_with_input(BenchmarkId::from_parameter(teams), &teams, |b, _| {
            b.iter(|| rt.block_on(async { black_box(evaluator.can_access(&outsider, &inventory, Capability::Write).await.unwrap()) }));
        });
    }
    group.finish();
}

fn bench_access_summary(c: &mut Criterion) {
    let mut group = c.benchmark_group("access_summary");
    let rt = tokio::runtime::Runtime::new().unwrap();
    for users in [10, 100, 1_000] {
        let (store, organization, inventory) = fixture(users);
        let aggregator = AccessAggregator::new(store);
        group.bench_with_input(BenchmarkId::from_parameter(users), &users, |b, _| {
            b.iter(|| rt.block_on(async { black_box(aggregator.build_access_summary(&organization, &inventory).await.unwrap()) }));
        });
    }
    group.finish();
}

criterion_group!(benches, bench_flag_short_circuit, bench_team_fan_out, bench_denied, bench_access_summary);
criterion_main!(benches);
